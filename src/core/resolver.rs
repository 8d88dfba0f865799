//! Address resolution for inbound records
//!
//! Responses may carry a dynamic suffix after the catalog address (a scene
//! bank letter, for example). An entry matches when the inbound address,
//! truncated to the entry's length, equals the entry's address. The first
//! match in catalog order wins.

use super::catalog::{Catalog, ParameterDefinition};

/// Find the catalog entry for an inbound address
pub fn resolve<'c>(catalog: &'c Catalog, address: &str) -> Option<&'c ParameterDefinition> {
    catalog
        .entries()
        .iter()
        .find(|entry| address.get(..entry.address.len()) == Some(entry.address.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::ChannelLabels;
    use crate::core::family::ConsoleFamily;

    const SOURCE: &str = "\
OK scninfo 1000 \"MIXER:Lib/Bank/Scene\" 100 2 0 99 0 \"\" scene any rw 1
OK prminfo 1 \"MIXER:Current/InCh/Fader/On\" 72 1 0 1 1 \"\" integer any rw 1
OK prminfo 2 \"MIXER:Current/InCh/Fader/Level\" 72 1 -32768 1000 -32768 \"dB\" integer any rw 100
OK prminfo 3 \"MIXER:Current/InCh/Fader/LevelDelta\" 72 1 -32768 1000 0 \"dB\" integer any rw 100
";

    fn catalog() -> Catalog {
        Catalog::load(SOURCE, ConsoleFamily::Tf, ChannelLabels::default()).unwrap()
    }

    #[test]
    fn test_exact_match() {
        let catalog = catalog();
        let entry = resolve(&catalog, "MIXER:Current/InCh/Fader/On").unwrap();
        assert_eq!(entry.index, 1);
    }

    #[test]
    fn test_dynamic_suffix() {
        let catalog = catalog();
        let entry = resolve(&catalog, "MIXER:Lib/Bank/Sceneb").unwrap();
        assert_eq!(entry.address, "MIXER:Lib/Bank/Scene");
    }

    #[test]
    fn test_first_prefix_in_catalog_order_wins() {
        let catalog = catalog();
        // "Level" sorts before "LevelDelta", so it claims the longer address too
        for _ in 0..3 {
            let entry = resolve(&catalog, "MIXER:Current/InCh/Fader/LevelDelta").unwrap();
            assert_eq!(entry.index, 2);
        }
    }

    #[test]
    fn test_no_match() {
        let catalog = catalog();
        assert!(resolve(&catalog, "MIXER:Current/InCh/Fader").is_none());
        assert!(resolve(&catalog, "mixer:current/inch/fader/on").is_none());
        assert!(resolve(&catalog, "MIXER_Current/InCh/Fader/On").is_none());
        assert!(resolve(&catalog, "").is_none());
    }
}
