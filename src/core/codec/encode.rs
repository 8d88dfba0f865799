//! Outbound command builder

use super::{CommandPrefix, CommandValue, Coordinate, EncodedCommand};
use crate::core::catalog::{ParamType, ParameterDefinition};
use crate::core::family::ConsoleFamily;
use crate::core::store::{StateStore, Value};

/// Build the command string for `entry` at `coordinate`.
///
/// Coordinates are 1-based and already alias-resolved; the console expects
/// 0-based channel indices, so X and Y are decremented here. Scene numbers
/// are sent as given.
///
/// Returns `None` when nothing should be sent: the type has no wire mapping,
/// a `set` carries no value, or a coordinate cannot be expressed.
pub fn build_command(
    prefix: CommandPrefix,
    entry: &ParameterDefinition,
    family: ConsoleFamily,
    coordinate: Coordinate,
    value: Option<&CommandValue>,
    store: &StateStore,
) -> Option<EncodedCommand> {
    if coordinate.x == 0 {
        return None;
    }

    match &entry.param_type {
        ParamType::Integer | ParamType::Binary => {
            let mut parts = indexed(prefix, entry, coordinate);
            if prefix == CommandPrefix::Set {
                match value? {
                    CommandValue::Toggle => {
                        if let Some(flipped) = toggled(entry, coordinate, store) {
                            parts.push(flipped.to_string());
                        }
                    }
                    CommandValue::Int(v) => parts.push(v.to_string()),
                    CommandValue::Text(s) => parts.push(s.clone()),
                }
            }
            Some(EncodedCommand {
                line: parts.join(" "),
                repoll: false,
            })
        }
        ParamType::String => {
            let mut parts = indexed(prefix, entry, coordinate);
            if prefix == CommandPrefix::Set {
                match value? {
                    CommandValue::Toggle => return None,
                    CommandValue::Int(v) => parts.push(format!("\"{v}\"")),
                    CommandValue::Text(s) => parts.push(format!("\"{s}\"")),
                }
            }
            Some(EncodedCommand {
                line: parts.join(" "),
                repoll: false,
            })
        }
        ParamType::Scene => {
            let token = family.scene_encoding().address_token(entry, coordinate.y)?;
            let mut parts = vec![prefix.scene_verb().to_string(), token];
            if prefix == CommandPrefix::Set {
                parts.push(coordinate.x.to_string());
            }
            Some(EncodedCommand {
                line: parts.join(" "),
                repoll: prefix == CommandPrefix::Set,
            })
        }
        ParamType::Other(raw) => {
            tracing::debug!("No wire mapping for {} (type '{}')", entry.address, raw);
            None
        }
    }
}

fn indexed(prefix: CommandPrefix, entry: &ParameterDefinition, coordinate: Coordinate) -> Vec<String> {
    vec![
        prefix.verb().to_string(),
        entry.address.clone(),
        (coordinate.x - 1).to_string(),
        coordinate.y.unwrap_or(1).saturating_sub(1).to_string(),
    ]
}

fn toggled(entry: &ParameterDefinition, coordinate: Coordinate, store: &StateStore) -> Option<i64> {
    match store.query(&entry.key(), coordinate.x, coordinate.y.unwrap_or(1))? {
        Value::Int(v) => Some(1 - v),
        Value::Text(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(address: &str, param_type: ParamType, max: i64) -> ParameterDefinition {
        ParameterDefinition {
            address: address.to_string(),
            dim_x: 72,
            max,
            param_type,
            ..ParameterDefinition::default()
        }
    }

    fn on() -> ParameterDefinition {
        entry("MIXER:Current/InCh/Fader/On", ParamType::Integer, 1)
    }

    #[test]
    fn test_integer_set_and_get() {
        let store = StateStore::new();
        let level = entry("MIXER:Current/InCh/Fader/Level", ParamType::Integer, 1000);
        let set = build_command(
            CommandPrefix::Set,
            &level,
            ConsoleFamily::ClQl,
            Coordinate::new(3, None),
            Some(&CommandValue::Int(-1000)),
            &store,
        )
        .unwrap();
        assert_eq!(set.line, "set MIXER:Current/InCh/Fader/Level 2 0 -1000");
        assert!(!set.repoll);

        let get = build_command(
            CommandPrefix::Get,
            &level,
            ConsoleFamily::ClQl,
            Coordinate::new(3, Some(2)),
            Some(&CommandValue::Int(-1000)),
            &store,
        )
        .unwrap();
        assert_eq!(get.line, "get MIXER:Current/InCh/Fader/Level 2 1");
    }

    #[test]
    fn test_set_without_value_is_not_sent() {
        let store = StateStore::new();
        let cmd = build_command(
            CommandPrefix::Set,
            &on(),
            ConsoleFamily::ClQl,
            Coordinate::new(1, None),
            None,
            &store,
        );
        assert!(cmd.is_none());
    }

    #[test]
    fn test_toggle_flips_stored_value() {
        let mut store = StateStore::new();
        let entry = on();
        store.insert(&entry.key(), 5, 1, Value::Int(1));

        let cmd = build_command(
            CommandPrefix::Set,
            &entry,
            ConsoleFamily::ClQl,
            Coordinate::new(5, None),
            Some(&CommandValue::Toggle),
            &store,
        )
        .unwrap();
        assert_eq!(cmd.line, "set MIXER:Current/InCh/Fader/On 4 0 0");

        store.insert(&entry.key(), 5, 1, Value::Int(0));
        let cmd = build_command(
            CommandPrefix::Set,
            &entry,
            ConsoleFamily::ClQl,
            Coordinate::new(5, None),
            Some(&CommandValue::Toggle),
            &store,
        )
        .unwrap();
        assert_eq!(cmd.line, "set MIXER:Current/InCh/Fader/On 4 0 1");
    }

    #[test]
    fn test_toggle_without_state_has_no_value() {
        let store = StateStore::new();
        let cmd = build_command(
            CommandPrefix::Set,
            &on(),
            ConsoleFamily::ClQl,
            Coordinate::new(5, None),
            Some(&CommandValue::Toggle),
            &store,
        )
        .unwrap();
        assert_eq!(cmd.line, "set MIXER:Current/InCh/Fader/On 4 0");
    }

    #[test]
    fn test_string_value_is_quoted() {
        let store = StateStore::new();
        let name = entry("MIXER:Current/InCh/Label/Name", ParamType::String, 8);
        let cmd = build_command(
            CommandPrefix::Set,
            &name,
            ConsoleFamily::Tf,
            Coordinate::new(1, None),
            Some(&CommandValue::Text("Lead Vox".to_string())),
            &store,
        )
        .unwrap();
        assert_eq!(cmd.line, r#"set MIXER:Current/InCh/Label/Name 0 0 "Lead Vox""#);

        let toggle = build_command(
            CommandPrefix::Set,
            &name,
            ConsoleFamily::Tf,
            Coordinate::new(1, None),
            Some(&CommandValue::Toggle),
            &store,
        );
        assert!(toggle.is_none());
    }

    #[test]
    fn test_scene_recall_per_family() {
        let store = StateStore::new();
        let scene = ParameterDefinition {
            index: 1000,
            dim_y: 2,
            ..entry("MIXER:Lib/Bank/Scene", ParamType::Scene, 99)
        };

        let cl = build_command(
            CommandPrefix::Set,
            &scene,
            ConsoleFamily::ClQl,
            Coordinate::new(12, None),
            None,
            &store,
        )
        .unwrap();
        assert_eq!(cl.line, "ssrecall_ex MIXER:Lib/Bank/Scene 12");
        assert!(cl.repoll);

        let tf = build_command(
            CommandPrefix::Set,
            &scene,
            ConsoleFamily::Tf,
            Coordinate::new(12, Some(2)),
            None,
            &store,
        )
        .unwrap();
        assert_eq!(tf.line, "ssrecall_ex MIXER:Lib/Bank/Sceneb 12");

        let query = build_command(
            CommandPrefix::Get,
            &scene,
            ConsoleFamily::Tf,
            Coordinate::new(12, Some(1)),
            None,
            &store,
        )
        .unwrap();
        assert_eq!(query.line, "sscurrent_ex MIXER:Lib/Bank/Scenea");
        assert!(!query.repoll);
    }

    #[test]
    fn test_unknown_type_is_unsupported() {
        let store = StateStore::new();
        let meter = entry("MIXER:Current/Meter/InCh", ParamType::Other("mtr".to_string()), 0);
        let cmd = build_command(
            CommandPrefix::Get,
            &meter,
            ConsoleFamily::ClQl,
            Coordinate::new(1, None),
            None,
            &store,
        );
        assert!(cmd.is_none());
    }
}
