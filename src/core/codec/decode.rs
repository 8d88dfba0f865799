//! Line tokenizer

use super::{CommandRecord, RecordStatus, WireField, WIRE_FIELDS};
use regex::Regex;
use std::sync::LazyLock;

/// A run of non-space characters or quoted strings, glued together
static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?:[^\s"]+|"[^"]*")+"#).expect("token pattern is valid"));

/// Split a line on whitespace, keeping double-quoted runs together and
/// stripping the quotes. An unbalanced quote is dropped.
pub fn split_tokens(line: &str) -> Vec<String> {
    TOKEN
        .find_iter(line)
        .map(|m| m.as_str().replace('"', ""))
        .collect()
}

/// Status of a record line, read from the raw first token. A quoted
/// `"OK"` is not a status.
pub fn record_status(line: &str) -> Option<RecordStatus> {
    RecordStatus::parse(TOKEN.find(line)?.as_str())
}

/// Decode one response line. Returns `None` unless the line starts with
/// `OK` or `NOTIFY`.
pub fn tokenize(line: &str) -> Option<CommandRecord> {
    let status = record_status(line)?;
    let tokens = split_tokens(line);

    let mut record = CommandRecord {
        status,
        command: None,
        address: None,
        x: None,
        y: None,
        val: None,
        txt_val: None,
    };

    for (field, token) in WIRE_FIELDS.iter().zip(tokens).skip(1) {
        let slot = match field {
            WireField::Status => continue,
            WireField::Command => &mut record.command,
            WireField::Address => &mut record.address,
            WireField::X => &mut record.x,
            WireField::Y => &mut record.y,
            WireField::Val => &mut record.val,
            WireField::TxtVal => &mut record.txt_val,
        };
        *slot = Some(token);
    }

    Some(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_value_is_one_token() {
        let record = tokenize(r#"OK set MIXER:Current/InCh/Fader/Level 3 1 "-12.3""#).unwrap();
        assert_eq!(record.status, RecordStatus::Ok);
        assert_eq!(record.command.as_deref(), Some("set"));
        assert_eq!(record.address.as_deref(), Some("MIXER:Current/InCh/Fader/Level"));
        assert_eq!(record.x.as_deref(), Some("3"));
        assert_eq!(record.y.as_deref(), Some("1"));
        assert_eq!(record.val.as_deref(), Some("-12.3"));
        assert_eq!(record.txt_val, None);
    }

    #[test]
    fn test_spaces_inside_quotes() {
        let record =
            tokenize(r#"NOTIFY set MIXER:Current/InCh/Label/Name 0 0 "Lead Vox" "Lead Vox""#).unwrap();
        assert_eq!(record.status, RecordStatus::Notify);
        assert_eq!(record.val.as_deref(), Some("Lead Vox"));
        assert_eq!(record.txt_val.as_deref(), Some("Lead Vox"));
    }

    #[test]
    fn test_missing_trailing_fields() {
        let record = tokenize("notify sscurrent_ex MIXER:Lib/Scene 12").unwrap();
        assert_eq!(record.x.as_deref(), Some("12"));
        assert_eq!(record.y, None);
        assert_eq!(record.val, None);
    }

    #[test]
    fn test_non_records_are_rejected() {
        assert!(tokenize("").is_none());
        assert!(tokenize("   ").is_none());
        assert!(tokenize("ERROR set MIXER:Current/Foo UnknownAddress").is_none());
        assert!(tokenize("set MIXER:Current/InCh/Fader/Level 0 0 100").is_none());
        assert!(tokenize("\"OK\"x set").is_none());
    }

    #[test]
    fn test_quoted_status_is_not_a_record() {
        assert!(tokenize("\"OK\" set MIXER:Current/InCh/Fader/On 0 0 1").is_none());
        assert!(tokenize("\"NOTIFY\" set MIXER:Current/InCh/Fader/On 0 0 1").is_none());
        assert!(tokenize("O\"K\" set MIXER:Current/InCh/Fader/On 0 0 1").is_none());
        assert_eq!(record_status("Notify set"), Some(RecordStatus::Notify));
    }

    #[test]
    fn test_unbalanced_quote() {
        assert_eq!(split_tokens(r#"OK set "abc"#), vec!["OK", "set", "abc"]);
        assert_eq!(split_tokens(r#"""#), Vec::<String>::new());
    }

    #[test]
    fn test_adjacent_quotes_join() {
        assert_eq!(split_tokens(r#"a"b c"d e"#), vec!["ab cd", "e"]);
        assert_eq!(split_tokens(r#"x "" y"#), vec!["x", "", "y"]);
    }

    #[test]
    fn test_control_characters() {
        let tokens = split_tokens("OK\tset\x00 a\r");
        assert_eq!(tokens, vec!["OK", "set\x00", "a"]);
    }
}
