//! Wire codec for SCP lines
//!
//! - Decoding: tokenize a received line into a [`CommandRecord`]
//! - Encoding: build `get`/`set` command strings for a catalog entry
//!
//! SCP lines are ASCII, space separated, with optional double-quoted string
//! values. There is no escape mechanism for embedded quotes or newlines.

mod decode;
mod encode;

pub use decode::{record_status, split_tokens, tokenize};
pub use encode::build_command;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Response status of a record line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordStatus {
    /// Reply to a command sent by this client
    Ok,
    /// Unsolicited change notification
    Notify,
}

impl RecordStatus {
    /// Parse a status token, case-insensitively
    pub fn parse(token: &str) -> Option<Self> {
        if token.eq_ignore_ascii_case("OK") {
            Some(Self::Ok)
        } else if token.eq_ignore_ascii_case("NOTIFY") {
            Some(Self::Notify)
        } else {
            None
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => f.write_str("OK"),
            Self::Notify => f.write_str("NOTIFY"),
        }
    }
}

/// Field of a response line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireField {
    /// `OK` or `NOTIFY`
    Status,
    /// Echoed verb
    Command,
    /// Parameter address
    Address,
    /// First index, 0-based
    X,
    /// Second index, 0-based
    Y,
    /// Raw value
    Val,
    /// Text value
    TxtVal,
}

/// Positional layout of a response line
pub const WIRE_FIELDS: [WireField; 7] = [
    WireField::Status,
    WireField::Command,
    WireField::Address,
    WireField::X,
    WireField::Y,
    WireField::Val,
    WireField::TxtVal,
];

/// One decoded response line. Fields missing from the line stay `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRecord {
    /// `OK` or `NOTIFY`
    pub status: RecordStatus,
    /// Command verb echoed by the console (`set`, `get`, `sscurrent_ex`, ...)
    pub command: Option<String>,
    /// Address token, possibly with a dynamic suffix
    pub address: Option<String>,
    /// Raw X token
    pub x: Option<String>,
    /// Raw Y token
    pub y: Option<String>,
    /// Raw value token
    pub val: Option<String>,
    /// Text rendering of the value, when the console sends one
    pub txt_val: Option<String>,
}

/// Direction of an outbound command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandPrefix {
    /// Query the current value
    Get,
    /// Change the value
    Set,
}

impl CommandPrefix {
    /// Verb written on the wire
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Set => "set",
        }
    }

    /// Verb for scene commands
    pub fn scene_verb(&self) -> &'static str {
        match self {
            Self::Get => "sscurrent_ex",
            Self::Set => "ssrecall_ex",
        }
    }
}

/// Value requested by the action layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandValue {
    /// Numeric value
    Int(i64),
    /// Text value
    Text(String),
    /// Flip an on/off value using the state store
    Toggle,
}

impl CommandValue {
    /// Parse a value as typed by a user
    pub fn parse(s: &str) -> Self {
        if s == "Toggle" {
            Self::Toggle
        } else if let Ok(v) = s.parse() {
            Self::Int(v)
        } else {
            Self::Text(s.to_string())
        }
    }
}

impl fmt::Display for CommandValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
            Self::Toggle => f.write_str("Toggle"),
        }
    }
}

/// Resolved 1-based target of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Coordinate {
    /// Channel / element, or the scene number for scene commands
    pub x: u32,
    /// Second axis, or the scene bank. `None` means not supplied.
    pub y: Option<u32>,
}

impl Coordinate {
    /// Create a coordinate
    pub fn new(x: u32, y: Option<u32>) -> Self {
        Self { x, y }
    }
}

/// A command line ready to send (without the trailing newline)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedCommand {
    /// Command text
    pub line: String,
    /// Sending this command may change many other parameters, so every
    /// registered feedback should be polled again
    pub repoll: bool,
}

impl fmt::Display for EncodedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse() {
        assert_eq!(RecordStatus::parse("ok"), Some(RecordStatus::Ok));
        assert_eq!(RecordStatus::parse("Notify"), Some(RecordStatus::Notify));
        assert_eq!(RecordStatus::parse("ERROR"), None);
        assert_eq!(RecordStatus::parse("OKAY"), None);
    }

    #[test]
    fn test_value_parse() {
        assert_eq!(CommandValue::parse("Toggle"), CommandValue::Toggle);
        assert_eq!(CommandValue::parse("-1000"), CommandValue::Int(-1000));
        assert_eq!(CommandValue::parse("Lead Vox"), CommandValue::Text("Lead Vox".to_string()));
    }
}
