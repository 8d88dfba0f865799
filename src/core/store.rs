//! Live mirror of console state
//!
//! Values are keyed by normalized address, then 1-based X, then 1-based Y.
//! Coordinate 0 on the wire means "no dimension" and lands on index 1.
//! Entries are created on first observation and overwritten on every later
//! one; nothing is ever removed.

use super::catalog::{ParamType, ParameterDefinition};
use super::codec::CommandRecord;
use super::family::ConsoleFamily;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Last known value of a parameter instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Numeric value
    Int(i64),
    /// Text value
    Text(String),
}

impl Value {
    /// Interpret a raw token according to the parameter type
    pub fn typed(param_type: &ParamType, raw: &str) -> Self {
        match param_type {
            ParamType::String => Self::Text(raw.to_string()),
            ParamType::Integer | ParamType::Binary | ParamType::Scene | ParamType::Other(_) => raw
                .parse()
                .map(Self::Int)
                .unwrap_or_else(|_| Self::Text(raw.to_string())),
        }
    }

    /// Numeric value, if any
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// A decoded record mapped onto a catalog entry, with 1-based coordinates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    /// Normalized key of the catalog entry
    pub key: String,
    /// 1-based X
    pub x: u32,
    /// 1-based Y (or scene bank)
    pub y: u32,
    /// Observed value
    pub value: Value,
}

impl Observation {
    /// Extract the coordinates and value of `record` for `entry`.
    ///
    /// Single-dimension responses may omit the value field and carry the
    /// value in the X slot instead; in that case X becomes "no dimension".
    pub fn extract(
        entry: &ParameterDefinition,
        record: &CommandRecord,
        family: ConsoleFamily,
    ) -> Option<Self> {
        let (raw_x, raw_value) = match &record.val {
            Some(val) => (record.x.as_deref(), val.as_str()),
            None => (None, record.x.as_deref()?),
        };

        let x = one_based(raw_x)?;
        let address = record.address.as_deref().unwrap_or_default();
        let y = match family.scene_encoding().bank_from_address(entry, address) {
            Some(bank) => bank,
            None => one_based(record.y.as_deref())?,
        };

        Some(Self {
            key: entry.key(),
            x,
            y,
            value: Value::typed(&entry.param_type, raw_value),
        })
    }
}

fn one_based(raw: Option<&str>) -> Option<u32> {
    match raw {
        None => Some(1),
        Some(s) => s.parse::<u32>().ok()?.checked_add(1),
    }
}

/// Address → X → Y → value
#[derive(Debug, Clone, Default)]
pub struct StateStore {
    values: HashMap<String, HashMap<u32, HashMap<u32, Value>>>,
}

impl StateStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an inbound response. Returns the observation that was stored,
    /// or `None` when the record carries nothing usable.
    pub fn observe(
        &mut self,
        entry: &ParameterDefinition,
        record: &CommandRecord,
        family: ConsoleFamily,
    ) -> Option<Observation> {
        let Some(observation) = Observation::extract(entry, record, family) else {
            tracing::debug!(
                "Ignoring record without usable value or coordinates: {:?}",
                record
            );
            return None;
        };
        self.apply(&observation);
        Some(observation)
    }

    /// Store an observation
    pub fn apply(&mut self, observation: &Observation) {
        self.insert(&observation.key, observation.x, observation.y, observation.value.clone());
    }

    /// Overwrite the value at a coordinate
    pub fn insert(&mut self, key: &str, x: u32, y: u32, value: Value) {
        self.values
            .entry(key.to_string())
            .or_default()
            .entry(x)
            .or_default()
            .insert(y, value);
    }

    /// Last known value; `None` means nothing has been observed yet
    pub fn query(&self, key: &str, x: u32, y: u32) -> Option<&Value> {
        self.values.get(key)?.get(&x)?.get(&y)
    }

    /// Any value observed for `key` at `x`
    pub fn has_channel(&self, key: &str, x: u32) -> bool {
        self.values.get(key).is_some_and(|xs| xs.contains_key(&x))
    }

    /// Number of stored values
    pub fn len(&self) -> usize {
        self.values
            .values()
            .flat_map(HashMap::values)
            .map(HashMap::len)
            .sum()
    }

    /// Nothing stored
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
