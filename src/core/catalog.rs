//! Parameter catalog
//!
//! Loads the console-family parameter table, sorts it into a deterministic
//! order and classifies name and color parameters once at load time. A
//! [`Catalog`] is an immutable snapshot; a configuration change builds a new
//! one.

use super::codec::{record_status, split_tokens};
use super::family::ConsoleFamily;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

/// Version of the positional catalog record layout
pub const CATALOG_SCHEMA_VERSION: u32 = 1;

/// Number of user-configurable channel alias slots
pub const CUSTOM_CHANNEL_SLOTS: usize = 4;

/// Field of a catalog record line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogField {
    /// `OK` or `NOTIFY`
    Status,
    /// Listing verb (`prminfo`, `scninfo`)
    Command,
    /// Catalog index
    Index,
    /// Parameter address
    Address,
    /// X dimension
    X,
    /// Y dimension
    Y,
    /// Minimum value
    Min,
    /// Maximum value
    Max,
    /// Default value
    Default,
    /// Unit label
    Unit,
    /// Parameter type
    Type,
    /// UI hint
    Ui,
    /// Access mode
    Rw,
    /// Value scale
    Scale,
}

/// Positional layout of a catalog record, schema v1
pub const CATALOG_FIELDS: [CatalogField; 14] = [
    CatalogField::Status,
    CatalogField::Command,
    CatalogField::Index,
    CatalogField::Address,
    CatalogField::X,
    CatalogField::Y,
    CatalogField::Min,
    CatalogField::Max,
    CatalogField::Default,
    CatalogField::Unit,
    CatalogField::Type,
    CatalogField::Ui,
    CatalogField::Rw,
    CatalogField::Scale,
];

static LAYOUT_CHECK: LazyLock<Result<(), String>> = LazyLock::new(|| check_layout(&CATALOG_FIELDS));

fn check_layout(fields: &[CatalogField]) -> Result<(), String> {
    let mut seen = HashSet::new();
    for field in fields {
        if !seen.insert(field) {
            return Err(format!("field {field:?} appears twice in schema v{CATALOG_SCHEMA_VERSION}"));
        }
    }
    if fields.first() != Some(&CatalogField::Status) {
        return Err("record status must be the first field".to_string());
    }
    if !seen.contains(&CatalogField::Address) {
        return Err("schema has no address field".to_string());
    }
    Ok(())
}

/// Catalog errors
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Source file does not exist
    #[error("Catalog not found: {0}")]
    Missing(PathBuf),

    /// Source file could not be read
    #[error("Failed to read catalog {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// No records for the requested family
    #[error("No catalog records found for {0}")]
    Empty(ConsoleFamily),

    /// The field layout table is inconsistent
    #[error("Invalid catalog schema: {0}")]
    Schema(String),
}

/// Parameter value type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamType {
    /// Integer value
    Integer,
    /// Text value
    String,
    /// Binary value (sent like an integer)
    Binary,
    /// Scene recall / query
    Scene,
    /// Anything the protocol engine has no wire mapping for
    Other(String),
}

impl Default for ParamType {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<&str> for ParamType {
    fn from(s: &str) -> Self {
        match s {
            "integer" => Self::Integer,
            "string" => Self::String,
            "binary" => Self::Binary,
            "scene" => Self::Scene,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => f.write_str("integer"),
            Self::String => f.write_str("string"),
            Self::Binary => f.write_str("binary"),
            Self::Scene => f.write_str("scene"),
            Self::Other(raw) => f.write_str(raw),
        }
    }
}

/// One addressable console parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDefinition {
    /// Colon-delimited hierarchical address, unique within a catalog
    pub address: String,
    /// Numeric identifier for family-specific special cases
    pub index: u32,
    /// Cardinality of the X axis (1 = no dimension)
    pub dim_x: u32,
    /// Cardinality of the Y axis (1 = no dimension)
    pub dim_y: u32,
    /// Minimum value
    pub min: i64,
    /// Maximum value
    pub max: i64,
    /// Default value as written in the catalog
    pub default: String,
    /// Value type
    pub param_type: ParamType,
    /// Unit
    pub unit: String,
    /// Scale
    pub scale: String,
    /// Read/write flag
    pub rw: String,
    /// UI hint
    pub ui: String,
}

impl Default for ParameterDefinition {
    fn default() -> Self {
        Self {
            address: String::new(),
            index: 0,
            dim_x: 1,
            dim_y: 1,
            min: 0,
            max: 0,
            default: String::new(),
            param_type: ParamType::default(),
            unit: String::new(),
            scale: String::new(),
            rw: String::new(),
            ui: String::new(),
        }
    }
}

impl ParameterDefinition {
    /// Normalized key used by the state store and the action layer
    pub fn key(&self) -> String {
        address_key(&self.address)
    }

    /// Path after the first `/`, e.g. `InCh/Fader/Level`
    pub fn path(&self) -> &str {
        address_path(&self.address)
    }

    /// On/off parameter
    pub fn is_boolean(&self) -> bool {
        self.param_type == ParamType::Integer && self.max == 1
    }

    fn from_tokens(tokens: &[String]) -> Option<Self> {
        let mut def = Self::default();

        for (field, token) in CATALOG_FIELDS.iter().zip(tokens) {
            match field {
                CatalogField::Status | CatalogField::Command => {}
                CatalogField::Index => def.index = token.parse().unwrap_or(0),
                CatalogField::Address => def.address = token.clone(),
                CatalogField::X => def.dim_x = parse_dimension(token),
                CatalogField::Y => def.dim_y = parse_dimension(token),
                CatalogField::Min => def.min = token.parse().unwrap_or(0),
                CatalogField::Max => def.max = token.parse().unwrap_or(0),
                CatalogField::Default => def.default = token.clone(),
                CatalogField::Unit => def.unit = token.clone(),
                CatalogField::Type => def.param_type = ParamType::from(token.as_str()),
                CatalogField::Ui => def.ui = token.clone(),
                CatalogField::Rw => def.rw = token.clone(),
                CatalogField::Scale => def.scale = token.clone(),
            }
        }

        (!def.address.is_empty()).then_some(def)
    }
}

fn parse_dimension(token: &str) -> u32 {
    token.parse().unwrap_or(1).max(1)
}

/// Replace the colon delimiters so the address is usable as a key
pub fn address_key(address: &str) -> String {
    address.replace(':', "_")
}

/// Part of an address after the first `/`, or the whole address
pub fn address_path(address: &str) -> &str {
    address.find('/').map_or(address, |i| &address[i + 1..])
}

/// Channel selector choice offered to the action layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelChoice {
    /// Negative ids select a configured alias, positive ids a channel
    pub id: i32,
    /// Display label
    pub label: String,
}

/// Display labels for the channel alias slots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelLabels {
    custom: [String; CUSTOM_CHANNEL_SLOTS],
}

impl Default for ChannelLabels {
    fn default() -> Self {
        Self {
            custom: std::array::from_fn(|i| format!("My Channel {}", i + 1)),
        }
    }
}

impl ChannelLabels {
    /// Create with the four user-configured names
    pub fn new(custom: [String; CUSTOM_CHANNEL_SLOTS]) -> Self {
        Self { custom }
    }

    /// Label of alias slot `slot` (1-based)
    pub fn custom(&self, slot: usize) -> Option<&str> {
        slot.checked_sub(1)
            .and_then(|i| self.custom.get(i))
            .map(String::as_str)
    }

    /// Alias slots followed by channels `1..=channel_count`
    pub fn choices(&self, channel_count: u32) -> Vec<ChannelChoice> {
        let aliases = self.custom.iter().enumerate().map(|(i, label)| ChannelChoice {
            id: -(i as i32 + 1),
            label: label.clone(),
        });
        let channels = (1..=channel_count).map(|ch| ChannelChoice {
            id: ch as i32,
            label: format!("CH {ch}"),
        });
        aliases.chain(channels).collect()
    }
}

/// Entry of the ordered command listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandListing {
    /// Human readable label
    pub label: String,
    /// Normalized key
    pub key: String,
}

/// Immutable, sorted parameter catalog for one console family
#[derive(Debug, Clone)]
pub struct Catalog {
    family: ConsoleFamily,
    entries: Vec<ParameterDefinition>,
    keys: HashMap<String, usize>,
    name_keys: HashSet<String>,
    color_keys: HashSet<String>,
    labels: ChannelLabels,
}

impl Catalog {
    /// Parse catalog source text
    pub fn load(
        source: &str,
        family: ConsoleFamily,
        labels: ChannelLabels,
    ) -> Result<Self, CatalogError> {
        LAYOUT_CHECK
            .as_ref()
            .map_err(|e| CatalogError::Schema(e.clone()))?;

        let mut entries: Vec<ParameterDefinition> = Vec::new();
        let mut seen = HashSet::new();

        for line in source.split('\n') {
            if record_status(line).is_none() {
                continue;
            }
            let tokens = split_tokens(line);

            let Some(def) = ParameterDefinition::from_tokens(&tokens) else {
                continue;
            };

            if !seen.insert(def.address.clone()) {
                tracing::warn!("Duplicate catalog address ignored: {}", def.address);
                continue;
            }
            entries.push(def);
        }

        if entries.is_empty() {
            return Err(CatalogError::Empty(family));
        }

        entries.sort_by_cached_key(|e| e.path().to_lowercase());

        let keys = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.key(), i))
            .collect();

        let mut name_keys = HashSet::new();
        let mut color_keys = HashSet::new();
        for entry in &entries {
            if entry.address.ends_with("Name") {
                name_keys.insert(entry.key());
            } else if entry.address.ends_with("olor") {
                color_keys.insert(entry.key());
            }
        }

        tracing::info!(
            "Loaded {} catalog entries for {} ({} name, {} color)",
            entries.len(),
            family,
            name_keys.len(),
            color_keys.len()
        );

        Ok(Self {
            family,
            entries,
            keys,
            name_keys,
            color_keys,
            labels,
        })
    }

    /// Load a catalog file
    pub fn from_file(
        path: &Path,
        family: ConsoleFamily,
        labels: ChannelLabels,
    ) -> Result<Self, CatalogError> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CatalogError::Missing(path.to_path_buf())
            } else {
                CatalogError::Io {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;
        Self::load(&source, family, labels)
    }

    /// Load the family's default catalog file from a directory
    pub fn from_dir(
        dir: &Path,
        family: ConsoleFamily,
        labels: ChannelLabels,
    ) -> Result<Self, CatalogError> {
        Self::from_file(&dir.join(family.catalog_file_name()), family, labels)
    }

    /// Console family this catalog was loaded for
    pub fn family(&self) -> ConsoleFamily {
        self.family
    }

    /// Entries in catalog order
    pub fn entries(&self) -> &[ParameterDefinition] {
        &self.entries
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Catalog has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by normalized key
    pub fn get(&self, key: &str) -> Option<&ParameterDefinition> {
        self.keys.get(key).map(|&i| &self.entries[i])
    }

    /// Find the entry matching an inbound address
    pub fn resolve(&self, address: &str) -> Option<&ParameterDefinition> {
        super::resolver::resolve(self, address)
    }

    /// Key is a name parameter
    pub fn is_name_command(&self, key: &str) -> bool {
        self.name_keys.contains(key)
    }

    /// Key is a color parameter
    pub fn is_color_command(&self, key: &str) -> bool {
        self.color_keys.contains(key)
    }

    /// Channel alias labels
    pub fn channel_labels(&self) -> &ChannelLabels {
        &self.labels
    }

    /// Channel selector choices for an entry with `dim_x` channels
    pub fn channel_choices(&self, dim_x: u32) -> Vec<ChannelChoice> {
        self.labels.choices(dim_x)
    }

    /// Label shown for an entry
    pub fn label(&self, entry: &ParameterDefinition) -> String {
        if self.family == ConsoleFamily::Tf && entry.param_type == ParamType::Scene {
            "Scene/Bank".to_string()
        } else {
            entry.path().to_string()
        }
    }

    /// Ordered command listing
    pub fn command_listing(&self) -> Vec<CommandListing> {
        self.entries
            .iter()
            .map(|e| CommandListing {
                label: self.label(e),
                key: e.key(),
            })
            .collect()
    }
}
