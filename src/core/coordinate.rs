//! Coordinate options from the action and feedback layers
//!
//! An X of zero or below is an indirection: `-N` selects the channel
//! configured in alias slot `N`.

use super::catalog::CUSTOM_CHANNEL_SLOTS;
use super::codec::{CommandValue, Coordinate};
use serde::{Deserialize, Serialize};

/// Channels assigned to the alias slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelAliases {
    channels: [Option<u32>; CUSTOM_CHANNEL_SLOTS],
}

impl ChannelAliases {
    /// Create from the configured channels
    pub fn new(channels: [Option<u32>; CUSTOM_CHANNEL_SLOTS]) -> Self {
        Self { channels }
    }

    /// Channel for alias slot `slot` (1-based)
    pub fn channel(&self, slot: usize) -> Option<u32> {
        slot.checked_sub(1)
            .and_then(|i| self.channels.get(i).copied().flatten())
            .filter(|&ch| ch > 0)
    }

    /// Resolve a raw X option. Absent means channel 1.
    pub fn resolve_x(&self, x: Option<i32>) -> Option<u32> {
        match x {
            None => Some(1),
            Some(x) if x > 0 => u32::try_from(x).ok(),
            Some(x) => self.channel(x.unsigned_abs() as usize),
        }
    }
}

/// Options supplied with an action or feedback
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommandOptions {
    /// Channel, scene number, or alias reference
    pub x: Option<i32>,
    /// Second axis or scene bank (1-based)
    pub y: Option<u32>,
    /// Value for `set`, or the expected value for a feedback
    pub value: Option<CommandValue>,
}

impl CommandOptions {
    /// Options for a plain channel
    pub fn channel(x: i32) -> Self {
        Self {
            x: Some(x),
            ..Self::default()
        }
    }

    /// Set the Y coordinate
    #[must_use]
    pub fn y(mut self, y: u32) -> Self {
        self.y = Some(y);
        self
    }

    /// Set the value
    #[must_use]
    pub fn value(mut self, value: CommandValue) -> Self {
        self.value = Some(value);
        self
    }

    /// Resolve to a wire-ready coordinate
    pub fn coordinate(&self, aliases: &ChannelAliases) -> Option<Coordinate> {
        let x = aliases.resolve_x(self.x)?;
        Some(Coordinate::new(x, self.y))
    }
}
