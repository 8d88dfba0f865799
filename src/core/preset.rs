//! Presets handed to the action layer
//!
//! A finished [`Macro`] becomes a [`MacroPreset`]: one `set` action and one
//! boolean feedback per captured entry. The record control itself is
//! described by [`record_button`].

use super::catalog::{Catalog, ParamType};
use super::codec::CommandValue;
use super::macro_recorder::{Macro, MacroEntry, MacroSignal};
use super::store::Value;
use serde::{Deserialize, Serialize};

/// Hold time after which the record control latches
pub const LATCH_DELAY_MS: u64 = 500;

/// A `set` command replayed by a preset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetAction {
    /// Unique ID
    pub id: String,
    /// Normalized key of the catalog entry
    pub key: String,
    /// 1-based X
    pub x: u32,
    /// 1-based Y
    pub y: u32,
    /// Value to send
    pub value: CommandValue,
}

/// Boolean feedback lit while the console matches the recorded value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetFeedback {
    /// Unique ID
    pub id: String,
    /// Normalized key of the catalog entry
    pub key: String,
    /// 1-based X
    pub x: u32,
    /// 1-based Y
    pub y: u32,
    /// Expected value
    pub value: Value,
}

/// Replayable preset built from a recorded macro
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroPreset {
    /// Macro ID
    pub id: String,
    /// Display label
    pub label: String,
    /// Control stays engaged after release
    pub latch: bool,
    /// Commands sent on press
    pub actions: Vec<PresetAction>,
    /// Feedbacks attached to the control
    pub feedbacks: Vec<PresetFeedback>,
    /// Signals sent on release; the control replaces the record control
    /// and keeps its unlatch
    pub release: Vec<ButtonStep>,
}

impl MacroPreset {
    /// Build the preset for a finished macro. On/off parameters replay as a
    /// toggle so pressing the control again undoes the change.
    pub fn from_macro(recorded: &Macro, catalog: &Catalog) -> Self {
        let actions = recorded
            .entries
            .iter()
            .map(|entry| {
                let toggles = catalog.get(&entry.key).is_some_and(|def| def.is_boolean());
                let value = match (&entry.value, toggles) {
                    (_, true) => CommandValue::Toggle,
                    (Value::Int(v), false) => CommandValue::Int(*v),
                    (Value::Text(s), false) => CommandValue::Text(s.clone()),
                };
                PresetAction {
                    id: uuid::Uuid::new_v4().to_string(),
                    key: entry.key.clone(),
                    x: replay_x(entry, catalog),
                    y: entry.y,
                    value,
                }
            })
            .collect();

        let feedbacks = recorded
            .entries
            .iter()
            .map(|entry| PresetFeedback {
                id: uuid::Uuid::new_v4().to_string(),
                key: entry.key.clone(),
                x: replay_x(entry, catalog),
                y: entry.y,
                value: entry.value.clone(),
            })
            .collect();

        Self {
            id: recorded.id.clone(),
            label: recorded.label.clone(),
            latch: recorded.latch,
            actions,
            feedbacks,
            release: vec![ButtonStep {
                signal: MacroSignal::Unlatch,
                delay_ms: 0,
            }],
        }
    }
}

/// X used on replay. Scene entries recall the recorded scene number.
fn replay_x(entry: &MacroEntry, catalog: &Catalog) -> u32 {
    let is_scene = catalog
        .get(&entry.key)
        .is_some_and(|def| def.param_type == ParamType::Scene);
    match entry.value.as_int() {
        Some(scene) if is_scene => u32::try_from(scene).unwrap_or(entry.x),
        _ => entry.x,
    }
}

/// Signal sent by a control, optionally delayed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonStep {
    /// Signal to send
    pub signal: MacroSignal,
    /// Delay after the press/release in milliseconds
    pub delay_ms: u64,
}

/// Definition of a control button
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonPreset {
    /// Category shown in the preset list
    pub category: String,
    /// Button text
    pub label: String,
    /// Steps on press
    pub press: Vec<ButtonStep>,
    /// Steps on release
    pub release: Vec<ButtonStep>,
}

/// The macro record control
pub fn record_button() -> ButtonPreset {
    ButtonPreset {
        category: "Macros".to_string(),
        label: "Record SCP Macro".to_string(),
        press: vec![
            ButtonStep {
                signal: MacroSignal::Start,
                delay_ms: 0,
            },
            ButtonStep {
                signal: MacroSignal::Latch,
                delay_ms: LATCH_DELAY_MS,
            },
        ],
        release: vec![ButtonStep {
            signal: MacroSignal::Unlatch,
            delay_ms: 0,
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::ChannelLabels;
    use crate::core::family::ConsoleFamily;

    const SOURCE: &str = "\
OK prminfo 1 \"MIXER:Current/InCh/Fader/On\" 72 1 0 1 1 \"\" integer any rw 1
OK prminfo 2 \"MIXER:Current/InCh/Fader/Level\" 72 1 -32768 1000 -32768 \"dB\" integer any rw 100
";

    #[test]
    fn test_preset_from_macro() {
        let catalog = Catalog::load(SOURCE, ConsoleFamily::ClQl, ChannelLabels::default()).unwrap();
        let mut recorded = Macro::new(3);
        recorded.latch = true;
        recorded.record(MacroEntry {
            key: "MIXER_Current/InCh/Fader/On".to_string(),
            x: 2,
            y: 1,
            value: Value::Int(0),
        });
        recorded.record(MacroEntry {
            key: "MIXER_Current/InCh/Fader/Level".to_string(),
            x: 2,
            y: 1,
            value: Value::Int(-500),
        });

        let preset = MacroPreset::from_macro(&recorded, &catalog);
        assert_eq!(preset.label, "Macro 3");
        assert!(preset.latch);
        assert_eq!(preset.actions.len(), 2);
        assert_eq!(preset.actions[0].value, CommandValue::Toggle);
        assert_eq!(preset.actions[1].value, CommandValue::Int(-500));
        assert_eq!(preset.feedbacks[0].value, Value::Int(0));
        assert_eq!(preset.release[0].signal, MacroSignal::Unlatch);
    }

    #[test]
    fn test_scene_entry_recalls_recorded_scene() {
        let source = "OK scninfo 4 \"MIXER:Lib/Scene\" 300 1 0 300 0 \"\" scene any rw 1\n";
        let catalog = Catalog::load(source, ConsoleFamily::ClQl, ChannelLabels::default()).unwrap();
        let mut recorded = Macro::new(1);
        for scene in [12, 14] {
            recorded.record(MacroEntry {
                key: "MIXER_Lib/Scene".to_string(),
                x: 1,
                y: 1,
                value: Value::Int(scene),
            });
        }

        let preset = MacroPreset::from_macro(&recorded, &catalog);
        assert_eq!(preset.actions.len(), 1);
        assert_eq!(preset.actions[0].x, 14);
        assert_eq!(preset.feedbacks[0].x, 14);
    }

    #[test]
    fn test_record_button() {
        let button = record_button();
        assert_eq!(button.press[0].signal, MacroSignal::Start);
        assert_eq!(button.press[1].delay_ms, LATCH_DELAY_MS);
        assert_eq!(button.release[0].signal, MacroSignal::Unlatch);
    }
}
