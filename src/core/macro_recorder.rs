//! Macro Recording System
//!
//! Captures parameter changes reported by the console into a replayable
//! sequence. The recording control sends three signals: `Start` on press,
//! `Latch` if the control is still held after a short delay, and `Unlatch`
//! on release. Whichever of `Latch`/`Unlatch` arrives first decides whether
//! the finished macro is a latching control.

use super::catalog::{ParamType, ParameterDefinition};
use super::store::{Observation, Value};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// One captured parameter change (1-based coordinates)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroEntry {
    /// Normalized key of the catalog entry
    pub key: String,
    /// 1-based X
    pub x: u32,
    /// 1-based Y
    pub y: u32,
    /// Value to apply
    pub value: Value,
}

/// A recorded macro
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Macro {
    /// Unique ID
    pub id: String,
    /// Display label (`Macro N`)
    pub label: String,
    /// Recording sequence number
    pub sequence: u32,
    /// Releasing the trigger keeps the control engaged
    pub latch: bool,
    /// Captured entries in first-seen order
    pub entries: Vec<MacroEntry>,
    /// Created timestamp
    pub created: DateTime<Local>,
    /// Last modified
    pub modified: DateTime<Local>,
}

impl Macro {
    /// Create new empty macro
    pub fn new(sequence: u32) -> Self {
        let now = Local::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            label: format!("Macro {sequence}"),
            sequence,
            latch: false,
            entries: Vec::new(),
            created: now,
            modified: now,
        }
    }

    /// Add an entry. A later change to the same coordinate replaces the value
    /// in place.
    pub fn record(&mut self, entry: MacroEntry) {
        match self
            .entries
            .iter_mut()
            .find(|e| e.key == entry.key && e.x == entry.x && e.y == entry.y)
        {
            Some(existing) => existing.value = entry.value,
            None => self.entries.push(entry),
        }
        self.modified = Local::now();
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No entries captured
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Latch decision while recording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatchMode {
    /// Neither latch nor unlatch received yet
    Pending,
    /// Control held past the latch delay
    Latched,
    /// Control released before the latch delay
    OneShot,
}

/// Macro recorder state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    /// Never recorded
    Idle,
    /// Capturing observations
    Recording(LatchMode),
    /// Last recording finished
    Stopped,
}

/// Signal from the recording control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MacroSignal {
    /// Start recording, or stop if already recording
    Start,
    /// Keep the macro engaged after release
    Latch,
    /// Make the macro one-shot
    Unlatch,
}

/// What the record-button feedback should show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordIndicator {
    /// Recording, latch undecided or one-shot
    Recording,
    /// Recording a latching macro
    RecordingLatched,
}

/// Macro recorder
#[derive(Debug)]
pub struct MacroRecorder {
    state: RecorderState,
    recording: Option<Macro>,
    count: u32,
}

impl Default for MacroRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl MacroRecorder {
    /// Create new recorder
    pub fn new() -> Self {
        Self {
            state: RecorderState::Idle,
            recording: None,
            count: 0,
        }
    }

    /// Apply a control signal. Returns the finished macro when a recording
    /// with at least one entry stops.
    pub fn handle(&mut self, signal: MacroSignal) -> Option<Macro> {
        match signal {
            MacroSignal::Start => self.start(),
            MacroSignal::Latch => {
                self.latch();
                None
            }
            MacroSignal::Unlatch => {
                self.unlatch();
                None
            }
        }
    }

    /// Start recording, or stop the current recording
    pub fn start(&mut self) -> Option<Macro> {
        if self.is_recording() {
            return self.stop();
        }

        self.count += 1;
        self.recording = Some(Macro::new(self.count));
        self.state = RecorderState::Recording(LatchMode::Pending);
        tracing::info!("Recording macro {}", self.count);
        None
    }

    fn stop(&mut self) -> Option<Macro> {
        self.state = RecorderState::Stopped;
        let finished = self.recording.take()?;

        if finished.is_empty() {
            tracing::info!("Discarding empty {}", finished.label);
            self.count -= 1;
            None
        } else {
            tracing::info!("Finished {} with {} entries", finished.label, finished.len());
            Some(finished)
        }
    }

    /// Arm the latch flag (only before the latch decision)
    pub fn latch(&mut self) {
        if self.state == RecorderState::Recording(LatchMode::Pending) {
            if let Some(ref mut current) = self.recording {
                current.latch = true;
            }
            self.state = RecorderState::Recording(LatchMode::Latched);
        }
    }

    /// Mark the macro one-shot (only before the latch decision)
    pub fn unlatch(&mut self) {
        if self.state == RecorderState::Recording(LatchMode::Pending) {
            if let Some(ref mut current) = self.recording {
                current.latch = false;
            }
            self.state = RecorderState::Recording(LatchMode::OneShot);
        }
    }

    /// Capture an observation while recording
    pub fn record(&mut self, entry: &ParameterDefinition, observation: &Observation) {
        let Some(ref mut current) = self.recording else {
            return;
        };

        let captured = match entry.param_type {
            ParamType::Integer | ParamType::Binary | ParamType::String => MacroEntry {
                key: observation.key.clone(),
                x: observation.x,
                y: observation.y,
                value: observation.value.clone(),
            },
            // The scene number rides in the value
            ParamType::Scene => match observation.value.as_int() {
                Some(scene) if scene > 0 => MacroEntry {
                    key: observation.key.clone(),
                    x: observation.x,
                    y: observation.y,
                    value: observation.value.clone(),
                },
                _ => return,
            },
            ParamType::Other(_) => return,
        };

        current.record(captured);
    }

    /// Get current state
    pub fn state(&self) -> RecorderState {
        self.state
    }

    /// Is recording
    pub fn is_recording(&self) -> bool {
        matches!(self.state, RecorderState::Recording(_))
    }

    /// Get current recording
    pub fn current(&self) -> Option<&Macro> {
        self.recording.as_ref()
    }

    /// Macros created so far
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Record-button feedback
    pub fn indicator(&self) -> Option<RecordIndicator> {
        match self.state {
            RecorderState::Recording(LatchMode::Latched) => Some(RecordIndicator::RecordingLatched),
            RecorderState::Recording(_) => Some(RecordIndicator::Recording),
            RecorderState::Idle | RecorderState::Stopped => None,
        }
    }
}
