//! Per-connection protocol engine
//!
//! Owns everything one console connection needs and nothing async:
//! - inbound: chunk → framer → tokenizer → resolver → state store → recorder
//! - outbound: key + options → encoded command line
//! - lifecycle: identity query and feedback poll on connect
//!
//! The session drives it from its tasks; tests drive it directly.

use super::catalog::{Catalog, ParameterDefinition};
use super::codec::{build_command, tokenize, CommandPrefix, EncodedCommand};
use super::coordinate::{ChannelAliases, CommandOptions};
use super::feedback::{self, FeedbackRequest, FeedbackState};
use super::framing::{FramedLine, LineFramer, IDENTITY_QUERY};
use super::macro_recorder::{MacroRecorder, MacroSignal, RecordIndicator, RecorderState};
use super::preset::MacroPreset;
use super::store::{Observation, StateStore};
use std::sync::Arc;

/// Something the engine learned from the console
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Reply to the identity query
    ProductIdentified(String),
    /// A parameter value was stored
    Observed(Observation),
}

/// Protocol engine for one connection
#[derive(Debug)]
pub struct ScpEngine {
    catalog: Arc<Catalog>,
    store: StateStore,
    recorder: MacroRecorder,
    framer: LineFramer,
    aliases: ChannelAliases,
    product_name: Option<String>,
}

impl ScpEngine {
    /// Create an engine over a loaded catalog
    pub fn new(catalog: Arc<Catalog>, aliases: ChannelAliases) -> Self {
        Self {
            catalog,
            store: StateStore::new(),
            recorder: MacroRecorder::new(),
            framer: LineFramer::new(),
            aliases,
            product_name: None,
        }
    }

    /// Feed raw bytes from the transport
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<EngineEvent> {
        self.framer
            .feed(chunk)
            .into_iter()
            .filter_map(|line| match line {
                FramedLine::Identity(product) => {
                    tracing::info!("Device found: {}", product);
                    self.product_name = Some(product.clone());
                    Some(EngineEvent::ProductIdentified(product))
                }
                FramedLine::Record(line) => self.handle_line(&line),
            })
            .collect()
    }

    /// Process one complete record line
    pub fn handle_line(&mut self, line: &str) -> Option<EngineEvent> {
        tracing::debug!("Received: '{}'", line);

        let Some(record) = tokenize(line) else {
            tracing::debug!("Malformed line discarded: '{}'", line);
            return None;
        };
        let address = record.address.as_deref()?;

        let Some(entry) = self.catalog.resolve(address) else {
            tracing::debug!("Unknown command received: '{}'", address);
            return None;
        };

        let observation = self.store.observe(entry, &record, self.catalog.family())?;
        if self.recorder.is_recording() {
            self.recorder.record(entry, &observation);
        }
        Some(EngineEvent::Observed(observation))
    }

    /// Encode a command for `key`. `None` means there is nothing to send.
    pub fn command(
        &self,
        prefix: CommandPrefix,
        key: &str,
        options: &CommandOptions,
    ) -> Option<EncodedCommand> {
        let Some(entry) = self.catalog.get(key) else {
            tracing::debug!("No catalog entry for '{}'", key);
            return None;
        };
        self.encode(prefix, entry, options)
    }

    fn encode(
        &self,
        prefix: CommandPrefix,
        entry: &ParameterDefinition,
        options: &CommandOptions,
    ) -> Option<EncodedCommand> {
        let coordinate = options.coordinate(&self.aliases)?;
        build_command(
            prefix,
            entry,
            self.catalog.family(),
            coordinate,
            options.value.as_ref(),
            &self.store,
        )
    }

    /// `get` commands refreshing every registered feedback
    pub fn poll<'a, I>(&self, feedbacks: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a FeedbackRequest>,
    {
        feedbacks
            .into_iter()
            .filter_map(|fb| self.command(CommandPrefix::Get, &fb.key, &fb.options))
            .map(|cmd| cmd.line)
            .collect()
    }

    /// Lines to send right after the connection is established
    pub fn on_connect<'a, I>(&mut self, feedbacks: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a FeedbackRequest>,
    {
        self.framer.reset();
        let mut lines = vec![IDENTITY_QUERY.to_string()];
        lines.extend(self.poll(feedbacks));
        lines
    }

    /// Connection status changed; a partial line can never complete
    pub fn on_status_change(&mut self) {
        self.framer.reset();
    }

    /// Replace the catalog (configuration reload). Stored values stay.
    pub fn reload(&mut self, catalog: Arc<Catalog>, aliases: ChannelAliases) {
        self.catalog = catalog;
        self.aliases = aliases;
    }

    /// Apply a record-control signal. Returns the preset of a finished
    /// macro.
    pub fn macro_signal(&mut self, signal: MacroSignal) -> Option<MacroPreset> {
        self.recorder
            .handle(signal)
            .map(|finished| MacroPreset::from_macro(&finished, &self.catalog))
    }

    /// Evaluate a feedback against the current state
    pub fn feedback(&self, request: &FeedbackRequest) -> FeedbackState {
        feedback::evaluate(&self.catalog, &self.store, &self.aliases, request)
    }

    /// Record-control feedback
    pub fn indicator(&self) -> Option<RecordIndicator> {
        self.recorder.indicator()
    }

    /// Recorder state
    pub fn recorder_state(&self) -> RecorderState {
        self.recorder.state()
    }

    /// Catalog in use
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Current state mirror
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Product name reported by the console
    pub fn product_name(&self) -> Option<&str> {
        self.product_name.as_deref()
    }
}
