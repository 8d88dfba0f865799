//! Session management for a console connection
//!
//! A Session owns the transport and the protocol engine of one console.
//! A receive task feeds inbound bytes through the engine and broadcasts
//! what it learned; a command task encodes and sends outbound commands.

use super::catalog::Catalog;
use super::codec::CommandPrefix;
use super::coordinate::{ChannelAliases, CommandOptions};
use super::engine::{EngineEvent, ScpEngine};
use super::feedback::{FeedbackRequest, FeedbackState};
use super::framing::ScpLineCodec;
use super::macro_recorder::{MacroSignal, RecordIndicator};
use super::preset::MacroPreset;
use super::store::Observation;
use super::transport::{TcpConfig, TcpTransport, TransportError, TransportStats, TransportTrait};
use bytes::BytesMut;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio_util::codec::Encoder;
use uuid::Uuid;

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not connected
    Disconnected,
    /// Connecting in progress
    Connecting,
    /// Connected and active
    Connected,
    /// Connection error occurred
    Error,
    /// Reconnecting after disconnect
    Reconnecting,
}

/// Session events
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// State changed
    StateChanged(SessionState),
    /// Error occurred
    Error(String),
    /// Console answered the identity query
    ProductIdentified(String),
    /// A parameter value changed
    Observed(Observation),
    /// A macro recording finished
    MacroFinalized(MacroPreset),
    /// A command line was written to the console
    CommandSent(String),
}

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Session name (for display)
    pub name: String,
    /// Console address
    pub tcp: TcpConfig,
    /// Auto-reconnect on disconnect
    pub auto_reconnect: bool,
    /// Reconnect delay in seconds
    pub reconnect_delay_secs: u64,
    /// Maximum reconnect attempts (0 = infinite)
    pub max_reconnect_attempts: u32,
}

impl SessionConfig {
    /// Create a new session configuration
    pub fn new(name: &str, tcp: TcpConfig) -> Self {
        Self {
            name: name.to_string(),
            tcp,
            auto_reconnect: false,
            reconnect_delay_secs: 5,
            max_reconnect_attempts: 0,
        }
    }
}

type SharedTransport = Arc<tokio::sync::Mutex<Box<dyn TransportTrait>>>;

/// Internal commands for session control
enum SessionCommand {
    Command {
        prefix: CommandPrefix,
        key: String,
        options: CommandOptions,
    },
    Raw(String),
    Macro(MacroSignal),
    Poll(Option<String>),
    Disconnect,
}

/// Active session
pub struct Session {
    /// Unique session ID
    id: Uuid,
    /// Session name
    name: String,
    /// Current state
    state: Arc<RwLock<SessionState>>,
    /// Transport instance
    transport: SharedTransport,
    /// Protocol engine
    engine: Arc<Mutex<ScpEngine>>,
    /// Registered feedbacks, polled on connect and after scene recalls
    feedbacks: Arc<RwLock<Vec<FeedbackRequest>>>,
    /// Event broadcaster
    event_tx: broadcast::Sender<SessionEvent>,
    /// Command sender
    cmd_tx: mpsc::Sender<SessionCommand>,
}

impl Session {
    /// Connect to a console over TCP
    pub async fn connect(
        config: SessionConfig,
        catalog: Arc<Catalog>,
        aliases: ChannelAliases,
    ) -> Result<Self, TransportError> {
        let transport = Box::new(TcpTransport::new(config.tcp.clone()));
        Self::connect_with_transport(config, transport, ScpEngine::new(catalog, aliases)).await
    }

    /// Connect using an existing transport and engine
    pub async fn connect_with_transport(
        config: SessionConfig,
        mut transport: Box<dyn TransportTrait>,
        engine: ScpEngine,
    ) -> Result<Self, TransportError> {
        let id = Uuid::new_v4();
        let state = Arc::new(RwLock::new(SessionState::Connecting));
        let (event_tx, _) = broadcast::channel(1024);
        let (cmd_tx, cmd_rx) = mpsc::channel(256);

        transport.connect().await?;
        tracing::info!(
            "Connected to {}:{} ({})",
            config.tcp.host,
            config.tcp.port,
            engine.catalog().family()
        );

        let engine = Arc::new(Mutex::new(engine));
        let feedbacks = Arc::new(RwLock::new(Vec::new()));
        let transport: SharedTransport = Arc::new(tokio::sync::Mutex::new(transport));

        *state.write() = SessionState::Connected;
        let _ = event_tx.send(SessionEvent::StateChanged(SessionState::Connected));

        let registered = snapshot(&feedbacks, None);
        let greeting = engine.lock().on_connect(registered.iter());
        {
            let mut transport = transport.lock().await;
            write_lines(&mut **transport, &greeting, &event_tx).await?;
        }

        let session = Self {
            id,
            name: config.name.clone(),
            state: state.clone(),
            transport: transport.clone(),
            engine: engine.clone(),
            feedbacks: feedbacks.clone(),
            event_tx: event_tx.clone(),
            cmd_tx,
        };

        // Spawn receive loop
        let rx_state = state.clone();
        let rx_transport = transport.clone();
        let rx_engine = engine.clone();
        let rx_feedbacks = feedbacks.clone();
        let rx_event_tx = event_tx.clone();

        tokio::spawn(async move {
            loop {
                if *rx_state.read() != SessionState::Connected {
                    break;
                }

                let data = {
                    let mut transport = rx_transport.lock().await;
                    transport.receive().await
                };

                match data {
                    Ok(bytes) if !bytes.is_empty() => {
                        let events = rx_engine.lock().feed(&bytes);
                        for event in events {
                            let event = match event {
                                EngineEvent::ProductIdentified(name) => {
                                    SessionEvent::ProductIdentified(name)
                                }
                                EngineEvent::Observed(obs) => SessionEvent::Observed(obs),
                            };
                            let _ = rx_event_tx.send(event);
                        }
                    }
                    Ok(_) => {
                        // No data, continue
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                    Err(e) => {
                        rx_engine.lock().on_status_change();
                        if *rx_state.read() == SessionState::Disconnected {
                            break;
                        }

                        if matches!(e, TransportError::Disconnected) {
                            tracing::warn!("Console closed the connection");
                        } else {
                            tracing::error!("Receive failed: {}", e);
                            let _ = rx_event_tx.send(SessionEvent::Error(e.to_string()));
                        }

                        let resumed = config.auto_reconnect
                            && reconnect(
                                &config,
                                &rx_state,
                                &rx_transport,
                                &rx_engine,
                                &rx_feedbacks,
                                &rx_event_tx,
                            )
                            .await;

                        if !resumed {
                            let final_state = if matches!(e, TransportError::Disconnected) {
                                SessionState::Disconnected
                            } else {
                                SessionState::Error
                            };
                            *rx_state.write() = final_state;
                            let _ = rx_event_tx.send(SessionEvent::StateChanged(final_state));
                            break;
                        }
                    }
                }
            }
        });

        // Spawn command handler
        let cmd_state = state;
        let cmd_transport = transport;
        let cmd_engine = engine;
        let cmd_feedbacks = feedbacks;
        let cmd_event_tx = event_tx;

        tokio::spawn(async move {
            let mut cmd_rx = cmd_rx;
            while let Some(cmd) = cmd_rx.recv().await {
                let lines = match cmd {
                    SessionCommand::Command {
                        prefix,
                        key,
                        options,
                    } => {
                        let registered = snapshot(&cmd_feedbacks, None);
                        let engine = cmd_engine.lock();
                        match engine.command(prefix, &key, &options) {
                            Some(encoded) if encoded.repoll => {
                                let mut lines = vec![encoded.line];
                                lines.extend(engine.poll(registered.iter()));
                                lines
                            }
                            Some(encoded) => vec![encoded.line],
                            None => {
                                tracing::debug!("Nothing to send for '{}'", key);
                                continue;
                            }
                        }
                    }
                    SessionCommand::Raw(line) => vec![line],
                    SessionCommand::Macro(signal) => {
                        let finished = cmd_engine.lock().macro_signal(signal);
                        if let Some(preset) = finished {
                            let _ = cmd_event_tx.send(SessionEvent::MacroFinalized(preset));
                        }
                        continue;
                    }
                    SessionCommand::Poll(only) => {
                        let registered = snapshot(&cmd_feedbacks, only.as_deref());
                        cmd_engine.lock().poll(registered.iter())
                    }
                    SessionCommand::Disconnect => {
                        let mut transport = cmd_transport.lock().await;
                        *cmd_state.write() = SessionState::Disconnected;
                        let _ = transport.disconnect().await;
                        cmd_engine.lock().on_status_change();
                        let _ = cmd_event_tx
                            .send(SessionEvent::StateChanged(SessionState::Disconnected));
                        break;
                    }
                };

                if *cmd_state.read() != SessionState::Connected {
                    tracing::info!("Socket not connected, dropping {} line(s)", lines.len());
                    continue;
                }

                let mut transport = cmd_transport.lock().await;
                if let Err(e) = write_lines(&mut **transport, &lines, &cmd_event_tx).await {
                    let _ = cmd_event_tx.send(SessionEvent::Error(e.to_string()));
                }
            }
        });

        Ok(session)
    }

    /// Get session ID
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Get session name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get current state
    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    /// Check if connected
    pub fn is_connected(&self) -> bool {
        *self.state.read() == SessionState::Connected
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Set a parameter
    pub async fn set(&self, key: &str, options: CommandOptions) -> Result<(), TransportError> {
        self.command(CommandPrefix::Set, key, options).await
    }

    /// Query a parameter; the answer arrives as an `Observed` event
    pub async fn get(&self, key: &str, options: CommandOptions) -> Result<(), TransportError> {
        self.command(CommandPrefix::Get, key, options).await
    }

    async fn command(
        &self,
        prefix: CommandPrefix,
        key: &str,
        options: CommandOptions,
    ) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        self.dispatch(SessionCommand::Command {
            prefix,
            key: key.to_string(),
            options,
        })
        .await
    }

    /// Send a raw command line
    pub async fn send_raw(&self, line: &str) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        self.dispatch(SessionCommand::Raw(line.to_string())).await
    }

    /// Forward a record-control signal to the macro recorder. A finished
    /// macro is broadcast as `MacroFinalized`.
    pub async fn macro_signal(&self, signal: MacroSignal) -> Result<(), TransportError> {
        self.dispatch(SessionCommand::Macro(signal)).await
    }

    /// Register a feedback and query its current value
    pub async fn register_feedback(&self, request: FeedbackRequest) -> Result<String, TransportError> {
        let id = request.id.clone();
        self.feedbacks.write().push(request);
        if self.is_connected() {
            self.dispatch(SessionCommand::Poll(Some(id.clone()))).await?;
        }
        Ok(id)
    }

    /// Remove a feedback by ID
    pub fn unregister_feedback(&self, id: &str) {
        self.feedbacks.write().retain(|fb| fb.id != id);
    }

    /// Registered feedbacks
    pub fn feedbacks(&self) -> Vec<FeedbackRequest> {
        self.feedbacks.read().clone()
    }

    /// Evaluate a feedback against the current state
    pub fn feedback(&self, request: &FeedbackRequest) -> FeedbackState {
        self.engine.lock().feedback(request)
    }

    /// Record-control feedback
    pub fn indicator(&self) -> Option<RecordIndicator> {
        self.engine.lock().indicator()
    }

    /// Product name reported by the console
    pub fn product_name(&self) -> Option<String> {
        self.engine.lock().product_name().map(str::to_string)
    }

    /// Poll every registered feedback
    pub async fn poll(&self) -> Result<(), TransportError> {
        self.dispatch(SessionCommand::Poll(None)).await
    }

    /// Replace the catalog and channel aliases
    pub fn reload(&self, catalog: Arc<Catalog>, aliases: ChannelAliases) {
        self.engine.lock().reload(catalog, aliases);
    }

    /// Disconnect the session
    pub async fn disconnect(&self) -> Result<(), TransportError> {
        self.dispatch(SessionCommand::Disconnect).await
    }

    /// Get connection statistics
    pub async fn stats(&self) -> TransportStats {
        let transport = self.transport.lock().await;
        transport.stats()
    }

    /// Get connection info string
    pub async fn connection_info(&self) -> String {
        let transport = self.transport.lock().await;
        transport.connection_info()
    }

    async fn dispatch(&self, cmd: SessionCommand) -> Result<(), TransportError> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|e| TransportError::SendError(e.to_string()))
    }
}

/// Copy of the registered feedbacks, optionally a single one. Taken before
/// the engine lock so the two locks are never held together.
fn snapshot(feedbacks: &RwLock<Vec<FeedbackRequest>>, only: Option<&str>) -> Vec<FeedbackRequest> {
    feedbacks
        .read()
        .iter()
        .filter(|fb| only.map_or(true, |id| fb.id == id))
        .cloned()
        .collect()
}

/// Write command lines, newline-terminated
async fn write_lines(
    transport: &mut dyn TransportTrait,
    lines: &[String],
    event_tx: &broadcast::Sender<SessionEvent>,
) -> Result<(), TransportError> {
    let mut codec = ScpLineCodec;
    for line in lines {
        let mut buf = BytesMut::new();
        codec.encode(line.as_str(), &mut buf)?;
        tracing::debug!("Sending: '{}'", line);
        transport.send(&buf).await?;
        let _ = event_tx.send(SessionEvent::CommandSent(line.clone()));
    }
    Ok(())
}

/// Try to re-establish the connection. Returns `true` once connected again.
async fn reconnect(
    config: &SessionConfig,
    state: &Arc<RwLock<SessionState>>,
    transport: &SharedTransport,
    engine: &Arc<Mutex<ScpEngine>>,
    feedbacks: &Arc<RwLock<Vec<FeedbackRequest>>>,
    event_tx: &broadcast::Sender<SessionEvent>,
) -> bool {
    *state.write() = SessionState::Reconnecting;
    let _ = event_tx.send(SessionEvent::StateChanged(SessionState::Reconnecting));

    let mut attempt: u32 = 0;
    loop {
        if config.max_reconnect_attempts > 0 && attempt >= config.max_reconnect_attempts {
            tracing::warn!("Giving up after {} reconnect attempts", attempt);
            return false;
        }
        attempt += 1;

        tokio::time::sleep(Duration::from_secs(config.reconnect_delay_secs)).await;
        if *state.read() != SessionState::Reconnecting {
            return false;
        }

        let mut transport = transport.lock().await;
        match transport.connect().await {
            Ok(()) => {
                tracing::info!("Reconnected to {}", transport.connection_info());
                let registered = snapshot(feedbacks, None);
                let greeting = engine.lock().on_connect(registered.iter());
                *state.write() = SessionState::Connected;
                let _ = event_tx.send(SessionEvent::StateChanged(SessionState::Connected));
                if let Err(e) = write_lines(&mut **transport, &greeting, event_tx).await {
                    let _ = event_tx.send(SessionEvent::Error(e.to_string()));
                }
                return true;
            }
            Err(e) => {
                tracing::warn!("Reconnect attempt {} failed: {}", attempt, e);
            }
        }
    }
}
