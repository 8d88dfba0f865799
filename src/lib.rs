//! # Scpilot Core Library
//!
//! Client library for the SCP line protocol spoken by professional audio
//! mixing consoles (CL/QL, TF, Rivage PM):
//! - Parameter catalogs per console family
//! - Tokenizing responses and encoding `get`/`set`/scene commands
//! - A live mirror of console state driving feedbacks
//! - Macro recording into replayable presets
//! - An async TCP session with auto-reconnect
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use scpilot_core::{AppConfig, Catalog, CommandOptions, CommandValue, Session, SessionEvent};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::load_default()?;
//!     let catalog = Catalog::from_dir(
//!         Path::new("catalogs"),
//!         config.console.model,
//!         config.labels(),
//!     )?;
//!     let session =
//!         Session::connect(config.session_config(), Arc::new(catalog), config.aliases()).await?;
//!
//!     let mut rx = session.subscribe();
//!     session
//!         .set(
//!             "MIXER_Current/InCh/Fader/On",
//!             CommandOptions::channel(1).value(CommandValue::Toggle),
//!         )
//!         .await?;
//!
//!     while let Ok(event) = rx.recv().await {
//!         if let SessionEvent::Observed(obs) = event {
//!             println!("{} [{},{}] = {}", obs.key, obs.x, obs.y, obs.value);
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod core;

// Re-exports for convenience
pub use crate::cli::{CliResult, ExitCodes};
pub use crate::config::{AppConfig, ConfigError};
pub use crate::core::catalog::{Catalog, CatalogError, ChannelLabels, ParamType, ParameterDefinition};
pub use crate::core::codec::{
    build_command, tokenize, CommandPrefix, CommandRecord, CommandValue, Coordinate, EncodedCommand,
};
pub use crate::core::coordinate::{ChannelAliases, CommandOptions};
pub use crate::core::engine::{EngineEvent, ScpEngine};
pub use crate::core::family::{ConsoleFamily, SceneEncoding};
pub use crate::core::feedback::{FeedbackRequest, FeedbackState};
pub use crate::core::framing::{LineFramer, ScpLineCodec};
pub use crate::core::macro_recorder::{Macro, MacroRecorder, MacroSignal, RecorderState};
pub use crate::core::preset::{record_button, MacroPreset};
pub use crate::core::session::{Session, SessionConfig, SessionEvent, SessionState};
pub use crate::core::store::{Observation, StateStore, Value};
pub use crate::core::transport::{TcpConfig, TcpTransport, TransportError, TransportTrait};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
