//! Core module containing the SCP protocol machinery
//!
//! This module provides:
//! - Parameter catalog and console family strategies
//! - Wire codec (tokenizer and command builder)
//! - Address resolution and the live state store
//! - Macro recording and preset generation
//! - Line framing, the per-connection engine, and the async session
//! - TCP transport

pub mod catalog;
pub mod codec;
pub mod coordinate;
pub mod engine;
pub mod family;
pub mod feedback;
pub mod framing;
pub mod macro_recorder;
pub mod preset;
pub mod resolver;
pub mod session;
pub mod store;
pub mod transport;
