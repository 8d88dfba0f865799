//! CLI Exit Codes
//!
//! Standard exit codes for CLI operations and automation.

use crate::config::ConfigError;
use crate::core::catalog::CatalogError;
use crate::core::transport::TransportError;
use std::process::ExitCode;

/// Exit code constants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCodes;

impl ExitCodes {
    /// Success
    pub const SUCCESS: u8 = 0;

    /// General error
    pub const ERROR: u8 = 1;

    /// Invalid arguments
    pub const INVALID_ARGS: u8 = 2;

    /// Connection failed
    pub const CONNECTION_FAILED: u8 = 3;

    /// Connection timeout
    pub const TIMEOUT: u8 = 4;

    /// Catalog missing or unreadable
    pub const CATALOG_ERROR: u8 = 5;

    /// Configuration error
    pub const CONFIG_ERROR: u8 = 6;

    /// Key not present in the catalog
    pub const UNKNOWN_COMMAND: u8 = 7;

    /// Nothing could be encoded for the request
    pub const UNSUPPORTED_COMMAND: u8 = 8;

    /// Console did not answer in time
    pub const NO_RESPONSE: u8 = 9;

    /// User cancelled
    pub const CANCELLED: u8 = 10;

    /// Internal error
    pub const INTERNAL_ERROR: u8 = 127;
}

/// CLI operation result
#[derive(Debug)]
pub enum CliResult {
    /// Success with optional message
    Success(Option<String>),

    /// Error with code and message
    Error(u8, String),
}

impl CliResult {
    /// Success without message
    pub fn success() -> Self {
        Self::Success(None)
    }

    /// Error with an explicit code
    pub fn error(code: u8, msg: impl Into<String>) -> Self {
        Self::Error(code, msg.into())
    }

    /// Key not in the catalog
    pub fn unknown_command(key: &str) -> Self {
        Self::Error(ExitCodes::UNKNOWN_COMMAND, format!("Unknown command: {key}"))
    }

    /// Map any error from a CLI run to its exit code
    pub fn from_error(err: &anyhow::Error) -> Self {
        if let Some(e) = err.downcast_ref::<TransportError>() {
            return Self::from(e);
        }
        if let Some(e) = err.downcast_ref::<CatalogError>() {
            return Self::from(e);
        }
        if let Some(e) = err.downcast_ref::<ConfigError>() {
            return Self::from(e);
        }
        if let Some(result) = err.downcast_ref::<CliResult>() {
            return Self::Error(result.code(), result.to_string());
        }
        if let Some(e) = err.downcast_ref::<std::io::Error>() {
            return Self::Error(Self::io_code(e), format!("{err:#}"));
        }
        Self::Error(ExitCodes::ERROR, format!("{err:#}"))
    }

    fn io_code(err: &std::io::Error) -> u8 {
        use std::io::ErrorKind;

        match err.kind() {
            ErrorKind::ConnectionRefused | ErrorKind::ConnectionReset => ExitCodes::CONNECTION_FAILED,
            ErrorKind::TimedOut => ExitCodes::TIMEOUT,
            ErrorKind::InvalidInput => ExitCodes::INVALID_ARGS,
            _ => ExitCodes::ERROR,
        }
    }

    /// Get exit code
    pub fn code(&self) -> u8 {
        match self {
            Self::Success(_) => ExitCodes::SUCCESS,
            Self::Error(code, _) => *code,
        }
    }

    /// Get message
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success(Some(msg)) | Self::Error(_, msg) => Some(msg),
            Self::Success(None) => None,
        }
    }

    /// Convert to `ExitCode`
    pub fn to_exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }

    /// Is success?
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

impl std::fmt::Display for CliResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message().unwrap_or(exit_code_description(self.code())))
    }
}

impl std::error::Error for CliResult {}

impl From<std::io::Error> for CliResult {
    fn from(err: std::io::Error) -> Self {
        Self::Error(Self::io_code(&err), err.to_string())
    }
}

impl From<&TransportError> for CliResult {
    fn from(err: &TransportError) -> Self {
        let code = match err {
            TransportError::Timeout(_) => ExitCodes::TIMEOUT,
            TransportError::InvalidConfiguration(_) => ExitCodes::CONFIG_ERROR,
            TransportError::IoError(e) => Self::io_code(e),
            TransportError::ConnectionFailed(_)
            | TransportError::NotConnected
            | TransportError::Disconnected
            | TransportError::SendError(_) => ExitCodes::CONNECTION_FAILED,
        };
        Self::Error(code, err.to_string())
    }
}

impl From<&CatalogError> for CliResult {
    fn from(err: &CatalogError) -> Self {
        Self::Error(ExitCodes::CATALOG_ERROR, err.to_string())
    }
}

impl From<&ConfigError> for CliResult {
    fn from(err: &ConfigError) -> Self {
        Self::Error(ExitCodes::CONFIG_ERROR, err.to_string())
    }
}

const ALL_CODES: [u8; 12] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 127];

/// Exit code description
pub fn exit_code_description(code: u8) -> &'static str {
    match code {
        0 => "Success",
        1 => "General error",
        2 => "Invalid arguments",
        3 => "Connection failed",
        4 => "Connection timeout",
        5 => "Catalog error",
        6 => "Configuration error",
        7 => "Unknown command",
        8 => "Unsupported command",
        9 => "No response from console",
        10 => "Operation cancelled",
        127 => "Internal error",
        _ => "Unknown error",
    }
}

/// Print exit code table
pub fn print_exit_codes() {
    println!("Exit Codes:");
    for code in ALL_CODES {
        println!("  {:>3}  {}", code, exit_code_description(code));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::family::ConsoleFamily;

    #[test]
    fn test_cli_result() {
        let success = CliResult::success();
        assert!(success.is_success());
        assert_eq!(success.code(), 0);

        let error = CliResult::error(3, "Connection failed");
        assert!(!error.is_success());
        assert_eq!(error.code(), 3);
        assert_eq!(error.message(), Some("Connection failed"));
    }

    #[test]
    fn test_from_transport_error() {
        assert_eq!(CliResult::from(&TransportError::Timeout(10)).code(), ExitCodes::TIMEOUT);
        assert_eq!(
            CliResult::from(&TransportError::ConnectionFailed("refused".into())).code(),
            ExitCodes::CONNECTION_FAILED
        );
    }

    #[test]
    fn test_from_anyhow() {
        let err = anyhow::Error::new(CatalogError::Empty(ConsoleFamily::Tf)).context("loading catalog");
        assert_eq!(CliResult::from_error(&err).code(), ExitCodes::CATALOG_ERROR);

        let err = anyhow::Error::new(CliResult::unknown_command("MIXER_Nope"));
        let result = CliResult::from_error(&err);
        assert_eq!(result.code(), ExitCodes::UNKNOWN_COMMAND);
        assert_eq!(result.message(), Some("Unknown command: MIXER_Nope"));
    }

    #[test]
    fn test_descriptions_cover_all_codes() {
        for code in ALL_CODES {
            assert_ne!(exit_code_description(code), "Unknown error");
        }
    }
}
