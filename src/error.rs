//! Error types for the camera refresh engine.
//!
//! Remote failures never escape a refresh cycle; they are logged and the loop
//! keeps its schedule. Configuration and command errors are returned to the
//! caller that triggered them.

use thiserror::Error;

/// Failure reported by the surveillance station collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StationError {
    /// Transport-level failure (timeout, connection refused, HTTP status).
    #[error("Network error: {0}")]
    Network(String),

    /// The station answered, but the answer was unusable.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Rejected configuration value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid refresh rate for {kind}: {value} (must be a positive number of seconds)")]
    InvalidRefreshRate { kind: &'static str, value: i64 },

    #[error("Missing configuration parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid configuration parameter {name}: {value}")]
    InvalidParameter { name: String, value: String },
}

/// Outcome of a command that could not be carried out.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Command dispatch failed: {0}")]
    Dispatch(#[from] StationError),

    #[error("Unsupported channel: {0}")]
    UnsupportedChannel(String),

    #[error("Unsupported command {command} for channel {channel}")]
    UnsupportedCommand { channel: String, command: String },

    #[error("Camera {0} does not support PTZ")]
    PtzNotSupported(String),
}

pub type StationResult<T> = Result<T, StationError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type CommandResult<T> = Result<T, CommandError>;
