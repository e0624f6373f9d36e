//! Error types for swssh.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for swssh operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Remote-shell process errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Login handshake errors
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// No expected pattern within the wait budget
    #[error("Timeout: {0}")]
    Timeout(#[from] TimeoutError),

    /// Vendor or model could not be resolved
    #[error("Detection error: {0}")]
    Detection(#[from] DetectionError),

    /// A single command could not be executed
    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    /// Invalid options, host lists or command sources
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Trust-store repair errors
    #[error("Known hosts error: {0}")]
    KnownHosts(#[from] KnownHostsError),

    /// Transcript destination errors
    #[error("Transcript error: {0}")]
    Transcript(#[from] TranscriptError),
}

impl Error {
    /// Whether retrying the whole target later may succeed.
    ///
    /// Only a repaired host-key mismatch qualifies.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Auth(AuthError::HostKeyRepaired { .. }))
    }
}

/// Transport errors (process spawn, PTY I/O).
#[derive(Error, Debug)]
pub enum TransportError {
    /// The remote-shell client could not be started
    #[error("Failed to spawn '{program}': {message}")]
    Spawn { program: String, message: String },

    /// The PTY could not be allocated
    #[error("Failed to open PTY: {0}")]
    Pty(String),

    /// The process output stream ended
    #[error("Process closed")]
    Closed,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Login handshake errors.
#[derive(Error, Debug)]
pub enum AuthError {
    /// None of the login prompts appeared
    #[error("No login prompt from {host}:{port}")]
    NoLoginPrompt { host: String, port: u16 },

    /// The device asked for trust confirmation twice
    #[error("Repeated host trust confirmation from {host}:{port}")]
    RepeatedTrustPrompt { host: String, port: u16 },

    /// The password was asked for again after it was sent
    #[error("Credential rejected for user '{user}'")]
    Rejected { user: String },

    /// No command prompt followed the password
    #[error("No command prompt after login to {host}:{port}")]
    NoCommandPrompt { host: String, port: u16 },

    /// The cached host key did not match; the offending entry was removed
    #[error("Host key for {host}:{port} changed; removed {path}:{line}, retry later")]
    HostKeyRepaired {
        host: String,
        port: u16,
        path: PathBuf,
        line: usize,
    },

    /// The cached host key did not match and could not be repaired
    #[error("Host key verification failed for {host}:{port}")]
    HostKeyMismatch { host: String, port: u16 },
}

/// Protocol stage a wait belonged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Login,
    Detection,
    Pagination,
    Command,
    Save,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Login => "login",
            Stage::Detection => "detection",
            Stage::Pagination => "pagination setup",
            Stage::Command => "command",
            Stage::Save => "save",
        };
        f.write_str(name)
    }
}

/// A wait-for-pattern ran out of time.
#[derive(Error, Debug)]
#[error("{stage} timed out after {elapsed:?}")]
pub struct TimeoutError {
    pub stage: Stage,
    pub elapsed: Duration,
}

impl TimeoutError {
    pub fn new(stage: Stage, elapsed: Duration) -> Self {
        Self { stage, elapsed }
    }
}

/// Vendor/model detection errors.
#[derive(Error, Debug)]
pub enum DetectionError {
    /// No vendor signature in the version output
    #[error("Cannot determine vendor")]
    UnknownVendor,

    /// Vendor found, but no model line
    #[error("Cannot determine model for vendor '{vendor}'")]
    UnknownModel { vendor: String },

    /// The device closed the session during detection
    #[error("Device closed the session during detection")]
    Closed,
}

/// Errors for a single command or the command source.
#[derive(Error, Debug)]
pub enum CommandError {
    /// Sending or waiting for one command failed without a timeout
    #[error("Command '{command}' failed: {message}")]
    Failed { command: String, message: String },

    /// The vendor command file does not exist
    #[error("Command file {path} does not exist")]
    SourceMissing { path: PathBuf },

    /// The vendor command file could not be read
    #[error("Failed to read command file {path}: {source}")]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Malformed host entry
    #[error("Invalid host entry '{entry}': {message}")]
    InvalidHost { entry: String, message: String },

    /// Missing required option
    #[error("Missing required option: {0}")]
    Missing(&'static str),

    /// Host file could not be read
    #[error("Failed to read host file {path}: {source}")]
    HostFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Trust-store repair errors.
#[derive(Error, Debug)]
pub enum KnownHostsError {
    /// The referenced line is past the end of the file
    #[error("{path} has no line {line}")]
    LineOutOfRange { path: PathBuf, line: usize },

    /// I/O error reading or rewriting the file
    #[error("Failed to rewrite {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Transcript destination errors.
#[derive(Error, Debug)]
pub enum TranscriptError {
    /// The per-host log file could not be created
    #[error("Failed to open transcript {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The host cannot be used as a file name inside the log directory
    #[error("Host '{0}' is not a valid transcript file name")]
    InvalidName(String),
}

/// Result type alias using swssh's Error.
pub type Result<T> = std::result::Result<T, Error>;
