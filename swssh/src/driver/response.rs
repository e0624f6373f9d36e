//! Per-command records and the session result.

use std::time::Duration;

use serde::Serialize;

use crate::transport::Target;

/// One user command as it was executed.
#[derive(Debug, Clone)]
pub struct CommandRecord {
    /// The command that was sent.
    pub command: String,

    /// Raw captured output, including the echo and the trailing prompt.
    pub output: String,

    /// Time from sending the command to the end of the wait.
    pub elapsed: Duration,

    /// The wait did not end on a prompt.
    pub truncated: bool,
}

impl CommandRecord {
    pub fn new(
        command: impl Into<String>,
        output: impl Into<String>,
        elapsed: Duration,
        truncated: bool,
    ) -> Self {
        Self {
            command: command.into(),
            output: output.into(),
            elapsed,
            truncated,
        }
    }

    /// Output lines between the echoed command and the trailing prompt.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        let mut lines: Vec<&str> = self.output.lines().collect();
        if !self.truncated {
            lines.pop();
        }
        lines
            .into_iter()
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.is_empty())
            .skip_while(|line| !line.contains(self.command.as_str()))
            .skip(1)
    }
}

/// A command entry in the session result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandEntry {
    pub command: String,
    pub truncated: bool,
}

/// Why a session failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureReason {
    pub message: String,

    /// Running the target again may succeed (the host key was repaired).
    pub retryable: bool,
}

/// Outcome of one device session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionResult {
    pub host: String,
    pub port: u16,
    pub success: bool,
    pub vendor: Option<String>,
    pub model: Option<String>,
    pub uplink: Option<String>,
    pub commands: Vec<CommandEntry>,
    pub failure: Option<FailureReason>,
}

impl SessionResult {
    /// A result for a session that never got as far as the device.
    pub fn failed(target: &Target, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            host: target.host.clone(),
            port: target.port,
            success: false,
            vendor: None,
            model: None,
            uplink: None,
            commands: Vec::new(),
            failure: Some(FailureReason {
                message: message.into(),
                retryable,
            }),
        }
    }

    /// Whether a second attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        self.failure.as_ref().is_some_and(|f| f.retryable)
    }

    /// `host:port`.
    pub fn label(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
