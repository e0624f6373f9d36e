//! Target and spawn configuration.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};

/// Default SSH port.
pub const DEFAULT_PORT: u16 = 22;

/// One device to automate: address, port and credential.
#[derive(Debug, Clone)]
pub struct Target {
    /// Host name or IP address.
    pub host: String,

    /// SSH port (default: 22).
    pub port: u16,

    /// Login credential.
    pub credential: Credential,
}

impl Target {
    pub fn new(host: impl Into<String>, port: u16, credential: Credential) -> Self {
        Self {
            host: host.into(),
            port,
            credential,
        }
    }

    /// `host:port`, used as the log prefix.
    pub fn label(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Username and password, typed into the terminal when asked.
pub struct Credential {
    pub username: String,
    secret: SecretString,
}

impl Credential {
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: SecretString::from(secret.into()),
        }
    }

    pub(crate) fn secret(&self) -> &str {
        self.secret.expose_secret()
    }
}

impl Clone for Credential {
    fn clone(&self) -> Self {
        Self::new(self.username.clone(), self.secret().to_owned())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// How the remote-shell client is started.
#[derive(Debug, Clone)]
pub struct SpawnConfig {
    /// Client program (default: `ssh`).
    pub program: String,

    /// Extra arguments placed before the host, e.g. `-o KexAlgorithms=+diffie-hellman-group1-sha1`.
    pub extra_args: Vec<String>,

    /// Terminal width for the PTY.
    pub terminal_width: u16,

    /// Terminal height for the PTY.
    pub terminal_height: u16,
}

impl SpawnConfig {
    /// Full argument list for `target`; the password is never part of it.
    pub fn args(&self, target: &Target) -> Vec<String> {
        let mut args = vec![
            "-p".to_string(),
            target.port.to_string(),
            "-l".to_string(),
            target.credential.username.clone(),
        ];
        args.extend(self.extra_args.iter().cloned());
        args.push(target.host.clone());
        args
    }
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            program: "ssh".to_string(),
            extra_args: Vec::new(),
            terminal_width: 511,
            terminal_height: 24,
        }
    }
}
