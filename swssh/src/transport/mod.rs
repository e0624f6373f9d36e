//! Process boundary: the spawned remote-shell client.
//!
//! The automaton only needs a byte pipe with an emulated terminal behind it.
//! [`SshProcess`] runs the OpenSSH client inside a pseudo-terminal; the
//! [`scripted`] module provides an in-memory device for tests.

pub mod config;
mod process;
pub mod scripted;

pub use config::{Credential, DEFAULT_PORT, SpawnConfig, Target};
pub use process::SshProcess;
pub use scripted::{FakeDevice, InputLog, Reply, Responder, ScriptedTransport};

use std::future::Future;

use crate::error::Result;

/// A bidirectional byte stream to an interactive remote shell.
pub trait Transport: Send {
    /// Write raw bytes to the terminal.
    fn send(&mut self, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Wait for the next chunk of output.
    ///
    /// Returns `TransportError::Closed` once the stream has ended.
    fn recv(&mut self) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Take a chunk that has already arrived, without waiting.
    ///
    /// `Ok(None)` means nothing is pending right now.
    fn try_recv(&mut self) -> Result<Option<Vec<u8>>>;

    /// Terminate the remote shell.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;
}

/// Creates a transport for a target.
pub trait Connector: Send + Sync {
    type Transport: Transport + 'static;

    /// Start the remote shell for `target`.
    fn connect(&self, target: &Target, config: &SpawnConfig) -> Result<Self::Transport>;
}

/// Connector that spawns the OpenSSH client.
#[derive(Debug, Clone, Copy, Default)]
pub struct SshConnector;

impl Connector for SshConnector {
    type Transport = SshProcess;

    fn connect(&self, target: &Target, config: &SpawnConfig) -> Result<SshProcess> {
        SshProcess::spawn(target, config)
    }
}
