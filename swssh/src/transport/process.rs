//! OpenSSH client running inside a pseudo-terminal.

use std::io::{Read, Write};
use std::thread;

use log::{debug, trace, warn};
use portable_pty::{Child, CommandBuilder, MasterPty, PtySize, native_pty_system};
use tokio::sync::mpsc::{self, UnboundedReceiver, error::TryRecvError};

use super::Transport;
use super::config::{SpawnConfig, Target};
use crate::error::{Result, TransportError};

/// A spawned `ssh` process with its PTY.
///
/// A reader thread forwards PTY output into an unbounded channel; the channel
/// closes when the child exits and the PTY reports end of file.
pub struct SshProcess {
    /// Keeps the PTY open for the lifetime of the session.
    _master: Box<dyn MasterPty + Send>,

    /// Writes go straight to the PTY.
    writer: Box<dyn Write + Send>,

    child: Box<dyn Child + Send + Sync>,

    rx: UnboundedReceiver<Vec<u8>>,

    label: String,
}

impl SshProcess {
    /// Spawn the client for `target`.
    pub fn spawn(target: &Target, config: &SpawnConfig) -> Result<Self> {
        let label = target.label();
        let pair = native_pty_system()
            .openpty(PtySize {
                rows: config.terminal_height,
                cols: config.terminal_width,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| TransportError::Pty(e.to_string()))?;

        let args = config.args(target);
        debug!("{}: {} {}", label, config.program, args.join(" "));

        let mut cmd = CommandBuilder::new(&config.program);
        cmd.args(&args);
        // Keep prompts in English regardless of the operator's locale.
        cmd.env("LC_ALL", "C");

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| TransportError::Spawn {
                program: config.program.clone(),
                message: e.to_string(),
            })?;
        // Only the child should hold the slave side, so EOF arrives on exit.
        drop(pair.slave);

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| TransportError::Pty(e.to_string()))?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|e| TransportError::Pty(e.to_string()))?;

        let (tx, rx) = mpsc::unbounded_channel();
        let thread_label = label.clone();
        thread::Builder::new()
            .name(format!("pty-{}", label))
            .spawn(move || read_loop(reader, tx, thread_label))
            .map_err(TransportError::Io)?;

        Ok(Self {
            _master: pair.master,
            writer,
            child,
            rx,
            label,
        })
    }
}

fn read_loop(
    mut reader: Box<dyn Read + Send>,
    tx: mpsc::UnboundedSender<Vec<u8>>,
    label: String,
) {
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                trace!("{}: read {} bytes", label, n);
                if tx.send(buf[..n].to_vec()).is_err() {
                    break;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                // Linux reports EIO on the master once the child is gone.
                debug!("{}: pty read ended: {}", label, e);
                break;
            }
        }
    }
}

impl Transport for SshProcess {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data).map_err(TransportError::Io)?;
        self.writer.flush().map_err(TransportError::Io)?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<Vec<u8>> {
        self.rx.recv().await.ok_or_else(|| TransportError::Closed.into())
    }

    fn try_recv(&mut self) -> Result<Option<Vec<u8>>> {
        match self.rx.try_recv() {
            Ok(chunk) => Ok(Some(chunk)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(TransportError::Closed.into()),
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self.child.try_wait() {
            Ok(Some(status)) => {
                debug!("{}: ssh exited with {:?}", self.label, status);
            }
            Ok(None) => {
                debug!("{}: killing ssh", self.label);
                if let Err(e) = self.child.kill() {
                    warn!("{}: failed to kill ssh: {}", self.label, e);
                }
                // Reap the child so it does not linger as a zombie.
                let _ = self.child.try_wait();
            }
            Err(e) => warn!("{}: failed to query ssh status: {}", self.label, e),
        }
        Ok(())
    }
}
