//! Transcript destinations and the end-of-session summary.
//!
//! Every span the prompt matcher consumes is forwarded here verbatim, in
//! receive order. A transcript is best effort: write failures are logged and
//! never end a session.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use log::warn;

use crate::error::{Result, TranscriptError};

/// Receives raw captured output.
pub trait TranscriptSink: Send {
    fn write(&mut self, data: &[u8]);
}

/// Writes to standard output; used when no log directory is configured.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl TranscriptSink for StdoutSink {
    fn write(&mut self, data: &[u8]) {
        let mut out = io::stdout().lock();
        if let Err(e) = out.write_all(data).and_then(|_| out.flush()) {
            warn!("failed to write transcript to stdout: {}", e);
        }
    }
}

/// Writes to `<log_dir>/<host>`, truncating any previous transcript.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    file: File,
}

impl FileSink {
    /// Create the log directory if needed and open the host's transcript.
    ///
    /// `host` must be a single plain file name so the transcript stays inside
    /// `log_dir`.
    pub fn create(log_dir: &Path, host: &str) -> Result<Self> {
        let mut parts = Path::new(host).components();
        if !matches!((parts.next(), parts.next()), (Some(Component::Normal(_)), None)) {
            return Err(TranscriptError::InvalidName(host.to_string()).into());
        }
        let path = log_dir.join(host);
        let open = fs::create_dir_all(log_dir).and_then(|_| File::create(&path));
        match open {
            Ok(file) => Ok(Self { path, file }),
            Err(source) => Err(TranscriptError::Open { path, source }.into()),
        }
    }
}

impl TranscriptSink for FileSink {
    fn write(&mut self, data: &[u8]) {
        if let Err(e) = self.file.write_all(data) {
            warn!("failed to write transcript {}: {}", self.path.display(), e);
        }
    }
}

/// Collects the transcript in memory; clones share the same bytes.
#[derive(Debug, Clone, Default)]
pub struct MemorySink(Arc<Mutex<Vec<u8>>>);

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far.
    pub fn bytes(&self) -> Vec<u8> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Everything written so far, decoded lossily.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes()).into_owned()
    }
}

impl TranscriptSink for MemorySink {
    fn write(&mut self, data: &[u8]) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(data);
    }
}

/// Label used in the summary for an attempted configuration save.
pub const SAVE_ENTRY: &str = "[Save Config]";

/// End-of-session summary block appended to every transcript.
#[derive(Debug, Clone)]
pub struct Summary<'a> {
    pub device: &'a str,
    pub vendor: &'a str,
    pub model: &'a str,
    pub uplink: &'a str,
    pub commands: Vec<&'a str>,
    /// `None` for a successful session, otherwise the failure reason.
    pub failure: Option<String>,
}

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\n\n=======================================\n")?;
        writeln!(f, "Device:     {}", self.device)?;
        writeln!(f, "Vendor:     {}", self.vendor)?;
        writeln!(f, "Model:      {}", self.model)?;
        writeln!(f, "L2_Uplink:  {}", self.uplink)?;
        writeln!(f, "Commands:   ")?;
        for (i, command) in self.commands.iter().enumerate() {
            writeln!(f, "{:>5}) {}", i + 1, command)?;
        }
        match &self.failure {
            None => writeln!(f, "Status:     ok")?,
            Some(reason) => writeln!(f, "Status:     failed: {}", reason)?,
        }
        writeln!(f)
    }
}
