//! Removal of stale entries from the OpenSSH trust store.
//!
//! When a device's host key changes, strict host-key checking refuses the
//! connection and names the offending line:
//!
//! ```text
//! Offending key in /root/.ssh/known_hosts:2330
//! RSA host key for 172.22.131.63 has changed and you have requested strict checking.
//! Host key verification failed.
//! ```
//!
//! Deleting that line lets the next attempt re-learn the key through the
//! normal trust prompt. The current attempt still fails.
//!
//! Repairs within one process are serialized. Two processes repairing the
//! same file concurrently can still lose an update, and a repair shifts the
//! line numbers other sessions may already have captured.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{KnownHostsError, Result};

static OFFENDING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|\s)(/[^\s:]*known_hosts[^\s:]*):(\d+)")
        .expect("known_hosts reference pattern must compile")
});

static REPAIR_LOCK: Mutex<()> = Mutex::new(());

/// A trust-store line named in a host-key failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffendingEntry {
    pub path: PathBuf,
    /// 1-based line number.
    pub line: usize,
}

/// Find the first `path:line` trust-store reference in captured output.
pub fn find_offending_entry(text: &str) -> Option<OffendingEntry> {
    text.lines().find_map(|row| {
        let caps = OFFENDING.captures(row)?;
        let line = caps[2].parse().ok()?;
        Some(OffendingEntry {
            path: PathBuf::from(&caps[1]),
            line,
        })
    })
}

/// Delete the entry referenced in `text`, if any.
///
/// Returns the removed entry, or `None` when the text names no entry and
/// nothing was touched.
pub fn repair(text: &str) -> Result<Option<OffendingEntry>> {
    let Some(entry) = find_offending_entry(text) else {
        return Ok(None);
    };
    let _guard = REPAIR_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    remove_line(&entry.path, entry.line)?;
    info!("removed {}:{}", entry.path.display(), entry.line);
    Ok(Some(entry))
}

/// Rewrite `path` without its 1-based line `line`.
///
/// The new contents go to a sibling file which then replaces the original.
pub fn remove_line(path: &Path, line: usize) -> Result<()> {
    let io_err = |source: io::Error| KnownHostsError::Io {
        path: path.to_path_buf(),
        source,
    };

    let original = fs::read_to_string(path).map_err(io_err)?;
    let rows: Vec<&str> = original.split_inclusive('\n').collect();
    if line == 0 || line > rows.len() {
        return Err(KnownHostsError::LineOutOfRange {
            path: path.to_path_buf(),
            line,
        }
        .into());
    }

    let mut rewritten = String::with_capacity(original.len());
    for (i, row) in rows.iter().enumerate() {
        if i + 1 != line {
            rewritten.push_str(row);
        }
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".swssh-tmp");
    let tmp = path.with_file_name(tmp_name);

    fs::write(&tmp, rewritten).map_err(io_err)?;
    if let Ok(meta) = fs::metadata(path) {
        if let Err(e) = fs::set_permissions(&tmp, meta.permissions()) {
            warn!("failed to copy permissions to {}: {}", tmp.display(), e);
        }
    }
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(io_err(e).into());
    }
    Ok(())
}
