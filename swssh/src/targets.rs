//! Host lists: `ip[:port]` entries, comma-separated or one per line.

use std::fs;
use std::path::Path;

use crate::error::{ConfigError, Result};
use crate::transport::{Credential, DEFAULT_PORT, Target};

/// Parse one `host[:port]` entry.
pub fn parse_entry(entry: &str) -> Result<(String, u16)> {
    let entry = entry.trim();
    let invalid = |message: &str| ConfigError::InvalidHost {
        entry: entry.to_string(),
        message: message.to_string(),
    };

    let (host, port) = match entry.split_once(':') {
        Some((host, port)) if !port.contains(':') => {
            let port = port
                .trim()
                .parse::<u16>()
                .ok()
                .filter(|port| *port != 0)
                .ok_or_else(|| invalid("port must be a number between 1 and 65535"))?;
            (host.trim(), port)
        }
        // No port, or a bare IPv6 address.
        _ => (entry, DEFAULT_PORT),
    };
    if host.is_empty() {
        return Err(invalid("empty host").into());
    }
    if host.chars().any(char::is_whitespace) {
        return Err(invalid("host contains whitespace").into());
    }
    if host.contains(['/', '\\']) || host.contains("..") || host == "." {
        return Err(invalid("host must be an address or a host name").into());
    }
    Ok((host.to_string(), port))
}

/// Targets from a comma-separated list.
pub fn parse_host_list(list: &str, credential: &Credential) -> Result<Vec<Target>> {
    list.split(',')
        .filter(|entry| !entry.trim().is_empty())
        .map(|entry| {
            let (host, port) = parse_entry(entry)?;
            Ok(Target::new(host, port, credential.clone()))
        })
        .collect()
}

/// Targets from a file with one entry per line; blank lines and `#`
/// comments are skipped.
pub fn parse_host_file(path: &Path, credential: &Credential) -> Result<Vec<Target>> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::HostFile {
        path: path.to_path_buf(),
        source,
    })?;
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            let (host, port) = parse_entry(line)?;
            Ok(Target::new(host, port, credential.clone()))
        })
        .collect()
}
