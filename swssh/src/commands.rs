//! User command sources.
//!
//! Commands are either given inline as a `;`-separated list or read from a
//! per-vendor file `<prefix>.cmd.<vendor>`, e.g.
//!
//! ```text
//! test.cmd.cisco
//! test.cmd.cisco_nexus
//! test.cmd.h3c
//! test.cmd.huawei
//! ```
//!
//! The file is only read once the vendor has been identified.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{CommandError, Result};

/// Where a session's user commands come from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CommandSource {
    /// No commands; the session only logs in, identifies and logs out.
    #[default]
    None,

    /// Explicit list.
    Inline(Vec<String>),

    /// `<prefix>.cmd.<vendor>`, one command per line.
    VendorFile { prefix: PathBuf },
}

impl CommandSource {
    /// Parse a `;`-separated command list.
    pub fn inline(list: &str) -> Self {
        CommandSource::Inline(clean(list.split(';')))
    }

    /// Build from the two CLI options; an inline list wins over a prefix.
    pub fn from_options(inline: Option<&str>, prefix: Option<&Path>) -> Self {
        match (inline, prefix) {
            (Some(list), _) if !list.trim().is_empty() => Self::inline(list),
            (_, Some(prefix)) if !prefix.as_os_str().is_empty() => CommandSource::VendorFile {
                prefix: prefix.to_path_buf(),
            },
            _ => CommandSource::None,
        }
    }

    /// Path of the command file for `vendor`, if this is a file source.
    pub fn path_for(&self, vendor: &str) -> Option<PathBuf> {
        match self {
            CommandSource::VendorFile { prefix } => {
                let mut name = prefix.clone().into_os_string();
                name.push(format!(".cmd.{}", vendor));
                Some(PathBuf::from(name))
            }
            _ => None,
        }
    }

    /// The commands to run on a device of `vendor`.
    ///
    /// Commands are trimmed and blank ones dropped.
    pub fn resolve(&self, vendor: &str) -> Result<Vec<String>> {
        match self {
            CommandSource::None => Ok(Vec::new()),
            CommandSource::Inline(commands) => Ok(clean(commands.iter().map(String::as_str))),
            CommandSource::VendorFile { .. } => {
                let Some(path) = self.path_for(vendor) else {
                    return Ok(Vec::new());
                };
                match fs::read_to_string(&path) {
                    Ok(text) => Ok(clean(text.lines())),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {
                        Err(CommandError::SourceMissing { path }.into())
                    }
                    Err(source) => Err(CommandError::SourceUnreadable { path, source }.into()),
                }
            }
        }
    }
}

fn clean<'a>(commands: impl Iterator<Item = &'a str>) -> Vec<String> {
    commands
        .map(str::trim)
        .filter(|command| !command.is_empty())
        .map(str::to_string)
        .collect()
}
