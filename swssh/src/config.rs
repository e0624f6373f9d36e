//! Session and run configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::commands::CommandSource;
use crate::transport::SpawnConfig;

/// Default wait for any expected pattern.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default pause after sending input.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(500);

/// Minimum wait used for the save sequence.
pub const SAVE_TIMEOUT_FLOOR: Duration = Duration::from_secs(10);

/// Default bound on concurrently running sessions.
pub const DEFAULT_MAX_SESSIONS: usize = 1000;

/// Options for one device session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Wait for each expected pattern (default: 10s).
    pub timeout: Duration,

    /// Pause after sending input, before waiting (default: 0.5s).
    pub settle: Duration,

    /// Persist the running configuration after the commands.
    pub save_config: bool,

    /// Run the layer-2 uplink probe chain.
    pub discover_uplink: bool,

    /// Write transcripts to `<log_dir>/<host>` instead of stdout.
    pub log_dir: Option<PathBuf>,

    /// Where user commands come from.
    pub commands: CommandSource,

    /// How the remote-shell client is started.
    pub spawn: SpawnConfig,
}

impl SessionOptions {
    /// Settle interval from seconds; zero, negative or non-finite values
    /// fall back to the default.
    pub fn settle_from_secs(secs: f64) -> Duration {
        if secs.is_finite() && secs > 0.0 {
            Duration::from_secs_f64(secs)
        } else {
            DEFAULT_SETTLE
        }
    }

    /// Prompt timeout from seconds; zero, negative or non-finite values fall
    /// back to the default.
    pub fn timeout_from_secs(secs: f64) -> Duration {
        if secs.is_finite() && secs > 0.0 {
            Duration::from_secs_f64(secs)
        } else {
            DEFAULT_TIMEOUT
        }
    }

    /// Settle interval actually used.
    pub fn effective_settle(&self) -> Duration {
        if self.settle.is_zero() {
            DEFAULT_SETTLE
        } else {
            self.settle
        }
    }

    /// Timeout used for the save sequence.
    pub fn save_timeout(&self) -> Duration {
        self.timeout.max(SAVE_TIMEOUT_FLOOR)
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            settle: DEFAULT_SETTLE,
            save_config: false,
            discover_uplink: false,
            log_dir: None,
            commands: CommandSource::None,
            spawn: SpawnConfig::default(),
        }
    }
}

/// Options for a whole run across many targets.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Upper bound on sessions running at once (default: 1000).
    pub max_sessions: usize,

    /// Run a target once more after its host key was repaired.
    pub retry_repaired_host_keys: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_sessions: DEFAULT_MAX_SESSIONS,
            retry_repaired_host_keys: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = SessionOptions::default();
        assert_eq!(options.timeout, Duration::from_secs(10));
        assert_eq!(options.settle, Duration::from_millis(500));
        assert!(!options.save_config);
        assert!(!options.discover_uplink);
        assert!(options.log_dir.is_none());

        let run = RunConfig::default();
        assert_eq!(run.max_sessions, 1000);
        assert!(!run.retry_repaired_host_keys);
    }

    #[test]
    fn test_settle_fallback() {
        assert_eq!(SessionOptions::settle_from_secs(0.0), DEFAULT_SETTLE);
        assert_eq!(SessionOptions::settle_from_secs(-1.0), DEFAULT_SETTLE);
        assert_eq!(SessionOptions::settle_from_secs(f64::NAN), DEFAULT_SETTLE);
        assert_eq!(SessionOptions::settle_from_secs(2.0), Duration::from_secs(2));

        let options = SessionOptions {
            settle: Duration::ZERO,
            ..Default::default()
        };
        assert_eq!(options.effective_settle(), DEFAULT_SETTLE);
    }

    #[test]
    fn test_fractional_timeout() {
        assert_eq!(SessionOptions::timeout_from_secs(2.5), Duration::from_millis(2500));
        assert_eq!(SessionOptions::timeout_from_secs(0.0), DEFAULT_TIMEOUT);
        assert_eq!(SessionOptions::timeout_from_secs(f64::INFINITY), DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_save_timeout_floor() {
        let short = SessionOptions {
            timeout: Duration::from_secs(3),
            ..Default::default()
        };
        assert_eq!(short.save_timeout(), Duration::from_secs(10));

        let long = SessionOptions {
            timeout: Duration::from_secs(30),
            ..Default::default()
        };
        assert_eq!(long.save_timeout(), Duration::from_secs(30));
    }
}
