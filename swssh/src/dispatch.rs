//! Runs many sessions at once.
//!
//! Every target gets its own task; a semaphore bounds how many run at the
//! same time. A finished session frees its slot immediately.

use std::sync::Arc;

use log::{error, info};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::RunConfig;
use crate::driver::{SessionResult, SessionRunner};
use crate::transport::{Connector, Target};

/// Run `runner` against every target; results come back in input order.
///
/// A session task that panics is reported as a failed result for its target.
pub async fn dispatch<C>(
    runner: &SessionRunner<C>,
    targets: Vec<Target>,
    config: &RunConfig,
) -> Vec<SessionResult>
where
    C: Connector + 'static,
{
    let mut results: Vec<SessionResult> = targets
        .iter()
        .map(|target| SessionResult::failed(target, "session task did not complete", false))
        .collect();

    let limit = config.max_sessions.max(1);
    let semaphore = Arc::new(Semaphore::new(limit));
    let mut tasks = JoinSet::new();
    info!("running {} sessions, at most {} at once", targets.len(), limit);

    for (index, target) in targets.into_iter().enumerate() {
        let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
            break;
        };
        let runner = runner.clone();
        let retry = config.retry_repaired_host_keys;
        tasks.spawn(async move {
            let _permit = permit;
            let mut result = runner.run(target.clone()).await;
            if retry && result.is_retryable() {
                info!("{}: host key repaired, retrying", target.label());
                result = runner.run(target).await;
            }
            (index, result)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, result)) => results[index] = result,
            Err(e) => error!("session task failed: {}", e),
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::commands::CommandSource;
    use crate::config::SessionOptions;
    use crate::driver::session::VERSION_PROBE;
    use crate::error::{Result, TransportError};
    use crate::transport::{Credential, FakeDevice, ScriptedTransport, SpawnConfig};

    const H3C_VERSION: &str = "H3C Comware Software, Version 7.1.070, Release 1309P01\n\
        H3C S5560-30C-EI uptime is 12 weeks, 3 days, 4 hours, 27 minutes";

    /// Devices by host; unknown hosts fail to spawn and `panic` hosts panic.
    #[derive(Default)]
    struct Fleet {
        devices: HashMap<String, FakeDevice>,
        connects: AtomicUsize,
    }

    impl Fleet {
        fn with(mut self, host: &str, device: FakeDevice) -> Self {
            self.devices.insert(host.to_string(), device);
            self
        }
    }

    impl Connector for Fleet {
        type Transport = ScriptedTransport<FakeDevice>;

        fn connect(&self, target: &Target, config: &SpawnConfig) -> Result<Self::Transport> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            if target.host == "panic" {
                panic!("connector exploded");
            }
            match self.devices.get(&target.host) {
                Some(device) => Ok(ScriptedTransport::new(device.clone())),
                None => Err(TransportError::Spawn {
                    program: config.program.clone(),
                    message: "No route to host".to_string(),
                }
                .into()),
            }
        }
    }

    fn h3c(prompt: &str) -> FakeDevice {
        FakeDevice::new(prompt, "secret")
            .reply(VERSION_PROBE, H3C_VERSION)
            .reply("screen-length disable", "")
            .reply("display clock", "10:00:00 UTC Fri 10/16/2026")
    }

    fn runner(fleet: Fleet, log_dir: &std::path::Path) -> SessionRunner<Fleet> {
        SessionRunner::new(
            fleet,
            SessionOptions {
                timeout: Duration::from_millis(100),
                settle: Duration::from_millis(1),
                log_dir: Some(log_dir.to_path_buf()),
                commands: CommandSource::inline("display clock"),
                ..Default::default()
            },
        )
    }

    fn targets(hosts: &[&str]) -> Vec<Target> {
        hosts
            .iter()
            .map(|host| Target::new(*host, 22, Credential::new("npc", "secret")))
            .collect()
    }

    #[tokio::test]
    async fn test_results_in_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let fleet = Fleet::default()
            .with("10.0.0.1", h3c("<SW-1>"))
            .with("10.0.0.2", h3c("<SW-2>"))
            .with("10.0.0.4", h3c("<SW-4>"));
        let runner = runner(fleet, dir.path());

        let hosts = ["10.0.0.1", "10.0.0.2", "10.0.0.3", "10.0.0.4"];
        let config = RunConfig {
            max_sessions: 2,
            ..Default::default()
        };
        let results = dispatch(&runner, targets(&hosts), &config).await;

        let order: Vec<_> = results.iter().map(|r| r.host.as_str()).collect();
        assert_eq!(order, hosts);
        let success: Vec<_> = results.iter().map(|r| r.success).collect();
        assert_eq!(success, [true, true, false, true]);
        assert!(results[2].failure.as_ref().unwrap().message.contains("No route to host"));
        assert!(dir.path().join("10.0.0.4").exists());
    }

    #[tokio::test]
    async fn test_single_slot_runs_everything() {
        let dir = tempfile::tempdir().unwrap();
        let fleet = Fleet::default()
            .with("10.0.0.1", h3c("<SW-1>"))
            .with("10.0.0.2", h3c("<SW-2>"));
        let runner = runner(fleet, dir.path());

        let config = RunConfig {
            max_sessions: 0,
            ..Default::default()
        };
        let results = dispatch(&runner, targets(&["10.0.0.1", "10.0.0.2"]), &config).await;
        assert!(results.iter().all(|r| r.success));
    }

    #[tokio::test]
    async fn test_panicking_session_reported_as_failure() {
        let dir = tempfile::tempdir().unwrap();
        let fleet = Fleet::default().with("10.0.0.1", h3c("<SW-1>"));
        let runner = runner(fleet, dir.path());

        let results = dispatch(&runner, targets(&["panic", "10.0.0.1"]), &RunConfig::default()).await;
        assert_eq!(results.len(), 2);
        assert!(!results[0].success);
        assert_eq!(results[0].host, "panic");
        assert!(results[1].success);
    }

    #[tokio::test]
    async fn test_retry_after_host_key_repair() {
        let dir = tempfile::tempdir().unwrap();
        let known_hosts = dir.path().join("known_hosts");
        let lines: String = (1..=5).map(|i| format!("10.0.0.{} ssh-rsa KEY{}\n", i, i)).collect();
        tokio_test::assert_ok!(std::fs::write(&known_hosts, lines));

        let device = h3c("<SW-1>").host_key_failure(format!("{}:2", known_hosts.display()));
        let logs = dir.path().join("logs");

        let retrying = runner(Fleet::default().with("10.0.0.1", device.clone()), &logs);
        let config = RunConfig {
            retry_repaired_host_keys: true,
            ..Default::default()
        };
        let results = dispatch(&retrying, targets(&["10.0.0.1"]), &config).await;
        assert!(results[0].is_retryable());
        assert_eq!(retrying.connector().connects.load(Ordering::SeqCst), 2);

        let remaining = std::fs::read_to_string(&known_hosts).unwrap();
        assert_eq!(remaining.lines().count(), 3);

        let single = runner(Fleet::default().with("10.0.0.1", device), &logs);
        let results = dispatch(&single, targets(&["10.0.0.1"]), &RunConfig::default()).await;
        assert!(results[0].is_retryable());
        assert_eq!(single.connector().connects.load(Ordering::SeqCst), 1);
    }
}
