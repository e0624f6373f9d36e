//! One device session from spawn to summary.

use std::sync::Arc;

use log::{error, info, warn};

use super::response::{CommandEntry, FailureReason, SessionResult};
use super::session::Session;
use crate::channel::PtyChannel;
use crate::config::SessionOptions;
use crate::error::{Error, Result};
use crate::transcript::{FileSink, SAVE_ENTRY, StdoutSink, Summary, TranscriptSink};
use crate::transport::{Connector, SshConnector, Target, Transport};

/// Runs complete sessions against targets.
///
/// Cheap to clone; clones share the connector and options.
pub struct SessionRunner<C = SshConnector> {
    connector: Arc<C>,
    options: Arc<SessionOptions>,
}

impl<C> Clone for SessionRunner<C> {
    fn clone(&self) -> Self {
        Self {
            connector: Arc::clone(&self.connector),
            options: Arc::clone(&self.options),
        }
    }
}

impl<C: Connector> SessionRunner<C> {
    pub fn new(connector: C, options: SessionOptions) -> Self {
        Self {
            connector: Arc::new(connector),
            options: Arc::new(options),
        }
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Run one session, writing the transcript to the configured destination.
    pub async fn run(&self, target: Target) -> SessionResult {
        match self.open_sink(&target) {
            Ok(sink) => self.run_with_sink(target, sink).await,
            Err(e) => {
                warn!("{}: {}", target.label(), e);
                SessionResult::failed(&target, e.to_string(), false)
            }
        }
    }

    fn open_sink(&self, target: &Target) -> Result<Box<dyn TranscriptSink>> {
        Ok(match &self.options.log_dir {
            Some(dir) => Box::new(FileSink::create(dir, &target.host)?),
            None => Box::new(StdoutSink),
        })
    }

    /// Run one session with an explicit transcript destination.
    ///
    /// Never fails: every fault ends up in the returned result. Logout and
    /// close always run, and the summary is appended to the transcript for
    /// successful and failed sessions alike.
    pub async fn run_with_sink(
        &self,
        target: Target,
        mut sink: Box<dyn TranscriptSink>,
    ) -> SessionResult {
        let label = target.label();
        info!(
            "{}: {} {}",
            label,
            self.options.spawn.program,
            self.options.spawn.args(&target).join(" ")
        );

        let transport = match self.connector.connect(&target, &self.options.spawn) {
            Ok(transport) => transport,
            Err(e) => {
                error!("{}: {}", label, e);
                let result = SessionResult::failed(&target, e.to_string(), false);
                sink.write(summary(&result, false).to_string().as_bytes());
                return result;
            }
        };

        let channel = PtyChannel::new(transport, sink, label);
        let mut session = Session::new(channel, target, &self.options);

        let outcome = self.drive(&mut session).await;
        session.logout().await;
        session.close().await;

        let result = build_result(&session, outcome.err());
        let block = summary(&result, session.save_attempted()).to_string();
        session.annotate(&block);
        if result.success {
            info!("{}: done", result.label());
        }
        result
    }

    async fn drive<T: Transport>(&self, session: &mut Session<T>) -> Result<()> {
        session.login().await?;
        let vendor = session.identify().await?.vendor.id.clone();
        session.disable_paging().await?;

        if self.options.discover_uplink {
            session.discover_uplink().await;
        }

        let commands = match self.options.commands.resolve(&vendor) {
            Ok(commands) => commands,
            Err(e) => return Err(session.fail(e)),
        };
        if commands.is_empty() {
            warn!("{}: no commands to run", session.target().label());
        }
        session.run_commands(&commands).await?;

        if self.options.save_config {
            session.save().await?;
        }
        Ok(())
    }
}

fn build_result<T: Transport>(session: &Session<T>, failure: Option<Error>) -> SessionResult {
    let target = session.target();
    SessionResult {
        host: target.host.clone(),
        port: target.port,
        success: failure.is_none(),
        vendor: session.vendor().map(str::to_string),
        model: session.model().map(str::to_string),
        uplink: session.uplink().map(str::to_string),
        commands: session
            .records()
            .iter()
            .map(|record| CommandEntry {
                command: record.command.clone(),
                truncated: record.truncated,
            })
            .collect(),
        failure: failure.map(|e| FailureReason {
            message: e.to_string(),
            retryable: e.is_retryable(),
        }),
    }
}

fn summary(result: &SessionResult, saved: bool) -> Summary<'_> {
    let mut commands: Vec<&str> = result.commands.iter().map(|c| c.command.as_str()).collect();
    if saved {
        commands.push(SAVE_ENTRY);
    }
    Summary {
        device: &result.host,
        vendor: result.vendor.as_deref().unwrap_or_default(),
        model: result.model.as_deref().unwrap_or_default(),
        uplink: result.uplink.as_deref().unwrap_or_default(),
        commands,
        failure: result.failure.as_ref().map(|f| f.message.clone()),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::commands::CommandSource;
    use crate::driver::session::{CISCO_VERSION_PROBE, VERSION_PROBE};
    use crate::transcript::MemorySink;
    use crate::transport::{Credential, FakeDevice};

    fn cisco() -> FakeDevice {
        FakeDevice::new("BJ-XXX-2-2960S-2016#", "secret")
            .invalid_marker("                   ^\n% Invalid input detected at '^' marker.")
            .reply(
                CISCO_VERSION_PROBE,
                "Cisco IOS Software, C2960S Software (C2960S-UNIVERSALK9-M), Version 15.0(2)SE4\n\
                 cisco WS-C2960S-48TS-L (PowerPC405) processor (revision B0) with 131072K bytes of memory.",
            )
            .reply("terminal length 0", "")
            .reply("show version", "Cisco IOS Software, C2960S Software, Version 15.0(2)SE4")
            .reply(
                "show ip int brief",
                "Interface              IP-Address      OK? Method Status                Protocol\n\
                 Vlan100                10.1.1.1        YES NVRAM  up                    up",
            )
    }

    fn options(commands: &str) -> SessionOptions {
        SessionOptions {
            timeout: Duration::from_millis(100),
            settle: Duration::from_millis(1),
            commands: CommandSource::inline(commands),
            ..Default::default()
        }
    }

    fn target(host: &str) -> Target {
        Target::new(host, 22, Credential::new("npc", "secret"))
    }

    #[tokio::test]
    async fn test_cisco_end_to_end() {
        let runner = SessionRunner::new(cisco(), options("show version;show ip int brief"));
        let sink = MemorySink::new();
        let result = runner
            .run_with_sink(target("10.1.1.1"), Box::new(sink.clone()))
            .await;

        assert!(result.success, "{:?}", result.failure);
        assert_eq!(result.host, "10.1.1.1");
        assert_eq!(result.port, 22);
        assert_eq!(result.vendor.as_deref(), Some("cisco"));
        assert_eq!(result.model.as_deref(), Some("WS-C2960S-48TS-L"));
        assert_eq!(result.uplink, None);
        assert_eq!(result.commands.len(), 2);
        assert_eq!(result.commands[0].command, "show version");
        assert_eq!(result.commands[1].command, "show ip int brief");
        assert!(result.commands.iter().all(|c| !c.truncated));

        let transcript = sink.contents();
        assert!(transcript.contains("Vlan100                10.1.1.1"));
        assert!(transcript.contains("Vendor:     cisco\n"));
        assert!(transcript.contains("    2) show ip int brief\n"));
        assert!(transcript.ends_with("Status:     ok\n\n"));
        assert!(!transcript.contains("secret"));
    }

    #[tokio::test]
    async fn test_idempotent_runs() {
        let runner = SessionRunner::new(cisco(), options("show version;show ip int brief"));

        let first = MemorySink::new();
        let a = runner
            .run_with_sink(target("10.1.1.1"), Box::new(first.clone()))
            .await;
        let second = MemorySink::new();
        let b = runner
            .run_with_sink(target("10.1.1.1"), Box::new(second.clone()))
            .await;

        assert_eq!(a, b);
        assert_eq!(first.contents(), second.contents());
    }

    #[tokio::test]
    async fn test_save_listed_in_summary() {
        let device = cisco().reply("copy run start", "[OK]");
        let log = device.input_log();
        let runner = SessionRunner::new(
            device,
            SessionOptions {
                save_config: true,
                ..options("show version")
            },
        );
        let sink = MemorySink::new();
        let result = runner
            .run_with_sink(target("10.1.1.1"), Box::new(sink.clone()))
            .await;

        assert!(result.success);
        assert_eq!(result.commands.len(), 1);
        assert!(sink.contents().contains("    1) show version\n    2) [Save Config]\n"));
        assert_eq!(log.count("copy run start"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_timeout_still_logs_out() {
        let device = cisco().silent("copy run start");
        let log = device.input_log();
        let runner = SessionRunner::new(
            device,
            SessionOptions {
                save_config: true,
                ..options("show version")
            },
        );
        let sink = MemorySink::new();
        let result = runner
            .run_with_sink(target("10.1.1.1"), Box::new(sink.clone()))
            .await;

        assert!(!result.success);
        let failure = result.failure.unwrap();
        assert_eq!(failure.message, "Timeout: save timed out after 10s");
        assert!(!failure.retryable);
        assert_eq!(result.commands.len(), 1);

        let lines = log.lines();
        assert_eq!(lines[lines.len() - 2..], ["end", "exit"]);
        let transcript = sink.contents();
        assert!(transcript.contains("    2) [Save Config]\n"));
        assert!(transcript.ends_with("Status:     failed: Timeout: save timed out after 10s\n\n"));
    }

    #[tokio::test]
    async fn test_pagination_timeout_skips_commands() {
        let device = cisco().silent("terminal length 0");
        let log = device.input_log();
        let runner = SessionRunner::new(device, options("show version"));
        let result = runner
            .run_with_sink(target("10.1.1.1"), Box::new(MemorySink::new()))
            .await;

        assert!(!result.success);
        assert_eq!(result.vendor.as_deref(), Some("cisco"));
        assert!(result.commands.is_empty());
        assert_eq!(
            result.failure.unwrap().message,
            "Timeout: pagination setup timed out after 100ms"
        );
        assert_eq!(log.count("show version"), 0);
        assert_eq!(log.count("exit"), 1);
    }

    #[tokio::test]
    async fn test_uplink_in_result_and_summary() {
        let device = FakeDevice::new("<SW-1>", "secret")
            .reply(
                VERSION_PROBE,
                "H3C Comware Software, Version 7.1.070, Release 1309P01\n\
                 H3C S5560-30C-EI uptime is 12 weeks, 3 days, 4 hours, 27 minutes",
            )
            .reply("screen-length disable", "")
            .reply(
                "display ip routing-table 0.0.0.0 0",
                "0.0.0.0/0           Static 60   0            10.0.0.1        Vlan100",
            )
            .reply(
                "disp arp 10.0.0.1",
                "10.0.0.1        0000-5e00-0101 100           GE1/0/52       1075  D",
            )
            .reply(
                "display mac-address 0000-5e00-0101",
                "0000-5e00-0101   100        Learned          GE1/0/52                 Y",
            )
            .reply("display clock", "10:00:00 UTC Fri 10/16/2026");
        let log = device.input_log();
        let runner = SessionRunner::new(
            device,
            SessionOptions {
                discover_uplink: true,
                ..options("display clock")
            },
        );
        let sink = MemorySink::new();
        let result = runner
            .run_with_sink(target("10.1.1.2"), Box::new(sink.clone()))
            .await;

        assert!(result.success, "{:?}", result.failure);
        assert_eq!(result.vendor.as_deref(), Some("h3c"));
        assert_eq!(result.uplink.as_deref(), Some("GE1/0/52"));
        assert_eq!(result.commands.len(), 1);
        assert!(sink.contents().contains("L2_Uplink:  GE1/0/52\n"));
        assert_eq!(log.count("quit"), 1);
    }

    #[tokio::test]
    async fn test_command_timeout_still_logs_out() {
        let device = cisco().silent("show tech-support");
        let log = device.input_log();
        let runner = SessionRunner::new(device, options("show version;show tech-support;show ip int brief"));
        let sink = MemorySink::new();
        let result = runner
            .run_with_sink(target("10.1.1.1"), Box::new(sink.clone()))
            .await;

        assert!(!result.success);
        assert_eq!(result.vendor.as_deref(), Some("cisco"));
        assert_eq!(result.commands.len(), 2);
        assert!(result.commands[1].truncated);
        assert!(result.failure.unwrap().message.contains("command timed out"));
        assert_eq!(log.count("exit"), 1);
        assert!(sink.contents().contains("Status:     failed: "));
    }

    #[tokio::test]
    async fn test_unknown_vendor_summary() {
        let device = FakeDevice::new("switch#", "secret").reply(VERSION_PROBE, "Acme OS 1.0");
        let log = device.input_log();
        let runner = SessionRunner::new(device, options("show clock"));
        let sink = MemorySink::new();
        let result = runner
            .run_with_sink(target("10.1.1.9"), Box::new(sink.clone()))
            .await;

        assert!(!result.success);
        assert_eq!(result.vendor, None);
        assert_eq!(result.model, None);
        assert!(result.commands.is_empty());
        assert_eq!(log.count("show clock"), 0);
        assert_eq!(log.count("exit"), 1);
        assert!(sink.contents().contains("Cannot determine vendor"));
    }

    #[tokio::test]
    async fn test_missing_command_file() {
        let dir = tempfile::tempdir().unwrap();
        let runner = SessionRunner::new(
            cisco(),
            SessionOptions {
                commands: CommandSource::VendorFile {
                    prefix: dir.path().join("test"),
                },
                ..options("")
            },
        );
        let result = runner
            .run_with_sink(target("10.1.1.1"), Box::new(MemorySink::new()))
            .await;

        assert!(!result.success);
        assert_eq!(result.vendor.as_deref(), Some("cisco"));
        assert!(result.commands.is_empty());
        assert!(result.failure.unwrap().message.contains("test.cmd.cisco"));
    }

    #[tokio::test]
    async fn test_file_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let runner = SessionRunner::new(
            cisco(),
            SessionOptions {
                log_dir: Some(dir.path().join("logs")),
                ..options("show version")
            },
        );
        let result = runner.run(target("10.1.1.1")).await;
        assert!(result.success);

        let transcript = std::fs::read_to_string(dir.path().join("logs/10.1.1.1")).unwrap();
        assert!(transcript.contains("Device:     10.1.1.1\n"));
    }
}
