//! The session automaton: login, identification and command execution on
//! one device.
//!
//! ```text
//! Connecting ─► AwaitingLoginPrompt ─► AwaitingCommandPrompt ─► Authenticated ─► Identified
//!                    │   ▲ yes (once)           │                     │
//!                    └───┘                      ▼                     ▼
//!                                        Failed { retryable }  ◄──────┘
//! ```
//!
//! Every step is strictly sequential: send, pause for the settle interval,
//! then wait for a pattern. Timeouts apply to each wait, not to the session.

use std::time::Duration;

use log::{debug, error, info, warn};
use once_cell::unsync::OnceCell;
use tokio::time::{Instant, sleep};

use super::response::CommandRecord;
use crate::channel::{PromptKind, PromptMatcher, PromptOutcome, PtyChannel};
use crate::config::SessionOptions;
use crate::error::{AuthError, CommandError, DetectionError, Error, Result, Stage, TimeoutError};
use crate::known_hosts;
use crate::platform::{VendorProfile, VendorRegistry};
use crate::transport::{Target, Transport};

/// Version probe understood by H3C and Huawei devices.
pub const VERSION_PROBE: &str = "display version | in (Huawei|H3C).*(Software|uptime)";

/// Version probe for Cisco devices, sent when the first one is rejected.
pub const CISCO_VERSION_PROBE: &str = "show version | in Cisco.*Software|cisco.*(Chassis|processor)";

/// Markers of a rejected command in probe output.
const INVALID_MARKERS: [&str; 2] = ["% Invalid", "Unrecognized command"];

/// Where the automaton currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    AwaitingLoginPrompt,
    AwaitingCommandPrompt,
    Authenticated,
    Identified,
    Failed { retryable: bool },
    Closed,
}

/// Vendor and model of an identified device.
#[derive(Debug, Clone)]
pub struct Identity {
    pub vendor: &'static VendorProfile,
    pub model: String,
}

/// One login-to-logout interaction with a device.
pub struct Session<T> {
    channel: PtyChannel<T>,
    target: Target,
    timeout: Duration,
    settle: Duration,
    save_timeout: Duration,
    registry: &'static VendorRegistry,
    state: SessionState,
    authenticated: bool,
    identity: OnceCell<Identity>,
    uplink: Option<String>,
    records: Vec<CommandRecord>,
    save_attempted: bool,
}

impl<T: Transport> Session<T> {
    /// Start a session on an already spawned channel.
    pub fn new(channel: PtyChannel<T>, target: Target, options: &SessionOptions) -> Self {
        Self {
            channel,
            target,
            timeout: options.timeout,
            settle: options.effective_settle(),
            save_timeout: options.save_timeout(),
            registry: VendorRegistry::global(),
            state: SessionState::Connecting,
            authenticated: false,
            identity: OnceCell::new(),
            uplink: None,
            records: Vec::new(),
            save_attempted: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.get()
    }

    pub fn vendor(&self) -> Option<&str> {
        self.identity().map(|identity| identity.vendor.id.as_str())
    }

    pub fn model(&self) -> Option<&str> {
        self.identity().map(|identity| identity.model.as_str())
    }

    pub fn uplink(&self) -> Option<&str> {
        self.uplink.as_deref()
    }

    /// Commands sent so far, in order.
    pub fn records(&self) -> &[CommandRecord] {
        &self.records
    }

    pub fn save_attempted(&self) -> bool {
        self.save_attempted
    }

    /// Whether login reached a command prompt.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Write text to the transcript.
    pub fn annotate(&mut self, text: &str) {
        self.channel.annotate(text);
    }

    fn label(&self) -> String {
        self.target.label()
    }

    /// Enter `Failed` and hand the error back.
    pub fn fail(&mut self, err: impl Into<Error>) -> Error {
        let err = err.into();
        let retryable = err.is_retryable();
        self.state = SessionState::Failed { retryable };
        error!("{}: {}", self.label(), err);
        err
    }

    /// Drive the login handshake until the first command prompt.
    pub async fn login(&mut self) -> Result<()> {
        sleep(self.settle).await;
        self.state = SessionState::AwaitingLoginPrompt;

        let mut outcome = self.channel.expect(PromptMatcher::login(), self.timeout).await;
        if outcome.kind == PromptKind::TrustConfirmation {
            debug!("{}: accepting host key", self.label());
            self.send_step("yes").await?;
            outcome = self.channel.expect(PromptMatcher::login(), self.timeout).await;
            if outcome.kind == PromptKind::TrustConfirmation {
                return Err(self.fail(AuthError::RepeatedTrustPrompt {
                    host: self.target.host.clone(),
                    port: self.target.port,
                }));
            }
        }

        match outcome.kind {
            PromptKind::Password => {
                let secret = self.target.credential.secret().to_owned();
                self.send_step(&secret).await?;
            }
            PromptKind::HostKeyFailure => return Err(self.host_key_failure(outcome).await),
            PromptKind::Timeout => {
                return Err(self.fail(TimeoutError::new(Stage::Login, self.timeout)));
            }
            _ => {
                return Err(self.fail(AuthError::NoLoginPrompt {
                    host: self.target.host.clone(),
                    port: self.target.port,
                }));
            }
        }

        self.state = SessionState::AwaitingCommandPrompt;
        let outcome = self
            .channel
            .expect(PromptMatcher::after_password(), self.timeout)
            .await;
        match outcome.kind {
            PromptKind::CommandPrompt => {
                self.state = SessionState::Authenticated;
                self.authenticated = true;
                info!("{}: logged in as {}", self.label(), self.target.credential.username);
                Ok(())
            }
            PromptKind::Password => Err(self.fail(AuthError::Rejected {
                user: self.target.credential.username.clone(),
            })),
            PromptKind::Timeout => Err(self.fail(TimeoutError::new(Stage::Login, self.timeout))),
            _ => Err(self.fail(AuthError::NoCommandPrompt {
                host: self.target.host.clone(),
                port: self.target.port,
            })),
        }
    }

    /// Repair the trust store from the failure text; the attempt fails either way.
    ///
    /// The file rewrite runs on the blocking pool.
    async fn host_key_failure(&mut self, outcome: PromptOutcome) -> Error {
        let host = self.target.host.clone();
        let port = self.target.port;
        let repaired = tokio::task::spawn_blocking(move || known_hosts::repair(&outcome.text)).await;
        let err = match repaired {
            Ok(Ok(Some(entry))) => AuthError::HostKeyRepaired {
                host,
                port,
                path: entry.path,
                line: entry.line,
            },
            Ok(Ok(None)) => AuthError::HostKeyMismatch { host, port },
            Ok(Err(e)) => {
                warn!("{}: {}", self.label(), e);
                AuthError::HostKeyMismatch { host, port }
            }
            Err(e) => {
                warn!("{}: known_hosts repair did not finish: {}", self.label(), e);
                AuthError::HostKeyMismatch { host, port }
            }
        };
        self.fail(err)
    }

    /// Identify vendor and model from version output.
    ///
    /// Both are set together, once; a failure leaves both unset.
    pub async fn identify(&mut self) -> Result<&Identity> {
        if self.identity.get().is_none() {
            let identity = self.detect().await?;
            info!(
                "{}: vendor {}, model {}",
                self.label(),
                identity.vendor.id,
                identity.model
            );
            let _ = self.identity.set(identity);
            self.state = SessionState::Identified;
        }
        self.identity
            .get()
            .ok_or_else(|| DetectionError::UnknownVendor.into())
    }

    async fn detect(&mut self) -> Result<Identity> {
        if !self.authenticated {
            return Err(AuthError::NoCommandPrompt {
                host: self.target.host.clone(),
                port: self.target.port,
            }
            .into());
        }

        let mut output = self.probe(VERSION_PROBE).await?;
        if INVALID_MARKERS.iter().any(|marker| output.contains(marker)) {
            debug!("{}: falling back to the cisco version probe", self.label());
            output = self.probe(CISCO_VERSION_PROBE).await?;
        }

        let registry = self.registry;
        let Some(vendor) = registry.detect(&output) else {
            return Err(self.fail(DetectionError::UnknownVendor));
        };
        let Some(model) = vendor.extract_model(&output) else {
            return Err(self.fail(DetectionError::UnknownModel {
                vendor: vendor.id.clone(),
            }));
        };
        Ok(Identity { vendor, model })
    }

    async fn probe(&mut self, command: &str) -> Result<String> {
        let outcome = self.exchange(command, self.timeout).await?;
        match outcome.kind {
            PromptKind::CommandPrompt => Ok(outcome.text),
            PromptKind::Timeout => Err(self.fail(TimeoutError::new(Stage::Detection, self.timeout))),
            _ => Err(self.fail(DetectionError::Closed)),
        }
    }

    fn identified(&self) -> Result<&'static VendorProfile> {
        self.identity
            .get()
            .map(|identity| identity.vendor)
            .ok_or_else(|| DetectionError::UnknownVendor.into())
    }

    /// Turn off output pagination.
    pub async fn disable_paging(&mut self) -> Result<()> {
        let vendor = self.identified()?;
        let Some(command) = vendor.paging_command.as_deref() else {
            return Ok(());
        };
        let outcome = self.exchange(command, self.timeout).await?;
        match outcome.kind {
            PromptKind::Timeout => {
                Err(self.fail(TimeoutError::new(Stage::Pagination, self.timeout)))
            }
            PromptKind::ProcessError => {
                warn!("{}: stream ended while disabling pagination", self.label());
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Find the local port facing the default gateway.
    ///
    /// Best effort: any missing value or failed wait ends the chain with no
    /// uplink and no error.
    pub async fn discover_uplink(&mut self) -> Option<String> {
        let vendor = self.identified().ok()?;
        let uplink = self.uplink_chain(vendor).await;
        match &uplink {
            Some(port) => info!("{}: layer-2 uplink {}", self.label(), port),
            None => debug!("{}: no layer-2 uplink found", self.label()),
        }
        self.uplink = uplink.clone();
        uplink
    }

    async fn uplink_chain(&mut self, vendor: &'static VendorProfile) -> Option<String> {
        let output = self.uplink_step(vendor.gateway_ip_command.as_deref()?).await?;
        let ip = vendor.extract_gateway_ip(&output)?;

        let command = vendor.gateway_mac_command(&ip)?;
        let output = self.uplink_step(&command).await?;
        let mac = vendor.extract_mac(&output)?;

        let command = vendor.mac_table_command(&mac)?;
        let output = self.uplink_step(&command).await?;
        vendor.extract_uplink(&output, &command, &mac)
    }

    async fn uplink_step(&mut self, command: &str) -> Option<String> {
        match self.exchange(command, self.timeout).await {
            Ok(outcome) if outcome.kind == PromptKind::CommandPrompt => Some(outcome.text),
            Ok(outcome) => {
                warn!("{}: '{}' ended with {:?}", self.label(), command, outcome.kind);
                None
            }
            Err(e) => {
                warn!("{}: '{}' failed: {}", self.label(), command, e);
                None
            }
        }
    }

    /// Run user commands in order.
    ///
    /// A timeout stops the loop and fails the session. Any other fault on a
    /// single command is logged and the loop moves on.
    pub async fn run_commands(&mut self, commands: &[String]) -> Result<()> {
        self.identified()?;
        for command in commands.iter().map(|c| c.trim()).filter(|c| !c.is_empty()) {
            sleep(self.settle).await;
            let started = Instant::now();

            let outcome = match self.exchange(command, self.timeout).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.records
                        .push(CommandRecord::new(command, "", started.elapsed(), true));
                    warn!(
                        "{}: {}",
                        self.label(),
                        CommandError::Failed {
                            command: command.to_string(),
                            message: e.to_string(),
                        }
                    );
                    continue;
                }
            };

            let truncated = outcome.kind != PromptKind::CommandPrompt;
            self.records.push(CommandRecord::new(
                command,
                outcome.text,
                started.elapsed(),
                truncated,
            ));
            match outcome.kind {
                PromptKind::Timeout => {
                    return Err(self.fail(TimeoutError::new(Stage::Command, self.timeout)));
                }
                PromptKind::ProcessError => warn!(
                    "{}: {}",
                    self.label(),
                    CommandError::Failed {
                        command: command.to_string(),
                        message: "stream ended before the prompt".to_string(),
                    }
                ),
                _ => debug!("{}: '{}' done", self.label(), command),
            }
        }
        Ok(())
    }

    /// Persist the running configuration.
    pub async fn save(&mut self) -> Result<()> {
        let vendor = self.identified()?;
        let Some(command) = vendor.save_command.as_deref() else {
            return Ok(());
        };
        self.save_attempted = true;
        info!("{}: saving configuration", self.label());

        let outcome = match self.exchange(command, self.save_timeout).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("{}: save failed: {}", self.label(), e);
                return Ok(());
            }
        };
        match outcome.kind {
            PromptKind::Timeout => {
                Err(self.fail(TimeoutError::new(Stage::Save, self.save_timeout)))
            }
            PromptKind::ProcessError => {
                warn!("{}: save failed: stream ended", self.label());
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Leave the device if login succeeded; the outcome is ignored.
    pub async fn logout(&mut self) {
        if !self.authenticated {
            return;
        }
        let registry = self.registry;
        let vendor: &'static VendorProfile = self
            .identity
            .get()
            .map(|identity| identity.vendor)
            .unwrap_or_else(|| registry.unknown());
        match self.exchange(&vendor.logout_command, self.timeout).await {
            Ok(outcome) => debug!("{}: logout ended with {:?}", self.label(), outcome.kind),
            Err(e) => debug!("{}: logout failed: {}", self.label(), e),
        }
    }

    /// Terminate the remote shell.
    pub async fn close(&mut self) {
        if let Err(e) = self.channel.close().await {
            warn!("{}: close failed: {}", self.label(), e);
        }
        if !matches!(self.state, SessionState::Failed { .. }) {
            self.state = SessionState::Closed;
        }
    }

    /// Send a blank line and `command`, pause, then wait for the prompt.
    async fn exchange(&mut self, command: &str, timeout: Duration) -> Result<PromptOutcome> {
        self.channel.send_line("").await?;
        self.channel.send_line(command).await?;
        sleep(self.settle).await;
        Ok(self.channel.expect(PromptMatcher::command(), timeout).await)
    }

    /// Send one login answer and pause.
    async fn send_step(&mut self, line: &str) -> Result<()> {
        if let Err(e) = self.channel.send_line(line).await {
            return Err(self.fail(e));
        }
        sleep(self.settle).await;
        Ok(())
    }
}
