//! Builder for session runners.

use std::path::PathBuf;
use std::time::Duration;

use super::runner::SessionRunner;
use crate::commands::CommandSource;
use crate::config::SessionOptions;
use crate::transport::{Connector, SpawnConfig, SshConnector};

/// Builder for constructing session runners.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use swssh::{CommandSource, Credential, RunnerBuilder, Target};
///
/// # async fn example() {
/// let runner = RunnerBuilder::new()
///     .timeout(Duration::from_secs(15))
///     .commands(CommandSource::inline("show version;show ip int brief"))
///     .ssh_option("-o")
///     .ssh_option("StrictHostKeyChecking=no")
///     .build();
///
/// let target = Target::new("10.1.1.1", 22, Credential::new("npc", "secret"));
/// let result = runner.run(target).await;
/// println!("{}: {}", result.label(), result.success);
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct RunnerBuilder {
    options: SessionOptions,
}

impl RunnerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for each expected pattern (default: 10s).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = timeout;
        self
    }

    /// Pause after each send (default: 0.5s).
    pub fn settle(mut self, settle: Duration) -> Self {
        self.options.settle = settle;
        self
    }

    /// Persist the running configuration after the commands.
    pub fn save_config(mut self, save: bool) -> Self {
        self.options.save_config = save;
        self
    }

    /// Look up the port facing the default gateway.
    pub fn discover_uplink(mut self, discover: bool) -> Self {
        self.options.discover_uplink = discover;
        self
    }

    /// Write one transcript file per host under `dir`.
    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.options.log_dir = Some(dir.into());
        self
    }

    pub fn commands(mut self, commands: CommandSource) -> Self {
        self.options.commands = commands;
        self
    }

    /// Remote-shell client to run instead of `ssh`.
    pub fn ssh_program(mut self, program: impl Into<String>) -> Self {
        self.options.spawn.program = program.into();
        self
    }

    /// Append one argument for the client, placed before the host.
    pub fn ssh_option(mut self, arg: impl Into<String>) -> Self {
        self.options.spawn.extra_args.push(arg.into());
        self
    }

    /// Replace the whole spawn configuration.
    pub fn spawn_config(mut self, spawn: SpawnConfig) -> Self {
        self.options.spawn = spawn;
        self
    }

    /// The options collected so far.
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Build a runner that spawns the OpenSSH client.
    pub fn build(self) -> SessionRunner<SshConnector> {
        self.build_with(SshConnector)
    }

    /// Build a runner on a custom connector.
    pub fn build_with<C: Connector>(self, connector: C) -> SessionRunner<C> {
        SessionRunner::new(connector, self.options)
    }
}
