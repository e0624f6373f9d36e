//! `swssh`: run CLI commands on many switches over interactive SSH.
//!
//! ```bash
//! swssh --uid npc -p --host 192.168.161.10 --cmd "disp users"
//! swssh --uid npc --password-stdin --host 192.168.161.10 --cmd "disp users" < pw
//! SWSSH_PASSWORD=secret swssh --uid npc --host-file ~/ip.test --cmd-prefix ~/cmd.test \
//!     --log-dir /var/log/test/$(date +%Y%m%d) --report run.json
//! ```

use std::error::Error as StdError;
use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use log::{error, info, warn};

use swssh::config::DEFAULT_MAX_SESSIONS;
use swssh::error::ConfigError;
use swssh::{
    CommandSource, Credential, RunConfig, RunnerBuilder, SessionOptions, SessionResult,
    SessionRunner, SshConnector, Target, dispatch, parse_host_file, parse_host_list,
};

/// Emulates an operator logging in to network devices over SSH and running
/// CLI commands on them.
#[derive(Parser, Debug)]
#[command(name = "swssh", version)]
#[command(after_help = "--cmd has higher priority than --cmd-prefix.")]
struct Args {
    /// SSH username
    #[arg(long)]
    uid: String,

    /// SSH password
    #[arg(long, env = "SWSSH_PASSWORD", hide_env_values = true)]
    pwd: Option<String>,

    /// Ask for the SSH password without echoing it (wins over --pwd)
    #[arg(short = 'p', conflicts_with = "password_stdin")]
    prompt_password: bool,

    /// Read the SSH password from the first line of stdin (wins over --pwd)
    #[arg(long)]
    password_stdin: bool,

    /// Comma-separated targets, e.g. 10.1.1.1,10.1.1.2:2222
    #[arg(long, value_name = "IP[:PORT],...", required_unless_present = "host_file")]
    host: Option<String>,

    /// File with one IP[:PORT] per line; --host wins when both are given
    #[arg(long, alias = "host_file", value_name = "FILE")]
    host_file: Option<PathBuf>,

    /// Commands to run, separated by ';'
    #[arg(long, value_name = "CMD1;CMD2;...")]
    cmd: Option<String>,

    /// Prefix of per-vendor command files (<prefix>.cmd.<vendor>)
    #[arg(long, alias = "cmd_prefix", value_name = "PREFIX")]
    cmd_prefix: Option<PathBuf>,

    /// Pause after each command is sent
    #[arg(long, alias = "cmd_interval", value_name = "SECS", default_value_t = 0.5)]
    cmd_interval: f64,

    /// Save the configuration after the commands
    #[arg(long)]
    save: bool,

    /// Write each transcript to <DIR>/<ip> instead of stdout
    #[arg(long, alias = "log_dir", value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Maximum number of sessions running at once
    #[arg(long, alias = "thread", value_name = "NUM", default_value_t = DEFAULT_MAX_SESSIONS)]
    max_sessions: usize,

    /// Wait for each expected prompt
    #[arg(long, value_name = "SECS", default_value_t = 10.0)]
    timeout: f64,

    /// Look up the layer-2 uplink towards the default gateway
    #[arg(long, alias = "l2_sw")]
    l2_sw: bool,

    /// Run a target once more after its stale known_hosts entry was removed
    #[arg(long)]
    retry_host_key: bool,

    /// SSH client to run
    #[arg(long, value_name = "PROGRAM", default_value = "ssh")]
    ssh_program: String,

    /// Extra argument for the SSH client (repeatable)
    #[arg(long, value_name = "ARG", allow_hyphen_values = true)]
    ssh_option: Vec<String>,

    /// Write a JSON report of all sessions
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let (runner, targets) = match prepare(&args) {
        Ok(prepared) => prepared,
        Err(e) => {
            eprintln!("swssh: {}", e);
            return ExitCode::from(2);
        }
    };
    if targets.is_empty() {
        eprintln!("swssh: no targets given");
        return ExitCode::from(2);
    }

    let config = RunConfig {
        max_sessions: args.max_sessions,
        retry_repaired_host_keys: args.retry_host_key,
    };
    let results = dispatch(&runner, targets, &config).await;

    if let Some(path) = &args.report {
        if let Err(e) = write_report(path, &results) {
            error!("failed to write report {}: {}", path.display(), e);
            return ExitCode::FAILURE;
        }
        info!("report written to {}", path.display());
    }

    let failed = results.iter().filter(|r| !r.success).count();
    info!("{} of {} sessions succeeded", results.len() - failed, results.len());
    if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn prepare(args: &Args) -> Result<(SessionRunner<SshConnector>, Vec<Target>), Box<dyn StdError>> {
    let credential = Credential::new(&args.uid, password(args)?);

    let targets = match (&args.host, &args.host_file) {
        (Some(list), _) => parse_host_list(list, &credential)?,
        (None, Some(path)) => parse_host_file(path, &credential)?,
        (None, None) => return Err(ConfigError::Missing("--host or --host-file").into()),
    };

    let commands = CommandSource::from_options(args.cmd.as_deref(), args.cmd_prefix.as_deref());
    if commands == CommandSource::None {
        warn!("neither --cmd nor --cmd-prefix given; sessions will only log in and out");
    }

    let mut builder = RunnerBuilder::new()
        .timeout(SessionOptions::timeout_from_secs(args.timeout))
        .settle(SessionOptions::settle_from_secs(args.cmd_interval))
        .save_config(args.save)
        .discover_uplink(args.l2_sw)
        .commands(commands)
        .ssh_program(&args.ssh_program);
    for option in &args.ssh_option {
        builder = builder.ssh_option(option);
    }
    if let Some(dir) = &args.log_dir {
        builder = builder.log_dir(dir);
    }
    Ok((builder.build(), targets))
}

fn password(args: &Args) -> Result<String, Box<dyn StdError>> {
    if args.prompt_password {
        let pwd = rpassword::prompt_password("Password: ")?;
        if pwd.is_empty() {
            return Err(ConfigError::Missing("password").into());
        }
        return Ok(pwd);
    }
    if args.password_stdin {
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            return Err(ConfigError::Missing("password on stdin").into());
        }
        return Ok(line.to_string());
    }
    args.pwd
        .clone()
        .ok_or_else(|| ConfigError::Missing("-p, --pwd, SWSSH_PASSWORD or --password-stdin").into())
}

fn write_report(path: &Path, results: &[SessionResult]) -> Result<(), Box<dyn StdError>> {
    let mut out = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut out, results)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}
