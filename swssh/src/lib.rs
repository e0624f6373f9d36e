//! # swssh
//!
//! Run CLI commands over interactive SSH on fleets of network switches.
//!
//! swssh drives the OpenSSH client inside a pseudo-terminal the way an
//! operator would: it answers the trust question, types the password, waits
//! for the command prompt, works out the vendor and model from the version
//! output, and then runs the requested commands with paging turned off.
//! Everything the device prints is kept as a per-host transcript.
//!
//! ## Features
//!
//! - Cisco IOS, Cisco Nexus, H3C Comware and Huawei VRP out of the box
//! - Vendor-specific command files (`<prefix>.cmd.<vendor>`)
//! - Optional configuration save and layer-2 uplink discovery
//! - Automatic removal of stale `known_hosts` entries
//! - Bounded concurrency across thousands of hosts
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use swssh::{CommandSource, Credential, RunConfig, RunnerBuilder, dispatch, parse_host_list};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), swssh::Error> {
//!     let credential = Credential::new("npc", "secret");
//!     let targets = parse_host_list("10.1.1.1,10.1.1.2:2222", &credential)?;
//!
//!     let runner = RunnerBuilder::new()
//!         .commands(CommandSource::inline("show version;show ip int brief"))
//!         .log_dir("logs")
//!         .build();
//!
//!     for result in dispatch(&runner, targets, &RunConfig::default()).await {
//!         println!("{} {}", result.label(), result.success);
//!     }
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod driver;
pub mod error;
pub mod known_hosts;
pub mod platform;
pub mod targets;
pub mod transcript;
pub mod transport;

// Re-export main types for convenience
pub use commands::CommandSource;
pub use config::{RunConfig, SessionOptions};
pub use dispatch::dispatch;
pub use driver::{RunnerBuilder, Session, SessionResult, SessionRunner};
pub use error::Error;
pub use platform::{VendorProfile, VendorRegistry};
pub use targets::{parse_host_file, parse_host_list};
pub use transport::{Credential, SpawnConfig, SshConnector, Target};
