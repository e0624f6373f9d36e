//! Session driving: the per-device automaton and the runner around it.
//!
//! [`Session`] owns the protocol steps; [`SessionRunner`] strings them
//! together, always logs out, and turns the outcome into a
//! [`SessionResult`].

mod builder;
pub mod response;
pub mod runner;
pub mod session;

pub use builder::RunnerBuilder;
pub use response::{CommandEntry, CommandRecord, FailureReason, SessionResult};
pub use runner::SessionRunner;
pub use session::{Identity, Session, SessionState};
