//! Channel layer for pattern matching over the terminal stream.
//!
//! This module handles the wait-for-prompt loop, including pattern-based
//! prompt detection and ANSI stripping.

mod buffer;
mod patterns;
mod pty;

pub use buffer::PatternBuffer;
pub use patterns::{
    COMMAND_PROMPT, HOST_KEY_FAILURE, PASSWORD_PROMPT, PromptKind, PromptMatcher, PromptOutcome,
    TRUST_PROMPT, is_command_prompt,
};
pub use pty::PtyChannel;
