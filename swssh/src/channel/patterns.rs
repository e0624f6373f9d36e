//! Prompt matching for the login and command stages.
//!
//! Two independent pattern sets are used. At login time the remote-shell
//! client may ask for a password, ask to trust an unknown host key, or refuse
//! a changed host key. Once logged in, a single permissive pattern recognises
//! the command prompt of every supported vendor, since the vendor is not known
//! yet when it is first needed.
//!
//! # Prompt Examples
//!
//! ```text
//! ^MBJ_XX_311-F-02_N7718-1#          # cisco nexus, stray CR before the prompt
//! <BJ_XX_305-A-15_CE5810>            # huawei / h3c user view
//! ^@<BJ_XX_311_F-12-13_LVS_S5560>    # h3c with a stray NUL
//! BJ-XXX-2-2960S-2016#               # cisco ios
//! [~BJ_XX_320-I-10_CE5810]           # huawei system view
//! ```

use once_cell::sync::Lazy;
use regex::bytes::Regex;

use super::buffer::PatternBuffer;

/// Command prompt: a line break, at most one stray byte, the prompt body and a
/// terminator, then only spaces to the end of the unread output.
pub const COMMAND_PROMPT: &str = r"(?:\r|\n).?[<>a-zA-Z0-9~@*/_\-\[\]()]+[>%#$\]] *$";

/// Password request from the ssh client or the device.
pub const PASSWORD_PROMPT: &str = r"(?i)password:\s*$";

/// Unknown host key, asking whether to continue connecting.
pub const TRUST_PROMPT: &str = r"\(yes/no(?:/\[fingerprint\])?\)\?";

/// Changed host key under strict checking.
pub const HOST_KEY_FAILURE: &str = r"Host key verification failed";

static LOGIN: Lazy<PromptMatcher> = Lazy::new(|| {
    PromptMatcher::new(vec![
        (PromptKind::Password, compile(PASSWORD_PROMPT), false),
        (PromptKind::TrustConfirmation, compile(TRUST_PROMPT), false),
        (PromptKind::HostKeyFailure, compile(HOST_KEY_FAILURE), false),
    ])
});

static COMMAND: Lazy<PromptMatcher> = Lazy::new(|| {
    PromptMatcher::new(vec![(
        PromptKind::CommandPrompt,
        compile(COMMAND_PROMPT),
        true,
    )])
});

static AFTER_PASSWORD: Lazy<PromptMatcher> = Lazy::new(|| {
    PromptMatcher::new(vec![
        (PromptKind::CommandPrompt, compile(COMMAND_PROMPT), true),
        (PromptKind::Password, compile(PASSWORD_PROMPT), false),
    ])
});

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in prompt pattern must compile")
}

/// Discriminant of one wait-for-pattern operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Password,
    TrustConfirmation,
    HostKeyFailure,
    CommandPrompt,
    Timeout,
    ProcessError,
}

/// Result of one wait: the discriminant plus the text consumed by it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptOutcome {
    pub kind: PromptKind,
    pub text: String,
}

impl PromptOutcome {
    pub fn new(kind: PromptKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// An ordered set of patterns, each tagged with the outcome it produces.
#[derive(Debug)]
pub struct PromptMatcher {
    /// `(outcome, pattern, search tail only)`.
    patterns: Vec<(PromptKind, Regex, bool)>,
}

impl PromptMatcher {
    /// Create a matcher from tagged patterns, in priority order.
    pub fn new(patterns: Vec<(PromptKind, Regex, bool)>) -> Self {
        Self { patterns }
    }

    /// Login-stage patterns: password, trust confirmation, host-key failure.
    pub fn login() -> &'static PromptMatcher {
        &LOGIN
    }

    /// Command-stage pattern.
    pub fn command() -> &'static PromptMatcher {
        &COMMAND
    }

    /// Command prompt, or the password prompt again if the credential was
    /// rejected.
    pub fn after_password() -> &'static PromptMatcher {
        &AFTER_PASSWORD
    }

    /// Find the pattern that matches first in the buffer.
    ///
    /// The match starting earliest wins; ties go to the earlier pattern.
    /// Returns the outcome and the end offset of the match.
    pub fn find_first(&self, buffer: &PatternBuffer) -> Option<(PromptKind, usize)> {
        let mut best: Option<(PromptKind, usize, usize)> = None;
        for (kind, pattern, tail_only) in &self.patterns {
            let found = if *tail_only {
                buffer.find_tail(pattern)
            } else {
                buffer.find(pattern)
            };
            if let Some((start, end)) = found {
                if best.is_none_or(|(_, best_start, _)| start < best_start) {
                    best = Some((*kind, start, end));
                }
            }
        }
        best.map(|(kind, _, end)| (kind, end))
    }
}

/// Check whether text ends in a command prompt.
pub fn is_command_prompt(text: &[u8]) -> bool {
    COMMAND
        .patterns
        .iter()
        .any(|(_, pattern, _)| pattern.is_match(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(text: &[u8]) -> PatternBuffer {
        let mut buffer = PatternBuffer::new(1000);
        buffer.extend(text);
        buffer
    }

    #[test]
    fn test_vendor_prompts_match() {
        assert!(is_command_prompt(b"\r\n<BJ_XX_305-A-15_CE5810>"));
        assert!(is_command_prompt(b"\r\nBJ-XXX-2-2960S-2016#"));
        assert!(is_command_prompt(b"\r\n[~BJ_XX_320-I-10_CE5810]"));
        assert!(is_command_prompt(b"\r\n<BJ-XXX-101-1109/1111-LVS-S5500>"));
        assert!(is_command_prompt(b"\n\x00<BJ_XX_311_F-12-13_LVS_S5560>"));
        assert!(is_command_prompt(b"\rBJ_XX_311-F-02_N7718-1# "));
    }

    #[test]
    fn test_prose_rejected() {
        assert!(!is_command_prompt(b"\r\nThis is a line of plain text"));
        assert!(!is_command_prompt(b"\r\nInterface is up, line protocol is up"));
        assert!(!is_command_prompt(b"\r\nnot a prompt# trailing words"));
        assert!(!is_command_prompt(b"<SW-1>"));
    }

    #[test]
    fn test_prompt_must_end_buffer() {
        assert!(!is_command_prompt(b"\r\n<SW-1>\r\nmore output"));
    }

    #[test]
    fn test_login_password() {
        let buf = buffer(b"npc@10.0.0.1's password: ");
        let (kind, end) = PromptMatcher::login().find_first(&buf).unwrap();
        assert_eq!(kind, PromptKind::Password);
        assert_eq!(end, buf.len());
    }

    #[test]
    fn test_login_password_case_insensitive() {
        let buf = buffer(b"Password:");
        let (kind, _) = PromptMatcher::login().find_first(&buf).unwrap();
        assert_eq!(kind, PromptKind::Password);
    }

    #[test]
    fn test_login_trust_prompts() {
        let legacy = buffer(b"Are you sure you want to continue connecting (yes/no)? ");
        let (kind, _) = PromptMatcher::login().find_first(&legacy).unwrap();
        assert_eq!(kind, PromptKind::TrustConfirmation);

        let modern = buffer(
            b"Are you sure you want to continue connecting (yes/no/[fingerprint])? ",
        );
        let (kind, _) = PromptMatcher::login().find_first(&modern).unwrap();
        assert_eq!(kind, PromptKind::TrustConfirmation);
    }

    #[test]
    fn test_login_host_key_failure() {
        let buf = buffer(
            b"Offending key in /root/.ssh/known_hosts:42\r\nHost key verification failed.\r\n",
        );
        let (kind, _) = PromptMatcher::login().find_first(&buf).unwrap();
        assert_eq!(kind, PromptKind::HostKeyFailure);
    }

    #[test]
    fn test_earliest_match_wins() {
        // The trust question comes before the (anchored) password prompt.
        let buf = buffer(b"continue connecting (yes/no)? password: ");
        let (kind, end) = PromptMatcher::login().find_first(&buf).unwrap();
        assert_eq!(kind, PromptKind::TrustConfirmation);
        assert_eq!(&buf.as_slice()[..end], b"continue connecting (yes/no)?");
    }

    #[test]
    fn test_after_password_detects_rejection() {
        let buf = buffer(b"\r\nPermission denied, please try again.\r\nnpc@10.0.0.1's password: ");
        let (kind, _) = PromptMatcher::after_password().find_first(&buf).unwrap();
        assert_eq!(kind, PromptKind::Password);

        let buf = buffer(b"\r\nInfo: welcome\r\n<SW-1>");
        let (kind, _) = PromptMatcher::after_password().find_first(&buf).unwrap();
        assert_eq!(kind, PromptKind::CommandPrompt);
    }

    #[test]
    fn test_no_match() {
        let buf = buffer(b"Last login: Mon Oct 12");
        assert!(PromptMatcher::login().find_first(&buf).is_none());
        assert!(PromptMatcher::command().find_first(&buf).is_none());
    }
}
