//! In-memory transport driven by a scripted device.
//!
//! [`ScriptedTransport`] turns every complete input line into a call on a
//! [`Responder`] and queues the reply as output, so a test can drive the whole
//! login/command protocol without spawning a process. [`FakeDevice`] is a
//! responder that behaves like a small vendor CLI.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use super::config::{SpawnConfig, Target};
use super::{Connector, Transport};
use crate::error::{Result, TransportError};

/// What a scripted device emits in response to input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    pub output: Vec<u8>,
    /// End the stream after this output.
    pub close: bool,
}

impl Reply {
    pub fn text(output: impl Into<String>) -> Self {
        Self {
            output: output.into().into_bytes(),
            close: false,
        }
    }

    pub fn closing(output: impl Into<String>) -> Self {
        Self {
            output: output.into().into_bytes(),
            close: true,
        }
    }

    pub fn silent() -> Self {
        Self::default()
    }
}

/// Device behaviour behind a [`ScriptedTransport`].
pub trait Responder: Send {
    /// Output as soon as the client starts.
    fn start(&mut self) -> Reply;

    /// Output for one input line, without its terminator.
    fn line(&mut self, line: &str) -> Reply;
}

/// A transport whose output is produced by a [`Responder`].
pub struct ScriptedTransport<R> {
    responder: R,
    pending: VecDeque<Vec<u8>>,
    partial: Vec<u8>,
    closed: bool,
}

impl<R: Responder> ScriptedTransport<R> {
    pub fn new(responder: R) -> Self {
        let mut transport = Self {
            responder,
            pending: VecDeque::new(),
            partial: Vec::new(),
            closed: false,
        };
        let greeting = transport.responder.start();
        transport.push(greeting);
        transport
    }

    fn push(&mut self, reply: Reply) {
        if !reply.output.is_empty() {
            self.pending.push_back(reply.output);
        }
        if reply.close {
            self.closed = true;
        }
    }

    /// Split complete lines off the input; `\r`, `\n` and `\r\n` all end a line.
    fn feed(&mut self, data: &[u8]) {
        self.partial.extend_from_slice(data);
        while let Some(pos) = memchr::memchr2(b'\r', b'\n', &self.partial) {
            let mut consumed = pos + 1;
            if self.partial[pos] == b'\r' && self.partial.get(pos + 1) == Some(&b'\n') {
                consumed += 1;
            }
            let line = String::from_utf8_lossy(&self.partial[..pos]).into_owned();
            self.partial.drain(..consumed);
            if self.closed {
                continue;
            }
            let reply = self.responder.line(&line);
            self.push(reply);
        }
    }
}

impl<R: Responder> Transport for ScriptedTransport<R> {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        if self.closed && self.pending.is_empty() {
            return Err(TransportError::Closed.into());
        }
        self.feed(data);
        Ok(())
    }

    async fn recv(&mut self) -> Result<Vec<u8>> {
        if let Some(chunk) = self.pending.pop_front() {
            return Ok(chunk);
        }
        if self.closed {
            return Err(TransportError::Closed.into());
        }
        // A silent device never answers; the caller's deadline ends the wait.
        std::future::pending().await
    }

    fn try_recv(&mut self) -> Result<Option<Vec<u8>>> {
        match self.pending.pop_front() {
            Some(chunk) => Ok(Some(chunk)),
            None if self.closed => Err(TransportError::Closed.into()),
            None => Ok(None),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.pending.clear();
        Ok(())
    }
}

/// Lines a [`FakeDevice`] received, shared between clones.
#[derive(Debug, Clone, Default)]
pub struct InputLog(Arc<Mutex<Vec<String>>>);

impl InputLog {
    fn push(&self, line: &str) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_string());
    }

    /// Snapshot of all received lines.
    pub fn lines(&self) -> Vec<String> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// How many times `line` was received.
    pub fn count(&self, line: &str) -> usize {
        self.lines().iter().filter(|l| *l == line).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoginState {
    Trust(usize),
    Password,
    Shell,
}

/// A scripted network device CLI.
///
/// Answers the ssh trust question, checks the password, echoes commands and
/// replies with canned output followed by its prompt. Unknown commands get the
/// configured invalid-command marker; logout commands end the stream.
#[derive(Debug, Clone)]
pub struct FakeDevice {
    prompt: String,
    password: String,
    trust_prompts: usize,
    host_key_failure: Option<String>,
    replies: HashMap<String, String>,
    silent: HashSet<String>,
    invalid: String,
    exit_commands: HashSet<String>,
    state: LoginState,
    log: InputLog,
}

impl FakeDevice {
    /// A device with the given prompt (e.g. `<SW-1>` or `R1#`) and password.
    pub fn new(prompt: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            password: password.into(),
            trust_prompts: 0,
            host_key_failure: None,
            replies: HashMap::new(),
            silent: HashSet::new(),
            invalid: "% Unrecognized command found at '^' position.".to_string(),
            exit_commands: ["exit", "quit"].iter().map(|s| s.to_string()).collect(),
            state: LoginState::Password,
            log: InputLog::default(),
        }
    }

    /// Ask the trust question `times` times before the password.
    pub fn trust_prompts(mut self, times: usize) -> Self {
        self.trust_prompts = times;
        self
    }

    /// Refuse the connection with a changed-host-key banner naming `entry`
    /// (`path:line`).
    pub fn host_key_failure(mut self, entry: impl Into<String>) -> Self {
        self.host_key_failure = Some(entry.into());
        self
    }

    /// Canned output for `command`.
    pub fn reply(mut self, command: impl Into<String>, output: impl Into<String>) -> Self {
        self.replies.insert(command.into(), output.into());
        self
    }

    /// `command` is echoed but never completes.
    pub fn silent(mut self, command: impl Into<String>) -> Self {
        self.silent.insert(command.into());
        self
    }

    /// `command` is echoed and then the device drops the connection.
    pub fn hangs_up_on(mut self, command: impl Into<String>) -> Self {
        self.exit_commands.insert(command.into());
        self
    }

    /// Marker printed for commands without a canned reply.
    pub fn invalid_marker(mut self, marker: impl Into<String>) -> Self {
        self.invalid = marker.into();
        self
    }

    /// Handle on every line this device (and its clones) receives.
    pub fn input_log(&self) -> InputLog {
        self.log.clone()
    }

    fn password_prompt(&self) -> String {
        "npc@device's password: ".to_string()
    }

    fn trust_question(&self) -> String {
        "The authenticity of host 'device' can't be established.\r\n\
         RSA key fingerprint is 9c:9c:e2:41:7d:83:76:80:d5:fa:97:38:da:fe:4d:23.\r\n\
         Are you sure you want to continue connecting (yes/no)? "
            .to_string()
    }

    fn shell_line(&mut self, line: &str) -> Reply {
        if line.is_empty() {
            return Reply::text(format!("\r\n{}", self.prompt));
        }
        if self.exit_commands.contains(line) {
            return Reply::closing(format!("{}\r\n", line));
        }
        if self.silent.contains(line) {
            return Reply::text(format!("{}\r\n", line));
        }
        let body = match self.replies.get(line) {
            Some(body) => body.clone(),
            None if line == "end" || line == "return" => String::new(),
            None => self.invalid.clone(),
        };
        let mut out = format!("{}\r\n", line);
        if !body.is_empty() {
            out.push_str(&body.replace("\r\n", "\n").replace('\n', "\r\n"));
            if !out.ends_with("\r\n") {
                out.push_str("\r\n");
            }
        }
        out.push_str(&self.prompt);
        Reply::text(out)
    }
}

impl Responder for FakeDevice {
    fn start(&mut self) -> Reply {
        if let Some(entry) = &self.host_key_failure {
            return Reply::closing(format!(
                "@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@\r\n\
                 @    WARNING: REMOTE HOST IDENTIFICATION HAS CHANGED!     @\r\n\
                 @@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@\r\n\
                 IT IS POSSIBLE THAT SOMEONE IS DOING SOMETHING NASTY!\r\n\
                 Please contact your system administrator.\r\n\
                 Offending key in {}\r\n\
                 RSA host key for device has changed and you have requested strict checking.\r\n\
                 Host key verification failed.\r\n",
                entry
            ));
        }
        if self.trust_prompts > 0 {
            self.state = LoginState::Trust(self.trust_prompts);
            return Reply::text(self.trust_question());
        }
        self.state = LoginState::Password;
        Reply::text(self.password_prompt())
    }

    fn line(&mut self, line: &str) -> Reply {
        self.log.push(line);
        match self.state {
            LoginState::Trust(remaining) => {
                if line != "yes" {
                    return Reply::closing("Host key verification failed.\r\n");
                }
                if remaining > 1 {
                    self.state = LoginState::Trust(remaining - 1);
                    return Reply::text(format!("yes\r\n{}", self.trust_question()));
                }
                self.state = LoginState::Password;
                Reply::text(format!(
                    "yes\r\nWarning: Permanently added 'device' (RSA) to the list of known hosts.\r\n{}",
                    self.password_prompt()
                ))
            }
            LoginState::Password => {
                if line == self.password {
                    self.state = LoginState::Shell;
                    Reply::text(format!(
                        "\r\n\r\n******************************************\r\n\
                         * Authorized access only                 *\r\n\
                         ******************************************\r\n\r\n{}",
                        self.prompt
                    ))
                } else {
                    Reply::text(format!(
                        "\r\nPermission denied, please try again.\r\n{}",
                        self.password_prompt()
                    ))
                }
            }
            LoginState::Shell => self.shell_line(line),
        }
    }
}

impl Connector for FakeDevice {
    type Transport = ScriptedTransport<FakeDevice>;

    fn connect(&self, _target: &Target, _config: &SpawnConfig) -> Result<Self::Transport> {
        Ok(ScriptedTransport::new(self.clone()))
    }
}
