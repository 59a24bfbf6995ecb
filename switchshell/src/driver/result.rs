//! Result type for command runs.

use std::fmt;
use std::time::Duration;

use crate::channel::clean_output;

/// Output given for a session that has no connection.
pub const NOT_CONNECTED_MESSAGE: &str = "ERROR: connection not established";

/// How a command run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// The shell came back to an idle prompt.
    PromptMatched,

    /// No prompt within the request's timeout.
    TimedOut,

    /// The session had no connection; nothing was sent.
    NotConnected,

    /// The channel failed to open or broke mid-run.
    ChannelFailed(String),
}

impl RunStatus {
    /// Numeric status: 0 when the prompt matched, -1 otherwise.
    pub fn code(&self) -> i32 {
        match self {
            RunStatus::PromptMatched => 0,
            _ => -1,
        }
    }

    /// Check if the run reached the prompt.
    pub fn is_success(&self) -> bool {
        matches!(self, RunStatus::PromptMatched)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::PromptMatched => write!(f, "prompt matched"),
            RunStatus::TimedOut => write!(f, "timed out"),
            RunStatus::NotConnected => write!(f, "not connected"),
            RunStatus::ChannelFailed(reason) => write!(f, "channel failed: {}", reason),
        }
    }
}

/// Outcome of one command on one host.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Host the command ran on.
    pub host: String,

    /// The command as the caller wrote it.
    pub command: String,

    /// How the run ended.
    pub status: RunStatus,

    /// Raw output, including any diagnostic trailer.
    pub output: String,

    /// Time from the start of the run until it ended.
    pub elapsed: Duration,
}

impl CommandResult {
    /// Create a result.
    pub fn new(
        host: impl Into<String>,
        command: impl Into<String>,
        status: RunStatus,
        output: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            host: host.into(),
            command: command.into(),
            status,
            output: output.into(),
            elapsed,
        }
    }

    /// Result for a session without a connection.
    pub fn not_connected(host: impl Into<String>, command: impl Into<String>) -> Self {
        Self::new(
            host,
            command,
            RunStatus::NotConnected,
            NOT_CONNECTED_MESSAGE,
            Duration::ZERO,
        )
    }

    /// Numeric status, see [`RunStatus::code`].
    pub fn code(&self) -> i32 {
        self.status.code()
    }

    /// Check if the command reached the prompt.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Check if the command ran out of time.
    pub fn timed_out(&self) -> bool {
        self.status == RunStatus::TimedOut
    }

    /// Output with escape sequences, carriage returns and pager artifacts removed.
    pub fn clean_output(&self) -> String {
        clean_output(&self.output)
    }
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.output)
    }
}
