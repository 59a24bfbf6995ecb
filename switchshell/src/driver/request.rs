//! Command requests and caller input handling.

use std::time::Duration;

/// Timeout applied when a request does not set one.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Command sent ahead of the request when enable mode is wanted.
pub const ENABLE_COMMAND: &str = "enable";

/// One command to run on a shell, with optional follow-up input.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use switchshell::CommandRequest;
///
/// let request = CommandRequest::new("show interfaces ethernet status")
///     .with_input("yes\\nsecret")
///     .with_timeout(Duration::from_secs(60))
///     .with_enable(true);
///
/// assert_eq!(request.input(), ["yes", "secret"]);
/// assert_eq!(request.wire_command(), "enable\nshow interfaces ethernet status");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    command: String,
    input: Vec<String>,
    timeout: Duration,
    enable: bool,
}

impl CommandRequest {
    /// Create a request with no input, the default timeout and enable mode off.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            input: Vec::new(),
            timeout: DEFAULT_COMMAND_TIMEOUT,
            enable: false,
        }
    }

    /// Set free-form input, normalized with [`normalize_input`].
    pub fn with_input(mut self, input: &str) -> Self {
        self.input = normalize_input(Some(input));
        self
    }

    /// Set input lines as-is.
    pub fn with_input_lines<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.input = lines.into_iter().map(Into::into).collect();
        self
    }

    /// Set the time allowed for the prompt to come back.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enter enable mode before running the command.
    pub fn with_enable(mut self, enable: bool) -> Self {
        self.enable = enable;
        self
    }

    /// The command as the caller wrote it.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Input lines fed to the shell, one per read, after the command.
    pub fn input(&self) -> &[String] {
        &self.input
    }

    /// Time allowed for the prompt to come back.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether enable mode is entered first.
    pub fn enable(&self) -> bool {
        self.enable
    }

    /// Text written to the channel, without the final line terminator.
    pub fn wire_command(&self) -> String {
        if self.enable {
            format!("{}\n{}", ENABLE_COMMAND, self.command)
        } else {
            self.command.clone()
        }
    }
}

/// Split free-form caller input into lines.
///
/// A literal two-character `\n` counts as a line break, the same as a real
/// one. `None` and the empty string mean no input at all. Otherwise the text
/// is split exactly on line breaks, so a trailing break yields a trailing
/// empty line, which is sent as a bare Enter.
pub fn normalize_input(input: Option<&str>) -> Vec<String> {
    match input {
        None | Some("") => Vec::new(),
        Some(text) => text
            .replace("\\n", "\n")
            .split('\n')
            .map(str::to_string)
            .collect(),
    }
}
