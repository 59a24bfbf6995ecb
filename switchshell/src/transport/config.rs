//! SSH connection configuration.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

/// Host key verification mode, analogous to OpenSSH's `StrictHostKeyChecking`.
#[derive(Debug, Clone, Default)]
pub enum HostKeyVerification {
    /// Reject unknown and changed keys.
    Strict,

    /// Accept and auto-learn unknown keys, but reject changed keys.
    #[default]
    AcceptNew,

    /// Accept all keys without checking. For lab use only.
    Disabled,
}

/// Authentication credential for one host.
#[derive(Debug)]
pub enum Credential {
    /// Password authentication.
    Password(SecretString),

    /// Private key authentication.
    PrivateKey {
        /// Path to the private key file.
        path: PathBuf,
        /// Optional passphrase for encrypted keys.
        passphrase: Option<SecretString>,
    },
}

impl Credential {
    /// Password credential from plain text.
    pub fn password(password: impl Into<String>) -> Self {
        Credential::Password(SecretString::from(password.into()))
    }
}

/// A remote host to run commands on. The hostname is its identity.
#[derive(Debug)]
pub struct HostEndpoint {
    /// Hostname or IP address.
    pub hostname: String,

    /// SSH port.
    pub port: u16,

    /// Login user.
    pub username: String,

    /// Login credential.
    pub credential: Credential,
}

impl HostEndpoint {
    /// Create an endpoint on the default SSH port.
    pub fn new(
        hostname: impl Into<String>,
        username: impl Into<String>,
        credential: Credential,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            port: 22,
            username: username.into(),
            credential,
        }
    }

    /// Override the SSH port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// `user@host:port`, as used in log lines.
    pub fn display_target(&self) -> String {
        format!("{}@{}:{}", self.username, self.hostname, self.port)
    }
}

/// Idle time after which a connection is dropped, unless a command timeout
/// needs longer.
pub const DEFAULT_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(300);

/// Connection options shared by every host of a run.
#[derive(Debug, Clone)]
pub struct SshOptions {
    /// Connect/authenticate timeout.
    pub connect_timeout: Duration,

    /// Drop the connection after this long without any traffic.
    pub inactivity_timeout: Option<Duration>,

    /// Negotiate zlib compression.
    pub compress: bool,

    /// Terminal width for the PTY.
    pub terminal_width: u32,

    /// Terminal height for the PTY. Pagers page at this height.
    pub terminal_height: u32,

    /// Host key verification mode.
    pub host_key_verification: HostKeyVerification,

    /// Path to known_hosts file.
    pub known_hosts_path: Option<PathBuf>,
}

impl Default for SshOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            inactivity_timeout: Some(DEFAULT_INACTIVITY_TIMEOUT),
            compress: true,
            terminal_width: 80,
            terminal_height: 24,
            host_key_verification: HostKeyVerification::AcceptNew,
            known_hosts_path: None,
        }
    }
}
