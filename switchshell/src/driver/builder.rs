//! Builder for single-host sessions.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use super::session::Session;
use crate::channel::{PromptMarkers, ShellConfig};
use crate::error::{DriverError, Result};
use crate::transport::{Credential, HostEndpoint, HostKeyVerification, SshOptions};

/// Builder for connecting a [`Session`].
///
/// # Example
///
/// ```rust,no_run
/// use switchshell::{CommandRequest, RemoteShell, SessionBuilder};
///
/// # async fn example() -> Result<(), switchshell::Error> {
/// let mut session = SessionBuilder::new("192.168.1.1")
///     .username("admin")
///     .password("admin")
///     .connect()
///     .await?;
///
/// if session.is_connected() {
///     let result = session.run(&CommandRequest::new("show version")).await;
///     println!("{}", result.clean_output());
/// }
/// session.close().await;
/// # Ok(())
/// # }
/// ```
pub struct SessionBuilder {
    host: String,
    port: u16,
    username: Option<String>,
    credential: Option<Credential>,
    options: SshOptions,
    shell: ShellConfig,
}

impl SessionBuilder {
    /// Create a new builder for the specified host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: None,
            credential: None,
            options: SshOptions::default(),
            shell: ShellConfig::default(),
        }
    }

    /// Set the SSH port (default: 22).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the username for authentication.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set password authentication.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.credential = Some(Credential::password(password));
        self
    }

    /// Set private key authentication.
    pub fn private_key(mut self, key_path: impl Into<PathBuf>, passphrase: Option<String>) -> Self {
        self.credential = Some(Credential::PrivateKey {
            path: key_path.into(),
            passphrase: passphrase.map(SecretString::from),
        });
        self
    }

    /// Enable or disable zlib compression (default: enabled).
    pub fn compress(mut self, compress: bool) -> Self {
        self.options.compress = compress;
        self
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.options.connect_timeout = timeout;
        self
    }

    /// Set terminal dimensions.
    pub fn terminal_size(mut self, width: u32, height: u32) -> Self {
        self.options.terminal_width = width;
        self.options.terminal_height = height;
        self
    }

    /// Set the host key verification mode.
    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.options.host_key_verification = mode;
        self
    }

    /// Use a specific known_hosts file.
    pub fn known_hosts(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.known_hosts_path = Some(path.into());
        self
    }

    /// Set the end-of-command prompt markers.
    pub fn prompts(mut self, prompts: PromptMarkers) -> Self {
        self.shell.prompts = prompts;
        self
    }

    /// Build the endpoint without connecting.
    pub fn build_endpoint(self) -> Result<HostEndpoint> {
        Ok(self.into_parts()?.0)
    }

    /// Connect. Only configuration problems are errors; connection failures
    /// give a disconnected session.
    pub async fn connect(self) -> Result<Session> {
        let (endpoint, options, shell) = self.into_parts()?;
        Ok(Session::connect(endpoint, &options, shell).await)
    }

    fn into_parts(self) -> Result<(HostEndpoint, SshOptions, ShellConfig)> {
        if self.host.trim().is_empty() {
            return Err(DriverError::InvalidConfig {
                message: "Host is required".to_string(),
            }
            .into());
        }

        let username = self.username.ok_or_else(|| DriverError::InvalidConfig {
            message: "Username is required".to_string(),
        })?;

        let credential = self.credential.ok_or_else(|| DriverError::InvalidConfig {
            message: "A password or private key is required".to_string(),
        })?;

        let endpoint = HostEndpoint::new(self.host, username, credential).with_port(self.port);
        Ok((endpoint, self.options, self.shell))
    }
}
