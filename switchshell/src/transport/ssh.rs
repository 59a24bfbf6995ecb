//! SSH transport implementation using russh.

use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use bytes::{Buf, BytesMut};
use futures_util::FutureExt;
use log::{debug, warn};
use russh::client::{self, Handle, Msg};
use russh::compression::{NONE, ZLIB, ZLIB_LEGACY};
use russh::keys::{PrivateKeyWithHashAlg, PublicKey, load_secret_key};
use russh::{Channel, ChannelMsg, Preferred};
use secrecy::ExposeSecret;

use super::config::{Credential, HostEndpoint, HostKeyVerification, SshOptions};
use super::{ShellChannel, Transport};
use crate::error::{ChannelError, Result, TransportError};

/// SSH transport wrapping a russh client session.
pub struct SshTransport {
    /// The russh session handle.
    session: Handle<SshHandler>,

    /// Options used for this connection.
    options: SshOptions,
}

impl SshTransport {
    /// Connect to the SSH server and authenticate.
    pub async fn connect(endpoint: &HostEndpoint, options: &SshOptions) -> Result<Self> {
        let compression: &'static [russh::compression::Name] = if options.compress {
            &[ZLIB, ZLIB_LEGACY, NONE]
        } else {
            &[NONE]
        };

        let ssh_config = Arc::new(client::Config {
            inactivity_timeout: options.inactivity_timeout,
            preferred: Preferred {
                compression: Cow::Borrowed(compression),
                ..Default::default()
            },
            ..Default::default()
        });

        let host_key_error: Arc<Mutex<Option<TransportError>>> = Arc::new(Mutex::new(None));

        let handler = SshHandler {
            host: endpoint.hostname.clone(),
            port: endpoint.port,
            host_key_verification: options.host_key_verification.clone(),
            known_hosts_path: options.known_hosts_path.clone(),
            host_key_error: host_key_error.clone(),
        };

        let mut session = tokio::time::timeout(
            options.connect_timeout,
            client::connect(
                ssh_config,
                (endpoint.hostname.as_str(), endpoint.port),
                handler,
            ),
        )
        .await
        .map_err(|_| TransportError::Timeout(options.connect_timeout))?
        .map_err(|e| {
            // Prefer the detailed host key error over russh's generic UnknownKey
            let stored = host_key_error.lock().ok().and_then(|mut slot| slot.take());
            stored.unwrap_or(TransportError::Ssh(e))
        })?;

        tokio::time::timeout(
            options.connect_timeout,
            Self::authenticate(&mut session, endpoint),
        )
        .await
        .map_err(|_| TransportError::Timeout(options.connect_timeout))??;

        Ok(Self {
            session,
            options: options.clone(),
        })
    }

    /// Authenticate with the server.
    async fn authenticate(session: &mut Handle<SshHandler>, endpoint: &HostEndpoint) -> Result<()> {
        let user = endpoint.username.as_str();
        let success = match &endpoint.credential {
            Credential::Password(password) => session
                .authenticate_password(user, password.expose_secret())
                .await
                .map_err(TransportError::Ssh)?
                .success(),
            Credential::PrivateKey { path, passphrase } => {
                let passphrase = passphrase.as_ref().map(|p| p.expose_secret());
                let key = load_secret_key(path, passphrase)
                    .map_err(|e| TransportError::Key(e.to_string()))?;

                let hash_alg = session
                    .best_supported_rsa_hash()
                    .await
                    .map_err(TransportError::Ssh)?
                    .flatten();

                session
                    .authenticate_publickey(user, PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg))
                    .await
                    .map_err(TransportError::Ssh)?
                    .success()
            }
        };

        if !success {
            return Err(TransportError::AuthenticationFailed {
                user: user.to_string(),
            }
            .into());
        }

        Ok(())
    }
}

impl Transport for SshTransport {
    type Channel = SshShellChannel;

    async fn open_shell(&self) -> Result<SshShellChannel> {
        let channel = self
            .session
            .channel_open_session()
            .await
            .map_err(|e| ChannelError::OpenFailed(e.to_string()))?;

        channel
            .request_pty(
                true,
                "xterm",
                self.options.terminal_width,
                self.options.terminal_height,
                0,
                0,
                &[],
            )
            .await
            .map_err(|e| ChannelError::OpenFailed(format!("pty request: {e}")))?;

        channel
            .request_shell(true)
            .await
            .map_err(|e| ChannelError::OpenFailed(format!("shell request: {e}")))?;

        Ok(SshShellChannel::new(channel))
    }

    async fn close(self) -> Result<()> {
        self.session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
            .map_err(TransportError::Ssh)?;
        Ok(())
    }
}

/// An interactive shell channel on an [`SshTransport`].
///
/// russh hands over whole SSH packets; anything beyond the caller's read size
/// is kept in `pending` for the next read.
pub struct SshShellChannel {
    channel: Channel<Msg>,
    pending: BytesMut,
    closed: bool,
}

impl SshShellChannel {
    fn new(channel: Channel<Msg>) -> Self {
        Self {
            channel,
            pending: BytesMut::new(),
            closed: false,
        }
    }

    fn take_pending(&mut self, max: usize) -> Vec<u8> {
        let n = self.pending.len().min(max);
        let chunk = self.pending[..n].to_vec();
        self.pending.advance(n);
        chunk
    }

    /// Fold one channel message into `pending`. Returns false once the
    /// channel is finished.
    fn absorb(&mut self, msg: Option<ChannelMsg>) -> bool {
        match msg {
            Some(ChannelMsg::Data { data }) => self.pending.extend_from_slice(&data),
            // stderr is merged into the output stream
            Some(ChannelMsg::ExtendedData { data, .. }) => self.pending.extend_from_slice(&data),
            Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => {
                self.closed = true;
                return false;
            }
            Some(other) => debug!("ignoring channel message {:?}", other),
        }
        true
    }
}

impl ShellChannel for SshShellChannel {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        self.channel
            .data(data)
            .await
            .map_err(ChannelError::Ssh)?;
        Ok(())
    }

    async fn recv(&mut self, max: usize) -> Result<Vec<u8>> {
        loop {
            if !self.pending.is_empty() {
                return Ok(self.take_pending(max));
            }
            if self.closed {
                return Err(ChannelError::Closed.into());
            }
            let msg = self.channel.wait().await;
            self.absorb(msg);
        }
    }

    fn try_recv(&mut self, max: usize) -> Result<Option<Vec<u8>>> {
        loop {
            if !self.pending.is_empty() {
                return Ok(Some(self.take_pending(max)));
            }
            if self.closed {
                return Ok(None);
            }
            match self.channel.wait().now_or_never() {
                Some(msg) => {
                    self.absorb(msg);
                }
                None => return Ok(None),
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.channel.close().await.map_err(ChannelError::Ssh)?;
        Ok(())
    }
}

/// SSH client handler for russh.
struct SshHandler {
    host: String,
    port: u16,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    /// Detailed host-key error so connect() can surface it instead of the
    /// generic russh::Error::UnknownKey.
    host_key_error: Arc<Mutex<Option<TransportError>>>,
}

impl SshHandler {
    /// Check the host key against known_hosts.
    ///
    /// Returns `Ok(true)` if matched, `Ok(false)` if host not found,
    /// `Err(TransportError::HostKeyChanged)` if the key changed.
    fn check_known_hosts(&self, pubkey: &PublicKey) -> std::result::Result<bool, TransportError> {
        let result = if let Some(ref path) = self.known_hosts_path {
            russh::keys::check_known_hosts_path(&self.host, self.port, pubkey, path)
        } else {
            russh::keys::check_known_hosts(&self.host, self.port, pubkey)
        };

        match result {
            Ok(matched) => Ok(matched),
            Err(russh::keys::Error::KeyChanged { line }) => Err(TransportError::HostKeyChanged {
                host: self.host.clone(),
                port: self.port,
                line,
            }),
            Err(e) => Err(TransportError::KnownHosts(e.to_string())),
        }
    }

    /// Save a new host key to known_hosts.
    fn learn_host_key(&self, pubkey: &PublicKey) -> std::result::Result<(), TransportError> {
        let result = if let Some(ref path) = self.known_hosts_path {
            russh::keys::known_hosts::learn_known_hosts_path(&self.host, self.port, pubkey, path)
        } else {
            russh::keys::known_hosts::learn_known_hosts(&self.host, self.port, pubkey)
        };

        result.map_err(|e| TransportError::KnownHosts(e.to_string()))
    }

    fn reject(&self, error: TransportError) -> bool {
        if let Ok(mut slot) = self.host_key_error.lock() {
            *slot = Some(error);
        }
        false
    }
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        match self.host_key_verification {
            HostKeyVerification::Disabled => Ok(true),

            HostKeyVerification::AcceptNew => match self.check_known_hosts(server_public_key) {
                Ok(true) => Ok(true),
                Ok(false) => {
                    if let Err(e) = self.learn_host_key(server_public_key) {
                        warn!("{}: failed to save host key: {}", self.host, e);
                    }
                    Ok(true)
                }
                Err(e) => Ok(self.reject(e)),
            },

            HostKeyVerification::Strict => match self.check_known_hosts(server_public_key) {
                Ok(true) => Ok(true),
                Ok(false) => Ok(self.reject(TransportError::HostKeyUnknown {
                    host: self.host.clone(),
                    port: self.port,
                })),
                Err(e) => Ok(self.reject(e)),
            },
        }
    }
}
