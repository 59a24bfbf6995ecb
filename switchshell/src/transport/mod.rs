//! SSH transport layer.
//!
//! The driver never talks to russh directly. It sees a [`Transport`] that
//! can open interactive shell channels, and a [`ShellChannel`] that moves raw
//! bytes without any buffering of its own. [`SshTransport`] is the russh
//! backed implementation.

pub mod config;
#[cfg(test)]
pub(crate) mod mock;
mod ssh;

use std::future::Future;

pub use config::{
    Credential, DEFAULT_INACTIVITY_TIMEOUT, HostEndpoint, HostKeyVerification, SshOptions,
};
pub use ssh::{SshShellChannel, SshTransport};

use crate::error::Result;

/// An authenticated connection able to open interactive shells.
pub trait Transport: Send + Sync + Sized {
    /// Channel type produced by [`open_shell`](Self::open_shell).
    type Channel: ShellChannel;

    /// Open a channel, request a PTY and invoke an interactive shell on it.
    fn open_shell(&self) -> impl Future<Output = Result<Self::Channel>> + Send;

    /// Disconnect.
    fn close(self) -> impl Future<Output = Result<()>> + Send;
}

/// Raw, unbuffered access to one interactive shell channel.
pub trait ShellChannel: Send {
    /// Send bytes to the remote shell.
    fn send(&mut self, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Wait until data is readable and return at most `max` bytes of it.
    ///
    /// Must be cancel-safe: dropping the future before it completes loses
    /// no data. Returns [`ChannelError::Closed`](crate::error::ChannelError::Closed)
    /// once the remote side has closed the channel and nothing is left.
    fn recv(&mut self, max: usize) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Return at most `max` bytes if data is already pending, without waiting.
    fn try_recv(&mut self, max: usize) -> Result<Option<Vec<u8>>>;

    /// Close the channel. The channel is not usable afterwards.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;
}
