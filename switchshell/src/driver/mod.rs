//! High-level driver for running commands on remote shells.
//!
//! The driver layer provides [`Session`], which owns one host's connection,
//! and the [`RemoteShell`] trait the dispatcher works against.

mod builder;
mod poll;
mod request;
mod result;
mod session;

pub use builder::SessionBuilder;
pub use request::{CommandRequest, DEFAULT_COMMAND_TIMEOUT, ENABLE_COMMAND, normalize_input};
pub use result::{CommandResult, NOT_CONNECTED_MESSAGE, RunStatus};
pub use session::Session;

use std::future::Future;

/// A host that commands can be run on.
pub trait RemoteShell: Send {
    /// Hostname identifying this shell.
    fn host(&self) -> &str;

    /// Check if the underlying connection is up.
    fn is_connected(&self) -> bool;

    /// Run one command and wait for the prompt, the timeout or a failure.
    ///
    /// Never fails: every problem is reported through the result's status.
    /// Takes `&mut self` so only one command is in flight per shell.
    fn run(&mut self, request: &CommandRequest) -> impl Future<Output = CommandResult> + Send;

    /// Close any open channels and the connection.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}
