//! Per-host sessions: connection management and command runs.

use log::{debug, info, warn};
use tokio::time::Instant;

use super::RemoteShell;
use super::poll;
use super::request::CommandRequest;
use super::result::{CommandResult, RunStatus};
use crate::channel::ShellConfig;
use crate::error::{DriverError, Result};
use crate::transport::{HostEndpoint, SshOptions, SshTransport, Transport};

/// A connection to one host, able to run commands on interactive shells.
///
/// Every run opens its own shell channel. The channel of a run that ended
/// at a prompt stays open until the next run or [`close`](RemoteShell::close),
/// so at most one is parked at a time; timed-out or broken ones are closed
/// right away.
pub struct Session<T: Transport = SshTransport> {
    /// Host this session belongs to.
    endpoint: HostEndpoint,

    /// Live transport (None when the connection failed or was closed).
    transport: Option<T>,

    /// Why the connection failed, if it did.
    failure: Option<String>,

    /// Prompt markers and read size for runs.
    config: ShellConfig,

    /// Channel left open after the last matched prompt.
    idle_channel: Option<T::Channel>,
}

impl Session<SshTransport> {
    /// Connect and authenticate to `endpoint`.
    ///
    /// Never fails: on any error the session comes back disconnected with
    /// the reason available from [`failure`](Session::failure).
    pub async fn connect(endpoint: HostEndpoint, options: &SshOptions, config: ShellConfig) -> Self {
        let target = endpoint.display_target();
        info!("connecting {}", target);

        match SshTransport::connect(&endpoint, options).await {
            Ok(transport) => {
                info!("succeeded: {}", target);
                Self::with_transport(endpoint, transport, config)
            }
            Err(e) => {
                warn!("failed: {}: {}", target, e);
                Self::disconnected(endpoint, e.to_string(), config)
            }
        }
    }
}

impl<T: Transport> Session<T> {
    /// Wrap an already connected transport.
    pub fn with_transport(endpoint: HostEndpoint, transport: T, config: ShellConfig) -> Self {
        Self {
            endpoint,
            transport: Some(transport),
            failure: None,
            config,
            idle_channel: None,
        }
    }

    /// A session whose connection failed.
    pub fn disconnected(endpoint: HostEndpoint, reason: impl Into<String>, config: ShellConfig) -> Self {
        Self {
            endpoint,
            transport: None,
            failure: Some(reason.into()),
            config,
            idle_channel: None,
        }
    }

    /// The host this session belongs to.
    pub fn endpoint(&self) -> &HostEndpoint {
        &self.endpoint
    }

    /// Why the connection failed, if it did.
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Check if the previous run's channel is still open.
    pub fn has_idle_channel(&self) -> bool {
        self.idle_channel.is_some()
    }

    fn transport(&self) -> Result<&T> {
        self.transport.as_ref().ok_or_else(|| {
            DriverError::NotConnected {
                host: self.endpoint.hostname.clone(),
            }
            .into()
        })
    }
}

impl<T: Transport> RemoteShell for Session<T> {
    fn host(&self) -> &str {
        &self.endpoint.hostname
    }

    fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    async fn run(&mut self, request: &CommandRequest) -> CommandResult {
        let host = self.endpoint.hostname.clone();
        let start = Instant::now();
        let deadline = start + request.timeout();
        info!("{}: running command ({:?}) {}", host, request.timeout(), request.command());

        if let Some(mut previous) = self.idle_channel.take() {
            debug!("{}: closing previous channel", host);
            poll::close_channel(&mut previous, &host).await;
        }

        let transport = match self.transport() {
            Ok(transport) => transport,
            Err(e) => {
                info!("{}", e);
                return CommandResult::not_connected(host, request.command());
            }
        };

        debug!("{}: opening shell channel", host);
        let mut channel = match tokio::time::timeout_at(deadline, transport.open_shell()).await {
            Ok(Ok(channel)) => channel,
            Err(_) => {
                warn!("{}: shell channel not opened within {:?}", host, request.timeout());
                return CommandResult::new(
                    host,
                    request.command(),
                    RunStatus::TimedOut,
                    format!("\n{}", poll::timeout_message(request.timeout())),
                    start.elapsed(),
                );
            }
            Ok(Err(e)) => {
                let reason = e.to_string();
                warn!("{}: {}", host, reason);
                return CommandResult::new(
                    host,
                    request.command(),
                    RunStatus::ChannelFailed(reason.clone()),
                    format!("ERROR: {}", reason),
                    start.elapsed(),
                );
            }
        };

        let (status, output) = poll::drive(&mut channel, &host, request, &self.config, deadline).await;
        info!("{}: status {}, output size {}", host, status.code(), output.len());

        if status.is_success() {
            self.idle_channel = Some(channel);
        }

        CommandResult::new(host, request.command(), status, output, start.elapsed())
    }

    async fn close(&mut self) {
        let host = &self.endpoint.hostname;
        if let Some(mut channel) = self.idle_channel.take() {
            poll::close_channel(&mut channel, host).await;
        }

        if let Some(transport) = self.transport.take() {
            debug!("{}: disconnecting", host);
            match tokio::time::timeout(poll::CLOSE_TIMEOUT, transport.close()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("{}: failed to disconnect: {}", host, e),
                Err(_) => warn!("{}: disconnect not confirmed after {:?}", host, poll::CLOSE_TIMEOUT),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::transport::Credential;
    use crate::transport::mock::{MockTransport, Reply};

    fn endpoint(host: &str) -> HostEndpoint {
        HostEndpoint::new(host, "admin", Credential::password("admin"))
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnected_session_does_no_io() {
        let mut session: Session<MockTransport> =
            Session::disconnected(endpoint("sw1"), "connection refused", ShellConfig::default());

        assert!(!session.is_connected());
        assert_eq!(session.failure(), Some("connection refused"));

        let result = session.run(&CommandRequest::new("show version")).await;
        assert_eq!(result.status, RunStatus::NotConnected);
        assert_eq!(result.code(), -1);
        assert_eq!(result.output, "ERROR: connection not established");
    }

    #[tokio::test(start_paused = true)]
    async fn test_at_most_one_channel_parked() {
        let transport = MockTransport::new(|_| vec![Reply::now("ok\r\nswitch # ")]);
        let wire = transport.wire();
        let mut session = Session::with_transport(endpoint("sw1"), transport, ShellConfig::default());

        for command in ["show clock", "show uptime", "show version", "show inventory"] {
            let result = session.run(&CommandRequest::new(command)).await;
            assert!(result.is_success());
            assert_eq!(result.command, command);
            assert!(session.has_idle_channel());
        }
        {
            let wire = wire.lock().unwrap();
            assert_eq!(wire.channels_opened, 4);
            // Each run closed the channel the previous one left open
            assert_eq!(wire.channels_opened - wire.channels_closed, 1);
        }

        session.close().await;
        let wire = wire.lock().unwrap();
        assert_eq!(wire.channels_closed, 4);
        assert!(wire.transport_closed);
        assert!(!session.is_connected());
        assert!(!session.has_idle_channel());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_channel_not_parked() {
        let transport = MockTransport::silent();
        let wire = transport.wire();
        let mut session = Session::with_transport(endpoint("sw1"), transport, ShellConfig::default());

        let request = CommandRequest::new("show version").with_timeout(Duration::from_secs(3));
        let result = session.run(&request).await;

        assert!(result.timed_out());
        assert!(result.elapsed >= Duration::from_secs(3));
        assert!(!session.has_idle_channel());
        assert_eq!(wire.lock().unwrap().channels_closed, 1);
        // The transport itself stays usable
        assert!(session.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_channel_open_failure() {
        let mut session =
            Session::with_transport(endpoint("sw1"), MockTransport::failing_open(), ShellConfig::default());

        let result = session.run(&CommandRequest::new("show version")).await;

        assert!(matches!(result.status, RunStatus::ChannelFailed(_)));
        assert!(result.output.starts_with("ERROR: "));
        assert!(result.output.contains("administratively prohibited"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_channel_open_bounded_by_timeout() {
        let mut session =
            Session::with_transport(endpoint("sw1"), MockTransport::hanging_open(), ShellConfig::default());
        let request = CommandRequest::new("show version").with_timeout(Duration::from_secs(5));

        let result = tokio::time::timeout(Duration::from_secs(3600), session.run(&request))
            .await
            .expect("run must end at its own deadline");

        assert!(result.timed_out());
        assert_eq!(result.code(), -1);
        assert_eq!(result.output, "\nERROR: timeout after 5 seconds");
        assert!(result.elapsed >= Duration::from_secs(5));
        assert!(result.elapsed < Duration::from_secs(6));
        assert!(!session.has_idle_channel());
        assert!(session.is_connected());
    }
}
