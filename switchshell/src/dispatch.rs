//! Fan-out of commands across many hosts.
//!
//! Every host gets its own future, and all of them are joined before the
//! next step. A slow or broken host only affects its own entry in the
//! results, which always come back in session order.

use futures_util::future::join_all;
use log::{error, info};

use crate::channel::ShellConfig;
use crate::driver::{CommandRequest, CommandResult, RemoteShell, Session};
use crate::error::Result;
use crate::report::{Report, ReportSink};
use crate::transport::{Credential, HostEndpoint, SshOptions};

/// Runs commands on a fixed, ordered set of sessions.
pub struct Dispatcher<S: RemoteShell = Session> {
    sessions: Vec<S>,
}

impl Dispatcher<Session> {
    /// Connect to every endpoint in parallel, one task per host.
    ///
    /// Hosts that fail to connect stay in the set as disconnected sessions,
    /// so they show up in every report.
    pub async fn connect(
        endpoints: Vec<HostEndpoint>,
        options: &SshOptions,
        config: &ShellConfig,
    ) -> Self {
        info!("connecting to {} hosts", endpoints.len());
        let mut targets = Vec::with_capacity(endpoints.len());
        let tasks: Vec<_> = endpoints
            .into_iter()
            .map(|endpoint| {
                targets.push((endpoint.hostname.clone(), endpoint.username.clone(), endpoint.port));
                let options = options.clone();
                let config = config.clone();
                tokio::spawn(async move { Session::connect(endpoint, &options, config).await })
            })
            .collect();

        let sessions: Vec<Session> = join_all(tasks)
            .await
            .into_iter()
            .zip(targets)
            .map(|(joined, (hostname, username, port))| match joined {
                Ok(session) => session,
                Err(e) => {
                    // The credential went down with the task; this session never connects
                    let endpoint = HostEndpoint::new(hostname, username, Credential::password(""))
                        .with_port(port);
                    Session::disconnected(endpoint, format!("connect task failed: {}", e), config.clone())
                }
            })
            .collect();

        for session in sessions.iter().filter(|s| !s.is_connected()) {
            error!(
                "connection to {} failed: {}",
                session.host(),
                session.failure().unwrap_or("unknown error")
            );
        }

        Self::new(sessions)
    }
}

impl<S: RemoteShell> Dispatcher<S> {
    /// Dispatch over already created sessions.
    pub fn new(sessions: Vec<S>) -> Self {
        Self { sessions }
    }

    /// The sessions, in dispatch order.
    pub fn sessions(&self) -> &[S] {
        &self.sessions
    }

    /// Hostnames, in dispatch order.
    pub fn hosts(&self) -> Vec<&str> {
        self.sessions.iter().map(|s| s.host()).collect()
    }

    /// Number of sessions with a live connection.
    pub fn connected_count(&self) -> usize {
        self.sessions.iter().filter(|s| s.is_connected()).count()
    }

    /// Run one request on every session at once.
    ///
    /// The returned results line up with [`sessions`](Self::sessions).
    pub async fn dispatch(&mut self, request: &CommandRequest) -> Vec<CommandResult> {
        info!(
            "dispatching {:?} to {} hosts ({} connected)",
            request.command(),
            self.sessions.len(),
            self.connected_count()
        );
        join_all(self.sessions.iter_mut().map(|session| session.run(request))).await
    }

    /// Run each request in order, handing every command's report to `sink`
    /// before the next command starts.
    pub async fn run_batch<K: ReportSink + ?Sized>(
        &mut self,
        requests: &[CommandRequest],
        sink: &mut K,
    ) -> Result<()> {
        for request in requests {
            let results = self.dispatch(request).await;
            let failed = results.iter().filter(|r| !r.is_success()).count();
            if failed > 0 {
                info!("{:?}: {} of {} hosts failed", request.command(), failed, results.len());
            }
            sink.write(&Report::new(request.command(), results))?;
        }
        Ok(())
    }

    /// Close every session.
    pub async fn close(&mut self) {
        join_all(self.sessions.iter_mut().map(|session| session.close())).await;
    }
}
