//! # Switchshell
//!
//! Async runner for CLI commands on network switches that only offer an
//! interactive SSH shell.
//!
//! Many switch CLIs cannot run a command over an SSH exec request. They need
//! a PTY-backed shell, page long output behind `lines N-M` prompts, and never
//! report an exit status. Switchshell drives such shells to completion by
//! watching for the prompt, answers the pager, feeds extra input lines, and
//! enforces a per-command timeout. Commands fan out to many hosts at once and
//! come back as one labeled report per command.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use switchshell::{CommandRequest, Dispatcher, SessionBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), switchshell::Error> {
//!     let endpoints = ["sw1.example.net", "sw2.example.net"]
//!         .into_iter()
//!         .map(|host| SessionBuilder::new(host).username("admin").password("admin").build_endpoint())
//!         .collect::<Result<Vec<_>, _>>()?;
//!
//!     let mut dispatcher =
//!         Dispatcher::connect(endpoints, &Default::default(), &Default::default()).await;
//!
//!     for result in dispatcher.dispatch(&CommandRequest::new("show version")).await {
//!         println!("{} [{}]\n{}", result.host, result.code(), result.clean_output());
//!     }
//!
//!     dispatcher.close().await;
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod driver;
pub mod error;
pub mod report;
pub mod transport;

// Re-export main types for convenience
pub use channel::{PromptMarkers, ShellConfig, clean_output, sanitize};
pub use dispatch::Dispatcher;
pub use driver::{CommandRequest, CommandResult, RemoteShell, RunStatus, Session, SessionBuilder};
pub use error::Error;
pub use report::{FileSink, Report, ReportSink};
pub use transport::{Credential, HostEndpoint, SshOptions};
