//! Run commands on a set of switches and write one report per command.
//!
//! ```bash
//! switchshell -n sw1,sw2 -r "show version,show interfaces ethernet status"
//! switchshell -c switches.toml -e -o audit.txt
//! ```

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use log::error;

use switchshell::cli::Cli;
use switchshell::{Dispatcher, FileSink, RemoteShell};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = match Cli::parse().into_settings() {
        Ok(settings) => settings,
        Err(e) => Cli::command().error(ErrorKind::ValueValidation, e).exit(),
    };

    // RUST_LOG takes precedence over --loglevel
    env_logger::Builder::new()
        .filter_level(settings.log_level())
        .parse_default_env()
        .init();

    let endpoints = settings.endpoints()?;
    let mut dispatcher =
        Dispatcher::connect(endpoints, &settings.ssh_options(), &settings.shell_config()).await;

    for session in dispatcher.sessions().iter().filter(|s| !s.is_connected()) {
        eprintln!(
            "ERROR: connection to {} failed: {}",
            session.host(),
            session.failure().unwrap_or("unknown error")
        );
    }

    let mut sink = FileSink::new()
        .with_fixed_path(settings.out().map(|p| p.to_path_buf()))
        .echo(settings.echo());
    let outcome = dispatcher.run_batch(&settings.requests(), &mut sink).await;
    dispatcher.close().await;

    if let Err(e) = &outcome {
        error!("{}", e);
    }
    outcome?;
    Ok(())
}
