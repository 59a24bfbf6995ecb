//! Error types for switchshell.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for switchshell operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Shell channel errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Driver-level errors
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// Configuration file errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Report output errors
    #[error("Report error: {0}")]
    Report(#[from] ReportError),
}

/// Transport layer errors (SSH connection, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// SSH key error
    #[error("SSH key error: {0}")]
    Key(String),

    /// Host is missing from known_hosts and strict checking is on
    #[error("Host key for {host}:{port} is not in known_hosts")]
    HostKeyUnknown { host: String, port: u16 },

    /// Host key differs from the one recorded in known_hosts
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Connection attempt timed out
    #[error("Connection timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Shell channel errors.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Failed to open the session channel or start the shell
    #[error("Failed to open shell channel: {0}")]
    OpenFailed(String),

    /// Channel closed by the remote side
    #[error("Channel closed")]
    Closed,

    /// SSH protocol error on the channel
    #[error("Channel SSH error: {0}")]
    Ssh(russh::Error),
}

/// Driver layer errors.
#[derive(Error, Debug)]
pub enum DriverError {
    /// Session has no live transport
    #[error("Session to {host} is not connected")]
    NotConnected { host: String },

    /// Invalid configuration in the session builder
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// Configuration file errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file does not exist
    #[error("Config file {0} does not exist")]
    NotFound(PathBuf),

    /// Config file could not be read
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Config file is not valid TOML for this tool
    #[error("Config file syntax incorrect: {0}")]
    Parse(#[from] toml::de::Error),

    /// No hosts or no commands after merging the command line and config file
    #[error("Specify {0} using the command line or a config file")]
    Missing(&'static str),

    /// A setting has a value that cannot be used
    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },
}

/// Report writing errors.
#[derive(Error, Debug)]
pub enum ReportError {
    /// Report file could not be written
    #[error("Failed to write report to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result type alias using switchshell's Error.
pub type Result<T> = std::result::Result<T, Error>;
