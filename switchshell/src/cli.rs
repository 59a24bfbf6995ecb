//! Command line arguments and their merge with the config file.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;
use log::LevelFilter;
use secrecy::{ExposeSecret, SecretString};

use crate::channel::{PromptMarkers, ShellConfig};
use crate::config::{FileConfig, non_blank};
use crate::driver::{CommandRequest, DEFAULT_COMMAND_TIMEOUT, SessionBuilder};
use crate::error::{ConfigError, Result};
use crate::transport::{DEFAULT_INACTIVITY_TIMEOUT, HostEndpoint, SshOptions};

const DEFAULT_USERNAME: &str = "admin";
const DEFAULT_PASSWORD: &str = "admin";
const DEFAULT_PORT: u16 = 22;

/// Run commands on network switches over interactive SSH shells.
#[derive(Debug, Parser)]
#[command(name = "switchshell", version)]
#[command(about = "Run commands on network switches over interactive SSH shells")]
#[command(long_about = "Connects to every host over SSH and runs each command in an \
interactive shell, waiting for the prompt to come back. Hosts and commands come from \
the command line or a TOML config file; the command line wins. Each command's output \
is written to a file named after the command and a timestamp unless --out is given.")]
pub struct Cli {
    /// Commands to run, comma separated
    #[arg(short = 'r', long = "run-command", value_name = "COMMANDS", value_delimiter = ',')]
    pub run_command: Vec<String>,

    /// Hosts to connect to, comma separated
    #[arg(short = 'n', long, value_name = "HOSTS", value_delimiter = ',')]
    pub hosts: Vec<String>,

    /// Enter enable mode before every command
    #[arg(short, long)]
    pub enable: bool,

    /// Log level: debug, info, warning, error, fatal [default: error]
    #[arg(short, long, value_name = "LEVEL")]
    pub loglevel: Option<String>,

    /// TOML file listing hosts, commands and other settings
    #[arg(short, long = "config-file", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    /// Write every report into this file
    #[arg(short, long, value_name = "PATH")]
    pub out: Option<PathBuf>,

    /// Login user [default: admin]
    #[arg(short, long)]
    pub username: Option<String>,

    /// Login password [default: admin]
    #[arg(short, long, env = "SWITCHSHELL_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// SSH port [default: 22]
    #[arg(long)]
    pub port: Option<u16>,

    /// Seconds to wait for the prompt after each command [default: 30]
    #[arg(short, long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Extra input fed to each command, lines separated by \n
    #[arg(short, long, value_name = "TEXT")]
    pub input: Option<String>,

    /// Do not negotiate zlib compression
    #[arg(long)]
    pub no_compress: bool,

    /// Only write report files, do not print them
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Merge the command line over the config file, if one was given.
    pub fn into_settings(self) -> Result<Settings> {
        let file = match &self.config_file {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        self.merge(file)
    }

    fn merge(self, file: FileConfig) -> Result<Settings> {
        let hosts = prefer(non_blank(&self.hosts), file.hosts);
        if hosts.is_empty() {
            return Err(ConfigError::Missing("hosts").into());
        }
        let commands = prefer(non_blank(&self.run_command), file.commands);
        if commands.is_empty() {
            return Err(ConfigError::Missing("commands").into());
        }

        let log_level = match self.loglevel.or(file.loglevel) {
            Some(level) => parse_log_level(&level)?,
            None => LevelFilter::Error,
        };

        let timeout = match self.timeout.or(file.timeout) {
            Some(0) => {
                return Err(ConfigError::InvalidValue {
                    key: "timeout",
                    value: "0".to_string(),
                }
                .into());
            }
            Some(seconds) => Duration::from_secs(seconds),
            None => DEFAULT_COMMAND_TIMEOUT,
        };

        let password = self
            .password
            .or(file.password)
            .unwrap_or_else(|| DEFAULT_PASSWORD.to_string());

        Ok(Settings {
            hosts,
            commands,
            enable: self.enable || file.enable.unwrap_or(false),
            log_level,
            username: self
                .username
                .or(file.username)
                .unwrap_or_else(|| DEFAULT_USERNAME.to_string()),
            password: SecretString::from(password),
            port: self.port.or(file.port).unwrap_or(DEFAULT_PORT),
            timeout,
            input: self.input,
            prompts: file.prompts,
            compress: !self.no_compress && file.compress.unwrap_or(true),
            out: self.out,
            echo: !self.quiet,
        })
    }
}

/// Command line entries when there are any, otherwise the file's.
fn prefer(cli: Vec<String>, file: Option<Vec<String>>) -> Vec<String> {
    if cli.is_empty() {
        file.unwrap_or_default()
    } else {
        cli
    }
}

/// Parse a log level name, accepting the `warning`, `fatal` and `critical`
/// spellings as well as the `log` crate's own.
pub fn parse_log_level(level: &str) -> Result<LevelFilter> {
    match level.trim().to_ascii_lowercase().as_str() {
        "warning" => Ok(LevelFilter::Warn),
        "fatal" | "critical" => Ok(LevelFilter::Error),
        other => LevelFilter::from_str(other).map_err(|_| {
            ConfigError::InvalidValue {
                key: "loglevel",
                value: level.to_string(),
            }
            .into()
        }),
    }
}

/// Everything a batch run needs, after merging.
#[derive(Debug)]
pub struct Settings {
    hosts: Vec<String>,
    commands: Vec<String>,
    enable: bool,
    log_level: LevelFilter,
    username: String,
    password: SecretString,
    port: u16,
    timeout: Duration,
    input: Option<String>,
    prompts: Option<Vec<String>>,
    compress: bool,
    out: Option<PathBuf>,
    echo: bool,
}

impl Settings {
    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    /// Single report file, if one was requested.
    pub fn out(&self) -> Option<&Path> {
        self.out.as_deref()
    }

    /// Whether reports are printed as well as written.
    pub fn echo(&self) -> bool {
        self.echo
    }

    /// One endpoint per host, in the given order.
    pub fn endpoints(&self) -> Result<Vec<HostEndpoint>> {
        self.hosts
            .iter()
            .map(|host| {
                SessionBuilder::new(host)
                    .port(self.port)
                    .username(&self.username)
                    .password(self.password.expose_secret())
                    .build_endpoint()
            })
            .collect()
    }

    pub fn ssh_options(&self) -> SshOptions {
        // A host sits idle while its siblings finish the same command
        let idle = (self.timeout * 2).max(DEFAULT_INACTIVITY_TIMEOUT);
        SshOptions {
            compress: self.compress,
            inactivity_timeout: Some(idle),
            ..SshOptions::default()
        }
    }

    pub fn shell_config(&self) -> ShellConfig {
        match &self.prompts {
            Some(prompts) => ShellConfig::default().with_prompts(PromptMarkers::new(prompts.iter().cloned())),
            None => ShellConfig::default(),
        }
    }

    /// One request per command, in the given order.
    pub fn requests(&self) -> Vec<CommandRequest> {
        self.commands
            .iter()
            .map(|command| {
                let request = CommandRequest::new(command.as_str())
                    .with_timeout(self.timeout)
                    .with_enable(self.enable);
                match &self.input {
                    Some(input) => request.with_input(input),
                    None => request,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("switchshell").chain(args.iter().copied())).unwrap()
    }

    fn settings(args: &[&str], file: FileConfig) -> Result<Settings> {
        parse(args).merge(file)
    }

    #[test]
    fn test_comma_separated_lists() {
        let cli = parse(&["-n", "sw1,sw2", "-r", "show version,show clock"]);
        assert_eq!(cli.hosts, ["sw1", "sw2"]);
        assert_eq!(cli.run_command, ["show version", "show clock"]);
    }

    #[test]
    fn test_defaults() {
        let settings = settings(&["-n", "sw1", "-r", "show version"], FileConfig::default()).unwrap();

        assert_eq!(settings.log_level(), LevelFilter::Error);
        assert_eq!(settings.port, 22);
        assert_eq!(settings.username, "admin");
        assert_eq!(settings.password.expose_secret(), "admin");
        assert!(settings.compress);
        assert!(settings.echo());
        assert!(settings.out().is_none());

        let requests = settings.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].timeout(), DEFAULT_COMMAND_TIMEOUT);
        assert!(!requests[0].enable());
        assert!(requests[0].input().is_empty());
    }

    #[test]
    fn test_command_line_overrides_file() {
        let file = FileConfig {
            hosts: Some(vec!["file-sw".to_string()]),
            commands: Some(vec!["show configuration".to_string()]),
            loglevel: Some("debug".to_string()),
            port: Some(2222),
            timeout: Some(60),
            ..FileConfig::default()
        };
        let settings = settings(&["-n", "cli-sw", "-l", "warning", "-t", "5"], file).unwrap();

        assert_eq!(settings.hosts(), ["cli-sw"]);
        assert_eq!(settings.commands(), ["show configuration"]);
        assert_eq!(settings.log_level(), LevelFilter::Warn);
        assert_eq!(settings.port, 2222);
        assert_eq!(settings.requests()[0].timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_inactivity_timeout_outlasts_long_commands() {
        let settings = settings(&["-n", "sw1", "-r", "show tech-support", "-t", "600"], FileConfig::default()).unwrap();
        assert_eq!(settings.ssh_options().inactivity_timeout, Some(Duration::from_secs(1200)));
    }

    #[test]
    fn test_enable_from_either_source() {
        let file = FileConfig {
            enable: Some(true),
            ..FileConfig::default()
        };
        let from_file = settings(&["-n", "sw1", "-r", "show run"], file).unwrap();
        assert!(from_file.requests()[0].enable());

        let from_cli = settings(&["-n", "sw1", "-r", "show run", "-e"], FileConfig::default()).unwrap();
        assert_eq!(from_cli.requests()[0].wire_command(), "enable\nshow run");
    }

    #[test]
    fn test_missing_hosts_or_commands() {
        let err = settings(&["-r", "show version"], FileConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Missing("hosts"))));

        let err = settings(&["-n", " , "], FileConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Missing("hosts"))));

        let err = settings(&["-n", "sw1"], FileConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Missing("commands"))));
        assert!(err.to_string().contains("Specify commands"));
    }

    #[test]
    fn test_blank_entries_dropped() {
        let settings = settings(&["-n", "sw1, ,sw2 ", "-r", "show version,"], FileConfig::default()).unwrap();
        assert_eq!(settings.hosts(), ["sw1", "sw2"]);
        assert_eq!(settings.commands(), ["show version"]);
    }

    #[test]
    fn test_input_applies_to_every_command() {
        let settings = settings(
            &["-n", "sw1", "-r", "reload,show clock", "-i", "yes\\nno"],
            FileConfig::default(),
        )
        .unwrap();
        for request in settings.requests() {
            assert_eq!(request.input(), ["yes", "no"]);
        }
    }

    #[test]
    fn test_endpoints_follow_host_order() {
        let settings = settings(
            &["-n", "sw2,sw1", "-r", "show version", "-u", "operator", "--port", "2200"],
            FileConfig::default(),
        )
        .unwrap();
        let endpoints = settings.endpoints().unwrap();
        let targets: Vec<String> = endpoints.iter().map(|e| e.display_target()).collect();
        assert_eq!(targets, ["operator@sw2:2200", "operator@sw1:2200"]);
    }

    #[test]
    fn test_compression_and_prompts() {
        let file = FileConfig {
            prompts: Some(vec!["$ ".to_string()]),
            ..FileConfig::default()
        };
        let settings = settings(&["-n", "sw1", "-r", "ls", "--no-compress", "--quiet"], file).unwrap();

        assert!(!settings.ssh_options().compress);
        assert_eq!(settings.ssh_options().inactivity_timeout, Some(DEFAULT_INACTIVITY_TIMEOUT));
        assert!(!settings.echo());
        assert_eq!(settings.shell_config().prompts.markers(), ["$ "]);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = settings(&["-n", "sw1", "-r", "ls", "-t", "0"], FileConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::InvalidValue { key: "timeout", .. })));
    }

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("DEBUG").unwrap(), LevelFilter::Debug);
        assert_eq!(parse_log_level("warning").unwrap(), LevelFilter::Warn);
        assert_eq!(parse_log_level("FATAL").unwrap(), LevelFilter::Error);
        assert_eq!(parse_log_level("info").unwrap(), LevelFilter::Info);
        assert!(parse_log_level("loud").is_err());
    }

    #[test]
    fn test_missing_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let cli = parse(&["-n", "sw1", "-r", "ls", "-c", path.to_str().unwrap()]);
        let err = cli.into_settings().unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::NotFound(_))));
    }
}
