//! Labeled per-command reports and where they are written.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, Local};
use log::{debug, info};
use regex::Regex;

use crate::driver::CommandResult;
use crate::error::{ReportError, Result};

/// Rule separating report headers from output.
const RULE_WIDTH: usize = 64;

static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\W_]+").expect("valid file name pattern"));

/// Results of one command across all hosts, in host order.
#[derive(Debug, Clone)]
pub struct Report {
    command: String,
    results: Vec<CommandResult>,
}

impl Report {
    /// Create a report.
    pub fn new(command: impl Into<String>, results: Vec<CommandResult>) -> Self {
        Self {
            command: command.into(),
            results,
        }
    }

    /// The command as the caller wrote it.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Per-host results, aligned with the session order.
    pub fn results(&self) -> &[CommandResult] {
        &self.results
    }

    /// Render every host's block.
    pub fn render(&self) -> String {
        self.results.iter().map(|r| self.render_block(r)).collect()
    }

    /// Render one host's block: a header, then the cleaned output.
    pub fn render_block(&self, result: &CommandResult) -> String {
        let rule = "=".repeat(RULE_WIDTH);
        format!(
            "\n{rule}\nhost    : {}\ncommand : {}\nstatus  : {}\noutput  : {} bytes\n{rule}\n{}",
            result.host,
            self.command,
            result.code(),
            result.output.len(),
            result.clean_output(),
        )
    }
}

/// Destination for reports, called once per command in batch order.
pub trait ReportSink {
    /// Write one command's report.
    fn write(&mut self, report: &Report) -> Result<()>;
}

/// Collects reports in memory.
impl ReportSink for Vec<Report> {
    fn write(&mut self, report: &Report) -> Result<()> {
        self.push(report.clone());
        Ok(())
    }
}

/// Writes each report to a file, optionally echoing it to stdout.
///
/// Without a fixed path every command gets its own file named after the
/// command and the current time. With a fixed path the file is truncated
/// for the first command and every later command is appended to it.
#[derive(Debug)]
pub struct FileSink {
    directory: PathBuf,
    fixed_path: Option<PathBuf>,
    echo: bool,
    written: Vec<PathBuf>,
}

impl FileSink {
    /// Per-command files in the current directory.
    pub fn new() -> Self {
        Self {
            directory: PathBuf::from("."),
            fixed_path: None,
            echo: false,
            written: Vec::new(),
        }
    }

    /// Write every report of the batch into `path`.
    pub fn with_fixed_path(mut self, path: Option<PathBuf>) -> Self {
        self.fixed_path = path;
        self
    }

    /// Directory for per-command files.
    pub fn in_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = directory.into();
        self
    }

    /// Also print reports to stdout.
    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Files written so far, in order, without repeats.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn open(&mut self, report: &Report) -> Result<(PathBuf, File)> {
        let (path, append) = match &self.fixed_path {
            Some(path) => (path.clone(), self.written.contains(path)),
            None => (
                self.directory.join(report_file_name(report.command(), Local::now())),
                false,
            ),
        };

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(&path)
            .map_err(|source| write_error(&path, source))?;
        Ok((path, file))
    }
}

impl Default for FileSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportSink for FileSink {
    fn write(&mut self, report: &Report) -> Result<()> {
        let (path, mut file) = self.open(report)?;
        debug!("writing report for {:?} to {}", report.command(), path.display());

        for result in report.results() {
            let block = report.render_block(result);
            file.write_all(block.as_bytes())
                .map_err(|source| write_error(&path, source))?;
            if self.echo {
                println!("{}", block);
            }
        }

        if !self.written.contains(&path) {
            info!("report written to {}", path.display());
            self.written.push(path);
        }
        Ok(())
    }
}

fn write_error(path: &Path, source: std::io::Error) -> crate::error::Error {
    ReportError::Write {
        path: path.to_path_buf(),
        source,
    }
    .into()
}

/// File name for a command's report: the command with every run of
/// non-word characters turned into `_`, then a minute timestamp.
pub fn report_file_name(command: &str, now: DateTime<Local>) -> String {
    format!(
        "{}_{}.txt",
        NON_WORD.replace_all(command, "_"),
        now.format("%Y_%m_%d-%H_%M")
    )
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::Duration;

    use chrono::TimeZone;

    use super::*;
    use crate::driver::RunStatus;

    fn result(host: &str, status: RunStatus, output: &str) -> CommandResult {
        CommandResult::new(host, "show version", status, output, Duration::from_secs(1))
    }

    fn sample_report() -> Report {
        Report::new(
            "show version",
            vec![
                result("sw1", RunStatus::PromptMatched, "Onyx 3.9\r\nswitch # "),
                result("sw2", RunStatus::TimedOut, "\nERROR: timeout after 30 seconds"),
            ],
        )
    }

    #[test]
    fn test_report_file_name() {
        let now = Local.with_ymd_and_hms(2026, 3, 9, 14, 5, 59).unwrap();
        assert_eq!(
            report_file_name("show interfaces ethernet status", now),
            "show_interfaces_ethernet_status_2026_03_09-14_05.txt"
        );
        assert_eq!(report_file_name("show  ip__route | inc 10.0", now), "show_ip_route_inc_10_0_2026_03_09-14_05.txt");
    }

    #[test]
    fn test_render_block() {
        let report = sample_report();
        let block = report.render_block(&report.results()[0]);
        let rule = "=".repeat(64);
        assert_eq!(
            block,
            format!(
                "\n{rule}\nhost    : sw1\ncommand : show version\nstatus  : 0\noutput  : 19 bytes\n{rule}\nOnyx 3.9\nswitch # "
            )
        );
    }

    #[test]
    fn test_render_keeps_host_order() {
        let rendered = sample_report().render();
        let sw1 = rendered.find("host    : sw1").unwrap();
        let sw2 = rendered.find("host    : sw2").unwrap();
        assert!(sw1 < sw2);
        assert!(rendered.contains("status  : -1"));
    }

    #[test]
    fn test_file_sink_per_command_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = FileSink::new().in_directory(dir.path());

        sink.write(&sample_report()).unwrap();
        sink.write(&Report::new("show clock", vec![result("sw1", RunStatus::PromptMatched, "10:00")]))
            .unwrap();

        assert_eq!(sink.written().len(), 2);
        let first = fs::read_to_string(&sink.written()[0]).unwrap();
        assert!(first.contains("host    : sw2"));
        let name = sink.written()[1].file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("show_clock_"));
        assert!(name.ends_with(".txt"));
    }

    #[test]
    fn test_file_sink_fixed_path_keeps_every_command() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        fs::write(&path, "stale content from an earlier run").unwrap();

        let mut sink = FileSink::new().with_fixed_path(Some(path.clone()));
        sink.write(&sample_report()).unwrap();
        sink.write(&Report::new("show clock", vec![result("sw1", RunStatus::PromptMatched, "10:00")]))
            .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(!content.contains("stale content"));
        assert!(content.contains("command : show version"));
        assert!(content.contains("command : show clock"));
        assert_eq!(sink.written(), [path]);
    }

    #[test]
    fn test_vec_sink() {
        let mut sink: Vec<Report> = Vec::new();
        sink.write(&sample_report()).unwrap();
        assert_eq!(sink.len(), 1);
        assert_eq!(sink[0].results().len(), 2);
    }
}
