//! The interactive run state machine.
//!
//! An invoked shell never reports an exit status, so a run is over when the
//! output ends in a prompt marker, when the deadline passes, or when the
//! channel breaks:
//!
//! ```text
//! INIT -> SENT_COMMAND -> POLLING -> PROMPT_MATCHED | TIMED_OUT | IO_ERROR
//! ```
//!
//! While polling, every read is answered with at most one write: a space if
//! the pager is waiting, otherwise the next caller input line.

use log::{debug, trace, warn};
use tokio::time::{Duration, Instant};

use super::request::CommandRequest;
use super::result::RunStatus;
use crate::channel::{OutputBuffer, PromptMarkers, ShellConfig};
use crate::transport::ShellChannel;

/// Keystroke that asks the pager for the next page.
const NEXT_PAGE: &[u8] = b" ";

/// Longest wait for the peer when closing a channel or connection.
pub(crate) const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-run state: the output so far and how much caller input was used.
pub(crate) struct ShellRun<'a> {
    buffer: OutputBuffer,
    input: &'a [String],
    next_input: usize,
    prompts: &'a PromptMarkers,
}

impl<'a> ShellRun<'a> {
    pub(crate) fn new(input: &'a [String], prompts: &'a PromptMarkers) -> Self {
        Self {
            buffer: OutputBuffer::new(),
            input,
            next_input: 0,
            prompts,
        }
    }

    /// Take in one chunk of output and decide what to write back, if anything.
    pub(crate) fn absorb(&mut self, chunk: &[u8]) -> Option<Vec<u8>> {
        self.buffer.extend(chunk);

        if self.buffer.take_pager_marker() {
            return Some(NEXT_PAGE.to_vec());
        }

        let line = self.input.get(self.next_input)?;
        self.next_input += 1;
        let mut data = Vec::with_capacity(line.len() + 1);
        data.extend_from_slice(line.as_bytes());
        data.push(b'\n');
        Some(data)
    }

    /// Check if the output ends in a prompt.
    pub(crate) fn prompt_matched(&self) -> bool {
        self.buffer.ends_with_prompt(self.prompts)
    }

    /// Number of caller input lines sent so far.
    pub(crate) fn consumed_input(&self) -> usize {
        self.next_input
    }

    pub(crate) fn output_len(&self) -> usize {
        self.buffer.len()
    }

    fn into_output(self) -> String {
        self.buffer.into_string()
    }
}

/// Run `request` on a freshly opened shell channel.
///
/// Every write and read happens before `deadline`. Returns the final status
/// and the raw output. On timeout or channel failure a diagnostic line is
/// appended and the channel is closed; after a matched prompt the channel is
/// left open for the caller.
pub(crate) async fn drive<C: ShellChannel>(
    channel: &mut C,
    host: &str,
    request: &CommandRequest,
    config: &ShellConfig,
    deadline: Instant,
) -> (RunStatus, String) {
    let mut run = ShellRun::new(request.input(), &config.prompts);

    let mut wire = request.wire_command().into_bytes();
    wire.push(b'\n');
    debug!("{}: sending command {:?}", host, request.command());

    let status = match send_before(channel, &wire, deadline).await {
        Ok(()) => poll(channel, host, &mut run, deadline, config.read_chunk_size).await,
        Err(status) => status,
    };
    debug!("{}: polling finished ({})", host, status);

    // Output that arrived just as the loop ended
    match channel.try_recv(config.read_chunk_size) {
        Ok(Some(chunk)) => {
            trace!("{}: drained {} bytes", host, chunk.len());
            run.buffer.extend(&chunk);
        }
        Ok(None) => {}
        Err(e) => debug!("{}: final drain failed: {}", host, e),
    }

    let trailer = match &status {
        RunStatus::TimedOut => Some(timeout_message(request.timeout())),
        RunStatus::ChannelFailed(reason) => Some(format!("ERROR: {}", reason)),
        RunStatus::PromptMatched | RunStatus::NotConnected => None,
    };
    if let Some(trailer) = trailer {
        run.buffer.push_line(&trailer);
        close_channel(channel, host).await;
    }

    debug!(
        "{}: {} output bytes, {} input lines sent",
        host,
        run.output_len(),
        run.consumed_input()
    );
    (status, run.into_output())
}

/// Poll the channel until a prompt, the deadline, or a channel failure.
async fn poll<C: ShellChannel>(
    channel: &mut C,
    host: &str,
    run: &mut ShellRun<'_>,
    deadline: Instant,
    chunk_size: usize,
) -> RunStatus {
    loop {
        tokio::select! {
            // The deadline goes first so a chatty device cannot starve it
            biased;

            _ = tokio::time::sleep_until(deadline) => {
                debug!("{}: no prompt before the deadline", host);
                return RunStatus::TimedOut;
            }

            read = channel.recv(chunk_size) => {
                let chunk = match read {
                    Ok(chunk) => chunk,
                    Err(e) => return RunStatus::ChannelFailed(e.to_string()),
                };
                trace!("{}: read {} bytes, total {}", host, chunk.len(), run.output_len() + chunk.len());

                if let Some(reply) = run.absorb(&chunk) {
                    trace!("{}: writing {} bytes", host, reply.len());
                    if let Err(status) = send_before(channel, &reply, deadline).await {
                        return status;
                    }
                }

                if run.prompt_matched() {
                    return RunStatus::PromptMatched;
                }
            }
        }
    }
}

/// Write to the channel, giving up at `deadline`.
async fn send_before<C: ShellChannel>(
    channel: &mut C,
    data: &[u8],
    deadline: Instant,
) -> Result<(), RunStatus> {
    match tokio::time::timeout_at(deadline, channel.send(data)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(RunStatus::ChannelFailed(e.to_string())),
        Err(_) => Err(RunStatus::TimedOut),
    }
}

/// Close a channel that is not coming back, without waiting on the peer
/// for longer than [`CLOSE_TIMEOUT`].
pub(crate) async fn close_channel<C: ShellChannel>(channel: &mut C, host: &str) {
    match tokio::time::timeout(CLOSE_TIMEOUT, channel.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("{}: failed to close channel: {}", host, e),
        Err(_) => warn!("{}: channel close not confirmed after {:?}", host, CLOSE_TIMEOUT),
    }
}

/// Diagnostic appended to the output of a timed-out run.
pub(crate) fn timeout_message(timeout: Duration) -> String {
    format!("ERROR: timeout after {} seconds", timeout.as_secs())
}
