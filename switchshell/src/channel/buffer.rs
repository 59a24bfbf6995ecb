//! Output buffer for one command run.
//!
//! Prompt detection only looks at the tail of the buffer, so it stays cheap
//! no matter how long the output gets. Pager markers can turn up anywhere
//! in the output, so that search covers everything not yet ruled out: the
//! cursor skips answered markers and output that can no longer start one.

use memchr::memmem;

use super::patterns::{PAGER_MARKER, PromptMarkers};

/// Fixed text every pager marker starts with.
const PAGER_PREFIX: &[u8] = b"lines ";

/// Append-only accumulator for a command's raw output.
#[derive(Debug, Default)]
pub struct OutputBuffer {
    /// The accumulated output.
    buffer: Vec<u8>,

    /// Offset where the next pager search starts.
    pager_cursor: usize,
}

impl OutputBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            pager_cursor: 0,
        }
    }

    /// Append raw bytes read from the channel.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Append a diagnostic line.
    pub fn push_line(&mut self, line: &str) {
        self.buffer.push(b'\n');
        self.buffer.extend_from_slice(line.as_bytes());
    }

    /// Check the tail of the buffer for an idle prompt.
    pub fn ends_with_prompt(&self, prompts: &PromptMarkers) -> bool {
        prompts.matches(&self.buffer)
    }

    /// Look for a pager marker that has not been answered yet.
    ///
    /// Returns true at most once per marker: a found marker moves the cursor
    /// past itself. Without a match the cursor stops at the only place a
    /// marker split across reads could still begin, so every byte is
    /// scanned a bounded number of times.
    pub fn take_pager_marker(&mut self) -> bool {
        let pending = &self.buffer[self.pager_cursor..];
        if let Some(m) = PAGER_MARKER.find(pending) {
            self.pager_cursor += m.end();
            return true;
        }

        let keep_from = match memmem::rfind(pending, PAGER_PREFIX) {
            // `lines 12-` may still become a marker
            Some(pos)
                if pending[pos + PAGER_PREFIX.len()..]
                    .iter()
                    .all(|b| b.is_ascii_digit() || *b == b'-') =>
            {
                pos
            }
            // Room for a prefix cut short by the end of the read
            _ => pending.len().saturating_sub(PAGER_PREFIX.len() - 1),
        };
        self.pager_cursor += keep_from;
        false
    }

    /// Get a reference to the buffer contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Get the current buffer length.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Consume the buffer as text (lossy UTF-8 conversion).
    pub fn into_string(self) -> String {
        match String::from_utf8(self.buffer) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }
    }
}
