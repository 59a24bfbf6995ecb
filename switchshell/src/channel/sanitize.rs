//! Cleanup of captured shell output.
//!
//! [`sanitize`] removes carriage returns and the pager's `lines N-M` status
//! lines and touches nothing else. [`strip_control_sequences`] removes
//! terminal escape sequences with a `vte` parser. [`clean_output`] applies
//! both and is what reports are built from. All three are idempotent.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use vte::{Params, Parser, Perform};

/// `lines 1-45 ` or `lines 46-90/120 (END) `, as left behind by the pager.
static PAGER_ARTIFACT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"lines \d+-\d+(?:/\d+ \(END\))? ").expect("valid pager artifact pattern")
});

/// Remove carriage returns and pager status artifacts.
pub fn sanitize(text: &str) -> String {
    let mut out = if memchr::memchr(b'\r', text.as_bytes()).is_some() {
        text.replace('\r', "")
    } else {
        text.to_string()
    };

    // Removing one artifact can join its neighbours into a new one
    // ("lines lines 1-2 1-3 "), so repeat until nothing matches.
    loop {
        match PAGER_ARTIFACT.replace_all(&out, "") {
            Cow::Borrowed(_) => return out,
            Cow::Owned(next) => out = next,
        }
    }
}

/// Remove ANSI/VT escape sequences, keeping printable text, tabs,
/// carriage returns and newlines.
pub fn strip_control_sequences(text: &str) -> String {
    if memchr::memchr(0x1b, text.as_bytes()).is_none()
        && !text.bytes().any(|b| b.is_ascii_control() && !matches!(b, b'\n' | b'\r' | b'\t'))
    {
        return text.to_string();
    }

    let mut extractor = PlainText::with_capacity(text.len());
    let mut parser = Parser::new();
    parser.advance(&mut extractor, text.as_bytes());
    extractor.text
}

/// Strip escape sequences, then [`sanitize`].
pub fn clean_output(text: &str) -> String {
    sanitize(&strip_control_sequences(text))
}

/// VTE performer that keeps printable text only.
struct PlainText {
    text: String,
}

impl PlainText {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            text: String::with_capacity(capacity),
        }
    }
}

impl Perform for PlainText {
    fn print(&mut self, c: char) {
        self.text.push(c);
    }

    fn execute(&mut self, byte: u8) {
        if matches!(byte, b'\n' | b'\r' | b'\t') {
            self.text.push(byte as char);
        }
    }

    fn hook(&mut self, _params: &Params, _intermediates: &[u8], _ignore: bool, _action: char) {}

    fn put(&mut self, _byte: u8) {}

    fn unhook(&mut self) {}

    fn osc_dispatch(&mut self, _params: &[&[u8]], _bell_terminated: bool) {}

    fn csi_dispatch(&mut self, _params: &Params, _intermediates: &[u8], _ignore: bool, _action: char) {}

    fn esc_dispatch(&mut self, _intermediates: &[u8], _ignore: bool, _byte: u8) {}
}
