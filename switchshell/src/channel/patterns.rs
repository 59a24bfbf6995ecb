//! Prompt and pager marker matching.

use std::sync::LazyLock;

use regex::bytes::Regex;

/// Prompt markers used when none are configured.
pub const DEFAULT_PROMPTS: [&str; 2] = [" > ", " # "];

/// A pager waiting for a keystroke, e.g. `lines 1-45` or `lines 46-90/120`.
pub(crate) static PAGER_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"lines \d+-\d+").expect("valid pager pattern"));

/// End-of-command prompt markers.
///
/// A shell is considered idle when its output ends with one of the markers.
/// Each marker is compared against a tail of its own width, so the check
/// costs the same however much output has accumulated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptMarkers {
    markers: Vec<String>,
}

impl PromptMarkers {
    /// Build a marker set. Empty markers are ignored.
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let markers: Vec<String> = markers
            .into_iter()
            .map(Into::into)
            .filter(|m| !m.is_empty())
            .collect();
        Self { markers }
    }

    /// Check whether `output` ends in an idle prompt.
    pub fn matches(&self, output: &[u8]) -> bool {
        self.markers.iter().any(|m| output.ends_with(m.as_bytes()))
    }

    /// The configured markers.
    pub fn markers(&self) -> &[String] {
        &self.markers
    }
}

impl Default for PromptMarkers {
    fn default() -> Self {
        Self::new(DEFAULT_PROMPTS)
    }
}
