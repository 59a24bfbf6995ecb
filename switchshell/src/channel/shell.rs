//! Per-run shell polling configuration.

use super::patterns::PromptMarkers;

/// Largest single read from a shell channel.
pub const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Configuration for driving an interactive shell.
#[derive(Debug, Clone)]
pub struct ShellConfig {
    /// Markers that end a command.
    pub prompts: PromptMarkers,

    /// Maximum bytes per channel read.
    pub read_chunk_size: usize,
}

impl ShellConfig {
    /// Replace the prompt markers.
    pub fn with_prompts(mut self, prompts: PromptMarkers) -> Self {
        self.prompts = prompts;
        self
    }
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompts: PromptMarkers::default(),
            read_chunk_size: READ_CHUNK_SIZE,
        }
    }
}
