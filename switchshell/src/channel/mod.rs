//! Channel layer: output buffering, prompt/pager detection and cleanup.
//!
//! This module holds the pieces of an interactive run that do not need a
//! live connection.

mod buffer;
mod patterns;
pub mod sanitize;
mod shell;

pub use buffer::OutputBuffer;
pub use patterns::{DEFAULT_PROMPTS, PromptMarkers};
pub use sanitize::{clean_output, sanitize, strip_control_sequences};
pub use shell::{READ_CHUNK_SIZE, ShellConfig};
