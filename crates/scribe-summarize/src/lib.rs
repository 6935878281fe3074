//! Commit message generation from filtered diffs.
//!
//! Provides the inference client, prompt construction, the
//! [`pipeline::DiffSummarizer`] that ties them together, and the clipboard
//! capability the binary injects.

pub mod clipboard;
pub mod llm;
pub mod pipeline;
pub mod prompt;
