//! Configuration, error handling, and shared types for scribe.
//!
//! This crate provides the shared foundation used by the other scribe crates:
//! - [`ScribeError`]: unified error type using `thiserror` and `miette`
//! - [`ScribeConfig`]: configuration loaded from `.scribe.toml`
//! - [`OutputFormat`]: how the binary prints its result

mod config;
mod error;
mod types;

pub use config::{
    ClipboardConfig, FilterConfig, LlmConfig, MessageConfig, ScribeConfig, DEFAULT_CONFIG_FILE,
};
pub use error::ScribeError;
pub use types::OutputFormat;
