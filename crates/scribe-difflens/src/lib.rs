//! Diff splitting and noise filtering.
//!
//! Splits staged diffs into per-file sections on their `diff --git`
//! boundaries and removes lockfile and manifest sections before the text is
//! handed to the model.

pub mod filter;
pub mod parser;
