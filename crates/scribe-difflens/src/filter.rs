//! Noise filtering applied before a diff reaches the model.
//!
//! Drops whole file sections for lockfiles, project manifests, and paths
//! matching custom glob patterns. Dropping anything marks the diff as having
//! a documentation update, which the prompt then mentions once.

use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};

use scribe_core::{FilterConfig, ScribeError};
use serde::Serialize;

use crate::parser::{split_sections, FileSection};

/// Decides which diff sections are noise.
///
/// Matching is structural: the diff is split at its file headers and a
/// section is noise when the file name of one of its paths equals a noise
/// name exactly, or when its path matches a configured glob. A name that
/// merely occurs inside another path (`uv.lock.bak`, `not-uv.lock`) is not
/// noise.
///
/// # Examples
///
/// ```
/// use scribe_difflens::filter::NoiseFilter;
///
/// let filter = NoiseFilter::default_filter();
/// assert!(filter.is_noise("uv.lock"));
/// assert!(filter.is_noise("backend/pyproject.toml"));
/// assert!(!filter.is_noise("src/main.rs"));
/// ```
#[derive(Debug, Clone)]
pub struct NoiseFilter {
    noise_files: Vec<String>,
    patterns: Vec<glob::Pattern>,
}

impl NoiseFilter {
    /// Create a filter from an explicit list of noise file names.
    ///
    /// # Examples
    ///
    /// ```
    /// use scribe_difflens::filter::NoiseFilter;
    ///
    /// let filter = NoiseFilter::new(["go.sum"]);
    /// assert!(filter.is_noise("go.sum"));
    /// assert!(!filter.is_noise("uv.lock"));
    /// ```
    pub fn new<I, S>(noise_files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            noise_files: noise_files.into_iter().map(Into::into).collect(),
            patterns: Vec::new(),
        }
    }

    /// Create a filter with the default noise file names.
    pub fn default_filter() -> Self {
        Self::new(FilterConfig::default().noise_files)
    }

    /// Create a filter from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ScribeError::Config`] if an `extra_patterns` entry is not a
    /// valid glob.
    ///
    /// # Examples
    ///
    /// ```
    /// use scribe_core::FilterConfig;
    /// use scribe_difflens::filter::NoiseFilter;
    ///
    /// let config = FilterConfig {
    ///     extra_patterns: vec!["docs/**".into()],
    ///     ..FilterConfig::default()
    /// };
    /// let filter = NoiseFilter::from_config(&config).unwrap();
    /// assert!(filter.is_noise("docs/guide.md"));
    /// ```
    pub fn from_config(config: &FilterConfig) -> Result<Self, ScribeError> {
        let mut patterns = Vec::with_capacity(config.extra_patterns.len());
        for pat in &config.extra_patterns {
            let compiled = glob::Pattern::new(pat).map_err(|e| {
                ScribeError::Config(format!("invalid filter pattern {pat:?}: {e}"))
            })?;
            patterns.push(compiled);
        }

        Ok(Self {
            noise_files: config.noise_files.clone(),
            patterns,
        })
    }

    /// Check a single path.
    pub fn is_noise(&self, path: &str) -> bool {
        self.check(Path::new(path)).is_some()
    }

    /// Split `diff` into file sections and drop the noisy ones.
    ///
    /// When nothing is dropped the returned text borrows the input unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use scribe_difflens::filter::NoiseFilter;
    ///
    /// let diff = "diff --git a/uv.lock b/uv.lock\n+x\n\
    ///             diff --git a/main.py b/main.py\n+print(\"hi\")\n";
    /// let filtered = NoiseFilter::default_filter().filter(diff);
    /// assert!(filtered.documentation_updated);
    /// assert_eq!(filtered.text, "diff --git a/main.py b/main.py\n+print(\"hi\")\n");
    /// ```
    pub fn filter<'a>(&self, diff: &'a str) -> FilteredDiff<'a> {
        let sections = split_sections(diff);
        let files_seen = sections.iter().filter(|s| !s.is_preamble()).count();

        let mut kept: Vec<&FileSection<'a>> = Vec::with_capacity(sections.len());
        let mut skipped = Vec::new();
        for section in &sections {
            match self.check_section(section) {
                Some((path, reason)) => skipped.push(SkippedFile { path, reason }),
                None => kept.push(section),
            }
        }

        let text = if skipped.is_empty() {
            Cow::Borrowed(diff)
        } else {
            Cow::Owned(kept.iter().map(|s| s.text).collect())
        };

        FilteredDiff {
            documentation_updated: !skipped.is_empty(),
            text,
            skipped,
            files_seen,
        }
    }

    fn check_section(&self, section: &FileSection<'_>) -> Option<(PathBuf, SkipReason)> {
        section
            .paths()
            .find_map(|p| self.check(p).map(|reason| (p.to_path_buf(), reason)))
    }

    fn check(&self, path: &Path) -> Option<SkipReason> {
        let file_name = path.file_name().map(|f| f.to_string_lossy())?;
        if let Some(name) = self.noise_files.iter().find(|n| **n == file_name) {
            return Some(SkipReason::NoiseFile(name.clone()));
        }

        let path_str = path.to_string_lossy();
        self.patterns
            .iter()
            .find(|pat| pat.matches(&path_str))
            .map(|pat| SkipReason::PatternMatch(pat.to_string()))
    }
}

/// A diff after noise sections were removed.
#[derive(Debug, Clone)]
pub struct FilteredDiff<'a> {
    /// Remaining diff text, byte for byte as it appeared in the input.
    pub text: Cow<'a, str>,
    /// Files that were dropped, in input order.
    pub skipped: Vec<SkippedFile>,
    /// Number of file sections in the input, noise included.
    pub files_seen: usize,
    /// `true` when at least one section was dropped.
    pub documentation_updated: bool,
}

impl FilteredDiff<'_> {
    /// `true` when nothing but whitespace survived filtering.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// A file that was dropped during filtering.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use scribe_difflens::filter::{SkippedFile, SkipReason};
///
/// let skipped = SkippedFile {
///     path: PathBuf::from("uv.lock"),
///     reason: SkipReason::NoiseFile("uv.lock".into()),
/// };
/// assert_eq!(skipped.reason.to_string(), "noise file: uv.lock");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedFile {
    /// Path of the dropped file.
    pub path: PathBuf,
    /// Why it was dropped.
    pub reason: SkipReason,
}

/// Reason a file was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "value")]
pub enum SkipReason {
    /// File name is in the noise list.
    NoiseFile(String),
    /// Path matched a custom glob.
    PatternMatch(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoiseFile(name) => write!(f, "noise file: {name}"),
            SkipReason::PatternMatch(pat) => write!(f, "pattern: {pat}"),
        }
    }
}
