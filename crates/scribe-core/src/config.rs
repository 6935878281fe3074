use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ScribeError;

/// File name looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = ".scribe.toml";

/// Top-level configuration loaded from `.scribe.toml`.
///
/// Supports layered resolution: CLI flags > config file > defaults.
///
/// # Examples
///
/// ```
/// use scribe_core::ScribeConfig;
///
/// let config = ScribeConfig::default();
/// assert_eq!(config.message.max_length, 128);
/// assert!(config.filter.noise_files.contains(&"uv.lock".to_string()));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScribeConfig {
    /// Inference server settings.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Which diff sections are treated as noise.
    #[serde(default)]
    pub filter: FilterConfig,
    /// Commit message shaping.
    #[serde(default)]
    pub message: MessageConfig,
    /// Clipboard mirroring.
    #[serde(default)]
    pub clipboard: ClipboardConfig,
}

impl ScribeConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ScribeError::Io`] if the file cannot be read, or
    /// [`ScribeError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use scribe_core::ScribeConfig;
    /// use std::path::Path;
    ///
    /// let config = ScribeConfig::from_file(Path::new(".scribe.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, ScribeError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ScribeError::Toml`] if parsing fails, or
    /// [`ScribeError::Config`] if a value is out of range.
    ///
    /// # Examples
    ///
    /// ```
    /// use scribe_core::ScribeConfig;
    ///
    /// let toml = r#"
    /// [llm]
    /// model = "llama3.2"
    /// "#;
    /// let config = ScribeConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.llm.model, "llama3.2");
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, ScribeError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ScribeError> {
        if self.llm.timeout_secs == 0 {
            return Err(ScribeError::Config(
                "llm.timeout_secs must be greater than zero".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ScribeError::Config(format!(
                "llm.temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }
        if let Some(command) = &self.clipboard.command {
            if command.is_empty() {
                return Err(ScribeError::Config(
                    "clipboard.command must name a program".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Local inference server configuration.
///
/// # Examples
///
/// ```
/// use scribe_core::LlmConfig;
///
/// let config = LlmConfig::default();
/// assert_eq!(config.base_url, "http://localhost:11434");
/// assert_eq!(config.timeout_secs, 60);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the inference server.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model identifier passed to the server.
    #[serde(default = "default_model")]
    pub model: String,
    /// Sampling temperature.
    #[serde(default)]
    pub temperature: f32,
    /// Seconds to wait for the full response before giving up.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:11434".into()
}

fn default_model() -> String {
    "hf.co/bartowski/Meta-Llama-3.1-8B-Instruct-GGUF:Q4_K_M".into()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            temperature: 0.0,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Noise filtering configuration.
///
/// # Examples
///
/// ```
/// use scribe_core::FilterConfig;
///
/// let config = FilterConfig::default();
/// assert!(config.noise_files.contains(&"pyproject.toml".to_string()));
/// assert!(config.extra_patterns.is_empty());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// File names (last path component) whose sections are dropped.
    #[serde(default = "default_noise_files")]
    pub noise_files: Vec<String>,
    /// Additional glob patterns matched against the full path.
    #[serde(default)]
    pub extra_patterns: Vec<String>,
}

fn default_noise_files() -> Vec<String> {
    [
        "pyproject.toml",
        "uv.lock",
        "poetry.lock",
        "package-lock.json",
        "yarn.lock",
        "pnpm-lock.yaml",
        "Cargo.lock",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            noise_files: default_noise_files(),
            extra_patterns: Vec::new(),
        }
    }
}

/// Commit message configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageConfig {
    /// Length hint given to the model, in characters.
    #[serde(default = "default_max_length")]
    pub max_length: usize,
}

fn default_max_length() -> usize {
    128
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            max_length: default_max_length(),
        }
    }
}

/// Clipboard configuration.
///
/// # Examples
///
/// ```
/// use scribe_core::ClipboardConfig;
///
/// let config = ClipboardConfig::default();
/// assert!(config.enabled);
/// assert!(config.command.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipboardConfig {
    /// Copy the message to the clipboard after printing it.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Program and arguments that read the text on stdin.
    /// When absent, a platform default is detected.
    pub command: Option<Vec<String>>,
}

fn default_true() -> bool {
    true
}

impl Default for ClipboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: None,
        }
    }
}
