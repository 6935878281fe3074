/// Errors that can occur while turning a diff into a commit message.
///
/// The first three variants are the terminal outcomes of a summarize run;
/// the rest wrap the configuration, I/O and transport layers around it.
/// Library crates use this type directly; the binary converts it to a
/// `miette::Report` at the boundary so the `help` text reaches the user.
///
/// # Examples
///
/// ```
/// use scribe_core::ScribeError;
///
/// let err = ScribeError::ServerUnavailable {
///     url: "http://localhost:11434".into(),
/// };
/// assert!(err.to_string().contains("unavailable"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ScribeError {
    /// The input diff was empty; no model call was made.
    #[error("nothing staged: the diff is empty, so there is nothing to summarize")]
    #[diagnostic(
        code(scribe::nothing_staged),
        help("stage some changes with `git add`, then pipe `git diff --staged` into scribe")
    )]
    NothingStaged,

    /// The inference endpoint refused the connection or timed out.
    #[error("inference server unavailable at {url}")]
    #[diagnostic(
        code(scribe::server_unavailable),
        help("start the local inference server (for example `ollama serve`) and try again")
    )]
    ServerUnavailable {
        /// Base URL that was contacted.
        url: String,
    },

    /// The endpoint answered but produced no usable text.
    #[error("model returned an empty response (diff was {diff_bytes} bytes)")]
    #[diagnostic(
        code(scribe::empty_response),
        help("the diff may exceed the model's context window; try staging fewer files")
    )]
    EmptyResponse {
        /// Byte length of the raw, unfiltered diff.
        diff_bytes: usize,
    },

    /// The endpoint answered with an error status or an unexpected body.
    #[error("LLM error: {0}")]
    #[diagnostic(code(scribe::llm))]
    Llm(String),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    #[diagnostic(code(scribe::config))]
    Config(String),

    /// The clipboard command could not be run.
    #[error("clipboard error: {0}")]
    #[diagnostic(code(scribe::clipboard))]
    Clipboard(String),

    /// Filesystem or stdin I/O failure.
    #[error("IO error: {0}")]
    #[diagnostic(code(scribe::io))]
    Io(#[from] std::io::Error),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    #[diagnostic(code(scribe::serialization))]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    #[diagnostic(code(scribe::toml))]
    Toml(#[from] toml::de::Error),
}
