use scribe_core::ScribeError;
use scribe_difflens::filter::{FilteredDiff, NoiseFilter, SkippedFile};
use serde::Serialize;

use crate::llm::TextGenerator;
use crate::prompt::{self, PromptRequest, PromptTemplate};

/// Result of a completed summarize run.
///
/// # Examples
///
/// ```
/// use scribe_summarize::pipeline::{Summary, SummaryStats};
///
/// let summary = Summary {
///     message: "Add hello world print".into(),
///     stats: SummaryStats {
///         raw_bytes: 42,
///         filtered_bytes: 42,
///         files_seen: 1,
///         skipped: vec![],
///         documentation_updated: false,
///         model_used: "llama3.2".into(),
///     },
/// };
/// assert_eq!(summary.to_string(), "Add hello world print");
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// The commit message.
    pub message: String,
    /// Statistics about the run.
    pub stats: SummaryStats,
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Statistics about a summarize run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStats {
    /// Byte length of the diff as read.
    pub raw_bytes: usize,
    /// Byte length of the diff after noise sections were dropped.
    pub filtered_bytes: usize,
    /// File sections seen in the input.
    pub files_seen: usize,
    /// File sections dropped as noise.
    pub skipped: Vec<SkippedFile>,
    /// Whether the documentation suffix applies.
    pub documentation_updated: bool,
    /// Model identifier used for the run.
    pub model_used: String,
}

/// A filtered diff and the prompt built from it, before any network call.
#[derive(Debug, Clone)]
pub struct PreparedPrompt<'a> {
    /// The diff after noise filtering.
    pub filtered: FilteredDiff<'a>,
    /// The prompt that would be sent.
    pub request: PromptRequest,
}

/// Turns a staged diff into a short commit message.
///
/// Filters noise sections, builds the prompt, makes exactly one call to the
/// [`TextGenerator`], and cleans the reply. Nothing is retried.
pub struct DiffSummarizer<G> {
    generator: G,
    filter: NoiseFilter,
    template: PromptTemplate,
}

impl<G: TextGenerator> DiffSummarizer<G> {
    /// Create a summarizer from its collaborators.
    pub fn new(generator: G, filter: NoiseFilter, template: PromptTemplate) -> Self {
        Self {
            generator,
            filter,
            template,
        }
    }

    /// The text generator this summarizer calls.
    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Filter `diff` and build its prompt without contacting the model.
    ///
    /// # Errors
    ///
    /// Returns [`ScribeError::NothingStaged`] if `diff` is empty or only
    /// whitespace.
    pub fn prepare<'a>(&self, diff: &'a str) -> Result<PreparedPrompt<'a>, ScribeError> {
        if diff.trim().is_empty() {
            return Err(ScribeError::NothingStaged);
        }

        let filtered = self.filter.filter(diff);
        for skipped in &filtered.skipped {
            tracing::debug!(path = %skipped.path.display(), reason = %skipped.reason, "dropped from prompt");
        }
        if filtered.is_blank() {
            tracing::debug!("only noise files staged; prompting with the documentation clause alone");
        }

        let request = self.template.build(&filtered);
        Ok(PreparedPrompt { filtered, request })
    }

    /// Produce a commit message for `diff`.
    ///
    /// # Errors
    ///
    /// - [`ScribeError::NothingStaged`] for empty input; the model is not called.
    /// - [`ScribeError::ServerUnavailable`] when the endpoint cannot be reached.
    /// - [`ScribeError::EmptyResponse`] when the reply is blank after cleaning;
    ///   carries the raw diff length.
    /// - [`ScribeError::Llm`] for other endpoint failures.
    pub async fn summarize(&self, diff: &str) -> Result<Summary, ScribeError> {
        let prepared = self.prepare(diff)?;
        tracing::debug!(
            raw_bytes = diff.len(),
            filtered_bytes = prepared.filtered.text.len(),
            prompt_bytes = prepared.request.user.len(),
            "prompt built"
        );

        let reply = self.generator.generate(&prepared.request.messages()).await?;

        let cleaned = prompt::clean_response(&reply);
        if cleaned.is_empty() {
            return Err(ScribeError::EmptyResponse {
                diff_bytes: diff.len(),
            });
        }
        let message = prompt::with_documentation_suffix(&cleaned, prepared.request.documentation_updated);

        let PreparedPrompt { filtered, request } = prepared;
        Ok(Summary {
            message,
            stats: SummaryStats {
                raw_bytes: diff.len(),
                filtered_bytes: filtered.text.len(),
                files_seen: filtered.files_seen,
                skipped: filtered.skipped,
                documentation_updated: request.documentation_updated,
                model_used: self.generator.model().to_string(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::llm::{ChatMessage, Role};

    struct Canned {
        reply: String,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl Canned {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.into(),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for Canned {
        fn model(&self) -> &str {
            "canned"
        }

        async fn generate(&self, messages: &[ChatMessage]) -> Result<String, ScribeError> {
            self.seen.lock().unwrap().push(messages.to_vec());
            Ok(self.reply.clone())
        }
    }

    fn summarizer(reply: &str) -> DiffSummarizer<Canned> {
        DiffSummarizer::new(
            Canned::new(reply),
            NoiseFilter::default_filter(),
            PromptTemplate::default(),
        )
    }

    #[tokio::test]
    async fn whitespace_only_input_is_nothing_staged() {
        let s = summarizer("unused");
        let err = s.summarize(" \n\t\n").await.unwrap_err();
        assert!(matches!(err, ScribeError::NothingStaged));
        assert!(s.generator().seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn user_message_carries_the_prompt() {
        let s = summarizer("Add x");
        let diff = "diff --git a/x.rs b/x.rs\n+x\n";
        s.summarize(diff).await.unwrap();
        let seen = s.generator().seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0][0].role, Role::System);
        assert!(seen[0][1].content.ends_with(diff));
    }

    #[tokio::test]
    async fn stats_describe_the_run() {
        let s = summarizer("Add x");
        let diff = "diff --git a/Cargo.lock b/Cargo.lock\n+x\ndiff --git a/x.rs b/x.rs\n+x\n";
        let summary = s.summarize(diff).await.unwrap();
        assert_eq!(summary.stats.raw_bytes, diff.len());
        assert_eq!(summary.stats.files_seen, 2);
        assert_eq!(summary.stats.skipped.len(), 1);
        assert_eq!(summary.stats.model_used, "canned");
        assert!(summary.stats.filtered_bytes < summary.stats.raw_bytes);
    }

    #[tokio::test]
    async fn blank_reply_reports_raw_diff_size() {
        let s = summarizer("  \"\"  ");
        let diff = "diff --git a/uv.lock b/uv.lock\n+x\n";
        match s.summarize(diff).await {
            Err(ScribeError::EmptyResponse { diff_bytes }) => assert_eq!(diff_bytes, diff.len()),
            other => panic!("expected EmptyResponse, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn punctuation_reply_is_empty_response() {
        let s = summarizer(".");
        let diff = "diff --git a/uv.lock b/uv.lock\n+x\n";
        assert!(matches!(
            s.summarize(diff).await,
            Err(ScribeError::EmptyResponse { .. })
        ));
    }

    #[test]
    fn prepare_builds_prompt_without_calling_model() {
        let s = summarizer("unused");
        let prepared = s.prepare("diff --git a/uv.lock b/uv.lock\n+x\n").unwrap();
        assert!(prepared.filtered.is_blank());
        assert_eq!(prepared.request.documentation_clause_count(), 1);
        assert!(s.generator().seen.lock().unwrap().is_empty());
    }

    #[test]
    fn summary_serializes_camel_case() {
        let summary = Summary {
            message: "Add x".into(),
            stats: SummaryStats {
                raw_bytes: 1,
                filtered_bytes: 1,
                files_seen: 1,
                skipped: vec![],
                documentation_updated: false,
                model_used: "m".into(),
            },
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["stats"]["rawBytes"], 1);
        assert_eq!(json["stats"]["modelUsed"], "m");
    }
}
