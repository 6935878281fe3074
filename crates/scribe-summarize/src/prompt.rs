use scribe_difflens::filter::FilteredDiff;

use crate::llm::{ChatMessage, Role};

const SYSTEM_PROMPT: &str = "\
You read git diffs and write git commit messages for them.

Guidelines:
- Use the imperative mood: \"Add\", \"Fix\", \"Update\", \"Refactor\", \"Remove\".
- Describe intent (what changed and why), not line-by-line details.
- When several files or functions change, name each one briefly.
- Merge closely related changes into one clear statement.
- Do not quote code, do not use markdown, do not explain yourself.
- Reply with the commit message and nothing else.

Example diff:
- def calculate_total(price, tax):
-     return price + price * tax
+ def calculate_total(price, tax_rate):
+     return price + price * tax_rate
Example reply:
Rename tax parameter to tax_rate in calculate_total for clarity

Example diff:
+ import logging
+ logging.basicConfig(level=logging.DEBUG)
Example reply:
Add basic debug logging setup

Example diff:
- SELECT * FROM users
+ SELECT id, name, email FROM users WHERE active = TRUE
Example reply:
Restrict users query to active users and a subset of columns";

/// Phrase the message must end with when noise files were dropped.
pub const DOCUMENTATION_SUFFIX: &str = "and updated documentation";

const DOCUMENTATION_CLAUSE: &str = "\n\nLockfile or project manifest changes were left out of \
the diff above. End the commit message with \"and updated documentation\".";

/// Fixed instruction text and length hint used to build prompts.
///
/// # Examples
///
/// ```
/// use scribe_summarize::prompt::PromptTemplate;
///
/// let template = PromptTemplate::new(128);
/// assert!(template.instruction().contains("under 128 characters"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    max_length: usize,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(128)
    }
}

impl PromptTemplate {
    /// Create a template with the given message length hint.
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }

    /// The instruction that precedes the diff in every prompt.
    pub fn instruction(&self) -> String {
        format!(
            "Write a concise, imperative-mood git commit message, under {} characters where \
             possible, describing the following code change.\n\n",
            self.max_length
        )
    }

    /// Assemble the prompt for a filtered diff.
    ///
    /// The user prompt is the instruction followed by the diff text exactly as
    /// filtered; the documentation clause is appended once when anything was
    /// dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use scribe_difflens::filter::NoiseFilter;
    /// use scribe_summarize::prompt::PromptTemplate;
    ///
    /// let template = PromptTemplate::default();
    /// let diff = "diff --git a/main.py b/main.py\n+print(\"hi\")\n";
    /// let filtered = NoiseFilter::default_filter().filter(diff);
    /// let prompt = template.build(&filtered);
    /// assert_eq!(prompt.user, format!("{}{diff}", template.instruction()));
    /// ```
    pub fn build(&self, filtered: &FilteredDiff<'_>) -> PromptRequest {
        let mut user = self.instruction();
        user.push_str(&filtered.text);
        if filtered.documentation_updated {
            user.push_str(DOCUMENTATION_CLAUSE);
        }
        PromptRequest {
            system: SYSTEM_PROMPT.to_string(),
            user,
            documentation_updated: filtered.documentation_updated,
        }
    }
}

/// A prompt ready to send to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRequest {
    /// Commit-writing guidelines with examples.
    pub system: String,
    /// Instruction, filtered diff, and optional documentation clause.
    pub user: String,
    /// Whether noise files were dropped from the diff.
    pub documentation_updated: bool,
}

impl PromptRequest {
    /// The chat messages sent to the model.
    pub fn messages(&self) -> Vec<ChatMessage> {
        vec![
            ChatMessage::new(Role::System, self.system.as_str()),
            ChatMessage::new(Role::User, self.user.as_str()),
        ]
    }

    /// How many times the documentation clause appears in the user prompt.
    pub fn documentation_clause_count(&self) -> usize {
        self.user.matches(DOCUMENTATION_CLAUSE).count()
    }
}

/// Clean a raw model reply into a bare commit message.
///
/// Trims whitespace and strips code fences, a leading "Commit message:"
/// label (bold or plain), and quotes wrapped around the whole reply. A reply
/// made only of punctuation cleans to the empty string.
///
/// # Examples
///
/// ```
/// use scribe_summarize::prompt::clean_response;
///
/// assert_eq!(clean_response("  \"Add hello world print\"\n"), "Add hello world print");
/// assert_eq!(clean_response("**Commit Message:** Fix typo"), "Fix typo");
/// ```
pub fn clean_response(raw: &str) -> String {
    let text = strip_wrappers(raw);
    if text.chars().all(|c| c.is_ascii_punctuation() || c.is_whitespace()) {
        return String::new();
    }
    text.to_string()
}

fn strip_wrappers(raw: &str) -> &str {
    let mut text = raw.trim();
    loop {
        let before = text;
        text = strip_code_fences(text);
        text = strip_label(text);
        text = strip_quotes(text);
        if text == before {
            return text;
        }
    }
}

/// Append [`DOCUMENTATION_SUFFIX`] unless the message already ends with it.
///
/// # Examples
///
/// ```
/// use scribe_summarize::prompt::with_documentation_suffix;
///
/// assert_eq!(
///     with_documentation_suffix("Add hello world print", true),
///     "Add hello world print and updated documentation"
/// );
/// assert_eq!(with_documentation_suffix("Add x", false), "Add x");
/// ```
pub fn with_documentation_suffix(message: &str, documentation_updated: bool) -> String {
    if !documentation_updated {
        return message.to_string();
    }
    let base = message.trim_end().trim_end_matches('.').trim_end();
    if base.is_empty() {
        return DOCUMENTATION_SUFFIX.to_string();
    }
    if base.to_lowercase().ends_with(DOCUMENTATION_SUFFIX) {
        return message.to_string();
    }
    format!("{base} {DOCUMENTATION_SUFFIX}")
}

fn strip_code_fences(s: &str) -> &str {
    let trimmed = s.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(inner) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop a language tag on the opening fence line.
    match inner.split_once('\n') {
        Some((tag, body)) if !tag.trim().contains(' ') => body.trim(),
        _ => inner.trim(),
    }
}

fn strip_label(s: &str) -> &str {
    const LABELS: &[&str] = &[
        "**commit message:**",
        "**commit message**:",
        "commit message:",
    ];
    for label in LABELS {
        if let Some(head) = s.get(..label.len()) {
            if head.eq_ignore_ascii_case(label) {
                return s[label.len()..].trim();
            }
        }
    }
    s
}

fn strip_quotes(s: &str) -> &str {
    for quote in ['"', '\'', '`'] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            let inner = &s[1..s.len() - 1];
            if !inner.contains(quote) {
                return inner.trim();
            }
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_difflens::filter::NoiseFilter;

    const MIXED: &str = "diff --git a/uv.lock b/uv.lock\n+lock\ndiff --git a/main.py b/main.py\n+print(\"hi\")\n";

    #[test]
    fn system_prompt_contains_key_instructions() {
        let prompt = PromptTemplate::default().build(&NoiseFilter::default_filter().filter("+x"));
        assert!(prompt.system.contains("imperative"));
        assert!(prompt.system.contains("Example reply"));
    }

    #[test]
    fn clean_diff_prompt_is_instruction_plus_diff() {
        let template = PromptTemplate::default();
        let diff = "diff --git a/main.py b/main.py\n+print(\"hi\")\n";
        let prompt = template.build(&NoiseFilter::default_filter().filter(diff));
        assert_eq!(prompt.user, format!("{}{diff}", template.instruction()));
        assert!(!prompt.documentation_updated);
        assert_eq!(prompt.documentation_clause_count(), 0);
    }

    #[test]
    fn noise_diff_gets_clause_once() {
        let prompt = PromptTemplate::default().build(&NoiseFilter::default_filter().filter(MIXED));
        assert!(prompt.documentation_updated);
        assert_eq!(prompt.documentation_clause_count(), 1);
        assert!(!prompt.user.contains("+lock"));
        assert!(prompt.user.contains("+print(\"hi\")"));
    }

    #[test]
    fn instruction_uses_length_hint() {
        assert!(PromptTemplate::new(72).instruction().contains("under 72 characters"));
    }

    #[test]
    fn messages_are_system_then_user() {
        let prompt = PromptTemplate::default().build(&NoiseFilter::default_filter().filter(MIXED));
        let messages = prompt.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[1].content, prompt.user);
    }

    #[test]
    fn clean_strips_quotes_and_whitespace() {
        assert_eq!(clean_response("\n 'Fix login bug' \n"), "Fix login bug");
        assert_eq!(clean_response("`Bump version`"), "Bump version");
        assert_eq!(clean_response("'\"Nested\"'"), "Nested");
        assert_eq!(
            clean_response("\"foo\" renamed to \"bar\""),
            "\"foo\" renamed to \"bar\""
        );
    }

    #[test]
    fn clean_strips_labels_and_fences() {
        assert_eq!(clean_response("Commit message: Add CLI flag"), "Add CLI flag");
        assert_eq!(clean_response("**Commit Message**: Add CLI flag"), "Add CLI flag");
        assert_eq!(clean_response("```text\nAdd CLI flag\n```"), "Add CLI flag");
        assert_eq!(clean_response("```\n\"Add CLI flag\"\n```"), "Add CLI flag");
    }

    #[test]
    fn clean_leaves_inner_quotes() {
        assert_eq!(
            clean_response("Rename \"foo\" to \"bar\""),
            "Rename \"foo\" to \"bar\""
        );
    }

    #[test]
    fn clean_of_blank_reply_is_empty() {
        assert_eq!(clean_response("   \n\t"), "");
        assert_eq!(clean_response("\"\""), "");
    }

    #[test]
    fn suffix_not_duplicated() {
        assert_eq!(
            with_documentation_suffix("Add parser and updated documentation.", true),
            "Add parser and updated documentation."
        );
        assert_eq!(
            with_documentation_suffix("Add parser And Updated Documentation", true),
            "Add parser And Updated Documentation"
        );
    }

    #[test]
    fn punctuation_only_reply_is_empty() {
        assert_eq!(clean_response("."), "");
        assert_eq!(clean_response("\" ... \""), "");
        assert_eq!(clean_response("`-`"), "");
    }

    #[test]
    fn suffix_on_empty_message_has_no_leading_space() {
        assert_eq!(with_documentation_suffix(".", true), DOCUMENTATION_SUFFIX);
        assert_eq!(with_documentation_suffix("", true), DOCUMENTATION_SUFFIX);
    }

    #[test]
    fn suffix_replaces_trailing_period() {
        assert_eq!(
            with_documentation_suffix("Add parser.", true),
            "Add parser and updated documentation"
        );
    }
}
