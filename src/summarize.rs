//! Code and diff summarization with fixed sentinels.
//!
//! [`GeminiSummarizer`] is infallible by contract: every failure mode has
//! its own fixed string, so batch pipelines never see an error from this
//! module and callers can tell the modes apart after the fact.
//!
//! | condition                      | summary                        |
//! |--------------------------------|--------------------------------|
//! | empty/whitespace file          | [`EMPTY_FILE_SUMMARY`]         |
//! | empty/whitespace diff          | [`EMPTY_DIFF_SUMMARY`]         |
//! | model failure on a file        | [`CODE_FAILURE_SUMMARY`]       |
//! | model failure on a diff        | [`DIFF_FAILURE_SUMMARY`]       |
//! | diff could not be fetched      | [`DIFF_UNAVAILABLE_SUMMARY`]   |
//!
//! Inputs are truncated before the model sees them: code to
//! [`CODE_TRUNCATE_CHARS`], diffs to [`DIFF_TRUNCATE_CHARS`] plus
//! [`TRUNCATION_MARKER`]. Empty input short-circuits without a model call.

use async_trait::async_trait;

use crate::gemini::GeminiClient;
use crate::traits::Summarizer;

/// Upper bound on code characters sent to the model.
pub const CODE_TRUNCATE_CHARS: usize = 10_000;

/// Upper bound on diff characters sent to the model.
pub const DIFF_TRUNCATE_CHARS: usize = 50_000;

/// Appended to a diff that was cut at [`DIFF_TRUNCATE_CHARS`].
pub const TRUNCATION_MARKER: &str = "\n[diff truncated]";

/// Returned for an empty or whitespace-only source file, without a model call.
pub const EMPTY_FILE_SUMMARY: &str = "Empty file.";

/// Returned for an empty or whitespace-only diff, without a model call.
pub const EMPTY_DIFF_SUMMARY: &str = "No significant changes.";

/// Returned when the model call for a code summary fails.
pub const CODE_FAILURE_SUMMARY: &str = "Summary unavailable.";

/// Returned when the model call for a diff summary fails.
pub const DIFF_FAILURE_SUMMARY: &str = "Commit summary unavailable.";

/// Used by the commit tracker when the diff itself could not be fetched.
pub const DIFF_UNAVAILABLE_SUMMARY: &str = "Diff unavailable.";

/// Cut `text` after `max_chars` characters, never splitting a code point.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Clip a diff to the model-facing bound, marking the cut.
fn bounded_diff(diff: &str) -> String {
    let clipped = truncate_chars(diff, DIFF_TRUNCATE_CHARS);
    if clipped.len() < diff.len() {
        format!("{}{}", clipped, TRUNCATION_MARKER)
    } else {
        clipped.to_string()
    }
}

fn code_prompt(file_name: &str, code: &str) -> Vec<String> {
    vec![
        format!(
            "You are a senior engineer explaining the purpose of the `{}` file \
             to a new team member.",
            file_name
        ),
        format!(
            "Here is the code:\n---\n{}\n---\n\
             Describe what this file does in no more than 100 words.",
            code
        ),
    ]
}

const UNIFIED_DIFF_PRIMER: &str = "\
You are an expert programmer summarizing a git diff.

How to read the unified diff format:
- Lines like `diff --git a/path b/path` (and the index/---/+++ lines that \
follow) are metadata naming the file that was changed.
- A line starting with `+` was added.
- A line starting with `-` was removed.
- A line starting with neither is unchanged context shown for orientation; \
it is not part of the change and must not be summarized.

Write one short bullet per meaningful change, naming the affected files in \
brackets when no more than two are involved. Cover only the changed lines.";

fn diff_prompt(diff: &str) -> Vec<String> {
    vec![
        UNIFIED_DIFF_PRIMER.to_string(),
        format!("Summarize the following diff:\n\n{}", diff),
    ]
}

/// [`Summarizer`] backed by a [`GeminiClient`].
pub struct GeminiSummarizer {
    client: GeminiClient,
}

impl GeminiSummarizer {
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Summarizer for GeminiSummarizer {
    async fn summarize_code(&self, file_name: &str, content: &str) -> String {
        if content.trim().is_empty() {
            return EMPTY_FILE_SUMMARY.to_string();
        }

        let code = truncate_chars(content, CODE_TRUNCATE_CHARS);
        match self.client.generate_text(&code_prompt(file_name, code)).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                tracing::warn!(file = %file_name, error = %e, "code summary failed, using fallback");
                CODE_FAILURE_SUMMARY.to_string()
            }
        }
    }

    async fn summarize_diff(&self, diff: &str) -> String {
        if diff.trim().is_empty() {
            return EMPTY_DIFF_SUMMARY.to_string();
        }

        let bounded = bounded_diff(diff);
        match self.client.generate_text(&diff_prompt(&bounded)).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "diff summary failed, using fallback");
                DIFF_FAILURE_SUMMARY.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeminiConfig;

    /// Client pointed at a closed port: any model call fails immediately,
    /// so the failure sentinels distinguish "called and failed" from
    /// "never called".
    fn unreachable_summarizer() -> GeminiSummarizer {
        let config = GeminiConfig {
            api_key: Some("test-key".to_string()),
            api_base: "http://127.0.0.1:1".to_string(),
            max_retries: 0,
            timeout_secs: 1,
            ..Default::default()
        };
        GeminiSummarizer::new(GeminiClient::new(config).unwrap())
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "héllo wörld";
        let cut = truncate_chars(text, 4);
        assert_eq!(cut, "héll");
        assert_eq!(truncate_chars("short", 100), "short");
    }

    #[test]
    fn test_bounded_diff_appends_marker() {
        let diff = "x".repeat(80_000);
        let bounded = bounded_diff(&diff);
        assert_eq!(
            bounded.chars().count(),
            DIFF_TRUNCATE_CHARS + TRUNCATION_MARKER.chars().count()
        );
        assert!(bounded.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn test_bounded_diff_unchanged_below_limit() {
        let diff = "+ added line\n- removed line\n";
        assert_eq!(bounded_diff(diff), diff);
    }

    #[test]
    fn test_diff_prompt_explains_the_format() {
        let parts = diff_prompt("+ fn main() {}");
        assert!(parts[0].contains("starting with `+`"));
        assert!(parts[0].contains("starting with `-`"));
        assert!(parts[0].contains("metadata"));
        assert!(parts[1].contains("+ fn main() {}"));
    }

    #[tokio::test]
    async fn test_empty_diff_short_circuits_without_model_call() {
        let summarizer = unreachable_summarizer();
        // A model call would fail and produce DIFF_FAILURE_SUMMARY instead
        assert_eq!(summarizer.summarize_diff("   \n").await, EMPTY_DIFF_SUMMARY);
    }

    #[tokio::test]
    async fn test_empty_file_short_circuits_without_model_call() {
        let summarizer = unreachable_summarizer();
        assert_eq!(
            summarizer.summarize_code("empty.rs", "").await,
            EMPTY_FILE_SUMMARY
        );
    }

    #[tokio::test]
    async fn test_model_failure_yields_diff_fallback() {
        let summarizer = unreachable_summarizer();
        assert_eq!(
            summarizer.summarize_diff("+ real change").await,
            DIFF_FAILURE_SUMMARY
        );
    }

    #[tokio::test]
    async fn test_model_failure_yields_code_fallback() {
        let summarizer = unreachable_summarizer();
        assert_eq!(
            summarizer.summarize_code("lib.rs", "fn main() {}").await,
            CODE_FAILURE_SUMMARY
        );
    }
}
