//! Text generation trait and prompt handling.
//!
//! Backends only need to turn a prompt into raw text. Prompt layout and
//! answer extraction are shared here so every backend strips echoed
//! prompts the same way.

use async_trait::async_trait;

use crate::error::RagError;

/// Marker that precedes the answer in the prompt.
pub const ANSWER_DELIMITER: &str = "Answer:";

/// Trait for text generation models.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Returns the model identifier (e.g. `"llama3.2"`).
    fn model_name(&self) -> &str;

    /// Run the model on a fully built prompt and return its raw output.
    async fn complete(&self, prompt: &str) -> Result<String, RagError>;

    /// Answer `query` from `context`.
    ///
    /// Builds the prompt with [`build_prompt`] and cleans the raw output
    /// with [`extract_answer`].
    async fn generate(&self, context: &str, query: &str) -> Result<String, RagError> {
        let prompt = build_prompt(context, query);
        let raw = self.complete(&prompt).await?;
        extract_answer(&raw)
    }
}

/// Lay out context and question for the model.
///
/// ```rust
/// use docchat_core::generation::build_prompt;
///
/// assert_eq!(
///     build_prompt("Rust is fast.", "Is Rust fast?"),
///     "Context: Rust is fast.\n\nQuestion: Is Rust fast?\n\nAnswer:"
/// );
/// ```
pub fn build_prompt(context: &str, query: &str) -> String {
    format!(
        "Context: {}\n\nQuestion: {}\n\n{}",
        context, query, ANSWER_DELIMITER
    )
}

/// Strip any echoed prompt from raw model output.
///
/// Keeps only the text after the last [`ANSWER_DELIMITER`], or the whole
/// output when the delimiter is absent, then trims it.
///
/// # Errors
///
/// [`RagError::GenerationFailure`] when nothing but whitespace remains.
pub fn extract_answer(raw: &str) -> Result<String, RagError> {
    let answer = match raw.rfind(ANSWER_DELIMITER) {
        Some(pos) => &raw[pos + ANSWER_DELIMITER.len()..],
        None => raw,
    };
    let answer = answer.trim();
    if answer.is_empty() {
        return Err(RagError::generation("model returned a blank answer"));
    }
    Ok(answer.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo(&'static str);

    #[async_trait]
    impl Generator for Echo {
        fn model_name(&self) -> &str {
            "echo"
        }

        async fn complete(&self, prompt: &str) -> Result<String, RagError> {
            Ok(format!("{} {}", prompt, self.0))
        }
    }

    #[test]
    fn test_extract_after_last_delimiter() {
        let raw = "Context: x\n\nQuestion: y\n\nAnswer: first Answer:  the real one \n";
        assert_eq!(extract_answer(raw).unwrap(), "the real one");
    }

    #[test]
    fn test_extract_without_delimiter() {
        assert_eq!(extract_answer("  plain output ").unwrap(), "plain output");
    }

    #[test]
    fn test_extract_blank_is_failure() {
        assert!(matches!(
            extract_answer("   \n"),
            Err(RagError::GenerationFailure(_))
        ));
        assert!(matches!(
            extract_answer("Context: c\n\nAnswer:   "),
            Err(RagError::GenerationFailure(_))
        ));
    }

    #[tokio::test]
    async fn test_generate_strips_echoed_prompt() {
        let out = Echo("Forty-two.").generate("ctx", "q?").await.unwrap();
        assert_eq!(out, "Forty-two.");
    }

    #[tokio::test]
    async fn test_generate_blank_echo_fails() {
        let out = Echo("").generate("ctx", "q?").await;
        assert!(out.is_err());
    }
}
