//! Token estimation (§4.4 step 1, §9 open question: "the source's token
//! counting is an estimate... an implementer may substitute a vendor
//! tokenizer if available"). Left pluggable behind [`TokenEstimator`]; the
//! default is a tokens-per-character heuristic keyed by model family.

pub trait TokenEstimator: Send + Sync {
    fn estimate(&self, text: &str, model: &str) -> u32;

    /// Approximate context window for a model, resolved by prefix.
    fn context_window(&self, model: &str) -> u32;
}

#[derive(Debug, Default)]
pub struct CharHeuristicEstimator;

/// chars-per-token by model family; looked up by longest matching prefix.
const CHARS_PER_TOKEN: &[(&str, f32)] = &[("claude", 3.8), ("gpt", 4.0), ("gemini", 4.0)];
const DEFAULT_CHARS_PER_TOKEN: f32 = 4.0;

const CONTEXT_WINDOWS: &[(&str, u32)] = &[
    ("claude-3-5", 200_000),
    ("claude-3-opus", 200_000),
    ("claude", 100_000),
    ("gpt-4o", 128_000),
    ("gpt-4", 128_000),
    ("gpt-3.5", 16_000),
    ("o1", 200_000),
    ("o3", 200_000),
    ("gemini", 1_000_000),
];
const DEFAULT_CONTEXT_WINDOW: u32 = 32_000;

impl TokenEstimator for CharHeuristicEstimator {
    fn estimate(&self, text: &str, model: &str) -> u32 {
        let chars_per_token = CHARS_PER_TOKEN
            .iter()
            .find(|(prefix, _)| model.starts_with(prefix))
            .map_or(DEFAULT_CHARS_PER_TOKEN, |(_, ratio)| *ratio);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let estimate = (text.chars().count() as f32 / chars_per_token).ceil() as u32;
        estimate
    }

    fn context_window(&self, model: &str) -> u32 {
        CONTEXT_WINDOWS
            .iter()
            .find(|(prefix, _)| model.starts_with(prefix))
            .map_or(DEFAULT_CONTEXT_WINDOW, |(_, window)| *window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longer_text_yields_more_tokens() {
        let estimator = CharHeuristicEstimator;
        let short = estimator.estimate("hi", "claude-3-5-sonnet-latest");
        let long = estimator.estimate(&"word ".repeat(100), "claude-3-5-sonnet-latest");
        assert!(long > short);
    }

    #[test]
    fn unknown_model_falls_back_to_default_window() {
        let estimator = CharHeuristicEstimator;
        assert_eq!(estimator.context_window("mystery-model"), DEFAULT_CONTEXT_WINDOW);
    }

    #[test]
    fn known_prefix_resolves_context_window() {
        let estimator = CharHeuristicEstimator;
        assert_eq!(estimator.context_window("claude-3-5-sonnet-latest"), 200_000);
    }
}
