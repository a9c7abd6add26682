//! Adaptive working-memory-depth classifier (§4.4 step 6, Testable Property 5),
//! grounded on `original_source/agent/core/orchestrator/context_builder.py`'s
//! `_CONTEXTUAL_PATTERNS` / `_needs_full_context` / `_SHORT_MESSAGE_THRESHOLD`.
//!
//! The source's heuristic is regex-based and English-only (§9 open question);
//! left pluggable behind [`ContextDepthClassifier`] so a non-English deployment
//! can swap it out without touching the Context Builder.

use regex::Regex;
use std::sync::OnceLock;

const SHORT_MESSAGE_THRESHOLD: usize = 4;

pub trait ContextDepthClassifier: Send + Sync {
    /// Whether `text` warrants the full working-memory window rather than
    /// the minimal one.
    fn needs_full_context(&self, text: &str) -> bool;
}

/// The default English-language heuristic: pronouns, continuation markers,
/// back-references, short affirmations, explicit conversation references,
/// cancel/undo words, approval words, or a short word count.
#[derive(Debug, Default)]
pub struct EnglishHeuristicClassifier;

fn contextual_patterns() -> &'static Regex {
    static PATTERNS: OnceLock<Regex> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        Regex::new(
            r"(?ix)
            \b(it|this|that|these|those|they|them)\b
            | \b(also|instead|additionally|furthermore|moreover|too)\b
            | \b(as\ before|like\ (?:before|that|last\ time)|same\ as|earlier|previously)\b
            | \b(yes|yeah|yep|no|nope|sure|ok|okay)\b
            | \b(this\ conversation|that\ conversation|this\ thread|our\ (?:chat|discussion))\b
            | \b(cancel|undo|stop|revert|never\ mind|nevermind)\b
            | \b(approve|approved|confirm|confirmed|go\ ahead|do\ it|continue)\b
            ",
        )
        .expect("contextual pattern regex is a fixed literal")
    })
}

impl ContextDepthClassifier for EnglishHeuristicClassifier {
    fn needs_full_context(&self, text: &str) -> bool {
        let word_count = text.split_whitespace().count();
        if word_count < SHORT_MESSAGE_THRESHOLD {
            return true;
        }
        contextual_patterns().is_match(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_messages_need_full_context() {
        let classifier = EnglishHeuristicClassifier;
        assert!(classifier.needs_full_context("yes please"));
    }

    #[test]
    fn pronoun_reference_needs_full_context() {
        let classifier = EnglishHeuristicClassifier;
        assert!(classifier.needs_full_context("can you fix that for me as well"));
    }

    #[test]
    fn self_contained_message_does_not_need_full_context() {
        let classifier = EnglishHeuristicClassifier;
        assert!(!classifier.needs_full_context("what is the current weather forecast for tomorrow in Boston"));
    }

    #[test]
    fn continuation_marker_needs_full_context() {
        let classifier = EnglishHeuristicClassifier;
        assert!(classifier.needs_full_context("also check the deployment logs for errors please"));
    }
}
