//! Bidirectional tool-name sanitization (§4.1, §9 "provider-specific tool naming").
//!
//! Vendors impose charset/length constraints on tool names the core doesn't
//! share (our names are `module.method`, e.g. `research.search`). Each
//! adapter sanitizes outbound and un-sanitizes the name on the way back so
//! the rest of the system never sees a mangled name.

use std::collections::HashMap;

const MAX_VENDOR_NAME_LEN: usize = 64;

#[derive(Debug, Default)]
pub struct ToolNameSanitizer {
    sanitized_to_original: HashMap<String, String>,
}

impl ToolNameSanitizer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Deterministically replaces vendor-disallowed characters (anything
    /// that isn't alphanumeric, `_`, or `-`) with `_`, then truncates to the
    /// vendor's length cap, and remembers the mapping back to `original`.
    pub fn sanitize(&mut self, original: &str) -> String {
        let mut sanitized: String = original
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            })
            .collect();
        sanitized.truncate(MAX_VENDOR_NAME_LEN);

        self.sanitized_to_original
            .insert(sanitized.clone(), original.to_string());
        sanitized
    }

    /// Looks up the original name for a vendor-reported tool call; falls
    /// back to the sanitized name itself if it was never registered (e.g.
    /// the model hallucinated a tool name).
    #[must_use]
    pub fn original_name(&self, sanitized: &str) -> String {
        self.sanitized_to_original
            .get(sanitized)
            .cloned()
            .unwrap_or_else(|| sanitized.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dots_and_colons_are_replaced() {
        let mut sanitizer = ToolNameSanitizer::new();
        let sanitized = sanitizer.sanitize("research.search:v2");
        assert_eq!(sanitized, "research_search_v2");
    }

    #[test]
    fn roundtrip_recovers_original_name() {
        let mut sanitizer = ToolNameSanitizer::new();
        let sanitized = sanitizer.sanitize("file_manager.read_document");
        assert_eq!(sanitizer.original_name(&sanitized), "file_manager.read_document");
    }

    #[test]
    fn unknown_sanitized_name_falls_back_to_itself() {
        let sanitizer = ToolNameSanitizer::new();
        assert_eq!(sanitizer.original_name("made_up"), "made_up");
    }

    #[test]
    fn truncates_to_vendor_length_cap() {
        let mut sanitizer = ToolNameSanitizer::new();
        let long_name = "a".repeat(100);
        let sanitized = sanitizer.sanitize(&long_name);
        assert_eq!(sanitized.len(), MAX_VENDOR_NAME_LEN);
    }
}
