//! Merging retrieved knowledge into the system instruction.

use studentdesk_core::knowledge::RetrievalMatch;

use crate::messages::Locale;

/// Render retrieval matches as a context block: one `📚 title` entry per
/// match, in the order given.
pub fn build_context(matches: &[RetrievalMatch]) -> String {
    matches
        .iter()
        .map(|m| format!("📚 {}\n{}\n", m.source_text, m.answer_or_content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Builds system instructions from a base prompt and a context block.
///
/// Stateless; the same inputs always give the same output.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptAugmenter {
    locale: Locale,
}

impl PromptAugmenter {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    /// `base` unchanged when `context` is empty; otherwise `base` followed by
    /// a delimited reference section and usage guidance.
    pub fn augment(&self, base: &str, context: &str) -> String {
        if context.is_empty() {
            return base.to_string();
        }

        let p = self.locale.phrases();
        format!(
            "{base}\n\n{}\n{}\n\n{context}\n\n{}\n{}\n",
            p.reference_header,
            p.reference_intro,
            p.usage_header,
            p.usage_lines.join("\n"),
        )
    }
}
