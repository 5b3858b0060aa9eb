//! Routing provenance: which tier produced an answer.

use serde::{Deserialize, Serialize};

/// Where an emitted answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Faq,
    Rag,
    Function,
    Generation,
    Fallback,
    Demo,
}

impl ResponseSource {
    pub const ALL: [ResponseSource; 6] = [
        ResponseSource::Faq,
        ResponseSource::Rag,
        ResponseSource::Function,
        ResponseSource::Generation,
        ResponseSource::Fallback,
        ResponseSource::Demo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseSource::Faq => "faq",
            ResponseSource::Rag => "rag",
            ResponseSource::Function => "function",
            ResponseSource::Generation => "generation",
            ResponseSource::Fallback => "fallback",
            ResponseSource::Demo => "demo",
        }
    }

    /// Whether the answer came from a degraded path.
    pub fn is_degraded(&self) -> bool {
        matches!(self, ResponseSource::Fallback | ResponseSource::Demo)
    }
}

impl std::fmt::Display for ResponseSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The audit record attached to every emitted answer and logged turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub source: ResponseSource,

    /// FAQ similarity score, set only for FAQ answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,

    /// Whether retrieved knowledge was injected into the system prompt
    #[serde(default)]
    pub rag_used: bool,

    /// The dispatched (or refused) function name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
}

impl RoutingDecision {
    pub fn new(source: ResponseSource) -> Self {
        Self {
            source,
            confidence: None,
            rag_used: false,
            function: None,
        }
    }

    pub fn faq(confidence: f32) -> Self {
        Self {
            confidence: Some(confidence),
            ..Self::new(ResponseSource::Faq)
        }
    }

    pub fn with_rag(mut self, rag_used: bool) -> Self {
        self.rag_used = rag_used;
        self
    }

    pub fn with_function(mut self, name: impl Into<String>) -> Self {
        self.function = Some(name.into());
        self
    }

    /// Metadata recorded alongside a logged assistant turn.
    pub fn to_metadata(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut meta = serde_json::Map::new();
        meta.insert("source".into(), self.source.as_str().into());
        if let Some(c) = self.confidence {
            meta.insert("faq_confidence".into(), serde_json::json!(c));
        }
        meta.insert("rag_used".into(), self.rag_used.into());
        if let Some(f) = &self.function {
            meta.insert("function".into(), f.clone().into());
        }
        meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ResponseSource::Generation).unwrap(),
            "\"generation\""
        );
        assert!(ResponseSource::Demo.is_degraded());
        assert!(!ResponseSource::Rag.is_degraded());
    }

    #[test]
    fn faq_decision_metadata() {
        let d = RoutingDecision::faq(0.92);
        let meta = d.to_metadata();
        assert_eq!(meta["source"], "faq");
        assert!(meta.contains_key("faq_confidence"));
        assert_eq!(meta["rag_used"], false);
        assert!(!meta.contains_key("function"));
    }

    #[test]
    fn function_decision_builder() {
        let d = RoutingDecision::new(ResponseSource::Function)
            .with_rag(true)
            .with_function("calculate_tuition");
        assert!(d.rag_used);
        assert_eq!(d.function.as_deref(), Some("calculate_tuition"));
        assert_eq!(d.confidence, None);
    }
}
