//! Output types: the normalized result of a successful conversion.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The result of converting a document to text.
///
/// Produced only on success. `text_content` is always normalized (no
/// trailing whitespace per line, no run of three or more blank lines;
/// see [`crate::pipeline::normalize`]). A metadata-only result with empty
/// `text_content` still counts as success; callers that need body text
/// must check for themselves.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionResult {
    /// Document title, when the source format carries one.
    pub title: Option<String>,

    /// The normalized textual representation of the source.
    pub text_content: String,

    /// Free-form key/value metadata (author, description, published time,
    /// media tags, …). Insertion order is irrelevant; a `BTreeMap` keeps
    /// serialized output stable.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl ConversionResult {
    /// Result with body text only.
    pub fn with_text(text_content: impl Into<String>) -> Self {
        Self {
            title: None,
            text_content: text_content.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Result with a title and body text.
    pub fn titled(title: impl Into<String>, text_content: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            text_content: text_content.into(),
            metadata: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_without_empty_metadata() {
        let r = ConversionResult::titled("T", "body");
        let json = serde_json::to_string(&r).unwrap();
        assert!(!json.contains("metadata"));
    }

    #[test]
    fn round_trips_metadata() {
        let mut r = ConversionResult::with_text("x");
        r.metadata.insert("author".into(), "Ada".into());
        let json = serde_json::to_string(&r).unwrap();
        let back: ConversionResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.metadata.get("author").map(String::as_str), Some("Ada"));
    }
}
