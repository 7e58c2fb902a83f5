use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StorageError};

/// Field names that belong to the document itself and must never appear
/// in user metadata.
pub const RESERVED_FIELDS: [&str; 5] = ["url", "title", "content", "type", "created_at"];

pub fn is_reserved_field(name: &str) -> bool {
    RESERVED_FIELDS.contains(&name)
}

/// An open-ended metadata value attached to a document.
///
/// Variant order matters for untagged deserialization: timestamps are
/// RFC 3339 strings and must be tried before the plain string fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Bool(bool),
    Num(f64),
    Time(DateTime<Utc>),
    Str(String),
    List(Vec<MetaValue>),
    Map(HashMap<String, MetaValue>),
}

impl MetaValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<DateTime<Utc>> {
        match self {
            MetaValue::Time(t) => Some(*t),
            _ => None,
        }
    }
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        MetaValue::Str(s.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(s: String) -> Self {
        MetaValue::Str(s)
    }
}

impl From<DateTime<Utc>> for MetaValue {
    fn from(t: DateTime<Utc>) -> Self {
        MetaValue::Time(t)
    }
}

impl From<Vec<String>> for MetaValue {
    fn from(items: Vec<String>) -> Self {
        MetaValue::List(items.into_iter().map(MetaValue::Str).collect())
    }
}

/// The atomic stored unit: one crawled (or otherwise ingested) page.
///
/// `url` is the primary key; storing a second document with the same URL
/// replaces the first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub url: String,
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: HashMap<String, MetaValue>,
}

impl Document {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: String::new(),
            content: String::new(),
            doc_type: "webpage".to_string(),
            created_at: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_type(mut self, doc_type: impl Into<String>) -> Self {
        self.doc_type = doc_type.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: MetaValue) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Checks the invariants every stored document must satisfy: a non-empty
    /// URL and no metadata keys shadowing document attributes.
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(StorageError::InvalidDocument(
                "document URL must not be empty".to_string(),
            ));
        }
        for key in self.metadata.keys() {
            if is_reserved_field(key) {
                return Err(StorageError::InvalidDocument(format!(
                    "metadata key '{key}' shadows a document attribute"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_empty_url() {
        let doc = Document::new("  ");
        assert!(doc.validate().is_err());
    }

    #[test]
    fn validate_rejects_reserved_metadata_keys() {
        let doc = Document::new("https://example.test/")
            .with_metadata("created_at", MetaValue::from("yesterday"));
        assert!(doc.validate().is_err());

        let doc = Document::new("https://example.test/")
            .with_metadata("crawled_at", MetaValue::from(Utc::now()));
        assert!(doc.validate().is_ok());
    }

    #[test]
    fn metadata_round_trips_through_json() {
        let mut meta = HashMap::new();
        meta.insert("links".to_string(), MetaValue::from(vec![
            "https://example.test/a".to_string(),
            "https://example.test/b".to_string(),
        ]));
        meta.insert("fetch_count".to_string(), MetaValue::Num(3.0));
        meta.insert("fresh".to_string(), MetaValue::Bool(true));

        let json = serde_json::to_string(&meta).unwrap();
        let back: HashMap<String, MetaValue> = serde_json::from_str(&json).unwrap();
        assert_eq!(meta, back);
    }

    #[test]
    fn timestamps_deserialize_as_time_not_string() {
        let now = Utc::now();
        let json = serde_json::to_string(&MetaValue::from(now)).unwrap();
        let back: MetaValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back.as_time(), Some(now));
    }
}
