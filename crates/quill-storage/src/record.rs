//! Persisted record shapes.
//!
//! The JSON form of each record is the bare struct, without a kind tag, so that
//! values written by earlier versions stay readable. Inside the crate every
//! record travels as the explicit [`Record`] enum; shape matching only happens
//! when an untyped payload enters through [`Record::from_value`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Content of document 1 in a freshly created structured store.
pub const WELCOME_DOCUMENT: &str = "# Hello, Markdown!\n\nStart typing to see live preview!";

/// Id of the document seeded on first initialization.
pub const WELCOME_DOCUMENT_ID: i64 = 1;

/// A markdown document, one per numeric id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    #[serde(default)]
    pub content: String,
}

/// A user preference; last write for a key wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    pub value: String,
}

/// Locally edited copy of a built-in sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedSample {
    pub key: String,
    pub content: String,
}

impl Document {
    pub fn new(id: i64, content: impl Into<String>) -> Self {
        Self {
            id,
            content: content.into(),
        }
    }
}

impl Setting {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl CachedSample {
    pub fn new(key: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Setting,
    Document,
    Sample,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RecordKind::Setting => "setting",
            RecordKind::Document => "document",
            RecordKind::Sample => "sample",
        })
    }
}

/// Any persisted record.
///
/// Variant order is the shape-matching order used for untyped payloads:
/// settings, then documents, then samples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Record {
    Setting(Setting),
    Document(Document),
    Sample(CachedSample),
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Setting(_) => RecordKind::Setting,
            Record::Document(_) => RecordKind::Document,
            Record::Sample(_) => RecordKind::Sample,
        }
    }

    /// Key under which the record lives in a flat namespace: the `key` field
    /// when the record has one, otherwise the stringified id.
    pub fn storage_key(&self) -> String {
        match self {
            Record::Setting(setting) => setting.key.clone(),
            Record::Sample(sample) => sample.key.clone(),
            Record::Document(document) => document.id.to_string(),
        }
    }

    /// Route an untyped payload to a record kind by its fields.
    pub fn from_value(value: serde_json::Value) -> Result<Self, StorageError> {
        if !value.is_object() {
            return Err(StorageError::InvalidRecord {
                message: format!("expected an object, got {}", value),
            });
        }
        serde_json::from_value(value).map_err(|e| StorageError::InvalidRecord {
            message: e.to_string(),
        })
    }

    pub fn to_json(&self) -> Result<String, StorageError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl From<Setting> for Record {
    fn from(setting: Setting) -> Self {
        Record::Setting(setting)
    }
}

impl From<Document> for Record {
    fn from(document: Document) -> Self {
        Record::Document(document)
    }
}

impl From<CachedSample> for Record {
    fn from(sample: CachedSample) -> Self {
        Record::Sample(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn setting_shape_wins_over_everything() {
        let record =
            Record::from_value(json!({ "key": "theme", "value": "dark", "id": 3, "content": "x" }))
                .unwrap();
        assert_eq!(record, Record::Setting(Setting::new("theme", "dark")));
    }

    #[test]
    fn document_shape_wins_over_sample() {
        let record =
            Record::from_value(json!({ "id": 1, "key": "hello", "content": "# Hi" })).unwrap();
        assert_eq!(record, Record::Document(Document::new(1, "# Hi")));
    }

    #[test]
    fn key_and_content_is_a_sample() {
        let record = Record::from_value(json!({ "key": "intro", "content": "# Intro" })).unwrap();
        assert_eq!(record.kind(), RecordKind::Sample);
        assert_eq!(record.storage_key(), "intro");
    }

    #[test]
    fn document_without_content_reads_as_empty() {
        let record = Record::from_value(json!({ "id": 7 })).unwrap();
        assert_eq!(record, Record::Document(Document::new(7, "")));
        assert_eq!(record.storage_key(), "7");
    }

    #[test]
    fn unknown_shapes_are_invalid() {
        for value in [json!({ "key": "orphan" }), json!({ "id": "one" }), json!("theme"), json!(null)] {
            let err = Record::from_value(value).unwrap_err();
            assert!(matches!(err, StorageError::InvalidRecord { .. }));
        }
    }

    #[test]
    fn serialized_form_has_no_kind_tag() {
        let json = Record::from(Setting::new("theme", "light")).to_json().unwrap();
        assert_eq!(json, r#"{"key":"theme","value":"light"}"#);
    }
}
