//! Raw documents as exchanged with the document store.
//!
//! A document is a flat JSON object addressed by a slash-separated path of
//! alternating collection and document ids (`chats/a1_b2/messages/x9`).
//! The typed accessors never substitute defaults: a missing or mistyped
//! field is reported as a [`DecodeError`] and the caller decides whether a
//! default applies.

use serde::de::DeserializeOwned;
use serde_json::Value;
use wave_shared::DecodeError;

use crate::error::{Result, StoreError};

/// Field map of a single document.
pub type Fields = serde_json::Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub path: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(path: impl Into<String>, fields: Fields) -> Self {
        Self {
            path: path.into(),
            fields,
        }
    }

    /// Last path segment.
    pub fn id(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    pub fn str_field(&self, field: &'static str) -> std::result::Result<&str, DecodeError> {
        self.opt_str_field(field)?
            .ok_or_else(|| self.missing(field))
    }

    /// `None` when the field is absent or `null`.
    pub fn opt_str_field(
        &self,
        field: &'static str,
    ) -> std::result::Result<Option<&str>, DecodeError> {
        match self.fields.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(self.wrong_type(field, "string")),
        }
    }

    pub fn i64_field(&self, field: &'static str) -> std::result::Result<i64, DecodeError> {
        self.opt_i64_field(field)?
            .ok_or_else(|| self.missing(field))
    }

    pub fn opt_i64_field(
        &self,
        field: &'static str,
    ) -> std::result::Result<Option<i64>, DecodeError> {
        match self.fields.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_i64()
                .map(Some)
                .ok_or_else(|| self.wrong_type(field, "integer")),
            Some(_) => Err(self.wrong_type(field, "integer")),
        }
    }

    pub fn opt_bool_field(
        &self,
        field: &'static str,
    ) -> std::result::Result<Option<bool>, DecodeError> {
        match self.fields.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(_) => Err(self.wrong_type(field, "boolean")),
        }
    }

    /// String field holding a serde-encoded enum such as `ChatStatus`.
    pub fn opt_enum_field<T: DeserializeOwned>(
        &self,
        field: &'static str,
    ) -> std::result::Result<Option<T>, DecodeError> {
        let Some(raw) = self.opt_str_field(field)? else {
            return Ok(None);
        };
        serde_json::from_value(Value::String(raw.to_string()))
            .map(Some)
            .map_err(|_| self.invalid(field, raw))
    }

    pub fn str_array_field(
        &self,
        field: &'static str,
    ) -> std::result::Result<Vec<&str>, DecodeError> {
        match self.fields.get(field) {
            None | Some(Value::Null) => Err(self.missing(field)),
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| v.as_str().ok_or_else(|| self.wrong_type(field, "array of strings")))
                .collect(),
            Some(_) => Err(self.wrong_type(field, "array of strings")),
        }
    }

    pub fn invalid(&self, field: &'static str, value: impl Into<String>) -> DecodeError {
        DecodeError::InvalidValue {
            path: self.path.clone(),
            field,
            value: value.into(),
        }
    }

    fn missing(&self, field: &'static str) -> DecodeError {
        DecodeError::MissingField {
            path: self.path.clone(),
            field,
        }
    }

    fn wrong_type(&self, field: &'static str, expected: &'static str) -> DecodeError {
        DecodeError::WrongType {
            path: self.path.clone(),
            field,
            expected,
        }
    }
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// Join a collection path and a document id.
pub fn doc_path(collection: &str, id: &str) -> String {
    format!("{collection}/{id}")
}

/// Split a document path into its parent collection path and its id.
pub fn split_doc_path(path: &str) -> Result<(&str, &str)> {
    let segments = check_segments(path)?;
    if segments % 2 != 0 {
        return Err(StoreError::InvalidPath(format!("{path} is not a document path")));
    }
    path.rsplit_once('/')
        .ok_or_else(|| StoreError::InvalidPath(path.to_string()))
}

/// Validate a collection path (odd number of segments).
pub fn check_collection_path(path: &str) -> Result<()> {
    let segments = check_segments(path)?;
    if segments % 2 == 0 {
        return Err(StoreError::InvalidPath(format!("{path} is not a collection path")));
    }
    Ok(())
}

fn check_segments(path: &str) -> Result<usize> {
    let mut count = 0;
    for segment in path.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
        count += 1;
    }
    Ok(count)
}
