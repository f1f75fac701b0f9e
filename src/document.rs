//! Generic parsed form of an input document
use super::error::StructuralError;
use serde_json::Value;
use std::path::Path;

/// An immutable, already-parsed JSON document. Nothing downstream of
/// parsing mutates it.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentTree {
    root: Value,
    source_len: usize,
}

impl DocumentTree {
    pub fn parse(json: &str) -> Result<Self, StructuralError> {
        let root = serde_json::from_str(json)?;
        Ok(Self {
            root,
            source_len: json.len(),
        })
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, StructuralError> {
        let root = serde_json::from_slice(bytes)?;
        Ok(Self {
            root,
            source_len: bytes.len(),
        })
    }

    /// Reads and parses a document from disk. This is the loading
    /// collaborator; the pipeline itself never touches the filesystem.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, StructuralError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| StructuralError::Unreadable {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_slice(&bytes)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Top-level field lookup. A field explicitly set to `null` counts as present.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.root.as_object().and_then(|map| map.get(name))
    }

    /// Top-level field names, sorted.
    pub fn field_names(&self) -> Vec<&str> {
        match self.root.as_object() {
            Some(map) => map.keys().map(String::as_str).collect(),
            None => vec![],
        }
    }

    /// Number of top-level fields (or elements, for an array root).
    pub fn size(&self) -> usize {
        match &self.root {
            Value::Object(map) => map.len(),
            Value::Array(items) => items.len(),
            _ => 0,
        }
    }

    pub fn is_object(&self) -> bool {
        self.root.is_object()
    }

    pub fn source_len(&self) -> usize {
        self.source_len
    }

    pub fn as_value(&self) -> &Value {
        &self.root
    }
}

impl From<Value> for DocumentTree {
    fn from(root: Value) -> Self {
        let source_len = root.to_string().len();
        Self { root, source_len }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_names_are_sorted() {
        let doc = DocumentTree::parse(r#"{"trade": {}, "state": {}, "meta": null}"#).unwrap();

        assert_eq!(doc.field_names(), vec!["meta", "state", "trade"]);
        assert_eq!(doc.size(), 3);
        assert!(doc.has_field("meta"));
        assert!(!doc.has_field("businessEvent"));
    }

    #[test]
    fn non_object_root_has_no_fields() {
        let doc = DocumentTree::from(json!([1, 2, 3]));

        assert!(doc.field_names().is_empty());
        assert!(!doc.has_field("trade"));
        assert_eq!(doc.size(), 3);
        assert!(!doc.is_object());
    }

    #[test]
    fn malformed_json_is_structural_error() {
        let err = DocumentTree::parse(r#"{"trade": "#).unwrap_err();
        assert!(matches!(err, StructuralError::Malformed(_)));
    }
}
