//! On-disk codec for namespace documents.
//!
//! A document is a flat `key -> JSON value` map. On disk it is wrapped in a
//! one-element array, `[{"theme":"dark"}]`, and written either compact or
//! indented.

use serde::ser::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use serde_json::{Map, Value};
use sha1::{Digest, Sha1};

/// Default indent width for pretty-printed documents.
pub const DEFAULT_INDENT: usize = 4;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    entries: Map<String, Value>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes the wrapped form. Only the first array element is used;
    /// anything that is not an array starting with an object is rejected.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let wrapped: Vec<Value> = serde_json::from_slice(bytes)?;
        match wrapped.into_iter().next() {
            Some(Value::Object(entries)) => Ok(Self { entries }),
            Some(other) => Err(shape_error(&format!(
                "expected an object as first element, found {}",
                kind_of(&other)
            ))),
            None => Err(shape_error("expected a one-element array, found []")),
        }
    }

    /// Encodes the wrapped form. `indent` of `None` writes compact JSON.
    pub fn to_vec(&self, indent: Option<usize>) -> Result<Vec<u8>, serde_json::Error> {
        let wrapped = [&self.entries];
        match indent {
            None => serde_json::to_vec(&wrapped),
            Some(width) => {
                let spaces = vec![b' '; width];
                let mut out = Vec::new();
                let mut ser =
                    Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(&spaces));
                wrapped.serialize(&mut ser)?;
                Ok(out)
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Returns the previous value for the key, if any.
    pub fn insert(&mut self, key: String, value: Value) -> Option<Value> {
        self.entries.insert(key, value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Hex SHA-1 of raw document bytes.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn shape_error(msg: &str) -> serde_json::Error {
    <serde_json::Error as serde::de::Error>::custom(msg)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_document_encoding() {
        let doc = Document::new();
        assert_eq!(doc.to_vec(None).unwrap(), b"[{}]");
    }

    #[test]
    fn test_compact_encoding() {
        let mut doc = Document::new();
        doc.insert("theme".into(), json!("dark"));
        assert_eq!(
            String::from_utf8(doc.to_vec(None).unwrap()).unwrap(),
            r#"[{"theme":"dark"}]"#
        );
    }

    #[test]
    fn test_pretty_encoding() {
        let mut doc = Document::new();
        doc.insert("score".into(), json!(42));
        assert_eq!(
            String::from_utf8(doc.to_vec(Some(4)).unwrap()).unwrap(),
            "[\n    {\n        \"score\": 42\n    }\n]"
        );
    }

    #[test]
    fn test_decodes_pretty_and_compact() {
        let compact = Document::from_slice(br#"[{"a":1,"b":[true,null]}]"#).unwrap();
        let pretty = Document::from_slice(b"[\n  {\n    \"a\": 1,\n    \"b\": [true, null]\n  }\n]").unwrap();
        assert_eq!(compact, pretty);
        assert_eq!(compact.get("b"), Some(&json!([true, null])));
    }

    #[test]
    fn test_extra_elements_are_ignored() {
        let doc = Document::from_slice(br#"[{"a":1},{"b":2}]"#).unwrap();
        assert_eq!(doc.len(), 1);
        assert!(doc.contains_key("a"));
        assert!(!doc.contains_key("b"));
    }

    #[test]
    fn test_rejects_bad_shapes() {
        let cases: [&[u8]; 7] = [
            b"",
            b"not json",
            b"[{\"a\":1}",
            b"{\"a\":1}",
            b"[]",
            b"[1]",
            b"[[{}]]",
        ];
        for bad in cases {
            assert!(
                Document::from_slice(bad).is_err(),
                "{:?} should not decode",
                String::from_utf8_lossy(bad)
            );
        }
    }

    #[test]
    fn test_content_hash() {
        assert_eq!(
            content_hash(b"[{}]"),
            content_hash(Document::new().to_vec(None).unwrap().as_slice())
        );
        assert_eq!(content_hash(b"").len(), 40);
        assert_eq!(content_hash(b""), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
    }
}
