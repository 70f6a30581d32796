//! Persisted workflow document format
//!
//! One UTF-8 JSON object per file:
//!
//! ```json
//! {
//!   "version": "1.0",
//!   "name": "demo",
//!   "created_at": "2025-11-16T10:30:00+00:00",
//!   "updated_at": "2025-11-16T11:45:00+00:00",
//!   "nodes": [{ "id": "start_1a2b3c4d", "type": "start", "pos": [100, 100], "data": {} }],
//!   "links": [{ "id": "1042", "from_attr": "start_1a2b3c4d_output", "to_attr": "launcher_9f8e7d6c_input" }]
//! }
//! ```

use chrono::{Local, SecondsFormat};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::constants::document::FORMAT_VERSION;
use crate::error::{GraphError, Result};
use crate::types::{LinkId, NodeId, Position};

/// Top-level keys every document must carry
const REQUIRED_KEYS: [&str; 3] = ["version", "nodes", "links"];

/// A complete persisted workflow
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowDocument {
    pub version: String,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
    pub nodes: Vec<DocumentNode>,
    pub links: Vec<DocumentLink>,
    /// Node entries that could not be decoded; never written back
    #[serde(skip)]
    pub rejected_nodes: Vec<RejectedEntry>,
    /// Link entries that could not be decoded; never written back
    #[serde(skip)]
    pub rejected_links: Vec<RejectedEntry>,
}

/// A node entry of a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentNode {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pos: Position,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Map<String, Value>,
}

/// A link entry of a document
///
/// Endpoints are optional on read so that a link with a missing side can
/// be skipped instead of failing the whole document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentLink {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: LinkId,
    #[serde(default)]
    pub from_attr: Option<String>,
    #[serde(default)]
    pub to_attr: Option<String>,
}

/// A node or link entry with the wrong shape
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedEntry {
    /// Position in the document's array
    pub index: usize,
    /// The entry's `id`, or `#<index>` if it has none
    pub id: String,
    /// The node entry's `type`, if readable
    pub node_type: String,
    pub reason: String,
}

impl WorkflowDocument {
    /// Create an empty document stamped with the current time
    pub fn new(name: impl Into<String>) -> Self {
        let now = now_timestamp();
        Self {
            version: FORMAT_VERSION.to_string(),
            name: name.into(),
            created_at: now.clone(),
            updated_at: now,
            nodes: Vec::new(),
            links: Vec::new(),
            rejected_nodes: Vec::new(),
            rejected_links: Vec::new(),
        }
    }

    /// Validate and decode an untyped JSON value
    ///
    /// Fails with `MalformedDocument` only if the value is not an object,
    /// lacks `version`, `nodes` or `links`, or those have the wrong type.
    /// Node and link entries are decoded one by one; entries of the wrong
    /// shape are collected in `rejected_nodes` / `rejected_links` so the
    /// rest of the document still loads.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut object) = value else {
            return Err(GraphError::malformed("document is not a JSON object"));
        };
        for key in REQUIRED_KEYS {
            if !object.contains_key(key) {
                return Err(GraphError::malformed(format!("missing '{}'", key)));
            }
        }

        let version = match object.get("version") {
            Some(Value::String(v)) => v.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(GraphError::malformed("'version' is not a string")),
        };
        let Some(Value::Array(raw_nodes)) = object.remove("nodes") else {
            return Err(GraphError::malformed("'nodes' is not an array"));
        };
        let Some(Value::Array(raw_links)) = object.remove("links") else {
            return Err(GraphError::malformed("'links' is not an array"));
        };

        let text = |key: &str| {
            object
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let mut document = Self {
            version,
            name: text("name"),
            created_at: text("created_at"),
            updated_at: text("updated_at"),
            nodes: Vec::with_capacity(raw_nodes.len()),
            links: Vec::with_capacity(raw_links.len()),
            rejected_nodes: Vec::new(),
            rejected_links: Vec::new(),
        };

        for (index, raw) in raw_nodes.into_iter().enumerate() {
            match serde_json::from_value::<DocumentNode>(raw.clone()) {
                Ok(node) => document.nodes.push(node),
                Err(e) => document.rejected_nodes.push(RejectedEntry::new(index, &raw, e)),
            }
        }
        for (index, raw) in raw_links.into_iter().enumerate() {
            match serde_json::from_value::<DocumentLink>(raw.clone()) {
                Ok(link) => document.links.push(link),
                Err(e) => document.rejected_links.push(RejectedEntry::new(index, &raw, e)),
            }
        }
        Ok(document)
    }

    /// Validate and decode document JSON text
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| GraphError::malformed(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl RejectedEntry {
    fn new(index: usize, raw: &Value, error: serde_json::Error) -> Self {
        let field = |key: &str| match raw.get(key) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        Self {
            index,
            id: field("id").unwrap_or_else(|| format!("#{}", index)),
            node_type: field("type").unwrap_or_default(),
            reason: error.to_string(),
        }
    }
}

/// Listing entry for a stored document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    /// Name declared inside the document
    pub name: String,
    /// File stem the document is stored under
    pub file: String,
    pub created_at: String,
    pub updated_at: String,
    pub node_count: usize,
    pub link_count: usize,
}

/// Current local time as an ISO-8601 / RFC 3339 string
pub fn now_timestamp() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Millis, false)
}

/// Read `null` as the type's default
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept link ids written as JSON strings or numbers
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_top_level_keys_are_malformed() {
        for key in REQUIRED_KEYS {
            let mut value = json!({ "version": "1.0", "name": "x", "nodes": [], "links": [] });
            value.as_object_mut().unwrap().remove(key);

            let err = WorkflowDocument::from_value(value).unwrap_err();
            assert!(
                matches!(&err, GraphError::MalformedDocument(msg) if msg.contains(key)),
                "unexpected error for {}: {}",
                key,
                err
            );
        }

        assert!(WorkflowDocument::from_value(json!([1, 2])).is_err());
        assert!(WorkflowDocument::from_json_str("{ not json").is_err());
    }

    #[test]
    fn test_wire_format() {
        let doc = WorkflowDocument::from_value(json!({
            "version": "1.0",
            "name": "demo",
            "created_at": "2025-11-16T10:30:00",
            "updated_at": "2025-11-16T11:45:00",
            "nodes": [
                { "id": "start_1a2b3c4d", "type": "start", "pos": [10, 20], "data": { "project_name": "uberti" } }
            ],
            "links": [
                { "id": 57, "from_attr": "start_1a2b3c4d_output", "to_attr": "launcher_00000000_input" },
                { "id": "58" }
            ]
        }))
        .unwrap();

        assert_eq!(doc.nodes[0].node_type, "start");
        assert_eq!(doc.nodes[0].pos, (10.0, 20.0));
        assert_eq!(doc.links[0].id, "57");
        assert_eq!(doc.links[1].id, "58");
        assert!(doc.links[1].from_attr.is_none());

        let encoded = serde_json::to_value(&doc).unwrap();
        assert_eq!(encoded["nodes"][0]["type"], "start");
        assert_eq!(encoded["nodes"][0]["pos"], json!([10.0, 20.0]));
        assert_eq!(encoded["links"][0]["from_attr"], "start_1a2b3c4d_output");
    }

    #[test]
    fn test_bad_entries_are_rejected_one_by_one() {
        let doc = WorkflowDocument::from_value(json!({
            "version": "1.0",
            "name": null,
            "created_at": 17,
            "nodes": [
                { "id": "start_1a2b3c4d", "type": "start", "pos": null, "data": null },
                { "id": "launcher_00000000" },
                "not a node"
            ],
            "links": [
                { "id": 3, "from_attr": 5, "to_attr": "launcher_00000000_input" },
                { "id": "4", "from_attr": "start_1a2b3c4d_output", "to_attr": null }
            ]
        }))
        .unwrap();

        assert_eq!(doc.name, "");
        assert_eq!(doc.created_at, "");
        assert_eq!(doc.nodes.len(), 1);
        assert_eq!(doc.nodes[0].pos, (0.0, 0.0));
        assert!(doc.nodes[0].data.is_empty());

        assert_eq!(doc.rejected_nodes.len(), 2);
        assert_eq!(doc.rejected_nodes[0].id, "launcher_00000000");
        assert!(doc.rejected_nodes[0].reason.contains("type"));
        assert_eq!(doc.rejected_nodes[1].id, "#2");

        assert_eq!(doc.links.len(), 1);
        assert_eq!(doc.links[0].id, "4");
        assert_eq!(doc.rejected_links.len(), 1);
        assert_eq!(doc.rejected_links[0].id, "3");
    }

    #[test]
    fn test_wrongly_typed_sections_are_malformed() {
        let err = WorkflowDocument::from_value(json!({ "version": "1.0", "nodes": {}, "links": [] }))
            .unwrap_err();
        assert!(matches!(err, GraphError::MalformedDocument(msg) if msg.contains("nodes")));

        let err = WorkflowDocument::from_value(json!({ "version": null, "nodes": [], "links": [] }))
            .unwrap_err();
        assert!(matches!(err, GraphError::MalformedDocument(msg) if msg.contains("version")));
    }

    #[test]
    fn test_rejected_entries_are_not_written_back() {
        let doc = WorkflowDocument::from_value(json!({
            "version": "1.0",
            "nodes": [{ "id": "x" }],
            "links": []
        }))
        .unwrap();
        let encoded = serde_json::to_value(&doc).unwrap();
        assert_eq!(encoded["nodes"], json!([]));
        assert!(encoded.get("rejected_nodes").is_none());
    }

    #[test]
    fn test_new_document_is_stamped() {
        let doc = WorkflowDocument::new("fresh");
        assert_eq!(doc.version, FORMAT_VERSION);
        assert!(!doc.created_at.is_empty());
        assert_eq!(doc.created_at, doc.updated_at);
        assert!(chrono::DateTime::parse_from_rfc3339(&doc.created_at).is_ok());
    }
}
