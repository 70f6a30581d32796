//! Core types for workflow graphs
//!
//! These types define node types, node instances, connection endpoints and
//! links as the tracker and the document format see them.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::document::DEFAULT_DATA_FIELD;

/// Stable identifier for a node (`<type>_<hex suffix>`)
pub type NodeId = String;

/// Identifier for a link, assigned by the rendering surface
pub type LinkId = String;

/// Position on the editor canvas (x, y)
pub type Position = (f64, f64);

/// Transient numeric handle assigned by the rendering surface
///
/// Only valid for the lifetime of the current process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemHandle(pub u64);

impl fmt::Display for ItemHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of connection point on a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortKind {
    /// Accepts incoming links
    Input,
    /// Emits outgoing links
    Output,
    /// Body content, not connectable
    Static,
}

impl PortKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PortKind::Input => "input",
            PortKind::Output => "output",
            PortKind::Static => "static",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "input" => Some(PortKind::Input),
            "output" => Some(PortKind::Output),
            "static" => Some(PortKind::Static),
            _ => None,
        }
    }
}

impl fmt::Display for PortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A connection endpoint: a port on a specific node
///
/// The textual form `<node_id>_<port>` is what the document format stores.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeRef {
    pub node_id: NodeId,
    pub port: PortKind,
}

impl AttributeRef {
    pub fn new(node_id: impl Into<NodeId>, port: PortKind) -> Self {
        Self {
            node_id: node_id.into(),
            port,
        }
    }

    /// The input port of a node
    pub fn input(node_id: impl Into<NodeId>) -> Self {
        Self::new(node_id, PortKind::Input)
    }

    /// The output port of a node
    pub fn output(node_id: impl Into<NodeId>) -> Self {
        Self::new(node_id, PortKind::Output)
    }

    /// Textual attribute name used in documents
    pub fn tag(&self) -> String {
        format!("{}_{}", self.node_id, self.port)
    }

    /// Parse a textual attribute name, splitting at the last underscore
    ///
    /// Node ids contain underscores themselves, so only the final segment
    /// is the port.
    pub fn parse(tag: &str) -> Option<Self> {
        let (node_id, port) = tag.rsplit_once('_')?;
        if node_id.is_empty() {
            return None;
        }
        Some(Self::new(node_id, PortKind::parse(port)?))
    }
}

impl fmt::Display for AttributeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.node_id, self.port)
    }
}

/// Which palette a node type belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeCategory {
    /// Flow nodes (start, open, workspace, ...)
    #[serde(rename = "graph-node", alias = "nodes")]
    GraphNode,
    /// Program launcher cards
    #[serde(rename = "launcher-card", alias = "programs")]
    LauncherCard,
}

/// Shape of the custom data a node type carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CustomDataKind {
    #[default]
    None,
    /// Free text typed into the node body
    FreeTextField,
    /// One value picked from a fixed list
    EnumeratedChoice,
}

/// Definition of a node type (a catalog entry)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeType {
    /// Catalog key (e.g., "start"); filled in from the catalog map key
    #[serde(skip)]
    pub key: String,
    /// Human-readable label
    pub label: String,
    /// Whether the node exposes an input port
    #[serde(default, alias = "has_input")]
    pub has_input: bool,
    /// Whether the node exposes an output port
    #[serde(default, alias = "has_output")]
    pub has_output: bool,
    /// Whether the node renders body content (a static attribute)
    #[serde(default, alias = "has_content")]
    pub has_body_content: bool,
    /// Position used when none is given at creation
    #[serde(default, alias = "default_pos")]
    pub default_pos: Position,
    /// Palette category
    #[serde(alias = "card_category")]
    pub card_category: NodeCategory,
    /// Custom data shape
    #[serde(default, alias = "custom_data_kind")]
    pub custom_data_kind: CustomDataKind,
    /// JSON key the custom data is stored under in documents
    #[serde(default, alias = "data_field", skip_serializing_if = "Option::is_none")]
    pub data_field: Option<String>,
    /// Allowed values for enumerated-choice data
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
}

impl NodeType {
    /// Key custom data is stored under in documents
    pub fn data_field(&self) -> &str {
        self.data_field.as_deref().unwrap_or(DEFAULT_DATA_FIELD)
    }

    /// Ports this node type exposes, in render order
    pub fn ports(&self) -> Vec<PortKind> {
        let mut ports = Vec::with_capacity(3);
        if self.has_input {
            ports.push(PortKind::Input);
        }
        if self.has_body_content {
            ports.push(PortKind::Static);
        }
        if self.has_output {
            ports.push(PortKind::Output);
        }
        ports
    }

    /// Check if this node type exposes a port of the given kind
    pub fn exposes_port(&self, port: PortKind) -> bool {
        match port {
            PortKind::Input => self.has_input,
            PortKind::Output => self.has_output,
            PortKind::Static => self.has_body_content,
        }
    }

    /// The empty custom data value for this node type
    pub fn default_data(&self) -> CustomData {
        match self.custom_data_kind {
            CustomDataKind::None => CustomData::None,
            CustomDataKind::FreeTextField => CustomData::Text(String::new()),
            CustomDataKind::EnumeratedChoice => CustomData::Choice(
                self.choices.first().cloned().unwrap_or_default(),
            ),
        }
    }
}

/// Per-node custom data, shaped by the node type
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CustomData {
    #[default]
    None,
    /// Current content of a free text field
    Text(String),
    /// Current selection of an enumerated choice
    Choice(String),
}

impl CustomData {
    /// Encode as the `data` object of a document node
    pub fn to_json(&self, node_type: &NodeType) -> Map<String, Value> {
        let mut map = Map::new();
        match self {
            CustomData::None => {}
            CustomData::Text(text) => {
                map.insert(node_type.data_field().to_string(), Value::String(text.clone()));
            }
            CustomData::Choice(choice) => {
                map.insert(node_type.data_field().to_string(), Value::String(choice.clone()));
            }
        }
        map
    }

    /// Decode the `data` object of a document node
    ///
    /// Returns `None` when the node type carries no data or the field is
    /// absent. Numeric choices are accepted and normalized to strings.
    pub fn from_json(node_type: &NodeType, data: &Map<String, Value>) -> Option<Self> {
        let raw = data.get(node_type.data_field())?;
        let text = match raw {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => return None,
        };
        match node_type.custom_data_kind {
            CustomDataKind::None => None,
            CustomDataKind::FreeTextField => Some(CustomData::Text(text)),
            CustomDataKind::EnumeratedChoice => Some(CustomData::Choice(text)),
        }
    }
}

/// A node instance in the editor
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Stable identifier, never reused
    pub id: NodeId,
    /// Node type key (references a NodeType)
    pub node_type: String,
    /// Position at creation; the live position is owned by the surface
    pub position: Position,
    /// Custom data at creation; the live value is owned by the surface
    pub custom_data: CustomData,
}

/// A directed link from an output port to an input port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub id: LinkId,
    pub from: AttributeRef,
    pub to: AttributeRef,
}

impl Link {
    /// Check if either endpoint belongs to the given node
    pub fn touches(&self, node_id: &str) -> bool {
        self.from.node_id == node_id || self.to.node_id == node_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace_type() -> NodeType {
        NodeType {
            key: "workspace".to_string(),
            label: "Workspace".to_string(),
            has_input: true,
            has_output: true,
            has_body_content: true,
            default_pos: (10.0, 20.0),
            card_category: NodeCategory::GraphNode,
            custom_data_kind: CustomDataKind::EnumeratedChoice,
            data_field: Some("workspace_number".to_string()),
            choices: vec!["1".to_string(), "2".to_string()],
        }
    }

    #[test]
    fn test_attribute_ref_parse_uses_last_underscore() {
        let attr = AttributeRef::parse("launcher_1a2b3c4d_output").unwrap();
        assert_eq!(attr.node_id, "launcher_1a2b3c4d");
        assert_eq!(attr.port, PortKind::Output);
        assert_eq!(attr.tag(), "launcher_1a2b3c4d_output");
    }

    #[test]
    fn test_attribute_ref_parse_rejects_bad_tags() {
        assert!(AttributeRef::parse("no-port").is_none());
        assert!(AttributeRef::parse("node_sideways").is_none());
        assert!(AttributeRef::parse("_input").is_none());
    }

    #[test]
    fn test_attribute_ref_equality_is_pairwise() {
        assert_eq!(AttributeRef::input("a"), AttributeRef::new("a", PortKind::Input));
        assert_ne!(AttributeRef::input("a"), AttributeRef::output("a"));
    }

    #[test]
    fn test_node_type_ports() {
        let ty = workspace_type();
        assert_eq!(ty.ports(), vec![PortKind::Input, PortKind::Static, PortKind::Output]);
        assert!(ty.exposes_port(PortKind::Static));
        assert_eq!(ty.default_data(), CustomData::Choice("1".to_string()));
    }

    #[test]
    fn test_custom_data_json_accepts_numeric_choice() {
        let ty = workspace_type();
        let mut data = Map::new();
        data.insert("workspace_number".to_string(), serde_json::json!(3));
        assert_eq!(
            CustomData::from_json(&ty, &data),
            Some(CustomData::Choice("3".to_string()))
        );

        let encoded = CustomData::Choice("2".to_string()).to_json(&ty);
        assert_eq!(encoded.get("workspace_number"), Some(&serde_json::json!("2")));
        assert!(CustomData::None.to_json(&ty).is_empty());
    }

    #[test]
    fn test_catalog_entry_accepts_snake_case_keys() {
        let ty: NodeType = serde_json::from_value(serde_json::json!({
            "label": "Open",
            "has_input": true,
            "has_output": true,
            "default_pos": [100, 50],
            "card_category": "nodes"
        }))
        .unwrap();
        assert!(ty.has_input && ty.has_output && !ty.has_body_content);
        assert_eq!(ty.default_pos, (100.0, 50.0));
        assert_eq!(ty.card_category, NodeCategory::GraphNode);
        assert_eq!(ty.custom_data_kind, CustomDataKind::None);
        assert_eq!(ty.data_field(), "value");
    }
}
