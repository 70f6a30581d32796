//! Node factory
//!
//! Instantiates nodes from catalog types, either with a freshly generated
//! stable id or with an explicit id taken from a document being replayed.

use std::collections::HashSet;

use uuid::Uuid;

use crate::constants::document::ID_SUFFIX_LEN;
use crate::error::{GraphError, Result};
use crate::registry::NodeTypeRegistry;
use crate::tracker::GraphStateTracker;
use crate::types::{Node, NodeId, Position};

/// Creates nodes and guarantees id uniqueness
///
/// Generated ids are remembered for the lifetime of the factory, so an id
/// is never handed out twice even after its node was deleted.
#[derive(Debug, Default)]
pub struct NodeFactory {
    issued: HashSet<NodeId>,
}

impl NodeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a node of the given type
    ///
    /// `position` defaults to the type's default position. An explicit id
    /// is used verbatim. It must not be blank and must not already be
    /// tracked (`Conflict`). Only generated ids are remembered.
    pub fn create(
        &mut self,
        registry: &NodeTypeRegistry,
        tracker: &GraphStateTracker,
        type_key: &str,
        position: Option<Position>,
        explicit_id: Option<&str>,
    ) -> Result<Node> {
        let node_type = registry
            .get(type_key)
            .ok_or_else(|| GraphError::UnknownNodeType(type_key.to_string()))?;

        let id = match explicit_id {
            Some(id) => {
                if id.trim().is_empty() {
                    return Err(GraphError::malformed("empty node id"));
                }
                if tracker.contains_node(id) {
                    return Err(GraphError::Conflict(id.to_string()));
                }
                id.to_string()
            }
            None => {
                let id = self.generate_id(type_key, tracker);
                self.issued.insert(id.clone());
                id
            }
        };

        Ok(Node {
            id,
            node_type: type_key.to_string(),
            position: position.unwrap_or(node_type.default_pos),
            custom_data: node_type.default_data(),
        })
    }

    /// Generate `<type>_<8 hex chars>`, retrying on collision
    fn generate_id(&self, type_key: &str, tracker: &GraphStateTracker) -> NodeId {
        loop {
            let candidate = format!("{}_{}", type_key, random_suffix());
            if !self.issued.contains(&candidate) && !tracker.contains_node(&candidate) {
                return candidate;
            }
            log::warn!("Generated node id '{}' collided; retrying", candidate);
        }
    }
}

fn random_suffix() -> String {
    let mut hex = Uuid::new_v4().simple().to_string();
    hex.truncate(ID_SUFFIX_LEN);
    hex
}
