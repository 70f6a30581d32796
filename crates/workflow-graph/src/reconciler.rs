//! Identifier reconciliation
//!
//! The rendering surface reports links, deletions and selections by
//! transient numeric handles. The tracker and the document format only
//! understand stable node ids. This module maps one to the other.

use crate::surface::RenderSurface;
use crate::types::{AttributeRef, ItemHandle, NodeId};

/// Resolves surface handles into stable identifiers
pub struct IdentifierReconciler<'a, S: RenderSurface + ?Sized> {
    surface: &'a S,
}

impl<'a, S: RenderSurface + ?Sized> IdentifierReconciler<'a, S> {
    pub fn new(surface: &'a S) -> Self {
        Self { surface }
    }

    /// Resolve a node handle to its stable id
    ///
    /// A handle without an alias means the node was created without going
    /// through the factory. That is recoverable: the handle's textual form
    /// is used as the id and a warning is logged.
    pub fn resolve_node_id(&self, node: ItemHandle) -> NodeId {
        match self.surface.node_alias(node) {
            Some(id) => id,
            None => {
                log::warn!(
                    "Node handle {} has no stable alias; falling back to '{}'",
                    node,
                    node
                );
                node.to_string()
            }
        }
    }

    /// Resolve an attribute handle to a stable attribute reference
    ///
    /// Walks attribute → owning node → stable id, then reads the declared
    /// port kind. Returns `None` if the attribute is unknown to the surface.
    pub fn resolve_attribute_ref(&self, attribute: ItemHandle) -> Option<AttributeRef> {
        let Some(owner) = self.surface.attribute_owner(attribute) else {
            log::warn!("Attribute handle {} has no owning node", attribute);
            return None;
        };
        let Some(port) = self.surface.attribute_port(attribute) else {
            log::warn!("Attribute handle {} has no declared port kind", attribute);
            return None;
        };
        Some(AttributeRef::new(self.resolve_node_id(owner), port))
    }

    /// Resolve both endpoints of a link
    pub fn resolve_link(&self, from: ItemHandle, to: ItemHandle) -> Option<(AttributeRef, AttributeRef)> {
        Some((self.resolve_attribute_ref(from)?, self.resolve_attribute_ref(to)?))
    }

    /// Resolve a batch of node handles, keeping order
    pub fn resolve_node_ids(&self, nodes: &[ItemHandle]) -> Vec<NodeId> {
        nodes.iter().map(|&n| self.resolve_node_id(n)).collect()
    }
}
