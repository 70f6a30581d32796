//! Graph state tracker
//!
//! The single authoritative in-memory graph for an editing session. Every
//! structural mutation goes through here so the dirty flag is always
//! accurate. Positions and live field values are not stored; the rendering
//! surface owns them.

use std::fmt::Write as _;

use crate::error::{GraphError, Result};
use crate::types::{AttributeRef, Link, LinkId, Node};

/// Nodes, links and save state of the workflow being edited
#[derive(Debug, Default)]
pub struct GraphStateTracker {
    /// Nodes in registration order
    nodes: Vec<Node>,
    /// Links in registration order
    links: Vec<Link>,
    /// True iff a mutation happened since the last save or load
    dirty: bool,
    /// Name of the document being edited; unset for a never-saved graph
    current_document_name: Option<String>,
}

impl GraphStateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node
    ///
    /// A duplicate id means reconciliation broke upstream, so it is
    /// reported rather than overwritten.
    pub fn register_node(&mut self, node: Node) -> Result<()> {
        if self.contains_node(&node.id) {
            log::error!("Refusing to register duplicate node '{}'", node.id);
            return Err(GraphError::DuplicateNode(node.id));
        }

        log::debug!("Node registered: {} (type: {})", node.id, node.node_type);
        self.nodes.push(node);
        self.dirty = true;
        Ok(())
    }

    /// Remove a node and every link touching it
    ///
    /// Idempotent: removing an absent node changes nothing. Returns the
    /// number of links removed with the node, or `None` if it was absent.
    pub fn remove_node(&mut self, node_id: &str) -> Option<usize> {
        let position = self.nodes.iter().position(|n| n.id == node_id)?;
        self.nodes.remove(position);

        let before = self.links.len();
        self.links.retain(|link| !link.touches(node_id));
        let removed_links = before - self.links.len();

        self.dirty = true;
        log::debug!("Node removed: {} ({} links dropped)", node_id, removed_links);
        Some(removed_links)
    }

    /// Register a link
    ///
    /// Endpoints are not checked against the node set; the surface decides
    /// which connections are possible and documents are validated on load.
    pub fn register_link(&mut self, id: impl Into<LinkId>, from: AttributeRef, to: AttributeRef) {
        let link = Link {
            id: id.into(),
            from,
            to,
        };
        log::debug!("Link registered: {} -> {} ({})", link.from, link.to, link.id);
        self.links.push(link);
        self.dirty = true;
    }

    /// Remove a link by id; idempotent
    pub fn remove_link(&mut self, link_id: &str) -> bool {
        let before = self.links.len();
        self.links.retain(|link| link.id != link_id);
        let removed = self.links.len() != before;
        if removed {
            self.dirty = true;
            log::debug!("Link removed: {}", link_id);
        }
        removed
    }

    /// Empty the graph and forget the current document
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.links.clear();
        self.dirty = false;
        self.current_document_name = None;
        log::debug!("Tracker cleared");
    }

    /// Mark the current state as saved without touching the graph
    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    pub fn set_current_document_name(&mut self, name: impl Into<String>) {
        self.current_document_name = Some(name.into());
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn current_document_name(&self) -> Option<String> {
        self.current_document_name.clone()
    }

    /// Snapshot of all nodes
    pub fn all_nodes(&self) -> Vec<Node> {
        self.nodes.clone()
    }

    /// Snapshot of all links
    pub fn all_links(&self) -> Vec<Link> {
        self.links.clone()
    }

    /// Snapshot of a single node
    pub fn node(&self, node_id: &str) -> Option<Node> {
        self.nodes.iter().find(|n| n.id == node_id).cloned()
    }

    pub fn contains_node(&self, node_id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == node_id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Human-readable dump of the tracker state
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let name = self.current_document_name.as_deref().unwrap_or("<unsaved workflow>");
        let _ = writeln!(out, "workflow: {}", name);
        let _ = writeln!(out, "unsaved changes: {}", self.dirty);
        let _ = writeln!(out, "nodes: {}", self.nodes.len());
        for node in &self.nodes {
            let _ = writeln!(out, "  - {} (type: {})", node.id, node.node_type);
        }
        let _ = writeln!(out, "links: {}", self.links.len());
        for link in &self.links {
            let _ = writeln!(out, "  - {} -> {}", link.from, link.to);
        }
        out
    }
}
