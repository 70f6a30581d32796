//! Workflow serialization
//!
//! `serialize` reads the tracker plus live positions and field values from
//! the rendering surface into a `WorkflowDocument`. `deserialize` replays a
//! document by driving the factory, the surface and the tracker.
//!
//! Loading is tolerant per element: a node that cannot be recreated or a
//! link whose endpoints cannot be resolved is skipped and reported in the
//! `LoadReport`, while the rest of the document still loads.

use serde_json::Value;

use crate::constants::defaults::WORKFLOW_NAME;
use crate::constants::document::FORMAT_VERSION;
use crate::document::{now_timestamp, DocumentLink, DocumentNode, WorkflowDocument};
use crate::error::{GraphError, Result};
use crate::factory::NodeFactory;
use crate::registry::NodeTypeRegistry;
use crate::surface::RenderSurface;
use crate::tracker::GraphStateTracker;
use crate::types::{AttributeRef, CustomData, CustomDataKind, ItemHandle, Node, NodeId};

/// A node entry that could not be recreated
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedNode {
    pub node_id: NodeId,
    pub node_type: String,
    pub reason: String,
}

/// A link entry that could not be recreated
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedLink {
    pub link_id: String,
    pub reason: String,
}

/// Outcome of replaying a document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub name: String,
    pub nodes_loaded: usize,
    pub links_loaded: usize,
    pub skipped_nodes: Vec<SkippedNode>,
    pub skipped_links: Vec<SkippedLink>,
}

impl LoadReport {
    /// True if every node and link of the document was recreated
    pub fn is_complete(&self) -> bool {
        self.skipped_nodes.is_empty() && self.skipped_links.is_empty()
    }
}

/// Converts between tracker state and workflow documents
pub struct WorkflowSerializer<'a> {
    registry: &'a NodeTypeRegistry,
}

impl<'a> WorkflowSerializer<'a> {
    pub fn new(registry: &'a NodeTypeRegistry) -> Self {
        Self { registry }
    }

    /// Build a document from the current graph
    ///
    /// Reads only; the tracker is neither mutated nor marked saved.
    pub fn serialize<S: RenderSurface + ?Sized>(
        &self,
        tracker: &GraphStateTracker,
        surface: &S,
        document_name: &str,
    ) -> WorkflowDocument {
        let nodes: Vec<DocumentNode> = tracker
            .all_nodes()
            .into_iter()
            .map(|node| self.serialize_node(node, surface))
            .collect();

        let links: Vec<DocumentLink> = tracker
            .all_links()
            .into_iter()
            .map(|link| DocumentLink {
                id: link.id,
                from_attr: Some(link.from.tag()),
                to_attr: Some(link.to.tag()),
            })
            .collect();

        let now = now_timestamp();
        log::debug!(
            "Serialized workflow '{}': {} nodes, {} links",
            document_name,
            nodes.len(),
            links.len()
        );

        WorkflowDocument {
            version: FORMAT_VERSION.to_string(),
            name: document_name.to_string(),
            created_at: now.clone(),
            updated_at: now,
            nodes,
            links,
            rejected_nodes: Vec::new(),
            rejected_links: Vec::new(),
        }
    }

    fn serialize_node<S: RenderSurface + ?Sized>(&self, node: Node, surface: &S) -> DocumentNode {
        let pos = surface.node_position(&node.id).unwrap_or(node.position);

        let data = match self.registry.get(&node.node_type) {
            Some(node_type) => {
                let value = match node_type.custom_data_kind {
                    CustomDataKind::None => CustomData::None,
                    CustomDataKind::FreeTextField | CustomDataKind::EnumeratedChoice => {
                        surface.field_value(&node.id).unwrap_or(node.custom_data)
                    }
                };
                value.to_json(node_type)
            }
            None => {
                log::warn!(
                    "Node '{}' has unregistered type '{}'; writing it without data",
                    node.id,
                    node.node_type
                );
                Default::default()
            }
        };

        DocumentNode {
            id: node.id,
            node_type: node.node_type,
            pos,
            data,
        }
    }

    /// Validate an untyped document, then replay it
    ///
    /// On validation failure nothing is touched: neither the surface nor
    /// the tracker.
    pub fn deserialize_value<S: RenderSurface + ?Sized>(
        &self,
        value: Value,
        factory: &mut NodeFactory,
        tracker: &mut GraphStateTracker,
        surface: &mut S,
    ) -> Result<LoadReport> {
        let document = WorkflowDocument::from_value(value)?;
        self.deserialize(&document, factory, tracker, surface)
    }

    /// Replace the current graph with the document's graph
    pub fn deserialize<S: RenderSurface + ?Sized>(
        &self,
        document: &WorkflowDocument,
        factory: &mut NodeFactory,
        tracker: &mut GraphStateTracker,
        surface: &mut S,
    ) -> Result<LoadReport> {
        if document.version.trim().is_empty() {
            return Err(GraphError::malformed("empty 'version'"));
        }
        if document.version != FORMAT_VERSION {
            log::warn!(
                "Document '{}' has version '{}', expected '{}'; loading anyway",
                document.name,
                document.version,
                FORMAT_VERSION
            );
        }

        surface.clear_graph();
        tracker.clear();

        let mut report = LoadReport {
            name: if document.name.is_empty() {
                WORKFLOW_NAME.to_string()
            } else {
                document.name.clone()
            },
            ..Default::default()
        };

        for rejected in &document.rejected_nodes {
            log::warn!("Skipping malformed node entry {}: {}", rejected.id, rejected.reason);
            report.skipped_nodes.push(SkippedNode {
                node_id: rejected.id.clone(),
                node_type: rejected.node_type.clone(),
                reason: rejected.reason.clone(),
            });
        }
        for rejected in &document.rejected_links {
            log::warn!("Skipping malformed link entry {}: {}", rejected.id, rejected.reason);
            report.skipped_links.push(SkippedLink {
                link_id: rejected.id.clone(),
                reason: rejected.reason.clone(),
            });
        }

        for entry in &document.nodes {
            match self.restore_node(entry, factory, tracker, surface) {
                Ok(()) => report.nodes_loaded += 1,
                Err(e) => {
                    log::warn!("Skipping node '{}' ({}): {}", entry.id, entry.node_type, e);
                    report.skipped_nodes.push(SkippedNode {
                        node_id: entry.id.clone(),
                        node_type: entry.node_type.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        for entry in &document.links {
            match self.restore_link(entry, tracker, surface) {
                Ok(()) => report.links_loaded += 1,
                Err(e) => {
                    log::warn!("Skipping link '{}': {}", entry.id, e);
                    report.skipped_links.push(SkippedLink {
                        link_id: entry.id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        tracker.mark_saved();
        tracker.set_current_document_name(report.name.clone());

        log::info!(
            "Workflow '{}' loaded: {} nodes, {} links ({} nodes and {} links skipped)",
            report.name,
            report.nodes_loaded,
            report.links_loaded,
            report.skipped_nodes.len(),
            report.skipped_links.len()
        );
        Ok(report)
    }

    fn restore_node<S: RenderSurface + ?Sized>(
        &self,
        entry: &DocumentNode,
        factory: &mut NodeFactory,
        tracker: &mut GraphStateTracker,
        surface: &mut S,
    ) -> Result<()> {
        let mut node = factory.create(
            self.registry,
            tracker,
            &entry.node_type,
            Some(entry.pos),
            Some(&entry.id),
        )?;
        let node_type = self
            .registry
            .get(&entry.node_type)
            .ok_or_else(|| GraphError::UnknownNodeType(entry.node_type.clone()))?;

        if let Some(data) = CustomData::from_json(node_type, &entry.data) {
            let accepted = match &data {
                CustomData::Choice(choice) => {
                    node_type.choices.is_empty() || node_type.choices.contains(choice)
                }
                _ => true,
            };
            if accepted {
                node.custom_data = data;
            } else {
                log::warn!(
                    "Node '{}': '{:?}' is not a valid choice for '{}'; keeping default",
                    entry.id,
                    data,
                    node_type.key
                );
            }
        }

        let handle = surface.render_node(&node, node_type)?;
        if node.custom_data != CustomData::None {
            if let Err(e) = surface.set_field_value(&node.id, &node.custom_data) {
                log::warn!("Node '{}': could not restore field value: {}", node.id, e);
            }
        }

        if let Err(e) = tracker.register_node(node) {
            surface.remove_item(handle);
            return Err(e);
        }
        Ok(())
    }

    fn restore_link<S: RenderSurface + ?Sized>(
        &self,
        entry: &DocumentLink,
        tracker: &mut GraphStateTracker,
        surface: &mut S,
    ) -> Result<()> {
        let from = resolve_endpoint(entry, entry.from_attr.as_deref(), &*surface)?;
        let to = resolve_endpoint(entry, entry.to_attr.as_deref(), &*surface)?;

        let handle = surface.render_link(from.1, to.1)?;
        tracker.register_link(handle.to_string(), from.0, to.0);
        Ok(())
    }
}

/// Resolve a document attribute name against the rendered graph
fn resolve_endpoint<S: RenderSurface + ?Sized>(
    entry: &DocumentLink,
    attribute: Option<&str>,
    surface: &S,
) -> Result<(AttributeRef, ItemHandle)> {
    let dangling = |name: &str| GraphError::DanglingLinkReference {
        link_id: entry.id.clone(),
        attribute: name.to_string(),
    };

    let name = attribute.ok_or_else(|| dangling("<missing>"))?;
    let attr = AttributeRef::parse(name).ok_or_else(|| dangling(name))?;
    let handle = surface.find_attribute(&attr).ok_or_else(|| dangling(name))?;
    Ok((attr, handle))
}
