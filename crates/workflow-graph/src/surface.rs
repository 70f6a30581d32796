//! Rendering surface boundary
//!
//! The rendering surface (the node editor widget) owns positions, field
//! values and the transient numeric handles of every item it draws. Only
//! the session, the reconciler and the serializer talk to it.

use std::collections::{BTreeMap, HashMap};

use crate::error::{GraphError, Result};
use crate::types::{AttributeRef, CustomData, ItemHandle, Node, NodeId, NodeType, PortKind, Position};

/// Trait implemented by rendering surface adapters
pub trait RenderSurface {
    /// Stable alias (tag) registered for a node handle
    fn node_alias(&self, node: ItemHandle) -> Option<NodeId>;

    /// Handle currently drawing the node with this stable id
    fn node_handle(&self, node_id: &str) -> Option<ItemHandle>;

    /// Node handle owning an attribute handle
    fn attribute_owner(&self, attribute: ItemHandle) -> Option<ItemHandle>;

    /// Declared port kind of an attribute handle
    fn attribute_port(&self, attribute: ItemHandle) -> Option<PortKind>;

    /// Handle of the attribute named by a stable reference
    fn find_attribute(&self, attribute: &AttributeRef) -> Option<ItemHandle>;

    /// Live position of a node
    fn node_position(&self, node_id: &str) -> Option<Position>;

    /// Live custom data value of a node's body control
    fn field_value(&self, node_id: &str) -> Option<CustomData>;

    /// Draw a node with its ports, tagged with the node's stable id
    fn render_node(&mut self, node: &Node, node_type: &NodeType) -> Result<ItemHandle>;

    /// Draw a link between two attribute handles
    fn render_link(&mut self, from: ItemHandle, to: ItemHandle) -> Result<ItemHandle>;

    /// Remove a node or link; removing a node also removes its links
    fn remove_item(&mut self, item: ItemHandle);

    /// Remove every node and link from the graph area
    fn clear_graph(&mut self);

    /// Set the value of a node's body control
    fn set_field_value(&mut self, node_id: &str, value: &CustomData) -> Result<()>;
}

/// Commands received by a `HeadlessSurface`, in order
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCommand {
    RenderNode(NodeId),
    RenderLink(ItemHandle),
    Remove(ItemHandle),
    Clear,
    SetField(NodeId),
}

#[derive(Debug, Clone)]
struct RenderedNode {
    position: Position,
    field: Option<CustomData>,
    attributes: Vec<ItemHandle>,
}

#[derive(Debug, Clone, Copy)]
struct RenderedAttribute {
    owner: ItemHandle,
    port: PortKind,
}

/// In-memory rendering surface
///
/// Keeps an explicit bidirectional map between node handles and stable
/// aliases. Used by tests and by headless tools that replay documents
/// without a GUI.
#[derive(Debug)]
pub struct HeadlessSurface {
    next_handle: u64,
    aliases: HashMap<ItemHandle, NodeId>,
    handles: HashMap<NodeId, ItemHandle>,
    nodes: BTreeMap<ItemHandle, RenderedNode>,
    attributes: HashMap<ItemHandle, RenderedAttribute>,
    links: BTreeMap<ItemHandle, (ItemHandle, ItemHandle)>,
    commands: Vec<SurfaceCommand>,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self {
            // Handles start high, like a real widget toolkit's item ids
            next_handle: 1000,
            aliases: HashMap::new(),
            handles: HashMap::new(),
            nodes: BTreeMap::new(),
            attributes: HashMap::new(),
            links: BTreeMap::new(),
            commands: Vec::new(),
        }
    }

    fn allocate(&mut self) -> ItemHandle {
        let handle = ItemHandle(self.next_handle);
        self.next_handle += 1;
        handle
    }

    fn add_node_item(&mut self, position: Position, ports: &[PortKind], field: Option<CustomData>) -> ItemHandle {
        let handle = self.allocate();
        let mut attributes = Vec::with_capacity(ports.len());
        for &port in ports {
            let attribute = self.allocate();
            self.attributes
                .insert(attribute, RenderedAttribute { owner: handle, port });
            attributes.push(attribute);
        }
        self.nodes.insert(
            handle,
            RenderedNode {
                position,
                field,
                attributes,
            },
        );
        handle
    }

    /// Draw a node that has no stable alias
    ///
    /// Simulates an item created behind the factory's back.
    pub fn add_untagged_node(&mut self, position: Position, ports: &[PortKind]) -> ItemHandle {
        self.add_node_item(position, ports, None)
    }

    /// Handle of a node's attribute of the given kind
    pub fn attribute_handle(&self, node: ItemHandle, port: PortKind) -> Option<ItemHandle> {
        let rendered = self.nodes.get(&node)?;
        rendered
            .attributes
            .iter()
            .copied()
            .find(|a| self.attributes.get(a).map(|attr| attr.port) == Some(port))
    }

    /// Move a node, as the user dragging it would
    pub fn move_node(&mut self, node_id: &str, position: Position) -> bool {
        let Some(handle) = self.handles.get(node_id) else {
            return false;
        };
        match self.nodes.get_mut(handle) {
            Some(rendered) => {
                rendered.position = position;
                true
            }
            None => false,
        }
    }

    /// Handles of all drawn links
    pub fn link_handles(&self) -> Vec<ItemHandle> {
        self.links.keys().copied().collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Commands received so far
    pub fn commands(&self) -> &[SurfaceCommand] {
        &self.commands
    }

    fn remove_links_touching(&mut self, attributes: &[ItemHandle]) {
        self.links
            .retain(|_, (from, to)| !attributes.contains(from) && !attributes.contains(to));
    }
}

impl Default for HeadlessSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderSurface for HeadlessSurface {
    fn node_alias(&self, node: ItemHandle) -> Option<NodeId> {
        self.aliases.get(&node).cloned()
    }

    fn node_handle(&self, node_id: &str) -> Option<ItemHandle> {
        self.handles.get(node_id).copied()
    }

    fn attribute_owner(&self, attribute: ItemHandle) -> Option<ItemHandle> {
        self.attributes.get(&attribute).map(|a| a.owner)
    }

    fn attribute_port(&self, attribute: ItemHandle) -> Option<PortKind> {
        self.attributes.get(&attribute).map(|a| a.port)
    }

    fn find_attribute(&self, attribute: &AttributeRef) -> Option<ItemHandle> {
        let node = self.handles.get(&attribute.node_id)?;
        self.attribute_handle(*node, attribute.port)
    }

    fn node_position(&self, node_id: &str) -> Option<Position> {
        let handle = self.handles.get(node_id)?;
        self.nodes.get(handle).map(|n| n.position)
    }

    fn field_value(&self, node_id: &str) -> Option<CustomData> {
        let handle = self.handles.get(node_id)?;
        self.nodes.get(handle).and_then(|n| n.field.clone())
    }

    fn render_node(&mut self, node: &Node, node_type: &NodeType) -> Result<ItemHandle> {
        if self.handles.contains_key(&node.id) {
            return Err(GraphError::surface(format!(
                "alias '{}' is already drawn",
                node.id
            )));
        }

        let field = match node.custom_data {
            CustomData::None => None,
            ref data => Some(data.clone()),
        };
        let handle = self.add_node_item(node.position, &node_type.ports(), field);
        self.aliases.insert(handle, node.id.clone());
        self.handles.insert(node.id.clone(), handle);
        self.commands.push(SurfaceCommand::RenderNode(node.id.clone()));
        Ok(handle)
    }

    fn render_link(&mut self, from: ItemHandle, to: ItemHandle) -> Result<ItemHandle> {
        match (self.attribute_port(from), self.attribute_port(to)) {
            (Some(PortKind::Output), Some(PortKind::Input)) => {}
            (from_port, to_port) => {
                return Err(GraphError::surface(format!(
                    "cannot link {} ({:?}) to {} ({:?})",
                    from, from_port, to, to_port
                )));
            }
        }

        let handle = self.allocate();
        self.links.insert(handle, (from, to));
        self.commands.push(SurfaceCommand::RenderLink(handle));
        Ok(handle)
    }

    fn remove_item(&mut self, item: ItemHandle) {
        self.commands.push(SurfaceCommand::Remove(item));

        if self.links.remove(&item).is_some() {
            return;
        }

        if let Some(rendered) = self.nodes.remove(&item) {
            for attribute in &rendered.attributes {
                self.attributes.remove(attribute);
            }
            self.remove_links_touching(&rendered.attributes);
            if let Some(alias) = self.aliases.remove(&item) {
                self.handles.remove(&alias);
            }
        }
    }

    fn clear_graph(&mut self) {
        self.commands.push(SurfaceCommand::Clear);
        self.aliases.clear();
        self.handles.clear();
        self.nodes.clear();
        self.attributes.clear();
        self.links.clear();
    }

    fn set_field_value(&mut self, node_id: &str, value: &CustomData) -> Result<()> {
        let handle = self
            .handles
            .get(node_id)
            .ok_or_else(|| GraphError::surface(format!("no node tagged '{}'", node_id)))?;
        let rendered = self
            .nodes
            .get_mut(handle)
            .ok_or_else(|| GraphError::surface(format!("node '{}' is not drawn", node_id)))?;
        rendered.field = Some(value.clone());
        self.commands.push(SurfaceCommand::SetField(node_id.to_string()));
        Ok(())
    }
}
