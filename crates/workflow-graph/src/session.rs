//! Editing session
//!
//! Owns exactly one tracker together with the registry, store, autosave
//! controller and rendering surface, and routes user actions and surface
//! events between them:
//!
//! - adding a node goes factory → surface → tracker
//! - surface events are resolved by the reconciler, then applied to the tracker
//! - save/open go through the serializer and the store
//!
//! # Example
//!
//! ```ignore
//! use workflow_graph::{EditorConfig, EditorSession, HeadlessSurface};
//!
//! let mut session = EditorSession::new(EditorConfig::default(), HeadlessSurface::new())?;
//! let start = session.add_node("start", None)?;
//! session.save_as("morning")?;
//! ```

use std::time::Instant;

use crate::autosave::{AutosaveController, AutosaveOutcome};
use crate::config::EditorConfig;
use crate::document::{DocumentSummary, WorkflowDocument};
use crate::error::{GraphError, Result};
use crate::events::{EditorEvent, EventSink, NullEventSink, SurfaceEvent};
use crate::factory::NodeFactory;
use crate::reconciler::IdentifierReconciler;
use crate::registry::NodeTypeRegistry;
use crate::serializer::{LoadReport, WorkflowSerializer};
use crate::store::WorkflowStore;
use crate::surface::RenderSurface;
use crate::tracker::GraphStateTracker;
use crate::types::{ItemHandle, NodeId, Position};

/// A single running editor
pub struct EditorSession<S: RenderSurface> {
    config: EditorConfig,
    registry: NodeTypeRegistry,
    factory: NodeFactory,
    tracker: GraphStateTracker,
    store: WorkflowStore,
    autosave: AutosaveController,
    surface: S,
    selected_nodes: Vec<ItemHandle>,
    selected_links: Vec<ItemHandle>,
    event_sink: Box<dyn EventSink>,
}

impl<S: RenderSurface> EditorSession<S> {
    /// Start a session with an empty, unnamed workflow
    ///
    /// Fails if the node type catalog cannot be loaded.
    pub fn new(config: EditorConfig, surface: S) -> Result<Self> {
        let registry = NodeTypeRegistry::load_from(config.catalog_source())?;
        let store = WorkflowStore::new(&config.workflows_dir)
            .with_max_name_length(config.max_name_length);
        let autosave = AutosaveController::new(config.autosave_interval(), Instant::now());

        log::info!(
            "Editor session started ({} node types, workflows in {:?})",
            registry.len(),
            store.dir()
        );

        Ok(Self {
            config,
            registry,
            factory: NodeFactory::new(),
            tracker: GraphStateTracker::new(),
            store,
            autosave,
            surface,
            selected_nodes: Vec::new(),
            selected_links: Vec::new(),
            event_sink: Box::new(NullEventSink),
        })
    }

    /// Send editor events to the given sink
    pub fn with_event_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.event_sink = Box::new(sink);
        self
    }

    fn emit(&self, event: EditorEvent) {
        if let Err(e) = self.event_sink.send(event) {
            log::warn!("Dropped editor event: {}", e);
        }
    }

    // ---- Graph editing ----

    /// Create a node of the given type and draw it
    pub fn add_node(&mut self, type_key: &str, position: Option<Position>) -> Result<NodeId> {
        let node = self
            .factory
            .create(&self.registry, &self.tracker, type_key, position, None)?;
        let node_type = self
            .registry
            .get(type_key)
            .ok_or_else(|| GraphError::UnknownNodeType(type_key.to_string()))?;

        let handle = self.surface.render_node(&node, node_type)?;
        let node_id = node.id.clone();
        if let Err(e) = self.tracker.register_node(node) {
            self.surface.remove_item(handle);
            return Err(e);
        }

        self.emit(EditorEvent::NodeAdded {
            node_id: node_id.clone(),
            node_type: type_key.to_string(),
        });
        Ok(node_id)
    }

    /// Apply a structural event reported by the rendering surface
    ///
    /// Events whose handles cannot be resolved are logged and ignored.
    pub fn handle_event(&mut self, event: SurfaceEvent) -> Result<()> {
        match event {
            SurfaceEvent::LinkConnected {
                from_attribute,
                to_attribute,
            } => self.connect(from_attribute, to_attribute),
            SurfaceEvent::LinkDisconnected { link } => {
                self.disconnect(link);
                Ok(())
            }
            SurfaceEvent::NodeDeleted { node } => {
                self.delete_node(node);
                Ok(())
            }
            SurfaceEvent::SelectionChanged { nodes, links } => {
                self.selected_nodes = nodes;
                self.selected_links = links;
                Ok(())
            }
        }
    }

    fn connect(&mut self, from_attribute: ItemHandle, to_attribute: ItemHandle) -> Result<()> {
        let resolved = IdentifierReconciler::new(&self.surface).resolve_link(from_attribute, to_attribute);
        let Some((from, to)) = resolved else {
            log::warn!(
                "Ignoring link between unresolvable attributes {} and {}",
                from_attribute,
                to_attribute
            );
            return Ok(());
        };

        let handle = self.surface.render_link(from_attribute, to_attribute)?;
        let link_id = handle.to_string();
        self.tracker.register_link(link_id.clone(), from.clone(), to.clone());
        self.emit(EditorEvent::LinkAdded {
            link_id,
            from: from.tag(),
            to: to.tag(),
        });
        Ok(())
    }

    fn disconnect(&mut self, link: ItemHandle) {
        self.surface.remove_item(link);
        let link_id = link.to_string();
        if self.tracker.remove_link(&link_id) {
            self.emit(EditorEvent::LinkRemoved { link_id });
        }
    }

    fn delete_node(&mut self, node: ItemHandle) {
        let node_id = IdentifierReconciler::new(&self.surface).resolve_node_id(node);
        self.surface.remove_item(node);
        if let Some(links_removed) = self.tracker.remove_node(&node_id) {
            self.emit(EditorEvent::NodeRemoved {
                node_id,
                links_removed,
            });
        }
    }

    /// Delete every selected node, with its links
    ///
    /// Returns the number of nodes the tracker actually removed.
    pub fn delete_selected_nodes(&mut self) -> usize {
        let selected = std::mem::take(&mut self.selected_nodes);
        let before = self.tracker.node_count();
        for node in selected {
            self.delete_node(node);
        }
        // Link handles may have gone with the nodes
        self.selected_links.clear();
        before - self.tracker.node_count()
    }

    /// Delete every selected link
    pub fn delete_selected_links(&mut self) -> usize {
        let selected = std::mem::take(&mut self.selected_links);
        let before = self.tracker.link_count();
        for link in selected {
            self.disconnect(link);
        }
        before - self.tracker.link_count()
    }

    /// Discard the current graph and start an unnamed workflow
    pub fn new_workflow(&mut self) {
        self.surface.clear_graph();
        self.tracker.clear();
        self.selected_nodes.clear();
        self.selected_links.clear();
        self.autosave.reset(Instant::now());
        log::info!("New workflow");
        self.emit(EditorEvent::WorkflowCleared);
    }

    // ---- Persistence ----

    /// Save under a new name and make it the current document
    ///
    /// Overwriting an existing document of that name is allowed.
    pub fn save_as(&mut self, name: &str) -> Result<()> {
        let name = self.validate_name(name)?;
        self.save_under(&name)
    }

    /// Save under the current document name
    pub fn save(&mut self) -> Result<()> {
        let name = self.tracker.current_document_name().ok_or_else(|| {
            GraphError::InvalidWorkflowName("workflow has not been named yet".to_string())
        })?;
        self.save_under(&name)
    }

    fn validate_name(&self, name: &str) -> Result<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GraphError::InvalidWorkflowName("empty".to_string()));
        }
        if name.chars().count() < self.config.min_name_length {
            return Err(GraphError::InvalidWorkflowName(format!(
                "'{}' is shorter than {} characters",
                name, self.config.min_name_length
            )));
        }
        Ok(name.to_string())
    }

    fn save_under(&mut self, name: &str) -> Result<()> {
        let document = WorkflowSerializer::new(&self.registry).serialize(&self.tracker, &self.surface, name);
        if !self.store.save(&document, Some(name)) {
            self.emit(EditorEvent::SaveFailed {
                name: name.to_string(),
                autosave: false,
            });
            return Err(GraphError::StoreIo(format!("workflow '{}' was not saved", name)));
        }

        self.tracker.mark_saved();
        self.tracker.set_current_document_name(name);
        self.autosave.reset(Instant::now());
        self.emit(EditorEvent::WorkflowSaved {
            name: name.to_string(),
            autosave: false,
        });
        Ok(())
    }

    /// Replace the current graph with a stored document
    ///
    /// A missing, unreadable or malformed document leaves the editor as it was.
    pub fn open(&mut self, name: &str) -> Result<LoadReport> {
        let document = self.store.try_load(name)?;
        self.open_document(&document)
    }

    /// Replace the current graph with the given document
    pub fn open_document(&mut self, document: &WorkflowDocument) -> Result<LoadReport> {
        let report = WorkflowSerializer::new(&self.registry).deserialize(
            document,
            &mut self.factory,
            &mut self.tracker,
            &mut self.surface,
        )?;
        self.selected_nodes.clear();
        self.selected_links.clear();
        self.autosave.reset(Instant::now());

        if !report.is_complete() {
            log::warn!(
                "Workflow '{}' loaded partially: {} node(s) and {} link(s) skipped",
                report.name,
                report.skipped_nodes.len(),
                report.skipped_links.len()
            );
        }
        log::debug!("{}", self.tracker.summary());

        self.emit(EditorEvent::WorkflowLoaded {
            name: report.name.clone(),
            nodes: report.nodes_loaded,
            links: report.links_loaded,
            skipped_nodes: report.skipped_nodes.len(),
            skipped_links: report.skipped_links.len(),
        });
        Ok(report)
    }

    pub fn delete_workflow(&self, name: &str) -> bool {
        self.store.delete(name)
    }

    pub fn list_workflows(&self) -> Vec<DocumentSummary> {
        self.store.list()
    }

    /// Host-loop tick; autosaves when due
    pub fn tick(&mut self, now: Instant) -> AutosaveOutcome {
        let outcome = self
            .autosave
            .tick(now, &self.registry, &mut self.tracker, &self.surface, &self.store);
        match &outcome {
            AutosaveOutcome::Saved(name) => self.emit(EditorEvent::WorkflowSaved {
                name: name.clone(),
                autosave: true,
            }),
            AutosaveOutcome::Failed(name) => self.emit(EditorEvent::SaveFailed {
                name: name.clone(),
                autosave: true,
            }),
            _ => {}
        }
        outcome
    }

    // ---- Accessors ----

    pub fn tracker(&self) -> &GraphStateTracker {
        &self.tracker
    }

    pub fn registry(&self) -> &NodeTypeRegistry {
        &self.registry
    }

    pub fn store(&self) -> &WorkflowStore {
        &self.store
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn selected_nodes(&self) -> &[ItemHandle] {
        &self.selected_nodes
    }

    pub fn selected_links(&self) -> &[ItemHandle] {
        &self.selected_links
    }
}
