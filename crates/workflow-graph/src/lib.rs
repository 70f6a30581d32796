//! Workflow Graph - state tracking and persistence for the Arquiteto editor
//!
//! This crate keeps the authoritative model of a workflow graph (typed
//! nodes joined by directed links) while the user edits it on a rendering
//! surface, and saves/restores it as a versioned JSON document. It provides:
//!
//! - A read-only catalog of node types
//! - A mutation-tracked graph with a dirty flag
//! - Reconciliation of the surface's transient handles into stable ids
//! - Lossless document round trips with per-element load tolerance
//! - A file-backed store and a debounced autosave controller
//!
//! # Architecture
//!
//! `EditorSession` owns one of each component and routes between them:
//!
//! - `NodeTypeRegistry`: catalog lookup, loaded once
//! - `NodeFactory`: creates nodes with `<type>_<8 hex>` ids
//! - `IdentifierReconciler`: handle → stable id / attribute ref
//! - `GraphStateTracker`: the graph and its dirty flag
//! - `WorkflowSerializer`: tracker + surface ↔ `WorkflowDocument`
//! - `WorkflowStore`: one JSON file per document
//! - `AutosaveController`: tick-driven periodic saves
//!
//! The rendering surface is abstracted by the `RenderSurface` trait;
//! `HeadlessSurface` implements it in memory.
//!
//! # Example
//!
//! ```ignore
//! use workflow_graph::{EditorConfig, EditorSession, HeadlessSurface};
//!
//! let mut session = EditorSession::new(EditorConfig::default(), HeadlessSurface::new())?;
//! let start = session.add_node("start", None)?;
//! let open = session.add_node("launcher", None)?;
//! session.save_as("demo")?;
//! ```

pub mod autosave;
pub mod config;
pub mod constants;
pub mod document;
pub mod error;
pub mod events;
pub mod factory;
pub mod reconciler;
pub mod registry;
pub mod serializer;
pub mod session;
pub mod store;
pub mod surface;
pub mod tracker;
pub mod types;

// Re-export key types
pub use autosave::{AutosaveController, AutosaveOutcome, AutosaveState};
pub use config::{ConfigError, EditorConfig};
pub use document::{DocumentLink, DocumentNode, DocumentSummary, RejectedEntry, WorkflowDocument};
pub use error::{GraphError, Result};
pub use events::{EditorEvent, EventSink, NullEventSink, SurfaceEvent, VecEventSink};
pub use factory::NodeFactory;
pub use reconciler::IdentifierReconciler;
pub use registry::{CatalogSource, NodeTypeRegistry};
pub use serializer::{LoadReport, SkippedLink, SkippedNode, WorkflowSerializer};
pub use session::EditorSession;
pub use store::{sanitize_name, WorkflowStore};
pub use surface::{HeadlessSurface, RenderSurface, SurfaceCommand};
pub use tracker::GraphStateTracker;
pub use types::{
    AttributeRef, CustomData, CustomDataKind, ItemHandle, Link, LinkId, Node, NodeCategory,
    NodeId, NodeType, PortKind, Position,
};
