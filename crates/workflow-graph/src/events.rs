//! Event types flowing in and out of the editing session
//!
//! `SurfaceEvent`s arrive from the rendering surface in transient handle
//! form. `EditorEvent`s are sent from the session to any consumer (status
//! bar, logs, tests) to report structural changes, saves and loads.

use serde::{Deserialize, Serialize};

use crate::types::ItemHandle;

/// Structural events reported by the rendering surface
///
/// These carry numeric handles only; the session resolves them to stable
/// ids before touching the tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SurfaceEvent {
    /// The user dragged a connection between two attributes
    #[serde(rename_all = "camelCase")]
    LinkConnected {
        from_attribute: ItemHandle,
        to_attribute: ItemHandle,
    },

    /// The user detached an existing link
    #[serde(rename_all = "camelCase")]
    LinkDisconnected { link: ItemHandle },

    /// The user asked to delete a node
    #[serde(rename_all = "camelCase")]
    NodeDeleted { node: ItemHandle },

    /// The selection on the canvas changed
    #[serde(rename_all = "camelCase")]
    SelectionChanged {
        nodes: Vec<ItemHandle>,
        links: Vec<ItemHandle>,
    },
}

/// Trait for sending editor events
///
/// This abstracts over the transport mechanism (UI channel, mpsc, etc.)
/// so the session can be driven from different hosts.
pub trait EventSink {
    /// Send an event
    ///
    /// Returns an error if the event could not be sent (e.g., channel closed)
    fn send(&self, event: EditorEvent) -> Result<(), EventError>;
}

/// Error when sending events fails
#[derive(Debug, Clone)]
pub struct EventError {
    pub message: String,
}

impl std::fmt::Display for EventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Event error: {}", self.message)
    }
}

impl std::error::Error for EventError {}

impl EventError {
    pub fn channel_closed() -> Self {
        Self {
            message: "Channel closed".to_string(),
        }
    }
}

/// Events emitted by the editing session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EditorEvent {
    #[serde(rename_all = "camelCase")]
    NodeAdded { node_id: String, node_type: String },

    /// A node was removed together with its links
    #[serde(rename_all = "camelCase")]
    NodeRemoved { node_id: String, links_removed: usize },

    #[serde(rename_all = "camelCase")]
    LinkAdded {
        link_id: String,
        from: String,
        to: String,
    },

    #[serde(rename_all = "camelCase")]
    LinkRemoved { link_id: String },

    /// The editor was reset to an empty, unnamed workflow
    WorkflowCleared,

    #[serde(rename_all = "camelCase")]
    WorkflowSaved { name: String, autosave: bool },

    /// A save did not reach the store; the graph stays dirty
    #[serde(rename_all = "camelCase")]
    SaveFailed { name: String, autosave: bool },

    /// A document was replayed into the editor
    #[serde(rename_all = "camelCase")]
    WorkflowLoaded {
        name: String,
        nodes: usize,
        links: usize,
        skipped_nodes: usize,
        skipped_links: usize,
    },
}

/// A no-op event sink that discards all events
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: EditorEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// A vector-based event sink that collects events
///
/// Useful for testing to verify events were emitted correctly.
pub struct VecEventSink {
    events: std::sync::Mutex<Vec<EditorEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self {
            events: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Get all collected events
    pub fn events(&self) -> Vec<EditorEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Clear all collected events
    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl Default for VecEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: EditorEvent) -> Result<(), EventError> {
        self.events
            .lock()
            .map_err(|_| EventError::channel_closed())?
            .push(event);
        Ok(())
    }
}

impl<T: EventSink + ?Sized> EventSink for std::rc::Rc<T> {
    fn send(&self, event: EditorEvent) -> Result<(), EventError> {
        (**self).send(event)
    }
}
