//! Workflow storage with file persistence.
//!
//! Each document lives in `<dir>/<sanitized name>.json`. The editor-facing
//! operations never return errors: failures are logged and reported as
//! `false` / `None`, and callers keep the graph dirty. `try_load` is the
//! exception for callers that need to tell a missing file from a bad one.

use std::path::{Path, PathBuf};

use serde::de::IgnoredAny;
use serde::Deserialize;
use serde_json::Value;

use crate::constants::defaults::MAX_NAME_LENGTH;
use crate::constants::store::{EXTENSION, INVALID_NAME_CHARS, REPLACEMENT_CHAR};
use crate::document::{now_timestamp, DocumentSummary, WorkflowDocument};
use crate::error::{GraphError, Result};

/// Just enough of a document to list it
#[derive(Deserialize)]
struct SummaryProbe {
    #[serde(default)]
    name: Option<Value>,
    #[serde(default)]
    created_at: Option<Value>,
    #[serde(default)]
    updated_at: Option<Value>,
    #[serde(default)]
    nodes: Vec<IgnoredAny>,
    #[serde(default)]
    links: Vec<IgnoredAny>,
}

/// File-backed workflow document store
///
/// # Example
///
/// ```ignore
/// use workflow_graph::WorkflowStore;
///
/// let store = WorkflowStore::new("data/workflows");
/// if !store.save(&document, None) {
///     // not saved: leave the tracker dirty
/// }
/// ```
#[derive(Debug, Clone)]
pub struct WorkflowStore {
    /// Directory holding the document files
    dir: PathBuf,
    /// Longest sanitized name, in characters
    max_name_length: usize,
}

impl WorkflowStore {
    /// Create a store over the given directory
    ///
    /// The directory will be created if it doesn't exist when saving.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            max_name_length: MAX_NAME_LENGTH,
        }
    }

    pub fn with_max_name_length(mut self, max_name_length: usize) -> Self {
        self.max_name_length = max_name_length.max(1);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path for a document name, or an error if nothing usable is left
    /// after sanitizing
    pub fn path_for(&self, name: &str) -> Result<PathBuf> {
        let safe_name = sanitize_name(name, self.max_name_length);
        if safe_name.is_empty() {
            return Err(GraphError::InvalidWorkflowName(format!("'{}'", name)));
        }
        Ok(self.dir.join(format!("{}.{}", safe_name, EXTENSION)))
    }

    /// Save a document under `name`, or under its own name if none is given
    ///
    /// Overwriting keeps the existing file's `created_at`.
    pub fn save(&self, document: &WorkflowDocument, name: Option<&str>) -> bool {
        match self.try_save(document, name) {
            Ok(path) => {
                log::info!("Workflow saved: {:?}", path);
                true
            }
            Err(e) => {
                log::error!("Failed to save workflow '{}': {}", name.unwrap_or(&document.name), e);
                false
            }
        }
    }

    fn try_save(&self, document: &WorkflowDocument, name: Option<&str>) -> Result<PathBuf> {
        let name = name.unwrap_or(&document.name);
        let path = self.path_for(name)?;

        let mut document = document.clone();
        if document.name.is_empty() {
            document.name = name.to_string();
        }
        document.updated_at = now_timestamp();
        if let Some(created_at) = read_created_at(&path) {
            document.created_at = created_at;
        }

        std::fs::create_dir_all(&self.dir)?;
        let content = document.to_json_pretty()?;

        // Write next to the target and rename so a failed write never
        // truncates an existing document.
        let tmp_path = path.with_extension(format!("{}.tmp", EXTENSION));
        std::fs::write(&tmp_path, content)?;
        std::fs::rename(&tmp_path, &path)?;
        Ok(path)
    }

    /// Load a document by name
    ///
    /// Returns `None` if it is absent or cannot be parsed.
    pub fn load(&self, name: &str) -> Option<WorkflowDocument> {
        match self.try_load(name) {
            Ok(document) => Some(document),
            Err(e) => {
                log::error!("Failed to load workflow '{}': {}", name, e);
                None
            }
        }
    }

    /// Load a document by name, keeping the reason for a failure
    ///
    /// An absent file is `StoreIo`; a file that is not a valid document
    /// is `MalformedDocument`.
    pub fn try_load(&self, name: &str) -> Result<WorkflowDocument> {
        let path = self.path_for(name)?;
        if !path.exists() {
            return Err(GraphError::StoreIo(format!("workflow not found: {:?}", path)));
        }

        let content = std::fs::read_to_string(&path)?;
        let document = WorkflowDocument::from_json_str(&content)?;
        log::info!("Workflow loaded: {:?}", path);
        Ok(document)
    }

    /// List all stored documents, sorted by file name
    ///
    /// Files that fail to parse are skipped.
    pub fn list(&self) -> Vec<DocumentSummary> {
        match self.try_list() {
            Ok(summaries) => summaries,
            Err(e) => {
                log::error!("Failed to list workflows in {:?}: {}", self.dir, e);
                Vec::new()
            }
        }
    }

    fn try_list(&self) -> Result<Vec<DocumentSummary>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let file_path = entry?.path();
            if file_path.extension().map_or(false, |e| e == EXTENSION) {
                paths.push(file_path);
            }
        }
        paths.sort();

        let mut summaries = Vec::with_capacity(paths.len());
        for file_path in paths {
            let file = file_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();

            let probe = std::fs::read_to_string(&file_path)
                .map_err(GraphError::from)
                .and_then(|content| Ok(serde_json::from_str::<SummaryProbe>(&content)?));
            match probe {
                Ok(probe) => summaries.push(DocumentSummary {
                    name: text(probe.name).unwrap_or_else(|| file.clone()),
                    file,
                    created_at: text(probe.created_at).unwrap_or_default(),
                    updated_at: text(probe.updated_at).unwrap_or_default(),
                    node_count: probe.nodes.len(),
                    link_count: probe.links.len(),
                }),
                Err(e) => {
                    log::warn!("Failed to read workflow metadata from {:?}: {}", file_path, e);
                }
            }
        }
        Ok(summaries)
    }

    /// Delete a stored document
    pub fn delete(&self, name: &str) -> bool {
        let path = match self.path_for(name) {
            Ok(path) => path,
            Err(e) => {
                log::error!("Failed to delete workflow: {}", e);
                return false;
            }
        };
        if !path.exists() {
            log::warn!("Workflow not found: {:?}", path);
            return false;
        }

        match std::fs::remove_file(&path) {
            Ok(()) => {
                log::info!("Workflow deleted: {:?}", path);
                true
            }
            Err(e) => {
                log::error!("Failed to delete workflow {:?}: {}", path, e);
                false
            }
        }
    }

    /// Check if a document is stored under this name
    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).map(|p| p.exists()).unwrap_or(false)
    }
}

fn text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s),
        _ => None,
    }
}

/// `created_at` of an existing document file, if readable
fn read_created_at(path: &Path) -> Option<String> {
    if !path.exists() {
        return None;
    }
    let content = std::fs::read_to_string(path).ok()?;
    let value: serde_json::Value = serde_json::from_str(&content).ok()?;
    value.get("created_at")?.as_str().map(str::to_string)
}

/// Make a document name safe to use as a file name
///
/// Replaces characters that are invalid on common filesystems, collapses
/// whitespace runs and caps the length (in characters).
pub fn sanitize_name(name: &str, max_length: usize) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if INVALID_NAME_CHARS.contains(&c) || c.is_control() {
                REPLACEMENT_CHAR
            } else {
                c
            }
        })
        .collect();

    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
    let capped: String = collapsed.chars().take(max_length).collect();
    capped.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentLink, DocumentNode};
    use tempfile::TempDir;

    fn document(name: &str) -> WorkflowDocument {
        let mut doc = WorkflowDocument::new(name);
        doc.nodes.push(DocumentNode {
            id: "start_00000001".to_string(),
            node_type: "start".to_string(),
            pos: (0.0, 0.0),
            data: Default::default(),
        });
        doc.nodes.push(DocumentNode {
            id: "launcher_00000002".to_string(),
            node_type: "launcher".to_string(),
            pos: (100.0, 0.0),
            data: Default::default(),
        });
        doc.links.push(DocumentLink {
            id: "1".to_string(),
            from_attr: Some("start_00000001_output".to_string()),
            to_attr: Some("launcher_00000002_input".to_string()),
        });
        doc
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("my  workflow ", 100), "my workflow");
        assert_eq!(sanitize_name("a/b\\c:d*e?f", 100), "a_b_c_d_e_f");
        assert_eq!(sanitize_name("<x>|\"y\"", 100), "_x__y_");
        assert_eq!(sanitize_name("abcdef", 3), "abc");
        assert_eq!(sanitize_name("ção ü", 100), "ção ü");
        assert_eq!(sanitize_name("   ", 100), "");
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = WorkflowStore::new(temp_dir.path().join("workflows"));

        assert!(store.save(&document("demo"), None));
        assert!(store.exists("demo"));

        let loaded = store.load("demo").unwrap();
        assert_eq!(loaded.name, "demo");
        assert_eq!(loaded.nodes.len(), 2);
        assert_eq!(loaded.links.len(), 1);
        assert!(store.load("missing").is_none());
    }

    #[test]
    fn test_explicit_name_overrides_document_name() {
        let temp_dir = TempDir::new().unwrap();
        let store = WorkflowStore::new(temp_dir.path());

        assert!(store.save(&document("inner"), Some("outer")));
        assert!(store.exists("outer"));
        assert!(!store.exists("inner"));
    }

    #[test]
    fn test_overwrite_preserves_created_at() {
        let temp_dir = TempDir::new().unwrap();
        let store = WorkflowStore::new(temp_dir.path());

        let mut first = document("demo");
        first.created_at = "2020-01-01T00:00:00.000+00:00".to_string();
        first.updated_at = first.created_at.clone();
        assert!(store.save(&first, None));

        let second = document("demo");
        assert!(store.save(&second, None));

        let loaded = store.load("demo").unwrap();
        assert_eq!(loaded.created_at, "2020-01-01T00:00:00.000+00:00");
        assert_ne!(loaded.updated_at, "2020-01-01T00:00:00.000+00:00");
    }

    #[test]
    fn test_unparsable_file_loads_as_none_and_is_skipped_in_list() {
        let temp_dir = TempDir::new().unwrap();
        let store = WorkflowStore::new(temp_dir.path());

        assert!(store.save(&document("good"), None));
        std::fs::write(temp_dir.path().join("broken.json"), "{ nope").unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), "ignored").unwrap();

        assert!(store.load("broken").is_none());

        let list = store.list();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].name, "good");
        assert_eq!(list[0].file, "good");
        assert_eq!(list[0].node_count, 2);
        assert_eq!(list[0].link_count, 1);
    }

    #[test]
    fn test_list_sorted_and_tolerant_of_sparse_documents() {
        let temp_dir = TempDir::new().unwrap();
        let store = WorkflowStore::new(temp_dir.path());

        assert!(store.save(&document("beta"), None));
        assert!(store.save(&document("alpha"), None));
        std::fs::write(temp_dir.path().join("gamma.json"), r#"{ "version": "1.0" }"#).unwrap();

        let list = store.list();
        let files: Vec<_> = list.iter().map(|s| s.file.as_str()).collect();
        assert_eq!(files, vec!["alpha", "beta", "gamma"]);
        assert_eq!(list[2].name, "gamma");
        assert_eq!(list[2].node_count, 0);
    }

    #[test]
    fn test_try_load_distinguishes_missing_from_malformed() {
        let temp_dir = TempDir::new().unwrap();
        let store = WorkflowStore::new(temp_dir.path());
        std::fs::write(temp_dir.path().join("shapeless.json"), r#"{ "name": "shapeless" }"#).unwrap();

        assert!(matches!(store.try_load("absent"), Err(GraphError::StoreIo(_))));
        assert!(matches!(
            store.try_load("shapeless"),
            Err(GraphError::MalformedDocument(_))
        ));
        assert!(store.load("shapeless").is_none());
    }

    #[test]
    fn test_document_with_bad_entries_still_loads_and_lists() {
        let temp_dir = TempDir::new().unwrap();
        let store = WorkflowStore::new(temp_dir.path());
        std::fs::write(
            temp_dir.path().join("rough.json"),
            r#"{
                "version": "1.0",
                "name": null,
                "created_at": null,
                "nodes": [{ "id": "start_00000001", "type": "start" }, { "id": "broken" }],
                "links": []
            }"#,
        )
        .unwrap();

        let loaded = store.load("rough").unwrap();
        assert_eq!(loaded.nodes.len(), 1);
        assert_eq!(loaded.rejected_nodes.len(), 1);

        let list = store.list();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].name, "rough");
        assert_eq!(list[0].created_at, "");
        assert_eq!(list[0].node_count, 2);
    }

    #[test]
    fn test_list_missing_dir_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = WorkflowStore::new(temp_dir.path().join("nowhere"));
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_delete() {
        let temp_dir = TempDir::new().unwrap();
        let store = WorkflowStore::new(temp_dir.path());

        assert!(store.save(&document("demo"), None));
        assert!(store.delete("demo"));
        assert!(!store.exists("demo"));
        assert!(!store.delete("demo"));
    }

    #[test]
    fn test_unusable_name_is_not_saved() {
        let temp_dir = TempDir::new().unwrap();
        let store = WorkflowStore::new(temp_dir.path());

        assert!(!store.save(&document("  "), None));
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_sanitized_names_share_a_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = WorkflowStore::new(temp_dir.path());

        assert!(store.save(&document("a/b"), None));
        assert!(store.exists("a_b"));
        assert!(store.load("a/b").is_some());
    }
}
