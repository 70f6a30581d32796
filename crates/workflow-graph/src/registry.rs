//! Node type registry
//!
//! This module provides the read-only catalog that maps node type keys to
//! their metadata (ports, category, default position, custom data shape).
//! The catalog is parsed once; later `load` calls are no-ops.
//!
//! # Usage
//!
//! ```ignore
//! use workflow_graph::{CatalogSource, NodeTypeRegistry};
//!
//! let mut registry = NodeTypeRegistry::new(CatalogSource::BuiltIn);
//! registry.load()?;
//! assert!(registry.is_valid("start"));
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use serde_json::{Map, Value};

use crate::error::{GraphError, Result};
use crate::types::{NodeCategory, NodeType};

/// Catalog shipped with the crate
const BUILTIN_CATALOG: &str = include_str!("../catalog/node_types.json");

/// Where the registry reads its catalog from
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogSource {
    /// The catalog embedded in the crate
    BuiltIn,
    /// A JSON file on disk
    File(PathBuf),
}

/// Registry of node types, in catalog declaration order
#[derive(Debug)]
pub struct NodeTypeRegistry {
    source: CatalogSource,
    types: Vec<NodeType>,
    index: HashMap<String, usize>,
    loaded: bool,
}

impl NodeTypeRegistry {
    /// Create an unloaded registry for the given source
    pub fn new(source: CatalogSource) -> Self {
        Self {
            source,
            types: Vec::new(),
            index: HashMap::new(),
            loaded: false,
        }
    }

    /// Create and load a registry in one step
    pub fn load_from(source: CatalogSource) -> Result<Self> {
        let mut registry = Self::new(source);
        registry.load()?;
        Ok(registry)
    }

    /// Create a loaded registry from catalog JSON
    pub fn from_json_str(json: &str) -> Result<Self> {
        let mut registry = Self::new(CatalogSource::BuiltIn);
        registry.install(parse_catalog(json)?);
        Ok(registry)
    }

    /// Parse the catalog
    ///
    /// Idempotent: once loaded, later calls return immediately. A missing
    /// catalog file is `CatalogMissing`, which callers treat as fatal.
    pub fn load(&mut self) -> Result<()> {
        if self.loaded {
            return Ok(());
        }

        let json = match &self.source {
            CatalogSource::BuiltIn => BUILTIN_CATALOG.to_string(),
            CatalogSource::File(path) => {
                if !path.is_file() {
                    return Err(GraphError::CatalogMissing(path.clone()));
                }
                std::fs::read_to_string(path)?
            }
        };

        let types = parse_catalog(&json)?;
        self.install(types);
        log::info!(
            "Loaded node type catalog ({:?}): {} types",
            self.source,
            self.types.len()
        );
        Ok(())
    }

    fn install(&mut self, types: Vec<NodeType>) {
        self.index = types
            .iter()
            .enumerate()
            .map(|(i, ty)| (ty.key.clone(), i))
            .collect();
        self.types = types;
        self.loaded = true;
    }

    /// Get metadata for a node type
    pub fn get(&self, key: &str) -> Option<&NodeType> {
        self.index.get(key).map(|&i| &self.types[i])
    }

    /// List node type keys in a category, in declaration order
    pub fn list_keys(&self, category: NodeCategory) -> Vec<&str> {
        self.types
            .iter()
            .filter(|ty| ty.card_category == category)
            .map(|ty| ty.key.as_str())
            .collect()
    }

    /// List all node type keys, in declaration order
    pub fn all_keys(&self) -> Vec<&str> {
        self.types.iter().map(|ty| ty.key.as_str()).collect()
    }

    /// Check if a node type is registered
    pub fn is_valid(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Parse catalog JSON (`{ typeKey: { label, hasInput, ... } }`)
fn parse_catalog(json: &str) -> Result<Vec<NodeType>> {
    let entries: Map<String, Value> =
        serde_json::from_str(json).map_err(|e| GraphError::CatalogParse(e.to_string()))?;

    entries
        .into_iter()
        .map(|(key, value)| {
            let mut node_type: NodeType = serde_json::from_value(value)
                .map_err(|e| GraphError::CatalogParse(format!("'{}': {}", key, e)))?;
            node_type.key = key;
            Ok(node_type)
        })
        .collect()
}
