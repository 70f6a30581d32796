//! Workflow subsystem constants
//!
//! Single source of truth for document format values and configuration
//! defaults.

/// Default values for editor configuration
pub mod defaults {
    /// Seconds between autosave attempts
    pub const AUTOSAVE_INTERVAL_SECS: u64 = 30;
    /// Longest sanitized workflow name, in characters
    pub const MAX_NAME_LENGTH: usize = 100;
    /// Shortest workflow name accepted by the session
    pub const MIN_NAME_LENGTH: usize = 3;
    /// Application directory under the platform data dir
    pub const APP_DIR: &str = "arquiteto";
    /// Workflow directory used when no platform data dir exists
    pub const FALLBACK_WORKFLOWS_DIR: &str = "data/workflows";
    /// Name used by serialize when none is given
    pub const WORKFLOW_NAME: &str = "New Workflow";
}

/// Document format values
pub mod document {
    /// Version written into every serialized document
    pub const FORMAT_VERSION: &str = "1.0";
    /// Key custom data is stored under when the catalog names none
    pub const DEFAULT_DATA_FIELD: &str = "value";
    /// Length of the random hex suffix of generated node ids
    pub const ID_SUFFIX_LEN: usize = 8;
}

/// Workflow store layout
pub mod store {
    /// Extension of stored document files
    pub const EXTENSION: &str = "json";
    /// Characters replaced in document file names
    pub const INVALID_NAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];
    /// Replacement for invalid file name characters
    pub const REPLACEMENT_CHAR: char = '_';
}
