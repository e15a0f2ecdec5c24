//! Error taxonomy for the generation engine.
//!
//! Unknown style or complexity values are not errors; they resolve through the
//! fallback entries of [`SelectionTables`](crate::tables::SelectionTables).

use std::path::PathBuf;

use thiserror::Error;

/// The catalog or selection tables could not be loaded.
///
/// Fatal to the generation path: an engine cannot be built without a valid
/// catalog, so no request can succeed while this is unresolved.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Configuration file not found: {}", .path.display())]
    Missing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {what}: {source}")]
    Unparsable {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Module catalog is empty")]
    EmptyCatalog,

    #[error("Invalid selection tables: {0}")]
    InvalidTables(String),
}

/// No module drawn for a request could be resolved against the catalog.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("No module in pool for style '{style}' resolves against the catalog (drew {drawn} candidates)")]
pub struct SelectionError {
    pub style: String,
    pub drawn: usize,
}

/// One broken invariant found while checking a patch graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphViolation {
    pub field: String,
    pub message: String,
    pub location: Option<String>,
}

impl GraphViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            location: None,
        }
    }

    pub fn with_location(
        field: impl Into<String>,
        message: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            location: Some(location.into()),
        }
    }
}

impl std::fmt::Display for GraphViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref location) = self.location {
            write!(f, "{}: {} (at {})", self.field, self.message, location)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

/// Anything the engine can fail with while turning a request into patch bytes.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error("Generated patch is invalid: {}", format_violations(.0))]
    InvalidGraph(Vec<GraphViolation>),

    #[error("Failed to serialize patch: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn format_violations(violations: &[GraphViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
