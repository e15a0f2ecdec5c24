//! Patch generation core library
//!
//! Builds VCV Rack patch files from a (style, complexity) request: modules are
//! drawn from a style pool, checked against the module [`Catalog`], chained
//! into the audio interface sink and encoded as the host's JSON save format.
//! It is a pure library; HTTP handling and file storage belong in the server
//! layer.

pub mod catalog;
pub mod engine;
pub mod error;
pub mod graph;
pub mod patch;
pub mod selector;
pub mod serializer;
pub mod tables;

// Re-export commonly used items
pub use catalog::{Catalog, ModuleSpec};
pub use engine::{GenerateRequest, GeneratedPatch, PatchEngine};
pub use error::{ConfigurationError, EngineError, GraphViolation, SelectionError};
pub use graph::GraphBuilder;
pub use patch::{Cable, Module, PATCH_VERSION, Patch, PortId};
pub use selector::ModuleSelector;
pub use tables::SelectionTables;
