//! Engine facade: catalog + selector + graph builder behind one call.
//!
//! `generate` is a pure function of (catalog, tables, request, rng). Persisting
//! the result is left to the caller.

use std::path::Path;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::error::{ConfigurationError, EngineError};
use crate::graph::GraphBuilder;
use crate::patch::Patch;
use crate::selector::ModuleSelector;
use crate::serializer;
use crate::tables::SelectionTables;

pub const PATCH_FILE_EXTENSION: &str = "vcv";

/// Longest style or complexity component kept in a file name.
pub const MAX_NAME_COMPONENT: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub style: String,
    pub complexity: String,
    /// Fixes the random draw so the same request yields the same patch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl GenerateRequest {
    pub fn new(style: impl Into<String>, complexity: impl Into<String>) -> Self {
        Self {
            style: style.into(),
            complexity: complexity.into(),
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Destination file name, `<style>_<complexity>.vcv`.
    ///
    /// Depends only on style and complexity, so two concurrent requests with
    /// the same pair target the same name. Storage must write atomically.
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}.{}",
            sanitize_component(&self.style),
            sanitize_component(&self.complexity),
            PATCH_FILE_EXTENSION
        )
    }
}

/// Lowercase, replace anything outside `[a-z0-9-]` with `-` and cut to
/// [`MAX_NAME_COMPONENT`] characters.
fn sanitize_component(value: &str) -> String {
    let cleaned: String = value
        .trim()
        .to_ascii_lowercase()
        .chars()
        .take(MAX_NAME_COMPONENT)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "default".to_string()
    } else {
        cleaned
    }
}

/// A generated patch together with its encoded file contents.
#[derive(Debug, Clone)]
pub struct GeneratedPatch {
    pub patch: Patch,
    pub bytes: Vec<u8>,
    pub file_name: String,
}

#[derive(Debug, Clone)]
pub struct PatchEngine {
    catalog: Arc<Catalog>,
    selector: ModuleSelector,
    builder: GraphBuilder,
}

impl PatchEngine {
    pub fn new(catalog: Arc<Catalog>, tables: SelectionTables) -> Self {
        Self {
            catalog,
            selector: ModuleSelector::new(tables),
            builder: GraphBuilder::default(),
        }
    }

    /// Load the catalog (required) and selection tables (optional, built-in
    /// defaults otherwise).
    pub fn load(catalog: &Path, tables: Option<&Path>) -> Result<Self, ConfigurationError> {
        let catalog = Catalog::load(catalog)?;
        let tables = match tables {
            Some(path) => SelectionTables::load(path)?,
            None => SelectionTables::default(),
        };
        Ok(Self::new(Arc::new(catalog), tables))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn tables(&self) -> &SelectionTables {
        self.selector.tables()
    }

    /// Select, wire and check a patch using the given random source.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        request: &GenerateRequest,
        rng: &mut R,
    ) -> Result<Patch, EngineError> {
        let selected =
            self.selector
                .select(&request.style, &request.complexity, &self.catalog, rng)?;
        let patch = self.builder.build(&selected);
        patch.validate().map_err(EngineError::InvalidGraph)?;
        Ok(patch)
    }

    /// Generate with the request's seed, or the thread RNG when unseeded, and
    /// encode the result.
    pub fn generate_file(&self, request: &GenerateRequest) -> Result<GeneratedPatch, EngineError> {
        let patch = match request.seed {
            Some(seed) => self.generate(request, &mut StdRng::seed_from_u64(seed))?,
            None => self.generate(request, &mut rand::rng())?,
        };
        let bytes = serializer::serialize(&patch)?;
        Ok(GeneratedPatch {
            patch,
            bytes,
            file_name: request.file_name(),
        })
    }
}
