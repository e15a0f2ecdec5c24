//! Picks which modules go into a patch for a given style and complexity.

use rand::Rng;
use rand::seq::index;

use crate::catalog::{Catalog, ModuleSpec};
use crate::error::SelectionError;
use crate::tables::SelectionTables;

#[derive(Debug, Clone, Default)]
pub struct ModuleSelector {
    tables: SelectionTables,
}

impl ModuleSelector {
    pub fn new(tables: SelectionTables) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &SelectionTables {
        &self.tables
    }

    /// Draw `min(count(complexity), |pool(style)|)` distinct models from the
    /// style pool and resolve each against the catalog.
    ///
    /// The draw is uniform and without replacement; the order of the result is
    /// the draw order. Names no catalog plugin provides are skipped.
    pub fn select<R: Rng + ?Sized>(
        &self,
        style: &str,
        complexity: &str,
        catalog: &Catalog,
        rng: &mut R,
    ) -> Result<Vec<ModuleSpec>, SelectionError> {
        let pool = self.tables.resolve_pool(style, catalog);
        let count = self.tables.target_count(complexity).min(pool.len());

        let selected: Vec<ModuleSpec> = index::sample(rng, pool.len(), count)
            .into_iter()
            .filter_map(|i| catalog.resolve(&pool[i]))
            .collect();

        if selected.is_empty() {
            return Err(SelectionError {
                style: style.to_string(),
                drawn: count,
            });
        }

        Ok(selected)
    }
}
