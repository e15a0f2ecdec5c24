//! The module catalog: every (plugin, model) pair a generated patch may use.
//!
//! A [`Catalog`] is loaded once at startup and never mutated afterwards. It is
//! shared between request handlers behind an `Arc`.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// A (plugin, model) pair identifying one module type in the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleSpec {
    pub plugin: String,
    pub model: String,
}

impl ModuleSpec {
    pub fn new(plugin: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            model: model.into(),
        }
    }
}

/// Immutable mapping plugin name -> set of model names.
///
/// Plugins are kept sorted so that resolving a model name shared by several
/// plugins always picks the same one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Catalog {
    plugins: BTreeMap<String, BTreeSet<String>>,
}

impl Catalog {
    /// Load a catalog from a JSON file of the form `{"Plugin": ["Model", ...]}`.
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigurationError::Missing {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json).map_err(|err| match err {
            ConfigurationError::Unparsable { source, .. } => ConfigurationError::Unparsable {
                what: format!("catalog {}", path.display()),
                source,
            },
            other => other,
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigurationError> {
        let raw: BTreeMap<String, Vec<String>> =
            serde_json::from_str(json).map_err(|source| ConfigurationError::Unparsable {
                what: "catalog".to_string(),
                source,
            })?;
        Self::from_entries(raw)
    }

    /// Build a catalog from in-memory entries.
    ///
    /// Fails with [`ConfigurationError::EmptyCatalog`] when no plugin carries a
    /// model. Plugins with an empty model list are dropped.
    pub fn from_entries<P, M, I>(entries: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = (P, M)>,
        P: Into<String>,
        M: IntoIterator,
        M::Item: Into<String>,
    {
        let mut plugins: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (plugin, models) in entries {
            let models: BTreeSet<String> = models
                .into_iter()
                .map(Into::into)
                .filter(|m: &String| !m.trim().is_empty())
                .collect();
            if models.is_empty() {
                continue;
            }
            plugins.entry(plugin.into()).or_default().extend(models);
        }

        if plugins.is_empty() {
            return Err(ConfigurationError::EmptyCatalog);
        }

        Ok(Self { plugins })
    }

    pub fn contains(&self, plugin: &str, model: &str) -> bool {
        self.plugins
            .get(plugin)
            .is_some_and(|models| models.contains(model))
    }

    pub fn contains_spec(&self, spec: &ModuleSpec) -> bool {
        self.contains(&spec.plugin, &spec.model)
    }

    /// Find the first plugin (in sorted order) that provides `model`.
    pub fn resolve(&self, model: &str) -> Option<ModuleSpec> {
        self.plugins
            .iter()
            .find(|(_, models)| models.contains(model))
            .map(|(plugin, _)| ModuleSpec::new(plugin.as_str(), model))
    }

    pub fn plugins(&self) -> impl Iterator<Item = &str> {
        self.plugins.keys().map(String::as_str)
    }

    pub fn models<'a>(&'a self, plugin: &str) -> Option<impl Iterator<Item = &'a str> + use<'a>> {
        self.plugins
            .get(plugin)
            .map(|models| models.iter().map(String::as_str))
    }

    /// Every model name across all plugins, deduplicated and sorted.
    pub fn all_models(&self) -> Vec<String> {
        self.plugins
            .values()
            .flatten()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }

    /// Number of (plugin, model) pairs.
    pub fn len(&self) -> usize {
        self.plugins.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<'de> Deserialize<'de> for Catalog {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = BTreeMap::<String, Vec<String>>::deserialize(deserializer)?;
        Catalog::from_entries(raw).map_err(serde::de::Error::custom)
    }
}
