//! Style and complexity lookup tables used by the selector.
//!
//! Both keys are open strings. Lookups normalise the key (trim + ASCII
//! lowercase) and fall back to `default_style` / `default_count` instead of
//! failing, so every request maps to *some* pool and count.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::error::ConfigurationError;

pub const DEFAULT_STYLE: &str = "experimental";
pub const DEFAULT_COUNT: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionTables {
    /// Style used when the requested style has no pool.
    #[serde(default = "default_style")]
    pub default_style: String,

    /// Module count used for unknown complexity tiers.
    #[serde(default = "default_count")]
    pub default_count: usize,

    /// Style -> ordered candidate model names.
    #[serde(default)]
    pub styles: BTreeMap<String, Vec<String>>,

    /// Complexity tier -> target module count.
    #[serde(default)]
    pub complexities: BTreeMap<String, usize>,
}

fn default_style() -> String {
    DEFAULT_STYLE.to_string()
}

fn default_count() -> usize {
    DEFAULT_COUNT
}

fn normalize(key: &str) -> String {
    key.trim().to_ascii_lowercase()
}

/// Drop repeated model names, keeping the first occurrence.
fn dedup_pool(pool: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    pool.iter()
        .filter(|model| seen.insert(model.as_str()))
        .cloned()
        .collect()
}

fn pool(models: &[&str]) -> Vec<String> {
    models.iter().map(|m| m.to_string()).collect()
}

impl Default for SelectionTables {
    fn default() -> Self {
        let styles = BTreeMap::from([
            (
                "acid".to_string(),
                pool(&["VCO", "VCF", "VCA", "Delay", "ADSR", "SEQ3"]),
            ),
            (
                "ambient".to_string(),
                pool(&["VCO", "LFO", "VCF", "Delay", "VCMixer", "Noise"]),
            ),
            (
                "drone".to_string(),
                pool(&["VCO", "VCO2", "LFO", "VCF", "VCMixer"]),
            ),
            (
                "techno".to_string(),
                pool(&["VCO", "VCF", "VCA", "ADSR", "SEQ3", "LFO", "Delay"]),
            ),
            (
                DEFAULT_STYLE.to_string(),
                pool(&[
                    "VCO", "VCO2", "VCF", "VCA", "LFO", "LFO2", "Delay", "ADSR", "Noise",
                    "Random", "SEQ3", "VCMixer",
                ]),
            ),
        ]);

        let complexities = BTreeMap::from([
            ("simple".to_string(), 3),
            ("intermediate".to_string(), 5),
            ("advanced".to_string(), 7),
        ]);

        Self {
            default_style: default_style(),
            default_count: DEFAULT_COUNT,
            styles,
            complexities,
        }
    }
}

impl SelectionTables {
    /// Load tables from a JSON file. Missing sections fall back to empty maps.
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigurationError::Missing {
            path: path.to_path_buf(),
            source,
        })?;
        let tables: Self =
            serde_json::from_str(&json).map_err(|source| ConfigurationError::Unparsable {
                what: format!("selection tables {}", path.display()),
                source,
            })?;
        tables.normalized()
    }

    /// Lowercase every key, deduplicate pools and check that the default
    /// style exists. Keys that collide after lowercasing are rejected.
    pub fn normalized(self) -> Result<Self, ConfigurationError> {
        let mut styles: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (key, pool) in self.styles {
            let style = normalize(&key);
            if styles.insert(style.clone(), dedup_pool(&pool)).is_some() {
                return Err(ConfigurationError::InvalidTables(format!(
                    "style '{}' is defined more than once",
                    style
                )));
            }
        }

        let mut complexities = BTreeMap::new();
        for (key, count) in self.complexities {
            let tier = normalize(&key);
            if complexities.insert(tier.clone(), count).is_some() {
                return Err(ConfigurationError::InvalidTables(format!(
                    "complexity '{}' is defined more than once",
                    tier
                )));
            }
        }
        let default_style = normalize(&self.default_style);

        if !styles.is_empty() && !styles.contains_key(&default_style) {
            return Err(ConfigurationError::InvalidTables(format!(
                "default style '{}' has no pool",
                default_style
            )));
        }

        Ok(Self {
            default_style,
            default_count: self.default_count,
            styles,
            complexities,
        })
    }

    /// Pool for a known style, or `None` when the style is unknown or empty.
    pub fn style_pool(&self, style: &str) -> Option<&[String]> {
        self.styles
            .get(&normalize(style))
            .map(Vec::as_slice)
            .filter(|pool| !pool.is_empty())
    }

    pub fn default_pool(&self) -> Option<&[String]> {
        self.style_pool(&self.default_style)
    }

    /// Candidate pool for `style`, following the fallback chain
    /// requested style -> default style -> every model in the catalog.
    ///
    /// The result never repeats a model name.
    pub fn resolve_pool(&self, style: &str, catalog: &Catalog) -> Vec<String> {
        self.style_pool(style)
            .or_else(|| self.default_pool())
            .map(dedup_pool)
            .unwrap_or_else(|| catalog.all_models())
    }

    pub fn target_count(&self, complexity: &str) -> usize {
        self.complexities
            .get(&normalize(complexity))
            .copied()
            .unwrap_or(self.default_count)
    }

    /// Pool entries that no catalog plugin provides, as `(style, model)`.
    pub fn stale_models(&self, catalog: &Catalog) -> Vec<(String, String)> {
        self.styles
            .iter()
            .flat_map(|(style, pool)| pool.iter().map(move |model| (style, model)))
            .filter(|(_, model)| catalog.resolve(model).is_none())
            .map(|(style, model)| (style.clone(), model.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_count_table() {
        let tables = SelectionTables::default();
        assert_eq!(tables.target_count("simple"), 3);
        assert_eq!(tables.target_count("intermediate"), 5);
        assert_eq!(tables.target_count("advanced"), 7);
        assert_eq!(tables.target_count("galaxy-brain"), DEFAULT_COUNT);
        assert_eq!(tables.target_count("  Advanced "), 7);
    }

    #[test]
    fn test_unknown_style_uses_default_pool() {
        let tables = SelectionTables::default();
        let catalog = Catalog::from_entries([("Fundamental", vec!["VCO"])]).unwrap();
        assert_eq!(
            tables.resolve_pool("unknown-style", &catalog),
            tables.resolve_pool(DEFAULT_STYLE, &catalog)
        );
        assert_eq!(
            tables.resolve_pool("ACID", &catalog),
            tables.styles["acid"]
        );
    }

    #[test]
    fn test_empty_default_pool_falls_back_to_catalog() {
        let tables = SelectionTables {
            default_style: "experimental".into(),
            default_count: 4,
            styles: BTreeMap::from([("experimental".to_string(), vec![])]),
            complexities: BTreeMap::new(),
        };
        let catalog =
            Catalog::from_entries([("Fundamental", vec!["VCO", "VCA"]), ("Befaco", vec!["VCO"])])
                .unwrap();
        assert_eq!(tables.resolve_pool("acid", &catalog), vec!["VCA", "VCO"]);
    }

    #[test]
    fn test_stale_models() {
        let tables = SelectionTables {
            styles: BTreeMap::from([
                ("experimental".to_string(), vec!["VCO".into(), "Gone".into()]),
            ]),
            ..SelectionTables::default()
        };
        let catalog = Catalog::from_entries([("Fundamental", vec!["VCO"])]).unwrap();
        assert_eq!(
            tables.stale_models(&catalog),
            vec![("experimental".to_string(), "Gone".to_string())]
        );
    }

    #[test]
    fn test_load_normalizes_keys() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(
            br#"{
                "default_style": "Ambient",
                "styles": {"Ambient": ["VCO", "LFO"]},
                "complexities": {"Huge": 9}
            }"#,
        )
        .unwrap();

        let tables = SelectionTables::load(file.path()).unwrap();
        assert_eq!(tables.default_style, "ambient");
        assert_eq!(tables.target_count("huge"), 9);
        assert_eq!(tables.default_count, DEFAULT_COUNT);
        assert_eq!(tables.default_pool().unwrap(), ["VCO", "LFO"]);
    }

    #[test]
    fn test_load_deduplicates_pools() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"{"styles": {"experimental": ["VCO", "VCO", "VCF", "VCO"]}}"#)
            .unwrap();

        let tables = SelectionTables::load(file.path()).unwrap();
        assert_eq!(tables.default_pool().unwrap(), ["VCO", "VCF"]);
    }

    #[test]
    fn test_hand_built_pool_is_deduplicated_on_resolve() {
        let tables = SelectionTables {
            styles: BTreeMap::from([(
                "experimental".to_string(),
                ["Delay", "VCO", "Delay", "VCO"].map(String::from).to_vec(),
            )]),
            ..SelectionTables::default()
        };
        let catalog = Catalog::from_entries([("Fundamental", vec!["VCO", "Delay"])]).unwrap();
        assert_eq!(tables.resolve_pool("acid", &catalog), vec!["Delay", "VCO"]);
    }

    #[test]
    fn test_load_rejects_colliding_keys() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(
            br#"{"styles": {"Acid": ["VCO"], "acid": ["VCF"], "experimental": ["VCO"]}}"#,
        )
        .unwrap();
        assert!(matches!(
            SelectionTables::load(file.path()),
            Err(ConfigurationError::InvalidTables(msg)) if msg.contains("acid")
        ));

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"{"complexities": {"simple": 3, " Simple ": 4}}"#)
            .unwrap();
        assert!(matches!(
            SelectionTables::load(file.path()),
            Err(ConfigurationError::InvalidTables(_))
        ));
    }

    #[test]
    fn test_load_rejects_missing_default_style() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"{"styles": {"ambient": ["VCO"]}}"#).unwrap();
        assert!(matches!(
            SelectionTables::load(file.path()),
            Err(ConfigurationError::InvalidTables(_))
        ));
    }

    #[test]
    fn test_load_missing_and_invalid_files() {
        assert!(matches!(
            SelectionTables::load(Path::new("/nonexistent/tables.json")),
            Err(ConfigurationError::Missing { .. })
        ));

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{ nope").unwrap();
        assert!(matches!(
            SelectionTables::load(file.path()),
            Err(ConfigurationError::Unparsable { .. })
        ));
    }
}
