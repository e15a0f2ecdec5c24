//! In-memory patch model mirroring the host's save-file schema.
//!
//! A [`Patch`] is a list of modules plus a list of directed cables between
//! their ports. Exactly one module, referenced by `master_module_id`, is the
//! sink every signal chain ends in.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::catalog::ModuleSpec;
use crate::error::GraphViolation;

/// Save-format version written into every patch (VCV Rack v1).
pub const PATCH_VERSION: &str = "1.1.6";

pub const SINK_PLUGIN: &str = "Core";
pub const SINK_MODEL: &str = "AudioInterface";

/// A port reference. Patches we build use numeric indices; names are accepted
/// when reading files written by other tools.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortId {
    Index(u32),
    Name(String),
}

impl Default for PortId {
    fn default() -> Self {
        PortId::Index(0)
    }
}

impl From<u32> for PortId {
    fn from(index: u32) -> Self {
        PortId::Index(index)
    }
}

impl From<&str> for PortId {
    fn from(name: &str) -> Self {
        PortId::Name(name.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub plugin: String,
    pub model: String,
    pub id: u64,
    #[serde(rename = "pos")]
    pub position: (i32, i32),
}

impl Module {
    pub fn spec(&self) -> ModuleSpec {
        ModuleSpec::new(self.plugin.as_str(), self.model.as_str())
    }

    pub fn is_sink(&self) -> bool {
        self.plugin == SINK_PLUGIN && self.model == SINK_MODEL
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cable {
    pub id: u64,
    pub output_module_id: u64,
    pub output_id: PortId,
    pub input_module_id: u64,
    pub input_id: PortId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patch {
    pub version: String,
    pub modules: Vec<Module>,
    pub cables: Vec<Cable>,
    pub master_module_id: u64,
}

impl Patch {
    pub fn module(&self, id: u64) -> Option<&Module> {
        self.modules.iter().find(|m| m.id == id)
    }

    pub fn sink(&self) -> Option<&Module> {
        self.module(self.master_module_id)
    }

    /// Modules other than the sink, in id order.
    pub fn instruments(&self) -> impl Iterator<Item = &Module> {
        self.modules
            .iter()
            .filter(move |m| m.id != self.master_module_id)
    }

    /// Check the structural invariants of the graph.
    ///
    /// Returns every violation found, not just the first:
    /// - at least one module, ids dense `0..N` in order
    /// - `master_module_id` names an existing module
    /// - cable ids unique, endpoints exist, no self-loops
    /// - the cable graph is acyclic
    /// - every module reaches the master module
    pub fn validate(&self) -> Result<(), Vec<GraphViolation>> {
        let mut errors = Vec::new();

        if self.modules.is_empty() {
            errors.push(GraphViolation::new("modules", "patch has no modules"));
            return Err(errors);
        }

        for (index, module) in self.modules.iter().enumerate() {
            if module.id != index as u64 {
                errors.push(GraphViolation::with_location(
                    "modules",
                    format!("expected id {}, found {}", index, module.id),
                    format!("module {}", index),
                ));
            }
        }

        let ids: HashSet<u64> = self.modules.iter().map(|m| m.id).collect();

        if !ids.contains(&self.master_module_id) {
            errors.push(GraphViolation::new(
                "masterModuleId",
                format!("module {} does not exist", self.master_module_id),
            ));
        }

        let mut cable_ids = HashSet::new();
        let mut edges: HashMap<u64, Vec<u64>> = HashMap::new();
        for cable in &self.cables {
            let location = format!("cable {}", cable.id);
            if !cable_ids.insert(cable.id) {
                errors.push(GraphViolation::with_location(
                    "cables",
                    "duplicate cable id",
                    location.clone(),
                ));
            }
            let mut endpoints_ok = true;
            for (field, id) in [
                ("outputModuleId", cable.output_module_id),
                ("inputModuleId", cable.input_module_id),
            ] {
                if !ids.contains(&id) {
                    endpoints_ok = false;
                    errors.push(GraphViolation::with_location(
                        field,
                        format!("module {} does not exist", id),
                        location.clone(),
                    ));
                }
            }
            if cable.output_module_id == cable.input_module_id {
                endpoints_ok = false;
                errors.push(GraphViolation::with_location(
                    "cables",
                    "cable connects a module to itself",
                    location,
                ));
            }
            if endpoints_ok {
                edges
                    .entry(cable.output_module_id)
                    .or_default()
                    .push(cable.input_module_id);
            }
        }

        if has_cycle(&ids, &edges) {
            errors.push(GraphViolation::new("cables", "cable graph contains a cycle"));
        }

        if ids.contains(&self.master_module_id) {
            let reaching = reaches(self.master_module_id, &edges);
            for module in &self.modules {
                if !reaching.contains(&module.id) {
                    errors.push(GraphViolation::with_location(
                        "cables",
                        format!(
                            "module does not reach master module {}",
                            self.master_module_id
                        ),
                        format!("module {}", module.id),
                    ));
                }
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Kahn's algorithm: the graph is acyclic iff every node gets popped.
fn has_cycle(ids: &HashSet<u64>, edges: &HashMap<u64, Vec<u64>>) -> bool {
    let mut in_degree: HashMap<u64, usize> = ids.iter().map(|id| (*id, 0)).collect();
    for targets in edges.values() {
        for target in targets {
            *in_degree.entry(*target).or_default() += 1;
        }
    }

    let mut queue: VecDeque<u64> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(id, _)| *id)
        .collect();
    let mut visited = 0;

    while let Some(id) = queue.pop_front() {
        visited += 1;
        for target in edges.get(&id).into_iter().flatten() {
            if let Some(degree) = in_degree.get_mut(target) {
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(*target);
                }
            }
        }
    }

    visited != in_degree.len()
}

/// Ids of every module with a path to `target` (including `target`).
fn reaches(target: u64, edges: &HashMap<u64, Vec<u64>>) -> HashSet<u64> {
    let mut reverse: HashMap<u64, Vec<u64>> = HashMap::new();
    for (source, targets) in edges {
        for t in targets {
            reverse.entry(*t).or_default().push(*source);
        }
    }

    let mut seen = HashSet::from([target]);
    let mut queue = VecDeque::from([target]);
    while let Some(id) = queue.pop_front() {
        for source in reverse.get(&id).into_iter().flatten() {
            if seen.insert(*source) {
                queue.push_back(*source);
            }
        }
    }
    seen
}
