//! Turns a module selection into a wired patch.
//!
//! The topology is a single chain `0 -> 1 -> ... -> k`, where `k` is the sink.
//! No port metadata is available for catalog modules, so every cable runs from
//! output 0 to input 0.

use crate::catalog::ModuleSpec;
use crate::patch::{Cable, Module, PATCH_VERSION, Patch, PortId, SINK_MODEL, SINK_PLUGIN};

/// Horizontal distance between module slots, in rack HP.
pub const DEFAULT_SPACING: i32 = 12;

/// Cable colors cycled in cable order (the host's default palette).
pub const CABLE_COLORS: [&str; 4] = ["#c91847", "#0986ad", "#0c8e15", "#c9b70e"];

#[derive(Debug, Clone)]
pub struct GraphBuilder {
    spacing: i32,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self {
            spacing: DEFAULT_SPACING,
        }
    }
}

impl GraphBuilder {
    pub fn with_spacing(spacing: i32) -> Self {
        Self { spacing }
    }

    pub fn build(&self, selected: &[ModuleSpec]) -> Patch {
        let sink = ModuleSpec::new(SINK_PLUGIN, SINK_MODEL);

        let modules: Vec<Module> = selected
            .iter()
            .chain(std::iter::once(&sink))
            .enumerate()
            .map(|(i, spec)| Module {
                plugin: spec.plugin.clone(),
                model: spec.model.clone(),
                id: i as u64,
                position: (i as i32 * self.spacing, 0),
            })
            .collect();

        let cables = modules
            .windows(2)
            .enumerate()
            .map(|(i, pair)| Cable {
                id: i as u64,
                output_module_id: pair[0].id,
                output_id: PortId::Index(0),
                input_module_id: pair[1].id,
                input_id: PortId::Index(0),
                color: Some(CABLE_COLORS[i % CABLE_COLORS.len()].to_string()),
            })
            .collect();

        Patch {
            version: PATCH_VERSION.to_string(),
            modules,
            cables,
            master_module_id: selected.len() as u64,
        }
    }
}
