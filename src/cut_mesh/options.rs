//! Configuration of the cut-mesh engine.

use serde::{Deserialize, Serialize};

/// Tunables of the topology pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyOptions {
    /// Unify duplicated nodes across neighbor edges that carry no cut.
    pub merge_uncut_virtual_edges: bool,
    /// Run the whole-mesh validation after every mutating stage.
    pub check_invariants: bool,
    /// Position tolerance for comparing intersections on an edge.
    pub intersection_tolerance: f64,
}

impl Default for TopologyOptions {
    fn default() -> Self {
        Self {
            merge_uncut_virtual_edges: true,
            check_invariants: true,
            intersection_tolerance: 1e-4,
        }
    }
}

impl TopologyOptions {
    /// Whether post-stage validation runs, either requested at runtime or
    /// compiled in through the invariant features.
    pub fn validation_enabled(&self) -> bool {
        self.check_invariants
            || cfg!(any(
                debug_assertions,
                feature = "check-invariants",
                feature = "strict-invariants"
            ))
    }
}
