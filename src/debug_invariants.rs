//! Invariant checking shared by the topology containers.
//!
//! Pipeline stages call [`DebugInvariants::validate_after`] when
//! [`TopologyOptions::check_invariants`](crate::cut_mesh::options::TopologyOptions)
//! is enabled, so a broken invariant is reported by the stage that broke it.

use crate::mesh_error::CutMeshError;

/// Trait for validating topology invariants.
pub trait DebugInvariants {
    /// Panic on a broken invariant when invariant checking is compiled in.
    fn debug_assert_invariants(&self);

    /// Validate invariants and return the first error encountered.
    fn validate_invariants(&self) -> Result<(), CutMeshError>;

    /// Validate invariants after the named stage, logging the failing stage.
    fn validate_after(&self, stage: &'static str) -> Result<(), CutMeshError> {
        self.validate_invariants().inspect_err(|e| {
            log::error!("invariants broken after {stage}: {e}");
        })
    }
}

/// Run a fallible check and panic with context on error.
///
/// Compiled only into debug builds or builds with the `check-invariants` or
/// `strict-invariants` feature.
#[macro_export]
macro_rules! debug_invariants {
    ($expr:expr, $($ctx:tt)*) => {
        #[cfg(any(debug_assertions, feature = "strict-invariants", feature = "check-invariants"))]
        if let Err(e) = $expr {
            panic!(concat!("[cut-mesh invariants] ", $($ctx)*, ": {}"), e);
        }
    };
}
