//! # xfem-topology
//!
//! xfem-topology maintains the topology of a 2D finite-element mesh that is
//! being cut by cracks, using the phantom-node approach of the extended
//! finite element method (XFEM). Elements crossed by a crack are replaced by
//! overlaying child elements, each covering one physical fragment and
//! carrying duplicated phantom nodes for the part that lies across the crack.
//!
//! ## Layout
//! - [`topology`]: nodes, edges, fragments and elements with their local
//!   predicates.
//! - [`cut_mesh`]: the [`CutMesh`](cut_mesh::CutMesh) engine running the
//!   neighbor, intersection, fragment, child, stitching and crack-tip stages.
//! - [`cut`]: geometric and state-driven cut definitions.
//! - [`xfem`]: an adapter that rebuilds the engine from a host mesh on every
//!   update and writes new nodes and elements back.
//! - [`geometry`]: the planar helpers used for cut positions and areas.
//!
//! ## Determinism
//!
//! Elements and nodes are kept in ordered maps and every stage visits them in
//! id order, so the same input always produces the same ids.
//!
//! ## Invariant checking
//!
//! Stages validate the whole mesh after they mutate it when
//! [`TopologyOptions::check_invariants`](cut_mesh::TopologyOptions) is set,
//! in debug builds, or with the `check-invariants` / `strict-invariants`
//! features. See [`DebugInvariants`].

pub mod cut;
pub mod cut_mesh;
pub mod debug_invariants;
pub mod geometry;
pub mod mesh_error;
pub mod topology;
pub mod xfem;

pub use debug_invariants::DebugInvariants;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::cut::{GeometricCut, GeometricCutSource, PlaneCut};
    pub use crate::cut_mesh::{CutMesh, MergedEdgeMap, NewNode, TopologyDelta, TopologyOptions};
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::mesh_error::CutMeshError;
    pub use crate::topology::{
        Edge, Element, ElementHandle, ElementState, Fragment, NodeCategory, NodeHandle, NodeKey,
    };
    pub use crate::xfem::{HostMesh, Xfem, XfemOptions};
}
