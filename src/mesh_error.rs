//! CutMeshError: unified error type for the cut-mesh topology engine
//!
//! Every public operation of the engine and of the XFEM adapter returns
//! `Result<_, CutMeshError>`. The variants fall into three groups: invalid
//! input, topology invariant violations, and use of references that did not
//! survive a reset.

use crate::topology::node::NodeKey;
use thiserror::Error;

/// Unified error type for cut-mesh operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CutMeshError {
    // -------------------------------------------------------------------------
    // Invalid input
    // -------------------------------------------------------------------------
    /// Bulk ingestion was handed no elements.
    #[error("initial connectivity is empty")]
    EmptyConnectivity,
    /// Element connectivity with an unsupported number of nodes.
    #[error("element connectivity must have 3 or 4 nodes, got {found}")]
    InvalidElementArity { found: usize },
    /// An element connectivity lists the same node twice.
    #[error("element connectivity repeats node {node}")]
    RepeatedNode { node: u32 },
    /// An element id was registered twice.
    #[error("element {0} already exists")]
    DuplicateElement(u32),
    /// The requested element does not exist.
    #[error("element {0} not found")]
    UnknownElement(u32),
    /// The requested node does not exist in its pool.
    #[error("node {0} not found")]
    UnknownNode(NodeKey),
    /// An edge index beyond the element's edge count.
    #[error("edge {edge} out of range for element {element} with {num_edges} edges")]
    EdgeOutOfRange {
        element: u32,
        edge: usize,
        num_edges: usize,
    },
    /// A parametric position outside `[0, 1]`.
    #[error("parametric position {0} is outside [0, 1]")]
    PositionOutOfRange(f64),
    /// A cut that cannot be placed on its edge, such as one between two
    /// coincident points.
    #[error("invalid intersection: {0}")]
    InvalidIntersection(String),
    /// A new cut disagrees with the one already stored on an edge.
    #[error(
        "edge {edge} of element {element} already has an intersection at {existing}, cannot add one at {position}"
    )]
    IntersectionMismatch {
        element: u32,
        edge: usize,
        position: f64,
        existing: f64,
    },
    /// A cut was replayed with a different embedded node than the one stored.
    #[error("edge {edge} of element {element} carries embedded node {existing}, not {requested}")]
    EmbeddedNodeMismatch {
        element: u32,
        edge: usize,
        existing: NodeKey,
        requested: NodeKey,
    },
    /// Two elements sharing an edge disagree about the cut on it.
    #[error(
        "shared edge between element {element} (edge {edge}) and element {neighbor} (edge {neighbor_edge}) has mismatched intersections"
    )]
    NeighborIntersectionMismatch {
        element: u32,
        edge: usize,
        neighbor: u32,
        neighbor_edge: usize,
    },
    /// A node was used as an edge endpoint it does not belong to.
    #[error("node {node} is not an endpoint of edge ({first}, {second})")]
    NodeNotOnEdge {
        node: NodeKey,
        first: NodeKey,
        second: NodeKey,
    },

    // -------------------------------------------------------------------------
    // Topology invariant violations
    // -------------------------------------------------------------------------
    /// A fragment boundary has a gap.
    #[error("fragment {fragment} of element {element} is not a closed loop")]
    OpenFragment { element: u32, fragment: usize },
    /// Two neighbors see their shared edge with the same orientation.
    #[error("elements {element} and {neighbor} overlay each other on a shared edge")]
    InconsistentWinding { element: u32, neighbor: u32 },
    /// Edge neighbor lists are not mutual.
    #[error("element {neighbor} is a neighbor of element {element} but not vice versa")]
    AsymmetricNeighbors { element: u32, neighbor: u32 },
    /// More than two elements claim the same edge.
    #[error("edge {edge} of element {element} already has two neighbors")]
    TooManyEdgeNeighbors { element: u32, edge: usize },
    /// An element holds a fragment count the current stage cannot handle.
    #[error("element {element} has {found} fragments: {context}")]
    FragmentCount {
        element: u32,
        found: usize,
        context: &'static str,
    },
    /// Two nodes cannot be unified.
    #[error("cannot merge node {first} with node {second}: {reason}")]
    IllegalMerge {
        first: NodeKey,
        second: NodeKey,
        reason: &'static str,
    },
    /// Any other broken topology invariant, with a description.
    #[error("topology invariant violated: {0}")]
    Invariant(String),

    // -------------------------------------------------------------------------
    // Lifetime violations
    // -------------------------------------------------------------------------
    /// A handle refers to an object from an earlier generation.
    #[error("stale handle to {what} {id}: created in generation {handle}, current is {current}")]
    StaleHandle {
        what: &'static str,
        id: u32,
        handle: u64,
        current: u64,
    },
    /// Temporary nodes survived a topology update.
    #[error("{0} temporary nodes survived the topology update")]
    LeakedTemporaryNodes(usize),

    // -------------------------------------------------------------------------
    // Host-side errors
    // -------------------------------------------------------------------------
    /// The host mesh has no such element.
    #[error("host element {0} not found")]
    UnknownHostElement(u32),
    /// The host mesh has no such node.
    #[error("host node {0} not found")]
    UnknownHostNode(u32),
    /// An element was marked twice in the same update cycle.
    #[error("element {0} is already state-marked for cutting")]
    DuplicateStateMark(u32),
    /// `get_cut_plane` quantity index outside `0..6`.
    #[error("cut plane quantity {0} is not in 0..6")]
    InvalidCutPlaneQuantity(usize),
    /// Degenerate geometry encountered while evaluating cuts or fractions.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),
}
