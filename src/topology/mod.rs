//! Topology primitives of the cut mesh.
//!
//! Leaves first: typed node identities and pools, edges with at most one
//! embedded intersection, fragments (closed boundary loops), elements, and
//! the reference-element maps used to place embedded nodes.

pub mod edge;
pub mod element;
pub mod fragment;
pub mod node;
pub mod shape;

pub use edge::{Edge, MasterTerm};
pub use element::{Element, ElementMap, ElementState, FaceNode};
pub use fragment::Fragment;
pub use node::{ElementHandle, Generation, Node, NodeCategory, NodeHandle, NodeKey, NodePool};
