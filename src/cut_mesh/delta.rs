//! Outputs of one topology update.

use crate::cut_mesh::stitch::MergedEdgeMap;
use crate::topology::node::NodeKey;
use std::collections::BTreeSet;

/// A permanent node created by the update, with the node it duplicates.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct NewNode {
    pub key: NodeKey,
    pub parent: Option<NodeKey>,
}

/// Everything `update_topology` changed, in the order the host needs to
/// apply it: add the new nodes, add the children, drop the parents.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TopologyDelta {
    /// Materialized child elements, by id.
    pub child_elements: Vec<u32>,
    /// Elements that were duplicated and are now ancestry only.
    pub parent_elements: Vec<u32>,
    /// Permanent nodes created by the update.
    pub new_nodes: Vec<NewNode>,
    /// Node pairs unified across neighboring children.
    pub merged_edges: MergedEdgeMap,
    /// Crack-tip elements after the update.
    pub crack_tip_elements: BTreeSet<u32>,
}

impl TopologyDelta {
    /// Whether the update changed the mesh at all.
    pub fn is_empty(&self) -> bool {
        self.child_elements.is_empty() && self.parent_elements.is_empty() && self.new_nodes.is_empty()
    }
}
