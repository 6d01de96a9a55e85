//! Element and fragment edges with at most one embedded intersection.
//!
//! The intersection position is stored measured from the first endpoint.
//! Queries name the endpoint they measure from and receive `p` or `1 - p`
//! accordingly, so two elements that traverse a shared edge in opposite
//! directions see the same cut.

use crate::mesh_error::CutMeshError;
use crate::topology::node::{NodeCategory, NodeKey};
use std::fmt;

/// One term of an embedded node's interpolation: `value = sum(weight * value(node))`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MasterTerm {
    /// Master node the value is interpolated from.
    pub node: NodeKey,
    /// Interpolation weight of the master.
    pub weight: f64,
}

impl MasterTerm {
    pub fn new(node: NodeKey, weight: f64) -> Self {
        Self { node, weight }
    }
}

/// A straight edge between two nodes.
#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
    nodes: [NodeKey; 2],
    embedded: Option<NodeKey>,
    /// Position of `embedded`, measured from `nodes[0]`.
    position: f64,
}

impl Edge {
    pub fn new(first: NodeKey, second: NodeKey) -> Self {
        Self {
            nodes: [first, second],
            embedded: None,
            position: 0.0,
        }
    }

    #[inline]
    pub fn node(&self, index: usize) -> NodeKey {
        self.nodes[index]
    }

    #[inline]
    pub fn nodes(&self) -> [NodeKey; 2] {
        self.nodes
    }

    /// The embedded intersection node, if the edge is cut.
    #[inline]
    pub fn embedded_node(&self) -> Option<NodeKey> {
        self.embedded
    }

    #[inline]
    pub fn has_intersection(&self) -> bool {
        self.embedded.is_some()
    }

    /// Same endpoints (either order) and same embedded node.
    pub fn equivalent(&self, other: &Edge) -> bool {
        self.is_overlapping(other) && self.embedded == other.embedded
    }

    /// Same endpoints in either order, ignoring cut state.
    pub fn is_overlapping(&self, other: &Edge) -> bool {
        (self.nodes[0] == other.nodes[0] && self.nodes[1] == other.nodes[1])
            || (self.nodes[0] == other.nodes[1] && self.nodes[1] == other.nodes[0])
    }

    /// True when `node` is an endpoint or the embedded node.
    pub fn contains_node(&self, node: NodeKey) -> bool {
        self.nodes[0] == node || self.nodes[1] == node || self.embedded == Some(node)
    }

    /// Both endpoints of `other` lie on this edge.
    pub fn contains_edge(&self, other: &Edge) -> bool {
        self.contains_node(other.nodes[0]) && self.contains_node(other.nodes[1])
    }

    /// One edge lies on the other.
    pub fn is_partial_overlap(&self, other: &Edge) -> bool {
        self.contains_edge(other) || other.contains_edge(self)
    }

    /// Both endpoints are embedded nodes, i.e. the edge runs through the
    /// element interior along a cut.
    pub fn is_interior_edge(&self) -> bool {
        self.nodes[0].is_embedded() && self.nodes[1].is_embedded()
    }

    /// Register a cut at `position` measured from `from_node`.
    ///
    /// Re-adding the same embedded node at the same position is a no-op.
    pub fn add_intersection(
        &mut self,
        position: f64,
        embedded: NodeKey,
        from_node: NodeKey,
        tolerance: f64,
    ) -> Result<(), CutMeshError> {
        if !(0.0..=1.0).contains(&position) {
            return Err(CutMeshError::PositionOutOfRange(position));
        }
        let normalized = self.normalize(position, from_node)?;
        if let Some(existing) = self.embedded {
            if existing != embedded || (self.position - normalized).abs() > tolerance {
                return Err(CutMeshError::Invariant(format!(
                    "edge {self} already carries a cut, cannot add {embedded} at {normalized}"
                )));
            }
            return Ok(());
        }
        self.embedded = Some(embedded);
        self.position = normalized;
        Ok(())
    }

    /// Whether the edge is cut at `position` measured from `from_node`.
    pub fn has_intersection_at_position(
        &self,
        position: f64,
        from_node: NodeKey,
        tolerance: f64,
    ) -> Result<bool, CutMeshError> {
        if self.embedded.is_none() {
            return Ok(false);
        }
        let normalized = self.normalize(position, from_node)?;
        Ok((self.position - normalized).abs() < tolerance)
    }

    /// Cut position measured from `from_node`.
    pub fn intersection(&self, from_node: NodeKey) -> Result<f64, CutMeshError> {
        if self.embedded.is_none() {
            return Err(CutMeshError::Invariant(format!("edge {self} is not cut")));
        }
        self.normalize(self.position, from_node)
    }

    /// Parametric distance of `node` from the first endpoint, if it lies on the edge.
    pub fn distance_from_first(&self, node: NodeKey) -> Option<f64> {
        if node == self.nodes[0] {
            Some(0.0)
        } else if node == self.nodes[1] {
            Some(1.0)
        } else if self.embedded == Some(node) {
            Some(self.position)
        } else {
            None
        }
    }

    /// Interpolation masters of a node on this edge.
    ///
    /// An endpoint is its own master. The embedded node is interpolated
    /// linearly from both endpoints.
    pub fn node_masters(&self, node: NodeKey) -> Option<Vec<MasterTerm>> {
        if node == self.nodes[0] || node == self.nodes[1] {
            Some(vec![MasterTerm::new(node, 1.0)])
        } else if self.embedded == Some(node) {
            Some(vec![
                MasterTerm::new(self.nodes[0], 1.0 - self.position),
                MasterTerm::new(self.nodes[1], self.position),
            ])
        } else {
            None
        }
    }

    /// Replace `old` by `new` wherever it appears on the edge.
    pub fn switch_node(&mut self, new: NodeKey, old: NodeKey) {
        if self.nodes[0] == old {
            self.nodes[0] = new;
        } else if self.nodes[1] == old {
            self.nodes[1] = new;
        } else if self.embedded == Some(old) {
            self.embedded = Some(new);
        }
    }

    /// Drop the cut.
    pub fn remove_embedded_node(&mut self) {
        self.embedded = None;
        self.position = 0.0;
    }

    /// Structural checks: distinct endpoints, an embedded node of the right
    /// category that is not also an endpoint, and a position within `[0, 1]`.
    pub fn consistency_check(&self) -> Result<(), CutMeshError> {
        if self.nodes[0] == self.nodes[1] {
            return Err(CutMeshError::Invariant(format!(
                "edge {self} is degenerate"
            )));
        }
        if let Some(embedded) = self.embedded {
            if embedded.category() != NodeCategory::Embedded {
                return Err(CutMeshError::Invariant(format!(
                    "edge {self} stores non-embedded node {embedded} as its cut"
                )));
            }
            if self.nodes.contains(&embedded) {
                return Err(CutMeshError::Invariant(format!(
                    "edge {self} is cut at one of its own endpoints"
                )));
            }
            if !(0.0..=1.0).contains(&self.position) {
                return Err(CutMeshError::PositionOutOfRange(self.position));
            }
        }
        Ok(())
    }

    fn normalize(&self, position: f64, from_node: NodeKey) -> Result<f64, CutMeshError> {
        if from_node == self.nodes[0] {
            Ok(position)
        } else if from_node == self.nodes[1] {
            Ok(1.0 - position)
        } else {
            Err(CutMeshError::NodeNotOnEdge {
                node: from_node,
                first: self.nodes[0],
                second: self.nodes[1],
            })
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.nodes[0], self.nodes[1])?;
        if let Some(embedded) = self.embedded {
            write!(f, "[{embedded} @ {}]", self.position)?;
        }
        Ok(())
    }
}
