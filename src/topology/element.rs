//! Per-element bookkeeping of the cut mesh.
//!
//! An [`Element`] owns its node list, the edges derived from it, the
//! fragments its boundary has been partitioned into, at most one interior
//! (face) node, and its place in the parent/child lineage. Edge neighbor lists
//! and crack-tip flags are filled in by the engine's neighbor and crack-tip
//! stages.
//!
//! Predicates that need to look at neighboring elements take the engine's
//! [`ElementMap`] by reference.

use crate::mesh_error::CutMeshError;
use crate::topology::edge::{Edge, MasterTerm};
use crate::topology::fragment::Fragment;
use crate::topology::node::{ElementHandle, Generation, NodeKey};
use crate::topology::shape::{edge_to_element_coords, shape_weight};
use itertools::Itertools;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Id-keyed element storage.
pub type ElementMap = BTreeMap<u32, Element>;

/// An embedded node inside an element, located by parametric coordinates.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FaceNode {
    node: NodeKey,
    para_coords: [f64; 2],
}

impl FaceNode {
    pub fn new(node: NodeKey, para_coords: [f64; 2]) -> Self {
        Self { node, para_coords }
    }

    pub fn node(&self) -> NodeKey {
        self.node
    }

    pub fn para_coords(&self) -> [f64; 2] {
        self.para_coords
    }

    pub(crate) fn switch_node(&mut self, new: NodeKey, old: NodeKey) {
        if self.node == old {
            self.node = new;
        }
    }
}

/// Where an element stands in the cut life cycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ElementState {
    /// At most one fragment, no children.
    Uncut,
    /// Two or more fragments, children not yet materialized.
    PartiallyCut,
    /// Children materialized; the element only records ancestry.
    Split,
}

/// A 2D element (triangle or quadrilateral) of the cut mesh.
#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    id: u32,
    generation: Generation,
    nodes: Vec<NodeKey>,
    edges: Vec<Edge>,
    fragments: Vec<Fragment>,
    interior_nodes: Vec<FaceNode>,
    parent: Option<u32>,
    children: Vec<u32>,
    edge_neighbors: Vec<Vec<u32>>,
    crack_tip_split_element: bool,
    crack_tip_neighbors: Vec<usize>,
}

impl Element {
    /// Create an element and derive its edges from the node order.
    pub fn new(id: u32, nodes: Vec<NodeKey>, generation: Generation) -> Result<Self, CutMeshError> {
        if !(3..=4).contains(&nodes.len()) {
            return Err(CutMeshError::InvalidElementArity { found: nodes.len() });
        }
        if let Some(node) = nodes.iter().duplicates().next() {
            return Err(CutMeshError::RepeatedNode { node: node.id() });
        }
        let num_edges = nodes.len();
        let mut elem = Self {
            id,
            generation,
            nodes,
            edges: Vec::with_capacity(num_edges),
            fragments: Vec::new(),
            interior_nodes: Vec::new(),
            parent: None,
            children: Vec::new(),
            edge_neighbors: vec![Vec::new(); num_edges],
            crack_tip_split_element: false,
            crack_tip_neighbors: Vec::new(),
        };
        elem.create_edges();
        Ok(elem)
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn handle(&self) -> ElementHandle {
        ElementHandle {
            id: self.id,
            generation: self.generation,
        }
    }

    pub fn nodes(&self) -> &[NodeKey] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> NodeKey {
        self.nodes[index]
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edge(&self, index: usize) -> &Edge {
        &self.edges[index]
    }

    pub(crate) fn edge_mut(&mut self, index: usize) -> &mut Edge {
        &mut self.edges[index]
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn fragment(&self, index: usize) -> &Fragment {
        &self.fragments[index]
    }

    pub fn num_fragments(&self) -> usize {
        self.fragments.len()
    }

    pub(crate) fn fragments_mut(&mut self) -> &mut Vec<Fragment> {
        &mut self.fragments
    }

    pub fn interior_nodes(&self) -> &[FaceNode] {
        &self.interior_nodes
    }

    pub fn num_interior_nodes(&self) -> usize {
        self.interior_nodes.len()
    }

    pub(crate) fn interior_nodes_mut(&mut self) -> &mut Vec<FaceNode> {
        &mut self.interior_nodes
    }

    pub fn parent(&self) -> Option<u32> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: Option<u32>) {
        self.parent = parent;
    }

    /// Child elements. Empty for elements that were not duplicated.
    pub fn children(&self) -> &[u32] {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<u32> {
        &mut self.children
    }

    /// Children, or the element itself when it was not duplicated.
    pub fn children_or_self(&self) -> Vec<u32> {
        if self.children.is_empty() {
            vec![self.id]
        } else {
            self.children.clone()
        }
    }

    pub fn edge_neighbors(&self, edge: usize) -> &[u32] {
        &self.edge_neighbors[edge]
    }

    pub fn num_edge_neighbors(&self, edge: usize) -> usize {
        self.edge_neighbors[edge].len()
    }

    pub fn is_crack_tip_split_element(&self) -> bool {
        self.crack_tip_split_element
    }

    /// Edges of this element facing a crack-tip element.
    pub fn crack_tip_neighbors(&self) -> &[usize] {
        &self.crack_tip_neighbors
    }

    pub fn state(&self) -> ElementState {
        if !self.children.is_empty() {
            ElementState::Split
        } else if self.is_partial() {
            ElementState::PartiallyCut
        } else {
            ElementState::Uncut
        }
    }

    // -------------------------------------------------------------------------
    // Topology construction
    // -------------------------------------------------------------------------

    /// Rebuild the edges from the node order. Existing cuts are discarded.
    pub fn create_edges(&mut self) {
        self.edges = self
            .nodes
            .iter()
            .circular_tuple_windows()
            .map(|(&a, &b)| Edge::new(a, b))
            .collect();
    }

    pub(crate) fn clear_neighbors(&mut self) {
        self.edge_neighbors = vec![Vec::new(); self.edges.len()];
        self.crack_tip_split_element = false;
        self.crack_tip_neighbors.clear();
    }

    pub(crate) fn add_edge_neighbor(&mut self, edge: usize, neighbor: u32) -> Result<(), CutMeshError> {
        let list = &mut self.edge_neighbors[edge];
        if list.contains(&neighbor) {
            return Ok(());
        }
        if list.len() >= 2 {
            return Err(CutMeshError::TooManyEdgeNeighbors {
                element: self.id,
                edge,
            });
        }
        list.push(neighbor);
        Ok(())
    }

    pub(crate) fn mark_crack_tip_split(&mut self) {
        self.crack_tip_split_element = true;
    }

    /// Record that the edge shared with `neighbor` faces a crack-tip element.
    pub fn add_crack_tip_neighbor(&mut self, neighbor: u32) -> Result<(), CutMeshError> {
        let edge = self.neighbor_index(neighbor)?;
        if self.crack_tip_neighbors.contains(&edge) {
            return Err(CutMeshError::Invariant(format!(
                "element {} already records edge {edge} as a crack-tip side",
                self.id
            )));
        }
        if self.crack_tip_neighbors.len() >= 2 {
            return Err(CutMeshError::Invariant(format!(
                "element {} cannot face more than two crack-tip elements",
                self.id
            )));
        }
        self.crack_tip_neighbors.push(edge);
        Ok(())
    }

    pub(crate) fn add_interior_node(&mut self, face_node: FaceNode) {
        self.interior_nodes.push(face_node);
    }

    /// Replace `old` by `new` in the node list, edges, fragments and interior nodes.
    pub fn switch_node(&mut self, new: NodeKey, old: NodeKey) {
        for node in &mut self.nodes {
            if *node == old {
                *node = new;
            }
        }
        self.switch_embedded_node(new, old);
    }

    /// Replace `old` by `new` on edges, fragments and interior nodes only.
    pub fn switch_embedded_node(&mut self, new: NodeKey, old: NodeKey) {
        for edge in &mut self.edges {
            edge.switch_node(new, old);
        }
        for frag in &mut self.fragments {
            frag.switch_node(new, old);
        }
        for face_node in &mut self.interior_nodes {
            face_node.switch_node(new, old);
        }
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// More than one fragment.
    pub fn is_partial(&self) -> bool {
        self.fragments.len() > 1
    }

    /// Some element node lies outside every fragment.
    pub fn has_phantom_nodes(&self) -> bool {
        !self.fragments.is_empty()
            && self
                .nodes
                .iter()
                .any(|&n| !self.fragments.iter().any(|f| f.contains_node(n)))
    }

    /// Nodes outside the first fragment.
    pub fn phantom_nodes(&self) -> BTreeSet<NodeKey> {
        match self.fragments.first() {
            Some(frag) => self
                .nodes
                .iter()
                .copied()
                .filter(|&n| !frag.contains_node(n))
                .collect(),
            None => BTreeSet::new(),
        }
    }

    /// Endpoints of `edge` outside the first fragment.
    pub fn phantom_nodes_on_edge(&self, edge: usize) -> BTreeSet<NodeKey> {
        let phantom = self.phantom_nodes();
        self.edges[edge]
            .nodes()
            .into_iter()
            .filter(|n| phantom.contains(n))
            .collect()
    }

    /// Sorted nodes shared with `other`.
    pub fn common_nodes(&self, other: &Element) -> Vec<NodeKey> {
        let mine: BTreeSet<_> = self.nodes.iter().copied().collect();
        let theirs: BTreeSet<_> = other.nodes.iter().copied().collect();
        mine.intersection(&theirs).copied().collect()
    }

    /// Whether `other` lies on top of this element rather than beside it.
    ///
    /// Elements sharing exactly two nodes are neighbors when they traverse the
    /// shared edge in opposite directions and overlays when they traverse it
    /// in the same direction. More than two shared nodes always overlay.
    pub fn overlays_elem(&self, other: &Element) -> Result<bool, CutMeshError> {
        let common = self.common_nodes(other);
        match common.len() {
            0 | 1 => Ok(false),
            2 => {
                let mine = self.ascends(common[0], common[1])?;
                let theirs = other.ascends(common[0], common[1])?;
                Ok(mine == theirs)
            }
            _ => Ok(true),
        }
    }

    /// Whether this element traverses the edge `(first, second)` in that
    /// direction, i.e. lies on the same side of it as the element that owns
    /// the edge with this orientation.
    pub fn overlays_edge(&self, first: NodeKey, second: NodeKey) -> Result<bool, CutMeshError> {
        let edge = self
            .edges
            .iter()
            .find(|e| e.contains_node(first) && e.contains_node(second))
            .ok_or_else(|| {
                CutMeshError::Invariant(format!(
                    "element {} has no edge ({first}, {second})",
                    self.id
                ))
            })?;
        if edge.node(0) == first && edge.node(1) == second {
            Ok(true)
        } else if edge.node(0) == second && edge.node(1) == first {
            Ok(false)
        } else {
            Err(CutMeshError::Invariant(format!(
                "edge {edge} of element {} only partially matches ({first}, {second})",
                self.id
            )))
        }
    }

    fn ascends(&self, first: NodeKey, second: NodeKey) -> Result<bool, CutMeshError> {
        let i = self.local_node_index(first)?;
        let j = self.local_node_index(second)?;
        let n = self.nodes.len();
        if j == (i + 1) % n {
            Ok(true)
        } else if j == (i + n - 1) % n {
            Ok(false)
        } else {
            Err(CutMeshError::Invariant(format!(
                "nodes {first} and {second} are not adjacent in element {}",
                self.id
            )))
        }
    }

    /// Index of the edge whose neighbor list contains `neighbor`.
    pub fn neighbor_index(&self, neighbor: u32) -> Result<usize, CutMeshError> {
        self.edge_neighbors
            .iter()
            .position(|list| list.contains(&neighbor))
            .ok_or_else(|| {
                CutMeshError::Invariant(format!(
                    "element {neighbor} is not an edge neighbor of element {}",
                    self.id
                ))
            })
    }

    /// Position of `node` in the node list.
    pub fn local_node_index(&self, node: NodeKey) -> Result<usize, CutMeshError> {
        self.nodes
            .iter()
            .position(|&n| n == node)
            .ok_or_else(|| {
                CutMeshError::Invariant(format!("node {node} is not in element {}", self.id))
            })
    }

    /// Fragment edge covering the whole element edge `edge`, when the element
    /// has a single fragment.
    pub fn fragment_edge_id(&self, edge: usize) -> Option<usize> {
        match self.fragments.as_slice() {
            [frag] => frag
                .edges()
                .iter()
                .position(|fe| fe.is_overlapping(&self.edges[edge])),
            _ => None,
        }
    }

    /// Neither endpoint of `edge` belongs to the physical fragment.
    pub fn is_edge_phantom(&self, edge: usize) -> bool {
        match self.fragments.first() {
            Some(frag) => {
                let [a, b] = self.edges[edge].nodes();
                !frag.contains_node(a) && !frag.contains_node(b)
            }
            None => false,
        }
    }

    /// Cut element edge split between two edges of the single fragment: the
    /// cut stops inside this element.
    pub fn tip_edge_id(&self) -> Option<usize> {
        let [frag] = self.fragments.as_slice() else {
            return None;
        };
        (0..self.edges.len()).find(|&i| {
            self.edges[i].has_intersection()
                && frag
                    .edges()
                    .iter()
                    .filter(|fe| self.edges[i].contains_edge(fe))
                    .count()
                    == 2
        })
    }

    /// Whether the single fragment ends at a crack tip inside this element.
    pub fn frag_has_tip_edges(&self) -> Result<bool, CutMeshError> {
        if self.fragments.len() > 1 {
            return Err(CutMeshError::FragmentCount {
                element: self.id,
                found: self.fragments.len(),
                context: "tip edges are only defined for a single fragment",
            });
        }
        Ok(self.tip_edge_id().is_some())
    }

    /// Embedded node on the tip edge.
    pub fn tip_embedded(&self) -> Option<NodeKey> {
        self.tip_edge_id()
            .and_then(|i| self.edges[i].embedded_node())
    }

    /// Number of cut element edges.
    pub fn num_cuts(&self) -> usize {
        self.edges.iter().filter(|e| e.has_intersection()).count()
    }

    /// The physical fragment already carries two interior edges.
    pub fn is_cut_twice(&self) -> bool {
        self.fragments
            .first()
            .is_some_and(|f| f.interior_edge_ids().len() == 2)
    }

    /// Interior fragment edge touching this element's interior node.
    pub fn is_secondary_interior_edge(&self, frag_edge: usize) -> bool {
        self.fragments.first().is_some_and(|f| {
            self.interior_nodes
                .iter()
                .any(|fnode| f.edge(frag_edge).contains_node(fnode.node()))
        })
    }

    /// Element parametric coordinates of an embedded node on an element edge
    /// or in the interior.
    pub fn embedded_node_para_coords(&self, node: NodeKey) -> Result<[f64; 2], CutMeshError> {
        for (i, edge) in self.edges.iter().enumerate() {
            if edge.embedded_node() == Some(node) {
                let position = edge.intersection(self.nodes[i])?;
                return edge_to_element_coords(self.nodes.len(), i, 2.0 * position - 1.0);
            }
        }
        self.interior_nodes
            .iter()
            .find(|f| f.node() == node)
            .map(FaceNode::para_coords)
            .ok_or_else(|| {
                CutMeshError::Invariant(format!(
                    "embedded node {node} is not located in element {}",
                    self.id
                ))
            })
    }

    /// Interpolation masters of a node on this element's edges or interior.
    pub fn master_info(&self, node: NodeKey) -> Result<Vec<MasterTerm>, CutMeshError> {
        if let Some(masters) = self.edges.iter().find_map(|e| e.node_masters(node)) {
            return Ok(masters);
        }
        let face_node = self
            .interior_nodes
            .iter()
            .find(|f| f.node() == node)
            .ok_or_else(|| {
                CutMeshError::Invariant(format!(
                    "no masters for node {node} in element {}",
                    self.id
                ))
            })?;
        let n = self.nodes.len();
        (0..n)
            .map(|i| {
                shape_weight(n, i, face_node.para_coords())
                    .map(|w| MasterTerm::new(self.nodes[i], w))
            })
            .collect()
    }

    // -------------------------------------------------------------------------
    // Crack-tip predicates
    // -------------------------------------------------------------------------

    /// Crack-tip sides whose neighbor is about to split, meaning the crack
    /// extends through them. Empty when the crack does not extend.
    pub fn will_crack_tip_extend(&self, elements: &ElementMap) -> Result<Vec<usize>, CutMeshError> {
        let mut split_sides = Vec::new();
        if self.fragments.len() != 1 || !self.crack_tip_split_element {
            return Ok(split_sides);
        }
        for &side in &self.crack_tip_neighbors {
            let [neighbor] = self.edge_neighbors[side].as_slice() else {
                return Err(CutMeshError::Invariant(format!(
                    "crack-tip side {side} of element {} must have exactly one neighbor",
                    self.id
                )));
            };
            let neighbor = elements
                .get(neighbor)
                .ok_or(CutMeshError::UnknownElement(*neighbor))?;
            if neighbor.num_fragments() > 1 {
                split_sides.push(side);
            }
        }
        Ok(split_sides)
    }

    /// Whether this single-fragment element next to a crack tip has to be
    /// duplicated this cycle.
    ///
    /// True when the crack extends through one of its crack-tip sides, or
    /// when one of its phantom nodes lies on a tip side of a neighbor whose
    /// crack extends.
    pub fn should_duplicate_crack_tip_split_elem(
        &self,
        elements: &ElementMap,
    ) -> Result<bool, CutMeshError> {
        if self.fragments.len() != 1 {
            return Ok(false);
        }
        if !self.will_crack_tip_extend(elements)?.is_empty() {
            return Ok(true);
        }
        let phantom = self.phantom_nodes();
        if phantom.is_empty() {
            return Ok(false);
        }
        for neighbor_id in self.edge_neighbors.iter().flatten() {
            let neighbor = elements
                .get(neighbor_id)
                .ok_or(CutMeshError::UnknownElement(*neighbor_id))?;
            for side in neighbor.will_crack_tip_extend(elements)? {
                if neighbor.edges[side]
                    .nodes()
                    .iter()
                    .any(|n| phantom.contains(n))
                {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Whether this partial element shares a phantom corner between an edge
    /// facing a neighbor that is about to split and another neighbored edge.
    pub fn should_duplicate_for_phantom_corner(
        &self,
        elements: &ElementMap,
    ) -> Result<bool, CutMeshError> {
        if self.fragments.len() != 1 || self.crack_tip_split_element {
            return Ok(false);
        }
        for i in 0..self.edges.len() {
            let phantom = self.phantom_nodes_on_edge(i);
            let [neighbor_id] = self.edge_neighbors[i].as_slice() else {
                continue;
            };
            if phantom.is_empty() {
                continue;
            }
            let neighbor = elements
                .get(neighbor_id)
                .ok_or(CutMeshError::UnknownElement(*neighbor_id))?;
            if neighbor.num_fragments() <= 1 {
                continue;
            }
            let shares_corner = (0..self.edges.len()).any(|j| {
                j != i
                    && self.edge_neighbors[j].len() == 1
                    && !self
                        .phantom_nodes_on_edge(j)
                        .is_disjoint(&phantom)
            });
            if shares_corner {
                return Ok(true);
            }
        }
        Ok(false)
    }

    // -------------------------------------------------------------------------
    // Local copies
    // -------------------------------------------------------------------------

    /// Local-index key standing for `global` in this element.
    pub fn create_local_node_from_global_node(&self, global: NodeKey) -> Result<NodeKey, CutMeshError> {
        if !(global.is_permanent() || global.is_temp()) {
            return Err(CutMeshError::Invariant(format!(
                "only permanent or temporary nodes have local indices, got {global}"
            )));
        }
        let index = self.local_node_index(global)?;
        Ok(NodeKey::local(index as u32))
    }

    /// Global node a local-index key stands for.
    pub fn global_node_from_local_node(&self, local: NodeKey) -> Result<NodeKey, CutMeshError> {
        if !local.is_local() {
            return Err(CutMeshError::Invariant(format!(
                "{local} is not a local-index node"
            )));
        }
        self.nodes
            .get(local.id() as usize)
            .copied()
            .ok_or_else(|| {
                CutMeshError::Invariant(format!(
                    "local index {local} out of range for element {}",
                    self.id
                ))
            })
    }

    /// Copy of this element with every corner node replaced by its local
    /// index. Embedded nodes keep their global identity. Lineage and
    /// neighbor data are not copied.
    pub fn to_local_copy(&self) -> Result<Element, CutMeshError> {
        let mut copy = Element {
            id: self.id,
            generation: self.generation,
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
            fragments: self.fragments.clone(),
            interior_nodes: self.interior_nodes.clone(),
            parent: None,
            children: Vec::new(),
            edge_neighbors: vec![Vec::new(); self.edges.len()],
            crack_tip_split_element: self.crack_tip_split_element,
            crack_tip_neighbors: Vec::new(),
        };
        for &global in &self.nodes {
            let local = self.create_local_node_from_global_node(global)?;
            copy.switch_node(local, global);
        }
        Ok(copy)
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "element {}: nodes [{}]", self.id, self.nodes.iter().join(", "))?;
        writeln!(f)?;
        for (i, edge) in self.edges.iter().enumerate() {
            write!(f, "  edge {i}: {edge}")?;
            if !self.edge_neighbors[i].is_empty() {
                write!(f, " neighbors [{}]", self.edge_neighbors[i].iter().join(", "))?;
            }
            writeln!(f)?;
        }
        for (i, frag) in self.fragments.iter().enumerate() {
            writeln!(f, "  fragment {i}: {frag}")?;
        }
        for face_node in &self.interior_nodes {
            writeln!(
                f,
                "  interior {} at ({}, {})",
                face_node.node(),
                face_node.para_coords()[0],
                face_node.para_coords()[1]
            )?;
        }
        if let Some(parent) = self.parent {
            writeln!(f, "  parent {parent}")?;
        }
        if !self.children.is_empty() {
            writeln!(f, "  children [{}]", self.children.iter().join(", "))?;
        }
        if self.crack_tip_split_element {
            writeln!(
                f,
                "  crack-tip sides [{}]",
                self.crack_tip_neighbors.iter().join(", ")
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-4;

    fn p(id: u32) -> NodeKey {
        NodeKey::permanent(id)
    }

    fn quad(id: u32, nodes: [u32; 4]) -> Element {
        Element::new(id, nodes.iter().map(|&n| p(n)).collect(), Generation::default())
            .expect("valid quad")
    }

    #[test]
    fn edges_wrap_around() {
        let elem = quad(0, [0, 1, 2, 3]);
        assert_eq!(elem.num_edges(), 4);
        assert_eq!(elem.edge(3).nodes(), [p(3), p(0)]);
        assert_eq!(elem.state(), ElementState::Uncut);
        assert!(!elem.is_partial());
        assert!(!elem.has_phantom_nodes());
    }

    #[test]
    fn bad_connectivity_is_rejected() {
        assert_eq!(
            Element::new(0, vec![p(0), p(1)], Generation::default()),
            Err(CutMeshError::InvalidElementArity { found: 2 })
        );
        assert_eq!(
            Element::new(0, vec![p(0), p(1), p(1)], Generation::default()),
            Err(CutMeshError::RepeatedNode { node: 1 })
        );
    }

    #[test]
    fn neighbors_traverse_shared_edges_in_opposite_directions() {
        let a = quad(0, [0, 1, 2, 3]);
        let b = quad(1, [3, 2, 4, 5]);
        let c = quad(2, [7, 1, 2, 3]);
        assert!(!a.overlays_elem(&b).unwrap());
        assert!(a.overlays_elem(&c).unwrap());
        assert!(!b.overlays_edge(p(2), p(3)).unwrap());
        assert!(c.overlays_edge(p(2), p(3)).unwrap());
        assert!(a.overlays_edge(p(0), p(2)).is_err());
    }

    #[test]
    fn crack_tip_neighbors_are_unique_and_bounded() {
        let mut elem = quad(0, [0, 1, 2, 3]);
        elem.add_edge_neighbor(2, 1).unwrap();
        elem.add_edge_neighbor(0, 4).unwrap();
        elem.add_edge_neighbor(1, 5).unwrap();
        elem.add_crack_tip_neighbor(1).unwrap();
        assert_eq!(elem.crack_tip_neighbors(), &[2]);
        assert!(elem.add_crack_tip_neighbor(1).is_err());
        elem.add_crack_tip_neighbor(4).unwrap();
        assert!(elem.add_crack_tip_neighbor(5).is_err());
        assert!(elem.add_crack_tip_neighbor(9).is_err());
    }

    #[test]
    fn edge_neighbors_are_capped_at_two() {
        let mut elem = quad(0, [0, 1, 2, 3]);
        elem.add_edge_neighbor(0, 1).unwrap();
        elem.add_edge_neighbor(0, 2).unwrap();
        elem.add_edge_neighbor(0, 2).unwrap();
        assert_eq!(
            elem.add_edge_neighbor(0, 3),
            Err(CutMeshError::TooManyEdgeNeighbors { element: 0, edge: 0 })
        );
    }

    #[test]
    fn embedded_nodes_map_to_reference_square() {
        let mut elem = quad(0, [0, 1, 2, 3]);
        let e = NodeKey::embedded(0);
        elem.edge_mut(1).add_intersection(0.25, e, p(1), TOL).unwrap();
        let xi = elem.embedded_node_para_coords(e).unwrap();
        assert!((xi[0] - 1.0).abs() < 1e-12);
        assert!((xi[1] + 0.5).abs() < 1e-12);

        let masters = elem.master_info(e).unwrap();
        assert_eq!(masters.len(), 2);
        assert!((masters[0].weight - 0.75).abs() < 1e-12);
    }

    #[test]
    fn interior_masters_use_shape_weights() {
        let mut elem = quad(0, [0, 1, 2, 3]);
        let e = NodeKey::embedded(4);
        elem.add_interior_node(FaceNode::new(e, [0.0, 0.0]));
        let masters = elem.master_info(e).unwrap();
        assert_eq!(masters.len(), 4);
        assert!(masters.iter().all(|m| (m.weight - 0.25).abs() < 1e-12));
        assert!(elem.master_info(NodeKey::embedded(9)).is_err());
    }

    #[test]
    fn phantom_queries_follow_the_fragment() {
        let mut elem = quad(0, [0, 1, 2, 3]);
        let (e0, e1) = (NodeKey::embedded(0), NodeKey::embedded(1));
        elem.fragments_mut()
            .push(Fragment::from_loop(Some(0), &[p(0), e0, e1, p(3)]));
        assert!(elem.has_phantom_nodes());
        assert_eq!(elem.phantom_nodes(), BTreeSet::from([p(1), p(2)]));
        assert!(elem.is_edge_phantom(1));
        assert!(!elem.is_edge_phantom(0));
        assert_eq!(elem.phantom_nodes_on_edge(0), BTreeSet::from([p(1)]));
        assert_eq!(elem.fragment_edge_id(3), Some(3));
        assert_eq!(elem.fragment_edge_id(1), None);
    }

    #[test]
    fn local_copy_round_trips_global_nodes() {
        let mut elem = quad(7, [10, 11, 12, 13]);
        let e = NodeKey::embedded(0);
        elem.edge_mut(0).add_intersection(0.5, e, p(10), TOL).unwrap();
        let copy = elem.to_local_copy().unwrap();
        assert_eq!(copy.nodes(), &[
            NodeKey::local(0),
            NodeKey::local(1),
            NodeKey::local(2),
            NodeKey::local(3)
        ]);
        assert_eq!(copy.edge(0).embedded_node(), Some(e));
        assert_eq!(
            elem.global_node_from_local_node(NodeKey::local(2)).unwrap(),
            p(12)
        );
        assert!(elem.global_node_from_local_node(NodeKey::local(9)).is_err());
        assert!(elem.create_local_node_from_global_node(e).is_err());
    }
}
