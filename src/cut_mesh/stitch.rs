//! Stitching children back to their neighbors.
//!
//! After children are materialized every duplicated corner is a temporary
//! node. Walking each child's edges against the children of the parent's
//! edge neighbors decides which duplicates are the same physical node
//! (merged) and which stay apart because a crack runs between them. Embedded
//! nodes are duplicated where the two sides of a crack separate.

use crate::cut_mesh::CutMesh;
use crate::mesh_error::CutMeshError;
use crate::topology::element::Element;
use crate::topology::node::{NodeCategory, NodeKey};
use std::collections::{BTreeMap, BTreeSet};

/// Node pairs unified across elements, each with the elements sharing it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergedEdgeMap {
    edges: BTreeMap<(NodeKey, NodeKey), BTreeSet<u32>>,
}

impl MergedEdgeMap {
    fn edge_key(a: NodeKey, b: NodeKey) -> (NodeKey, NodeKey) {
        if a <= b { (a, b) } else { (b, a) }
    }

    /// Record that `first` and `second` share the edge `(a, b)`.
    pub fn add_to_merged_edge_map(&mut self, a: NodeKey, b: NodeKey, first: u32, second: u32) {
        let elems = self.edges.entry(Self::edge_key(a, b)).or_default();
        elems.insert(first);
        elems.insert(second);
    }

    /// Elements sharing the edge `(a, b)`, in either orientation.
    pub fn elements_on(&self, a: NodeKey, b: NodeKey) -> Option<&BTreeSet<u32>> {
        self.edges.get(&Self::edge_key(a, b))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(NodeKey, NodeKey), &BTreeSet<u32>)> {
        self.edges.iter()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

impl CutMesh {
    /// Stitch every child to the children of its parent's edge neighbors.
    ///
    /// Across a cut edge, a neighbor child whose fragment is connected to the
    /// child's fragment has its edge nodes merged with the child's and the
    /// embedded node is duplicated where the crack opens. Across an uncut
    /// edge, with `merge_uncut_virtual_edges`, duplicates of the same
    /// original node are merged. Remaining temporary nodes become new
    /// permanent nodes.
    pub fn connect_fragments(
        &mut self,
        children: &[u32],
        merge_uncut_virtual_edges: bool,
    ) -> Result<MergedEdgeMap, CutMeshError> {
        let mut merged = MergedEdgeMap::default();
        for &child_id in children {
            let parent_id = self.get_elem_by_id(child_id)?.parent().ok_or_else(|| {
                CutMeshError::Invariant(format!("child element {child_id} has no parent"))
            })?;
            let parent = self.get_elem_by_id(parent_id)?;
            let num_edges = parent.num_edges();

            // Neighbors of the parent per edge, with the edge they share.
            let mut neighbors: Vec<Vec<(u32, usize)>> = Vec::with_capacity(num_edges);
            for j in 0..num_edges {
                let mut list = Vec::new();
                for &neighbor in parent.edge_neighbors(j) {
                    let common = self
                        .get_elem_by_id(neighbor)?
                        .neighbor_index(parent_id)
                        .map_err(|_| CutMeshError::AsymmetricNeighbors {
                            element: neighbor,
                            neighbor: parent_id,
                        })?;
                    list.push((neighbor, common));
                }
                neighbors.push(list);
            }

            for (j, edge_neighbors) in neighbors.iter().enumerate() {
                for &(neighbor, m) in edge_neighbors {
                    let cut = self.get_elem_by_id(child_id)?.edge(j).has_intersection();
                    let neighbor_children = self.get_elem_by_id(neighbor)?.children_or_self();
                    if cut {
                        for nchild in neighbor_children {
                            self.stitch_cut_edge(child_id, j, nchild, m, &mut merged)?;
                        }
                    } else if merge_uncut_virtual_edges {
                        for nchild in neighbor_children {
                            self.stitch_uncut_edge(child_id, j, nchild, m)?;
                        }
                    }
                }
            }

            for (j, edge_neighbors) in neighbors.iter().enumerate() {
                let node = self.get_elem_by_id(child_id)?.node(j);
                if node.is_temp() {
                    let parent = self.node_parent(node)?;
                    let promoted = self.permanent_nodes.create(parent, self.generation);
                    self.switch_node(child_id, promoted, node, true)?;
                    self.remove_node(node)?;
                }
                if edge_neighbors.is_empty()
                    && self.get_elem_by_id(child_id)?.edge(j).has_intersection()
                {
                    self.duplicate_free_edge_embedded_node(child_id, j)?;
                }
            }
            if self.get_elem_by_id(child_id)?.num_interior_nodes() > 0 {
                self.duplicate_interior_embedded_node(child_id)?;
            }
        }
        Ok(merged)
    }

    fn stitch_cut_edge(
        &mut self,
        child_id: u32,
        edge: usize,
        nchild_id: u32,
        nedge: usize,
        merged: &mut MergedEdgeMap,
    ) -> Result<(), CutMeshError> {
        let child = self.get_elem_by_id(child_id)?;
        let nchild = self.get_elem_by_id(nchild_id)?;
        let [c0, c1] = child.edge(edge).nodes();
        let [n0, n1] = nchild.edge(nedge).nodes();
        if c0 == n1 && c1 == n0 {
            merged.add_to_merged_edge_map(c0, c1, child_id, nchild_id);
            return Ok(());
        }
        let connected = match (child.fragments().first(), nchild.fragments().first()) {
            (Some(a), Some(b)) => a.is_connected(b),
            _ => false,
        };
        if !connected {
            return Ok(());
        }
        let first = self.merge_nodes(c0, n1, child_id, nchild_id)?;
        let second = self.merge_nodes(c1, n0, child_id, nchild_id)?;
        merged.add_to_merged_edge_map(first, second, child_id, nchild_id);
        self.duplicate_embedded_node(child_id, nchild_id, edge, nedge)
    }

    fn stitch_uncut_edge(
        &mut self,
        child_id: u32,
        edge: usize,
        nchild_id: u32,
        nedge: usize,
    ) -> Result<(), CutMeshError> {
        let child = self.get_elem_by_id(child_id)?;
        let nchild = self.get_elem_by_id(nchild_id)?;
        if nchild.edge(nedge).has_intersection() {
            return Ok(());
        }
        let [c0, c1] = child.edge(edge).nodes();
        let [n0, n1] = nchild.edge(nedge).nodes();
        if c0 == n1 && c1 == n0 {
            return Ok(());
        }
        for (child_node, neighbor_node) in [(c0, n1), (c1, n0)] {
            let parent = self.node_parent(child_node)?;
            if parent.is_some() && parent == self.node_parent(neighbor_node)? {
                self.merge_nodes(child_node, neighbor_node, child_id, nchild_id)?;
            }
        }
        Ok(())
    }

    /// Unify `child_node` of `child_elem` with `neighbor_node` of
    /// `neighbor_elem`, returning the surviving node.
    ///
    /// A permanent node absorbs a duplicate derived from it or from its own
    /// parent; two permanent duplicates of the same original collapse into
    /// the first; two temporaries become one new permanent node.
    pub fn merge_nodes(
        &mut self,
        child_node: NodeKey,
        neighbor_node: NodeKey,
        child_elem: u32,
        neighbor_elem: u32,
    ) -> Result<NodeKey, CutMeshError> {
        if child_node == neighbor_node {
            return Ok(child_node);
        }
        let child_parent = self.node_parent(child_node)?;
        let neighbor_parent = self.node_parent(neighbor_node)?;
        let illegal = |reason| CutMeshError::IllegalMerge {
            first: child_node,
            second: neighbor_node,
            reason,
        };
        match (child_node.category(), neighbor_node.category()) {
            (NodeCategory::Permanent, NodeCategory::Permanent) => {
                if neighbor_parent == Some(child_node)
                    || (child_parent.is_some() && child_parent == neighbor_parent)
                {
                    self.absorb(neighbor_elem, child_node, neighbor_node)
                } else if child_parent == Some(neighbor_node) {
                    self.absorb(child_elem, neighbor_node, child_node)
                } else {
                    Err(illegal("both nodes are permanent and unrelated"))
                }
            }
            (NodeCategory::Permanent, NodeCategory::Temp) => {
                if neighbor_parent != Some(child_node) && neighbor_parent != child_parent {
                    return Err(illegal("the duplicate does not derive from the permanent node"));
                }
                self.absorb(neighbor_elem, child_node, neighbor_node)
            }
            (NodeCategory::Temp, NodeCategory::Permanent) => {
                if child_parent != Some(neighbor_node) && child_parent != neighbor_parent {
                    return Err(illegal("the duplicate does not derive from the permanent node"));
                }
                self.absorb(child_elem, neighbor_node, child_node)
            }
            (NodeCategory::Temp, NodeCategory::Temp) => {
                if child_parent != neighbor_parent {
                    return Err(illegal("temporary nodes do not share a parent"));
                }
                let merged = self.permanent_nodes.create(child_parent, self.generation);
                self.switch_node(neighbor_elem, merged, neighbor_node, true)?;
                self.switch_node(child_elem, merged, child_node, true)?;
                self.remove_node(neighbor_node)?;
                self.remove_node(child_node)?;
                Ok(merged)
            }
            _ => Err(illegal("only permanent and temporary nodes can be merged")),
        }
    }

    /// Replace `absorbed` by `survivor` starting from `elem` and drop it.
    fn absorb(
        &mut self,
        elem: u32,
        survivor: NodeKey,
        absorbed: NodeKey,
    ) -> Result<NodeKey, CutMeshError> {
        self.switch_node(elem, survivor, absorbed, true)?;
        self.remove_node(absorbed)?;
        Ok(survivor)
    }

    fn remove_node(&mut self, key: NodeKey) -> Result<(), CutMeshError> {
        let removed = match key.category() {
            NodeCategory::Permanent => self.permanent_nodes.remove(key),
            NodeCategory::Temp => self.temp_nodes.remove(key),
            NodeCategory::Embedded => self.embedded_nodes.remove(key),
            NodeCategory::LocalIndex => None,
        };
        removed.map(|_| ()).ok_or(CutMeshError::UnknownNode(key))
    }

    /// Whether `elem` is one of two children split on `edge` through
    /// `embedded`, and whether it is the single child of a crack-tip split
    /// element whose crack-tip side is `edge`.
    fn split_or_tip(
        &self,
        elem: &Element,
        edge: usize,
        embedded: NodeKey,
    ) -> Result<(bool, bool), CutMeshError> {
        let Some(parent_id) = elem.parent() else {
            return Ok((false, false));
        };
        let parent = self.get_elem_by_id(parent_id)?;
        match parent.children() {
            [] => Ok((false, false)),
            [_] => Ok((
                false,
                parent.is_crack_tip_split_element() && parent.crack_tip_neighbors().contains(&edge),
            )),
            siblings => {
                for &sibling in siblings.iter().filter(|&&s| s != elem.id()) {
                    if self.get_elem_by_id(sibling)?.edge(edge).embedded_node() == Some(embedded) {
                        return Ok((true, false));
                    }
                }
                Ok((false, false))
            }
        }
    }

    /// Give `curr` and `neighbor` a private copy of the embedded node on
    /// their shared edge when the crack separates there.
    pub fn duplicate_embedded_node(
        &mut self,
        curr: u32,
        neighbor: u32,
        edge: usize,
        neighbor_edge: usize,
    ) -> Result<(), CutMeshError> {
        let curr_elem = self.get_elem_by_id(curr)?;
        let neigh_elem = self.get_elem_by_id(neighbor)?;
        let embedded = curr_elem.edge(edge).embedded_node();
        if embedded != neigh_elem.edge(neighbor_edge).embedded_node() {
            return Err(CutMeshError::NeighborIntersectionMismatch {
                element: curr,
                edge,
                neighbor,
                neighbor_edge,
            });
        }
        let Some(embedded) = embedded else {
            return Ok(());
        };

        let (curr_split, curr_tip) = self.split_or_tip(curr_elem, edge, embedded)?;
        let (neigh_split, neigh_tip) = self.split_or_tip(neigh_elem, neighbor_edge, embedded)?;
        // Two tip elements share a node that was already duplicated.
        let can_dup = (curr_split && neigh_split)
            || (curr_split && neigh_tip)
            || (neigh_split && curr_tip);
        if !can_dup {
            return Ok(());
        }

        let shared_edge = curr_elem.edge(edge);
        let separates = match (curr_elem.fragments().first(), neigh_elem.fragments().first()) {
            (Some(cf), Some(nf)) => {
                cf.contains_node(embedded)
                    && nf.contains_node(embedded)
                    && cf.common_nodes_with_edge(shared_edge).len() == 1
                    && nf.common_nodes_with_edge(shared_edge).len() == 1
            }
            _ => false,
        };
        if separates {
            let copy = self.create_embedded_node();
            self.elem_mut(curr)?.switch_embedded_node(copy, embedded);
            self.elem_mut(neighbor)?.switch_embedded_node(copy, embedded);
            log::trace!("elements {curr} and {neighbor}: embedded node {embedded} duplicated as {copy}");
        }
        Ok(())
    }

    /// Duplicate the embedded node on an edge without neighbors when a
    /// sibling carries the same node.
    pub fn duplicate_free_edge_embedded_node(
        &mut self,
        curr: u32,
        edge: usize,
    ) -> Result<(), CutMeshError> {
        let elem = self.get_elem_by_id(curr)?;
        let Some(embedded) = elem.edge(edge).embedded_node() else {
            return Ok(());
        };
        let (split, _) = self.split_or_tip(elem, edge, embedded)?;
        if !split {
            return Ok(());
        }
        let separates = elem.fragments().first().is_some_and(|f| {
            f.common_nodes_with_edge(elem.edge(edge)).len() == 1 && f.contains_node(embedded)
        });
        if separates {
            let copy = self.create_embedded_node();
            self.elem_mut(curr)?.switch_embedded_node(copy, embedded);
        }
        Ok(())
    }

    /// Duplicate the interior node of `curr` when a sibling shares it.
    pub fn duplicate_interior_embedded_node(&mut self, curr: u32) -> Result<(), CutMeshError> {
        let elem = self.get_elem_by_id(curr)?;
        let [face_node] = elem.interior_nodes() else {
            return Err(CutMeshError::Invariant(format!(
                "element {curr} must have exactly one interior node, found {}",
                elem.num_interior_nodes()
            )));
        };
        let embedded = face_node.node();
        let Some(parent_id) = elem.parent() else {
            return Ok(());
        };
        let siblings = self.get_elem_by_id(parent_id)?.children();
        if siblings.len() < 2 {
            return Ok(());
        }
        let mut shared = false;
        for &sibling in siblings.iter().filter(|&&s| s != curr) {
            let sibling_elem = self.get_elem_by_id(sibling)?;
            let [sibling_node] = sibling_elem.interior_nodes() else {
                return Err(CutMeshError::Invariant(format!(
                    "sibling {sibling} of element {curr} must have exactly one interior node"
                )));
            };
            if sibling_node.node() == embedded {
                shared = true;
                break;
            }
        }
        if shared {
            let copy = self.create_embedded_node();
            self.elem_mut(curr)?.switch_embedded_node(copy, embedded);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug_invariants::DebugInvariants;

    #[test]
    fn merged_edges_ignore_orientation() {
        let (a, b) = (NodeKey::permanent(2), NodeKey::permanent(3));
        let mut map = MergedEdgeMap::default();
        map.add_to_merged_edge_map(a, b, 2, 1);
        map.add_to_merged_edge_map(b, a, 3, 1);
        assert_eq!(map.len(), 1);
        assert_eq!(map.elements_on(b, a), Some(&BTreeSet::from([1, 2, 3])));
    }

    #[test]
    fn unrelated_permanent_nodes_cannot_merge() {
        let mut mesh = CutMesh::default();
        mesh.add_elements(&[vec![0, 1, 2, 3], vec![3, 2, 4, 5]])
            .unwrap();
        let err = mesh
            .merge_nodes(NodeKey::permanent(0), NodeKey::permanent(4), 0, 1)
            .unwrap_err();
        assert!(matches!(err, CutMeshError::IllegalMerge { .. }));
    }

    #[test]
    fn stacked_splits_agree_along_the_uncut_edge() {
        let (p2, p3) = (NodeKey::permanent(2), NodeKey::permanent(3));
        let mut mesh = CutMesh::default();
        mesh.add_elements(&[vec![0, 1, 2, 3], vec![3, 2, 4, 5]])
            .unwrap();
        mesh.update_edge_neighbors().unwrap();
        for elem in [0, 1] {
            mesh.add_edge_intersection(elem, 1, 0.5).unwrap();
            mesh.add_edge_intersection(elem, 3, 0.5).unwrap();
        }
        mesh.update_physical_links_and_fragments().unwrap();
        let delta = mesh.update_topology().unwrap().clone();
        assert_eq!(delta.child_elements, vec![2, 3, 4, 5]);
        assert_eq!(delta.new_nodes.len(), 6);

        // Lower children see the shared edge as edge 2, upper ones as edge 0.
        let shared = |child: u32, edge: usize| -> BTreeSet<NodeKey> {
            mesh.get_elem_by_id(child)
                .unwrap()
                .edge(edge)
                .nodes()
                .into_iter()
                .collect()
        };
        let originals = BTreeSet::from([p2, p3]);
        assert_eq!(shared(3, 2), originals);
        assert_eq!(shared(4, 0), originals);

        // The phantom sides on either edge reuse one pair of duplicates.
        let phantom = shared(2, 2);
        assert_eq!(phantom, shared(5, 0));
        assert!(phantom.is_disjoint(&originals));
        let parents: BTreeSet<NodeKey> = phantom
            .iter()
            .filter_map(|&n| mesh.node(n).unwrap().parent())
            .collect();
        assert_eq!(parents, originals);
        assert!(mesh.validate_invariants().is_ok());
    }
}
