//! The cut-mesh topology engine.
//!
//! [`CutMesh`] owns the node pools and the elements of one mesh and runs the
//! phantom-node pipeline over them:
//!
//! 1. [`CutMesh::update_edge_neighbors`] finds the elements across every edge.
//! 2. [`CutMesh::add_edge_intersection`] and
//!    [`CutMesh::add_frag_edge_intersection`] record cuts.
//! 3. [`CutMesh::update_physical_links_and_fragments`] partitions each cut
//!    element's boundary into fragments.
//! 4. [`CutMesh::update_topology`] materializes child elements, stitches them
//!    to their neighbors, duplicates embedded nodes where the crack must stay
//!    open, and classifies the new crack tip.
//!
//! Between cycles the host calls [`CutMesh::clear_ancestry`] (keep the
//! current elements, forget lineage) or [`CutMesh::reset`] (start over from
//! connectivity). Both advance the [`Generation`], which invalidates handles
//! to anything they released.

pub mod children;
pub mod crack_tip;
pub mod delta;
pub mod fragments;
pub mod intersect;
pub mod neighbors;
pub mod options;
pub mod stitch;
pub mod validation;

pub use children::SplitOutcome;
pub use delta::{NewNode, TopologyDelta};
pub use options::TopologyOptions;
pub use stitch::MergedEdgeMap;

use crate::mesh_error::CutMeshError;
use crate::topology::edge::MasterTerm;
use crate::topology::element::{Element, ElementMap, ElementState};
use crate::topology::node::{
    ElementHandle, Generation, Node, NodeCategory, NodeHandle, NodeKey, NodePool,
};
use itertools::Itertools;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Topology engine for one mesh (or one mesh partition).
#[derive(Clone, Debug)]
pub struct CutMesh {
    options: TopologyOptions,
    generation: Generation,
    permanent_nodes: NodePool,
    temp_nodes: NodePool,
    embedded_nodes: NodePool,
    elements: ElementMap,
    crack_tip_elements: BTreeSet<u32>,
    delta: TopologyDelta,
}

impl Default for CutMesh {
    fn default() -> Self {
        Self::new(TopologyOptions::default())
    }
}

impl CutMesh {
    pub fn new(options: TopologyOptions) -> Self {
        Self {
            options,
            generation: Generation::default(),
            permanent_nodes: NodePool::new(NodeCategory::Permanent),
            temp_nodes: NodePool::new(NodeCategory::Temp),
            embedded_nodes: NodePool::new(NodeCategory::Embedded),
            elements: ElementMap::new(),
            crack_tip_elements: BTreeSet::new(),
            delta: TopologyDelta::default(),
        }
    }

    pub fn options(&self) -> &TopologyOptions {
        &self.options
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn permanent_nodes(&self) -> &NodePool {
        &self.permanent_nodes
    }

    pub fn temp_nodes(&self) -> &NodePool {
        &self.temp_nodes
    }

    pub fn embedded_nodes(&self) -> &NodePool {
        &self.embedded_nodes
    }

    pub fn elements(&self) -> &ElementMap {
        &self.elements
    }

    pub fn num_elements(&self) -> usize {
        self.elements.len()
    }

    // -------------------------------------------------------------------------
    // Ingestion
    // -------------------------------------------------------------------------

    /// Add elements from connectivity tuples, numbering them after the
    /// largest existing element id. Returns the id of the first new element.
    pub fn add_elements(&mut self, connectivity: &[Vec<u32>]) -> Result<u32, CutMeshError> {
        if connectivity.is_empty() {
            return Err(CutMeshError::EmptyConnectivity);
        }
        let first_id = self.next_element_id();
        for (offset, nodes) in connectivity.iter().enumerate() {
            self.add_element(nodes, first_id + offset as u32)?;
        }
        log::debug!(
            "added {} elements starting at id {first_id}",
            connectivity.len()
        );
        Ok(first_id)
    }

    /// Add one element with an explicit id. Its nodes are registered as
    /// permanent nodes when first seen.
    pub fn add_element(&mut self, nodes: &[u32], id: u32) -> Result<ElementHandle, CutMeshError> {
        if self.elements.contains_key(&id) {
            return Err(CutMeshError::DuplicateElement(id));
        }
        let keys: Vec<NodeKey> = nodes.iter().map(|&n| NodeKey::permanent(n)).collect();
        let elem = Element::new(id, keys, self.generation)?;
        for &n in nodes {
            self.permanent_nodes.get_or_create(n, self.generation);
        }
        let handle = elem.handle();
        self.elements.insert(id, elem);
        Ok(handle)
    }

    pub(crate) fn next_element_id(&self) -> u32 {
        self.elements.keys().next_back().map_or(0, |last| last + 1)
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub fn get_elem_by_id(&self, id: u32) -> Result<&Element, CutMeshError> {
        self.elements.get(&id).ok_or(CutMeshError::UnknownElement(id))
    }

    /// Id of the element whose node list is exactly `nodes`, in order.
    pub fn elem_id_by_nodes(&self, nodes: &[u32]) -> Option<u32> {
        self.elements
            .values()
            .find(|e| {
                e.num_nodes() == nodes.len()
                    && e.nodes().iter().zip(nodes).all(|(k, &n)| k.id() == n)
            })
            .map(Element::id)
    }

    pub fn element_state(&self, id: u32) -> Result<ElementState, CutMeshError> {
        Ok(self.get_elem_by_id(id)?.state())
    }

    pub fn is_crack_tip_element(&self, id: u32) -> bool {
        self.crack_tip_elements.contains(&id)
    }

    pub fn crack_tip_elements(&self) -> &BTreeSet<u32> {
        &self.crack_tip_elements
    }

    /// Elements incident to each node, derived from the current connectivity.
    pub fn node_to_elements(&self) -> BTreeMap<NodeKey, BTreeSet<u32>> {
        let mut map: BTreeMap<NodeKey, BTreeSet<u32>> = BTreeMap::new();
        for elem in self.elements.values() {
            for &node in elem.nodes() {
                map.entry(node).or_default().insert(elem.id());
            }
        }
        map
    }

    /// Output of the last `update_topology`.
    pub fn last_delta(&self) -> &TopologyDelta {
        &self.delta
    }

    pub fn child_elements(&self) -> &[u32] {
        &self.delta.child_elements
    }

    pub fn parent_elements(&self) -> &[u32] {
        &self.delta.parent_elements
    }

    pub fn new_nodes(&self) -> &[NewNode] {
        &self.delta.new_nodes
    }

    /// Interpolation masters of `node` within element `elem`.
    pub fn master_info(&self, elem: u32, node: NodeKey) -> Result<Vec<MasterTerm>, CutMeshError> {
        self.get_elem_by_id(elem)?.master_info(node)
    }

    // -------------------------------------------------------------------------
    // Handles
    // -------------------------------------------------------------------------

    /// Element behind `handle`, if it still exists in the generation the
    /// handle was issued for.
    pub fn resolve_element(&self, handle: ElementHandle) -> Result<&Element, CutMeshError> {
        match self.elements.get(&handle.id) {
            Some(elem) if elem.generation() == handle.generation => Ok(elem),
            found => Err(CutMeshError::StaleHandle {
                what: "element",
                id: handle.id,
                handle: handle.generation.get(),
                current: found.map_or(self.generation, Element::generation).get(),
            }),
        }
    }

    pub fn node_handle(&self, key: NodeKey) -> Result<NodeHandle, CutMeshError> {
        let node = self.node(key)?;
        Ok(NodeHandle {
            key,
            generation: node.generation(),
        })
    }

    pub fn resolve_node(&self, handle: NodeHandle) -> Result<&Node, CutMeshError> {
        match self.pool(handle.key.category()).and_then(|p| p.get(handle.key)) {
            Some(node) if node.generation() == handle.generation => Ok(node),
            found => Err(CutMeshError::StaleHandle {
                what: "node",
                id: handle.key.id(),
                handle: handle.generation.get(),
                current: found.map_or(self.generation, Node::generation).get(),
            }),
        }
    }

    /// Pooled node for `key`.
    pub fn node(&self, key: NodeKey) -> Result<&Node, CutMeshError> {
        self.pool(key.category())
            .and_then(|p| p.get(key))
            .ok_or(CutMeshError::UnknownNode(key))
    }

    pub(crate) fn pool(&self, category: NodeCategory) -> Option<&NodePool> {
        match category {
            NodeCategory::Permanent => Some(&self.permanent_nodes),
            NodeCategory::Temp => Some(&self.temp_nodes),
            NodeCategory::Embedded => Some(&self.embedded_nodes),
            NodeCategory::LocalIndex => None,
        }
    }

    pub(crate) fn node_parent(&self, key: NodeKey) -> Result<Option<NodeKey>, CutMeshError> {
        Ok(self.node(key)?.parent())
    }

    // -------------------------------------------------------------------------
    // Element access and node replacement
    // -------------------------------------------------------------------------

    pub(crate) fn elem_mut(&mut self, id: u32) -> Result<&mut Element, CutMeshError> {
        self.elements
            .get_mut(&id)
            .ok_or(CutMeshError::UnknownElement(id))
    }

    pub(crate) fn check_edge(&self, elem: u32, edge: usize) -> Result<&Element, CutMeshError> {
        let e = self.get_elem_by_id(elem)?;
        if edge >= e.num_edges() {
            return Err(CutMeshError::EdgeOutOfRange {
                element: elem,
                edge,
                num_edges: e.num_edges(),
            });
        }
        Ok(e)
    }

    /// Replace `old` by `new` in `elem`. With `descend`, the replacement also
    /// reaches the parent of `elem` and every element standing on the
    /// parent's neighbor edges.
    pub(crate) fn switch_node(
        &mut self,
        elem: u32,
        new: NodeKey,
        old: NodeKey,
        descend: bool,
    ) -> Result<(), CutMeshError> {
        let target = self.elem_mut(elem)?;
        target.switch_node(new, old);
        let parent = target.parent();
        let Some(parent) = parent.filter(|_| descend) else {
            return Ok(());
        };
        let parent_elem = self.elem_mut(parent)?;
        parent_elem.switch_node(new, old);
        let neighbors: BTreeSet<u32> = (0..parent_elem.num_edges())
            .flat_map(|i| parent_elem.edge_neighbors(i).to_vec())
            .collect();
        for neighbor in neighbors {
            for id in self.get_elem_by_id(neighbor)?.children_or_self() {
                self.elem_mut(id)?.switch_node(new, old);
            }
        }
        Ok(())
    }

    /// Create a fresh embedded node.
    pub(crate) fn create_embedded_node(&mut self) -> NodeKey {
        self.embedded_nodes.create(None, self.generation)
    }

    // -------------------------------------------------------------------------
    // Rollback
    // -------------------------------------------------------------------------

    /// Drop every node, element and cut, keeping only the options. The
    /// generation advances so handles issued before the reset go stale.
    pub fn reset(&mut self) {
        self.permanent_nodes.clear();
        self.temp_nodes.clear();
        self.embedded_nodes.clear();
        self.elements.clear();
        self.crack_tip_elements.clear();
        self.delta = TopologyDelta::default();
        self.generation = self.generation.next();
        log::debug!("cut mesh reset, generation {}", self.generation.get());
    }

    /// Forget the lineage of the last update: parent elements are deleted,
    /// children become ordinary elements, and new permanent nodes lose their
    /// parent links. The crack-tip set survives.
    pub fn clear_ancestry(&mut self) -> Result<(), CutMeshError> {
        for &parent in &self.delta.parent_elements {
            if self.elements.remove(&parent).is_none() {
                return Err(CutMeshError::UnknownElement(parent));
            }
        }
        for elem in self.elements.values_mut() {
            elem.set_parent(None);
            elem.children_mut().clear();
        }
        for node in self.permanent_nodes.iter_mut() {
            node.remove_parent();
        }
        self.temp_nodes.clear();
        self.delta.child_elements.clear();
        self.delta.parent_elements.clear();
        self.delta.new_nodes.clear();
        self.generation = self.generation.next();
        log::debug!(
            "ancestry cleared, {} elements remain, generation {}",
            self.elements.len(),
            self.generation.get()
        );
        Ok(())
    }

    /// Copy fragments and interior nodes of a saved local copy onto a freshly
    /// added element, mapping local indices to the element's nodes.
    pub fn restore_fragment_info(&mut self, elem: u32, saved: &Element) -> Result<(), CutMeshError> {
        let generation = self.generation;
        let target = self.get_elem_by_id(elem)?;
        if !target.fragments().is_empty() {
            return Err(CutMeshError::Invariant(format!(
                "element {elem} already has fragments, cannot restore"
            )));
        }
        if target.num_interior_nodes() != 0 {
            return Err(CutMeshError::Invariant(format!(
                "element {elem} already has interior nodes, cannot restore"
            )));
        }
        if saved.num_nodes() != target.num_nodes() {
            return Err(CutMeshError::InvalidElementArity {
                found: saved.num_nodes(),
            });
        }
        if let Some(global) = saved.nodes().iter().find(|n| !n.is_local()) {
            return Err(CutMeshError::Invariant(format!(
                "saved copy of element {elem} holds global node {global}"
            )));
        }

        let referenced: BTreeSet<NodeKey> = saved
            .fragments()
            .iter()
            .flat_map(|f| f.embedded_nodes())
            .chain(saved.interior_nodes().iter().map(|f| f.node()))
            .collect();
        for node in referenced {
            self.embedded_nodes.get_or_create(node.id(), generation);
        }

        let target = self.elem_mut(elem)?;
        for frag in saved.fragments() {
            let mut frag = frag.clone();
            frag.set_host(elem);
            target.fragments_mut().push(frag);
        }
        target
            .interior_nodes_mut()
            .extend(saved.interior_nodes().iter().copied());
        let globals = target.nodes().to_vec();
        for (local, global) in saved.nodes().iter().zip(globals) {
            target.switch_node(global, *local);
        }
        Ok(())
    }

    /// Replay the edge cuts of a saved copy, keeping their embedded nodes.
    pub fn restore_edge_intersections(
        &mut self,
        elem: u32,
        saved: &Element,
    ) -> Result<(), CutMeshError> {
        for (i, edge) in saved.edges().iter().enumerate() {
            let Some(embedded) = edge.embedded_node() else {
                continue;
            };
            let position = edge.intersection(saved.node(i))?;
            self.add_edge_intersection_with(elem, i, position, Some(embedded))?;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Topology update
    // -------------------------------------------------------------------------

    /// Run child creation, stitching and crack-tip classification with the
    /// configured merge policy.
    pub fn update_topology(&mut self) -> Result<&TopologyDelta, CutMeshError> {
        self.update_topology_with(self.options.merge_uncut_virtual_edges)
    }

    /// `update_topology` with an explicit merge policy. With
    /// `merge_uncut_virtual_edges` the phantom sides of neighboring children
    /// are stitched together along uncut edges (classical XFEM); without it
    /// they stay independent.
    pub fn update_topology_with(
        &mut self,
        merge_uncut_virtual_edges: bool,
    ) -> Result<&TopologyDelta, CutMeshError> {
        self.delta = TopologyDelta::default();
        let first_new_node = self.permanent_nodes.next_id();

        let split = self.create_child_elements()?;
        log::debug!(
            "created {} children from {} parents",
            split.children.len(),
            split.parents.len()
        );
        self.validate_stage("create_child_elements")?;

        let merged = self.connect_fragments(&split.children, merge_uncut_virtual_edges)?;
        log::debug!("stitched {} merged edges", merged.len());
        self.sanity_check()?;
        self.validate_stage("connect_fragments")?;

        self.find_crack_tip_elements(&split.parents, &merged)?;
        log::debug!("crack tip elements: {:?}", self.crack_tip_elements);

        let new_nodes = self
            .permanent_nodes
            .iter()
            .filter(|n| n.id() >= first_new_node)
            .map(|n| NewNode {
                key: n.key(),
                parent: n.parent(),
            })
            .collect();
        self.delta = TopologyDelta {
            child_elements: split.children,
            parent_elements: split.parents,
            new_nodes,
            merged_edges: merged,
            crack_tip_elements: self.crack_tip_elements.clone(),
        };
        Ok(&self.delta)
    }
}

impl fmt::Display for CutMesh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "cut mesh (generation {})", self.generation.get())?;
        for pool in [&self.permanent_nodes, &self.temp_nodes, &self.embedded_nodes] {
            writeln!(
                f,
                "{:?} nodes: [{}]",
                pool.category(),
                pool.iter()
                    .map(|n| match n.parent() {
                        Some(parent) => format!("{}<{parent}", n.key()),
                        None => n.key().to_string(),
                    })
                    .join(", ")
            )?;
        }
        for elem in self.elements.values() {
            write!(f, "{elem}")?;
        }
        if !self.crack_tip_elements.is_empty() {
            writeln!(
                f,
                "crack tip elements: [{}]",
                self.crack_tip_elements.iter().join(", ")
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_quads() -> CutMesh {
        let mut mesh = CutMesh::default();
        mesh.add_elements(&[vec![0, 1, 2, 3], vec![3, 2, 4, 5]])
            .unwrap();
        mesh
    }

    #[test]
    fn ingestion_numbers_elements_after_the_largest_id() {
        let mut mesh = two_quads();
        assert_eq!(mesh.num_elements(), 2);
        assert_eq!(mesh.permanent_nodes().len(), 6);
        mesh.add_element(&[5, 4, 6, 7], 10).unwrap();
        assert_eq!(mesh.add_elements(&[vec![7, 6, 8]]).unwrap(), 11);
        assert_eq!(
            mesh.add_element(&[0, 1, 2], 10).unwrap_err(),
            CutMeshError::DuplicateElement(10)
        );
        assert_eq!(
            mesh.add_elements(&[]).unwrap_err(),
            CutMeshError::EmptyConnectivity
        );
    }

    #[test]
    fn elements_are_found_by_exact_node_lists() {
        let mesh = two_quads();
        assert_eq!(mesh.elem_id_by_nodes(&[3, 2, 4, 5]), Some(1));
        assert_eq!(mesh.elem_id_by_nodes(&[2, 3, 4, 5]), None);
    }

    #[test]
    fn node_to_elements_is_derived_from_connectivity() {
        let mesh = two_quads();
        let map = mesh.node_to_elements();
        assert_eq!(map[&NodeKey::permanent(2)], BTreeSet::from([0, 1]));
        assert_eq!(map[&NodeKey::permanent(0)], BTreeSet::from([0]));
    }

    #[test]
    fn reset_invalidates_handles() {
        let mut mesh = two_quads();
        let elem = mesh.get_elem_by_id(0).unwrap().handle();
        let node = mesh.node_handle(NodeKey::permanent(1)).unwrap();
        assert!(mesh.resolve_element(elem).is_ok());

        mesh.reset();
        mesh.add_elements(&[vec![0, 1, 2, 3], vec![3, 2, 4, 5]])
            .unwrap();
        assert!(matches!(
            mesh.resolve_element(elem),
            Err(CutMeshError::StaleHandle { what: "element", .. })
        ));
        assert!(matches!(
            mesh.resolve_node(node),
            Err(CutMeshError::StaleHandle { what: "node", .. })
        ));
    }

    #[test]
    fn switch_node_can_descend_into_the_parent() {
        let mut mesh = two_quads();
        mesh.elem_mut(1).unwrap().set_parent(Some(0));
        let (new, old) = (NodeKey::temp(0), NodeKey::permanent(3));
        mesh.switch_node(1, new, old, true).unwrap();
        assert_eq!(mesh.get_elem_by_id(0).unwrap().node(3), new);
        assert_eq!(mesh.get_elem_by_id(1).unwrap().node(0), new);
    }
}
