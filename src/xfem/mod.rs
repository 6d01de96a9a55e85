//! XFEM adapter: drives the cut-mesh engine from a host mesh.
//!
//! Every [`Xfem::update`] rebuilds the engine from the host connectivity and
//! the saved [`CutElem`]s, marks new cuts from the registered geometric cuts
//! and the pending state marks, runs the topology pipeline, and writes the
//! resulting child elements and duplicated nodes back into the host.

pub mod cut_elem;
pub mod host;

pub use cut_elem::{CutElem, node_coords};
pub use host::HostMesh;

use crate::cut::plane::PlaneCut;
use crate::cut::state::{MarkOrigin, StateMarks};
use crate::cut::{GeometricCutSource, GeometricCut};
use crate::cut_mesh::{CutMesh, TopologyDelta, TopologyOptions};
use crate::mesh_error::CutMeshError;
use crate::topology::edge::Edge;
use crate::topology::element::Element;
use crate::topology::node::NodeKey;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Adapter configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XfemOptions {
    pub topology: TopologyOptions,
    /// Geometric cuts active from the start.
    pub cuts: Vec<GeometricCutSource>,
}

/// Component of a cut plane returned by [`Xfem::get_cut_plane`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CutPlaneQuantity {
    OriginX,
    OriginY,
    OriginZ,
    NormalX,
    NormalY,
    NormalZ,
}

impl TryFrom<usize> for CutPlaneQuantity {
    type Error = CutMeshError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        use CutPlaneQuantity::*;
        Ok(match value {
            0 => OriginX,
            1 => OriginY,
            2 => OriginZ,
            3 => NormalX,
            4 => NormalY,
            5 => NormalZ,
            other => return Err(CutMeshError::InvalidCutPlaneQuantity(other)),
        })
    }
}

pub struct Xfem {
    mesh: CutMesh,
    cuts: Vec<GeometricCutSource>,
    marks: StateMarks,
    cut_elems: BTreeMap<u32, CutElem>,
    crack_tip_elems: BTreeSet<u32>,
}

impl Default for Xfem {
    fn default() -> Self {
        Self::new(XfemOptions::default())
    }
}

impl Xfem {
    pub fn new(options: XfemOptions) -> Self {
        Self {
            mesh: CutMesh::new(options.topology),
            cuts: options.cuts,
            marks: StateMarks::new(),
            cut_elems: BTreeMap::new(),
            crack_tip_elems: BTreeSet::new(),
        }
    }

    /// The engine as left by the last update.
    pub fn cut_mesh(&self) -> &CutMesh {
        &self.mesh
    }

    pub fn cut_elem(&self, elem: u32) -> Option<&CutElem> {
        self.cut_elems.get(&elem)
    }

    pub fn crack_tip_elements(&self) -> &BTreeSet<u32> {
        &self.crack_tip_elems
    }

    pub fn add_geometric_cut(&mut self, cut: impl Into<GeometricCutSource>) {
        self.cuts.push(cut.into());
    }

    /// Request crack growth through `elem` along a crack with `normal`.
    pub fn add_state_marked_elem(&mut self, elem: u32, normal: [f64; 2]) -> Result<(), CutMeshError> {
        self.marks.mark_elem(elem, normal)
    }

    /// Request a crack initiating at the midpoint of side `side` of `elem`.
    pub fn add_state_marked_elem_side(
        &mut self,
        elem: u32,
        normal: [f64; 2],
        side: usize,
    ) -> Result<(), CutMeshError> {
        self.marks.mark_elem_side(elem, normal, side)
    }

    /// Request a secondary crack branching off the interior cut of `elem`.
    pub fn add_state_marked_frag(&mut self, elem: u32, normal: [f64; 2]) -> Result<(), CutMeshError> {
        self.marks.mark_frag(elem, normal)
    }

    pub fn clear_state_marked_elems(&mut self) {
        self.marks.clear();
    }

    // -------------------------------------------------------------------------
    // Update cycle
    // -------------------------------------------------------------------------

    /// Cut the host mesh at `time`. Returns whether the host changed.
    ///
    /// State marks are consumed by the update.
    pub fn update(&mut self, host: &mut HostMesh, time: f64) -> Result<bool, CutMeshError> {
        self.build_cut_mesh(host)?;
        let changed = if self.mark_cut_edges(host, time)? {
            let delta = self.cut_mesh_with_efa()?;
            self.apply_delta(host, &delta)?
        } else {
            false
        };
        self.marks.clear();
        log::info!(
            "xfem update at t = {time}: host {} changed, {} cut elements, {} crack-tip elements",
            if changed { "was" } else { "not" },
            self.cut_elems.len(),
            self.crack_tip_elems.len()
        );
        Ok(changed)
    }

    fn build_cut_mesh(&mut self, host: &HostMesh) -> Result<(), CutMeshError> {
        self.mesh.reset();
        for (id, nodes) in host.elements() {
            self.mesh.add_element(nodes, id)?;
        }
        for (&id, saved) in &self.cut_elems {
            self.mesh.restore_fragment_info(id, saved.cut_mesh_elem())?;
        }
        self.mesh.update_edge_neighbors()?;
        for (&id, saved) in &self.cut_elems {
            self.mesh.restore_edge_intersections(id, saved.cut_mesh_elem())?;
        }
        self.mesh.init_crack_tip_topology()?;
        self.crack_tip_elems.clone_from(self.mesh.crack_tip_elements());
        log::debug!(
            "rebuilt cut mesh with {} elements, {} restored cut elements",
            self.mesh.num_elements(),
            self.cut_elems.len()
        );
        Ok(())
    }

    fn mark_cut_edges(&mut self, host: &HostMesh, time: f64) -> Result<bool, CutMeshError> {
        let by_geometry = self.mark_cut_edges_by_geometry(host, time)?;
        let by_state = self.mark_cut_edges_by_state(host)?;
        Ok(by_geometry || by_state)
    }

    fn mark_cut_edges_by_geometry(&mut self, host: &HostMesh, time: f64) -> Result<bool, CutMeshError> {
        if self.cuts.is_empty() {
            return Ok(false);
        }
        let mut marked = false;
        let ids: Vec<u32> = self.mesh.elements().keys().copied().collect();
        for id in ids {
            let elem = self.mesh.get_elem_by_id(id)?;
            if elem.is_cut_twice() {
                continue;
            }
            if elem.num_fragments() > 1 {
                return Err(CutMeshError::FragmentCount {
                    element: id,
                    found: elem.num_fragments(),
                    context: "cuts are marked on elements with at most one fragment",
                });
            }
            let corners = host.element_coords(id)?;
            let elem_edges = element_segments(&corners);
            let frag_edges = fragment_segments(elem, &corners)?;
            let phantom: Vec<bool> = (0..elem.num_edges()).map(|i| elem.is_edge_phantom(i)).collect();
            let markable: Vec<bool> = match elem.fragments().first() {
                Some(frag) => (0..frag.num_edges())
                    .map(|i| frag.is_edge_interior(i) && !elem.is_secondary_interior_edge(i))
                    .collect(),
                None => Vec::new(),
            };

            let mut elem_cuts = Vec::new();
            let mut frag_cuts = Vec::new();
            for cut in &self.cuts {
                elem_cuts.extend(cut.cut_edges(&elem_edges, time)?);
                frag_cuts.extend(cut.cut_edges(&frag_edges, time)?);
            }
            for cut in elem_cuts {
                if !phantom[cut.edge] {
                    self.mesh.add_edge_intersection(id, cut.edge, cut.position)?;
                    marked = true;
                }
            }
            // Fragment edges only after all element edges of this element.
            for cut in frag_cuts {
                if markable[cut.edge]
                    && self
                        .mesh
                        .add_frag_edge_intersection(id, cut.edge, cut.position)?
                        .is_some()
                {
                    marked = true;
                }
            }
        }
        Ok(marked)
    }

    fn mark_cut_edges_by_state(&mut self, host: &HostMesh) -> Result<bool, CutMeshError> {
        let mut marked = false;
        let marks: Vec<(u32, [f64; 2])> = self.marks.iter().collect();
        for (id, normal) in marks {
            let elem = self.mesh.get_elem_by_id(id)?;
            if elem.is_cut_twice() {
                continue;
            }
            let corners = host.element_coords(id)?;
            let at_tip = self.crack_tip_elems.contains(&id);
            let (orig_edge, orig_node) = match self.marks.origin(id, at_tip) {
                Some(MarkOrigin::CrackTip) => crack_tip_origin(elem)?,
                Some(MarkOrigin::Side(side)) => {
                    let elem = self.mesh.check_edge(id, side)?;
                    if elem.is_edge_phantom(side) || elem.edge(side).has_intersection() {
                        log::debug!("element {id}: side {side} cannot start a crack, skipped");
                        continue;
                    }
                    let node = self.mesh.add_edge_intersection(id, side, 0.5)?;
                    (self.mesh.get_elem_by_id(id)?.edge(side).clone(), node)
                }
                Some(MarkOrigin::Fragment) => {
                    if elem.num_fragments() != 1 {
                        return Err(CutMeshError::FragmentCount {
                            element: id,
                            found: elem.num_fragments(),
                            context: "a secondary crack starts on exactly one fragment",
                        });
                    }
                    let Ok(interior) = elem.fragment(0).interior_edge_ids().into_iter().exactly_one()
                    else {
                        continue;
                    };
                    let Some(node) = self.mesh.add_frag_edge_intersection(id, interior, 0.5)? else {
                        continue;
                    };
                    let elem = self.mesh.get_elem_by_id(id)?;
                    (elem.fragment(0).edge(interior).clone(), node)
                }
                None => {
                    return Err(CutMeshError::Invariant(format!(
                        "element {id} is marked for growth but has no crack to grow from"
                    )));
                }
            };

            let elem = self.mesh.get_elem_by_id(id)?;
            let plane = PlaneCut::new(node_coords(elem, orig_node, &corners)?, normal);
            let mut elem_hit = None;
            for (i, [first, second]) in element_segments(&corners).into_iter().enumerate() {
                if orig_edge.is_partial_overlap(elem.edge(i)) || elem.is_edge_phantom(i) {
                    continue;
                }
                if let Some(position) = plane.edge_cut(first, second, 0.0)? {
                    elem_hit = Some((i, position));
                    break;
                }
            }
            if let Some((edge, position)) = elem_hit {
                self.mesh.add_edge_intersection(id, edge, position)?;
            }

            let elem = self.mesh.get_elem_by_id(id)?;
            let mut frag_hit = None;
            if let Some(frag) = elem.fragments().first() {
                for (i, [first, second]) in fragment_segments(elem, &corners)?.into_iter().enumerate() {
                    let edge = frag.edge(i);
                    if orig_edge.is_partial_overlap(edge)
                        || !edge.is_interior_edge()
                        || elem.is_secondary_interior_edge(i)
                    {
                        continue;
                    }
                    if let Some(position) = plane.edge_cut(first, second, 0.0)? {
                        frag_hit = Some((i, position));
                        break;
                    }
                }
            }
            if let Some((edge, position)) = frag_hit {
                self.mesh.add_frag_edge_intersection(id, edge, position)?;
            }
            marked = true;
        }
        Ok(marked)
    }

    fn cut_mesh_with_efa(&mut self) -> Result<TopologyDelta, CutMeshError> {
        self.mesh.update_physical_links_and_fragments()?;
        Ok(self.mesh.update_topology()?.clone())
    }

    /// Write new nodes and child elements into the host, drop the parents,
    /// and record the crack tip in host numbering.
    fn apply_delta(&mut self, host: &mut HostMesh, delta: &TopologyDelta) -> Result<bool, CutMeshError> {
        let mut changed = false;
        let mut node_map: BTreeMap<u32, u32> = BTreeMap::new();
        for new_node in &delta.new_nodes {
            let parent = new_node.parent.ok_or_else(|| {
                CutMeshError::Invariant(format!("new node {} has no parent", new_node.key))
            })?;
            let coords = host.coords(parent.id())?;
            let host_id = host.add_node(coords);
            log::debug!("host node {host_id} duplicates {}", parent.id());
            node_map.insert(new_node.key.id(), host_id);
            changed = true;
        }

        let mut elem_map: BTreeMap<u32, u32> = BTreeMap::new();
        for &child in &delta.child_elements {
            let elem = self.mesh.get_elem_by_id(child)?;
            let nodes = elem
                .nodes()
                .iter()
                .map(|&key| host_node_id(key, &node_map))
                .collect::<Result<Vec<_>, _>>()?;
            let host_id = host.add_element(&nodes)?;
            self.cut_elems.insert(host_id, CutElem::new(elem)?);
            elem_map.insert(child, host_id);
            changed = true;
        }

        for &parent in &delta.parent_elements {
            host.delete_element(parent)?;
            self.cut_elems.remove(&parent);
            changed = true;
        }

        self.crack_tip_elems = delta
            .crack_tip_elements
            .iter()
            .map(|e| elem_map.get(e).copied().unwrap_or(*e))
            .collect();
        Ok(changed)
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Physical share of a host element's area: the fragment area over the
    /// element area for partial elements, 1 otherwise.
    pub fn get_elem_phys_volfrac(&self, host: &HostMesh, elem: u32) -> Result<f64, CutMeshError> {
        match self.cut_elems.get(&elem).filter(|c| c.is_partial()) {
            Some(cut) => cut.physical_volfrac(&host.element_coords(elem)?),
            None => Ok(1.0),
        }
    }

    /// One component of the `plane_id`-th cut plane of a host element, given
    /// as a quantity index `0..6` (origin x, y, z, then normal x, y, z).
    /// Elements that are not partially cut report 0.
    pub fn get_cut_plane(
        &self,
        host: &HostMesh,
        elem: u32,
        quantity: usize,
        plane_id: usize,
    ) -> Result<f64, CutMeshError> {
        let quantity = CutPlaneQuantity::try_from(quantity)?;
        let Some(cut) = self.cut_elems.get(&elem).filter(|c| c.is_partial()) else {
            return Ok(0.0);
        };
        let corners = host.element_coords(elem)?;
        use CutPlaneQuantity::*;
        Ok(match quantity {
            OriginX => cut.origin(plane_id, &corners)?[0],
            OriginY => cut.origin(plane_id, &corners)?[1],
            NormalX => cut.normal(plane_id, &corners)?[0],
            NormalY => cut.normal(plane_id, &corners)?[1],
            OriginZ | NormalZ => 0.0,
        })
    }

    pub fn is_elem_cut(&self, elem: u32) -> bool {
        self.cut_elems.get(&elem).is_some_and(CutElem::is_partial)
    }

    pub fn is_elem_at_crack_tip(&self, elem: u32) -> bool {
        self.crack_tip_elems.contains(&elem)
    }
}

fn element_segments(corners: &[[f64; 2]]) -> Vec<[[f64; 2]; 2]> {
    corners
        .iter()
        .circular_tuple_windows()
        .map(|(&a, &b)| [a, b])
        .collect()
}

fn fragment_segments(elem: &Element, corners: &[[f64; 2]]) -> Result<Vec<[[f64; 2]; 2]>, CutMeshError> {
    let Some(frag) = elem.fragments().first() else {
        return Ok(Vec::new());
    };
    frag.edges()
        .iter()
        .map(|e| -> Result<[[f64; 2]; 2], CutMeshError> {
            Ok([
                node_coords(elem, e.node(0), corners)?,
                node_coords(elem, e.node(1), corners)?,
            ])
        })
        .collect()
}

/// Cut edge a crack-tip element continues from. Elements that have no
/// fragment yet carry exactly one cut edge, received from their split
/// neighbor.
fn crack_tip_origin(elem: &Element) -> Result<(Edge, NodeKey), CutMeshError> {
    let edge = match elem.tip_edge_id() {
        Some(edge) => Some(edge),
        None if elem.fragments().is_empty() => (0..elem.num_edges())
            .filter(|&i| elem.edge(i).has_intersection())
            .exactly_one()
            .ok(),
        None => None,
    };
    let edge = edge.ok_or_else(|| {
        CutMeshError::Invariant(format!("element {} has no valid crack-tip edge", elem.id()))
    })?;
    let cut = elem.edge(edge).clone();
    let node = cut.embedded_node().ok_or_else(|| {
        CutMeshError::Invariant(format!("crack-tip edge {edge} of element {} is not cut", elem.id()))
    })?;
    Ok((cut, node))
}

fn host_node_id(key: NodeKey, new_nodes: &BTreeMap<u32, u32>) -> Result<u32, CutMeshError> {
    if !key.is_permanent() {
        return Err(CutMeshError::Invariant(format!(
            "child element holds non-permanent node {key}"
        )));
    }
    Ok(new_nodes.get(&key.id()).copied().unwrap_or(key.id()))
}
