//! Partitioning cut elements into fragments.

use crate::cut_mesh::CutMesh;
use crate::mesh_error::CutMeshError;
use crate::topology::element::Element;
use crate::topology::fragment::Fragment;
use crate::topology::node::NodeCategory;
use std::collections::BTreeSet;

const MEASURE_TOL: f64 = 1e-9;

impl CutMesh {
    /// Rebuild the fragments of every element from its cuts.
    ///
    /// Per element: crack-tip elements first fold their split tip edge back
    /// into one cut edge; a lone cut on an interior edge is dropped together
    /// with its interior node; an element without fragments gets one
    /// covering its boundary. The single fragment is then split at its cuts.
    /// Uncut elements end with no fragment, previously cut elements keep
    /// theirs.
    pub fn update_physical_links_and_fragments(&mut self) -> Result<(), CutMeshError> {
        let tol = self.options.intersection_tolerance;
        let ids: Vec<u32> = self.elements.keys().copied().collect();
        let mut split_count = 0usize;
        for id in ids {
            let is_tip = self.crack_tip_elements.contains(&id);
            let mut dropped = None;
            {
                let elem = self.elem_mut(id)?;
                if is_tip && elem.num_fragments() == 1 {
                    let host_edges = elem.edges().to_vec();
                    elem.fragments_mut()[0].combine_tip_edges(&host_edges, tol)?;
                }
                if let [frag] = elem.fragments() {
                    if frag.num_cuts() == 1 {
                        let lone = frag
                            .edges()
                            .iter()
                            .position(|e| e.is_interior_edge() && e.has_intersection());
                        if let Some(i) = lone {
                            if elem.num_interior_nodes() != 1 {
                                return Err(CutMeshError::Invariant(format!(
                                    "element {id} has a cut interior edge but {} interior nodes",
                                    elem.num_interior_nodes()
                                )));
                            }
                            let frag_edge = elem.fragments_mut()[0].edge_mut(i);
                            dropped = frag_edge.embedded_node();
                            frag_edge.remove_embedded_node();
                            elem.interior_nodes_mut().clear();
                        }
                    }
                }
            }
            if let Some(node) = dropped {
                self.embedded_nodes.remove(node);
            }

            let elem = self.elem_mut(id)?;
            if elem.fragments().is_empty() {
                let boundary = Fragment::from_boundary(id, elem.edges());
                elem.fragments_mut().push(boundary);
            }
            if elem.num_fragments() != 1 {
                return Err(CutMeshError::FragmentCount {
                    element: id,
                    found: elem.num_fragments(),
                    context: "exactly one fragment is expected before splitting",
                });
            }
            let cuts = elem.fragment(0).num_cuts();
            if cuts > 2 {
                return Err(CutMeshError::Invariant(format!(
                    "element {id} has {cuts} cut fragment edges, at most 2 are supported"
                )));
            }
            if cuts == 0 {
                if !elem.has_phantom_nodes() {
                    elem.fragments_mut().clear();
                }
                continue;
            }

            let before = elem.fragment(0).clone();
            let pieces = before.split()?;
            if !(1..=2).contains(&pieces.len()) {
                return Err(CutMeshError::FragmentCount {
                    element: id,
                    found: pieces.len(),
                    context: "splitting must produce one or two fragments",
                });
            }
            *elem.fragments_mut() = pieces;
            physical_link_and_fragment_sanity_check(elem, &before)?;
            split_count += 1;
        }
        log::debug!("re-partitioned {split_count} cut elements");
        self.validate_stage("update_physical_links_and_fragments")
    }
}

/// Checks a freshly split element: closed loops, conserved boundary
/// measure, at most one interior node, and node counts that match the
/// number of cut element edges.
pub fn physical_link_and_fragment_sanity_check(
    elem: &Element,
    before: &Fragment,
) -> Result<(), CutMeshError> {
    let id = elem.id();
    let num_edges = elem.num_edges();
    let cut_edges = elem.num_cuts();
    if cut_edges > 3 {
        return Err(CutMeshError::Invariant(format!(
            "element {id} has {cut_edges} cut edges"
        )));
    }
    if elem.num_interior_nodes() > 1 {
        return Err(CutMeshError::Invariant(format!(
            "element {id} has {} interior nodes after partitioning",
            elem.num_interior_nodes()
        )));
    }

    let mut num_perm = Vec::with_capacity(elem.num_fragments());
    let mut num_emb = Vec::with_capacity(elem.num_fragments());
    for (i, frag) in elem.fragments().iter().enumerate() {
        if !frag.is_closed() {
            return Err(CutMeshError::OpenFragment {
                element: id,
                fragment: i,
            });
        }
        let mut perm = BTreeSet::new();
        let mut emb = BTreeSet::new();
        for node in frag.edges().iter().flat_map(|e| e.nodes()) {
            match node.category() {
                NodeCategory::Permanent => perm.insert(node),
                NodeCategory::Embedded => emb.insert(node),
                _ => {
                    return Err(CutMeshError::Invariant(format!(
                        "fragment {i} of element {id} holds node {node} of category {:?}",
                        node.category()
                    )));
                }
            };
        }
        num_perm.push(perm.len());
        num_emb.push(emb.len());
    }

    let expected = before.boundary_measure(elem.edges());
    let measured: f64 = elem
        .fragments()
        .iter()
        .map(|f| f.boundary_measure(elem.edges()))
        .sum();
    if (expected - measured).abs() > MEASURE_TOL {
        return Err(CutMeshError::Invariant(format!(
            "element {id} fragments cover {measured} of the boundary, expected {expected}"
        )));
    }

    let sizes: Vec<usize> = elem.fragments().iter().map(Fragment::num_edges).collect();
    let counts_ok = match cut_edges {
        0 => sizes == [num_edges] && num_emb == [0] && num_perm == [num_edges],
        1 => sizes == [num_edges + 1] && num_emb == [1] && num_perm == [num_edges],
        2 => {
            sizes.len() == 2
                && sizes.iter().sum::<usize>() == num_edges + 4
                && num_emb == [2, 2]
                && num_perm.iter().sum::<usize>() == num_edges
        }
        _ => num_emb.iter().all(|&n| n == 3),
    };
    if !counts_ok {
        return Err(CutMeshError::Invariant(format!(
            "element {id} with {cut_edges} cut edges has fragments of sizes {sizes:?} \
             with {num_emb:?} embedded and {num_perm:?} permanent nodes"
        )));
    }
    Ok(())
}
