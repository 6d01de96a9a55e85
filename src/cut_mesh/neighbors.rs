//! Edge-neighbor discovery and crack-tip seeding.

use crate::cut_mesh::CutMesh;
use crate::mesh_error::CutMeshError;
use crate::topology::node::NodeKey;
use std::collections::BTreeSet;

impl CutMesh {
    /// Rebuild the per-edge neighbor lists of every element.
    ///
    /// Two elements are neighbors across an edge when both of the edge's
    /// nodes are shared, the other element traverses the edge in the
    /// opposite direction, and, when both carry a fragment, the fragments
    /// are connected. Crack-tip flags are cleared as well; run
    /// [`CutMesh::init_crack_tip_topology`] afterwards to recompute them.
    pub fn update_edge_neighbors(&mut self) -> Result<(), CutMeshError> {
        for elem in self.elements.values_mut() {
            elem.clear_neighbors();
        }
        let incidence = self.node_to_elements();

        let mut found: Vec<(u32, usize, u32)> = Vec::new();
        for curr in self.elements.values() {
            let candidates: BTreeSet<u32> = curr
                .nodes()
                .iter()
                .filter_map(|n| incidence.get(n))
                .flatten()
                .copied()
                .filter(|&id| id != curr.id())
                .collect();
            for neigh_id in candidates {
                let neigh = self.get_elem_by_id(neigh_id)?;
                let common = curr.common_nodes(neigh);
                if common.len() < 2 {
                    continue;
                }
                for (i, edge) in curr.edges().iter().enumerate() {
                    let [a, b] = edge.nodes();
                    if !(common.contains(&a) && common.contains(&b)) {
                        continue;
                    }
                    if neigh.overlays_edge(a, b)? {
                        continue;
                    }
                    let connected = match (curr.num_fragments(), neigh.num_fragments()) {
                        (c, n) if c > 1 || n > 1 => {
                            return Err(CutMeshError::FragmentCount {
                                element: if c > 1 { curr.id() } else { neigh_id },
                                found: c.max(n),
                                context: "neighbors can only be matched up with at most one fragment",
                            });
                        }
                        (1, 1) => curr.fragment(0).is_connected(neigh.fragment(0)),
                        _ => true,
                    };
                    if connected {
                        found.push((curr.id(), i, neigh_id));
                    }
                }
            }
        }
        for &(elem, edge, neighbor) in &found {
            self.elem_mut(elem)?.add_edge_neighbor(edge, neighbor)?;
        }
        self.check_neighbor_symmetry()?;
        log::debug!("found {} element-edge neighbor links", found.len());
        self.validate_stage("update_edge_neighbors")
    }

    pub(crate) fn check_neighbor_symmetry(&self) -> Result<(), CutMeshError> {
        for curr in self.elements.values() {
            for i in 0..curr.num_edges() {
                for &neigh_id in curr.edge_neighbors(i) {
                    let neigh = self.get_elem_by_id(neigh_id)?;
                    if neigh.neighbor_index(curr.id()).is_err() {
                        return Err(CutMeshError::AsymmetricNeighbors {
                            element: neigh_id,
                            neighbor: curr.id(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Seed the crack-tip set from the current cut state.
    ///
    /// An element whose cut edge has two neighbors sits ahead of the crack
    /// tip: the two neighbors are the halves of an element split on that
    /// edge. The element joins the tip set; both neighbors are flagged as
    /// crack-tip split elements facing it.
    pub fn init_crack_tip_topology(&mut self) -> Result<(), CutMeshError> {
        self.crack_tip_elements.clear();
        let mut fronts: Vec<(u32, [u32; 2])> = Vec::new();
        for curr in self.elements.values() {
            for (i, edge) in curr.edges().iter().enumerate() {
                let &[first, second] = curr.edge_neighbors(i) else {
                    continue;
                };
                if !edge.has_intersection() {
                    continue;
                }
                let [a, b]: [NodeKey; 2] = edge.nodes();
                for neighbor in [first, second] {
                    if self.get_elem_by_id(neighbor)?.overlays_edge(a, b)? {
                        return Err(CutMeshError::InconsistentWinding {
                            element: curr.id(),
                            neighbor,
                        });
                    }
                }
                fronts.push((curr.id(), [first, second]));
            }
        }

        for (tip, neighbors) in fronts {
            if self.get_elem_by_id(tip)?.is_crack_tip_split_element() {
                return Err(CutMeshError::Invariant(format!(
                    "element {tip} is both ahead of a crack tip and a crack-tip split element"
                )));
            }
            self.crack_tip_elements.insert(tip);
            for neighbor in neighbors {
                let elem = self.elem_mut(neighbor)?;
                elem.mark_crack_tip_split();
                elem.add_crack_tip_neighbor(tip)?;
            }
        }
        log::debug!(
            "crack tip topology: {} tip elements",
            self.crack_tip_elements.len()
        );
        Ok(())
    }
}
