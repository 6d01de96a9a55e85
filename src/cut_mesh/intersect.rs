//! Recording cuts on element edges and on interior fragment edges.

use crate::cut_mesh::CutMesh;
use crate::mesh_error::CutMeshError;
use crate::topology::element::FaceNode;
use crate::topology::node::NodeKey;

fn check_position(position: f64) -> Result<(), CutMeshError> {
    if (0.0..=1.0).contains(&position) {
        Ok(())
    } else {
        Err(CutMeshError::PositionOutOfRange(position))
    }
}

impl CutMesh {
    /// Cut edge `edge` of element `elem` at `position`, measured from the
    /// edge's first node. Returns the embedded node carrying the cut.
    pub fn add_edge_intersection(
        &mut self,
        elem: u32,
        edge: usize,
        position: f64,
    ) -> Result<NodeKey, CutMeshError> {
        self.add_edge_intersection_with(elem, edge, position, None)
    }

    /// Cut an element edge, optionally reusing a known embedded node.
    ///
    /// Cutting an already cut edge is accepted when the position matches
    /// within tolerance and the embedded node, if given, is the stored one.
    /// The cut is mirrored onto the single fragment of the element and onto
    /// every edge neighbor, so both sides of a shared edge always carry the
    /// same embedded node.
    pub fn add_edge_intersection_with(
        &mut self,
        elem: u32,
        edge: usize,
        position: f64,
        embedded: Option<NodeKey>,
    ) -> Result<NodeKey, CutMeshError> {
        let tol = self.options.intersection_tolerance;
        let generation = self.generation;
        let curr = self.check_edge(elem, edge)?;
        let from = curr.node(edge);
        let curr_edge = curr.edge(edge);

        let key = if let Some(existing) = curr_edge.embedded_node() {
            if !curr_edge.has_intersection_at_position(position, from, tol)? {
                return Err(CutMeshError::IntersectionMismatch {
                    element: elem,
                    edge,
                    position,
                    existing: curr_edge.intersection(from)?,
                });
            }
            if let Some(requested) = embedded.filter(|&r| r != existing) {
                return Err(CutMeshError::EmbeddedNodeMismatch {
                    element: elem,
                    edge,
                    existing,
                    requested,
                });
            }
            existing
        } else {
            check_position(position)?;
            let key = match embedded {
                Some(requested) if requested.is_embedded() => {
                    self.embedded_nodes.get_or_create(requested.id(), generation)
                }
                Some(requested) => {
                    return Err(CutMeshError::Invariant(format!(
                        "node {requested} cannot carry a cut"
                    )));
                }
                None => self.create_embedded_node(),
            };
            let target = self.elem_mut(elem)?;
            target.edge_mut(edge).add_intersection(position, key, from, tol)?;
            if let Some(frag_edge) = target.fragment_edge_id(edge) {
                let frag_edge = target.fragments_mut()[0].edge_mut(frag_edge);
                if !frag_edge.has_intersection() {
                    frag_edge.add_intersection(position, key, from, tol)?;
                }
            }
            key
        };

        let curr = self.get_elem_by_id(elem)?;
        let cut_edge = curr.edge(edge).clone();
        for neighbor in curr.edge_neighbors(edge).to_vec() {
            let neigh = self.get_elem_by_id(neighbor)?;
            let j = neigh.neighbor_index(elem)?;
            if neigh.edge(j).has_intersection() {
                if !neigh.edge(j).equivalent(&cut_edge) {
                    return Err(CutMeshError::NeighborIntersectionMismatch {
                        element: elem,
                        edge,
                        neighbor,
                        neighbor_edge: j,
                    });
                }
                continue;
            }
            let neigh = self.elem_mut(neighbor)?;
            neigh.edge_mut(j).add_intersection(position, key, from, tol)?;
            if let Some(frag_edge) = neigh.fragment_edge_id(j) {
                let frag_edge = neigh.fragments_mut()[0].edge_mut(frag_edge);
                if !frag_edge.has_intersection() {
                    frag_edge.add_intersection(position, key, from, tol)?;
                }
            }
        }
        log::trace!("element {elem} edge {edge} cut at {position} by {key}");
        self.validate_stage("add_edge_intersection")?;
        Ok(key)
    }

    /// Cut an interior edge of the single fragment of `elem` at `position`,
    /// measured from the fragment edge's first node.
    ///
    /// Creates the element's interior node. Returns `None` when the cut
    /// coincides with an embedded endpoint of the fragment edge and is
    /// skipped.
    pub fn add_frag_edge_intersection(
        &mut self,
        elem: u32,
        frag_edge: usize,
        position: f64,
    ) -> Result<Option<NodeKey>, CutMeshError> {
        let tol = self.options.intersection_tolerance;
        let curr = self.get_elem_by_id(elem)?;
        let [frag] = curr.fragments() else {
            return Err(CutMeshError::FragmentCount {
                element: elem,
                found: curr.num_fragments(),
                context: "fragment-edge cuts need exactly one fragment",
            });
        };
        if frag_edge >= frag.num_edges() {
            return Err(CutMeshError::EdgeOutOfRange {
                element: elem,
                edge: frag_edge,
                num_edges: frag.num_edges(),
            });
        }
        check_position(position)?;
        let target_edge = frag.edge(frag_edge);
        let [first, second] = target_edge.nodes();
        if (position.abs() < tol && first.is_embedded())
            || ((1.0 - position).abs() < tol && second.is_embedded())
        {
            log::warn!(
                "element {elem}: cut at {position} on fragment edge {target_edge} coincides with an embedded node, skipped"
            );
            return Ok(None);
        }

        if let Some(existing) = target_edge.embedded_node() {
            if !target_edge.has_intersection_at_position(position, first, tol)? {
                return Err(CutMeshError::IntersectionMismatch {
                    element: elem,
                    edge: frag_edge,
                    position,
                    existing: target_edge.intersection(first)?,
                });
            }
            return Ok(Some(existing));
        }
        if !target_edge.is_interior_edge() {
            return Err(CutMeshError::Invariant(format!(
                "fragment edge {frag_edge} of element {elem} is on the element boundary, cut the element edge instead"
            )));
        }

        let c1 = curr.embedded_node_para_coords(first)?;
        let c2 = curr.embedded_node_para_coords(second)?;
        let para_coords = [
            (1.0 - position) * c1[0] + position * c2[0],
            (1.0 - position) * c1[1] + position * c2[1],
        ];
        let key = self.create_embedded_node();
        let target = self.elem_mut(elem)?;
        target.fragments_mut()[0]
            .edge_mut(frag_edge)
            .add_intersection(position, key, first, tol)?;
        target.add_interior_node(FaceNode::new(key, para_coords));
        self.validate_stage("add_frag_edge_intersection")?;
        Ok(Some(key))
    }
}
