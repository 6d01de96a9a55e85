//! Materializing child elements for split and crack-tip elements.

use crate::cut_mesh::CutMesh;
use crate::mesh_error::CutMeshError;
use crate::topology::element::Element;
use crate::topology::node::NodeKey;

/// Elements created by [`CutMesh::create_child_elements`] and the elements
/// they replace.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SplitOutcome {
    pub children: Vec<u32>,
    pub parents: Vec<u32>,
}

impl CutMesh {
    /// Whether a single-fragment element must be duplicated so the crack can
    /// run through it next cycle.
    ///
    /// True for a new crack-tip element with phantom nodes, for a crack-tip
    /// split element whose tip extends, and for an element sharing a phantom
    /// corner with a neighbor that is about to split.
    pub fn should_duplicate_for_crack_tip(&self, elem: &Element) -> Result<bool, CutMeshError> {
        if elem.num_fragments() != 1 {
            return Ok(false);
        }
        if !self.crack_tip_elements.contains(&elem.id())
            && elem.frag_has_tip_edges()?
            && elem.has_phantom_nodes()
        {
            return Ok(true);
        }
        Ok(elem.should_duplicate_crack_tip_split_elem(&self.elements)?
            || elem.should_duplicate_for_phantom_corner(&self.elements)?)
    }

    /// Create one child per fragment of every element with two fragments,
    /// and a single child for elements that must be duplicated at the crack
    /// tip.
    ///
    /// A child keeps the parent's nodes that lie on its fragment and gets a
    /// temporary duplicate for every other node. It inherits the parent's
    /// edge cuts, except on edges that lie entirely outside its fragment,
    /// and the parent's interior node. Children are numbered after the
    /// largest element id.
    pub fn create_child_elements(&mut self) -> Result<SplitOutcome, CutMeshError> {
        if let Some(elem) = self.elements.values().find(|e| !e.children().is_empty()) {
            return Err(CutMeshError::Invariant(format!(
                "element {} already has children, clear the ancestry first",
                elem.id()
            )));
        }
        let tol = self.options.intersection_tolerance;
        let generation = self.generation;
        let mut next_id = self.next_element_id();
        let mut outcome = SplitOutcome::default();
        let mut created = Vec::new();

        let ids: Vec<u32> = self.elements.keys().copied().collect();
        for id in ids {
            let curr = self.get_elem_by_id(id)?;
            let num_frags = curr.num_fragments();
            if num_frags <= 1 && !self.should_duplicate_for_crack_tip(curr)? {
                continue;
            }
            if num_frags > 2 {
                return Err(CutMeshError::FragmentCount {
                    element: id,
                    found: num_frags,
                    context: "at most two fragments can be split into children",
                });
            }
            let parent = curr.clone();
            let mut child_ids = Vec::with_capacity(num_frags);
            for frag in parent.fragments() {
                let mut nodes = Vec::with_capacity(parent.num_nodes());
                for &node in parent.nodes() {
                    if frag.contains_node(node) {
                        nodes.push(node);
                    } else {
                        nodes.push(self.temp_nodes.create(Some(node), generation));
                    }
                }
                let mut child = Element::new(next_id, nodes, generation)?;
                let mut child_frag = frag.clone();
                child_frag.set_host(next_id);
                child.fragments_mut().push(child_frag);

                for (j, edge) in parent.edges().iter().enumerate() {
                    if let Some(embedded) = edge.embedded_node() {
                        let position = edge.intersection(parent.node(j))?;
                        let from: NodeKey = child.node(j);
                        child.edge_mut(j).add_intersection(position, embedded, from, tol)?;
                    }
                }
                for j in 0..child.num_edges() {
                    if child.is_edge_phantom(j) && child.edge(j).has_intersection() {
                        child.edge_mut(j).remove_embedded_node();
                    }
                }
                child
                    .interior_nodes_mut()
                    .extend(parent.interior_nodes().iter().copied());
                child.set_parent(Some(id));

                child_ids.push(next_id);
                created.push(child);
                next_id += 1;
            }
            self.elem_mut(id)?.children_mut().clone_from(&child_ids);
            outcome.parents.push(id);
            outcome.children.extend(child_ids);
        }

        for child in created {
            self.elements.insert(child.id(), child);
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use crate::cut_mesh::CutMesh;
    use crate::topology::node::NodeKey;

    #[test]
    fn uncut_mesh_has_no_children() {
        let mut mesh = CutMesh::default();
        mesh.add_elements(&[vec![0, 1, 2, 3], vec![3, 2, 4, 5]])
            .unwrap();
        mesh.update_edge_neighbors().unwrap();
        mesh.update_physical_links_and_fragments().unwrap();
        let outcome = mesh.create_child_elements().unwrap();
        assert!(outcome.children.is_empty());
        assert!(outcome.parents.is_empty());
        assert!(mesh.temp_nodes().is_empty());
    }

    #[test]
    fn split_element_gets_two_children_with_temporary_duplicates() {
        let mut mesh = CutMesh::default();
        mesh.add_elements(&[vec![0, 1, 2, 3]]).unwrap();
        mesh.update_edge_neighbors().unwrap();
        mesh.add_edge_intersection(0, 0, 0.5).unwrap();
        mesh.add_edge_intersection(0, 2, 0.5).unwrap();
        mesh.update_physical_links_and_fragments().unwrap();
        let outcome = mesh.create_child_elements().unwrap();
        assert_eq!(outcome.children, vec![1, 2]);
        assert_eq!(outcome.parents, vec![0]);
        assert_eq!(mesh.temp_nodes().len(), 4);

        let left = mesh.get_elem_by_id(1).unwrap();
        assert_eq!(left.parent(), Some(0));
        assert_eq!(left.node(0), NodeKey::permanent(0));
        assert!(left.node(1).is_temp());
        assert!(left.node(2).is_temp());
        assert_eq!(left.node(3), NodeKey::permanent(3));
        assert!(left.is_edge_phantom(1));
        assert!(left.edge(0).has_intersection());
        assert_eq!(mesh.get_elem_by_id(0).unwrap().children(), &[1, 2]);
    }
}
