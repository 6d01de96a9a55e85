//! Whole-mesh consistency checks.

use crate::cut_mesh::CutMesh;
use crate::debug_invariants::DebugInvariants;
use crate::mesh_error::CutMeshError;
use crate::topology::element::Element;
use crate::topology::node::NodeKey;

impl CutMesh {
    /// No temporary node may outlive a topology update.
    pub fn sanity_check(&self) -> Result<(), CutMeshError> {
        if self.temp_nodes.is_empty() {
            Ok(())
        } else {
            log::error!("temporary nodes left after stitching:\n{self}");
            Err(CutMeshError::LeakedTemporaryNodes(self.temp_nodes.len()))
        }
    }

    pub(crate) fn validate_stage(&self, stage: &'static str) -> Result<(), CutMeshError> {
        if self.options.validation_enabled() {
            self.validate_after(stage)
        } else {
            Ok(())
        }
    }

    fn check_reference(&self, elem: &Element, key: NodeKey) -> Result<(), CutMeshError> {
        if key.is_local() {
            return Err(CutMeshError::Invariant(format!(
                "element {} references local node {key}",
                elem.id()
            )));
        }
        let node = self.node(key)?;
        if node.generation() > self.generation {
            return Err(CutMeshError::StaleHandle {
                what: "node",
                id: key.id(),
                handle: node.generation().get(),
                current: self.generation.get(),
            });
        }
        Ok(())
    }

    fn validate_element(&self, elem: &Element) -> Result<(), CutMeshError> {
        let id = elem.id();
        for &node in elem.nodes() {
            self.check_reference(elem, node)?;
        }
        for edge in elem.edges() {
            edge.consistency_check()?;
            if let Some(embedded) = edge.embedded_node() {
                self.check_reference(elem, embedded)?;
            }
        }
        for (i, frag) in elem.fragments().iter().enumerate() {
            if !frag.is_closed() {
                return Err(CutMeshError::OpenFragment {
                    element: id,
                    fragment: i,
                });
            }
            for edge in frag.edges() {
                edge.consistency_check()?;
                for node in edge.nodes().into_iter().chain(edge.embedded_node()) {
                    self.check_reference(elem, node)?;
                }
            }
        }
        for face_node in elem.interior_nodes() {
            self.check_reference(elem, face_node.node())?;
        }
        if let Some(parent) = elem.parent() {
            if !self.get_elem_by_id(parent)?.children().contains(&id) {
                return Err(CutMeshError::Invariant(format!(
                    "element {id} names {parent} as parent, which does not list it as a child"
                )));
            }
        }
        for &child in elem.children() {
            if self.get_elem_by_id(child)?.parent() != Some(id) {
                return Err(CutMeshError::Invariant(format!(
                    "element {id} lists {child} as a child, which names another parent"
                )));
            }
        }
        Ok(())
    }
}

impl DebugInvariants for CutMesh {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "CutMesh");
    }

    fn validate_invariants(&self) -> Result<(), CutMeshError> {
        for elem in self.elements.values() {
            self.validate_element(elem)?;
        }
        self.check_neighbor_symmetry()?;
        for tip in &self.crack_tip_elements {
            if !self.elements.contains_key(tip) {
                return Err(CutMeshError::Invariant(format!(
                    "crack-tip element {tip} does not exist"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::cut_mesh::CutMesh;
    use crate::debug_invariants::DebugInvariants;
    use crate::mesh_error::CutMeshError;
    use crate::topology::node::NodeKey;

    #[test]
    fn fresh_mesh_is_valid() {
        let mut mesh = CutMesh::default();
        mesh.add_elements(&[vec![0, 1, 2, 3], vec![3, 2, 4, 5]])
            .unwrap();
        mesh.update_edge_neighbors().unwrap();
        assert!(mesh.validate_invariants().is_ok());
        mesh.debug_assert_invariants();
        assert!(mesh.sanity_check().is_ok());
    }

    #[test]
    fn dangling_node_references_are_reported() {
        let mut mesh = CutMesh::default();
        mesh.add_elements(&[vec![0, 1, 2, 3]]).unwrap();
        mesh.elem_mut(0)
            .unwrap()
            .switch_node(NodeKey::permanent(9), NodeKey::permanent(0));
        assert_eq!(
            mesh.validate_invariants(),
            Err(CutMeshError::UnknownNode(NodeKey::permanent(9)))
        );
    }
}
