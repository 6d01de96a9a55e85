//! A minimal host mesh: planar node coordinates and element connectivity.

use crate::mesh_error::CutMeshError;
use std::collections::BTreeMap;

/// Id-keyed 2D mesh the adapter writes topology changes into.
///
/// New nodes and elements take the id after the largest one in use.
/// Elements list their nodes counter-clockwise.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HostMesh {
    nodes: BTreeMap<u32, [f64; 2]>,
    elements: BTreeMap<u32, Vec<u32>>,
}

impl HostMesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Structured grid of `nx * ny` quadrilaterals covering
    /// `[0, width] x [0, height]`, numbered row by row from the origin.
    pub fn rectangle(nx: u32, ny: u32, width: f64, height: f64) -> Result<Self, CutMeshError> {
        if nx == 0 || ny == 0 {
            return Err(CutMeshError::InvalidGeometry(format!(
                "grid needs at least one cell per direction, got {nx} x {ny}"
            )));
        }
        let mut mesh = Self::new();
        let (dx, dy) = (width / f64::from(nx), height / f64::from(ny));
        for j in 0..=ny {
            for i in 0..=nx {
                mesh.add_node([f64::from(i) * dx, f64::from(j) * dy]);
            }
        }
        let row = nx + 1;
        for j in 0..ny {
            for i in 0..nx {
                let n0 = j * row + i;
                mesh.add_element(&[n0, n0 + 1, n0 + row + 1, n0 + row])?;
            }
        }
        Ok(mesh)
    }

    pub fn add_node(&mut self, coords: [f64; 2]) -> u32 {
        let id = self.nodes.keys().next_back().map_or(0, |&k| k + 1);
        self.nodes.insert(id, coords);
        id
    }

    /// Add a triangle or quadrilateral over existing nodes.
    pub fn add_element(&mut self, nodes: &[u32]) -> Result<u32, CutMeshError> {
        if !(3..=4).contains(&nodes.len()) {
            return Err(CutMeshError::InvalidElementArity { found: nodes.len() });
        }
        if let Some(&missing) = nodes.iter().find(|n| !self.nodes.contains_key(n)) {
            return Err(CutMeshError::UnknownHostNode(missing));
        }
        let id = self.elements.keys().next_back().map_or(0, |&k| k + 1);
        self.elements.insert(id, nodes.to_vec());
        Ok(id)
    }

    /// Remove an element, returning its connectivity. Nodes stay.
    pub fn delete_element(&mut self, id: u32) -> Result<Vec<u32>, CutMeshError> {
        self.elements
            .remove(&id)
            .ok_or(CutMeshError::UnknownHostElement(id))
    }

    pub fn coords(&self, node: u32) -> Result<[f64; 2], CutMeshError> {
        self.nodes
            .get(&node)
            .copied()
            .ok_or(CutMeshError::UnknownHostNode(node))
    }

    pub fn element_nodes(&self, id: u32) -> Result<&[u32], CutMeshError> {
        self.elements
            .get(&id)
            .map(Vec::as_slice)
            .ok_or(CutMeshError::UnknownHostElement(id))
    }

    /// Corner coordinates of an element in node order.
    pub fn element_coords(&self, id: u32) -> Result<Vec<[f64; 2]>, CutMeshError> {
        self.element_nodes(id)?
            .iter()
            .map(|&n| self.coords(n))
            .collect()
    }

    pub fn contains_element(&self, id: u32) -> bool {
        self.elements.contains_key(&id)
    }

    /// Elements and their nodes in id order.
    pub fn elements(&self) -> impl Iterator<Item = (u32, &[u32])> + '_ {
        self.elements.iter().map(|(&id, nodes)| (id, nodes.as_slice()))
    }

    pub fn num_elements(&self) -> usize {
        self.elements.len()
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_numbering() {
        let mesh = HostMesh::rectangle(1, 2, 1.0, 2.0).unwrap();
        assert_eq!(mesh.num_nodes(), 6);
        assert_eq!(mesh.element_nodes(0).unwrap(), &[0, 1, 3, 2]);
        assert_eq!(mesh.element_nodes(1).unwrap(), &[2, 3, 5, 4]);
        assert_eq!(mesh.coords(5).unwrap(), [1.0, 2.0]);
    }

    #[test]
    fn ids_follow_the_largest_in_use() {
        let mut mesh = HostMesh::rectangle(2, 1, 2.0, 1.0).unwrap();
        assert_eq!(mesh.delete_element(0).unwrap(), vec![0, 1, 4, 3]);
        assert_eq!(mesh.add_element(&[0, 1, 4]).unwrap(), 2);
        assert_eq!(mesh.delete_element(0), Err(CutMeshError::UnknownHostElement(0)));
        assert_eq!(
            mesh.add_element(&[0, 1, 9]),
            Err(CutMeshError::UnknownHostNode(9))
        );
        assert_eq!(mesh.add_node([3.0, 0.0]), 6);
    }
}
