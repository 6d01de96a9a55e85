//! Reference-element parametric maps for the supported element shapes.
//!
//! Quadrilaterals use the reference square `[-1, 1]^2` with corners
//! `(-1,-1), (1,-1), (1,1), (-1,1)`. Triangles use area coordinates
//! `(l0, l1)` with `l2 = 1 - l0 - l1`. Edge `i` runs from node `i` to node
//! `i + 1` and its 1D coordinate goes from -1 to 1 along that direction.

use crate::mesh_error::CutMeshError;

const QUAD_CORNERS: [[f64; 2]; 4] = [[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0]];

/// Map a 1D edge coordinate in `[-1, 1]` to element parametric coordinates.
pub fn edge_to_element_coords(
    num_nodes: usize,
    edge: usize,
    xi: f64,
) -> Result<[f64; 2], CutMeshError> {
    match (num_nodes, edge) {
        (4, 0) => Ok([xi, -1.0]),
        (4, 1) => Ok([1.0, xi]),
        (4, 2) => Ok([-xi, 1.0]),
        (4, 3) => Ok([-1.0, -xi]),
        (3, 0) => Ok([0.5 * (1.0 - xi), 0.5 * (1.0 + xi)]),
        (3, 1) => Ok([0.0, 0.5 * (1.0 - xi)]),
        (3, 2) => Ok([0.5 * (1.0 + xi), 0.0]),
        _ => Err(CutMeshError::Invariant(format!(
            "no parametric map for edge {edge} of a {num_nodes}-node element"
        ))),
    }
}

/// Value of the linear shape function of `node` at parametric point `xi`.
pub fn shape_weight(num_nodes: usize, node: usize, xi: [f64; 2]) -> Result<f64, CutMeshError> {
    match num_nodes {
        4 if node < 4 => {
            let [cx, cy] = QUAD_CORNERS[node];
            Ok(0.25 * (1.0 + cx * xi[0]) * (1.0 + cy * xi[1]))
        }
        3 if node < 3 => Ok([xi[0], xi[1], 1.0 - xi[0] - xi[1]][node]),
        _ => Err(CutMeshError::Invariant(format!(
            "no shape function for node {node} of a {num_nodes}-node element"
        ))),
    }
}
