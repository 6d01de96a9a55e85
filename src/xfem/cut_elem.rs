//! Saved cut state of a host element between topology updates.

use crate::cut::plane::segment_normal;
use crate::geometry::metrics::polygon_area;
use crate::mesh_error::CutMeshError;
use crate::topology::element::Element;
use crate::topology::node::NodeKey;

/// Location of a cut-mesh node inside an element, interpolated from the
/// element's corner coordinates through its master nodes.
pub fn node_coords(
    elem: &Element,
    node: NodeKey,
    corners: &[[f64; 2]],
) -> Result<[f64; 2], CutMeshError> {
    if corners.len() != elem.num_nodes() {
        return Err(CutMeshError::InvalidGeometry(format!(
            "element {} has {} nodes but {} corner coordinates",
            elem.id(),
            elem.num_nodes(),
            corners.len()
        )));
    }
    let mut point = [0.0, 0.0];
    for term in elem.master_info(node)? {
        let corner = corners[elem.local_node_index(term.node)?];
        point[0] += term.weight * corner[0];
        point[1] += term.weight * corner[1];
    }
    Ok(point)
}

/// Local copy of a cut element: corner nodes are stored as local indices so
/// the copy survives the renumbering of a rebuilt cut mesh, while embedded
/// nodes keep their identity.
#[derive(Clone, Debug, PartialEq)]
pub struct CutElem {
    elem: Element,
}

impl CutElem {
    pub fn new(elem: &Element) -> Result<Self, CutMeshError> {
        Ok(Self {
            elem: elem.to_local_copy()?,
        })
    }

    pub fn cut_mesh_elem(&self) -> &Element {
        &self.elem
    }

    /// Whether the element carries phantom nodes, i.e. only part of it is
    /// physical.
    pub fn is_partial(&self) -> bool {
        self.elem.has_phantom_nodes()
    }

    /// Area of the physical fragment over the element area.
    pub fn physical_volfrac(&self, corners: &[[f64; 2]]) -> Result<f64, CutMeshError> {
        let [frag] = self.elem.fragments() else {
            return Err(CutMeshError::FragmentCount {
                element: self.elem.id(),
                found: self.elem.num_fragments(),
                context: "the physical volume fraction needs exactly one fragment",
            });
        };
        let polygon = frag
            .nodes()
            .into_iter()
            .map(|n| node_coords(&self.elem, n, corners))
            .collect::<Result<Vec<_>, _>>()?;
        let total = polygon_area(corners)?;
        if total <= 0.0 {
            return Err(CutMeshError::InvalidGeometry(format!(
                "element {} has zero area",
                self.elem.id()
            )));
        }
        Ok(polygon_area(&polygon)? / total)
    }

    /// End points of the `plane_id`-th interior fragment edge, oriented
    /// along the fragment loop.
    fn interior_segment(
        &self,
        plane_id: usize,
        corners: &[[f64; 2]],
    ) -> Result<[[f64; 2]; 2], CutMeshError> {
        let frag = self.elem.fragments().first().ok_or_else(|| {
            CutMeshError::InvalidGeometry(format!("element {} has no fragment", self.elem.id()))
        })?;
        let ids = frag.interior_edge_ids();
        let &edge = ids.get(plane_id).ok_or_else(|| {
            CutMeshError::InvalidGeometry(format!(
                "element {} has {} cut planes, requested {plane_id}",
                self.elem.id(),
                ids.len()
            ))
        })?;
        let [a, b] = frag.edge(edge).nodes();
        Ok([
            node_coords(&self.elem, a, corners)?,
            node_coords(&self.elem, b, corners)?,
        ])
    }

    /// Midpoint of the `plane_id`-th cut segment.
    pub fn origin(&self, plane_id: usize, corners: &[[f64; 2]]) -> Result<[f64; 2], CutMeshError> {
        let [a, b] = self.interior_segment(plane_id, corners)?;
        Ok([0.5 * (a[0] + b[0]), 0.5 * (a[1] + b[1])])
    }

    /// Unit normal of the `plane_id`-th cut segment, pointing out of the
    /// physical fragment.
    pub fn normal(&self, plane_id: usize, corners: &[[f64; 2]]) -> Result<[f64; 2], CutMeshError> {
        let [a, b] = self.interior_segment(plane_id, corners)?;
        segment_normal(a, b)
    }
}
