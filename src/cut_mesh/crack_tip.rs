//! Classifying the crack front after an update.

use crate::cut_mesh::{CutMesh, MergedEdgeMap};
use crate::mesh_error::CutMeshError;

impl CutMesh {
    /// Update the crack-tip set from the stitched topology.
    ///
    /// Split parents leave the set. An edge merged across three elements
    /// marks a new tip: two of them are the overlaying halves of a split
    /// element and the third, which the crack has reached but not yet
    /// crossed, becomes a crack-tip element.
    pub fn find_crack_tip_elements(
        &mut self,
        parents: &[u32],
        merged: &MergedEdgeMap,
    ) -> Result<(), CutMeshError> {
        for parent in parents {
            self.crack_tip_elements.remove(parent);
        }
        for ((a, b), elems) in merged.iter() {
            match elems.len() {
                0 | 1 => {
                    return Err(CutMeshError::Invariant(format!(
                        "merged edge ({a}, {b}) is shared by fewer than two elements"
                    )));
                }
                2 => {}
                3 => {
                    let ids: Vec<u32> = elems.iter().copied().collect();
                    let overlays = |i: usize, j: usize| -> Result<bool, CutMeshError> {
                        self.get_elem_by_id(ids[i])?
                            .overlays_elem(self.get_elem_by_id(ids[j])?)
                    };
                    let pairs = [
                        (overlays(0, 1)?, ids[2]),
                        (overlays(1, 2)?, ids[0]),
                        (overlays(2, 0)?, ids[1]),
                    ];
                    let mut tips = pairs.iter().filter(|(olay, _)| *olay).map(|&(_, tip)| tip);
                    if let Some(tip) = tips.next() {
                        if tips.next().is_some() {
                            return Err(CutMeshError::Invariant(format!(
                                "more than two elements overlay on merged edge ({a}, {b})"
                            )));
                        }
                        self.crack_tip_elements.insert(tip);
                    }
                }
                n => {
                    log::warn!("merged edge ({a}, {b}) is shared by {n} elements, ignored");
                }
            }
        }
        Ok(())
    }
}
