//! Solution-driven crack growth requests.
//!
//! Each marked element carries the normal of the crack to grow through it.
//! A mark may additionally name the element side where a crack initiates,
//! or request a secondary crack starting on the existing cut inside the
//! element. Marks live until the next topology update consumes them.

use crate::mesh_error::CutMeshError;
use std::collections::{BTreeMap, BTreeSet};

/// How a marked element starts its crack segment.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MarkOrigin {
    /// Continue from the crack tip inside the element, or fail if there is none.
    CrackTip,
    /// Initiate at the midpoint of the given element side.
    Side(usize),
    /// Branch off the midpoint of the element's interior cut.
    Fragment,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StateMarks {
    normals: BTreeMap<u32, [f64; 2]>,
    sides: BTreeMap<u32, usize>,
    fragments: BTreeSet<u32>,
}

impl StateMarks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `elem` for growth along a crack with the given normal.
    pub fn mark_elem(&mut self, elem: u32, normal: [f64; 2]) -> Result<(), CutMeshError> {
        if self.normals.contains_key(&elem) {
            return Err(CutMeshError::DuplicateStateMark(elem));
        }
        self.normals.insert(elem, normal);
        Ok(())
    }

    /// Mark `elem` for a crack initiating on `side`.
    pub fn mark_elem_side(
        &mut self,
        elem: u32,
        normal: [f64; 2],
        side: usize,
    ) -> Result<(), CutMeshError> {
        self.mark_elem(elem, normal)?;
        self.sides.insert(elem, side);
        Ok(())
    }

    /// Mark `elem` for a secondary crack branching off its interior cut.
    pub fn mark_frag(&mut self, elem: u32, normal: [f64; 2]) -> Result<(), CutMeshError> {
        self.mark_elem(elem, normal)?;
        self.fragments.insert(elem);
        Ok(())
    }

    pub fn normal(&self, elem: u32) -> Option<[f64; 2]> {
        self.normals.get(&elem).copied()
    }

    /// Where the crack segment of a marked element starts. Crack-tip
    /// elements always continue their crack regardless of the mark kind; a
    /// plain mark elsewhere has no origin.
    pub fn origin(&self, elem: u32, at_crack_tip: bool) -> Option<MarkOrigin> {
        if at_crack_tip {
            Some(MarkOrigin::CrackTip)
        } else if let Some(&side) = self.sides.get(&elem) {
            Some(MarkOrigin::Side(side))
        } else if self.fragments.contains(&elem) {
            Some(MarkOrigin::Fragment)
        } else {
            None
        }
    }

    /// Marked elements and their normals in id order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, [f64; 2])> + '_ {
        self.normals.iter().map(|(&e, &n)| (e, n))
    }

    pub fn len(&self) -> usize {
        self.normals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.normals.is_empty()
    }

    pub fn clear(&mut self) {
        self.normals.clear();
        self.sides.clear();
        self.fragments.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_marks_are_rejected() {
        let mut marks = StateMarks::new();
        marks.mark_elem(3, [1.0, 0.0]).unwrap();
        assert_eq!(
            marks.mark_elem_side(3, [0.0, 1.0], 2),
            Err(CutMeshError::DuplicateStateMark(3))
        );
        assert_eq!(
            marks.mark_frag(3, [0.0, 1.0]),
            Err(CutMeshError::DuplicateStateMark(3))
        );
        assert_eq!(marks.len(), 1);
        assert_eq!(marks.origin(3, false), None);
        assert_eq!(marks.origin(3, true), Some(MarkOrigin::CrackTip));
    }

    #[test]
    fn origins_follow_the_mark_kind() {
        let mut marks = StateMarks::new();
        marks.mark_elem_side(0, [0.0, 1.0], 3).unwrap();
        marks.mark_frag(1, [1.0, 1.0]).unwrap();
        assert_eq!(marks.origin(0, false), Some(MarkOrigin::Side(3)));
        assert_eq!(marks.origin(0, true), Some(MarkOrigin::CrackTip));
        assert_eq!(marks.origin(1, false), Some(MarkOrigin::Fragment));
        assert_eq!(marks.iter().map(|(e, _)| e).collect::<Vec<_>>(), vec![0, 1]);
        marks.clear();
        assert!(marks.is_empty());
    }
}
