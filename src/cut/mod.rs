//! Cut definitions: where cracks cross element edges.
//!
//! A [`GeometricCut`] reports, for a straight edge given by its end points,
//! the parametric position at which the crack crosses it. Cuts driven by the
//! solution state are collected as [`StateMarks`] instead.

pub mod plane;
pub mod state;

pub use plane::{GrowthWindow, PlaneCut};
pub use state::{MarkOrigin, StateMarks};

use crate::mesh_error::CutMeshError;
use serde::{Deserialize, Serialize};

/// A cut crossing a numbered edge at a parametric position measured from
/// the edge's first end point.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CutEdge {
    pub edge: usize,
    pub position: f64,
}

/// A crack described by geometry.
pub trait GeometricCut {
    /// Position along `first -> second` where the crack crosses at `time`.
    ///
    /// Crossings exactly at an end point are not reported.
    fn edge_cut(
        &self,
        first: [f64; 2],
        second: [f64; 2],
        time: f64,
    ) -> Result<Option<f64>, CutMeshError>;

    /// Crossings with a sequence of edges, each given by its end points.
    fn cut_edges(&self, edges: &[[[f64; 2]; 2]], time: f64) -> Result<Vec<CutEdge>, CutMeshError> {
        let mut cuts = Vec::new();
        for (edge, [first, second]) in edges.iter().enumerate() {
            if let Some(position) = self.edge_cut(*first, *second, time)? {
                cuts.push(CutEdge { edge, position });
            }
        }
        Ok(cuts)
    }
}

/// The geometric cuts that can be registered with the adapter or listed in
/// its configuration. State-driven cuts are not geometric; see [`StateMarks`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeometricCutSource {
    Plane(PlaneCut),
}

impl GeometricCut for GeometricCutSource {
    fn edge_cut(
        &self,
        first: [f64; 2],
        second: [f64; 2],
        time: f64,
    ) -> Result<Option<f64>, CutMeshError> {
        match self {
            GeometricCutSource::Plane(plane) => plane.edge_cut(first, second, time),
        }
    }
}

impl From<PlaneCut> for GeometricCutSource {
    fn from(plane: PlaneCut) -> Self {
        GeometricCutSource::Plane(plane)
    }
}
