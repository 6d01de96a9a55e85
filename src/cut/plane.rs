//! Straight-line cuts, optionally bounded and growing in time.

use crate::cut::GeometricCut;
use crate::geometry::metrics::{lerp, rotate_clockwise, segment_intersection, signed_distance, unit};
use crate::mesh_error::CutMeshError;
use serde::{Deserialize, Serialize};

const END_TOL: f64 = 1e-12;

/// Interval over which a bounded trace grows from zero to its full length.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GrowthWindow {
    pub start: f64,
    pub end: f64,
}

impl GrowthWindow {
    /// Fraction of the trace present at `time`.
    pub fn fraction(&self, time: f64) -> f64 {
        if time <= self.start {
            0.0
        } else if time >= self.end {
            1.0
        } else {
            (time - self.start) / (self.end - self.start)
        }
    }
}

/// The line through `origin` perpendicular to `normal`.
///
/// With a `length` the cut is a trace starting at `origin` and running along
/// the direction whose clockwise rotation is `normal`. A `growth` window lets
/// the trace extend linearly over time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaneCut {
    pub origin: [f64; 2],
    pub normal: [f64; 2],
    #[serde(default)]
    pub length: Option<f64>,
    #[serde(default)]
    pub growth: Option<GrowthWindow>,
}

impl PlaneCut {
    pub fn new(origin: [f64; 2], normal: [f64; 2]) -> Self {
        Self {
            origin,
            normal,
            length: None,
            growth: None,
        }
    }

    pub fn with_length(mut self, length: f64) -> Self {
        self.length = Some(length);
        self
    }

    pub fn growing(mut self, start: f64, end: f64) -> Self {
        self.growth = Some(GrowthWindow { start, end });
        self
    }

    /// Unit direction of the trace.
    pub fn direction(&self) -> Result<[f64; 2], CutMeshError> {
        let n = unit(self.normal)?;
        Ok([-n[1], n[0]])
    }

    /// Length of the trace present at `time`, `None` for an unbounded line.
    pub fn length_at(&self, time: f64) -> Option<f64> {
        self.length.map(|full| match self.growth {
            Some(window) => full * window.fraction(time),
            None => full,
        })
    }

    /// End of the trace at `time`.
    pub fn tip_at(&self, time: f64) -> Result<Option<[f64; 2]>, CutMeshError> {
        let Some(len) = self.length_at(time) else {
            return Ok(None);
        };
        let d = self.direction()?;
        Ok(Some(lerp(self.origin, [self.origin[0] + d[0], self.origin[1] + d[1]], len)))
    }
}

impl GeometricCut for PlaneCut {
    fn edge_cut(
        &self,
        first: [f64; 2],
        second: [f64; 2],
        time: f64,
    ) -> Result<Option<f64>, CutMeshError> {
        match self.tip_at(time)? {
            None => {
                let d0 = signed_distance(first, self.origin, self.normal)?;
                let d1 = signed_distance(second, self.origin, self.normal)?;
                if d0 * d1 < 0.0 {
                    Ok(Some(d0 / (d0 - d1)))
                } else {
                    Ok(None)
                }
            }
            Some(tip) => {
                if self.length_at(time).is_some_and(|len| len <= 0.0) {
                    return Ok(None);
                }
                Ok(segment_intersection(first, second, self.origin, tip)
                    .map(|(s, _)| s)
                    .filter(|&s| s > END_TOL && s < 1.0 - END_TOL))
            }
        }
    }
}

/// The normal of an oriented segment: its direction rotated clockwise and
/// scaled to unit length.
pub fn segment_normal(first: [f64; 2], second: [f64; 2]) -> Result<[f64; 2], CutMeshError> {
    unit(rotate_clockwise([second[0] - first[0], second[1] - first[1]]))
}
