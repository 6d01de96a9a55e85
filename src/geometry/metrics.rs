//! Planar metrics for cut elements.
//!
//! Points are `[x, y]` pairs. Polygons are given as vertex loops in
//! counter-clockwise order; clockwise loops yield negative signed areas.

use crate::mesh_error::CutMeshError;

const EPS: f64 = 1e-12;

/// Signed area of a closed polygon by the shoelace formula.
pub fn signed_polygon_area(vertices: &[[f64; 2]]) -> Result<f64, CutMeshError> {
    if vertices.len() < 3 {
        return Err(CutMeshError::InvalidGeometry(format!(
            "a polygon needs at least 3 vertices, got {}",
            vertices.len()
        )));
    }
    let twice: f64 = vertices
        .iter()
        .zip(vertices.iter().cycle().skip(1))
        .map(|(&a, &b)| cross(a, b))
        .sum();
    Ok(0.5 * twice)
}

/// Unsigned area of a closed polygon.
pub fn polygon_area(vertices: &[[f64; 2]]) -> Result<f64, CutMeshError> {
    signed_polygon_area(vertices).map(f64::abs)
}

/// Point at parameter `t` along the segment `a -> b`.
pub fn lerp(a: [f64; 2], b: [f64; 2], t: f64) -> [f64; 2] {
    [a[0] + t * (b[0] - a[0]), a[1] + t * (b[1] - a[1])]
}

/// Signed distance of `point` from the line through `origin` with the given
/// normal. Positive on the side the normal points to.
pub fn signed_distance(
    point: [f64; 2],
    origin: [f64; 2],
    normal: [f64; 2],
) -> Result<f64, CutMeshError> {
    let n = unit(normal)?;
    Ok(dot(sub(point, origin), n))
}

/// Intersection of the segments `p0 -> p1` and `q0 -> q1`.
///
/// Returns the parameters `(s, t)` of the crossing along each segment, both
/// in `[0, 1]`, or `None` for disjoint or parallel segments.
pub fn segment_intersection(
    p0: [f64; 2],
    p1: [f64; 2],
    q0: [f64; 2],
    q1: [f64; 2],
) -> Option<(f64, f64)> {
    let r = sub(p1, p0);
    let d = sub(q1, q0);
    let denom = cross(r, d);
    if denom.abs() < EPS {
        return None;
    }
    let w = sub(q0, p0);
    let s = cross(w, d) / denom;
    let t = cross(w, r) / denom;
    let inside = |v: f64| (-EPS..=1.0 + EPS).contains(&v);
    (inside(s) && inside(t)).then(|| (s.clamp(0.0, 1.0), t.clamp(0.0, 1.0)))
}

/// The direction rotated a quarter turn clockwise, `(dy, -dx)`.
pub fn rotate_clockwise(d: [f64; 2]) -> [f64; 2] {
    [d[1], -d[0]]
}

/// The direction scaled to unit length.
pub fn unit(d: [f64; 2]) -> Result<[f64; 2], CutMeshError> {
    let len = norm(d);
    if len < EPS {
        return Err(CutMeshError::InvalidGeometry(
            "degenerate direction vector".into(),
        ));
    }
    Ok([d[0] / len, d[1] / len])
}

pub fn sub(a: [f64; 2], b: [f64; 2]) -> [f64; 2] {
    [a[0] - b[0], a[1] - b[1]]
}

pub fn dot(a: [f64; 2], b: [f64; 2]) -> f64 {
    a[0] * b[0] + a[1] * b[1]
}

/// z-component of the 3D cross product of two planar vectors.
pub fn cross(a: [f64; 2], b: [f64; 2]) -> f64 {
    a[0] * b[1] - a[1] * b[0]
}

pub fn norm(a: [f64; 2]) -> f64 {
    dot(a, a).sqrt()
}
