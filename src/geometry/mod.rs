//! Planar geometry used by the cut definitions and the XFEM adapter.
//!
//! The topology engine itself is purely combinatorial; coordinates only
//! enter when cut positions are computed from a host mesh and when
//! fragment areas are measured.

pub mod metrics;
