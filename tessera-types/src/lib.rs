//! Geometry primitives shared by the `tessera` crates.
//!
//! Everything here works in plain cartesian space: pixel coordinates of the viewport,
//! integer tile grid positions and normalized world coordinates. No projection math is
//! involved.

pub mod cartesian;
