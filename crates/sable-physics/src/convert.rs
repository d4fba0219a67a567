//! Glue between engine-space `glam` types and kernel-space `nalgebra` types.
//!
//! Every function converts units as well as representation: pixels become
//! metres on the way into the kernel and metres become pixels on the way out.
//! Directions (ray normals, axes) are the one exception and are copied
//! component-wise without scaling.

use glam::Vec2;
use rapier2d::na::{Isometry2, Point2, Vector2};
use sable_math::{to_engine, to_sim, to_sim_angle};

/// Engine pixel vector to kernel metre vector.
pub(crate) fn sim_vec(v: Vec2) -> Vector2<f32> {
    Vector2::new(to_sim(v.x), to_sim(v.y))
}

/// Kernel metre vector to engine pixel vector.
pub(crate) fn engine_vec(v: Vector2<f32>) -> Vec2 {
    Vec2::new(to_engine(v.x), to_engine(v.y))
}

/// Engine pixel point to kernel metre point.
pub(crate) fn sim_point(p: Vec2) -> Point2<f32> {
    Point2::new(to_sim(p.x), to_sim(p.y))
}

/// Kernel metre point to engine pixel point.
pub(crate) fn engine_point(p: Point2<f32>) -> Vec2 {
    Vec2::new(to_engine(p.x), to_engine(p.y))
}

/// Direction vector copied without unit scaling.
pub(crate) fn engine_dir(v: Vector2<f32>) -> Vec2 {
    Vec2::new(v.x, v.y)
}

/// Builds a kernel isometry from an engine-space translation and rotation.
pub(crate) fn sim_iso(translation_px: Vec2, rotation_degrees: f32) -> Isometry2<f32> {
    Isometry2::new(sim_vec(translation_px), to_sim_angle(rotation_degrees))
}
