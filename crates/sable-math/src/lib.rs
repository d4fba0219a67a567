//! Unit conversion and fundamental 2D math types for the Sable Engine.

mod aabb;
mod units;

pub use aabb::Aabb;
pub use units::{
    PIXELS_PER_METRE, to_engine, to_engine_angle, to_engine_vec, to_sim, to_sim_angle, to_sim_vec,
};
