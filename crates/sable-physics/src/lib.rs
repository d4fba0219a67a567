//! Physics integration: rigid bodies, collision shapes, joints, raycasting, and
//! contact-event fan-out for the Sable Engine.
//!
//! Wraps the Rapier 2D physics kernel behind a single [`PhysicsWorld`] value
//! that owns all simulation state and exposes a pixel-space, engine-friendly
//! API. Engine code addresses bodies, colliders and joints through copyable
//! ids; lengths cross the kernel boundary in metres and angles in radians,
//! converted on the way in and back on the way out.

pub mod body;
pub mod collider;
mod convert;
pub mod debug_draw;
pub mod events;
pub mod joint;
pub mod query;
pub mod world;

pub use body::{BodyType, PropertyChange, PropertyValue};
pub use collider::{ColliderDef, ColliderShape, CollisionFilter, Material};
pub use debug_draw::{Colour, DebugDrawFilter, DebugLine, DebugLineBuffer, draw_world};
pub use events::ContactPhase;
pub use joint::{DistanceJointDef, LINEAR_SLOP_PX};
pub use query::{RayCastControl, RayHit};
pub use sable_math::Aabb;
pub use world::{BodyId, ColliderId, GameObjectId, JointId, PhysicsWorld};
