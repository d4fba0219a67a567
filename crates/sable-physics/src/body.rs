//! Rigid body operations: transform and motion, forces, flags, identity.
//!
//! Setters suppress no-op writes by comparing against the kernel's current
//! value in kernel units, and push a [`PropertyChange`] notification when a
//! value actually changes. Getters on a dangling id return a neutral default
//! instead of panicking; a stale id is an expected race in game code.

use glam::Vec2;
use rapier2d::na::UnitComplex;
use rapier2d::prelude::{RigidBody, RigidBodyActivation, RigidBodyHandle, RigidBodyType};
use rustc_hash::FxHashMap;
use sable_math::{to_engine_angle, to_sim_angle};

use crate::collider::ColliderDef;
use crate::convert;
use crate::world::{BodyId, ColliderId, GameObjectId, PhysicsWorld};

/// How a body participates in the simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BodyType {
    /// Never moves; collides with dynamic bodies.
    Static,
    /// Driven by velocities set from game code; ignores forces and gravity.
    Kinematic,
    /// Fully simulated.
    Dynamic,
}

impl BodyType {
    pub(crate) fn to_kernel(self) -> RigidBodyType {
        match self {
            BodyType::Static => RigidBodyType::Fixed,
            BodyType::Kinematic => RigidBodyType::KinematicVelocityBased,
            BodyType::Dynamic => RigidBodyType::Dynamic,
        }
    }
}

/// Value union for the per-body user bag and property-change notifications.
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f32),
    Vec2(Vec2),
    Str(String),
    BodyType(BodyType),
}

/// Notification pushed when a body setter actually changes a value.
///
/// Drained in batch via [`PhysicsWorld::drain_property_changes`]; a setter
/// that writes the value a property already holds pushes nothing.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyChange {
    pub body: BodyId,
    pub name: &'static str,
    pub value: PropertyValue,
}

/// Engine-side state for one body: the kernel handle plus everything the
/// kernel does not track for us.
pub(crate) struct BodyRecord {
    pub handle: RigidBodyHandle,
    pub kind: BodyType,
    /// Attached colliders, in attach order.
    pub colliders: Vec<ColliderId>,
    pub game_object: Option<GameObjectId>,
    pub user: FxHashMap<String, PropertyValue>,
    /// Per-body CCD wish; effective only while the world-level gate is on.
    pub fast: bool,
    pub sleep_allowed: bool,
    pub fixed_rotation: bool,
}

impl BodyRecord {
    pub(crate) fn new(handle: RigidBodyHandle, kind: BodyType) -> Self {
        Self {
            handle,
            kind,
            colliders: Vec::new(),
            game_object: None,
            user: FxHashMap::default(),
            fast: false,
            sleep_allowed: true,
            fixed_rotation: false,
        }
    }
}

/// Applies the effective sleep permission to a kernel body.
///
/// Negative thresholds make the kernel treat the body as never sleepy, which
/// is how sleeping is disabled per body without a dedicated kernel flag.
pub(crate) fn apply_activation(native: &mut RigidBody, can_sleep: bool) {
    let activation = native.activation_mut();
    if can_sleep {
        activation.normalized_linear_threshold =
            RigidBodyActivation::default_normalized_linear_threshold();
        activation.angular_threshold = RigidBodyActivation::default_angular_threshold();
    } else {
        activation.sleeping = false;
        activation.normalized_linear_threshold = -1.0;
        activation.angular_threshold = -1.0;
    }
}

impl PhysicsWorld {
    pub(crate) fn native_body(&self, body: BodyId) -> Option<&RigidBody> {
        self.bodies.get(self.body_records.get(&body)?.handle)
    }

    pub(crate) fn native_body_mut(&mut self, body: BodyId) -> Option<&mut RigidBody> {
        let handle = self.body_records.get(&body)?.handle;
        self.bodies.get_mut(handle)
    }

    // -----------------------------------------------------------------------
    // Transform and motion
    // -----------------------------------------------------------------------

    /// World position of the body origin, in pixels.
    pub fn body_position(&self, body: BodyId) -> Vec2 {
        self.native_body(body)
            .map_or(Vec2::ZERO, |native| convert::engine_vec(*native.translation()))
    }

    pub fn set_body_position(&mut self, body: BodyId, position: Vec2) {
        let Some(record) = self.body_records.get(&body) else {
            return;
        };
        let target = convert::sim_vec(position);
        let Some(native) = self.bodies.get_mut(record.handle) else {
            return;
        };
        if *native.translation() == target {
            return;
        }
        native.set_translation(target, true);
        self.property_changes.push(PropertyChange {
            body,
            name: "position",
            value: PropertyValue::Vec2(position),
        });
    }

    /// World rotation in degrees, wrapped to (-180, 180] by the kernel.
    pub fn body_rotation(&self, body: BodyId) -> f32 {
        self.native_body(body)
            .map_or(0.0, |native| to_engine_angle(native.rotation().angle()))
    }

    pub fn set_body_rotation(&mut self, body: BodyId, degrees: f32) {
        let Some(record) = self.body_records.get(&body) else {
            return;
        };
        let target = to_sim_angle(degrees);
        let Some(native) = self.bodies.get_mut(record.handle) else {
            return;
        };
        if native.rotation().angle() == target {
            return;
        }
        native.set_rotation(UnitComplex::from_angle(target), true);
        self.property_changes.push(PropertyChange {
            body,
            name: "rotation",
            value: PropertyValue::Float(degrees),
        });
    }

    /// Sets position and rotation together with a single kernel write.
    pub fn set_body_transform(&mut self, body: BodyId, position: Vec2, degrees: f32) {
        let Some(record) = self.body_records.get(&body) else {
            return;
        };
        let target_translation = convert::sim_vec(position);
        let target_angle = to_sim_angle(degrees);
        let Some(native) = self.bodies.get_mut(record.handle) else {
            return;
        };
        let moved = *native.translation() != target_translation;
        let rotated = native.rotation().angle() != target_angle;
        if !moved && !rotated {
            return;
        }
        native.set_position(convert::sim_iso(position, degrees), true);
        if moved {
            self.property_changes.push(PropertyChange {
                body,
                name: "position",
                value: PropertyValue::Vec2(position),
            });
        }
        if rotated {
            self.property_changes.push(PropertyChange {
                body,
                name: "rotation",
                value: PropertyValue::Float(degrees),
            });
        }
    }

    /// Linear velocity in px/s.
    pub fn body_linear_velocity(&self, body: BodyId) -> Vec2 {
        self.native_body(body)
            .map_or(Vec2::ZERO, |native| convert::engine_vec(*native.linvel()))
    }

    pub fn set_body_linear_velocity(&mut self, body: BodyId, velocity: Vec2) {
        let Some(record) = self.body_records.get(&body) else {
            return;
        };
        let target = convert::sim_vec(velocity);
        let Some(native) = self.bodies.get_mut(record.handle) else {
            return;
        };
        if *native.linvel() == target {
            return;
        }
        native.set_linvel(target, true);
        self.property_changes.push(PropertyChange {
            body,
            name: "linear_velocity",
            value: PropertyValue::Vec2(velocity),
        });
    }

    /// Angular velocity in degrees per second.
    pub fn body_angular_velocity(&self, body: BodyId) -> f32 {
        self.native_body(body)
            .map_or(0.0, |native| to_engine_angle(native.angvel()))
    }

    pub fn set_body_angular_velocity(&mut self, body: BodyId, degrees_per_second: f32) {
        let Some(record) = self.body_records.get(&body) else {
            return;
        };
        let target = to_sim_angle(degrees_per_second);
        let Some(native) = self.bodies.get_mut(record.handle) else {
            return;
        };
        if native.angvel() == target {
            return;
        }
        native.set_angvel(target, true);
        self.property_changes.push(PropertyChange {
            body,
            name: "angular_velocity",
            value: PropertyValue::Float(degrees_per_second),
        });
    }

    pub fn body_linear_damping(&self, body: BodyId) -> f32 {
        self.native_body(body)
            .map_or(0.0, |native| native.linear_damping())
    }

    pub fn set_body_linear_damping(&mut self, body: BodyId, damping: f32) {
        let Some(record) = self.body_records.get(&body) else {
            return;
        };
        let Some(native) = self.bodies.get_mut(record.handle) else {
            return;
        };
        if native.linear_damping() == damping {
            return;
        }
        native.set_linear_damping(damping);
        self.property_changes.push(PropertyChange {
            body,
            name: "linear_damping",
            value: PropertyValue::Float(damping),
        });
    }

    pub fn body_angular_damping(&self, body: BodyId) -> f32 {
        self.native_body(body)
            .map_or(0.0, |native| native.angular_damping())
    }

    pub fn set_body_angular_damping(&mut self, body: BodyId, damping: f32) {
        let Some(record) = self.body_records.get(&body) else {
            return;
        };
        let Some(native) = self.bodies.get_mut(record.handle) else {
            return;
        };
        if native.angular_damping() == damping {
            return;
        }
        native.set_angular_damping(damping);
        self.property_changes.push(PropertyChange {
            body,
            name: "angular_damping",
            value: PropertyValue::Float(damping),
        });
    }

    pub fn body_gravity_scale(&self, body: BodyId) -> f32 {
        self.native_body(body)
            .map_or(0.0, |native| native.gravity_scale())
    }

    pub fn set_body_gravity_scale(&mut self, body: BodyId, scale: f32) {
        let Some(record) = self.body_records.get(&body) else {
            return;
        };
        let Some(native) = self.bodies.get_mut(record.handle) else {
            return;
        };
        if native.gravity_scale() == scale {
            return;
        }
        native.set_gravity_scale(scale, true);
        self.property_changes.push(PropertyChange {
            body,
            name: "gravity_scale",
            value: PropertyValue::Float(scale),
        });
    }

    /// Mass in kernel units, derived from the attached colliders' densities.
    pub fn body_mass(&self, body: BodyId) -> f32 {
        self.native_body(body).map_or(0.0, |native| native.mass())
    }

    /// World-space centre of mass, in pixels.
    pub fn body_centre_of_mass(&self, body: BodyId) -> Vec2 {
        self.native_body(body).map_or(Vec2::ZERO, |native| {
            convert::engine_point(*native.center_of_mass())
        })
    }

    /// Transforms a body-local point (pixels) into world space.
    pub fn body_world_point(&self, body: BodyId, local: Vec2) -> Vec2 {
        self.native_body(body).map_or(local, |native| {
            convert::engine_point(native.position() * convert::sim_point(local))
        })
    }

    /// Transforms a world-space point (pixels) into the body's local space.
    pub fn body_local_point(&self, body: BodyId, world: Vec2) -> Vec2 {
        self.native_body(body).map_or(world, |native| {
            convert::engine_point(
                native
                    .position()
                    .inverse_transform_point(&convert::sim_point(world)),
            )
        })
    }

    /// A body-local rotation (degrees) expressed in world space.
    pub fn body_world_rotation(&self, body: BodyId, local_degrees: f32) -> f32 {
        self.body_rotation(body) + local_degrees
    }

    /// A world-space rotation (degrees) expressed in the body's local space.
    pub fn body_local_rotation(&self, body: BodyId, world_degrees: f32) -> f32 {
        world_degrees - self.body_rotation(body)
    }

    /// Velocity of the material point of the body currently at a world
    /// position, combining linear and angular motion. In px/s.
    pub fn body_velocity_at_world_point(&self, body: BodyId, world: Vec2) -> Vec2 {
        self.native_body(body).map_or(Vec2::ZERO, |native| {
            convert::engine_vec(native.velocity_at_point(&convert::sim_point(world)))
        })
    }

    // -----------------------------------------------------------------------
    // Forces and impulses
    // -----------------------------------------------------------------------

    /// Applies a force at the centre of mass, accumulated until the end of
    /// the next step. Forces only move dynamic bodies; on others the kernel
    /// ignores them.
    pub fn apply_force(&mut self, body: BodyId, force: Vec2) {
        if let Some(native) = self.native_body_mut(body) {
            native.add_force(convert::sim_vec(force), true);
        }
    }

    pub fn apply_force_at_point(&mut self, body: BodyId, force: Vec2, world_point: Vec2) {
        if let Some(native) = self.native_body_mut(body) {
            native.add_force_at_point(
                convert::sim_vec(force),
                convert::sim_point(world_point),
                true,
            );
        }
    }

    /// Torque passes through in kernel units; only lengths convert.
    pub fn apply_torque(&mut self, body: BodyId, torque: f32) {
        if let Some(native) = self.native_body_mut(body) {
            native.add_torque(torque, true);
        }
    }

    /// Instantaneous velocity change scaled by mass.
    pub fn apply_linear_impulse(&mut self, body: BodyId, impulse: Vec2) {
        if let Some(native) = self.native_body_mut(body) {
            native.apply_impulse(convert::sim_vec(impulse), true);
        }
    }

    pub fn apply_linear_impulse_at_point(&mut self, body: BodyId, impulse: Vec2, world_point: Vec2) {
        if let Some(native) = self.native_body_mut(body) {
            native.apply_impulse_at_point(
                convert::sim_vec(impulse),
                convert::sim_point(world_point),
                true,
            );
        }
    }

    pub fn apply_angular_impulse(&mut self, body: BodyId, impulse: f32) {
        if let Some(native) = self.native_body_mut(body) {
            native.apply_torque_impulse(impulse, true);
        }
    }

    // -----------------------------------------------------------------------
    // Flags and lifecycle
    // -----------------------------------------------------------------------

    pub fn body_type(&self, body: BodyId) -> BodyType {
        self.body_records
            .get(&body)
            .map_or(BodyType::Static, |record| record.kind)
    }

    /// Switches the body's simulation type. Structural: rejected while the
    /// world is locked.
    pub fn set_body_type(&mut self, body: BodyId, kind: BodyType) {
        if self.locked {
            tracing::warn!(body = body.0, "set_body_type while the world is locked; ignoring");
            return;
        }
        let Some(record) = self.body_records.get_mut(&body) else {
            return;
        };
        if record.kind == kind {
            return;
        }
        record.kind = kind;
        let handle = record.handle;
        if let Some(native) = self.bodies.get_mut(handle) {
            native.set_body_type(kind.to_kernel(), true);
        }
        self.property_changes.push(PropertyChange {
            body,
            name: "body_type",
            value: PropertyValue::BodyType(kind),
        });
    }

    pub fn is_body_enabled(&self, body: BodyId) -> bool {
        self.native_body(body)
            .is_some_and(|native| native.is_enabled())
    }

    /// Removes the body (and its colliders) from the simulation without
    /// destroying it. Structural: rejected while the world is locked.
    pub fn set_body_enabled(&mut self, body: BodyId, enabled: bool) {
        if self.locked {
            tracing::warn!(body = body.0, "set_body_enabled while the world is locked; ignoring");
            return;
        }
        let Some(record) = self.body_records.get(&body) else {
            return;
        };
        let Some(native) = self.bodies.get_mut(record.handle) else {
            return;
        };
        if native.is_enabled() == enabled {
            return;
        }
        native.set_enabled(enabled);
        self.property_changes.push(PropertyChange {
            body,
            name: "enabled",
            value: PropertyValue::Bool(enabled),
        });
    }

    pub fn is_body_fixed_rotation(&self, body: BodyId) -> bool {
        self.body_records
            .get(&body)
            .is_some_and(|record| record.fixed_rotation)
    }

    pub fn set_body_fixed_rotation(&mut self, body: BodyId, fixed: bool) {
        let Some(record) = self.body_records.get_mut(&body) else {
            return;
        };
        if record.fixed_rotation == fixed {
            return;
        }
        record.fixed_rotation = fixed;
        let handle = record.handle;
        if let Some(native) = self.bodies.get_mut(handle) {
            native.lock_rotations(fixed, true);
        }
        self.property_changes.push(PropertyChange {
            body,
            name: "fixed_rotation",
            value: PropertyValue::Bool(fixed),
        });
    }

    pub fn is_body_fast(&self, body: BodyId) -> bool {
        self.body_records.get(&body).is_some_and(|record| record.fast)
    }

    /// Marks the body as fast-moving. The kernel's continuous collision
    /// detection engages only while the world-level gate is also on.
    pub fn set_body_fast(&mut self, body: BodyId, fast: bool) {
        let Some(record) = self.body_records.get_mut(&body) else {
            return;
        };
        if record.fast == fast {
            return;
        }
        record.fast = fast;
        let handle = record.handle;
        let ccd = fast && self.continuous_physics;
        if let Some(native) = self.bodies.get_mut(handle) {
            native.enable_ccd(ccd);
        }
        self.property_changes.push(PropertyChange {
            body,
            name: "fast",
            value: PropertyValue::Bool(fast),
        });
    }

    pub fn is_body_sleep_allowed(&self, body: BodyId) -> bool {
        self.body_records
            .get(&body)
            .is_some_and(|record| record.sleep_allowed)
    }

    pub fn set_body_sleep_allowed(&mut self, body: BodyId, allowed: bool) {
        let Some(record) = self.body_records.get_mut(&body) else {
            return;
        };
        if record.sleep_allowed == allowed {
            return;
        }
        record.sleep_allowed = allowed;
        let handle = record.handle;
        let can_sleep = allowed && self.allow_sleep;
        if let Some(native) = self.bodies.get_mut(handle) {
            apply_activation(native, can_sleep);
        }
        self.property_changes.push(PropertyChange {
            body,
            name: "sleep_allowed",
            value: PropertyValue::Bool(allowed),
        });
    }

    /// Puts the body to sleep immediately.
    pub fn body_sleep(&mut self, body: BodyId) {
        if let Some(native) = self.native_body_mut(body) {
            native.sleep();
        }
    }

    pub fn body_wake(&mut self, body: BodyId) {
        if let Some(native) = self.native_body_mut(body) {
            native.wake_up(true);
        }
    }

    pub fn is_body_awake(&self, body: BodyId) -> bool {
        self.native_body(body)
            .is_some_and(|native| !native.is_sleeping())
    }

    // -----------------------------------------------------------------------
    // Identity and user state
    // -----------------------------------------------------------------------

    pub fn body_game_object(&self, body: BodyId) -> Option<GameObjectId> {
        self.body_records.get(&body).and_then(|record| record.game_object)
    }

    /// Associates the body with an engine game object. The association feeds
    /// object-level contact fan-out and the removal observer.
    pub fn set_body_game_object(&mut self, body: BodyId, object: GameObjectId) {
        if let Some(record) = self.body_records.get_mut(&body) {
            record.game_object = Some(object);
        }
    }

    pub fn clear_body_game_object(&mut self, body: BodyId) {
        if let Some(record) = self.body_records.get_mut(&body) {
            record.game_object = None;
        }
    }

    /// Stores a value in the body's user bag. The physics layer never reads
    /// or writes the bag on its own.
    pub fn set_body_property(&mut self, body: BodyId, key: &str, value: PropertyValue) {
        if let Some(record) = self.body_records.get_mut(&body) {
            record.user.insert(key.to_owned(), value);
        }
    }

    pub fn body_property(&self, body: BodyId, key: &str) -> Option<&PropertyValue> {
        self.body_records.get(&body)?.user.get(key)
    }

    pub fn remove_body_property(&mut self, body: BodyId, key: &str) -> Option<PropertyValue> {
        self.body_records.get_mut(&body)?.user.remove(key)
    }

    // -----------------------------------------------------------------------
    // Cloning
    // -----------------------------------------------------------------------

    /// Deep-copies a body: type, transform, velocities, damping, flags and
    /// every collider (with fresh ids). The game-object association and the
    /// user bag intentionally stay behind; the copy is a new identity.
    pub fn clone_body(&mut self, source: BodyId) -> Option<BodyId> {
        if self.locked {
            tracing::warn!(body = source.0, "clone_body while the world is locked; ignoring");
            return None;
        }
        let record = self.body_records.get(&source)?;
        let kind = record.kind;
        let fast = record.fast;
        let sleep_allowed = record.sleep_allowed;
        let fixed_rotation = record.fixed_rotation;
        let collider_defs: Vec<(ColliderDef, bool)> = record
            .colliders
            .iter()
            .filter_map(|id| {
                self.collider_records
                    .get(id)
                    .map(|collider| (collider.to_def(), collider.enabled))
            })
            .collect();

        let native = self.native_body(source)?;
        let position = *native.position();
        let linvel = *native.linvel();
        let angvel = native.angvel();
        let linear_damping = native.linear_damping();
        let angular_damping = native.angular_damping();
        let gravity_scale = native.gravity_scale();
        let enabled = native.is_enabled();

        let ccd = fast && self.continuous_physics;
        let can_sleep = sleep_allowed && self.allow_sleep;

        let copy = self.create_body(kind)?;
        if let Some(native) = self.native_body_mut(copy) {
            native.set_position(position, false);
            native.set_linvel(linvel, false);
            native.set_angvel(angvel, false);
            native.set_linear_damping(linear_damping);
            native.set_angular_damping(angular_damping);
            native.set_gravity_scale(gravity_scale, false);
            native.lock_rotations(fixed_rotation, false);
            native.enable_ccd(ccd);
            if !enabled {
                native.set_enabled(false);
            }
            apply_activation(native, can_sleep);
        }
        if let Some(record) = self.body_records.get_mut(&copy) {
            record.fast = fast;
            record.sleep_allowed = sleep_allowed;
            record.fixed_rotation = fixed_rotation;
        }
        for (def, def_enabled) in collider_defs {
            if let Some(collider) = self.attach_collider(copy, def)
                && !def_enabled
            {
                self.set_collider_enabled(collider, false);
            }
        }
        tracing::debug!(source = source.0, copy = copy.0, "cloned body");
        Some(copy)
    }
}

#[cfg(test)]
#[path = "body_tests.rs"]
mod tests;
