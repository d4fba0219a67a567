//! Distance joints.
//!
//! A distance joint keeps the anchor distance of two bodies inside a
//! `[min, max]` range; equal bounds behave as a rigid rod. Lengths are
//! engine-side pixels everywhere, converted at the kernel boundary like
//! every other length.

use glam::Vec2;
use rapier2d::dynamics::{GenericJointBuilder, ImpulseJointHandle, JointAxesMask, JointAxis};
use rustc_hash::FxHashMap;

use sable_math::{PIXELS_PER_METRE, to_engine, to_sim};

use crate::body::PropertyValue;
use crate::convert;
use crate::world::{BodyId, JointId, PhysicsWorld};

/// Smallest length a joint is allowed to be asked for, in pixels. Also the
/// floor every length setter applies.
pub const LINEAR_SLOP_PX: f32 = 0.005 * PIXELS_PER_METRE;

/// Description of a distance joint between two distinct live bodies.
#[derive(Clone, Debug)]
pub struct DistanceJointDef {
    pub body_a: BodyId,
    pub body_b: BodyId,
    /// Anchor on `body_a`, in that body's local pixel space.
    pub local_anchor_a: Vec2,
    /// Anchor on `body_b`, in that body's local pixel space.
    pub local_anchor_b: Vec2,
    pub rest_length: f32,
    pub min_length: f32,
    pub max_length: f32,
    /// Whether the two connected bodies still collide with each other.
    /// Fixed at creation.
    pub collide_connected: bool,
}

impl DistanceJointDef {
    pub fn new(body_a: BodyId, body_b: BodyId) -> Self {
        Self {
            body_a,
            body_b,
            local_anchor_a: Vec2::ZERO,
            local_anchor_b: Vec2::ZERO,
            rest_length: PIXELS_PER_METRE,
            min_length: 0.0,
            max_length: f32::MAX,
            collide_connected: false,
        }
    }

    /// Builds a def that pins the two bodies at their current anchor
    /// distance: rest, min and max all become the distance between the two
    /// world anchors (floored at the slop), so the joint starts as a rigid
    /// rod of the current length.
    pub fn join(
        world: &PhysicsWorld,
        body_a: BodyId,
        body_b: BodyId,
        world_anchor_a: Vec2,
        world_anchor_b: Vec2,
    ) -> Self {
        let distance = (world_anchor_b - world_anchor_a).length().max(LINEAR_SLOP_PX);
        Self {
            local_anchor_a: world.body_local_point(body_a, world_anchor_a),
            local_anchor_b: world.body_local_point(body_b, world_anchor_b),
            rest_length: distance,
            min_length: distance,
            max_length: distance,
            ..Self::new(body_a, body_b)
        }
    }

    pub fn with_anchors(mut self, local_anchor_a: Vec2, local_anchor_b: Vec2) -> Self {
        self.local_anchor_a = local_anchor_a;
        self.local_anchor_b = local_anchor_b;
        self
    }

    pub fn with_lengths(mut self, rest: f32, min: f32, max: f32) -> Self {
        self.rest_length = rest;
        self.min_length = min;
        self.max_length = max;
        self
    }

    pub fn with_collide_connected(mut self, collide_connected: bool) -> Self {
        self.collide_connected = collide_connected;
        self
    }
}

/// Engine-side state of one joint. Lengths are pixels; the kernel carries
/// the metre copies inside its limit range.
pub(crate) struct JointRecord {
    pub handle: ImpulseJointHandle,
    pub body_a: BodyId,
    pub body_b: BodyId,
    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,
    pub rest_length: f32,
    pub min_length: f32,
    pub max_length: f32,
    pub collide_connected: bool,
    pub user: FxHashMap<String, PropertyValue>,
}

impl PhysicsWorld {
    /// Creates a distance joint. Returns `None` (with a warning) while the
    /// world is locked. Joining a body to itself or to a destroyed body is a
    /// programming error.
    pub fn create_joint(&mut self, def: &DistanceJointDef) -> Option<JointId> {
        if self.locked {
            tracing::warn!("create_joint while the world is locked; ignoring");
            return None;
        }
        assert_ne!(def.body_a, def.body_b, "a joint must connect two distinct bodies");
        let (Some(record_a), Some(record_b)) = (
            self.body_records.get(&def.body_a),
            self.body_records.get(&def.body_b),
        ) else {
            panic!("a joint must connect two live bodies");
        };

        let rest = def.rest_length.max(LINEAR_SLOP_PX);
        let min = def.min_length.max(LINEAR_SLOP_PX);
        let max = def.max_length.max(min);

        let joint = GenericJointBuilder::new(JointAxesMask::empty())
            .coupled_axes(JointAxesMask::LIN_AXES)
            .limits(JointAxis::LinX, [to_sim(min), to_sim(max)])
            .local_anchor1(convert::sim_point(def.local_anchor_a))
            .local_anchor2(convert::sim_point(def.local_anchor_b))
            .contacts_enabled(def.collide_connected)
            .build();
        let handle = self
            .impulse_joints
            .insert(record_a.handle, record_b.handle, joint, true);

        let id = JointId(self.next_joint_id);
        self.next_joint_id += 1;
        self.joint_records.insert(
            id,
            JointRecord {
                handle,
                body_a: def.body_a,
                body_b: def.body_b,
                local_anchor_a: def.local_anchor_a,
                local_anchor_b: def.local_anchor_b,
                rest_length: rest,
                min_length: min,
                max_length: max,
                collide_connected: def.collide_connected,
                user: FxHashMap::default(),
            },
        );
        tracing::debug!(
            joint = id.0,
            body_a = def.body_a.0,
            body_b = def.body_b.0,
            "created joint"
        );
        Some(id)
    }

    pub fn joint_bodies(&self, joint: JointId) -> Option<(BodyId, BodyId)> {
        let record = self.joint_records.get(&joint)?;
        Some((record.body_a, record.body_b))
    }

    pub fn is_joint_collide_connected(&self, joint: JointId) -> bool {
        self.joint_records
            .get(&joint)
            .is_some_and(|record| record.collide_connected)
    }

    // -----------------------------------------------------------------------
    // Lengths
    // -----------------------------------------------------------------------

    pub fn joint_rest_length(&self, joint: JointId) -> f32 {
        self.joint_records.get(&joint).map_or(0.0, |record| record.rest_length)
    }

    pub fn joint_minimum_length(&self, joint: JointId) -> f32 {
        self.joint_records.get(&joint).map_or(0.0, |record| record.min_length)
    }

    pub fn joint_max_length(&self, joint: JointId) -> f32 {
        self.joint_records.get(&joint).map_or(0.0, |record| record.max_length)
    }

    /// Distance between the two world anchors right now, in px. Zero for a
    /// dead joint.
    pub fn joint_current_length(&self, joint: JointId) -> f32 {
        let Some(record) = self.joint_records.get(&joint) else {
            return 0.0;
        };
        let (Some(record_a), Some(record_b)) = (
            self.body_records.get(&record.body_a),
            self.body_records.get(&record.body_b),
        ) else {
            return 0.0;
        };
        let (Some(native_a), Some(native_b)) = (
            self.bodies.get(record_a.handle),
            self.bodies.get(record_b.handle),
        ) else {
            return 0.0;
        };
        let anchor_a = native_a.position() * convert::sim_point(record.local_anchor_a);
        let anchor_b = native_b.position() * convert::sim_point(record.local_anchor_b);
        to_engine((anchor_b - anchor_a).norm())
    }

    /// Sets the rest length, floored at the slop. Returns the length
    /// actually applied, which is what callers must use.
    pub fn set_joint_rest_length(&mut self, joint: JointId, length: f32) -> f32 {
        let Some(record) = self.joint_records.get_mut(&joint) else {
            tracing::warn!(joint = joint.0, "set_joint_rest_length on a dead joint");
            return 0.0;
        };
        record.rest_length = length.max(LINEAR_SLOP_PX);
        record.rest_length
    }

    /// Sets the minimum length, clamped to `[slop, max_length]`. Returns the
    /// length actually applied.
    pub fn set_joint_minimum_length(&mut self, joint: JointId, length: f32) -> f32 {
        let Some(record) = self.joint_records.get_mut(&joint) else {
            tracing::warn!(joint = joint.0, "set_joint_minimum_length on a dead joint");
            return 0.0;
        };
        record.min_length = length.clamp(LINEAR_SLOP_PX, record.max_length);
        let (handle, min, max) = (record.handle, record.min_length, record.max_length);
        self.push_joint_limits(handle, min, max);
        min
    }

    /// Sets the maximum length, clamped to stay at or above the minimum.
    /// Returns the length actually applied.
    pub fn set_joint_max_length(&mut self, joint: JointId, length: f32) -> f32 {
        let Some(record) = self.joint_records.get_mut(&joint) else {
            tracing::warn!(joint = joint.0, "set_joint_max_length on a dead joint");
            return 0.0;
        };
        record.max_length = length.max(record.min_length);
        let (handle, min, max) = (record.handle, record.min_length, record.max_length);
        self.push_joint_limits(handle, min, max);
        max
    }

    fn push_joint_limits(&mut self, handle: ImpulseJointHandle, min: f32, max: f32) {
        if let Some(native) = self.impulse_joints.get_mut(handle, true) {
            native.data.set_limits(JointAxis::LinX, [to_sim(min), to_sim(max)]);
        }
    }

    // -----------------------------------------------------------------------
    // User bag
    // -----------------------------------------------------------------------

    pub fn set_joint_property(&mut self, joint: JointId, key: &str, value: PropertyValue) {
        if let Some(record) = self.joint_records.get_mut(&joint) {
            record.user.insert(key.to_owned(), value);
        }
    }

    pub fn joint_property(&self, joint: JointId, key: &str) -> Option<&PropertyValue> {
        self.joint_records.get(&joint)?.user.get(key)
    }

    pub fn remove_joint_property(&mut self, joint: JointId, key: &str) -> Option<PropertyValue> {
        self.joint_records.get_mut(&joint)?.user.remove(key)
    }
}
