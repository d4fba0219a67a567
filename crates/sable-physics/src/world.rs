//! The physics world: id arenas, the step lifecycle, and world-level flags.
//!
//! [`PhysicsWorld`] exclusively owns every kernel object. Engine code holds
//! copyable ids and goes through the world for every read and write, which is
//! what makes the locked-step mutation rules enforceable in one place.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::Duration;

use glam::Vec2;
use rapier2d::prelude::*;
use rustc_hash::FxHashMap;
use sable_config::PhysicsConfig;

use crate::body::{self, BodyRecord, BodyType, PropertyChange};
use crate::collider::ColliderRecord;
use crate::convert;
use crate::debug_draw::DebugDrawFilter;
use crate::events::{ContactHandlers, RawContactEvent, StepEventAdapter};
use crate::joint::JointRecord;

// ---------------------------------------------------------------------------
// Ids
// ---------------------------------------------------------------------------

/// Stable id of a rigid body owned by a [`PhysicsWorld`].
///
/// Ids are minted once and never reused within a world's lifetime, so a stale
/// id held by engine code can only ever miss, never alias a newer object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub(crate) u64);

/// Stable id of a collider attached to a body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColliderId(pub(crate) u64);

/// Stable id of a joint connecting two bodies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JointId(pub(crate) u64);

/// Engine-side game-object identity. Opaque to the physics layer; it only
/// carries the value through contact fan-out and the removal observer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GameObjectId(u64);

impl BodyId {
    /// The raw id value, for engine-side bookkeeping and logging.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl ColliderId {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl JointId {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl GameObjectId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// Central 2D physics world owning all kernel state.
///
/// All lengths on this API are engine pixels and all angles engine degrees;
/// conversion to the kernel's metres and radians happens inside each call.
/// Structural mutations (create/destroy, attach/remove, body type or enabled
/// changes) are rejected with a warning while a step is in flight.
pub struct PhysicsWorld {
    // Kernel state.
    pipeline: PhysicsPipeline,
    integration_parameters: IntegrationParameters,
    pub(crate) islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    pub(crate) bodies: RigidBodySet,
    pub(crate) colliders: ColliderSet,
    pub(crate) impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    pub(crate) query_pipeline: QueryPipeline,

    // Engine-side configuration.
    gravity: Vec2,
    timescale: f32,
    fixed_step: bool,
    fixed_dt: f32,
    pub(crate) allow_sleep: bool,
    pub(crate) continuous_physics: bool,
    sub_stepping: bool,
    auto_clear_forces: bool,
    pub(crate) locked: bool,

    // Id-keyed arenas.
    pub(crate) body_records: FxHashMap<BodyId, BodyRecord>,
    pub(crate) collider_records: FxHashMap<ColliderId, ColliderRecord>,
    pub(crate) joint_records: FxHashMap<JointId, JointRecord>,
    next_body_id: u64,
    pub(crate) next_collider_id: u64,
    pub(crate) next_joint_id: u64,

    // Event plumbing.
    pub(crate) raw_events: Mutex<Vec<RawContactEvent>>,
    pub(crate) handlers: ContactHandlers,
    pub(crate) property_changes: Vec<PropertyChange>,
    removal_observer: Option<Box<dyn FnMut(BodyId, GameObjectId)>>,

    // Debug drawing.
    debug_draw_enabled: bool,
    debug_draw_filter: DebugDrawFilter,
}

impl PhysicsWorld {
    /// Creates a world with the default [`PhysicsConfig`].
    pub fn new() -> Self {
        Self::with_config(&PhysicsConfig::default())
    }

    /// Creates a world from a configuration snapshot: gravity, timescale,
    /// step mode and world flags are applied in one shot.
    pub fn with_config(config: &PhysicsConfig) -> Self {
        let integration_parameters = IntegrationParameters {
            dt: config.fixed_dt,
            ..Default::default()
        };

        Self {
            pipeline: PhysicsPipeline::new(),
            integration_parameters,
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            gravity: Vec2::new(config.gravity.0, config.gravity.1),
            timescale: config.timescale.max(0.0),
            fixed_step: config.fixed_step,
            fixed_dt: config.fixed_dt,
            allow_sleep: config.allow_sleep,
            continuous_physics: config.continuous_physics,
            sub_stepping: config.sub_stepping,
            auto_clear_forces: config.auto_clear_forces,
            locked: false,
            body_records: FxHashMap::default(),
            collider_records: FxHashMap::default(),
            joint_records: FxHashMap::default(),
            next_body_id: 1,
            next_collider_id: 1,
            next_joint_id: 1,
            raw_events: Mutex::new(Vec::new()),
            handlers: ContactHandlers::default(),
            property_changes: Vec::new(),
            removal_observer: None,
            debug_draw_enabled: false,
            debug_draw_filter: DebugDrawFilter::default(),
        }
    }

    // -----------------------------------------------------------------------
    // Stepping
    // -----------------------------------------------------------------------

    /// Advances the simulation by one step.
    ///
    /// `dt` is the frame time unless fixed-step mode is on, in which case the
    /// configured fixed timestep is used instead; either is then scaled by the
    /// timescale. A zero effective timestep is a complete no-op: no kernel
    /// step runs and no contact events fire.
    ///
    /// `velocity_iterations` maps onto the kernel's solver iteration count and
    /// `position_iterations` onto its internal stabilisation iterations.
    /// Contact handlers run after the kernel step returns, with the world
    /// still locked, so structural mutations they attempt are rejected.
    pub fn update(&mut self, dt: Duration, velocity_iterations: u32, position_iterations: u32) {
        if self.locked {
            tracing::warn!("update called while the world is locked; ignoring");
            return;
        }
        let base_dt = if self.fixed_step {
            self.fixed_dt
        } else {
            dt.as_secs_f32()
        };
        let step_dt = base_dt * self.timescale;
        if step_dt <= 0.0 {
            return;
        }

        self.integration_parameters.dt = step_dt;
        self.integration_parameters.num_solver_iterations =
            NonZeroUsize::new(velocity_iterations.max(1) as usize).unwrap_or(NonZeroUsize::MIN);
        self.integration_parameters
            .num_internal_stabilization_iterations = position_iterations.max(1) as usize;
        self.integration_parameters.max_ccd_substeps = if self.sub_stepping { 4 } else { 1 };

        let gravity = convert::sim_vec(self.gravity);
        self.locked = true;
        {
            let adapter = StepEventAdapter::new(&self.raw_events, &self.collider_records);
            self.pipeline.step(
                &gravity,
                &self.integration_parameters,
                &mut self.islands,
                &mut self.broad_phase,
                &mut self.narrow_phase,
                &mut self.bodies,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                &mut self.ccd_solver,
                Some(&mut self.query_pipeline),
                &adapter,
                &adapter,
            );
        }
        self.dispatch_contact_events();
        if self.auto_clear_forces {
            self.clear_forces();
        }
        self.locked = false;
    }

    /// True exactly while a step (or a callback issued during one) executes.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    // -----------------------------------------------------------------------
    // Body lifecycle
    // -----------------------------------------------------------------------

    /// Creates an empty body of the given type at the origin. Shape it by
    /// attaching colliders afterwards.
    pub fn create_body(&mut self, kind: BodyType) -> Option<BodyId> {
        if self.locked {
            tracing::warn!("create_body while the world is locked; ignoring");
            return None;
        }
        let id = BodyId(self.next_body_id);
        self.next_body_id += 1;
        let builder = match kind {
            BodyType::Static => RigidBodyBuilder::fixed(),
            BodyType::Kinematic => RigidBodyBuilder::kinematic_velocity_based(),
            BodyType::Dynamic => RigidBodyBuilder::dynamic(),
        };
        let handle = self.bodies.insert(builder.user_data(id.0 as u128).build());
        if !self.allow_sleep
            && let Some(native) = self.bodies.get_mut(handle)
        {
            body::apply_activation(native, false);
        }
        self.body_records.insert(id, BodyRecord::new(handle, kind));
        tracing::debug!(body = id.0, ?kind, "created body");
        Some(id)
    }

    /// Destroys a body together with its colliders and any joint touching it.
    ///
    /// The removal observer fires before the kernel objects go away so the
    /// engine can detach the associated game object first. Destroying an
    /// already-destroyed id returns `false` without complaint.
    pub fn destroy_body(&mut self, body: BodyId) -> bool {
        if self.locked {
            tracing::warn!(body = body.0, "destroy_body while the world is locked; ignoring");
            return false;
        }
        let Some(record) = self.body_records.remove(&body) else {
            return false;
        };
        if let Some(object) = record.game_object
            && let Some(observer) = self.removal_observer.as_mut()
        {
            observer(body, object);
        }
        let touching: Vec<JointId> = self
            .joint_records
            .iter()
            .filter(|(_, joint)| joint.body_a == body || joint.body_b == body)
            .map(|(id, _)| *id)
            .collect();
        for id in touching {
            if let Some(joint) = self.joint_records.remove(&id) {
                self.impulse_joints.remove(joint.handle, true);
            }
        }
        for collider in &record.colliders {
            self.collider_records.remove(collider);
            self.handlers.drop_collider(*collider);
        }
        self.bodies.remove(
            record.handle,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
        self.handlers.drop_body(body);
        tracing::debug!(body = body.0, "destroyed body");
        true
    }

    /// Destroys a joint. Destroying an already-destroyed id returns `false`.
    pub fn destroy_joint(&mut self, joint: JointId) -> bool {
        if self.locked {
            tracing::warn!(joint = joint.0, "destroy_joint while the world is locked; ignoring");
            return false;
        }
        let Some(record) = self.joint_records.remove(&joint) else {
            return false;
        };
        self.impulse_joints.remove(record.handle, true);
        tracing::debug!(joint = joint.0, "destroyed joint");
        true
    }

    /// Registers the observer called with a body's game-object association
    /// just before the body is destroyed.
    pub fn set_body_removal_observer(
        &mut self,
        observer: impl FnMut(BodyId, GameObjectId) + 'static,
    ) {
        self.removal_observer = Some(Box::new(observer));
    }

    pub fn clear_body_removal_observer(&mut self) {
        self.removal_observer = None;
    }

    // -----------------------------------------------------------------------
    // Counts and iteration
    // -----------------------------------------------------------------------

    pub fn body_count(&self) -> usize {
        self.body_records.len()
    }

    pub fn collider_count(&self) -> usize {
        self.collider_records.len()
    }

    pub fn joint_count(&self) -> usize {
        self.joint_records.len()
    }

    /// Iterates over every live body id, in no particular order.
    pub fn body_ids(&self) -> impl Iterator<Item = BodyId> + '_ {
        self.body_records.keys().copied()
    }

    pub fn collider_ids(&self) -> impl Iterator<Item = ColliderId> + '_ {
        self.collider_records.keys().copied()
    }

    pub fn joint_ids(&self) -> impl Iterator<Item = JointId> + '_ {
        self.joint_records.keys().copied()
    }

    // -----------------------------------------------------------------------
    // World flags
    // -----------------------------------------------------------------------

    /// World gravity in engine px/s², y-down.
    pub fn gravity(&self) -> Vec2 {
        self.gravity
    }

    pub fn set_gravity(&mut self, gravity: Vec2) {
        self.gravity = gravity;
    }

    pub fn timescale(&self) -> f32 {
        self.timescale
    }

    /// Sets the simulation speed multiplier. Negative input clamps to zero.
    pub fn set_timescale(&mut self, timescale: f32) {
        self.timescale = timescale.max(0.0);
    }

    pub fn fixed_step(&self) -> bool {
        self.fixed_step
    }

    /// Toggles fixed-step mode; when on, `update` ignores the passed frame
    /// time and steps by the configured fixed timestep instead.
    pub fn set_fixed_step(&mut self, fixed: bool) {
        self.fixed_step = fixed;
    }

    pub fn allow_sleep(&self) -> bool {
        self.allow_sleep
    }

    /// Globally enables or disables sleeping. Disabling wakes every body and
    /// keeps it awake; re-enabling restores each body's own sleep permission.
    pub fn set_allow_sleep(&mut self, allow: bool) {
        if self.allow_sleep == allow {
            return;
        }
        self.allow_sleep = allow;
        for record in self.body_records.values() {
            if let Some(native) = self.bodies.get_mut(record.handle) {
                body::apply_activation(native, allow && record.sleep_allowed);
            }
        }
    }

    pub fn continuous_physics(&self) -> bool {
        self.continuous_physics
    }

    /// World-level gate for continuous collision detection. A body gets
    /// kernel CCD only while this is on and the body is flagged fast.
    pub fn set_continuous_physics(&mut self, enabled: bool) {
        if self.continuous_physics == enabled {
            return;
        }
        self.continuous_physics = enabled;
        for record in self.body_records.values() {
            if let Some(native) = self.bodies.get_mut(record.handle) {
                native.enable_ccd(enabled && record.fast);
            }
        }
    }

    pub fn sub_stepping(&self) -> bool {
        self.sub_stepping
    }

    pub fn set_sub_stepping(&mut self, enabled: bool) {
        self.sub_stepping = enabled;
    }

    pub fn auto_clear_forces(&self) -> bool {
        self.auto_clear_forces
    }

    pub fn set_auto_clear_forces(&mut self, enabled: bool) {
        self.auto_clear_forces = enabled;
    }

    /// Zeroes accumulated forces and torques on every body. Runs automatically
    /// after each step unless `auto_clear_forces` is off.
    pub fn clear_forces(&mut self) {
        for record in self.body_records.values() {
            if let Some(native) = self.bodies.get_mut(record.handle) {
                native.reset_forces(false);
                native.reset_torques(false);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Debug drawing flags
    // -----------------------------------------------------------------------

    pub fn debug_draw_enabled(&self) -> bool {
        self.debug_draw_enabled
    }

    pub fn set_debug_draw_enabled(&mut self, enabled: bool) {
        self.debug_draw_enabled = enabled;
    }

    pub fn debug_draw_filter(&self) -> DebugDrawFilter {
        self.debug_draw_filter
    }

    pub fn set_debug_draw_filter(&mut self, filter: DebugDrawFilter) {
        self.debug_draw_filter = filter;
    }

    // -----------------------------------------------------------------------
    // Notifications
    // -----------------------------------------------------------------------

    /// Takes every property-change notification queued since the last drain.
    pub fn drain_property_changes(&mut self) -> Vec<PropertyChange> {
        std::mem::take(&mut self.property_changes)
    }

    /// Debug-build audit that reports kernel colliders lacking an arena
    /// record. Returns the number of orphans found.
    #[cfg(debug_assertions)]
    pub fn audit_kernel_orphans(&self) -> usize {
        let mut orphans = 0;
        for (handle, native) in self.colliders.iter() {
            let id = ColliderId(native.user_data as u64);
            if !self.collider_records.contains_key(&id) {
                tracing::warn!(?handle, "kernel collider without an arena record");
                orphans += 1;
            }
        }
        orphans
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "world_tests.rs"]
mod tests;
