//! Collision shapes, collider definitions, and live-collider operations.
//!
//! A [`ColliderDef`] is a free-standing value describing shape, placement,
//! material and filtering. Attaching consumes the def, which is what makes
//! the one-body-per-collider rule structural: there is no operation that
//! re-parents a live collider.

use glam::Vec2;
use rapier2d::na::Point2;
use rapier2d::prelude::{
    ActiveEvents, ActiveHooks, ColliderBuilder, ColliderHandle, Group, InteractionGroups,
    SharedShape,
};
use sable_math::{Aabb, to_sim};

use crate::convert;
use crate::world::{BodyId, ColliderId, PhysicsWorld};

// ---------------------------------------------------------------------------
// Shapes and definitions
// ---------------------------------------------------------------------------

/// Geometry of a collider, in engine pixels, local to the owning body.
#[derive(Clone, Debug, PartialEq)]
pub enum ColliderShape {
    /// Circle centred on the collider origin.
    Circle { radius: f32 },
    /// Box centred on the collider origin (before the local offset and
    /// rotation are applied).
    Box { width: f32, height: f32 },
    /// Convex polygon with 3 to 8 vertices. The kernel may reorder the
    /// vertices into a convex polyline.
    Polygon { points: Vec<Vec2> },
    /// A segment, optionally carrying ghost vertices describing the
    /// neighbouring segments of a chain. The kernel shape is the bare
    /// segment; ghosts are kept as data for terrain tooling and drawing.
    Edge {
        a: Vec2,
        b: Vec2,
        ghost_before: Option<Vec2>,
        ghost_after: Option<Vec2>,
    },
}

/// Surface and mass properties of a collider.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    /// Mass per square metre, fed to the kernel's mass computation.
    pub density: f32,
    pub friction: f32,
    pub restitution: f32,
    /// Engine-tracked bounce-velocity threshold, px/s. The kernel applies its
    /// own global threshold; this keeps the configured value addressable.
    pub restitution_threshold: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            density: 1.0,
            friction: 0.2,
            restitution: 0.0,
            restitution_threshold: 10.0,
        }
    }
}

/// Pair filtering data with classic 2D-engine precedence: a shared non-zero
/// group forces the outcome (positive collides, negative never), otherwise
/// the category/mask test must pass in both directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CollisionFilter {
    pub category: u16,
    pub mask: u16,
    pub group: i16,
}

impl Default for CollisionFilter {
    fn default() -> Self {
        Self {
            category: 0x0001,
            mask: 0xFFFF,
            group: 0,
        }
    }
}

impl CollisionFilter {
    /// The group/mask pair test. Enabled flags are checked by the caller.
    pub fn should_collide(&self, other: &CollisionFilter) -> bool {
        if self.group == other.group && self.group != 0 {
            return self.group > 0;
        }
        (self.mask & other.category) != 0 && (other.mask & self.category) != 0
    }
}

/// Free-standing description of a collider, consumed by value on attach.
#[derive(Clone, Debug, PartialEq)]
pub struct ColliderDef {
    pub shape: ColliderShape,
    /// Local offset from the body origin, pixels.
    pub offset: Vec2,
    /// Local rotation, degrees.
    pub rotation: f32,
    pub material: Material,
    pub sensor: bool,
    pub filter: CollisionFilter,
}

impl ColliderDef {
    pub fn circle(radius: f32) -> Self {
        Self::from_shape(ColliderShape::Circle { radius })
    }

    pub fn rect(width: f32, height: f32) -> Self {
        Self::from_shape(ColliderShape::Box { width, height })
    }

    /// Panics unless `points` has 3 to 8 vertices.
    pub fn polygon(points: Vec<Vec2>) -> Self {
        assert!(
            (3..=8).contains(&points.len()),
            "a polygon collider needs 3 to 8 vertices, got {}",
            points.len()
        );
        Self::from_shape(ColliderShape::Polygon { points })
    }

    pub fn edge(a: Vec2, b: Vec2) -> Self {
        Self::from_shape(ColliderShape::Edge {
            a,
            b,
            ghost_before: None,
            ghost_after: None,
        })
    }

    fn from_shape(shape: ColliderShape) -> Self {
        Self {
            shape,
            offset: Vec2::ZERO,
            rotation: 0.0,
            material: Material::default(),
            sensor: false,
            filter: CollisionFilter::default(),
        }
    }

    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_rotation(mut self, degrees: f32) -> Self {
        self.rotation = degrees;
        self
    }

    pub fn with_density(mut self, density: f32) -> Self {
        self.material.density = density;
        self
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.material.friction = friction;
        self
    }

    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.material.restitution = restitution;
        self
    }

    pub fn with_sensor(mut self, sensor: bool) -> Self {
        self.sensor = sensor;
        self
    }

    pub fn with_filter(mut self, filter: CollisionFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Stores chain ghost vertices on an edge shape; ignored for others.
    pub fn with_ghosts(mut self, before: Vec2, after: Vec2) -> Self {
        if let ColliderShape::Edge {
            ghost_before,
            ghost_after,
            ..
        } = &mut self.shape
        {
            *ghost_before = Some(before);
            *ghost_after = Some(after);
        }
        self
    }
}

/// Engine-side state for one live collider.
pub(crate) struct ColliderRecord {
    pub handle: ColliderHandle,
    pub body: BodyId,
    pub shape: ColliderShape,
    pub offset: Vec2,
    pub rotation: f32,
    pub material: Material,
    pub sensor: bool,
    /// The configured filter. While the collider is disabled the kernel-side
    /// mask is zeroed but this record keeps the real value for restoration.
    pub filter: CollisionFilter,
    pub enabled: bool,
}

impl ColliderRecord {
    pub(crate) fn to_def(&self) -> ColliderDef {
        ColliderDef {
            shape: self.shape.clone(),
            offset: self.offset,
            rotation: self.rotation,
            material: self.material,
            sensor: self.sensor,
            filter: self.filter,
        }
    }
}

// ---------------------------------------------------------------------------
// Kernel mapping
// ---------------------------------------------------------------------------

/// Builds the kernel shape for an engine shape description.
///
/// Degenerate polygons (all points collinear, or fewer than three distinct
/// points) fall back to their bounding box with a warning rather than
/// rejecting the collider outright.
pub(crate) fn build_shared_shape(shape: &ColliderShape) -> SharedShape {
    match shape {
        ColliderShape::Circle { radius } => SharedShape::ball(to_sim(*radius)),
        ColliderShape::Box { width, height } => {
            SharedShape::cuboid(to_sim(width * 0.5), to_sim(height * 0.5))
        }
        ColliderShape::Polygon { points } => {
            let vertices: Vec<Point2<f32>> = points.iter().map(|p| convert::sim_point(*p)).collect();
            SharedShape::convex_polyline(vertices.clone())
                .or_else(|| SharedShape::convex_hull(&vertices))
                .unwrap_or_else(|| {
                    tracing::warn!("degenerate polygon collider, substituting its bounding box");
                    let mut min = Vec2::splat(f32::MAX);
                    let mut max = Vec2::splat(f32::MIN);
                    for p in points {
                        min = min.min(*p);
                        max = max.max(*p);
                    }
                    let half = ((max - min) * 0.5).max(Vec2::splat(0.1));
                    SharedShape::cuboid(to_sim(half.x), to_sim(half.y))
                })
        }
        ColliderShape::Edge { a, b, .. } => {
            SharedShape::segment(convert::sim_point(*a), convert::sim_point(*b))
        }
    }
}

/// Maps a filter and enabled flag onto kernel interaction groups.
///
/// A disabled collider gets an empty mask so the broad phase never pairs it.
/// A non-zero group cannot be expressed as a bitmask, so such colliders get
/// fully open groups and the pair-filter hook applies the real precedence.
pub(crate) fn kernel_groups(filter: &CollisionFilter, enabled: bool) -> InteractionGroups {
    if !enabled {
        return InteractionGroups::new(
            Group::from_bits(filter.category as u32).unwrap_or_else(Group::all),
            Group::NONE,
        );
    }
    if filter.group != 0 {
        return InteractionGroups::all();
    }
    InteractionGroups::new(
        Group::from_bits(filter.category as u32).unwrap_or_else(Group::all),
        Group::from_bits(filter.mask as u32).unwrap_or_else(Group::all),
    )
}

// ---------------------------------------------------------------------------
// Live collider operations
// ---------------------------------------------------------------------------

impl PhysicsWorld {
    /// Attaches a collider built from `def` to a body. The collider belongs
    /// to that body until removed or the body is destroyed. Structural:
    /// rejected while the world is locked.
    pub fn attach_collider(&mut self, body: BodyId, def: ColliderDef) -> Option<ColliderId> {
        if self.locked {
            tracing::warn!(body = body.0, "attach_collider while the world is locked; ignoring");
            return None;
        }
        let Some(record) = self.body_records.get(&body) else {
            tracing::warn!(body = body.0, "attach_collider on an unknown body");
            return None;
        };
        let body_handle = record.handle;
        let id = ColliderId(self.next_collider_id);
        self.next_collider_id += 1;

        let collider = ColliderBuilder::new(build_shared_shape(&def.shape))
            .position(convert::sim_iso(def.offset, def.rotation))
            .density(def.material.density)
            .friction(def.material.friction)
            .restitution(def.material.restitution)
            .sensor(def.sensor)
            .collision_groups(kernel_groups(&def.filter, true))
            .active_events(ActiveEvents::COLLISION_EVENTS | ActiveEvents::CONTACT_FORCE_EVENTS)
            .active_hooks(
                ActiveHooks::FILTER_CONTACT_PAIRS
                    | ActiveHooks::FILTER_INTERSECTION_PAIR
                    | ActiveHooks::MODIFY_SOLVER_CONTACTS,
            )
            .contact_force_event_threshold(0.0)
            .user_data(id.0 as u128)
            .build();
        let handle = self
            .colliders
            .insert_with_parent(collider, body_handle, &mut self.bodies);
        if let Some(native) = self.bodies.get_mut(body_handle) {
            native.recompute_mass_properties_from_colliders(&self.colliders);
        }
        self.collider_records.insert(
            id,
            ColliderRecord {
                handle,
                body,
                shape: def.shape,
                offset: def.offset,
                rotation: def.rotation,
                material: def.material,
                sensor: def.sensor,
                filter: def.filter,
                enabled: true,
            },
        );
        if let Some(record) = self.body_records.get_mut(&body) {
            record.colliders.push(id);
        }
        tracing::debug!(collider = id.0, body = body.0, "attached collider");
        Some(id)
    }

    /// Removes a collider from its body and recomputes the body's mass from
    /// the colliders that remain. Structural: rejected while locked.
    pub fn remove_collider(&mut self, collider: ColliderId) -> bool {
        if self.locked {
            tracing::warn!(
                collider = collider.0,
                "remove_collider while the world is locked; ignoring"
            );
            return false;
        }
        let Some(record) = self.collider_records.remove(&collider) else {
            return false;
        };
        if let Some(body_record) = self.body_records.get_mut(&record.body) {
            body_record.colliders.retain(|c| *c != collider);
        }
        self.colliders
            .remove(record.handle, &mut self.islands, &mut self.bodies, true);
        if let Some(body_record) = self.body_records.get(&record.body)
            && let Some(native) = self.bodies.get_mut(body_record.handle)
        {
            native.recompute_mass_properties_from_colliders(&self.colliders);
        }
        self.handlers.drop_collider(collider);
        tracing::debug!(collider = collider.0, "removed collider");
        true
    }

    /// Colliders of a body, in attach order. Empty for a dangling id.
    pub fn colliders_of(&self, body: BodyId) -> &[ColliderId] {
        self.body_records
            .get(&body)
            .map_or(&[], |record| record.colliders.as_slice())
    }

    pub fn collider_count_of(&self, body: BodyId) -> usize {
        self.colliders_of(body).len()
    }

    pub fn collider_body(&self, collider: ColliderId) -> Option<BodyId> {
        self.collider_records.get(&collider).map(|record| record.body)
    }

    /// Engine-space copy of the collider's shape.
    pub fn collider_shape(&self, collider: ColliderId) -> Option<ColliderShape> {
        self.collider_records
            .get(&collider)
            .map(|record| record.shape.clone())
    }

    /// Local offset from the body origin, pixels.
    pub fn collider_offset(&self, collider: ColliderId) -> Vec2 {
        self.collider_records
            .get(&collider)
            .map_or(Vec2::ZERO, |record| record.offset)
    }

    /// Local rotation, degrees.
    pub fn collider_rotation(&self, collider: ColliderId) -> f32 {
        self.collider_records
            .get(&collider)
            .map_or(0.0, |record| record.rotation)
    }

    pub fn is_collider_sensor(&self, collider: ColliderId) -> bool {
        self.collider_records
            .get(&collider)
            .is_some_and(|record| record.sensor)
    }

    pub fn set_collider_sensor(&mut self, collider: ColliderId, sensor: bool) {
        let Some(record) = self.collider_records.get_mut(&collider) else {
            return;
        };
        if record.sensor == sensor {
            return;
        }
        record.sensor = sensor;
        let handle = record.handle;
        if let Some(native) = self.colliders.get_mut(handle) {
            native.set_sensor(sensor);
        }
    }

    pub fn collider_friction(&self, collider: ColliderId) -> f32 {
        self.collider_records
            .get(&collider)
            .map_or(0.0, |record| record.material.friction)
    }

    pub fn set_collider_friction(&mut self, collider: ColliderId, friction: f32) {
        let Some(record) = self.collider_records.get_mut(&collider) else {
            return;
        };
        if record.material.friction == friction {
            return;
        }
        record.material.friction = friction;
        let handle = record.handle;
        if let Some(native) = self.colliders.get_mut(handle) {
            native.set_friction(friction);
        }
    }

    pub fn collider_restitution(&self, collider: ColliderId) -> f32 {
        self.collider_records
            .get(&collider)
            .map_or(0.0, |record| record.material.restitution)
    }

    pub fn set_collider_restitution(&mut self, collider: ColliderId, restitution: f32) {
        let Some(record) = self.collider_records.get_mut(&collider) else {
            return;
        };
        if record.material.restitution == restitution {
            return;
        }
        record.material.restitution = restitution;
        let handle = record.handle;
        if let Some(native) = self.colliders.get_mut(handle) {
            native.set_restitution(restitution);
        }
    }

    pub fn collider_restitution_threshold(&self, collider: ColliderId) -> f32 {
        self.collider_records
            .get(&collider)
            .map_or(0.0, |record| record.material.restitution_threshold)
    }

    /// Engine-tracked only; the kernel keeps its global bounce threshold.
    pub fn set_collider_restitution_threshold(&mut self, collider: ColliderId, threshold: f32) {
        if let Some(record) = self.collider_records.get_mut(&collider) {
            record.material.restitution_threshold = threshold;
        }
    }

    pub fn collider_density(&self, collider: ColliderId) -> f32 {
        self.collider_records
            .get(&collider)
            .map_or(0.0, |record| record.material.density)
    }

    /// Changes the collider's density and recomputes the owning body's mass.
    pub fn set_collider_density(&mut self, collider: ColliderId, density: f32) {
        let Some(record) = self.collider_records.get_mut(&collider) else {
            return;
        };
        if record.material.density == density {
            return;
        }
        record.material.density = density;
        let handle = record.handle;
        let body = record.body;
        if let Some(native) = self.colliders.get_mut(handle) {
            native.set_density(density);
        }
        if let Some(body_record) = self.body_records.get(&body)
            && let Some(native) = self.bodies.get_mut(body_record.handle)
        {
            native.recompute_mass_properties_from_colliders(&self.colliders);
        }
    }

    pub fn collider_filter(&self, collider: ColliderId) -> CollisionFilter {
        self.collider_records
            .get(&collider)
            .map_or_else(CollisionFilter::default, |record| record.filter)
    }

    pub fn set_collider_filter(&mut self, collider: ColliderId, filter: CollisionFilter) {
        let Some(record) = self.collider_records.get_mut(&collider) else {
            return;
        };
        if record.filter == filter {
            return;
        }
        record.filter = filter;
        let handle = record.handle;
        let groups = kernel_groups(&filter, record.enabled);
        if let Some(native) = self.colliders.get_mut(handle) {
            native.set_collision_groups(groups);
        }
    }

    pub fn is_collider_enabled(&self, collider: ColliderId) -> bool {
        self.collider_records
            .get(&collider)
            .is_some_and(|record| record.enabled)
    }

    /// Disabling zeroes the kernel-side filter mask so the collider generates
    /// no contacts of any kind; the record keeps the configured filter and
    /// re-enabling restores it exactly.
    pub fn set_collider_enabled(&mut self, collider: ColliderId, enabled: bool) {
        let Some(record) = self.collider_records.get_mut(&collider) else {
            return;
        };
        if record.enabled == enabled {
            return;
        }
        record.enabled = enabled;
        let handle = record.handle;
        let body = record.body;
        let groups = kernel_groups(&record.filter, enabled);
        if let Some(native) = self.colliders.get_mut(handle) {
            native.set_collision_groups(groups);
        }
        // Contacts supported by this collider just appeared or vanished, so a
        // sleeping parent has to be told.
        if let Some(native) = self.native_body_mut(body) {
            native.wake_up(true);
        }
    }

    /// Current world-space bounding box of the collider, in pixels.
    pub fn collider_aabb(&self, collider: ColliderId) -> Aabb {
        self.collider_records
            .get(&collider)
            .and_then(|record| self.colliders.get(record.handle))
            .map_or(Aabb::new(Vec2::ZERO, Vec2::ZERO), |native| {
                let aabb = native.compute_aabb();
                Aabb::new(convert::engine_point(aabb.mins), convert::engine_point(aabb.maxs))
            })
    }
}
