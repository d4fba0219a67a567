//! Render-target-agnostic debug drawing.
//!
//! [`draw_world`] walks a world and fills a [`DebugLineBuffer`] with
//! coloured pixel-space segments; whatever renderer the engine runs on
//! consumes the buffer. The world is only read, so drawing a locked world
//! (from inside a contact handler, say) is fine.

use glam::Vec2;

use sable_config::DebugConfig;

use crate::collider::ColliderShape;
use crate::body::BodyType;
use crate::world::{ColliderId, JointId, PhysicsWorld};

pub type Colour = [f32; 4];

/// One line segment in world pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DebugLine {
    pub start: Vec2,
    pub end: Vec2,
    pub colour: Colour,
}

/// Reusable sink for debug lines. Cleared at the start of every draw.
#[derive(Default)]
pub struct DebugLineBuffer {
    lines: Vec<DebugLine>,
}

impl DebugLineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn push(&mut self, line: DebugLine) {
        self.lines.push(line);
    }

    pub fn lines(&self) -> &[DebugLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Which families of overlay geometry get drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DebugDrawFilter {
    pub shapes: bool,
    pub joints: bool,
    pub aabbs: bool,
    pub centre_of_mass: bool,
}

impl Default for DebugDrawFilter {
    fn default() -> Self {
        Self {
            shapes: true,
            joints: true,
            aabbs: false,
            centre_of_mass: false,
        }
    }
}

impl DebugDrawFilter {
    pub fn from_config(config: &DebugConfig) -> Self {
        Self {
            shapes: config.draw_shapes,
            joints: config.draw_joints,
            aabbs: config.draw_aabbs,
            centre_of_mass: config.draw_centre_of_mass,
        }
    }
}

const COLOUR_STATIC: Colour = [0.5, 0.9, 0.5, 1.0];
const COLOUR_KINEMATIC: Colour = [0.5, 0.5, 0.9, 1.0];
const COLOUR_SLEEPING: Colour = [0.6, 0.6, 0.6, 1.0];
const COLOUR_AWAKE: Colour = [0.9, 0.7, 0.7, 1.0];
const COLOUR_DISABLED: Colour = [0.5, 0.5, 0.3, 1.0];
const COLOUR_SENSOR: Colour = [0.9, 0.9, 0.3, 1.0];
const COLOUR_JOINT: Colour = [0.5, 0.8, 0.8, 1.0];
const COLOUR_AABB: Colour = [0.9, 0.3, 0.9, 1.0];
const COLOUR_COM: Colour = [0.9, 0.3, 0.3, 1.0];

const CIRCLE_SEGMENTS: usize = 16;
const CROSS_HALF_PX: f32 = 3.0;

/// Fills `buffer` with the world's debug overlay. A no-op (beyond clearing
/// the buffer) while the world's debug drawing is disabled.
pub fn draw_world(world: &PhysicsWorld, buffer: &mut DebugLineBuffer) {
    buffer.clear();
    if !world.debug_draw_enabled() {
        return;
    }
    let filter = world.debug_draw_filter();

    if filter.shapes || filter.aabbs {
        let mut collider_ids: Vec<ColliderId> = world.collider_ids().collect();
        collider_ids.sort_unstable();
        for &id in &collider_ids {
            if filter.shapes {
                draw_collider_shape(world, id, buffer);
            }
            if filter.aabbs {
                let aabb = world.collider_aabb(id);
                push_rect(buffer, aabb.min, aabb.max, COLOUR_AABB);
            }
        }
    }

    if filter.joints {
        let mut joint_ids: Vec<JointId> = world.joint_ids().collect();
        joint_ids.sort_unstable();
        for &id in &joint_ids {
            draw_joint(world, id, buffer);
        }
    }

    if filter.centre_of_mass {
        let mut body_ids: Vec<_> = world.body_ids().collect();
        body_ids.sort_unstable();
        for &body in &body_ids {
            if world.body_type(body) == BodyType::Dynamic {
                push_cross(buffer, world.body_centre_of_mass(body), COLOUR_COM);
            }
        }
    }
}

fn collider_colour(world: &PhysicsWorld, id: ColliderId) -> Colour {
    if !world.is_collider_enabled(id) {
        return COLOUR_DISABLED;
    }
    if world.is_collider_sensor(id) {
        return COLOUR_SENSOR;
    }
    let Some(body) = world.collider_body(id) else {
        return COLOUR_DISABLED;
    };
    match world.body_type(body) {
        BodyType::Static => COLOUR_STATIC,
        BodyType::Kinematic => COLOUR_KINEMATIC,
        BodyType::Dynamic if world.is_body_awake(body) => COLOUR_AWAKE,
        BodyType::Dynamic => COLOUR_SLEEPING,
    }
}

fn draw_collider_shape(world: &PhysicsWorld, id: ColliderId, buffer: &mut DebugLineBuffer) {
    let (Some(shape), Some(body)) = (world.collider_shape(id), world.collider_body(id)) else {
        return;
    };
    let colour = collider_colour(world, id);
    let offset = world.collider_offset(id);
    let local_angle = world.collider_rotation(id).to_radians();
    let rotor = Vec2::from_angle(local_angle);
    // Collider-local point -> body-local -> world px.
    let to_world = |point: Vec2| world.body_world_point(body, offset + rotor.rotate(point));

    match shape {
        ColliderShape::Circle { radius } => {
            let centre = to_world(Vec2::ZERO);
            let world_angle =
                (world.body_rotation(body) + world.collider_rotation(id)).to_radians();
            push_circle(buffer, centre, radius, world_angle, colour);
        }
        ColliderShape::Box { width, height } => {
            let (hw, hh) = (width * 0.5, height * 0.5);
            let corners = [
                Vec2::new(-hw, -hh),
                Vec2::new(hw, -hh),
                Vec2::new(hw, hh),
                Vec2::new(-hw, hh),
            ];
            push_loop(buffer, corners.map(to_world), colour);
        }
        ColliderShape::Polygon { points } => {
            let world_points: Vec<Vec2> = points.iter().map(|&p| to_world(p)).collect();
            for i in 0..world_points.len() {
                let j = (i + 1) % world_points.len();
                buffer.push(DebugLine {
                    start: world_points[i],
                    end: world_points[j],
                    colour,
                });
            }
        }
        ColliderShape::Edge { a, b, ghost_before, ghost_after } => {
            let (wa, wb) = (to_world(a), to_world(b));
            buffer.push(DebugLine { start: wa, end: wb, colour });
            let ghost_colour = [colour[0], colour[1], colour[2], colour[3] * 0.35];
            if let Some(ghost) = ghost_before {
                buffer.push(DebugLine { start: to_world(ghost), end: wa, colour: ghost_colour });
            }
            if let Some(ghost) = ghost_after {
                buffer.push(DebugLine { start: wb, end: to_world(ghost), colour: ghost_colour });
            }
        }
    }
}

fn draw_joint(world: &PhysicsWorld, id: JointId, buffer: &mut DebugLineBuffer) {
    let Some(record) = world.joint_records.get(&id) else {
        return;
    };
    let anchor_a = world.body_world_point(record.body_a, record.local_anchor_a);
    let anchor_b = world.body_world_point(record.body_b, record.local_anchor_b);
    buffer.push(DebugLine { start: anchor_a, end: anchor_b, colour: COLOUR_JOINT });
    push_cross(buffer, anchor_a, COLOUR_JOINT);
    push_cross(buffer, anchor_b, COLOUR_JOINT);
}

fn push_circle(
    buffer: &mut DebugLineBuffer,
    centre: Vec2,
    radius: f32,
    spoke_angle: f32,
    colour: Colour,
) {
    let mut previous = centre + radius * Vec2::from_angle(0.0);
    for i in 1..=CIRCLE_SEGMENTS {
        let theta = i as f32 / CIRCLE_SEGMENTS as f32 * std::f32::consts::TAU;
        let next = centre + radius * Vec2::from_angle(theta);
        buffer.push(DebugLine { start: previous, end: next, colour });
        previous = next;
    }
    buffer.push(DebugLine {
        start: centre,
        end: centre + radius * Vec2::from_angle(spoke_angle),
        colour,
    });
}

fn push_loop(buffer: &mut DebugLineBuffer, points: [Vec2; 4], colour: Colour) {
    for i in 0..points.len() {
        let j = (i + 1) % points.len();
        buffer.push(DebugLine { start: points[i], end: points[j], colour });
    }
}

fn push_rect(buffer: &mut DebugLineBuffer, min: Vec2, max: Vec2, colour: Colour) {
    push_loop(
        buffer,
        [
            Vec2::new(min.x, min.y),
            Vec2::new(max.x, min.y),
            Vec2::new(max.x, max.y),
            Vec2::new(min.x, max.y),
        ],
        colour,
    );
}

fn push_cross(buffer: &mut DebugLineBuffer, centre: Vec2, colour: Colour) {
    buffer.push(DebugLine {
        start: centre - Vec2::new(CROSS_HALF_PX, 0.0),
        end: centre + Vec2::new(CROSS_HALF_PX, 0.0),
        colour,
    });
    buffer.push(DebugLine {
        start: centre - Vec2::new(0.0, CROSS_HALF_PX),
        end: centre + Vec2::new(0.0, CROSS_HALF_PX),
        colour,
    });
}

#[cfg(test)]
#[path = "debug_draw_tests.rs"]
mod tests;
