use glam::Vec2;

use super::*;
use crate::collider::ColliderDef;
use crate::joint::DistanceJointDef;

fn world_with_circle() -> PhysicsWorld {
    let mut world = PhysicsWorld::new();
    let body = world.create_body(BodyType::Static).unwrap();
    world.attach_collider(body, ColliderDef::circle(5.0));
    world
}

fn shapes_only() -> DebugDrawFilter {
    DebugDrawFilter { shapes: true, joints: false, aabbs: false, centre_of_mass: false }
}

#[test]
fn test_disabled_drawer_only_clears_the_buffer() {
    let world = world_with_circle();
    let mut buffer = DebugLineBuffer::new();
    buffer.push(DebugLine { start: Vec2::ZERO, end: Vec2::ONE, colour: COLOUR_AWAKE });
    draw_world(&world, &mut buffer);
    assert!(buffer.is_empty());
}

#[test]
fn test_circle_draws_sixteen_segments_and_a_spoke() {
    let mut world = world_with_circle();
    world.set_debug_draw_enabled(true);
    world.set_debug_draw_filter(shapes_only());
    let mut buffer = DebugLineBuffer::new();
    draw_world(&world, &mut buffer);
    assert_eq!(buffer.len(), CIRCLE_SEGMENTS + 1);
}

#[test]
fn test_buffer_clears_between_draws() {
    let mut world = world_with_circle();
    world.set_debug_draw_enabled(true);
    world.set_debug_draw_filter(shapes_only());
    let mut buffer = DebugLineBuffer::new();
    draw_world(&world, &mut buffer);
    let first = buffer.len();
    draw_world(&world, &mut buffer);
    assert_eq!(buffer.len(), first);
}

#[test]
fn test_aabb_overlay_is_four_lines_per_collider() {
    let mut world = PhysicsWorld::new();
    let body = world.create_body(BodyType::Static).unwrap();
    world.attach_collider(body, ColliderDef::rect(20.0, 10.0));
    world.set_debug_draw_enabled(true);
    world.set_debug_draw_filter(DebugDrawFilter {
        shapes: false,
        joints: false,
        aabbs: true,
        centre_of_mass: false,
    });
    let mut buffer = DebugLineBuffer::new();
    draw_world(&world, &mut buffer);
    assert_eq!(buffer.len(), 4);
    assert!(buffer.lines().iter().all(|line| line.colour == COLOUR_AABB));
}

#[test]
fn test_joint_draws_anchor_line_and_crosses() {
    let mut world = PhysicsWorld::new();
    let a = world.create_body(BodyType::Static).unwrap();
    let b = world.create_body(BodyType::Dynamic).unwrap();
    world.set_body_position(b, Vec2::new(0.0, 60.0));
    world.attach_collider(b, ColliderDef::circle(5.0));
    world.create_joint(&DistanceJointDef::join(&world, a, b, Vec2::ZERO, Vec2::new(0.0, 60.0)));
    world.set_debug_draw_enabled(true);
    world.set_debug_draw_filter(DebugDrawFilter {
        shapes: false,
        joints: true,
        aabbs: false,
        centre_of_mass: false,
    });
    let mut buffer = DebugLineBuffer::new();
    draw_world(&world, &mut buffer);
    // One anchor-to-anchor line plus a two-line cross per anchor.
    assert_eq!(buffer.len(), 5);
    assert!(buffer.lines().iter().all(|line| line.colour == COLOUR_JOINT));
}

#[test]
fn test_palette_tracks_body_state() {
    let mut world = PhysicsWorld::new();
    let fixed = world.create_body(BodyType::Static).unwrap();
    world.attach_collider(fixed, ColliderDef::circle(5.0));
    let probe = world.create_body(BodyType::Static).unwrap();
    world.set_body_position(probe, Vec2::new(50.0, 0.0));
    let sensor = world.attach_collider(probe, ColliderDef::circle(5.0).with_sensor(true));
    world.set_debug_draw_enabled(true);
    world.set_debug_draw_filter(shapes_only());

    let mut buffer = DebugLineBuffer::new();
    draw_world(&world, &mut buffer);
    let static_lines = buffer
        .lines()
        .iter()
        .filter(|line| line.colour == COLOUR_STATIC)
        .count();
    let sensor_lines = buffer
        .lines()
        .iter()
        .filter(|line| line.colour == COLOUR_SENSOR)
        .count();
    assert_eq!(static_lines, CIRCLE_SEGMENTS + 1);
    assert_eq!(sensor_lines, CIRCLE_SEGMENTS + 1);

    // Disabling a collider overrides the sensor colour.
    world.set_collider_enabled(sensor.unwrap(), false);
    draw_world(&world, &mut buffer);
    assert!(buffer.lines().iter().any(|line| line.colour == COLOUR_DISABLED));
    assert!(buffer.lines().iter().all(|line| line.colour != COLOUR_SENSOR));
}

#[test]
fn test_com_cross_only_for_dynamic_bodies() {
    let mut world = PhysicsWorld::new();
    let floor = world.create_body(BodyType::Static).unwrap();
    world.attach_collider(floor, ColliderDef::rect(100.0, 10.0));
    let crate_body = world.create_body(BodyType::Dynamic).unwrap();
    world.attach_collider(crate_body, ColliderDef::rect(10.0, 10.0));
    world.set_debug_draw_enabled(true);
    world.set_debug_draw_filter(DebugDrawFilter {
        shapes: false,
        joints: false,
        aabbs: false,
        centre_of_mass: true,
    });
    let mut buffer = DebugLineBuffer::new();
    draw_world(&world, &mut buffer);
    assert_eq!(buffer.len(), 2);
    assert!(buffer.lines().iter().all(|line| line.colour == COLOUR_COM));
}

#[test]
fn test_edge_ghosts_draw_fainter() {
    let mut world = PhysicsWorld::new();
    let body = world.create_body(BodyType::Static).unwrap();
    world.attach_collider(
        body,
        ColliderDef::edge(Vec2::new(-10.0, 0.0), Vec2::new(10.0, 0.0))
            .with_ghosts(Vec2::new(-20.0, 5.0), Vec2::new(20.0, 5.0)),
    );
    world.set_debug_draw_enabled(true);
    world.set_debug_draw_filter(shapes_only());
    let mut buffer = DebugLineBuffer::new();
    draw_world(&world, &mut buffer);
    assert_eq!(buffer.len(), 3);
    let faint = buffer
        .lines()
        .iter()
        .filter(|line| line.colour[3] < 0.99)
        .count();
    assert_eq!(faint, 2);
}
