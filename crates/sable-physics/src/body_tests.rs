use std::time::Duration;

use glam::Vec2;

use super::*;
use crate::collider::ColliderDef;
use crate::world::PhysicsWorld;

fn step(world: &mut PhysicsWorld) {
    world.update(Duration::from_secs_f32(1.0 / 60.0), 8, 3);
}

fn weightless_box() -> (PhysicsWorld, BodyId) {
    let mut world = PhysicsWorld::new();
    world.set_gravity(Vec2::ZERO);
    let body = world.create_body(BodyType::Dynamic).unwrap();
    // 20x20 px at density 1 is 4 kernel mass units.
    world.attach_collider(body, ColliderDef::rect(20.0, 20.0));
    (world, body)
}

#[test]
fn test_position_roundtrips_through_kernel_units() {
    let (mut world, body) = weightless_box();
    world.set_body_position(body, Vec2::new(32.0, -14.5));
    let position = world.body_position(body);
    assert!((position.x - 32.0).abs() < 1e-4);
    assert!((position.y - -14.5).abs() < 1e-4);
}

#[test]
fn test_rotation_wraps_like_the_kernel() {
    let (mut world, body) = weightless_box();
    world.set_body_rotation(body, 45.0);
    assert!((world.body_rotation(body) - 45.0).abs() < 1e-3);
    world.set_body_rotation(body, 400.0);
    assert!((world.body_rotation(body) - 40.0).abs() < 1e-3);
}

#[test]
fn test_set_transform_notifies_each_changed_part() {
    let (mut world, body) = weightless_box();
    world.set_body_transform(body, Vec2::new(5.0, 6.0), 90.0);
    let changes = world.drain_property_changes();
    let names: Vec<&str> = changes.iter().map(|change| change.name).collect();
    assert_eq!(names, vec!["position", "rotation"]);

    world.set_body_transform(body, Vec2::new(5.0, 6.0), 90.0);
    assert!(world.drain_property_changes().is_empty());

    world.set_body_transform(body, Vec2::new(5.0, 6.0), 45.0);
    let changes = world.drain_property_changes();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].name, "rotation");
}

#[test]
fn test_angular_velocity_is_degrees_per_second() {
    let (mut world, body) = weightless_box();
    world.set_body_angular_velocity(body, 90.0);
    assert!((world.body_angular_velocity(body) - 90.0).abs() < 1e-3);
    for _ in 0..60 {
        step(&mut world);
    }
    assert!(
        (world.body_rotation(body) - 90.0).abs() < 1.0,
        "one second at 90 deg/s, got {}",
        world.body_rotation(body)
    );
}

#[test]
fn test_world_and_local_points_roundtrip_on_a_rotated_body() {
    let (mut world, body) = weightless_box();
    world.set_body_transform(body, Vec2::new(100.0, 50.0), 90.0);
    let world_point = world.body_world_point(body, Vec2::new(10.0, 0.0));
    assert!((world_point - Vec2::new(100.0, 60.0)).length() < 1e-3);
    let local = world.body_local_point(body, world_point);
    assert!((local - Vec2::new(10.0, 0.0)).length() < 1e-3);
}

#[test]
fn test_world_and_local_rotation_offsets() {
    let (mut world, body) = weightless_box();
    world.set_body_rotation(body, 30.0);
    assert!((world.body_world_rotation(body, 10.0) - 40.0).abs() < 1e-3);
    assert!((world.body_local_rotation(body, 40.0) - 10.0).abs() < 1e-3);
}

#[test]
fn test_velocity_at_world_point_adds_the_angular_part() {
    let (mut world, body) = weightless_box();
    world.set_body_linear_velocity(body, Vec2::new(10.0, 0.0));
    world.set_body_angular_velocity(body, 90.0);
    // At (0, 10) the angular term is omega cross r = pi/2 rad/s * 10 px,
    // pointing along -x for a point above (y-down) the centre.
    let velocity = world.body_velocity_at_world_point(body, Vec2::new(0.0, 10.0));
    let expected_x = 10.0 - 10.0 * std::f32::consts::FRAC_PI_2;
    assert!((velocity.x - expected_x).abs() < 1e-2, "got {velocity:?}");
    assert!(velocity.y.abs() < 1e-2);
}

#[test]
fn test_forces_only_move_dynamic_bodies() {
    let mut world = PhysicsWorld::new();
    world.set_gravity(Vec2::ZERO);
    let fixed = world.create_body(BodyType::Static).unwrap();
    world.attach_collider(fixed, ColliderDef::rect(20.0, 20.0));
    let kinematic = world.create_body(BodyType::Kinematic).unwrap();
    world.attach_collider(kinematic, ColliderDef::rect(20.0, 20.0));
    let dynamic = world.create_body(BodyType::Dynamic).unwrap();
    world.attach_collider(dynamic, ColliderDef::rect(20.0, 20.0));

    for body in [fixed, kinematic, dynamic] {
        world.apply_force(body, Vec2::new(400.0, 0.0));
    }
    step(&mut world);

    assert_eq!(world.body_linear_velocity(fixed), Vec2::ZERO);
    assert_eq!(world.body_linear_velocity(kinematic), Vec2::ZERO);
    assert!(world.body_linear_velocity(dynamic).x > 0.0);
}

#[test]
fn test_linear_impulse_changes_velocity_by_impulse_over_mass() {
    let (mut world, body) = weightless_box();
    assert!((world.body_mass(body) - 4.0).abs() < 1e-4);
    world.apply_linear_impulse(body, Vec2::new(40.0, 0.0));
    let velocity = world.body_linear_velocity(body);
    assert!((velocity.x - 10.0).abs() < 0.1, "expected 10 px/s, got {}", velocity.x);
}

#[test]
fn test_angular_impulse_uses_kernel_units() {
    let (mut world, body) = weightless_box();
    // A 2x2 kernel-unit box of mass 4 has inertia 4 * (4 + 4) / 12.
    let inertia = 4.0 * 8.0 / 12.0;
    world.apply_angular_impulse(body, inertia);
    let omega = world.body_angular_velocity(body);
    assert!((omega - 1f32.to_degrees()).abs() < 1.0, "expected one rad/s, got {omega}");
}

#[test]
fn test_set_body_type_switches_simulation() {
    let mut world = PhysicsWorld::new();
    let body = world.create_body(BodyType::Static).unwrap();
    world.attach_collider(body, ColliderDef::rect(10.0, 10.0));
    for _ in 0..30 {
        step(&mut world);
    }
    assert_eq!(world.body_position(body), Vec2::ZERO);

    world.set_body_type(body, BodyType::Dynamic);
    assert_eq!(world.body_type(body), BodyType::Dynamic);
    let changes = world.drain_property_changes();
    assert!(changes.iter().any(|change| change.name == "body_type"));
    for _ in 0..30 {
        step(&mut world);
    }
    assert!(world.body_position(body).y > 0.0, "dynamic body must start falling");
}

#[test]
fn test_disabled_body_is_out_of_the_simulation() {
    let mut world = PhysicsWorld::new();
    let body = world.create_body(BodyType::Dynamic).unwrap();
    world.attach_collider(body, ColliderDef::rect(10.0, 10.0));
    world.set_body_enabled(body, false);
    assert!(!world.is_body_enabled(body));
    for _ in 0..30 {
        step(&mut world);
    }
    assert_eq!(world.body_position(body), Vec2::ZERO);

    world.set_body_enabled(body, true);
    for _ in 0..30 {
        step(&mut world);
    }
    assert!(world.body_position(body).y > 0.0);
}

#[test]
fn test_fixed_rotation_holds_the_angle() {
    let (mut world, body) = weightless_box();
    world.set_body_fixed_rotation(body, true);
    assert!(world.is_body_fixed_rotation(body));
    world.set_body_angular_velocity(body, 90.0);
    world.apply_torque(body, 50.0);
    for _ in 0..30 {
        step(&mut world);
    }
    assert!(world.body_rotation(body).abs() < 1e-3);
}

#[test]
fn test_sleep_and_wake_are_immediate() {
    let (mut world, body) = weightless_box();
    assert!(world.is_body_awake(body));
    world.body_sleep(body);
    assert!(!world.is_body_awake(body));
    world.body_wake(body);
    assert!(world.is_body_awake(body));
}

#[test]
fn test_sleep_allowed_off_keeps_this_body_awake() {
    let mut world = PhysicsWorld::new();
    let floor = world.create_body(BodyType::Static).unwrap();
    world.set_body_position(floor, Vec2::new(0.0, 500.0));
    world.attach_collider(floor, ColliderDef::rect(800.0, 20.0));
    let restless = world.create_body(BodyType::Dynamic).unwrap();
    world.set_body_position(restless, Vec2::new(0.0, 480.0));
    world.attach_collider(restless, ColliderDef::rect(20.0, 20.0));
    world.set_body_sleep_allowed(restless, false);
    assert!(!world.is_body_sleep_allowed(restless));

    for _ in 0..300 {
        step(&mut world);
    }
    assert!(world.is_body_awake(restless), "sleep-forbidden body fell asleep");
}

#[test]
fn test_game_object_association_is_silent() {
    let (mut world, body) = weightless_box();
    world.drain_property_changes();
    assert_eq!(world.body_game_object(body), None);
    let object = GameObjectId::new(9);
    world.set_body_game_object(body, object);
    assert_eq!(world.body_game_object(body), Some(object));
    world.clear_body_game_object(body);
    assert_eq!(world.body_game_object(body), None);
    assert!(world.drain_property_changes().is_empty());
}

#[test]
fn test_user_bag_roundtrip() {
    let (mut world, body) = weightless_box();
    world.set_body_property(body, "team", PropertyValue::Str("red".to_owned()));
    assert_eq!(
        world.body_property(body, "team"),
        Some(&PropertyValue::Str("red".to_owned()))
    );
    assert_eq!(world.body_property(body, "missing"), None);
    assert_eq!(
        world.remove_body_property(body, "team"),
        Some(PropertyValue::Str("red".to_owned()))
    );
    assert_eq!(world.body_property(body, "team"), None);
}

#[test]
fn test_gravity_scale_scales_the_fall() {
    let mut world = PhysicsWorld::new();
    let floating = world.create_body(BodyType::Dynamic).unwrap();
    world.attach_collider(floating, ColliderDef::circle(5.0));
    world.set_body_gravity_scale(floating, 0.0);
    let heavy = world.create_body(BodyType::Dynamic).unwrap();
    world.set_body_position(heavy, Vec2::new(100.0, 0.0));
    world.attach_collider(heavy, ColliderDef::circle(5.0));
    world.set_body_gravity_scale(heavy, 2.0);
    let plain = world.create_body(BodyType::Dynamic).unwrap();
    world.set_body_position(plain, Vec2::new(200.0, 0.0));
    world.attach_collider(plain, ColliderDef::circle(5.0));

    for _ in 0..60 {
        step(&mut world);
    }
    assert!(world.body_position(floating).y.abs() < 1e-3);
    let heavy_fall = world.body_position(heavy).y;
    let plain_fall = world.body_position(plain).y;
    assert!(
        (heavy_fall - 2.0 * plain_fall).abs() < 0.05 * heavy_fall,
        "double gravity should fall twice as far: {heavy_fall} vs {plain_fall}"
    );
}

#[test]
fn test_dangling_ids_return_neutral_defaults() {
    let (mut world, body) = weightless_box();
    world.destroy_body(body);

    assert_eq!(world.body_position(body), Vec2::ZERO);
    assert_eq!(world.body_rotation(body), 0.0);
    assert_eq!(world.body_linear_velocity(body), Vec2::ZERO);
    assert_eq!(world.body_angular_velocity(body), 0.0);
    assert_eq!(world.body_mass(body), 0.0);
    assert_eq!(world.body_type(body), BodyType::Static);
    assert!(!world.is_body_awake(body));
    // Point transforms echo their input without a body to map through.
    assert_eq!(world.body_world_point(body, Vec2::new(3.0, 4.0)), Vec2::new(3.0, 4.0));
    assert_eq!(world.body_local_point(body, Vec2::new(3.0, 4.0)), Vec2::new(3.0, 4.0));
    // Setters are quiet no-ops.
    world.set_body_position(body, Vec2::ONE);
    world.apply_force(body, Vec2::ONE);
    world.body_wake(body);
    assert!(world.drain_property_changes().is_empty());
}
