//! Headless demo that drives a small Sable physics scene from the command line.
//!
//! Configuration is loaded from `config.ron` and can be overridden via CLI flags.
//! Run with `cargo run -p sable-demo` to simulate 300 frames.
//! Run with `cargo run -p sable-demo -- --frames 600 --timescale 0.5` to override.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use clap::Parser;
use glam::Vec2;
use sable_config::{CliArgs, Config};
use sable_physics::{
    Aabb, BodyId, BodyType, ColliderDef, ContactPhase, DebugLineBuffer, DistanceJointDef,
    GameObjectId, JointId, PhysicsWorld, RayCastControl, draw_world,
};
use tracing::info;

const STEP_DT: Duration = Duration::from_nanos(16_666_667);
const VELOCITY_ITERATIONS: u32 = 8;
const POSITION_ITERATIONS: u32 = 3;

/// Ids of everything the demo scene creates, for the frame loop to report on.
struct Scene {
    crates: Vec<BodyId>,
    ball: BodyId,
    bob: BodyId,
    tether: JointId,
    sensor_crossings: Rc<Cell<u32>>,
}

fn main() {
    let args = CliArgs::parse();

    // Resolve config directory
    let config_dir = args.config.clone().unwrap_or_else(|| {
        dirs::config_dir()
            .expect("Failed to resolve config directory")
            .join("sable-engine")
    });

    // Load or create config, then apply CLI overrides
    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    // Initialize logging with config and debug settings
    let log_dir = config_dir.join("logs");
    sable_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    info!(frames = args.frames, "Sable physics demo starting");

    let mut world = PhysicsWorld::with_config(&config.physics);
    world.set_debug_draw_enabled(config.debug.debug_draw);

    let scene = build_scene(&mut world);
    info!(
        bodies = world.body_count(),
        colliders = world.collider_count(),
        joints = world.joint_count(),
        "Scene built"
    );

    run_frames(&mut world, &scene, args.frames);

    demonstrate_ray_cast(&mut world);
    demonstrate_region_query(&mut world);
    if config.debug.debug_draw {
        demonstrate_debug_draw(&world);
    }

    info!(
        crossings = scene.sensor_crossings.get(),
        "Sable physics demo finished"
    );
}

/// An 800x600 y-down screen: a floor, a crate stack, a ball dropped onto it,
/// a sensor strip across the middle, and a pendulum on a distance joint.
fn build_scene(world: &mut PhysicsWorld) -> Scene {
    let floor = world.create_body(BodyType::Static).expect("world is unlocked");
    world.set_body_position(floor, Vec2::new(400.0, 580.0));
    world.attach_collider(floor, ColliderDef::rect(800.0, 40.0).with_friction(0.6));

    // Three 40x40 crates stacked at x = 200, resting on the floor's top edge.
    let mut crates = Vec::new();
    for (slot, y) in [540.0, 500.0, 460.0].into_iter().enumerate() {
        let body = world.create_body(BodyType::Dynamic).expect("world is unlocked");
        world.set_body_position(body, Vec2::new(200.0, y));
        world.attach_collider(body, ColliderDef::rect(40.0, 40.0).with_friction(0.4));
        world.set_body_game_object(body, GameObjectId::new(2 + slot as u64));
        crates.push(body);
    }

    // A slightly bouncy ball dropped from the top of the screen onto the stack.
    let ball = world.create_body(BodyType::Dynamic).expect("world is unlocked");
    world.set_body_position(ball, Vec2::new(200.0, 40.0));
    world.attach_collider(ball, ColliderDef::circle(15.0).with_restitution(0.4));
    world.set_body_game_object(ball, GameObjectId::new(1));

    // Sensor strip across the middle of the screen; the ball falls through it.
    let strip = world.create_body(BodyType::Static).expect("world is unlocked");
    world.set_body_position(strip, Vec2::new(400.0, 300.0));
    let strip_collider = world
        .attach_collider(strip, ColliderDef::rect(800.0, 10.0).with_sensor(true))
        .expect("strip body is live");

    // Pendulum: a bob tethered to a static anchor, released horizontally.
    let anchor = world.create_body(BodyType::Static).expect("world is unlocked");
    world.set_body_position(anchor, Vec2::new(600.0, 100.0));
    let bob = world.create_body(BodyType::Dynamic).expect("world is unlocked");
    world.set_body_position(bob, Vec2::new(700.0, 100.0));
    world.attach_collider(bob, ColliderDef::circle(10.0));
    let tether = world
        .create_joint(&DistanceJointDef::join(
            world,
            anchor,
            bob,
            Vec2::new(600.0, 100.0),
            Vec2::new(700.0, 100.0),
        ))
        .expect("anchor and bob are live");

    let sensor_crossings = Rc::new(Cell::new(0u32));
    let crossings = Rc::clone(&sensor_crossings);
    world.set_collider_contact_handler(strip_collider, move |_, phase, _, other| {
        if phase == ContactPhase::Begin {
            crossings.set(crossings.get() + 1);
            info!(collider = other.raw(), "Something entered the sensor strip");
        }
    });

    world.set_body_contact_handler(ball, move |world, phase, _, other| match phase {
        ContactPhase::Begin => {
            info!(other = other.raw(), speed = world.body_linear_velocity(other).length(), "Ball touched a body");
        }
        ContactPhase::End => info!(other = other.raw(), "Ball separated from a body"),
        _ => {}
    });

    world.set_object_contact_handler(GameObjectId::new(1), move |_, phase, _, other| {
        if phase == ContactPhase::Begin {
            info!(object = other.raw(), "Ball's game object hit another object");
        }
    });

    Scene {
        crates,
        ball,
        bob,
        tether,
        sensor_crossings,
    }
}

fn run_frames(world: &mut PhysicsWorld, scene: &Scene, frames: u32) {
    for frame in 0..frames {
        world.update(STEP_DT, VELOCITY_ITERATIONS, POSITION_ITERATIONS);

        if (frame + 1) % 60 == 0 {
            let ball = world.body_position(scene.ball);
            let bob = world.body_position(scene.bob);
            info!(
                frame = frame + 1,
                ball_x = ball.x,
                ball_y = ball.y,
                bob_x = bob.x,
                bob_y = bob.y,
                tether_px = world.joint_current_length(scene.tether),
                ball_awake = world.is_body_awake(scene.ball),
                "Frame snapshot"
            );
        }
    }

    let top = scene.crates.last().copied().expect("scene has crates");
    info!(
        top_crate_y = world.body_position(top).y,
        ball_y = world.body_position(scene.ball).y,
        "Run complete"
    );
}

/// Cast straight down the crate stack's column and report the first surface.
fn demonstrate_ray_cast(world: &mut PhysicsWorld) {
    let mut first_hit = None;
    world.ray_cast(Vec2::new(200.0, 0.0), Vec2::new(200.0, 600.0), |_, hit| {
        first_hit = Some(*hit);
        RayCastControl::Terminate
    });
    match first_hit {
        Some(hit) => info!(
            x = hit.point.x,
            y = hit.point.y,
            fraction = hit.fraction,
            body = hit.body.raw(),
            "Downward ray hit"
        ),
        None => info!("Downward ray hit nothing"),
    }
}

/// Count colliders overlapping the floor band at the bottom of the screen.
fn demonstrate_region_query(world: &mut PhysicsWorld) {
    let band = Aabb::new(Vec2::new(0.0, 500.0), Vec2::new(800.0, 600.0));
    let mut found = 0u32;
    world.query_aabb(&band, |_, _| {
        found += 1;
        true
    });
    info!(found, "Colliders overlapping the floor band");
}

fn demonstrate_debug_draw(world: &PhysicsWorld) {
    let mut buffer = DebugLineBuffer::new();
    draw_world(world, &mut buffer);
    info!(lines = buffer.len(), "Debug overlay built");
}
