use glam::Vec2;

/// 1 simulation metre = 10 engine pixels.
///
/// Chosen so that the engine's conventional gravity of (0, 98) px/s²
/// is 9.8 m/s² on the simulation side. Keeping typical game shapes in
/// the 0.1..10 metre range is what the solver is tuned for.
pub const PIXELS_PER_METRE: f32 = 10.0;

/// Convert a length in engine pixels to simulation metres.
pub fn to_sim(pixels: f32) -> f32 {
    pixels / PIXELS_PER_METRE
}

/// Convert a length in simulation metres to engine pixels.
pub fn to_engine(metres: f32) -> f32 {
    metres * PIXELS_PER_METRE
}

/// Convert a vector in engine pixels to simulation metres.
///
/// Both spaces are y-down; no axis is flipped.
pub fn to_sim_vec(pixels: Vec2) -> Vec2 {
    pixels / PIXELS_PER_METRE
}

/// Convert a vector in simulation metres to engine pixels.
pub fn to_engine_vec(metres: Vec2) -> Vec2 {
    metres * PIXELS_PER_METRE
}

/// Convert an angle in engine degrees to simulation radians.
pub fn to_sim_angle(degrees: f32) -> f32 {
    degrees.to_radians()
}

/// Convert an angle in simulation radians to engine degrees.
pub fn to_engine_angle(radians: f32) -> f32 {
    radians.to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ten_pixels_is_one_metre() {
        assert_eq!(PIXELS_PER_METRE, 10.0);
        assert_eq!(to_sim(10.0), 1.0);
        assert_eq!(to_engine(1.0), 10.0);
    }

    #[test]
    fn test_conventional_gravity_maps_to_earth_gravity() {
        assert!((to_sim(98.0) - 9.8).abs() < 1e-6);
    }

    #[test]
    fn test_roundtrip_scalar() {
        let px = 427.53_f32;
        let back = to_engine(to_sim(px));
        assert!((back - px).abs() < px * f32::EPSILON * 4.0);
    }

    #[test]
    fn test_roundtrip_scalar_sweep() {
        // A spread of magnitudes a 2D game actually uses.
        for px in [0.0, 0.05, 1.0, 16.0, 640.0, 10_000.0, -333.25] {
            let back = to_engine(to_sim(px));
            let tol = px.abs().max(1.0) * f32::EPSILON * 4.0;
            assert!(
                (back - px).abs() <= tol,
                "roundtrip of {px} drifted to {back}"
            );
        }
    }

    #[test]
    fn test_roundtrip_vector() {
        let px = Vec2::new(-320.0, 512.5);
        let back = to_engine_vec(to_sim_vec(px));
        assert!((back - px).length() < 1e-3);
    }

    #[test]
    fn test_vector_conversion_preserves_direction() {
        // y-down on both sides: a downward vector stays downward.
        let down = Vec2::new(0.0, 98.0);
        let sim = to_sim_vec(down);
        assert!(sim.y > 0.0);
        assert_eq!(sim.x, 0.0);
    }

    #[test]
    fn test_angle_roundtrip() {
        for deg in [0.0, 45.0, 90.0, -30.0, 359.0, 720.0] {
            let back = to_engine_angle(to_sim_angle(deg));
            assert!(
                (back - deg).abs() < 1e-3,
                "angle roundtrip of {deg} drifted to {back}"
            );
        }
    }

    #[test]
    fn test_right_angle_is_half_pi() {
        assert!((to_sim_angle(90.0) - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }
}
