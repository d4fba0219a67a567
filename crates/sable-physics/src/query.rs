//! Scene queries: ray casts and area overlap tests.
//!
//! Both queries collect their results first and dispatch afterwards, so a
//! callback is free to mutate the world, including destroying the very
//! colliders later in the result list. Anything destroyed mid-dispatch is
//! skipped when its turn comes.

use glam::Vec2;
use rapier2d::geometry::{Collider, ColliderHandle};
use rapier2d::parry::bounding_volume::Aabb as KernelAabb;
use rapier2d::parry::query::Ray;
use rapier2d::pipeline::QueryFilter;
use rustc_hash::FxHashSet;

use sable_math::Aabb;

use crate::convert;
use crate::world::{BodyId, ColliderId, PhysicsWorld};

/// One ray intersection, reported in engine units.
#[derive(Clone, Copy, Debug)]
pub struct RayHit {
    pub collider: ColliderId,
    pub body: BodyId,
    /// Hit point in world px.
    pub point: Vec2,
    /// Surface normal at the hit point, unit length.
    pub normal: Vec2,
    /// Position along the segment, 0 at the start and 1 at the end.
    pub fraction: f32,
}

/// What a ray-cast callback wants done with the rest of the cast.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RayCastControl {
    /// Stop reporting hits.
    Terminate,
    /// Keep going.
    Continue,
    /// Keep going, skipping any further hits against this hit's collider.
    IgnoreCollider,
    /// Keep going, but only report hits at or before this fraction. The clip
    /// only ever tightens; a value beyond the current clip is ignored.
    ClipTo(f32),
}

impl PhysicsWorld {
    /// Casts a segment from `start` to `end` (world px) and reports every
    /// enabled collider it crosses, nearest first.
    ///
    /// Hits are gathered against the state of the world at call time, sorted
    /// by fraction, then handed to `callback` one at a time. A zero-length
    /// segment reports nothing.
    pub fn ray_cast(
        &mut self,
        start: Vec2,
        end: Vec2,
        mut callback: impl FnMut(&mut PhysicsWorld, &RayHit) -> RayCastControl,
    ) {
        let segment = end - start;
        if segment.length_squared() == 0.0 {
            return;
        }
        self.query_pipeline.update(&self.colliders);

        // The direction carries the full segment length, so the kernel's
        // time of impact in [0, 1] is already the fraction.
        let ray = Ray::new(convert::sim_point(start), convert::sim_vec(segment));
        let mut hits: Vec<RayHit> = Vec::new();
        {
            let colliders = &self.colliders;
            let records = &self.collider_records;
            let predicate = |_handle: ColliderHandle, collider: &Collider| -> bool {
                records
                    .get(&ColliderId(collider.user_data as u64))
                    .is_some_and(|record| record.enabled)
            };
            let filter = QueryFilter::default().predicate(&predicate);
            self.query_pipeline.intersections_with_ray(
                &self.bodies,
                colliders,
                &ray,
                1.0,
                true,
                filter,
                |handle, intersection| {
                    if let Some(native) = colliders.get(handle) {
                        let id = ColliderId(native.user_data as u64);
                        if let Some(record) = records.get(&id) {
                            hits.push(RayHit {
                                collider: id,
                                body: record.body,
                                point: convert::engine_point(ray.point_at(intersection.time_of_impact)),
                                normal: convert::engine_dir(intersection.normal),
                                fraction: intersection.time_of_impact,
                            });
                        }
                    }
                    true
                },
            );
        }
        hits.sort_by(|a, b| a.fraction.total_cmp(&b.fraction));

        let mut clip = 1.0_f32;
        let mut ignored: FxHashSet<ColliderId> = FxHashSet::default();
        for hit in &hits {
            if hit.fraction > clip
                || ignored.contains(&hit.collider)
                || !self.collider_records.contains_key(&hit.collider)
            {
                continue;
            }
            match callback(self, hit) {
                RayCastControl::Terminate => break,
                RayCastControl::Continue => {}
                RayCastControl::IgnoreCollider => {
                    ignored.insert(hit.collider);
                }
                RayCastControl::ClipTo(fraction) => {
                    clip = fraction.clamp(0.0, clip);
                }
            }
        }
    }

    /// Reports every enabled collider whose bounds overlap `aabb` (world px),
    /// in id order. The callback returns `false` to stop early.
    pub fn query_aabb(
        &mut self,
        aabb: &Aabb,
        mut callback: impl FnMut(&mut PhysicsWorld, ColliderId) -> bool,
    ) {
        self.query_pipeline.update(&self.colliders);
        let kernel_aabb =
            KernelAabb::new(convert::sim_point(aabb.min), convert::sim_point(aabb.max));

        let mut found: Vec<ColliderId> = Vec::new();
        {
            let colliders = &self.colliders;
            let records = &self.collider_records;
            self.query_pipeline
                .colliders_with_aabb_intersecting_aabb(&kernel_aabb, |handle: &ColliderHandle| {
                    if let Some(native) = colliders.get(*handle) {
                        let id = ColliderId(native.user_data as u64);
                        if records.get(&id).is_some_and(|record| record.enabled) {
                            found.push(id);
                        }
                    }
                    true
                });
        }
        found.sort_unstable();

        for id in found {
            if !self.collider_records.contains_key(&id) {
                continue;
            }
            if !callback(self, id) {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyType;
    use crate::collider::ColliderDef;

    // Three 10x10 boxes on the x axis; a horizontal ray crosses all three.
    fn scene() -> (PhysicsWorld, [ColliderId; 3]) {
        let mut world = PhysicsWorld::new();
        let mut ids = [ColliderId(0); 3];
        for (i, x) in [30.0, 60.0, 90.0].into_iter().enumerate() {
            let body = world.create_body(BodyType::Static).unwrap();
            world.set_body_position(body, Vec2::new(x, 0.0));
            ids[i] = world
                .attach_collider(body, ColliderDef::rect(10.0, 10.0))
                .unwrap();
        }
        (world, ids)
    }

    fn cast_all(world: &mut PhysicsWorld) -> Vec<RayHit> {
        let mut hits = Vec::new();
        world.ray_cast(Vec2::ZERO, Vec2::new(120.0, 0.0), |_, hit| {
            hits.push(*hit);
            RayCastControl::Continue
        });
        hits
    }

    #[test]
    fn test_hits_come_back_nearest_first() {
        let (mut world, ids) = scene();
        let hits = cast_all(&mut world);
        assert_eq!(hits.len(), 3);
        assert_eq!([hits[0].collider, hits[1].collider, hits[2].collider], ids);
        assert!(hits[0].fraction < hits[1].fraction && hits[1].fraction < hits[2].fraction);
        assert!((hits[0].point.x - 25.0).abs() < 0.1, "entry face at x=25, got {}", hits[0].point.x);
        assert!((hits[0].normal.x - -1.0).abs() < 1e-3);
        assert!((hits[0].fraction - 25.0 / 120.0).abs() < 1e-3);
    }

    #[test]
    fn test_terminate_stops_the_cast() {
        let (mut world, ids) = scene();
        let mut seen = Vec::new();
        world.ray_cast(Vec2::ZERO, Vec2::new(120.0, 0.0), |_, hit| {
            seen.push(hit.collider);
            RayCastControl::Terminate
        });
        assert_eq!(seen, vec![ids[0]]);
    }

    #[test]
    fn test_ignore_collider_continues_past_it() {
        let (mut world, _) = scene();
        let mut count = 0;
        world.ray_cast(Vec2::ZERO, Vec2::new(120.0, 0.0), |_, _| {
            count += 1;
            RayCastControl::IgnoreCollider
        });
        assert_eq!(count, 3);
    }

    #[test]
    fn test_clip_to_first_fraction_drops_farther_hits() {
        let (mut world, ids) = scene();
        let mut seen = Vec::new();
        world.ray_cast(Vec2::ZERO, Vec2::new(120.0, 0.0), |_, hit| {
            seen.push(hit.collider);
            RayCastControl::ClipTo(hit.fraction)
        });
        assert_eq!(seen, vec![ids[0]]);
    }

    #[test]
    fn test_clip_never_loosens() {
        let (mut world, _) = scene();
        let mut count = 0;
        world.ray_cast(Vec2::ZERO, Vec2::new(120.0, 0.0), |_, _| {
            count += 1;
            // Asking for a wider clip than the current one changes nothing.
            RayCastControl::ClipTo(5.0)
        });
        assert_eq!(count, 3);
    }

    #[test]
    fn test_zero_length_ray_reports_nothing() {
        let (mut world, _) = scene();
        let mut count = 0;
        world.ray_cast(Vec2::new(30.0, 0.0), Vec2::new(30.0, 0.0), |_, _| {
            count += 1;
            RayCastControl::Continue
        });
        assert_eq!(count, 0);
    }

    #[test]
    fn test_disabled_collider_is_invisible_to_rays() {
        let (mut world, ids) = scene();
        world.set_collider_enabled(ids[1], false);
        let hits = cast_all(&mut world);
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|hit| hit.collider != ids[1]));
    }

    #[test]
    fn test_callback_may_destroy_a_later_hit() {
        let (mut world, ids) = scene();
        let middle_body = world.collider_body(ids[1]).unwrap();
        let mut seen = Vec::new();
        world.ray_cast(Vec2::ZERO, Vec2::new(120.0, 0.0), move |world, hit| {
            seen.push(hit.collider);
            if hit.collider == ids[0] {
                world.destroy_body(middle_body);
            }
            RayCastControl::Continue
        });
        assert_eq!(world.body_count(), 2);
    }

    #[test]
    fn test_query_aabb_reports_overlaps_in_id_order() {
        let (mut world, ids) = scene();
        let mut seen = Vec::new();
        let area = Aabb::new(Vec2::new(20.0, -20.0), Vec2::new(70.0, 20.0));
        world.query_aabb(&area, |_, id| {
            seen.push(id);
            true
        });
        assert_eq!(seen, vec![ids[0], ids[1]]);
    }

    #[test]
    fn test_query_aabb_stops_when_asked() {
        let (mut world, _) = scene();
        let mut count = 0;
        let area = Aabb::new(Vec2::new(0.0, -20.0), Vec2::new(120.0, 20.0));
        world.query_aabb(&area, |_, _| {
            count += 1;
            false
        });
        assert_eq!(count, 1);
    }

    #[test]
    fn test_query_aabb_skips_disabled() {
        let (mut world, ids) = scene();
        world.set_collider_enabled(ids[0], false);
        let mut seen = Vec::new();
        let area = Aabb::new(Vec2::new(0.0, -20.0), Vec2::new(120.0, 20.0));
        world.query_aabb(&area, |_, id| {
            seen.push(id);
            true
        });
        assert_eq!(seen, vec![ids[1], ids[2]]);
    }
}
