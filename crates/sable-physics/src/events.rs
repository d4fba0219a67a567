//! Contact collection during the kernel step and multi-level fan-out after.
//!
//! One adapter implements both of the kernel's observation traits: the event
//! handler (collision started/stopped, contact forces) and the physics hooks
//! (pair filtering, solver-contact modification). All observations land in a
//! single ordered queue, drained after the kernel step returns while the
//! world is still locked.

use std::sync::Mutex;

use rapier2d::geometry::{ColliderSet, CollisionEvent, ContactPair, SolverFlags};
use rapier2d::pipeline::{
    ContactModificationContext, EventHandler, PairFilterContext, PhysicsHooks,
};
use rapier2d::prelude::{ColliderHandle, RigidBodySet};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::collider::ColliderRecord;
use crate::world::{BodyId, ColliderId, GameObjectId, PhysicsWorld};

/// Phase of a contact's life reported to handlers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContactPhase {
    /// The pair started touching this step. Fires for sensors too.
    Begin,
    /// The pair's contacts are about to be solved. Once per pair per step;
    /// never for sensors.
    PreSolve,
    /// The pair's contacts were solved this step. Never for sensors.
    PostSolve,
    /// The pair stopped touching this step. Fires for sensors too.
    End,
}

/// A contact observation captured during the kernel step, in kernel handles.
///
/// Resolution to engine ids happens at dispatch, so a handle that died
/// between capture and dispatch resolves to nothing and the event is skipped.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RawContactEvent {
    pub phase: ContactPhase,
    pub a: ColliderHandle,
    pub b: ColliderHandle,
}

// ---------------------------------------------------------------------------
// Step adapter
// ---------------------------------------------------------------------------

/// Borrow-only view handed to the kernel for one step. Collects raw events
/// and answers pair-filter queries from the engine-side filter records.
pub(crate) struct StepEventAdapter<'a> {
    events: &'a Mutex<Vec<RawContactEvent>>,
    records: &'a FxHashMap<ColliderId, ColliderRecord>,
    /// Pairs that already produced a pre-solve event this step. The kernel
    /// invokes the solver hook once per manifold and compound shapes carry
    /// several manifolds per pair.
    seen_presolve: Mutex<FxHashSet<(ColliderHandle, ColliderHandle)>>,
}

impl<'a> StepEventAdapter<'a> {
    pub(crate) fn new(
        events: &'a Mutex<Vec<RawContactEvent>>,
        records: &'a FxHashMap<ColliderId, ColliderRecord>,
    ) -> Self {
        Self {
            events,
            records,
            seen_presolve: Mutex::new(FxHashSet::default()),
        }
    }

    fn push(&self, phase: ContactPhase, a: ColliderHandle, b: ColliderHandle) {
        self.events.lock().unwrap().push(RawContactEvent { phase, a, b });
    }

    fn record_of(
        &self,
        colliders: &ColliderSet,
        handle: ColliderHandle,
    ) -> Option<&ColliderRecord> {
        let native = colliders.get(handle)?;
        self.records.get(&ColliderId(native.user_data as u64))
    }

    fn pair_allowed(&self, colliders: &ColliderSet, h1: ColliderHandle, h2: ColliderHandle) -> bool {
        let (Some(a), Some(b)) = (self.record_of(colliders, h1), self.record_of(colliders, h2))
        else {
            return true;
        };
        a.enabled && b.enabled && a.filter.should_collide(&b.filter)
    }
}

fn ordered_pair(a: ColliderHandle, b: ColliderHandle) -> (ColliderHandle, ColliderHandle) {
    if a.into_raw_parts() <= b.into_raw_parts() {
        (a, b)
    } else {
        (b, a)
    }
}

impl EventHandler for StepEventAdapter<'_> {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        match event {
            CollisionEvent::Started(a, b, _) => self.push(ContactPhase::Begin, a, b),
            CollisionEvent::Stopped(a, b, _) => self.push(ContactPhase::End, a, b),
        }
    }

    fn handle_contact_force_event(
        &self,
        _dt: f32,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        contact_pair: &ContactPair,
        _total_force_magnitude: f32,
    ) {
        self.push(
            ContactPhase::PostSolve,
            contact_pair.collider1,
            contact_pair.collider2,
        );
    }
}

impl PhysicsHooks for StepEventAdapter<'_> {
    fn filter_contact_pair(&self, context: &PairFilterContext) -> Option<SolverFlags> {
        if self.pair_allowed(context.colliders, context.collider1, context.collider2) {
            Some(SolverFlags::COMPUTE_IMPULSES)
        } else {
            None
        }
    }

    fn filter_intersection_pair(&self, context: &PairFilterContext) -> bool {
        self.pair_allowed(context.colliders, context.collider1, context.collider2)
    }

    fn modify_solver_contacts(&self, context: &mut ContactModificationContext) {
        let key = ordered_pair(context.collider1, context.collider2);
        if self.seen_presolve.lock().unwrap().insert(key) {
            self.push(ContactPhase::PreSolve, context.collider1, context.collider2);
        }
    }
}

// ---------------------------------------------------------------------------
// Handler registries
// ---------------------------------------------------------------------------

type ColliderContactHandler = Box<dyn FnMut(&mut PhysicsWorld, ContactPhase, ColliderId, ColliderId)>;
type BodyContactHandler = Box<dyn FnMut(&mut PhysicsWorld, ContactPhase, BodyId, BodyId)>;
type ObjectContactHandler =
    Box<dyn FnMut(&mut PhysicsWorld, ContactPhase, GameObjectId, GameObjectId)>;

/// The three fan-out registries plus the clears recorded while a dispatch
/// pass has the registries moved out of the world.
#[derive(Default)]
pub(crate) struct ContactHandlers {
    collider: FxHashMap<ColliderId, ColliderContactHandler>,
    body: FxHashMap<BodyId, BodyContactHandler>,
    object: FxHashMap<GameObjectId, ObjectContactHandler>,
    cleared_colliders: FxHashSet<ColliderId>,
    cleared_bodies: FxHashSet<BodyId>,
    cleared_objects: FxHashSet<GameObjectId>,
}

impl ContactHandlers {
    pub(crate) fn drop_collider(&mut self, collider: ColliderId) {
        self.collider.remove(&collider);
    }

    pub(crate) fn drop_body(&mut self, body: BodyId) {
        self.body.remove(&body);
    }
}

impl PhysicsWorld {
    /// Registers the contact handler for one collider, replacing any previous
    /// one. Returns `false` without registering for a dangling id.
    ///
    /// The handler runs for every phase of every contact the collider takes
    /// part in, as `(self, other)`. A handler registered during a dispatch
    /// pass takes effect once the pass completes.
    pub fn set_collider_contact_handler(
        &mut self,
        collider: ColliderId,
        handler: impl FnMut(&mut PhysicsWorld, ContactPhase, ColliderId, ColliderId) + 'static,
    ) -> bool {
        if !self.collider_records.contains_key(&collider) {
            return false;
        }
        self.handlers.cleared_colliders.remove(&collider);
        self.handlers.collider.insert(collider, Box::new(handler));
        true
    }

    /// Unregisters a collider handler. Inside a dispatch pass the removal
    /// takes effect once the pass completes.
    pub fn clear_collider_contact_handler(&mut self, collider: ColliderId) {
        self.handlers.cleared_colliders.insert(collider);
        self.handlers.collider.remove(&collider);
    }

    /// Body-level variant: the handler sees contacts of any collider attached
    /// to the body, with body ids as `(self, other)`.
    pub fn set_body_contact_handler(
        &mut self,
        body: BodyId,
        handler: impl FnMut(&mut PhysicsWorld, ContactPhase, BodyId, BodyId) + 'static,
    ) -> bool {
        if !self.body_records.contains_key(&body) {
            return false;
        }
        self.handlers.cleared_bodies.remove(&body);
        self.handlers.body.insert(body, Box::new(handler));
        true
    }

    pub fn clear_body_contact_handler(&mut self, body: BodyId) {
        self.handlers.cleared_bodies.insert(body);
        self.handlers.body.remove(&body);
    }

    /// Object-level variant, keyed on the engine's game-object association.
    /// Fires only for contacts where both bodies carry an association, and
    /// never for a body touching another body of the same object.
    pub fn set_object_contact_handler(
        &mut self,
        object: GameObjectId,
        handler: impl FnMut(&mut PhysicsWorld, ContactPhase, GameObjectId, GameObjectId) + 'static,
    ) {
        self.handlers.cleared_objects.remove(&object);
        self.handlers.object.insert(object, Box::new(handler));
    }

    pub fn clear_object_contact_handler(&mut self, object: GameObjectId) {
        self.handlers.cleared_objects.insert(object);
        self.handlers.object.remove(&object);
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    /// Drains the raw queue and fans each event out to collider-, body- and
    /// object-level handlers, both directions each.
    ///
    /// The registries move out of the world for the pass so handlers can take
    /// `&mut PhysicsWorld`; structural mutations they attempt are still
    /// rejected by the locked flag. Handlers (re)registered by a handler land
    /// in the live registry and win during the merge afterwards.
    pub(crate) fn dispatch_contact_events(&mut self) {
        let raw = std::mem::take(&mut *self.raw_events.lock().unwrap());
        if raw.is_empty() {
            return;
        }
        let mut handlers = std::mem::take(&mut self.handlers);
        for event in &raw {
            let Some((first, second)) = self.resolve_pair(event.a, event.b) else {
                continue;
            };
            for (this, other) in [(first, second), (second, first)] {
                if let Some(handler) = handlers.collider.get_mut(&this) {
                    handler(self, event.phase, this, other);
                }
            }
            let (Some(body_a), Some(body_b)) =
                (self.collider_body(first), self.collider_body(second))
            else {
                continue;
            };
            for (this, other) in [(body_a, body_b), (body_b, body_a)] {
                if let Some(handler) = handlers.body.get_mut(&this) {
                    handler(self, event.phase, this, other);
                }
            }
            let object_a = self.body_game_object(body_a);
            let object_b = self.body_game_object(body_b);
            if let (Some(object_a), Some(object_b)) = (object_a, object_b)
                && object_a != object_b
            {
                for (this, other) in [(object_a, object_b), (object_b, object_a)] {
                    if let Some(handler) = handlers.object.get_mut(&this) {
                        handler(self, event.phase, this, other);
                    }
                }
            }
        }
        self.restore_handlers(handlers);
    }

    fn resolve_pair(
        &self,
        a: ColliderHandle,
        b: ColliderHandle,
    ) -> Option<(ColliderId, ColliderId)> {
        Some((self.resolve_collider(a)?, self.resolve_collider(b)?))
    }

    fn resolve_collider(&self, handle: ColliderHandle) -> Option<ColliderId> {
        let native = self.colliders.get(handle)?;
        let id = ColliderId(native.user_data as u64);
        self.collider_records.contains_key(&id).then_some(id)
    }

    /// Merges the taken registries back: an entry survives unless the pass
    /// cleared it or registered a replacement.
    fn restore_handlers(&mut self, taken: ContactHandlers) {
        for (id, handler) in taken.collider {
            if !self.handlers.cleared_colliders.contains(&id) {
                self.handlers.collider.entry(id).or_insert(handler);
            }
        }
        for (id, handler) in taken.body {
            if !self.handlers.cleared_bodies.contains(&id) {
                self.handlers.body.entry(id).or_insert(handler);
            }
        }
        for (id, handler) in taken.object {
            if !self.handlers.cleared_objects.contains(&id) {
                self.handlers.object.entry(id).or_insert(handler);
            }
        }
        self.handlers.cleared_colliders.clear();
        self.handlers.cleared_bodies.clear();
        self.handlers.cleared_objects.clear();
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
