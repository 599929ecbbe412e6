use super::{EntityId, Signature, World};

/// A function over the entities matching a required signature, plus the
/// lifecycle hooks the registry drives.
///
/// Systems run on the main thread only, in registration order. The entity
/// set a system sees for a given update is the membership at the start of
/// that update; entities spawned or mutated mid-update are picked up by the
/// next system in the schedule.
pub trait System: Send {
    /// Stable identifier; registering two systems with the same name fails.
    fn name(&self) -> &'static str;

    /// Components an entity must carry to be a member of this system.
    fn signature(&self) -> Signature;

    fn on_create(&mut self, _world: &mut World) {}

    fn on_start_running(&mut self, _world: &mut World) {}

    /// One simulation step over the system's current members.
    fn on_update(&mut self, world: &mut World, entities: &[EntityId], dt: f32);

    fn on_stop_running(&mut self, _world: &mut World) {}

    fn on_destroy(&mut self, _world: &mut World) {}
}
