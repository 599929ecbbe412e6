use aster_shared::{
    ComponentKind, DestroyReason, EntityId, Lifetime, NetworkId, Signature, System, Transform,
    World,
};
use log::warn;

use crate::events::{DestroyedEvent, EventBus};

/// Counts down Lifetime components and despawns expired entities
/// (projectiles, transient effects).
pub struct LifetimeSystem {
    authoritative: bool,
    events: EventBus,
}

impl LifetimeSystem {
    pub fn new(authoritative: bool, events: EventBus) -> Self {
        Self {
            authoritative,
            events,
        }
    }
}

impl System for LifetimeSystem {
    fn name(&self) -> &'static str {
        "lifetime"
    }

    fn signature(&self) -> Signature {
        Signature::of(&[ComponentKind::Lifetime])
    }

    fn on_update(&mut self, world: &mut World, entities: &[EntityId], dt: f32) {
        for &entity in entities {
            if !world.is_alive(entity) {
                continue;
            }
            let expired = match world.get_mut::<Lifetime>(entity) {
                Some(lifetime) => {
                    lifetime.remaining -= dt;
                    lifetime.remaining <= 0.0
                }
                None => continue,
            };
            if !expired {
                continue;
            }
            if self.authoritative {
                if let Some(network_id) = world.get::<NetworkId>(entity).copied() {
                    let position = world
                        .get::<Transform>(entity)
                        .map(|transform| (transform.x, transform.y))
                        .unwrap_or((0.0, 0.0));
                    self.events.queue_destroyed(DestroyedEvent {
                        network_id: network_id.id,
                        reason: DestroyReason::TimeoutDespawn,
                        final_x: position.0,
                        final_y: position.1,
                    });
                }
            }
            if let Err(error) = world.despawn(entity) {
                warn!("lifetime: could not despawn {}: {}", entity, error);
            }
        }
    }
}
