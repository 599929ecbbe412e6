use aster_shared::{
    ComponentKind, DestroyReason, EntityId, InputComponent, NetworkId, Signature, System,
    Transform, Velocity, World,
};
use log::warn;

use crate::events::{DestroyedEvent, EventBus};
use crate::{WORLD_HEIGHT, WORLD_WIDTH};

/// How far past the playfield edge an entity may drift before it is culled.
const CULL_MARGIN: f32 = 200.0;

/// Integrates positions from velocities. Player ships are clamped to the
/// playfield; everything else is culled once it leaves it by a margin.
pub struct MovementSystem {
    authoritative: bool,
    events: EventBus,
}

impl MovementSystem {
    pub fn new(authoritative: bool, events: EventBus) -> Self {
        Self {
            authoritative,
            events,
        }
    }
}

impl System for MovementSystem {
    fn name(&self) -> &'static str {
        "movement"
    }

    fn signature(&self) -> Signature {
        Signature::of(&[ComponentKind::Transform, ComponentKind::Velocity])
    }

    fn on_update(&mut self, world: &mut World, entities: &[EntityId], dt: f32) {
        for &entity in entities {
            if !world.is_alive(entity) {
                continue;
            }
            let Some(velocity) = world.get::<Velocity>(entity).copied() else {
                continue;
            };
            let is_player = world.has::<InputComponent>(entity);
            let Some(transform) = world.get_mut::<Transform>(entity) else {
                continue;
            };
            transform.x += velocity.vx * dt;
            transform.y += velocity.vy * dt;

            if is_player {
                transform.x = transform.x.clamp(0.0, WORLD_WIDTH);
                transform.y = transform.y.clamp(0.0, WORLD_HEIGHT);
                continue;
            }

            let out_of_bounds = transform.x < -CULL_MARGIN
                || transform.x > WORLD_WIDTH + CULL_MARGIN
                || transform.y < -CULL_MARGIN
                || transform.y > WORLD_HEIGHT + CULL_MARGIN;
            if !out_of_bounds {
                continue;
            }
            let (final_x, final_y) = (transform.x, transform.y);
            if self.authoritative {
                if let Some(network_id) = world.get::<NetworkId>(entity).copied() {
                    self.events.queue_destroyed(DestroyedEvent {
                        network_id: network_id.id,
                        reason: DestroyReason::OutOfBounds,
                        final_x,
                        final_y,
                    });
                }
            }
            if let Err(error) = world.despawn(entity) {
                warn!("movement: could not cull {}: {}", entity, error);
            }
        }
    }
}
