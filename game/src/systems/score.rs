use aster_shared::{ComponentKind, EntityId, NetworkId, Score, Signature, System, World};

use crate::events::{EventBus, ScoreEvent};

/// Applies queued score deltas to the owning player's Score component and
/// republishes the new totals for replication.
pub struct ScoreSystem {
    events: EventBus,
}

impl ScoreSystem {
    pub fn new(events: EventBus) -> Self {
        Self { events }
    }
}

impl System for ScoreSystem {
    fn name(&self) -> &'static str {
        "score"
    }

    fn signature(&self) -> Signature {
        Signature::of(&[ComponentKind::NetworkId, ComponentKind::Score])
    }

    fn on_update(&mut self, world: &mut World, entities: &[EntityId], _dt: f32) {
        let deltas = std::mem::take(&mut self.events.lock().score_deltas);
        if deltas.is_empty() {
            return;
        }
        for delta in deltas {
            for &entity in entities {
                let matches = world
                    .get::<NetworkId>(entity)
                    .map(|network_id| network_id.id == delta.player_id)
                    .unwrap_or(false);
                if !matches {
                    continue;
                }
                if let Some(score) = world.get_mut::<Score>(entity) {
                    score.value = score.value.saturating_add_signed(delta.delta);
                    let value = score.value;
                    self.events.lock().score_updates.push(ScoreEvent {
                        player_id: delta.player_id,
                        score: value,
                    });
                }
                break;
            }
        }
    }
}
