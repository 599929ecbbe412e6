use aster_shared::{
    Ai, AiBehaviour, ComponentKind, EntityId, GameClock, InputComponent, Signature, System,
    Transform, Velocity, Weapon, World,
};

use crate::events::EventBus;
use crate::systems::shoot;

const FORMATION_DRIFT: f32 = -80.0;
const KAMIKAZE_SPEED: f32 = 260.0;
const ZIGZAG_AMPLITUDE: f32 = 140.0;
const ZIGZAG_FREQUENCY: f32 = 2.0;

/// Steers enemies by behaviour kind and fires their weapons. Runs on the
/// authoritative side only; clients learn AI results through snapshots.
pub struct AiSystem {
    with_render: bool,
    clock: GameClock,
    events: EventBus,
}

impl AiSystem {
    pub fn new(with_render: bool, clock: GameClock, events: EventBus) -> Self {
        Self {
            with_render,
            clock,
            events,
        }
    }

    /// Nearest live player ship, if any is within `range` of (x, y).
    fn nearest_player(world: &World, x: f32, y: f32, range: f32) -> Option<(EntityId, f32, f32)> {
        let inputs = world.store::<InputComponent>().ok()?;
        let mut best: Option<(EntityId, f32, f32, f32)> = None;
        for (entity, _) in inputs.iter() {
            let Some(transform) = world.get::<Transform>(entity) else {
                continue;
            };
            let dx = transform.x - x;
            let dy = transform.y - y;
            let distance_sq = dx * dx + dy * dy;
            if distance_sq > range * range {
                continue;
            }
            match best {
                Some((_, _, _, best_sq)) if best_sq <= distance_sq => {}
                _ => best = Some((entity, transform.x, transform.y, distance_sq)),
            }
        }
        best.map(|(entity, px, py, _)| (entity, px, py))
    }
}

impl System for AiSystem {
    fn name(&self) -> &'static str {
        "ai"
    }

    fn signature(&self) -> Signature {
        Signature::of(&[
            ComponentKind::Ai,
            ComponentKind::Transform,
            ComponentKind::Velocity,
        ])
    }

    fn on_update(&mut self, world: &mut World, entities: &[EntityId], dt: f32) {
        let now_ms = u64::from(self.clock.elapsed_ms());
        for &entity in entities {
            if !world.is_alive(entity) {
                continue;
            }
            let Some(mut ai) = world.get::<Ai>(entity).copied() else {
                continue;
            };
            let Some(transform) = world.get::<Transform>(entity).copied() else {
                continue;
            };
            ai.internal_time += dt;

            let mut velocity = Velocity::new(FORMATION_DRIFT, 0.0);
            match ai.behaviour {
                AiBehaviour::Formation => {}
                AiBehaviour::Kamikaze => {
                    if let Some((target, px, py)) =
                        Self::nearest_player(world, transform.x, transform.y, ai.detection_range)
                    {
                        ai.target_id = target.raw();
                        let dx = px - transform.x;
                        let dy = py - transform.y;
                        let length = (dx * dx + dy * dy).sqrt().max(1.0);
                        velocity = Velocity::new(
                            dx / length * KAMIKAZE_SPEED,
                            dy / length * KAMIKAZE_SPEED,
                        );
                    } else {
                        ai.target_id = 0;
                    }
                }
                AiBehaviour::Zigzag => {
                    velocity.vy = (ai.internal_time * ZIGZAG_FREQUENCY).sin() * ZIGZAG_AMPLITUDE;
                }
                AiBehaviour::ShooterTactic => {
                    // Hold position horizontally once inside the playfield,
                    // bob vertically and shoot at players in aggro range.
                    if transform.x < crate::WORLD_WIDTH * 0.75 {
                        velocity.vx = 0.0;
                    }
                    velocity.vy =
                        (ai.internal_time * ZIGZAG_FREQUENCY * 0.5).sin() * ZIGZAG_AMPLITUDE * 0.4;

                    let player_in_range =
                        Self::nearest_player(world, transform.x, transform.y, ai.aggro_range);
                    if let Some((target, _, _)) = player_in_range {
                        ai.target_id = target.raw();
                        let can_fire = world
                            .get::<Weapon>(entity)
                            .map(|weapon| weapon.can_fire(now_ms))
                            .unwrap_or(false);
                        if can_fire {
                            if let Some(weapon) = world.get_mut::<Weapon>(entity) {
                                // max(1): keep the never-fired sentinel (0)
                                // from re-arming.
                                weapon.last_shot_ms = now_ms.max(1);
                            }
                            shoot::fire(
                                world,
                                &self.events,
                                entity,
                                transform.x - 30.0,
                                transform.y,
                                -1.0,
                                0.0,
                                false,
                                self.with_render,
                            );
                        }
                    }
                }
            }

            if let Some(slot) = world.get_mut::<Velocity>(entity) {
                *slot = velocity;
            }
            if let Some(slot) = world.get_mut::<Ai>(entity) {
                *slot = ai;
            }
        }
    }
}
