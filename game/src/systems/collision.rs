use aster_shared::{
    ComponentKind, DeadPlayer, DestroyReason, EnemyKind, EntityId, Health, HitBox, NetworkId,
    Playable, Powerup, Projectile, Signature, System, Team, TeamKind, Transform, World,
};
use log::{debug, warn};

use crate::events::{DeathEvent, DestroyedEvent, EventBus, HitEvent, PickupEvent};

fn score_for(kind: EnemyKind) -> i32 {
    match kind {
        EnemyKind::Basic => 100,
        EnemyKind::Fast => 150,
        EnemyKind::Tank => 250,
        EnemyKind::Boss => 1000,
    }
}

fn overlap(a: &Transform, a_box: &HitBox, b: &Transform, b_box: &HitBox) -> bool {
    (a.x - b.x).abs() * 2.0 <= a_box.width + b_box.width
        && (a.y - b.y).abs() * 2.0 <= a_box.height + b_box.height
}

/// AABB collision over everything with a hitbox. The authoritative side
/// applies damage and scoring; clients only remove their locally simulated
/// projectiles on impact.
pub struct CollisionSystem {
    authoritative: bool,
    events: EventBus,
}

impl CollisionSystem {
    pub fn new(authoritative: bool, events: EventBus) -> Self {
        Self {
            authoritative,
            events,
        }
    }

    /// A projectile struck `target`. Returns true when the projectile is
    /// spent and must despawn.
    fn resolve_projectile_hit(
        &mut self,
        world: &mut World,
        projectile_entity: EntityId,
        projectile: Projectile,
        target: EntityId,
    ) -> bool {
        if !self.authoritative {
            return true;
        }
        let attacker_id = world
            .get::<NetworkId>(projectile.shooter)
            .map(|network_id| network_id.id)
            .unwrap_or(0);
        let target_net_id = world
            .get::<NetworkId>(target)
            .map(|network_id| network_id.id)
            .unwrap_or(0);

        let Some(health) = world.get_mut::<Health>(target) else {
            return true;
        };
        health.current -= projectile.damage;
        let dead = health.is_dead();

        self.events.lock().hits.push(HitEvent {
            victim_id: target_net_id,
            attacker_id,
            damage: projectile.damage.clamp(0, 255) as u8,
        });
        debug!(
            "projectile {} hit {} for {} (dead={})",
            projectile_entity, target, projectile.damage, dead
        );

        if !dead {
            return true;
        }

        if world.has::<Playable>(target) || world.has::<aster_shared::InputComponent>(target) {
            // Players stay in the world as corpses until respawn handling.
            if !world.has::<DeadPlayer>(target) {
                let _ = world.add(
                    target,
                    DeadPlayer {
                        timer: 0.0,
                        initialized: false,
                        killer_id: attacker_id,
                    },
                );
                self.events.lock().deaths.push(DeathEvent {
                    victim_id: target_net_id,
                    killer_id: attacker_id,
                });
            }
            return true;
        }

        // Enemy (or other networked object) destroyed outright.
        let enemy_kind = world.get::<aster_shared::Enemy>(target).map(|enemy| enemy.kind);
        let final_position = world
            .get::<Transform>(target)
            .map(|transform| (transform.x, transform.y))
            .unwrap_or((0.0, 0.0));
        if let Some(kind) = enemy_kind {
            if attacker_id != 0 {
                self.events.queue_score_delta(attacker_id, score_for(kind));
            }
        }
        if target_net_id != 0 {
            self.events.queue_destroyed(DestroyedEvent {
                network_id: target_net_id,
                reason: DestroyReason::KilledByPlayer,
                final_x: final_position.0,
                final_y: final_position.1,
            });
        }
        if let Err(error) = world.despawn(target) {
            warn!("collision: could not despawn {}: {}", target, error);
        }
        true
    }

    fn resolve_powerup_pickup(&mut self, world: &mut World, player: EntityId, powerup: EntityId) {
        if !self.authoritative {
            return;
        }
        let player_id = world
            .get::<NetworkId>(player)
            .map(|network_id| network_id.id)
            .unwrap_or(0);
        let powerup_id = world
            .get::<NetworkId>(powerup)
            .map(|network_id| network_id.id)
            .unwrap_or(0);
        let Some(powerup_data) = world.get::<Powerup>(powerup).copied() else {
            return;
        };
        self.events.lock().pickups.push(PickupEvent {
            player_id,
            powerup_id,
            kind: powerup_data.kind,
        });
        if powerup_id != 0 {
            let final_position = world
                .get::<Transform>(powerup)
                .map(|transform| (transform.x, transform.y))
                .unwrap_or((0.0, 0.0));
            self.events.queue_destroyed(DestroyedEvent {
                network_id: powerup_id,
                reason: DestroyReason::TimeoutDespawn,
                final_x: final_position.0,
                final_y: final_position.1,
            });
        }
        if let Err(error) = world.despawn(powerup) {
            warn!("collision: could not despawn powerup {}: {}", powerup, error);
        }
    }
}

impl System for CollisionSystem {
    fn name(&self) -> &'static str {
        "collision"
    }

    fn signature(&self) -> Signature {
        Signature::of(&[
            ComponentKind::Transform,
            ComponentKind::HitBox,
            ComponentKind::Team,
        ])
    }

    fn on_update(&mut self, world: &mut World, entities: &[EntityId], _dt: f32) {
        for (index, &a) in entities.iter().enumerate() {
            if !world.is_alive(a) {
                continue;
            }
            for &b in &entities[index + 1..] {
                if !world.is_alive(a) {
                    break;
                }
                if !world.is_alive(b) {
                    continue;
                }
                let (Some(ta), Some(ha), Some(tb), Some(hb)) = (
                    world.get::<Transform>(a).copied(),
                    world.get::<HitBox>(a).copied(),
                    world.get::<Transform>(b).copied(),
                    world.get::<HitBox>(b).copied(),
                ) else {
                    continue;
                };
                if !overlap(&ta, &ha, &tb, &hb) {
                    continue;
                }
                let (Some(team_a), Some(team_b)) = (
                    world.get::<Team>(a).copied(),
                    world.get::<Team>(b).copied(),
                ) else {
                    continue;
                };

                let projectile_a = world.get::<Projectile>(a).copied();
                let projectile_b = world.get::<Projectile>(b).copied();

                match (projectile_a, projectile_b) {
                    (Some(projectile), None) => {
                        if Team::can_collide(&team_a, &team_b, true)
                            && self.resolve_projectile_hit(world, a, projectile, b)
                        {
                            let _ = world.despawn(a);
                        }
                    }
                    (None, Some(projectile)) => {
                        if Team::can_collide(&team_b, &team_a, true)
                            && self.resolve_projectile_hit(world, b, projectile, a)
                        {
                            let _ = world.despawn(b);
                        }
                    }
                    // Projectiles pass through each other.
                    (Some(_), Some(_)) => {}
                    (None, None) => {
                        // Powerup pickup is the only body-on-body rule the
                        // core resolves.
                        if team_a.has(TeamKind::Player) && team_b.has(TeamKind::Powerup) {
                            self.resolve_powerup_pickup(world, a, b);
                        } else if team_b.has(TeamKind::Player) && team_a.has(TeamKind::Powerup) {
                            self.resolve_powerup_pickup(world, b, a);
                        }
                    }
                }
            }
        }
    }
}
