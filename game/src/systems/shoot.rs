use aster_shared::{
    ComponentKind, DeadPlayer, EntityId, GameAction, GameClock, InputComponent, NetworkId,
    Playable, Signature, System, Transform, Weapon, World,
};
use log::warn;

use crate::builders::EntityBuilders;
use crate::events::{EventBus, WeaponFireEvent};

/// Spawns the projectile for one shot and queues the replication event.
/// Shared by the shoot system (player fire) and the AI system (enemy fire).
#[allow(clippy::too_many_arguments)]
pub(crate) fn fire(
    world: &mut World,
    events: &EventBus,
    shooter: EntityId,
    origin_x: f32,
    origin_y: f32,
    direction_x: f32,
    direction_y: f32,
    from_playable: bool,
    with_render: bool,
) {
    let Some(weapon) = world.get::<Weapon>(shooter).copied() else {
        return;
    };
    let speed = weapon.kind.projectile_speed();
    let projectile = match EntityBuilders::projectile(
        world,
        origin_x,
        origin_y,
        direction_x * speed,
        direction_y * speed,
        shooter,
        from_playable,
        weapon.damage,
        with_render,
    ) {
        Ok(entity) => entity,
        Err(error) => {
            warn!("shoot: projectile spawn failed: {}", error);
            return;
        }
    };
    let shooter_id = world
        .get::<NetworkId>(shooter)
        .map(|network_id| network_id.id)
        .unwrap_or(0);
    events.queue_weapon_fire(WeaponFireEvent {
        shooter_id,
        projectile,
        origin_x,
        origin_y,
        direction_x,
        direction_y,
        weapon: weapon.kind,
    });
}

/// Fires player weapons from input state, honoring each weapon's fire rate.
///
/// On the server every player entity may fire; on a client only the local
/// (Playable) ship predicts its own shots — remote shots arrive as
/// WEAPON_FIRE events.
pub struct ShootSystem {
    authoritative: bool,
    with_render: bool,
    clock: GameClock,
    events: EventBus,
}

impl ShootSystem {
    pub fn new(authoritative: bool, with_render: bool, clock: GameClock, events: EventBus) -> Self {
        Self {
            authoritative,
            with_render,
            clock,
            events,
        }
    }
}

impl System for ShootSystem {
    fn name(&self) -> &'static str {
        "shoot"
    }

    fn signature(&self) -> Signature {
        Signature::of(&[
            ComponentKind::Input,
            ComponentKind::Transform,
            ComponentKind::Weapon,
        ])
    }

    fn on_update(&mut self, world: &mut World, entities: &[EntityId], _dt: f32) {
        let now_ms = u64::from(self.clock.elapsed_ms());
        for &entity in entities {
            if world.has::<DeadPlayer>(entity) {
                continue;
            }
            if !self.authoritative && !world.has::<Playable>(entity) {
                continue;
            }
            let wants_fire = world
                .get::<InputComponent>(entity)
                .map(|input| input.is_active(GameAction::FirePrimary))
                .unwrap_or(false);
            if !wants_fire {
                continue;
            }
            let Some(weapon) = world.get_mut::<Weapon>(entity) else {
                continue;
            };
            if !weapon.can_fire(now_ms) {
                continue;
            }
            // max(1): keep the never-fired sentinel (0) from re-arming.
            weapon.last_shot_ms = now_ms.max(1);
            let Some(transform) = world.get::<Transform>(entity).copied() else {
                continue;
            };
            // Player ships fire straight ahead from the nose.
            fire(
                world,
                &self.events,
                entity,
                transform.x + 40.0,
                transform.y,
                1.0,
                0.0,
                true,
                self.with_render,
            );
        }
    }
}
