//! Entity construction helpers: one function per conceptual game object,
//! bundling the component set that object carries.

use aster_shared::{
    Ai, AiBehaviour, Animation, EcsError, Enemy, EnemyKind, EntityId, EntityScope, Health, HitBox,
    InputComponent, Level, Lifetime, NetworkId, Playable, Powerup, PowerupKind, Projectile,
    ProjectileKind, Sprite, Team, TeamKind, Transform, Velocity, Wave, Weapon, WeaponKind, World,
};

pub const PLAYER_BASE_HEALTH: i32 = 100;
pub const ENEMY_BASE_HEALTH: i32 = 30;

const PLAYER_HITBOX: (f32, f32) = (66.0, 34.0);
const ENEMY_HITBOX: (f32, f32) = (48.0, 48.0);
const PROJECTILE_HITBOX: (f32, f32) = (16.0, 8.0);
const PROJECTILE_LIFETIME_SECS: f32 = 3.0;

/// Sprite sheet ids consumed by the external render layer.
mod assets {
    pub const PLAYER_SHIP: u16 = 1;
    pub const ENEMY_BASIC: u16 = 10;
    pub const ENEMY_FAST: u16 = 11;
    pub const ENEMY_TANK: u16 = 12;
    pub const ENEMY_BOSS: u16 = 13;
    pub const PROJECTILE: u16 = 20;
    pub const POWERUP: u16 = 30;
}

/// Stateless builder namespace; every helper takes the world explicitly.
pub struct EntityBuilders;

impl EntityBuilders {
    /// Registers the store of every component kind the game uses. Must run
    /// before any builder.
    pub fn register_components(world: &mut World) {
        world.register_component::<Transform>();
        world.register_component::<Velocity>();
        world.register_component::<Health>();
        world.register_component::<Weapon>();
        world.register_component::<NetworkId>();
        world.register_component::<InputComponent>();
        world.register_component::<Playable>();
        world.register_component::<Enemy>();
        world.register_component::<Projectile>();
        world.register_component::<Team>();
        world.register_component::<HitBox>();
        world.register_component::<Sprite>();
        world.register_component::<Animation>();
        world.register_component::<Ai>();
        world.register_component::<Level>();
        world.register_component::<aster_shared::Score>();
        world.register_component::<aster_shared::DeadPlayer>();
        world.register_component::<Lifetime>();
        world.register_component::<Powerup>();
        world.register_component::<aster_shared::Force>();
        world.register_component::<aster_shared::GameConfig>();
    }

    /// Player ship under its server-assigned networked id.
    ///
    /// `is_playable` is true only on the owning client (and never on the
    /// server), and gates the Playable tag plus `NetworkId::is_local`.
    #[allow(clippy::too_many_arguments)]
    pub fn player(
        world: &mut World,
        player_id: u32,
        x: f32,
        y: f32,
        vx: f32,
        vy: f32,
        initial_health: i32,
        is_playable: bool,
        with_render: bool,
    ) -> Result<EntityId, EcsError> {
        let entity = world.spawn_with_id(player_id, "player", EntityScope::Networked)?;
        if is_playable {
            world.add(entity, NetworkId::local(player_id))?;
            world.add(entity, Playable)?;
        } else {
            world.add(entity, NetworkId::new(player_id))?;
        }
        world.add(entity, Transform::new(x, y))?;
        world.add(entity, Velocity::new(vx, vy))?;
        world.add(entity, Health::new(initial_health, PLAYER_BASE_HEALTH))?;
        world.add(entity, HitBox::new(PLAYER_HITBOX.0, PLAYER_HITBOX.1))?;
        world.add(
            entity,
            Weapon {
                kind: WeaponKind::Basic,
                fire_rate_ms: 250,
                last_shot_ms: 0,
                damage: 10,
                projectile: ProjectileKind::Missile,
            },
        )?;
        world.add(entity, InputComponent::new(player_id))?;
        world.add(entity, Team::new(TeamKind::Player))?;
        world.add(entity, aster_shared::Score::default())?;
        if with_render {
            world.add(
                entity,
                Sprite {
                    asset_id: assets::PLAYER_SHIP,
                    layer: 1,
                },
            )?;
            world.add(
                entity,
                Animation {
                    animation_id: 1,
                    current_frame: 0,
                    frame_count: 4,
                    elapsed: 0.0,
                    frame_duration_ms: 100,
                    looped: true,
                },
            )?;
        }
        Ok(entity)
    }

    /// Enemy (or boss) under a preassigned networked id.
    #[allow(clippy::too_many_arguments)]
    pub fn enemy(
        world: &mut World,
        enemy_id: u32,
        kind: EnemyKind,
        x: f32,
        y: f32,
        vx: f32,
        vy: f32,
        initial_health: i32,
        with_render: bool,
    ) -> Result<EntityId, EcsError> {
        let entity = world.spawn_with_id(enemy_id, "enemy", EntityScope::Networked)?;
        Self::enemy_components(world, entity, kind, x, y, vx, vy, initial_health, with_render)?;
        Ok(entity)
    }

    /// Enemy under a freshly allocated networked id (level waves).
    #[allow(clippy::too_many_arguments)]
    pub fn enemy_auto(
        world: &mut World,
        kind: EnemyKind,
        x: f32,
        y: f32,
        vx: f32,
        vy: f32,
        initial_health: i32,
        with_render: bool,
    ) -> Result<EntityId, EcsError> {
        let entity = world.spawn("enemy", EntityScope::Networked);
        Self::enemy_components(world, entity, kind, x, y, vx, vy, initial_health, with_render)?;
        Ok(entity)
    }

    #[allow(clippy::too_many_arguments)]
    fn enemy_components(
        world: &mut World,
        entity: EntityId,
        kind: EnemyKind,
        x: f32,
        y: f32,
        vx: f32,
        vy: f32,
        initial_health: i32,
        with_render: bool,
    ) -> Result<(), EcsError> {
        world.add(entity, NetworkId::new(entity.raw()))?;
        world.add(entity, Transform::new(x, y))?;
        world.add(entity, Velocity::new(vx, vy))?;
        world.add(entity, Health::new(initial_health, initial_health))?;
        world.add(entity, HitBox::new(ENEMY_HITBOX.0, ENEMY_HITBOX.1))?;
        world.add(entity, Enemy { kind })?;
        let mut team = Team::new(TeamKind::Enemy);
        if kind == EnemyKind::Boss {
            team.join(TeamKind::Boss);
        }
        world.add(entity, team)?;
        world.add(
            entity,
            Weapon {
                kind: WeaponKind::Basic,
                fire_rate_ms: 1200,
                last_shot_ms: 0,
                damage: 10,
                projectile: ProjectileKind::Laser,
            },
        )?;
        world.add(entity, Self::enemy_ai(kind))?;
        if with_render {
            let asset_id = match kind {
                EnemyKind::Basic => assets::ENEMY_BASIC,
                EnemyKind::Fast => assets::ENEMY_FAST,
                EnemyKind::Tank => assets::ENEMY_TANK,
                EnemyKind::Boss => assets::ENEMY_BOSS,
            };
            world.add(entity, Sprite { asset_id, layer: 1 })?;
        }
        Ok(())
    }

    fn enemy_ai(kind: EnemyKind) -> Ai {
        match kind {
            EnemyKind::Basic => Ai::new(AiBehaviour::Formation, 400.0, 250.0),
            EnemyKind::Fast => Ai::new(AiBehaviour::Kamikaze, 600.0, 400.0),
            EnemyKind::Tank => Ai::new(AiBehaviour::ShooterTactic, 500.0, 350.0),
            EnemyKind::Boss => Ai::new(AiBehaviour::Zigzag, 900.0, 600.0),
        }
    }

    /// Projectile, always in the local id space. Projectiles never carry
    /// NetworkId; peers rebuild them from WEAPON_FIRE events.
    #[allow(clippy::too_many_arguments)]
    pub fn projectile(
        world: &mut World,
        x: f32,
        y: f32,
        vx: f32,
        vy: f32,
        shooter: EntityId,
        from_playable: bool,
        damage: i32,
        with_render: bool,
    ) -> Result<EntityId, EcsError> {
        let entity = world.spawn("projectile", EntityScope::Local);
        world.add(entity, Transform::new(x, y))?;
        world.add(entity, Velocity::new(vx, vy))?;
        world.add(
            entity,
            Projectile {
                shooter,
                from_playable,
                damage,
            },
        )?;
        world.add(
            entity,
            HitBox::new(PROJECTILE_HITBOX.0, PROJECTILE_HITBOX.1),
        )?;
        let team = if from_playable {
            Team::new(TeamKind::Player)
        } else {
            Team::new(TeamKind::Enemy)
        };
        world.add(entity, team)?;
        world.add(entity, Lifetime::new(PROJECTILE_LIFETIME_SECS))?;
        if with_render {
            world.add(
                entity,
                Sprite {
                    asset_id: assets::PROJECTILE,
                    layer: 2,
                },
            )?;
        }
        Ok(entity)
    }

    /// Collectible powerup under a preassigned networked id.
    pub fn powerup(
        world: &mut World,
        powerup_id: u32,
        kind: PowerupKind,
        x: f32,
        y: f32,
        with_render: bool,
    ) -> Result<EntityId, EcsError> {
        let entity = world.spawn_with_id(powerup_id, "powerup", EntityScope::Networked)?;
        world.add(entity, NetworkId::new(powerup_id))?;
        world.add(entity, Transform::new(x, y))?;
        world.add(entity, Velocity::new(-40.0, 0.0))?;
        world.add(entity, HitBox::new(32.0, 32.0))?;
        world.add(entity, Team::new(TeamKind::Powerup))?;
        world.add(
            entity,
            Powerup {
                kind,
                duration: 10.0,
            },
        )?;
        if with_render {
            world.add(
                entity,
                Sprite {
                    asset_id: assets::POWERUP,
                    layer: 1,
                },
            )?;
        }
        Ok(entity)
    }

    /// Server-side level entity driving wave progression.
    pub fn level(world: &mut World, waves: Vec<Wave>, duration_secs: f32) -> Result<EntityId, EcsError> {
        let entity = world.spawn("level", EntityScope::Local);
        world.add(
            entity,
            Level {
                waves,
                duration_secs,
                current_wave: 0,
                spawned_in_wave: 0,
                elapsed: 0.0,
                wave_clock: 0.0,
                completed: false,
                started: true,
            },
        )?;
        Ok(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projectiles_never_carry_network_id() {
        let mut world = World::new();
        EntityBuilders::register_components(&mut world);
        let shooter = world.spawn("shooter", EntityScope::Local);
        let projectile = EntityBuilders::projectile(
            &mut world, 10.0, 20.0, 600.0, 0.0, shooter, true, 10, false,
        )
        .unwrap();
        assert!(!world.has::<NetworkId>(projectile));
        assert!(world.has::<Projectile>(projectile));
        assert!(world.has::<Lifetime>(projectile));
        assert!(world.local_entities().contains(&projectile.raw()));
    }

    #[test]
    fn player_component_bundle() {
        let mut world = World::new();
        EntityBuilders::register_components(&mut world);
        let entity =
            EntityBuilders::player(&mut world, 7, 120.0, 240.0, 0.0, 0.0, 100, true, true).unwrap();
        assert_eq!(entity.raw(), 7);
        assert!(world.has::<Playable>(entity));
        assert!(world.has::<InputComponent>(entity));
        assert!(world.get::<NetworkId>(entity).unwrap().is_local);
        assert!(world.networked_entities().contains(&7));

        // The server-side replica of another player is not playable.
        let remote =
            EntityBuilders::player(&mut world, 8, 120.0, 360.0, 0.0, 0.0, 100, false, false)
                .unwrap();
        assert!(!world.has::<Playable>(remote));
        assert!(!world.get::<NetworkId>(remote).unwrap().is_local);
    }

    #[test]
    fn boss_is_both_enemy_and_boss_team() {
        let mut world = World::new();
        EntityBuilders::register_components(&mut world);
        let boss = EntityBuilders::enemy(
            &mut world,
            2000,
            EnemyKind::Boss,
            1800.0,
            500.0,
            -30.0,
            0.0,
            500,
            false,
        )
        .unwrap();
        let team = world.get::<Team>(boss).unwrap();
        assert!(team.has(TeamKind::Enemy));
        assert!(team.has(TeamKind::Boss));
    }
}
