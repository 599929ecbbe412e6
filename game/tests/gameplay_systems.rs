//! End-to-end behavior of the gameplay schedule on an authoritative
//! coordinator: prediction-relevant systems, collision outcomes, wave
//! spawning and projectile lifecycle.

use aster_game::{Coordinator, EntityBuilders, Role};
use aster_shared::{
    EnemySpawn, EntityId, EnemyKind, GameAction, Health, InputComponent, Lifetime, NetworkId,
    Score, Transform, Wave,
};

fn authoritative_coordinator() -> Coordinator {
    let mut coordinator = Coordinator::new(Role::Server, false);
    coordinator.register_systems().expect("schedule registers");
    coordinator
}

fn connect_player(coordinator: &mut Coordinator, player_id: u32) -> EntityId {
    let mut out = Vec::new();
    coordinator.on_player_connected(player_id, &mut out);
    EntityId::from_raw(player_id)
}

fn press(coordinator: &mut Coordinator, entity: EntityId, action: GameAction) {
    let input = coordinator
        .world_mut()
        .get_mut::<InputComponent>(entity)
        .expect("player has input");
    input.active_actions.insert(action, true);
}

#[test]
fn held_direction_moves_the_ship() {
    let mut coordinator = authoritative_coordinator();
    let player = connect_player(&mut coordinator, 1);
    let start_x = coordinator.world().get::<Transform>(player).unwrap().x;

    press(&mut coordinator, player, GameAction::MoveRight);
    for _ in 0..10 {
        coordinator.step(1.0 / 60.0);
    }
    let end_x = coordinator.world().get::<Transform>(player).unwrap().x;
    assert!(end_x > start_x, "{} should exceed {}", end_x, start_x);
}

#[test]
fn players_are_clamped_to_the_playfield() {
    let mut coordinator = authoritative_coordinator();
    let player = connect_player(&mut coordinator, 1);

    press(&mut coordinator, player, GameAction::MoveLeft);
    for _ in 0..600 {
        coordinator.step(1.0 / 60.0);
    }
    let transform = coordinator.world().get::<Transform>(player).unwrap();
    assert!(transform.x >= 0.0);
}

#[test]
fn fire_spawns_one_projectile_per_cooldown_window() {
    let mut coordinator = authoritative_coordinator();
    let player = connect_player(&mut coordinator, 1);
    press(&mut coordinator, player, GameAction::FirePrimary);

    // Several immediate ticks within one fire-rate window.
    for _ in 0..5 {
        coordinator.step(1.0 / 60.0);
    }
    let projectiles = coordinator
        .world()
        .local_entities()
        .iter()
        .copied()
        .map(EntityId::from_raw)
        .filter(|&entity| {
            coordinator
                .world()
                .has::<aster_shared::Projectile>(entity)
        })
        .count();
    assert_eq!(projectiles, 1);

    // The shot was queued for replication.
    let mut out = Vec::new();
    coordinator.build_server_packets(&mut out);
    assert!(out.iter().any(|outbound| {
        outbound.packet.header.packet_type == aster_shared::PacketType::WeaponFire as u8
    }));
}

#[test]
fn projectile_kill_awards_score_and_destroys_the_enemy() {
    let mut coordinator = authoritative_coordinator();
    let player = connect_player(&mut coordinator, 1);

    let enemy = EntityBuilders::enemy(
        coordinator.world_mut(),
        1000,
        EnemyKind::Basic,
        400.0,
        240.0,
        0.0,
        0.0,
        10,
        false,
    )
    .unwrap();
    // Park the enemy on top of a fresh projectile.
    EntityBuilders::projectile(
        coordinator.world_mut(),
        400.0,
        240.0,
        0.0,
        0.0,
        player,
        true,
        10,
        false,
    )
    .unwrap();

    coordinator.step(1.0 / 60.0);

    assert!(!coordinator.world().is_alive(enemy));
    // Score is applied by the score system and republished.
    let score = coordinator.world().get::<Score>(player).unwrap();
    assert_eq!(score.value, 100);

    let mut out = Vec::new();
    coordinator.build_server_packets(&mut out);
    let types: Vec<u8> = out
        .iter()
        .map(|outbound| outbound.packet.header.packet_type)
        .collect();
    assert!(types.contains(&(aster_shared::PacketType::EntityDestroy as u8)));
    assert!(types.contains(&(aster_shared::PacketType::ScoreUpdate as u8)));
}

#[test]
fn expired_projectiles_despawn() {
    let mut coordinator = authoritative_coordinator();
    let player = connect_player(&mut coordinator, 1);
    let projectile = EntityBuilders::projectile(
        coordinator.world_mut(),
        900.0,
        500.0,
        0.0,
        0.0,
        player,
        true,
        10,
        false,
    )
    .unwrap();
    // Shrink the fuse so the test does not simulate three seconds.
    coordinator
        .world_mut()
        .update(projectile, Lifetime::new(0.05))
        .unwrap();

    for _ in 0..10 {
        coordinator.step(1.0 / 60.0);
    }
    assert!(!coordinator.world().is_alive(projectile));
}

#[test]
fn level_waves_spawn_networked_enemies() {
    let mut coordinator = authoritative_coordinator();
    connect_player(&mut coordinator, 1);

    let waves = vec![Wave {
        start_time: 0.0,
        enemies: vec![
            EnemySpawn {
                kind: EnemyKind::Basic,
                x: 1800.0,
                y: 200.0,
                delay_after_previous: 0.0,
            },
            EnemySpawn {
                kind: EnemyKind::Fast,
                x: 1800.0,
                y: 400.0,
                delay_after_previous: 0.05,
            },
        ],
    }];
    EntityBuilders::level(coordinator.world_mut(), waves, 0.0).unwrap();

    for _ in 0..12 {
        coordinator.step(1.0 / 60.0);
    }

    let enemies: Vec<u32> = coordinator
        .world()
        .networked_entities()
        .iter()
        .copied()
        .filter(|&id| {
            coordinator
                .world()
                .has::<aster_shared::Enemy>(EntityId::from_raw(id))
        })
        .collect();
    assert_eq!(enemies.len(), 2);
    for id in enemies {
        assert!(coordinator
            .world()
            .has::<NetworkId>(EntityId::from_raw(id)));
    }
}

#[test]
fn dead_players_stop_but_are_not_despawned() {
    let mut coordinator = authoritative_coordinator();
    let player = connect_player(&mut coordinator, 1);
    let enemy_shooter = EntityBuilders::enemy(
        coordinator.world_mut(),
        1000,
        EnemyKind::Tank,
        1500.0,
        240.0,
        0.0,
        0.0,
        90,
        false,
    )
    .unwrap();

    // Enough enemy projectiles on the player to overkill.
    let player_pos = *coordinator.world().get::<Transform>(player).unwrap();
    for _ in 0..12 {
        EntityBuilders::projectile(
            coordinator.world_mut(),
            player_pos.x,
            player_pos.y,
            0.0,
            0.0,
            enemy_shooter,
            false,
            10,
            false,
        )
        .unwrap();
    }
    for _ in 0..3 {
        coordinator.step(1.0 / 60.0);
    }

    assert!(coordinator.world().is_alive(player));
    assert!(coordinator.world().has::<aster_shared::DeadPlayer>(player));
    let health = coordinator.world().get::<Health>(player).unwrap();
    assert!(health.current <= 0);
}
