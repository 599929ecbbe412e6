//! Replication behavior of the coordinator: spawn fan-out, snapshot
//! emission, weapon-fire reconstruction and input anti-echo.

use aster_game::{Addressing, Coordinator, EntityBuilders, OutboundPacket, Role};
use aster_shared::{
    codec, EntityId, EntityKind, EntitySpawn, EnemyKind, NetworkId, Packet, PacketType,
    PlayerInput, PlayerReady, Snapshot, Transform, TransformData, Velocity, WeaponFire, WeaponKind,
};

fn packets_of(out: &[OutboundPacket], packet_type: PacketType) -> Vec<&OutboundPacket> {
    out.iter()
        .filter(|outbound| outbound.packet.header.packet_type == packet_type as u8)
        .collect()
}

fn server_coordinator() -> Coordinator {
    Coordinator::new(Role::Server, false)
}

fn client_coordinator() -> Coordinator {
    Coordinator::new(Role::Client, true)
}

#[test]
fn player_connect_fans_out_spawns_with_owner_only_playable_flag() {
    let mut coordinator = server_coordinator();
    let mut out = Vec::new();

    coordinator.on_player_connected(1, &mut out);
    // First player: one copy to the owner (playable), one to everyone else.
    let spawns = packets_of(&out, PacketType::EntitySpawn);
    assert_eq!(spawns.len(), 2);
    for outbound in &spawns {
        let spawn = EntitySpawn::parse(&outbound.packet.payload).unwrap();
        assert_eq!(spawn.entity_id, 1);
        match outbound.addressing {
            Addressing::To(1) => assert!(spawn.is_playable),
            Addressing::Except(1) => assert!(!spawn.is_playable),
            other => panic!("unexpected addressing {:?}", other),
        }
    }

    // Second player: newcomer also receives one spawn per existing player,
    // never flagged playable.
    let mut out2 = Vec::new();
    coordinator.on_player_connected(2, &mut out2);
    let spawns2 = packets_of(&out2, PacketType::EntitySpawn);
    assert_eq!(spawns2.len(), 3);
    let to_newcomer_existing: Vec<_> = spawns2
        .iter()
        .filter(|outbound| {
            outbound.addressing == Addressing::To(2)
                && EntitySpawn::parse(&outbound.packet.payload).unwrap().entity_id == 1
        })
        .collect();
    assert_eq!(to_newcomer_existing.len(), 1);
    assert!(!EntitySpawn::parse(&to_newcomer_existing[0].packet.payload)
        .unwrap()
        .is_playable);
}

#[test]
fn transform_snapshot_covers_exactly_live_networked_transform_carriers() {
    let mut coordinator = server_coordinator();
    let mut out = Vec::new();
    coordinator.on_player_connected(1, &mut out);
    EntityBuilders::enemy(
        coordinator.world_mut(),
        1000,
        EnemyKind::Basic,
        800.0,
        300.0,
        -80.0,
        0.0,
        30,
        false,
    )
    .unwrap();
    // A local projectile must never appear in snapshots.
    let shooter = EntityId::from_raw(1);
    EntityBuilders::projectile(
        coordinator.world_mut(),
        10.0,
        20.0,
        600.0,
        0.0,
        shooter,
        true,
        10,
        false,
    )
    .unwrap();

    let mut tick_out = Vec::new();
    coordinator.build_server_packets(&mut tick_out);

    let snapshots = packets_of(&tick_out, PacketType::TransformSnapshot);
    assert_eq!(snapshots.len(), 1);
    let snapshot =
        Snapshot::<TransformData>::decode(&snapshots[0].packet.payload, false, 0x24).unwrap();
    let mut snapshot_ids: Vec<u32> = snapshot.entries.iter().map(|(id, _)| *id).collect();
    snapshot_ids.sort_unstable();

    let mut expected: Vec<u32> = coordinator
        .world()
        .networked_entities()
        .iter()
        .copied()
        .filter(|&id| coordinator.world().has::<Transform>(EntityId::from_raw(id)))
        .collect();
    expected.sort_unstable();

    assert_eq!(snapshot_ids, expected);
    assert_eq!(snapshot_ids, vec![1, 1000]);
}

#[test]
fn new_networked_entities_are_broadcast_exactly_once() {
    let mut coordinator = server_coordinator();
    EntityBuilders::enemy_auto(
        coordinator.world_mut(),
        EnemyKind::Fast,
        1900.0,
        200.0,
        -120.0,
        0.0,
        15,
        false,
    )
    .unwrap();

    let mut first = Vec::new();
    coordinator.build_server_packets(&mut first);
    assert_eq!(packets_of(&first, PacketType::EntitySpawn).len(), 1);

    let mut second = Vec::new();
    coordinator.build_server_packets(&mut second);
    assert!(packets_of(&second, PacketType::EntitySpawn).is_empty());
}

#[test]
fn relayed_input_skips_its_source() {
    let mut coordinator = server_coordinator();
    let mut out = Vec::new();
    coordinator.on_player_connected(1, &mut out);
    coordinator.on_player_connected(2, &mut out);

    let input = PlayerInput {
        player_id: 1,
        input_state: aster_shared::input_flags::MOVE_UP,
        aim_x: 0,
        aim_y: 0,
    };
    let packet = codec::make_packet(PacketType::PlayerInput, 0, 0, 0, input.write());
    coordinator.process_server_packet(&packet, 1);

    let mut tick_out = Vec::new();
    coordinator.build_server_packets(&mut tick_out);
    let relays = packets_of(&tick_out, PacketType::PlayerInput);
    assert_eq!(relays.len(), 1);
    assert_eq!(relays[0].addressing, Addressing::Except(1));
}

#[test]
fn spoofed_input_is_dropped() {
    let mut coordinator = server_coordinator();
    let mut out = Vec::new();
    coordinator.on_player_connected(1, &mut out);
    coordinator.on_player_connected(2, &mut out);

    let input = PlayerInput {
        player_id: 2,
        input_state: aster_shared::input_flags::MOVE_UP,
        aim_x: 0,
        aim_y: 0,
    };
    let packet = codec::make_packet(PacketType::PlayerInput, 0, 0, 0, input.write());
    coordinator.process_server_packet(&packet, 1);

    let mut tick_out = Vec::new();
    coordinator.build_server_packets(&mut tick_out);
    assert!(packets_of(&tick_out, PacketType::PlayerInput).is_empty());
}

#[test]
fn all_players_ready_starts_the_game_once() {
    let mut coordinator = server_coordinator();
    let mut out = Vec::new();
    coordinator.on_player_connected(1, &mut out);
    coordinator.on_player_connected(2, &mut out);
    coordinator.set_game_instance_id(0xABCD);

    for player in [1u32, 2] {
        let payload = PlayerReady { player_id: player };
        let packet = codec::make_packet(PacketType::PlayerIsReady, 0, 0, 0, payload.write());
        coordinator.process_server_packet(&packet, player);
    }

    let mut tick_out = Vec::new();
    coordinator.maybe_start_game(&[1, 2], &mut tick_out);
    assert_eq!(packets_of(&tick_out, PacketType::GameStart).len(), 1);
    assert!(coordinator.game_running());

    let mut again = Vec::new();
    coordinator.maybe_start_game(&[1, 2], &mut again);
    assert!(packets_of(&again, PacketType::GameStart).is_empty());
}

#[test]
fn disconnect_destroys_the_player_once_and_broadcasts_it() {
    let mut coordinator = server_coordinator();
    let mut out = Vec::new();
    coordinator.on_player_connected(1, &mut out);
    coordinator.on_player_connected(2, &mut out);

    let mut destroy_out = Vec::new();
    coordinator.on_player_disconnected(
        1,
        aster_shared::DestroyReason::TimeoutDespawn,
        &mut destroy_out,
    );

    let destroys = packets_of(&destroy_out, PacketType::EntityDestroy);
    assert_eq!(destroys.len(), 1);
    assert_eq!(destroys[0].addressing, Addressing::Broadcast);
    let destroy = aster_shared::EntityDestroy::parse(&destroys[0].packet.payload).unwrap();
    assert_eq!(destroy.entity_id, 1);
    assert!(!coordinator.world().is_alive(EntityId::from_raw(1)));
    assert!(coordinator.world().is_alive(EntityId::from_raw(2)));

    // A second disconnect for the same player does nothing further.
    let mut again = Vec::new();
    coordinator.on_player_disconnected(
        1,
        aster_shared::DestroyReason::TimeoutDespawn,
        &mut again,
    );
    assert!(again.is_empty());
}

// ------------------------------------------------------------------
// Client side
// ------------------------------------------------------------------

fn spawn_packet(entity_id: u32, kind: EntityKind, x: u16, y: u16, playable: bool) -> Packet {
    let spawn = EntitySpawn {
        entity_id,
        entity_kind: kind,
        position_x: x,
        position_y: y,
        mob_variant: 0,
        initial_health: 100,
        initial_velocity_x: 0,
        initial_velocity_y: 0,
        is_playable: playable,
    };
    codec::make_packet(PacketType::EntitySpawn, 0, 0, 0, spawn.write())
}

fn transform_snapshot_packet(world_tick: u32, entries: &[(u32, i16, i16)]) -> Packet {
    let mut snapshot = Snapshot::full(world_tick);
    for &(id, x, y) in entries {
        snapshot.push(
            id,
            TransformData {
                pos_x: x,
                pos_y: y,
                rotation: 0,
                scale: 1000,
            },
        );
    }
    codec::make_packet(PacketType::TransformSnapshot, 0, 0, 0, snapshot.encode())
}

#[test]
fn client_applies_snapshot_values_and_discards_stale_ticks() {
    let mut coordinator = client_coordinator();
    for id in [10u32, 11, 12] {
        coordinator.process_client_packet(&spawn_packet(id, EntityKind::Enemy, 0, 0, false));
    }

    let snapshot = transform_snapshot_packet(42, &[(10, 100, 50), (11, 200, 150), (12, 300, 250)]);
    coordinator.process_client_packet(&snapshot);

    for (id, x, y) in [(10u32, 100.0, 50.0), (11, 200.0, 150.0), (12, 300.0, 250.0)] {
        let transform = coordinator
            .world()
            .get::<Transform>(EntityId::from_raw(id))
            .unwrap();
        assert_eq!((transform.x, transform.y), (x, y));
    }

    // An older snapshot must not roll entity 10 backwards.
    let stale = transform_snapshot_packet(41, &[(10, 1, 1)]);
    coordinator.process_client_packet(&stale);
    let transform = coordinator
        .world()
        .get::<Transform>(EntityId::from_raw(10))
        .unwrap();
    assert_eq!((transform.x, transform.y), (100.0, 50.0));
}

#[test]
fn client_rebuilds_remote_projectiles_from_weapon_fire() {
    let mut coordinator = client_coordinator();
    coordinator.process_client_packet(&spawn_packet(1, EntityKind::Player, 100, 100, true));
    coordinator.process_client_packet(&spawn_packet(2, EntityKind::Player, 100, 400, false));
    assert_eq!(coordinator.local_player(), 1);

    let fire = WeaponFire {
        shooter_id: 2,
        projectile_id: 77,
        origin_x: 10,
        origin_y: 20,
        direction_x: 1000,
        direction_y: 0,
        weapon_type: WeaponKind::Basic,
    };
    let packet = codec::make_packet(PacketType::WeaponFire, 0, 0, 0, fire.write());

    let locals_before = coordinator.world().local_entities().len();
    coordinator.process_client_packet(&packet);
    let locals_after = coordinator.world().local_entities().len();
    assert_eq!(locals_after, locals_before + 1);

    // The reconstructed projectile moves at direction × weapon speed and
    // carries no NetworkId.
    let projectile_id = coordinator
        .world()
        .local_entities()
        .iter()
        .copied()
        .map(EntityId::from_raw)
        .find(|&entity| coordinator.world().has::<aster_shared::Projectile>(entity))
        .expect("projectile spawned");
    let velocity = coordinator.world().get::<Velocity>(projectile_id).unwrap();
    assert_eq!(velocity.vx, WeaponKind::Basic.projectile_speed());
    assert_eq!(velocity.vy, 0.0);
    let transform = coordinator.world().get::<Transform>(projectile_id).unwrap();
    assert_eq!((transform.x, transform.y), (10.0, 20.0));
    assert!(!coordinator.world().has::<NetworkId>(projectile_id));
}

#[test]
fn client_ignores_weapon_fire_for_its_own_predicted_shot() {
    let mut coordinator = client_coordinator();
    coordinator.process_client_packet(&spawn_packet(1, EntityKind::Player, 100, 100, true));

    let fire = WeaponFire {
        shooter_id: 1,
        projectile_id: 78,
        origin_x: 140,
        origin_y: 100,
        direction_x: 1000,
        direction_y: 0,
        weapon_type: WeaponKind::Basic,
    };
    let packet = codec::make_packet(PacketType::WeaponFire, 0, 0, 0, fire.write());
    let locals_before = coordinator.world().local_entities().len();
    coordinator.process_client_packet(&packet);
    assert_eq!(coordinator.world().local_entities().len(), locals_before);
}

#[test]
fn client_emits_input_for_the_local_player() {
    let mut coordinator = client_coordinator();
    coordinator.process_client_packet(&spawn_packet(1, EntityKind::Player, 100, 100, true));
    coordinator.set_local_action(aster_shared::GameAction::MoveUp, true);

    let mut out = Vec::new();
    coordinator.build_client_packets(&mut out);
    let inputs: Vec<_> = out
        .iter()
        .filter(|packet| packet.header.packet_type == PacketType::PlayerInput as u8)
        .collect();
    assert_eq!(inputs.len(), 1);
    let input = PlayerInput::parse(&inputs[0].payload).unwrap();
    assert_eq!(input.player_id, 1);
    assert_ne!(input.input_state & aster_shared::input_flags::MOVE_UP, 0);
}

#[test]
fn duplicate_spawn_for_live_entity_is_ignored() {
    let mut coordinator = client_coordinator();
    coordinator.process_client_packet(&spawn_packet(5, EntityKind::Enemy, 50, 50, false));
    coordinator.process_client_packet(&spawn_packet(5, EntityKind::Enemy, 500, 500, false));
    let transform = coordinator
        .world()
        .get::<Transform>(EntityId::from_raw(5))
        .unwrap();
    assert_eq!((transform.x, transform.y), (50.0, 50.0));
}
