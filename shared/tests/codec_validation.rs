//! Codec-level guarantees: well-formed packets survive a byte-exact
//! round-trip, malformed ones are rejected before any state is touched.

use aster_shared::{
    codec, flags, Ack, ClientConnect, ClientDisconnect, EntityDestroy, EntitySpawn, Heartbeat,
    Packet, PacketType, PlayerInput, ServerAccept, ServerReject, Snapshot, TransformData,
    WeaponFire, HEADER_SIZE, PROTOCOL_MAGIC,
};
use aster_shared::{DestroyReason, DisconnectReason, EntityKind, RejectCode, WeaponKind};

fn flat_args(sequence: u32, timestamp: u32, payload: &[u8]) -> Vec<u8> {
    let mut args = vec![0u8];
    args.extend_from_slice(&sequence.to_le_bytes());
    args.extend_from_slice(&timestamp.to_le_bytes());
    args.extend_from_slice(payload);
    args
}

fn reliable_args(sequence: u32, timestamp: u32, payload: &[u8]) -> Vec<u8> {
    let mut args = vec![1u8, flags::RELIABLE];
    args.extend_from_slice(&sequence.to_le_bytes());
    args.extend_from_slice(&timestamp.to_le_bytes());
    args.extend_from_slice(payload);
    args
}

#[test]
fn serialize_deserialize_is_byte_exact_for_every_fixed_packet() {
    let cases: Vec<(PacketType, Vec<u8>)> = vec![
        (
            PacketType::ClientConnect,
            ClientConnect {
                protocol_version: 1,
                player_name: "Ada".into(),
                client_id: 777,
            }
            .write(),
        ),
        (
            PacketType::ServerAccept,
            ServerAccept {
                assigned_player_id: 1,
                max_players: 16,
                game_instance_id: 0xDEADBEEF,
                server_tickrate: 60,
            }
            .write(),
        ),
        (
            PacketType::ServerReject,
            ServerReject {
                reject_code: RejectCode::ServerFull,
                reason_message: "server is full".into(),
            }
            .write(),
        ),
        (
            PacketType::ClientDisconnect,
            ClientDisconnect {
                client_id: 4,
                reason: DisconnectReason::Normal,
            }
            .write(),
        ),
        (PacketType::Heartbeat, Heartbeat { player_id: 3 }.write()),
        (
            PacketType::PlayerInput,
            PlayerInput {
                player_id: 2,
                input_state: 0x0011,
                aim_x: 500,
                aim_y: 300,
            }
            .write(),
        ),
        (
            PacketType::EntitySpawn,
            EntitySpawn {
                entity_id: 1000,
                entity_kind: EntityKind::Player,
                position_x: 120,
                position_y: 360,
                mob_variant: 0,
                initial_health: 100,
                initial_velocity_x: 0,
                initial_velocity_y: 0,
                is_playable: true,
            }
            .write(),
        ),
        (
            PacketType::EntityDestroy,
            EntityDestroy {
                entity_id: 1000,
                reason: DestroyReason::KilledByPlayer,
                final_position_x: 50,
                final_position_y: 60,
            }
            .write(),
        ),
        (
            PacketType::WeaponFire,
            WeaponFire {
                shooter_id: 1,
                projectile_id: 9000,
                origin_x: 10,
                origin_y: 20,
                direction_x: 1000,
                direction_y: 0,
                weapon_type: WeaponKind::Basic,
            }
            .write(),
        ),
        (
            PacketType::Ack,
            Ack {
                acked_sequence: 40,
                received_timestamp: 123,
                client_id: 2,
            }
            .write(),
        ),
    ];

    for (packet_type, payload) in cases {
        let packet = codec::create_packet(packet_type, &flat_args(9, 5000, &payload))
            .unwrap_or_else(|e| panic!("build {:?} failed: {e}", packet_type));
        let bytes = packet.serialize();
        let back = Packet::deserialize(&bytes).expect("deserialize");
        assert_eq!(back, packet, "round trip mismatch for {:?}", packet_type);
        assert_eq!(back.serialize(), bytes);
        assert_eq!(codec::process_packet(&back).unwrap(), packet_type);
    }
}

#[test]
fn reliable_flag_is_carried_in_the_header() {
    let payload = EntitySpawn {
        entity_id: 5,
        entity_kind: EntityKind::Enemy,
        position_x: 0,
        position_y: 0,
        mob_variant: 1,
        initial_health: 30,
        initial_velocity_x: 0,
        initial_velocity_y: 0,
        is_playable: false,
    }
    .write();
    let packet =
        codec::create_packet(PacketType::EntitySpawn, &reliable_args(1, 2, &payload)).unwrap();
    assert_eq!(packet.header.flags & flags::RELIABLE, flags::RELIABLE);
}

#[test]
fn bad_magic_is_dropped() {
    let mut bytes = codec::create_packet(
        PacketType::Heartbeat,
        &flat_args(0, 0, &Heartbeat { player_id: 1 }.write()),
    )
    .unwrap()
    .serialize();
    bytes[0] = 0x00;
    bytes[1] = 0x00;
    assert!(Packet::deserialize(&bytes).is_err());
}

#[test]
fn unknown_type_is_dropped() {
    let packet = codec::make_packet(PacketType::Heartbeat, 0, 0, 0, vec![0, 0, 0, 0]);
    let mut bytes = packet.serialize();
    bytes[2] = 0x7F; // not in the table
    let parsed = Packet::deserialize(&bytes).unwrap();
    assert!(codec::process_packet(&parsed).is_err());
}

#[test]
fn short_payload_is_dropped() {
    let packet = codec::make_packet(PacketType::ServerAccept, 0, 0, 0, vec![1, 2, 3]);
    assert!(codec::process_packet(&packet).is_err());
}

#[test]
fn out_of_range_enum_is_dropped() {
    let mut payload = ClientDisconnect {
        client_id: 1,
        reason: DisconnectReason::Normal,
    }
    .write();
    *payload.last_mut().unwrap() = 0x42; // not a DisconnectReason
    let packet = codec::make_packet(PacketType::ClientDisconnect, 0, 0, 0, payload);
    assert!(codec::process_packet(&packet).is_err());
}

#[test]
fn datagram_below_header_size_is_dropped() {
    assert!(Packet::deserialize(&[0x54, 0x52, 0x05, 0x00]).is_err());
    assert!(HEADER_SIZE == 12);
}

#[test]
fn snapshot_payload_matches_declared_layout() {
    // Entities [10, 11, 12] at world tick 42 (the normative example).
    let mut snapshot = Snapshot::full(42);
    for (id, (x, y)) in [(10u32, (100, 50)), (11, (200, 150)), (12, (300, 250))] {
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
    let payload = snapshot.encode();
    let packet = codec::create_packet(PacketType::TransformSnapshot, &flat_args(42, 0, &payload))
        .expect("snapshot build");
    assert_eq!(codec::process_packet(&packet).unwrap(), PacketType::TransformSnapshot);

    // world_tick then entity_count then 12-byte records, all little-endian.
    assert_eq!(&packet.payload[0..4], &42u32.to_le_bytes());
    assert_eq!(&packet.payload[4..6], &3u16.to_le_bytes());
    assert_eq!(packet.payload.len(), 6 + 3 * 12);
    assert_eq!(&packet.payload[6..10], &10u32.to_le_bytes());

    let decoded = Snapshot::<TransformData>::decode(&packet.payload, false, 0x24).unwrap();
    assert_eq!(decoded.world_tick, 42);
    assert_eq!(
        decoded.entries.iter().map(|(id, _)| *id).collect::<Vec<_>>(),
        vec![10, 11, 12]
    );
}

#[test]
fn snapshot_with_lying_entity_count_is_rejected() {
    let mut snapshot = Snapshot::full(1);
    snapshot.push(
        1,
        TransformData {
            pos_x: 0,
            pos_y: 0,
            rotation: 0,
            scale: 1000,
        },
    );
    let mut payload = snapshot.encode();
    // Claim 5 entities while carrying one.
    payload[4..6].copy_from_slice(&5u16.to_le_bytes());
    let packet = codec::make_packet(PacketType::TransformSnapshot, 0, 0, 0, payload);
    assert!(codec::process_packet(&packet).is_err());
}

#[test]
fn magic_constant_spells_rt() {
    assert_eq!(PROTOCOL_MAGIC, 0x5254);
}
