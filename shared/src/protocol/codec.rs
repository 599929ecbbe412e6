//! Table-driven packet codec. One entry per supported packet type, each
//! carrying a validator (applied to received packets) and a builder
//! (producing outgoing packets from a flat argument buffer).
//!
//! Builder argument layout, shared by every entry:
//!
//! `[flags_count u8][flags u8 × flags_count][sequence u32 LE][timestamp u32 LE][payload …]`
//!
//! The flag bytes are OR-combined into the header flags field.

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};
use log::warn;

use super::packet::{Packet, PacketHeader};
use super::payload::*;
use super::snapshot::{
    AiData, AnimationData, HealthData, Snapshot, TransformData, VelocityData, WeaponData,
};
use super::types::{PacketType, AUDIO_EFFECT_MAX, VISUAL_EFFECT_MAX};
use super::PROTOCOL_MAGIC;
use crate::error::ProtocolError;

/// One dispatch-table entry.
pub struct PacketHandler {
    pub packet_type: PacketType,
    /// Returns true iff the payload is well-formed for this type.
    pub validate: fn(&Packet) -> bool,
    /// Builds a packet of this type from the flat argument buffer.
    pub build: fn(&[u8]) -> Result<Packet, ProtocolError>,
}

/// Linear lookup over the handler table. ~38 entries, negligible next to
/// socket costs.
pub fn find_handler(packet_type: PacketType) -> Option<&'static PacketHandler> {
    PACKET_HANDLERS
        .iter()
        .find(|handler| handler.packet_type == packet_type)
}

/// Validates a received packet: magic, known type, payload size and
/// enum-coded field ranges. Malformed packets are reported, never applied.
pub fn process_packet(packet: &Packet) -> Result<PacketType, ProtocolError> {
    if packet.header.magic != PROTOCOL_MAGIC {
        return Err(ProtocolError::BadMagic {
            found: packet.header.magic,
            expected: PROTOCOL_MAGIC,
        });
    }
    let packet_type = PacketType::from_u8(packet.header.packet_type)
        .ok_or(ProtocolError::UnknownPacketType(packet.header.packet_type))?;
    let handler = find_handler(packet_type)
        .ok_or(ProtocolError::UnknownPacketType(packet.header.packet_type))?;
    if (handler.validate)(packet) {
        Ok(packet_type)
    } else {
        warn!(
            "dropping malformed packet type=0x{:02X} payload_len={}",
            packet.header.packet_type,
            packet.payload.len()
        );
        Err(ProtocolError::ValidationFailed(packet.header.packet_type))
    }
}

/// Builds an outgoing packet of the given type from the flat argument
/// buffer described in the module docs.
pub fn create_packet(packet_type: PacketType, args: &[u8]) -> Result<Packet, ProtocolError> {
    let handler = find_handler(packet_type)
        .ok_or(ProtocolError::UnknownPacketType(packet_type as u8))?;
    (handler.build)(args)
}

/// Direct packet construction, for callers that already hold a payload.
pub fn make_packet(
    packet_type: PacketType,
    flags: u8,
    sequence_number: u32,
    timestamp: u32,
    payload: Vec<u8>,
) -> Packet {
    Packet::new(
        PacketHeader::new(packet_type as u8, flags, sequence_number, timestamp),
        payload,
    )
}

// ------------------------------------------------------------------
// Builder plumbing
// ------------------------------------------------------------------

struct BuildArgs<'a> {
    flags: u8,
    sequence_number: u32,
    timestamp: u32,
    payload: &'a [u8],
}

fn split_args(packet_type: PacketType, args: &[u8]) -> Result<BuildArgs<'_>, ProtocolError> {
    let malformed = ProtocolError::MalformedBuildArgs(packet_type as u8);
    let &flags_count = args.first().ok_or_else(|| malformed.clone())?;
    let flags_count = flags_count as usize;
    if args.len() < 1 + flags_count + 8 {
        return Err(malformed);
    }
    let mut flags = 0u8;
    for &flag in &args[1..1 + flags_count] {
        flags |= flag;
    }
    let mut cursor = Cursor::new(&args[1 + flags_count..1 + flags_count + 8]);
    let sequence_number = cursor
        .read_u32::<LittleEndian>()
        .map_err(|_| malformed.clone())?;
    let timestamp = cursor.read_u32::<LittleEndian>().map_err(|_| malformed)?;
    Ok(BuildArgs {
        flags,
        sequence_number,
        timestamp,
        payload: &args[1 + flags_count + 8..],
    })
}

/// Builds a fixed-size packet; the payload slice must match exactly.
fn build_exact(
    packet_type: PacketType,
    expected: usize,
    args: &[u8],
) -> Result<Packet, ProtocolError> {
    let parts = split_args(packet_type, args)?;
    if parts.payload.len() != expected {
        return Err(ProtocolError::MalformedBuildArgs(packet_type as u8));
    }
    Ok(make_packet(
        packet_type,
        parts.flags,
        parts.sequence_number,
        parts.timestamp,
        parts.payload.to_vec(),
    ))
}

/// Builds a variable-size packet with a minimum payload size.
fn build_min(
    packet_type: PacketType,
    minimum: usize,
    args: &[u8],
) -> Result<Packet, ProtocolError> {
    let parts = split_args(packet_type, args)?;
    if parts.payload.len() < minimum {
        return Err(ProtocolError::MalformedBuildArgs(packet_type as u8));
    }
    Ok(make_packet(
        packet_type,
        parts.flags,
        parts.sequence_number,
        parts.timestamp,
        parts.payload.to_vec(),
    ))
}

// ------------------------------------------------------------------
// Per-type validators and builders
// ------------------------------------------------------------------

macro_rules! fixed_payload_entry {
    ($validate:ident, $build:ident, $packet_type:expr, $payload:ty) => {
        fn $validate(packet: &Packet) -> bool {
            packet.payload.len() == <$payload>::PAYLOAD_SIZE
                && <$payload>::parse(&packet.payload).is_ok()
        }

        fn $build(args: &[u8]) -> Result<Packet, ProtocolError> {
            build_exact($packet_type, <$payload>::PAYLOAD_SIZE, args)
        }
    };
}

fixed_payload_entry!(
    validate_client_connect,
    build_client_connect,
    PacketType::ClientConnect,
    ClientConnect
);
fixed_payload_entry!(
    validate_server_accept,
    build_server_accept,
    PacketType::ServerAccept,
    ServerAccept
);
fixed_payload_entry!(
    validate_server_reject,
    build_server_reject,
    PacketType::ServerReject,
    ServerReject
);
fixed_payload_entry!(
    validate_client_disconnect,
    build_client_disconnect,
    PacketType::ClientDisconnect,
    ClientDisconnect
);
fixed_payload_entry!(
    validate_heartbeat,
    build_heartbeat,
    PacketType::Heartbeat,
    Heartbeat
);
fixed_payload_entry!(
    validate_entity_spawn,
    build_entity_spawn,
    PacketType::EntitySpawn,
    EntitySpawn
);
fixed_payload_entry!(
    validate_entity_destroy,
    build_entity_destroy,
    PacketType::EntityDestroy,
    EntityDestroy
);
fixed_payload_entry!(
    validate_component_remove,
    build_component_remove,
    PacketType::ComponentRemove,
    ComponentRemove
);
fixed_payload_entry!(
    validate_player_hit,
    build_player_hit,
    PacketType::PlayerHit,
    PlayerHit
);
fixed_payload_entry!(
    validate_player_death,
    build_player_death,
    PacketType::PlayerDeath,
    PlayerDeath
);
fixed_payload_entry!(
    validate_score_update,
    build_score_update,
    PacketType::ScoreUpdate,
    ScoreUpdate
);
fixed_payload_entry!(
    validate_powerup_pickup,
    build_powerup_pickup,
    PacketType::PowerupPickup,
    PowerupPickup
);
fixed_payload_entry!(
    validate_weapon_fire,
    build_weapon_fire,
    PacketType::WeaponFire,
    WeaponFire
);
fixed_payload_entry!(
    validate_particle_spawn,
    build_particle_spawn,
    PacketType::ParticleSpawn,
    ParticleSpawn
);
fixed_payload_entry!(
    validate_game_start,
    build_game_start,
    PacketType::GameStart,
    GameStart
);
fixed_payload_entry!(validate_game_end, build_game_end, PacketType::GameEnd, GameEnd);
fixed_payload_entry!(
    validate_level_complete,
    build_level_complete,
    PacketType::LevelComplete,
    LevelComplete
);
fixed_payload_entry!(
    validate_level_start,
    build_level_start,
    PacketType::LevelStart,
    LevelStart
);
fixed_payload_entry!(
    validate_force_state,
    build_force_state,
    PacketType::ForceState,
    ForceState
);
fixed_payload_entry!(validate_ai_state, build_ai_state, PacketType::AiState, AiState);
fixed_payload_entry!(validate_ack, build_ack, PacketType::Ack, Ack);
fixed_payload_entry!(validate_ping, build_ping, PacketType::Ping, Ping);
fixed_payload_entry!(validate_pong, build_pong, PacketType::Pong, Pong);

fn validate_player_input(packet: &Packet) -> bool {
    if packet.payload.len() != PlayerInput::PAYLOAD_SIZE {
        return false;
    }
    match PlayerInput::parse(&packet.payload) {
        Ok(input) => input.input_state & !super::types::input_flags::VALID_MASK == 0,
        Err(_) => false,
    }
}

fn build_player_input(args: &[u8]) -> Result<Packet, ProtocolError> {
    build_exact(PacketType::PlayerInput, PlayerInput::PAYLOAD_SIZE, args)
}

fn validate_visual_effect(packet: &Packet) -> bool {
    packet.payload.len() == VisualEffect::PAYLOAD_SIZE
        && match VisualEffect::parse(&packet.payload) {
            Ok(effect) => effect.effect_type <= VISUAL_EFFECT_MAX,
            Err(_) => false,
        }
}

fn build_visual_effect(args: &[u8]) -> Result<Packet, ProtocolError> {
    build_exact(PacketType::VisualEffect, VisualEffect::PAYLOAD_SIZE, args)
}

fn validate_audio_effect(packet: &Packet) -> bool {
    packet.payload.len() == AudioEffect::PAYLOAD_SIZE
        && match AudioEffect::parse(&packet.payload) {
            Ok(effect) => effect.effect_type <= AUDIO_EFFECT_MAX,
            Err(_) => false,
        }
}

fn build_audio_effect(args: &[u8]) -> Result<Packet, ProtocolError> {
    build_exact(PacketType::AudioEffect, AudioEffect::PAYLOAD_SIZE, args)
}

fn validate_component_add(packet: &Packet) -> bool {
    ComponentAdd::parse(&packet.payload).is_ok()
}

fn build_component_add(args: &[u8]) -> Result<Packet, ProtocolError> {
    build_min(PacketType::ComponentAdd, ComponentAdd::MIN_PAYLOAD_SIZE, args)
}

fn validate_entity_full_state(packet: &Packet) -> bool {
    EntityFullState::parse(&packet.payload).is_ok()
}

fn build_entity_full_state(args: &[u8]) -> Result<Packet, ProtocolError> {
    build_min(
        PacketType::EntityFullState,
        EntityFullState::MIN_PAYLOAD_SIZE,
        args,
    )
}

macro_rules! snapshot_entry {
    ($validate:ident, $build:ident, $packet_type:expr, $data:ty, $delta:expr) => {
        fn $validate(packet: &Packet) -> bool {
            Snapshot::<$data>::validate(&packet.payload, $delta)
        }

        fn $build(args: &[u8]) -> Result<Packet, ProtocolError> {
            let minimum = if $delta {
                Snapshot::<$data>::DELTA_HEADER_SIZE
            } else {
                Snapshot::<$data>::FULL_HEADER_SIZE
            };
            let packet = build_min($packet_type, minimum, args)?;
            if Snapshot::<$data>::validate(&packet.payload, $delta) {
                Ok(packet)
            } else {
                Err(ProtocolError::MalformedBuildArgs($packet_type as u8))
            }
        }
    };
}

snapshot_entry!(
    validate_transform_snapshot,
    build_transform_snapshot,
    PacketType::TransformSnapshot,
    TransformData,
    false
);
snapshot_entry!(
    validate_velocity_snapshot,
    build_velocity_snapshot,
    PacketType::VelocitySnapshot,
    VelocityData,
    false
);
snapshot_entry!(
    validate_health_snapshot,
    build_health_snapshot,
    PacketType::HealthSnapshot,
    HealthData,
    false
);
snapshot_entry!(
    validate_weapon_snapshot,
    build_weapon_snapshot,
    PacketType::WeaponSnapshot,
    WeaponData,
    false
);
snapshot_entry!(
    validate_ai_snapshot,
    build_ai_snapshot,
    PacketType::AiSnapshot,
    AiData,
    false
);
snapshot_entry!(
    validate_animation_snapshot,
    build_animation_snapshot,
    PacketType::AnimationSnapshot,
    AnimationData,
    false
);
snapshot_entry!(
    validate_transform_snapshot_delta,
    build_transform_snapshot_delta,
    PacketType::TransformSnapshotDelta,
    TransformData,
    true
);
snapshot_entry!(
    validate_health_snapshot_delta,
    build_health_snapshot_delta,
    PacketType::HealthSnapshotDelta,
    HealthData,
    true
);

fn validate_player_ready(packet: &Packet) -> bool {
    packet.payload.len() == PlayerReady::PAYLOAD_SIZE
}

fn build_player_is_ready(args: &[u8]) -> Result<Packet, ProtocolError> {
    build_exact(PacketType::PlayerIsReady, PlayerReady::PAYLOAD_SIZE, args)
}

fn build_player_not_ready(args: &[u8]) -> Result<Packet, ProtocolError> {
    build_exact(PacketType::PlayerNotReady, PlayerReady::PAYLOAD_SIZE, args)
}

/// The dispatch table. One entry per supported packet type.
pub const PACKET_HANDLERS: [PacketHandler; 38] = [
    // Connection (0x01-0x0F)
    PacketHandler {
        packet_type: PacketType::ClientConnect,
        validate: validate_client_connect,
        build: build_client_connect,
    },
    PacketHandler {
        packet_type: PacketType::ServerAccept,
        validate: validate_server_accept,
        build: build_server_accept,
    },
    PacketHandler {
        packet_type: PacketType::ServerReject,
        validate: validate_server_reject,
        build: build_server_reject,
    },
    PacketHandler {
        packet_type: PacketType::ClientDisconnect,
        validate: validate_client_disconnect,
        build: build_client_disconnect,
    },
    PacketHandler {
        packet_type: PacketType::Heartbeat,
        validate: validate_heartbeat,
        build: build_heartbeat,
    },
    // Input (0x10-0x1F)
    PacketHandler {
        packet_type: PacketType::PlayerInput,
        validate: validate_player_input,
        build: build_player_input,
    },
    // World state (0x20-0x3F)
    PacketHandler {
        packet_type: PacketType::EntitySpawn,
        validate: validate_entity_spawn,
        build: build_entity_spawn,
    },
    PacketHandler {
        packet_type: PacketType::EntityDestroy,
        validate: validate_entity_destroy,
        build: build_entity_destroy,
    },
    PacketHandler {
        packet_type: PacketType::TransformSnapshot,
        validate: validate_transform_snapshot,
        build: build_transform_snapshot,
    },
    PacketHandler {
        packet_type: PacketType::VelocitySnapshot,
        validate: validate_velocity_snapshot,
        build: build_velocity_snapshot,
    },
    PacketHandler {
        packet_type: PacketType::HealthSnapshot,
        validate: validate_health_snapshot,
        build: build_health_snapshot,
    },
    PacketHandler {
        packet_type: PacketType::WeaponSnapshot,
        validate: validate_weapon_snapshot,
        build: build_weapon_snapshot,
    },
    PacketHandler {
        packet_type: PacketType::AiSnapshot,
        validate: validate_ai_snapshot,
        build: build_ai_snapshot,
    },
    PacketHandler {
        packet_type: PacketType::AnimationSnapshot,
        validate: validate_animation_snapshot,
        build: build_animation_snapshot,
    },
    PacketHandler {
        packet_type: PacketType::ComponentAdd,
        validate: validate_component_add,
        build: build_component_add,
    },
    PacketHandler {
        packet_type: PacketType::ComponentRemove,
        validate: validate_component_remove,
        build: build_component_remove,
    },
    PacketHandler {
        packet_type: PacketType::TransformSnapshotDelta,
        validate: validate_transform_snapshot_delta,
        build: build_transform_snapshot_delta,
    },
    PacketHandler {
        packet_type: PacketType::HealthSnapshotDelta,
        validate: validate_health_snapshot_delta,
        build: build_health_snapshot_delta,
    },
    PacketHandler {
        packet_type: PacketType::EntityFullState,
        validate: validate_entity_full_state,
        build: build_entity_full_state,
    },
    // Game events (0x40-0x5F)
    PacketHandler {
        packet_type: PacketType::PlayerHit,
        validate: validate_player_hit,
        build: build_player_hit,
    },
    PacketHandler {
        packet_type: PacketType::PlayerDeath,
        validate: validate_player_death,
        build: build_player_death,
    },
    PacketHandler {
        packet_type: PacketType::ScoreUpdate,
        validate: validate_score_update,
        build: build_score_update,
    },
    PacketHandler {
        packet_type: PacketType::PowerupPickup,
        validate: validate_powerup_pickup,
        build: build_powerup_pickup,
    },
    PacketHandler {
        packet_type: PacketType::WeaponFire,
        validate: validate_weapon_fire,
        build: build_weapon_fire,
    },
    PacketHandler {
        packet_type: PacketType::VisualEffect,
        validate: validate_visual_effect,
        build: build_visual_effect,
    },
    PacketHandler {
        packet_type: PacketType::AudioEffect,
        validate: validate_audio_effect,
        build: build_audio_effect,
    },
    PacketHandler {
        packet_type: PacketType::ParticleSpawn,
        validate: validate_particle_spawn,
        build: build_particle_spawn,
    },
    // Game control (0x60-0x6F)
    PacketHandler {
        packet_type: PacketType::GameStart,
        validate: validate_game_start,
        build: build_game_start,
    },
    PacketHandler {
        packet_type: PacketType::GameEnd,
        validate: validate_game_end,
        build: build_game_end,
    },
    PacketHandler {
        packet_type: PacketType::LevelComplete,
        validate: validate_level_complete,
        build: build_level_complete,
    },
    PacketHandler {
        packet_type: PacketType::LevelStart,
        validate: validate_level_start,
        build: build_level_start,
    },
    PacketHandler {
        packet_type: PacketType::ForceState,
        validate: validate_force_state,
        build: build_force_state,
    },
    PacketHandler {
        packet_type: PacketType::AiState,
        validate: validate_ai_state,
        build: build_ai_state,
    },
    PacketHandler {
        packet_type: PacketType::PlayerIsReady,
        validate: validate_player_ready,
        build: build_player_is_ready,
    },
    PacketHandler {
        packet_type: PacketType::PlayerNotReady,
        validate: validate_player_ready,
        build: build_player_not_ready,
    },
    // Protocol control (0x70-0x7F)
    PacketHandler {
        packet_type: PacketType::Ack,
        validate: validate_ack,
        build: build_ack,
    },
    PacketHandler {
        packet_type: PacketType::Ping,
        validate: validate_ping,
        build: build_ping,
    },
    PacketHandler {
        packet_type: PacketType::Pong,
        validate: validate_pong,
        build: build_pong,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_args(payload: &[u8]) -> Vec<u8> {
        let mut args = vec![0u8]; // flags_count = 0
        args.extend_from_slice(&7u32.to_le_bytes()); // sequence
        args.extend_from_slice(&1234u32.to_le_bytes()); // timestamp
        args.extend_from_slice(payload);
        args
    }

    #[test]
    fn every_handler_matches_its_type() {
        for handler in &PACKET_HANDLERS {
            assert_eq!(
                find_handler(handler.packet_type)
                    .map(|found| found.packet_type),
                Some(handler.packet_type)
            );
        }
        assert_eq!(PACKET_HANDLERS.len(), 38);
    }

    #[test]
    fn build_heartbeat_from_flat_args() {
        let payload = Heartbeat { player_id: 42 }.write();
        let packet = create_packet(PacketType::Heartbeat, &flat_args(&payload)).unwrap();
        assert_eq!(packet.header.sequence_number, 7);
        assert_eq!(packet.header.timestamp, 1234);
        assert_eq!(packet.header.flags, 0);
        assert_eq!(Heartbeat::parse(&packet.payload).unwrap().player_id, 42);
    }

    #[test]
    fn flags_are_or_combined() {
        let payload = Heartbeat { player_id: 1 }.write();
        let mut args = vec![2u8, 0x01, 0x10];
        args.extend_from_slice(&0u32.to_le_bytes());
        args.extend_from_slice(&0u32.to_le_bytes());
        args.extend_from_slice(&payload);
        let packet = create_packet(PacketType::Heartbeat, &args).unwrap();
        assert_eq!(packet.header.flags, 0x11);
    }

    #[test]
    fn builder_rejects_wrong_payload_size() {
        let result = create_packet(PacketType::Heartbeat, &flat_args(&[1, 2]));
        assert!(matches!(result, Err(ProtocolError::MalformedBuildArgs(_))));
    }

    #[test]
    fn validator_rejects_reserved_input_bits() {
        let bad_input = PlayerInput {
            player_id: 1,
            input_state: 0x8000,
            aim_x: 0,
            aim_y: 0,
        };
        let packet = make_packet(PacketType::PlayerInput, 0, 0, 0, bad_input.write());
        assert!(process_packet(&packet).is_err());
    }
}
