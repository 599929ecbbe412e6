//! Typed views of packet payloads. Every struct knows its wire size, how
//! to write itself and how to parse itself back; the codec's validators
//! lean on the same size constants.

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::types::{
    DestroyReason, DisconnectReason, EntityKind, PacketType, RejectCode, WeaponKind,
};
use super::{PLAYER_NAME_LEN, REJECT_REASON_LEN};
use crate::error::ProtocolError;

fn too_short(packet_type: PacketType, size: usize, minimum: usize) -> ProtocolError {
    ProtocolError::PayloadTooShort {
        packet_type: packet_type as u8,
        size,
        minimum,
    }
}

fn out_of_range(packet_type: PacketType, field: &'static str, value: u32) -> ProtocolError {
    ProtocolError::FieldOutOfRange {
        packet_type: packet_type as u8,
        field,
        value,
    }
}

/// Writes `text` as a fixed-width NUL-padded field.
fn write_fixed_str(out: &mut Vec<u8>, text: &str, width: usize) {
    let bytes = text.as_bytes();
    let take = bytes.len().min(width);
    out.extend_from_slice(&bytes[..take]);
    out.resize(out.len() + (width - take), 0);
}

/// Reads a fixed-width NUL-padded field back into a String.
fn read_fixed_str(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

// ------------------------------------------------------------------
// Connection (0x01-0x0F)
// ------------------------------------------------------------------

/// CLIENT_CONNECT (0x01), client → server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConnect {
    pub protocol_version: u8,
    pub player_name: String,
    pub client_id: u32,
}

impl ClientConnect {
    pub const PAYLOAD_SIZE: usize = 1 + PLAYER_NAME_LEN + 4;

    pub fn write(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::PAYLOAD_SIZE);
        let _ = out.write_u8(self.protocol_version);
        write_fixed_str(&mut out, &self.player_name, PLAYER_NAME_LEN);
        let _ = out.write_u32::<LittleEndian>(self.client_id);
        out
    }

    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() < Self::PAYLOAD_SIZE {
            return Err(too_short(
                PacketType::ClientConnect,
                payload.len(),
                Self::PAYLOAD_SIZE,
            ));
        }
        let protocol_version = payload[0];
        let player_name = read_fixed_str(&payload[1..1 + PLAYER_NAME_LEN]);
        let mut cursor = Cursor::new(&payload[1 + PLAYER_NAME_LEN..]);
        let client_id = cursor
            .read_u32::<LittleEndian>()
            .map_err(|_| ProtocolError::ValidationFailed(PacketType::ClientConnect as u8))?;
        Ok(Self {
            protocol_version,
            player_name,
            client_id,
        })
    }
}

/// SERVER_ACCEPT (0x02), server → client, RELIABLE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerAccept {
    pub assigned_player_id: u32,
    pub max_players: u8,
    pub game_instance_id: u32,
    pub server_tickrate: u16,
}

impl ServerAccept {
    pub const PAYLOAD_SIZE: usize = 4 + 1 + 4 + 2;

    pub fn write(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::PAYLOAD_SIZE);
        let _ = out.write_u32::<LittleEndian>(self.assigned_player_id);
        let _ = out.write_u8(self.max_players);
        let _ = out.write_u32::<LittleEndian>(self.game_instance_id);
        let _ = out.write_u16::<LittleEndian>(self.server_tickrate);
        out
    }

    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() < Self::PAYLOAD_SIZE {
            return Err(too_short(
                PacketType::ServerAccept,
                payload.len(),
                Self::PAYLOAD_SIZE,
            ));
        }
        let mut cursor = Cursor::new(payload);
        let read_err = |_| ProtocolError::ValidationFailed(PacketType::ServerAccept as u8);
        Ok(Self {
            assigned_player_id: cursor.read_u32::<LittleEndian>().map_err(read_err)?,
            max_players: cursor.read_u8().map_err(read_err)?,
            game_instance_id: cursor.read_u32::<LittleEndian>().map_err(read_err)?,
            server_tickrate: cursor.read_u16::<LittleEndian>().map_err(read_err)?,
        })
    }
}

/// SERVER_REJECT (0x03), server → client, RELIABLE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerReject {
    pub reject_code: RejectCode,
    pub reason_message: String,
}

impl ServerReject {
    pub const PAYLOAD_SIZE: usize = 1 + REJECT_REASON_LEN;

    pub fn write(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::PAYLOAD_SIZE);
        let _ = out.write_u8(self.reject_code as u8);
        write_fixed_str(&mut out, &self.reason_message, REJECT_REASON_LEN);
        out
    }

    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() < Self::PAYLOAD_SIZE {
            return Err(too_short(
                PacketType::ServerReject,
                payload.len(),
                Self::PAYLOAD_SIZE,
            ));
        }
        let reject_code = RejectCode::from_u8(payload[0]).ok_or_else(|| {
            out_of_range(PacketType::ServerReject, "reject_code", u32::from(payload[0]))
        })?;
        Ok(Self {
            reject_code,
            reason_message: read_fixed_str(&payload[1..1 + REJECT_REASON_LEN]),
        })
    }
}

/// CLIENT_DISCONNECT (0x04), both directions, RELIABLE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientDisconnect {
    pub client_id: u32,
    pub reason: DisconnectReason,
}

impl ClientDisconnect {
    pub const PAYLOAD_SIZE: usize = 4 + 1;

    pub fn write(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::PAYLOAD_SIZE);
        let _ = out.write_u32::<LittleEndian>(self.client_id);
        let _ = out.write_u8(self.reason as u8);
        out
    }

    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() < Self::PAYLOAD_SIZE {
            return Err(too_short(
                PacketType::ClientDisconnect,
                payload.len(),
                Self::PAYLOAD_SIZE,
            ));
        }
        let mut cursor = Cursor::new(payload);
        let read_err = |_| ProtocolError::ValidationFailed(PacketType::ClientDisconnect as u8);
        let client_id = cursor.read_u32::<LittleEndian>().map_err(read_err)?;
        let raw_reason = cursor.read_u8().map_err(read_err)?;
        let reason = DisconnectReason::from_u8(raw_reason).ok_or_else(|| {
            out_of_range(PacketType::ClientDisconnect, "reason", u32::from(raw_reason))
        })?;
        Ok(Self { client_id, reason })
    }
}

/// HEARTBEAT (0x05), both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heartbeat {
    pub player_id: u32,
}

impl Heartbeat {
    pub const PAYLOAD_SIZE: usize = 4;

    pub fn write(&self) -> Vec<u8> {
        self.player_id.to_le_bytes().to_vec()
    }

    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() < Self::PAYLOAD_SIZE {
            return Err(too_short(
                PacketType::Heartbeat,
                payload.len(),
                Self::PAYLOAD_SIZE,
            ));
        }
        let mut cursor = Cursor::new(payload);
        let player_id = cursor
            .read_u32::<LittleEndian>()
            .map_err(|_| ProtocolError::ValidationFailed(PacketType::Heartbeat as u8))?;
        Ok(Self { player_id })
    }
}

// ------------------------------------------------------------------
// Input (0x10)
// ------------------------------------------------------------------

/// PLAYER_INPUT (0x10), client → server (relayed to other clients).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerInput {
    pub player_id: u32,
    pub input_state: u16,
    pub aim_x: u16,
    pub aim_y: u16,
}

impl PlayerInput {
    pub const PAYLOAD_SIZE: usize = 4 + 2 + 2 + 2;

    pub fn write(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::PAYLOAD_SIZE);
        let _ = out.write_u32::<LittleEndian>(self.player_id);
        let _ = out.write_u16::<LittleEndian>(self.input_state);
        let _ = out.write_u16::<LittleEndian>(self.aim_x);
        let _ = out.write_u16::<LittleEndian>(self.aim_y);
        out
    }

    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() < Self::PAYLOAD_SIZE {
            return Err(too_short(
                PacketType::PlayerInput,
                payload.len(),
                Self::PAYLOAD_SIZE,
            ));
        }
        let mut cursor = Cursor::new(payload);
        let read_err = |_| ProtocolError::ValidationFailed(PacketType::PlayerInput as u8);
        Ok(Self {
            player_id: cursor.read_u32::<LittleEndian>().map_err(read_err)?,
            input_state: cursor.read_u16::<LittleEndian>().map_err(read_err)?,
            aim_x: cursor.read_u16::<LittleEndian>().map_err(read_err)?,
            aim_y: cursor.read_u16::<LittleEndian>().map_err(read_err)?,
        })
    }
}

// ------------------------------------------------------------------
// World state (0x20-0x3F)
// ------------------------------------------------------------------

/// ENTITY_SPAWN (0x21), server → client, RELIABLE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntitySpawn {
    pub entity_id: u32,
    pub entity_kind: EntityKind,
    pub position_x: u16,
    pub position_y: u16,
    pub mob_variant: u8,
    pub initial_health: u8,
    pub initial_velocity_x: u16,
    pub initial_velocity_y: u16,
    pub is_playable: bool,
}

impl EntitySpawn {
    pub const PAYLOAD_SIZE: usize = 4 + 1 + 2 + 2 + 1 + 1 + 2 + 2 + 1;

    /// Byte offset of the `is_playable` flag, used to address the owner's
    /// copy of a spawn without re-encoding the packet.
    pub const IS_PLAYABLE_OFFSET: usize = 15;

    pub fn write(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::PAYLOAD_SIZE);
        let _ = out.write_u32::<LittleEndian>(self.entity_id);
        let _ = out.write_u8(self.entity_kind as u8);
        let _ = out.write_u16::<LittleEndian>(self.position_x);
        let _ = out.write_u16::<LittleEndian>(self.position_y);
        let _ = out.write_u8(self.mob_variant);
        let _ = out.write_u8(self.initial_health);
        let _ = out.write_u16::<LittleEndian>(self.initial_velocity_x);
        let _ = out.write_u16::<LittleEndian>(self.initial_velocity_y);
        let _ = out.write_u8(u8::from(self.is_playable));
        out
    }

    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() < Self::PAYLOAD_SIZE {
            return Err(too_short(
                PacketType::EntitySpawn,
                payload.len(),
                Self::PAYLOAD_SIZE,
            ));
        }
        let mut cursor = Cursor::new(payload);
        let read_err = |_| ProtocolError::ValidationFailed(PacketType::EntitySpawn as u8);
        let entity_id = cursor.read_u32::<LittleEndian>().map_err(read_err)?;
        let raw_kind = cursor.read_u8().map_err(read_err)?;
        let entity_kind = EntityKind::from_u8(raw_kind).ok_or_else(|| {
            out_of_range(PacketType::EntitySpawn, "entity_type", u32::from(raw_kind))
        })?;
        Ok(Self {
            entity_id,
            entity_kind,
            position_x: cursor.read_u16::<LittleEndian>().map_err(read_err)?,
            position_y: cursor.read_u16::<LittleEndian>().map_err(read_err)?,
            mob_variant: cursor.read_u8().map_err(read_err)?,
            initial_health: cursor.read_u8().map_err(read_err)?,
            initial_velocity_x: cursor.read_u16::<LittleEndian>().map_err(read_err)?,
            initial_velocity_y: cursor.read_u16::<LittleEndian>().map_err(read_err)?,
            is_playable: cursor.read_u8().map_err(read_err)? != 0,
        })
    }
}

/// ENTITY_DESTROY (0x22), server → client, RELIABLE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityDestroy {
    pub entity_id: u32,
    pub reason: DestroyReason,
    pub final_position_x: u16,
    pub final_position_y: u16,
}

impl EntityDestroy {
    pub const PAYLOAD_SIZE: usize = 4 + 1 + 2 + 2;

    pub fn write(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::PAYLOAD_SIZE);
        let _ = out.write_u32::<LittleEndian>(self.entity_id);
        let _ = out.write_u8(self.reason as u8);
        let _ = out.write_u16::<LittleEndian>(self.final_position_x);
        let _ = out.write_u16::<LittleEndian>(self.final_position_y);
        out
    }

    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() < Self::PAYLOAD_SIZE {
            return Err(too_short(
                PacketType::EntityDestroy,
                payload.len(),
                Self::PAYLOAD_SIZE,
            ));
        }
        let mut cursor = Cursor::new(payload);
        let read_err = |_| ProtocolError::ValidationFailed(PacketType::EntityDestroy as u8);
        let entity_id = cursor.read_u32::<LittleEndian>().map_err(read_err)?;
        let raw_reason = cursor.read_u8().map_err(read_err)?;
        let reason = DestroyReason::from_u8(raw_reason).ok_or_else(|| {
            out_of_range(
                PacketType::EntityDestroy,
                "destroy_reason",
                u32::from(raw_reason),
            )
        })?;
        Ok(Self {
            entity_id,
            reason,
            final_position_x: cursor.read_u16::<LittleEndian>().map_err(read_err)?,
            final_position_y: cursor.read_u16::<LittleEndian>().map_err(read_err)?,
        })
    }
}

/// COMPONENT_ADD (0x2A), server → client, RELIABLE. Variable size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentAdd {
    pub entity_id: u32,
    pub component_type: u8,
    pub data: Vec<u8>,
}

impl ComponentAdd {
    pub const MIN_PAYLOAD_SIZE: usize = 4 + 1 + 1;

    pub fn write(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::MIN_PAYLOAD_SIZE + self.data.len());
        let _ = out.write_u32::<LittleEndian>(self.entity_id);
        let _ = out.write_u8(self.component_type);
        let _ = out.write_u8(self.data.len().min(255) as u8);
        out.extend_from_slice(&self.data[..self.data.len().min(255)]);
        out
    }

    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() < Self::MIN_PAYLOAD_SIZE {
            return Err(too_short(
                PacketType::ComponentAdd,
                payload.len(),
                Self::MIN_PAYLOAD_SIZE,
            ));
        }
        let mut cursor = Cursor::new(payload);
        let read_err = |_| ProtocolError::ValidationFailed(PacketType::ComponentAdd as u8);
        let entity_id = cursor.read_u32::<LittleEndian>().map_err(read_err)?;
        let component_type = cursor.read_u8().map_err(read_err)?;
        let data_size = cursor.read_u8().map_err(read_err)? as usize;
        let start = Self::MIN_PAYLOAD_SIZE;
        if payload.len() < start + data_size {
            return Err(too_short(
                PacketType::ComponentAdd,
                payload.len(),
                start + data_size,
            ));
        }
        Ok(Self {
            entity_id,
            component_type,
            data: payload[start..start + data_size].to_vec(),
        })
    }
}

/// COMPONENT_REMOVE (0x2B), server → client, RELIABLE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentRemove {
    pub entity_id: u32,
    pub component_type: u8,
}

impl ComponentRemove {
    pub const PAYLOAD_SIZE: usize = 4 + 1;

    pub fn write(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::PAYLOAD_SIZE);
        let _ = out.write_u32::<LittleEndian>(self.entity_id);
        let _ = out.write_u8(self.component_type);
        out
    }

    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() < Self::PAYLOAD_SIZE {
            return Err(too_short(
                PacketType::ComponentRemove,
                payload.len(),
                Self::PAYLOAD_SIZE,
            ));
        }
        let mut cursor = Cursor::new(payload);
        let read_err = |_| ProtocolError::ValidationFailed(PacketType::ComponentRemove as u8);
        Ok(Self {
            entity_id: cursor.read_u32::<LittleEndian>().map_err(read_err)?,
            component_type: cursor.read_u8().map_err(read_err)?,
        })
    }
}

/// ENTITY_FULL_STATE (0x2E), server → client, RELIABLE. Variable size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityFullState {
    pub entity_id: u32,
    pub entity_kind: EntityKind,
    pub components: Vec<(u8, Vec<u8>)>,
}

impl EntityFullState {
    pub const MIN_PAYLOAD_SIZE: usize = 4 + 1 + 1;

    pub fn write(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let _ = out.write_u32::<LittleEndian>(self.entity_id);
        let _ = out.write_u8(self.entity_kind as u8);
        let _ = out.write_u8(self.components.len().min(255) as u8);
        for (component_type, data) in self.components.iter().take(255) {
            let _ = out.write_u8(*component_type);
            let _ = out.write_u8(data.len().min(255) as u8);
            out.extend_from_slice(&data[..data.len().min(255)]);
        }
        out
    }

    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() < Self::MIN_PAYLOAD_SIZE {
            return Err(too_short(
                PacketType::EntityFullState,
                payload.len(),
                Self::MIN_PAYLOAD_SIZE,
            ));
        }
        let mut cursor = Cursor::new(payload);
        let read_err = |_| ProtocolError::ValidationFailed(PacketType::EntityFullState as u8);
        let entity_id = cursor.read_u32::<LittleEndian>().map_err(read_err)?;
        let raw_kind = cursor.read_u8().map_err(read_err)?;
        let entity_kind = EntityKind::from_u8(raw_kind).ok_or_else(|| {
            out_of_range(PacketType::EntityFullState, "entity_type", u32::from(raw_kind))
        })?;
        let count = cursor.read_u8().map_err(read_err)? as usize;
        let mut offset = Self::MIN_PAYLOAD_SIZE;
        let mut components = Vec::with_capacity(count);
        for _ in 0..count {
            if payload.len() < offset + 2 {
                return Err(too_short(PacketType::EntityFullState, payload.len(), offset + 2));
            }
            let component_type = payload[offset];
            let size = payload[offset + 1] as usize;
            offset += 2;
            if payload.len() < offset + size {
                return Err(too_short(
                    PacketType::EntityFullState,
                    payload.len(),
                    offset + size,
                ));
            }
            components.push((component_type, payload[offset..offset + size].to_vec()));
            offset += size;
        }
        Ok(Self {
            entity_id,
            entity_kind,
            components,
        })
    }
}

// ------------------------------------------------------------------
// Game events (0x40-0x5F)
// ------------------------------------------------------------------

/// PLAYER_HIT (0x40), server → client, RELIABLE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerHit {
    pub victim_id: u32,
    pub attacker_id: u32,
    pub damage: u8,
}

impl PlayerHit {
    pub const PAYLOAD_SIZE: usize = 4 + 4 + 1;

    pub fn write(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::PAYLOAD_SIZE);
        let _ = out.write_u32::<LittleEndian>(self.victim_id);
        let _ = out.write_u32::<LittleEndian>(self.attacker_id);
        let _ = out.write_u8(self.damage);
        out
    }

    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() < Self::PAYLOAD_SIZE {
            return Err(too_short(
                PacketType::PlayerHit,
                payload.len(),
                Self::PAYLOAD_SIZE,
            ));
        }
        let mut cursor = Cursor::new(payload);
        let read_err = |_| ProtocolError::ValidationFailed(PacketType::PlayerHit as u8);
        Ok(Self {
            victim_id: cursor.read_u32::<LittleEndian>().map_err(read_err)?,
            attacker_id: cursor.read_u32::<LittleEndian>().map_err(read_err)?,
            damage: cursor.read_u8().map_err(read_err)?,
        })
    }
}

/// PLAYER_DEATH (0x41), server → client, RELIABLE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerDeath {
    pub victim_id: u32,
    pub killer_id: u32,
}

impl PlayerDeath {
    pub const PAYLOAD_SIZE: usize = 4 + 4;

    pub fn write(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::PAYLOAD_SIZE);
        let _ = out.write_u32::<LittleEndian>(self.victim_id);
        let _ = out.write_u32::<LittleEndian>(self.killer_id);
        out
    }

    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() < Self::PAYLOAD_SIZE {
            return Err(too_short(
                PacketType::PlayerDeath,
                payload.len(),
                Self::PAYLOAD_SIZE,
            ));
        }
        let mut cursor = Cursor::new(payload);
        let read_err = |_| ProtocolError::ValidationFailed(PacketType::PlayerDeath as u8);
        Ok(Self {
            victim_id: cursor.read_u32::<LittleEndian>().map_err(read_err)?,
            killer_id: cursor.read_u32::<LittleEndian>().map_err(read_err)?,
        })
    }
}

/// SCORE_UPDATE (0x42), server → client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreUpdate {
    pub player_id: u32,
    pub score: u32,
}

impl ScoreUpdate {
    pub const PAYLOAD_SIZE: usize = 4 + 4;

    pub fn write(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::PAYLOAD_SIZE);
        let _ = out.write_u32::<LittleEndian>(self.player_id);
        let _ = out.write_u32::<LittleEndian>(self.score);
        out
    }

    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() < Self::PAYLOAD_SIZE {
            return Err(too_short(
                PacketType::ScoreUpdate,
                payload.len(),
                Self::PAYLOAD_SIZE,
            ));
        }
        let mut cursor = Cursor::new(payload);
        let read_err = |_| ProtocolError::ValidationFailed(PacketType::ScoreUpdate as u8);
        Ok(Self {
            player_id: cursor.read_u32::<LittleEndian>().map_err(read_err)?,
            score: cursor.read_u32::<LittleEndian>().map_err(read_err)?,
        })
    }
}

/// POWERUP_PICKUP (0x43), server → client, RELIABLE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerupPickup {
    pub player_id: u32,
    pub powerup_id: u32,
    pub powerup_type: u8,
}

impl PowerupPickup {
    pub const PAYLOAD_SIZE: usize = 4 + 4 + 1;

    pub fn write(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::PAYLOAD_SIZE);
        let _ = out.write_u32::<LittleEndian>(self.player_id);
        let _ = out.write_u32::<LittleEndian>(self.powerup_id);
        let _ = out.write_u8(self.powerup_type);
        out
    }

    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() < Self::PAYLOAD_SIZE {
            return Err(too_short(
                PacketType::PowerupPickup,
                payload.len(),
                Self::PAYLOAD_SIZE,
            ));
        }
        let mut cursor = Cursor::new(payload);
        let read_err = |_| ProtocolError::ValidationFailed(PacketType::PowerupPickup as u8);
        Ok(Self {
            player_id: cursor.read_u32::<LittleEndian>().map_err(read_err)?,
            powerup_id: cursor.read_u32::<LittleEndian>().map_err(read_err)?,
            powerup_type: cursor.read_u8().map_err(read_err)?,
        })
    }
}

/// WEAPON_FIRE (0x44), both directions. Direction is a unit vector scaled
/// by 1000; receivers divide back and multiply by the weapon's speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeaponFire {
    pub shooter_id: u32,
    pub projectile_id: u32,
    pub origin_x: i16,
    pub origin_y: i16,
    pub direction_x: i16,
    pub direction_y: i16,
    pub weapon_type: WeaponKind,
}

impl WeaponFire {
    pub const PAYLOAD_SIZE: usize = 4 + 4 + 2 + 2 + 2 + 2 + 1;

    pub fn write(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::PAYLOAD_SIZE);
        let _ = out.write_u32::<LittleEndian>(self.shooter_id);
        let _ = out.write_u32::<LittleEndian>(self.projectile_id);
        let _ = out.write_i16::<LittleEndian>(self.origin_x);
        let _ = out.write_i16::<LittleEndian>(self.origin_y);
        let _ = out.write_i16::<LittleEndian>(self.direction_x);
        let _ = out.write_i16::<LittleEndian>(self.direction_y);
        let _ = out.write_u8(self.weapon_type as u8);
        out
    }

    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() < Self::PAYLOAD_SIZE {
            return Err(too_short(
                PacketType::WeaponFire,
                payload.len(),
                Self::PAYLOAD_SIZE,
            ));
        }
        let mut cursor = Cursor::new(payload);
        let read_err = |_| ProtocolError::ValidationFailed(PacketType::WeaponFire as u8);
        let shooter_id = cursor.read_u32::<LittleEndian>().map_err(read_err)?;
        let projectile_id = cursor.read_u32::<LittleEndian>().map_err(read_err)?;
        let origin_x = cursor.read_i16::<LittleEndian>().map_err(read_err)?;
        let origin_y = cursor.read_i16::<LittleEndian>().map_err(read_err)?;
        let direction_x = cursor.read_i16::<LittleEndian>().map_err(read_err)?;
        let direction_y = cursor.read_i16::<LittleEndian>().map_err(read_err)?;
        let raw_weapon = cursor.read_u8().map_err(read_err)?;
        let weapon_type = WeaponKind::from_u8(raw_weapon).ok_or_else(|| {
            out_of_range(PacketType::WeaponFire, "weapon_type", u32::from(raw_weapon))
        })?;
        Ok(Self {
            shooter_id,
            projectile_id,
            origin_x,
            origin_y,
            direction_x,
            direction_y,
            weapon_type,
        })
    }
}

/// VISUAL_EFFECT (0x50), server → client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisualEffect {
    pub effect_type: u8,
    pub pos_x: i16,
    pub pos_y: i16,
    pub duration_ms: u16,
    pub scale: u8,
    pub tint: [u8; 3],
}

impl VisualEffect {
    pub const PAYLOAD_SIZE: usize = 1 + 2 + 2 + 2 + 1 + 3;

    pub fn write(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::PAYLOAD_SIZE);
        let _ = out.write_u8(self.effect_type);
        let _ = out.write_i16::<LittleEndian>(self.pos_x);
        let _ = out.write_i16::<LittleEndian>(self.pos_y);
        let _ = out.write_u16::<LittleEndian>(self.duration_ms);
        let _ = out.write_u8(self.scale);
        out.extend_from_slice(&self.tint);
        out
    }

    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() < Self::PAYLOAD_SIZE {
            return Err(too_short(
                PacketType::VisualEffect,
                payload.len(),
                Self::PAYLOAD_SIZE,
            ));
        }
        let mut cursor = Cursor::new(payload);
        let read_err = |_| ProtocolError::ValidationFailed(PacketType::VisualEffect as u8);
        Ok(Self {
            effect_type: cursor.read_u8().map_err(read_err)?,
            pos_x: cursor.read_i16::<LittleEndian>().map_err(read_err)?,
            pos_y: cursor.read_i16::<LittleEndian>().map_err(read_err)?,
            duration_ms: cursor.read_u16::<LittleEndian>().map_err(read_err)?,
            scale: cursor.read_u8().map_err(read_err)?,
            tint: [
                cursor.read_u8().map_err(read_err)?,
                cursor.read_u8().map_err(read_err)?,
                cursor.read_u8().map_err(read_err)?,
            ],
        })
    }
}

/// AUDIO_EFFECT (0x51), server → client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioEffect {
    pub effect_type: u8,
    pub pos_x: i16,
    pub pos_y: i16,
    pub volume: u8,
    pub pitch: u8,
}

impl AudioEffect {
    pub const PAYLOAD_SIZE: usize = 1 + 2 + 2 + 1 + 1;

    pub fn write(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::PAYLOAD_SIZE);
        let _ = out.write_u8(self.effect_type);
        let _ = out.write_i16::<LittleEndian>(self.pos_x);
        let _ = out.write_i16::<LittleEndian>(self.pos_y);
        let _ = out.write_u8(self.volume);
        let _ = out.write_u8(self.pitch);
        out
    }

    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() < Self::PAYLOAD_SIZE {
            return Err(too_short(
                PacketType::AudioEffect,
                payload.len(),
                Self::PAYLOAD_SIZE,
            ));
        }
        let mut cursor = Cursor::new(payload);
        let read_err = |_| ProtocolError::ValidationFailed(PacketType::AudioEffect as u8);
        Ok(Self {
            effect_type: cursor.read_u8().map_err(read_err)?,
            pos_x: cursor.read_i16::<LittleEndian>().map_err(read_err)?,
            pos_y: cursor.read_i16::<LittleEndian>().map_err(read_err)?,
            volume: cursor.read_u8().map_err(read_err)?,
            pitch: cursor.read_u8().map_err(read_err)?,
        })
    }
}

/// PARTICLE_SPAWN (0x52), server → client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticleSpawn {
    pub particle_system_id: u16,
    pub pos_x: i16,
    pub pos_y: i16,
    pub velocity_x: i16,
    pub velocity_y: i16,
    pub particle_count: u16,
    pub lifetime_ms: u16,
    pub color_start: [u8; 3],
    pub color_end: [u8; 3],
}

impl ParticleSpawn {
    pub const PAYLOAD_SIZE: usize = 2 + 2 + 2 + 2 + 2 + 2 + 2 + 3 + 3;

    pub fn write(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::PAYLOAD_SIZE);
        let _ = out.write_u16::<LittleEndian>(self.particle_system_id);
        let _ = out.write_i16::<LittleEndian>(self.pos_x);
        let _ = out.write_i16::<LittleEndian>(self.pos_y);
        let _ = out.write_i16::<LittleEndian>(self.velocity_x);
        let _ = out.write_i16::<LittleEndian>(self.velocity_y);
        let _ = out.write_u16::<LittleEndian>(self.particle_count);
        let _ = out.write_u16::<LittleEndian>(self.lifetime_ms);
        out.extend_from_slice(&self.color_start);
        out.extend_from_slice(&self.color_end);
        out
    }

    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() < Self::PAYLOAD_SIZE {
            return Err(too_short(
                PacketType::ParticleSpawn,
                payload.len(),
                Self::PAYLOAD_SIZE,
            ));
        }
        let mut cursor = Cursor::new(payload);
        let read_err = |_| ProtocolError::ValidationFailed(PacketType::ParticleSpawn as u8);
        let particle_system_id = cursor.read_u16::<LittleEndian>().map_err(read_err)?;
        let pos_x = cursor.read_i16::<LittleEndian>().map_err(read_err)?;
        let pos_y = cursor.read_i16::<LittleEndian>().map_err(read_err)?;
        let velocity_x = cursor.read_i16::<LittleEndian>().map_err(read_err)?;
        let velocity_y = cursor.read_i16::<LittleEndian>().map_err(read_err)?;
        let particle_count = cursor.read_u16::<LittleEndian>().map_err(read_err)?;
        let lifetime_ms = cursor.read_u16::<LittleEndian>().map_err(read_err)?;
        let mut color_start = [0u8; 3];
        let mut color_end = [0u8; 3];
        for byte in &mut color_start {
            *byte = cursor.read_u8().map_err(read_err)?;
        }
        for byte in &mut color_end {
            *byte = cursor.read_u8().map_err(read_err)?;
        }
        Ok(Self {
            particle_system_id,
            pos_x,
            pos_y,
            velocity_x,
            velocity_y,
            particle_count,
            lifetime_ms,
            color_start,
            color_end,
        })
    }
}

// ------------------------------------------------------------------
// Game control (0x60-0x6F)
// ------------------------------------------------------------------

/// GAME_START (0x60), server → client, RELIABLE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameStart {
    pub game_id: u32,
    pub world_seed: u32,
    pub max_players: u32,
    pub level_index: u32,
    pub difficulty: u8,
}

impl GameStart {
    pub const PAYLOAD_SIZE: usize = 4 + 4 + 4 + 4 + 1;

    pub fn write(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::PAYLOAD_SIZE);
        let _ = out.write_u32::<LittleEndian>(self.game_id);
        let _ = out.write_u32::<LittleEndian>(self.world_seed);
        let _ = out.write_u32::<LittleEndian>(self.max_players);
        let _ = out.write_u32::<LittleEndian>(self.level_index);
        let _ = out.write_u8(self.difficulty);
        out
    }

    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() < Self::PAYLOAD_SIZE {
            return Err(too_short(
                PacketType::GameStart,
                payload.len(),
                Self::PAYLOAD_SIZE,
            ));
        }
        let mut cursor = Cursor::new(payload);
        let read_err = |_| ProtocolError::ValidationFailed(PacketType::GameStart as u8);
        let game_id = cursor.read_u32::<LittleEndian>().map_err(read_err)?;
        let world_seed = cursor.read_u32::<LittleEndian>().map_err(read_err)?;
        let max_players = cursor.read_u32::<LittleEndian>().map_err(read_err)?;
        let level_index = cursor.read_u32::<LittleEndian>().map_err(read_err)?;
        let difficulty = cursor.read_u8().map_err(read_err)?;
        if super::types::Difficulty::from_u8(difficulty).is_none() {
            return Err(out_of_range(
                PacketType::GameStart,
                "difficulty",
                u32::from(difficulty),
            ));
        }
        Ok(Self {
            game_id,
            world_seed,
            max_players,
            level_index,
            difficulty,
        })
    }
}

/// GAME_END (0x61), server → client, RELIABLE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameEnd {
    pub game_id: u32,
    pub end_reason: u8,
    pub winner_id: u32,
    pub duration_seconds: u32,
}

impl GameEnd {
    pub const PAYLOAD_SIZE: usize = 4 + 1 + 4 + 4;

    pub fn write(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::PAYLOAD_SIZE);
        let _ = out.write_u32::<LittleEndian>(self.game_id);
        let _ = out.write_u8(self.end_reason);
        let _ = out.write_u32::<LittleEndian>(self.winner_id);
        let _ = out.write_u32::<LittleEndian>(self.duration_seconds);
        out
    }

    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() < Self::PAYLOAD_SIZE {
            return Err(too_short(
                PacketType::GameEnd,
                payload.len(),
                Self::PAYLOAD_SIZE,
            ));
        }
        let mut cursor = Cursor::new(payload);
        let read_err = |_| ProtocolError::ValidationFailed(PacketType::GameEnd as u8);
        Ok(Self {
            game_id: cursor.read_u32::<LittleEndian>().map_err(read_err)?,
            end_reason: cursor.read_u8().map_err(read_err)?,
            winner_id: cursor.read_u32::<LittleEndian>().map_err(read_err)?,
            duration_seconds: cursor.read_u32::<LittleEndian>().map_err(read_err)?,
        })
    }
}

/// LEVEL_COMPLETE (0x62), server → client, RELIABLE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelComplete {
    pub game_id: u32,
    pub level_index: u32,
    pub completion_time_seconds: u32,
}

impl LevelComplete {
    pub const PAYLOAD_SIZE: usize = 4 + 4 + 4;

    pub fn write(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::PAYLOAD_SIZE);
        let _ = out.write_u32::<LittleEndian>(self.game_id);
        let _ = out.write_u32::<LittleEndian>(self.level_index);
        let _ = out.write_u32::<LittleEndian>(self.completion_time_seconds);
        out
    }

    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() < Self::PAYLOAD_SIZE {
            return Err(too_short(
                PacketType::LevelComplete,
                payload.len(),
                Self::PAYLOAD_SIZE,
            ));
        }
        let mut cursor = Cursor::new(payload);
        let read_err = |_| ProtocolError::ValidationFailed(PacketType::LevelComplete as u8);
        Ok(Self {
            game_id: cursor.read_u32::<LittleEndian>().map_err(read_err)?,
            level_index: cursor.read_u32::<LittleEndian>().map_err(read_err)?,
            completion_time_seconds: cursor.read_u32::<LittleEndian>().map_err(read_err)?,
        })
    }
}

/// LEVEL_START (0x63), server → client, RELIABLE.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelStart {
    pub game_id: u32,
    pub level_index: u32,
    pub difficulty_modifier: f32,
    pub enemy_count: u32,
    pub environment_type: u8,
}

impl LevelStart {
    pub const PAYLOAD_SIZE: usize = 4 + 4 + 4 + 4 + 1;

    pub fn write(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::PAYLOAD_SIZE);
        let _ = out.write_u32::<LittleEndian>(self.game_id);
        let _ = out.write_u32::<LittleEndian>(self.level_index);
        let _ = out.write_f32::<LittleEndian>(self.difficulty_modifier);
        let _ = out.write_u32::<LittleEndian>(self.enemy_count);
        let _ = out.write_u8(self.environment_type);
        out
    }

    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() < Self::PAYLOAD_SIZE {
            return Err(too_short(
                PacketType::LevelStart,
                payload.len(),
                Self::PAYLOAD_SIZE,
            ));
        }
        let mut cursor = Cursor::new(payload);
        let read_err = |_| ProtocolError::ValidationFailed(PacketType::LevelStart as u8);
        Ok(Self {
            game_id: cursor.read_u32::<LittleEndian>().map_err(read_err)?,
            level_index: cursor.read_u32::<LittleEndian>().map_err(read_err)?,
            difficulty_modifier: cursor.read_f32::<LittleEndian>().map_err(read_err)?,
            enemy_count: cursor.read_u32::<LittleEndian>().map_err(read_err)?,
            environment_type: cursor.read_u8().map_err(read_err)?,
        })
    }
}

/// FORCE_STATE (0x64), server → client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForceState {
    pub force_entity_id: u32,
    pub parent_ship_id: u32,
    pub attachment_point: u8,
    pub power_level: u8,
    pub charge_percentage: u8,
    pub is_firing: bool,
}

impl ForceState {
    pub const PAYLOAD_SIZE: usize = 4 + 4 + 1 + 1 + 1 + 1;

    pub fn write(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::PAYLOAD_SIZE);
        let _ = out.write_u32::<LittleEndian>(self.force_entity_id);
        let _ = out.write_u32::<LittleEndian>(self.parent_ship_id);
        let _ = out.write_u8(self.attachment_point);
        let _ = out.write_u8(self.power_level);
        let _ = out.write_u8(self.charge_percentage);
        let _ = out.write_u8(u8::from(self.is_firing));
        out
    }

    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() < Self::PAYLOAD_SIZE {
            return Err(too_short(
                PacketType::ForceState,
                payload.len(),
                Self::PAYLOAD_SIZE,
            ));
        }
        let mut cursor = Cursor::new(payload);
        let read_err = |_| ProtocolError::ValidationFailed(PacketType::ForceState as u8);
        let force_entity_id = cursor.read_u32::<LittleEndian>().map_err(read_err)?;
        let parent_ship_id = cursor.read_u32::<LittleEndian>().map_err(read_err)?;
        let attachment_point = cursor.read_u8().map_err(read_err)?;
        if attachment_point > 0x03 {
            return Err(out_of_range(
                PacketType::ForceState,
                "attachment_point",
                u32::from(attachment_point),
            ));
        }
        Ok(Self {
            force_entity_id,
            parent_ship_id,
            attachment_point,
            power_level: cursor.read_u8().map_err(read_err)?,
            charge_percentage: cursor.read_u8().map_err(read_err)?,
            is_firing: cursor.read_u8().map_err(read_err)? != 0,
        })
    }
}

/// AI_STATE (0x65), server → client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AiState {
    pub entity_id: u32,
    pub current_state: u8,
    pub behavior_type: u8,
    pub target_entity_id: u32,
    pub waypoint_x: i16,
    pub waypoint_y: i16,
    pub state_timer: u16,
}

impl AiState {
    pub const PAYLOAD_SIZE: usize = 4 + 1 + 1 + 4 + 2 + 2 + 2;

    pub fn write(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::PAYLOAD_SIZE);
        let _ = out.write_u32::<LittleEndian>(self.entity_id);
        let _ = out.write_u8(self.current_state);
        let _ = out.write_u8(self.behavior_type);
        let _ = out.write_u32::<LittleEndian>(self.target_entity_id);
        let _ = out.write_i16::<LittleEndian>(self.waypoint_x);
        let _ = out.write_i16::<LittleEndian>(self.waypoint_y);
        let _ = out.write_u16::<LittleEndian>(self.state_timer);
        out
    }

    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() < Self::PAYLOAD_SIZE {
            return Err(too_short(
                PacketType::AiState,
                payload.len(),
                Self::PAYLOAD_SIZE,
            ));
        }
        let mut cursor = Cursor::new(payload);
        let read_err = |_| ProtocolError::ValidationFailed(PacketType::AiState as u8);
        let entity_id = cursor.read_u32::<LittleEndian>().map_err(read_err)?;
        let current_state = cursor.read_u8().map_err(read_err)?;
        let behavior_type = cursor.read_u8().map_err(read_err)?;
        if behavior_type > super::types::AI_BEHAVIOUR_MAX {
            return Err(out_of_range(
                PacketType::AiState,
                "behavior_type",
                u32::from(behavior_type),
            ));
        }
        Ok(Self {
            entity_id,
            current_state,
            behavior_type,
            target_entity_id: cursor.read_u32::<LittleEndian>().map_err(read_err)?,
            waypoint_x: cursor.read_i16::<LittleEndian>().map_err(read_err)?,
            waypoint_y: cursor.read_i16::<LittleEndian>().map_err(read_err)?,
            state_timer: cursor.read_u16::<LittleEndian>().map_err(read_err)?,
        })
    }
}

/// PLAYER_IS_READY (0x66) / PLAYER_NOT_READY (0x67), client → server,
/// relayed to all clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerReady {
    pub player_id: u32,
}

impl PlayerReady {
    pub const PAYLOAD_SIZE: usize = 4;

    pub fn write(&self) -> Vec<u8> {
        self.player_id.to_le_bytes().to_vec()
    }

    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() < Self::PAYLOAD_SIZE {
            return Err(too_short(
                PacketType::PlayerIsReady,
                payload.len(),
                Self::PAYLOAD_SIZE,
            ));
        }
        let mut cursor = Cursor::new(payload);
        let player_id = cursor
            .read_u32::<LittleEndian>()
            .map_err(|_| ProtocolError::ValidationFailed(PacketType::PlayerIsReady as u8))?;
        Ok(Self { player_id })
    }
}

// ------------------------------------------------------------------
// Protocol control (0x70-0x7F)
// ------------------------------------------------------------------

/// ACK (0x70).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    pub acked_sequence: u32,
    pub received_timestamp: u32,
    pub client_id: u32,
}

impl Ack {
    pub const PAYLOAD_SIZE: usize = 4 + 4 + 4;

    pub fn write(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::PAYLOAD_SIZE);
        let _ = out.write_u32::<LittleEndian>(self.acked_sequence);
        let _ = out.write_u32::<LittleEndian>(self.received_timestamp);
        let _ = out.write_u32::<LittleEndian>(self.client_id);
        out
    }

    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() < Self::PAYLOAD_SIZE {
            return Err(too_short(PacketType::Ack, payload.len(), Self::PAYLOAD_SIZE));
        }
        let mut cursor = Cursor::new(payload);
        let read_err = |_| ProtocolError::ValidationFailed(PacketType::Ack as u8);
        Ok(Self {
            acked_sequence: cursor.read_u32::<LittleEndian>().map_err(read_err)?,
            received_timestamp: cursor.read_u32::<LittleEndian>().map_err(read_err)?,
            client_id: cursor.read_u32::<LittleEndian>().map_err(read_err)?,
        })
    }
}

/// PING (0x71).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ping {
    pub client_timestamp: u32,
    pub client_id: u32,
}

impl Ping {
    pub const PAYLOAD_SIZE: usize = 4 + 4;

    pub fn write(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::PAYLOAD_SIZE);
        let _ = out.write_u32::<LittleEndian>(self.client_timestamp);
        let _ = out.write_u32::<LittleEndian>(self.client_id);
        out
    }

    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() < Self::PAYLOAD_SIZE {
            return Err(too_short(PacketType::Ping, payload.len(), Self::PAYLOAD_SIZE));
        }
        let mut cursor = Cursor::new(payload);
        let read_err = |_| ProtocolError::ValidationFailed(PacketType::Ping as u8);
        Ok(Self {
            client_timestamp: cursor.read_u32::<LittleEndian>().map_err(read_err)?,
            client_id: cursor.read_u32::<LittleEndian>().map_err(read_err)?,
        })
    }
}

/// PONG (0x72).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pong {
    pub client_timestamp: u32,
    pub server_timestamp: u32,
}

impl Pong {
    pub const PAYLOAD_SIZE: usize = 4 + 4;

    pub fn write(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::PAYLOAD_SIZE);
        let _ = out.write_u32::<LittleEndian>(self.client_timestamp);
        let _ = out.write_u32::<LittleEndian>(self.server_timestamp);
        out
    }

    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() < Self::PAYLOAD_SIZE {
            return Err(too_short(PacketType::Pong, payload.len(), Self::PAYLOAD_SIZE));
        }
        let mut cursor = Cursor::new(payload);
        let read_err = |_| ProtocolError::ValidationFailed(PacketType::Pong as u8);
        Ok(Self {
            client_timestamp: cursor.read_u32::<LittleEndian>().map_err(read_err)?,
            server_timestamp: cursor.read_u32::<LittleEndian>().map_err(read_err)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_connect_round_trip() {
        let payload = ClientConnect {
            protocol_version: 1,
            player_name: "Ada".to_owned(),
            client_id: 777,
        };
        let bytes = payload.write();
        assert_eq!(bytes.len(), ClientConnect::PAYLOAD_SIZE);
        assert_eq!(ClientConnect::parse(&bytes).unwrap(), payload);
    }

    #[test]
    fn player_name_is_truncated_to_field_width() {
        let payload = ClientConnect {
            protocol_version: 1,
            player_name: "x".repeat(64),
            client_id: 1,
        };
        let bytes = payload.write();
        assert_eq!(bytes.len(), ClientConnect::PAYLOAD_SIZE);
        let back = ClientConnect::parse(&bytes).unwrap();
        assert_eq!(back.player_name.len(), PLAYER_NAME_LEN);
    }

    #[test]
    fn entity_spawn_playable_flag_offset() {
        let spawn = EntitySpawn {
            entity_id: 9,
            entity_kind: EntityKind::Player,
            position_x: 100,
            position_y: 200,
            mob_variant: 0,
            initial_health: 100,
            initial_velocity_x: 0,
            initial_velocity_y: 0,
            is_playable: false,
        };
        let mut bytes = spawn.write();
        assert_eq!(bytes[EntitySpawn::IS_PLAYABLE_OFFSET], 0);
        bytes[EntitySpawn::IS_PLAYABLE_OFFSET] = 1;
        assert!(EntitySpawn::parse(&bytes).unwrap().is_playable);
    }

    #[test]
    fn weapon_fire_rejects_unknown_weapon() {
        let fire = WeaponFire {
            shooter_id: 1,
            projectile_id: 2,
            origin_x: 10,
            origin_y: 20,
            direction_x: 1000,
            direction_y: 0,
            weapon_type: WeaponKind::Basic,
        };
        let mut bytes = fire.write();
        *bytes.last_mut().unwrap() = 0x42;
        assert!(matches!(
            WeaponFire::parse(&bytes),
            Err(ProtocolError::FieldOutOfRange { field: "weapon_type", .. })
        ));
    }

    #[test]
    fn full_state_round_trip() {
        let state = EntityFullState {
            entity_id: 12,
            entity_kind: EntityKind::Enemy,
            components: vec![(0x01, vec![1, 2, 3, 4]), (0x03, vec![9, 9])],
        };
        let bytes = state.write();
        assert_eq!(EntityFullState::parse(&bytes).unwrap(), state);
    }
}
