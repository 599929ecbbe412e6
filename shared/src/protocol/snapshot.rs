//! Per-component snapshot packets: `world_tick`, `entity_count`, then
//! `entity_count` records of `(entity_id, component data)`. Delta variants
//! insert a `base_tick` after the world tick and list only changed
//! entities.

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::ProtocolError;
use crate::types::Tick;

/// Fixed-layout component data that can ride in a snapshot record.
pub trait SnapshotData: Sized + Copy {
    const WIRE_SIZE: usize;

    fn write(&self, out: &mut Vec<u8>);
    fn read(cursor: &mut Cursor<&[u8]>) -> Option<Self>;
}

/// Transform on the wire: quantized position, rotation and scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformData {
    pub pos_x: i16,
    pub pos_y: i16,
    /// 0..=65535 maps to 0..=360 degrees.
    pub rotation: u16,
    /// Fixed point, 1000 = 1.0x.
    pub scale: u16,
}

impl SnapshotData for TransformData {
    const WIRE_SIZE: usize = 8;

    fn write(&self, out: &mut Vec<u8>) {
        let _ = out.write_i16::<LittleEndian>(self.pos_x);
        let _ = out.write_i16::<LittleEndian>(self.pos_y);
        let _ = out.write_u16::<LittleEndian>(self.rotation);
        let _ = out.write_u16::<LittleEndian>(self.scale);
    }

    fn read(cursor: &mut Cursor<&[u8]>) -> Option<Self> {
        Some(Self {
            pos_x: cursor.read_i16::<LittleEndian>().ok()?,
            pos_y: cursor.read_i16::<LittleEndian>().ok()?,
            rotation: cursor.read_u16::<LittleEndian>().ok()?,
            scale: cursor.read_u16::<LittleEndian>().ok()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VelocityData {
    pub vel_x: i16,
    pub vel_y: i16,
    pub accel_x: i16,
    pub accel_y: i16,
}

impl SnapshotData for VelocityData {
    const WIRE_SIZE: usize = 8;

    fn write(&self, out: &mut Vec<u8>) {
        let _ = out.write_i16::<LittleEndian>(self.vel_x);
        let _ = out.write_i16::<LittleEndian>(self.vel_y);
        let _ = out.write_i16::<LittleEndian>(self.accel_x);
        let _ = out.write_i16::<LittleEndian>(self.accel_y);
    }

    fn read(cursor: &mut Cursor<&[u8]>) -> Option<Self> {
        Some(Self {
            vel_x: cursor.read_i16::<LittleEndian>().ok()?,
            vel_y: cursor.read_i16::<LittleEndian>().ok()?,
            accel_x: cursor.read_i16::<LittleEndian>().ok()?,
            accel_y: cursor.read_i16::<LittleEndian>().ok()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthData {
    pub current: u8,
    pub max: u8,
    pub shield: u8,
    pub max_shield: u8,
}

impl SnapshotData for HealthData {
    const WIRE_SIZE: usize = 4;

    fn write(&self, out: &mut Vec<u8>) {
        let _ = out.write_u8(self.current);
        let _ = out.write_u8(self.max);
        let _ = out.write_u8(self.shield);
        let _ = out.write_u8(self.max_shield);
    }

    fn read(cursor: &mut Cursor<&[u8]>) -> Option<Self> {
        Some(Self {
            current: cursor.read_u8().ok()?,
            max: cursor.read_u8().ok()?,
            shield: cursor.read_u8().ok()?,
            max_shield: cursor.read_u8().ok()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeaponData {
    pub kind: u8,
    pub ammo: u8,
    pub cooldown_ms: u16,
    pub power: u8,
}

impl SnapshotData for WeaponData {
    const WIRE_SIZE: usize = 5;

    fn write(&self, out: &mut Vec<u8>) {
        let _ = out.write_u8(self.kind);
        let _ = out.write_u8(self.ammo);
        let _ = out.write_u16::<LittleEndian>(self.cooldown_ms);
        let _ = out.write_u8(self.power);
    }

    fn read(cursor: &mut Cursor<&[u8]>) -> Option<Self> {
        Some(Self {
            kind: cursor.read_u8().ok()?,
            ammo: cursor.read_u8().ok()?,
            cooldown_ms: cursor.read_u16::<LittleEndian>().ok()?,
            power: cursor.read_u8().ok()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AiData {
    pub state: u8,
    pub behavior: u8,
    pub target: u32,
    pub state_timer: u16,
}

impl SnapshotData for AiData {
    const WIRE_SIZE: usize = 8;

    fn write(&self, out: &mut Vec<u8>) {
        let _ = out.write_u8(self.state);
        let _ = out.write_u8(self.behavior);
        let _ = out.write_u32::<LittleEndian>(self.target);
        let _ = out.write_u16::<LittleEndian>(self.state_timer);
    }

    fn read(cursor: &mut Cursor<&[u8]>) -> Option<Self> {
        Some(Self {
            state: cursor.read_u8().ok()?,
            behavior: cursor.read_u8().ok()?,
            target: cursor.read_u32::<LittleEndian>().ok()?,
            state_timer: cursor.read_u16::<LittleEndian>().ok()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationData {
    pub animation_id: u16,
    pub frame_index: u16,
    pub frame_duration: u16,
    pub loop_mode: u8,
}

impl SnapshotData for AnimationData {
    const WIRE_SIZE: usize = 7;

    fn write(&self, out: &mut Vec<u8>) {
        let _ = out.write_u16::<LittleEndian>(self.animation_id);
        let _ = out.write_u16::<LittleEndian>(self.frame_index);
        let _ = out.write_u16::<LittleEndian>(self.frame_duration);
        let _ = out.write_u8(self.loop_mode);
    }

    fn read(cursor: &mut Cursor<&[u8]>) -> Option<Self> {
        Some(Self {
            animation_id: cursor.read_u16::<LittleEndian>().ok()?,
            frame_index: cursor.read_u16::<LittleEndian>().ok()?,
            frame_duration: cursor.read_u16::<LittleEndian>().ok()?,
            loop_mode: cursor.read_u8().ok()?,
        })
    }
}

/// A full or delta snapshot of one component kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot<T: SnapshotData> {
    pub world_tick: Tick,
    /// Reference tick for delta snapshots; `None` for full ones.
    pub base_tick: Option<Tick>,
    pub entries: Vec<(u32, T)>,
}

impl<T: SnapshotData> Snapshot<T> {
    /// world_tick + entity_count.
    pub const FULL_HEADER_SIZE: usize = 4 + 2;
    /// world_tick + base_tick + entity_count.
    pub const DELTA_HEADER_SIZE: usize = 4 + 4 + 2;

    pub fn full(world_tick: Tick) -> Self {
        Self {
            world_tick,
            base_tick: None,
            entries: Vec::new(),
        }
    }

    pub fn delta(world_tick: Tick, base_tick: Tick) -> Self {
        Self {
            world_tick,
            base_tick: Some(base_tick),
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, entity_id: u32, data: T) {
        self.entries.push((entity_id, data));
    }

    pub fn encode(&self) -> Vec<u8> {
        let header = if self.base_tick.is_some() {
            Self::DELTA_HEADER_SIZE
        } else {
            Self::FULL_HEADER_SIZE
        };
        let mut out = Vec::with_capacity(header + self.entries.len() * (4 + T::WIRE_SIZE));
        let _ = out.write_u32::<LittleEndian>(self.world_tick);
        if let Some(base_tick) = self.base_tick {
            let _ = out.write_u32::<LittleEndian>(base_tick);
        }
        let _ = out.write_u16::<LittleEndian>(self.entries.len().min(u16::MAX as usize) as u16);
        for (entity_id, data) in self.entries.iter().take(u16::MAX as usize) {
            let _ = out.write_u32::<LittleEndian>(*entity_id);
            data.write(&mut out);
        }
        out
    }

    /// Decodes a snapshot payload. `packet_type` is only used to label
    /// errors.
    pub fn decode(payload: &[u8], delta: bool, packet_type: u8) -> Result<Self, ProtocolError> {
        let header = if delta {
            Self::DELTA_HEADER_SIZE
        } else {
            Self::FULL_HEADER_SIZE
        };
        if payload.len() < header {
            return Err(ProtocolError::PayloadTooShort {
                packet_type,
                size: payload.len(),
                minimum: header,
            });
        }
        let mut cursor = Cursor::new(payload);
        let read_err = |_| ProtocolError::ValidationFailed(packet_type);
        let world_tick = cursor.read_u32::<LittleEndian>().map_err(read_err)?;
        let base_tick = if delta {
            Some(cursor.read_u32::<LittleEndian>().map_err(read_err)?)
        } else {
            None
        };
        let count = cursor.read_u16::<LittleEndian>().map_err(read_err)? as usize;
        let expected = header + count * (4 + T::WIRE_SIZE);
        if payload.len() < expected {
            return Err(ProtocolError::PayloadTooShort {
                packet_type,
                size: payload.len(),
                minimum: expected,
            });
        }
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            let entity_id = cursor.read_u32::<LittleEndian>().map_err(read_err)?;
            let data = T::read(&mut cursor).ok_or(ProtocolError::ValidationFailed(packet_type))?;
            entries.push((entity_id, data));
        }
        Ok(Self {
            world_tick,
            base_tick,
            entries,
        })
    }

    /// Size-only validation used by the codec: checks that the declared
    /// entity count is consistent with the payload length.
    pub fn validate(payload: &[u8], delta: bool) -> bool {
        let header = if delta {
            Self::DELTA_HEADER_SIZE
        } else {
            Self::FULL_HEADER_SIZE
        };
        if payload.len() < header {
            return false;
        }
        let count_offset = header - 2;
        let count =
            u16::from_le_bytes([payload[count_offset], payload[count_offset + 1]]) as usize;
        payload.len() >= header + count * (4 + T::WIRE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_snapshot_round_trip() {
        let mut snapshot = Snapshot::full(42);
        snapshot.push(
            10,
            TransformData {
                pos_x: 100,
                pos_y: 50,
                rotation: 0,
                scale: 1000,
            },
        );
        snapshot.push(
            11,
            TransformData {
                pos_x: 200,
                pos_y: 150,
                rotation: 0,
                scale: 1000,
            },
        );
        let bytes = snapshot.encode();
        let back = Snapshot::<TransformData>::decode(&bytes, false, 0x24).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn delta_snapshot_carries_base_tick() {
        let mut snapshot = Snapshot::delta(100, 97);
        snapshot.push(
            5,
            HealthData {
                current: 50,
                max: 100,
                shield: 0,
                max_shield: 0,
            },
        );
        let bytes = snapshot.encode();
        let back = Snapshot::<HealthData>::decode(&bytes, true, 0x2D).unwrap();
        assert_eq!(back.base_tick, Some(97));
        assert_eq!(back.entries.len(), 1);
    }

    #[test]
    fn truncated_snapshot_is_rejected() {
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
        let bytes = snapshot.encode();
        assert!(Snapshot::<TransformData>::decode(&bytes[..bytes.len() - 1], false, 0x24).is_err());
        assert!(!Snapshot::<TransformData>::validate(
            &bytes[..bytes.len() - 1],
            false
        ));
    }
}
