use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::{HEADER_SIZE, PROTOCOL_MAGIC};
use crate::error::ProtocolError;

/// The fixed 12-byte header that leads every datagram.
///
/// | offset | size | field           |
/// |--------|------|-----------------|
/// | 0      | 2    | magic (LE)      |
/// | 2      | 1    | packet_type     |
/// | 3      | 1    | flags           |
/// | 4      | 4    | sequence (LE)   |
/// | 8      | 4    | timestamp (LE)  |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub magic: u16,
    pub packet_type: u8,
    pub flags: u8,
    pub sequence_number: u32,
    pub timestamp: u32,
}

impl PacketHeader {
    pub fn new(packet_type: u8, flags: u8, sequence_number: u32, timestamp: u32) -> Self {
        Self {
            magic: PROTOCOL_MAGIC,
            packet_type,
            flags,
            sequence_number,
            timestamp,
        }
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        // Writing into a Vec cannot fail.
        let _ = out.write_u16::<LittleEndian>(self.magic);
        let _ = out.write_u8(self.packet_type);
        let _ = out.write_u8(self.flags);
        let _ = out.write_u32::<LittleEndian>(self.sequence_number);
        let _ = out.write_u32::<LittleEndian>(self.timestamp);
    }

    pub fn read_from(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < HEADER_SIZE {
            return Err(ProtocolError::PayloadTooShort {
                packet_type: 0,
                size: bytes.len(),
                minimum: HEADER_SIZE,
            });
        }
        let mut cursor = Cursor::new(bytes);
        let magic = cursor
            .read_u16::<LittleEndian>()
            .map_err(|_| ProtocolError::ValidationFailed(0))?;
        if magic != PROTOCOL_MAGIC {
            return Err(ProtocolError::BadMagic {
                found: magic,
                expected: PROTOCOL_MAGIC,
            });
        }
        let packet_type = cursor
            .read_u8()
            .map_err(|_| ProtocolError::ValidationFailed(0))?;
        let flags = cursor
            .read_u8()
            .map_err(|_| ProtocolError::ValidationFailed(packet_type))?;
        let sequence_number = cursor
            .read_u32::<LittleEndian>()
            .map_err(|_| ProtocolError::ValidationFailed(packet_type))?;
        let timestamp = cursor
            .read_u32::<LittleEndian>()
            .map_err(|_| ProtocolError::ValidationFailed(packet_type))?;
        Ok(Self {
            magic,
            packet_type,
            flags,
            sequence_number,
            timestamp,
        })
    }
}

/// One wire packet: header plus raw payload bytes. Exactly one packet per
/// UDP datagram; no internal fragmentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub header: PacketHeader,
    pub payload: Vec<u8>,
}

impl Packet {
    pub fn new(header: PacketHeader, payload: Vec<u8>) -> Self {
        Self { header, payload }
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE + self.payload.len());
        self.header.write_to(&mut out);
        out.extend_from_slice(&self.payload);
        out
    }

    /// Parses a datagram. Rejects anything below header size or with a
    /// foreign magic; payload content is validated by the codec.
    pub fn deserialize(bytes: &[u8]) -> Result<Packet, ProtocolError> {
        let header = PacketHeader::read_from(bytes)?;
        Ok(Packet {
            header,
            payload: bytes[HEADER_SIZE..].to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout_is_twelve_bytes_little_endian() {
        let header = PacketHeader::new(0x21, 0x01, 0x01020304, 0x0A0B0C0D);
        let mut bytes = Vec::new();
        header.write_to(&mut bytes);
        assert_eq!(
            bytes,
            vec![0x54, 0x52, 0x21, 0x01, 0x04, 0x03, 0x02, 0x01, 0x0D, 0x0C, 0x0B, 0x0A]
        );
    }

    #[test]
    fn serialize_deserialize_round_trip() {
        let packet = Packet::new(PacketHeader::new(0x10, 0, 7, 1234), vec![1, 2, 3, 4]);
        let bytes = packet.serialize();
        let back = Packet::deserialize(&bytes).unwrap();
        assert_eq!(back, packet);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut bytes = Packet::new(PacketHeader::new(0x10, 0, 0, 0), vec![]).serialize();
        bytes[0] = 0xFF;
        assert!(matches!(
            Packet::deserialize(&bytes),
            Err(ProtocolError::BadMagic { .. })
        ));
    }

    #[test]
    fn short_datagram_is_rejected() {
        assert!(Packet::deserialize(&[0x54, 0x52, 0x10]).is_err());
    }
}
