//! The binary wire protocol: framing, typed payloads, snapshots and the
//! table-driven codec.

pub mod codec;
pub mod packet;
pub mod payload;
pub mod snapshot;
pub mod types;

/// 'RT', little-endian, leads every datagram.
pub const PROTOCOL_MAGIC: u16 = 0x5254;

/// Fixed packet header size in bytes.
pub const HEADER_SIZE: usize = 12;

/// Current handshake protocol version.
pub const PROTOCOL_VERSION: u8 = 1;

/// Largest UDP payload a datagram can carry.
pub const MAX_DATAGRAM_SIZE: usize = 65507;

/// Fixed width of the player name field in CLIENT_CONNECT.
pub const PLAYER_NAME_LEN: usize = 32;

/// Fixed width of the reason message field in SERVER_REJECT.
pub const REJECT_REASON_LEN: usize = 64;
