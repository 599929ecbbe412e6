use std::io;

use thiserror::Error;

/// Errors raised by the UDP transport and the network managers built on it.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Failed to bind UDP socket on {addr}: {source}")]
    Bind { addr: String, source: io::Error },
    #[error("Failed to send datagram: {0}")]
    Send(io::Error),
    #[error("Failed to receive datagram: {0}")]
    Receive(io::Error),
    #[error("Datagram of {size} bytes is below the {expected}-byte packet header")]
    DatagramTooShort { size: usize, expected: usize },
    #[error("No peer to reply to: nothing has been received on this socket yet")]
    NoLastSender,
    #[error("Socket is closed")]
    SocketClosed,
}

/// Per-packet protocol violations. These are always local: the offending
/// packet is dropped and the loop continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("Bad magic 0x{found:04X}, expected 0x{expected:04X}")]
    BadMagic { found: u16, expected: u16 },
    #[error("Unknown packet type 0x{0:02X}")]
    UnknownPacketType(u8),
    #[error("Packet type 0x{packet_type:02X}: payload of {size} bytes is below the minimum of {minimum}")]
    PayloadTooShort {
        packet_type: u8,
        size: usize,
        minimum: usize,
    },
    #[error("Packet type 0x{packet_type:02X}: field {field} value {value} is out of range")]
    FieldOutOfRange {
        packet_type: u8,
        field: &'static str,
        value: u32,
    },
    #[error("Packet validation failed for type 0x{0:02X}")]
    ValidationFailed(u8),
    #[error("Malformed builder arguments for packet type 0x{0:02X}")]
    MalformedBuildArgs(u8),
}

/// Failures of the ECS substrate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EcsError {
    #[error("Operation on dead entity {0}")]
    InvalidEntity(u32),
    #[error("System '{0}' is already registered")]
    DuplicateSystem(&'static str),
    #[error("System '{0}' is not registered")]
    InvalidSystem(&'static str),
    #[error("Component kind {0:?} has not been registered")]
    ComponentAccess(&'static str),
    #[error("Entity id {0} is already live in its id space")]
    IdInUse(u32),
}

/// CLI / configuration parse failures. Always fatal (exit code 84).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid value for {flag}: {reason}")]
    InvalidValue { flag: String, reason: String },
}

/// Logical precondition violations during a simulation step. The offending
/// entity is logged and skipped; the step continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameplayError {
    #[error("Gameplay precondition violated: {0}")]
    Precondition(String),
    #[error("Entity {0} is missing a required component")]
    MissingComponent(u32),
}

/// Server lifecycle failures.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error("Server is not running")]
    NotRunning,
    #[error("Server I/O thread panicked")]
    IoThreadPanicked,
}

/// Client lifecycle failures.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error("Connection rejected by server: {reason} (code {code})")]
    Rejected { code: u8, reason: String },
    #[error("No SERVER_ACCEPT received within {0} ms")]
    ConnectTimeout(u64),
    #[error("Client is not connected")]
    NotConnected,
}
