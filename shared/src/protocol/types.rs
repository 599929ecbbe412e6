//! Packet type identifiers, header flags and wire enumerations.

/// Every packet type on the wire, grouped by family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    // Connection (0x01-0x0F)
    ClientConnect = 0x01,
    ServerAccept = 0x02,
    ServerReject = 0x03,
    ClientDisconnect = 0x04,
    Heartbeat = 0x05,

    // Input (0x10-0x1F)
    PlayerInput = 0x10,

    // World state (0x20-0x3F)
    EntitySpawn = 0x21,
    EntityDestroy = 0x22,
    TransformSnapshot = 0x24,
    VelocitySnapshot = 0x25,
    HealthSnapshot = 0x26,
    WeaponSnapshot = 0x27,
    AiSnapshot = 0x28,
    AnimationSnapshot = 0x29,
    ComponentAdd = 0x2A,
    ComponentRemove = 0x2B,
    TransformSnapshotDelta = 0x2C,
    HealthSnapshotDelta = 0x2D,
    EntityFullState = 0x2E,

    // Game events (0x40-0x5F)
    PlayerHit = 0x40,
    PlayerDeath = 0x41,
    ScoreUpdate = 0x42,
    PowerupPickup = 0x43,
    WeaponFire = 0x44,
    VisualEffect = 0x50,
    AudioEffect = 0x51,
    ParticleSpawn = 0x52,

    // Game control (0x60-0x6F)
    GameStart = 0x60,
    GameEnd = 0x61,
    LevelComplete = 0x62,
    LevelStart = 0x63,
    ForceState = 0x64,
    AiState = 0x65,
    PlayerIsReady = 0x66,
    PlayerNotReady = 0x67,

    // Protocol control (0x70-0x7F)
    Ack = 0x70,
    Ping = 0x71,
    Pong = 0x72,
}

impl PacketType {
    pub fn from_u8(value: u8) -> Option<PacketType> {
        use PacketType::*;
        Some(match value {
            0x01 => ClientConnect,
            0x02 => ServerAccept,
            0x03 => ServerReject,
            0x04 => ClientDisconnect,
            0x05 => Heartbeat,
            0x10 => PlayerInput,
            0x21 => EntitySpawn,
            0x22 => EntityDestroy,
            0x24 => TransformSnapshot,
            0x25 => VelocitySnapshot,
            0x26 => HealthSnapshot,
            0x27 => WeaponSnapshot,
            0x28 => AiSnapshot,
            0x29 => AnimationSnapshot,
            0x2A => ComponentAdd,
            0x2B => ComponentRemove,
            0x2C => TransformSnapshotDelta,
            0x2D => HealthSnapshotDelta,
            0x2E => EntityFullState,
            0x40 => PlayerHit,
            0x41 => PlayerDeath,
            0x42 => ScoreUpdate,
            0x43 => PowerupPickup,
            0x44 => WeaponFire,
            0x50 => VisualEffect,
            0x51 => AudioEffect,
            0x52 => ParticleSpawn,
            0x60 => GameStart,
            0x61 => GameEnd,
            0x62 => LevelComplete,
            0x63 => LevelStart,
            0x64 => ForceState,
            0x65 => AiState,
            0x66 => PlayerIsReady,
            0x67 => PlayerNotReady,
            0x70 => Ack,
            0x71 => Ping,
            0x72 => Pong,
            _ => return None,
        })
    }

    /// Control packets are consumed by the network managers themselves and
    /// never reach the game loop.
    pub fn is_control(self) -> bool {
        matches!(
            self,
            PacketType::ClientConnect
                | PacketType::ServerAccept
                | PacketType::ServerReject
                | PacketType::ClientDisconnect
                | PacketType::Heartbeat
                | PacketType::Ack
                | PacketType::Ping
                | PacketType::Pong
        )
    }
}

/// Header flag bits.
pub mod flags {
    /// Must be acknowledged by the receiver.
    pub const RELIABLE: u8 = 0x01;
    pub const COMPRESSED: u8 = 0x02;
    pub const ENCRYPTED: u8 = 0x04;
    pub const FRAGMENTED: u8 = 0x08;
    pub const PRIORITY: u8 = 0x10;
}

/// PLAYER_INPUT bitfield.
pub mod input_flags {
    pub const MOVE_UP: u16 = 0x0001;
    pub const MOVE_DOWN: u16 = 0x0002;
    pub const MOVE_LEFT: u16 = 0x0004;
    pub const MOVE_RIGHT: u16 = 0x0008;
    pub const FIRE_PRIMARY: u16 = 0x0010;
    pub const FIRE_SECONDARY: u16 = 0x0020;
    pub const ACTION_SPECIAL: u16 = 0x0040;

    /// Bits 0-8 are valid; 9-15 are reserved.
    pub const VALID_MASK: u16 = 0x01FF;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RejectCode {
    ServerFull = 0x00,
    IncompatibleProtocol = 0x01,
    InvalidPlayerName = 0x02,
    Banned = 0x03,
    Generic = 0xFF,
}

impl RejectCode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(RejectCode::ServerFull),
            0x01 => Some(RejectCode::IncompatibleProtocol),
            0x02 => Some(RejectCode::InvalidPlayerName),
            0x03 => Some(RejectCode::Banned),
            0xFF => Some(RejectCode::Generic),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DisconnectReason {
    Normal = 0x00,
    Timeout = 0x01,
    Kicked = 0x02,
    ClientError = 0x03,
    Generic = 0xFF,
}

impl DisconnectReason {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(DisconnectReason::Normal),
            0x01 => Some(DisconnectReason::Timeout),
            0x02 => Some(DisconnectReason::Kicked),
            0x03 => Some(DisconnectReason::ClientError),
            0xFF => Some(DisconnectReason::Generic),
            _ => None,
        }
    }
}

/// Wire entity categories carried in ENTITY_SPAWN / ENTITY_FULL_STATE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EntityKind {
    Player = 0x01,
    Enemy = 0x02,
    EnemyBoss = 0x03,
    ProjectilePlayer = 0x04,
    ProjectileEnemy = 0x05,
    Powerup = 0x06,
    Obstacle = 0x07,
    BgElement = 0x08,
}

impl EntityKind {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(EntityKind::Player),
            0x02 => Some(EntityKind::Enemy),
            0x03 => Some(EntityKind::EnemyBoss),
            0x04 => Some(EntityKind::ProjectilePlayer),
            0x05 => Some(EntityKind::ProjectileEnemy),
            0x06 => Some(EntityKind::Powerup),
            0x07 => Some(EntityKind::Obstacle),
            0x08 => Some(EntityKind::BgElement),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DestroyReason {
    KilledByPlayer = 0x00,
    KilledByEnemy = 0x01,
    OutOfBounds = 0x02,
    TimeoutDespawn = 0x03,
    LevelTransition = 0x04,
}

impl DestroyReason {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(DestroyReason::KilledByPlayer),
            0x01 => Some(DestroyReason::KilledByEnemy),
            0x02 => Some(DestroyReason::OutOfBounds),
            0x03 => Some(DestroyReason::TimeoutDespawn),
            0x04 => Some(DestroyReason::LevelTransition),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WeaponKind {
    Basic = 0x00,
    Charged = 0x01,
    Spread = 0x02,
    Laser = 0x03,
    Missile = 0x04,
    ForceShot = 0x05,
}

impl WeaponKind {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(WeaponKind::Basic),
            0x01 => Some(WeaponKind::Charged),
            0x02 => Some(WeaponKind::Spread),
            0x03 => Some(WeaponKind::Laser),
            0x04 => Some(WeaponKind::Missile),
            0x05 => Some(WeaponKind::ForceShot),
            _ => None,
        }
    }

    /// Projectile speed in units per second.
    pub fn projectile_speed(self) -> f32 {
        match self {
            WeaponKind::Basic => 600.0,
            WeaponKind::Charged => 450.0,
            WeaponKind::Spread => 500.0,
            WeaponKind::Laser => 900.0,
            WeaponKind::Missile => 350.0,
            WeaponKind::ForceShot => 700.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Difficulty {
    Easy = 0x00,
    Normal = 0x01,
    Hard = 0x02,
    Insane = 0x03,
}

impl Difficulty {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Difficulty::Easy),
            0x01 => Some(Difficulty::Normal),
            0x02 => Some(Difficulty::Hard),
            0x03 => Some(Difficulty::Insane),
            _ => None,
        }
    }
}

/// Highest valid visual effect id (VFX_EXPLOSION_SMALL .. VFX_BOSS_INTRO).
pub const VISUAL_EFFECT_MAX: u8 = 0x0C;

/// Highest valid audio effect id.
pub const AUDIO_EFFECT_MAX: u8 = 0x18;

/// Highest valid wire AI behaviour id (AI_IDLE .. AI_KAMIKAZE).
pub const AI_BEHAVIOUR_MAX: u8 = 0x0A;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packet_type_round_trips() {
        for value in 0..=0xFF_u8 {
            if let Some(packet_type) = PacketType::from_u8(value) {
                assert_eq!(packet_type as u8, value);
            }
        }
    }

    #[test]
    fn control_classification() {
        assert!(PacketType::Heartbeat.is_control());
        assert!(PacketType::Ping.is_control());
        assert!(!PacketType::PlayerInput.is_control());
        assert!(!PacketType::TransformSnapshot.is_control());
    }
}
