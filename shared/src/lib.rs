//! # Aster Shared
//! Common functionality shared between the aster-server & aster-client crates.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod components;
mod connection;
mod ecs;
mod error;
mod protocol;
mod tick;
mod time;
mod transport;
mod types;

pub use components::{
    Ai, AiBehaviour, Animation, DeadPlayer, Enemy, EnemyKind, Force, ForceAttachment, GameAction,
    GameConfig, Health, HitBox, InputComponent, Level, Lifetime, NetworkId, Playable, Powerup,
    PowerupKind, Projectile, ProjectileKind, Score, EnemySpawn, Sprite, Team, TeamKind, Transform,
    Velocity, Weapon, Wave,
};
pub use connection::{BaseConnection, ConnectionConfig};
pub use ecs::{
    Component, ComponentKind, ComponentStore, EntityId, EntityScope, Signature, System, World,
    COMPONENT_KIND_COUNT,
};
pub use error::{
    ClientError, ConfigError, EcsError, GameplayError, NetworkError, ProtocolError, ServerError,
};
pub use protocol::{
    codec::{self, PacketHandler, PACKET_HANDLERS},
    packet::{Packet, PacketHeader},
    payload::{
        Ack, AiState, AudioEffect, ClientConnect, ClientDisconnect, ComponentAdd, ComponentRemove,
        EntityDestroy, EntityFullState, EntitySpawn, ForceState, GameEnd, GameStart, Heartbeat,
        LevelComplete, LevelStart, ParticleSpawn, Ping, PlayerDeath, PlayerHit, PlayerInput,
        PlayerReady, Pong, PowerupPickup, ScoreUpdate, ServerAccept, ServerReject, VisualEffect,
        WeaponFire,
    },
    snapshot::{
        AiData, AnimationData, HealthData, Snapshot, SnapshotData, TransformData, VelocityData,
        WeaponData,
    },
    types::{
        flags, input_flags, DestroyReason, Difficulty, DisconnectReason, EntityKind, PacketType,
        RejectCode, WeaponKind, AUDIO_EFFECT_MAX, VISUAL_EFFECT_MAX,
    },
    HEADER_SIZE, MAX_DATAGRAM_SIZE, PROTOCOL_MAGIC, PROTOCOL_VERSION,
};
pub use tick::{TickAccumulator, TickConfig, MAX_TICKS_PER_ITERATION};
pub use time::{GameClock, Timer};
pub use transport::UdpTransport;
pub use types::{PlayerId, SequenceNumber, Tick};
