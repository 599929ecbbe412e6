//! # Aster Game
//! Gameplay systems, the coordinator bridging the ECS and the wire
//! protocol, and the role-aware fixed-timestep game driver.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod builders;
mod coordinator;
mod driver;
mod events;
pub mod systems;

pub use builders::{EntityBuilders, ENEMY_BASE_HEALTH, PLAYER_BASE_HEALTH};
pub use coordinator::{Coordinator, SnapshotCadence};
pub use driver::{ClientNet, ConnectionEvent, GameDriver, NullNet, Role, ServerNet};
pub use events::{
    Addressing, DeathEvent, DestroyedEvent, EffectEvent, EventBus, GameEvents, HitEvent,
    LevelEvent, OutboundPacket, PickupEvent, ScoreDelta, ScoreEvent, WeaponFireEvent,
};

/// Playfield extents in world units. Players are clamped inside; enemies
/// and projectiles despawn once safely past the edges.
pub const WORLD_WIDTH: f32 = 1920.0;
pub const WORLD_HEIGHT: f32 = 1080.0;

/// Player ship speed, units per second.
pub const PLAYER_SPEED: f32 = 320.0;

/// Where newly accepted players appear; staggered vertically per slot.
pub const PLAYER_SPAWN_X: f32 = 120.0;
pub const PLAYER_SPAWN_BASE_Y: f32 = 240.0;
pub const PLAYER_SPAWN_SPACING_Y: f32 = 120.0;
