//! The ECS substrate: entity id spaces, signatures, typed component stores
//! behind a static kind registry, and the system registry.

mod entity;
mod signature;
mod store;
mod system;
mod world;

pub use entity::{EntityId, EntityScope};
pub use signature::Signature;
pub use store::{Component, ComponentStore};
pub use system::System;
pub use world::World;

/// Compile-time enumeration of every component kind. The discriminant is
/// both the signature bit position and, for replicated kinds, the wire
/// component id (COMPONENT_ADD / COMPONENT_REMOVE payloads).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ComponentKind {
    Transform = 0x01,
    Velocity = 0x02,
    Health = 0x03,
    Weapon = 0x04,
    Ai = 0x05,
    Force = 0x06,
    HitBox = 0x07,
    Sprite = 0x08,
    Animation = 0x09,
    Powerup = 0x0A,
    Score = 0x0B,
    Input = 0x0C,
    Lifetime = 0x0E,
    // Kinds below never appear on the wire.
    NetworkId = 0x10,
    Playable = 0x11,
    Enemy = 0x12,
    Projectile = 0x13,
    Team = 0x14,
    Level = 0x15,
    DeadPlayer = 0x16,
    GameConfig = 0x17,
}

/// Size of the type-erased store table (one slot per possible discriminant).
pub const COMPONENT_KIND_COUNT: usize = 0x18;

impl ComponentKind {
    pub const ALL: [ComponentKind; 21] = [
        ComponentKind::Transform,
        ComponentKind::Velocity,
        ComponentKind::Health,
        ComponentKind::Weapon,
        ComponentKind::Ai,
        ComponentKind::Force,
        ComponentKind::HitBox,
        ComponentKind::Sprite,
        ComponentKind::Animation,
        ComponentKind::Powerup,
        ComponentKind::Score,
        ComponentKind::Input,
        ComponentKind::Lifetime,
        ComponentKind::NetworkId,
        ComponentKind::Playable,
        ComponentKind::Enemy,
        ComponentKind::Projectile,
        ComponentKind::Team,
        ComponentKind::Level,
        ComponentKind::DeadPlayer,
        ComponentKind::GameConfig,
    ];

    /// Signature bit position / store table index.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Wire component id for kinds that can be replicated through
    /// COMPONENT_ADD / COMPONENT_REMOVE; `None` for process-local kinds.
    pub fn wire_id(self) -> Option<u8> {
        match self {
            ComponentKind::Transform
            | ComponentKind::Velocity
            | ComponentKind::Health
            | ComponentKind::Weapon
            | ComponentKind::Ai
            | ComponentKind::Force
            | ComponentKind::HitBox
            | ComponentKind::Sprite
            | ComponentKind::Animation
            | ComponentKind::Powerup
            | ComponentKind::Score
            | ComponentKind::Input
            | ComponentKind::Lifetime => Some(self as u8),
            _ => None,
        }
    }

    /// Inverse of [`ComponentKind::wire_id`].
    pub fn from_wire_id(id: u8) -> Option<ComponentKind> {
        ComponentKind::ALL
            .into_iter()
            .find(|kind| kind.wire_id() == Some(id))
    }

    pub fn name(self) -> &'static str {
        match self {
            ComponentKind::Transform => "Transform",
            ComponentKind::Velocity => "Velocity",
            ComponentKind::Health => "Health",
            ComponentKind::Weapon => "Weapon",
            ComponentKind::Ai => "Ai",
            ComponentKind::Force => "Force",
            ComponentKind::HitBox => "HitBox",
            ComponentKind::Sprite => "Sprite",
            ComponentKind::Animation => "Animation",
            ComponentKind::Powerup => "Powerup",
            ComponentKind::Score => "Score",
            ComponentKind::Input => "Input",
            ComponentKind::Lifetime => "Lifetime",
            ComponentKind::NetworkId => "NetworkId",
            ComponentKind::Playable => "Playable",
            ComponentKind::Enemy => "Enemy",
            ComponentKind::Projectile => "Projectile",
            ComponentKind::Team => "Team",
            ComponentKind::Level => "Level",
            ComponentKind::DeadPlayer => "DeadPlayer",
            ComponentKind::GameConfig => "GameConfig",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_ids_round_trip() {
        for kind in ComponentKind::ALL {
            if let Some(id) = kind.wire_id() {
                assert_eq!(ComponentKind::from_wire_id(id), Some(kind));
            }
        }
    }

    #[test]
    fn local_kinds_have_no_wire_id() {
        assert_eq!(ComponentKind::NetworkId.wire_id(), None);
        assert_eq!(ComponentKind::Projectile.wire_id(), None);
        assert_eq!(ComponentKind::from_wire_id(0x10), None);
    }

    #[test]
    fn indices_fit_the_store_table() {
        for kind in ComponentKind::ALL {
            assert!(kind.index() < COMPONENT_KIND_COUNT);
        }
    }
}
