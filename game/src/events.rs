//! The event bus between gameplay systems and the coordinator. Systems
//! publish simulation side effects here; the coordinator drains them once
//! per tick and turns them into packets.

use std::sync::{Arc, Mutex, MutexGuard};

use aster_shared::{
    AudioEffect, DestroyReason, EntityId, Packet, ParticleSpawn, PlayerId, PowerupKind,
    VisualEffect, WeaponKind,
};

/// How an outbound packet is fanned out by the server network manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Addressing {
    /// Every active slot.
    Broadcast,
    /// One specific player.
    To(PlayerId),
    /// Every active slot except one; used to keep a client from receiving
    /// its own relayed input back.
    Except(PlayerId),
}

/// One packet plus its fan-out.
#[derive(Debug, Clone)]
pub struct OutboundPacket {
    pub packet: Packet,
    pub addressing: Addressing,
}

impl OutboundPacket {
    pub fn broadcast(packet: Packet) -> Self {
        Self {
            packet,
            addressing: Addressing::Broadcast,
        }
    }

    pub fn to(packet: Packet, player: PlayerId) -> Self {
        Self {
            packet,
            addressing: Addressing::To(player),
        }
    }

    pub fn except(packet: Packet, player: PlayerId) -> Self {
        Self {
            packet,
            addressing: Addressing::Except(player),
        }
    }
}

/// A shot fired this tick, queued by the shoot system.
#[derive(Debug, Clone, Copy)]
pub struct WeaponFireEvent {
    /// Networked id of the shooter.
    pub shooter_id: u32,
    /// The locally spawned projectile entity.
    pub projectile: EntityId,
    pub origin_x: f32,
    pub origin_y: f32,
    /// Unit direction vector.
    pub direction_x: f32,
    pub direction_y: f32,
    pub weapon: WeaponKind,
}

/// A networked entity destroyed this tick.
#[derive(Debug, Clone, Copy)]
pub struct DestroyedEvent {
    pub network_id: u32,
    pub reason: DestroyReason,
    pub final_x: f32,
    pub final_y: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct HitEvent {
    pub victim_id: u32,
    pub attacker_id: u32,
    pub damage: u8,
}

#[derive(Debug, Clone, Copy)]
pub struct DeathEvent {
    pub victim_id: u32,
    pub killer_id: u32,
}

/// A score change requested by gameplay, applied by the score system.
#[derive(Debug, Clone, Copy)]
pub struct ScoreDelta {
    pub player_id: u32,
    pub delta: i32,
}

/// A score value that changed and must be replicated.
#[derive(Debug, Clone, Copy)]
pub struct ScoreEvent {
    pub player_id: u32,
    pub score: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct PickupEvent {
    pub player_id: u32,
    pub powerup_id: u32,
    pub kind: PowerupKind,
}

#[derive(Debug, Clone, Copy)]
pub enum LevelEvent {
    Started { index: u32, enemy_count: u32 },
    Completed { index: u32, elapsed_secs: u32 },
}

/// Display-layer feedback received from the server, drained by the host
/// application (the core does not render or play audio).
#[derive(Debug, Clone, Copy)]
pub enum EffectEvent {
    Visual(VisualEffect),
    Audio(AudioEffect),
    Particle(ParticleSpawn),
}

/// Everything systems can publish during one tick.
#[derive(Debug, Default)]
pub struct GameEvents {
    pub weapon_fires: Vec<WeaponFireEvent>,
    pub destroyed: Vec<DestroyedEvent>,
    pub hits: Vec<HitEvent>,
    pub deaths: Vec<DeathEvent>,
    pub score_deltas: Vec<ScoreDelta>,
    pub score_updates: Vec<ScoreEvent>,
    pub pickups: Vec<PickupEvent>,
    pub level_events: Vec<LevelEvent>,
}

/// Cheaply clonable handle to the per-tick event queues. Everything runs
/// on the main thread; the mutex is uncontended and exists so systems and
/// the coordinator can share the bus without borrow gymnastics.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<GameEvents>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self) -> MutexGuard<'_, GameEvents> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn queue_weapon_fire(&self, event: WeaponFireEvent) {
        self.lock().weapon_fires.push(event);
    }

    pub fn queue_destroyed(&self, event: DestroyedEvent) {
        self.lock().destroyed.push(event);
    }

    pub fn queue_score_delta(&self, player_id: u32, delta: i32) {
        self.lock().score_deltas.push(ScoreDelta { player_id, delta });
    }

    /// Takes every queued event, leaving the bus empty.
    pub fn drain(&self) -> GameEvents {
        std::mem::take(&mut *self.lock())
    }
}
