//! The coordinator bridges the ECS and the wire protocol: it applies
//! inbound packets to the world and turns world state plus gameplay events
//! into outbound packets.

use std::collections::{HashMap, HashSet};

use log::{debug, info, warn};

use aster_shared::{
    codec, flags, Ai, Animation, ComponentKind, DeadPlayer, EnemyKind, EntityDestroy,
    EntityFullState, EntityId, EntityKind, EntitySpawn, GameClock, Health, InputComponent, Packet,
    PacketType, PlayerDeath as PlayerDeathPayload, PlayerHit as PlayerHitPayload, PlayerId,
    PlayerInput, PlayerReady, PowerupKind, PowerupPickup as PowerupPickupPayload, Score,
    ScoreUpdate as ScoreUpdatePayload, Snapshot, Tick, Transform, Velocity, Weapon,
    WeaponFire as WeaponFirePayload, World,
};
use aster_shared::{
    AiData, AnimationData, ComponentAdd, ComponentRemove, GameEnd, GameStart, HealthData,
    LevelComplete, LevelStart, TransformData, VelocityData, WeaponData,
};

use crate::builders::{EntityBuilders, ENEMY_BASE_HEALTH, PLAYER_BASE_HEALTH};
use crate::driver::Role;
use crate::events::{EffectEvent, EventBus, LevelEvent, OutboundPacket};
use crate::systems::{
    AiSystem, AnimationSystem, CollisionSystem, InputSystem, LevelSystem, LifetimeSystem,
    MovementSystem, ScoreSystem, ShootSystem,
};
use crate::{PLAYER_SPAWN_BASE_Y, PLAYER_SPAWN_SPACING_Y, PLAYER_SPAWN_X};

/// Snapshot emission divisors, in ticks. Transform goes out every tick;
/// slower-moving component kinds go out less often.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotCadence {
    pub transform: u32,
    pub health: u32,
    pub weapon: u32,
    pub animation: u32,
}

impl Default for SnapshotCadence {
    fn default() -> Self {
        Self {
            transform: 1,
            health: 3,
            weapon: 6,
            animation: 4,
        }
    }
}

type ReadyCallback = Box<dyn FnMut(PlayerId, bool) + Send>;
type GameStateCallback = Box<dyn FnMut(bool) + Send>;
type LevelStartCallback = Box<dyn FnMut() + Send>;

pub struct Coordinator {
    world: World,
    role: Role,
    with_render: bool,
    events: EventBus,
    clock: GameClock,
    world_tick: Tick,
    sequence: u32,
    cadence: SnapshotCadence,
    game_instance_id: u32,
    game_running: bool,
    local_player_id: PlayerId,
    ready_players: HashMap<PlayerId, bool>,
    ready_callback: Option<ReadyCallback>,
    game_callback: Option<GameStateCallback>,
    level_start_callback: Option<LevelStartCallback>,
    /// Networked ids already announced through ENTITY_SPAWN.
    broadcasted: HashSet<u32>,
    /// Inbound packets to fan back out, minus their source (anti-echo).
    relay_queue: Vec<(Packet, PlayerId)>,
    /// Client-side ready state changes awaiting emission.
    pending_ready: Vec<bool>,
    /// Display-layer events for the host application to drain.
    pending_effects: Vec<EffectEvent>,
    /// Snapshot entities we have never seen a spawn for.
    unknown_snapshot_entities: HashSet<u32>,
    /// Newest world_tick applied per snapshot type; older ones are stale.
    last_applied: HashMap<PacketType, Tick>,
    /// Wire ids handed to projectiles in WEAPON_FIRE events.
    next_projectile_wire_id: u32,
}

impl Coordinator {
    pub fn new(role: Role, with_render: bool) -> Self {
        let mut world = World::new();
        EntityBuilders::register_components(&mut world);
        Self {
            world,
            role,
            with_render,
            events: EventBus::new(),
            clock: GameClock::new(),
            world_tick: 0,
            sequence: 0,
            cadence: SnapshotCadence::default(),
            game_instance_id: 0,
            game_running: false,
            local_player_id: 0,
            ready_players: HashMap::new(),
            ready_callback: None,
            game_callback: None,
            level_start_callback: None,
            broadcasted: HashSet::new(),
            relay_queue: Vec::new(),
            pending_ready: Vec::new(),
            pending_effects: Vec::new(),
            unknown_snapshot_entities: HashSet::new(),
            last_applied: HashMap::new(),
            next_projectile_wire_id: 1,
        }
    }

    /// Registers the gameplay schedule. Shared systems are registered in
    /// the same order on every role; authoritative-only systems slot into
    /// their fixed positions on the server and standalone roles.
    pub fn register_systems(&mut self) -> Result<(), aster_shared::EcsError> {
        let authoritative = self.role.is_authoritative();
        self.world.register_system(Box::new(InputSystem))?;
        if authoritative {
            self.world.register_system(Box::new(AiSystem::new(
                self.with_render,
                self.clock.clone(),
                self.events.clone(),
            )))?;
        }
        self.world.register_system(Box::new(MovementSystem::new(
            authoritative,
            self.events.clone(),
        )))?;
        self.world.register_system(Box::new(ShootSystem::new(
            authoritative,
            self.with_render,
            self.clock.clone(),
            self.events.clone(),
        )))?;
        self.world.register_system(Box::new(CollisionSystem::new(
            authoritative,
            self.events.clone(),
        )))?;
        self.world.register_system(Box::new(LifetimeSystem::new(
            authoritative,
            self.events.clone(),
        )))?;
        if authoritative {
            self.world
                .register_system(Box::new(LevelSystem::new(self.with_render, self.events.clone())))?;
            self.world
                .register_system(Box::new(ScoreSystem::new(self.events.clone())))?;
        }
        self.world.register_system(Box::new(AnimationSystem))?;
        self.world.start_running();
        Ok(())
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn events(&self) -> EventBus {
        self.events.clone()
    }

    pub fn clock(&self) -> GameClock {
        self.clock.clone()
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn world_tick(&self) -> Tick {
        self.world_tick
    }

    pub fn game_running(&self) -> bool {
        self.game_running
    }

    pub fn set_game_instance_id(&mut self, id: u32) {
        self.game_instance_id = id;
    }

    pub fn set_local_player(&mut self, player_id: PlayerId) {
        self.local_player_id = player_id;
    }

    pub fn local_player(&self) -> PlayerId {
        self.local_player_id
    }

    pub fn set_cadence(&mut self, cadence: SnapshotCadence) {
        self.cadence = cadence;
    }

    pub fn set_ready_callback(&mut self, callback: ReadyCallback) {
        self.ready_callback = Some(callback);
    }

    pub fn set_game_callback(&mut self, callback: GameStateCallback) {
        self.game_callback = Some(callback);
    }

    pub fn set_level_start_callback(&mut self, callback: LevelStartCallback) {
        self.level_start_callback = Some(callback);
    }

    /// Client-side: queue a ready state change for the next tick's output.
    pub fn queue_player_ready(&mut self, ready: bool) {
        self.pending_ready.push(ready);
    }

    /// Display-layer events received since the last call.
    pub fn take_effects(&mut self) -> Vec<EffectEvent> {
        std::mem::take(&mut self.pending_effects)
    }

    /// Entities referenced by snapshots before their spawn arrived.
    pub fn take_unknown_entities(&mut self) -> Vec<u32> {
        self.unknown_snapshot_entities.drain().collect()
    }

    /// Steps the gameplay schedule.
    pub fn step(&mut self, dt: f32) {
        self.world.step(dt);
    }

    fn next_packet(&mut self, packet_type: PacketType, header_flags: u8, payload: Vec<u8>) -> Packet {
        let sequence = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);
        codec::make_packet(
            packet_type,
            header_flags,
            sequence,
            self.clock.elapsed_ms(),
            payload,
        )
    }

    // ===============================================================
    // Server side
    // ===============================================================

    /// Handles an accepted connection: replicates the existing world to
    /// the newcomer, spawns their ship and fans out the spawn packets
    /// (is_playable set only on the owner's copy).
    pub fn on_player_connected(
        &mut self,
        player_id: PlayerId,
        out: &mut Vec<OutboundPacket>,
    ) {
        // The newcomer first learns about every already-announced entity.
        let existing: Vec<u32> = self.broadcasted.iter().copied().collect();
        for network_id in existing {
            let entity = EntityId::from_raw(network_id);
            if !self.world.is_alive(entity) {
                continue;
            }
            if let Some(spawn) = self.spawn_payload_for(entity, false) {
                let packet =
                    self.next_packet(PacketType::EntitySpawn, flags::RELIABLE, spawn.write());
                out.push(OutboundPacket::to(packet, player_id));
            }
        }

        let slot_index = self.ready_players.len() as f32;
        let spawn_x = PLAYER_SPAWN_X;
        let spawn_y = PLAYER_SPAWN_BASE_Y + slot_index * PLAYER_SPAWN_SPACING_Y;
        let created = EntityBuilders::player(
            &mut self.world,
            player_id,
            spawn_x,
            spawn_y,
            0.0,
            0.0,
            PLAYER_BASE_HEALTH,
            false,
            self.with_render,
        );
        let entity = match created {
            Ok(entity) => entity,
            Err(error) => {
                warn!("player {} spawn failed: {}", player_id, error);
                return;
            }
        };
        self.broadcasted.insert(player_id);
        self.ready_players.entry(player_id).or_insert(false);

        if let Some(spawn) = self.spawn_payload_for(entity, false) {
            let mut owner_copy = spawn;
            owner_copy.is_playable = true;
            let owner_packet =
                self.next_packet(PacketType::EntitySpawn, flags::RELIABLE, owner_copy.write());
            out.push(OutboundPacket::to(owner_packet, player_id));

            let others_packet =
                self.next_packet(PacketType::EntitySpawn, flags::RELIABLE, spawn.write());
            out.push(OutboundPacket::except(others_packet, player_id));
        }
        info!(
            "player {} spawned at ({:.0}, {:.0})",
            player_id, spawn_x, spawn_y
        );
    }

    /// Handles a disconnect or timeout: one entity destroy, one broadcast.
    pub fn on_player_disconnected(
        &mut self,
        player_id: PlayerId,
        reason: aster_shared::DestroyReason,
        out: &mut Vec<OutboundPacket>,
    ) {
        self.ready_players.remove(&player_id);
        let entity = EntityId::from_raw(player_id);
        if !self.world.is_alive(entity) {
            return;
        }
        let position = self
            .world
            .get::<Transform>(entity)
            .map(|transform| (transform.x, transform.y))
            .unwrap_or((0.0, 0.0));
        if let Err(error) = self.world.despawn(entity) {
            warn!("player {} despawn failed: {}", player_id, error);
        }
        self.broadcasted.remove(&player_id);
        let destroy = EntityDestroy {
            entity_id: player_id,
            reason,
            final_position_x: position.0.max(0.0) as u16,
            final_position_y: position.1.max(0.0) as u16,
        };
        let packet = self.next_packet(PacketType::EntityDestroy, flags::RELIABLE, destroy.write());
        out.push(OutboundPacket::broadcast(packet));
        info!("player {} destroyed ({:?})", player_id, reason);
    }

    /// Starts the game once every connected player has reported ready.
    pub fn maybe_start_game(&mut self, connected: &[PlayerId], out: &mut Vec<OutboundPacket>) {
        if self.game_running || connected.is_empty() {
            return;
        }
        let all_ready = connected
            .iter()
            .all(|player| self.ready_players.get(player).copied().unwrap_or(false));
        if !all_ready {
            return;
        }
        self.game_running = true;
        let start = GameStart {
            game_id: self.game_instance_id,
            world_seed: fastrand::u32(..),
            max_players: connected.len() as u32,
            level_index: 1,
            difficulty: aster_shared::Difficulty::Normal as u8,
        };
        let packet = self.next_packet(PacketType::GameStart, flags::RELIABLE, start.write());
        out.push(OutboundPacket::broadcast(packet));
        if let Some(callback) = self.game_callback.as_mut() {
            callback(true);
        }
        info!("game {} started with {} players", self.game_instance_id, connected.len());
    }

    /// Applies one gameplay packet received from `source`. Control packets
    /// never reach this path; the network manager consumes them.
    pub fn process_server_packet(&mut self, packet: &Packet, source: PlayerId) {
        let packet_type = match codec::process_packet(packet) {
            Ok(packet_type) => packet_type,
            Err(error) => {
                warn!("server: dropping packet from {}: {}", source, error);
                return;
            }
        };
        match packet_type {
            PacketType::PlayerInput => self.handle_player_input(packet, source),
            PacketType::PlayerIsReady | PacketType::PlayerNotReady => {
                self.handle_ready_packet(packet, packet_type, source);
            }
            other => {
                debug!("server: ignoring {:?} from {}", other, source);
            }
        }
    }

    fn handle_player_input(&mut self, packet: &Packet, source: PlayerId) {
        let Ok(input) = PlayerInput::parse(&packet.payload) else {
            return;
        };
        if input.player_id != source {
            warn!(
                "input spoof: slot {} claimed player {}",
                source, input.player_id
            );
            return;
        }
        let entity = EntityId::from_raw(input.player_id);
        if !self.world.is_alive(entity) {
            return;
        }
        if let Some(component) = self.world.get_mut::<InputComponent>(entity) {
            component.apply_bitfield(input.input_state);
            component.client_pos_x = f32::from(input.aim_x);
            component.client_pos_y = f32::from(input.aim_y);
        }
        self.relay_queue.push((packet.clone(), source));
    }

    fn handle_ready_packet(&mut self, packet: &Packet, packet_type: PacketType, source: PlayerId) {
        let Ok(ready) = PlayerReady::parse(&packet.payload) else {
            return;
        };
        let is_ready = packet_type == PacketType::PlayerIsReady;
        self.ready_players.insert(ready.player_id, is_ready);
        if let Some(callback) = self.ready_callback.as_mut() {
            callback(ready.player_id, is_ready);
        }
        self.relay_queue.push((packet.clone(), source));
    }

    /// Emits this tick's authoritative state: spawns for newly created
    /// networked entities, component snapshots on their cadences, one
    /// packet per drained gameplay event, destroys, and input relays.
    pub fn build_server_packets(&mut self, out: &mut Vec<OutboundPacket>) {
        self.world_tick = self.world_tick.wrapping_add(1);

        self.emit_new_entity_spawns(out);
        self.emit_snapshots(out);
        self.emit_events(out);
        self.maybe_end_game(out);

        for (packet, source) in std::mem::take(&mut self.relay_queue) {
            out.push(OutboundPacket::except(packet, source));
        }
    }

    /// Ends the game once every player ship is dead.
    fn maybe_end_game(&mut self, out: &mut Vec<OutboundPacket>) {
        if !self.game_running {
            return;
        }
        let Ok(inputs) = self.world.store::<InputComponent>() else {
            return;
        };
        let players: Vec<EntityId> = inputs.iter().map(|(entity, _)| entity).collect();
        if players.is_empty()
            || !players
                .iter()
                .all(|&entity| self.world.has::<DeadPlayer>(entity))
        {
            return;
        }
        self.game_running = false;
        let end = GameEnd {
            game_id: self.game_instance_id,
            end_reason: 1, // defeat
            winner_id: 0,
            duration_seconds: self.clock.elapsed().as_secs() as u32,
        };
        let packet = self.next_packet(PacketType::GameEnd, flags::RELIABLE, end.write());
        out.push(OutboundPacket::broadcast(packet));
        if let Some(callback) = self.game_callback.as_mut() {
            callback(false);
        }
        info!("game {} ended: all players down", self.game_instance_id);
    }

    fn emit_new_entity_spawns(&mut self, out: &mut Vec<OutboundPacket>) {
        let new_ids: Vec<u32> = self
            .world
            .networked_entities()
            .iter()
            .copied()
            .filter(|id| !self.broadcasted.contains(id))
            .collect();
        for network_id in new_ids {
            let entity = EntityId::from_raw(network_id);
            let Some(spawn) = self.spawn_payload_for(entity, false) else {
                continue;
            };
            self.broadcasted.insert(network_id);
            let packet = self.next_packet(PacketType::EntitySpawn, flags::RELIABLE, spawn.write());
            out.push(OutboundPacket::broadcast(packet));
        }
    }

    fn emit_snapshots(&mut self, out: &mut Vec<OutboundPacket>) {
        let tick = self.world_tick;
        if tick % self.cadence.transform.max(1) == 0 {
            let snapshot = self.collect_snapshot::<Transform, TransformData>(|c| c.to_wire());
            if !snapshot.entries.is_empty() {
                let packet = self.next_packet(PacketType::TransformSnapshot, 0, snapshot.encode());
                out.push(OutboundPacket::broadcast(packet));
            }
        }
        if tick % self.cadence.health.max(1) == 0 {
            let snapshot = self.collect_snapshot::<Health, HealthData>(|c| c.to_wire());
            if !snapshot.entries.is_empty() {
                let packet = self.next_packet(PacketType::HealthSnapshot, 0, snapshot.encode());
                out.push(OutboundPacket::broadcast(packet));
            }
        }
        if tick % self.cadence.weapon.max(1) == 0 {
            let now_ms = u64::from(self.clock.elapsed_ms());
            let snapshot = self.collect_snapshot::<Weapon, WeaponData>(|c| c.to_wire(now_ms));
            if !snapshot.entries.is_empty() {
                let packet = self.next_packet(PacketType::WeaponSnapshot, 0, snapshot.encode());
                out.push(OutboundPacket::broadcast(packet));
            }
        }
        if tick % self.cadence.animation.max(1) == 0 {
            let snapshot = self.collect_snapshot::<Animation, AnimationData>(|c| c.to_wire());
            if !snapshot.entries.is_empty() {
                let packet = self.next_packet(PacketType::AnimationSnapshot, 0, snapshot.encode());
                out.push(OutboundPacket::broadcast(packet));
            }
        }
    }

    /// All live networked entities carrying `C`, in id order.
    fn collect_snapshot<C, D>(&self, mut to_wire: impl FnMut(&C) -> D) -> Snapshot<D>
    where
        C: aster_shared::Component,
        D: aster_shared::SnapshotData,
    {
        let mut snapshot = Snapshot::full(self.world_tick);
        let Ok(store) = self.world.store::<C>() else {
            return snapshot;
        };
        let mut entries: Vec<(u32, D)> = store
            .iter()
            .filter(|(entity, _)| self.world.networked_entities().contains(&entity.raw()))
            .map(|(entity, component)| (entity.raw(), to_wire(component)))
            .collect();
        entries.sort_by_key(|(id, _)| *id);
        snapshot.entries = entries;
        snapshot
    }

    fn emit_events(&mut self, out: &mut Vec<OutboundPacket>) {
        let drained = self.events.drain();

        for fire in drained.weapon_fires {
            let projectile_id = self.next_projectile_wire_id;
            self.next_projectile_wire_id = self.next_projectile_wire_id.wrapping_add(1).max(1);
            let payload = WeaponFirePayload {
                shooter_id: fire.shooter_id,
                projectile_id,
                origin_x: fire.origin_x.round() as i16,
                origin_y: fire.origin_y.round() as i16,
                direction_x: (fire.direction_x * 1000.0).round() as i16,
                direction_y: (fire.direction_y * 1000.0).round() as i16,
                weapon_type: fire.weapon,
            };
            let packet = self.next_packet(PacketType::WeaponFire, 0, payload.write());
            out.push(OutboundPacket::broadcast(packet));
        }

        for hit in drained.hits {
            let payload = PlayerHitPayload {
                victim_id: hit.victim_id,
                attacker_id: hit.attacker_id,
                damage: hit.damage,
            };
            let packet = self.next_packet(PacketType::PlayerHit, flags::RELIABLE, payload.write());
            out.push(OutboundPacket::broadcast(packet));
        }

        for death in drained.deaths {
            let payload = PlayerDeathPayload {
                victim_id: death.victim_id,
                killer_id: death.killer_id,
            };
            let packet =
                self.next_packet(PacketType::PlayerDeath, flags::RELIABLE, payload.write());
            out.push(OutboundPacket::broadcast(packet));
        }

        for score in drained.score_updates {
            let payload = ScoreUpdatePayload {
                player_id: score.player_id,
                score: score.score,
            };
            let packet = self.next_packet(PacketType::ScoreUpdate, 0, payload.write());
            out.push(OutboundPacket::broadcast(packet));
        }

        for pickup in drained.pickups {
            let payload = PowerupPickupPayload {
                player_id: pickup.player_id,
                powerup_id: pickup.powerup_id,
                powerup_type: pickup.kind as u8,
            };
            let packet =
                self.next_packet(PacketType::PowerupPickup, flags::RELIABLE, payload.write());
            out.push(OutboundPacket::broadcast(packet));
        }

        for event in drained.level_events {
            match event {
                LevelEvent::Started { index, enemy_count } => {
                    let payload = LevelStart {
                        game_id: self.game_instance_id,
                        level_index: index,
                        difficulty_modifier: 1.0,
                        enemy_count,
                        environment_type: 0,
                    };
                    let packet =
                        self.next_packet(PacketType::LevelStart, flags::RELIABLE, payload.write());
                    out.push(OutboundPacket::broadcast(packet));
                }
                LevelEvent::Completed {
                    index,
                    elapsed_secs,
                } => {
                    let payload = LevelComplete {
                        game_id: self.game_instance_id,
                        level_index: index,
                        completion_time_seconds: elapsed_secs,
                    };
                    let packet = self.next_packet(
                        PacketType::LevelComplete,
                        flags::RELIABLE,
                        payload.write(),
                    );
                    out.push(OutboundPacket::broadcast(packet));
                }
            }
        }

        for destroyed in drained.destroyed {
            self.broadcasted.remove(&destroyed.network_id);
            let payload = EntityDestroy {
                entity_id: destroyed.network_id,
                reason: destroyed.reason,
                final_position_x: destroyed.final_x.max(0.0) as u16,
                final_position_y: destroyed.final_y.max(0.0) as u16,
            };
            let packet =
                self.next_packet(PacketType::EntityDestroy, flags::RELIABLE, payload.write());
            out.push(OutboundPacket::broadcast(packet));
        }
    }

    /// Builds the ENTITY_SPAWN payload describing an entity's current
    /// state, deriving the wire kind from its component bundle.
    fn spawn_payload_for(&self, entity: EntityId, is_playable: bool) -> Option<EntitySpawn> {
        let transform = self.world.get::<Transform>(entity)?;
        let velocity = self
            .world
            .get::<Velocity>(entity)
            .copied()
            .unwrap_or(Velocity::new(0.0, 0.0));
        let health = self
            .world
            .get::<Health>(entity)
            .copied()
            .unwrap_or(Health::new(0, 0));

        let (entity_kind, mob_variant) = if self.world.has::<InputComponent>(entity) {
            (EntityKind::Player, 0)
        } else if let Some(enemy) = self.world.get::<aster_shared::Enemy>(entity) {
            match enemy.kind {
                EnemyKind::Boss => (EntityKind::EnemyBoss, enemy.kind as u8),
                _ => (EntityKind::Enemy, enemy.kind as u8),
            }
        } else if let Some(powerup) = self.world.get::<aster_shared::Powerup>(entity) {
            (EntityKind::Powerup, powerup.kind as u8)
        } else {
            (EntityKind::BgElement, 0)
        };

        Some(EntitySpawn {
            entity_id: entity.raw(),
            entity_kind,
            position_x: transform.x.max(0.0) as u16,
            position_y: transform.y.max(0.0) as u16,
            mob_variant,
            initial_health: health.current.clamp(0, 255) as u8,
            initial_velocity_x: velocity.vx.round() as i16 as u16,
            initial_velocity_y: velocity.vy.round() as i16 as u16,
            is_playable,
        })
    }

    // ===============================================================
    // Client side
    // ===============================================================

    /// Applies one authoritative packet from the server.
    pub fn process_client_packet(&mut self, packet: &Packet) {
        let packet_type = match codec::process_packet(packet) {
            Ok(packet_type) => packet_type,
            Err(error) => {
                warn!("client: dropping packet: {}", error);
                return;
            }
        };
        match packet_type {
            PacketType::EntitySpawn => self.apply_entity_spawn(packet),
            PacketType::EntityDestroy => self.apply_entity_destroy(packet),
            PacketType::TransformSnapshot => {
                self.apply_snapshot::<Transform, TransformData>(packet, packet_type, false);
            }
            PacketType::VelocitySnapshot => {
                self.apply_snapshot::<Velocity, VelocityData>(packet, packet_type, false);
            }
            PacketType::HealthSnapshot => {
                self.apply_snapshot::<Health, HealthData>(packet, packet_type, false);
            }
            PacketType::WeaponSnapshot => self.apply_weapon_snapshot(packet, false),
            PacketType::AiSnapshot => {
                self.apply_snapshot::<Ai, AiData>(packet, packet_type, false);
            }
            PacketType::AnimationSnapshot => {
                self.apply_snapshot::<Animation, AnimationData>(packet, packet_type, false);
            }
            PacketType::TransformSnapshotDelta => {
                self.apply_snapshot::<Transform, TransformData>(packet, packet_type, true);
            }
            PacketType::HealthSnapshotDelta => {
                self.apply_snapshot::<Health, HealthData>(packet, packet_type, true);
            }
            PacketType::ComponentAdd => self.apply_component_add(packet),
            PacketType::ComponentRemove => self.apply_component_remove(packet),
            PacketType::EntityFullState => self.apply_entity_full_state(packet),
            PacketType::WeaponFire => self.apply_weapon_fire(packet),
            PacketType::PlayerInput => self.apply_relayed_input(packet),
            PacketType::PlayerHit => self.apply_player_hit(packet),
            PacketType::PlayerDeath => self.apply_player_death(packet),
            PacketType::ScoreUpdate => self.apply_score_update(packet),
            PacketType::PowerupPickup => self.apply_powerup_pickup(packet),
            PacketType::VisualEffect => {
                if let Ok(effect) = aster_shared::VisualEffect::parse(&packet.payload) {
                    self.pending_effects.push(EffectEvent::Visual(effect));
                }
            }
            PacketType::AudioEffect => {
                if let Ok(effect) = aster_shared::AudioEffect::parse(&packet.payload) {
                    self.pending_effects.push(EffectEvent::Audio(effect));
                }
            }
            PacketType::ParticleSpawn => {
                if let Ok(effect) = aster_shared::ParticleSpawn::parse(&packet.payload) {
                    self.pending_effects.push(EffectEvent::Particle(effect));
                }
            }
            PacketType::GameStart => {
                if let Ok(start) = GameStart::parse(&packet.payload) {
                    self.game_instance_id = start.game_id;
                }
                self.game_running = true;
                if let Some(callback) = self.game_callback.as_mut() {
                    callback(true);
                }
            }
            PacketType::GameEnd => {
                let _ = GameEnd::parse(&packet.payload);
                self.game_running = false;
                if let Some(callback) = self.game_callback.as_mut() {
                    callback(false);
                }
            }
            PacketType::LevelStart => {
                if let Some(callback) = self.level_start_callback.as_mut() {
                    callback();
                }
            }
            PacketType::LevelComplete => {
                debug!("level complete received");
            }
            PacketType::ForceState => self.apply_force_state(packet),
            PacketType::AiState => self.apply_ai_state(packet),
            PacketType::PlayerIsReady | PacketType::PlayerNotReady => {
                if let Ok(ready) = PlayerReady::parse(&packet.payload) {
                    let is_ready = packet_type == PacketType::PlayerIsReady;
                    self.ready_players.insert(ready.player_id, is_ready);
                    if let Some(callback) = self.ready_callback.as_mut() {
                        callback(ready.player_id, is_ready);
                    }
                }
            }
            other => debug!("client: ignoring {:?}", other),
        }
    }

    fn apply_entity_spawn(&mut self, packet: &Packet) {
        let Ok(spawn) = EntitySpawn::parse(&packet.payload) else {
            return;
        };
        let entity = EntityId::from_raw(spawn.entity_id);
        if self.world.is_alive(entity) {
            debug!("spawn for live entity {} ignored", spawn.entity_id);
            return;
        }
        self.unknown_snapshot_entities.remove(&spawn.entity_id);
        let x = f32::from(spawn.position_x);
        let y = f32::from(spawn.position_y);
        let vx = f32::from(spawn.initial_velocity_x as i16);
        let vy = f32::from(spawn.initial_velocity_y as i16);
        let result = match spawn.entity_kind {
            EntityKind::Player => {
                if spawn.is_playable {
                    self.local_player_id = spawn.entity_id;
                }
                EntityBuilders::player(
                    &mut self.world,
                    spawn.entity_id,
                    x,
                    y,
                    vx,
                    vy,
                    i32::from(spawn.initial_health),
                    spawn.is_playable,
                    self.with_render,
                )
            }
            EntityKind::Enemy | EntityKind::EnemyBoss => {
                let kind = match (spawn.entity_kind, spawn.mob_variant) {
                    (EntityKind::EnemyBoss, _) => EnemyKind::Boss,
                    (_, 1) => EnemyKind::Fast,
                    (_, 2) => EnemyKind::Tank,
                    _ => EnemyKind::Basic,
                };
                EntityBuilders::enemy(
                    &mut self.world,
                    spawn.entity_id,
                    kind,
                    x,
                    y,
                    vx,
                    vy,
                    i32::from(spawn.initial_health).max(ENEMY_BASE_HEALTH / 2),
                    self.with_render,
                )
            }
            EntityKind::Powerup => {
                let kind = PowerupKind::from_u8(spawn.mob_variant).unwrap_or(PowerupKind::Heal);
                EntityBuilders::powerup(
                    &mut self.world,
                    spawn.entity_id,
                    kind,
                    x,
                    y,
                    self.with_render,
                )
            }
            other => {
                debug!("spawn kind {:?} has no client builder", other);
                return;
            }
        };
        if let Err(error) = result {
            warn!("client spawn of {} failed: {}", spawn.entity_id, error);
        }
    }

    fn apply_entity_destroy(&mut self, packet: &Packet) {
        let Ok(destroy) = EntityDestroy::parse(&packet.payload) else {
            return;
        };
        self.unknown_snapshot_entities.remove(&destroy.entity_id);
        let entity = EntityId::from_raw(destroy.entity_id);
        if !self.world.is_alive(entity) {
            return;
        }
        if let Err(error) = self.world.despawn(entity) {
            warn!("client destroy of {} failed: {}", destroy.entity_id, error);
        }
    }

    /// Hard-overwrite application of a component snapshot. Snapshots older
    /// than the newest applied tick for that packet type are discarded.
    fn apply_snapshot<C, D>(&mut self, packet: &Packet, packet_type: PacketType, delta: bool)
    where
        C: aster_shared::Component + WireApply<D>,
        D: aster_shared::SnapshotData,
    {
        let Ok(snapshot) = Snapshot::<D>::decode(&packet.payload, delta, packet_type as u8) else {
            return;
        };
        if self.is_stale(packet_type, snapshot.world_tick) {
            debug!(
                "stale {:?} (tick {} <= applied)",
                packet_type, snapshot.world_tick
            );
            return;
        }
        for (network_id, data) in &snapshot.entries {
            let entity = EntityId::from_raw(*network_id);
            if !self.world.is_alive(entity) {
                self.unknown_snapshot_entities.insert(*network_id);
                continue;
            }
            // The locally predicted ship still accepts authority (hard
            // overwrite reconciliation).
            if let Some(component) = self.world.get_mut::<C>(entity) {
                component.apply_wire(data);
            }
        }
    }

    fn apply_weapon_snapshot(&mut self, packet: &Packet, delta: bool) {
        let Ok(snapshot) =
            Snapshot::<WeaponData>::decode(&packet.payload, delta, PacketType::WeaponSnapshot as u8)
        else {
            return;
        };
        if self.is_stale(PacketType::WeaponSnapshot, snapshot.world_tick) {
            return;
        }
        let now_ms = u64::from(self.clock.elapsed_ms());
        for (network_id, data) in &snapshot.entries {
            let entity = EntityId::from_raw(*network_id);
            if !self.world.is_alive(entity) {
                self.unknown_snapshot_entities.insert(*network_id);
                continue;
            }
            if let Some(weapon) = self.world.get_mut::<Weapon>(entity) {
                weapon.apply_wire(data, now_ms);
            }
        }
    }

    fn is_stale(&mut self, packet_type: PacketType, world_tick: Tick) -> bool {
        match self.last_applied.get(&packet_type) {
            Some(&applied) if world_tick <= applied => true,
            _ => {
                self.last_applied.insert(packet_type, world_tick);
                false
            }
        }
    }

    fn apply_component_add(&mut self, packet: &Packet) {
        let Ok(add) = ComponentAdd::parse(&packet.payload) else {
            return;
        };
        let entity = EntityId::from_raw(add.entity_id);
        if !self.world.is_alive(entity) {
            self.unknown_snapshot_entities.insert(add.entity_id);
            return;
        }
        self.attach_wire_component(entity, add.component_type, &add.data);
    }

    fn attach_wire_component(&mut self, entity: EntityId, component_type: u8, data: &[u8]) {
        use std::io::Cursor;
        let Some(kind) = ComponentKind::from_wire_id(component_type) else {
            warn!("component add: unknown wire id {}", component_type);
            return;
        };
        let mut cursor = Cursor::new(data);
        let now_ms = u64::from(self.clock.elapsed_ms());
        let applied = match kind {
            ComponentKind::Transform => {
                <TransformData as aster_shared::SnapshotData>::read(&mut cursor).map(|wire| {
                    let mut component = self
                        .world
                        .get::<Transform>(entity)
                        .copied()
                        .unwrap_or(Transform::new(0.0, 0.0));
                    component.apply_wire(&wire);
                    self.world.update(entity, component).is_ok()
                })
            }
            ComponentKind::Velocity => {
                <VelocityData as aster_shared::SnapshotData>::read(&mut cursor).map(|wire| {
                    let mut component = self
                        .world
                        .get::<Velocity>(entity)
                        .copied()
                        .unwrap_or(Velocity::new(0.0, 0.0));
                    component.apply_wire(&wire);
                    self.world.update(entity, component).is_ok()
                })
            }
            ComponentKind::Health => {
                <HealthData as aster_shared::SnapshotData>::read(&mut cursor).map(|wire| {
                    let mut component = self
                        .world
                        .get::<Health>(entity)
                        .copied()
                        .unwrap_or(Health::new(0, 0));
                    component.apply_wire(&wire);
                    self.world.update(entity, component).is_ok()
                })
            }
            ComponentKind::Weapon => {
                <WeaponData as aster_shared::SnapshotData>::read(&mut cursor).map(|wire| {
                    let mut component = self.world.get::<Weapon>(entity).copied().unwrap_or(Weapon {
                        kind: aster_shared::WeaponKind::Basic,
                        fire_rate_ms: 250,
                        last_shot_ms: 0,
                        damage: 10,
                        projectile: aster_shared::ProjectileKind::Missile,
                    });
                    component.apply_wire(&wire, now_ms);
                    self.world.update(entity, component).is_ok()
                })
            }
            ComponentKind::Ai => {
                <AiData as aster_shared::SnapshotData>::read(&mut cursor).map(|wire| {
                    let mut component = self
                        .world
                        .get::<Ai>(entity)
                        .copied()
                        .unwrap_or(Ai::new(aster_shared::AiBehaviour::Formation, 0.0, 0.0));
                    component.apply_wire(&wire);
                    self.world.update(entity, component).is_ok()
                })
            }
            ComponentKind::Animation => {
                <AnimationData as aster_shared::SnapshotData>::read(&mut cursor).map(|wire| {
                    let mut component =
                        self.world.get::<Animation>(entity).copied().unwrap_or(Animation {
                            animation_id: 0,
                            current_frame: 0,
                            frame_count: 1,
                            elapsed: 0.0,
                            frame_duration_ms: 100,
                            looped: true,
                        });
                    component.apply_wire(&wire);
                    self.world.update(entity, component).is_ok()
                })
            }
            other => {
                debug!("component add for {:?} unsupported on the wire", other);
                return;
            }
        };
        if applied != Some(true) {
            warn!(
                "component add {:?} on {} could not be applied",
                kind, entity
            );
        }
    }

    fn apply_component_remove(&mut self, packet: &Packet) {
        let Ok(remove) = ComponentRemove::parse(&packet.payload) else {
            return;
        };
        let entity = EntityId::from_raw(remove.entity_id);
        if !self.world.is_alive(entity) {
            return;
        }
        let Some(kind) = ComponentKind::from_wire_id(remove.component_type) else {
            warn!("component remove: unknown wire id {}", remove.component_type);
            return;
        };
        let result = match kind {
            ComponentKind::Transform => self.world.remove::<Transform>(entity).map(|_| ()),
            ComponentKind::Velocity => self.world.remove::<Velocity>(entity).map(|_| ()),
            ComponentKind::Health => self.world.remove::<Health>(entity).map(|_| ()),
            ComponentKind::Weapon => self.world.remove::<Weapon>(entity).map(|_| ()),
            ComponentKind::Ai => self.world.remove::<Ai>(entity).map(|_| ()),
            ComponentKind::Animation => self.world.remove::<Animation>(entity).map(|_| ()),
            ComponentKind::Sprite => self.world.remove::<aster_shared::Sprite>(entity).map(|_| ()),
            ComponentKind::HitBox => self.world.remove::<aster_shared::HitBox>(entity).map(|_| ()),
            ComponentKind::Powerup => self.world.remove::<aster_shared::Powerup>(entity).map(|_| ()),
            ComponentKind::Lifetime => {
                self.world.remove::<aster_shared::Lifetime>(entity).map(|_| ())
            }
            ComponentKind::Input => self.world.remove::<InputComponent>(entity).map(|_| ()),
            other => {
                debug!("component remove for {:?} unsupported", other);
                return;
            }
        };
        if let Err(error) = result {
            warn!("component remove {:?} on {} failed: {}", kind, entity, error);
        }
    }

    fn apply_entity_full_state(&mut self, packet: &Packet) {
        let Ok(state) = EntityFullState::parse(&packet.payload) else {
            return;
        };
        let entity = EntityId::from_raw(state.entity_id);
        if !self.world.is_alive(entity) {
            // Rebuild the entity with defaults for its kind, then let the
            // carried components overwrite them.
            let spawn = EntitySpawn {
                entity_id: state.entity_id,
                entity_kind: state.entity_kind,
                position_x: 0,
                position_y: 0,
                mob_variant: 0,
                initial_health: PLAYER_BASE_HEALTH.clamp(0, 255) as u8,
                initial_velocity_x: 0,
                initial_velocity_y: 0,
                is_playable: false,
            };
            let synthetic = codec::make_packet(PacketType::EntitySpawn, 0, 0, 0, spawn.write());
            self.apply_entity_spawn(&synthetic);
        }
        for (component_type, data) in &state.components {
            self.attach_wire_component(entity, *component_type, data);
        }
    }

    fn apply_weapon_fire(&mut self, packet: &Packet) {
        let Ok(fire) = WeaponFirePayload::parse(&packet.payload) else {
            return;
        };
        // The owning client already predicted its own shot.
        if fire.shooter_id != 0 && fire.shooter_id == self.local_player_id {
            return;
        }
        let shooter = EntityId::from_raw(fire.shooter_id);
        let shooter_alive = self.world.is_alive(shooter);
        let from_playable = shooter_alive && self.world.has::<InputComponent>(shooter);
        let damage = if shooter_alive {
            self.world
                .get::<Weapon>(shooter)
                .map(|weapon| weapon.damage)
                .unwrap_or(10)
        } else {
            10
        };
        let speed = fire.weapon_type.projectile_speed();
        let dir_x = f32::from(fire.direction_x) / 1000.0;
        let dir_y = f32::from(fire.direction_y) / 1000.0;
        let result = EntityBuilders::projectile(
            &mut self.world,
            f32::from(fire.origin_x),
            f32::from(fire.origin_y),
            dir_x * speed,
            dir_y * speed,
            shooter,
            from_playable,
            damage,
            self.with_render,
        );
        if let Err(error) = result {
            warn!("weapon fire spawn failed: {}", error);
        }
    }

    fn apply_relayed_input(&mut self, packet: &Packet) {
        let Ok(input) = PlayerInput::parse(&packet.payload) else {
            return;
        };
        // Never overwrite the locally sampled input.
        if input.player_id == self.local_player_id {
            return;
        }
        let entity = EntityId::from_raw(input.player_id);
        if !self.world.is_alive(entity) {
            return;
        }
        if let Some(component) = self.world.get_mut::<InputComponent>(entity) {
            component.apply_bitfield(input.input_state);
        }
    }

    fn apply_player_hit(&mut self, packet: &Packet) {
        let Ok(hit) = PlayerHitPayload::parse(&packet.payload) else {
            return;
        };
        let entity = EntityId::from_raw(hit.victim_id);
        if let Some(health) = self.world.get_mut::<Health>(entity) {
            health.current -= i32::from(hit.damage);
        }
    }

    fn apply_player_death(&mut self, packet: &Packet) {
        let Ok(death) = PlayerDeathPayload::parse(&packet.payload) else {
            return;
        };
        let entity = EntityId::from_raw(death.victim_id);
        if self.world.is_alive(entity) && !self.world.has::<DeadPlayer>(entity) {
            let _ = self.world.add(
                entity,
                DeadPlayer {
                    timer: 0.0,
                    initialized: false,
                    killer_id: death.killer_id,
                },
            );
        }
    }

    fn apply_score_update(&mut self, packet: &Packet) {
        let Ok(update) = ScoreUpdatePayload::parse(&packet.payload) else {
            return;
        };
        let entity = EntityId::from_raw(update.player_id);
        if let Some(score) = self.world.get_mut::<Score>(entity) {
            score.value = update.score;
        }
    }

    fn apply_powerup_pickup(&mut self, packet: &Packet) {
        let Ok(pickup) = PowerupPickupPayload::parse(&packet.payload) else {
            return;
        };
        let entity = EntityId::from_raw(pickup.powerup_id);
        if self.world.is_alive(entity) {
            let _ = self.world.despawn(entity);
        }
    }

    fn apply_force_state(&mut self, packet: &Packet) {
        let Ok(state) = aster_shared::ForceState::parse(&packet.payload) else {
            return;
        };
        let entity = EntityId::from_raw(state.force_entity_id);
        if !self.world.is_alive(entity) {
            return;
        }
        let attachment = aster_shared::ForceAttachment::from_u8(state.attachment_point)
            .unwrap_or(aster_shared::ForceAttachment::Detached);
        let force = aster_shared::Force {
            parent_ship: state.parent_ship_id,
            attachment,
            power_level: state.power_level,
            charge: state.charge_percentage,
            firing: state.is_firing,
        };
        if let Err(error) = self.world.update(entity, force) {
            warn!("force state on {} failed: {}", entity, error);
        }
    }

    fn apply_ai_state(&mut self, packet: &Packet) {
        let Ok(state) = aster_shared::AiState::parse(&packet.payload) else {
            return;
        };
        let entity = EntityId::from_raw(state.entity_id);
        if !self.world.is_alive(entity) {
            return;
        }
        if let Some(ai) = self.world.get_mut::<Ai>(entity) {
            ai.target_id = state.target_entity_id;
            ai.internal_time = f32::from(state.state_timer) / 1000.0;
        }
    }

    /// Emits this tick's client output: the local player's input bitfield
    /// and any queued ready-state changes.
    pub fn build_client_packets(&mut self, out: &mut Vec<Packet>) {
        self.world_tick = self.world_tick.wrapping_add(1);

        for ready in std::mem::take(&mut self.pending_ready) {
            let packet_type = if ready {
                PacketType::PlayerIsReady
            } else {
                PacketType::PlayerNotReady
            };
            let payload = PlayerReady {
                player_id: self.local_player_id,
            };
            let packet = self.next_packet(packet_type, flags::RELIABLE, payload.write());
            out.push(packet);
        }

        if self.local_player_id == 0 {
            return;
        }
        let entity = EntityId::from_raw(self.local_player_id);
        if !self.world.is_alive(entity) {
            return;
        }
        let Some(input) = self.world.get::<InputComponent>(entity) else {
            return;
        };
        let transform = self.world.get::<Transform>(entity);
        let payload = PlayerInput {
            player_id: self.local_player_id,
            input_state: input.to_bitfield(),
            aim_x: transform.map(|t| t.x.max(0.0) as u16).unwrap_or(0),
            aim_y: transform.map(|t| t.y.max(0.0) as u16).unwrap_or(0),
        };
        let packet = self.next_packet(PacketType::PlayerInput, 0, payload.write());
        out.push(packet);
    }

    /// Sets an action bit on the local player (host input layer hook).
    pub fn set_local_action(&mut self, action: aster_shared::GameAction, active: bool) {
        let entity = EntityId::from_raw(self.local_player_id);
        if !self.world.is_alive(entity) {
            return;
        }
        if let Some(input) = self.world.get_mut::<InputComponent>(entity) {
            input.active_actions.insert(action, active);
        }
    }
}

/// Components that can be overwritten from snapshot wire data.
trait WireApply<D> {
    fn apply_wire(&mut self, data: &D);
}

impl WireApply<TransformData> for Transform {
    fn apply_wire(&mut self, data: &TransformData) {
        Transform::apply_wire(self, data);
    }
}

impl WireApply<VelocityData> for Velocity {
    fn apply_wire(&mut self, data: &VelocityData) {
        Velocity::apply_wire(self, data);
    }
}

impl WireApply<HealthData> for Health {
    fn apply_wire(&mut self, data: &HealthData) {
        Health::apply_wire(self, data);
    }
}

impl WireApply<AiData> for Ai {
    fn apply_wire(&mut self, data: &AiData) {
        Ai::apply_wire(self, data);
    }
}

impl WireApply<AnimationData> for Animation {
    fn apply_wire(&mut self, data: &AnimationData) {
        Animation::apply_wire(self, data);
    }
}
