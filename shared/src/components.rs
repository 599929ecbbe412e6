//! The core component set. Components are plain data attached to entities;
//! systems implement all behavior.

use std::collections::BTreeMap;

use crate::ecs::{Component, ComponentKind, EntityId};
use crate::protocol::snapshot::{
    AiData, AnimationData, HealthData, TransformData, VelocityData, WeaponData,
};
use crate::protocol::types::WeaponKind;

/// Spatial state of an entity in the world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub scale: f32,
}

impl Transform {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            rotation: 0.0,
            scale: 1.0,
        }
    }

    pub fn to_wire(&self) -> TransformData {
        TransformData {
            pos_x: self.x.round().clamp(i16::MIN as f32, i16::MAX as f32) as i16,
            pos_y: self.y.round().clamp(i16::MIN as f32, i16::MAX as f32) as i16,
            rotation: ((self.rotation.rem_euclid(360.0) / 360.0) * 65535.0) as u16,
            scale: (self.scale * 1000.0).clamp(0.0, 65535.0) as u16,
        }
    }

    pub fn apply_wire(&mut self, data: &TransformData) {
        self.x = f32::from(data.pos_x);
        self.y = f32::from(data.pos_y);
        self.rotation = f32::from(data.rotation) / 65535.0 * 360.0;
        self.scale = f32::from(data.scale) / 1000.0;
    }
}

impl Component for Transform {
    const KIND: ComponentKind = ComponentKind::Transform;
}

/// Movement vector of an entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Velocity {
    pub vx: f32,
    pub vy: f32,
}

impl Velocity {
    pub fn new(vx: f32, vy: f32) -> Self {
        Self { vx, vy }
    }

    pub fn to_wire(&self) -> VelocityData {
        VelocityData {
            vel_x: self.vx.round().clamp(i16::MIN as f32, i16::MAX as f32) as i16,
            vel_y: self.vy.round().clamp(i16::MIN as f32, i16::MAX as f32) as i16,
            accel_x: 0,
            accel_y: 0,
        }
    }

    pub fn apply_wire(&mut self, data: &VelocityData) {
        self.vx = f32::from(data.vel_x);
        self.vy = f32::from(data.vel_y);
    }
}

impl Component for Velocity {
    const KIND: ComponentKind = ComponentKind::Velocity;
}

/// Health points and maximum capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Health {
    pub current: i32,
    pub max: i32,
}

impl Health {
    pub fn new(current: i32, max: i32) -> Self {
        Self { current, max }
    }

    pub fn is_dead(&self) -> bool {
        self.current <= 0
    }

    pub fn to_wire(&self) -> HealthData {
        HealthData {
            current: self.current.clamp(0, 255) as u8,
            max: self.max.clamp(0, 255) as u8,
            shield: 0,
            max_shield: 0,
        }
    }

    pub fn apply_wire(&mut self, data: &HealthData) {
        self.current = i32::from(data.current);
        self.max = i32::from(data.max);
    }
}

impl Component for Health {
    const KIND: ComponentKind = ComponentKind::Health;
}

/// Visual/behavioral type of a projectile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectileKind {
    Missile,
    Laser,
}

/// Shooting capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Weapon {
    pub kind: WeaponKind,
    pub fire_rate_ms: u32,
    pub last_shot_ms: u64,
    pub damage: i32,
    pub projectile: ProjectileKind,
}

impl Weapon {
    pub fn can_fire(&self, now_ms: u64) -> bool {
        // A weapon that has never fired is ready immediately.
        self.last_shot_ms == 0
            || now_ms.saturating_sub(self.last_shot_ms) >= u64::from(self.fire_rate_ms)
    }

    pub fn to_wire(&self, now_ms: u64) -> WeaponData {
        let since_last = now_ms.saturating_sub(self.last_shot_ms);
        let cooldown = u64::from(self.fire_rate_ms).saturating_sub(since_last);
        WeaponData {
            kind: self.kind as u8,
            ammo: 0,
            cooldown_ms: cooldown.min(u64::from(u16::MAX)) as u16,
            power: 1,
        }
    }

    pub fn apply_wire(&mut self, data: &WeaponData, now_ms: u64) {
        if let Some(kind) = WeaponKind::from_u8(data.kind) {
            self.kind = kind;
        }
        // Re-derive last_shot so the local cooldown matches the server's.
        self.last_shot_ms = now_ms
            .saturating_add(u64::from(data.cooldown_ms))
            .saturating_sub(u64::from(self.fire_rate_ms));
    }
}

impl Component for Weapon {
    const KIND: ComponentKind = ComponentKind::Weapon;
}

/// Links a local entity to its wire-visible id. `is_local` marks the copy
/// owned by this client (the predicted ship).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkId {
    pub id: u32,
    pub is_local: bool,
}

impl NetworkId {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            is_local: false,
        }
    }

    pub fn local(id: u32) -> Self {
        Self { id, is_local: true }
    }
}

impl Component for NetworkId {
    const KIND: ComponentKind = ComponentKind::NetworkId;
}

/// Logical player actions, decoupled from physical bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum GameAction {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    FirePrimary,
    FireSecondary,
    Special,
}

impl GameAction {
    pub const ALL: [GameAction; 7] = [
        GameAction::MoveUp,
        GameAction::MoveDown,
        GameAction::MoveLeft,
        GameAction::MoveRight,
        GameAction::FirePrimary,
        GameAction::FireSecondary,
        GameAction::Special,
    ];

    /// The PLAYER_INPUT bit carrying this action.
    pub fn input_flag(self) -> u16 {
        match self {
            GameAction::MoveUp => crate::protocol::types::input_flags::MOVE_UP,
            GameAction::MoveDown => crate::protocol::types::input_flags::MOVE_DOWN,
            GameAction::MoveLeft => crate::protocol::types::input_flags::MOVE_LEFT,
            GameAction::MoveRight => crate::protocol::types::input_flags::MOVE_RIGHT,
            GameAction::FirePrimary => crate::protocol::types::input_flags::FIRE_PRIMARY,
            GameAction::FireSecondary => crate::protocol::types::input_flags::FIRE_SECONDARY,
            GameAction::Special => crate::protocol::types::input_flags::ACTION_SPECIAL,
        }
    }
}

/// Per-player input state. Each player entity has its own copy so remote
/// players' inputs coexist with the local ones.
#[derive(Debug, Clone, Default)]
pub struct InputComponent {
    pub player_id: u32,
    pub active_actions: BTreeMap<GameAction, bool>,
    pub client_pos_x: f32,
    pub client_pos_y: f32,
}

impl InputComponent {
    pub fn new(player_id: u32) -> Self {
        Self {
            player_id,
            active_actions: BTreeMap::new(),
            client_pos_x: 0.0,
            client_pos_y: 0.0,
        }
    }

    pub fn is_active(&self, action: GameAction) -> bool {
        self.active_actions.get(&action).copied().unwrap_or(false)
    }

    /// Replaces the action map from a PLAYER_INPUT bitfield.
    pub fn apply_bitfield(&mut self, input_state: u16) {
        for action in GameAction::ALL {
            self.active_actions
                .insert(action, input_state & action.input_flag() != 0);
        }
    }

    /// Packs the action map into a PLAYER_INPUT bitfield.
    pub fn to_bitfield(&self) -> u16 {
        let mut bits = 0;
        for action in GameAction::ALL {
            if self.is_active(action) {
                bits |= action.input_flag();
            }
        }
        bits
    }
}

impl Component for InputComponent {
    const KIND: ComponentKind = ComponentKind::Input;
}

/// Tag: the locally controlled ship.
#[derive(Debug, Clone, Copy, Default)]
pub struct Playable;

impl Component for Playable {
    const KIND: ComponentKind = ComponentKind::Playable;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnemyKind {
    #[default]
    Basic,
    Fast,
    Tank,
    Boss,
}

/// Tag with variant: the entity is an enemy.
#[derive(Debug, Clone, Copy, Default)]
pub struct Enemy {
    pub kind: EnemyKind,
}

impl Component for Enemy {
    const KIND: ComponentKind = ComponentKind::Enemy;
}

/// A projectile in flight. Who fired it and what it does on hit.
///
/// Projectiles never carry [`NetworkId`]: they are reconstructed on each
/// peer from WEAPON_FIRE events and simulated locally.
#[derive(Debug, Clone, Copy)]
pub struct Projectile {
    pub shooter: EntityId,
    pub from_playable: bool,
    pub damage: i32,
}

impl Component for Projectile {
    const KIND: ComponentKind = ComponentKind::Projectile;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TeamKind {
    Player = 1 << 0,
    Enemy = 1 << 1,
    Obstacle = 1 << 2,
    Powerup = 1 << 3,
    Neutral = 1 << 4,
    Boss = 1 << 5,
}

/// Team membership bitmask, driving collision and damage rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Team {
    pub mask: u8,
}

impl Team {
    pub fn new(kind: TeamKind) -> Self {
        Self { mask: kind as u8 }
    }

    pub fn has(&self, kind: TeamKind) -> bool {
        self.mask & kind as u8 != 0
    }

    pub fn join(&mut self, kind: TeamKind) {
        self.mask |= kind as u8;
    }

    pub fn leave(&mut self, kind: TeamKind) {
        self.mask &= !(kind as u8);
    }

    /// Collision rules: obstacles never take damage; player projectiles hit
    /// only enemies and bosses; enemy projectiles hit only players.
    pub fn can_collide(shooter: &Team, target: &Team, shooter_is_projectile: bool) -> bool {
        if target.has(TeamKind::Obstacle) {
            return false;
        }
        if !shooter_is_projectile {
            return true;
        }
        if shooter.has(TeamKind::Player) {
            target.has(TeamKind::Enemy) || target.has(TeamKind::Boss)
        } else {
            target.has(TeamKind::Player)
        }
    }
}

impl Default for Team {
    fn default() -> Self {
        Team::new(TeamKind::Neutral)
    }
}

impl Component for Team {
    const KIND: ComponentKind = ComponentKind::Team;
}

/// Axis-aligned collision extents, centered on the entity's Transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitBox {
    pub width: f32,
    pub height: f32,
}

impl HitBox {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

impl Component for HitBox {
    const KIND: ComponentKind = ComponentKind::HitBox;
}

/// Visual descriptor consumed by an external render layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sprite {
    pub asset_id: u16,
    pub layer: u8,
}

impl Component for Sprite {
    const KIND: ComponentKind = ComponentKind::Sprite;
}

/// Sprite-sheet animation progression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Animation {
    pub animation_id: u16,
    pub current_frame: u16,
    pub frame_count: u16,
    pub elapsed: f32,
    pub frame_duration_ms: u16,
    pub looped: bool,
}

impl Animation {
    pub fn to_wire(&self) -> AnimationData {
        AnimationData {
            animation_id: self.animation_id,
            frame_index: self.current_frame,
            frame_duration: self.frame_duration_ms,
            loop_mode: u8::from(self.looped),
        }
    }

    pub fn apply_wire(&mut self, data: &AnimationData) {
        self.animation_id = data.animation_id;
        self.current_frame = data.frame_index;
        self.frame_duration_ms = data.frame_duration;
        self.looped = data.loop_mode != 0;
    }
}

impl Component for Animation {
    const KIND: ComponentKind = ComponentKind::Animation;
}

/// High-level AI state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiBehaviour {
    Kamikaze,
    ShooterTactic,
    Zigzag,
    Formation,
}

/// AI decision making state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ai {
    pub behaviour: AiBehaviour,
    pub detection_range: f32,
    pub aggro_range: f32,
    pub internal_time: f32,
    pub target_id: u32,
}

impl Ai {
    pub fn new(behaviour: AiBehaviour, detection_range: f32, aggro_range: f32) -> Self {
        Self {
            behaviour,
            detection_range,
            aggro_range,
            internal_time: 0.0,
            target_id: 0,
        }
    }

    pub fn to_wire(&self) -> AiData {
        AiData {
            state: 0,
            behavior: self.behaviour as u8,
            target: self.target_id,
            state_timer: ((self.internal_time * 1000.0) as u32).min(u32::from(u16::MAX)) as u16,
        }
    }

    pub fn apply_wire(&mut self, data: &AiData) {
        self.target_id = data.target;
        self.internal_time = f32::from(data.state_timer) / 1000.0;
    }
}

impl Component for Ai {
    const KIND: ComponentKind = ComponentKind::Ai;
}

/// One scheduled enemy spawn inside a wave.
#[derive(Debug, Clone, Copy)]
pub struct EnemySpawn {
    pub kind: EnemyKind,
    pub x: f32,
    pub y: f32,
    pub delay_after_previous: f32,
}

/// A wave of enemies, started at a fixed offset into the level.
#[derive(Debug, Clone, Default)]
pub struct Wave {
    pub enemies: Vec<EnemySpawn>,
    pub start_time: f32,
}

/// Level progression state. One entity per running level, server-side.
#[derive(Debug, Clone, Default)]
pub struct Level {
    pub waves: Vec<Wave>,
    pub duration_secs: f32,
    pub current_wave: usize,
    pub spawned_in_wave: usize,
    pub elapsed: f32,
    pub wave_clock: f32,
    pub completed: bool,
    pub started: bool,
}

impl Component for Level {
    const KIND: ComponentKind = ComponentKind::Level;
}

/// Per-player score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Score {
    pub value: u32,
}

impl Component for Score {
    const KIND: ComponentKind = ComponentKind::Score;
}

/// Marks a player entity as dead; the respawn path owns the timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeadPlayer {
    pub timer: f32,
    pub initialized: bool,
    pub killer_id: u32,
}

impl Component for DeadPlayer {
    const KIND: ComponentKind = ComponentKind::DeadPlayer;
}

/// Auto-destroy after the remaining time elapses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lifetime {
    pub remaining: f32,
}

impl Lifetime {
    pub fn new(seconds: f32) -> Self {
        Self { remaining: seconds }
    }
}

impl Component for Lifetime {
    const KIND: ComponentKind = ComponentKind::Lifetime;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerupKind {
    SpeedBoost,
    WeaponUpgrade,
    Force,
    Shield,
    ExtraLife,
    Invincibility,
    Heal,
}

impl PowerupKind {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(PowerupKind::SpeedBoost),
            1 => Some(PowerupKind::WeaponUpgrade),
            2 => Some(PowerupKind::Force),
            3 => Some(PowerupKind::Shield),
            4 => Some(PowerupKind::ExtraLife),
            5 => Some(PowerupKind::Invincibility),
            6 => Some(PowerupKind::Heal),
            _ => None,
        }
    }
}

/// A collectible power-up.
#[derive(Debug, Clone, Copy)]
pub struct Powerup {
    pub kind: PowerupKind,
    pub duration: f32,
}

impl Component for Powerup {
    const KIND: ComponentKind = ComponentKind::Powerup;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ForceAttachment {
    Detached = 0x00,
    Front = 0x01,
    Back = 0x02,
    Orbiting = 0x03,
}

impl ForceAttachment {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(ForceAttachment::Detached),
            0x01 => Some(ForceAttachment::Front),
            0x02 => Some(ForceAttachment::Back),
            0x03 => Some(ForceAttachment::Orbiting),
            _ => None,
        }
    }
}

/// The signature Force attachment.
#[derive(Debug, Clone, Copy)]
pub struct Force {
    pub parent_ship: u32,
    pub attachment: ForceAttachment,
    pub power_level: u8,
    pub charge: u8,
    pub firing: bool,
}

impl Component for Force {
    const KIND: ComponentKind = ComponentKind::Force;
}

/// Per-game configuration. Exactly one entity carries this.
#[derive(Debug, Clone, Copy)]
pub struct GameConfig {
    pub music_enabled: bool,
    pub sound_enabled: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            music_enabled: true,
            sound_enabled: true,
        }
    }
}

impl Component for GameConfig {
    const KIND: ComponentKind = ComponentKind::GameConfig;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_bitfield_round_trip() {
        let mut input = InputComponent::new(3);
        input.active_actions.insert(GameAction::MoveUp, true);
        input.active_actions.insert(GameAction::FirePrimary, true);
        let bits = input.to_bitfield();

        let mut other = InputComponent::new(3);
        other.apply_bitfield(bits);
        assert!(other.is_active(GameAction::MoveUp));
        assert!(other.is_active(GameAction::FirePrimary));
        assert!(!other.is_active(GameAction::MoveDown));
    }

    #[test]
    fn team_collision_rules() {
        let player = Team::new(TeamKind::Player);
        let enemy = Team::new(TeamKind::Enemy);
        let mut boss = Team::new(TeamKind::Boss);
        boss.join(TeamKind::Enemy);
        let obstacle = Team::new(TeamKind::Obstacle);

        // Player shots hit enemies and bosses, never players or obstacles.
        assert!(Team::can_collide(&player, &enemy, true));
        assert!(Team::can_collide(&player, &boss, true));
        assert!(!Team::can_collide(&player, &player, true));
        assert!(!Team::can_collide(&player, &obstacle, true));

        // Enemy shots hit only players.
        assert!(Team::can_collide(&enemy, &player, true));
        assert!(!Team::can_collide(&enemy, &enemy, true));

        // Body collisions pass through to normal handling.
        assert!(Team::can_collide(&enemy, &player, false));
    }

    #[test]
    fn transform_wire_round_trip_is_lossless_for_integers() {
        let transform = Transform {
            x: 100.0,
            y: -50.0,
            rotation: 0.0,
            scale: 1.0,
        };
        let wire = transform.to_wire();
        assert_eq!(wire.pos_x, 100);
        assert_eq!(wire.pos_y, -50);

        let mut back = Transform::new(0.0, 0.0);
        back.apply_wire(&wire);
        assert_eq!(back.x, 100.0);
        assert_eq!(back.y, -50.0);
    }

    #[test]
    fn weapon_cooldown_gates_fire() {
        let weapon = Weapon {
            kind: WeaponKind::Basic,
            fire_rate_ms: 250,
            last_shot_ms: 1000,
            damage: 10,
            projectile: ProjectileKind::Missile,
        };
        assert!(!weapon.can_fire(1100));
        assert!(weapon.can_fire(1250));
    }
}
