use aster_shared::{
    ComponentKind, DeadPlayer, EntityId, GameAction, InputComponent, Signature, System, Velocity,
    World,
};

use crate::PLAYER_SPEED;

/// Applies each player's action map to its velocity. Dead players keep
/// their input component but stop steering.
pub struct InputSystem;

impl System for InputSystem {
    fn name(&self) -> &'static str {
        "input"
    }

    fn signature(&self) -> Signature {
        Signature::of(&[ComponentKind::Input, ComponentKind::Velocity])
    }

    fn on_update(&mut self, world: &mut World, entities: &[EntityId], _dt: f32) {
        for &entity in entities {
            if world.has::<DeadPlayer>(entity) {
                if let Some(velocity) = world.get_mut::<Velocity>(entity) {
                    *velocity = Velocity::new(0.0, 0.0);
                }
                continue;
            }
            let Some(input) = world.get::<InputComponent>(entity) else {
                continue;
            };
            let mut vx = 0.0;
            let mut vy = 0.0;
            if input.is_active(GameAction::MoveLeft) {
                vx -= PLAYER_SPEED;
            }
            if input.is_active(GameAction::MoveRight) {
                vx += PLAYER_SPEED;
            }
            if input.is_active(GameAction::MoveUp) {
                vy -= PLAYER_SPEED;
            }
            if input.is_active(GameAction::MoveDown) {
                vy += PLAYER_SPEED;
            }
            if let Some(velocity) = world.get_mut::<Velocity>(entity) {
                *velocity = Velocity::new(vx, vy);
            }
        }
    }
}
