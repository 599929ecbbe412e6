//! Gameplay systems. Registration order is the schedule: input → ai →
//! movement → shoot → collision → lifetime → level → score → animation.

mod ai;
mod animation;
mod collision;
mod input;
mod level;
mod lifetime;
mod movement;
mod score;
mod shoot;

pub use ai::AiSystem;
pub use animation::AnimationSystem;
pub use collision::CollisionSystem;
pub use input::InputSystem;
pub use level::LevelSystem;
pub use lifetime::LifetimeSystem;
pub use movement::MovementSystem;
pub use score::ScoreSystem;
pub use shoot::ShootSystem;
