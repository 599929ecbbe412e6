use aster_shared::{Animation, ComponentKind, EntityId, Signature, System, World};

/// Advances sprite-sheet frames by elapsed time. Runs on both roles; on
/// the server it only keeps replicated animation state coherent.
pub struct AnimationSystem;

impl System for AnimationSystem {
    fn name(&self) -> &'static str {
        "animation"
    }

    fn signature(&self) -> Signature {
        Signature::of(&[ComponentKind::Animation])
    }

    fn on_update(&mut self, world: &mut World, entities: &[EntityId], dt: f32) {
        for &entity in entities {
            let Some(animation) = world.get_mut::<Animation>(entity) else {
                continue;
            };
            if animation.frame_count == 0 || animation.frame_duration_ms == 0 {
                continue;
            }
            animation.elapsed += dt;
            let frame_duration = f32::from(animation.frame_duration_ms) / 1000.0;
            while animation.elapsed >= frame_duration {
                animation.elapsed -= frame_duration;
                let next = animation.current_frame + 1;
                if next >= animation.frame_count {
                    if animation.looped {
                        animation.current_frame = 0;
                    } else {
                        animation.current_frame = animation.frame_count - 1;
                        animation.elapsed = 0.0;
                        break;
                    }
                } else {
                    animation.current_frame = next;
                }
            }
        }
    }
}
