use aster_shared::{
    ComponentKind, Enemy, EnemyKind, EntityId, Level, Signature, System, World,
};
use log::{info, warn};

use crate::builders::EntityBuilders;
use crate::events::{EventBus, LevelEvent};
use crate::ENEMY_BASE_HEALTH;

fn enemy_health(kind: EnemyKind) -> i32 {
    match kind {
        EnemyKind::Basic => ENEMY_BASE_HEALTH,
        EnemyKind::Fast => ENEMY_BASE_HEALTH / 2,
        EnemyKind::Tank => ENEMY_BASE_HEALTH * 3,
        EnemyKind::Boss => ENEMY_BASE_HEALTH * 20,
    }
}

/// Server-side wave progression: walks each level's wave table, spawns
/// enemies on schedule and flags completion once every wave has drained.
pub struct LevelSystem {
    with_render: bool,
    events: EventBus,
}

impl LevelSystem {
    pub fn new(with_render: bool, events: EventBus) -> Self {
        Self {
            with_render,
            events,
        }
    }

    fn total_enemies(level: &Level) -> u32 {
        level
            .waves
            .iter()
            .map(|wave| wave.enemies.len() as u32)
            .sum()
    }
}

impl System for LevelSystem {
    fn name(&self) -> &'static str {
        "level"
    }

    fn signature(&self) -> Signature {
        Signature::of(&[ComponentKind::Level])
    }

    fn on_update(&mut self, world: &mut World, entities: &[EntityId], dt: f32) {
        for &entity in entities {
            let Some(mut level) = world.get::<Level>(entity).cloned() else {
                continue;
            };
            if !level.started || level.completed {
                continue;
            }
            if level.elapsed == 0.0 {
                self.events.lock().level_events.push(LevelEvent::Started {
                    index: entity.raw(),
                    enemy_count: Self::total_enemies(&level),
                });
                info!("level {} started ({} waves)", entity, level.waves.len());
            }
            level.elapsed += dt;
            level.wave_clock += dt;

            // Spawn due enemies of the current wave, one schedule step at a
            // time so per-enemy delays accumulate.
            while level.current_wave < level.waves.len() {
                let wave = &level.waves[level.current_wave];
                if level.elapsed < wave.start_time {
                    break;
                }
                if level.spawned_in_wave >= wave.enemies.len() {
                    level.current_wave += 1;
                    level.spawned_in_wave = 0;
                    level.wave_clock = 0.0;
                    continue;
                }
                let spawn = wave.enemies[level.spawned_in_wave];
                if level.spawned_in_wave > 0 && level.wave_clock < spawn.delay_after_previous {
                    break;
                }
                level.wave_clock = 0.0;
                level.spawned_in_wave += 1;
                let result = EntityBuilders::enemy_auto(
                    world,
                    spawn.kind,
                    spawn.x,
                    spawn.y,
                    -80.0,
                    0.0,
                    enemy_health(spawn.kind),
                    self.with_render,
                );
                if let Err(error) = result {
                    warn!("level: enemy spawn failed: {}", error);
                }
            }

            // Complete when every wave has been spawned and the field is
            // clear of enemies.
            let waves_done = level.current_wave >= level.waves.len();
            let field_clear = world
                .store::<Enemy>()
                .map(|store| store.is_empty())
                .unwrap_or(true);
            if waves_done && field_clear {
                level.completed = true;
                self.events.lock().level_events.push(LevelEvent::Completed {
                    index: entity.raw(),
                    elapsed_secs: level.elapsed as u32,
                });
                info!("level {} completed after {:.1}s", entity, level.elapsed);
            }

            if let Some(slot) = world.get_mut::<Level>(entity) {
                *slot = level;
            }
        }
    }
}
