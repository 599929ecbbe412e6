//! Substrate invariants: signature/membership equivalence, has-bit
//! equivalence, id space disjointness and destroy semantics.

use aster_shared::{
    EcsError, EntityId, EntityScope, Health, Signature, System, Transform, Velocity, World,
};

struct MovementProbe;

impl System for MovementProbe {
    fn name(&self) -> &'static str {
        "movement_probe"
    }

    fn signature(&self) -> Signature {
        Signature::of(&[
            aster_shared::ComponentKind::Transform,
            aster_shared::ComponentKind::Velocity,
        ])
    }

    fn on_update(&mut self, world: &mut World, entities: &[EntityId], dt: f32) {
        for &entity in entities {
            let Some(velocity) = world.get::<Velocity>(entity).copied() else {
                continue;
            };
            if let Some(transform) = world.get_mut::<Transform>(entity) {
                transform.x += velocity.vx * dt;
                transform.y += velocity.vy * dt;
            }
        }
    }
}

fn world_with_probe() -> World {
    let mut world = World::new();
    world.register_component::<Transform>();
    world.register_component::<Velocity>();
    world.register_component::<Health>();
    world
        .register_system(Box::new(MovementProbe))
        .expect("first registration succeeds");
    world
}

#[test]
fn membership_tracks_signature_superset() {
    let mut world = world_with_probe();
    let entity = world.spawn("probe", EntityScope::Local);

    assert_eq!(world.system_entities("movement_probe").unwrap(), vec![]);

    world.add(entity, Transform::new(0.0, 0.0)).unwrap();
    assert!(world.system_entities("movement_probe").unwrap().is_empty());

    world.add(entity, Velocity::new(1.0, 0.0)).unwrap();
    assert_eq!(
        world.system_entities("movement_probe").unwrap(),
        vec![entity]
    );

    // Extra components do not evict the entity.
    world.add(entity, Health::new(10, 10)).unwrap();
    assert_eq!(
        world.system_entities("movement_probe").unwrap(),
        vec![entity]
    );

    // Losing a required component does.
    world.remove::<Velocity>(entity).unwrap();
    assert!(world.system_entities("movement_probe").unwrap().is_empty());
}

#[test]
fn has_component_iff_signature_bit() {
    let mut world = world_with_probe();
    let entity = world.spawn("bits", EntityScope::Local);
    world.add(entity, Transform::new(1.0, 2.0)).unwrap();

    let signature = world.signature(entity);
    assert!(signature.contains_kind(aster_shared::ComponentKind::Transform));
    assert!(world.has::<Transform>(entity));
    assert!(!signature.contains_kind(aster_shared::ComponentKind::Velocity));
    assert!(!world.has::<Velocity>(entity));
}

#[test]
fn step_integrates_members_only() {
    let mut world = world_with_probe();
    let moving = world.spawn("moving", EntityScope::Local);
    world.add(moving, Transform::new(0.0, 0.0)).unwrap();
    world.add(moving, Velocity::new(10.0, 0.0)).unwrap();

    let still = world.spawn("still", EntityScope::Local);
    world.add(still, Transform::new(5.0, 5.0)).unwrap();

    world.step(1.0);

    assert_eq!(world.get::<Transform>(moving).unwrap().x, 10.0);
    assert_eq!(world.get::<Transform>(still).unwrap().x, 5.0);
}

#[test]
fn local_and_networked_id_spaces_are_disjoint() {
    let mut world = World::new();
    let local = world.spawn("local", EntityScope::Local);
    let networked = world.spawn("networked", EntityScope::Networked);

    // Both spaces start at 1; ids may collide numerically but each live
    // entity belongs to exactly one space.
    assert_eq!(world.scope_of(local), Some(EntityScope::Local));
    assert_eq!(world.scope_of(networked), Some(EntityScope::Networked));
    assert!(world.local_entities().contains(&local.raw()));
    assert!(!world.networked_entities().contains(&1001));
}

#[test]
fn preassigned_networked_id_spawn_and_conflict() {
    let mut world = World::new();
    let entity = world
        .spawn_with_id(1000, "ship", EntityScope::Networked)
        .unwrap();
    assert_eq!(entity.raw(), 1000);
    assert!(matches!(
        world.spawn_with_id(1000, "dup", EntityScope::Networked),
        Err(EcsError::IdInUse(1000))
    ));
    // The allocator skips past preassigned ids.
    let next = world.spawn("next", EntityScope::Networked);
    assert_eq!(next.raw(), 1001);
}

#[test]
fn despawn_erases_every_slot_and_recycles_the_id() {
    let mut world = world_with_probe();
    let entity = world.spawn("doomed", EntityScope::Local);
    world.add(entity, Transform::new(0.0, 0.0)).unwrap();
    world.add(entity, Velocity::new(0.0, 0.0)).unwrap();
    world.add(entity, Health::new(1, 1)).unwrap();

    world.despawn(entity).unwrap();

    assert!(!world.is_alive(entity));
    assert!(world.signature(entity).is_empty());
    assert!(world.get::<Transform>(entity).is_none());
    assert!(world.get::<Velocity>(entity).is_none());
    assert!(world.get::<Health>(entity).is_none());
    assert!(world.system_entities("movement_probe").unwrap().is_empty());

    // Recycled id starts clean.
    let recycled = world.spawn("fresh", EntityScope::Local);
    assert_eq!(recycled, entity);
    assert!(world.signature(recycled).is_empty());
}

#[test]
fn dead_entity_mutation_fails() {
    let mut world = world_with_probe();
    let entity = world.spawn("ghost", EntityScope::Local);
    world.despawn(entity).unwrap();

    assert!(matches!(
        world.add(entity, Transform::new(0.0, 0.0)),
        Err(EcsError::InvalidEntity(_))
    ));
    assert!(matches!(
        world.remove::<Transform>(entity),
        Err(EcsError::InvalidEntity(_))
    ));
    assert!(matches!(
        world.despawn(entity),
        Err(EcsError::InvalidEntity(_))
    ));
}

#[test]
fn unregistered_component_access_fails() {
    let mut world = World::new();
    let entity = world.spawn("bare", EntityScope::Local);
    assert!(matches!(
        world.add(entity, Transform::new(0.0, 0.0)),
        Err(EcsError::ComponentAccess(_))
    ));
    assert!(world.store::<Transform>().is_err());
}

#[test]
fn duplicate_system_registration_fails() {
    let mut world = world_with_probe();
    assert!(matches!(
        world.register_system(Box::new(MovementProbe)),
        Err(EcsError::DuplicateSystem("movement_probe"))
    ));
}

#[test]
fn removing_unknown_system_fails() {
    let mut world = World::new();
    assert!(matches!(
        world.remove_system("nope"),
        Err(EcsError::InvalidSystem("nope"))
    ));
}

#[test]
fn registration_seeds_membership_from_live_entities() {
    let mut world = World::new();
    world.register_component::<Transform>();
    world.register_component::<Velocity>();
    let entity = world.spawn("early", EntityScope::Local);
    world.add(entity, Transform::new(0.0, 0.0)).unwrap();
    world.add(entity, Velocity::new(0.0, 0.0)).unwrap();

    world.register_system(Box::new(MovementProbe)).unwrap();
    assert_eq!(
        world.system_entities("movement_probe").unwrap(),
        vec![entity]
    );
}
