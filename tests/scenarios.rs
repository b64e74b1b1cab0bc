use std::collections::HashMap;

use sparse_ecs::components::{Health, Label, Position, Velocity};
use sparse_ecs::{EntityId, EntityRegistry, StorageRegistry, World};

fn visit_positions(world: &World) -> Vec<(EntityId, Position)> {
    let mut visited = Vec::new();
    world.for_each::<Position, _>(|entity, pos| visited.push((entity, *pos)));
    visited
}

#[test]
fn iteration_follows_component_lifecycle() {
    let mut world = World::new();
    let e1 = world.create();
    let e2 = world.create();
    let e3 = world.create();
    assert_eq!([e1.raw(), e2.raw(), e3.raw()], [1, 2, 3]);

    world.add_component(e1, Position::new(0.0, 0.0));
    world.add_component(e3, Position::new(5.0, 5.0));

    let mut visited = visit_positions(&world);
    visited.sort_by_key(|(entity, _)| *entity);
    assert_eq!(
        visited,
        vec![(e1, Position::new(0.0, 0.0)), (e3, Position::new(5.0, 5.0))]
    );

    world.destroy(e1);
    assert!(!world.has_component::<Position>(e1));
    assert_eq!(visit_positions(&world), vec![(e3, Position::new(5.0, 5.0))]);
}

#[test]
fn iteration_order_is_deterministic() {
    let build = || {
        let mut world = World::new();
        let ids: Vec<_> = (0..6).map(|_| world.create()).collect();
        for (i, &entity) in ids.iter().enumerate() {
            world.add_component(entity, Position::new(i as f32, 0.0));
        }
        world.remove_component::<Position>(ids[1]);
        world.destroy(ids[4]);
        world
    };

    assert_eq!(visit_positions(&build()), visit_positions(&build()));
}

#[test]
fn recreated_entity_starts_empty() {
    let mut world = World::new();
    let _e1 = world.create();
    let e2 = world.create();
    let _e3 = world.create();
    world.add_component(e2, Position::new(1.0, 1.0));
    world.add_component(e2, Health::full(10));
    world.add_component(e2, Label("old".into()));

    world.destroy(e2);
    let recreated = world.create();

    assert_eq!(recreated, e2);
    assert_eq!(recreated.raw(), 2);
    assert!(!world.has_component::<Position>(recreated));
    assert!(!world.has_component::<Health>(recreated));
    assert!(!world.has_component::<Label>(recreated));
    assert!(!world.has_component::<Velocity>(recreated));
}

#[test]
fn lookups_of_unknown_type_allocate_nothing() {
    let mut world = World::new();
    let entity = world.create();

    assert!(world.get_component::<Velocity>(entity).is_none());
    assert!(!world.has_component::<Velocity>(entity));
    let mut visits = 0;
    world.for_each::<Velocity, _>(|_, _| visits += 1);

    assert_eq!(visits, 0);
    assert_eq!(world.storage().pool_count(), 0);
    assert!(!world.storage().contains_pool::<Velocity>());

    world.add_component(entity, Velocity::new(1.0, 0.0));
    assert_eq!(world.storage().pool_count(), 1);
}

#[test]
fn destroy_leaves_untouched_pools_alone() {
    let mut world = World::new();
    let a = world.create();
    let b = world.create();
    world.add_component(b, Velocity::new(2.0, 0.0));
    world.add_component(b, Health::full(3));

    world.destroy(a);

    assert_eq!(world.storage().pool::<Velocity>().map(|pool| pool.size()), Some(1));
    assert_eq!(world.storage().pool::<Health>().map(|pool| pool.size()), Some(1));
    assert_eq!(world.get_component::<Health>(b), Some(&Health::full(3)));
}

#[test]
fn registries_compose_without_world() {
    let mut entities = EntityRegistry::new();
    let mut storage = StorageRegistry::new();

    let a = entities.create();
    let b = entities.create();
    storage.add_component(a, Label("a".into()));
    storage.add_component(b, Label("b".into()));
    storage.add_component(b, 7u64);

    entities.destroy(b, &mut storage);

    let labels: HashMap<_, _> = storage
        .pool::<Label>()
        .unwrap()
        .iter()
        .map(|(entity, label)| (entity, label.0.clone()))
        .collect();
    assert_eq!(labels, HashMap::from([(a, "a".to_string())]));
    assert!(!storage.has_component::<u64>(b));
    assert_eq!(entities.create(), b);
}

#[test]
fn independent_worlds_share_nothing() {
    let mut first = World::new();
    let mut second = World::new();
    let a = first.create();
    let b = second.create();
    assert_eq!(a, b);

    first.add_component(a, Health::full(1));
    assert!(!second.has_component::<Health>(b));
    assert_eq!(second.storage().pool_count(), 0);
}
