use std::any::Any;

use super::{ComponentKind, EntityId};

/// A typed record attachable to entities. The associated kind pins the
/// signature bit and, for replicated kinds, the wire component id.
pub trait Component: Sized + Send + 'static {
    const KIND: ComponentKind;
}

/// Sparse array of `Option<T>` indexed by entity id. Grows on demand.
pub struct ComponentStore<T> {
    slots: Vec<Option<T>>,
}

impl<T: Component> ComponentStore<T> {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Inserts (or replaces) the component for an entity.
    pub fn insert(&mut self, entity: EntityId, value: T) -> &mut T {
        let index = entity.index();
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || None);
        }
        self.slots[index] = Some(value);
        self.slots[index].as_mut().expect("slot was just filled")
    }

    pub fn remove(&mut self, entity: EntityId) -> Option<T> {
        self.slots.get_mut(entity.index()).and_then(Option::take)
    }

    pub fn get(&self, entity: EntityId) -> Option<&T> {
        self.slots.get(entity.index()).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, entity: EntityId) -> Option<&mut T> {
        self.slots.get_mut(entity.index()).and_then(Option::as_mut)
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.get(entity).is_some()
    }

    /// Dense iteration over occupied slots in id order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|c| (EntityId::from_raw(index as u32), c)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_mut().map(|c| (EntityId::from_raw(index as u32), c)))
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }
}

impl<T: Component> Default for ComponentStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Type-erased view of a store: the eraser hook run on entity destroy and
/// the downcast bridge back to the typed store.
pub(crate) trait AnyStore: Send {
    fn erase(&mut self, entity: EntityId);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> AnyStore for ComponentStore<T> {
    fn erase(&mut self, entity: EntityId) {
        self.remove(entity);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Marker(u32);

    impl Component for Marker {
        const KIND: ComponentKind = ComponentKind::Score;
    }

    #[test]
    fn insert_get_remove() {
        let mut store = ComponentStore::new();
        let entity = EntityId::from_raw(7);
        store.insert(entity, Marker(42));
        assert_eq!(store.get(entity).map(|m| m.0), Some(42));
        assert_eq!(store.remove(entity).map(|m| m.0), Some(42));
        assert!(store.get(entity).is_none());
    }

    #[test]
    fn iteration_skips_empty_slots() {
        let mut store = ComponentStore::new();
        store.insert(EntityId::from_raw(2), Marker(2));
        store.insert(EntityId::from_raw(9), Marker(9));
        let collected: Vec<u32> = store.iter().map(|(id, _)| id.raw()).collect();
        assert_eq!(collected, vec![2, 9]);
        assert_eq!(store.len(), 2);
    }
}
