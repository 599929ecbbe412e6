use std::collections::{BTreeSet, HashSet};

use log::{debug, warn};

use super::entity::IdSpace;
use super::store::AnyStore;
use super::{
    Component, ComponentStore, EntityId, EntityScope, Signature, System, COMPONENT_KIND_COUNT,
};
use crate::error::EcsError;

/// Membership bookkeeping events, replayed to a system entry that was
/// checked out of the registry while its own update ran.
enum SignatureEvent {
    Changed(EntityId, Signature),
    Removed(EntityId),
}

struct SystemEntry {
    name: &'static str,
    required: Signature,
    entities: BTreeSet<EntityId>,
    running: bool,
    system: Box<dyn System>,
}

impl SystemEntry {
    fn apply(&mut self, event: &SignatureEvent) {
        match *event {
            SignatureEvent::Changed(entity, signature) => {
                if signature.contains_all(self.required) {
                    self.entities.insert(entity);
                } else {
                    self.entities.remove(&entity);
                }
            }
            SignatureEvent::Removed(entity) => {
                self.entities.remove(&entity);
            }
        }
    }
}

/// The ECS root: id spaces, signatures, typed stores and the system
/// registry. Owned and mutated by the main thread only.
pub struct World {
    stores: Vec<Option<Box<dyn AnyStore>>>,
    signatures: Vec<Signature>,
    names: Vec<String>,
    local: IdSpace,
    networked: IdSpace,
    systems: Vec<Option<SystemEntry>>,
    signature_log: Vec<SignatureEvent>,
}

impl World {
    pub fn new() -> Self {
        let mut stores = Vec::with_capacity(COMPONENT_KIND_COUNT);
        stores.resize_with(COMPONENT_KIND_COUNT, || None);
        Self {
            stores,
            signatures: Vec::new(),
            names: Vec::new(),
            local: IdSpace::new(),
            networked: IdSpace::new(),
            systems: Vec::new(),
            signature_log: Vec::new(),
        }
    }

    // ---------------------------------------------------------------
    // Components
    // ---------------------------------------------------------------

    /// Registers the store for a component kind. Idempotent.
    pub fn register_component<T: Component>(&mut self) {
        let slot = &mut self.stores[T::KIND.index()];
        if slot.is_none() {
            *slot = Some(Box::new(ComponentStore::<T>::new()));
        }
    }

    /// Typed view of a registered store.
    pub fn store<T: Component>(&self) -> Result<&ComponentStore<T>, EcsError> {
        self.stores[T::KIND.index()]
            .as_deref()
            .and_then(|store| store.as_any().downcast_ref::<ComponentStore<T>>())
            .ok_or(EcsError::ComponentAccess(T::KIND.name()))
    }

    pub fn store_mut<T: Component>(&mut self) -> Result<&mut ComponentStore<T>, EcsError> {
        self.stores[T::KIND.index()]
            .as_deref_mut()
            .and_then(|store| store.as_any_mut().downcast_mut::<ComponentStore<T>>())
            .ok_or(EcsError::ComponentAccess(T::KIND.name()))
    }

    /// Attaches a component, updating the signature and every system's
    /// membership before returning.
    pub fn add<T: Component>(&mut self, entity: EntityId, value: T) -> Result<&mut T, EcsError> {
        self.ensure_alive(entity)?;
        // Fail before mutating anything if the kind was never registered.
        self.store::<T>()?;

        let signature = {
            let signature = &mut self.signatures[entity.index()];
            signature.insert(T::KIND);
            *signature
        };
        self.note_signature(SignatureEvent::Changed(entity, signature));
        Ok(self.store_mut::<T>()?.insert(entity, value))
    }

    /// Detaches a component, returning it if it was present.
    pub fn remove<T: Component>(&mut self, entity: EntityId) -> Result<Option<T>, EcsError> {
        self.ensure_alive(entity)?;
        self.store::<T>()?;

        let signature = {
            let signature = &mut self.signatures[entity.index()];
            signature.remove(T::KIND);
            *signature
        };
        self.note_signature(SignatureEvent::Changed(entity, signature));
        Ok(self.store_mut::<T>()?.remove(entity))
    }

    /// Overwrites an existing component, or attaches it when absent.
    pub fn update<T: Component>(&mut self, entity: EntityId, value: T) -> Result<(), EcsError> {
        self.ensure_alive(entity)?;
        if !self.store::<T>()?.contains(entity) {
            return self.add(entity, value).map(|_| ());
        }
        if let Some(slot) = self.store_mut::<T>()?.get_mut(entity) {
            *slot = value;
        }
        Ok(())
    }

    pub fn get<T: Component>(&self, entity: EntityId) -> Option<&T> {
        self.store::<T>().ok().and_then(|store| store.get(entity))
    }

    pub fn get_mut<T: Component>(&mut self, entity: EntityId) -> Option<&mut T> {
        self.store_mut::<T>()
            .ok()
            .and_then(|store| store.get_mut(entity))
    }

    pub fn has<T: Component>(&self, entity: EntityId) -> bool {
        self.is_alive(entity)
            && self
                .store::<T>()
                .map(|store| store.contains(entity))
                .unwrap_or(false)
    }

    // ---------------------------------------------------------------
    // Entities
    // ---------------------------------------------------------------

    /// Spawns an entity in the given id space.
    pub fn spawn(&mut self, name: &str, scope: EntityScope) -> EntityId {
        let raw = match scope {
            EntityScope::Local => self.local.allocate(),
            EntityScope::Networked => self.networked.allocate(),
        };
        let entity = EntityId::from_raw(raw);
        self.init_entity(entity, name);
        entity
    }

    /// Spawns an entity under a peer-assigned id. Fails if the id is live.
    pub fn spawn_with_id(
        &mut self,
        raw: u32,
        name: &str,
        scope: EntityScope,
    ) -> Result<EntityId, EcsError> {
        let claimed = match scope {
            EntityScope::Local => self.local.allocate_specific(raw),
            EntityScope::Networked => self.networked.allocate_specific(raw),
        };
        if !claimed {
            return Err(EcsError::IdInUse(raw));
        }
        let entity = EntityId::from_raw(raw);
        self.init_entity(entity, name);
        Ok(entity)
    }

    fn init_entity(&mut self, entity: EntityId, name: &str) {
        let index = entity.index();
        if index >= self.signatures.len() {
            self.signatures.resize(index + 1, Signature::EMPTY);
            self.names.resize(index + 1, String::new());
        }
        self.signatures[index] = Signature::EMPTY;
        self.names[index] = name.to_owned();
        self.note_signature(SignatureEvent::Changed(entity, Signature::EMPTY));
        debug!("spawned entity {} '{}'", entity, name);
    }

    /// Destroys an entity: every typed slot is erased, the signature is
    /// reset and the id returns to its space's free list.
    pub fn despawn(&mut self, entity: EntityId) -> Result<(), EcsError> {
        let raw = entity.raw();
        let released = self.local.release(raw) || self.networked.release(raw);
        if !released {
            return Err(EcsError::InvalidEntity(raw));
        }
        for store in self.stores.iter_mut().flatten() {
            store.erase(entity);
        }
        self.signatures[entity.index()].clear();
        self.note_signature(SignatureEvent::Removed(entity));
        debug!("despawned entity {}", entity);
        Ok(())
    }

    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.local.is_live(entity.raw()) || self.networked.is_live(entity.raw())
    }

    pub fn scope_of(&self, entity: EntityId) -> Option<EntityScope> {
        if self.local.is_live(entity.raw()) {
            Some(EntityScope::Local)
        } else if self.networked.is_live(entity.raw()) {
            Some(EntityScope::Networked)
        } else {
            None
        }
    }

    pub fn signature(&self, entity: EntityId) -> Signature {
        self.signatures
            .get(entity.index())
            .copied()
            .unwrap_or(Signature::EMPTY)
    }

    pub fn entity_name(&self, entity: EntityId) -> Option<&str> {
        if self.is_alive(entity) {
            self.names.get(entity.index()).map(String::as_str)
        } else {
            None
        }
    }

    pub fn local_entities(&self) -> &HashSet<u32> {
        self.local.live()
    }

    pub fn networked_entities(&self) -> &HashSet<u32> {
        self.networked.live()
    }

    fn ensure_alive(&self, entity: EntityId) -> Result<(), EcsError> {
        if self.is_alive(entity) {
            Ok(())
        } else {
            Err(EcsError::InvalidEntity(entity.raw()))
        }
    }

    // ---------------------------------------------------------------
    // Systems
    // ---------------------------------------------------------------

    /// Registers a system and seeds its membership from the live set.
    /// Registration order is the schedule order.
    pub fn register_system(&mut self, system: Box<dyn System>) -> Result<(), EcsError> {
        let name = system.name();
        if self.systems.iter().flatten().any(|entry| entry.name == name) {
            return Err(EcsError::DuplicateSystem(name));
        }

        let required = system.signature();
        let mut entities = BTreeSet::new();
        for &raw in self.local.live().iter().chain(self.networked.live()) {
            let entity = EntityId::from_raw(raw);
            if self.signature(entity).contains_all(required) {
                entities.insert(entity);
            }
        }

        let index = self.systems.len();
        self.systems.push(Some(SystemEntry {
            name,
            required,
            entities,
            running: false,
            system,
        }));
        self.with_entry(index, |entry, world| entry.system.on_create(world));
        Ok(())
    }

    /// Unregisters a system by name, firing its destroy hook.
    pub fn remove_system(&mut self, name: &'static str) -> Result<(), EcsError> {
        let index = self
            .systems
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|entry| entry.name == name))
            .ok_or(EcsError::InvalidSystem(name))?;
        self.with_entry(index, |entry, world| entry.system.on_destroy(world));
        self.systems.remove(index);
        Ok(())
    }

    pub fn has_system(&self, name: &str) -> bool {
        self.systems.iter().flatten().any(|entry| entry.name == name)
    }

    /// Entity membership of a system, for assertions and diagnostics.
    pub fn system_entities(&self, name: &str) -> Option<Vec<EntityId>> {
        self.systems
            .iter()
            .flatten()
            .find(|entry| entry.name == name)
            .map(|entry| entry.entities.iter().copied().collect())
    }

    pub fn start_running(&mut self) {
        for index in 0..self.systems.len() {
            self.with_entry(index, |entry, world| {
                entry.running = true;
                entry.system.on_start_running(world);
            });
        }
    }

    pub fn stop_running(&mut self) {
        for index in 0..self.systems.len() {
            self.with_entry(index, |entry, world| {
                entry.running = false;
                entry.system.on_stop_running(world);
            });
        }
    }

    /// Steps every system once with the given delta time, in registration
    /// order. Membership changes made by a system are visible to the next
    /// system in the schedule.
    pub fn step(&mut self, dt: f32) {
        for index in 0..self.systems.len() {
            self.with_entry(index, |entry, world| {
                let members: Vec<EntityId> = entry.entities.iter().copied().collect();
                entry.system.on_update(world, &members, dt);
            });
        }
    }

    /// Checks the entry out of the registry, runs `f` with the world
    /// borrowable, then replays any membership events it missed.
    fn with_entry(&mut self, index: usize, f: impl FnOnce(&mut SystemEntry, &mut World)) {
        let Some(mut entry) = self.systems[index].take() else {
            warn!("system slot {} unexpectedly empty", index);
            return;
        };
        f(&mut entry, self);
        for event in self.signature_log.drain(..) {
            entry.apply(&event);
        }
        self.systems[index] = Some(entry);
    }

    /// Propagates a signature change to every registered system. An entry
    /// that is currently checked out receives the event on check-in.
    fn note_signature(&mut self, event: SignatureEvent) {
        let mut any_checked_out = false;
        for slot in &mut self.systems {
            match slot {
                Some(entry) => entry.apply(&event),
                None => any_checked_out = true,
            }
        }
        if any_checked_out {
            self.signature_log.push(event);
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
