//! The registry (spec §4.5): top-level owner of the entity table and the
//! array of component stores. Grounded in the teacher's `World`, which plays
//! the same role (owns `entity_index` plus a `SparseSet<Entity, ComponentRecord>`
//! of per-type storage) though keyed by archetype tables rather than one
//! sparse set per type.

use std::any::TypeId;
use std::collections::HashMap;

use crate::component::{shared_type_id, Component, ComponentHooks, ComponentTypeId};
use crate::entity::Entity;
use crate::entity_index::EntityIndex;
use crate::error::{EcsError, EcsResult};
use crate::query::Query;
use crate::storage::component_store::{AnyComponentStore, ComponentStore};

pub struct Registry {
    pub(crate) entities: EntityIndex,
    pub(crate) stores: Vec<Option<Box<dyn AnyComponentStore>>>,
    type_index: HashMap<TypeId, u32>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            entities: EntityIndex::new(),
            stores: Vec::new(),
            type_index: HashMap::new(),
        }
    }

    /// Allocates with `reserve_type_count` empty component-store slots
    /// preallocated (spec §4.5 `create(reserve_type_count)`).
    pub fn with_reserved_types(reserve_type_count: usize) -> Self {
        let mut registry = Self::new();
        registry.stores.resize_with(reserve_type_count, || None);
        registry
    }

    // -- entity lifecycle ---------------------------------------------

    pub fn create(&mut self) -> EcsResult<Entity> {
        self.entities.create_one()
    }

    pub fn create_many(&mut self, count: usize) -> EcsResult<Vec<Entity>> {
        self.entities.create_many(count)
    }

    pub fn is_alive(&self, e: Entity) -> bool {
        self.entities.is_alive(e)
    }

    /// Destroys `e`: removes it from every bound component store (cascading
    /// the per-component removal hook), then retires its id onto the
    /// allocator's free list (spec §4.1 `destroy`).
    pub fn destroy(&mut self, e: Entity) -> EcsResult<()> {
        if self.entities.is_destroyed(e) {
            return Err(EcsError::InvalidHandle(e));
        }

        for store in self.stores.iter_mut().flatten() {
            if store.has(e) {
                store.remove_dyn(e);
            }
        }

        self.entities.recycle(e)
    }

    pub fn alive_count(&self) -> usize {
        self.entities.iter_alive().count()
    }

    // -- component type registration ------------------------------------

    fn smallest_free_slot(&self) -> u32 {
        self.stores
            .iter()
            .position(Option::is_none)
            .unwrap_or(self.stores.len()) as u32
    }

    fn bind_store<T: Component>(&mut self, trivial: bool) -> EcsResult<ComponentTypeId> {
        let candidate = self.smallest_free_slot();
        let id = shared_type_id::<T>(candidate);
        let idx = id as usize;

        if idx >= self.stores.len() {
            self.stores.resize_with(idx + 1, || None);
        }

        match &self.stores[idx] {
            None => {
                self.stores[idx] = Some(Box::new(ComponentStore::<T>::new(trivial)));
            }
            Some(existing) => {
                if existing.as_any().downcast_ref::<ComponentStore<T>>().is_none() {
                    return Err(EcsError::DuplicateRegistration(id));
                }
                // already bound to the same type: idempotent (spec §4.2 step 3).
            }
        }

        self.type_index.insert(TypeId::of::<T>(), id);
        Ok(ComponentTypeId(id))
    }

    /// Registers `T` if not already registered, returning its stable id.
    /// Errors if `T`'s shared type id (spec §3: ids are shared process-wide
    /// across registries) is already bound to a *different* type in this
    /// registry (spec §4.2 step 3/§7 `DuplicateRegistration`).
    pub fn register<T: Component>(&mut self) -> EcsResult<ComponentTypeId> {
        self.bind_store::<T>(false)
    }

    /// Registers `T` with the serializer's trivial-type blit fast path
    /// enabled (spec §4.6). Only `bytemuck::Pod` types may opt in, since the
    /// fast path reinterprets the component array as raw bytes. Same
    /// `DuplicateRegistration` failure mode as `register`.
    #[cfg(feature = "serde")]
    pub fn register_trivial<T: Component + bytemuck::Pod>(&mut self) -> EcsResult<ComponentTypeId> {
        self.bind_store::<T>(true)
    }

    pub fn set_hooks<T: Component>(&mut self, hooks: ComponentHooks<T>) -> EcsResult<()> {
        self.register::<T>()?;
        self.store_mut::<T>()
            .expect("just registered")
            .set_hooks(hooks);
        Ok(())
    }

    pub fn component_id<T: 'static>(&self) -> Option<ComponentTypeId> {
        self.type_index.get(&TypeId::of::<T>()).copied().map(ComponentTypeId)
    }

    pub(crate) fn store<T: Component>(&self) -> Option<&ComponentStore<T>> {
        let id = self.component_id::<T>()?;
        self.stores[id.as_u32() as usize]
            .as_ref()?
            .as_any()
            .downcast_ref()
    }

    pub(crate) fn store_mut<T: Component>(&mut self) -> Option<&mut ComponentStore<T>> {
        let id = self.component_id::<T>()?;
        self.stores[id.as_u32() as usize]
            .as_mut()?
            .as_any_mut()
            .downcast_mut()
    }

    // -- component access -------------------------------------------------

    pub fn insert<T: Component>(&mut self, e: Entity, value: T) -> EcsResult<&mut T> {
        if !self.entities.is_alive(e) {
            return Err(EcsError::InvalidHandle(e));
        }
        self.register::<T>()?;
        self.store_mut::<T>().expect("just registered").insert(e, value)
    }

    /// Inserts a value synthesized by `T`'s construct hook (spec S3 scenario).
    pub fn insert_default<T: Component>(&mut self, e: Entity) -> EcsResult<&mut T> {
        if !self.entities.is_alive(e) {
            return Err(EcsError::InvalidHandle(e));
        }
        self.register::<T>()?;
        self.store_mut::<T>().expect("just registered").insert_constructed(e)
    }

    pub fn remove<T: Component>(&mut self, e: Entity) -> EcsResult<T> {
        if !self.entities.is_alive(e) {
            return Err(EcsError::InvalidHandle(e));
        }
        self.store_mut::<T>()
            .ok_or(EcsError::MissingComponent(e))?
            .remove(e)
    }

    pub fn has<T: Component>(&self, e: Entity) -> bool {
        self.entities.is_alive(e) && self.store::<T>().is_some_and(|s| s.has(e))
    }

    pub fn get<T: Component>(&self, e: Entity) -> EcsResult<&T> {
        if !self.entities.is_alive(e) {
            return Err(EcsError::InvalidHandle(e));
        }
        self.store::<T>().ok_or(EcsError::MissingComponent(e))?.get(e)
    }

    pub fn get_mut<T: Component>(&mut self, e: Entity) -> EcsResult<&mut T> {
        if !self.entities.is_alive(e) {
            return Err(EcsError::InvalidHandle(e));
        }
        self.store_mut::<T>()
            .ok_or(EcsError::MissingComponent(e))?
            .get_mut(e)
    }

    pub fn query(&self) -> Query<'_> {
        Query::new(self)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
