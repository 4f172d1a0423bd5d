//! The query evaluator (spec §4.4): a builder of `with`/`without`/`optional`
//! constraints that, once finalized, iterates the smallest `with` store's
//! dense entity array and filters every other constraint against it.
//!
//! Grounded in the teacher's query planner picking the smallest candidate
//! table to iterate before filtering the rest (`query.rs`'s archetype-size
//! based base selection), adapted to per-type sparse sets instead of
//! archetype tables: here "smallest candidate" means the `with` store with
//! the fewest entities, not the smallest matching archetype.

use crate::component::{Component, ComponentTypeId};
use crate::config::MAX_QUERY_ARGS;
use crate::entity::Entity;
use crate::error::{EcsError, EcsResult};
use crate::registry::Registry;

/// Builds up constraints before [`Query::iter`] finalizes the plan. A
/// constraint against a type never registered in this registry is recorded
/// as `None`; it still counts toward [`MAX_QUERY_ARGS`] and is resolved at
/// `iter()` time (a `with(T)` on an unregistered `T` makes the whole query
/// empty; a `without(T)`/`optional(T)` on one is trivially satisfied/absent).
pub struct Query<'r> {
    registry: &'r Registry,
    with: Vec<Option<u32>>,
    without: Vec<Option<u32>>,
    optional: Vec<Option<u32>>,
}

impl<'r> Query<'r> {
    pub(crate) fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            with: Vec::new(),
            without: Vec::new(),
            optional: Vec::new(),
        }
    }

    fn id_of<T: Component>(&self) -> Option<u32> {
        self.registry.component_id::<T>().map(ComponentTypeId::as_u32)
    }

    /// Requires the entity to carry `T` (spec §4.4 "with").
    pub fn with<T: Component>(mut self) -> Self {
        self.with.push(self.id_of::<T>());
        self
    }

    /// Requires the entity to NOT carry `T` (spec §4.4 "without").
    pub fn without<T: Component>(mut self) -> Self {
        self.without.push(self.id_of::<T>());
        self
    }

    /// Neither requires nor excludes `T`; it can be read with
    /// [`QueryIter::get`] during iteration (spec §4.4 "optional").
    pub fn optional<T: Component>(mut self) -> Self {
        self.optional.push(self.id_of::<T>());
        self
    }

    /// Finalizes the query: validates argument count and `with`-non-empty,
    /// picks the smallest `with` store as the iteration base, and returns an
    /// iterator over matching entities.
    pub fn iter(self) -> EcsResult<QueryIter<'r>> {
        let total = self.with.len() + self.without.len() + self.optional.len();
        if total > MAX_QUERY_ARGS {
            return Err(EcsError::TooManyQueryArgs(MAX_QUERY_ARGS));
        }
        if self.with.is_empty() {
            return Err(EcsError::InvalidQuery);
        }

        if self.with.iter().any(Option::is_none) {
            return Ok(QueryIter {
                registry: self.registry,
                base_id: None,
                cursor: 0,
                with: Vec::new(),
                without: self.without.into_iter().flatten().collect(),
            });
        }

        let with_ids: Vec<u32> = self.with.into_iter().flatten().collect();
        let mut base_id = with_ids[0];
        let mut base_len = store_len(self.registry, base_id);
        for &id in &with_ids[1..] {
            let len = store_len(self.registry, id);
            if len < base_len {
                base_id = id;
                base_len = len;
            }
        }
        let rest_with: Vec<u32> = with_ids.into_iter().filter(|&id| id != base_id).collect();
        let without_ids: Vec<u32> = self.without.into_iter().flatten().collect();

        Ok(QueryIter {
            registry: self.registry,
            base_id: Some(base_id),
            cursor: 0,
            with: rest_with,
            without: without_ids,
        })
    }
}

fn store_len(registry: &Registry, id: u32) -> usize {
    registry
        .stores
        .get(id as usize)
        .and_then(Option::as_ref)
        .map_or(0, |s| s.len())
}

fn store_has(registry: &Registry, id: u32, e: Entity) -> bool {
    registry
        .stores
        .get(id as usize)
        .and_then(Option::as_ref)
        .is_some_and(|s| s.has(e))
}

pub struct QueryIter<'r> {
    registry: &'r Registry,
    base_id: Option<u32>,
    cursor: usize,
    with: Vec<u32>,
    without: Vec<u32>,
}

impl<'r> QueryIter<'r> {
    fn matches(&self, e: Entity) -> bool {
        self.with.iter().all(|&id| store_has(self.registry, id, e))
            && self.without.iter().all(|&id| !store_has(self.registry, id, e))
    }

    /// Whether the current (or any) entity carries `T` — usable for
    /// `optional` arguments (spec §4.4 `component_has`).
    pub fn has<T: Component>(&self, e: Entity) -> bool {
        self.registry.has::<T>(e)
    }

    /// Reads `T` off `e` if present — usable for `optional` arguments (spec
    /// §4.4 `component_get`).
    pub fn get<T: Component>(&self, e: Entity) -> Option<&T> {
        self.registry.get::<T>(e).ok()
    }
}

impl<'r> Iterator for QueryIter<'r> {
    type Item = Entity;

    fn next(&mut self) -> Option<Entity> {
        let base_id = self.base_id?;
        let store = self.registry.stores.get(base_id as usize)?.as_ref()?;
        let dense = store.dense_entities();
        while self.cursor < dense.len() {
            let e = dense[self.cursor];
            self.cursor += 1;
            if self.matches(e) {
                return Some(e);
            }
        }
        None
    }
}
