//! Entity allocator (spec §4.1): issues, recycles, and validates entity
//! handles via a free-list embedded directly in the entity table, mirroring
//! the teacher's `entity_index.rs` swap/recycle bookkeeping but keyed on the
//! spec's simpler "dead slot is a free-list node" representation instead of
//! a separate alive-count partition.

use log::trace;

use crate::config::ID_NONE;
use crate::entity::Entity;
use crate::error::{EcsError, EcsResult};

/// The 16-bit id space can hold at most `u16::MAX` live entities (`ID_NONE`
/// is reserved as the free-list terminator).
const MAX_IDS: usize = ID_NONE as usize;

pub struct EntityIndex {
    /// `table[id]` is the live handle `(generation, id)` when `id` is alive,
    /// or `(next_generation, next_free_id)` — a free-list node — when dead.
    table: Vec<Entity>,
    /// Head of the free list; `ID_NONE` when no ids are free.
    free_head: u16,
}

impl EntityIndex {
    pub fn new() -> Self {
        Self {
            table: Vec::new(),
            free_head: ID_NONE,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Doubles capacity (saturating at the 16-bit id range) to fit `required`.
    fn grow_table(&mut self, required: usize) -> EcsResult<()> {
        if required > MAX_IDS {
            return Err(EcsError::IdSpaceExhausted);
        }
        if self.table.capacity() < required {
            let mut cap = self.table.capacity().max(4);
            while cap < required {
                cap = (cap * 2).min(MAX_IDS);
            }
            trace!("entity table growing to capacity {cap}");
            self.table.reserve(cap - self.table.len());
        }
        Ok(())
    }

    /// Allocates a single entity, recycling from the free list (LIFO) when possible.
    pub fn create_one(&mut self) -> EcsResult<Entity> {
        if self.free_head != ID_NONE {
            let id = self.free_head;
            let node = self.table[id as usize];
            let next_free_id = node.id();
            let next_gen = node.generation();
            self.free_head = next_free_id;
            let handle = Entity::from_parts(id, next_gen);
            self.table[id as usize] = handle;
            return Ok(handle);
        }

        let id = self.table.len();
        if id >= MAX_IDS {
            return Err(EcsError::IdSpaceExhausted);
        }
        self.grow_table(id + 1)?;
        let handle = Entity::from_parts(id as u16, 0);
        self.table.push(handle);
        Ok(handle)
    }

    /// Allocates `count` fresh, contiguous ids. Never recycles (spec §4.1).
    pub fn create_many(&mut self, count: usize) -> EcsResult<Vec<Entity>> {
        let start = self.table.len();
        if start + count > MAX_IDS {
            return Err(EcsError::IdSpaceExhausted);
        }
        self.grow_table(start + count)?;

        let mut created = Vec::with_capacity(count);
        for i in 0..count {
            let handle = Entity::from_parts((start + i) as u16, 0);
            self.table.push(handle);
            created.push(handle);
        }
        Ok(created)
    }

    /// Returns whether `h` no longer matches the generation currently stored
    /// at its id's slot (spec §4.1 `is_destroyed`).
    pub fn is_destroyed(&self, h: Entity) -> bool {
        match self.table.get(h.id() as usize) {
            Some(current) => current.generation() != h.generation(),
            None => true,
        }
    }

    #[inline]
    pub fn is_alive(&self, h: Entity) -> bool {
        !self.is_destroyed(h)
    }

    /// Retires `h`'s id: bumps its generation and links it onto the free
    /// list. Caller is responsible for removing `h`'s components first
    /// (spec §4.1 step: "for every registered component store ... remove").
    pub fn recycle(&mut self, h: Entity) -> EcsResult<()> {
        if self.is_destroyed(h) {
            return Err(EcsError::InvalidHandle(h));
        }

        let id = h.id();
        self.table[id as usize] = Entity::from_parts(self.free_head, h.generation().wrapping_add(1));
        self.free_head = id;
        Ok(())
    }

    /// Entities currently alive, in id order. For save/restore and testing.
    pub fn iter_alive(&self) -> impl Iterator<Item = Entity> + '_ {
        self.table
            .iter()
            .copied()
            .enumerate()
            .filter(|(id, h)| *id as u16 == h.id())
            .map(|(_, h)| h)
    }

    /// Raw table contents, for blit-style serialization (spec §4.6).
    pub(crate) fn raw_table(&self) -> &[Entity] {
        &self.table
    }

    pub(crate) fn free_head(&self) -> u16 {
        self.free_head
    }

    /// Rebuilds the allocator from serialized raw table + free-list head
    /// (spec §4.6 load: "Load restores the free-list head verbatim").
    pub(crate) fn restore(table: Vec<Entity>, free_head: u16) -> Self {
        Self { table, free_head }
    }
}

impl Default for EntityIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generational_recycling_matches_the_reference_trace() {
        let mut idx = EntityIndex::new();

        let created: Vec<Entity> = (0..4).map(|_| idx.create_one().unwrap()).collect();
        assert_eq!(
            created,
            vec![
                Entity::from_parts(0, 0),
                Entity::from_parts(1, 0),
                Entity::from_parts(2, 0),
                Entity::from_parts(3, 0),
            ]
        );

        idx.recycle(created[2]).unwrap();
        idx.recycle(created[1]).unwrap();
        idx.recycle(created[0]).unwrap();

        let batch2: Vec<Entity> = (0..3).map(|_| idx.create_one().unwrap()).collect();
        assert_eq!(
            batch2,
            vec![
                Entity::from_parts(0, 1),
                Entity::from_parts(1, 1),
                Entity::from_parts(2, 1),
            ]
        );

        idx.recycle(batch2[1]).unwrap();
        idx.recycle(batch2[0]).unwrap();

        let batch3: Vec<Entity> = (0..2).map(|_| idx.create_one().unwrap()).collect();
        assert_eq!(batch3, vec![Entity::from_parts(0, 2), Entity::from_parts(1, 2)]);

        idx.recycle(batch3[0]).unwrap();

        let batch4 = idx.create_one().unwrap();
        assert_eq!(batch4, Entity::from_parts(0, 3));

        assert_eq!(idx.table[0].generation(), 3);
        assert_eq!(idx.table[1].generation(), 2);
        assert_eq!(idx.table[2].generation(), 1);
        assert_eq!(idx.table[3].generation(), 0);
    }

    #[test]
    fn destroyed_handle_cannot_be_recycled_twice() {
        let mut idx = EntityIndex::new();
        let e = idx.create_one().unwrap();
        idx.recycle(e).unwrap();
        assert!(idx.recycle(e).is_err());
    }

    #[test]
    fn stale_handle_is_destroyed_after_its_id_is_reused() {
        let mut idx = EntityIndex::new();
        let e0 = idx.create_one().unwrap();
        idx.recycle(e0).unwrap();
        let e0b = idx.create_one().unwrap();
        assert_ne!(e0, e0b);
        assert!(idx.is_destroyed(e0));
        assert!(idx.is_alive(e0b));
    }
}
