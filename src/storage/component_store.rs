//! The component store (spec §4.3, §2 "~45% of the core"): a sparse set
//! mapping entities to densely packed component values, with move-swap
//! removal. Grounded in the teacher's `storage/sparse_set.rs`
//! (`SparseData::insert`/`remove` follow the identical "grow sparse, push
//! dense, swap-remove, fix up the displaced entry's sparse slot" shape) but
//! monomorphized per component type instead of type-erased, since spec §9
//! says the id-based descriptor indirection — not inheritance or void
//! pointers — is meant to be the polymorphism mechanism here.

use std::any::Any;

use log::{trace, warn};

use crate::component::ComponentHooks;
use crate::config::PAGE_LEN_DENSE;
use crate::entity::Entity;
use crate::error::{EcsError, EcsResult};
use crate::storage::sparse::{SparseArray, SparseElement};

#[cfg(feature = "serde")]
use crate::archive::{ArchiveReader, ArchiveWriter, ReadAdapter, WriteAdapter};

pub(crate) struct ComponentStore<T> {
    sparse: SparseArray,
    /// Packed dense entity array, `dense[i]` owns `values[i]` (spec §3).
    dense: Vec<Entity>,
    values: Vec<T>,
    hooks: ComponentHooks<T>,
    /// Set only by `Registry::register_trivial::<T: bytemuck::Pod>` — see
    /// the safety note on [`raw_bytes_of`]/[`raw_values_from_bytes`].
    trivial: bool,
}

impl<T> ComponentStore<T> {
    pub(crate) fn new(trivial: bool) -> Self {
        Self {
            sparse: SparseArray::new(),
            dense: Vec::new(),
            values: Vec::new(),
            hooks: ComponentHooks::new(),
            trivial,
        }
    }

    pub(crate) fn set_hooks(&mut self, hooks: ComponentHooks<T>) {
        self.hooks = hooks;
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.dense.len()
    }

    #[inline]
    pub(crate) fn dense_entities(&self) -> &[Entity] {
        &self.dense
    }

    #[inline]
    pub(crate) fn has(&self, e: Entity) -> bool {
        let elem = self.sparse.get(e.id());
        !elem.is_none() && elem.generation() == e.generation()
    }

    /// Inserts `value` for `e`. Errors if `e` already has this component
    /// (spec §4.3 "Pre-condition: the entity must not already have this
    /// component. The reference does not check; the implementer is free to
    /// assert" — we return a `Result` instead of asserting, matching Rust's
    /// preference for explicit error returns over panics at API surfaces).
    pub(crate) fn insert(&mut self, e: Entity, mut value: T) -> EcsResult<&mut T> {
        if self.has(e) {
            return Err(EcsError::DuplicateComponent(e));
        }

        if let Some(hook) = &mut self.hooks.on_insert {
            hook(e, &mut value);
        }

        let idx = self.dense.len();
        if idx % PAGE_LEN_DENSE == 0 {
            trace!("component store growing to dense page {}", idx / PAGE_LEN_DENSE + 1);
        }
        self.dense.push(e);
        self.values.push(value);
        self.sparse.set(e.id(), SparseElement::new(e.generation(), idx as u16));
        Ok(&mut self.values[idx])
    }

    /// Inserts a value synthesized by the construct hook, the nearest
    /// analogue of the reference's uninitialized-bytes `ctor` (spec §4.3
    /// step 3, S3 scenario).
    pub(crate) fn insert_constructed(&mut self, e: Entity) -> EcsResult<&mut T> {
        let value = match &mut self.hooks.construct {
            Some(ctor) => ctor(),
            None => return Err(EcsError::MissingComponent(e)),
        };
        self.insert(e, value)
    }

    /// Removes `e`'s component via swap-with-last (spec §4.3 "remove").
    /// `Vec::swap_remove` already performs exactly the "read C, raw-copy
    /// C_last into C" shuffle the reference hand-rolls; we only need to
    /// (a) fire the removal hook on the value that belonged to `e` before
    /// the slot is overwritten, and (b) fix up the displaced entity's
    /// sparse slot.
    pub(crate) fn remove(&mut self, e: Entity) -> EcsResult<T> {
        let elem = self.sparse.get(e.id());
        if elem.is_none() || elem.generation() != e.generation() {
            return Err(EcsError::MissingComponent(e));
        }
        let idx = elem.dense_index() as usize;
        let last = self.dense.len() - 1;

        self.dense.swap_remove(idx);
        let mut removed = self.values.swap_remove(idx);

        if let Some(hook) = &mut self.hooks.on_remove {
            hook(e, &mut removed);
        }

        if idx != last {
            let moved_entity = self.dense[idx];
            let moved_elem = self.sparse.get(moved_entity.id());
            self.sparse
                .set(moved_entity.id(), SparseElement::new(moved_elem.generation(), idx as u16));
        }
        self.sparse.clear(e.id());

        Ok(removed)
    }

    pub(crate) fn get(&self, e: Entity) -> EcsResult<&T> {
        let elem = self.sparse.get(e.id());
        if elem.is_none() || elem.generation() != e.generation() {
            return Err(EcsError::MissingComponent(e));
        }
        Ok(&self.values[elem.dense_index() as usize])
    }

    pub(crate) fn get_mut(&mut self, e: Entity) -> EcsResult<&mut T> {
        let elem = self.sparse.get(e.id());
        if elem.is_none() || elem.generation() != e.generation() {
            return Err(EcsError::MissingComponent(e));
        }
        Ok(&mut self.values[elem.dense_index() as usize])
    }

}

/// Reinterprets `values` as raw bytes for the trivial-type blit path.
///
/// # Safety (by construction, not by the type bound)
/// Only valid when every `ComponentStore<T>` this is called through was
/// created with `trivial = true`, which only happens via
/// `Registry::register_trivial::<T: bytemuck::Pod>`.
#[cfg(feature = "serde")]
fn raw_bytes_of<T>(values: &[T]) -> &[u8] {
    unsafe { std::slice::from_raw_parts(values.as_ptr().cast::<u8>(), std::mem::size_of_val(values)) }
}

/// The inverse of [`raw_bytes_of`]: reconstructs `n` values of `T` from
/// exactly `n * size_of::<T>()` raw bytes, under the same safety contract.
#[cfg(feature = "serde")]
fn raw_values_from_bytes<T>(bytes: &[u8], n: usize) -> Vec<T> {
    debug_assert_eq!(bytes.len(), n * std::mem::size_of::<T>());
    let mut values: Vec<T> = Vec::with_capacity(n);
    unsafe {
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), values.as_mut_ptr().cast::<u8>(), bytes.len());
        values.set_len(n);
    }
    values
}

/// Type-erased view over a [`ComponentStore<T>`], used by the registry for
/// operations that must run across every bound store without knowing its
/// component type: destruction cascade (spec §4.5), and the top-level
/// save/load traversal (spec §4.6).
pub(crate) trait AnyComponentStore {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn type_name(&self) -> &'static str;
    fn len(&self) -> usize;
    fn has(&self, e: Entity) -> bool;
    /// Removes `e`'s component if present, running hooks, without
    /// returning the value (used by the entity-destruction cascade).
    fn remove_dyn(&mut self, e: Entity);
    fn dense_entities(&self) -> &[Entity];

    #[cfg(feature = "serde")]
    fn save(&self, w: &mut dyn ArchiveWriter) -> EcsResult<()>;
    #[cfg(feature = "serde")]
    fn load(&mut self, r: &mut dyn ArchiveReader) -> EcsResult<()>;
}

impl<T: crate::component::Component> AnyComponentStore for ComponentStore<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn len(&self) -> usize {
        ComponentStore::len(self)
    }

    fn has(&self, e: Entity) -> bool {
        ComponentStore::has(self, e)
    }

    fn remove_dyn(&mut self, e: Entity) {
        let _ = ComponentStore::remove(self, e);
    }

    fn dense_entities(&self) -> &[Entity] {
        ComponentStore::dense_entities(self)
    }

    #[cfg(feature = "serde")]
    fn save(&self, w: &mut dyn ArchiveWriter) -> EcsResult<()> {
        w.object_begin();

        w.list_begin(self.dense.len());
        if w.allow_binary() {
            w.write_bytes(raw_bytes_of(&self.dense));
        } else {
            for e in &self.dense {
                w.write_bytes(&e.to_bits().to_ne_bytes());
            }
        }
        w.list_end();

        w.list_begin(self.values.len());
        if w.allow_binary() && self.trivial {
            for chunk in self.values.chunks(PAGE_LEN_DENSE) {
                w.write_bytes(raw_bytes_of(chunk));
            }
        } else {
            for value in &self.values {
                bincode::serialize_into(WriteAdapter(w), value)
                    .map_err(|e| EcsError::Corrupt(e.to_string()))?;
            }
        }
        w.list_end();

        w.object_end();
        Ok(())
    }

    #[cfg(feature = "serde")]
    fn load(&mut self, r: &mut dyn ArchiveReader) -> EcsResult<()> {
        r.object_begin();

        let entity_count = r.list_begin()?;
        let dense = if r.allow_binary() {
            let mut bytes = vec![0u8; entity_count * std::mem::size_of::<Entity>()];
            r.read_bytes(&mut bytes)?;
            raw_values_from_bytes::<Entity>(&bytes, entity_count)
        } else {
            let mut dense = Vec::with_capacity(entity_count);
            for _ in 0..entity_count {
                let mut buf = [0u8; 4];
                r.read_bytes(&mut buf)?;
                dense.push(Entity::from_bits(u32::from_ne_bytes(buf)));
            }
            dense
        };
        r.list_end();

        let value_count = r.list_begin()?;
        let values: Vec<T> = if r.allow_binary() && self.trivial {
            let mut bytes = vec![0u8; value_count * std::mem::size_of::<T>()];
            r.read_bytes(&mut bytes)?;
            raw_values_from_bytes::<T>(&bytes, value_count)
        } else {
            if r.allow_binary() {
                warn!(
                    "component store not registered as trivial; falling back to \
                     per-element deserialization for {} value(s)",
                    value_count
                );
            }
            let mut values = Vec::with_capacity(value_count);
            for _ in 0..value_count {
                let value = bincode::deserialize_from(ReadAdapter(r))
                    .map_err(|e| EcsError::Corrupt(e.to_string()))?;
                values.push(value);
            }
            values
        };
        r.list_end();
        r.object_end();

        // Serialized data intentionally omits the sparse pages (spec §4.6);
        // rebuild them from the restored dense array.
        let mut sparse = SparseArray::new();
        for (idx, e) in dense.iter().enumerate() {
            sparse.set(e.id(), SparseElement::new(e.generation(), idx as u16));
        }

        self.dense = dense;
        self.values = values;
        self.sparse = sparse;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn entity(id: u16, generation: u16) -> Entity {
        Entity::from_parts(id, generation)
    }

    #[test]
    fn insert_then_remove_swaps_the_last_element_into_place() {
        let mut store: ComponentStore<u32> = ComponentStore::new(false);
        let e0 = entity(0, 0);
        let e1 = entity(1, 0);
        let e2 = entity(2, 0);

        store.insert(e0, 10).unwrap();
        store.insert(e1, 11).unwrap();
        store.insert(e2, 12).unwrap();

        assert_eq!(store.remove(e0).unwrap(), 10);
        // e2 (formerly last) now occupies e0's old dense slot.
        assert!(!store.has(e0));
        assert_eq!(*store.get(e1).unwrap(), 11);
        assert_eq!(*store.get(e2).unwrap(), 12);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn inserting_twice_for_the_same_entity_errors() {
        let mut store: ComponentStore<u32> = ComponentStore::new(false);
        let e = entity(0, 0);
        store.insert(e, 1).unwrap();
        assert!(matches!(store.insert(e, 2), Err(EcsError::DuplicateComponent(_))));
    }

    /// Mirrors the "lifetime hooks" scenario, adapted to Rust's own move/drop
    /// semantics (spec §9: "target languages with native move/drop should
    /// use them and drop the trick"): `swap_remove` hands the hook the
    /// value that belonged to the entity actually being removed, never the
    /// value physically swapped into its old slot, so a still-alive
    /// neighbor's data is untouched by another entity's removal.
    #[test]
    fn removal_hook_fires_on_the_removed_entitys_own_value() {
        let remove_count = Rc::new(RefCell::new(0));
        let remove_count_for_hook = remove_count.clone();

        let mut store: ComponentStore<u32> = ComponentStore::new(false);
        store.set_hooks(
            ComponentHooks::new()
                .with_construct(|| 99)
                .with_on_remove(move |_e, value| {
                    *value = 11;
                    *remove_count_for_hook.borrow_mut() += 1;
                }),
        );

        let e0 = entity(0, 0);
        let e1 = entity(1, 0);
        store.insert_constructed(e0).unwrap();
        store.insert_constructed(e1).unwrap();
        assert_eq!(*store.get(e0).unwrap(), 99);
        assert_eq!(*store.get(e1).unwrap(), 99);

        *store.get_mut(e1).unwrap() = 88;

        let removed0 = store.remove(e0).unwrap();
        assert_eq!(removed0, 11);
        assert_eq!(*remove_count.borrow(), 1);

        // e1 (moved into e0's old dense slot) keeps its own 88 — the
        // removal hook ran on e0's extracted value, not on the slot.
        assert_eq!(*store.get(e1).unwrap(), 88);

        let removed1 = store.remove(e1).unwrap();
        assert_eq!(removed1, 11);
        assert_eq!(*remove_count.borrow(), 2);
    }
}
