//! Save/restore (spec §4.6): walks the entity table and every bound
//! component store through the [`crate::archive`] abstraction.
//!
//! Grounded in the teacher's `world.rs` snapshot routines layered over the
//! pack's `nomai-ecs` save/restore example: write the entity table first
//! (so ids are stable before any component data references them), then a
//! length-prefixed map of `component id -> store payload` in ascending id
//! order, since spec §4.6 requires ids to be written "in ascending order so
//! the reader can detect an out-of-order stream".

use crate::archive::{ArchiveReader, ArchiveWriter, BinReader, BinWriter};
use crate::entity::Entity;
use crate::entity_index::EntityIndex;
use crate::error::{EcsError, EcsResult};
use crate::registry::Registry;
use crate::storage::component_store::AnyComponentStore;

/// Serializes `registry` into the reference binary container (spec §6).
pub fn save(registry: &Registry, allow_binary: bool) -> EcsResult<Vec<u8>> {
    let mut w = BinWriter::new(allow_binary);
    w.object_begin();

    let table = registry.entities.raw_table();
    w.list_begin(table.len());
    for e in table {
        w.write_bytes(&e.to_bits().to_ne_bytes());
    }
    w.list_end();
    w.write_bytes(&registry.entities.free_head().to_ne_bytes());

    let bound: Vec<(u32, &dyn AnyComponentStore)> = registry
        .stores
        .iter()
        .enumerate()
        .filter_map(|(id, slot)| slot.as_deref().map(|s| (id as u32, s)))
        .collect();

    w.map_begin(bound.len());
    for (id, store) in bound {
        w.write_bytes(&id.to_ne_bytes());
        store.save(&mut w)?;
    }
    w.map_end();

    w.object_end();
    Ok(w.into_bytes())
}

/// Restores `registry` from `bytes` written by [`save`]. `registry` must
/// already have every serialized component type registered (spec §4.6:
/// "the reader owns type registration; the archive carries ids, not
/// descriptors"); a serialized id with no matching local store is an error
/// rather than a skip, since skipping would silently drop data.
///
/// `allow_out_of_order` is accepted for symmetry with [`crate::archive`] but
/// always rejected (spec §9 reserves id remapping for a future version).
pub fn load(registry: &mut Registry, bytes: &[u8], allow_binary: bool, allow_out_of_order: bool) -> EcsResult<()> {
    if allow_out_of_order {
        return Err(EcsError::OutOfOrderUnsupported);
    }

    let mut r = BinReader::new(bytes, allow_binary, allow_out_of_order);
    r.object_begin();

    let entity_count = r.list_begin()?;
    let mut table = Vec::with_capacity(entity_count);
    for _ in 0..entity_count {
        let mut buf = [0u8; 4];
        r.read_bytes(&mut buf)?;
        table.push(Entity::from_bits(u32::from_ne_bytes(buf)));
    }
    r.list_end();

    let mut free_head_buf = [0u8; 2];
    r.read_bytes(&mut free_head_buf)?;
    let free_head = u16::from_ne_bytes(free_head_buf);

    let store_count = r.map_begin()?;
    let mut last_id: Option<u32> = None;
    for _ in 0..store_count {
        let mut id_buf = [0u8; 4];
        r.read_bytes(&mut id_buf)?;
        let id = u32::from_ne_bytes(id_buf);

        if let Some(prev) = last_id {
            if id <= prev && !allow_out_of_order {
                return Err(EcsError::Corrupt(format!(
                    "component ids out of ascending order: {prev} then {id}"
                )));
            }
        }
        last_id = Some(id);

        match registry.stores.get_mut(id as usize).and_then(Option::as_mut) {
            Some(store) => store.load(&mut r)?,
            None => return Err(EcsError::MissingComponentStore(id)),
        }
    }
    r.map_end();
    r.object_end();

    registry.entities = EntityIndex::restore(table, free_head);
    Ok(())
}
