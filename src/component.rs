//! Component type registration (spec §3 "Component type descriptor", §4.2).
//!
//! Grounded in the teacher's `registration.rs`: a process-wide monotonic
//! counter there (`allocate_type_index` / `TypeIndex`) lets a descriptor be
//! shared across worlds once any one of them has registered the type. We
//! use the same idea, keyed by `std::any::TypeId` instead of a derive-macro
//! generated index, so no proc-macro facade is required (spec §9: "macro-
//! based type binding ... should be replaced by a generic API keyed by the
//! target language's type identity").

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use crate::entity::Entity;

/// Marker trait for any value usable as a component.
///
/// With the `serde` feature (on by default) every component must be
/// (de)serializable, since [`crate::serialize`] is unconditionally part of
/// the registry's public surface and spec §6 calls "opt out of serialization
/// support" a feature, not a per-type runtime choice.
#[cfg(feature = "serde")]
pub trait Component: 'static + serde::Serialize + serde::de::DeserializeOwned {}
#[cfg(feature = "serde")]
impl<T: 'static + serde::Serialize + serde::de::DeserializeOwned> Component for T {}

#[cfg(not(feature = "serde"))]
pub trait Component: 'static {}
#[cfg(not(feature = "serde"))]
impl<T: 'static> Component for T {}

/// A stable small integer identifying a registered component type within one
/// registry (spec §3: "stable small-integer id").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentTypeId(pub(crate) u32);

impl ComponentTypeId {
    #[inline]
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

/// Returns the id this type has been assigned process-wide, inserting
/// `candidate` as that id if this is the first time the type has ever been
/// registered anywhere (spec §3: "the first registry to register a type
/// populates the descriptor with an id ... subsequent registries must
/// accept the pre-existing id").
pub(crate) fn shared_type_id<T: 'static>(candidate: u32) -> u32 {
    fn table() -> &'static Mutex<HashMap<TypeId, u32>> {
        static TABLE: OnceLock<Mutex<HashMap<TypeId, u32>>> = OnceLock::new();
        TABLE.get_or_init(|| Mutex::new(HashMap::new()))
    }

    *table()
        .lock()
        .expect("component type registry poisoned")
        .entry(TypeId::of::<T>())
        .or_insert(candidate)
}

type ConstructHook<T> = Box<dyn FnMut() -> T>;
type InsertHook<T> = Box<dyn FnMut(Entity, &mut T)>;
type RemoveHook<T> = Box<dyn FnMut(Entity, &mut T)>;

/// Per-type lifecycle hooks (spec §3/§4.3), replacing the reference's raw
/// `ctor`/`dtor`/`move_and_dtor` function pointers with the closures the
/// teacher's `TypeHooksBuilder` exposes as `with_default`/`with_add`/
/// `with_remove`. Rust's own move and drop glue covers `move_and_dtor`.
#[derive(Default)]
pub struct ComponentHooks<T> {
    pub(crate) construct: Option<ConstructHook<T>>,
    pub(crate) on_insert: Option<InsertHook<T>>,
    pub(crate) on_remove: Option<RemoveHook<T>>,
}

impl<T> ComponentHooks<T> {
    pub fn new() -> Self {
        Self {
            construct: None,
            on_insert: None,
            on_remove: None,
        }
    }

    /// Sets the hook used by [`crate::registry::Registry::insert_default`]
    /// to synthesize a value in place of the reference's uninitialized-bytes
    /// constructor.
    pub fn with_construct<F: FnMut() -> T + 'static>(mut self, f: F) -> Self {
        self.construct = Some(Box::new(f));
        self
    }

    pub fn with_on_insert<F: FnMut(Entity, &mut T) + 'static>(mut self, f: F) -> Self {
        self.on_insert = Some(Box::new(f));
        self
    }

    pub fn with_on_remove<F: FnMut(Entity, &mut T) + 'static>(mut self, f: F) -> Self {
        self.on_remove = Some(Box::new(f));
        self
    }
}
