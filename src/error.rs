//! Error kinds (spec §7), following the teacher's `thiserror`-derived style.

use thiserror::Error;

use crate::entity::Entity;

pub type EcsResult<T> = Result<T, EcsError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// Destroying an already-destroyed entity, or addressing a component
    /// through a handle whose generation no longer matches the table.
    #[error("entity {0} is not alive")]
    InvalidHandle(Entity),

    /// A query was built with no `with` constraint (spec §4.4: "a purely
    /// negative/optional query is rejected to avoid a full-registry scan").
    #[error("query has no `with` constraint")]
    InvalidQuery,

    /// Registering a different descriptor at an already-bound component id.
    #[error("component id {0} is already bound to a different type")]
    DuplicateRegistration(u32),

    /// Deserializing with `allow_out_of_order = false` and a serialized
    /// component id beyond the local registry's range.
    #[error("no component store registered for serialized component id {0}")]
    MissingComponentStore(u32),

    /// Adding a component the entity already has.
    #[error("entity {0} already has this component")]
    DuplicateComponent(Entity),

    /// Removing or reading a component the entity does not have.
    #[error("entity {0} has no component of this type")]
    MissingComponent(Entity),

    /// A query accumulated more than [`crate::config::MAX_QUERY_ARGS`] constraints.
    #[error("query exceeds the maximum of {0} arguments")]
    TooManyQueryArgs(usize),

    /// The 16-bit id space for entities or for a component's sparse index
    /// has been exhausted.
    #[error("id space exhausted")]
    IdSpaceExhausted,

    /// `allow_out_of_order` was requested at load time; spec §4.6/§9 reserve
    /// this as a future extension and require a clean rejection in v1.
    #[error("out-of-order deserialization is not implemented")]
    OutOfOrderUnsupported,

    /// The archive's declared format version is not one this crate can read.
    #[error("unsupported archive version {0}")]
    UnsupportedVersion(u32),

    /// Malformed or truncated archive data.
    #[error("corrupt archive: {0}")]
    Corrupt(String),
}
