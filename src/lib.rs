//! A sparse-set entity-component registry: a single-threaded, in-process
//! store of entities and their components, built around a generational
//! entity allocator, one paged sparse set per component type, a query
//! evaluator that iterates the smallest matching store, and a binary
//! save/restore format layered over an abstract archive interface.

pub mod archive;
pub mod component;
pub mod config;
pub mod entity;
pub mod error;
pub mod query;
pub mod registry;

#[cfg(feature = "serde")]
pub mod serialize;

mod entity_index;
mod storage;

pub use component::{Component, ComponentHooks, ComponentTypeId};
pub use entity::Entity;
pub use error::{EcsError, EcsResult};
pub use query::{Query, QueryIter};
pub use registry::Registry;
