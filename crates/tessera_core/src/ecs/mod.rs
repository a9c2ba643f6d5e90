//! # Entity Component System
//!
//! Storage and bookkeeping half of the kernel.
//!
//! ## Design Philosophy
//!
//! - Component kinds are small integer tags from a closed host enumeration
//! - Each entity owns a dense row indexed by tag (O(1) get/set/remove)
//! - Entity IDs are indices with generation counters
//! - Collections are cached per aspect and updated incrementally

mod aspect;
mod collection;
mod component;
mod entity;
mod registry;
mod storage;
mod world;

pub use aspect::Aspect;
pub use collection::{Collection, CollectionId, ObserverId};
pub use component::{
    Component, ComponentKind, ComponentSet, KindInfo, KindIter, KindMask, MAX_KINDS,
};
pub use entity::EntityId;
pub use registry::ComponentRegistry;
pub use world::World;
