//! Domain layer
//!
//! Plain data and pure operations, no I/O:
//! - Item identity and the deduplicating feed collection
//! - The error taxonomy reported by the API collaborators
//! - Art Cafe entities and their optimistic patches

pub mod collections;
pub mod error;
pub mod item;
pub mod learning_plan;
pub mod mutation;
pub mod notification;
pub mod post;

pub use collections::{DedupSet, SortOrder};
pub use error::ApiError;
pub use item::{Identified, ItemId};
pub use mutation::{
    BulkPatch, BulkUndo, Confirmation, MutationKind, MutationRequest, OptimisticPatch, PatchFn,
};
