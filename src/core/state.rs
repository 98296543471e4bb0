//! Feed and mutation state

pub mod feed;
pub mod mutation;

pub use feed::{
    FeedController, FeedKey, FeedStatus, LoadOutcome, Page, PageCursor, PageRequest, PageTicket,
    ResourceKind,
};
pub use mutation::{FailureAction, MutationReconciler, PatchHandle};
