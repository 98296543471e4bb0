//! Collaborators the feed state talks to
//!
//! The state layer never performs I/O itself. The runner in `integration`
//! executes [`Cmd`](crate::core::cmd::Cmd)s through these traits, which the
//! REST adapter and session store implement (and tests replace with fakes).

use async_trait::async_trait;
use secrecy::SecretString;

use crate::{
    core::state::feed::{Page, PageRequest},
    domain::{ApiError, Confirmation, MutationKind, MutationRequest},
};

/// Fetches one page of a feed
#[async_trait]
pub trait PageSource<T>: Send + Sync {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page<T>, ApiError>;
}

/// Sends an optimistic mutation to the server
#[async_trait]
pub trait MutationSink<T>: Send + Sync {
    async fn send_mutation(&self, request: &MutationRequest) -> Result<Confirmation<T>, ApiError>;
}

/// Sends a collection-wide mutation (mark all read, clear read).
/// A success means the server applied it to every item it holds.
#[async_trait]
pub trait BulkMutationSink<T>: Send + Sync {
    async fn send_bulk(&self, kind: MutationKind) -> Result<(), ApiError>;
}

/// Owner of the opaque session token
pub trait SessionHandler: Send + Sync {
    fn session_token(&self) -> Option<SecretString>;

    /// Called whenever a fetch or mutation reports an auth failure
    fn on_session_invalid(&self);
}

#[async_trait]
pub trait UnreadCountSource: Send + Sync {
    async fn unread_count(&self) -> Result<u64, ApiError>;
}
