//! # artcafe-feed
//!
//! Incremental feed loading for the Art Cafe client: paginated fetching,
//! id-based deduplication across overlapping pages, and optimistic mutations
//! with exact rollback.
//!
//! ## Architecture Overview
//!
//! The state layer follows the Elm architecture and performs no I/O:
//!
//! - **Model** ([`core::state`]): `FeedController` and `MutationReconciler`
//! - **Message** ([`core::msg`]): what happened (`LoadNext`, `Reset`, `PageLoaded`)
//! - **Update**: `FeedController::update` applies a message and returns commands
//! - **Command** ([`core::cmd`]): side effects to run (fetch a page, drop the session)
//!
//! The [`integration`] runners execute those commands through the ports in
//! [`core::ports`], which [`infrastructure`] implements over HTTP.
//!
//! ## Example Usage
//!
//! ```rust
//! use artcafe_feed::core::state::{FeedController, FeedKey, LoadOutcome, Page, ResourceKind};
//! use artcafe_feed::domain::{Identified, ItemId};
//!
//! #[derive(Debug, Clone)]
//! struct Item(ItemId);
//!
//! impl Identified for Item {
//!     fn id(&self) -> &ItemId {
//!         &self.0
//!     }
//! }
//!
//! let mut feed = FeedController::new(FeedKey::new(ResourceKind::Posts), 2);
//! let request = feed.load_next().expect("idle feed accepts a load");
//! let page = Page::new(vec![Item("1".into()), Item("2".into())], false);
//! feed.page_loaded(request.ticket, Ok(page));
//!
//! // The second page overlaps the first by one item
//! let request = feed.load_next().expect("more pages");
//! let page = Page::new(vec![Item("2".into()), Item("3".into())], false);
//! assert_eq!(
//!     feed.page_loaded(request.ticket, Ok(page)),
//!     LoadOutcome::Merged { added: 1, exhausted: false }
//! );
//! assert_eq!(feed.current_items().len(), 3);
//! ```
//!
//! ## Modules
//!
//! - [`domain`] - Item identity, the deduplicating collection, entities, errors
//! - [`core`] - Feed and mutation state, messages, commands, ports
//! - [`infrastructure`] - REST adapter, session store, configuration, CLI
//! - [`integration`] - Async runners driving the state through the ports
//! - [`utils`] - Logging, panic handling, directories

pub mod core;
pub mod domain;
pub mod infrastructure;
pub mod integration;
pub mod utils;

// Re-exports for convenience
pub use crate::core::{
    cmd::Cmd,
    msg::FeedMsg,
    state::{FeedController, FeedKey, MutationReconciler, ResourceKind},
};
pub use domain::{ApiError, DedupSet, Identified, ItemId, OptimisticPatch};
pub use integration::FeedRunner;

/// Result type used throughout the library
pub type Result<T> = color_eyre::eyre::Result<T>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
