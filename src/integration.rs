//! Async drivers
//!
//! Connects the pure state layer to the collaborators:
//! - Feed runner (page loading and optimistic mutations)
//! - Unread-count poller

pub mod feed_runner;
pub mod unread_poller;

pub use feed_runner::{FeedRunner, MutationOutcome};
pub use unread_poller::{PollerExit, UnreadPoller};
