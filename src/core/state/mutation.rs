//! Optimistic mutation bookkeeping

use std::collections::HashMap;
use std::fmt;

use crate::domain::{ApiError, Confirmation, DedupSet, Identified, OptimisticPatch};

/// Identifies one in-flight optimistic mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatchHandle(u64);

impl fmt::Display for PatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What the caller should do after a mutation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureAction {
    /// The optimistic change was undone; surface the message
    RolledBack,
    /// The item is gone on the server and was dropped locally
    Removed,
    /// Undone, and the session must be invalidated; do not retry
    InvalidateSession,
    /// The handle was unknown (already settled or discarded by a reset)
    Ignored,
}

struct Pending<T> {
    patch: OptimisticPatch<T>,
    applied: bool,
}

/// Applies optimistic patches and keeps just enough to undo them
pub struct MutationReconciler<T> {
    pending: HashMap<PatchHandle, Pending<T>>,
    next_handle: u64,
}

impl<T: Identified> MutationReconciler<T> {
    pub fn new() -> Self {
        Self {
            pending: HashMap::new(),
            next_handle: 0,
        }
    }

    /// Apply `patch` to the collection now and remember how to undo it.
    /// An unknown item id leaves the collection untouched.
    pub fn apply_optimistic(
        &mut self,
        collection: &mut DedupSet<T>,
        patch: OptimisticPatch<T>,
    ) -> PatchHandle {
        let applied = collection.update_by_id(patch.item_id(), |item| patch.apply(item));
        if !applied {
            log::debug!("{} on {} skipped: item not loaded", patch.kind(), patch.item_id());
        }

        let handle = PatchHandle(self.next_handle);
        self.next_handle += 1;
        self.pending.insert(handle, Pending { patch, applied });
        handle
    }

    /// The optimistic state is now authoritative
    pub fn confirm(&mut self, handle: PatchHandle) -> bool {
        self.pending.remove(&handle).is_some()
    }

    /// Confirm and fold in whatever the server sent back
    pub fn confirm_with(
        &mut self,
        handle: PatchHandle,
        collection: &mut DedupSet<T>,
        confirmation: Confirmation<T>,
    ) -> bool {
        let Some(pending) = self.pending.remove(&handle) else {
            return false;
        };
        let id = pending.patch.item_id();

        match confirmation {
            Confirmation::Accepted => {}
            Confirmation::Replace(item) => {
                collection.update_by_id(id, |_| item);
            }
            Confirmation::Patch(patch) => {
                collection.update_by_id(id, |item| patch(item));
            }
        }
        true
    }

    /// Undo the optimistic change via its inverse patch
    pub fn rollback(&mut self, handle: PatchHandle, collection: &mut DedupSet<T>) -> bool {
        let Some(pending) = self.pending.remove(&handle) else {
            return false;
        };
        if !pending.applied {
            return false;
        }

        log::info!(
            "Rolling back {} {} on {}",
            pending.patch.kind(),
            handle,
            pending.patch.item_id()
        );
        collection.update_by_id(pending.patch.item_id(), |item| pending.patch.revert(item))
    }

    /// Settle a failed mutation according to the error kind
    pub fn handle_failure(
        &mut self,
        handle: PatchHandle,
        collection: &mut DedupSet<T>,
        error: &ApiError,
    ) -> FailureAction {
        if !self.pending.contains_key(&handle) {
            return FailureAction::Ignored;
        }

        match error {
            ApiError::NotFound(_) => {
                if let Some(pending) = self.pending.remove(&handle) {
                    collection.remove_by_id(pending.patch.item_id());
                }
                FailureAction::Removed
            }
            ApiError::Auth(_) => {
                self.rollback(handle, collection);
                FailureAction::InvalidateSession
            }
            ApiError::Network(_) | ApiError::Validation(_) => {
                self.rollback(handle, collection);
                FailureAction::RolledBack
            }
        }
    }

    pub fn is_pending(&self, handle: PatchHandle) -> bool {
        self.pending.contains_key(&handle)
    }

    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    /// Forget every rollback record (the owning feed was reset)
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

impl<T: Identified> Default for MutationReconciler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for MutationReconciler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationReconciler")
            .field("in_flight", &self.pending.len())
            .field("next_handle", &self.next_handle)
            .finish()
    }
}
