//! Optimistic patch descriptions shared by the entities and the reconciler

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

use super::{
    collections::DedupSet,
    item::{Identified, ItemId},
};

pub type PatchFn<T> = Arc<dyn Fn(&T) -> T + Send + Sync>;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MutationKind {
    ToggleLike,
    AddComment,
    EditComment,
    DeleteComment,
    CompleteTopic,
    MarkNotificationRead,
    MarkAllNotificationsRead,
    ClearReadNotifications,
}

/// What gets sent to the server for a mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationRequest {
    pub kind: MutationKind,
    pub item_id: ItemId,
    pub payload: Value,
}

/// A local change applied before the server confirms it, together with its
/// inverse so it can be undone exactly.
pub struct OptimisticPatch<T> {
    item_id: ItemId,
    kind: MutationKind,
    forward: PatchFn<T>,
    inverse: PatchFn<T>,
    payload: Value,
}

impl<T> OptimisticPatch<T> {
    pub fn new<F, G>(item_id: ItemId, kind: MutationKind, forward: F, inverse: G) -> Self
    where
        F: Fn(&T) -> T + Send + Sync + 'static,
        G: Fn(&T) -> T + Send + Sync + 'static,
    {
        Self {
            item_id,
            kind,
            forward: Arc::new(forward),
            inverse: Arc::new(inverse),
            payload: Value::Null,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn item_id(&self) -> &ItemId {
        &self.item_id
    }

    pub fn kind(&self) -> MutationKind {
        self.kind
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn apply(&self, item: &T) -> T {
        (self.forward)(item)
    }

    pub fn revert(&self, item: &T) -> T {
        (self.inverse)(item)
    }

    pub fn request(&self) -> MutationRequest {
        MutationRequest {
            kind: self.kind,
            item_id: self.item_id.clone(),
            payload: self.payload.clone(),
        }
    }
}

impl<T> Clone for OptimisticPatch<T> {
    fn clone(&self) -> Self {
        Self {
            item_id: self.item_id.clone(),
            kind: self.kind,
            forward: Arc::clone(&self.forward),
            inverse: Arc::clone(&self.inverse),
            payload: self.payload.clone(),
        }
    }
}

impl<T> fmt::Debug for OptimisticPatch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptimisticPatch")
            .field("item_id", &self.item_id)
            .field("kind", &self.kind)
            .field("payload", &self.payload)
            .finish_non_exhaustive()
    }
}

/// How the server acknowledged a mutation
pub enum Confirmation<T> {
    /// The optimistic state stands as is
    Accepted,
    /// The server returned the authoritative item
    Replace(T),
    /// The server returned values to fold into the item (e.g. a like count)
    Patch(PatchFn<T>),
}

impl<T> Confirmation<T> {
    pub fn patch<F>(f: F) -> Self
    where
        F: Fn(&T) -> T + Send + Sync + 'static,
    {
        Confirmation::Patch(Arc::new(f))
    }
}

impl<T: fmt::Debug> fmt::Debug for Confirmation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confirmation::Accepted => f.write_str("Accepted"),
            Confirmation::Replace(item) => f.debug_tuple("Replace").field(item).finish(),
            Confirmation::Patch(_) => f.write_str("Patch(..)"),
        }
    }
}

/// A change applied to every matching item of a collection at once
#[derive(Clone)]
enum BulkChange<T> {
    /// Rewrites items, `None` leaves an item alone
    Update(Arc<dyn Fn(&T) -> Option<T> + Send + Sync>),
    /// Drops every item the predicate matches
    Remove(Arc<dyn Fn(&T) -> bool + Send + Sync>),
}

/// Optimistic counterpart of [`OptimisticPatch`] for collection-wide
/// mutations. The server call carries no item id, only the kind.
#[derive(Clone)]
pub struct BulkPatch<T> {
    kind: MutationKind,
    change: BulkChange<T>,
}

/// What a [`BulkPatch`] took away, enough to put it back exactly
#[derive(Debug)]
#[must_use]
pub enum BulkUndo<T> {
    Restore(Vec<T>),
    Reinsert(Vec<(usize, T)>),
}

impl<T: Identified + Clone> BulkPatch<T> {
    pub fn update<F>(kind: MutationKind, f: F) -> Self
    where
        F: Fn(&T) -> Option<T> + Send + Sync + 'static,
    {
        Self {
            kind,
            change: BulkChange::Update(Arc::new(f)),
        }
    }

    pub fn remove<F>(kind: MutationKind, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self {
            kind,
            change: BulkChange::Remove(Arc::new(predicate)),
        }
    }

    pub fn kind(&self) -> MutationKind {
        self.kind
    }

    pub fn apply(&self, collection: &mut DedupSet<T>) -> BulkUndo<T> {
        match &self.change {
            BulkChange::Update(f) => BulkUndo::Restore(collection.update_all(|item| f(item))),
            BulkChange::Remove(predicate) => {
                BulkUndo::Reinsert(collection.remove_where(|item| predicate(item)))
            }
        }
    }
}

impl<T: Identified + Clone> BulkUndo<T> {
    /// Number of items the patch touched
    pub fn len(&self) -> usize {
        match self {
            BulkUndo::Restore(items) => items.len(),
            BulkUndo::Reinsert(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn revert(self, collection: &mut DedupSet<T>) {
        match self {
            BulkUndo::Restore(previous) => {
                for item in previous {
                    let id = item.id().clone();
                    collection.update_by_id(&id, move |_| item);
                }
            }
            BulkUndo::Reinsert(removed) => collection.restore_removed(removed),
        }
    }
}

impl<T> fmt::Debug for BulkPatch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let change = match self.change {
            BulkChange::Update(_) => "update",
            BulkChange::Remove(_) => "remove",
        };
        f.debug_struct("BulkPatch")
            .field("kind", &self.kind)
            .field("change", &change)
            .finish()
    }
}
