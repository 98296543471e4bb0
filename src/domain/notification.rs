use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{
    item::{Identified, ItemId},
    mutation::{BulkPatch, MutationKind, OptimisticPatch},
    post::UserSummary,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: ItemId,
    pub content: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub sender: Option<UserSummary>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub reference_id: Option<String>,
}

impl Identified for Notification {
    fn id(&self) -> &ItemId {
        &self.id
    }
}

impl Notification {
    pub fn with_read(&self, read: bool) -> Notification {
        Notification {
            read,
            ..self.clone()
        }
    }
}

pub fn unread_count<'a, I>(notifications: I) -> usize
where
    I: IntoIterator<Item = &'a Notification>,
{
    notifications.into_iter().filter(|n| !n.read).count()
}

/// Marks a notification read; reverting restores whatever flag it had before
pub fn mark_read(notification: &Notification) -> OptimisticPatch<Notification> {
    let previous = notification.read;
    OptimisticPatch::new(
        notification.id.clone(),
        MutationKind::MarkNotificationRead,
        |n: &Notification| n.with_read(true),
        move |n: &Notification| n.with_read(previous),
    )
}

/// Marks every loaded notification read. Only unread ones are touched, so a
/// rollback leaves already-read notifications alone.
pub fn mark_all_read() -> BulkPatch<Notification> {
    BulkPatch::update(MutationKind::MarkAllNotificationsRead, |n: &Notification| {
        (!n.read).then(|| n.with_read(true))
    })
}

/// Drops every read notification from the list
pub fn clear_read() -> BulkPatch<Notification> {
    BulkPatch::remove(MutationKind::ClearReadNotifications, |n: &Notification| n.read)
}
