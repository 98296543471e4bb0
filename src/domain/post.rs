use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{
    item::{Identified, ItemId},
    mutation::{MutationKind, OptimisticPatch},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: ItemId,
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub profile_picture: Option<String>,
}

impl UserSummary {
    pub fn display_name(&self) -> &str {
        match self.full_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.username,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: ItemId,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub user: Option<UserSummary>,
    #[serde(default)]
    pub post_id: Option<ItemId>,
}

impl Identified for Comment {
    fn id(&self) -> &ItemId {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: ItemId,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub user: Option<UserSummary>,
    #[serde(default)]
    pub comment_count: u32,
    #[serde(default)]
    pub like_count: u32,
    #[serde(default)]
    pub liked_by_current_user: bool,
    /// Comments loaded alongside the post (detail view only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<Comment>,
}

impl Identified for Post {
    fn id(&self) -> &ItemId {
        &self.id
    }
}

impl Post {
    /// Flips the like flag and moves the count with it
    pub fn toggled_like(&self) -> Post {
        let liked = !self.liked_by_current_user;
        let like_count = if liked {
            self.like_count.saturating_add(1)
        } else {
            self.like_count.saturating_sub(1)
        };
        Post {
            liked_by_current_user: liked,
            like_count,
            ..self.clone()
        }
    }

    pub fn with_comment(&self, comment: Comment) -> Post {
        let mut post = self.clone();
        post.comments.push(comment);
        post.comment_count = post.comment_count.saturating_add(1);
        post
    }

    pub fn with_comment_inserted(&self, index: usize, comment: Comment) -> Post {
        let mut post = self.clone();
        let index = index.min(post.comments.len());
        post.comments.insert(index, comment);
        post.comment_count = post.comment_count.saturating_add(1);
        post
    }

    /// Removes a comment; the count only moves if the comment was present
    pub fn without_comment(&self, comment_id: &ItemId) -> Post {
        let mut post = self.clone();
        let before = post.comments.len();
        post.comments.retain(|c| &c.id != comment_id);
        if post.comments.len() < before {
            post.comment_count = post.comment_count.saturating_sub(1);
        }
        post
    }

    pub fn with_comment_content(&self, comment_id: &ItemId, content: &str) -> Post {
        let mut post = self.clone();
        if let Some(comment) = post.comments.iter_mut().find(|c| &c.id == comment_id) {
            comment.content = content.to_string();
        }
        post
    }

    /// Swaps a locally created comment for the one the server stored
    pub fn with_comment_replaced(&self, local_id: &ItemId, stored: Comment) -> Post {
        let mut post = self.clone();
        if let Some(comment) = post.comments.iter_mut().find(|c| &c.id == local_id) {
            *comment = stored;
        }
        post
    }
}

/// Like toggle: its own inverse
pub fn toggle_like(post_id: ItemId) -> OptimisticPatch<Post> {
    OptimisticPatch::new(
        post_id,
        MutationKind::ToggleLike,
        Post::toggled_like,
        Post::toggled_like,
    )
}

/// Appends `comment` (usually carrying a local placeholder id)
pub fn add_comment(post_id: ItemId, comment: Comment) -> OptimisticPatch<Post> {
    let payload = json!({ "content": comment.content, "localId": comment.id });
    let local_id = comment.id.clone();
    OptimisticPatch::new(
        post_id,
        MutationKind::AddComment,
        move |post: &Post| post.with_comment(comment.clone()),
        move |post: &Post| post.without_comment(&local_id),
    )
    .with_payload(payload)
}

pub fn edit_comment(
    post_id: ItemId,
    comment_id: ItemId,
    previous: String,
    content: String,
) -> OptimisticPatch<Post> {
    let payload = json!({ "commentId": comment_id, "content": content });
    let forward_id = comment_id.clone();
    OptimisticPatch::new(
        post_id,
        MutationKind::EditComment,
        move |post: &Post| post.with_comment_content(&forward_id, &content),
        move |post: &Post| post.with_comment_content(&comment_id, &previous),
    )
    .with_payload(payload)
}

/// Builds a delete patch from the current post so the comment can be put
/// back where it was. Returns `None` if the post has no such comment.
pub fn delete_comment(post: &Post, comment_id: &ItemId) -> Option<OptimisticPatch<Post>> {
    let index = post.comments.iter().position(|c| &c.id == comment_id)?;
    let removed = post.comments[index].clone();
    let payload = json!({ "commentId": comment_id });
    let forward_id = comment_id.clone();

    Some(
        OptimisticPatch::new(
            post.id.clone(),
            MutationKind::DeleteComment,
            move |post: &Post| post.without_comment(&forward_id),
            move |post: &Post| post.with_comment_inserted(index, removed.clone()),
        )
        .with_payload(payload),
    )
}
