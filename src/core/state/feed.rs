use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{
    core::{cmd::Cmd, msg::FeedMsg},
    domain::{ApiError, DedupSet, Identified},
};

mod pagination;

pub use pagination::PageCursor;

/// Which server collection a feed pages through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResourceKind {
    /// Global post feed
    Posts,
    /// Posts of one author, identity is the username
    UserPosts,
    /// Comments under a post, identity is the post id
    Comments,
    /// Learning plans of a user, identity is the user id
    LearningPlans,
    Notifications,
}

/// Identity of a logical feed. Switching keys resets the feed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedKey {
    pub kind: ResourceKind,
    pub identity: Option<String>,
}

impl FeedKey {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            identity: None,
        }
    }

    pub fn with_identity(kind: ResourceKind, identity: impl Into<String>) -> Self {
        Self {
            kind,
            identity: Some(identity.into()),
        }
    }
}

/// Stamp attached to every page request so late responses can be recognised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageTicket {
    pub generation: u64,
    pub page_index: u32,
}

/// One page request handed to the fetch collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub key: FeedKey,
    pub page_index: u32,
    pub page_size: usize,
    pub ticket: PageTicket,
}

/// One page returned by the fetch collaborator
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub is_last: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, is_last: bool) -> Self {
        Self { items, is_last }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStatus {
    Idle,
    Loading(PageTicket),
    Error,
}

/// Result of feeding a page response back into the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Merged { added: usize, exhausted: bool },
    Failed(ApiError),
    /// The response belongs to an earlier feed identity or was not awaited
    Stale,
}

/// Paged, deduplicated feed state
///
/// Owns one cursor and one collection per feed identity. Fetching is not done
/// here: [`FeedController::load_next`] hands out a [`PageRequest`] and the
/// response comes back through [`FeedController::page_loaded`], so a second
/// `load_next` while a page is outstanding is dropped.
#[derive(Debug, Clone)]
pub struct FeedController<T> {
    key: FeedKey,
    page_size: usize,
    generation: u64,
    cursor: PageCursor,
    collection: DedupSet<T>,
    status: FeedStatus,
    last_error: Option<ApiError>,
}

impl<T: Identified> FeedController<T> {
    pub fn new(key: FeedKey, page_size: usize) -> Self {
        Self {
            key,
            page_size,
            generation: 0,
            cursor: PageCursor::new(),
            collection: DedupSet::new(),
            status: FeedStatus::Idle,
            last_error: None,
        }
    }

    /// Elm-style entry point: apply a message, return the side effects to run
    pub fn update(&mut self, msg: FeedMsg<T>) -> Vec<Cmd> {
        match msg {
            FeedMsg::LoadNext => self.load_next().map(Cmd::FetchPage).into_iter().collect(),
            FeedMsg::Reset(key) => {
                self.reset(key);
                vec![]
            }
            FeedMsg::PageLoaded { ticket, result } => self.finish_load(ticket, result).1,
        }
    }

    /// [`FeedController::page_loaded`] plus the commands the outcome calls for
    pub fn finish_load(
        &mut self,
        ticket: PageTicket,
        result: Result<Page<T>, ApiError>,
    ) -> (LoadOutcome, Vec<Cmd>) {
        let late_auth = matches!(&result, Err(error) if error.is_auth());
        let outcome = self.page_loaded(ticket, result);
        let cmds = match &outcome {
            LoadOutcome::Merged {
                exhausted: true, ..
            } => vec![Cmd::LogInfo {
                message: format!("{:?} exhausted with {} items", self.key, self.collection.len()),
            }],
            // The page is dropped but the session is still gone
            LoadOutcome::Stale if late_auth => vec![
                Cmd::InvalidateSession,
                Cmd::LogError {
                    message: format!(
                        "Stale page {} was refused, session invalidated",
                        ticket.page_index
                    ),
                },
            ],
            LoadOutcome::Merged { .. } | LoadOutcome::Stale => vec![],
            LoadOutcome::Failed(error) => {
                let log = Cmd::LogError {
                    message: format!(
                        "Failed to load page {} of {:?}: {error}",
                        ticket.page_index, self.key
                    ),
                };
                if error.is_auth() {
                    vec![Cmd::InvalidateSession, log]
                } else {
                    vec![log]
                }
            }
        };
        (outcome, cmds)
    }

    /// Start loading the next page.
    /// Returns `None` while a page is in flight or once the feed is exhausted.
    pub fn load_next(&mut self) -> Option<PageRequest> {
        if let FeedStatus::Loading(ticket) = self.status {
            log::debug!(
                "load_next dropped: page {} of {:?} still in flight",
                ticket.page_index,
                self.key
            );
            return None;
        }
        if self.cursor.is_exhausted() {
            return None;
        }

        let ticket = PageTicket {
            generation: self.generation,
            page_index: self.cursor.next_index(),
        };
        self.status = FeedStatus::Loading(ticket);

        Some(PageRequest {
            key: self.key.clone(),
            page_index: ticket.page_index,
            page_size: self.page_size,
            ticket,
        })
    }

    /// Feed a fetch result back in. Failures leave cursor and items untouched.
    pub fn page_loaded(
        &mut self,
        ticket: PageTicket,
        result: Result<Page<T>, ApiError>,
    ) -> LoadOutcome {
        if ticket.generation != self.generation || self.status != FeedStatus::Loading(ticket) {
            log::info!(
                "Discarding stale page {} (generation {}, current {})",
                ticket.page_index,
                ticket.generation,
                self.generation
            );
            return LoadOutcome::Stale;
        }

        match result {
            Ok(page) => {
                let returned = page.items.len();
                let added = self.collection.merge_page(page.items);
                self.cursor.advance(returned, self.page_size);

                // A non-empty page with nothing new means the server is repeating itself
                if page.is_last || (returned > 0 && added == 0) {
                    self.cursor.mark_exhausted();
                }

                self.status = FeedStatus::Idle;
                self.last_error = None;
                LoadOutcome::Merged {
                    added,
                    exhausted: self.cursor.is_exhausted(),
                }
            }
            Err(error) => {
                log::warn!("Page {} of {:?} failed: {error}", ticket.page_index, self.key);
                self.status = FeedStatus::Error;
                self.last_error = Some(error.clone());
                LoadOutcome::Failed(error)
            }
        }
    }

    /// Switch to another feed identity. Any response still in flight becomes stale.
    pub fn reset(&mut self, key: FeedKey) {
        self.generation += 1;
        self.key = key;
        self.collection.replace(Vec::new());
        self.cursor.reset();
        self.status = FeedStatus::Idle;
        self.last_error = None;
    }

    pub fn current_items(&self) -> Vec<&T> {
        self.collection.snapshot()
    }

    pub fn has_more(&self) -> bool {
        !self.cursor.is_exhausted()
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.status, FeedStatus::Loading(_))
    }

    pub fn last_error(&self) -> Option<&ApiError> {
        self.last_error.as_ref()
    }

    pub fn status(&self) -> FeedStatus {
        self.status
    }

    pub fn key(&self) -> &FeedKey {
        &self.key
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn cursor(&self) -> &PageCursor {
        &self.cursor
    }

    pub fn collection(&self) -> &DedupSet<T> {
        &self.collection
    }

    pub fn collection_mut(&mut self) -> &mut DedupSet<T> {
        &mut self.collection
    }
}
