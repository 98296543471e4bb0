//! Async driver for one feed
//!
//! `FeedRunner` owns a [`FeedController`] and a [`MutationReconciler`] behind
//! a tokio mutex and executes the commands they produce through the ports.
//! The lock is never held across a collaborator call, so a `load_next` issued
//! while a page is in flight is dropped by the controller's loading guard and
//! a `reset` during a fetch turns the late response into a stale one.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    core::{
        cmd::Cmd,
        msg::FeedMsg,
        ports::{BulkMutationSink, MutationSink, PageSource, SessionHandler},
        state::{
            feed::{FeedController, FeedKey, FeedStatus, LoadOutcome, PageCursor},
            mutation::{FailureAction, MutationReconciler},
        },
    },
    domain::{ApiError, BulkPatch, Identified, OptimisticPatch, SortOrder},
};

#[derive(Debug)]
struct FeedState<T> {
    controller: FeedController<T>,
    reconciler: MutationReconciler<T>,
}

/// How a mutation settled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    Confirmed,
    /// The server answered after the feed was reset; nothing was applied
    Discarded,
    Failed {
        action: FailureAction,
        error: ApiError,
    },
}

pub struct FeedRunner<T> {
    state: Arc<Mutex<FeedState<T>>>,
    source: Arc<dyn PageSource<T>>,
    sink: Option<Arc<dyn MutationSink<T>>>,
    bulk_sink: Option<Arc<dyn BulkMutationSink<T>>>,
    session: Arc<dyn SessionHandler>,
}

impl<T> Clone for FeedRunner<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            source: Arc::clone(&self.source),
            sink: self.sink.clone(),
            bulk_sink: self.bulk_sink.clone(),
            session: Arc::clone(&self.session),
        }
    }
}

impl<T> FeedRunner<T>
where
    T: Identified + Send + 'static,
{
    pub fn new(
        key: FeedKey,
        page_size: usize,
        source: Arc<dyn PageSource<T>>,
        session: Arc<dyn SessionHandler>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(FeedState {
                controller: FeedController::new(key, page_size),
                reconciler: MutationReconciler::new(),
            })),
            source,
            sink: None,
            bulk_sink: None,
            session,
        }
    }

    /// Enables [`FeedRunner::mutate`]
    pub fn with_sink(mut self, sink: Arc<dyn MutationSink<T>>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Enables [`FeedRunner::mutate_all`]
    pub fn with_bulk_sink(mut self, sink: Arc<dyn BulkMutationSink<T>>) -> Self {
        self.bulk_sink = Some(sink);
        self
    }

    /// Load the next page.
    /// `None` when the request was dropped (already loading) or the feed is exhausted.
    pub async fn load_next(&self) -> Option<LoadOutcome> {
        let cmds = self.state.lock().await.controller.update(FeedMsg::LoadNext);
        self.run_commands(cmds).await
    }

    /// Load up to `pages` pages, stopping early once the feed is exhausted.
    /// Returns the number of pages merged.
    pub async fn load_pages(&self, pages: u32) -> Result<u32, ApiError> {
        let mut loaded = 0;
        for _ in 0..pages {
            match self.load_next().await {
                Some(LoadOutcome::Merged { exhausted, .. }) => {
                    loaded += 1;
                    if exhausted {
                        break;
                    }
                }
                Some(LoadOutcome::Failed(error)) => return Err(error),
                Some(LoadOutcome::Stale) | None => break,
            }
        }
        Ok(loaded)
    }

    /// Switch feed identity; pending pages and rollback records are discarded
    pub async fn reset(&self, key: FeedKey) {
        let mut state = self.state.lock().await;
        let cmds = state.controller.update(FeedMsg::Reset(key));
        state.reconciler.clear();
        drop(state);
        self.run_commands(cmds).await;
    }

    /// Apply `patch` locally, send it, then confirm or settle the failure
    pub async fn mutate(&self, patch: OptimisticPatch<T>) -> MutationOutcome {
        let Some(sink) = self.sink.as_ref() else {
            return read_only();
        };

        let request = patch.request();
        let handle = {
            let mut guard = self.state.lock().await;
            let state = &mut *guard;
            state
                .reconciler
                .apply_optimistic(state.controller.collection_mut(), patch)
        };

        let result = sink.send_mutation(&request).await;

        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        match result {
            Ok(confirmation) => {
                let collection = state.controller.collection_mut();
                if state.reconciler.confirm_with(handle, collection, confirmation) {
                    MutationOutcome::Confirmed
                } else {
                    log::info!("{} {handle} confirmed after reset, ignoring", request.kind);
                    MutationOutcome::Discarded
                }
            }
            Err(error) => {
                let collection = state.controller.collection_mut();
                let action = state.reconciler.handle_failure(handle, collection, &error);
                drop(guard);
                let message = format!("{} on {} failed: {error}", request.kind, request.item_id);
                self.run_commands(vec![failure_commands(&error, message)]).await;
                MutationOutcome::Failed { action, error }
            }
        }
    }

    /// Apply a collection-wide patch locally, send it, then keep or undo it.
    /// Answers arriving after a reset leave the new feed alone.
    pub async fn mutate_all(&self, patch: BulkPatch<T>) -> MutationOutcome
    where
        T: Clone,
    {
        let Some(sink) = self.bulk_sink.as_ref() else {
            return read_only();
        };

        let kind = patch.kind();
        let (generation, undo) = {
            let mut state = self.state.lock().await;
            let generation = state.controller.generation();
            (generation, patch.apply(state.controller.collection_mut()))
        };
        tracing::debug!(%kind, touched = undo.len(), "Applied bulk patch");

        let result = sink.send_bulk(kind).await;

        let mut state = self.state.lock().await;
        let current = state.controller.generation() == generation;
        match result {
            Ok(()) if current => MutationOutcome::Confirmed,
            Ok(()) => {
                log::info!("{kind} confirmed after reset, ignoring");
                MutationOutcome::Discarded
            }
            Err(error) => {
                let action = match (current, error.is_auth()) {
                    (false, _) => FailureAction::Ignored,
                    (true, auth) => {
                        undo.revert(state.controller.collection_mut());
                        if auth {
                            FailureAction::InvalidateSession
                        } else {
                            FailureAction::RolledBack
                        }
                    }
                };
                drop(state);
                let message = format!("{kind} failed: {error}");
                self.run_commands(vec![failure_commands(&error, message)]).await;
                MutationOutcome::Failed { action, error }
            }
        }
    }

    /// Install a presentation ordering on the collection
    pub async fn sort_by<F>(&self, comparator: F, order: SortOrder)
    where
        F: Fn(&T, &T) -> std::cmp::Ordering + Send + Sync + 'static,
    {
        self.state
            .lock()
            .await
            .controller
            .collection_mut()
            .sort_by(comparator, order);
    }

    pub async fn clear_sort(&self) {
        self.state.lock().await.controller.collection_mut().clear_sort();
    }

    pub async fn has_more(&self) -> bool {
        self.state.lock().await.controller.has_more()
    }

    pub async fn is_loading(&self) -> bool {
        self.state.lock().await.controller.is_loading()
    }

    pub async fn last_error(&self) -> Option<ApiError> {
        self.state.lock().await.controller.last_error().cloned()
    }

    pub async fn status(&self) -> FeedStatus {
        self.state.lock().await.controller.status()
    }

    pub async fn cursor(&self) -> PageCursor {
        *self.state.lock().await.controller.cursor()
    }

    pub async fn key(&self) -> FeedKey {
        self.state.lock().await.controller.key().clone()
    }

    pub async fn in_flight_mutations(&self) -> usize {
        self.state.lock().await.reconciler.in_flight()
    }

    async fn run_commands(&self, cmds: Vec<Cmd>) -> Option<LoadOutcome> {
        let mut queue: VecDeque<Cmd> = cmds.into_iter().flat_map(Cmd::flatten).collect();
        let mut outcome = None;

        while let Some(cmd) = queue.pop_front() {
            match cmd {
                Cmd::FetchPage(request) => {
                    tracing::debug!(
                        kind = %request.key.kind,
                        page = request.page_index,
                        generation = request.ticket.generation,
                        "Fetching page"
                    );
                    let result = self.source.fetch_page(&request).await;
                    let (settled, follow_up) = self
                        .state
                        .lock()
                        .await
                        .controller
                        .finish_load(request.ticket, result);
                    queue.extend(follow_up.into_iter().flat_map(Cmd::flatten));
                    outcome = Some(settled);
                }
                Cmd::InvalidateSession => self.session.on_session_invalid(),
                Cmd::LogError { message } => tracing::error!("{message}"),
                Cmd::LogInfo { message } => tracing::info!("{message}"),
                Cmd::Batch(cmds) => queue.extend(cmds.into_iter().flat_map(Cmd::flatten)),
                Cmd::None => {}
            }
        }

        outcome
    }
}

fn read_only() -> MutationOutcome {
    MutationOutcome::Failed {
        action: FailureAction::Ignored,
        error: ApiError::Validation("this feed is read-only".to_string()),
    }
}

/// An auth failure also ends the session, whatever happened to the patch
fn failure_commands(error: &ApiError, message: String) -> Cmd {
    let invalidate = error.is_auth().then_some(Cmd::InvalidateSession);
    Cmd::batch(
        invalidate
            .into_iter()
            .chain(std::iter::once(Cmd::LogError { message }))
            .collect(),
    )
}

impl<T> FeedRunner<T>
where
    T: Identified + Clone + Send + 'static,
{
    /// Items in presentation order
    pub async fn current_items(&self) -> Vec<T> {
        self.state
            .lock()
            .await
            .controller
            .current_items()
            .into_iter()
            .cloned()
            .collect()
    }
}
