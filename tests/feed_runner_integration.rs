use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use artcafe_feed::{
    core::{
        ports::{MutationSink, PageSource},
        state::{FeedKey, LoadOutcome, Page, PageRequest, ResourceKind},
    },
    domain::{
        post::{self, Post},
        ApiError, Confirmation, ItemId, MutationRequest,
    },
    infrastructure::session::{SessionStatus, SessionStore},
    integration::{FeedRunner, MutationOutcome},
};
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tokio::sync::oneshot;

fn post(id: u64, like_count: u32) -> Post {
    Post {
        id: ItemId::from(id),
        title: format!("Sketch {id}"),
        content: String::new(),
        image_url: None,
        created_at: None,
        updated_at: None,
        user: None,
        comment_count: 0,
        like_count,
        liked_by_current_user: false,
        comments: Vec::new(),
    }
}

fn posts(range: std::ops::RangeInclusive<u64>) -> Vec<Post> {
    range.map(|id| post(id, 0)).collect()
}

fn ids(items: &[Post]) -> Vec<u64> {
    items
        .iter()
        .filter_map(|p| p.id.as_str().parse().ok())
        .collect()
}

/// Each fetch waits until the test releases the page for that feed identity
#[derive(Default)]
struct GatedSource {
    gates: Mutex<HashMap<String, oneshot::Receiver<Result<Page<Post>, ApiError>>>>,
    fetches: Mutex<u32>,
}

impl GatedSource {
    fn gate(&self, identity: &str) -> oneshot::Sender<Result<Page<Post>, ApiError>> {
        let (tx, rx) = oneshot::channel();
        self.gates
            .lock()
            .expect("lock")
            .insert(identity.to_string(), rx);
        tx
    }

    fn fetches(&self) -> u32 {
        *self.fetches.lock().expect("lock")
    }
}

#[async_trait]
impl PageSource<Post> for GatedSource {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page<Post>, ApiError> {
        *self.fetches.lock().expect("lock") += 1;
        let identity = request.key.identity.clone().unwrap_or_default();
        let gate = self.gates.lock().expect("lock").remove(&identity);
        match gate {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(ApiError::Network("gate dropped".into()))),
            None => Err(ApiError::NotFound(identity)),
        }
    }
}

/// Holds each mutation until the test answers it
#[derive(Default)]
struct GatedSink {
    replies: Mutex<Vec<oneshot::Receiver<Result<(), ApiError>>>>,
}

impl GatedSink {
    fn reply(&self) -> oneshot::Sender<Result<(), ApiError>> {
        let (tx, rx) = oneshot::channel();
        self.replies.lock().expect("lock").push(rx);
        tx
    }
}

#[async_trait]
impl MutationSink<Post> for GatedSink {
    async fn send_mutation(&self, _request: &MutationRequest) -> Result<Confirmation<Post>, ApiError> {
        let rx = self.replies.lock().expect("lock").remove(0);
        rx.await
            .unwrap_or_else(|_| Err(ApiError::Network("reply dropped".into())))
            .map(|()| Confirmation::Accepted)
    }
}

async fn wait_until_loading(runner: &FeedRunner<Post>) {
    while !runner.is_loading().await {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_overlapping_pages_merge_without_duplicates() {
    let source = Arc::new(GatedSource::default());
    let runner = FeedRunner::<Post>::new(
        FeedKey::with_identity(ResourceKind::UserPosts, "mira"),
        10,
        Arc::clone(&source) as Arc<dyn PageSource<Post>>,
        Arc::new(SessionStore::anonymous()),
    );

    source
        .gate("mira")
        .send(Ok(Page::new(posts(1..=10), false)))
        .expect("gate open");
    runner.load_next().await;
    assert_eq!(runner.current_items().await.len(), 10);
    assert!(runner.has_more().await);

    source
        .gate("mira")
        .send(Ok(Page::new(posts(8..=15), false)))
        .expect("gate open");
    assert_eq!(
        runner.load_next().await,
        Some(LoadOutcome::Merged {
            added: 5,
            exhausted: true
        })
    );

    assert_eq!(ids(&runner.current_items().await), (1..=15).collect::<Vec<_>>());
    assert!(!runner.has_more().await);
}

#[tokio::test]
async fn test_second_load_while_loading_fetches_once() {
    let source = Arc::new(GatedSource::default());
    let runner = FeedRunner::<Post>::new(
        FeedKey::with_identity(ResourceKind::UserPosts, "mira"),
        10,
        Arc::clone(&source) as Arc<dyn PageSource<Post>>,
        Arc::new(SessionStore::anonymous()),
    );
    let gate = source.gate("mira");

    let first = tokio::spawn({
        let runner = runner.clone();
        async move { runner.load_next().await }
    });
    wait_until_loading(&runner).await;

    assert_eq!(runner.load_next().await, None);

    gate.send(Ok(Page::new(posts(1..=10), false)))
        .expect("gate open");
    let outcome = first.await.expect("task");

    assert_eq!(
        outcome,
        Some(LoadOutcome::Merged {
            added: 10,
            exhausted: false
        })
    );
    assert_eq!(source.fetches(), 1);
    assert_eq!(runner.current_items().await.len(), 10);
}

#[tokio::test]
async fn test_stale_response_after_reset_is_discarded() {
    let source = Arc::new(GatedSource::default());
    let runner = FeedRunner::<Post>::new(
        FeedKey::with_identity(ResourceKind::UserPosts, "alice"),
        10,
        Arc::clone(&source) as Arc<dyn PageSource<Post>>,
        Arc::new(SessionStore::anonymous()),
    );
    let alice_gate = source.gate("alice");

    let alice_load = tokio::spawn({
        let runner = runner.clone();
        async move { runner.load_next().await }
    });
    wait_until_loading(&runner).await;

    runner
        .reset(FeedKey::with_identity(ResourceKind::UserPosts, "bob"))
        .await;
    source
        .gate("bob")
        .send(Ok(Page::new(posts(100..=103), false)))
        .expect("gate open");
    runner.load_next().await;

    alice_gate
        .send(Ok(Page::new(posts(1..=10), false)))
        .expect("gate open");
    assert_eq!(alice_load.await.expect("task"), Some(LoadOutcome::Stale));

    assert_eq!(ids(&runner.current_items().await), vec![100, 101, 102, 103]);
    assert_eq!(
        runner.key().await.identity.as_deref(),
        Some("bob")
    );
}

#[tokio::test]
async fn test_like_rollback_restores_item_exactly() {
    let source = Arc::new(GatedSource::default());
    let sink = Arc::new(GatedSink::default());
    let runner = FeedRunner::<Post>::new(
        FeedKey::with_identity(ResourceKind::UserPosts, "mira"),
        10,
        Arc::clone(&source) as Arc<dyn PageSource<Post>>,
        Arc::new(SessionStore::anonymous()),
    )
    .with_sink(Arc::clone(&sink) as Arc<dyn MutationSink<Post>>);

    source
        .gate("mira")
        .send(Ok(Page::new(vec![post(4, 0), post(5, 3)], true)))
        .expect("gate open");
    runner.load_next().await;
    let before = runner.current_items().await;

    let reply = sink.reply();
    let mutation = tokio::spawn({
        let runner = runner.clone();
        async move { runner.mutate(post::toggle_like(ItemId::from(5u64))).await }
    });
    while runner.in_flight_mutations().await == 0 {
        tokio::task::yield_now().await;
    }

    // Optimistic state is visible while the request is pending
    let optimistic = runner.current_items().await;
    assert!(optimistic[1].liked_by_current_user);
    assert_eq!(optimistic[1].like_count, 4);

    reply
        .send(Err(ApiError::Network("timeout".into())))
        .expect("reply");
    let outcome = mutation.await.expect("task");

    assert!(matches!(outcome, MutationOutcome::Failed { .. }));
    assert_eq!(runner.current_items().await, before);
}

#[tokio::test]
async fn test_mutation_auth_failure_logs_out() {
    let source = Arc::new(GatedSource::default());
    let sink = Arc::new(GatedSink::default());
    let session = Arc::new(SessionStore::new(Some("token".into())));
    let runner = FeedRunner::<Post>::new(
        FeedKey::with_identity(ResourceKind::UserPosts, "mira"),
        10,
        Arc::clone(&source) as Arc<dyn PageSource<Post>>,
        Arc::clone(&session) as Arc<dyn artcafe_feed::core::ports::SessionHandler>,
    )
    .with_sink(Arc::clone(&sink) as Arc<dyn MutationSink<Post>>);

    source
        .gate("mira")
        .send(Ok(Page::new(vec![post(5, 3)], true)))
        .expect("gate open");
    runner.load_next().await;

    sink.reply()
        .send(Err(ApiError::Auth("expired".into())))
        .expect("reply");
    runner.mutate(post::toggle_like(ItemId::from(5u64))).await;

    assert_eq!(session.status(), SessionStatus::Invalidated);
    assert_eq!(runner.current_items().await[0].like_count, 3);
}

#[tokio::test]
async fn test_mutation_answer_after_reset_is_discarded() {
    let source = Arc::new(GatedSource::default());
    let sink = Arc::new(GatedSink::default());
    let runner = FeedRunner::<Post>::new(
        FeedKey::with_identity(ResourceKind::UserPosts, "alice"),
        10,
        Arc::clone(&source) as Arc<dyn PageSource<Post>>,
        Arc::new(SessionStore::anonymous()),
    )
    .with_sink(Arc::clone(&sink) as Arc<dyn MutationSink<Post>>);

    source
        .gate("alice")
        .send(Ok(Page::new(vec![post(5, 3)], true)))
        .expect("gate open");
    runner.load_next().await;

    let reply = sink.reply();
    let mutation = tokio::spawn({
        let runner = runner.clone();
        async move { runner.mutate(post::toggle_like(ItemId::from(5u64))).await }
    });
    while runner.in_flight_mutations().await == 0 {
        tokio::task::yield_now().await;
    }

    runner
        .reset(FeedKey::with_identity(ResourceKind::UserPosts, "bob"))
        .await;
    reply.send(Ok(())).expect("reply");

    assert_eq!(mutation.await.expect("task"), MutationOutcome::Discarded);
    assert!(runner.current_items().await.is_empty());
}

#[tokio::test]
async fn test_refused_fetch_after_reset_still_logs_out() {
    let source = Arc::new(GatedSource::default());
    let session = Arc::new(SessionStore::new(Some("token".into())));
    let runner = FeedRunner::<Post>::new(
        FeedKey::with_identity(ResourceKind::UserPosts, "alice"),
        10,
        Arc::clone(&source) as Arc<dyn PageSource<Post>>,
        Arc::clone(&session) as Arc<dyn artcafe_feed::core::ports::SessionHandler>,
    );
    let alice_gate = source.gate("alice");

    let alice_load = tokio::spawn({
        let runner = runner.clone();
        async move { runner.load_next().await }
    });
    wait_until_loading(&runner).await;

    runner
        .reset(FeedKey::with_identity(ResourceKind::UserPosts, "bob"))
        .await;
    alice_gate
        .send(Err(ApiError::Auth("401".into())))
        .expect("gate open");

    assert_eq!(alice_load.await.expect("task"), Some(LoadOutcome::Stale));
    assert_eq!(session.status(), SessionStatus::Invalidated);
    assert_eq!(runner.last_error().await, None);
}
