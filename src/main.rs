use std::fmt::Write as _;
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{eyre, Report, Result};

use artcafe_feed::{
    core::{
        ports::{PageSource, SessionHandler, UnreadCountSource},
        state::{FeedKey, ResourceKind},
    },
    domain::{
        learning_plan::LearningPlan,
        notification::{self, Notification},
        post::{Comment, Post},
    },
    infrastructure::{
        api::ArtCafeClient,
        cli::{Cli, Command},
        config::Config,
        session::SessionStore,
    },
    integration::{FeedRunner, MutationOutcome, PollerExit, UnreadPoller},
    utils::{initialize_logging, initialize_panic_handler},
    ApiError, Identified,
};

async fn tokio_main() -> Result<()> {
    initialize_logging()?;

    initialize_panic_handler()?;

    let args = <Cli as Parser>::parse();

    // Load configuration (defaults, user files, environment), then CLI overrides
    let mut config = Config::new()?;
    if let Some(api_url) = args.api_url.clone() {
        config.api.base_url = api_url;
    }
    if let Some(token) = args.token.clone() {
        config.set_token(Some(token));
    }
    if let Some(page_size) = args.page_size.filter(|size| *size > 0) {
        config.feed.page_size = page_size;
    }
    tracing::debug!(?config, "Configuration loaded");

    let session = Arc::new(SessionStore::new(config.token()));
    let client = Arc::new(ArtCafeClient::new(
        &config.api.base_url,
        config.api.timeout(),
        Arc::clone(&session) as Arc<dyn SessionHandler>,
    )?);
    let page_size = config.feed.page_size;

    let output = match args.command {
        Command::Posts { user, pages } => {
            let key = match user {
                Some(name) => FeedKey::with_identity(ResourceKind::UserPosts, name),
                None => FeedKey::new(ResourceKind::Posts),
            };
            let runner = FeedRunner::<Post>::new(key, page_size, client, session.clone());
            load(&runner, pages).await?;
            render_posts(&runner.current_items().await, runner.has_more().await)
        }
        Command::Comments { post_id, pages } => {
            let key = FeedKey::with_identity(ResourceKind::Comments, post_id);
            let runner = FeedRunner::<Comment>::new(key, page_size, client, session.clone());
            load(&runner, pages).await?;
            render_comments(&runner.current_items().await, runner.has_more().await)
        }
        Command::Plans {
            user_id,
            sort,
            order,
        } => {
            let key = FeedKey::with_identity(ResourceKind::LearningPlans, user_id);
            let runner = FeedRunner::<LearningPlan>::new(key, page_size, client, session.clone());
            load(&runner, 1).await?;
            runner.sort_by(sort.comparator(), order).await;
            render_plans(&runner.current_items().await)
        }
        Command::Notifications {
            pages,
            mark_all_read,
            clear_read,
        } => {
            let key = FeedKey::new(ResourceKind::Notifications);
            let runner = FeedRunner::<Notification>::new(
                key,
                page_size,
                Arc::clone(&client) as Arc<dyn PageSource<Notification>>,
                session.clone(),
            )
            .with_bulk_sink(client);
            load(&runner, pages).await?;
            if mark_all_read {
                settle(runner.mutate_all(notification::mark_all_read()).await)?;
            }
            if clear_read {
                settle(runner.mutate_all(notification::clear_read()).await)?;
            }
            render_notifications(&runner.current_items().await, runner.has_more().await)
        }
        Command::Unread { watch } => {
            if watch {
                watch_unread(client, session.clone(), &config).await?;
                String::new()
            } else {
                let count = client.unread_count().await.map_err(report)?;
                format!("{count} unread\n")
            }
        }
    };

    print!("{output}");
    Ok(())
}

async fn load<T>(runner: &FeedRunner<T>, pages: u32) -> Result<()>
where
    T: Identified + Send + 'static,
{
    let loaded = runner.load_pages(pages).await.map_err(report)?;
    tracing::info!(pages = loaded, "Feed loaded");
    Ok(())
}

fn settle(outcome: MutationOutcome) -> Result<()> {
    match outcome {
        MutationOutcome::Confirmed | MutationOutcome::Discarded => Ok(()),
        MutationOutcome::Failed { error, .. } => Err(report(error)),
    }
}

fn report(error: ApiError) -> Report {
    eyre!("{} ({error})", error.user_message())
}

async fn watch_unread(
    client: Arc<ArtCafeClient>,
    session: Arc<SessionStore>,
    config: &Config,
) -> Result<()> {
    let (mut counts, cancel_token, poller) = UnreadPoller::new(
        client,
        session,
        config.notifications.poll_interval(),
    );
    let handle = poller.run();
    let interrupt = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    while counts.changed().await.is_ok() {
        if let Some(count) = *counts.borrow_and_update() {
            println!("{count} unread");
        }
    }

    match handle.await? {
        PollerExit::Cancelled => Ok(()),
        PollerExit::SessionInvalid => {
            Err(eyre!("Session expired, log in again to keep polling"))
        }
    }
}

fn more_marker(has_more: bool) -> &'static str {
    if has_more {
        "-- more available --\n"
    } else {
        "-- end of feed --\n"
    }
}

fn render_posts(posts: &[Post], has_more: bool) -> String {
    let mut out = String::new();
    for post in posts {
        let author = post.user.as_ref().map_or("unknown", |u| u.display_name());
        let _ = writeln!(
            out,
            "[{}] {} by {}  ♥ {}{}  💬 {}",
            post.id,
            post.title,
            author,
            post.like_count,
            if post.liked_by_current_user { " (liked)" } else { "" },
            post.comment_count
        );
    }
    out.push_str(more_marker(has_more));
    out
}

fn render_comments(comments: &[Comment], has_more: bool) -> String {
    let mut out = String::new();
    for comment in comments {
        let author = comment
            .user
            .as_ref()
            .map_or("unknown", |u| u.display_name());
        let _ = writeln!(out, "[{}] {author}: {}", comment.id, comment.content);
    }
    out.push_str(more_marker(has_more));
    out
}

fn render_plans(plans: &[LearningPlan]) -> String {
    let mut out = String::new();
    for plan in plans {
        let due = plan
            .target_completion_date
            .map_or_else(|| "no date".to_string(), |d| d.to_string());
        let _ = writeln!(
            out,
            "[{}] {} {:>3}% ({}/{} topics, due {due})",
            plan.id,
            plan.title,
            plan.progress(),
            plan.completed_topics(),
            plan.topics.len()
        );
    }
    out
}

fn render_notifications(notifications: &[Notification], has_more: bool) -> String {
    let mut out = String::new();
    for item in notifications {
        let marker = if item.read { ' ' } else { '*' };
        let _ = writeln!(out, "{marker} [{}] {}", item.id, item.content);
    }
    let _ = writeln!(out, "{} unread loaded", notification::unread_count(notifications));
    out.push_str(more_marker(has_more));
    out
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = tokio_main().await {
        eprintln!("{} error: Something went wrong", env!("CARGO_PKG_NAME"));
        Err(e)
    } else {
        Ok(())
    }
}
