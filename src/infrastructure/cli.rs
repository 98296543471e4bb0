use clap::{Parser, Subcommand};

use crate::{
    domain::{learning_plan::PlanSort, SortOrder},
    utils::version,
};

#[derive(Parser, Debug)]
#[command(author, version = version(), about)]
pub struct Cli {
    /// API base URL, overrides `api.base_url`
    #[arg(long, global = true, value_name = "URL", env = "ARTCAFE_FEED_API_URL")]
    pub api_url: Option<String>,

    /// Bearer token for authenticated endpoints
    #[arg(long, global = true, value_name = "TOKEN", env = "ARTCAFE_FEED_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Page size, overrides `feed.page_size`
    #[arg(long, global = true, value_name = "N")]
    pub page_size: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Page through the global post feed, or one author's posts
    Posts {
        /// Only posts by this username
        #[arg(long, value_name = "NAME")]
        user: Option<String>,
        /// Number of pages to load
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Page through the comments of a post
    Comments {
        post_id: String,
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Show a user's learning plans with progress
    Plans {
        user_id: String,
        #[arg(long, default_value_t = PlanSort::Date)]
        sort: PlanSort,
        #[arg(long, default_value_t = SortOrder::Desc)]
        order: SortOrder,
    },
    /// Page through your notifications
    Notifications {
        #[arg(long, default_value_t = 1)]
        pages: u32,
        /// Mark every notification read after loading
        #[arg(long)]
        mark_all_read: bool,
        /// Delete read notifications after loading
        #[arg(long)]
        clear_read: bool,
    },
    /// Print the unread notification count
    Unread {
        /// Keep polling until interrupted
        #[arg(long)]
        watch: bool,
    },
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_posts_defaults() {
        let cli = Cli::try_parse_from(["artcafe-feed", "posts"]).expect("parses");
        assert_eq!(
            cli.command,
            Command::Posts {
                user: None,
                pages: 1
            }
        );
    }

    #[test]
    fn test_plans_sort_and_order() {
        let cli = Cli::try_parse_from([
            "artcafe-feed",
            "plans",
            "u1",
            "--sort",
            "progress",
            "--order",
            "desc",
        ])
        .expect("parses");
        assert_eq!(
            cli.command,
            Command::Plans {
                user_id: "u1".into(),
                sort: PlanSort::Progress,
                order: SortOrder::Desc,
            }
        );
    }

    #[test]
    fn test_plans_default_to_newest_first() {
        let cli = Cli::try_parse_from(["artcafe-feed", "plans", "u1"]).expect("parses");
        assert_eq!(
            cli.command,
            Command::Plans {
                user_id: "u1".into(),
                sort: PlanSort::Date,
                order: SortOrder::Desc,
            }
        );
    }

    #[test]
    fn test_notification_bulk_flags() {
        let cli = Cli::try_parse_from([
            "artcafe-feed",
            "notifications",
            "--mark-all-read",
            "--clear-read",
        ])
        .expect("parses");
        assert_eq!(
            cli.command,
            Command::Notifications {
                pages: 1,
                mark_all_read: true,
                clear_read: true,
            }
        );

        let cli = Cli::try_parse_from(["artcafe-feed", "notifications"]).expect("parses");
        assert!(matches!(
            cli.command,
            Command::Notifications {
                mark_all_read: false,
                clear_read: false,
                ..
            }
        ));
    }

    #[test]
    fn test_plans_sort_by_category() {
        let cli = Cli::try_parse_from(["artcafe-feed", "plans", "u1", "--sort", "category"])
            .expect("parses");
        assert!(matches!(
            cli.command,
            Command::Plans {
                sort: PlanSort::Category,
                ..
            }
        ));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "artcafe-feed",
            "comments",
            "42",
            "--pages",
            "3",
            "--api-url",
            "http://127.0.0.1:9000",
            "--page-size",
            "5",
        ])
        .expect("parses");
        assert_eq!(cli.api_url.as_deref(), Some("http://127.0.0.1:9000"));
        assert_eq!(cli.page_size, Some(5));
        assert_eq!(
            cli.command,
            Command::Comments {
                post_id: "42".into(),
                pages: 3
            }
        );
    }

    #[test]
    fn test_unknown_sort_is_rejected() {
        assert!(Cli::try_parse_from(["artcafe-feed", "plans", "u1", "--sort", "color"]).is_err());
    }
}
