use crate::{
    core::state::feed::{FeedKey, Page, PageTicket},
    domain::ApiError,
};

/// Messages handled by `FeedController::update`
#[derive(Debug, Clone, PartialEq)]
pub enum FeedMsg<T> {
    /// View asked for the next page ("Load More" or mount)
    LoadNext,
    /// Feed identity changed (e.g. another user's profile)
    Reset(FeedKey),
    /// Fetch collaborator answered
    PageLoaded {
        ticket: PageTicket,
        result: Result<Page<T>, ApiError>,
    },
}
