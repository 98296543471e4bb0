//! Page cursor for feed loading

use serde::{Deserialize, Serialize};

/// Tracks the next page to request and whether the feed ran out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageCursor {
    next_index: u32,
    exhausted: bool,
}

impl PageCursor {
    /// Create a cursor positioned at the first page
    pub fn new() -> Self {
        Self {
            next_index: 0,
            exhausted: false,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Record a fetched page. A short or empty page exhausts the cursor,
    /// a full page moves it forward by one.
    pub fn advance(&mut self, items_returned: usize, page_size: usize) {
        if items_returned == 0 || items_returned < page_size {
            self.exhausted = true;
        } else {
            self.next_index += 1;
        }
    }

    /// Stop paging regardless of the page length
    pub fn mark_exhausted(&mut self) {
        self.exhausted = true;
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn next_index(&self) -> u32 {
        self.next_index
    }
}
