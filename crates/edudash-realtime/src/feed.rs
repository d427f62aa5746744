//! State published by every feed.

/// What a feed currently shows.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedState<T> {
    /// The key the items belong to (conversation id for chat). `None`
    /// when the feed has no key selected.
    pub key: Option<String>,

    /// The items, in display order.
    pub items: Vec<T>,

    /// `true` until the snapshot for the current key has arrived (or
    /// failed).
    pub loading: bool,
}

impl<T> FeedState<T> {
    pub fn loading(key: Option<String>) -> Self {
        Self {
            key,
            items: Vec::new(),
            loading: true,
        }
    }

    pub fn idle() -> Self {
        Self {
            key: None,
            items: Vec::new(),
            loading: false,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> Default for FeedState<T> {
    fn default() -> Self {
        Self::idle()
    }
}
