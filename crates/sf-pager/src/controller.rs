use serde_json::json;
use sf_analytics::Emitter;
use sf_api_types::{EventType, Item};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::source::{FetchError, ItemSource};

pub const FETCH_FAILED_MESSAGE: &str = "Failed to load posts. Please try refreshing.";
pub const SCROLL_ACTION: &str = "infinite_scroll_page";
pub const CLICK_ACTION: &str = "post_item";

/// Everything the render surface needs to draw the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationState {
    pub items: Vec<Item>,
    pub current_page: u32,
    pub is_loading: bool,
    pub has_more: bool,
    pub last_error: Option<String>,
    pub scroll_pages_loaded: u32,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            current_page: 0,
            is_loading: false,
            has_more: true,
            last_error: None,
            scroll_pages_loaded: 0,
        }
    }
}

impl PaginationState {
    /// True when a new fetch may start: nothing in flight and the list is not exhausted.
    pub fn can_request(&self) -> bool {
        !self.is_loading && self.has_more
    }
}

/// Holds `is_loading` for the lifetime of one fetch. Released on drop, so every exit
/// path (including a dropped future) clears the flag.
struct LoadingGuard<'a> {
    state: &'a watch::Sender<PaginationState>,
}

impl<'a> LoadingGuard<'a> {
    fn acquire(state: &'a watch::Sender<PaginationState>) -> Option<Self> {
        let acquired = state.send_if_modified(|s| {
            if !s.can_request() {
                return false;
            }
            s.is_loading = true;
            s.last_error = None;
            true
        });
        acquired.then_some(Self { state })
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.state.send_modify(|s| s.is_loading = false);
    }
}

/// Single-flight page loader over an [`ItemSource`].
pub struct PageController {
    source: Arc<dyn ItemSource>,
    emitter: Emitter,
    user_id: Option<u64>,
    page_size: usize,
    state: watch::Sender<PaginationState>,
}

impl PageController {
    pub fn new(
        source: Arc<dyn ItemSource>,
        emitter: Emitter,
        user_id: Option<u64>,
        page_size: usize,
    ) -> Self {
        let (state, _) = watch::channel(PaginationState::default());
        Self {
            source,
            emitter,
            user_id,
            page_size: page_size.max(1),
            state,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn snapshot(&self) -> PaginationState {
        self.state.borrow().clone()
    }

    pub fn can_request(&self) -> bool {
        self.state.borrow().can_request()
    }

    /// Receiver notified on every state transition.
    pub fn subscribe(&self) -> watch::Receiver<PaginationState> {
        self.state.subscribe()
    }

    /// Fetches `page` and appends it. Ignored while another fetch is in flight or once
    /// the list is exhausted.
    pub async fn request_page(&self, page: u32) {
        let Some(_loading) = LoadingGuard::acquire(&self.state) else {
            debug!("page {} request ignored: fetch in flight or list exhausted", page);
            return;
        };

        info!("fetching page {}", page);
        match self.source.fetch_page(page, self.page_size).await {
            Ok(items) => self.apply_page(page, items),
            Err(err) => self.apply_failure(page, err),
        }
    }

    pub async fn request_next_page(&self) {
        let next = {
            let state = self.state.borrow();
            if !state.can_request() {
                return;
            }
            state.current_page + 1
        };
        self.request_page(next).await;
    }

    pub fn on_item_click(&self, id: u64) {
        debug!("item {} clicked", id);
        self.emitter
            .emit(self.user_id, EventType::Click, CLICK_ACTION, json!({ "post_id": id }));
    }

    fn apply_page(&self, page: u32, items: Vec<Item>) {
        let received = items.len();
        let has_more = received == self.page_size;
        let scroll_pages = page.saturating_sub(1);

        self.state.send_modify(|s| {
            s.items.extend(items);
            s.current_page = page;
            s.has_more = has_more;
            if page > 1 {
                s.scroll_pages_loaded = scroll_pages;
            }
        });
        info!(
            "page {} loaded with {} items (has_more: {})",
            page, received, has_more
        );

        if page > 1 {
            self.emitter.emit(
                self.user_id,
                EventType::Scroll,
                SCROLL_ACTION,
                json!({ "page_loaded": scroll_pages }),
            );
        }
    }

    fn apply_failure(&self, page: u32, err: FetchError) {
        warn!("failed to fetch page {}: {}", page, err);
        self.state.send_modify(|s| {
            s.last_error = Some(FETCH_FAILED_MESSAGE.to_owned());
            s.has_more = false;
        });
    }
}
