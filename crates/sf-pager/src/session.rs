use anyhow::Result;
use serde_json::json;
use sf_analytics::{Emitter, EventSink, HttpEventSink};
use sf_api_types::EventType;
use sf_identity::IdentityResolver;
use sf_storage::KeyValueStore;
use std::sync::Arc;
use tracing::info;

use crate::config::FeedConfig;
use crate::controller::PageController;
use crate::source::{HttpItemSource, ItemSource};

pub const PAGE_VIEW_ACTION: &str = "load";

/// One feed as seen by one anonymous user.
pub struct FeedSession {
    controller: Arc<PageController>,
    emitter: Emitter,
    user_id: u64,
}

impl FeedSession {
    pub fn new(
        source: Arc<dyn ItemSource>,
        sink: Arc<dyn EventSink>,
        user_id: u64,
        page_size: usize,
    ) -> Self {
        let emitter = Emitter::new(sink);
        let controller = PageController::new(source, emitter.clone(), Some(user_id), page_size);
        Self {
            controller: Arc::new(controller),
            emitter,
            user_id,
        }
    }

    /// Resolves the identity from `store` and wires HTTP adapters from `config`.
    pub fn connect(config: &FeedConfig, store: Arc<dyn KeyValueStore>) -> Result<Self> {
        let user_id = IdentityResolver::new(store).get_or_create();
        let source = HttpItemSource::new(&config.list_url, config.http_timeout)?;
        let sink = HttpEventSink::new(&config.analytics_url, config.http_timeout)?;
        info!(
            "feed session for user {} against {} (page size {})",
            user_id, config.list_url, config.page_size
        );
        Ok(Self::new(
            Arc::new(source),
            Arc::new(sink),
            user_id,
            config.page_size,
        ))
    }

    /// Records the page view and loads the first page.
    pub async fn open(&self) {
        self.emitter.emit(
            Some(self.user_id),
            EventType::PageView,
            PAGE_VIEW_ACTION,
            json!({ "path": "/" }),
        );
        self.controller.request_page(1).await;
    }

    pub fn click(&self, id: u64) {
        self.controller.on_item_click(id);
    }

    pub fn controller(&self) -> Arc<PageController> {
        Arc::clone(&self.controller)
    }

    pub fn user_id(&self) -> u64 {
        self.user_id
    }
}
