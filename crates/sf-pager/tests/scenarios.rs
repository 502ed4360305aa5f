use axum::{Json, Router, extract::Query, routing::{get, post}};
use serde_json::{Value, json};
use sf_analytics::HttpEventSink;
use sf_api_types::{EventPayload, EventType, Item};
use sf_pager::controller::FETCH_FAILED_MESSAGE;
use sf_pager::{FeedConfig, FeedSession, HttpItemSource, PollingViewport, Sentinel};
use sf_storage::{KeyValueStore, RocksDbStore};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// A jsonplaceholder-style list of `total` posts. Returns the base url and a request counter.
async fn list_server(total: u64) -> (String, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let app = Router::new().route(
        "/posts",
        get(move |Query(params): Query<HashMap<String, String>>| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                let page: u64 = params["_page"].parse().unwrap();
                let limit: u64 = params["_limit"].parse().unwrap();
                let first = (page - 1) * limit + 1;
                let last = (first + limit - 1).min(total);
                let posts: Vec<Value> = (first..=last)
                    .map(|id| json!({ "userId": 1, "id": id, "title": format!("post {id}"), "body": "…" }))
                    .collect();
                Json(posts)
            }
        }),
    );
    let addr = serve(app).await;
    (format!("http://{addr}/posts"), calls)
}

async fn collector() -> (String, mpsc::UnboundedReceiver<EventPayload>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let app = Router::new().route(
        "/event",
        post(move |Json(event): Json<EventPayload>| {
            let tx = tx.clone();
            async move {
                tx.send(event).unwrap();
                Json(json!({ "event_id": "test" }))
            }
        }),
    );
    let addr = serve(app).await;
    (format!("http://{addr}/event"), rx)
}

async fn closed_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/posts")
}

fn session(list_url: &str, analytics_url: &str, user_id: u64) -> FeedSession {
    let timeout = Duration::from_secs(5);
    FeedSession::new(
        Arc::new(HttpItemSource::new(list_url, timeout).unwrap()),
        Arc::new(HttpEventSink::new(analytics_url, timeout).unwrap()),
        user_id,
        15,
    )
}

async fn collect(rx: &mut mpsc::UnboundedReceiver<EventPayload>, count: usize) -> Vec<EventPayload> {
    let mut events = Vec::with_capacity(count);
    for _ in 0..count {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("event arrives")
            .expect("collector alive");
        events.push(event);
    }
    events
}

#[tokio::test]
async fn twenty_two_posts_load_in_two_pages() {
    let (list_url, calls) = list_server(22).await;
    let (analytics_url, mut events) = collector().await;
    let session = session(&list_url, &analytics_url, 314);
    let controller = session.controller();

    session.open().await;
    let state = controller.snapshot();
    assert_eq!(state.items.len(), 15);
    assert!(state.has_more);
    assert_eq!(state.scroll_pages_loaded, 0);

    controller.request_next_page().await;
    let state = controller.snapshot();
    let ids: Vec<u64> = state.items.iter().map(|item| item.id).collect();
    assert_eq!(ids, (1..=22).collect::<Vec<_>>());
    assert_eq!(state.current_page, 2);
    assert!(!state.has_more);
    assert_eq!(state.scroll_pages_loaded, 1);

    controller.request_next_page().await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let mut received = collect(&mut events, 2).await;
    received.sort_by_key(|event| event.event_type.as_str());
    assert_eq!(received[0].event_type, EventType::PageView);
    assert_eq!(received[0].info, json!({ "path": "/" }));
    assert_eq!(received[1].event_type, EventType::Scroll);
    assert_eq!(received[1].action, "infinite_scroll_page");
    assert_eq!(received[1].info, json!({ "page_loaded": 1 }));
    assert!(received.iter().all(|event| event.user_id == 314));
}

#[tokio::test]
async fn first_page_failure_stops_the_feed() {
    let (analytics_url, mut events) = collector().await;
    let session = session(&closed_url().await, &analytics_url, 9);
    let controller = session.controller();

    session.open().await;
    let state = controller.snapshot();
    assert!(state.items.is_empty());
    assert!(!state.has_more);
    assert!(!state.is_loading);
    assert_eq!(state.last_error.as_deref(), Some(FETCH_FAILED_MESSAGE));

    controller.request_next_page().await;
    assert_eq!(controller.snapshot().current_page, 0);

    let received = collect(&mut events, 1).await;
    assert_eq!(received[0].event_type, EventType::PageView);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn analytics_outage_does_not_affect_paging() {
    let (list_url, _calls) = list_server(40).await;
    let session = session(&list_url, &closed_url().await, 1);
    let controller = session.controller();

    session.open().await;
    controller.request_next_page().await;
    controller.request_next_page().await;

    let state = controller.snapshot();
    assert_eq!(state.items.len(), 40);
    assert_eq!(state.scroll_pages_loaded, 2);
    assert!(!state.has_more);
    assert!(state.last_error.is_none());
}

#[tokio::test]
async fn always_visible_tail_loads_everything() {
    let (list_url, calls) = list_server(37).await;
    let (analytics_url, mut events) = collector().await;
    let session = session(&list_url, &analytics_url, 2);
    let controller = session.controller();

    session.open().await;
    let viewport = PollingViewport::<u64, _>::new(Duration::from_millis(10), |_id: &u64| true);
    let sentinel = Sentinel::new(viewport, Arc::clone(&controller));
    tokio::time::timeout(
        Duration::from_secs(10),
        sentinel.follow_last_item(|item: &Item| item.id),
    )
    .await
    .expect("sentinel stops once the list is exhausted");

    let state = controller.snapshot();
    assert_eq!(state.items.len(), 37);
    assert_eq!(state.current_page, 3);
    assert_eq!(state.scroll_pages_loaded, 2);
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    let received = collect(&mut events, 3).await;
    let mut scroll_pages: Vec<i64> = received
        .iter()
        .filter(|event| event.event_type == EventType::Scroll)
        .map(|event| event.info["page_loaded"].as_i64().unwrap())
        .collect();
    scroll_pages.sort();
    assert_eq!(scroll_pages, [1, 2]);
}

#[test]
fn identity_survives_reopening_the_state_dir() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let config = FeedConfig {
        state_dir: dir.path().join("state"),
        ..FeedConfig::default()
    };

    let first = {
        let store: Arc<dyn KeyValueStore> = Arc::new(RocksDbStore::open_default(&config.state_dir)?);
        FeedSession::connect(&config, store)?.user_id()
    };
    let second = {
        let store: Arc<dyn KeyValueStore> = Arc::new(RocksDbStore::open_default(&config.state_dir)?);
        FeedSession::connect(&config, store)?.user_id()
    };

    assert_ne!(first, 0);
    assert_eq!(first, second);
    Ok(())
}
