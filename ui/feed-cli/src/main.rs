mod cli;
mod view;

use anyhow::Context;
use sf_api_types::Item;
use sf_pager::{FeedConfig, FeedSession, PaginationState, PollingViewport, Sentinel};
use sf_storage::{InMemoryStore, KeyValueStore, RocksDbStore};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::cli::{Command, HELP, parse_args};
use crate::view::FeedView;

// Analytics are sent from detached tasks; give them a moment before the runtime stops.
const ANALYTICS_FLUSH_GRACE: Duration = Duration::from_millis(500);

fn main() {
    let command = match parse_args(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(message) => {
            eprintln!("error: {message}\n\n{HELP}");
            std::process::exit(2);
        }
    };

    let clicks = match command {
        Command::Version => {
            println!("feed-cli {}", env!("CARGO_PKG_VERSION"));
            return;
        }
        Command::Help => {
            println!("{HELP}");
            return;
        }
        Command::Run { clicks } => clicks,
    };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let result = tokio::runtime::Runtime::new()
        .context("start tokio runtime")
        .and_then(|runtime| runtime.block_on(run(clicks)));
    if let Err(err) = result {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

async fn run(clicks: Vec<u64>) -> anyhow::Result<()> {
    let config = FeedConfig::from_env();
    let session = FeedSession::connect(&config, open_state_store(&config))?;
    let controller = session.controller();

    let tail = Arc::new(AtomicU64::new(0));
    let renderer = tokio::spawn(render(controller.subscribe(), Arc::clone(&tail)));

    session.open().await;

    let viewport = PollingViewport::<u64, _>::new(config.poll_interval, move |id: &u64| {
        tail.load(Ordering::SeqCst) == *id
    });
    Sentinel::new(viewport, Arc::clone(&controller))
        .follow_last_item(|item: &Item| item.id)
        .await;

    renderer.await.context("render task")??;

    for id in clicks {
        session.click(id);
    }
    tokio::time::sleep(ANALYTICS_FLUSH_GRACE).await;

    let state = controller.snapshot();
    info!(
        "feed finished with {} items over {} pages",
        state.items.len(),
        state.current_page
    );
    Ok(())
}

/// Identity storage. Falls back to a process-local store so the feed still works when the
/// state directory is unusable.
fn open_state_store(config: &FeedConfig) -> Arc<dyn KeyValueStore> {
    let opened = std::fs::create_dir_all(&config.state_dir)
        .with_context(|| format!("create state dir {}", config.state_dir.display()))
        .and_then(|_| RocksDbStore::open_default(&config.state_dir));

    match opened {
        Ok(store) => Arc::new(store),
        Err(err) => {
            warn!("identity storage unavailable, identity will not persist: {err:#}");
            Arc::new(InMemoryStore::default())
        }
    }
}

async fn render(
    mut updates: watch::Receiver<PaginationState>,
    tail: Arc<AtomicU64>,
) -> anyhow::Result<()> {
    let mut view = FeedView::default();

    loop {
        let done = {
            let state = updates.borrow_and_update().clone();
            let mut out = std::io::stdout().lock();
            if let Some(last) = view.render(&state, &mut out)? {
                tail.store(last, Ordering::SeqCst);
            }
            view.finish(&state, &mut out)?
        };
        if done || updates.changed().await.is_err() {
            return Ok(());
        }
    }
}
