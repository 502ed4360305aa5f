use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{info, warn};

use crate::cli::LoadArgs;
use crate::generator::random_event;

#[derive(Debug, Clone, Copy)]
pub(crate) struct LoadReport {
    pub(crate) sent: u64,
    pub(crate) elapsed: Duration,
}

impl LoadReport {
    pub(crate) fn measured_rps(&self) -> f64 {
        self.sent as f64 / self.elapsed.as_secs_f64().max(f64::EPSILON)
    }
}

/// Tick period for one worker so that `concurrency` workers together approach `rps`.
pub(crate) fn worker_period(rps: u64, concurrency: usize) -> Duration {
    let nanos = (concurrency.max(1) as u128 * 1_000_000_000) / rps.max(1) as u128;
    Duration::from_nanos(nanos.clamp(1, u64::MAX as u128) as u64)
}

/// Posts one random event per tick until aborted. Every attempt counts, failed or not.
pub(crate) async fn worker(
    id: usize,
    http: reqwest::Client,
    url: Arc<str>,
    period: Duration,
    sent: Arc<AtomicU64>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let event = random_event(&mut rand::thread_rng());
        let result = http.post(url.as_ref()).json(&event).send().await;
        sent.fetch_add(1, Ordering::Relaxed);

        match result {
            Ok(response) if !response.status().is_success() => {
                warn!("worker {} got HTTP {}", id, response.status());
            }
            Ok(_) => {}
            Err(err) => warn!("worker {} failed to send: {}", id, err),
        }
    }
}

pub(crate) async fn run_load(args: &LoadArgs) -> LoadReport {
    let period = worker_period(args.rps, args.concurrency);
    info!(
        "target {:.2} rps per worker, tick every {:?}",
        args.rps as f64 / args.concurrency.max(1) as f64,
        period
    );

    let http = reqwest::Client::new();
    let url: Arc<str> = Arc::from(args.url.as_str());
    let sent = Arc::new(AtomicU64::new(0));
    let started = Instant::now();

    let workers: Vec<_> = (0..args.concurrency)
        .map(|id| {
            tokio::spawn(worker(
                id,
                http.clone(),
                Arc::clone(&url),
                period,
                Arc::clone(&sent),
            ))
        })
        .collect();

    tokio::time::sleep(args.duration).await;
    for handle in workers {
        handle.abort();
    }

    LoadReport {
        sent: sent.load(Ordering::Relaxed),
        elapsed: started.elapsed(),
    }
}
