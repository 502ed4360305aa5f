//! Viewport-triggered paging.
//!
//! A [`Viewport`] watches one node at a time and calls back when it becomes visible.
//! The [`Sentinel`] keeps a single watch on the last rendered item and turns each
//! visibility event into a next-page request.

use sf_api_types::Item;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::controller::PageController;

pub type OnVisible = Arc<dyn Fn() + Send + Sync>;

/// A live observation. Disconnecting stops further callbacks.
pub trait Watch: Send {
    fn disconnect(&mut self);
}

pub trait Viewport: Send + Sync {
    type Node: Send + 'static;

    fn observe(&self, node: Self::Node, on_visible: OnVisible) -> Box<dyn Watch>;
}

pub struct Sentinel<V: Viewport> {
    viewport: V,
    controller: Arc<PageController>,
    active: Option<Box<dyn Watch>>,
}

impl<V: Viewport> Sentinel<V> {
    pub fn new(viewport: V, controller: Arc<PageController>) -> Self {
        Self {
            viewport,
            controller,
            active: None,
        }
    }

    /// Watches `node`, releasing whatever was watched before.
    pub fn attach(&mut self, node: V::Node) {
        self.detach();

        let controller = Arc::clone(&self.controller);
        let on_visible: OnVisible = Arc::new(move || {
            if !controller.can_request() {
                debug!("last item visible but a fetch is in flight or the list is exhausted");
                return;
            }
            debug!("last item visible, loading more");
            let controller = Arc::clone(&controller);
            tokio::spawn(async move {
                controller.request_next_page().await;
            });
        });

        self.active = Some(self.viewport.observe(node, on_visible));
    }

    pub fn detach(&mut self) {
        if let Some(mut watch) = self.active.take() {
            watch.disconnect();
        }
    }

    pub fn is_attached(&self) -> bool {
        self.active.is_some()
    }

    /// Re-attaches to the last item every time a load settles with new items, until the
    /// list is exhausted or the controller goes away.
    pub async fn follow_last_item<F>(mut self, node_of: F)
    where
        F: Fn(&Item) -> V::Node,
    {
        let mut updates = self.controller.subscribe();
        let mut attached_len = 0;

        loop {
            let (target, exhausted) = {
                let state = updates.borrow_and_update();
                let target = if !state.is_loading && state.items.len() != attached_len {
                    state
                        .items
                        .last()
                        .map(|item| (state.items.len(), node_of(item)))
                } else {
                    None
                };
                (target, !state.is_loading && !state.has_more)
            };

            if exhausted {
                debug!("list exhausted, sentinel stops following");
                break;
            }
            if let Some((len, node)) = target {
                self.attach(node);
                attached_len = len;
            }
            if updates.changed().await.is_err() {
                break;
            }
        }

        self.detach();
    }
}

impl<V: Viewport> Drop for Sentinel<V> {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Polls a visibility probe and fires on every hidden-to-visible transition, including
/// a node that is already visible on the first poll.
pub struct PollingViewport<N, P> {
    probe: Arc<P>,
    interval: Duration,
    _node: PhantomData<fn(N)>,
}

impl<N, P> PollingViewport<N, P>
where
    P: Fn(&N) -> bool,
{
    pub fn new(interval: Duration, probe: P) -> Self {
        Self {
            probe: Arc::new(probe),
            interval,
            _node: PhantomData,
        }
    }
}

impl<N, P> Viewport for PollingViewport<N, P>
where
    N: Send + 'static,
    P: Fn(&N) -> bool + Send + Sync + 'static,
{
    type Node = N;

    fn observe(&self, node: N, on_visible: OnVisible) -> Box<dyn Watch> {
        let probe = Arc::clone(&self.probe);
        let period = self.interval;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut was_visible = false;
            loop {
                ticker.tick().await;
                let visible = probe(&node);
                if visible && !was_visible {
                    on_visible();
                }
                was_visible = visible;
            }
        });

        Box::new(PollingWatch { task: Some(task) })
    }
}

struct PollingWatch {
    task: Option<JoinHandle<()>>,
}

impl Watch for PollingWatch {
    fn disconnect(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for PollingWatch {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{FetchError, ItemSource};
    use async_trait::async_trait;
    use manual::Registry;
    use sf_analytics::{Emitter, EventSink};
    use sf_api_types::EventPayload;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::Semaphore;

    mod manual {
        use super::*;
        use std::sync::Mutex;

        pub struct Entry {
            pub node: u64,
            pub on_visible: OnVisible,
            pub connected: Arc<AtomicBool>,
        }

        /// Records observations so tests can fire visibility by hand.
        #[derive(Clone, Default)]
        pub struct Registry {
            pub entries: Arc<Mutex<Vec<Entry>>>,
        }

        impl Registry {
            pub fn fire(&self, node: u64) {
                let callbacks: Vec<OnVisible> = self
                    .entries
                    .lock()
                    .unwrap()
                    .iter()
                    .filter(|entry| entry.node == node && entry.connected.load(Ordering::SeqCst))
                    .map(|entry| Arc::clone(&entry.on_visible))
                    .collect();
                for callback in callbacks {
                    callback();
                }
            }

            pub fn connected_nodes(&self) -> Vec<u64> {
                self.entries
                    .lock()
                    .unwrap()
                    .iter()
                    .filter(|entry| entry.connected.load(Ordering::SeqCst))
                    .map(|entry| entry.node)
                    .collect()
            }

            pub fn observed(&self) -> usize {
                self.entries.lock().unwrap().len()
            }
        }

        struct ManualWatch(Arc<AtomicBool>);

        impl Watch for ManualWatch {
            fn disconnect(&mut self) {
                self.0.store(false, Ordering::SeqCst);
            }
        }

        impl Viewport for Registry {
            type Node = u64;

            fn observe(&self, node: u64, on_visible: OnVisible) -> Box<dyn Watch> {
                let connected = Arc::new(AtomicBool::new(true));
                self.entries.lock().unwrap().push(Entry {
                    node,
                    on_visible,
                    connected: Arc::clone(&connected),
                });
                Box::new(ManualWatch(connected))
            }
        }
    }

    /// Pages of `size` sequential ids, `total` items overall.
    struct CountingSource {
        size: u64,
        total: u64,
        calls: AtomicUsize,
        gate: Option<Semaphore>,
    }

    impl CountingSource {
        fn release(&self) {
            if let Some(gate) = &self.gate {
                gate.add_permits(1);
            }
        }
    }

    #[async_trait]
    impl ItemSource for CountingSource {
        async fn fetch_page(&self, page: u32, _limit: usize) -> Result<Vec<Item>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
            let first = (page as u64 - 1) * self.size + 1;
            let last = (first + self.size - 1).min(self.total);
            Ok((first..=last)
                .map(|id| Item {
                    id,
                    title: format!("title {id}"),
                    body: String::new(),
                })
                .collect())
        }
    }

    struct NullSink;

    #[async_trait]
    impl EventSink for NullSink {
        async fn send(&self, _event: &EventPayload) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn controller(size: u64, total: u64) -> (Arc<PageController>, Arc<CountingSource>) {
        build_controller(size, total, None)
    }

    /// Every fetch parks until [`CountingSource::release`].
    fn gated_controller(size: u64, total: u64) -> (Arc<PageController>, Arc<CountingSource>) {
        build_controller(size, total, Some(Semaphore::new(0)))
    }

    fn build_controller(
        size: u64,
        total: u64,
        gate: Option<Semaphore>,
    ) -> (Arc<PageController>, Arc<CountingSource>) {
        let source = Arc::new(CountingSource {
            size,
            total,
            calls: AtomicUsize::new(0),
            gate,
        });
        let controller = PageController::new(
            source.clone(),
            Emitter::new(Arc::new(NullSink)),
            Some(1),
            size as usize,
        );
        (Arc::new(controller), source)
    }

    async fn settle() {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn attach_releases_previous_watch() {
        let (controller, _source) = controller(3, 30);
        let registry = Registry::default();
        let mut sentinel = Sentinel::new(registry.clone(), controller);

        sentinel.attach(3);
        sentinel.attach(6);
        assert_eq!(registry.observed(), 2);
        assert_eq!(registry.connected_nodes(), [6]);

        sentinel.detach();
        assert!(registry.connected_nodes().is_empty());
        assert!(!sentinel.is_attached());
    }

    #[tokio::test]
    async fn visible_last_item_requests_next_page() {
        let (controller, source) = controller(3, 30);
        controller.request_page(1).await;

        let registry = Registry::default();
        let mut sentinel = Sentinel::new(registry.clone(), Arc::clone(&controller));
        sentinel.attach(3);

        registry.fire(3);
        settle().await;

        let state = controller.snapshot();
        assert_eq!(state.current_page, 2);
        assert_eq!(state.items.len(), 6);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn stale_watch_does_not_fire() {
        let (controller, source) = controller(3, 30);
        controller.request_page(1).await;

        let registry = Registry::default();
        let mut sentinel = Sentinel::new(registry.clone(), Arc::clone(&controller));
        sentinel.attach(2);
        sentinel.attach(3);

        registry.fire(2);
        settle().await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn visibility_after_exhaustion_is_ignored() {
        let (controller, source) = controller(3, 2);
        controller.request_page(1).await;
        assert!(!controller.snapshot().has_more);

        let registry = Registry::default();
        let mut sentinel = Sentinel::new(registry.clone(), Arc::clone(&controller));
        sentinel.attach(2);
        registry.fire(2);
        settle().await;

        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(controller.snapshot().current_page, 1);
    }

    #[tokio::test]
    async fn visibility_during_fetch_is_dropped() {
        let (controller, source) = gated_controller(3, 30);
        let registry = Registry::default();
        let mut sentinel = Sentinel::new(registry.clone(), Arc::clone(&controller));
        sentinel.attach(0);

        registry.fire(0);
        settle().await;
        assert!(controller.snapshot().is_loading);

        registry.fire(0);
        registry.fire(0);
        settle().await;

        source.release();
        settle().await;

        let state = controller.snapshot();
        assert!(!state.is_loading);
        assert_eq!(state.current_page, 1);
        assert_eq!(state.items.len(), 3);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn follow_reattaches_to_each_new_last_item() {
        let (controller, _source) = controller(3, 7);
        let registry = Registry::default();
        let sentinel = Sentinel::new(registry.clone(), Arc::clone(&controller));

        controller.request_page(1).await;
        let follower = tokio::spawn(sentinel.follow_last_item(|item: &Item| item.id));
        settle().await;
        assert_eq!(registry.connected_nodes(), [3]);

        registry.fire(3);
        settle().await;
        assert_eq!(controller.snapshot().current_page, 2);
        assert_eq!(registry.connected_nodes(), [6]);

        registry.fire(6);
        follower.await.unwrap();

        let state = controller.snapshot();
        assert_eq!(state.items.len(), 7);
        assert!(!state.has_more);
        assert!(registry.connected_nodes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn polling_viewport_fires_on_each_transition() {
        let visible = Arc::new(AtomicBool::new(true));
        let fired = Arc::new(AtomicUsize::new(0));

        let viewport = PollingViewport::<u64, _>::new(Duration::from_millis(100), {
            let visible = Arc::clone(&visible);
            move |_node: &u64| visible.load(Ordering::SeqCst)
        });
        let mut watch = viewport.observe(1, {
            let fired = Arc::clone(&fired);
            Arc::new(move || {
                fired.fetch_add(1, Ordering::SeqCst);
            })
        });

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        visible.store(false, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(200)).await;
        visible.store(true, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 2);

        watch.disconnect();
        visible.store(false, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(200)).await;
        visible.store(true, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }
}
