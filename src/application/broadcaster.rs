// Series broadcaster - owns the live window, refreshes it on a timer and fans it out
use crate::application::synthesizer::RollingWindowSynthesizer;
use crate::domain::coordinate::Coordinate;
use crate::domain::series::Series;
use serde::Serialize;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

/// Receives every new series. Errors and panics are contained per listener.
pub trait SeriesListener: Send + Sync {
    fn on_series(&self, series: &Series) -> anyhow::Result<()>;
}

impl<F> SeriesListener for F
where
    F: Fn(&Series) -> anyhow::Result<()> + Send + Sync,
{
    fn on_series(&self, series: &Series) -> anyhow::Result<()> {
        self(series)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BroadcasterState {
    Uninitialized,
    Initializing,
    Ready,
    Disposed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Hidden,
    Visible,
}

#[derive(Debug, thiserror::Error)]
pub enum BroadcastError {
    #[error("broadcaster has been disposed")]
    Disposed,
    #[error("no tokio runtime available to drive refreshes")]
    NoRuntime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshCause {
    Timer,
    Foreground,
}

#[derive(Debug, Clone, Serialize)]
pub struct BroadcasterStatus {
    pub state: BroadcasterState,
    pub subscribers: usize,
    pub timers_started: usize,
    pub coordinate: Option<Coordinate>,
    pub samples: usize,
}

struct Core {
    state: BroadcasterState,
    coord: Option<Coordinate>,
    current: Series,
    visibility: Visibility,
    timer: Option<JoinHandle<()>>,
}

type ListenerEntry = (u64, Arc<dyn SeriesListener>);

struct Inner {
    core: Mutex<Core>,
    listeners: Mutex<Vec<ListenerEntry>>,
    synthesizer: Mutex<RollingWindowSynthesizer>,
    // Held for a whole regenerate + notify cycle
    refresh_gate: Mutex<()>,
    next_listener_id: AtomicU64,
    timers_started: AtomicUsize,
    period: Duration,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Inner {
    fn refresh(&self, cause: RefreshCause) -> bool {
        let _gate = match cause {
            RefreshCause::Timer => lock(&self.refresh_gate),
            // A refresh already in flight covers the focus event
            RefreshCause::Foreground => match self.refresh_gate.try_lock() {
                Ok(gate) => gate,
                Err(_) => {
                    tracing::debug!("Refresh already running, skipping foreground refresh");
                    return false;
                }
            },
        };

        let (coord, previous) = {
            let core = lock(&self.core);
            if core.state != BroadcasterState::Ready {
                return false;
            }
            (core.coord, core.current.clone())
        };

        let next = lock(&self.synthesizer).regenerate(coord.as_ref(), Some(&previous));

        {
            let mut core = lock(&self.core);
            if core.state != BroadcasterState::Ready {
                return false;
            }
            core.current = next.clone();
        }

        tracing::debug!(?cause, samples = next.len(), "Series regenerated");
        self.notify(&next);
        true
    }

    fn notify(&self, series: &Series) {
        // Snapshot so listeners may (un)subscribe while being called
        let listeners: Vec<ListenerEntry> = lock(&self.listeners).clone();
        for (id, listener) in &listeners {
            deliver(*id, listener.as_ref(), series);
        }
    }

    fn remove_listener(&self, id: u64) {
        lock(&self.listeners).retain(|(listener_id, _)| *listener_id != id);
    }
}

fn deliver(id: u64, listener: &dyn SeriesListener, series: &Series) {
    match catch_unwind(AssertUnwindSafe(|| listener.on_series(series))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(listener = id, "Series listener failed: {:#}", e),
        Err(_) => tracing::error!(listener = id, "Series listener panicked"),
    }
}

async fn refresh_loop(inner: Weak<Inner>, period: Duration) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let Some(inner) = inner.upgrade() else {
            break;
        };
        inner.refresh(RefreshCause::Timer);
    }
}

/// Handle returned by [`SeriesBroadcaster::subscribe`]. The listener stays
/// registered until this is dropped or [`Subscription::unsubscribe`] is called.
pub struct Subscription {
    id: u64,
    inner: Weak<Inner>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Drop does the work
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.remove_listener(self.id);
        }
    }
}

pub struct SeriesBroadcaster {
    inner: Arc<Inner>,
}

impl SeriesBroadcaster {
    pub fn new(synthesizer: RollingWindowSynthesizer, period: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                core: Mutex::new(Core {
                    state: BroadcasterState::Uninitialized,
                    coord: None,
                    current: Series::empty(),
                    visibility: Visibility::Visible,
                    timer: None,
                }),
                listeners: Mutex::new(Vec::new()),
                synthesizer: Mutex::new(synthesizer),
                refresh_gate: Mutex::new(()),
                next_listener_id: AtomicU64::new(0),
                timers_started: AtomicUsize::new(0),
                period,
            }),
        }
    }

    /// Build the first window and start the refresh timer. Later calls are no-ops.
    pub fn initialize(&self, coord: Option<Coordinate>) -> Result<(), BroadcastError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| BroadcastError::NoRuntime)?;

        {
            let mut core = lock(&self.inner.core);
            match core.state {
                BroadcasterState::Ready | BroadcasterState::Initializing => return Ok(()),
                BroadcasterState::Disposed => return Err(BroadcastError::Disposed),
                BroadcasterState::Uninitialized => {
                    core.state = BroadcasterState::Initializing;
                    core.coord = coord;
                }
            }
        }

        let _gate = lock(&self.inner.refresh_gate);
        let first = lock(&self.inner.synthesizer).regenerate(coord.as_ref(), None);

        {
            let mut core = lock(&self.inner.core);
            if core.state == BroadcasterState::Disposed {
                return Err(BroadcastError::Disposed);
            }
            let timer = runtime.spawn(refresh_loop(Arc::downgrade(&self.inner), self.inner.period));
            self.inner.timers_started.fetch_add(1, Ordering::SeqCst);
            core.current = first.clone();
            core.timer = Some(timer);
            core.state = BroadcasterState::Ready;
        }

        tracing::info!(
            lat = coord.map(|c| c.lat),
            lon = coord.map(|c| c.lon),
            period_secs = self.inner.period.as_secs_f64(),
            "Series broadcaster ready"
        );
        self.inner.notify(&first);
        Ok(())
    }

    /// Register `listener` and hand it the current series before returning.
    pub fn subscribe<L>(&self, listener: L) -> Subscription
    where
        L: SeriesListener + 'static,
    {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);
        let listener: Arc<dyn SeriesListener> = Arc::new(listener);

        // Register before reading so a concurrent refresh is never missed
        lock(&self.inner.listeners).push((id, Arc::clone(&listener)));
        let current = self.current();
        deliver(id, listener.as_ref(), &current);

        Subscription {
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn current(&self) -> Series {
        lock(&self.inner.core).current.clone()
    }

    pub fn state(&self) -> BroadcasterState {
        lock(&self.inner.core).state
    }

    pub fn coordinate(&self) -> Option<Coordinate> {
        lock(&self.inner.core).coord
    }

    /// Returns true when the change caused a refresh, which only happens on
    /// a hidden to visible transition.
    pub fn on_visibility_change(&self, visibility: Visibility) -> bool {
        let regained = {
            let mut core = lock(&self.inner.core);
            let was = std::mem::replace(&mut core.visibility, visibility);
            was == Visibility::Hidden
                && visibility == Visibility::Visible
                && core.state == BroadcasterState::Ready
        };

        regained && self.inner.refresh(RefreshCause::Foreground)
    }

    pub fn status(&self) -> BroadcasterStatus {
        let core = lock(&self.inner.core);
        BroadcasterStatus {
            state: core.state,
            subscribers: lock(&self.inner.listeners).len(),
            timers_started: self.inner.timers_started.load(Ordering::SeqCst),
            coordinate: core.coord,
            samples: core.current.len(),
        }
    }

    /// Stop the refresh timer and drop every listener.
    pub fn dispose(&self) {
        let timer = {
            let mut core = lock(&self.inner.core);
            if core.state == BroadcasterState::Disposed {
                return;
            }
            core.state = BroadcasterState::Disposed;
            core.timer.take()
        };

        if let Some(timer) = timer {
            timer.abort();
        }
        lock(&self.inner.listeners).clear();
        tracing::info!("Series broadcaster disposed");
    }
}

impl Drop for SeriesBroadcaster {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::clock::{Clock, ManualClock};
    use crate::domain::series::WINDOW_LEN;
    use chrono::{FixedOffset, TimeZone, Utc};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn broadcaster(period: Duration) -> (SeriesBroadcaster, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 11, 20, 9, 15, 0).unwrap(),
        ));
        let synthesizer = RollingWindowSynthesizer::new(
            clock.clone(),
            StdRng::seed_from_u64(17),
            FixedOffset::east_opt(0).unwrap(),
            None,
        );
        (SeriesBroadcaster::new(synthesizer, period), clock)
    }

    fn recorder() -> (Arc<Mutex<Vec<Series>>>, impl SeriesListener + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let listener = move |series: &Series| -> anyhow::Result<()> {
            sink.lock().unwrap().push(series.clone());
            Ok(())
        };
        (seen, listener)
    }

    #[test]
    fn test_initialize_requires_runtime() {
        let (b, _) = broadcaster(Duration::from_secs(30));
        assert!(matches!(b.initialize(None), Err(BroadcastError::NoRuntime)));
        assert_eq!(b.state(), BroadcasterState::Uninitialized);
        assert!(b.current().is_empty());
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let (b, _) = broadcaster(Duration::from_secs(30));
        let coord = Coordinate::new(43.65, -79.38);
        b.initialize(Some(coord)).unwrap();
        let first = b.current();
        b.initialize(Some(Coordinate::new(0.0, 0.0))).unwrap();

        let status = b.status();
        assert_eq!(status.state, BroadcasterState::Ready);
        assert_eq!(status.timers_started, 1);
        assert_eq!(status.coordinate, Some(coord));
        assert_eq!(first.len(), WINDOW_LEN);
        assert!(b.current().shares_samples_with(&first));
    }

    #[tokio::test]
    async fn test_subscribe_replays_current_once() {
        let (b, _) = broadcaster(Duration::from_secs(30));
        b.initialize(None).unwrap();

        let (seen, listener) = recorder();
        let _sub = b.subscribe(listener);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].shares_samples_with(&b.current()));
    }

    #[tokio::test]
    async fn test_subscriber_before_initialize_gets_empty_then_first_window() {
        let (b, _) = broadcaster(Duration::from_secs(30));
        let (seen, listener) = recorder();
        let _sub = b.subscribe(listener);
        b.initialize(None).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].is_empty());
        assert_eq!(seen[1].len(), WINDOW_LEN);
    }

    #[tokio::test]
    async fn test_timer_refreshes_and_notifies_in_order() {
        let (b, _) = broadcaster(Duration::from_millis(20));
        b.initialize(None).unwrap();

        let order = Arc::new(Mutex::new(Vec::new()));
        let mut subs = Vec::new();
        for name in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            subs.push(b.subscribe(move |_: &Series| -> anyhow::Result<()> {
                order.lock().unwrap().push(name);
                Ok(())
            }));
        }
        order.lock().unwrap().clear();

        tokio::time::sleep(Duration::from_millis(110)).await;

        let order = order.lock().unwrap();
        assert!(order.len() >= 6, "expected at least two refreshes, got {:?}", order);
        for chunk in order.chunks(3) {
            if chunk.len() == 3 {
                assert_eq!(chunk, ["first", "second", "third"]);
            }
        }
    }

    #[tokio::test]
    async fn test_failing_listeners_do_not_block_others() {
        let (b, _) = broadcaster(Duration::from_secs(30));
        b.initialize(None).unwrap();

        let _erroring = b.subscribe(|_: &Series| -> anyhow::Result<()> {
            anyhow::bail!("consumer rejected update")
        });
        let _panicking = b.subscribe(|series: &Series| -> anyhow::Result<()> {
            if !series.is_empty() {
                panic!("consumer crashed");
            }
            Ok(())
        });
        let (seen, listener) = recorder();
        let _healthy = b.subscribe(listener);

        b.on_visibility_change(Visibility::Hidden);
        assert!(b.on_visibility_change(Visibility::Visible));

        // Replay plus the forced refresh
        assert_eq!(seen.lock().unwrap().len(), 2);
        assert_eq!(b.status().subscribers, 3);
    }

    #[tokio::test]
    async fn test_unsubscribe_only_removes_that_listener() {
        let (b, _) = broadcaster(Duration::from_secs(30));
        b.initialize(None).unwrap();

        let (kept_seen, kept) = recorder();
        let (gone_seen, gone) = recorder();
        let _kept = b.subscribe(kept);
        let gone_sub = b.subscribe(gone);
        gone_sub.unsubscribe();

        b.on_visibility_change(Visibility::Hidden);
        b.on_visibility_change(Visibility::Visible);

        assert_eq!(kept_seen.lock().unwrap().len(), 2);
        assert_eq!(gone_seen.lock().unwrap().len(), 1);
        assert_eq!(b.status().subscribers, 1);
    }

    #[tokio::test]
    async fn test_visibility_regain_is_debounced() {
        let (b, clock) = broadcaster(Duration::from_secs(30));
        b.initialize(None).unwrap();
        let (seen, listener) = recorder();
        let _sub = b.subscribe(listener);

        // Already visible: nothing to regain
        assert!(!b.on_visibility_change(Visibility::Visible));
        assert!(!b.on_visibility_change(Visibility::Hidden));
        clock.advance(chrono::Duration::minutes(5));
        assert!(b.on_visibility_change(Visibility::Visible));
        assert!(!b.on_visibility_change(Visibility::Visible));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        let refreshed = &seen[1];
        assert_eq!(refreshed.len(), WINDOW_LEN);
        assert!(refreshed.is_chronological());
        assert_eq!(refreshed.latest().unwrap().timestamp, clock.now());
    }

    #[tokio::test]
    async fn test_listener_may_unsubscribe_itself() {
        let (b, _) = broadcaster(Duration::from_secs(30));
        b.initialize(None).unwrap();

        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let calls = Arc::new(AtomicUsize::new(0));
        let sub = {
            let slot = Arc::clone(&slot);
            let calls = Arc::clone(&calls);
            b.subscribe(move |_: &Series| -> anyhow::Result<()> {
                if calls.fetch_add(1, Ordering::SeqCst) >= 1 {
                    slot.lock().unwrap().take();
                }
                Ok(())
            })
        };
        *slot.lock().unwrap() = Some(sub);

        b.on_visibility_change(Visibility::Hidden);
        b.on_visibility_change(Visibility::Visible);
        b.on_visibility_change(Visibility::Hidden);
        b.on_visibility_change(Visibility::Visible);

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(b.status().subscribers, 0);
    }

    #[tokio::test]
    async fn test_dispose_stops_refreshes() {
        let (b, _) = broadcaster(Duration::from_millis(10));
        b.initialize(None).unwrap();
        let (seen, listener) = recorder();
        let sub = b.subscribe(listener);

        b.dispose();
        b.dispose();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(seen.lock().unwrap().len(), 1);
        assert_eq!(b.state(), BroadcasterState::Disposed);
        assert!(matches!(b.initialize(None), Err(BroadcastError::Disposed)));
        assert!(!b.on_visibility_change(Visibility::Visible));
        drop(sub);
    }
}
