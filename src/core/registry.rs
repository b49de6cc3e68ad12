//! # Scheduler registry - owns every poller's lifecycle.
//!
//! The [`Registry`] creates, tracks, and tears down poller actors, and is the
//! only boundary the surrounding application touches:
//! `start` / `stop` / `stop_all` / `refresh` / `subscribe` / `status` /
//! `on_visibility_change` / `events`.
//!
//! ## Architecture
//! ```text
//! Registry
//!   ├─ Bus (broadcast events)
//!   ├─ ConditionalCache (validator + payload per resource id)
//!   ├─ PenaltyTracker (cross-poller outage coordination)
//!   ├─ SubscriberSet (payload/failure fan-out, keyed by poller id)
//!   └─ HashMap<id, Handle>  (command sender + cancel token + status view)
//!          │
//!          └──► PollerActor::run(child_token)   (one spawned task per poller)
//! ```
//!
//! ## Rules
//! - The registry owns command senders and cancellation tokens; poller state
//!   itself is owned by each actor and only observed through status snapshots.
//! - `stop` is idempotent and never joins the actor: the cancel token is
//!   flipped and the actor winds down on its own, discarding any in-flight
//!   result. Stopping an unknown id is a no-op.
//! - `stop_all` marks the registry disposed; subsequent `start` / `refresh` /
//!   `subscribe` / `status` calls fail with [`RegistryError::Disposed`].
//!   Calling it again is safe.
//! - Visibility state applies to late-started pollers too: a poller started
//!   while the host is hidden is paused (or downshifted) immediately.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch, RwLock};
use tokio_util::sync::CancellationToken;

use crate::cache::ConditionalCache;
use crate::config::Config;
use crate::core::actor::{Command, PollerActor};
use crate::core::penalty::PenaltyTracker;
use crate::core::status::{PollerHandle, PollerStatus};
use crate::error::RegistryError;
use crate::events::{Bus, Event, EventKind};
use crate::fetch::PollerSpec;
use crate::subscribers::{Subscribe, SubscriberSet, Subscription};

/// Per-poller bookkeeping owned by the registry.
struct Handle {
    /// Command channel into the actor (refresh / pause / resume).
    commands: mpsc::Sender<Command>,
    /// Individual cancellation token for this poller.
    cancel: CancellationToken,
    /// Live status view published by the actor.
    status: watch::Receiver<PollerStatus>,
}

/// Owns a set of pollers and the shared machinery between them.
///
/// Must be created inside a Tokio runtime (it spawns its update listener).
/// Dropping the registry cancels every poller it still owns.
pub struct Registry {
    cfg: Config,
    bus: Bus,
    cache: Arc<ConditionalCache>,
    penalty: Arc<PenaltyTracker>,
    subs: Arc<SubscriberSet>,
    pollers: RwLock<HashMap<Arc<str>, Handle>>,
    runtime_token: CancellationToken,
    disposed: AtomicBool,
    hidden: AtomicBool,
}

impl Registry {
    /// Creates a registry and spawns its update listener.
    pub fn new(cfg: Config) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(cfg.notify_failure_threshold, bus.clone()));
        let penalty = PenaltyTracker::new(
            cfg.penalty_window,
            cfg.penalty_threshold,
            cfg.penalty_multiplier,
            cfg.penalty_min_failing,
            bus.clone(),
        );
        let runtime_token = CancellationToken::new();
        Self::spawn_update_listener(&bus, Arc::clone(&subs), runtime_token.clone());

        Self {
            cfg,
            bus,
            cache: Arc::new(ConditionalCache::new()),
            penalty,
            subs,
            pollers: RwLock::new(HashMap::new()),
            runtime_token,
            disposed: AtomicBool::new(false),
            hidden: AtomicBool::new(false),
        }
    }

    /// Forwards payload/failure events from the bus to the subscriber set.
    fn spawn_update_listener(bus: &Bus, subs: Arc<SubscriberSet>, token: CancellationToken) {
        let mut rx = bus.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    msg = rx.recv() => match msg {
                        Ok(ev) => subs.emit(&ev),
                        Err(broadcast::error::RecvError::Closed) => break,
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            log::warn!("update listener lagged, skipped {n} events");
                        }
                    }
                }
            }
        });
    }

    /// Starts a poller for `spec`.
    ///
    /// Fails with [`RegistryError::DuplicateId`] if the id is already active,
    /// [`RegistryError::InvalidSpec`] if the interval bounds are inconsistent,
    /// and [`RegistryError::Disposed`] after teardown.
    pub async fn start(&self, spec: PollerSpec) -> Result<PollerHandle, RegistryError> {
        self.ensure_open()?;
        spec.validate()?;

        let id = spec.id_arc();
        let mut pollers = self.pollers.write().await;
        if pollers.contains_key(&*id) {
            return Err(RegistryError::DuplicateId { id: id.to_string() });
        }

        let initial = spec
            .base_interval()
            .clamp(spec.min_interval(), spec.max_interval());
        let (commands, command_rx) = mpsc::channel(8);
        let (status_tx, status_rx) = watch::channel(PollerStatus::initial(initial));
        let cancel = self.runtime_token.child_token();

        let actor = PollerActor::new(
            spec,
            self.cfg.clone(),
            self.bus.clone(),
            Arc::clone(&self.cache),
            Arc::clone(&self.penalty),
            status_tx,
            command_rx,
        );
        tokio::spawn(actor.run(cancel.clone()));

        // A poller born into a hidden host starts paused/downshifted.
        if self.hidden.load(Ordering::Relaxed) {
            let _ = commands.try_send(Command::Pause);
        }

        pollers.insert(
            Arc::clone(&id),
            Handle {
                commands,
                cancel,
                status: status_rx.clone(),
            },
        );
        let active = pollers.len();
        drop(pollers);

        self.penalty.set_active(active);
        self.bus
            .publish(Event::new(EventKind::PollerAdded).with_poller(Arc::clone(&id)));
        Ok(PollerHandle::new(id, status_rx))
    }

    /// Stops the poller with the given id; unknown ids are a no-op.
    ///
    /// The pending timer is cancelled and the cache entry evicted. An
    /// operation already in flight is allowed to finish; its result is
    /// discarded on arrival.
    pub async fn stop(&self, id: &str) {
        let removed = self.pollers.write().await.remove(id);
        if let Some(handle) = removed {
            handle.cancel.cancel();
            self.cache.evict(id);
            self.subs.cancel_for(id);
            let active = self.pollers.read().await.len();
            self.penalty.set_active(active);
            self.bus
                .publish(Event::new(EventKind::PollerRemoved).with_poller(id.to_string()));
        }
    }

    /// Stops every poller and marks the registry disposed.
    ///
    /// Safe to call multiple times and while operations are in flight; later
    /// `start` / `refresh` / `subscribe` / `status` calls fail with
    /// [`RegistryError::Disposed`].
    pub async fn stop_all(&self) {
        self.disposed.store(true, Ordering::SeqCst);

        let drained: Vec<(Arc<str>, Handle)> = self.pollers.write().await.drain().collect();
        for (_, handle) in &drained {
            handle.cancel.cancel();
        }
        for (id, _) in drained {
            self.cache.evict(&id);
            self.subs.cancel_for(&id);
            self.bus
                .publish(Event::new(EventKind::PollerRemoved).with_poller(id));
        }
        self.penalty.set_active(0);
        self.runtime_token.cancel();
    }

    /// Requests an immediate run of the named poller.
    ///
    /// A request arriving while the poller is mid-run is coalesced: the run in
    /// flight satisfies it, no second concurrent run is started.
    pub async fn refresh(&self, id: &str) -> Result<(), RegistryError> {
        self.ensure_open()?;
        let pollers = self.pollers.read().await;
        let handle = pollers.get(id).ok_or_else(|| RegistryError::UnknownPoller {
            id: id.to_string(),
        })?;

        self.bus
            .publish(Event::new(EventKind::RefreshRequested).with_poller(id.to_string()));
        match handle.commands.try_send(Command::Refresh) {
            Ok(()) => Ok(()),
            // a refresh is already queued; this one is satisfied by it
            Err(mpsc::error::TrySendError::Full(_)) => Ok(()),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(RegistryError::UnknownPoller {
                id: id.to_string(),
            }),
        }
    }

    /// Reacts to the host's visibility changing.
    ///
    /// Broadcasts pause/resume to every poller; each applies its own
    /// `pause_when_hidden` policy (full pause vs downshift). Repeated
    /// deliveries of the same state are ignored.
    pub async fn on_visibility_change(&self, hidden: bool) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }
        if self.hidden.swap(hidden, Ordering::SeqCst) == hidden {
            return;
        }

        self.bus
            .publish(Event::new(EventKind::VisibilityChanged).with_hidden(hidden));
        let cmd = if hidden {
            Command::Pause
        } else {
            Command::Resume
        };
        let pollers = self.pollers.read().await;
        for (id, handle) in pollers.iter() {
            if handle.commands.try_send(cmd).is_err() {
                log::warn!("poller '{id}' missed visibility command");
            }
        }
    }

    /// Subscribes a listener to the named poller's accepted payloads and
    /// failure streaks. Returns the explicit unsubscribe handle.
    pub async fn subscribe(
        &self,
        id: &str,
        subscriber: Arc<dyn Subscribe>,
    ) -> Result<Subscription, RegistryError> {
        self.ensure_open()?;
        let pollers = self.pollers.read().await;
        let (key, _) = pollers
            .get_key_value(id)
            .ok_or_else(|| RegistryError::UnknownPoller { id: id.to_string() })?;
        Ok(self.subs.add(Arc::clone(key), subscriber))
    }

    /// Returns the latest status snapshot of the named poller.
    pub async fn status(&self, id: &str) -> Result<PollerStatus, RegistryError> {
        self.ensure_open()?;
        let pollers = self.pollers.read().await;
        pollers
            .get(id)
            .map(|h| h.status.borrow().clone())
            .ok_or_else(|| RegistryError::UnknownPoller { id: id.to_string() })
    }

    /// Returns the sorted list of active poller ids.
    pub async fn list(&self) -> Vec<String> {
        let pollers = self.pollers.read().await;
        let mut ids: Vec<String> = pollers.keys().map(|k| k.to_string()).collect();
        ids.sort_unstable();
        ids
    }

    /// Creates a receiver observing every subsequent scheduler event.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// The conditional cache shared with this registry's pollers.
    ///
    /// Operations may consult it directly (e.g. to serve the held payload
    /// when the server reports "not modified").
    pub fn cache(&self) -> Arc<ConditionalCache> {
        Arc::clone(&self.cache)
    }

    /// True once `stop_all` has run.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<(), RegistryError> {
        if self.is_disposed() {
            Err(RegistryError::Disposed)
        } else {
            Ok(())
        }
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        self.runtime_token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FailureKind, FetchFailure};
    use crate::fetch::{FetchFn, FetchOutcome, OperationRef, Validator};
    use crate::policies::Jitter;
    use crate::PollStatus;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicI32, AtomicU32, Ordering as AtomicOrdering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::sleep;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    /// Operation that counts invocations and always reports unchanged content.
    fn counting_unchanged(calls: Arc<AtomicU32>) -> OperationRef {
        FetchFn::arc(move |_v: Option<Validator>| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, AtomicOrdering::SeqCst);
                FetchOutcome::unchanged()
            }
        })
    }

    /// Operation that always fails with a network error.
    fn failing(calls: Arc<AtomicU32>) -> OperationRef {
        FetchFn::arc(move |_v: Option<Validator>| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, AtomicOrdering::SeqCst);
                FetchOutcome::failed(FetchFailure::network("connection refused"))
            }
        })
    }

    /// Spec with jitter disabled so virtual-clock timings are exact.
    fn quiet_spec(id: &str, op: OperationRef, base: Duration) -> PollerSpec {
        PollerSpec::new(id, op, base).with_jitter(Jitter::None)
    }

    /// Drains every event currently buffered on the receiver.
    fn drain_events(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev);
        }
        out
    }

    struct Recorder {
        seen: Mutex<Vec<crate::Update>>,
    }

    impl Recorder {
        fn arc() -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_update(&self, update: &crate::Update) {
            self.seen.lock().expect("lock").push(update.clone());
        }

        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_id_rejected() {
        let registry = Registry::new(Config::default());
        let calls = Arc::new(AtomicU32::new(0));

        registry
            .start(quiet_spec("a", counting_unchanged(calls.clone()), secs(30)))
            .await
            .expect("first start");
        let err = registry
            .start(quiet_spec("a", counting_unchanged(calls.clone()), secs(30)))
            .await
            .expect_err("duplicate id");
        assert_eq!(err, RegistryError::DuplicateId { id: "a".into() });

        // first poller keeps its cadence
        sleep(secs(31)).await;
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_spec_rejected() {
        let registry = Registry::new(Config::default());
        let calls = Arc::new(AtomicU32::new(0));
        let spec = quiet_spec("a", counting_unchanged(calls), secs(30))
            .with_bounds(secs(60), secs(300));
        assert!(matches!(
            registry.start(spec).await,
            Err(RegistryError::InvalidSpec { .. })
        ));
        assert!(registry.list().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_on_interval_and_records_cache() {
        let registry = Registry::new(Config::default());
        let calls = Arc::new(AtomicU32::new(0));
        let calls_op = Arc::clone(&calls);
        let op = FetchFn::arc(move |validator: Option<Validator>| {
            let calls = Arc::clone(&calls_op);
            async move {
                calls.fetch_add(1, AtomicOrdering::SeqCst);
                match validator {
                    None => FetchOutcome::changed(&b"quote-book"[..]).with_validator("v1"),
                    Some(_) => FetchOutcome::unchanged(),
                }
            }
        });

        registry
            .start(quiet_spec("prices", op, secs(30)).with_adaptive(false))
            .await
            .expect("start");

        sleep(secs(31)).await;
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 1);
        let cache = registry.cache();
        assert_eq!(
            cache.payload("prices"),
            Some(Bytes::from_static(b"quote-book"))
        );
        let status = registry.status("prices").await.expect("status");
        assert_eq!(status.consecutive_unchanged, 0);
        assert!(status.last_changed_at.is_some());

        sleep(secs(30)).await;
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 2);
        let status = registry.status("prices").await.expect("status");
        assert_eq!(status.consecutive_unchanged, 1);
        assert_eq!(status.current_interval, secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_runs_immediately() {
        let registry = Registry::new(Config::default());
        let calls = Arc::new(AtomicU32::new(0));
        registry
            .start(quiet_spec("a", counting_unchanged(calls.clone()), secs(1000)))
            .await
            .expect("start");

        registry.refresh("a").await.expect("refresh");
        sleep(Duration::from_millis(10)).await;
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 1);

        assert!(matches!(
            registry.refresh("missing").await,
            Err(RegistryError::UnknownPoller { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_while_running_is_coalesced() {
        let registry = Registry::new(Config::default());
        let calls = Arc::new(AtomicU32::new(0));
        let in_flight = Arc::new(AtomicI32::new(0));
        let max_in_flight = Arc::new(AtomicI32::new(0));

        let calls_op = Arc::clone(&calls);
        let in_flight_op = Arc::clone(&in_flight);
        let max_op = Arc::clone(&max_in_flight);
        let op = FetchFn::arc(move |_v: Option<Validator>| {
            let calls = Arc::clone(&calls_op);
            let in_flight = Arc::clone(&in_flight_op);
            let max = Arc::clone(&max_op);
            async move {
                calls.fetch_add(1, AtomicOrdering::SeqCst);
                let now = in_flight.fetch_add(1, AtomicOrdering::SeqCst) + 1;
                max.fetch_max(now, AtomicOrdering::SeqCst);
                sleep(secs(5)).await;
                in_flight.fetch_sub(1, AtomicOrdering::SeqCst);
                FetchOutcome::unchanged()
            }
        });

        registry
            .start(quiet_spec("a", op, secs(30)).with_adaptive(false))
            .await
            .expect("start");

        // run starts at t=30 and holds until t=35
        sleep(secs(31)).await;
        registry.refresh("a").await.expect("refresh during run");
        sleep(secs(1)).await;
        registry.refresh("a").await.expect("second refresh");

        // in-flight run finished at t=35; both refreshes were coalesced
        sleep(secs(8)).await;
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 1);
        assert_eq!(max_in_flight.load(AtomicOrdering::SeqCst), 1);

        // next run comes from the steady interval
        sleep(secs(30)).await;
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_visibility_pause_blocks_runs() {
        let registry = Registry::new(Config::default());
        let calls = Arc::new(AtomicU32::new(0));
        registry
            .start(quiet_spec("a", counting_unchanged(calls.clone()), secs(10)))
            .await
            .expect("start");

        registry.on_visibility_change(true).await;
        sleep(secs(100)).await;
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 0);
        let status = registry.status("a").await.expect("status");
        assert_eq!(status.status, PollStatus::Paused);

        registry.on_visibility_change(false).await;
        // never ran, so not overdue: next run one interval after resume
        sleep(secs(11)).await;
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_overdue_triggers_immediate_run() {
        let registry = Registry::new(Config::default());
        let calls = Arc::new(AtomicU32::new(0));
        registry
            .start(quiet_spec("a", counting_unchanged(calls.clone()), secs(10)))
            .await
            .expect("start");

        sleep(secs(11)).await;
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 1);

        registry.on_visibility_change(true).await;
        sleep(secs(39)).await;
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 1);

        // hidden for well over one interval: resume runs immediately
        registry.on_visibility_change(false).await;
        sleep(Duration::from_millis(10)).await;
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hidden_downshifts_to_max_interval() {
        let registry = Registry::new(Config::default());
        let calls = Arc::new(AtomicU32::new(0));
        let spec = quiet_spec("a", counting_unchanged(calls.clone()), secs(10))
            .with_bounds(secs(10), secs(60))
            .with_adaptive(false)
            .with_pause_when_hidden(false);
        registry.start(spec).await.expect("start");

        registry.on_visibility_change(true).await;

        // downshifted: nothing at the base cadence
        sleep(secs(55)).await;
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 0);
        // but the max-interval cadence still fires
        sleep(secs(6)).await;
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 1);

        // resume shortly after the hidden run: not overdue, steady cadence restored
        registry.on_visibility_change(false).await;
        sleep(secs(11)).await;
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_delays_double_up_to_cap() {
        let registry = Registry::new(Config::default());
        let mut events = registry.events();
        let calls = Arc::new(AtomicU32::new(0));
        registry
            .start(quiet_spec("a", failing(calls.clone()), secs(1)).with_bounds(secs(1), secs(60)))
            .await
            .expect("start");

        // runs at t=1 (fail, 2s), t=3 (fail, 4s), t=7 (fail, 8s)
        sleep(secs(10)).await;
        let delays: Vec<u64> = drain_events(&mut events)
            .into_iter()
            .filter(|ev| ev.kind == EventKind::BackoffScheduled)
            .filter_map(|ev| ev.delay_ms)
            .collect();
        assert_eq!(&delays[..3], &[2000, 4000, 8000]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clustered_failures_engage_penalty() {
        let registry = Registry::new(Config::default());
        let mut events = registry.events();
        let calls = Arc::new(AtomicU32::new(0));

        for id in ["a", "b", "c", "d"] {
            registry
                .start(
                    quiet_spec(id, failing(calls.clone()), secs(1)).with_bounds(secs(1), secs(60)),
                )
                .await
                .expect("start");
        }
        // a healthy fifth poller that never runs inside the window
        registry
            .start(quiet_spec("e", counting_unchanged(calls.clone()), secs(1000)))
            .await
            .expect("start");

        sleep(secs(2)).await;
        let collected = drain_events(&mut events);
        assert!(collected
            .iter()
            .any(|ev| ev.kind == EventKind::PenaltyEngaged));

        // first failures before engagement back off plain, later ones doubled
        let first_round: Vec<u64> = collected
            .iter()
            .filter(|ev| ev.kind == EventKind::BackoffScheduled && ev.failures == Some(1))
            .filter_map(|ev| ev.delay_ms)
            .collect();
        assert!(first_round.contains(&2000), "delays: {first_round:?}");
        assert!(first_round.contains(&4000), "delays: {first_round:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_error_streak_parks_poller() {
        let registry = Registry::new(Config::default());
        let mut events = registry.events();
        let calls = Arc::new(AtomicU32::new(0));
        let calls_op = Arc::clone(&calls);
        let op = FetchFn::arc(move |_v: Option<Validator>| {
            let calls = Arc::clone(&calls_op);
            async move {
                calls.fetch_add(1, AtomicOrdering::SeqCst);
                FetchOutcome::failed(FetchFailure::client_error("403 forbidden"))
            }
        });
        registry
            .start(quiet_spec("a", op, secs(1)).with_bounds(secs(1), secs(60)))
            .await
            .expect("start");

        // fails at t=1, t=3, t=7; the third client error parks the poller
        sleep(secs(100)).await;
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 3);
        let status = registry.status("a").await.expect("status");
        assert_eq!(status.status, PollStatus::Paused);
        assert!(drain_events(&mut events).iter().any(|ev| {
            ev.kind == EventKind::PollerPaused && ev.reason.as_deref() == Some("client-errors")
        }));

        // an explicit refresh revives it
        registry.refresh("a").await.expect("refresh");
        sleep(Duration::from_millis(10)).await;
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_streak_lengthens_interval() {
        let registry = Registry::new(Config::default());
        let calls = Arc::new(AtomicU32::new(0));
        registry
            .start(
                quiet_spec("a", counting_unchanged(calls.clone()), secs(30))
                    .with_bounds(secs(10), secs(300)),
            )
            .await
            .expect("start");

        // unchanged at t=30 and t=60: streak below threshold, cadence holds
        sleep(secs(61)).await;
        let status = registry.status("a").await.expect("status");
        assert_eq!(status.current_interval, secs(30));

        // third unchanged at t=90: 30s × 1.5 = 45s
        sleep(secs(30)).await;
        let status = registry.status("a").await.expect("status");
        assert_eq!(status.consecutive_unchanged, 3);
        assert_eq!(status.current_interval, secs(45));

        // fourth unchanged at t=135: 45s × 1.5 = 67.5s
        sleep(secs(45)).await;
        let status = registry.status("a").await.expect("status");
        assert_eq!(status.current_interval, Duration::from_millis(67_500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_min_interval_is_a_floor() {
        let registry = Registry::new(Config::default());
        let calls = Arc::new(AtomicU32::new(0));
        let calls_op = Arc::clone(&calls);
        let op = FetchFn::arc(move |_v: Option<Validator>| {
            let calls = Arc::clone(&calls_op);
            async move {
                calls.fetch_add(1, AtomicOrdering::SeqCst);
                FetchOutcome::unchanged().with_min_interval(secs(50))
            }
        });
        registry
            .start(quiet_spec("a", op, secs(10)).with_bounds(secs(10), secs(300)))
            .await
            .expect("start");

        sleep(secs(11)).await;
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 1);
        let status = registry.status("a").await.expect("status");
        assert_eq!(status.current_interval, secs(50));

        // next run honors the floor, not the configured base
        sleep(secs(30)).await;
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 1);
        sleep(secs(21)).await;
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_evicts_cache_and_is_idempotent() {
        let registry = Registry::new(Config::default());
        let op = FetchFn::arc(|_v: Option<Validator>| async {
            FetchOutcome::changed(&b"body"[..]).with_validator("v1")
        });
        registry
            .start(quiet_spec("a", op, secs(1)))
            .await
            .expect("start");

        sleep(secs(2)).await;
        assert!(registry.cache().lookup("a").is_some());

        registry.stop("a").await;
        assert!(registry.cache().lookup("a").is_none());
        assert!(registry.list().await.is_empty());

        // repeated and unknown stops are no-ops
        registry.stop("a").await;
        registry.stop("never-existed").await;
        assert!(!registry.is_disposed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_all_disposes_registry() {
        let registry = Registry::new(Config::default());
        let calls = Arc::new(AtomicU32::new(0));
        registry
            .start(quiet_spec("a", counting_unchanged(calls.clone()), secs(10)))
            .await
            .expect("start a");
        registry
            .start(quiet_spec("b", counting_unchanged(calls.clone()), secs(10)))
            .await
            .expect("start b");

        registry.stop_all().await;
        assert!(registry.is_disposed());
        assert!(registry.list().await.is_empty());

        assert_eq!(
            registry
                .start(quiet_spec("c", counting_unchanged(calls.clone()), secs(10)))
                .await
                .expect_err("disposed"),
            RegistryError::Disposed
        );
        assert_eq!(
            registry.refresh("a").await.expect_err("disposed"),
            RegistryError::Disposed
        );
        assert_eq!(
            registry.status("a").await.expect_err("disposed"),
            RegistryError::Disposed
        );

        // repeated teardown is safe, and no poller runs afterwards
        registry.stop_all().await;
        registry.stop("a").await;
        sleep(secs(100)).await;
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_discards_in_flight_result() {
        let registry = Registry::new(Config::default());
        let mut events = registry.events();
        let op = FetchFn::arc(|_v: Option<Validator>| async {
            sleep(secs(10)).await;
            FetchOutcome::changed(&b"late"[..]).with_validator("v1")
        });
        let handle = registry
            .start(quiet_spec("a", op, secs(1)))
            .await
            .expect("start");

        // run starts at t=1; stop arrives while it is in flight
        sleep(secs(2)).await;
        registry.stop("a").await;

        sleep(secs(20)).await;
        assert!(registry.cache().lookup("a").is_none());
        assert_eq!(handle.status().status, PollStatus::Disposed);
        assert!(!drain_events(&mut events)
            .iter()
            .any(|ev| ev.kind == EventKind::PayloadChanged));
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_delivers_payloads_and_gated_failures() {
        let registry = Registry::new(Config::default());
        let calls = Arc::new(AtomicU32::new(0));
        let calls_op = Arc::clone(&calls);
        let op = FetchFn::arc(move |_v: Option<Validator>| {
            let calls = Arc::clone(&calls_op);
            async move {
                match calls.fetch_add(1, AtomicOrdering::SeqCst) {
                    0 => FetchOutcome::changed(&b"fresh"[..]).with_validator("v1"),
                    _ => FetchOutcome::failed(FetchFailure::network("unreachable")),
                }
            }
        });
        registry
            .start(quiet_spec("a", op, secs(1)).with_bounds(secs(1), secs(60)))
            .await
            .expect("start");

        let recorder = Recorder::arc();
        let subscription = registry
            .subscribe("a", recorder.clone())
            .await
            .expect("subscribe");
        assert!(matches!(
            registry.subscribe("missing", Recorder::arc()).await,
            Err(RegistryError::UnknownPoller { .. })
        ));

        // t=1 change, t=2 first failure (quiet), t=4 second failure (notified)
        sleep(secs(5)).await;
        {
            let seen = recorder.seen.lock().expect("lock");
            assert_eq!(seen.len(), 2, "updates: {seen:?}");
            match &seen[0] {
                crate::Update::Payload { payload, .. } => {
                    assert_eq!(payload, &Bytes::from_static(b"fresh"));
                }
                other => panic!("expected payload update, got {other:?}"),
            }
            match &seen[1] {
                crate::Update::Failing {
                    kind,
                    consecutive_failures,
                    ..
                } => {
                    assert_eq!(*kind, FailureKind::Network);
                    assert_eq!(*consecutive_failures, 2);
                }
                other => panic!("expected failing update, got {other:?}"),
            }
        }

        subscription.cancel();
        sleep(secs(10)).await;
        assert_eq!(recorder.seen.lock().expect("lock").len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_while_hidden_pauses_immediately() {
        let registry = Registry::new(Config::default());
        let calls = Arc::new(AtomicU32::new(0));

        registry.on_visibility_change(true).await;
        registry
            .start(quiet_spec("a", counting_unchanged(calls.clone()), secs(1)))
            .await
            .expect("start");

        sleep(secs(50)).await;
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 0);
        assert_eq!(
            registry.status("a").await.expect("status").status,
            PollStatus::Paused
        );

        registry.on_visibility_change(false).await;
        sleep(secs(2)).await;
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 1);
    }
}
