//! # PollerActor: single-poller state machine.
//!
//! Owns one recurring conditional fetch: scheduling, execution, outcome
//! interpretation (changed / unchanged / failed), and interval adaptation.
//!
//! ## State machine
//! ```text
//! Idle ──► Scheduled ──(timer │ refresh)──► Running ──┬─ Changed   ─► reset counters,
//!              ▲                                      │              interval = base      ─► Scheduled
//!              │                                      ├─ Unchanged ─► unchanged += 1,
//!              │                                      │              grow after threshold ─► Scheduled
//!              │                                      └─ Failed    ─► failures += 1,
//!              │                                                     delay = backoff(...) ─► Backoff
//!              │
//!          Paused ◄── hidden host (pause_when_hidden) │ client-error streak
//!              └── resume / refresh ──► immediate run when overdue
//! ```
//!
//! ## Rules
//! - Runs are **strictly sequential** within one poller: run *N+1* never starts
//!   before run *N*'s outcome has been applied. This serializes all access to
//!   the poller's cache entry.
//! - A manual refresh arriving while a run is in flight is **coalesced**: the
//!   in-flight run satisfies it.
//! - Pause never aborts an in-flight operation; the outcome is still applied,
//!   but no new run is scheduled until resume.
//! - Dispose lets an in-flight operation finish, then **discards** its result.
//! - Backoff delays never contaminate the steady interval: the steady value is
//!   kept aside and restored once a run succeeds again.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::cache::{ConditionalCache, Recorded};
use crate::config::Config;
use crate::core::penalty::PenaltyTracker;
use crate::core::status::{PollStatus, PollerStatus};
use crate::error::{FailureKind, FetchFailure};
use crate::events::{Bus, Event, EventKind};
use crate::fetch::{FetchOutcome, PollerSpec};
use crate::policies::apply_floor;

/// Control messages delivered to a poller actor by its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    /// Run now; coalesced if a run is already in flight.
    Refresh,
    /// Host became hidden: pause fully or downshift, per the poller's policy.
    Pause,
    /// Host became visible again.
    Resume,
}

/// Why the wait phase ended.
enum Wake {
    Run,
    Dispose,
}

/// Mutable state exclusively owned by one actor.
struct ActorState {
    status: PollStatus,
    /// Steady interval, always within `[min_interval, max_interval]`.
    interval: Duration,
    /// Armed failure delay (jitter applied), pending until the next run.
    backoff: Option<Duration>,
    /// Server-suggested minimum re-poll interval.
    floor: Option<Duration>,
    failures: u32,
    unchanged: u32,
    client_errors: u32,
    hidden: bool,
    error_paused: bool,
    last_run_mono: Option<Instant>,
    last_run_at: Option<SystemTime>,
    last_success_at: Option<SystemTime>,
    last_changed_at: Option<SystemTime>,
    last_error: Option<FetchFailure>,
}

impl ActorState {
    fn new(interval: Duration) -> Self {
        Self {
            status: PollStatus::Idle,
            interval,
            backoff: None,
            floor: None,
            failures: 0,
            unchanged: 0,
            client_errors: 0,
            hidden: false,
            error_paused: false,
            last_run_mono: None,
            last_run_at: None,
            last_success_at: None,
            last_changed_at: None,
            last_error: None,
        }
    }

    fn is_paused(&self, pause_when_hidden: bool) -> bool {
        self.error_paused || (self.hidden && pause_when_hidden)
    }

    /// True when more than one steady interval has elapsed since the last run.
    fn overdue(&self) -> bool {
        match (self.last_run_mono, self.backoff) {
            (Some(last), None) => last.elapsed() >= self.interval,
            _ => false,
        }
    }

    fn snapshot(&self) -> PollerStatus {
        PollerStatus {
            status: self.status,
            current_interval: self.backoff.unwrap_or(self.interval),
            consecutive_failures: self.failures,
            consecutive_unchanged: self.unchanged,
            last_run_at: self.last_run_at,
            last_success_at: self.last_success_at,
            last_changed_at: self.last_changed_at,
            last_error: self.last_error.as_ref().map(|e| e.to_string()),
        }
    }
}

/// Shared collaborators the actor publishes through.
struct ActorCtx {
    spec: PollerSpec,
    cfg: Config,
    bus: Bus,
    cache: Arc<ConditionalCache>,
    penalty: Arc<PenaltyTracker>,
    status: watch::Sender<PollerStatus>,
}

/// Supervises one recurring conditional fetch.
pub(crate) struct PollerActor {
    ctx: ActorCtx,
    commands: mpsc::Receiver<Command>,
}

impl PollerActor {
    pub(crate) fn new(
        spec: PollerSpec,
        cfg: Config,
        bus: Bus,
        cache: Arc<ConditionalCache>,
        penalty: Arc<PenaltyTracker>,
        status: watch::Sender<PollerStatus>,
        commands: mpsc::Receiver<Command>,
    ) -> Self {
        Self {
            ctx: ActorCtx {
                spec,
                cfg,
                bus,
                cache,
                penalty,
                status,
            },
            commands,
        }
    }

    /// Runs the actor until its registry cancels it.
    ///
    /// ### Cancellation semantics
    /// The token is checked at safe points: while waiting for a timer or
    /// command, and again after an operation resolves. An in-flight operation
    /// is never aborted; when cancellation arrives mid-flight, the result is
    /// discarded instead of applied.
    pub(crate) async fn run(self, token: CancellationToken) {
        let PollerActor { ctx, mut commands } = self;
        let initial = ctx
            .spec
            .base_interval()
            .clamp(ctx.spec.min_interval(), ctx.spec.max_interval());
        let mut st = ActorState::new(initial);
        ctx.push(&st);

        loop {
            match ctx.wait(&mut st, &mut commands, &token).await {
                Wake::Dispose => break,
                Wake::Run => {}
            }

            st.status = PollStatus::Running;
            st.backoff = None;
            st.last_run_at = Some(SystemTime::now());
            st.last_run_mono = Some(Instant::now());
            ctx.push(&st);
            ctx.bus
                .publish(Event::new(EventKind::PollStarting).with_poller(ctx.id()));

            let validator = ctx.cache.validator(ctx.spec.id());
            let outcome = ctx.spec.operation().fetch(validator).await;

            // Disposed mid-flight: the result is discarded, not applied.
            if token.is_cancelled() {
                break;
            }
            ctx.apply(&mut st, outcome);
            ctx.drain(&mut st, &mut commands);
            if token.is_cancelled() {
                break;
            }
        }

        st.status = PollStatus::Disposed;
        st.backoff = None;
        ctx.push(&st);
    }
}

impl ActorCtx {
    fn id(&self) -> Arc<str> {
        self.spec.id_arc()
    }

    fn push(&self, st: &ActorState) {
        let _ = self.status.send_replace(st.snapshot());
    }

    /// Waits until the next run should start, handling commands and
    /// visibility transitions along the way.
    async fn wait(
        &self,
        st: &mut ActorState,
        commands: &mut mpsc::Receiver<Command>,
        token: &CancellationToken,
    ) -> Wake {
        'rearm: loop {
            if st.is_paused(self.spec.pause_when_hidden()) {
                if st.status != PollStatus::Paused {
                    st.status = PollStatus::Paused;
                    self.push(st);
                }
                tokio::select! {
                    _ = token.cancelled() => return Wake::Dispose,
                    cmd = commands.recv() => match cmd {
                        None => return Wake::Dispose,
                        Some(Command::Refresh) => {
                            st.error_paused = false;
                            st.client_errors = 0;
                            st.backoff = None;
                            return Wake::Run;
                        }
                        Some(Command::Pause) => {
                            st.hidden = true;
                        }
                        Some(Command::Resume) => {
                            st.hidden = false;
                            if !st.error_paused {
                                self.bus.publish(
                                    Event::new(EventKind::PollerResumed).with_poller(self.id()),
                                );
                                if st.overdue() {
                                    return Wake::Run;
                                }
                            }
                        }
                    }
                }
                continue 'rearm;
            }

            // Armed: a backoff delay if one is pending, otherwise the steady
            // interval (downshifted to max while the host is hidden).
            let delay = match st.backoff {
                Some(d) => d,
                None => {
                    let base = if st.hidden {
                        self.spec.max_interval()
                    } else {
                        st.interval
                    };
                    self.spec.jitter().apply(base)
                }
            };
            st.status = if st.backoff.is_some() {
                PollStatus::Backoff
            } else {
                PollStatus::Scheduled
            };
            self.push(st);

            let deadline = Instant::now() + delay;
            loop {
                tokio::select! {
                    _ = token.cancelled() => return Wake::Dispose,
                    _ = time::sleep_until(deadline) => return Wake::Run,
                    cmd = commands.recv() => match cmd {
                        None => return Wake::Dispose,
                        Some(Command::Refresh) => {
                            st.backoff = None;
                            st.client_errors = 0;
                            return Wake::Run;
                        }
                        Some(Command::Pause) => {
                            if !st.hidden {
                                st.hidden = true;
                                if self.spec.pause_when_hidden() {
                                    self.bus.publish(
                                        Event::new(EventKind::PollerPaused)
                                            .with_poller(self.id())
                                            .with_reason("hidden"),
                                    );
                                } else {
                                    self.bus.publish(
                                        Event::new(EventKind::PollerDownshifted)
                                            .with_poller(self.id())
                                            .with_interval(self.spec.max_interval()),
                                    );
                                }
                                continue 'rearm;
                            }
                        }
                        Some(Command::Resume) => {
                            if st.hidden {
                                st.hidden = false;
                                self.bus.publish(
                                    Event::new(EventKind::PollerResumed).with_poller(self.id()),
                                );
                                if st.overdue() {
                                    return Wake::Run;
                                }
                                continue 'rearm;
                            }
                        }
                    }
                }
            }
        }
    }

    /// Applies one run's outcome to the poller state.
    ///
    /// Every outcome moves exactly one of the two streak counters: failures
    /// on `Failed`, unchanged on `Unchanged` (and both reset when content
    /// actually changes).
    fn apply(&self, st: &mut ActorState, outcome: FetchOutcome) {
        match outcome {
            FetchOutcome::Changed {
                payload,
                validator,
                min_interval,
            } => {
                self.record_success(st, min_interval);
                match self.cache.record(self.spec.id(), validator, payload.clone()) {
                    Recorded::Fresh => {
                        st.unchanged = 0;
                        st.last_changed_at = st.last_success_at;
                        st.interval = apply_floor(
                            self.spec
                                .base_interval()
                                .clamp(self.spec.min_interval(), self.spec.max_interval()),
                            self.spec.max_interval(),
                            st.floor,
                        );
                        self.bus.publish(
                            Event::new(EventKind::PayloadChanged)
                                .with_poller(self.id())
                                .with_payload(payload)
                                .with_interval(st.interval),
                        );
                    }
                    Recorded::Identical => {
                        // The server re-sent a byte-identical body: an idle
                        // cycle in disguise. No change notification.
                        st.unchanged = st.unchanged.saturating_add(1);
                        self.lengthen(st);
                        self.bus.publish(
                            Event::new(EventKind::PayloadUnchanged)
                                .with_poller(self.id())
                                .with_interval(st.interval),
                        );
                    }
                }
                st.backoff = None;
            }
            FetchOutcome::Unchanged { min_interval } => {
                self.record_success(st, min_interval);
                st.unchanged = st.unchanged.saturating_add(1);
                self.cache.mark_unchanged(self.spec.id());
                self.lengthen(st);
                st.backoff = None;
                self.bus.publish(
                    Event::new(EventKind::PayloadUnchanged)
                        .with_poller(self.id())
                        .with_interval(st.interval),
                );
            }
            FetchOutcome::Failed(failure) => {
                let id = self.id();
                self.penalty.on_failure(&id);
                st.failures = st.failures.saturating_add(1);
                if failure.kind == FailureKind::ClientError {
                    st.client_errors = st.client_errors.saturating_add(1);
                } else {
                    st.client_errors = 0;
                }
                let reason: Arc<str> = Arc::from(failure.to_string());
                self.bus.publish(
                    Event::new(EventKind::PollFailed)
                        .with_poller(Arc::clone(&id))
                        .with_failures(st.failures)
                        .with_failure_kind(failure.kind)
                        .with_reason(Arc::clone(&reason)),
                );
                st.last_error = Some(failure);

                let parked = matches!(
                    self.cfg.client_error_pause(),
                    Some(n) if st.client_errors >= n
                );
                if parked {
                    st.error_paused = true;
                    st.backoff = None;
                    self.bus.publish(
                        Event::new(EventKind::PollerPaused)
                            .with_poller(id)
                            .with_reason("client-errors"),
                    );
                } else {
                    let cap = self.cfg.backoff_cap(self.spec.max_interval());
                    let delay = self.cfg.backoff().delay(
                        st.failures,
                        self.spec.base_interval(),
                        cap,
                        self.penalty.factor(),
                    );
                    let delay = self.spec.jitter().apply(delay);
                    st.backoff = Some(delay);
                    self.bus.publish(
                        Event::new(EventKind::BackoffScheduled)
                            .with_poller(id)
                            .with_failures(st.failures)
                            .with_delay(delay)
                            .with_reason(reason),
                    );
                }
            }
        }
        self.push(st);
    }

    fn record_success(&self, st: &mut ActorState, min_interval: Option<Duration>) {
        self.penalty.on_success();
        st.failures = 0;
        st.client_errors = 0;
        st.last_error = None;
        st.last_success_at = Some(SystemTime::now());
        if let Some(f) = min_interval {
            st.floor = Some(f);
        }
    }

    /// Lengthens the steady interval after an unchanged poll.
    fn lengthen(&self, st: &mut ActorState) {
        if self.spec.adaptive() {
            st.interval = self.cfg.growth().next_interval(
                st.interval,
                st.unchanged,
                self.spec.min_interval(),
                self.spec.max_interval(),
                st.floor,
            );
        } else {
            // Non-adaptive pollers hold their base cadence; an explicit
            // server floor is still honored.
            st.interval = apply_floor(self.spec.base_interval(), self.spec.max_interval(), st.floor);
        }
    }

    /// Absorbs commands that arrived while a run was in flight.
    ///
    /// Refreshes are coalesced — the run that just finished satisfies them.
    fn drain(&self, st: &mut ActorState, commands: &mut mpsc::Receiver<Command>) {
        while let Ok(cmd) = commands.try_recv() {
            match cmd {
                Command::Refresh => {}
                Command::Pause => {
                    if !st.hidden {
                        st.hidden = true;
                        if self.spec.pause_when_hidden() {
                            self.bus.publish(
                                Event::new(EventKind::PollerPaused)
                                    .with_poller(self.id())
                                    .with_reason("hidden"),
                            );
                        } else {
                            self.bus.publish(
                                Event::new(EventKind::PollerDownshifted)
                                    .with_poller(self.id())
                                    .with_interval(self.spec.max_interval()),
                            );
                        }
                    }
                }
                Command::Resume => {
                    if st.hidden {
                        st.hidden = false;
                        if !st.error_paused {
                            self.bus.publish(
                                Event::new(EventKind::PollerResumed).with_poller(self.id()),
                            );
                        }
                    }
                }
            }
        }
    }
}
