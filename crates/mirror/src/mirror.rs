//! Client-side view of the shared daily quota.
//!
//! [`QuotaMirror`] keeps a possibly-stale copy of the store's numbers, adds
//! the purely local "does this user have their own API key" flag, and runs
//! the reset countdown off a local timer so the UI can tick every second
//! without a network call.
//!
//! Failure policy:
//! - `refresh` failing keeps the last known numbers (stale but available).
//! - `check_and_consume` failing to get a verdict lets the action through
//!   (fail-open).

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use qg_domain::clock::{format_time_remaining, ms_until_next_midnight, Clock};
use qg_domain::config::{Config, MirrorConfig};
use qg_domain::error::{Error, Result};
use qg_domain::quota::{ConsumeOutcome, QuotaSnapshot};
use qg_domain::trace::TraceEvent;

use crate::backend::QuotaBackend;
use crate::credentials::ProviderCredentials;
use crate::{create_backend, quota_tz};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// What the UI renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotaView {
    pub used: u32,
    pub limit: u32,
    pub remaining: u32,
    /// `!has_bypass_credential && store says exhausted`.
    pub is_exhausted: bool,
    pub reset_in_ms: u64,
    /// `reset_in_ms` as `HH:MM:SS`.
    pub time_until_reset: String,
    pub has_bypass_credential: bool,
    /// Civil day of the last snapshot, if any.
    pub day: Option<String>,
    pub last_synced_at: Option<DateTime<Utc>>,
    /// The store's own verdict, before the local bypass override.
    #[serde(skip)]
    store_exhausted: bool,
}

impl QuotaView {
    fn initial(limit: u32, reset_in_ms: u64, has_bypass_credential: bool) -> Self {
        Self {
            used: 0,
            limit,
            remaining: limit,
            is_exhausted: false,
            reset_in_ms,
            time_until_reset: format_time_remaining(reset_in_ms),
            has_bypass_credential,
            day: None,
            last_synced_at: None,
            store_exhausted: false,
        }
    }

    fn merge(&mut self, snap: &QuotaSnapshot) {
        self.used = snap.used;
        self.limit = snap.limit;
        self.remaining = snap.remaining;
        self.store_exhausted = snap.is_exhausted;
        self.set_reset(snap.reset_in_ms);
        if !snap.day.is_empty() {
            self.day = Some(snap.day.clone());
        }
        self.last_synced_at = Some(Utc::now());
        self.apply_bypass();
    }

    fn set_reset(&mut self, ms: u64) {
        self.reset_in_ms = ms;
        self.time_until_reset = format_time_remaining(ms);
    }

    fn apply_bypass(&mut self) {
        self.is_exhausted = !self.has_bypass_credential && self.store_exhausted;
    }
}

/// Result of [`QuotaMirror::check_and_consume`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumeDecision {
    /// The user has their own key; the shared quota was not touched.
    Bypassed,
    /// One unit of the shared quota was taken.
    Granted,
    /// The backend could not be reached; allowed anyway.
    Unverified,
    /// The shared quota is used up.
    Denied { message: String, reset_in_ms: u64 },
}

impl ConsumeDecision {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, ConsumeDecision::Denied { .. })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// QuotaMirror
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct QuotaMirror {
    backend: Arc<dyn QuotaBackend>,
    credentials: ProviderCredentials,
    view: watch::Sender<QuotaView>,
    credentials_changed: Notify,
    call_timeout: Duration,
    tick_interval: Duration,
    refresh_interval: Duration,
}

impl QuotaMirror {
    /// Create the mirror.  Before the first sync the view shows a full
    /// quota of `limit` and a countdown computed locally from `tz`.
    pub fn new(
        backend: Arc<dyn QuotaBackend>,
        credentials: ProviderCredentials,
        cfg: &MirrorConfig,
        limit: u32,
        tz: Tz,
        clock: &dyn Clock,
    ) -> Self {
        let reset_in_ms = ms_until_next_midnight(clock.now(), tz);
        let initial = QuotaView::initial(limit, reset_in_ms, credentials.has_any_key());
        let (view, _) = watch::channel(initial);

        Self {
            backend,
            credentials,
            view,
            credentials_changed: Notify::new(),
            call_timeout: Duration::from_millis(cfg.timeout_ms),
            tick_interval: Duration::from_millis(cfg.tick_interval_ms.max(1)),
            refresh_interval: Duration::from_secs(cfg.refresh_interval_secs.max(1)),
        }
    }

    /// Build the backend named by `[mirror].backend` and wrap it.
    pub fn from_config(cfg: &Config, clock: Arc<dyn Clock>) -> Result<Self> {
        let tz = quota_tz(&cfg.quota)?;
        let backend = create_backend(cfg, clock.clone())?;
        let credentials = ProviderCredentials::new(&cfg.mirror.provider_config_path);
        Ok(Self::new(
            backend,
            credentials,
            &cfg.mirror,
            cfg.quota.daily_limit,
            tz,
            clock.as_ref(),
        ))
    }

    /// Current view.
    pub fn view(&self) -> QuotaView {
        self.view.borrow().clone()
    }

    /// Watch the view; the receiver is notified on every change.
    pub fn subscribe(&self) -> watch::Receiver<QuotaView> {
        self.view.subscribe()
    }

    /// Re-read the store and merge its numbers.  Never fails: on error the
    /// previous numbers stay in place.
    pub async fn refresh(&self) {
        let has_key = self.credentials.has_any_key();

        match self.call(self.backend.read()).await {
            Ok(snap) => {
                self.view.send_modify(|v| {
                    v.has_bypass_credential = has_key;
                    v.merge(&snap);
                });
                TraceEvent::QuotaSynced {
                    backend: self.backend.name().into(),
                    used: snap.used,
                    remaining: snap.remaining,
                    has_bypass_credential: has_key,
                }
                .emit();
            }
            Err(e) => {
                tracing::warn!(
                    backend = self.backend.name(),
                    transport = e.is_transport(),
                    error = %e,
                    "quota refresh failed, keeping last known state"
                );
                self.view.send_modify(|v| {
                    v.has_bypass_credential = has_key;
                    v.apply_bypass();
                });
            }
        }
    }

    /// Gate an AI-backed action.
    ///
    /// Users with their own key skip the shared quota without a network
    /// call.  Otherwise one unit is consumed; if the backend gives no
    /// verdict the action is allowed.
    pub async fn check_and_consume(&self) -> ConsumeDecision {
        let has_bypass = self.view.borrow().has_bypass_credential;
        if has_bypass {
            return ConsumeDecision::Bypassed;
        }

        match self.call(self.backend.consume(false)).await {
            Ok(ConsumeOutcome::Granted(snap)) => {
                self.view.send_modify(|v| v.merge(&snap));
                ConsumeDecision::Granted
            }
            Ok(ConsumeOutcome::Exhausted { snapshot, message }) => {
                self.view.send_modify(|v| v.merge(&snapshot));
                ConsumeDecision::Denied {
                    message,
                    reset_in_ms: snapshot.reset_in_ms,
                }
            }
            Ok(ConsumeOutcome::Bypassed) => ConsumeDecision::Bypassed,
            Err(e) => {
                tracing::warn!(
                    backend = self.backend.name(),
                    transport = e.is_transport(),
                    error = %e,
                    "quota consume failed, allowing action"
                );
                ConsumeDecision::Unverified
            }
        }
    }

    /// Advance the local countdown by one tick (floored at zero).
    ///
    /// Returns `true` on the tick that reaches zero, i.e. the day boundary.
    pub fn tick(&self) -> bool {
        let step = self.tick_interval.as_millis() as u64;
        let mut reached_zero = false;
        self.view.send_modify(|v| {
            let before = v.reset_in_ms;
            v.set_reset(before.saturating_sub(step));
            reached_zero = before > 0 && v.reset_in_ms == 0;
        });
        reached_zero
    }

    /// Re-check the provider config and re-apply the bypass override.  No
    /// network call.
    pub fn reload_credentials(&self) {
        let has_key = self.credentials.has_any_key();
        self.view.send_modify(|v| {
            v.has_bypass_credential = has_key;
            v.apply_bypass();
        });
        tracing::debug!(has_key, "provider credentials reloaded");
    }

    /// Tell a running mirror (see [`spawn`](Self::spawn)) that the provider
    /// config changed.
    pub fn credentials_changed(&self) {
        self.credentials_changed.notify_one();
    }

    /// Drive the mirror until `cancel` fires: refresh once, then tick the
    /// countdown, refresh periodically and at the day boundary, and react to
    /// credential changes.
    ///
    /// Refreshes run on their own task so a slow backend never stalls the
    /// countdown.  At most one is in flight; triggers that arrive meanwhile
    /// are dropped.
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(self.tick_interval);
            tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut refresh = tokio::time::interval(self.refresh_interval);
            refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // Both intervals fire immediately once; the initial refresh covers it.
            tick.tick().await;
            refresh.tick().await;

            let mut inflight = None;
            self.start_refresh(&mut inflight);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tick.tick() => {
                        if self.tick() {
                            self.start_refresh(&mut inflight);
                        }
                    }
                    _ = refresh.tick() => self.start_refresh(&mut inflight),
                    _ = self.credentials_changed.notified() => self.reload_credentials(),
                }
            }

            if let Some(handle) = inflight {
                handle.abort();
            }
            tracing::debug!("quota mirror stopped");
        })
    }

    // ── Private ──────────────────────────────────────────────────────

    fn start_refresh(self: &Arc<Self>, inflight: &mut Option<JoinHandle<()>>) {
        if inflight.as_ref().is_some_and(|h| !h.is_finished()) {
            tracing::debug!(backend = self.backend.name(), "refresh already in flight, skipping");
            return;
        }
        let mirror = Arc::clone(self);
        *inflight = Some(tokio::spawn(async move { mirror.refresh().await }));
    }

    async fn call<T>(&self, fut: impl std::future::Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(format!(
                "{} backend did not answer within {:?}",
                self.backend.name(),
                self.call_timeout
            ))),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use parking_lot::Mutex;
    use qg_domain::clock::ManualClock;
    use qg_domain::quota::{DailyCounter, EXHAUSTED_MESSAGE};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory backend whose answers the test controls.
    struct ScriptedBackend {
        counter: Mutex<DailyCounter>,
        limit: u32,
        reset_in_ms: u64,
        offline: Mutex<bool>,
        hang: Mutex<bool>,
        deny_message: Mutex<Option<String>>,
        consume_calls: AtomicUsize,
        reads: AtomicUsize,
    }

    impl ScriptedBackend {
        fn new(used: u32, limit: u32) -> Arc<Self> {
            Arc::new(Self {
                counter: Mutex::new(DailyCounter {
                    date: "2024-06-15".parse().unwrap(),
                    count: used,
                }),
                limit,
                reset_in_ms: 5_000,
                offline: Mutex::new(false),
                hang: Mutex::new(false),
                deny_message: Mutex::new(None),
                consume_calls: AtomicUsize::new(0),
                reads: AtomicUsize::new(0),
            })
        }

        async fn gate(&self) -> Result<()> {
            let hang = *self.hang.lock();
            if hang {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            let offline = *self.offline.lock();
            if offline {
                return Err(Error::Http("connection refused".into()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl QuotaBackend for ScriptedBackend {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn read(&self) -> Result<QuotaSnapshot> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.gate().await?;
            Ok(QuotaSnapshot::new(&self.counter.lock(), self.limit, self.reset_in_ms))
        }

        async fn consume(&self, has_own_credential: bool) -> Result<ConsumeOutcome> {
            self.consume_calls.fetch_add(1, Ordering::SeqCst);
            self.gate().await?;
            if has_own_credential {
                return Ok(ConsumeOutcome::Bypassed);
            }
            let mut counter = self.counter.lock();
            if counter.try_consume(self.limit) {
                Ok(ConsumeOutcome::Granted(QuotaSnapshot::new(&counter, self.limit, self.reset_in_ms)))
            } else {
                let snapshot = QuotaSnapshot::new(&counter, self.limit, self.reset_in_ms);
                Ok(match self.deny_message.lock().clone() {
                    Some(message) => ConsumeOutcome::Exhausted { snapshot, message },
                    None => ConsumeOutcome::exhausted(snapshot),
                })
            }
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        creds_path: std::path::PathBuf,
        backend: Arc<ScriptedBackend>,
        mirror: Arc<QuotaMirror>,
    }

    fn fixture(used: u32, limit: u32, cfg: MirrorConfig) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let creds_path = dir.path().join("model-configs.json");
        let backend = ScriptedBackend::new(used, limit);
        // 23:00 in Taipei: one hour to the boundary.
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 15, 15, 0, 0).unwrap());
        let mirror = Arc::new(QuotaMirror::new(
            backend.clone(),
            ProviderCredentials::new(&creds_path),
            &cfg,
            limit,
            chrono_tz::Asia::Taipei,
            &clock,
        ));
        Fixture {
            _dir: dir,
            creds_path,
            backend,
            mirror,
        }
    }

    fn write_key(f: &Fixture, key: &str) {
        let body = serde_json::json!({ "openai": { "apiKey": key } });
        std::fs::write(&f.creds_path, body.to_string()).unwrap();
    }

    #[test]
    fn initial_view_uses_local_countdown() {
        let f = fixture(0, 20, MirrorConfig::default());
        let v = f.mirror.view();
        assert_eq!(v.remaining, 20);
        assert_eq!(v.reset_in_ms, 3_600_000);
        assert_eq!(v.time_until_reset, "01:00:00");
        assert!(v.last_synced_at.is_none());
    }

    #[tokio::test]
    async fn refresh_merges_store_numbers() {
        let f = fixture(7, 20, MirrorConfig::default());
        f.mirror.refresh().await;
        let v = f.mirror.view();
        assert_eq!(v.used, 7);
        assert_eq!(v.remaining, 13);
        assert_eq!(v.reset_in_ms, 5_000);
        assert_eq!(v.time_until_reset, "00:00:05");
        assert_eq!(v.day.as_deref(), Some("2024-06-15"));
        assert!(v.last_synced_at.is_some());
    }

    #[tokio::test]
    async fn refresh_failure_keeps_previous_numbers() {
        let f = fixture(7, 20, MirrorConfig::default());
        f.mirror.refresh().await;
        let before = f.mirror.view();

        *f.backend.offline.lock() = true;
        f.backend.counter.lock().count = 12;
        f.mirror.refresh().await;

        let after = f.mirror.view();
        assert_eq!(after.remaining, before.remaining);
        assert_eq!(after.used, 7);
    }

    #[tokio::test]
    async fn own_key_overrides_store_exhaustion() {
        let f = fixture(20, 20, MirrorConfig::default());
        f.mirror.refresh().await;
        assert!(f.mirror.view().is_exhausted);

        write_key(&f, "sk-live");
        f.mirror.refresh().await;
        let v = f.mirror.view();
        assert!(v.has_bypass_credential);
        assert!(!v.is_exhausted);
        assert_eq!(v.remaining, 0);
    }

    #[tokio::test]
    async fn bypass_skips_the_backend() {
        let f = fixture(0, 20, MirrorConfig::default());
        write_key(&f, "sk-live");
        f.mirror.reload_credentials();

        assert_eq!(f.mirror.check_and_consume().await, ConsumeDecision::Bypassed);
        assert_eq!(f.backend.consume_calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.backend.counter.lock().count, 0);
    }

    #[tokio::test]
    async fn grants_then_denies_at_the_limit() {
        let f = fixture(18, 20, MirrorConfig::default());
        assert_eq!(f.mirror.check_and_consume().await, ConsumeDecision::Granted);
        assert_eq!(f.mirror.view().remaining, 1);
        assert_eq!(f.mirror.check_and_consume().await, ConsumeDecision::Granted);
        assert!(f.mirror.view().is_exhausted);

        match f.mirror.check_and_consume().await {
            ConsumeDecision::Denied { message, reset_in_ms } => {
                assert_eq!(message, EXHAUSTED_MESSAGE);
                assert_eq!(reset_in_ms, 5_000);
            }
            other => panic!("expected Denied, got {other:?}"),
        }
        let v = f.mirror.view();
        assert_eq!(v.used, 20);
        assert_eq!(v.remaining, 0);
        assert!(v.is_exhausted);
    }

    #[tokio::test]
    async fn transport_error_fails_open() {
        let f = fixture(20, 20, MirrorConfig::default());
        *f.backend.offline.lock() = true;
        let decision = f.mirror.check_and_consume().await;
        assert_eq!(decision, ConsumeDecision::Unverified);
        assert!(decision.is_allowed());
    }

    #[tokio::test]
    async fn slow_backend_times_out_and_fails_open() {
        let cfg = MirrorConfig {
            timeout_ms: 50,
            ..MirrorConfig::default()
        };
        let f = fixture(0, 20, cfg);
        *f.backend.hang.lock() = true;
        assert_eq!(f.mirror.check_and_consume().await, ConsumeDecision::Unverified);

        // Refresh times out too and leaves the view alone.
        let before = f.mirror.view();
        f.mirror.refresh().await;
        assert_eq!(f.mirror.view().remaining, before.remaining);
    }

    #[tokio::test]
    async fn tick_counts_down_and_floors_at_zero() {
        let f = fixture(0, 20, MirrorConfig::default());
        f.mirror.refresh().await; // reset_in_ms = 5000

        for expected in ["00:00:04", "00:00:03", "00:00:02", "00:00:01"] {
            assert!(!f.mirror.tick());
            assert_eq!(f.mirror.view().time_until_reset, expected);
        }
        assert!(f.mirror.tick(), "reaching zero is reported once");
        assert!(!f.mirror.tick());
        let v = f.mirror.view();
        assert_eq!(v.reset_in_ms, 0);
        assert_eq!(v.time_until_reset, "00:00:00");
    }

    #[tokio::test]
    async fn credential_change_flips_exhaustion_without_network() {
        let f = fixture(20, 20, MirrorConfig::default());
        f.mirror.refresh().await;
        assert!(f.mirror.view().is_exhausted);

        *f.backend.offline.lock() = true;
        write_key(&f, "sk-live");
        f.mirror.reload_credentials();
        assert!(!f.mirror.view().is_exhausted);

        write_key(&f, "");
        f.mirror.reload_credentials();
        assert!(f.mirror.view().is_exhausted);
    }

    #[tokio::test]
    async fn spawned_driver_syncs_reacts_and_stops() {
        let cfg = MirrorConfig {
            tick_interval_ms: 10,
            ..MirrorConfig::default()
        };
        let f = fixture(20, 20, cfg);
        let mut rx = f.mirror.subscribe();
        let cancel = CancellationToken::new();
        let handle = f.mirror.clone().spawn(cancel.clone());

        // Initial refresh lands.
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                rx.changed().await.unwrap();
                if rx.borrow().last_synced_at.is_some() {
                    break;
                }
            }
        })
        .await
        .unwrap();
        assert!(f.mirror.view().is_exhausted);

        write_key(&f, "sk-live");
        f.mirror.credentials_changed();
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                rx.changed().await.unwrap();
                if rx.borrow().has_bypass_credential {
                    break;
                }
            }
        })
        .await
        .unwrap();
        assert!(!f.mirror.view().is_exhausted);

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn denial_carries_the_store_message() {
        let f = fixture(20, 20, MirrorConfig::default());
        *f.backend.deny_message.lock() = Some("Shared quota closed for maintenance".into());
        match f.mirror.check_and_consume().await {
            ConsumeDecision::Denied { message, .. } => {
                assert_eq!(message, "Shared quota closed for maintenance");
            }
            other => panic!("expected Denied, got {other:?}"),
        }
    }

    #[test]
    fn initial_view_uses_the_given_limit() {
        let f = fixture(0, 5, MirrorConfig::default());
        let v = f.mirror.view();
        assert_eq!(v.limit, 5);
        assert_eq!(v.remaining, 5);
    }

    async fn wait_for_first_sync(rx: &mut watch::Receiver<QuotaView>) {
        loop {
            let synced = rx.borrow_and_update().last_synced_at.is_some();
            if synced {
                break;
            }
            rx.changed().await.unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_keeps_ticking_while_refresh_hangs() {
        let cfg = MirrorConfig {
            timeout_ms: 60_000,
            ..MirrorConfig::default()
        };
        let f = fixture(0, 20, cfg);
        *f.backend.hang.lock() = true;
        let cancel = CancellationToken::new();
        let handle = f.mirror.clone().spawn(cancel.clone());

        tokio::time::sleep(Duration::from_millis(3_500)).await;
        let v = f.mirror.view();
        assert_eq!(f.backend.reads.load(Ordering::SeqCst), 1);
        assert!(v.last_synced_at.is_none());
        assert_eq!(v.reset_in_ms, 3_600_000 - 3_000);
        assert_eq!(v.time_until_reset, "00:59:57");

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_reaching_zero_triggers_a_refresh() {
        let f = fixture(20, 20, MirrorConfig::default());
        let mut rx = f.mirror.subscribe();
        let cancel = CancellationToken::new();
        let handle = f.mirror.clone().spawn(cancel.clone());

        wait_for_first_sync(&mut rx).await;
        assert!(f.mirror.view().is_exhausted);
        assert_eq!(f.backend.reads.load(Ordering::SeqCst), 1);

        // The store rolls over to a new day.
        f.backend.counter.lock().count = 0;
        // reset_in_ms is 5000 and the tick is 1s: zero is reached at 5s.
        tokio::time::sleep(Duration::from_millis(5_500)).await;

        assert_eq!(f.backend.reads.load(Ordering::SeqCst), 2);
        let v = f.mirror.view();
        assert!(!v.is_exhausted);
        assert_eq!(v.remaining, 20);
        assert_eq!(v.reset_in_ms, 5_000);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_refresh_picks_up_other_users_consumption() {
        let cfg = MirrorConfig {
            // Long enough that the countdown never reaches zero here.
            tick_interval_ms: 60_000,
            refresh_interval_secs: 30,
            ..MirrorConfig::default()
        };
        let f = fixture(3, 20, cfg);
        let mut rx = f.mirror.subscribe();
        let cancel = CancellationToken::new();
        let handle = f.mirror.clone().spawn(cancel.clone());

        wait_for_first_sync(&mut rx).await;
        assert_eq!(f.mirror.view().used, 3);

        f.backend.counter.lock().count = 11;
        tokio::time::sleep(Duration::from_secs(29)).await;
        assert_eq!(f.mirror.view().used, 3);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(f.backend.reads.load(Ordering::SeqCst), 2);
        let v = f.mirror.view();
        assert_eq!(v.used, 11);
        assert_eq!(v.remaining, 9);

        cancel.cancel();
        handle.await.unwrap();
    }
}
