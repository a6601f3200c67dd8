//! Host-side registry of mounted countdowns

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::Instant,
};
use chrono::{DateTime, Utc};
use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use super::{CountdownDuration, CountdownSnapshot, TimeLeft};
use crate::{
    engine::{CountdownDriver, EngineContext, ExpireCallback},
    error::{CountdownError, Result},
    tasks::{countdown_ticker_task, TickerControl},
};

/// One running ticker and the handles to talk to it
#[derive(Debug)]
struct MountedTimer {
    duration: CountdownDuration,
    snapshot_rx: watch::Receiver<CountdownSnapshot>,
    control_tx: mpsc::UnboundedSender<TickerControl>,
    handle: JoinHandle<()>,
}

/// Main application state: engine collaborators plus every mounted timer
pub struct AppState {
    /// Store, clock and audio shared by all timers
    pub context: EngineContext,
    timers: Mutex<HashMap<String, MountedTimer>>,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    pub last_action: Arc<Mutex<Option<String>>>,
    pub last_action_time: Arc<Mutex<Option<DateTime<Utc>>>>,
    /// Number of countdowns that reached zero since start
    pub expirations: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(port: u16, host: String, context: EngineContext) -> Self {
        Self {
            context,
            timers: Mutex::new(HashMap::new()),
            start_time: Instant::now(),
            port,
            host,
            last_action: Arc::new(Mutex::new(None)),
            last_action_time: Arc::new(Mutex::new(None)),
            expirations: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Mount a countdown under `key`, resuming its stored deadline if any
    ///
    /// Mounting a key that is already counting down returns its current
    /// snapshot and leaves the ticker alone. A key whose countdown has expired
    /// is replaced by a fresh mount, which starts a new window.
    pub fn mount(&self, key: &str, duration: CountdownDuration) -> Result<CountdownSnapshot> {
        let mut timers = self
            .timers
            .lock()
            .map_err(|_| CountdownError::LockPoisoned("timer registry"))?;

        if let Some(existing) = timers.get(key) {
            let expired = existing.snapshot_rx.borrow().is_expired;
            if !existing.handle.is_finished() && !expired {
                return Ok(existing.snapshot_rx.borrow().clone());
            }
            if !expired {
                warn!("Ticker for {} stopped unexpectedly, remounting", key);
            }
        }
        if let Some(previous) = timers.remove(key) {
            // An expired ticker only idles, so it can be dropped without waiting
            let _ = previous.control_tx.send(TickerControl::Unmount);
            previous.handle.abort();
            debug!("Dropped previous ticker for {}", key);
        }

        let driver = CountdownDriver::mount(
            key,
            duration,
            self.context.clone(),
            Some(self.expire_callback()),
        )?;
        let initial = driver.peek();
        let (snapshot_tx, snapshot_rx) = watch::channel(initial.clone());
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(countdown_ticker_task(driver, snapshot_tx, control_rx));

        timers.insert(
            key.to_string(),
            MountedTimer {
                duration,
                snapshot_rx,
                control_tx,
                handle,
            },
        );
        drop(timers);

        self.record_action(&format!("mount:{}", key));
        Ok(initial)
    }

    /// Latest published snapshot for `key`
    pub fn snapshot(&self, key: &str) -> Result<CountdownSnapshot> {
        let timers = self
            .timers
            .lock()
            .map_err(|_| CountdownError::LockPoisoned("timer registry"))?;
        timers
            .get(key)
            .map(|timer| timer.snapshot_rx.borrow().clone())
            .ok_or_else(|| CountdownError::TimerNotFound(key.to_string()))
    }

    /// Snapshots of every mounted timer, ordered by key
    pub fn list(&self) -> Result<Vec<CountdownSnapshot>> {
        let timers = self
            .timers
            .lock()
            .map_err(|_| CountdownError::LockPoisoned("timer registry"))?;
        let mut snapshots: Vec<CountdownSnapshot> = timers
            .values()
            .map(|timer| timer.snapshot_rx.borrow().clone())
            .collect();
        snapshots.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(snapshots)
    }

    /// Close the modal currently shown for `key`
    pub async fn dismiss(&self, key: &str) -> Result<CountdownSnapshot> {
        let control_tx = self.control_for(key)?;
        let (reply_tx, reply_rx) = oneshot::channel();

        if control_tx.send(TickerControl::Dismiss(reply_tx)).is_err() {
            return Err(CountdownError::TimerNotFound(key.to_string()));
        }
        let snapshot = reply_rx
            .await
            .map_err(|_| CountdownError::TimerNotFound(key.to_string()))?;

        self.record_action(&format!("dismiss:{}", key));
        Ok(snapshot)
    }

    /// Stop the ticker for `key`; no tick runs after this returns
    pub async fn unmount(&self, key: &str) -> Result<()> {
        let timer = {
            let mut timers = self
                .timers
                .lock()
                .map_err(|_| CountdownError::LockPoisoned("timer registry"))?;
            timers
                .remove(key)
                .ok_or_else(|| CountdownError::TimerNotFound(key.to_string()))?
        };

        stop(key, timer).await;
        self.record_action(&format!("unmount:{}", key));
        Ok(())
    }

    /// Stop every ticker, used on shutdown
    pub async fn unmount_all(&self) {
        let drained: Vec<(String, MountedTimer)> = match self.timers.lock() {
            Ok(mut timers) => timers.drain().collect(),
            Err(_) => {
                warn!("Timer registry lock poisoned, skipping unmount");
                return;
            }
        };

        for (key, timer) in drained {
            stop(&key, timer).await;
        }
        info!("All timers unmounted");
    }

    /// Throw away the deadline for `key` and start a brand-new window
    pub async fn restart(&self, key: &str) -> Result<CountdownSnapshot> {
        let duration = {
            let timers = self
                .timers
                .lock()
                .map_err(|_| CountdownError::LockPoisoned("timer registry"))?;
            timers
                .get(key)
                .map(|timer| timer.duration)
                .ok_or_else(|| CountdownError::TimerNotFound(key.to_string()))?
        };

        self.unmount(key).await?;
        self.context.store.clear(key);
        let snapshot = self.mount(key, duration)?;

        info!("Timer {} restarted with a {}s window", key, duration.as_secs());
        self.record_action(&format!("restart:{}", key));
        Ok(snapshot)
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let left = TimeLeft::from_seconds(self.start_time.elapsed().as_secs());

        if left.hours > 0 {
            format!("{}h {}m {}s", left.hours, left.minutes, left.seconds)
        } else if left.minutes > 0 {
            format!("{}m {}s", left.minutes, left.seconds)
        } else {
            format!("{}s", left.seconds)
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }

    fn record_action(&self, action: &str) {
        record_action(&self.last_action, &self.last_action_time, action);
    }

    fn control_for(&self, key: &str) -> Result<mpsc::UnboundedSender<TickerControl>> {
        let timers = self
            .timers
            .lock()
            .map_err(|_| CountdownError::LockPoisoned("timer registry"))?;
        timers
            .get(key)
            .map(|timer| timer.control_tx.clone())
            .ok_or_else(|| CountdownError::TimerNotFound(key.to_string()))
    }

    /// Expiry hook handed to each driver: records the expiry as the last action
    fn expire_callback(&self) -> ExpireCallback {
        let last_action = Arc::clone(&self.last_action);
        let last_action_time = Arc::clone(&self.last_action_time);
        let expirations = Arc::clone(&self.expirations);

        Arc::new(move |key: &str| {
            expirations.fetch_add(1, Ordering::SeqCst);
            record_action(&last_action, &last_action_time, &format!("expired:{}", key));
        })
    }
}

fn record_action(
    last_action: &Mutex<Option<String>>,
    last_action_time: &Mutex<Option<DateTime<Utc>>>,
    action: &str,
) {
    if let Ok(mut last_action) = last_action.lock() {
        *last_action = Some(action.to_string());
    }
    if let Ok(mut last_time) = last_action_time.lock() {
        *last_time = Some(Utc::now());
    }
}

async fn stop(key: &str, timer: MountedTimer) {
    // The task may already be gone; awaiting the handle covers both cases
    let _ = timer.control_tx.send(TickerControl::Unmount);
    if let Err(e) = timer.handle.await {
        warn!("Ticker for {} ended abnormally: {}", key, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        audio::Muted,
        clock::ManualClock,
        state::Modal,
        store::{DeadlineStore, MemoryStore},
    };
    use chrono::TimeZone;

    fn app(clock: &ManualClock, store: Arc<MemoryStore>) -> AppState {
        AppState::new(
            0,
            "127.0.0.1".to_string(),
            EngineContext {
                store,
                clock: Arc::new(clock.clone()),
                audio: Arc::new(Muted),
            },
        )
    }

    fn clock() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap())
    }

    fn secs(n: u64) -> CountdownDuration {
        CountdownDuration::from_secs(n).unwrap()
    }

    #[tokio::test]
    async fn mount_is_idempotent_per_key() {
        let clock = clock();
        let state = app(&clock, Arc::new(MemoryStore::new()));

        let first = state.mount("timerState", secs(7200)).unwrap();
        let again = state.mount("timerState", secs(60)).unwrap();

        assert_eq!(first.deadline_at, again.deadline_at);
        assert_eq!(state.list().unwrap().len(), 1);
        state.unmount_all().await;
    }

    #[tokio::test]
    async fn two_keys_run_independently() {
        let clock = clock();
        let state = app(&clock, Arc::new(MemoryStore::new()));

        let bunker = state.mount("timerState", secs(7200)).unwrap();
        let services = state.mount("countdownEndTime", secs(86_400)).unwrap();

        assert_eq!(bunker.remaining_seconds, 7200);
        assert_eq!(services.remaining_seconds, 86_400);

        let keys: Vec<String> = state.list().unwrap().into_iter().map(|s| s.key).collect();
        assert_eq!(keys, vec!["countdownEndTime", "timerState"]);
        state.unmount_all().await;
    }

    #[tokio::test]
    async fn restart_starts_fresh_window() {
        let clock = clock();
        let store = Arc::new(MemoryStore::new());
        let state = app(&clock, Arc::clone(&store));

        let before = state.mount("t", secs(7200)).unwrap();
        clock.advance_secs(600);
        let after = state.restart("t").await.unwrap();

        assert_ne!(before.deadline_at, after.deadline_at);
        assert_eq!(after.remaining_seconds, 7200);
        assert_eq!(
            store.load("t").map(|d| d.deadline_at()),
            Some(after.deadline_at)
        );
        assert_eq!(state.get_last_action().0.as_deref(), Some("restart:t"));
        state.unmount_all().await;
    }

    #[tokio::test]
    async fn expiry_is_recorded_and_dismissable() {
        let clock = clock();
        let store = Arc::new(MemoryStore::new());
        let state = app(&clock, Arc::clone(&store));

        state.mount("t", secs(5)).unwrap();
        clock.advance_secs(5);

        let mut rx = {
            let timers = state.timers.lock().unwrap();
            timers.get("t").unwrap().snapshot_rx.clone()
        };
        rx.wait_for(|s| s.is_expired).await.unwrap();

        assert_eq!(state.expirations.load(Ordering::SeqCst), 1);
        assert_eq!(state.get_last_action().0.as_deref(), Some("expired:t"));
        assert_eq!(store.load("t"), None);
        assert_eq!(state.snapshot("t").unwrap().modal, Some(Modal::TimeUp));

        let dismissed = state.dismiss("t").await.unwrap();
        assert_eq!(dismissed.modal, None);
        state.unmount_all().await;
    }

    #[tokio::test]
    async fn mounting_after_expiry_starts_new_window() {
        let clock = clock();
        let store = Arc::new(MemoryStore::new());
        let state = app(&clock, Arc::clone(&store));

        let first = state.mount("t", secs(5)).unwrap();
        clock.advance_secs(5);

        let mut rx = {
            let timers = state.timers.lock().unwrap();
            timers.get("t").unwrap().snapshot_rx.clone()
        };
        rx.wait_for(|s| s.is_expired).await.unwrap();
        assert_eq!(store.load("t"), None);

        let second = state.mount("t", secs(5)).unwrap();

        assert!(!second.is_expired);
        assert_eq!(second.remaining_seconds, 5);
        assert_ne!(second.deadline_at, first.deadline_at);
        assert_eq!(
            store.load("t").map(|d| d.deadline_at()),
            Some(second.deadline_at)
        );
        assert_eq!(state.list().unwrap().len(), 1);
        state.unmount_all().await;
    }

    #[tokio::test]
    async fn unknown_key_is_not_found() {
        let clock = clock();
        let state = app(&clock, Arc::new(MemoryStore::new()));

        assert!(matches!(
            state.snapshot("missing"),
            Err(CountdownError::TimerNotFound(_))
        ));
        assert!(matches!(
            state.unmount("missing").await,
            Err(CountdownError::TimerNotFound(_))
        ));
        assert!(matches!(
            state.restart("missing").await,
            Err(CountdownError::TimerNotFound(_))
        ));
    }

    #[tokio::test]
    async fn unmount_removes_timer_but_keeps_deadline() {
        let clock = clock();
        let store = Arc::new(MemoryStore::new());
        let state = app(&clock, Arc::clone(&store));

        let mounted = state.mount("t", secs(7200)).unwrap();
        state.unmount("t").await.unwrap();

        assert!(state.list().unwrap().is_empty());
        assert_eq!(
            store.load("t").map(|d| d.deadline_at()),
            Some(mounted.deadline_at)
        );
    }
}
