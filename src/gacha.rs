//! Horse gacha: a short randomized spin over a list of names.
//!
//! While rolling, a tick timer picks a random name every `tick`; a duration
//! timer ends the spin after `duration`, leaving the last pick displayed as
//! the result. Both timers live in a single task owned by the animator.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::Rng;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tracing::debug;

use crate::config::GachaConfig;
use crate::error::GachaError;

/// Observable animator state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub rolling: bool,
    /// Name currently displayed; `None` until the first tick of the first spin
    pub current: Option<String>,
    /// Ticks fired during the latest spin
    pub ticks: u32,
}

struct Inner {
    /// Bumped on every start and cancel; a spin only writes under its own generation
    generation: u64,
    snapshot: Snapshot,
}

struct Shared {
    inner: Mutex<Inner>,
    notify: watch::Sender<Snapshot>,
}

impl Shared {
    /// Apply `f` if `generation` is still current. Returns false for a stale spin.
    fn update(&self, generation: u64, f: impl FnOnce(&mut Snapshot)) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.generation != generation {
            return false;
        }
        f(&mut inner.snapshot);
        self.notify.send_replace(inner.snapshot.clone());
        true
    }

    fn snapshot(&self) -> Snapshot {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).snapshot.clone()
    }
}

/// Selection animator with exclusive ownership of its timers
pub struct SelectionAnimator {
    shared: Arc<Shared>,
    tick: Duration,
    duration: Duration,
    task: Option<JoinHandle<()>>,
}

impl SelectionAnimator {
    /// Rejects a zero `tick` and a `duration` shorter than `tick`
    pub fn new(tick: Duration, duration: Duration) -> Result<Self, GachaError> {
        if tick.is_zero() || duration < tick {
            return Err(GachaError::InvalidTiming);
        }

        let (notify, _) = watch::channel(Snapshot::default());
        Ok(Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    generation: 0,
                    snapshot: Snapshot::default(),
                }),
                notify,
            }),
            tick,
            duration,
            task: None,
        })
    }

    pub fn from_config(config: &GachaConfig) -> Result<Self, GachaError> {
        Self::new(
            Duration::from_millis(config.tick_ms),
            Duration::from_millis(config.duration_ms),
        )
    }

    /// Start a spin over `entrants`.
    ///
    /// Rejects an empty list and a start while a spin is running; in both
    /// cases the current state is left untouched.
    pub fn start(&mut self, entrants: Vec<String>) -> Result<(), GachaError> {
        if entrants.is_empty() {
            return Err(GachaError::EmptyEntrants);
        }

        let generation = {
            let mut inner = self.shared.inner.lock().unwrap_or_else(|e| e.into_inner());
            if inner.snapshot.rolling {
                return Err(GachaError::AlreadyRolling);
            }
            inner.generation += 1;
            inner.snapshot.rolling = true;
            inner.snapshot.ticks = 0;
            self.shared.notify.send_replace(inner.snapshot.clone());
            inner.generation
        };

        debug!(entrants = entrants.len(), generation, "Gacha started");

        // The previous spin has already finished; its handle is just dropped
        self.task = Some(tokio::spawn(spin(
            Arc::clone(&self.shared),
            generation,
            entrants,
            self.tick,
            self.duration,
        )));

        Ok(())
    }

    /// Stop a running spin, keeping the name on display
    pub fn cancel(&mut self) {
        {
            let mut inner = self.shared.inner.lock().unwrap_or_else(|e| e.into_inner());
            inner.generation += 1;
            if inner.snapshot.rolling {
                inner.snapshot.rolling = false;
                self.shared.notify.send_replace(inner.snapshot.clone());
            }
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn current(&self) -> Option<String> {
        self.shared.snapshot().current
    }

    pub fn snapshot(&self) -> Snapshot {
        self.shared.snapshot()
    }

    /// Receive every state change
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.shared.notify.subscribe()
    }

    /// Wait for the running spin (if any) to end and return the settled name
    pub async fn settled(&self) -> Option<String> {
        let mut rx = self.subscribe();
        let settled = match rx.wait_for(|s| !s.rolling).await {
            Ok(snapshot) => snapshot.current.clone(),
            Err(_) => self.current(),
        };
        settled
    }
}

impl Drop for SelectionAnimator {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn spin(shared: Arc<Shared>, generation: u64, entrants: Vec<String>, tick: Duration, duration: Duration) {
    let start = Instant::now();
    let max_ticks = u32::try_from(duration.as_millis() / tick.as_millis().max(1)).unwrap_or(u32::MAX);

    let mut ticker = interval_at(start + tick, tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let deadline = sleep(duration);
    tokio::pin!(deadline);

    let mut ticks = 0;
    loop {
        tokio::select! {
            // A tick due at the same instant as the deadline still counts
            biased;
            _ = ticker.tick(), if ticks < max_ticks => {
                ticks += 1;
                let index = rand::thread_rng().gen_range(0..entrants.len());
                let picked = entrants[index].clone();
                let live = shared.update(generation, |s| {
                    s.current = Some(picked);
                    s.ticks = ticks;
                });
                if !live {
                    return;
                }
            }
            _ = &mut deadline => {
                shared.update(generation, |s| s.rolling = false);
                debug!(generation, ticks, "Gacha settled");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Vec<String> {
        vec!["A".to_string(), "B".to_string(), "C".to_string()]
    }

    fn animator() -> SelectionAnimator {
        SelectionAnimator::from_config(&GachaConfig::default()).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_spin_settles_after_duration() {
        let mut gacha = animator();
        gacha.start(names()).unwrap();
        assert!(gacha.snapshot().rolling);

        sleep(Duration::from_millis(2001)).await;

        let snapshot = gacha.snapshot();
        assert!(!snapshot.rolling);
        assert_eq!(snapshot.ticks, 20);
        let settled = snapshot.current.unwrap();
        assert!(names().contains(&settled));

        // Nothing ticks once the spin is over
        sleep(Duration::from_secs(5)).await;
        assert_eq!(gacha.snapshot().ticks, 20);
        assert_eq!(gacha.current(), Some(settled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_follow_interval() {
        let mut gacha = animator();
        gacha.start(names()).unwrap();

        assert_eq!(gacha.snapshot().ticks, 0);
        assert_eq!(gacha.current(), None);

        sleep(Duration::from_millis(350)).await;
        assert_eq!(gacha.snapshot().ticks, 3);
        assert!(gacha.snapshot().rolling);
        assert!(gacha.current().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_entrants_rejected() {
        let mut gacha = animator();
        assert_eq!(gacha.start(Vec::new()), Err(GachaError::EmptyEntrants));
        assert_eq!(gacha.snapshot(), Snapshot::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_while_rolling_rejected() {
        let mut gacha = animator();
        gacha.start(names()).unwrap();

        sleep(Duration::from_millis(500)).await;
        assert_eq!(gacha.start(vec!["D".to_string()]), Err(GachaError::AlreadyRolling));

        // The original spin keeps its own schedule; no second ticker runs
        sleep(Duration::from_millis(1600)).await;
        let snapshot = gacha.snapshot();
        assert!(!snapshot.rolling);
        assert_eq!(snapshot.ticks, 20);
        assert_ne!(snapshot.current.as_deref(), Some("D"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_settle() {
        let mut gacha = animator();
        gacha.start(names()).unwrap();
        assert!(gacha.settled().await.is_some());

        gacha.start(vec!["D".to_string()]).unwrap();
        assert!(gacha.snapshot().rolling);
        assert_eq!(gacha.snapshot().ticks, 0);
        assert_eq!(gacha.settled().await.as_deref(), Some("D"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_timers() {
        let mut gacha = animator();
        gacha.start(names()).unwrap();

        sleep(Duration::from_millis(550)).await;
        gacha.cancel();
        let stopped = gacha.snapshot();
        assert!(!stopped.rolling);
        assert_eq!(stopped.ticks, 5);

        sleep(Duration::from_secs(3)).await;
        assert_eq!(gacha.snapshot(), stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_while_rolling() {
        let mut gacha = animator();
        let rx = gacha.subscribe();
        gacha.start(names()).unwrap();

        sleep(Duration::from_millis(250)).await;
        drop(gacha);
        let at_drop = rx.borrow().clone();
        assert!(!at_drop.rolling);
        assert_eq!(at_drop.ticks, 2);

        sleep(Duration::from_secs(3)).await;
        assert_eq!(*rx.borrow(), at_drop);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_entrant() {
        let mut gacha = animator();
        gacha.start(vec!["ハルウララ".to_string()]).unwrap();
        assert_eq!(gacha.settled().await.as_deref(), Some("ハルウララ"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_timing_rejected() {
        assert!(matches!(
            SelectionAnimator::new(Duration::ZERO, Duration::from_millis(2000)),
            Err(GachaError::InvalidTiming)
        ));
        assert!(matches!(
            SelectionAnimator::new(Duration::from_millis(100), Duration::from_millis(50)),
            Err(GachaError::InvalidTiming)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_equal_to_duration() {
        let mut gacha = SelectionAnimator::new(Duration::from_millis(100), Duration::from_millis(100)).unwrap();
        gacha.start(names()).unwrap();

        let settled = tokio::time::timeout(Duration::from_secs(10), gacha.settled()).await.unwrap();
        assert!(settled.is_some());
        assert_eq!(gacha.snapshot().ticks, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_duration_tick_cap() {
        let mut gacha = SelectionAnimator::new(Duration::from_millis(1), Duration::from_millis(1 << 32)).unwrap();
        gacha.start(names()).unwrap();

        sleep(Duration::from_millis(10)).await;
        let snapshot = gacha.snapshot();
        assert!(snapshot.rolling);
        assert!(snapshot.ticks >= 9);
    }
}
