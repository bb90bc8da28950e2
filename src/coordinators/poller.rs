use crate::error::Result;
use async_trait::async_trait;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

/// One fetch-then-apply cycle driven by a `Poller`
#[async_trait]
pub trait SyncTask: Send + Sync + 'static {
    type Output: Send + 'static;

    fn name(&self) -> &'static str;

    /// Talk to the remote service. Must not touch shared state.
    async fn fetch(&self) -> Result<Self::Output>;

    /// Publish a fetched result into shared state or the store
    async fn apply(&self, output: Self::Output) -> Result<()>;
}

/// What happened to a single poll cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Applied,
    /// Another fetch was still outstanding
    SkippedInFlight,
    /// Fetch or apply failed; previous state kept
    Failed,
    /// The poller was paused while the fetch was outstanding
    Discarded,
}

struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
    idle: &'a Notify,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
        self.idle.notify_waiters();
    }
}

/// Whether a cycle that finds a fetch outstanding gives up or waits its turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Contention {
    Skip,
    Wait,
}

struct PollerState<T> {
    task: T,
    in_flight: AtomicBool,
    idle: Notify,
    epoch: AtomicU64,
}

impl<T: SyncTask> PollerState<T> {
    fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Take the in-flight flag, or `None` when skipping a busy poller
    async fn acquire(&self, contention: Contention) -> Option<InFlightGuard<'_>> {
        loop {
            // Register before checking the flag so a release in between still wakes us
            let idle = self.idle.notified();
            tokio::pin!(idle);
            idle.as_mut().enable();

            if self
                .in_flight
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return Some(InFlightGuard {
                    flag: &self.in_flight,
                    idle: &self.idle,
                });
            }
            if contention == Contention::Skip {
                return None;
            }
            idle.await;
        }
    }

    /// One cycle whose result only counts if the poller is not paused after `epoch`
    async fn poll(&self, epoch: u64, contention: Contention) -> PollOutcome {
        let Some(_guard) = self.acquire(contention).await else {
            debug!("{}: previous fetch still in flight, skipping tick", self.task.name());
            return PollOutcome::SkippedInFlight;
        };
        if self.current_epoch() != epoch {
            debug!("{}: paused before the fetch started", self.task.name());
            return PollOutcome::Discarded;
        }

        let output = match self.task.fetch().await {
            Ok(output) => output,
            Err(e) => {
                warn!("{}: fetch failed, keeping previous data: {}", self.task.name(), e);
                return PollOutcome::Failed;
            }
        };

        if self.current_epoch() != epoch {
            info!("{}: paused during fetch, discarding result", self.task.name());
            return PollOutcome::Discarded;
        }

        match self.task.apply(output).await {
            Ok(()) => PollOutcome::Applied,
            Err(e) => {
                warn!("{}: failed to apply fetched data: {}", self.task.name(), e);
                PollOutcome::Failed
            }
        }
    }
}

/// Runs a `SyncTask` immediately on `resume` and then on every interval tick.
///
/// Each tick spawns its own fetch, so a slow fetch does not hold up the timer; ticks that
/// arrive while a fetch is outstanding are skipped. The first tick after `resume` instead
/// waits for the outstanding fetch and then fetches again. `pause` stops the timer without
/// cancelling an outstanding fetch, but that fetch's result is discarded.
pub struct Poller<T: SyncTask> {
    state: Arc<PollerState<T>>,
    interval: Duration,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl<T: SyncTask> Poller<T> {
    pub fn new(task: T, interval: Duration) -> Self {
        Self {
            state: Arc::new(PollerState {
                task,
                in_flight: AtomicBool::new(false),
                idle: Notify::new(),
                epoch: AtomicU64::new(0),
            }),
            interval,
            timer: Mutex::new(None),
        }
    }

    fn timer(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.timer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn task(&self) -> &T {
        &self.state.task
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Fetch now and arm the repeating timer. Does nothing if already running.
    pub fn resume(&self) {
        let mut timer = self.timer();
        if timer.as_ref().map_or(false, |handle| !handle.is_finished()) {
            return;
        }

        let state = self.state.clone();
        let period = self.interval;
        info!(
            "{}: polling every {}s",
            self.state.task.name(),
            period.as_secs_f64()
        );

        *timer = Some(tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            // The first tick completes immediately and must not be lost to a fetch
            // left over from before a pause
            let mut contention = Contention::Wait;
            loop {
                interval.tick().await;

                let epoch = state.current_epoch();
                let state = state.clone();
                tokio::spawn(async move {
                    state.poll(epoch, contention).await;
                });
                contention = Contention::Skip;
            }
        }));
    }

    /// Disarm the timer. Results of fetches already in flight will be discarded.
    pub fn pause(&self) {
        self.state.epoch.fetch_add(1, Ordering::AcqRel);
        if let Some(handle) = self.timer().take() {
            handle.abort();
            info!("{}: paused", self.state.task.name());
        }
    }

    pub fn is_running(&self) -> bool {
        self.timer()
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }

    pub fn is_in_flight(&self) -> bool {
        self.state.in_flight.load(Ordering::Acquire)
    }

    /// Run one cycle on the caller's task, honouring the in-flight guard
    pub async fn poll_once(&self) -> PollOutcome {
        self.state
            .poll(self.state.current_epoch(), Contention::Skip)
            .await
    }
}

impl<T: SyncTask> Drop for Poller<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.timer().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::{Notify, Semaphore};

    /// Counts cycles; fetches wait for a permit when `gated`
    struct CountingTask {
        gated: bool,
        gate: Semaphore,
        fail: AtomicBool,
        fetched: AtomicUsize,
        applied: AtomicUsize,
        fetched_signal: Notify,
    }

    impl CountingTask {
        fn new(gated: bool) -> Self {
            Self {
                gated,
                gate: Semaphore::new(0),
                fail: AtomicBool::new(false),
                fetched: AtomicUsize::new(0),
                applied: AtomicUsize::new(0),
                fetched_signal: Notify::new(),
            }
        }
    }

    #[async_trait]
    impl SyncTask for CountingTask {
        type Output = usize;

        fn name(&self) -> &'static str {
            "counting"
        }

        async fn fetch(&self) -> Result<usize> {
            let n = self.fetched.fetch_add(1, Ordering::SeqCst) + 1;
            self.fetched_signal.notify_one();
            if self.gated {
                self.gate
                    .acquire()
                    .await
                    .map_err(|e| Error::Config(e.to_string()))?
                    .forget();
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::cast("boom"));
            }
            Ok(n)
        }

        async fn apply(&self, _output: usize) -> Result<()> {
            self.applied.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn single_cycle_applies_or_fails() {
        let poller = Poller::new(CountingTask::new(false), Duration::from_secs(60));
        assert_eq!(poller.poll_once().await, PollOutcome::Applied);

        poller.task().fail.store(true, Ordering::SeqCst);
        assert_eq!(poller.poll_once().await, PollOutcome::Failed);
        assert_eq!(poller.task().applied.load(Ordering::SeqCst), 1);
        assert!(!poller.is_in_flight());
    }

    #[tokio::test]
    async fn tick_during_outstanding_fetch_is_skipped() {
        let poller = Arc::new(Poller::new(CountingTask::new(true), Duration::from_secs(60)));

        let background = poller.clone();
        let first = tokio::spawn(async move { background.poll_once().await });
        poller.task().fetched_signal.notified().await;

        assert!(poller.is_in_flight());
        assert_eq!(poller.poll_once().await, PollOutcome::SkippedInFlight);

        poller.task().gate.add_permits(1);
        assert_eq!(first.await.unwrap(), PollOutcome::Applied);
        assert_eq!(poller.task().fetched.load(Ordering::SeqCst), 1);
        assert!(!poller.is_in_flight());
    }

    #[tokio::test]
    async fn fetch_completing_after_pause_is_discarded() {
        let poller = Arc::new(Poller::new(CountingTask::new(true), Duration::from_secs(60)));

        let background = poller.clone();
        let pending = tokio::spawn(async move { background.poll_once().await });
        poller.task().fetched_signal.notified().await;

        poller.pause();
        poller.task().gate.add_permits(1);

        assert_eq!(pending.await.unwrap(), PollOutcome::Discarded);
        assert_eq!(poller.task().applied.load(Ordering::SeqCst), 0);

        // Later cycles apply normally
        poller.task().gate.add_permits(1);
        assert_eq!(poller.poll_once().await, PollOutcome::Applied);
    }

    #[tokio::test]
    async fn resume_fetches_immediately_and_pause_stops_timer() {
        let poller = Poller::new(CountingTask::new(false), Duration::from_secs(3600));

        poller.resume();
        poller.resume();
        assert!(poller.is_running());

        tokio::time::timeout(Duration::from_secs(5), poller.task().fetched_signal.notified())
            .await
            .expect("first fetch should run without waiting for the interval");

        poller.pause();
        assert!(!poller.is_running());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(poller.task().fetched.load(Ordering::SeqCst), 1);
    }

    async fn wait_until(condition: impl Fn() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test]
    async fn resume_after_pause_refetches_once_stale_fetch_finishes() {
        let poller = Poller::new(CountingTask::new(true), Duration::from_secs(3600));

        poller.resume();
        poller.task().fetched_signal.notified().await;
        assert!(poller.is_in_flight());

        poller.pause();
        poller.resume();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(poller.task().fetched.load(Ordering::SeqCst), 1);

        // The stale fetch is discarded, then the resumed tick fetches fresh data
        poller.task().gate.add_permits(2);
        wait_until(|| poller.task().applied.load(Ordering::SeqCst) == 1).await;
        assert_eq!(poller.task().fetched.load(Ordering::SeqCst), 2);

        wait_until(|| !poller.is_in_flight()).await;
        assert_eq!(poller.task().applied.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn pause_while_waiting_for_stale_fetch_applies_nothing() {
        let poller = Poller::new(CountingTask::new(true), Duration::from_secs(3600));

        poller.resume();
        poller.task().fetched_signal.notified().await;
        poller.pause();
        poller.resume();
        tokio::time::sleep(Duration::from_millis(50)).await;
        poller.pause();

        poller.task().gate.add_permits(2);
        wait_until(|| !poller.is_in_flight()).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(poller.task().fetched.load(Ordering::SeqCst), 1);
        assert_eq!(poller.task().applied.load(Ordering::SeqCst), 0);
    }
}
