//! Heartbeat scheduling and ack tracking

use rand::Rng;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Timer fire, tagged with the timer generation that scheduled it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub generation: u64,
}

/// Jittered first beat plus the periodic beat that follows it
///
/// Both timers are aborted together, on [`cancel`](Self::cancel) or on drop.
#[derive(Debug)]
pub struct HeartbeatTimers {
    jitter: JoinHandle<()>,
    periodic: JoinHandle<()>,
}

impl HeartbeatTimers {
    /// Start timers with a first beat at `interval * uniform[0, 1)`
    pub fn start(interval: Duration, generation: u64, ticks: mpsc::UnboundedSender<Tick>) -> Self {
        let jitter = interval.mul_f64(rand::thread_rng().gen_range(0.0..1.0));
        Self::start_with_jitter(interval, jitter, generation, ticks)
    }

    /// Start timers with an explicit first-beat delay
    pub fn start_with_jitter(
        interval: Duration,
        jitter: Duration,
        generation: u64,
        ticks: mpsc::UnboundedSender<Tick>,
    ) -> Self {
        let first_beat = Instant::now() + jitter;

        let first = ticks.clone();
        let jitter = tokio::spawn(async move {
            time::sleep_until(first_beat).await;
            let _ = first.send(Tick { generation });
        });

        let periodic = tokio::spawn(async move {
            let mut timer = time::interval_at(first_beat + interval, interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                timer.tick().await;
                if ticks.send(Tick { generation }).is_err() {
                    break;
                }
            }
        });

        Self { jitter, periodic }
    }

    pub fn cancel(&self) {
        self.jitter.abort();
        self.periodic.abort();
    }
}

impl Drop for HeartbeatTimers {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Outcome of recording a sent heartbeat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeatRecord {
    /// The previous heartbeat was never acknowledged
    pub ack_was_pending: bool,
    /// Consecutive unacknowledged heartbeats
    pub missed: u32,
}

/// Per-connection heartbeat state
#[derive(Debug, Default)]
pub struct HeartbeatState {
    interval: Option<Duration>,
    ack_pending: bool,
    missed: u32,
    last_sent: Option<Instant>,
    /// Bumped on every start and cancel; ticks from older timers are stale
    generation: u64,
    timers: Option<HeartbeatTimers>,
}

impl HeartbeatState {
    /// Replace any running timers with a fresh pair
    pub fn start(&mut self, interval: Duration, ticks: mpsc::UnboundedSender<Tick>) {
        self.cancel();
        self.interval = Some(interval);
        self.ack_pending = false;
        self.missed = 0;
        self.timers = Some(HeartbeatTimers::start(interval, self.generation, ticks));
    }

    pub fn cancel(&mut self) {
        self.generation += 1;
        if let Some(timers) = self.timers.take() {
            timers.cancel();
        }
    }

    /// Check if a tick came from the running timers
    ///
    /// Ticks queued before a restart or cancel are rejected.
    pub fn is_current(&self, tick: Tick) -> bool {
        self.timers.is_some() && tick.generation == self.generation
    }

    pub fn is_running(&self) -> bool {
        self.timers.is_some()
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Record a heartbeat about to be sent
    ///
    /// `counts_missed` is false for server-requested beats, which never
    /// advance the zombie counter.
    pub fn record_sent(&mut self, now: Instant, counts_missed: bool) -> BeatRecord {
        let ack_was_pending = self.ack_pending;
        if ack_was_pending && counts_missed {
            self.missed += 1;
        }
        self.ack_pending = true;
        self.last_sent = Some(now);
        BeatRecord {
            ack_was_pending,
            missed: self.missed,
        }
    }

    /// Record an ack; returns the round trip since the last beat
    pub fn record_ack(&mut self, now: Instant) -> Option<Duration> {
        self.ack_pending = false;
        self.missed = 0;
        self.last_sent.map(|sent| now.saturating_duration_since(sent))
    }
}
