use log::debug;
use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

pub const COUNTDOWN_PERIOD: Duration = Duration::from_millis(1000);
pub const REFRESH_PERIOD: Duration = Duration::from_millis(500);

/// Where the engine reads "now" from
pub trait TimeSource {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Hand-cranked time for tests and replays. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualTimeSource {
    now: Rc<Cell<Instant>>,
}

impl ManualTimeSource {
    pub fn new() -> Self {
        Self {
            now: Rc::new(Cell::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Default for ManualTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum SessionPhase {
    NotStarted,
    Active,
    Paused,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionLimit {
    Timed(Duration),
    Items(usize),
}

#[derive(Debug, Clone, Copy)]
struct Timer {
    period: Duration,
    next_due: Instant,
}

impl Timer {
    fn armed(period: Duration, now: Instant) -> Self {
        Self {
            period,
            next_due: now + period,
        }
    }

    /// Number of periods that elapsed by `now`, catching up on late polls
    fn fire(&mut self, now: Instant) -> u32 {
        let mut fired = 0;
        while self.next_due <= now {
            fired += 1;
            self.next_due += self.period;
        }
        fired
    }
}

/// Both timers live and die together; only present while Active.
#[derive(Debug, Clone, Copy)]
struct ActiveTimers {
    countdown: Option<Timer>,
    refresh: Timer,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub refreshes: u32,
    pub expired: bool,
}

#[derive(Debug, Clone)]
pub struct SessionClock {
    phase: SessionPhase,
    limit: SessionLimit,
    started_at: Option<Instant>,
    paused_at: Option<Instant>,
    paused_accumulated: Duration,
    remaining: Option<Duration>,
    total_time: Option<Duration>,
    timers: Option<ActiveTimers>,
}

impl SessionClock {
    pub fn new(limit: SessionLimit) -> Self {
        let remaining = match limit {
            SessionLimit::Timed(budget) => Some(budget),
            SessionLimit::Items(_) => None,
        };
        Self {
            phase: SessionPhase::NotStarted,
            limit,
            started_at: None,
            paused_at: None,
            paused_accumulated: Duration::ZERO,
            remaining,
            total_time: None,
            timers: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn limit(&self) -> SessionLimit {
        self.limit
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.remaining
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    fn arm(&mut self, now: Instant) {
        self.timers = Some(ActiveTimers {
            countdown: self
                .remaining
                .map(|_| Timer::armed(COUNTDOWN_PERIOD, now)),
            refresh: Timer::armed(REFRESH_PERIOD, now),
        });
    }

    pub fn start(&mut self, now: Instant) -> bool {
        if self.phase != SessionPhase::NotStarted {
            return false;
        }
        self.phase = SessionPhase::Active;
        self.started_at = Some(now);
        self.arm(now);
        debug!("session clock started");
        true
    }

    pub fn pause(&mut self, now: Instant) -> bool {
        if self.phase != SessionPhase::Active {
            return false;
        }
        self.phase = SessionPhase::Paused;
        self.paused_at = Some(now);
        self.timers = None;
        debug!("session clock paused");
        true
    }

    pub fn resume(&mut self, now: Instant) -> bool {
        if self.phase != SessionPhase::Paused {
            return false;
        }
        if let Some(paused_at) = self.paused_at.take() {
            self.paused_accumulated += now.saturating_duration_since(paused_at);
        }
        self.phase = SessionPhase::Active;
        self.arm(now);
        debug!("session clock resumed");
        true
    }

    /// Moves to Complete. Returns false if it already was.
    pub fn finish(&mut self, now: Instant) -> bool {
        if self.phase == SessionPhase::Complete {
            return false;
        }
        let total = self.elapsed(now);
        if let Some(paused_at) = self.paused_at.take() {
            self.paused_accumulated += now.saturating_duration_since(paused_at);
        }
        self.timers = None;
        self.phase = SessionPhase::Complete;
        self.total_time = Some(total);
        debug!("session clock finished after {total:?}");
        true
    }

    /// Active time so far, pauses excluded
    pub fn elapsed(&self, now: Instant) -> Duration {
        let Some(started_at) = self.started_at else {
            return self.total_time.unwrap_or(Duration::ZERO);
        };
        match self.phase {
            SessionPhase::NotStarted => Duration::ZERO,
            SessionPhase::Active => now
                .saturating_duration_since(started_at)
                .saturating_sub(self.paused_accumulated),
            SessionPhase::Paused => self
                .paused_at
                .unwrap_or(now)
                .saturating_duration_since(started_at)
                .saturating_sub(self.paused_accumulated),
            SessionPhase::Complete => self.total_time.unwrap_or(Duration::ZERO),
        }
    }

    /// Runs whichever timers came due. A no-op outside Active.
    pub fn poll(&mut self, now: Instant) -> TickOutcome {
        let Some(timers) = self.timers.as_mut() else {
            return TickOutcome::default();
        };

        let refreshes = timers.refresh.fire(now);
        let mut expired = false;
        if let Some(countdown) = timers.countdown.as_mut() {
            let fired = countdown.fire(now);
            if fired > 0 {
                let left = self
                    .remaining
                    .unwrap_or(Duration::ZERO)
                    .saturating_sub(COUNTDOWN_PERIOD * fired);
                self.remaining = Some(left);
                expired = left.is_zero();
            }
        }

        TickOutcome { refreshes, expired }
    }
}
