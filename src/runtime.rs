use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};

/// How often the front end wakes the engine when no key arrives
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// What the terminal front end reacts to
#[derive(Clone, Debug)]
pub enum TutorEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

pub trait EventSource: Send + 'static {
    /// Block for up to `timeout`; Err(Timeout) if nothing arrived.
    fn recv_timeout(&self, timeout: Duration) -> Result<TutorEvent, RecvTimeoutError>;
}

/// Terminal input read on a background thread
pub struct CrosstermEventSource {
    rx: Receiver<TutorEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let sent = match event::read() {
                // Windows reports releases too
                Ok(CtEvent::Key(key)) if key.kind != KeyEventKind::Release => {
                    tx.send(TutorEvent::Key(key))
                }
                Ok(CtEvent::Resize(_, _)) => tx.send(TutorEvent::Resize),
                Ok(_) => Ok(()),
                Err(err) => {
                    log::warn!("terminal input closed: {err}");
                    break;
                }
            };
            if sent.is_err() {
                break;
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<TutorEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Default for FixedTicker {
    fn default() -> Self {
        Self::new(TICK_INTERVAL)
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Channel-fed events for headless runs
pub struct TestEventSource {
    rx: Receiver<TutorEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<TutorEvent>) -> Self {
        Self { rx }
    }
}

impl EventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<TutorEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

pub struct Runner<E: EventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: EventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Next key or resize, or Tick once the interval passes quietly
    pub fn step(&self) -> TutorEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                TutorEvent::Tick
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyModifiers};

    #[test]
    fn quiet_interval_yields_tick() {
        let (_tx, rx) = mpsc::channel();
        let runner = Runner::new(
            TestEventSource::new(rx),
            FixedTicker::new(Duration::from_millis(1)),
        );
        assert!(matches!(runner.step(), TutorEvent::Tick));
    }

    #[test]
    fn queued_keys_come_out_in_order() {
        let (tx, rx) = mpsc::channel();
        for c in ['a', 'b'] {
            tx.send(TutorEvent::Key(KeyEvent::new(
                KeyCode::Char(c),
                KeyModifiers::NONE,
            )))
            .unwrap();
        }
        let runner = Runner::new(TestEventSource::new(rx), FixedTicker::default());

        for expected in ['a', 'b'] {
            match runner.step() {
                TutorEvent::Key(key) => assert_eq!(key.code, KeyCode::Char(expected)),
                other => panic!("expected key, got {other:?}"),
            }
        }
    }

    #[test]
    fn closed_channel_keeps_ticking() {
        let (tx, rx) = mpsc::channel::<TutorEvent>();
        drop(tx);
        let runner = Runner::new(
            TestEventSource::new(rx),
            FixedTicker::new(Duration::from_millis(1)),
        );
        assert!(matches!(runner.step(), TutorEvent::Tick));
        assert!(matches!(runner.step(), TutorEvent::Tick));
    }
}
