use std::sync::mpsc;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use rand::rngs::StdRng;
use rand::SeedableRng;

use tadak::clock::{ManualTimeSource, SessionLimit, SessionPhase};
use tadak::engine::{EngineEvent, PracticeEngine, SessionSpec, Snapshot};
use tadak::item::{Language, PracticeItem, PracticeType};
use tadak::runtime::{FixedTicker, Runner, TestEventSource, TutorEvent};

fn engine(words: &[&str], limit: SessionLimit) -> (PracticeEngine, ManualTimeSource) {
    let time = ManualTimeSource::new();
    let engine = PracticeEngine::with_parts(
        words
            .iter()
            .map(|w| PracticeItem::new(*w, Language::English))
            .collect(),
        SessionSpec::new(PracticeType::Word, limit),
        StdRng::seed_from_u64(11),
        Box::new(time.clone()),
    )
    .unwrap();
    (engine, time)
}

fn send_chars(tx: &mpsc::Sender<TutorEvent>, text: &str) {
    for c in text.chars() {
        tx.send(TutorEvent::Key(KeyEvent::new(
            KeyCode::Char(c),
            KeyModifiers::NONE,
        )))
        .unwrap();
    }
}

/// Minimal front end: characters extend the input, ticks poll the clock
fn drive<F>(
    engine: &mut PracticeEngine,
    runner: &Runner<TestEventSource, FixedTicker>,
    steps: u32,
    mut on_tick: F,
) -> Snapshot
where
    F: FnMut(),
{
    let mut snap = engine.snapshot();
    for _ in 0..steps {
        let event = match runner.step() {
            TutorEvent::Tick => {
                on_tick();
                EngineEvent::Tick
            }
            TutorEvent::Resize => continue,
            TutorEvent::Key(key) => match key.code {
                KeyCode::Char(c) => {
                    let mut value = snap.input.clone();
                    value.push(c);
                    EngineEvent::RawChange(value)
                }
                KeyCode::Backspace => EngineEvent::Backspace,
                KeyCode::Esc => EngineEvent::Stop,
                _ => continue,
            },
        };
        snap = engine.handle_event(event);
        if snap.phase == SessionPhase::Complete {
            break;
        }
    }
    snap
}

#[test]
fn headless_item_limited_session_completes() {
    let (mut engine, _time) = engine(&["hi"], SessionLimit::Items(2));
    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(1)),
    );

    send_chars(&tx, "hihx");
    let snap = drive(&mut engine, &runner, 100, || {});

    assert_eq!(snap.phase, SessionPhase::Complete);
    assert_eq!(snap.stats.total_items, 2);
    assert_eq!(snap.stats.total_characters, 4);
    assert_eq!(snap.stats.correct_characters, 3);
    assert_eq!(snap.metrics.accuracy, 75);
}

#[test]
fn headless_timed_session_expires_on_ticks() {
    let (mut engine, time) = engine(&["alpha", "beta"], SessionLimit::Timed(Duration::from_secs(2)));
    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(1)),
    );

    send_chars(&tx, "a");
    // every quiet step advances the session clock by 100ms
    let snap = drive(&mut engine, &runner, 200, || {
        time.advance(Duration::from_millis(100))
    });

    assert_eq!(snap.phase, SessionPhase::Complete);
    assert_eq!(snap.remaining_ms, Some(0));
    assert_eq!(snap.metrics.elapsed_ms, 2_000);
    // the half-typed item was never completed
    assert_eq!(snap.stats.total_items, 0);
}

#[test]
fn headless_escape_stops_session() {
    let (mut engine, _time) = engine(&["hello"], SessionLimit::Items(5));
    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(1)),
    );

    send_chars(&tx, "he");
    tx.send(TutorEvent::Key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)))
        .unwrap();
    let snap = drive(&mut engine, &runner, 50, || {});

    assert_eq!(snap.phase, SessionPhase::Complete);
    assert_eq!(snap.input, "he");
    assert_eq!(snap.stats.total_characters, 0);
}
