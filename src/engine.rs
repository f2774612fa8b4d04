use chrono::Local;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::{Duration, Instant};

use crate::clock::{SessionClock, SessionLimit, SessionPhase, SystemTimeSource, TimeSource};
use crate::composition::{CompositionGate, GateDecision};
use crate::diff::{self, FeedbackCell, InputDiffEngine, ItemDelta, Outcome};
use crate::error::{Capability, Result, TadakError};
use crate::item::{Comparator, Navigation, PracticeItem, PracticeType, PracticeUnit};
use crate::metrics::{CumulativeStats, Metrics, MetricsCalculator};
use crate::rotator::ItemRotator;
use crate::speech::{self, SpeechResult, SpeechSynthesizer};
use crate::stats::{SessionSummary, SummarySink};
use crate::time_series::TimeSeriesPoint;

/// Everything that can happen to a session, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    RawChange(String),
    CompositionStart,
    CompositionEnd(String),
    Backspace,
    Tick,
    Advance,
    Prev,
    Next,
    Pause,
    Resume,
    TogglePause,
    Stop,
    Restart,
    Listen,
    PlaybackDone,
    Recognition(String),
    RecognitionFailed(String),
}

/// Per-keystroke cue for audio/haptic feedback
pub trait FeedbackSink {
    fn keystroke(&mut self, outcome: Outcome);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSpec {
    pub practice_type: PracticeType,
    pub limit: SessionLimit,
    pub speech_rate: f32,
}

impl SessionSpec {
    pub fn new(practice_type: PracticeType, limit: SessionLimit) -> Self {
        Self {
            practice_type,
            limit,
            speech_rate: 1.0,
        }
    }
}

/// Immutable view handed to the presentation layer after every event
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub practice_type: PracticeType,
    pub item: PracticeItem,
    pub item_index: usize,
    pub pool_len: usize,
    pub cycle: usize,
    pub input: String,
    pub composing: bool,
    pub feedback: Vec<FeedbackCell>,
    pub live_accuracy: f64,
    pub metrics: Metrics,
    pub stats: CumulativeStats,
    pub remaining_ms: Option<u64>,
    pub phase: SessionPhase,
    pub speaking: bool,
    pub last_speech: Option<SpeechResult>,
    /// scored read-aloud attempts; these count toward an item limit
    pub speech_attempts: usize,
    pub notice: Option<String>,
    pub wpm_samples: Vec<TimeSeriesPoint>,
    pub wpm_std_dev: f64,
}

/// One practice session: diffing, scoring, timing and rotation behind a
/// single `handle_event` entry point.
pub struct PracticeEngine {
    spec: SessionSpec,
    unit: PracticeUnit,
    rotator: ItemRotator,
    gate: CompositionGate,
    diff: InputDiffEngine,
    metrics: MetricsCalculator,
    clock: SessionClock,
    committed: String,
    time: Box<dyn TimeSource>,
    feedback_sink: Option<Box<dyn FeedbackSink>>,
    summary_sink: Option<Box<dyn SummarySink>>,
    synthesizer: Option<Box<dyn SpeechSynthesizer>>,
    unavailable: Vec<Capability>,
    speaking: bool,
    last_speech: Option<SpeechResult>,
    speech_attempts: usize,
    notice: Option<String>,
    summary: Option<SessionSummary>,
}

impl std::fmt::Debug for PracticeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PracticeEngine").finish_non_exhaustive()
    }
}

fn millis(d: Duration) -> u64 {
    d.as_millis() as u64
}

impl PracticeEngine {
    pub fn new(items: Vec<PracticeItem>, spec: SessionSpec) -> Result<Self> {
        Self::with_parts(
            items,
            spec,
            StdRng::from_entropy(),
            Box::new(SystemTimeSource),
        )
    }

    /// Explicit randomness and time, for tests and replays
    pub fn with_parts(
        items: Vec<PracticeItem>,
        spec: SessionSpec,
        rng: StdRng,
        time: Box<dyn TimeSource>,
    ) -> Result<Self> {
        let unit = spec.practice_type.unit();
        let rotator = match unit.navigation {
            Navigation::Rotating => ItemRotator::shuffled(items, rng)?,
            Navigation::Fixed => ItemRotator::new(items, rng)?,
        };
        let diff = InputDiffEngine::new(&rotator.current().content);

        Ok(Self {
            spec,
            unit,
            rotator,
            gate: CompositionGate::new(),
            diff,
            metrics: MetricsCalculator::new(),
            clock: SessionClock::new(spec.limit),
            committed: String::new(),
            time,
            feedback_sink: None,
            summary_sink: None,
            synthesizer: None,
            unavailable: Vec::new(),
            speaking: false,
            last_speech: None,
            speech_attempts: 0,
            notice: None,
            summary: None,
        })
    }

    pub fn with_feedback_sink(mut self, sink: Box<dyn FeedbackSink>) -> Self {
        self.feedback_sink = Some(sink);
        self
    }

    pub fn with_summary_sink(mut self, sink: Box<dyn SummarySink>) -> Self {
        self.summary_sink = Some(sink);
        self
    }

    /// Attaching a synthesizer to a dictation session reads out the first item.
    pub fn with_synthesizer(mut self, synthesizer: Box<dyn SpeechSynthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        if self.spec.practice_type.speaks_items() {
            self.speak_current();
        }
        self
    }

    pub fn spec(&self) -> SessionSpec {
        self.spec
    }

    pub fn phase(&self) -> SessionPhase {
        self.clock.phase()
    }

    pub fn committed(&self) -> &str {
        &self.committed
    }

    pub fn stats(&self) -> CumulativeStats {
        self.metrics.stats()
    }

    pub fn current_item(&self) -> &PracticeItem {
        self.rotator.current()
    }

    /// Set once the session reaches Complete
    pub fn summary(&self) -> Option<&SessionSummary> {
        self.summary.as_ref()
    }

    pub fn is_unavailable(&self, capability: Capability) -> bool {
        self.unavailable.contains(&capability)
    }

    pub fn handle_event(&mut self, event: EngineEvent) -> Snapshot {
        let now = self.time.now();

        match event {
            EngineEvent::RawChange(value) => self.on_raw_change(value, now),
            EngineEvent::CompositionStart => {
                if self.accepts_input() {
                    self.gate.on_composition_start();
                }
            }
            EngineEvent::CompositionEnd(value) => {
                if self.accepts_input() {
                    let value = self.gate.on_composition_end(value);
                    self.commit(value, now);
                } else {
                    // nothing typed while paused counts, but the gate must not stay stuck
                    self.gate.abandon();
                }
            }
            EngineEvent::Backspace => self.on_backspace(now),
            EngineEvent::Tick => self.on_tick(now),
            EngineEvent::Advance => self.navigate(Move::Advance, now),
            EngineEvent::Prev => self.navigate(Move::Prev, now),
            EngineEvent::Next => self.navigate(Move::Next, now),
            EngineEvent::Pause => {
                self.clock.pause(now);
            }
            EngineEvent::Resume => {
                self.clock.resume(now);
            }
            EngineEvent::TogglePause => {
                if !self.clock.pause(now) {
                    self.clock.resume(now);
                }
            }
            EngineEvent::Stop => self.finish(now),
            EngineEvent::Restart => self.restart(),
            EngineEvent::Listen => {
                if self.accepts_input() {
                    self.speak_current();
                }
            }
            EngineEvent::PlaybackDone => self.speaking = false,
            EngineEvent::Recognition(transcript) => self.on_recognition(&transcript, now),
            EngineEvent::RecognitionFailed(reason) => {
                self.mark_unavailable(TadakError::CapabilityUnavailable {
                    capability: Capability::Recognition,
                    reason,
                });
            }
        }

        self.snapshot_at(now)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshot_at(self.time.now())
    }

    fn snapshot_at(&self, now: Instant) -> Snapshot {
        let feedback = match self.unit.comparator {
            Comparator::Character => self.diff.current_feedback(&self.committed),
            Comparator::Token => Vec::new(),
        };
        let input = match self.gate.buffer() {
            Some(buffer) if self.gate.is_composing() => buffer.to_string(),
            _ => self.committed.clone(),
        };

        Snapshot {
            practice_type: self.spec.practice_type,
            item: self.rotator.current().clone(),
            item_index: self.rotator.index(),
            pool_len: self.rotator.pool_len(),
            cycle: self.rotator.cycle(),
            input,
            composing: self.gate.is_composing(),
            live_accuracy: diff::live_accuracy(&feedback),
            feedback,
            metrics: Metrics {
                elapsed_ms: millis(self.clock.elapsed(now)),
                ..self.metrics.metrics()
            },
            stats: self.metrics.stats(),
            remaining_ms: self.clock.remaining().map(millis),
            phase: self.clock.phase(),
            speaking: self.speaking,
            last_speech: self.last_speech.clone(),
            speech_attempts: self.speech_attempts,
            notice: self.notice.clone(),
            wpm_samples: self.metrics.samples().to_vec(),
            wpm_std_dev: self.metrics.wpm_std_dev(),
        }
    }

    /// Input is refused while paused or after the session ends
    fn accepts_input(&self) -> bool {
        matches!(
            self.clock.phase(),
            SessionPhase::NotStarted | SessionPhase::Active
        )
    }

    fn start_clock(&mut self, now: Instant) {
        if self.clock.start(now) {
            info!("{} session started", self.spec.practice_type);
        }
    }

    fn on_raw_change(&mut self, value: String, now: Instant) {
        if !self.accepts_input() {
            return;
        }
        match self.gate.on_raw_change(value) {
            GateDecision::Buffered(buffer) => {
                // the first composed keystroke already counts as typing
                if self.unit.comparator == Comparator::Character && !buffer.is_empty() {
                    self.start_clock(now);
                }
            }
            GateDecision::Commit(value) => self.commit(value, now),
            GateDecision::Duplicate => {}
        }
    }

    fn on_backspace(&mut self, now: Instant) {
        if !self.accepts_input() || self.gate.is_composing() {
            return;
        }
        let mut value = self.committed.clone();
        if value.pop().is_none() {
            return;
        }
        if self.unit.comparator == Comparator::Token {
            self.committed = value;
            return;
        }
        let result = self.diff.process_backspace(&value);
        self.committed = value;
        if let Some(delta) = result.delta.filter(|_| result.completed) {
            self.complete_item(delta, now);
        }
    }

    fn commit(&mut self, value: String, now: Instant) {
        if self.unit.comparator == Comparator::Token {
            // typed transcript, scored only when submitted
            self.committed = value;
            return;
        }

        if !value.is_empty() {
            self.start_clock(now);
        }

        let result = self.diff.process_commit(&value);
        self.committed = value;

        if let (Some(outcome), Some(sink)) = (result.keystroke, self.feedback_sink.as_mut()) {
            sink.keystroke(outcome);
        }

        if self.clock.phase() != SessionPhase::Active {
            return;
        }
        if let Some(delta) = result.delta.filter(|_| result.completed) {
            self.complete_item(delta, now);
        }
    }

    fn complete_item(&mut self, delta: ItemDelta, now: Instant) {
        let mut delta = delta;
        loop {
            let elapsed = millis(self.clock.elapsed(now));
            self.metrics.on_item_completed(delta, elapsed);
            let stats = self.metrics.stats();
            debug!(
                "item {} done: {}/{} correct, session {}/{}",
                stats.total_items,
                delta.correct,
                delta.total,
                stats.correct_characters,
                stats.total_characters
            );

            if let SessionLimit::Items(limit) = self.clock.limit() {
                if stats.total_items >= limit.max(1) {
                    self.finish(now);
                    return;
                }
            }

            let moved = match self.unit.navigation {
                Navigation::Rotating => {
                    self.rotator.advance();
                    true
                }
                Navigation::Fixed => self.rotator.next(),
            };
            if !moved {
                self.finish(now);
                return;
            }

            self.reset_input();
            if !self.diff.target().is_empty() {
                self.on_item_entered();
                return;
            }
            debug!("item {} is empty, skipping", self.rotator.index());
            delta = ItemDelta {
                correct: 0,
                total: 0,
            };
        }
    }

    fn navigate(&mut self, step: Move, now: Instant) {
        if !self.accepts_input() {
            return;
        }
        let moved = match (step, self.unit.navigation) {
            (Move::Advance, Navigation::Rotating) => {
                self.rotator.advance();
                true
            }
            (Move::Advance, Navigation::Fixed) | (Move::Next, _) => self.rotator.next(),
            (Move::Prev, _) => self.rotator.prev(),
        };
        if !moved {
            return;
        }
        // the abandoned item never reaches the session totals
        self.reset_input();
        self.last_speech = None;

        if self.diff.target().is_empty() && self.clock.phase() == SessionPhase::Active {
            self.complete_item(
                ItemDelta {
                    correct: 0,
                    total: 0,
                },
                now,
            );
        } else {
            self.on_item_entered();
        }
    }

    fn reset_input(&mut self) {
        self.committed.clear();
        self.gate.next_item();
        let target = self.rotator.current().content.clone();
        self.diff.reset(&target);
    }

    fn on_item_entered(&mut self) {
        if self.spec.practice_type.speaks_items() {
            self.speak_current();
        }
    }

    fn on_tick(&mut self, now: Instant) {
        let outcome = self.clock.poll(now);
        if outcome.refreshes > 0 {
            self.metrics.on_tick(millis(self.clock.elapsed(now)));
        }
        if outcome.expired {
            self.finish(now);
        }
    }

    fn on_recognition(&mut self, transcript: &str, now: Instant) {
        if self.unit.comparator != Comparator::Token || !self.accepts_input() {
            return;
        }
        self.start_clock(now);
        let result = speech::score(&self.rotator.current().content, transcript);
        self.speech_attempts += 1;
        debug!(
            "speech attempt {}: {}/{} tokens",
            self.speech_attempts, result.matching, result.target_tokens
        );
        self.last_speech = Some(result);
        self.committed.clear();

        if let SessionLimit::Items(limit) = self.clock.limit() {
            if self.speech_attempts >= limit.max(1) {
                self.finish(now);
                return;
            }
        }
        if !self.rotator.next() {
            self.finish(now);
            return;
        }
        self.reset_input();
        self.on_item_entered();
    }

    fn speak_current(&mut self) {
        if self.is_unavailable(Capability::Synthesis) {
            return;
        }
        let Some(synthesizer) = self.synthesizer.as_mut() else {
            return;
        };
        if self.speaking {
            synthesizer.cancel();
        }
        let item = self.rotator.current();
        match synthesizer.speak(&item.content, item.language, self.spec.speech_rate) {
            Ok(()) => self.speaking = true,
            Err(err) => {
                self.speaking = false;
                self.mark_unavailable(err);
            }
        }
    }

    fn mark_unavailable(&mut self, err: TadakError) {
        warn!("{err}");
        if let TadakError::CapabilityUnavailable { capability, .. } = &err {
            if !self.unavailable.contains(capability) {
                self.unavailable.push(*capability);
            }
        }
        self.notice = Some(err.to_string());
    }

    fn finish(&mut self, now: Instant) {
        if !self.clock.finish(now) {
            return;
        }
        if self.speaking {
            if let Some(synthesizer) = self.synthesizer.as_mut() {
                synthesizer.cancel();
            }
            self.speaking = false;
        }

        let elapsed_ms = millis(self.clock.elapsed(now));
        if elapsed_ms > 0 {
            self.metrics.on_tick(elapsed_ms);
        }
        let stats = self.metrics.stats();
        let metrics = self.metrics.metrics();
        let summary = SessionSummary {
            items_completed: stats.total_items,
            total_characters: stats.total_characters,
            correct_characters: stats.correct_characters,
            elapsed_ms,
            practice_type: self.spec.practice_type,
            wpm: metrics.wpm,
            accuracy: metrics.accuracy,
            wpm_std_dev: self.metrics.wpm_std_dev(),
            finished_at: Local::now(),
        };
        info!(
            "{} session complete: {} items, {} wpm, {}% accuracy",
            summary.practice_type, summary.items_completed, summary.wpm, summary.accuracy
        );

        // a session nobody typed in has nothing worth keeping
        if self.clock.started_at().is_some() {
            if let Some(sink) = self.summary_sink.as_mut() {
                if let Err(err) = sink.session_complete(&summary) {
                    warn!("could not store session summary: {err}");
                }
            }
        }
        self.summary = Some(summary);
    }

    fn restart(&mut self) {
        if self.speaking {
            if let Some(synthesizer) = self.synthesizer.as_mut() {
                synthesizer.cancel();
            }
            self.speaking = false;
        }
        self.rotator
            .restart(self.unit.navigation == Navigation::Rotating);
        self.reset_input();
        self.gate.reset();
        self.metrics.reset();
        self.clock = SessionClock::new(self.spec.limit);
        self.last_speech = None;
        self.speech_attempts = 0;
        self.notice = None;
        self.summary = None;
        debug!("{} session restarted", self.spec.practice_type);
        self.on_item_entered();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Move {
    Advance,
    Prev,
    Next,
}
