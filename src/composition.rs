/// What the engine should do with a raw input change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// mid-composition: show it, don't score it
    Buffered(String),
    /// accepted for scoring
    Commit(String),
    /// echo of the value a composition just committed
    Duplicate,
}

/// Holds back partially composed characters (e.g. a hangul syllable still
/// being assembled from jamo) until the input method commits them.
#[derive(Debug, Default, Clone)]
pub struct CompositionGate {
    composing: bool,
    buffer: Option<String>,
    just_committed: Option<String>,
}

impl CompositionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_composing(&self) -> bool {
        self.composing
    }

    /// Raw value shown while composing
    pub fn buffer(&self) -> Option<&str> {
        self.buffer.as_deref()
    }

    pub fn on_composition_start(&mut self) {
        self.composing = true;
        self.just_committed = None;
    }

    pub fn on_raw_change(&mut self, value: String) -> GateDecision {
        if self.composing {
            self.buffer = Some(value.clone());
            return GateDecision::Buffered(value);
        }

        if self.just_committed.take().as_deref() == Some(value.as_str()) {
            return GateDecision::Duplicate;
        }

        GateDecision::Commit(value)
    }

    /// Ends composition and hands back the value to score
    pub fn on_composition_end(&mut self, final_value: String) -> String {
        self.composing = false;
        self.buffer = None;
        self.just_committed = Some(final_value.clone());
        final_value
    }

    /// Drops an unfinished composition without scoring it
    pub fn abandon(&mut self) {
        self.composing = false;
        self.buffer = None;
        self.just_committed = None;
    }

    /// Moving to another item keeps the pending echo of the last commit,
    /// which may still arrive after the item that consumed it is gone.
    pub fn next_item(&mut self) {
        self.composing = false;
        self.buffer = None;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
