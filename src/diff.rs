#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub enum Outcome {
    Correct,
    Incorrect,
}

#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub enum CharStatus {
    Correct,
    Incorrect,
    Current,
    Pending,
}

/// Status of one target position, derived fresh from the committed input
#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub struct FeedbackCell {
    pub expected: char,
    pub typed: Option<char>,
    pub status: CharStatus,
}

/// Final score of one completed item
#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub struct ItemDelta {
    pub correct: usize,
    pub total: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffResult {
    pub feedback: Vec<FeedbackCell>,
    pub completed: bool,
    pub delta: Option<ItemDelta>,
    /// set when exactly one character was appended since the last call
    pub keystroke: Option<Outcome>,
}

/// Per-position feedback for `value` typed against `target`
pub fn feedback(target: &[char], value: &[char]) -> Vec<FeedbackCell> {
    target
        .iter()
        .enumerate()
        .map(|(i, &expected)| {
            let typed = value.get(i).copied();
            let status = match typed {
                Some(c) if c == expected => CharStatus::Correct,
                Some(_) => CharStatus::Incorrect,
                None if i == value.len() => CharStatus::Current,
                None => CharStatus::Pending,
            };
            FeedbackCell {
                expected,
                typed,
                status,
            }
        })
        .collect()
}

/// Share of committed positions that match, 100 when nothing is committed
pub fn live_accuracy(feedback: &[FeedbackCell]) -> f64 {
    let committed = feedback.iter().filter(|c| c.typed.is_some()).count();
    if committed == 0 {
        return 100.0;
    }
    let correct = feedback
        .iter()
        .filter(|c| c.status == CharStatus::Correct)
        .count();
    (correct as f64 / committed as f64 * 100.0).round()
}

/// Compares committed input against the current target, one character at a time.
#[derive(Debug, Clone)]
pub struct InputDiffEngine {
    target: Vec<char>,
    last_len: usize,
}

impl InputDiffEngine {
    pub fn new(target: &str) -> Self {
        Self {
            target: target.chars().collect(),
            last_len: 0,
        }
    }

    pub fn target(&self) -> &[char] {
        &self.target
    }

    pub fn reset(&mut self, target: &str) {
        self.target = target.chars().collect();
        self.last_len = 0;
    }

    pub fn current_feedback(&self, value: &str) -> Vec<FeedbackCell> {
        let value: Vec<char> = value.chars().collect();
        feedback(&self.target, &value)
    }

    pub fn process_commit(&mut self, value: &str) -> DiffResult {
        let value: Vec<char> = value.chars().collect();

        let keystroke = if value.len() == self.last_len + 1 {
            let idx = value.len() - 1;
            Some(match self.target.get(idx) {
                Some(&expected) if expected == value[idx] => Outcome::Correct,
                _ => Outcome::Incorrect,
            })
        } else {
            None
        };
        self.last_len = value.len();

        // Characters past the end of the target are not scored.
        let completed = value.len() >= self.target.len();
        let delta = completed.then(|| ItemDelta {
            correct: self
                .target
                .iter()
                .zip(value.iter())
                .filter(|(t, v)| t == v)
                .count(),
            total: self.target.len(),
        });

        DiffResult {
            feedback: feedback(&self.target, &value),
            completed,
            delta,
            keystroke,
        }
    }

    /// Shortened input is re-derived from scratch; nothing to revert.
    pub fn process_backspace(&mut self, value: &str) -> DiffResult {
        self.process_commit(value)
    }
}
