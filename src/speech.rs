use itertools::{EitherOrBoth, Itertools};

use crate::error::{Capability, Result, TadakError};
use crate::item::Language;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMatch {
    pub expected: Option<String>,
    pub heard: Option<String>,
    pub matched: bool,
}

/// Score of one spoken attempt. Not folded into session totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechResult {
    pub tokens: Vec<TokenMatch>,
    pub matching: usize,
    pub target_tokens: usize,
    pub accuracy: u32,
}

/// Positional whitespace-token comparison of a transcript against its target.
/// A right word in the wrong slot is a miss.
pub fn score(target: &str, transcript: &str) -> SpeechResult {
    let tokens: Vec<TokenMatch> = target
        .split_whitespace()
        .zip_longest(transcript.split_whitespace())
        .map(|pair| match pair {
            EitherOrBoth::Both(expected, heard) => TokenMatch {
                matched: expected == heard,
                expected: Some(expected.to_string()),
                heard: Some(heard.to_string()),
            },
            EitherOrBoth::Left(expected) => TokenMatch {
                expected: Some(expected.to_string()),
                heard: None,
                matched: false,
            },
            EitherOrBoth::Right(heard) => TokenMatch {
                expected: None,
                heard: Some(heard.to_string()),
                matched: false,
            },
        })
        .collect();

    let target_tokens = tokens.iter().filter(|t| t.expected.is_some()).count();
    let matching = tokens.iter().filter(|t| t.matched).count();
    let accuracy = if target_tokens == 0 {
        0
    } else {
        (matching as f64 / target_tokens as f64 * 100.0).round() as u32
    };

    SpeechResult {
        tokens,
        matching,
        target_tokens,
        accuracy,
    }
}

/// Text-to-speech output. Fire and forget; completion comes back as an event.
pub trait SpeechSynthesizer {
    fn speak(&mut self, text: &str, language: Language, rate: f32) -> Result<()>;
    fn cancel(&mut self);
}

/// For front ends with no speech output at all
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableSynthesizer;

impl SpeechSynthesizer for UnavailableSynthesizer {
    fn speak(&mut self, _text: &str, _language: Language, _rate: f32) -> Result<()> {
        Err(TadakError::CapabilityUnavailable {
            capability: Capability::Synthesis,
            reason: "no speech output on this terminal".to_string(),
        })
    }

    fn cancel(&mut self) {}
}
