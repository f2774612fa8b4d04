use serde::{Deserialize, Serialize};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Language {
    English,
    Korean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// One unit of practice text. Never mutated once handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PracticeItem {
    pub content: String,
    pub language: Language,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
}

impl PracticeItem {
    pub fn new(content: impl Into<String>, language: Language) -> Self {
        Self {
            content: content.into(),
            language,
            difficulty: None,
        }
    }
}

/// How an attempt is compared against its target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Character,
    Token,
}

/// How the pool is walked once an item is done
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// advance forever, reshuffling when the pool runs out
    Rotating,
    /// browse a fixed sequence with prev/next
    Fixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PracticeUnit {
    pub comparator: Comparator,
    pub navigation: Navigation,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum PracticeType {
    Row,
    Word,
    Sentence,
    Paragraph,
    Dictation,
    ReadAloud,
}

impl PracticeType {
    pub fn unit(&self) -> PracticeUnit {
        match self {
            PracticeType::Row
            | PracticeType::Word
            | PracticeType::Sentence
            | PracticeType::Dictation => PracticeUnit {
                comparator: Comparator::Character,
                navigation: Navigation::Rotating,
            },
            PracticeType::Paragraph => PracticeUnit {
                comparator: Comparator::Character,
                navigation: Navigation::Fixed,
            },
            PracticeType::ReadAloud => PracticeUnit {
                comparator: Comparator::Token,
                navigation: Navigation::Fixed,
            },
        }
    }

    /// Whether every new current item is read out loud
    pub fn speaks_items(&self) -> bool {
        matches!(self, PracticeType::Dictation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn practice_types_map_to_units() {
        assert_eq!(
            PracticeType::Word.unit(),
            PracticeUnit {
                comparator: Comparator::Character,
                navigation: Navigation::Rotating
            }
        );
        assert_eq!(PracticeType::Paragraph.unit().navigation, Navigation::Fixed);
        assert_eq!(PracticeType::ReadAloud.unit().comparator, Comparator::Token);
        assert!(PracticeType::Dictation.speaks_items());
        assert!(!PracticeType::ReadAloud.speaks_items());
    }

    #[test]
    fn practice_type_string_forms_agree() {
        assert_eq!(PracticeType::ReadAloud.to_string(), "read-aloud");
        let parsed: PracticeType = serde_json::from_str("\"read-aloud\"").unwrap();
        assert_eq!(parsed, PracticeType::ReadAloud);
        let json = serde_json::to_string(&PracticeType::ReadAloud).unwrap();
        assert_eq!(json, "\"read-aloud\"");
    }

    #[test]
    fn item_deserializes_without_difficulty() {
        let item: PracticeItem =
            serde_json::from_str(r#"{"content":"가나다","language":"korean"}"#).unwrap();
        assert_eq!(item, PracticeItem::new("가나다", Language::Korean));
    }
}
