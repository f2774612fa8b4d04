use thiserror::Error;

use crate::item::PracticeType;

/// Speech capabilities a front end may or may not provide
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Capability {
    #[strum(serialize = "speech synthesis")]
    Synthesis,
    #[strum(serialize = "speech recognition")]
    Recognition,
}

#[derive(Debug, Error)]
pub enum TadakError {
    #[error("practice pool has no items")]
    EmptyPool,

    #[error("practice pool has no text to type")]
    NoPracticeText,

    #[error("no built-in pool named {0}")]
    UnknownPool(String),

    #[error("pool {pool} holds {found} items, expected {expected}")]
    PoolKindMismatch {
        pool: String,
        expected: PracticeType,
        found: PracticeType,
    },

    #[error("{capability} unavailable: {reason}")]
    CapabilityUnavailable {
        capability: Capability,
        reason: String,
    },

    #[error("malformed pool file: {0}")]
    Pool(#[from] serde_json::Error),

    #[error("stats store: {0}")]
    Store(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("csv export: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, TadakError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_error_names_the_capability() {
        let err = TadakError::CapabilityUnavailable {
            capability: Capability::Recognition,
            reason: "permission denied".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "speech recognition unavailable: permission denied"
        );
    }

    #[test]
    fn io_errors_convert() {
        fn open() -> Result<()> {
            std::fs::read("/definitely/not/here/tadak")?;
            Ok(())
        }
        assert!(matches!(open(), Err(TadakError::Io(_))));
    }
}
