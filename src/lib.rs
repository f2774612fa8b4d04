// Library surface: the practice engine and everything the binary and the
// integration tests drive it with.
pub mod app_dirs;
pub mod clock;
pub mod composition;
pub mod config;
pub mod diff;
pub mod engine;
pub mod error;
pub mod item;
pub mod metrics;
pub mod pool;
pub mod rotator;
pub mod runtime;
pub mod speech;
pub mod stats;
pub mod time_series;
pub mod ui;
pub mod util;

pub use engine::{EngineEvent, PracticeEngine, SessionSpec, Snapshot};
pub use error::{Result, TadakError};
