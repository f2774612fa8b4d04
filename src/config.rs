use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::app_dirs::AppDirs;
use crate::clock::SessionLimit;
use crate::item::{Language, Navigation, PracticeType};

pub const DEFAULT_DURATION_SECS: u64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub practice_type: PracticeType,
    pub language: Language,
    pub duration_secs: Option<u64>,
    pub item_limit: Option<usize>,
    pub speech_rate: f32,
    pub keystroke_bell: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            practice_type: PracticeType::Word,
            language: Language::English,
            duration_secs: Some(DEFAULT_DURATION_SECS),
            item_limit: None,
            speech_rate: 1.0,
            keystroke_bell: false,
        }
    }
}

impl Config {
    /// A configured duration beats an item limit. Browsed documents with
    /// neither end after the last item.
    pub fn session_limit(&self, pool_len: usize) -> SessionLimit {
        if let Some(secs) = self.duration_secs.filter(|s| *s > 0) {
            return SessionLimit::Timed(Duration::from_secs(secs));
        }
        if let Some(limit) = self.item_limit.filter(|n| *n > 0) {
            return SessionLimit::Items(limit);
        }
        match self.practice_type.unit().navigation {
            Navigation::Fixed => SessionLimit::Items(pool_len.max(1)),
            Navigation::Rotating => {
                SessionLimit::Timed(Duration::from_secs(DEFAULT_DURATION_SECS))
            }
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("tadak_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => return cfg,
                Err(err) => log::warn!("ignoring unreadable config {:?}: {err}", self.path),
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("nope.json"));
        assert_eq!(store.load(), Config::default());
    }

    #[test]
    fn save_and_load_custom_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config {
            practice_type: PracticeType::ReadAloud,
            language: Language::Korean,
            duration_secs: None,
            item_limit: Some(12),
            speech_rate: 0.8,
            keystroke_bell: true,
        };
        store.save(&cfg).unwrap();
        assert_eq!(store.load(), cfg);
    }

    #[test]
    fn garbage_and_partial_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);

        fs::write(&path, b"{ not json").unwrap();
        assert_eq!(store.load(), Config::default());

        fs::write(&path, br#"{"language":"korean"}"#).unwrap();
        let cfg = store.load();
        assert_eq!(cfg.language, Language::Korean);
        assert_eq!(cfg.duration_secs, Some(DEFAULT_DURATION_SECS));
    }

    #[test]
    fn time_limit_wins_over_item_limit() {
        let cfg = Config {
            duration_secs: Some(30),
            item_limit: Some(5),
            ..Config::default()
        };
        assert_eq!(
            cfg.session_limit(10),
            SessionLimit::Timed(Duration::from_secs(30))
        );

        let cfg = Config {
            duration_secs: None,
            ..cfg
        };
        assert_eq!(cfg.session_limit(10), SessionLimit::Items(5));
    }

    #[test]
    fn fixed_navigation_defaults_to_pool_length() {
        let cfg = Config {
            practice_type: PracticeType::Paragraph,
            duration_secs: None,
            ..Config::default()
        };
        assert_eq!(cfg.session_limit(4), SessionLimit::Items(4));

        let word = Config {
            duration_secs: None,
            ..Config::default()
        };
        assert_eq!(
            word.session_limit(4),
            SessionLimit::Timed(Duration::from_secs(DEFAULT_DURATION_SECS))
        );
    }
}
