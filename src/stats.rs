use chrono::{DateTime, Local};
use clap::ValueEnum;
use log::debug;
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::error::Result;
use crate::item::PracticeType;

/// What a finished session hands to persistence, exactly once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub items_completed: usize,
    pub total_characters: usize,
    pub correct_characters: usize,
    pub elapsed_ms: u64,
    pub practice_type: PracticeType,
    pub wpm: u32,
    pub accuracy: u32,
    pub wpm_std_dev: f64,
    pub finished_at: DateTime<Local>,
}

/// Receives the summary of every completed session
pub trait SummarySink {
    fn session_complete(&mut self, summary: &SessionSummary) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsTotals {
    pub sessions: usize,
    pub total_characters: usize,
    pub correct_characters: usize,
    pub elapsed_ms: u64,
}

/// Session history backed by SQLite
#[derive(Debug)]
pub struct StatsDb {
    conn: Connection,
}

const SUMMARY_COLUMNS: &str = "items_completed, total_characters, correct_characters, elapsed_ms, \
     practice_type, wpm, accuracy, wpm_std_dev, finished_at";

impl StatsDb {
    /// Open the database under the state dir, creating it if needed
    pub fn new() -> Result<Self> {
        let db_path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("tadak_sessions.db"));
        Self::open(db_path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS session_summaries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                items_completed INTEGER NOT NULL,
                total_characters INTEGER NOT NULL,
                correct_characters INTEGER NOT NULL,
                elapsed_ms INTEGER NOT NULL,
                practice_type TEXT NOT NULL,
                wpm INTEGER NOT NULL,
                accuracy INTEGER NOT NULL,
                wpm_std_dev REAL NOT NULL,
                finished_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_session_summaries_type ON session_summaries(practice_type)",
            [],
        )?;

        Ok(StatsDb { conn })
    }

    pub fn record_summary(&self, summary: &SessionSummary) -> Result<i64> {
        self.conn.execute(
            &format!(
                "INSERT INTO session_summaries ({SUMMARY_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
            ),
            params![
                summary.items_completed as i64,
                summary.total_characters as i64,
                summary.correct_characters as i64,
                summary.elapsed_ms as i64,
                summary.practice_type.to_string(),
                summary.wpm,
                summary.accuracy,
                summary.wpm_std_dev,
                summary.finished_at.to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent first
    pub fn recent(&self, limit: usize) -> Result<Vec<SessionSummary>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SUMMARY_COLUMNS} FROM session_summaries ORDER BY id DESC LIMIT ?1"
        ))?;
        let rows = stmt.query_map([limit as i64], summary_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Oldest first
    pub fn all(&self) -> Result<Vec<SessionSummary>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SUMMARY_COLUMNS} FROM session_summaries ORDER BY id ASC"
        ))?;
        let rows = stmt.query_map([], summary_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn best_wpm(&self, practice_type: PracticeType) -> Result<Option<u32>> {
        let best: Option<u32> = self.conn.query_row(
            "SELECT MAX(wpm) FROM session_summaries WHERE practice_type = ?1",
            [practice_type.to_string()],
            |row| row.get(0),
        )?;
        Ok(best)
    }

    pub fn totals(&self) -> Result<StatsTotals> {
        let totals = self.conn.query_row(
            r#"
            SELECT COUNT(*),
                   COALESCE(SUM(total_characters), 0),
                   COALESCE(SUM(correct_characters), 0),
                   COALESCE(SUM(elapsed_ms), 0)
            FROM session_summaries
            "#,
            [],
            |row| {
                Ok(StatsTotals {
                    sessions: row.get::<_, i64>(0)? as usize,
                    total_characters: row.get::<_, i64>(1)? as usize,
                    correct_characters: row.get::<_, i64>(2)? as usize,
                    elapsed_ms: row.get::<_, i64>(3)? as u64,
                })
            },
        )?;
        Ok(totals)
    }

    pub fn clear_all(&self) -> Result<()> {
        self.conn.execute("DELETE FROM session_summaries", [])?;
        Ok(())
    }

    /// Write every session as CSV, returning the number of rows
    pub fn export_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let summaries = self.all()?;
        let mut wtr = csv::Writer::from_writer(writer);
        for summary in &summaries {
            wtr.serialize(summary)?;
        }
        wtr.flush()?;
        Ok(summaries.len())
    }
}

impl SummarySink for StatsDb {
    fn session_complete(&mut self, summary: &SessionSummary) -> Result<()> {
        let id = self.record_summary(summary)?;
        debug!("stored session summary #{id}");
        Ok(())
    }
}

fn summary_from_row(row: &Row<'_>) -> rusqlite::Result<SessionSummary> {
    let practice_type: String = row.get(4)?;
    let practice_type = PracticeType::from_str(&practice_type, false).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, e.into())
    })?;

    let finished_at: String = row.get(8)?;
    let finished_at = DateTime::parse_from_rfc3339(&finished_at)
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
        })?
        .with_timezone(&Local);

    Ok(SessionSummary {
        items_completed: row.get::<_, i64>(0)? as usize,
        total_characters: row.get::<_, i64>(1)? as usize,
        correct_characters: row.get::<_, i64>(2)? as usize,
        elapsed_ms: row.get::<_, i64>(3)? as u64,
        practice_type,
        wpm: row.get(5)?,
        accuracy: row.get(6)?,
        wpm_std_dev: row.get(7)?,
        finished_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(practice_type: PracticeType, wpm: u32) -> SessionSummary {
        SessionSummary {
            items_completed: 3,
            total_characters: 30,
            correct_characters: 27,
            elapsed_ms: 60_000,
            practice_type,
            wpm,
            accuracy: 90,
            wpm_std_dev: 1.5,
            finished_at: Local::now(),
        }
    }

    #[test]
    fn record_and_read_back() {
        let db = StatsDb::open_in_memory().unwrap();
        let stored = summary(PracticeType::ReadAloud, 42);
        db.record_summary(&stored).unwrap();

        let recent = db.recent(10).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].practice_type, PracticeType::ReadAloud);
        assert_eq!(recent[0].wpm, 42);
        assert_eq!(recent[0].correct_characters, 27);
        assert_eq!(
            recent[0].finished_at.timestamp(),
            stored.finished_at.timestamp()
        );
    }

    #[test]
    fn recent_is_newest_first_and_limited() {
        let db = StatsDb::open_in_memory().unwrap();
        for wpm in [10, 20, 30] {
            db.record_summary(&summary(PracticeType::Word, wpm)).unwrap();
        }
        let recent = db.recent(2).unwrap();
        let wpms: Vec<u32> = recent.iter().map(|s| s.wpm).collect();
        assert_eq!(wpms, vec![30, 20]);
    }

    #[test]
    fn best_wpm_per_practice_type() {
        let db = StatsDb::open_in_memory().unwrap();
        assert_eq!(db.best_wpm(PracticeType::Word).unwrap(), None);
        db.record_summary(&summary(PracticeType::Word, 35)).unwrap();
        db.record_summary(&summary(PracticeType::Word, 48)).unwrap();
        db.record_summary(&summary(PracticeType::Row, 90)).unwrap();
        assert_eq!(db.best_wpm(PracticeType::Word).unwrap(), Some(48));
    }

    #[test]
    fn totals_and_clear() {
        let db = StatsDb::open_in_memory().unwrap();
        assert_eq!(db.totals().unwrap(), StatsTotals::default());
        db.record_summary(&summary(PracticeType::Word, 35)).unwrap();
        db.record_summary(&summary(PracticeType::Sentence, 40)).unwrap();

        let totals = db.totals().unwrap();
        assert_eq!(totals.sessions, 2);
        assert_eq!(totals.total_characters, 60);
        assert_eq!(totals.correct_characters, 54);
        assert_eq!(totals.elapsed_ms, 120_000);

        db.clear_all().unwrap();
        assert_eq!(db.totals().unwrap().sessions, 0);
    }

    #[test]
    fn sink_records_summary() {
        let mut db = StatsDb::open_in_memory().unwrap();
        db.session_complete(&summary(PracticeType::Dictation, 12))
            .unwrap();
        assert_eq!(db.all().unwrap().len(), 1);
    }

    #[test]
    fn csv_export_has_header_and_rows() {
        let db = StatsDb::open_in_memory().unwrap();
        db.record_summary(&summary(PracticeType::Paragraph, 50)).unwrap();

        let mut out = Vec::new();
        assert_eq!(db.export_csv(&mut out).unwrap(), 1);
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("items_completed,total_characters"));
        assert!(lines.next().unwrap().contains(",paragraph,50,"));
    }

    #[test]
    fn open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sessions.db");
        let db = StatsDb::open(&path).unwrap();
        db.record_summary(&summary(PracticeType::Word, 1)).unwrap();
        assert!(path.exists());
    }
}
