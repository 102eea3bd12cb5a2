use chrono::{DateTime, Local};
use rusqlite::{params, Connection, Result};
use std::path::Path;
use std::time::Duration;

use crate::lesson::Mode;
use crate::stats::LessonStats;

/// One completed lesson attempt
#[derive(Debug, Clone, PartialEq)]
pub struct LessonResult {
    pub mode: Mode,
    pub theme: Option<String>,
    pub lesson_id: u32,
    pub stats: LessonStats,
    pub keystrokes: u32,
    pub elapsed: Duration,
    pub timestamp: DateTime<Local>,
}

/// Log of finished lessons, kept next to the progress store
#[derive(Debug)]
pub struct HistoryDb {
    conn: Connection,
}

impl HistoryDb {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS lesson_results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                mode TEXT NOT NULL,
                theme TEXT,
                lesson_id INTEGER NOT NULL,
                speed INTEGER NOT NULL,
                accuracy INTEGER NOT NULL,
                speed_bonus INTEGER NOT NULL,
                accuracy_bonus INTEGER NOT NULL,
                keystrokes INTEGER NOT NULL,
                elapsed_ms INTEGER NOT NULL,
                timestamp TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_lesson_results_lesson ON lesson_results(mode, lesson_id)",
            [],
        )?;

        Ok(Self { conn })
    }

    pub fn record(&self, result: &LessonResult) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO lesson_results
            (mode, theme, lesson_id, speed, accuracy, speed_bonus, accuracy_bonus, keystrokes, elapsed_ms, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                result.mode.storage_name(),
                result.theme,
                result.lesson_id,
                result.stats.speed,
                result.stats.accuracy,
                result.stats.speed_bonus,
                result.stats.accuracy_bonus,
                result.keystrokes,
                result.elapsed.as_millis() as i64,
                result.timestamp.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    /// Most recent results first
    pub fn recent(&self, limit: usize) -> Result<Vec<LessonResult>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT mode, theme, lesson_id, speed, accuracy, speed_bonus, accuracy_bonus,
                   keystrokes, elapsed_ms, timestamp
            FROM lesson_results
            ORDER BY id DESC
            LIMIT ?1
            "#,
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            let mode = match row.get::<_, String>(0)?.as_str() {
                "story" => Mode::Story,
                _ => Mode::Training,
            };
            let timestamp_str: String = row.get(9)?;
            let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
                .map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        9,
                        "timestamp".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?
                .with_timezone(&Local);

            Ok(LessonResult {
                mode,
                theme: row.get(1)?,
                lesson_id: row.get(2)?,
                stats: LessonStats {
                    speed: row.get(3)?,
                    accuracy: row.get(4)?,
                    speed_bonus: row.get(5)?,
                    accuracy_bonus: row.get(6)?,
                },
                keystrokes: row.get(7)?,
                elapsed: Duration::from_millis(row.get::<_, i64>(8)?.max(0) as u64),
                timestamp,
            })
        })?;

        let results = rows.collect::<Result<Vec<_>>>()?;
        Ok(results)
    }

    /// Best speed reached on a lesson, if it was ever completed
    pub fn best_speed(&self, mode: Mode, lesson_id: u32) -> Result<Option<u32>> {
        self.conn.query_row(
            "SELECT MAX(speed) FROM lesson_results WHERE mode = ?1 AND lesson_id = ?2",
            params![mode.storage_name(), lesson_id],
            |row| row.get(0),
        )
    }

    pub fn clear(&self) -> Result<()> {
        self.conn.execute("DELETE FROM lesson_results", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(lesson_id: u32, speed: u32) -> LessonResult {
        LessonResult {
            mode: Mode::Training,
            theme: None,
            lesson_id,
            stats: LessonStats {
                speed,
                accuracy: 96,
                speed_bonus: 10,
                accuracy_bonus: 25,
            },
            keystrokes: 16,
            elapsed: Duration::from_millis(4200),
            timestamp: Local::now(),
        }
    }

    #[test]
    fn test_record_and_recent() {
        let db = HistoryDb::open_in_memory().unwrap();
        db.record(&result(1, 30)).unwrap();
        db.record(&result(2, 35)).unwrap();

        let recent = db.recent(10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].lesson_id, 2);
        assert_eq!(recent[1].stats.speed, 30);
        assert_eq!(recent[1].elapsed, Duration::from_millis(4200));
        assert_eq!(recent[1].mode, Mode::Training);
    }

    #[test]
    fn test_recent_respects_limit() {
        let db = HistoryDb::open_in_memory().unwrap();
        for id in 1..=5 {
            db.record(&result(id, 20)).unwrap();
        }
        assert_eq!(db.recent(3).unwrap().len(), 3);
    }

    #[test]
    fn test_story_theme_roundtrip() {
        let db = HistoryDb::open_in_memory().unwrap();
        let mut story = result(3, 44);
        story.mode = Mode::Story;
        story.theme = Some("matrix".to_string());
        db.record(&story).unwrap();

        let recent = db.recent(1).unwrap();
        assert_eq!(recent[0].mode, Mode::Story);
        assert_eq!(recent[0].theme.as_deref(), Some("matrix"));
    }

    #[test]
    fn test_best_speed() {
        let db = HistoryDb::open_in_memory().unwrap();
        assert_eq!(db.best_speed(Mode::Training, 1).unwrap(), None);

        db.record(&result(1, 30)).unwrap();
        db.record(&result(1, 52)).unwrap();
        db.record(&result(2, 80)).unwrap();

        assert_eq!(db.best_speed(Mode::Training, 1).unwrap(), Some(52));
        assert_eq!(db.best_speed(Mode::Story, 1).unwrap(), None);
    }

    #[test]
    fn test_clear() {
        let db = HistoryDb::open_in_memory().unwrap();
        db.record(&result(1, 30)).unwrap();
        db.clear().unwrap();
        assert!(db.recent(10).unwrap().is_empty());
    }
}
