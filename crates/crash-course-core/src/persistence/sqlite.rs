use super::{PersistenceError, PersistenceResult, SyllabusStore};
use crate::calendar::{StudyCalendar, StudyCalendarConfig};
use crate::{CrashCoursePlan, Flashcard, PlanMetadata, Syllabus, Topic, Upload};
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// SQLite-backed store for the syllabus, generated plans, uploads and flashcards.
pub struct SqliteStore {
    connection: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<std::path::Path>>(path: P) -> PersistenceResult<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn in_memory() -> PersistenceResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(connection: Connection) -> PersistenceResult<Self> {
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn initialize_schema(connection: &Connection) -> PersistenceResult<()> {
        let ddl = r#"
            PRAGMA foreign_keys = ON;
            CREATE TABLE IF NOT EXISTS syllabus_metadata (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                metadata_json TEXT NOT NULL,
                calendar_json TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS topics (
                id INTEGER PRIMARY KEY,
                topic_json TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS plans (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                exam_name TEXT NOT NULL,
                plan_json TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS uploads (
                id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                upload_json TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS flashcards (
                id INTEGER PRIMARY KEY,
                topic_id INTEGER NOT NULL,
                card_json TEXT NOT NULL
            );
        "#;
        connection.execute_batch(ddl)?;
        Ok(())
    }

    fn lock(&self) -> PersistenceResult<MutexGuard<'_, Connection>> {
        self.connection
            .lock()
            .map_err(|_| PersistenceError::InvalidData("sqlite connection lock poisoned".into()))
    }

    fn save_metadata(tx: &Transaction, syllabus: &Syllabus) -> PersistenceResult<()> {
        let metadata_json = serde_json::to_string(syllabus.metadata())?;
        let calendar_json = serde_json::to_string(&syllabus.calendar_config())?;
        tx.execute("DELETE FROM syllabus_metadata", [])?;
        tx.execute(
            "INSERT INTO syllabus_metadata (id, metadata_json, calendar_json) VALUES (1, ?1, ?2)",
            params![metadata_json, calendar_json],
        )?;
        Ok(())
    }

    fn save_topics(tx: &Transaction, topics: &[Topic]) -> PersistenceResult<()> {
        tx.execute("DELETE FROM topics", [])?;
        let mut stmt = tx.prepare("INSERT INTO topics (id, topic_json) VALUES (?1, ?2)")?;
        for topic in topics {
            stmt.execute(params![topic.id, serde_json::to_string(topic)?])?;
        }
        Ok(())
    }

    /// Appends a generated plan; older plans are kept as history.
    pub fn save_plan(&self, plan: &CrashCoursePlan) -> PersistenceResult<i64> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO plans (exam_name, plan_json) VALUES (?1, ?2)",
            params![plan.exam_name, serde_json::to_string(plan)?],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn latest_plan(&self) -> PersistenceResult<Option<CrashCoursePlan>> {
        let conn = self.lock()?;
        let json: Option<String> = conn
            .query_row(
                "SELECT plan_json FROM plans ORDER BY id DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        json.map(|json| serde_json::from_str(&json).map_err(PersistenceError::from))
            .transpose()
    }

    pub fn save_upload(&self, upload: &Upload) -> PersistenceResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO uploads (id, status, upload_json) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET status = excluded.status, upload_json = excluded.upload_json",
            params![
                upload.id.to_string(),
                upload.status.as_str(),
                serde_json::to_string(upload)?
            ],
        )?;
        Ok(())
    }

    pub fn load_uploads(&self) -> PersistenceResult<Vec<Upload>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT upload_json FROM uploads")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut uploads = Vec::new();
        for json in rows {
            uploads.push(serde_json::from_str::<Upload>(&json?)?);
        }
        uploads.sort_by_key(|upload| upload.created_at);
        Ok(uploads)
    }

    pub fn save_flashcard(&self, card: &Flashcard) -> PersistenceResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO flashcards (id, topic_id, card_json) VALUES (?1, ?2, ?3)",
            params![card.id, card.topic_id, serde_json::to_string(card)?],
        )?;
        Ok(())
    }

    pub fn delete_flashcard(&self, id: i32) -> PersistenceResult<bool> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM flashcards WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }

    pub fn load_flashcards(&self, topic_id: Option<i32>) -> PersistenceResult<Vec<Flashcard>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT card_json FROM flashcards WHERE ?1 IS NULL OR topic_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![topic_id], |row| row.get::<_, String>(0))?;
        let mut cards = Vec::new();
        for json in rows {
            cards.push(serde_json::from_str::<Flashcard>(&json?)?);
        }
        Ok(cards)
    }
}

impl SyllabusStore for SqliteStore {
    fn save_syllabus(&self, syllabus: &Syllabus) -> PersistenceResult<()> {
        let topics = syllabus.topics()?;
        super::validate_topics(&topics)?;
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        Self::save_metadata(&tx, syllabus)?;
        Self::save_topics(&tx, &topics)?;
        tx.commit()?;
        debug!(topics = topics.len(), "saved syllabus to sqlite");
        Ok(())
    }

    fn load_syllabus(&self) -> PersistenceResult<Option<Syllabus>> {
        let conn = self.lock()?;

        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT metadata_json, calendar_json FROM syllabus_metadata WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((metadata_json, calendar_json)) = row else {
            return Ok(None);
        };

        let metadata: PlanMetadata = serde_json::from_str(&metadata_json)?;
        let calendar_config: StudyCalendarConfig = serde_json::from_str(&calendar_json)?;

        let mut stmt = conn.prepare("SELECT topic_json FROM topics ORDER BY id ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut topics = Vec::new();
        for json in rows {
            topics.push(serde_json::from_str::<Topic>(&json?)?);
        }
        super::validate_topics(&topics)?;

        let calendar = StudyCalendar::from_config(&calendar_config)?;
        let mut syllabus = Syllabus::new_with_metadata_and_calendar(metadata, calendar)?;
        for topic in topics {
            syllabus.upsert_topic_record(topic)?;
        }
        Ok(Some(syllabus))
    }
}
