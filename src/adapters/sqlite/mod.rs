//! SQLite adapter: Implementation of PredictionStore.
//!
//! Provides local persistence for the analysis history.
//!
//! # Durability
//!
//! File databases run in WAL mode with `synchronous = FULL`, so a committed
//! append survives a crash immediately after `append` returns. Each append is
//! a single `IMMEDIATE` transaction: readers see the whole row or nothing.
//!
//! # Mutex Behavior
//!
//! The connection is protected by a `Mutex`. A poisoned mutex (from a panic
//! in another thread) is reported as `StoreError::Poisoned` rather than
//! retried.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row, TransactionBehavior};

use crate::domain::{
    HistoryRecord, PatientIdentity, PatientInput, PredictionResult, RecordId, Sex,
};
use crate::ports::{HistoryPage, PredictionStore, SortDirection};

/// Upper bound on how long a writer waits for another connection's lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = r"
    CREATE TABLE IF NOT EXISTS history (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        patient_ref TEXT,
        patient_name TEXT,
        age INTEGER NOT NULL,
        sex TEXT NOT NULL CHECK (sex IN ('Male', 'Female')),
        chest_pain_type INTEGER NOT NULL,
        resting_bp INTEGER NOT NULL,
        cholesterol INTEGER NOT NULL,
        fasting_sugar_high INTEGER NOT NULL,
        resting_ecg INTEGER NOT NULL,
        max_heart_rate INTEGER NOT NULL,
        exercise_angina INTEGER NOT NULL,
        st_depression REAL NOT NULL,
        st_slope INTEGER NOT NULL,
        major_vessels INTEGER NOT NULL,
        thalassemia INTEGER NOT NULL,
        result_text TEXT NOT NULL,
        risk_percent INTEGER NOT NULL CHECK (risk_percent BETWEEN 0 AND 100),
        created_at TEXT NOT NULL
    );
";

const SELECT_COLUMNS: &str = r"
    SELECT id, patient_ref, patient_name, age, sex, chest_pain_type, resting_bp,
           cholesterol, fasting_sugar_high, resting_ecg, max_heart_rate,
           exercise_angina, st_depression, st_slope, major_vessels, thalassemia,
           result_text, risk_percent, created_at
    FROM history
";

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database lock poisoned")]
    Poisoned,
}

/// SQLite storage adapter.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the history database at the given path.
    ///
    /// Opening an existing database never resets it.
    ///
    /// # Errors
    /// Returns error if database cannot be opened or initialized.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.pragma_update(None, "synchronous", "FULL")?;
        tracing::debug!("Opened history database (journal_mode={mode})");

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory SQLite database (for testing).
    ///
    /// # Errors
    /// Returns error if database cannot be created.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Initialize the database schema. Idempotent.
    fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Map one `SELECT_COLUMNS` row to a record.
    fn record_from_row(row: &Row<'_>) -> rusqlite::Result<HistoryRecord> {
        let sex_label: String = row.get(4)?;
        let sex = Sex::parse(&sex_label).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                rusqlite::types::Type::Text,
                format!("unknown sex label {sex_label:?}").into(),
            )
        })?;

        let created_at_str: String = row.get(18)?;
        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    18,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;

        Ok(HistoryRecord {
            id: RecordId(row.get(0)?),
            identity: PatientIdentity {
                patient_ref: row.get(1)?,
                name: row.get(2)?,
            },
            input: PatientInput {
                age: row.get(3)?,
                sex,
                chest_pain_type: row.get(5)?,
                resting_bp: row.get(6)?,
                cholesterol: row.get(7)?,
                fasting_sugar_high: row.get(8)?,
                resting_ecg: row.get(9)?,
                max_heart_rate: row.get(10)?,
                exercise_angina: row.get(11)?,
                st_depression: row.get(12)?,
                st_slope: row.get(13)?,
                major_vessels: row.get(14)?,
                thalassemia: row.get(15)?,
            },
            result_text: row.get(16)?,
            risk_percent: row.get(17)?,
            created_at,
        })
    }
}

impl PredictionStore for SqliteStore {
    type Error = StoreError;

    fn append(
        &self,
        identity: &PatientIdentity,
        input: &PatientInput,
        result: &PredictionResult,
    ) -> Result<RecordId, Self::Error> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            r"
            INSERT INTO history (
                patient_ref, patient_name, age, sex, chest_pain_type, resting_bp,
                cholesterol, fasting_sugar_high, resting_ecg, max_heart_rate,
                exercise_angina, st_depression, st_slope, major_vessels, thalassemia,
                result_text, risk_percent, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
            ",
            params![
                identity.patient_ref,
                identity.name,
                input.age,
                input.sex.label(),
                input.chest_pain_type,
                input.resting_bp,
                input.cholesterol,
                input.fasting_sugar_high,
                input.resting_ecg,
                input.max_heart_rate,
                input.exercise_angina,
                input.st_depression,
                input.st_slope,
                input.major_vessels,
                input.thalassemia,
                result.result_text(),
                result.risk_percent,
                result.created_at.to_rfc3339(),
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        tracing::debug!("Appended history record {id}");
        Ok(RecordId(id))
    }

    fn list_all(&self, direction: SortDirection) -> Result<Vec<HistoryRecord>, Self::Error> {
        let conn = self.lock()?;
        let order = match direction {
            SortDirection::Ascending => "ORDER BY id ASC",
            SortDirection::Descending => "ORDER BY id DESC",
        };

        let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} {order}"))?;
        let records = stmt
            .query_map([], Self::record_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn list_page(&self, offset: usize, limit: usize) -> Result<HistoryPage, Self::Error> {
        let conn = self.lock()?;

        // Count and page read under one lock so they agree.
        let total_count: i64 = conn.query_row("SELECT COUNT(*) FROM history", [], |row| row.get(0))?;

        let mut stmt = conn.prepare(&format!(
            "{SELECT_COLUMNS} ORDER BY id DESC LIMIT ?1 OFFSET ?2"
        ))?;
        let records = stmt
            .query_map(params![limit as i64, offset as i64], Self::record_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(HistoryPage::new(records, total_count as usize, offset, limit))
    }

    fn count(&self) -> Result<usize, Self::Error> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM history", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Label;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn identity() -> PatientIdentity {
        PatientIdentity::new("P-001", "Jane Roe")
    }

    #[test]
    fn test_append_then_list() {
        let store = SqliteStore::in_memory().expect("Should create db");
        assert_eq!(store.count().expect("Should count"), 0);

        let input = PatientInput::sample();
        let result = PredictionResult::from_probability(Label::Present, 0.82);

        let first = store.append(&identity(), &input, &result).expect("Should append");
        let second = store
            .append(&PatientIdentity::default(), &input, &result)
            .expect("Should append");
        assert!(second > first);

        let records = store.list_all(SortDirection::Descending).expect("Should list");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, second);
        assert_eq!(records[1].id, first);

        let stored = &records[1];
        assert_eq!(stored.input, input);
        assert_eq!(stored.identity, identity());
        assert_eq!(stored.result_text, "High risk");
        assert_eq!(stored.risk_percent, 82);
        assert_eq!(stored.created_at, result.created_at);
        assert!(records[0].identity.is_empty());

        let ascending = store.list_all(SortDirection::Ascending).expect("Should list");
        assert_eq!(ascending[0].id, first);
    }

    #[test]
    fn test_sex_persisted_as_label() {
        let store = SqliteStore::in_memory().expect("Should create db");
        let result = PredictionResult::fallback(Label::Absent);
        store
            .append(&identity(), &PatientInput::sample(), &result)
            .expect("Should append");

        let conn = store.lock().expect("Should lock");
        let sex: String = conn
            .query_row("SELECT sex FROM history", [], |row| row.get(0))
            .expect("Should query");
        assert_eq!(sex, "Male");
    }

    #[test]
    fn test_failed_append_writes_nothing() {
        let store = SqliteStore::in_memory().expect("Should create db");
        let mut result = PredictionResult::from_probability(Label::Present, 0.5);
        result.risk_percent = 150;

        let err = store.append(&identity(), &PatientInput::sample(), &result);
        assert!(err.is_err());
        assert_eq!(store.count().expect("Should count"), 0);
    }

    #[test]
    fn test_reopen_preserves_data() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("history.db");
        let result = PredictionResult::from_probability(Label::Absent, 0.2);

        let id = {
            let store = SqliteStore::open(&path).expect("Should open");
            store
                .append(&identity(), &PatientInput::sample(), &result)
                .expect("Should append")
        };

        let reopened = SqliteStore::open(&path).expect("Should reopen");
        let records = reopened.list_all(SortDirection::Descending).expect("Should list");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, id);

        let next = reopened
            .append(&identity(), &PatientInput::sample(), &result)
            .expect("Should append");
        assert!(next > id);
    }

    #[test]
    fn test_concurrent_appends_get_distinct_increasing_ids() {
        let temp = tempdir().expect("tempdir");
        let store = Arc::new(SqliteStore::open(temp.path().join("history.db")).expect("Should open"));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let result = PredictionResult::from_probability(Label::Present, 0.7);
                    (0..10)
                        .map(|_| {
                            store
                                .append(&PatientIdentity::default(), &PatientInput::sample(), &result)
                                .expect("Should append")
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids: Vec<RecordId> = Vec::new();
        for handle in handles {
            let thread_ids = handle.join().expect("thread");
            assert!(thread_ids.windows(2).all(|w| w[0] < w[1]));
            ids.extend(thread_ids);
        }

        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 40);
        assert_eq!(store.count().expect("Should count"), 40);
    }

    #[test]
    fn test_pagination() {
        let store = SqliteStore::in_memory().expect("Should create db");
        let result = PredictionResult::fallback(Label::Present);
        for _ in 0..5 {
            store
                .append(&identity(), &PatientInput::sample(), &result)
                .expect("Should append");
        }

        let page = store.list_page(0, 2).expect("Should page");
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total_count, 5);
        assert!(page.has_more);
        assert!(page.items[0].id > page.items[1].id);

        let last = store.list_page(4, 2).expect("Should page");
        assert_eq!(last.items.len(), 1);
        assert!(!last.has_more);
    }
}
