//! # Run History
//!
//! Finalized run reports recorded in a SQLite file, for comparing runs
//! against the same target over time.

use std::fs;
use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;

use crate::error::HistoryError;
use crate::testing::RunReport;

/// Summary row for one recorded run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub started_at_ms: u64,
    pub finished_at_ms: u64,
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    pub overall_success: bool,
    pub aborted: bool,
}

pub struct HistoryStore {
    conn: Connection,
}

impl HistoryStore {
    pub fn open(path: &Path) -> Result<Self, HistoryError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| HistoryError::Directory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, HistoryError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, HistoryError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS runs (
               id INTEGER PRIMARY KEY AUTOINCREMENT,
               started_at INTEGER NOT NULL,
               finished_at INTEGER NOT NULL,
               total INTEGER NOT NULL,
               passed INTEGER NOT NULL,
               failed INTEGER NOT NULL,
               overall_success INTEGER NOT NULL,
               aborted INTEGER NOT NULL DEFAULT 0,
               report_json TEXT NOT NULL
             );",
        )?;
        Ok(Self { conn })
    }

    /// Store a finalized report, returning its row id.
    pub fn record(&self, report: &RunReport) -> Result<i64, HistoryError> {
        let report_json = serde_json::to_string(report)?;
        self.conn.execute(
            "INSERT INTO runs
               (started_at, finished_at, total, passed, failed, overall_success, aborted, report_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                report.started_at_ms as i64,
                report.finished_at_ms as i64,
                report.total as i64,
                report.passed as i64,
                report.failed as i64,
                report.overall_success,
                report.aborted,
                report_json,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent runs first.
    pub fn recent(&self, limit: usize) -> Result<Vec<HistoryEntry>, HistoryError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, started_at, finished_at, total, passed, failed, overall_success, aborted
               FROM runs
              ORDER BY id DESC
              LIMIT ?1;",
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(HistoryEntry {
                id: row.get(0)?,
                started_at_ms: row.get::<_, i64>(1)? as u64,
                finished_at_ms: row.get::<_, i64>(2)? as u64,
                total: row.get::<_, i64>(3)? as u64,
                passed: row.get::<_, i64>(4)? as u64,
                failed: row.get::<_, i64>(5)? as u64,
                overall_success: row.get(6)?,
                aborted: row.get(7)?,
            })
        })?;

        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn load_report(&self, id: i64) -> Result<Option<RunReport>, HistoryError> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT report_json FROM runs WHERE id = ?1 LIMIT 1;",
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        raw.map(|json| serde_json::from_str(&json).map_err(HistoryError::from))
            .transpose()
    }
}
