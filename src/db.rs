use chrono::{SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::*;

/// Maximum number of rows returned by a history listing
pub const HISTORY_LIMIT: usize = 50;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS scans (
    id TEXT PRIMARY KEY,
    domain TEXT NOT NULL,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS reports (
    id TEXT PRIMARY KEY,
    scan_id TEXT NOT NULL REFERENCES scans(id),
    domain TEXT NOT NULL,
    sector TEXT NOT NULL,
    score INTEGER NOT NULL,
    metrics TEXT NOT NULL,
    query_results TEXT NOT NULL,
    recommendations TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_reports_domain ON reports(domain);
CREATE INDEX IF NOT EXISTS idx_reports_created_at ON reports(created_at);
";

/// Sortable UTC timestamp
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Record store for scans and reports.
///
/// The pipeline is the only writer: it creates a scan, moves it to a
/// terminal status once, and inserts the report in a single call.
pub trait ScanStore: Send + Sync {
    fn create_scan(&self, domain: &str, status: ScanStatus) -> Result<Scan, StoreError>;

    fn update_scan_status(&self, scan_id: &str, status: ScanStatus) -> Result<(), StoreError>;

    fn get_scan(&self, scan_id: &str) -> Result<Option<Scan>, StoreError>;

    fn insert_report(&self, report: &NewReport) -> Result<Report, StoreError>;

    fn get_report(&self, report_id: &str) -> Result<Option<Report>, StoreError>;

    /// Newest reports first, optionally for one exact domain
    fn list_history(
        &self,
        domain: Option<&str>,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>, StoreError>;
}

/// SQLite-backed store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database file and ensure the schema exists
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl ScanStore for SqliteStore {
    fn create_scan(&self, domain: &str, status: ScanStatus) -> Result<Scan, StoreError> {
        let conn = self.conn()?;
        let now = timestamp();
        let scan = Scan {
            id: new_id(),
            domain: domain.to_string(),
            status,
            created_at: now.clone(),
            updated_at: now,
        };

        conn.execute(
            "INSERT INTO scans (id, domain, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![scan.id, scan.domain, status.as_str(), scan.created_at, scan.updated_at],
        )?;

        Ok(scan)
    }

    fn update_scan_status(&self, scan_id: &str, status: ScanStatus) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE scans SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), timestamp(), scan_id],
        )?;

        if changed == 0 {
            return Err(StoreError::NotFound(scan_id.to_string()));
        }
        Ok(())
    }

    fn get_scan(&self, scan_id: &str) -> Result<Option<Scan>, StoreError> {
        let conn = self.conn()?;

        let row = conn
            .query_row(
                "SELECT id, domain, status, created_at, updated_at
                 FROM scans
                 WHERE id = ?",
                [scan_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, domain, status, created_at, updated_at)) = row else {
            return Ok(None);
        };

        let status = status
            .parse::<ScanStatus>()
            .map_err(|reason| StoreError::Corrupt { id: id.clone(), reason })?;

        Ok(Some(Scan {
            id,
            domain,
            status,
            created_at,
            updated_at,
        }))
    }

    fn insert_report(&self, report: &NewReport) -> Result<Report, StoreError> {
        let metrics = serde_json::to_string(&report.metrics)?;
        let query_results = serde_json::to_string(&report.query_results)?;
        let recommendations = serde_json::to_string(&report.recommendations)?;

        let stored = Report {
            id: new_id(),
            scan_id: report.scan_id.clone(),
            domain: report.domain.clone(),
            sector: report.sector.clone(),
            metrics: report.metrics.clone(),
            query_results: report.query_results.clone(),
            recommendations: report.recommendations.clone(),
            created_at: timestamp(),
        };

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO reports
                (id, scan_id, domain, sector, score, metrics, query_results, recommendations, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                stored.id,
                stored.scan_id,
                stored.domain,
                stored.sector,
                stored.metrics.visibility_score,
                metrics,
                query_results,
                recommendations,
                stored.created_at,
            ],
        )?;

        Ok(stored)
    }

    fn get_report(&self, report_id: &str) -> Result<Option<Report>, StoreError> {
        let conn = self.conn()?;

        let row = conn
            .query_row(
                "SELECT
                    id, scan_id, domain, sector,
                    metrics, query_results, recommendations, created_at
                 FROM reports
                 WHERE id = ?",
                [report_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, String>(7)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, scan_id, domain, sector, metrics, query_results, recommendations, created_at)) =
            row
        else {
            return Ok(None);
        };

        Ok(Some(Report {
            id,
            scan_id,
            domain,
            sector,
            metrics: serde_json::from_str(&metrics)?,
            query_results: serde_json::from_str(&query_results)?,
            recommendations: serde_json::from_str(&recommendations)?,
            created_at,
        }))
    }

    fn list_history(
        &self,
        domain: Option<&str>,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>, StoreError> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT id, scan_id, domain, score, created_at
             FROM reports
             WHERE ?1 IS NULL OR domain = ?1
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?2",
        )?;

        let history = stmt
            .query_map(params![domain, limit as i64], |row| {
                Ok(HistoryEntry {
                    report_id: row.get(0)?,
                    scan_id: row.get(1)?,
                    domain: row.get(2)?,
                    score: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(history)
    }
}
