//! Durable job persistence over jobs.db.
//!
//! The claim path is a single UPDATE with a subselect, so two dispatchers
//! polling the same database can never hand out the same job twice.

use super::models::{Job, JobStateError, JobStatus};
use super::schema::JOBS_VERSIONED_SCHEMAS;
use crate::sqlite_persistence;
use anyhow::{bail, Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub trait JobStore: Send + Sync {
    /// Persists a new PENDING job and returns it.
    fn enqueue(&self, job_type: &str, payload: &serde_json::Value) -> Result<Job>;

    fn get_job(&self, id: &str) -> Result<Option<Job>>;

    /// Atomically moves the oldest PENDING job to PROCESSING and returns it,
    /// or None when the queue has no PENDING work.
    fn claim_next(&self) -> Result<Option<Job>>;

    /// Moves a PROCESSING job to COMPLETED.
    fn mark_completed(&self, id: &str) -> Result<()>;

    /// Moves a PROCESSING job to FAILED, incrementing its attempt counter and
    /// recording the error message.
    fn mark_failed(&self, id: &str, error: &str) -> Result<()>;

    /// Jobs in reverse insertion order, optionally restricted to one status.
    fn list(&self, status: Option<JobStatus>, limit: usize, offset: usize) -> Result<Vec<Job>>;

    fn count_by_status(&self, status: JobStatus) -> Result<usize>;
}

pub struct SqliteJobStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteJobStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = sqlite_persistence::open_database(db_path, JOBS_VERSIONED_SCHEMAS)?;
        Ok(SqliteJobStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory store for testing.
    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let conn = sqlite_persistence::open_in_memory(JOBS_VERSIONED_SCHEMAS)?;
        Ok(SqliteJobStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn row_to_job(row: &Row) -> rusqlite::Result<Job> {
        let status_str: String = row.get("status")?;
        let status = JobStatus::from_db_str(&status_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                format!("Unknown job status: {}", status_str).into(),
            )
        })?;
        Ok(Job {
            id: row.get("id")?,
            job_type: row.get("job_type")?,
            payload: row.get("payload")?,
            status,
            created_at: row.get("created_at")?,
            attempts: row.get("attempts")?,
            last_error: row.get("last_error")?,
        })
    }

    fn status_of(conn: &Connection, id: &str) -> Result<Option<String>> {
        let status = conn
            .query_row(
                "SELECT status FROM jobs WHERE id = ?1",
                params![id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(status)
    }
}

impl JobStore for SqliteJobStore {
    fn enqueue(&self, job_type: &str, payload: &serde_json::Value) -> Result<Job> {
        let job = Job {
            id: Uuid::new_v4().to_string(),
            job_type: job_type.to_string(),
            payload: serde_json::to_string(payload).context("Failed to serialize job payload")?,
            status: JobStatus::Pending,
            created_at: Utc::now().timestamp(),
            attempts: 0,
            last_error: None,
        };

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO jobs (id, job_type, payload, status, created_at, attempts)
             VALUES (?1, ?2, ?3, ?4, ?5, 0)",
            params![
                job.id,
                job.job_type,
                job.payload,
                job.status.as_db_str(),
                job.created_at
            ],
        )?;

        Ok(job)
    }

    fn get_job(&self, id: &str) -> Result<Option<Job>> {
        let conn = self.conn.lock().unwrap();
        let job = conn
            .query_row("SELECT * FROM jobs WHERE id = ?1", params![id], |row| {
                Self::row_to_job(row)
            })
            .optional()?;
        Ok(job)
    }

    fn claim_next(&self) -> Result<Option<Job>> {
        let conn = self.conn.lock().unwrap();
        // Subselect picks the oldest PENDING row; the outer status guard makes
        // the update a no-op if another claimant got there first.
        let job = conn
            .query_row(
                "UPDATE jobs SET status = 'PROCESSING'
                 WHERE id = (
                     SELECT id FROM jobs WHERE status = 'PENDING'
                     ORDER BY created_at ASC, rowid ASC LIMIT 1
                 ) AND status = 'PENDING'
                 RETURNING id, job_type, payload, status, created_at, attempts, last_error",
                [],
                |row| Self::row_to_job(row),
            )
            .optional()?;
        Ok(job)
    }

    fn mark_completed(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE jobs SET status = 'COMPLETED' WHERE id = ?1 AND status = 'PROCESSING'",
            params![id],
        )?;
        if updated == 0 {
            match Self::status_of(&conn, id)? {
                None => bail!(JobStateError::NotFound(id.to_string())),
                Some(actual) => bail!(JobStateError::InvalidState {
                    id: id.to_string(),
                    actual: JobStatus::from_db_str(&actual)
                        .map(|s| s.as_db_str())
                        .unwrap_or("UNKNOWN"),
                    expected: "PROCESSING",
                }),
            }
        }
        Ok(())
    }

    fn mark_failed(&self, id: &str, error: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE jobs SET status = 'FAILED', attempts = attempts + 1, last_error = ?2
             WHERE id = ?1 AND status = 'PROCESSING'",
            params![id, error],
        )?;
        if updated == 0 {
            match Self::status_of(&conn, id)? {
                None => bail!(JobStateError::NotFound(id.to_string())),
                Some(actual) => bail!(JobStateError::InvalidState {
                    id: id.to_string(),
                    actual: JobStatus::from_db_str(&actual)
                        .map(|s| s.as_db_str())
                        .unwrap_or("UNKNOWN"),
                    expected: "PROCESSING",
                }),
            }
        }
        Ok(())
    }

    fn list(&self, status: Option<JobStatus>, limit: usize, offset: usize) -> Result<Vec<Job>> {
        let conn = self.conn.lock().unwrap();
        let jobs = match status {
            Some(status) => {
                let mut stmt = conn.prepare(
                    "SELECT * FROM jobs WHERE status = ?1
                     ORDER BY created_at DESC, rowid DESC LIMIT ?2 OFFSET ?3",
                )?;
                let jobs = stmt
                    .query_map(params![status.as_db_str(), limit, offset], |row| {
                        Self::row_to_job(row)
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                jobs
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT * FROM jobs ORDER BY created_at DESC, rowid DESC LIMIT ?1 OFFSET ?2",
                )?;
                let jobs = stmt
                    .query_map(params![limit, offset], |row| Self::row_to_job(row))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                jobs
            }
        };
        Ok(jobs)
    }

    fn count_by_status(&self, status: JobStatus) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM jobs WHERE status = ?1",
            params![status.as_db_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
