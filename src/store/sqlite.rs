use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::Connection;

use super::{JobStore, StoreError, StoredJob};
use crate::job::CanonicalJob;

pub const DEFAULT_DB_PATH: &str = "data/jobs.sqlite";

/// Jobs table in a local SQLite file.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .map_err(|e| StoreError::Config(format!("cannot create {}: {}", dir.display(), e)))?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::with_connection(conn)
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock leaves the connection itself usable.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Most recent jobs first, optionally narrowed to one source.
    pub fn fetch_recent(&self, source: Option<&str>, limit: usize) -> Result<Vec<ListingRow>, StoreError> {
        let conn = self.conn();
        let (where_clause, params): (&str, Vec<&dyn rusqlite::types::ToSql>) = match &source {
            Some(s) => (" WHERE source = ?1", vec![s as &dyn rusqlite::types::ToSql]),
            None => ("", Vec::new()),
        };
        let sql = format!(
            "SELECT title, company, location, source, posted_at, scraped_at, policy_flag
             FROM jobs{}
             ORDER BY id DESC
             LIMIT {}",
            where_clause, limit
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params.as_slice(), |row| {
                Ok(ListingRow {
                    title: row.get(0)?,
                    company: row.get(1)?,
                    location: row.get(2)?,
                    source: row.get(3)?,
                    posted_at: row.get(4)?,
                    scraped_at: row.get(5)?,
                    policy_flag: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn stats(&self) -> Result<Stats, StoreError> {
        let conn = self.conn();
        let total: usize = conn.query_row("SELECT COUNT(*) FROM jobs", [], |r| r.get(0))?;
        let flagged: usize =
            conn.query_row("SELECT COUNT(*) FROM jobs WHERE policy_flag = 1", [], |r| r.get(0))?;
        let mut stmt =
            conn.prepare("SELECT source, COUNT(*) FROM jobs GROUP BY source ORDER BY COUNT(*) DESC")?;
        let by_source = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Stats {
            total,
            flagged,
            by_source,
        })
    }
}

fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS jobs (
            id            INTEGER PRIMARY KEY,
            scraped_at    TEXT NOT NULL,
            title         TEXT NOT NULL,
            company       TEXT NOT NULL,
            location      TEXT NOT NULL,
            url           TEXT NOT NULL,
            source        TEXT NOT NULL,
            posted_at     TEXT NOT NULL,
            schedule_type TEXT NOT NULL,
            status        TEXT NOT NULL DEFAULT 'review_required',
            policy_flag   BOOLEAN NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_jobs_url ON jobs(url);
        CREATE INDEX IF NOT EXISTS idx_jobs_source ON jobs(source);
        ",
    )?;
    Ok(())
}

#[async_trait]
impl JobStore for SqliteStore {
    async fn read_all(&self) -> Result<Vec<StoredJob>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT title, company, url FROM jobs ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(StoredJob {
                    title: row.get(0)?,
                    company: row.get(1)?,
                    url: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    async fn append_rows(&self, jobs: &[CanonicalJob]) -> Result<(), StoreError> {
        let conn = self.conn();
        let tx = conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO jobs
                 (scraped_at, title, company, location, url, source, posted_at, schedule_type, status, policy_flag)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for j in jobs {
                stmt.execute(rusqlite::params![
                    j.scraped_at.to_rfc3339(),
                    j.title,
                    j.company,
                    j.location,
                    j.url,
                    j.source.as_str(),
                    j.posted_at,
                    j.schedule_type,
                    j.status.as_str(),
                    j.policy_flag,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

// ── Listing ──

pub struct ListingRow {
    pub title: String,
    pub company: String,
    pub location: String,
    pub source: String,
    pub posted_at: String,
    pub scraped_at: String,
    pub policy_flag: bool,
}

pub struct Stats {
    pub total: usize,
    pub flagged: usize,
    pub by_source: Vec<(String, usize)>,
}
