use std::sync::Mutex;

use async_trait::async_trait;

use super::{from_row, to_row, JobStore, StoreError, StoredJob};
use crate::job::CanonicalJob;

/// Test double recording every append call.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<Vec<String>>>,
    appends: Mutex<Vec<usize>>,
    uninitialized: bool,
    fail_reads: bool,
    fail_appends: bool,
}

impl MemoryStore {
    pub fn with_rows(rows: Vec<StoredJob>) -> Self {
        let rows = rows
            .into_iter()
            .map(|r| vec![String::new(), r.title, r.company, String::new(), r.url])
            .collect();
        Self {
            rows: Mutex::new(rows),
            ..Default::default()
        }
    }

    pub fn uninitialized() -> Self {
        Self {
            uninitialized: true,
            ..Default::default()
        }
    }

    pub fn failing_reads() -> Self {
        Self {
            fail_reads: true,
            ..Default::default()
        }
    }

    pub fn failing_appends() -> Self {
        Self {
            fail_appends: true,
            ..Default::default()
        }
    }

    /// Row counts of each `append_rows` call, in order.
    pub fn append_calls(&self) -> Vec<usize> {
        self.appends.lock().unwrap().clone()
    }

    pub fn stored(&self) -> Vec<StoredJob> {
        self.rows.lock().unwrap().iter().map(|r| from_row(r)).collect()
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn read_all(&self) -> Result<Vec<StoredJob>, StoreError> {
        if self.uninitialized {
            return Err(StoreError::Uninitialized("no sheet".into()));
        }
        if self.fail_reads {
            return Err(StoreError::Api {
                status: 403,
                message: "permission denied".into(),
            });
        }
        Ok(self.stored())
    }

    async fn append_rows(&self, jobs: &[CanonicalJob]) -> Result<(), StoreError> {
        self.appends.lock().unwrap().push(jobs.len());
        if self.fail_appends {
            return Err(StoreError::Api {
                status: 500,
                message: "backend unavailable".into(),
            });
        }
        self.rows.lock().unwrap().extend(jobs.iter().map(to_row));
        Ok(())
    }
}
