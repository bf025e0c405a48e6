//! Recording store used by unit tests.

use async_trait::async_trait;
use std::sync::Mutex;
use thiserror::Error;

use crate::store::{Dialect, LogStore, Row};

/// A call made against [`RecordingStore`]
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Insert { table: String, row: Row },
    FetchScalar { query: String, params: Vec<String> },
    Execute { query: String, params: Vec<String> },
}

#[derive(Debug, Error)]
#[error("store failure: {0}")]
pub struct StoreFailure(pub String);

/// Store that records every call and answers counts with a fixed value
#[derive(Debug, Default)]
pub struct RecordingStore {
    calls: Mutex<Vec<Call>>,
    count: i64,
    fail_insert: bool,
    fail_fetch: bool,
    fail_execute: bool,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value returned by every `fetch_scalar`
    pub fn with_count(mut self, count: i64) -> Self {
        self.count = count;
        self
    }

    pub fn failing_insert(mut self) -> Self {
        self.fail_insert = true;
        self
    }

    pub fn failing_fetch(mut self) -> Self {
        self.fail_fetch = true;
        self
    }

    pub fn failing_execute(mut self) -> Self {
        self.fail_execute = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn inserted_rows(&self) -> Vec<Row> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Insert { row, .. } => Some(row),
                _ => None,
            })
            .collect()
    }

    pub fn executed(&self) -> Vec<(String, Vec<String>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Execute { query, params } => Some((query, params)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

fn owned(params: &[&str]) -> Vec<String> {
    params.iter().map(|p| p.to_string()).collect()
}

#[async_trait]
impl LogStore for RecordingStore {
    type Error = StoreFailure;

    async fn insert(&self, table: &str, row: &Row) -> Result<(), StoreFailure> {
        self.record(Call::Insert {
            table: table.to_string(),
            row: row.clone(),
        });
        if self.fail_insert {
            return Err(StoreFailure("insert rejected".to_string()));
        }
        Ok(())
    }

    async fn fetch_scalar(&self, query: &str, params: &[&str]) -> Result<i64, StoreFailure> {
        self.record(Call::FetchScalar {
            query: query.to_string(),
            params: owned(params),
        });
        if self.fail_fetch {
            return Err(StoreFailure("count rejected".to_string()));
        }
        Ok(self.count)
    }

    async fn execute(&self, query: &str, params: &[&str]) -> Result<u64, StoreFailure> {
        self.record(Call::Execute {
            query: query.to_string(),
            params: owned(params),
        });
        if self.fail_execute {
            return Err(StoreFailure("delete rejected".to_string()));
        }
        Ok(0)
    }

    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }
}
