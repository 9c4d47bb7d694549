#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use mssql_sqlfile::{
    ConnectionConfig, ConnectionSource, QueryConnection, ResultSet, RowValues, SqlFileError,
};

pub fn test_config() -> ConnectionConfig {
    ConnectionConfig {
        driver: "ODBC Driver 18 for SQL Server".into(),
        server: "localhost,1433".into(),
        database: "testdb".into(),
        user: "sa".into(),
        password: "not-a-real-password".into(),
    }
}

pub fn write_sql(dir: &Path, name: &str, sql: &str) {
    fs::write(dir.join(name), sql).unwrap();
}

/// A result set with one column `x` holding the integer 1.
pub fn one_by_one() -> ResultSet {
    let mut rs = ResultSet::with_capacity(1);
    rs.set_column_names(Arc::new(vec!["x".to_string()]));
    rs.add_row_values(vec![RowValues::Int(1)]);
    rs
}

#[derive(Debug, Clone)]
pub enum Behavior {
    Return(ResultSet),
    FailQuery,
    FailConnect,
}

/// Records every call the facade makes against it.
#[derive(Debug, Default)]
pub struct Calls {
    pub acquired: AtomicUsize,
    pub released: AtomicUsize,
    pub queries: Mutex<Vec<(String, Vec<RowValues>)>>,
}

impl Calls {
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<(String, Vec<RowValues>)> {
        self.queries.lock().unwrap().clone()
    }
}

#[derive(Debug, Clone)]
pub struct SpySource {
    pub calls: Arc<Calls>,
    behavior: Behavior,
}

impl SpySource {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            calls: Arc::new(Calls::default()),
            behavior,
        }
    }
}

pub struct SpyConnection {
    calls: Arc<Calls>,
    behavior: Behavior,
}

#[async_trait]
impl QueryConnection for SpyConnection {
    async fn query(&mut self, sql: &str, params: &[RowValues]) -> Result<ResultSet, SqlFileError> {
        self.calls
            .queries
            .lock()
            .unwrap()
            .push((sql.to_string(), params.to_vec()));
        match &self.behavior {
            Behavior::Return(rs) => Ok(rs.clone()),
            _ => Err(SqlFileError::ExecutionError("Invalid object name 'nope'".into())),
        }
    }
}

#[async_trait]
impl ConnectionSource for SpySource {
    type Connection = SpyConnection;

    async fn acquire(&self) -> Result<SpyConnection, SqlFileError> {
        if matches!(self.behavior, Behavior::FailConnect) {
            return Err(SqlFileError::ConnectionError("Login failed for user 'sa'".into()));
        }
        self.calls.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(SpyConnection {
            calls: Arc::clone(&self.calls),
            behavior: self.behavior.clone(),
        })
    }

    async fn release(&self, _conn: SpyConnection) {
        self.calls.released.fetch_add(1, Ordering::SeqCst);
    }
}
