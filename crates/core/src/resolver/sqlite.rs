//! SQLite-backed principal lookup.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use serde_json::Value;
use tracing::debug;

use super::{Conditions, QueryKind, Resolver, ResolverError};
use crate::identity::Record;

/// Resolver reading principals from one table of a SQLite database.
///
/// Each row is returned as a record keyed by column name.
pub struct SqliteResolver {
    conn: Mutex<Connection>,
    table: String,
}

impl SqliteResolver {
    /// Open the database at `path` and resolve against `table`.
    pub fn new(path: &Path, table: &str) -> Result<Self, ResolverError> {
        let conn = Connection::open(path).map_err(|e| ResolverError::Database(e.to_string()))?;
        Self::from_connection(conn, table)
    }

    /// Wrap an already opened connection (useful for testing).
    pub fn from_connection(conn: Connection, table: &str) -> Result<Self, ResolverError> {
        validate_identifier(table)?;
        Ok(Self {
            conn: Mutex::new(conn),
            table: table.to_string(),
        })
    }

    fn build_query(&self, conditions: &Conditions, kind: QueryKind) -> Result<String, ResolverError> {
        let joiner = match kind {
            QueryKind::All => " AND ",
            QueryKind::Or => " OR ",
        };
        let clauses = conditions
            .iter()
            .enumerate()
            .map(|(index, (field, _))| {
                validate_identifier(field)?;
                Ok(format!("\"{}\" = ?{}", field, index + 1))
            })
            .collect::<Result<Vec<_>, ResolverError>>()?;

        Ok(format!(
            "SELECT * FROM \"{}\" WHERE {} LIMIT 1",
            self.table,
            clauses.join(joiner)
        ))
    }
}

#[async_trait]
impl Resolver for SqliteResolver {
    async fn find(
        &self,
        conditions: &Conditions,
        kind: QueryKind,
    ) -> Result<Option<Record>, ResolverError> {
        if conditions.is_empty() {
            return Ok(None);
        }
        let sql = self.build_query(conditions, kind)?;
        let params: Vec<SqlValue> = conditions.iter().map(|(_, value)| to_sql(value)).collect();
        debug!(table = %self.table, conditions = conditions.len(), "Resolving principal");

        let conn = self
            .conn
            .lock()
            .map_err(|e| ResolverError::Database(e.to_string()))?;
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| ResolverError::Database(e.to_string()))?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt
            .query(params_from_iter(params))
            .map_err(|e| ResolverError::Database(e.to_string()))?;
        let Some(row) = rows
            .next()
            .map_err(|e| ResolverError::Database(e.to_string()))?
        else {
            return Ok(None);
        };

        let mut record = Record::new();
        for (index, column) in columns.iter().enumerate() {
            let value = row
                .get_ref(index)
                .map_err(|e| ResolverError::Database(e.to_string()))?;
            record.insert(column.clone(), from_sql(value));
        }
        Ok(Some(record))
    }
}

fn validate_identifier(name: &str) -> Result<(), ResolverError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ResolverError::InvalidField(name.to_string()))
    }
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Value::from(f),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(hex::encode(bytes)),
    }
}
