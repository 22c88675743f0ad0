//! Argument shapes shared by the record store and the tenant-scoping layer.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, Value, ValueRef};
use rusqlite::ToSql;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// A dynamically typed SQLite value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl SqlValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Real(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => SqlValue::Null,
        }
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(Value::Null),
            SqlValue::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            SqlValue::Real(f) => ToSqlOutput::Owned(Value::Real(*f)),
            SqlValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

impl FromSql for SqlValue {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Ok(match value {
            ValueRef::Null => SqlValue::Null,
            ValueRef::Integer(i) => SqlValue::Integer(i),
            ValueRef::Real(f) => SqlValue::Real(f),
            ValueRef::Text(t) => {
                SqlValue::Text(String::from_utf8(t.to_vec()).map_err(|e| FromSqlError::Other(e.into()))?)
            }
            // None of the gateway tables store blobs
            ValueRef::Blob(_) => return Err(FromSqlError::InvalidType),
        })
    }
}

impl Serialize for SqlValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SqlValue::Null => serializer.serialize_unit(),
            SqlValue::Integer(i) => serializer.serialize_i64(*i),
            SqlValue::Real(f) => serializer.serialize_f64(*f),
            SqlValue::Text(s) => serializer.serialize_str(s),
        }
    }
}

/// One stored row, keyed by column name.
pub type Record = BTreeMap<String, SqlValue>;

/// Conjunction of column equality constraints.
///
/// Mirrors the filter argument shape of the underlying store; the scoping
/// layer merges the tenant constraint into it via [`Filter::put`].
#[derive(Debug, Clone, Default)]
pub struct Filter {
    clauses: Vec<(String, SqlValue)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an equality clause. Builder-style, for call sites.
    pub fn eq(mut self, column: &str, value: impl Into<SqlValue>) -> Self {
        self.clauses.push((column.to_string(), value.into()));
        self
    }

    /// Sets an equality clause, replacing any existing clause on the same
    /// column. The tenant constraint is merged with this so it can never be
    /// overridden by a caller-supplied clause.
    pub fn put(&mut self, column: &str, value: impl Into<SqlValue>) {
        self.clauses.retain(|(c, _)| c != column);
        self.clauses.push((column.to_string(), value.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.clauses.iter().map(|(c, v)| (c.as_str(), v))
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.clauses
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_put_replaces_existing_clause() {
        let mut filter = Filter::new().eq("team_id", "t-caller").eq("name", "x");
        filter.put("team_id", "t-real");

        assert_eq!(filter.get("team_id"), Some(&SqlValue::from("t-real")));
        assert_eq!(filter.get("name"), Some(&SqlValue::from("x")));
        assert_eq!(filter.iter().count(), 2);
    }

    #[test]
    fn test_option_into_sql_value() {
        assert_eq!(SqlValue::from(None::<String>), SqlValue::Null);
        assert_eq!(
            SqlValue::from(Some("x".to_string())),
            SqlValue::Text("x".to_string())
        );
    }

    #[test]
    fn test_record_serializes_to_json_object() {
        let mut record = Record::new();
        record.insert("id".to_string(), SqlValue::from("u-1"));
        record.insert("attempts".to_string(), SqlValue::Integer(3));
        record.insert("deleted_at".to_string(), SqlValue::Null);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], "u-1");
        assert_eq!(json["attempts"], 3);
        assert!(json["deleted_at"].is_null());
    }
}
