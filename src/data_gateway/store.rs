//! Record-level persistence client for the directory database.
//!
//! Exposes the generic operation surface (point lookup, query, count, create,
//! bulk create, update, delete) that the tenant-scoping layer wraps. Entities
//! are addressed by table name and rows travel as dynamically typed
//! [`Record`]s, so one interception point covers every entity type.

use super::schema::DIRECTORY_VERSIONED_SCHEMAS;
use super::value::{Filter, Record, SqlValue};
use crate::sqlite_persistence::{self, Table};
use anyhow::{bail, Context, Result};
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Operation surface of the persistence client. The tenant-scoped gateway
/// implements the same trait, so call sites are oblivious to scoping.
pub trait RecordStore: Send + Sync {
    /// Returns the first row matching the filter, in insertion order.
    fn find_first(&self, entity: &str, filter: &Filter) -> Result<Option<Record>>;

    /// Returns all rows matching the filter, in insertion order.
    fn find_many(&self, entity: &str, filter: &Filter) -> Result<Vec<Record>>;

    /// Counts rows matching the filter.
    fn count(&self, entity: &str, filter: &Filter) -> Result<usize>;

    /// Inserts one row and returns it as stored (including defaults).
    fn create(&self, entity: &str, values: Record) -> Result<Record>;

    /// Inserts a batch of rows in one transaction. Returns the number inserted.
    fn create_many(&self, entity: &str, values: Vec<Record>) -> Result<usize>;

    /// Updates all rows matching the filter. Returns the number updated.
    fn update(&self, entity: &str, filter: &Filter, values: Record) -> Result<usize>;

    /// Deletes all rows matching the filter. Returns the number deleted.
    fn delete(&self, entity: &str, filter: &Filter) -> Result<usize>;
}

/// SQLite-backed record store over directory.db.
pub struct SqliteRecordStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRecordStore {
    /// Opens an existing database or creates a new one with the current schema.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = sqlite_persistence::open_database(db_path, DIRECTORY_VERSIONED_SCHEMAS)?;
        Ok(SqliteRecordStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory store for testing.
    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let conn = sqlite_persistence::open_in_memory(DIRECTORY_VERSIONED_SCHEMAS)?;
        Ok(SqliteRecordStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Entity and column names are interpolated into SQL, so they must match
    /// the declared schema. Filters and values only ever travel as bound
    /// parameters.
    fn table(entity: &str) -> Result<&'static Table> {
        DIRECTORY_VERSIONED_SCHEMAS
            .last()
            .context("No schemas defined")?
            .table(entity)
            .with_context(|| format!("Unknown entity: {}", entity))
    }

    fn check_columns<'a>(table: &Table, columns: impl Iterator<Item = &'a str>) -> Result<()> {
        for column in columns {
            if !table.has_column(column) {
                bail!("Unknown column {} on entity {}", column, table.name);
            }
        }
        Ok(())
    }

    /// Builds the WHERE clause and its bound parameters for a filter.
    /// NULL constraints become `IS NULL` rather than a bound parameter.
    fn where_clause<'a>(filter: &'a Filter) -> (String, Vec<&'a SqlValue>) {
        if filter.is_empty() {
            return (String::new(), Vec::new());
        }
        let mut sql = String::from(" WHERE ");
        let mut bound: Vec<&SqlValue> = Vec::new();
        for (i, (column, value)) in filter.iter().enumerate() {
            if i > 0 {
                sql.push_str(" AND ");
            }
            if matches!(value, SqlValue::Null) {
                sql.push_str(&format!("{} IS NULL", column));
            } else {
                bound.push(value);
                sql.push_str(&format!("{} = ?{}", column, bound.len()));
            }
        }
        (sql, bound)
    }

    fn row_to_record(row: &rusqlite::Row, columns: &[String]) -> rusqlite::Result<Record> {
        let mut record = Record::new();
        for (i, column) in columns.iter().enumerate() {
            record.insert(column.clone(), row.get::<_, SqlValue>(i)?);
        }
        Ok(record)
    }

    fn insert_one(conn: &Connection, table: &Table, values: &Record) -> Result<i64> {
        Self::check_columns(table, values.keys().map(|k| k.as_str()))?;
        if values.is_empty() {
            bail!("Refusing to insert empty row into {}", table.name);
        }

        let columns: Vec<&str> = values.keys().map(|k| k.as_str()).collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table.name,
            columns.join(", "),
            placeholders.join(", ")
        );
        conn.execute(&sql, params_from_iter(values.values()))?;
        Ok(conn.last_insert_rowid())
    }
}

impl RecordStore for SqliteRecordStore {
    fn find_first(&self, entity: &str, filter: &Filter) -> Result<Option<Record>> {
        let table = Self::table(entity)?;
        Self::check_columns(table, filter.iter().map(|(c, _)| c))?;
        let conn = self.conn.lock().unwrap();

        let (where_sql, bound) = Self::where_clause(filter);
        let sql = format!("SELECT * FROM {}{} LIMIT 1", entity, where_sql);
        let mut stmt = conn.prepare(&sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let record = stmt
            .query_row(params_from_iter(bound), |row| {
                Self::row_to_record(row, &columns)
            })
            .optional()?;

        Ok(record)
    }

    fn find_many(&self, entity: &str, filter: &Filter) -> Result<Vec<Record>> {
        let table = Self::table(entity)?;
        Self::check_columns(table, filter.iter().map(|(c, _)| c))?;
        let conn = self.conn.lock().unwrap();

        let (where_sql, bound) = Self::where_clause(filter);
        let sql = format!("SELECT * FROM {}{}", entity, where_sql);
        let mut stmt = conn.prepare(&sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let records = stmt
            .query_map(params_from_iter(bound), |row| {
                Self::row_to_record(row, &columns)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(records)
    }

    fn count(&self, entity: &str, filter: &Filter) -> Result<usize> {
        let table = Self::table(entity)?;
        Self::check_columns(table, filter.iter().map(|(c, _)| c))?;
        let conn = self.conn.lock().unwrap();

        let (where_sql, bound) = Self::where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM {}{}", entity, where_sql);
        let count: i64 = conn.query_row(&sql, params_from_iter(bound), |row| row.get(0))?;

        Ok(count as usize)
    }

    fn create(&self, entity: &str, values: Record) -> Result<Record> {
        let table = Self::table(entity)?;
        let conn = self.conn.lock().unwrap();

        let rowid = Self::insert_one(&conn, table, &values)?;

        let sql = format!("SELECT * FROM {} WHERE rowid = ?1", entity);
        let mut stmt = conn.prepare(&sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let record = stmt.query_row([rowid], |row| Self::row_to_record(row, &columns))?;

        Ok(record)
    }

    fn create_many(&self, entity: &str, values: Vec<Record>) -> Result<usize> {
        let table = Self::table(entity)?;
        let mut conn = self.conn.lock().unwrap();

        let tx = conn.transaction()?;
        let inserted = values.len();
        for row in &values {
            Self::insert_one(&tx, table, row)?;
        }
        tx.commit()?;

        Ok(inserted)
    }

    fn update(&self, entity: &str, filter: &Filter, values: Record) -> Result<usize> {
        let table = Self::table(entity)?;
        Self::check_columns(table, filter.iter().map(|(c, _)| c))?;
        Self::check_columns(table, values.keys().map(|k| k.as_str()))?;
        if values.is_empty() {
            bail!("Refusing to update {} with no values", entity);
        }
        let conn = self.conn.lock().unwrap();

        let mut bound: Vec<&SqlValue> = Vec::new();
        let mut assignments: Vec<String> = Vec::new();
        for (column, value) in values.iter() {
            bound.push(value);
            assignments.push(format!("{} = ?{}", column, bound.len()));
        }

        let mut where_sql = String::new();
        for (column, value) in filter.iter() {
            where_sql.push_str(if where_sql.is_empty() {
                " WHERE "
            } else {
                " AND "
            });
            if matches!(value, SqlValue::Null) {
                where_sql.push_str(&format!("{} IS NULL", column));
            } else {
                bound.push(value);
                where_sql.push_str(&format!("{} = ?{}", column, bound.len()));
            }
        }

        let sql = format!(
            "UPDATE {} SET {}{}",
            entity,
            assignments.join(", "),
            where_sql
        );
        let updated = conn.execute(&sql, params_from_iter(bound))?;

        Ok(updated)
    }

    fn delete(&self, entity: &str, filter: &Filter) -> Result<usize> {
        let table = Self::table(entity)?;
        Self::check_columns(table, filter.iter().map(|(c, _)| c))?;
        let conn = self.conn.lock().unwrap();

        let (where_sql, bound) = Self::where_clause(filter);
        let sql = format!("DELETE FROM {}{}", entity, where_sql);
        let deleted = conn.execute(&sql, params_from_iter(bound))?;

        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, email: &str, team: Option<&str>) -> Record {
        let mut record = Record::new();
        record.insert("id".to_string(), id.into());
        record.insert("email".to_string(), email.into());
        record.insert("name".to_string(), "Test".into());
        record.insert("team_id".to_string(), team.into());
        record.insert("created_at".to_string(), 1_700_000_000_i64.into());
        record
    }

    #[test]
    fn test_create_and_find_first() {
        let store = SqliteRecordStore::in_memory().unwrap();

        let created = store.create("users", user("u1", "a@x.com", Some("t1"))).unwrap();
        assert_eq!(created["id"], SqlValue::from("u1"));
        // Default applied by the database
        assert_eq!(created["failed_login_attempts"], SqlValue::Integer(0));

        let found = store
            .find_first("users", &Filter::new().eq("email", "a@x.com"))
            .unwrap()
            .unwrap();
        assert_eq!(found["id"], SqlValue::from("u1"));
    }

    #[test]
    fn test_find_first_no_match() {
        let store = SqliteRecordStore::in_memory().unwrap();
        let found = store
            .find_first("users", &Filter::new().eq("email", "missing@x.com"))
            .unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_find_many_and_count() {
        let store = SqliteRecordStore::in_memory().unwrap();
        store.create("users", user("u1", "a@x.com", Some("t1"))).unwrap();
        store.create("users", user("u2", "b@x.com", Some("t1"))).unwrap();
        store.create("users", user("u3", "c@x.com", Some("t2"))).unwrap();

        let t1 = store
            .find_many("users", &Filter::new().eq("team_id", "t1"))
            .unwrap();
        assert_eq!(t1.len(), 2);
        assert_eq!(
            store.count("users", &Filter::new().eq("team_id", "t2")).unwrap(),
            1
        );
        assert_eq!(store.count("users", &Filter::new()).unwrap(), 3);
    }

    #[test]
    fn test_null_filter_matches_is_null() {
        let store = SqliteRecordStore::in_memory().unwrap();
        store.create("users", user("u1", "a@x.com", None)).unwrap();
        store.create("users", user("u2", "b@x.com", Some("t1"))).unwrap();

        let unassigned = store
            .find_many("users", &Filter::new().eq("team_id", None::<String>))
            .unwrap();
        assert_eq!(unassigned.len(), 1);
        assert_eq!(unassigned[0]["id"], SqlValue::from("u1"));
    }

    #[test]
    fn test_create_many_is_transactional() {
        let store = SqliteRecordStore::in_memory().unwrap();

        // Second row violates the unique email constraint; nothing must land.
        let result = store.create_many(
            "users",
            vec![
                user("u1", "a@x.com", Some("t1")),
                user("u2", "a@x.com", Some("t1")),
            ],
        );
        assert!(result.is_err());
        assert_eq!(store.count("users", &Filter::new()).unwrap(), 0);
    }

    #[test]
    fn test_update_and_delete() {
        let store = SqliteRecordStore::in_memory().unwrap();
        store.create("users", user("u1", "a@x.com", Some("t1"))).unwrap();
        store.create("users", user("u2", "b@x.com", Some("t1"))).unwrap();

        let mut values = Record::new();
        values.insert("name".to_string(), "Renamed".into());
        let updated = store
            .update("users", &Filter::new().eq("id", "u1"), values)
            .unwrap();
        assert_eq!(updated, 1);

        let found = store
            .find_first("users", &Filter::new().eq("id", "u1"))
            .unwrap()
            .unwrap();
        assert_eq!(found["name"], SqlValue::from("Renamed"));

        let deleted = store.delete("users", &Filter::new().eq("id", "u2")).unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.count("users", &Filter::new()).unwrap(), 1);
    }

    #[test]
    fn test_unknown_entity_rejected() {
        let store = SqliteRecordStore::in_memory().unwrap();
        let result = store.find_many("users; DROP TABLE users", &Filter::new());
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_column_rejected() {
        let store = SqliteRecordStore::in_memory().unwrap();
        let result = store.find_many("users", &Filter::new().eq("email = '' OR 1=1 --", "x"));
        assert!(result.is_err());
    }
}
