//! SQLite repository for document collections

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use serde_json::Value;
use std::path::Path;
use tracing::warn;

use super::schema::create_tables;

/// Document store holding entrant-name collections
pub struct NameStore {
    conn: Connection,
}

impl NameStore {
    /// Open the store, initializing the database if needed
    pub fn open(db_path: &Path) -> Result<Self> {
        // Create parent directories if needed
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }

        let conn = Connection::open(db_path).context("Failed to open database")?;
        create_tables(&conn)?;

        Ok(Self { conn })
    }

    /// Create an in-memory store (for testing)
    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        create_tables(&conn)?;
        Ok(Self { conn })
    }

    /// Add a document to `collection`
    pub fn insert(&self, collection: &str, document: &Value) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO documents (collection, data) VALUES (?1, ?2)",
            params![collection, serde_json::to_string(document)?],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// All documents of `collection` in insertion order
    pub fn list_documents(&self, collection: &str) -> Result<Vec<Value>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, data FROM documents WHERE collection = ?1 ORDER BY id")?;

        let rows = stmt.query_map(params![collection], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut documents = Vec::new();
        for row in rows {
            let (id, data) = row?;
            match serde_json::from_str(&data) {
                Ok(doc) => documents.push(doc),
                Err(e) => warn!(id, collection, "Skipping unreadable document: {}", e),
            }
        }
        Ok(documents)
    }

    /// One string field of every document in `collection`.
    ///
    /// Documents without the field, or where it is not a string, are skipped.
    pub fn project_field(&self, collection: &str, field: &str) -> Result<Vec<String>> {
        Ok(self
            .list_documents(collection)?
            .iter()
            .filter_map(|doc| doc.get(field).and_then(Value::as_str).map(str::to_string))
            .collect())
    }

    /// Number of documents in `collection`
    pub fn count(&self, collection: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1",
            params![collection],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert_and_list() {
        let store = NameStore::in_memory().unwrap();
        store.insert("horses", &json!({"name": "ハルウララ"})).unwrap();
        store.insert("horses", &json!({"name": "トサノカゼ", "age": 5})).unwrap();
        store.insert("jockeys", &json!({"name": "武豊"})).unwrap();

        let docs = store.list_documents("horses").unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1]["age"], 5);
        assert_eq!(store.count("horses").unwrap(), 2);
        assert_eq!(store.count("jockeys").unwrap(), 1);
    }

    #[test]
    fn test_project_field_keeps_order_and_skips_missing() {
        let store = NameStore::in_memory().unwrap();
        store.insert("horses", &json!({"name": "B"})).unwrap();
        store.insert("horses", &json!({"nickname": "no name"})).unwrap();
        store.insert("horses", &json!({"name": 42})).unwrap();
        store.insert("horses", &json!({"name": "A"})).unwrap();
        store.insert("horses", &json!({"name": "B"})).unwrap();

        let names = store.project_field("horses", "name").unwrap();
        assert_eq!(names, vec!["B", "A", "B"]);
    }

    #[test]
    fn test_empty_collection() {
        let store = NameStore::in_memory().unwrap();
        assert!(store.project_field("horses", "name").unwrap().is_empty());
        assert_eq!(store.count("horses").unwrap(), 0);
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = std::env::temp_dir().join(format!("keiba_gacha_test_{}", std::process::id()));
        let path = dir.join("nested").join("gacha.db");

        let store = NameStore::open(&path).unwrap();
        store.insert("horses", &json!({"name": "A"})).unwrap();
        drop(store);

        let reopened = NameStore::open(&path).unwrap();
        assert_eq!(reopened.project_field("horses", "name").unwrap(), vec!["A"]);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
