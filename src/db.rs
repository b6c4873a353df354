use std::cell::RefCell;
use std::collections::HashMap;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::config::Config;
use crate::error::Result;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Key holding the serialized `UserPreferences`
pub const USER_PREFERENCES_KEY: &str = "userPreferences";
/// Key holding the alert currently being edited
pub const ACTIVE_ALERT_KEY: &str = "activeAlert";
/// Key holding the backend session
pub const SESSION_KEY: &str = "session";

/// Durable string key-value storage
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn put(&self, key: &str, value: &str) -> Result<()>;
    fn delete(&self, key: &str) -> Result<()>;
}

/// Database connection wrapper
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create the database
    pub fn open() -> Result<Self> {
        let db_path = Config::db_path()?;
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut conn = Connection::open(&db_path)?;
        embedded::migrations::runner().run(&mut conn)?;
        tracing::debug!(path = %db_path.display(), "opened state database");

        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        embedded::migrations::runner().run(&mut conn)?;
        Ok(Self { conn })
    }
}

impl KeyValueStore for Database {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now().timestamp()],
        )?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

/// Process-local store for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &T {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        (**self).put(key, value)
    }

    fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(store: &dyn KeyValueStore) {
        assert_eq!(store.get("missing").unwrap(), None);
        store.put(USER_PREFERENCES_KEY, "{}").unwrap();
        store.put(USER_PREFERENCES_KEY, "{\"email\":\"a@b.co\"}").unwrap();
        assert_eq!(
            store.get(USER_PREFERENCES_KEY).unwrap().as_deref(),
            Some("{\"email\":\"a@b.co\"}")
        );
        store.delete(USER_PREFERENCES_KEY).unwrap();
        assert_eq!(store.get(USER_PREFERENCES_KEY).unwrap(), None);
        store.delete(USER_PREFERENCES_KEY).unwrap();
    }

    #[test]
    fn test_database_upsert_and_delete() {
        let db = Database::open_in_memory().unwrap();
        exercise(&db);
    }

    #[test]
    fn test_memory_store_upsert_and_delete() {
        exercise(&MemoryStore::new());
    }
}
