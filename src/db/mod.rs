//! SQLite-backed persistent store.

mod repo;
mod schema;

use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;

pub use repo::Repo;
pub use schema::{MIGRATIONS, SCHEMA};

/// Connection handle shared by the indexing workers. All statements run
/// under one mutex, which also serializes mutations per photo.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Database> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        Ok(Database {
            conn: Mutex::new(conn),
        })
    }

    #[allow(dead_code)]
    pub fn open_in_memory() -> Result<Database> {
        Ok(Database {
            conn: Mutex::new(Connection::open_in_memory()?),
        })
    }

    pub fn initialize(&self) -> Result<()> {
        let conn = self.lock();
        conn.execute_batch(SCHEMA)?;
        for migration in MIGRATIONS {
            conn.execute(migration, [])?;
        }
        Ok(())
    }

    pub(crate) fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        db.initialize().unwrap();

        let conn = db.lock();
        let cameras: i64 = conn
            .query_row("SELECT COUNT(*) FROM cameras", [], |row| row.get(0))
            .unwrap();
        assert_eq!(cameras, 1);
    }
}
