//! SQLite persistence layer.
//!
//! RULE: only the store talks to the database. Everything above it goes
//! through `ScenarioPersistence`, never through SQL.

mod baseline;
mod scenario;

use crate::error::PersistenceError;
use rusqlite::Connection;

pub type StoreResult<T> = Result<T, PersistenceError>;

pub struct PlanStore {
    conn: Connection,
}

impl PlanStore {
    pub fn open(path: &str) -> StoreResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> StoreResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_scenarios.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_baseline_history.sql"))?;
        Ok(())
    }
}
