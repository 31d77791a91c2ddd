// ==========================================
// 家庭物品搬迁核心 - GBL 序号仓储
// ==========================================
// 红线: 递增与读取必须是同一条语句（UPSERT ... RETURNING）
// 说明: 每个 (GBLOC, 财年) 一条计数器，首次使用从 1 开始
// ==========================================

use crate::engine::gbl::GblSequencer;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

pub struct GblSequenceRepository {
    conn: Arc<Mutex<Connection>>,
}

impl GblSequenceRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path).map_err(|e| {
            RepositoryError::DatabaseConnectionError(format!("{}: {}", db_path, e))
        })?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 原子递增并返回新序号
    pub fn increment(&self, gbloc: &str, fiscal_year: i32) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let next: i64 = conn.query_row(
            r#"INSERT INTO gbl_number_trackers (gbloc, fiscal_year, sequence_number)
               VALUES (?1, ?2, 1)
               ON CONFLICT(gbloc, fiscal_year)
               DO UPDATE SET sequence_number = sequence_number + 1
               RETURNING sequence_number"#,
            params![gbloc, fiscal_year],
            |row| row.get(0),
        )?;
        Ok(next)
    }

    /// 当前已分配的最大序号（未分配过返回 None）
    pub fn current(&self, gbloc: &str, fiscal_year: i32) -> RepositoryResult<Option<i64>> {
        let conn = self.get_conn()?;
        let current = conn
            .query_row(
                "SELECT sequence_number FROM gbl_number_trackers WHERE gbloc = ?1 AND fiscal_year = ?2",
                params![gbloc, fiscal_year],
                |row| row.get(0),
            )
            .optional()?;
        Ok(current)
    }
}

impl GblSequencer for GblSequenceRepository {
    fn next_sequence(&self, gbloc: &str, fiscal_year: i32) -> RepositoryResult<i64> {
        self.increment(gbloc, fiscal_year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> GblSequenceRepository {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        GblSequenceRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_sequences_are_independent_per_gbloc_and_year() {
        let repo = setup();
        assert_eq!(repo.current("GBO1", 2018).unwrap(), None);
        assert_eq!(repo.increment("GBO1", 2018).unwrap(), 1);
        assert_eq!(repo.increment("GBO1", 2018).unwrap(), 2);
        assert_eq!(repo.increment("KKFA", 2018).unwrap(), 1);
        assert_eq!(repo.increment("GBO1", 2019).unwrap(), 1);
        assert_eq!(repo.current("GBO1", 2018).unwrap(), Some(2));
    }
}
