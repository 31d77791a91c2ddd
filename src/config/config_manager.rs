// ==========================================
// 家庭物品搬迁核心 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::db::open_sqlite_connection;
use crate::engine::calendar::WorkCalendar;
use crate::engine::move_dates::{MoveDateScheduler, PackDaysTable, TransitDaysTable};
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

/// 当前唯一使用的作用域
pub const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
            params![GLOBAL_SCOPE, key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 从 config_kv 表读取配置值，带默认值
    pub fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 写入配置值（UPSERT）
    pub fn set_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        if key.trim().is_empty() {
            return Err("配置键不能为空".into());
        }
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = excluded.value",
            params![GLOBAL_SCOPE, key, value],
        )?;
        tracing::info!(config_key = key, "配置已更新");
        Ok(())
    }

    /// 获取所有配置的快照（JSON格式，键有序）
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        let rows = stmt.query_map(params![GLOBAL_SCOPE], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    /// 从配置快照恢复配置（单事务）
    ///
    /// # 返回
    /// - Ok(usize): 恢复的配置项数量
    pub fn restore_config_from_snapshot(&self, snapshot_json: &str) -> Result<usize, Box<dyn Error>> {
        let config_map: BTreeMap<String, String> = serde_json::from_str(snapshot_json)?;

        let mut conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        let tx = conn.transaction()?;

        let mut count = 0;
        for (key, value) in config_map.iter() {
            count += tx.execute(
                "INSERT INTO config_kv (scope_id, key, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT(scope_id, key) DO UPDATE SET value = excluded.value",
                params![GLOBAL_SCOPE, key, value],
            )?;
        }

        tx.commit()?;
        Ok(count)
    }

    // ===== 排期规则表 =====

    /// 打包天数表；未配置或格式错误时使用内置默认表
    pub fn load_pack_days_table(&self) -> Result<PackDaysTable, Box<dyn Error>> {
        let table: PackDaysTable = self.get_json_or_default(config_keys::PACK_DAYS_TABLE)?;
        table.validate()?;
        Ok(table)
    }

    /// 运输天数表；未配置或格式错误时使用内置默认表
    pub fn load_transit_days_table(&self) -> Result<TransitDaysTable, Box<dyn Error>> {
        let table: TransitDaysTable = self.get_json_or_default(config_keys::TRANSIT_DAYS_TABLE)?;
        table.validate()?;
        Ok(table)
    }

    // ===== 工作日历 =====

    /// 是否把落在周末的联邦假日顺延到工作日（默认 true）
    pub fn get_observe_weekend_holidays(&self) -> Result<bool, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::OBSERVE_WEEKEND_HOLIDAYS, "true")?;
        Ok(!matches!(value.trim().to_ascii_lowercase().as_str(), "false" | "0" | "no"))
    }

    /// 额外假日（JSON 日期数组，如 ["2018-12-24"]）
    pub fn get_extra_holidays(&self) -> Result<Vec<NaiveDate>, Box<dyn Error>> {
        self.get_json_or_default(config_keys::EXTRA_HOLIDAYS)
    }

    pub fn load_calendar(&self) -> Result<WorkCalendar, Box<dyn Error>> {
        Ok(WorkCalendar::new(
            self.get_observe_weekend_holidays()?,
            self.get_extra_holidays()?,
        ))
    }

    /// 按当前配置组装排期引擎
    pub fn build_move_date_scheduler(&self) -> Result<MoveDateScheduler, Box<dyn Error>> {
        Ok(MoveDateScheduler::new(
            self.load_calendar()?,
            self.load_pack_days_table()?,
            self.load_transit_days_table()?,
        ))
    }

    fn get_json_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T, Box<dyn Error>> {
        let raw = match self.get_config_value(key)? {
            Some(v) => v,
            None => return Ok(T::default()),
        };
        Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(
                config_key = key,
                raw_value = %raw,
                error = %e,
                "配置格式错误，使用默认值"
            );
            T::default()
        }))
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 排期
    pub const PACK_DAYS_TABLE: &str = "schedule.pack_days_table";
    pub const TRANSIT_DAYS_TABLE: &str = "schedule.transit_days_table";

    // 日历
    pub const EXTRA_HOLIDAYS: &str = "calendar.extra_holidays";
    pub const OBSERVE_WEEKEND_HOLIDAYS: &str = "calendar.observe_weekend_holidays";
}
