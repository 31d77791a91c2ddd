// ==========================================
// 家庭物品搬迁核心 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键、busy_timeout）
// - 提供建表脚本 init_schema，供二进制与集成测试共用
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::path::PathBuf;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 默认数据库路径环境变量
pub const DB_PATH_ENV: &str = "HHG_MOVE_ENGINE_DB_PATH";

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置（GBL 序号并发递增依赖它）
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 获取默认数据库路径
///
/// 优先读取环境变量 `HHG_MOVE_ENGINE_DB_PATH`，否则使用用户数据目录
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./hhg_move_engine.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("hhg-move-engine");
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("hhg_move_engine.db");
        }
    }

    path.to_string_lossy().to_string()
}

/// 初始化数据库 schema（幂等）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- ===== 配置 =====
CREATE TABLE IF NOT EXISTS config_scope (
    scope_id TEXT PRIMARY KEY,
    scope_type TEXT NOT NULL,
    scope_key TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(scope_type, scope_key)
);

INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key)
VALUES ('global', 'GLOBAL', 'global');

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL REFERENCES config_scope(scope_id) ON DELETE CASCADE,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

-- ===== 运单 =====
CREATE TABLE IF NOT EXISTS shipments (
    shipment_id TEXT PRIMARY KEY,
    move_id TEXT NOT NULL,
    status TEXT NOT NULL,
    source_gbloc TEXT,
    destination_gbloc TEXT,
    gbl_number TEXT UNIQUE,
    market TEXT,
    book_date TEXT,
    requested_pickup_date TEXT,
    actual_pack_date TEXT,
    actual_pickup_date TEXT,
    actual_delivery_date TEXT,
    estimated_pack_days INTEGER,
    estimated_transit_days INTEGER,
    weight_estimate_lbs INTEGER,
    progear_weight_estimate_lbs INTEGER,
    spouse_progear_weight_estimate_lbs INTEGER,
    net_weight_lbs INTEGER,
    transit_distance_miles INTEGER,
    pickup_address_json TEXT,
    delivery_address_json TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    revision INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_shipments_status ON shipments(status);

CREATE TABLE IF NOT EXISTS shipment_line_items (
    line_item_id TEXT PRIMARY KEY,
    shipment_id TEXT NOT NULL REFERENCES shipments(shipment_id),
    code TEXT NOT NULL,
    quantity1 INTEGER NOT NULL,
    quantity2 INTEGER NOT NULL,
    location TEXT NOT NULL,
    status TEXT NOT NULL,
    notes TEXT,
    amount_cents INTEGER,
    submitted_date TEXT NOT NULL,
    approved_date TEXT
);

CREATE INDEX IF NOT EXISTS idx_line_items_shipment ON shipment_line_items(shipment_id, code);

-- ===== 承运商 / 报价 =====
CREATE TABLE IF NOT EXISTS transportation_service_providers (
    tsp_id TEXT PRIMARY KEY,
    standard_carrier_alpha_code TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS shipment_offers (
    offer_id TEXT PRIMARY KEY,
    shipment_id TEXT NOT NULL REFERENCES shipments(shipment_id),
    tsp_id TEXT NOT NULL REFERENCES transportation_service_providers(tsp_id),
    tsp_performance_id TEXT NOT NULL,
    administrative_shipment INTEGER NOT NULL DEFAULT 0,
    accepted INTEGER,
    rejection_reason TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_offers_shipment ON shipment_offers(shipment_id);

-- ===== GBL 序号 =====
CREATE TABLE IF NOT EXISTS gbl_number_trackers (
    gbloc TEXT NOT NULL,
    fiscal_year INTEGER NOT NULL,
    sequence_number INTEGER NOT NULL,
    PRIMARY KEY (gbloc, fiscal_year)
);

-- ===== 运价表 =====
CREATE TABLE IF NOT EXISTS tariff_zip3s (
    zip3 TEXT PRIMARY KEY,
    basepoint_city TEXT NOT NULL,
    state TEXT NOT NULL,
    service_area TEXT NOT NULL,
    rate_area TEXT NOT NULL,
    region TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tariff_service_areas (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    service_area TEXT NOT NULL,
    name TEXT NOT NULL,
    services_schedule INTEGER NOT NULL,
    linehaul_factor INTEGER NOT NULL,
    service_charge_cents INTEGER NOT NULL,
    sit_185a_rate_cents INTEGER NOT NULL,
    sit_185b_rate_cents INTEGER NOT NULL,
    sit_pd_schedule INTEGER NOT NULL,
    weight_lbs_lower INTEGER NOT NULL,
    weight_lbs_upper INTEGER NOT NULL,
    effective_date_lower TEXT NOT NULL,
    effective_date_upper TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_tariff_sa ON tariff_service_areas(service_area, effective_date_lower);

CREATE TABLE IF NOT EXISTS tariff_item_rates (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    code TEXT NOT NULL,
    schedule INTEGER,
    weight_lbs_lower INTEGER NOT NULL,
    weight_lbs_upper INTEGER NOT NULL,
    rate_cents INTEGER NOT NULL,
    effective_date_lower TEXT NOT NULL,
    effective_date_upper TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_tariff_item ON tariff_item_rates(code, effective_date_lower);

CREATE TABLE IF NOT EXISTS tariff_linehaul_rates (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    distance_miles_lower INTEGER NOT NULL,
    distance_miles_upper INTEGER NOT NULL,
    weight_lbs_lower INTEGER NOT NULL,
    weight_lbs_upper INTEGER NOT NULL,
    rate_cents INTEGER NOT NULL,
    effective_date_lower TEXT NOT NULL,
    effective_date_upper TEXT NOT NULL
);
"#;
