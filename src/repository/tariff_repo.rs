// ==========================================
// 家庭物品搬迁核心 - 运价表数据仓储
// ==========================================
// 红线: 生效判断为 lower <= as_of < upper
// 说明: 日期按 ISO 文本存储，字典序即时间序
// ==========================================

use crate::domain::tariff::{
    EffectiveWindow, ItemRate, LinehaulRate, ServiceAreaRate, TariffKey, TariffRateRecord,
    Zip3Record,
};
use crate::domain::units::{Cents, Miles, Pound};
use crate::engine::rate::TariffSource;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const SERVICE_AREA_COLUMNS: &str = r#"
    service_area, name, services_schedule, linehaul_factor, service_charge_cents,
    sit_185a_rate_cents, sit_185b_rate_cents, sit_pd_schedule,
    weight_lbs_lower, weight_lbs_upper, effective_date_lower, effective_date_upper
"#;

const ITEM_RATE_COLUMNS: &str = r#"
    code, schedule, weight_lbs_lower, weight_lbs_upper, rate_cents,
    effective_date_lower, effective_date_upper
"#;

const LINEHAUL_COLUMNS: &str = r#"
    distance_miles_lower, distance_miles_upper, weight_lbs_lower, weight_lbs_upper,
    rate_cents, effective_date_lower, effective_date_upper
"#;

// ==========================================
// TariffRepository - 运价表仓储
// ==========================================
pub struct TariffRepository {
    conn: Arc<Mutex<Connection>>,
}

impl TariffRepository {
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

    /// 查询某键在指定日期生效的记录
    ///
    /// # 参数
    /// - `key`: 运价查询键
    /// - `as_of`: 生效日期（一般为运单 book_date）
    ///
    /// # 返回
    /// - Ok(Vec): 全部生效记录（可能为空，也可能多于一条，由调用方判定）
    pub fn find_effective(
        &self,
        key: &TariffKey,
        as_of: NaiveDate,
    ) -> RepositoryResult<Vec<TariffRateRecord>> {
        let conn = self.get_conn()?;
        select_records(&conn, key, Some(as_of))
    }

    /// 查询某键的全部记录（不限日期，导入校验用）
    pub fn find_all_for_key(&self, key: &TariffKey) -> RepositoryResult<Vec<TariffRateRecord>> {
        let conn = self.get_conn()?;
        select_records(&conn, key, None)
    }

    /// 读取全部运价记录（构建内存快照用）
    pub fn load_all(&self) -> RepositoryResult<Vec<TariffRateRecord>> {
        let conn = self.get_conn()?;
        let mut records = Vec::new();

        let mut stmt = conn.prepare(
            "SELECT zip3, basepoint_city, state, service_area, rate_area, region FROM tariff_zip3s ORDER BY zip3",
        )?;
        records.extend(
            stmt.query_map([], map_zip3_row)?
                .collect::<SqliteResult<Vec<_>>>()?
                .into_iter()
                .map(TariffRateRecord::Zip3),
        );

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM tariff_service_areas ORDER BY id",
            SERVICE_AREA_COLUMNS
        ))?;
        records.extend(
            stmt.query_map([], map_service_area_row)?
                .collect::<SqliteResult<Vec<_>>>()?
                .into_iter()
                .map(TariffRateRecord::ServiceArea),
        );

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM tariff_item_rates ORDER BY id",
            ITEM_RATE_COLUMNS
        ))?;
        records.extend(
            stmt.query_map([], map_item_rate_row)?
                .collect::<SqliteResult<Vec<_>>>()?
                .into_iter()
                .map(TariffRateRecord::Item),
        );

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM tariff_linehaul_rates ORDER BY id",
            LINEHAUL_COLUMNS
        ))?;
        records.extend(
            stmt.query_map([], map_linehaul_row)?
                .collect::<SqliteResult<Vec<_>>>()?
                .into_iter()
                .map(TariffRateRecord::Linehaul),
        );

        Ok(records)
    }

    /// 插入单条运价记录
    pub fn insert(&self, record: &TariffRateRecord) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        insert_record(&conn, record)
    }

    /// 批量插入（同一事务，全部成功或全部回滚）
    ///
    /// # 返回
    /// - Ok(usize): 插入条数
    pub fn insert_batch(&self, records: &[TariffRateRecord]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        for record in records {
            insert_record(&tx, record)?;
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(records.len())
    }
}

impl TariffSource for TariffRepository {
    fn fetch_tariff_records(
        &self,
        key: &TariffKey,
        as_of: NaiveDate,
    ) -> RepositoryResult<Vec<TariffRateRecord>> {
        self.find_effective(key, as_of)
    }
}

// ==========================================
// 行级操作
// ==========================================

fn select_records(
    conn: &Connection,
    key: &TariffKey,
    as_of: Option<NaiveDate>,
) -> RepositoryResult<Vec<TariffRateRecord>> {
    let records = match key {
        TariffKey::Zip3(zip3) => {
            let mut stmt = conn.prepare(
                "SELECT zip3, basepoint_city, state, service_area, rate_area, region FROM tariff_zip3s WHERE zip3 = ?1",
            )?;
            let rows = stmt
                .query_map(params![zip3], map_zip3_row)?
                .collect::<SqliteResult<Vec<_>>>()?;
            rows.into_iter().map(TariffRateRecord::Zip3).collect()
        }
        TariffKey::ServiceArea(service_area) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM tariff_service_areas WHERE service_area = ?1 AND {} ORDER BY id",
                SERVICE_AREA_COLUMNS,
                window_clause(2)
            ))?;
            let rows = stmt
                .query_map(params![service_area, as_of], map_service_area_row)?
                .collect::<SqliteResult<Vec<_>>>()?;
            rows.into_iter().map(TariffRateRecord::ServiceArea).collect()
        }
        TariffKey::Item(code) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM tariff_item_rates WHERE code = ?1 AND {} ORDER BY id",
                ITEM_RATE_COLUMNS,
                window_clause(2)
            ))?;
            let rows = stmt
                .query_map(params![code, as_of], map_item_rate_row)?
                .collect::<SqliteResult<Vec<_>>>()?;
            rows.into_iter().map(TariffRateRecord::Item).collect()
        }
        TariffKey::Linehaul => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM tariff_linehaul_rates WHERE {} ORDER BY id",
                LINEHAUL_COLUMNS,
                window_clause(1)
            ))?;
            let rows = stmt
                .query_map(params![as_of], map_linehaul_row)?
                .collect::<SqliteResult<Vec<_>>>()?;
            rows.into_iter().map(TariffRateRecord::Linehaul).collect()
        }
    };

    Ok(records)
}

/// 生效窗口过滤条件；参数为空时返回全部窗口
fn window_clause(param: usize) -> String {
    format!(
        "(?{p} IS NULL OR (effective_date_lower <= ?{p} AND ?{p} < effective_date_upper))",
        p = param
    )
}

fn insert_record(conn: &Connection, record: &TariffRateRecord) -> RepositoryResult<()> {
    match record {
        TariffRateRecord::Zip3(r) => {
            conn.execute(
                r#"INSERT INTO tariff_zip3s (zip3, basepoint_city, state, service_area, rate_area, region)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
                params![r.zip3, r.basepoint_city, r.state, r.service_area, r.rate_area, r.region],
            )?;
        }
        TariffRateRecord::ServiceArea(r) => {
            conn.execute(
                &format!(
                    "INSERT INTO tariff_service_areas ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                    SERVICE_AREA_COLUMNS
                ),
                params![
                    r.service_area,
                    r.name,
                    r.services_schedule,
                    r.linehaul_factor.0,
                    r.service_charge_cents.0,
                    r.sit_185a_rate_cents.0,
                    r.sit_185b_rate_cents.0,
                    r.sit_pd_schedule,
                    r.weight_lbs_lower.0,
                    r.weight_lbs_upper.0,
                    r.window.lower,
                    r.window.upper,
                ],
            )?;
        }
        TariffRateRecord::Item(r) => {
            conn.execute(
                &format!(
                    "INSERT INTO tariff_item_rates ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    ITEM_RATE_COLUMNS
                ),
                params![
                    r.code,
                    r.schedule,
                    r.weight_lbs_lower.0,
                    r.weight_lbs_upper.0,
                    r.rate_cents.0,
                    r.window.lower,
                    r.window.upper,
                ],
            )?;
        }
        TariffRateRecord::Linehaul(r) => {
            conn.execute(
                &format!(
                    "INSERT INTO tariff_linehaul_rates ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    LINEHAUL_COLUMNS
                ),
                params![
                    r.distance_miles_lower.0,
                    r.distance_miles_upper.0,
                    r.weight_lbs_lower.0,
                    r.weight_lbs_upper.0,
                    r.rate_cents.0,
                    r.window.lower,
                    r.window.upper,
                ],
            )?;
        }
    }
    Ok(())
}

fn map_zip3_row(row: &Row<'_>) -> SqliteResult<Zip3Record> {
    Ok(Zip3Record {
        zip3: row.get(0)?,
        basepoint_city: row.get(1)?,
        state: row.get(2)?,
        service_area: row.get(3)?,
        rate_area: row.get(4)?,
        region: row.get(5)?,
    })
}

fn map_service_area_row(row: &Row<'_>) -> SqliteResult<ServiceAreaRate> {
    Ok(ServiceAreaRate {
        service_area: row.get(0)?,
        name: row.get(1)?,
        services_schedule: row.get(2)?,
        linehaul_factor: Cents(row.get(3)?),
        service_charge_cents: Cents(row.get(4)?),
        sit_185a_rate_cents: Cents(row.get(5)?),
        sit_185b_rate_cents: Cents(row.get(6)?),
        sit_pd_schedule: row.get(7)?,
        weight_lbs_lower: Pound(row.get(8)?),
        weight_lbs_upper: Pound(row.get(9)?),
        window: EffectiveWindow::new(row.get(10)?, row.get(11)?),
    })
}

fn map_item_rate_row(row: &Row<'_>) -> SqliteResult<ItemRate> {
    Ok(ItemRate {
        code: row.get(0)?,
        schedule: row.get(1)?,
        weight_lbs_lower: Pound(row.get(2)?),
        weight_lbs_upper: Pound(row.get(3)?),
        rate_cents: Cents(row.get(4)?),
        window: EffectiveWindow::new(row.get(5)?, row.get(6)?),
    })
}

fn map_linehaul_row(row: &Row<'_>) -> SqliteResult<LinehaulRate> {
    Ok(LinehaulRate {
        distance_miles_lower: Miles(row.get(0)?),
        distance_miles_upper: Miles(row.get(1)?),
        weight_lbs_lower: Pound(row.get(2)?),
        weight_lbs_upper: Pound(row.get(3)?),
        rate_cents: Cents(row.get(4)?),
        window: EffectiveWindow::new(row.get(5)?, row.get(6)?),
    })
}
