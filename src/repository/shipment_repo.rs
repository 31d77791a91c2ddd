// ==========================================
// 家庭物品搬迁核心 - 运单数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑，状态合法性由状态机判定
// 并发: shipments.revision 乐观锁，同一源状态的两次并发转换只有一次成功
// ==========================================

use crate::domain::offer::ShipmentOffer;
use crate::domain::shipment::{Address, Shipment};
use crate::domain::types::ShipmentStatus;
use crate::domain::units::{Miles, Pound};
use crate::repository::error::{conversion_error, RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const SHIPMENT_COLUMNS: &str = r#"
    shipment_id, move_id, status, source_gbloc, destination_gbloc, gbl_number, market,
    book_date, requested_pickup_date, actual_pack_date, actual_pickup_date, actual_delivery_date,
    estimated_pack_days, estimated_transit_days,
    weight_estimate_lbs, progear_weight_estimate_lbs, spouse_progear_weight_estimate_lbs,
    net_weight_lbs, transit_distance_miles, pickup_address_json, delivery_address_json,
    created_at, updated_at, revision
"#;

// ==========================================
// ShipmentRepository - 运单仓储
// ==========================================
pub struct ShipmentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ShipmentRepository {
    /// 创建新的 ShipmentRepository 实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path).map_err(|e| {
            RepositoryError::DatabaseConnectionError(format!("{}: {}", db_path, e))
        })?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入新运单
    pub fn insert(&self, shipment: &Shipment) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let pickup = address_to_json(shipment.pickup_address.as_ref())?;
        let delivery = address_to_json(shipment.delivery_address.as_ref())?;

        conn.execute(
            &format!(
                "INSERT INTO shipments ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24)",
                SHIPMENT_COLUMNS
            ),
            params![
                shipment.shipment_id,
                shipment.move_id,
                shipment.status.to_db_str(),
                shipment.source_gbloc,
                shipment.destination_gbloc,
                shipment.gbl_number,
                shipment.market,
                shipment.book_date,
                shipment.requested_pickup_date,
                shipment.actual_pack_date,
                shipment.actual_pickup_date,
                shipment.actual_delivery_date,
                shipment.estimated_pack_days,
                shipment.estimated_transit_days,
                shipment.weight_estimate.map(|w| w.0),
                shipment.progear_weight_estimate.map(|w| w.0),
                shipment.spouse_progear_weight_estimate.map(|w| w.0),
                shipment.net_weight.map(|w| w.0),
                shipment.transit_distance.map(|d| d.0),
                pickup,
                delivery,
                shipment.created_at,
                shipment.updated_at,
                shipment.revision,
            ],
        )?;
        Ok(())
    }

    /// 按主键查询
    ///
    /// # 返回
    /// - Ok(Some(Shipment)): 找到运单
    /// - Ok(None): 未找到
    /// - Err: 数据库错误
    pub fn find_by_id(&self, shipment_id: &str) -> RepositoryResult<Option<Shipment>> {
        let conn = self.get_conn()?;
        find_shipment(&conn, shipment_id)
    }

    /// 按主键读取，不存在时返回 NotFound
    pub fn fetch(&self, shipment_id: &str) -> RepositoryResult<Shipment> {
        self.find_by_id(shipment_id)?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "Shipment".to_string(),
                id: shipment_id.to_string(),
            })
    }

    /// 按状态查询（按创建时间升序）
    pub fn find_by_status(&self, status: ShipmentStatus) -> RepositoryResult<Vec<Shipment>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM shipments WHERE status = ?1 ORDER BY created_at ASC, shipment_id ASC",
            SHIPMENT_COLUMNS
        ))?;
        let shipments = stmt
            .query_map(params![status.to_db_str()], map_shipment_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(shipments)
    }

    /// 查询未报价运单
    ///
    /// 状态为 SUBMITTED 且没有待定/已接受报价的运单；已拒绝的报价不计入
    pub fn fetch_unoffered_shipments(&self) -> RepositoryResult<Vec<Shipment>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {} FROM shipments s
            WHERE s.status = ?1
              AND NOT EXISTS (
                  SELECT 1 FROM shipment_offers o
                  WHERE o.shipment_id = s.shipment_id
                    AND (o.accepted IS NULL OR o.accepted = 1)
              )
            ORDER BY s.created_at ASC, s.shipment_id ASC
            "#,
            SHIPMENT_COLUMNS
        ))?;
        let shipments = stmt
            .query_map(params![ShipmentStatus::Submitted.to_db_str()], map_shipment_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(shipments)
    }

    /// 更新运单 (带乐观锁检查)
    ///
    /// # 返回
    /// - Ok(i32): 更新后的 revision
    ///
    /// # 错误
    /// - `RepositoryError::OptimisticLockFailure`: revision 不匹配 (其他请求已更新)
    /// - `RepositoryError::NotFound`: shipment_id 不存在
    pub fn update(&self, shipment: &Shipment) -> RepositoryResult<i32> {
        let conn = self.get_conn()?;
        update_shipment_row(&conn, shipment)
    }

    /// 在一个事务内保存运单和报价（承运商接受运单）
    ///
    /// 运单走乐观锁更新；报价整行覆盖
    pub fn save_shipment_with_offer(
        &self,
        shipment: &Shipment,
        offer: &ShipmentOffer,
    ) -> RepositoryResult<i32> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let revision = update_shipment_row(&tx, shipment)?;
        let rows = tx.execute(
            r#"UPDATE shipment_offers
               SET accepted = ?1, rejection_reason = ?2
               WHERE offer_id = ?3"#,
            params![offer.accepted, offer.rejection_reason, offer.offer_id],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "ShipmentOffer".to_string(),
                id: offer.offer_id.clone(),
            });
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(revision)
    }
}

// ==========================================
// 事务内可复用的行级操作
// ==========================================

pub(crate) fn find_shipment(conn: &Connection, shipment_id: &str) -> RepositoryResult<Option<Shipment>> {
    let shipment = conn
        .query_row(
            &format!("SELECT {} FROM shipments WHERE shipment_id = ?1", SHIPMENT_COLUMNS),
            params![shipment_id],
            map_shipment_row,
        )
        .optional()?;
    Ok(shipment)
}

/// 乐观锁更新运单整行，返回新 revision
pub(crate) fn update_shipment_row(conn: &Connection, shipment: &Shipment) -> RepositoryResult<i32> {
    let pickup = address_to_json(shipment.pickup_address.as_ref())?;
    let delivery = address_to_json(shipment.delivery_address.as_ref())?;

    let rows_affected = conn.execute(
        r#"UPDATE shipments
           SET move_id = ?1, status = ?2, source_gbloc = ?3, destination_gbloc = ?4,
               gbl_number = ?5, market = ?6, book_date = ?7, requested_pickup_date = ?8,
               actual_pack_date = ?9, actual_pickup_date = ?10, actual_delivery_date = ?11,
               estimated_pack_days = ?12, estimated_transit_days = ?13,
               weight_estimate_lbs = ?14, progear_weight_estimate_lbs = ?15,
               spouse_progear_weight_estimate_lbs = ?16, net_weight_lbs = ?17,
               transit_distance_miles = ?18, pickup_address_json = ?19,
               delivery_address_json = ?20, updated_at = ?21, revision = revision + 1
           WHERE shipment_id = ?22 AND revision = ?23"#,
        params![
            shipment.move_id,
            shipment.status.to_db_str(),
            shipment.source_gbloc,
            shipment.destination_gbloc,
            shipment.gbl_number,
            shipment.market,
            shipment.book_date,
            shipment.requested_pickup_date,
            shipment.actual_pack_date,
            shipment.actual_pickup_date,
            shipment.actual_delivery_date,
            shipment.estimated_pack_days,
            shipment.estimated_transit_days,
            shipment.weight_estimate.map(|w| w.0),
            shipment.progear_weight_estimate.map(|w| w.0),
            shipment.spouse_progear_weight_estimate.map(|w| w.0),
            shipment.net_weight.map(|w| w.0),
            shipment.transit_distance.map(|d| d.0),
            pickup,
            delivery,
            shipment.updated_at,
            shipment.shipment_id,
            shipment.revision,
        ],
    )?;

    if rows_affected == 0 {
        // 判断是记录不存在还是 revision 冲突
        let actual: Option<i32> = conn
            .query_row(
                "SELECT revision FROM shipments WHERE shipment_id = ?1",
                params![shipment.shipment_id],
                |row| row.get(0),
            )
            .optional()?;

        return match actual {
            Some(actual_revision) => Err(RepositoryError::OptimisticLockFailure {
                entity: "Shipment".to_string(),
                id: shipment.shipment_id.clone(),
                expected: shipment.revision,
                actual: actual_revision,
            }),
            None => Err(RepositoryError::NotFound {
                entity: "Shipment".to_string(),
                id: shipment.shipment_id.clone(),
            }),
        };
    }

    Ok(shipment.revision + 1)
}

fn address_to_json(address: Option<&Address>) -> RepositoryResult<Option<String>> {
    address
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| RepositoryError::FieldValueError {
            field: "address".to_string(),
            message: e.to_string(),
        })
}

fn address_from_json(column: usize, raw: Option<String>) -> SqliteResult<Option<Address>> {
    raw.map(|s| serde_json::from_str::<Address>(&s).map_err(|e| conversion_error(column, e.to_string())))
        .transpose()
}

fn map_shipment_row(row: &Row<'_>) -> SqliteResult<Shipment> {
    let status_raw: String = row.get(2)?;
    let status = ShipmentStatus::from_str(&status_raw)
        .ok_or_else(|| conversion_error(2, format!("未知运单状态: {}", status_raw)))?;

    Ok(Shipment {
        shipment_id: row.get(0)?,
        move_id: row.get(1)?,
        status,
        source_gbloc: row.get(3)?,
        destination_gbloc: row.get(4)?,
        gbl_number: row.get(5)?,
        market: row.get(6)?,
        book_date: row.get(7)?,
        requested_pickup_date: row.get(8)?,
        actual_pack_date: row.get(9)?,
        actual_pickup_date: row.get(10)?,
        actual_delivery_date: row.get(11)?,
        estimated_pack_days: row.get(12)?,
        estimated_transit_days: row.get(13)?,
        weight_estimate: row.get::<_, Option<i64>>(14)?.map(Pound),
        progear_weight_estimate: row.get::<_, Option<i64>>(15)?.map(Pound),
        spouse_progear_weight_estimate: row.get::<_, Option<i64>>(16)?.map(Pound),
        net_weight: row.get::<_, Option<i64>>(17)?.map(Pound),
        transit_distance: row.get::<_, Option<i64>>(18)?.map(Miles),
        pickup_address: address_from_json(19, row.get(19)?)?,
        delivery_address: address_from_json(20, row.get(20)?)?,
        created_at: row.get(21)?,
        updated_at: row.get(22)?,
        revision: row.get(23)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn setup() -> ShipmentRepository {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        ShipmentRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    fn now() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2018, 6, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    #[test]
    fn test_insert_and_fetch_keeps_fields() {
        let repo = setup();
        let mut shipment = Shipment::new_draft("move-1", now());
        shipment.source_gbloc = Some("KKFA".to_string());
        shipment.net_weight = Some(Pound(4500));
        shipment.pickup_address = Some(Address::new("1 Main", "Gulfport", "MS", "39501"));
        repo.insert(&shipment).unwrap();

        let loaded = repo.fetch(&shipment.shipment_id).unwrap();
        assert_eq!(loaded, shipment);
    }

    #[test]
    fn test_update_with_stale_revision_fails() {
        let repo = setup();
        let shipment = Shipment::new_draft("move-1", now());
        repo.insert(&shipment).unwrap();

        let mut first = shipment.clone();
        first.market = Some("dHHG".to_string());
        assert_eq!(repo.update(&first).unwrap(), 1);

        // 仍持有 revision=0 的副本
        let err = repo.update(&shipment).unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::OptimisticLockFailure { expected: 0, actual: 1, .. }
        ));
    }

    #[test]
    fn test_open_in_missing_directory_is_connection_error() {
        let result = ShipmentRepository::new("/no/such/dir/hhg_move_engine.db");
        assert!(matches!(result, Err(RepositoryError::DatabaseConnectionError(_))));
    }

    #[test]
    fn test_update_missing_shipment_is_not_found() {
        let repo = setup();
        let shipment = Shipment::new_draft("move-1", now());
        let err = repo.update(&shipment).unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }
}
