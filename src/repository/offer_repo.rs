// ==========================================
// 家庭物品搬迁核心 - 承运商与报价数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 说明: 报价的产生（竞标分配）在本核心之外，这里只提供读写
// ==========================================

use crate::domain::offer::{ShipmentOffer, TransportationServiceProvider};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// ShipmentOfferRepository - 报价仓储
// ==========================================
pub struct ShipmentOfferRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ShipmentOfferRepository {
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

    // ==========================================
    // 承运商
    // ==========================================

    pub fn insert_tsp(&self, tsp: &TransportationServiceProvider) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO transportation_service_providers (tsp_id, standard_carrier_alpha_code, name)
               VALUES (?1, ?2, ?3)"#,
            params![tsp.tsp_id, tsp.standard_carrier_alpha_code, tsp.name],
        )?;
        Ok(())
    }

    pub fn find_tsp(&self, tsp_id: &str) -> RepositoryResult<Option<TransportationServiceProvider>> {
        let conn = self.get_conn()?;
        let tsp = conn
            .query_row(
                r#"SELECT tsp_id, standard_carrier_alpha_code, name
                   FROM transportation_service_providers WHERE tsp_id = ?1"#,
                params![tsp_id],
                |row| {
                    Ok(TransportationServiceProvider {
                        tsp_id: row.get(0)?,
                        standard_carrier_alpha_code: row.get(1)?,
                        name: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(tsp)
    }

    // ==========================================
    // 报价
    // ==========================================

    pub fn insert_offer(&self, offer: &ShipmentOffer) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO shipment_offers (
                   offer_id, shipment_id, tsp_id, tsp_performance_id,
                   administrative_shipment, accepted, rejection_reason
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
            params![
                offer.offer_id,
                offer.shipment_id,
                offer.tsp_id,
                offer.tsp_performance_id,
                offer.administrative_shipment,
                offer.accepted,
                offer.rejection_reason,
            ],
        )?;
        Ok(())
    }

    /// 查询运单的全部报价
    pub fn find_by_shipment(&self, shipment_id: &str) -> RepositoryResult<Vec<ShipmentOffer>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT offer_id, shipment_id, tsp_id, tsp_performance_id,
                      administrative_shipment, accepted, rejection_reason
               FROM shipment_offers
               WHERE shipment_id = ?1
               ORDER BY created_at ASC, offer_id ASC"#,
        )?;
        let offers = stmt
            .query_map(params![shipment_id], map_offer_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(offers)
    }

    /// 查询某承运商对某运单的报价
    ///
    /// # 返回
    /// - Ok(Some(ShipmentOffer)): 最近一条报价
    /// - Ok(None): 该承运商没有此运单的报价
    pub fn find_for_tsp(
        &self,
        shipment_id: &str,
        tsp_id: &str,
    ) -> RepositoryResult<Option<ShipmentOffer>> {
        let conn = self.get_conn()?;
        let offer = conn
            .query_row(
                r#"SELECT offer_id, shipment_id, tsp_id, tsp_performance_id,
                          administrative_shipment, accepted, rejection_reason
                   FROM shipment_offers
                   WHERE shipment_id = ?1 AND tsp_id = ?2
                   ORDER BY created_at DESC, offer_id DESC
                   LIMIT 1"#,
                params![shipment_id, tsp_id],
                map_offer_row,
            )
            .optional()?;
        Ok(offer)
    }
}

fn map_offer_row(row: &Row<'_>) -> SqliteResult<ShipmentOffer> {
    Ok(ShipmentOffer {
        offer_id: row.get(0)?,
        shipment_id: row.get(1)?,
        tsp_id: row.get(2)?,
        tsp_performance_id: row.get(3)?,
        administrative_shipment: row.get(4)?,
        accepted: row.get(5)?,
        rejection_reason: row.get(6)?,
    })
}
