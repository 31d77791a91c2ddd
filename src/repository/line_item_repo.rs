// ==========================================
// 家庭物品搬迁核心 - 费用行数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 红线: 运单与费用行的批量保存在同一事务内完成
// ==========================================

use crate::domain::line_item::ShipmentLineItem;
use crate::domain::shipment::Shipment;
use crate::domain::types::{LineItemLocation, LineItemStatus};
use crate::domain::units::{BaseQuantity, Cents};
use crate::repository::error::{conversion_error, RepositoryError, RepositoryResult};
use crate::repository::shipment_repo::update_shipment_row;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const LINE_ITEM_COLUMNS: &str = r#"
    line_item_id, shipment_id, code, quantity1, quantity2, location, status,
    notes, amount_cents, submitted_date, approved_date
"#;

// ==========================================
// ShipmentLineItemRepository - 费用行仓储
// ==========================================
pub struct ShipmentLineItemRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ShipmentLineItemRepository {
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

    /// 插入单条费用行
    pub fn insert(&self, item: &ShipmentLineItem) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        insert_line_item(&conn, item)
    }

    /// 按主键查询
    pub fn find_by_id(&self, line_item_id: &str) -> RepositoryResult<Option<ShipmentLineItem>> {
        let conn = self.get_conn()?;
        let item = conn
            .query_row(
                &format!(
                    "SELECT {} FROM shipment_line_items WHERE line_item_id = ?1",
                    LINE_ITEM_COLUMNS
                ),
                params![line_item_id],
                map_line_item_row,
            )
            .optional()?;
        Ok(item)
    }

    /// 查询运单的全部费用行（按提交时间升序）
    pub fn find_by_shipment(&self, shipment_id: &str) -> RepositoryResult<Vec<ShipmentLineItem>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM shipment_line_items WHERE shipment_id = ?1 ORDER BY submitted_date ASC, line_item_id ASC",
            LINE_ITEM_COLUMNS
        ))?;
        let items = stmt
            .query_map(params![shipment_id], map_line_item_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(items)
    }

    /// 按项目代码查询运单的费用行
    ///
    /// # 参数
    /// - `shipment_id`: 运单ID
    /// - `code`: 项目代码（大小写不敏感）
    pub fn find_by_code(
        &self,
        shipment_id: &str,
        code: &str,
    ) -> RepositoryResult<Vec<ShipmentLineItem>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM shipment_line_items WHERE shipment_id = ?1 AND code = ?2 ORDER BY submitted_date ASC, line_item_id ASC",
            LINE_ITEM_COLUMNS
        ))?;
        let items = stmt
            .query_map(params![shipment_id, code.trim().to_uppercase()], map_line_item_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(items)
    }

    /// 写入计价结果
    pub fn update_amount(&self, line_item_id: &str, amount: Cents) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        update_amount_row(&conn, line_item_id, amount)
    }

    /// 批量写入计价结果（同一事务，全部成功或全部回滚）
    pub fn update_amounts(&self, amounts: &[(String, Cents)]) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        for (line_item_id, amount) in amounts {
            update_amount_row(&tx, line_item_id, *amount)?;
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(())
    }

    /// 在一个事务内保存运单（乐观锁）并插入新费用行
    ///
    /// # 返回
    /// - Ok(i32): 运单更新后的 revision
    pub fn save_shipment_and_line_items(
        &self,
        shipment: &Shipment,
        items: &[ShipmentLineItem],
    ) -> RepositoryResult<i32> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let revision = update_shipment_row(&tx, shipment)?;
        for item in items {
            insert_line_item(&tx, item)?;
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(revision)
    }
}

fn insert_line_item(conn: &Connection, item: &ShipmentLineItem) -> RepositoryResult<()> {
    conn.execute(
        &format!(
            "INSERT INTO shipment_line_items ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            LINE_ITEM_COLUMNS
        ),
        params![
            item.line_item_id,
            item.shipment_id,
            item.code,
            item.quantity1.0,
            item.quantity2.0,
            item.location.to_db_str(),
            item.status.to_db_str(),
            item.notes,
            item.amount_cents.map(|c| c.0),
            item.submitted_date,
            item.approved_date,
        ],
    )?;
    Ok(())
}

fn update_amount_row(conn: &Connection, line_item_id: &str, amount: Cents) -> RepositoryResult<()> {
    let rows = conn.execute(
        "UPDATE shipment_line_items SET amount_cents = ?1 WHERE line_item_id = ?2",
        params![amount.0, line_item_id],
    )?;
    if rows == 0 {
        return Err(RepositoryError::NotFound {
            entity: "ShipmentLineItem".to_string(),
            id: line_item_id.to_string(),
        });
    }
    Ok(())
}

fn map_line_item_row(row: &Row<'_>) -> SqliteResult<ShipmentLineItem> {
    let location_raw: String = row.get(5)?;
    let location = LineItemLocation::from_str(&location_raw)
        .ok_or_else(|| conversion_error(5, format!("未知费用发生地: {}", location_raw)))?;
    let status_raw: String = row.get(6)?;
    let status = LineItemStatus::from_str(&status_raw)
        .ok_or_else(|| conversion_error(6, format!("未知费用行状态: {}", status_raw)))?;

    Ok(ShipmentLineItem {
        line_item_id: row.get(0)?,
        shipment_id: row.get(1)?,
        code: row.get(2)?,
        quantity1: BaseQuantity(row.get(3)?),
        quantity2: BaseQuantity(row.get(4)?),
        location,
        status,
        notes: row.get(7)?,
        amount_cents: row.get::<_, Option<i64>>(8)?.map(Cents),
        submitted_date: row.get(9)?,
        approved_date: row.get(10)?,
    })
}
