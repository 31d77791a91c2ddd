// ==========================================
// 家庭物品搬迁核心 - 领域类型定义
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 运单状态 (Shipment Status)
// ==========================================
// 顺序: DRAFT < SUBMITTED < AWARDED < ACCEPTED < APPROVED < IN_TRANSIT < DELIVERED < COMPLETED
// 红线: 状态只能经由状态机的具名转换推进
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipmentStatus {
    Draft,     // 草稿
    Submitted, // 已提交
    Awarded,   // 已授予承运商
    Accepted,  // 承运商已接受
    Approved,  // 已批准
    InTransit, // 运输中
    Delivered, // 已送达
    Completed, // 已完成（终态）
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl ShipmentStatus {
    /// 从字符串解析状态
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "DRAFT" => Some(ShipmentStatus::Draft),
            "SUBMITTED" => Some(ShipmentStatus::Submitted),
            "AWARDED" => Some(ShipmentStatus::Awarded),
            "ACCEPTED" => Some(ShipmentStatus::Accepted),
            "APPROVED" => Some(ShipmentStatus::Approved),
            "IN_TRANSIT" | "INTRANSIT" => Some(ShipmentStatus::InTransit),
            "DELIVERED" => Some(ShipmentStatus::Delivered),
            "COMPLETED" => Some(ShipmentStatus::Completed),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ShipmentStatus::Draft => "DRAFT",
            ShipmentStatus::Submitted => "SUBMITTED",
            ShipmentStatus::Awarded => "AWARDED",
            ShipmentStatus::Accepted => "ACCEPTED",
            ShipmentStatus::Approved => "APPROVED",
            ShipmentStatus::InTransit => "IN_TRANSIT",
            ShipmentStatus::Delivered => "DELIVERED",
            ShipmentStatus::Completed => "COMPLETED",
        }
    }

    /// 是否已提交（GBL 号必须存在）
    pub fn is_submitted_or_later(&self) -> bool {
        *self >= ShipmentStatus::Submitted
    }

    /// 是否允许最终计价
    pub fn is_approved_or_later(&self) -> bool {
        *self >= ShipmentStatus::Approved
    }

    pub fn is_terminal(&self) -> bool {
        *self == ShipmentStatus::Completed
    }
}

// ==========================================
// 费用行状态 (Line Item Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineItemStatus {
    Submitted, // 已提交
    Approved,  // 已批准
    Rejected,  // 已驳回
}

impl fmt::Display for LineItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl LineItemStatus {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "SUBMITTED" => Some(LineItemStatus::Submitted),
            "APPROVED" => Some(LineItemStatus::Approved),
            "REJECTED" => Some(LineItemStatus::Rejected),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            LineItemStatus::Submitted => "SUBMITTED",
            LineItemStatus::Approved => "APPROVED",
            LineItemStatus::Rejected => "REJECTED",
        }
    }
}

// ==========================================
// 费用行发生地 (Line Item Location)
// ==========================================
// 决定使用起运地还是目的地的服务区
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineItemLocation {
    Origin,      // 起运地
    Destination, // 目的地
}

impl fmt::Display for LineItemLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl LineItemLocation {
    /// 兼容单字母写法 ("O" / "D")
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "ORIGIN" | "O" => Some(LineItemLocation::Origin),
            "DESTINATION" | "D" => Some(LineItemLocation::Destination),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            LineItemLocation::Origin => "ORIGIN",
            LineItemLocation::Destination => "DESTINATION",
        }
    }
}
