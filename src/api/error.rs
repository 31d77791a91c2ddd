// ==========================================
// 家庭物品搬迁核心 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换仓储/引擎错误为用户友好的错误消息
// 红线: 错误信息必须包含显式原因
// ==========================================

use crate::domain::shipment::FieldViolation;
use crate::engine::error::EngineError;
use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    #[error("无效的状态转换: shipment_id={shipment_id}, from={from}, requested={requested}, reason={reason}")]
    InvalidStateTransition {
        shipment_id: String,
        from: String,
        requested: String,
        reason: String,
    },

    /// 字段校验失败（带全部违规项）
    #[error("数据验证失败: {reason}")]
    ValidationError {
        reason: String,
        violations: Vec<FieldViolation>,
    },

    // ==========================================
    // 计价错误
    // ==========================================
    #[error("计价失败: {0}")]
    PricingError(String),

    // ==========================================
    // 并发控制错误
    // ==========================================
    /// 调用方可重新读取后整体重试
    #[error("并发冲突: {0}")]
    ConcurrencyConflict(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 导入错误
    // ==========================================
    #[error("文件导入失败: {0}")]
    ImportError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(violations: Vec<FieldViolation>) -> Self {
        let reason = violations
            .iter()
            .map(|v| format!("{}: {}", v.field, v.message))
            .collect::<Vec<_>>()
            .join("; ");
        ApiError::ValidationError { reason, violations }
    }

    /// 调用方是否可以重新读取后重试
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::ConcurrencyConflict(_))
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            // 并发控制错误
            RepositoryError::OptimisticLockFailure {
                entity,
                id,
                expected,
                actual,
            } => ApiError::ConcurrencyConflict(format!(
                "{}(id={})已被其他请求修改（期望revision={}，实际revision={}）",
                entity, id, expected, actual
            )),

            // 数据库错误
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }

            // 数据质量错误
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }

            // 通用错误
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 EngineError 转换
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::InvalidTransition {
                shipment_id,
                from,
                requested,
                reason,
            } => ApiError::InvalidStateTransition {
                shipment_id,
                from: from.to_string(),
                requested,
                reason,
            },
            EngineError::InvalidInput(msg) => ApiError::InvalidInput(msg),
            EngineError::MissingShipmentAttribute {
                shipment_id,
                attribute,
            } => ApiError::BusinessRuleViolation(format!(
                "运单{}缺少属性: {}",
                shipment_id, attribute
            )),
            e @ (EngineError::NoApplicableRate { .. }
            | EngineError::AmbiguousRate { .. }
            | EngineError::UnpricedItemCode(_)
            | EngineError::AmountOverflow(_)
            | EngineError::OverlappingTariff(_)) => ApiError::PricingError(e.to_string()),
            e @ EngineError::GblSequenceExhausted { .. } => {
                ApiError::BusinessRuleViolation(e.to_string())
            }
            EngineError::ConcurrencyConflict(msg) => ApiError::ConcurrencyConflict(msg),
            EngineError::Repository(e) => e.into(),
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Repository(e) => e.into(),
            other => ApiError::ImportError(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
