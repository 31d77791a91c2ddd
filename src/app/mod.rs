// ==========================================
// 家庭物品搬迁核心 - 应用层
// ==========================================
// 职责: 组装仓储 / 引擎 / API，供二进制入口使用
// ==========================================

pub mod state;

// 重导出
pub use state::AppState;
