// ==========================================
// 家庭物品搬迁核心 - 配置层
// ==========================================
// 职责: 排期规则表与工作日历的配置读取，内置默认值
// 存储: config_kv 表
// ==========================================

pub mod config_manager;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager, GLOBAL_SCOPE};
