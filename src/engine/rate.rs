// ==========================================
// 家庭物品搬迁核心 - 运价计算引擎
// ==========================================
// 职责: 为运单费用行按项目代码的计价策略计算金额
// 输入: 费用行 + 运单（book_date、重量、距离、地址）+ 运价来源
// 输出: 金额（整数分）
// 红线: 同一输入必得同一结果（全部整数运算，四舍五入到分）
// 红线: 运价为零条或多于一条都是硬错误，不做猜测
// ==========================================

mod core;
pub mod pricing;
pub mod tariff_table;


pub use self::core::RateEngine;
pub use pricing::{policy_for, priced_codes, PricingPolicy, SubRate};
pub use tariff_table::{validate_non_overlapping, TariffSource, TariffTable};
