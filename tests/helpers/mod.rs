// ==========================================
// 集成测试共享构建器
// ==========================================

#![allow(dead_code)]

pub mod test_data_builder;
