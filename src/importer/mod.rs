// ==========================================
// 家庭物品搬迁核心 - 导入层
// ==========================================
// 职责: 运价表文件导入（zip3 / 服务区 / 附加项目 / 干线）
// 支持: Excel, CSV
// ==========================================

pub mod error;
pub mod file_parser;
pub mod tariff_importer;

// 重导出核心类型
pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvParser, ExcelParser, FileParser, RawRow, UniversalFileParser};
pub use tariff_importer::{TariffImportSummary, TariffImporter, TariffSheetKind};
