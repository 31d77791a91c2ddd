// 运价表导入工具
//
// Usage:
//   import_tariff <file.csv|file.xlsx> [zip3|service_area|item_rate|linehaul]
//
// CSV 必须指定表类型；Excel 不指定时按工作表名识别。
// 数据库路径: 环境变量 HHG_MOVE_ENGINE_DB_PATH，否则为用户数据目录

use anyhow::{anyhow, Context, Result};
use hhg_move_engine::db::{get_default_db_path, init_schema, open_sqlite_connection};
use hhg_move_engine::importer::{TariffImporter, TariffSheetKind};
use hhg_move_engine::logging;
use hhg_move_engine::repository::TariffRepository;
use std::sync::{Arc, Mutex};

fn main() -> Result<()> {
    logging::init();

    let mut args = std::env::args().skip(1);
    let file_path = args
        .next()
        .context("用法: import_tariff <file> [zip3|service_area|item_rate|linehaul]")?;
    let kind = match args.next() {
        Some(raw) => Some(
            TariffSheetKind::from_name(&raw).ok_or_else(|| anyhow!("无法识别的运价表类型: {}", raw))?,
        ),
        None => None,
    };

    let db_path = get_default_db_path();
    let conn = open_sqlite_connection(&db_path).with_context(|| format!("无法打开数据库: {}", db_path))?;
    init_schema(&conn)?;

    let repo = Arc::new(TariffRepository::from_connection(Arc::new(Mutex::new(conn))));
    let summary = TariffImporter::new(repo).import_file(&file_path, kind)?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
