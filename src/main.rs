// ==========================================
// 家庭物品搬迁核心 - 运维命令行入口
// ==========================================
// 用法:
//   hhg-move-engine init
//   hhg-move-engine move-dates <目标日> <重量lbs> <距离mi> <报到日>
//   hhg-move-engine unoffered
//   hhg-move-engine price <shipment_id>
//   hhg-move-engine transitions <shipment_id>
//   hhg-move-engine config-snapshot
//
// 数据库路径: 环境变量 HHG_MOVE_ENGINE_DB_PATH，否则为用户数据目录
// 日志格式: HHG_MOVE_ENGINE_LOG_FORMAT=json 时输出 JSON
// ==========================================

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use hhg_move_engine::app::AppState;
use hhg_move_engine::db::get_default_db_path;
use hhg_move_engine::domain::units::{Miles, Pound};
use hhg_move_engine::logging;

const LOG_FORMAT_ENV: &str = "HHG_MOVE_ENGINE_LOG_FORMAT";

fn main() -> Result<()> {
    if std::env::var(LOG_FORMAT_ENV).map_or(false, |v| v.eq_ignore_ascii_case("json")) {
        logging::init_json();
    } else {
        logging::init();
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match args.first() {
        Some(c) => c.as_str(),
        None => {
            print_usage();
            return Ok(());
        }
    };

    let db_path = get_default_db_path();
    tracing::info!("系统版本: {}, 使用数据库: {}", hhg_move_engine::VERSION, db_path);
    let state = AppState::new(db_path).map_err(anyhow::Error::msg)?;

    match command {
        "init" => {
            println!("schema 已初始化: {}", state.db_path);
        }
        "move-dates" => {
            if args.len() != 5 {
                bail!("用法: move-dates <目标日> <重量lbs> <距离mi> <报到日>");
            }
            let target = parse_date(&args[1])?;
            let weight: i64 = args[2].parse().context("重量必须为整数磅")?;
            let distance: i64 = args[3].parse().context("距离必须为整数英里")?;
            let report_by = parse_date(&args[4])?;

            let summary = state
                .move_dates_api
                .summary(target, Pound(weight), Miles(distance), report_by)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        "unoffered" => {
            let shipments = state.shipment_api.fetch_unoffered_shipments()?;
            println!("{}", serde_json::to_string_pretty(&shipments)?);
        }
        "price" => {
            let shipment_id = args.get(1).context("用法: price <shipment_id>")?;
            let items = state.rate_api.price_shipment(shipment_id)?;
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
        "transitions" => {
            let shipment_id = args.get(1).context("用法: transitions <shipment_id>")?;
            let names = state.shipment_api.available_transitions(shipment_id)?;
            println!("{}", names.join(", "));
        }
        "config-snapshot" => {
            let snapshot = state
                .config_manager
                .get_config_snapshot()
                .map_err(|e| anyhow::anyhow!("读取配置快照失败: {}", e))?;
            println!("{}", snapshot);
        }
        other => {
            print_usage();
            bail!("未知命令: {}", other);
        }
    }

    Ok(())
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").with_context(|| format!("日期格式应为 YYYY-MM-DD: {}", raw))
}

fn print_usage() {
    println!("==================================================");
    println!("{} v{}", hhg_move_engine::APP_NAME, hhg_move_engine::VERSION);
    println!("==================================================");
    println!("命令:");
    println!("  init");
    println!("  move-dates <目标日> <重量lbs> <距离mi> <报到日>");
    println!("  unoffered");
    println!("  price <shipment_id>");
    println!("  transitions <shipment_id>");
    println!("  config-snapshot");
}
