// ==========================================
// 家庭物品搬迁核心 - 运价表导入器
// ==========================================
// 流程: 文件解析 → 字段映射 → 区间校验（含库内已有记录）→ 单事务写入
// 表类型: zip3 / service_area / item_rate / linehaul
// 红线: 任一行失败则整个文件不落库
// ==========================================

use crate::domain::tariff::{
    EffectiveWindow, ItemRate, LinehaulRate, ServiceAreaRate, TariffKey, TariffRateRecord,
    Zip3Record,
};
use crate::domain::units::{Cents, Miles, Pound};
use crate::engine::rate::validate_non_overlapping;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{CsvParser, ExcelParser, FileParser, RawRow};
use crate::repository::tariff_repo::TariffRepository;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};
use uuid::Uuid;

// ==========================================
// TariffSheetKind - 运价表类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TariffSheetKind {
    Zip3,
    ServiceArea,
    ItemRate,
    Linehaul,
}

impl TariffSheetKind {
    /// 由参数或工作表名识别（复数与大小写均可）
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = name.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.trim_end_matches('s') {
            "zip3" => Some(TariffSheetKind::Zip3),
            "service_area" => Some(TariffSheetKind::ServiceArea),
            "item_rate" | "item" => Some(TariffSheetKind::ItemRate),
            "linehaul" | "linehaul_rate" => Some(TariffSheetKind::Linehaul),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TariffSheetKind::Zip3 => "zip3",
            TariffSheetKind::ServiceArea => "service_area",
            TariffSheetKind::ItemRate => "item_rate",
            TariffSheetKind::Linehaul => "linehaul",
        }
    }
}

/// 导入结果汇总
#[derive(Debug, Clone, Default, Serialize)]
pub struct TariffImportSummary {
    pub batch_id: String,
    pub file_name: String,
    pub zip3_count: usize,
    pub service_area_count: usize,
    pub item_rate_count: usize,
    pub linehaul_count: usize,
    pub skipped_sheets: Vec<String>,
    pub elapsed_ms: u128,
}

impl TariffImportSummary {
    pub fn total(&self) -> usize {
        self.zip3_count + self.service_area_count + self.item_rate_count + self.linehaul_count
    }

    fn count(&mut self, record: &TariffRateRecord) {
        match record {
            TariffRateRecord::Zip3(_) => self.zip3_count += 1,
            TariffRateRecord::ServiceArea(_) => self.service_area_count += 1,
            TariffRateRecord::Item(_) => self.item_rate_count += 1,
            TariffRateRecord::Linehaul(_) => self.linehaul_count += 1,
        }
    }
}

// ==========================================
// TariffImporter - 运价导入器
// ==========================================
pub struct TariffImporter {
    tariff_repo: Arc<TariffRepository>,
}

impl TariffImporter {
    pub fn new(tariff_repo: Arc<TariffRepository>) -> Self {
        Self { tariff_repo }
    }

    /// 导入运价文件
    ///
    /// # 参数
    /// - `file_path`: .csv 或 .xlsx/.xls
    /// - `kind`: CSV 必须指定；Excel 不指定时按工作表名识别，无法识别的工作表跳过
    ///
    /// # 返回
    /// - Ok(TariffImportSummary): 各表写入条数
    ///
    /// # 错误
    /// - 字段缺失 / 类型错误 / 日期格式错误（带行号）
    /// - `ValidationError`: 与文件内或库内记录的生效区间重叠
    #[instrument(skip(self, file_path), fields(file = %file_path.as_ref().display()))]
    pub fn import_file<P: AsRef<Path>>(
        &self,
        file_path: P,
        kind: Option<TariffSheetKind>,
    ) -> ImportResult<TariffImportSummary> {
        let started = Instant::now();
        let path = file_path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        let mut summary = TariffImportSummary {
            batch_id: Uuid::new_v4().to_string(),
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            ..Default::default()
        };

        // 1. 解析为 (表类型, 数据行)
        let sheets: Vec<(TariffSheetKind, Vec<RawRow>)> = match ext.as_str() {
            "csv" => {
                let kind = kind.ok_or_else(|| ImportError::UnknownSheetKind("CSV 需指定表类型".to_string()))?;
                vec![(kind, CsvParser.parse_to_raw_rows(path)?)]
            }
            "xlsx" | "xls" => {
                let mut sheets = Vec::new();
                for (name, rows) in ExcelParser.parse_sheets(path)? {
                    match kind.or_else(|| TariffSheetKind::from_name(&name)) {
                        Some(k) => sheets.push((k, rows)),
                        None => {
                            warn!(sheet = %name, "无法识别的工作表，跳过");
                            summary.skipped_sheets.push(name);
                        }
                    }
                    // 显式指定类型时只读第一个工作表
                    if kind.is_some() {
                        break;
                    }
                }
                sheets
            }
            other => return Err(ImportError::UnsupportedFormat(other.to_string())),
        };

        // 2. 字段映射
        let mut records = Vec::new();
        for (kind, rows) in &sheets {
            for row in rows {
                records.push(map_row(*kind, row)?);
            }
        }

        // 3. 区间校验：本文件 + 库内同键记录
        let keys: HashSet<TariffKey> = records.iter().map(TariffRateRecord::key).collect();
        let mut combined = records.clone();
        for key in &keys {
            combined.extend(self.tariff_repo.find_all_for_key(key)?);
        }
        validate_non_overlapping(&combined).map_err(|e| ImportError::ValidationError(e.to_string()))?;

        // 4. 单事务写入
        self.tariff_repo.insert_batch(&records)?;
        for record in &records {
            summary.count(record);
        }
        summary.elapsed_ms = started.elapsed().as_millis();

        info!(
            batch_id = %summary.batch_id,
            total = summary.total(),
            zip3 = summary.zip3_count,
            service_area = summary.service_area_count,
            item_rate = summary.item_rate_count,
            linehaul = summary.linehaul_count,
            "运价导入完成"
        );
        Ok(summary)
    }
}

// ==========================================
// 字段映射
// ==========================================

fn map_row(kind: TariffSheetKind, row: &RawRow) -> ImportResult<TariffRateRecord> {
    let record = match kind {
        TariffSheetKind::Zip3 => {
            let zip3 = required(row, "zip3")?;
            if zip3.len() != 3 || !zip3.chars().all(|c| c.is_ascii_digit()) {
                return Err(ImportError::TypeConversionError {
                    row: row.row,
                    field: "zip3".to_string(),
                    message: format!("需为 3 位数字: {}", zip3),
                });
            }
            TariffRateRecord::Zip3(Zip3Record {
                zip3: zip3.to_string(),
                basepoint_city: row.get("basepoint_city").unwrap_or("").to_string(),
                state: row.get("state").unwrap_or("").to_uppercase(),
                service_area: required(row, "service_area")?.to_string(),
                rate_area: row.get("rate_area").unwrap_or("").to_string(),
                region: row.get("region").unwrap_or("").to_string(),
            })
        }
        TariffSheetKind::ServiceArea => TariffRateRecord::ServiceArea(ServiceAreaRate {
            service_area: required(row, "service_area")?.to_string(),
            name: row.get("name").unwrap_or("").to_string(),
            services_schedule: int(row, "services_schedule")? as i32,
            linehaul_factor: Cents(int(row, "linehaul_factor")?),
            service_charge_cents: Cents(int(row, "service_charge_cents")?),
            sit_185a_rate_cents: Cents(int(row, "sit_185a_rate_cents")?),
            sit_185b_rate_cents: Cents(int(row, "sit_185b_rate_cents")?),
            sit_pd_schedule: int(row, "sit_pd_schedule")? as i32,
            weight_lbs_lower: Pound(int_or(row, "weight_lbs_lower", 0)?),
            weight_lbs_upper: Pound(int_or(row, "weight_lbs_upper", i64::MAX)?),
            window: window(row)?,
        }),
        TariffSheetKind::ItemRate => TariffRateRecord::Item(ItemRate {
            code: required(row, "code")?.to_uppercase(),
            schedule: optional_int(row, "schedule")?.map(|s| s as i32),
            weight_lbs_lower: Pound(int_or(row, "weight_lbs_lower", 0)?),
            weight_lbs_upper: Pound(int_or(row, "weight_lbs_upper", i64::MAX)?),
            rate_cents: Cents(int(row, "rate_cents")?),
            window: window(row)?,
        }),
        TariffSheetKind::Linehaul => TariffRateRecord::Linehaul(LinehaulRate {
            distance_miles_lower: Miles(int(row, "distance_miles_lower")?),
            distance_miles_upper: Miles(int(row, "distance_miles_upper")?),
            weight_lbs_lower: Pound(int(row, "weight_lbs_lower")?),
            weight_lbs_upper: Pound(int(row, "weight_lbs_upper")?),
            rate_cents: Cents(int(row, "rate_cents")?),
            window: window(row)?,
        }),
    };
    Ok(record)
}

fn required<'a>(row: &'a RawRow, field: &str) -> ImportResult<&'a str> {
    row.get(field).ok_or_else(|| ImportError::MissingField {
        row: row.row,
        field: field.to_string(),
    })
}

/// 整数解析；兼容 Excel 数值单元格的 "2275.0" 写法
fn optional_int(row: &RawRow, field: &str) -> ImportResult<Option<i64>> {
    let raw = match row.get(field) {
        Some(v) => v,
        None => return Ok(None),
    };
    let cleaned = raw.replace(',', "");
    if let Ok(v) = cleaned.parse::<i64>() {
        return Ok(Some(v));
    }
    match cleaned.parse::<f64>() {
        Ok(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(Some(f as i64)),
        _ => Err(ImportError::TypeConversionError {
            row: row.row,
            field: field.to_string(),
            message: format!("不是整数: {}", raw),
        }),
    }
}

fn int(row: &RawRow, field: &str) -> ImportResult<i64> {
    optional_int(row, field)?.ok_or_else(|| ImportError::MissingField {
        row: row.row,
        field: field.to_string(),
    })
}

fn int_or(row: &RawRow, field: &str, default: i64) -> ImportResult<i64> {
    Ok(optional_int(row, field)?.unwrap_or(default))
}

fn date(row: &RawRow, field: &str) -> ImportResult<NaiveDate> {
    let raw = required(row, field)?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y%m%d"))
        .map_err(|_| ImportError::DateFormatError {
            row: row.row,
            field: field.to_string(),
            value: raw.to_string(),
        })
}

fn window(row: &RawRow) -> ImportResult<EffectiveWindow> {
    Ok(EffectiveWindow::new(
        date(row, "effective_date_lower")?,
        date(row, "effective_date_upper")?,
    ))
}
