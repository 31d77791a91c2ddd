// ==========================================
// 家庭物品搬迁核心 - 文件解析器实现
// ==========================================
// 支持: Excel (.xlsx/.xls，每个工作表一张运价表) / CSV (.csv，单表)
// 表头规范化: 去空白、小写、空格转下划线
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, Reader};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

/// 原始数据行（row 为文件中的行号，表头为第 1 行）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub row: usize,
    pub fields: HashMap<String, String>,
}

impl RawRow {
    /// 取字段值（空字符串视为缺失）
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .get(field)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

/// 文件解析器
pub trait FileParser {
    fn parse_to_raw_rows(&self, file_path: &Path) -> ImportResult<Vec<RawRow>>;
}

pub fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase().replace([' ', '-'], "_")
}

fn check_exists(path: &Path) -> ImportResult<()> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    Ok(())
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// 按表头组装一行；整行空白返回 None
fn build_row(row: usize, headers: &[String], values: impl Iterator<Item = String>) -> Option<RawRow> {
    let mut fields = HashMap::new();
    for (col_idx, value) in values.enumerate() {
        if let Some(header) = headers.get(col_idx) {
            fields.insert(header.clone(), value.trim().to_string());
        }
    }

    if fields.values().all(|v| v.is_empty()) {
        return None;
    }
    Some(RawRow { row, fields })
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse_to_raw_rows(&self, file_path: &Path) -> ImportResult<Vec<RawRow>> {
        check_exists(file_path)?;
        let ext = extension(file_path);
        if ext != "csv" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let file = File::open(file_path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        let headers: Vec<String> = reader.headers()?.iter().map(normalize_header).collect();

        let mut rows = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let record = result?;
            // 表头占第 1 行
            if let Some(row) = build_row(idx + 2, &headers, record.iter().map(str::to_string)) {
                rows.push(row);
            }
        }

        Ok(rows)
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl ExcelParser {
    /// 解析全部工作表
    ///
    /// # 返回
    /// - Vec<(工作表名, 数据行)>，按工作簿内顺序
    pub fn parse_sheets(&self, file_path: &Path) -> ImportResult<Vec<(String, Vec<RawRow>)>> {
        check_exists(file_path)?;
        let ext = extension(file_path);
        if ext != "xlsx" && ext != "xls" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let mut workbook = open_workbook_auto(file_path)?;
        let sheet_names = workbook.sheet_names().to_vec();
        if sheet_names.is_empty() {
            return Err(ImportError::ExcelParseError("Excel 文件无工作表".to_string()));
        }

        let mut sheets = Vec::with_capacity(sheet_names.len());
        for sheet_name in sheet_names {
            let range = workbook.worksheet_range(&sheet_name)?;
            let mut cells = range.rows();

            // 空工作表跳过
            let header_row = match cells.next() {
                Some(r) => r,
                None => continue,
            };
            let headers: Vec<String> = header_row
                .iter()
                .map(|cell| normalize_header(&cell.to_string()))
                .collect();

            let rows: Vec<RawRow> = cells
                .enumerate()
                .filter_map(|(idx, data_row)| {
                    build_row(idx + 2, &headers, data_row.iter().map(|c| c.to_string()))
                })
                .collect();
            sheets.push((sheet_name, rows));
        }

        Ok(sheets)
    }
}

impl FileParser for ExcelParser {
    /// 只读第一个工作表
    fn parse_to_raw_rows(&self, file_path: &Path) -> ImportResult<Vec<RawRow>> {
        self.parse_sheets(file_path)?
            .into_iter()
            .next()
            .map(|(_, rows)| rows)
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无数据".to_string()))
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    pub fn parse<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<Vec<RawRow>> {
        let path = file_path.as_ref();
        match extension(path).as_str() {
            "csv" => CsvParser.parse_to_raw_rows(path),
            "xlsx" | "xls" => ExcelParser.parse_to_raw_rows(path),
            other => Err(ImportError::UnsupportedFormat(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn csv_file(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut temp_file = Builder::new().suffix(".csv").tempfile().unwrap();
        for line in lines {
            writeln!(temp_file, "{}", line).unwrap();
        }
        temp_file
    }

    #[test]
    fn test_csv_parser_normalizes_headers() {
        let temp_file = csv_file(&["Zip3, Service Area ,State", "395,296,MS", "336,500,FL"]);

        let rows = CsvParser.parse_to_raw_rows(temp_file.path()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row, 2);
        assert_eq!(rows[0].get("zip3"), Some("395"));
        assert_eq!(rows[1].get("service_area"), Some("500"));
    }

    #[test]
    fn test_csv_parser_file_not_found() {
        let result = CsvParser.parse_to_raw_rows(Path::new("non_existent.csv"));
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }

    #[test]
    fn test_csv_parser_skip_empty_rows() {
        let temp_file = csv_file(&["zip3,service_area", "395,296", ",", "336,500"]);

        let rows = CsvParser.parse_to_raw_rows(temp_file.path()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].row, 4);
    }

    #[test]
    fn test_universal_parser_rejects_unknown_extension() {
        let temp_file = Builder::new().suffix(".txt").tempfile().unwrap();
        assert!(matches!(
            UniversalFileParser.parse(temp_file.path()),
            Err(ImportError::UnsupportedFormat(_))
        ));
    }
}
