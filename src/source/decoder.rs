//! 发票文件解码: 表格字节流 -> 原始记录

use calamine::{Data, Reader};
use serde_json::{Number, Value};
use std::io::Cursor;

use crate::error::DecodeError;
use crate::models::RawRecord;

/// 支持的上传格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceFormat {
    Csv,
    Json,
    /// xlsx / xls / xlsb / ods, 只读第一个工作表
    Spreadsheet,
}

impl InvoiceFormat {
    /// 先看扩展名, 再看 MIME 类型, 都没有时按 CSV 处理
    pub fn detect(file_name: Option<&str>, content_type: Option<&str>) -> Result<Self, DecodeError> {
        if let Some(ext) = file_name.and_then(|name| name.rsplit_once('.')).map(|(_, ext)| ext) {
            return match ext.to_ascii_lowercase().as_str() {
                "csv" | "txt" => Ok(InvoiceFormat::Csv),
                "json" => Ok(InvoiceFormat::Json),
                "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Ok(InvoiceFormat::Spreadsheet),
                other => Err(DecodeError::UnsupportedFormat(format!(".{other}"))),
            };
        }
        match content_type.map(|ct| ct.split(';').next().unwrap_or(ct).trim()) {
            Some("text/csv") | Some("text/plain") => Ok(InvoiceFormat::Csv),
            Some("application/json") => Ok(InvoiceFormat::Json),
            Some("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet")
            | Some("application/vnd.ms-excel")
            | Some("application/vnd.oasis.opendocument.spreadsheet") => {
                Ok(InvoiceFormat::Spreadsheet)
            }
            Some("application/octet-stream") | None => Ok(InvoiceFormat::Csv),
            Some(other) => Err(DecodeError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// 解码整个文件; 只有文件整体不可读时才失败
pub fn decode_invoice(bytes: &[u8], format: InvoiceFormat) -> Result<Vec<RawRecord>, DecodeError> {
    let rows = match format {
        InvoiceFormat::Csv => decode_csv(bytes)?,
        InvoiceFormat::Json => decode_json(bytes)?,
        InvoiceFormat::Spreadsheet => decode_spreadsheet(bytes)?,
    };
    tracing::debug!("Decoded {} invoice rows ({:?})", rows.len(), format);
    Ok(rows)
}

/// 首行为表头, 每个后续行按表头生成一条记录
fn decode_csv(bytes: &[u8]) -> Result<Vec<RawRecord>, DecodeError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(bytes);
    let headers = reader.headers()?.clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: RawRecord = headers
            .iter()
            .zip(record.iter())
            .filter(|(header, _)| !header.is_empty())
            .map(|(header, field)| (header.to_string(), Value::String(field.to_string())))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

/// JSON 数组; 非对象元素变成空记录 (之后因无药品名称被丢弃)
fn decode_json(bytes: &[u8]) -> Result<Vec<RawRecord>, DecodeError> {
    match serde_json::from_slice::<Value>(bytes)? {
        Value::Array(items) => Ok(items.into_iter().map(into_record).collect()),
        _ => Err(DecodeError::NotAnArray),
    }
}

/// 第一个工作表: 首行为表头, 空单元格记为空字符串, 整行为空的跳过
fn decode_spreadsheet(bytes: &[u8]) -> Result<Vec<RawRecord>, DecodeError> {
    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(DecodeError::EmptyWorkbook)??;

    let mut sheet_rows = range.rows();
    let headers: Vec<String> = match sheet_rows.next() {
        Some(header) => header.iter().map(|cell| cell.to_string().trim().to_string()).collect(),
        None => return Ok(Vec::new()),
    };

    let mut rows = Vec::new();
    for cells in sheet_rows {
        if cells.iter().all(|cell| matches!(cell, Data::Empty)) {
            continue;
        }
        let row: RawRecord = headers
            .iter()
            .enumerate()
            .filter(|(_, header)| !header.is_empty())
            .map(|(col, header)| {
                let value = cells.get(col).map(cell_value).unwrap_or_else(|| Value::String(String::new()));
                (header.clone(), value)
            })
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::String(String::new()),
        Data::Int(i) => Value::Number((*i).into()),
        Data::Float(f) => Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(f.to_string())),
        Data::Bool(b) => Value::Bool(*b),
        Data::String(s) => Value::String(s.clone()),
        other => Value::String(other.to_string()),
    }
}

pub(crate) fn into_record(value: Value) -> RawRecord {
    match value {
        Value::Object(map) => map,
        _ => RawRecord::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_format() {
        assert_eq!(
            InvoiceFormat::detect(Some("invoice.CSV"), None).unwrap(),
            InvoiceFormat::Csv
        );
        assert_eq!(
            InvoiceFormat::detect(None, Some("application/json; charset=utf-8")).unwrap(),
            InvoiceFormat::Json
        );
        assert_eq!(InvoiceFormat::detect(None, None).unwrap(), InvoiceFormat::Csv);
        assert_eq!(
            InvoiceFormat::detect(Some("invoice.XLSX"), None).unwrap(),
            InvoiceFormat::Spreadsheet
        );
        assert_eq!(
            InvoiceFormat::detect(
                None,
                Some("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet")
            )
            .unwrap(),
            InvoiceFormat::Spreadsheet
        );
        assert!(matches!(
            InvoiceFormat::detect(Some("invoice.pdf"), None),
            Err(DecodeError::UnsupportedFormat(_))
        ));
    }

    fn workbook_bytes() -> Vec<u8> {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, " Drug Name ").unwrap();
        sheet.write_string(0, 1, "Unit Price").unwrap();
        sheet.write_string(0, 2, "Strength").unwrap();
        sheet.write_string(1, 0, "Aspirin").unwrap();
        sheet.write_number(1, 1, 12.5).unwrap();
        sheet.write_string(1, 2, "500mg").unwrap();
        // 第 2 行整行为空
        sheet.write_string(3, 0, "Ibuprofen").unwrap();
        sheet.write_number(3, 1, 8).unwrap();
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn test_decode_spreadsheet_first_sheet() {
        let rows = decode_invoice(&workbook_bytes(), InvoiceFormat::Spreadsheet).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["Drug Name"], "Aspirin");
        assert_eq!(rows[0]["Unit Price"], 12.5);
        assert_eq!(rows[0]["Strength"], "500mg");
        assert_eq!(rows[1]["Drug Name"], "Ibuprofen");
        assert_eq!(rows[1]["Unit Price"].as_f64(), Some(8.0));
        assert_eq!(rows[1]["Strength"], "");
    }

    #[test]
    fn test_decode_spreadsheet_rejects_garbage() {
        assert!(matches!(
            decode_invoice(b"PK not a workbook", InvoiceFormat::Spreadsheet),
            Err(DecodeError::Spreadsheet(_))
        ));
    }

    #[test]
    fn test_decode_csv_uses_header_keys() {
        let data = "Drug Name, Unit Price ,formulation\nAspirin,12,tablet\nIbuprofen,8\n";
        let rows = decode_invoice(data.as_bytes(), InvoiceFormat::Csv).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["Drug Name"], "Aspirin");
        assert_eq!(rows[0]["Unit Price"], "12");
        assert_eq!(rows[0]["formulation"], "tablet");
        // 短行不报错
        assert!(rows[1].get("formulation").is_none());
    }

    #[test]
    fn test_decode_csv_rejects_invalid_utf8() {
        let data: &[u8] = b"drug_name,unit_price\n\xff\xfe,1\n";
        assert!(matches!(
            decode_invoice(data, InvoiceFormat::Csv),
            Err(DecodeError::Csv(_))
        ));
    }

    #[test]
    fn test_decode_json_array() {
        let data = r#"[{"drug_name": "Aspirin", "unit_price": 12}, 42]"#;
        let rows = decode_invoice(data.as_bytes(), InvoiceFormat::Json).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["unit_price"], 12);
        assert!(rows[1].is_empty());
    }

    #[test]
    fn test_decode_json_requires_array() {
        assert!(matches!(
            decode_invoice(br#"{"drug_name": "Aspirin"}"#, InvoiceFormat::Json),
            Err(DecodeError::NotAnArray)
        ));
        assert!(matches!(
            decode_invoice(b"not json", InvoiceFormat::Json),
            Err(DecodeError::Json(_))
        ));
    }
}
