//! CSV and spreadsheet rendering of list exports.

use axum::{
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_xlsxwriter::Workbook;

use crate::errors::ServiceError;

pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Excel,
}

impl ExportFormat {
    /// `export=csv|excel`; anything else is not an export request.
    pub fn from_param(raw: &str) -> Option<Self> {
        match raw {
            "csv" => Some(Self::Csv),
            "excel" => Some(Self::Excel),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Excel => "xlsx",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Csv => CSV_CONTENT_TYPE,
            Self::Excel => XLSX_CONTENT_TYPE,
        }
    }
}

/// A fully rendered export, ready to be sent as an attachment.
#[derive(Debug)]
pub struct ExportFile {
    pub format: ExportFormat,
    pub filename: String,
    pub body: Vec<u8>,
}

impl ExportFile {
    pub fn render(
        format: ExportFormat,
        stem: &str,
        headers: &[&str],
        rows: &[Vec<String>],
    ) -> Result<Self, ServiceError> {
        let body = match format {
            ExportFormat::Csv => to_csv(headers, rows)?,
            ExportFormat::Excel => to_xlsx(headers, rows)?,
        };
        Ok(Self {
            format,
            filename: format!("{}.{}", stem, format.extension()),
            body,
        })
    }
}

impl IntoResponse for ExportFile {
    fn into_response(self) -> Response {
        let disposition = HeaderValue::from_str(&format!(
            "attachment; filename=\"{}\"",
            self.filename
        ))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

        (
            [
                (
                    header::CONTENT_TYPE,
                    HeaderValue::from_static(self.format.content_type()),
                ),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            self.body,
        )
            .into_response()
    }
}

pub fn to_csv(headers: &[&str], rows: &[Vec<String>]) -> Result<Vec<u8>, ServiceError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(headers)
        .map_err(|e| ServiceError::ExportError(e.to_string()))?;
    for row in rows {
        writer
            .write_record(row)
            .map_err(|e| ServiceError::ExportError(e.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|e| ServiceError::ExportError(e.to_string()))
}

pub fn to_xlsx(headers: &[&str], rows: &[Vec<String>]) -> Result<Vec<u8>, ServiceError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    for (col, title) in headers.iter().enumerate() {
        sheet
            .write_string(0, col as u16, *title)
            .map_err(|e| ServiceError::ExportError(e.to_string()))?;
    }
    for (idx, row) in rows.iter().enumerate() {
        for (col, cell) in row.iter().enumerate() {
            sheet
                .write_string(idx as u32 + 1, col as u16, cell)
                .map_err(|e| ServiceError::ExportError(e.to_string()))?;
        }
    }

    workbook
        .save_to_buffer()
        .map_err(|e| ServiceError::ExportError(e.to_string()))
}

pub fn bool_cell(value: bool) -> String {
    if value { "True" } else { "False" }.to_string()
}

/// Two decimal places, matching the `DECIMAL(10, 2)` columns.
pub fn decimal_cell(value: Decimal) -> String {
    let mut scaled = crate::forms::round_cents(value);
    scaled.rescale(2);
    scaled.to_string()
}

pub fn date_cell(value: Option<NaiveDate>) -> String {
    value
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn csv_has_header_then_rows() {
        let rows = vec![vec![
            "TST-001".to_string(),
            "Test Name".to_string(),
            bool_cell(true),
            decimal_cell(dec!(0)),
            String::new(),
        ]];
        let body = to_csv(&["Code", "Name", "Is Active", "Output Quantity", "Notes"], &rows).unwrap();
        let text = String::from_utf8(body).unwrap();
        assert_eq!(
            text,
            "Code,Name,Is Active,Output Quantity,Notes\nTST-001,Test Name,True,0.00,\n"
        );
    }

    #[test]
    fn csv_quotes_embedded_separators() {
        let body = to_csv(&["Notes"], &[vec!["a, \"b\"".to_string()]]).unwrap();
        assert_eq!(String::from_utf8(body).unwrap(), "Notes\n\"a, \"\"b\"\"\"\n");
    }

    #[test]
    fn xlsx_is_a_zip_container() {
        let body = to_xlsx(&["Code"], &[vec!["X".to_string()]]).unwrap();
        assert_eq!(&body[..2], b"PK");
    }

    #[test]
    fn cells_format_consistently() {
        assert_eq!(decimal_cell(dec!(12.5)), "12.50");
        assert_eq!(decimal_cell(dec!(3)), "3.00");
        assert_eq!(decimal_cell(dec!(2.675)), "2.68");
        assert_eq!(bool_cell(false), "False");
        assert_eq!(date_cell(NaiveDate::from_ymd_opt(2024, 1, 5)), "2024-01-05");
        assert_eq!(date_cell(None), "");
    }

    #[test]
    fn export_file_names_and_headers() {
        let file = ExportFile::render(ExportFormat::Csv, "bom_lines", &["Unit"], &[]).unwrap();
        assert_eq!(file.filename, "bom_lines.csv");

        let response = file.into_response();
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            CSV_CONTENT_TYPE
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"bom_lines.csv\""
        );
        assert_eq!(ExportFormat::from_param("excel"), Some(ExportFormat::Excel));
        assert_eq!(ExportFormat::from_param("pdf"), None);
    }
}
