//! Bulk case import from a spreadsheet.
//!
//! The first worksheet is read whole, its header row is matched against the
//! required column names, and every following row becomes a [`CaseDraft`].
//! Rows are persisted one at a time; a failing row is reported and skipped.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, DataType, Reader};
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use thiserror::Error;

use crate::cases::CaseDraft;
use crate::error::AppError;

pub const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "ods"];

pub const COLUMN_RIT: &str = "RIT";
pub const COLUMN_REPRESENTADO: &str = "Representado";
pub const COLUMN_TRIBUNAL: &str = "Tribunal";
pub const COLUMN_ABOGADO: &str = "Abogado responsable";
pub const COLUMN_FECHA_INGRESO: &str = "Fecha ingreso";

pub const REQUIRED_COLUMNS: [&str; 5] = [
    COLUMN_RIT,
    COLUMN_REPRESENTADO,
    COLUMN_TRIBUNAL,
    COLUMN_ABOGADO,
    COLUMN_FECHA_INGRESO,
];

const TEXT_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%Y/%m/%d"];

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("file must be a spreadsheet (.xlsx, .xlsm, .xls or .ods)")]
    UnsupportedExtension,
    #[error("could not read spreadsheet: {0}")]
    Unreadable(String),
    #[error("spreadsheet has no worksheets")]
    NoWorksheet,
    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

impl From<ImportError> for AppError {
    fn from(value: ImportError) -> Self {
        AppError::bad_request(value.to_string())
    }
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct ImportSummary {
    pub creadas: usize,
    pub errores: Vec<String>,
}

impl ImportSummary {
    pub fn is_clean(&self) -> bool {
        self.errores.is_empty()
    }
}

pub fn ensure_spreadsheet_name(filename: &str) -> Result<(), ImportError> {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .ok_or(ImportError::UnsupportedExtension)?;
    if SPREADSHEET_EXTENSIONS.contains(&extension.as_str()) {
        Ok(())
    } else {
        Err(ImportError::UnsupportedExtension)
    }
}

/// Header-validated contents of the first worksheet.
#[derive(Debug)]
pub struct CaseSheet {
    columns: [usize; 5],
    rows: Vec<Vec<Data>>,
    /// Zero-based sheet row holding the header.
    header_row: usize,
}

impl CaseSheet {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ImportError> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
            .map_err(|err| ImportError::Unreadable(err.to_string()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or(ImportError::NoWorksheet)?
            .map_err(|err| ImportError::Unreadable(err.to_string()))?;
        // The range starts at the first non-empty cell, not at A1.
        let header_row = range.start().map_or(0, |(row, _)| row as usize);
        Self::from_rows_at(range.rows().map(|row| row.to_vec()).collect(), header_row)
    }

    pub fn from_rows(rows: Vec<Vec<Data>>) -> Result<Self, ImportError> {
        Self::from_rows_at(rows, 0)
    }

    fn from_rows_at(mut rows: Vec<Vec<Data>>, header_row: usize) -> Result<Self, ImportError> {
        let header: Vec<String> = if rows.is_empty() {
            Vec::new()
        } else {
            rows.remove(0)
                .iter()
                .map(|cell| cell_text(cell).unwrap_or_default())
                .collect()
        };

        let mut columns = [0usize; 5];
        let mut missing = Vec::new();
        for (slot, name) in REQUIRED_COLUMNS.iter().enumerate() {
            match header.iter().position(|title| title == name) {
                Some(index) => columns[slot] = index,
                None => missing.push(name.to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(ImportError::MissingColumns(missing));
        }

        Ok(Self {
            columns,
            rows,
            header_row,
        })
    }

    /// Data rows with their user-visible sheet row number, counted from 1.
    /// Entirely blank rows are skipped.
    pub fn drafts(&self) -> impl Iterator<Item = (usize, Result<CaseDraft, String>)> + '_ {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.iter().any(|cell| cell_text(cell).is_some()))
            .map(|(index, row)| (self.header_row + index + 2, self.draft_from_row(row)))
    }

    fn draft_from_row(&self, row: &[Data]) -> Result<CaseDraft, String> {
        let [rit, representado, tribunal, abogado, fecha] = self.columns;
        let text = |index: usize, name: &str| -> Result<String, String> {
            row.get(index)
                .and_then(cell_text)
                .ok_or_else(|| format!("columna {name} vacía"))
        };

        Ok(CaseDraft {
            rit: text(rit, COLUMN_RIT)?,
            representado: text(representado, COLUMN_REPRESENTADO)?,
            tribunal: text(tribunal, COLUMN_TRIBUNAL)?,
            abogado_responsable: text(abogado, COLUMN_ABOGADO)?,
            fecha_ingreso: cell_date(row.get(fecha).unwrap_or(&Data::Empty))?,
        })
    }
}

/// Folds the sheet's rows through `persist`, collecting one error per failed
/// row instead of stopping.
pub fn import_rows<F>(sheet: &CaseSheet, mut persist: F) -> ImportSummary
where
    F: FnMut(&CaseDraft) -> Result<(), String>,
{
    sheet
        .drafts()
        .fold(ImportSummary::default(), |mut summary, (row_number, draft)| {
            match draft.and_then(|draft| persist(&draft)) {
                Ok(()) => summary.creadas += 1,
                Err(err) => summary.errores.push(format!("Fila {row_number}: {err}")),
            }
            summary
        })
}

fn cell_text(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::Empty | Data::Error(_) => return None,
        Data::String(value) => value.trim().to_string(),
        Data::Float(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
            format!("{}", *value as i64)
        }
        other => other.to_string().trim().to_string(),
    };
    (!text.is_empty()).then_some(text)
}

fn cell_date(cell: &Data) -> Result<NaiveDate, String> {
    match cell {
        Data::Empty => Err(format!("columna {COLUMN_FECHA_INGRESO} vacía")),
        Data::String(value) => parse_text_date(value),
        Data::Int(serial) => excel_serial_date(*serial as f64),
        Data::Float(serial) => excel_serial_date(*serial),
        other => other
            .as_date()
            .ok_or_else(|| format!("fecha inválida `{other}`")),
    }
}

fn parse_text_date(value: &str) -> Result<NaiveDate, String> {
    let trimmed = value.trim();
    let date_part = trimmed
        .split(|ch: char| ch == 'T' || ch.is_whitespace())
        .next()
        .unwrap_or(trimmed);
    TEXT_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date_part, format).ok())
        .ok_or_else(|| format!("fecha inválida `{trimmed}`"))
}

/// Spreadsheet serial day numbers count from 1899-12-30.
fn excel_serial_date(serial: f64) -> Result<NaiveDate, String> {
    if !serial.is_finite() || serial < 1.0 {
        return Err(format!("número de fecha inválido `{serial}`"));
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|epoch| epoch.checked_add_signed(Duration::days(serial.floor() as i64)))
        .ok_or_else(|| format!("número de fecha inválido `{serial}`"))
}
