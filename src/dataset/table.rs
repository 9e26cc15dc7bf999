//! Row access over CSV and Excel files
//!
//! Both formats are exposed as a header plus a lazy iterator of string rows,
//! so inspection can stop after a sample while analysis scans everything.

use std::collections::HashSet;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};

use crate::dataset::ParseError;
use crate::storage::validator::extension_of;

pub type RowIter = Box<dyn Iterator<Item = Result<Vec<String>, ParseError>> + Send>;

/// An opened dataset
pub struct Table {
    pub headers: Vec<String>,
    pub rows: RowIter,
}

impl Table {
    pub fn column_index(&self, name: &str) -> Result<usize, ParseError> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| ParseError::UnknownColumn {
                column: name.to_string(),
                available: self.headers.join(", "),
            })
    }
}

/// Open a dataset by extension
pub fn open_table(path: &Path) -> Result<Table, ParseError> {
    let name = path.to_string_lossy();
    let extension = extension_of(&name).unwrap_or_default();
    let table = match extension.as_str() {
        "csv" => open_csv(path)?,
        "xlsx" | "xls" => open_excel(path)?,
        other => return Err(ParseError::Unsupported(other.to_string())),
    };
    check_headers(&table.headers)?;
    Ok(table)
}

fn open_csv(path: &Path) -> Result<Table, ParseError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .trim(csv::Trim::Headers)
        .from_path(path)?;

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let rows = reader
        .into_records()
        .map(|record| {
            record
                .map(|r| r.iter().map(str::to_string).collect())
                .map_err(ParseError::from)
        });

    Ok(Table {
        headers,
        rows: Box::new(rows),
    })
}

fn open_excel(path: &Path) -> Result<Table, ParseError> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ParseError::Excel("workbook has no worksheets".to_string()))??;

    // calamine materializes the whole sheet anyway
    let mut rows = range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect::<Vec<String>>());
    let headers = rows
        .next()
        .map(|h| h.into_iter().map(|c| c.trim().to_string()).collect())
        .unwrap_or_default();
    let body: Vec<Result<Vec<String>, ParseError>> = rows.map(Ok).collect();

    Ok(Table {
        headers,
        rows: Box::new(body.into_iter()),
    })
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn check_headers(headers: &[String]) -> Result<(), ParseError> {
    if headers.is_empty() {
        return Err(ParseError::NoHeader);
    }
    if headers.iter().all(|h| h.is_empty()) {
        return Err(ParseError::NoColumns);
    }

    let mut seen = HashSet::new();
    for (i, header) in headers.iter().enumerate() {
        if header.is_empty() {
            return Err(ParseError::BlankHeader(i));
        }
        if !seen.insert(header.as_str()) {
            return Err(ParseError::DuplicateHeader(header.clone()));
        }
    }
    Ok(())
}
