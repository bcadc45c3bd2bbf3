//! Reading the first worksheet of an Excel or OpenDocument workbook.
//!
//! The first row is the header. Each column gets a single dtype from the
//! cells below it: `Int64` when every filled cell is a whole number,
//! `Float64` when every filled cell is numeric, `Boolean` when every filled
//! cell is a boolean, `String` otherwise. Empty and error cells are nulls.

use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};
use polars::prelude::*;
use tracing::debug;

use crate::error::{DataError, Result};

/// Largest magnitude below which an `f64` holds every whole number exactly.
const EXACT_INTEGER_LIMIT: f64 = 9_007_199_254_740_992.0;

pub(crate) fn read_first_sheet(path: &Path) -> Result<DataFrame> {
    let mut workbook = open_workbook_auto(path).map_err(|err| spreadsheet_error(path, err))?;
    let sheet = workbook
        .sheet_names()
        .into_iter()
        .next()
        .ok_or_else(|| DataError::Spreadsheet(format!("{} has no sheets", path.display())))?;
    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|err| spreadsheet_error(path, err))?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Err(DataError::Spreadsheet(format!(
            "sheet '{sheet}' of {} is empty",
            path.display()
        )));
    };
    let body: Vec<&[Data]> = rows.collect();

    let columns: Vec<Column> = header
        .iter()
        .enumerate()
        .map(|(j, cell)| {
            let name = match cell {
                Data::Empty => format!("column_{}", j + 1),
                other => other.to_string(),
            };
            let cells: Vec<Option<&Data>> = body
                .iter()
                .map(|row| row.get(j).filter(|cell| !is_blank(cell)))
                .collect();
            typed_column(name, &cells)
        })
        .collect();

    debug!(
        sheet = %sheet,
        rows = body.len(),
        columns = columns.len(),
        "Read worksheet"
    );
    Ok(DataFrame::new(columns)?)
}

fn spreadsheet_error(path: &Path, err: calamine::Error) -> DataError {
    DataError::Spreadsheet(format!("{}: {err}", path.display()))
}

fn is_blank(cell: &Data) -> bool {
    matches!(cell, Data::Empty | Data::Error(_))
}

fn as_integer(cell: &Data) -> Option<i64> {
    match cell {
        Data::Int(v) => Some(*v),
        Data::Float(v) if v.fract() == 0.0 && v.abs() < EXACT_INTEGER_LIMIT => Some(*v as i64),
        _ => None,
    }
}

fn as_float(cell: &Data) -> Option<f64> {
    match cell {
        Data::Int(v) => Some(*v as f64),
        Data::Float(v) => Some(*v),
        _ => None,
    }
}

fn as_bool(cell: &Data) -> Option<bool> {
    match cell {
        Data::Bool(v) => Some(*v),
        _ => None,
    }
}

fn typed_column(name: String, cells: &[Option<&Data>]) -> Column {
    let name = PlSmallStr::from(name);
    let filled: Vec<&Data> = cells.iter().flatten().copied().collect();
    let all =
        |convert: fn(&Data) -> bool| !filled.is_empty() && filled.iter().all(|c| convert(c));

    if all(|c| as_integer(c).is_some()) {
        let values: Vec<Option<i64>> = cells.iter().map(|c| c.and_then(as_integer)).collect();
        Column::new(name, values)
    } else if all(|c| as_float(c).is_some()) {
        let values: Vec<Option<f64>> = cells.iter().map(|c| c.and_then(as_float)).collect();
        Column::new(name, values)
    } else if all(|c| as_bool(c).is_some()) {
        let values: Vec<Option<bool>> = cells.iter().map(|c| c.and_then(as_bool)).collect();
        Column::new(name, values)
    } else {
        let values: Vec<Option<String>> = cells
            .iter()
            .map(|c| c.map(|cell| cell.to_string()))
            .collect();
        Column::new(name, values)
    }
}
