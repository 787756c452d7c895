//! Tabular export of detail records
//!
//! UTF-8 with a byte order mark so spreadsheet tools pick the right encoding.
//! Columns are the base columns, then every discovered field sorted, with the
//! error marker and the full text forced to the end.

use crate::state::{DetailRecord, BASE_COLUMNS, FIELD_ERROR, FIELD_FULL_TEXT};
use crate::storage::{write_bytes_atomic, StorageResult};
use std::collections::BTreeSet;
use std::io::{self, Write};
use std::path::Path;

const BOM: &[u8] = b"\xEF\xBB\xBF";

/// Column order for `records`
pub fn csv_columns(records: &[DetailRecord]) -> Vec<String> {
    let extras: BTreeSet<&str> = records
        .iter()
        .flat_map(|record| record.fields.keys().map(String::as_str))
        .filter(|key| !BASE_COLUMNS.contains(key))
        .collect();

    let mut columns: Vec<String> = BASE_COLUMNS.iter().map(|c| c.to_string()).collect();
    columns.extend(
        extras
            .iter()
            .filter(|key| **key != FIELD_ERROR && **key != FIELD_FULL_TEXT)
            .map(|key| key.to_string()),
    );
    for trailing in [FIELD_ERROR, FIELD_FULL_TEXT] {
        if extras.contains(trailing) {
            columns.push(trailing.to_string());
        }
    }
    columns
}

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

fn write_row<W: Write>(mut w: W, row: &[String]) -> io::Result<()> {
    let mut first = true;
    for cell in row {
        if !first {
            w.write_all(b",")?;
        } else {
            first = false;
        }
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            w.write_all(cell.as_bytes())?;
        }
    }
    w.write_all(b"\r\n")
}

/// Renders `records` as CSV bytes, header included
pub fn render_csv(records: &[DetailRecord]) -> io::Result<Vec<u8>> {
    let columns = csv_columns(records);
    let mut out = BOM.to_vec();

    write_row(&mut out, &columns)?;
    for record in records {
        let row: Vec<String> = columns
            .iter()
            .map(|column| record.column(column).unwrap_or_default())
            .collect();
        write_row(&mut out, &row)?;
    }

    Ok(out)
}

/// Writes `records` to `path`; nothing is written for an empty set
pub fn export_details_csv(path: &Path, records: &[DetailRecord]) -> StorageResult<()> {
    if records.is_empty() {
        tracing::info!("No records to export as CSV");
        return Ok(());
    }

    let bytes = render_csv(records)?;
    write_bytes_atomic(path, &bytes)?;
    tracing::info!(
        "Wrote {} records ({} columns) to {}",
        records.len(),
        csv_columns(records).len(),
        path.display()
    );
    Ok(())
}
