//! JSON export of detail records

use crate::state::{pending_items, DetailRecord, LinkRecord, ProgressState, FIELD_ERROR};
use crate::storage::{write_json_atomic, StorageResult};
use std::collections::BTreeMap;
use std::path::Path;

/// Records to export, ordered by sequence number
///
/// Completed details come from the progress state. When the link list is
/// known, links whose last attempt failed are added as records carrying only
/// the listing fields and an error marker, so gaps stay visible in exports.
pub fn collect_export_records(
    links: Option<&[LinkRecord]>,
    state: &ProgressState,
) -> Vec<DetailRecord> {
    let mut records = state.details.clone();

    if let Some(links) = links {
        for item in pending_items(links, state) {
            if let Some(error) = state.failed.get(&item.link.id) {
                let mut marker = BTreeMap::new();
                marker.insert(FIELD_ERROR.to_string(), error.clone());
                records.push(DetailRecord::merge(item.position, &item.link, marker));
            }
        }
    }

    records.sort_by_key(|record| record.sequence);
    records
}

/// Writes `records` as a pretty JSON array
pub fn export_details_json(path: &Path, records: &[DetailRecord]) -> StorageResult<()> {
    write_json_atomic(path, records)?;
    tracing::info!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}
