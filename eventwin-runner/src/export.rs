//! CSV export of the aligned close-price table.

use std::path::Path;

use anyhow::{Context, Result};
use eventwin_core::AlignedTable;

/// Serialize the aligned table as CSV: `timestamp` then one column per asset.
pub fn export_aligned_csv(table: &AlignedTable) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header = vec!["timestamp".to_string()];
    header.extend(table.labels.iter().cloned());
    wtr.write_record(&header)?;

    for (row, ts) in table.timestamps.iter().enumerate() {
        let mut record = vec![ts.to_rfc3339()];
        record.extend(table.columns.iter().map(|c| c[row].to_string()));
        wtr.write_record(&record)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Write [`export_aligned_csv`] output to `path`, creating parent directories.
pub fn write_aligned_csv(table: &AlignedTable, path: &Path) -> Result<()> {
    let csv = export_aligned_csv(table)?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    std::fs::write(path, csv).with_context(|| format!("failed to write {}", path.display()))
}
