use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use csv::WriterBuilder;
use tracing::info;

use crate::models::{Report, ReportNote};

const EXPORT_HEADER: [&str; 11] = [
    "reference",
    "date",
    "categorie",
    "statut",
    "auteur",
    "ville",
    "province",
    "region",
    "assigne_a",
    "description",
    "note",
];

/// Writes reports, in the given order, to a CSV file at `path`.
pub fn write_reports_csv(
    reports: &[Report],
    notes: &HashMap<i64, ReportNote>,
    path: &Path,
) -> Result<usize> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create export dir {:?}", parent))?;
        }
    }

    let mut writer = WriterBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("failed to create export CSV {:?}", path))?;
    writer
        .write_record(EXPORT_HEADER)
        .context("failed to write export CSV header")?;

    for report in reports {
        let date = report
            .created_at()
            .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        let author = report.author_display();
        let note = notes
            .get(&report.id)
            .map(|note| note.memo.as_str())
            .unwrap_or("");
        writer
            .write_record([
                report.reference.as_str(),
                date.as_str(),
                report.category_label(),
                report.status.label(),
                author.as_str(),
                report.city.as_deref().unwrap_or(""),
                report.province.as_deref().unwrap_or(""),
                report.region.as_deref().unwrap_or(""),
                report.assigned_to.as_deref().unwrap_or(""),
                report.description.as_str(),
                note,
            ])
            .with_context(|| format!("failed to write export row for report {}", report.id))?;
    }
    writer.flush().context("failed to flush export CSV writer")?;

    info!(count = reports.len(), path = %path.display(), "reports exported");
    Ok(reports.len())
}
