use std::fs;
use std::path::Path;

use serde_json::Value;
use skugen::{ColumnSet, RowBatch};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::cli::ExportFormat;
use crate::error::CliError;

/// Widest a preview cell may get before it is cut with an ellipsis.
const MAX_CELL_WIDTH: usize = 24;

/// Plain text table of the first `limit` rows, with a trailer when rows were left out.
pub fn render_preview(batch: &RowBatch, limit: usize) -> String {
    let columns = batch.columns();
    let shown: Vec<Vec<String>> = batch
        .iter()
        .take(limit)
        .map(|row| {
            columns
                .iter()
                .map(|c| clip(row.get(c).unwrap_or_default()))
                .collect()
        })
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, label)| {
            shown
                .iter()
                .map(|cells| cells[i].width())
                .chain(std::iter::once(clip(label).width()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    let header: Vec<String> = columns.iter().map(|c| clip(c)).collect();
    push_line(&mut out, &header, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_line(&mut out, &rule, &widths);
    for cells in &shown {
        push_line(&mut out, cells, &widths);
    }
    if batch.len() > shown.len() {
        out.push_str(&format!("... {} more rows\n", batch.len() - shown.len()));
    }
    out
}

fn push_line(out: &mut String, cells: &[String], widths: &[usize]) {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell}{}", " ".repeat(width - cell.width())))
        .collect();
    out.push_str(padded.join("  ").trim_end());
    out.push('\n');
}

fn clip(cell: &str) -> String {
    if cell.width() <= MAX_CELL_WIDTH {
        return cell.to_string();
    }
    let mut clipped = String::new();
    let mut width = 0;
    for ch in cell.chars() {
        let w = ch.width().unwrap_or(0);
        if width + w > MAX_CELL_WIDTH - 1 {
            break;
        }
        clipped.push(ch);
        width += w;
    }
    clipped.push('…');
    clipped
}

/// `explicit` wins; otherwise a `.json` extension selects JSON and anything else CSV.
pub fn export_format(path: &Path, explicit: Option<ExportFormat>) -> ExportFormat {
    explicit.unwrap_or_else(|| {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ExportFormat::Json,
            _ => ExportFormat::Csv,
        }
    })
}

pub fn encode(batch: &RowBatch, format: ExportFormat) -> Result<String, CliError> {
    Ok(match format {
        ExportFormat::Csv => batch.to_csv(),
        ExportFormat::Json => serde_json::to_string_pretty(batch)? + "\n",
    })
}

pub fn write_export(batch: &RowBatch, path: &Path, format: ExportFormat) -> Result<(), CliError> {
    fs::write(path, encode(batch, format)?)?;
    tracing::debug!(path = %path.display(), rows = batch.len(), "exported rows");
    Ok(())
}

/// A previously exported JSON table. Its first row fixes the column order.
pub fn load_seed(path: &Path) -> Result<RowBatch, CliError> {
    let text = fs::read_to_string(path)?;
    let values: Vec<Value> = serde_json::from_str(&text).map_err(|e| {
        CliError::Input(format!(
            "{} is not a JSON array of rows: {e}",
            path.display()
        ))
    })?;

    let Some(Value::Object(first)) = values.first() else {
        return Err(CliError::Input(format!(
            "{} must contain at least one row object",
            path.display()
        )));
    };
    let columns = ColumnSet::new(first.keys())
        .map_err(|e| CliError::Input(format!("{}: {}", path.display(), e.message)))?;

    skugen::into_row_batch(values, &columns)
        .map_err(|e| CliError::Input(format!("{}: {}", path.display(), e.message)))
}

/// One label per line, blank lines ignored.
pub fn load_columns(path: &Path) -> Result<Vec<String>, CliError> {
    let text = fs::read_to_string(path)?;
    let columns = ColumnSet::from_lines(&text)?;
    Ok(columns.into())
}
