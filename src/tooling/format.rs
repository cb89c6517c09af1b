//! Text and JSON rendering for the terminal.

use crate::error::{FsError, StorageError};
use crate::integrity::IntegrityReport;
use crate::store::{DirEntry, NodeType, TrashEntry};
use crate::trash::{RestoreOutcome, SweepReport};
use chrono::{DateTime, Utc};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde::Serialize;

/// Output format of listing commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Human-readable size: `512.0 B`, `1.5 KB`, ... up to TB
pub fn format_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if size < 1024.0 {
            return format!("{:.1} {}", size, unit);
        }
        size /= 1024.0;
    }
    format!("{:.1} TB", size)
}

pub fn format_time(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M").to_string()
}

/// Bold underlined heading
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

pub fn success(message: &str) -> String {
    format!("{} {}", "✓".green(), message)
}

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, FsError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| FsError::StorageUnavailable(StorageError::Corrupt(format!("cannot render JSON: {}", e))))
}

/// `ls`: type flag, permissions, size, modified time and name
pub fn format_listing(dir: &str, entries: &[DirEntry], format: OutputFormat) -> Result<String, FsError> {
    if format == OutputFormat::Json {
        return to_json(entries);
    }
    if entries.is_empty() {
        return Ok(format!("{}\nDirectory is empty.", dir));
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Type", "Permissions", "Size", "Modified", "Owner", "Name"]);
    for entry in entries {
        let flag = match entry.node_type {
            NodeType::Directory => "d",
            NodeType::File => "-",
        };
        table.add_row(vec![
            flag.to_string(),
            entry.permissions.clone(),
            entry.size.to_string(),
            format_time(&entry.modified_at),
            entry.owner.clone(),
            entry.name.clone(),
        ]);
    }
    Ok(format!("{}\n{}\n\nTotal items: {}", dir, table, entries.len()))
}

pub fn format_trash_list(entries: &[TrashEntry], format: OutputFormat) -> Result<String, FsError> {
    if format == OutputFormat::Json {
        let rows: Vec<serde_json::Value> = entries
            .iter()
            .map(|e| {
                serde_json::json!({
                    "id": e.id,
                    "name": e.name,
                    "type": e.kind.node_type(),
                    "original_path": e.original_path(),
                    "size": e.size(),
                    "deleted_by": e.deleted_by,
                    "deleted_at": e.deleted_at,
                    "expires_at": e.expires_at,
                })
            })
            .collect();
        return to_json(&rows);
    }
    if entries.is_empty() {
        return Ok("Trash is empty.".to_string());
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["ID", "Name", "Type", "Original Path", "Size", "Deleted", "Expires"]);
    for e in entries {
        table.add_row(vec![
            e.id.to_string(),
            e.name.clone(),
            e.kind.node_type().as_str().to_string(),
            e.original_parent_path.clone(),
            format_size(e.size()),
            format_time(&e.deleted_at),
            format_time(&e.expires_at),
        ]);
    }
    Ok(table.to_string())
}

#[derive(Debug, Serialize)]
pub struct TrashSummary<'a> {
    pub user: &'a str,
    pub items: usize,
    pub total_size: u64,
    pub retention_days: i64,
}

pub fn format_trash_info(summary: &TrashSummary<'_>, format: OutputFormat) -> Result<String, FsError> {
    if format == OutputFormat::Json {
        return to_json(summary);
    }
    Ok(format!(
        "{}\n  Items: {}\n  Total size: {}\n  User: {}\n  Retention: {} days",
        format_section_heading("Trash"),
        summary.items,
        format_size(summary.total_size),
        summary.user,
        summary.retention_days
    ))
}

/// One line per restore, naming any rename or relocation
pub fn format_restore(outcomes: &[RestoreOutcome]) -> String {
    let mut lines = vec![success(&format!("Restored {} item(s).", outcomes.len()))];
    let moved: Vec<&RestoreOutcome> = outcomes.iter().filter(|o| o.renamed || o.relocated).collect();
    if !moved.is_empty() {
        lines.push(String::new());
        lines.push("Some items were renamed or relocated due to conflicts:".to_string());
        for o in moved {
            lines.push(format!("  • {} → {}", o.original_name, o.final_path));
        }
    }
    lines.join("\n")
}

pub fn format_sweep_report(report: &SweepReport, format: OutputFormat) -> Result<String, FsError> {
    if format == OutputFormat::Json {
        return to_json(report);
    }
    if let Some(error) = &report.scan_error {
        return Ok(format!("{} sweep scan failed: {}", "✗".red(), error));
    }
    let mut out = success(&format!(
        "Purged {} expired item(s) of {} scanned.",
        report.purged, report.scanned
    ));
    if report.failed > 0 {
        out.push_str(&format!("\n  {} failed, retried next sweep", report.failed.yellow()));
    }
    if report.already_gone > 0 {
        out.push_str(&format!("\n  {} already gone", report.already_gone));
    }
    if report.interrupted {
        out.push_str("\n  Interrupted before finishing");
    }
    Ok(out)
}

pub fn format_integrity(report: &IntegrityReport, format: OutputFormat) -> Result<String, FsError> {
    if format == OutputFormat::Json {
        return to_json(report);
    }
    let mut out = format!(
        "{}\n  Nodes: {}\n  Directories: {}\n  Trash entries: {}\n",
        format_section_heading("Integrity"),
        report.nodes,
        report.directories,
        report.trash_entries
    );
    if report.is_consistent() {
        out.push_str(&success("Store is consistent"));
    } else {
        for issue in &report.issues {
            out.push_str(&format!("  {} {}\n", "✗".red(), issue));
        }
    }
    Ok(out)
}
