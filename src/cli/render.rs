use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use crate::fmt::date_br;
use crate::reports::{Control, RenderedReport};
use crate::table::Value;

fn cell(value: &Value) -> Cell {
    match value {
        Value::Int(_) | Value::Float(_) => {
            Cell::new(value.to_string()).set_alignment(CellAlignment::Right)
        }
        other => Cell::new(other.to_string()),
    }
}

pub fn format_report(report: &RenderedReport) -> String {
    let mut out = format!("{}\n{}\n", report.title.bold(), report.summary);
    if report.table.is_empty() {
        out.push_str(&format!("{}\n", "Nenhum registro encontrado.".dimmed()));
        return out;
    }

    let mut table = Table::new();
    table.set_header(report.table.columns().to_vec());
    for row in report.table.rows() {
        table.add_row(row.iter().map(cell).collect::<Vec<_>>());
    }
    out.push_str(&format!("{table}\n{} registro(s)\n", report.table.len()));
    out
}

pub fn format_controls(controls: &[Control]) -> String {
    if controls.is_empty() {
        return "Este relatório não tem controles.\n".to_string();
    }
    let mut out = String::new();
    for control in controls {
        let line = match control {
            Control::DateRange { label, default } => format!(
                "{label}: {} a {} (periodo DE ATE)",
                date_br(default.start()),
                date_br(default.end())
            ),
            Control::Select { key, label, options } => {
                format!("{label}: {} ({key} VALOR)", options.join(", "))
            }
            Control::Toggle { key, label } => format!("{label} ({key})"),
        };
        out.push_str(&format!("  {line}\n"));
    }
    out
}
