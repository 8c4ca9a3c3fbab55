use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

use crate::schemas::ProjectRefKind;

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn cyan_header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).fg(TableColor::Cyan))
        .collect()
}

pub fn kind_cell(kind: ProjectRefKind) -> Cell {
    let color = match kind {
        ProjectRefKind::Branch => TableColor::Green,
        ProjectRefKind::Tag => TableColor::Yellow,
        ProjectRefKind::MergeRequest => TableColor::Magenta,
    };
    Cell::new(kind).fg(color)
}

/// Colors a job status the way GitLab's UI does.
pub fn job_status_cell(status: &str) -> Cell {
    let color = match status {
        "success" => TableColor::Green,
        "failed" => TableColor::Red,
        "running" | "pending" | "created" | "preparing" => TableColor::Blue,
        "canceled" | "skipped" | "manual" => TableColor::DarkGrey,
        _ => TableColor::Yellow,
    };
    Cell::new(status).fg(color)
}
