use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

use crate::deploy::NotifyAction;

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

pub fn action_cell(action: NotifyAction) -> Cell {
    let color = match action {
        NotifyAction::Created => TableColor::Green,
        NotifyAction::AlreadyNotified => TableColor::DarkGrey,
        NotifyAction::WouldCreate => TableColor::Yellow,
    };
    Cell::new(action.label()).fg(color)
}
