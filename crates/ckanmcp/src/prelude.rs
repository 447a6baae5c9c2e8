pub use crate::error::Error;

pub use anstream::eprintln;
pub use anstream::println;
pub use color_eyre::eyre::{eyre, Result};
pub use log::{debug, error, info, warn};

/// Borderless table used by every explorer listing
pub fn new_table() -> prettytable::Table {
    let mut table = prettytable::Table::new();

    let format = prettytable::format::FormatBuilder::new()
        .padding(1, 1)
        .build();

    table.set_format(format);

    table
}

/// Value of an optional string for display, `N/A` when missing
pub fn or_na(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or("N/A")
}

/// First `len` characters of an optional string (dates are shown as `YYYY-MM-DD`)
pub fn prefix(value: Option<&str>, len: usize) -> String {
    match value {
        Some(v) if !v.is_empty() => v.chars().take(len).collect(),
        _ => "N/A".to_string(),
    }
}
