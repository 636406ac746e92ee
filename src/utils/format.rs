//! Display formatting for the recording list

use chrono::{DateTime, Local, Utc};

const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

/// Human readable file size, e.g. `1.5 MB`
pub fn format_file_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} B");
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    format!("{value:.1} {}", UNITS[unit])
}

/// Modification time in the local timezone
pub fn format_modified(time: DateTime<Utc>) -> String {
    time.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}
