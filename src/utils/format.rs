use std::time::Duration;

/// Humanize a byte count, e.g. `1536.0` -> `1.5 KB`
pub fn humanize_bytes(bytes: f64) -> String {
    if !bytes.is_finite() || bytes <= 0.0 {
        return "0 Byte".to_string();
    }

    const UNITS: &[&str] = &["Bytes", "KB", "MB", "GB", "TB", "PB"];
    const UNIT_SIZE: f64 = 1024.0;

    let mut size = bytes;
    let mut unit_index = 0;

    while size >= UNIT_SIZE && unit_index < UNITS.len() - 1 {
        size /= UNIT_SIZE;
        unit_index += 1;
    }

    // Two decimals at most, trailing zeros dropped
    let rounded = (size * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit_index])
}

/// Humanize a byte rate
pub fn format_speed(bytes_per_second: f64) -> String {
    format!("{}/s", humanize_bytes(bytes_per_second))
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
