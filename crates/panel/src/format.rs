//! Cell formatting for the file table.

use shared::domain::FileRecord;

const MEDIA_TYPE_MAX_CHARS: usize = 10;

/// 1024-based size with at most two decimals, trailing zeros dropped.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let text = format!("{value:.2}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{text} {}", UNITS[unit])
}

pub fn truncate_media_type(media_type: &str) -> String {
    if media_type.chars().count() <= MEDIA_TYPE_MAX_CHARS {
        return media_type.to_string();
    }
    let head: String = media_type.chars().take(MEDIA_TYPE_MAX_CHARS).collect();
    format!("{head}…")
}

pub fn status_label(file: &FileRecord) -> &'static str {
    file.state.label()
}

pub fn status_tooltip(file: &FileRecord) -> String {
    if file.state.is_transient() {
        format!("{}% complete", file.progress)
    } else if let Some(reason) = &file.failure {
        format!("{}: {reason}", file.state.label())
    } else {
        file.state.label().to_string()
    }
}
