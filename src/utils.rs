use chrono::{DateTime, Local, Utc};
use std::path::{Path, PathBuf};

/// 将毫秒时间戳格式化为本地时间 HH:MM:SS.mmm
pub fn format_timestamp(timestamp_ms: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(timestamp_ms) {
        Some(time) => time.with_timezone(&Local).format("%H:%M:%S%.3f").to_string(),
        None => format!("Invalid timestamp: {}", timestamp_ms),
    }
}

/// Default export file inside `directory`, named after the current local time.
pub fn default_export_path(directory: &Path) -> PathBuf {
    directory.join(format!("telemetry_{}.txt", Local::now().format("%Y%m%d_%H%M%S")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp_shape() {
        let formatted = format_timestamp(1_700_000_000_123);
        assert_eq!(formatted.len(), "00:00:00.000".len());
        assert!(formatted.ends_with(".123"));
    }

    #[test]
    fn test_format_timestamp_out_of_range() {
        assert!(format_timestamp(i64::MAX).starts_with("Invalid timestamp"));
    }

    #[test]
    fn test_default_export_path_is_in_directory() {
        let path = default_export_path(Path::new("exports"));
        assert!(path.starts_with("exports"));
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("txt"));
    }
}
