use chrono::{DateTime, Local, Utc};
use std::time::Duration;

const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

/// 格式化字节数 (例如: "1.5 MB")
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", size, UNITS[unit])
}

/// 格式化时间为本地时间
pub fn format_timestamp(time: &DateTime<Utc>) -> String {
    time.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

/// 格式化耗时 (例如: "1.25 秒")
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{} 毫秒", millis)
    } else {
        format!("{:.2} 秒", duration.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(20 * 1024 * 1024), "20.0 MB");
    }

    #[test]
    fn test_format_timestamp() {
        let formatted = format_timestamp(&Utc::now());
        assert!(formatted.contains('-'));
        assert!(formatted.contains(':'));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250 毫秒");
        assert_eq!(format_duration(Duration::from_millis(1250)), "1.25 秒");
    }
}
