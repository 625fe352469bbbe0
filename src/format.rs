//! Human-readable rendering helpers shared by the HTTP and terminal adapters.

/// Formats a byte count with 1024-based units: "512 B", "1.5 KB", "2.0 GB".
pub fn format_bytes(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    const PREFIXES: [char; 6] = ['K', 'M', 'G', 'T', 'P', 'E'];

    if bytes < UNIT {
        return format!("{} B", bytes);
    }

    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }

    format!("{:.1} {}B", bytes as f64 / div as f64, PREFIXES[exp])
}

/// Formats a byte rate, e.g. "1.5 MB/s".
pub fn format_rate(bytes_per_sec: f64) -> String {
    format!("{}/s", format_bytes(bytes_per_sec.max(0.0) as u64))
}

/// Two-decimal percentage with a trailing sign: "12.34%".
pub fn format_percent(value: f64) -> String {
    format!("{:.2}%", value)
}

/// Two-decimal plain number, as used for load averages.
pub fn format_fixed2(value: f64) -> String {
    format!("{:.2}", value)
}

/// Formats whole seconds as "Xd Xh Xm", dropping leading zero units.
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let days = total / 86_400;
    let hours = (total / 3_600) % 24;
    let minutes = (total / 60) % 60;

    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(16 * 1024 * 1024 * 1024), "16.0 GB");
        assert_eq!(format_bytes(u64::MAX), "16.0 EB");
    }

    #[test]
    fn test_format_percent_and_fixed() {
        assert_eq!(format_percent(12.345), "12.35%");
        assert_eq!(format_percent(0.0), "0.00%");
        assert_eq!(format_fixed2(0.5), "0.50");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(59.0), "0m");
        assert_eq!(format_duration(3_660.0), "1h 1m");
        assert_eq!(format_duration(86_400.0), "1d 0h 0m");
        assert_eq!(format_duration(90_061.9), "1d 1h 1m");
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(2048.0), "2.0 KB/s");
        assert_eq!(format_rate(-5.0), "0 B/s");
    }
}
