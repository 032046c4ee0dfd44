//! Formatting utilities.

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Format a byte count as a human-readable size.
pub fn format_size(bytes: u64) -> String {
    if bytes >= 1 << 30 {
        format!("{:.1} GB", bytes as f64 / GIB)
    } else if bytes >= 1 << 20 {
        format!("{:.1} MB", bytes as f64 / (1u64 << 20) as f64)
    } else if bytes >= 1 << 10 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{} B", bytes)
    }
}

/// Bytes as binary gigabytes, rounded to two decimals.
pub fn round_gb(bytes: u64) -> f64 {
    (bytes as f64 / GIB * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(3 << 20), "3.0 MB");
        assert_eq!(format_size(5 << 30), "5.0 GB");
    }

    #[test]
    fn test_round_gb() {
        assert_eq!(round_gb(0), 0.0);
        assert_eq!(round_gb(1 << 30), 1.0);
        assert_eq!(round_gb((1 << 30) + (1 << 29)), 1.5);
    }
}
