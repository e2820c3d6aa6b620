//! Byte-unit parsing and formatting (spec §4.1 "Unit conversion", §8.3).

const KB: f64 = 1024.0;
const MB: f64 = KB * 1024.0;
const GB: f64 = MB * 1024.0;
const TB: f64 = GB * 1024.0;

/// Convert a value with a unit suffix (`B`, `KB`, `MB`, `GB`, `TB`) to a
/// byte count, rounding down. Unknown units are treated as bytes (spec §4.1).
pub fn parse_bytes(value: f64, unit: &str) -> u64 {
    let multiplier = match unit.to_ascii_uppercase().as_str() {
        "B" => 1.0,
        "KB" => KB,
        "MB" => MB,
        "GB" => GB,
        "TB" => TB,
        _ => 1.0,
    };
    (value * multiplier).floor() as u64
}

/// Format a byte count as the canonical "X.XU" string, matching both the
/// teacher's `ProgressState::format_bytes` and the original's
/// `FileProgress._format_bytes`.
pub fn format_bytes(bytes: u64) -> String {
    let bytes = bytes as f64;
    if bytes >= TB {
        format!("{:.1}TB", bytes / TB)
    } else if bytes >= GB {
        format!("{:.1}GB", bytes / GB)
    } else if bytes >= MB {
        format!("{:.1}MB", bytes / MB)
    } else if bytes >= KB {
        format!("{:.1}KB", bytes / KB)
    } else {
        format!("{:.1}B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bytes_applies_multiplier() {
        assert_eq!(parse_bytes(1.0, "KB"), 1024);
        assert_eq!(parse_bytes(1.1, "GB"), 1181116006);
        assert_eq!(parse_bytes(12.4, "MB"), 13002342);
    }

    #[test]
    fn parse_bytes_unknown_unit_treated_as_bytes() {
        assert_eq!(parse_bytes(42.0, "XX"), 42);
    }

    #[test]
    fn format_bytes_round_trips_through_canonical_magnitudes() {
        assert_eq!(format_bytes(512), "512.0B");
        assert_eq!(format_bytes(1536), "1.5KB");
        assert_eq!(format_bytes(2_500_000_000), "2.3GB");
    }

    #[test]
    fn format_bytes_matches_parse_bytes_round_trip() {
        for (value, unit) in [(1.0_f64, "KB"), (2.3_f64, "GB"), (512.0_f64, "B")] {
            let bytes = parse_bytes(value, unit);
            let rendered = format_bytes(bytes);
            assert!(rendered.ends_with(unit) || unit == "B");
        }
    }
}
