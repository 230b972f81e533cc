//! Human-readable byte sizes (SI, powers of 1000).

const UNITS: [&str; 9] = ["B", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];
const BASE: f64 = 1000.0;
const DECIMALS: usize = 2;

/// Format a byte count as `"<value> <unit>"`, e.g. `1500.0` -> `"1.5 KB"`.
///
/// - `0` is always `"0 Bytes"`
/// - values below one byte stay in `B`, values past `YB` stay in `YB`
/// - negative values keep their sign: `-1500.0` -> `"-1.5 KB"`, unless they
///   round to zero (`-0.001` -> `"0 B"`)
/// - exact halves round up: `1125.0` -> `"1.13 KB"`
/// - NaN and infinities are treated as zero
pub fn format_file_size(bytes: f64) -> String {
    if bytes == 0.0 {
        return "0 Bytes".to_string();
    }
    if !bytes.is_finite() {
        log::warn!("Cannot format non-finite byte count {bytes}, using 0");
        return "0 Bytes".to_string();
    }

    let magnitude = bytes.abs();
    let index = unit_index(magnitude);
    let scaled = magnitude / BASE.powi(index as i32);
    let number = trim_decimals(scaled);
    let sign = if bytes < 0.0 && number != "0" { "-" } else { "" };

    format!("{sign}{number} {}", UNITS[index])
}

/// Largest `i` in the unit table with `1000^i <= magnitude`.
fn unit_index(magnitude: f64) -> usize {
    let max = UNITS.len() - 1;
    let estimate = (magnitude.log10() / 3.0).floor().clamp(0.0, max as f64);
    let mut index = estimate as usize;

    // log10 lands a hair off exact powers of 1000 for some inputs
    while index < max && BASE.powi(index as i32 + 1) <= magnitude {
        index += 1;
    }
    while index > 0 && BASE.powi(index as i32) > magnitude {
        index -= 1;
    }
    index
}

/// Round to two decimals and drop the padding: `1.50` -> `1.5`, `2.00` -> `2`.
fn trim_decimals(value: f64) -> String {
    let fixed = format!("{:.*}", DECIMALS, round_half_up(value));
    fixed
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

/// `{:.2}` rounds exact ties to even; ties here must round away from zero.
///
/// Odd multiples of 1/8 are the only doubles lying exactly halfway between
/// two hundredths. For those `value * 100.0` is exact, so `round()` is too.
/// Everything else is left to the formatter's correctly rounded output.
fn round_half_up(value: f64) -> f64 {
    let eighths = value * 8.0;
    if eighths.fract() == 0.0 && eighths % 2.0 == 1.0 {
        (value * 100.0).round() / 100.0
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_special_cased() {
        assert_eq!(format_file_size(0.0), "0 Bytes");
        assert_eq!(format_file_size(-0.0), "0 Bytes");
    }

    #[test]
    fn formats_exact_powers() {
        assert_eq!(format_file_size(1.0), "1 B");
        assert_eq!(format_file_size(1000.0), "1 KB");
        assert_eq!(format_file_size(1_000_000.0), "1 MB");
        assert_eq!(format_file_size(1e9), "1 GB");
        assert_eq!(format_file_size(1e12), "1 TB");
    }

    #[test]
    fn keeps_at_most_two_decimals() {
        assert_eq!(format_file_size(1500.0), "1.5 KB");
        assert_eq!(format_file_size(1234.0), "1.23 KB");
        assert_eq!(format_file_size(999.0), "999 B");
        assert_eq!(format_file_size(2_560_000.0), "2.56 MB");
    }

    #[test]
    fn rounding_can_reach_the_next_thousand() {
        // 999.999 KB rounds up but stays in KB, like toFixed-based formatting
        assert_eq!(format_file_size(999_999.0), "1000 KB");
    }

    #[test]
    fn clamps_out_of_table_magnitudes() {
        assert_eq!(format_file_size(0.5), "0.5 B");
        assert_eq!(format_file_size(0.001), "0 B");
        assert_eq!(format_file_size(1e27), "1000 YB");
    }

    #[test]
    fn exact_halves_round_up() {
        assert_eq!(format_file_size(1125.0), "1.13 KB");
        assert_eq!(format_file_size(1625.0), "1.63 KB");
        assert_eq!(format_file_size(1375.0), "1.38 KB");
        assert_eq!(format_file_size(0.125), "0.13 B");
        assert_eq!(format_file_size(2_875_000.0), "2.88 MB");
    }

    #[test]
    fn near_halves_round_by_their_exact_value() {
        // 1.005 is stored just below the half
        assert_eq!(format_file_size(1005.0), "1 KB");
        assert_eq!(format_file_size(1.005), "1 B");
    }

    #[test]
    fn negative_values_keep_their_sign() {
        assert_eq!(format_file_size(-1500.0), "-1.5 KB");
        assert_eq!(format_file_size(-1125.0), "-1.13 KB");
    }

    #[test]
    fn negative_values_rounding_to_zero_drop_the_sign() {
        assert_eq!(format_file_size(-0.001), "0 B");
        assert_eq!(format_file_size(-0.004), "0 B");
    }

    #[test]
    fn non_finite_values_format_as_zero() {
        assert_eq!(format_file_size(f64::NAN), "0 Bytes");
        assert_eq!(format_file_size(f64::INFINITY), "0 Bytes");
    }

    #[test]
    fn chosen_unit_brackets_the_value() {
        let samples = [
            1.0, 7.0, 999.0, 1000.0, 1001.0, 65_536.0, 999_999.0, 1e6, 123_456_789.0, 1e15,
            4.2e17, 1e21,
        ];
        for bytes in samples {
            let index = unit_index(bytes);
            assert!(BASE.powi(index as i32) <= bytes, "{bytes} below unit {index}");
            assert!(bytes < BASE.powi(index as i32 + 1), "{bytes} above unit {index}");

            let formatted = format_file_size(bytes);
            let number = formatted.split(' ').next().unwrap_or_default();
            let decimals = number.split('.').nth(1).map_or(0, str::len);
            assert!(decimals <= 2, "{formatted} has too many decimals");
            assert!(formatted.ends_with(UNITS[index]));
        }
    }

    #[test]
    fn formatting_is_repeatable() {
        assert_eq!(format_file_size(31_415.9), format_file_size(31_415.9));
    }
}
