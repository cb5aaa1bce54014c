//! Cell value normalization.
//!
//! Sheet cells arrive as display strings in pt-BR format ("R$ 1.234,56",
//! "12,5%") or as error sentinels. Everything collapses to a finite `f64`.

/// Spreadsheet error markers that always read as zero.
pub const ERROR_SENTINELS: [&str; 4] = ["#N/A", "#DIV/0!", "#NUM!", "-"];

/// Converts a raw cell into a number. Never fails: empty, missing,
/// sentinel and unparseable input all yield `0.0`.
///
/// Periods are thousands separators and the comma is the decimal
/// separator, so `"1.234,56"` reads as `1234.56`.
pub fn normalize(raw: Option<&str>) -> f64 {
    let Some(raw) = raw else {
        return 0.0;
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() || ERROR_SENTINELS.contains(&trimmed) {
        return 0.0;
    }

    let kept: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .filter(|c| *c != '.')
        .collect();
    let decimal = kept.replacen(',', ".", 1);

    match parse_leading_float(&decimal) {
        Some(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

/// Parses the longest numeric prefix (`-?digits[.digits]`) and ignores the
/// rest, so `"1.5.3"` reads as `1.5` and `"10-2"` as `10`.
fn parse_leading_float(text: &str) -> Option<f64> {
    let bytes = text.as_bytes();
    let mut end = 0;

    if bytes.first() == Some(&b'-') {
        end = 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if frac_end > frac_start || digits > 0 {
            digits += frac_end - frac_start;
            end = frac_end;
        }
    }

    if digits == 0 {
        return None;
    }

    text[..end].trim_end_matches('.').parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locale_formats() {
        assert_eq!(normalize(Some("1.234,56")), 1234.56);
        assert_eq!(normalize(Some("R$ 1.000,00")), 1000.0);
        assert_eq!(normalize(Some("R$ 2.500,00")), 2500.0);
        assert_eq!(normalize(Some("12,5%")), 12.5);
        assert_eq!(normalize(Some("-3,25")), -3.25);
    }

    #[test]
    fn test_sentinels_and_empty_are_zero() {
        let inputs = [
            None,
            Some(""),
            Some("   "),
            Some("#N/A"),
            Some("#DIV/0!"),
            Some("#NUM!"),
            Some("-"),
        ];
        for raw in inputs {
            assert_eq!(normalize(raw), 0.0, "input {:?}", raw);
        }
    }

    #[test]
    fn test_clean_integers_round_trip() {
        for n in [0u64, 1, 7, 42, 999, 1_000, 123_456, 9_999_999] {
            assert_eq!(normalize(Some(&n.to_string())), n as f64);
        }
    }

    #[test]
    fn test_unparseable_input_is_zero() {
        assert_eq!(normalize(Some("abc")), 0.0);
        assert_eq!(normalize(Some("--")), 0.0);
        assert_eq!(normalize(Some("R$ -")), 0.0);
        assert_eq!(normalize(Some("#REF!")), 0.0);
    }

    #[test]
    fn test_leading_prefix_wins() {
        assert_eq!(normalize(Some("1,5,3")), 1.5);
        assert_eq!(normalize(Some("10-2")), 10.0);
        assert_eq!(normalize(Some(",5")), 0.5);
    }
}
