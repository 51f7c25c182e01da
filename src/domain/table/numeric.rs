// ============================================================
// NUMERIC COERCION
// ============================================================
// Best-effort text -> number conversion shared by ingest and queries

const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£'];

/// Parse a value that may carry currency, thousands separators or a percent sign.
///
/// `"$1,200.50"` -> 1200.5, `"45%"` -> 45.0, `" 7 "` -> 7.0.
/// Returns `None` for anything that is not a finite number once cleaned.
pub fn parse_clean_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .collect();

    let (negative, unsigned) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.strip_prefix('+').unwrap_or(&cleaned)),
    };

    let unsigned = unsigned.strip_prefix(CURRENCY_SYMBOLS).unwrap_or(unsigned);
    let unsigned = unsigned.strip_suffix('%').unwrap_or(unsigned);

    let value = parse_plain_number(unsigned)?;
    Some(if negative { -value } else { value })
}

/// Parse a plain decimal literal (no cleaning beyond trimming).
pub fn parse_plain_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    // f64::from_str also accepts "inf" and "NaN"
    if trimmed.is_empty() || trimmed.chars().any(|c| c.is_alphabetic() && c != 'e' && c != 'E')
    {
        return None;
    }

    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_and_separators() {
        assert_eq!(parse_clean_number("$1,200.50"), Some(1200.5));
        assert_eq!(parse_clean_number("€ 3 400"), Some(3400.0));
        assert_eq!(parse_clean_number("£12"), Some(12.0));
        assert_eq!(parse_clean_number("-$5.25"), Some(-5.25));
    }

    #[test]
    fn test_percent_keeps_magnitude() {
        assert_eq!(parse_clean_number("45%"), Some(45.0));
        assert_eq!(parse_clean_number("12.5 %"), Some(12.5));
    }

    #[test]
    fn test_rejects_non_numeric() {
        assert_eq!(parse_clean_number("abc"), None);
        assert_eq!(parse_clean_number(""), None);
        assert_eq!(parse_clean_number("$"), None);
        assert_eq!(parse_clean_number("2024-01-01"), None);
        assert_eq!(parse_clean_number("inf"), None);
        assert_eq!(parse_clean_number("NaN"), None);
    }

    #[test]
    fn test_plain_number_accepts_exponent() {
        assert_eq!(parse_plain_number("1e3"), Some(1000.0));
        assert_eq!(parse_plain_number(" 42 "), Some(42.0));
        assert_eq!(parse_plain_number("1,000"), None);
    }
}
