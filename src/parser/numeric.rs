use super::ExtractError;

/// Display-locale descriptor for the site's numeric strings. Passed
/// explicitly so parsing is reentrant and testable without process-wide
/// locale state.
#[derive(Debug, Clone, Copy)]
pub struct NumberFormat {
    pub group: char,
    pub decimal: char,
}

/// The SET English pages render numbers with `,` grouping and `.` decimals.
pub const EN_US: NumberFormat = NumberFormat {
    group: ',',
    decimal: '.',
};

/// Parse a grouped-thousands integer such as `1,234,567`.
pub fn parse_grouped_u64(raw: &str, format: NumberFormat) -> Result<u64, ExtractError> {
    let digits: String = raw
        .trim()
        .chars()
        .filter(|&c| c != format.group)
        .collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ExtractError::BadGroupedInteger(raw.to_string()));
    }
    digits
        .parse()
        .map_err(|_| ExtractError::BadGroupedInteger(raw.to_string()))
}

/// Parse a non-negative decimal percentage such as `12.34`.
pub fn parse_percent(raw: &str, format: NumberFormat) -> Result<f64, ExtractError> {
    let mut normalized: String = raw
        .trim()
        .chars()
        .filter(|&c| c != format.group)
        .collect();
    if format.decimal != '.' {
        normalized = normalized.replace(format.decimal, ".");
    }
    let value: f64 = normalized
        .parse()
        .map_err(|_| ExtractError::BadDecimal(raw.to_string()))?;
    if !value.is_finite() || value < 0.0 {
        return Err(ExtractError::BadDecimal(raw.to_string()));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grouped_integer() {
        assert_eq!(parse_grouped_u64("1,234,567", EN_US).unwrap(), 1_234_567);
        assert_eq!(parse_grouped_u64("999", EN_US).unwrap(), 999);
        assert_eq!(parse_grouped_u64(" 1,000 ", EN_US).unwrap(), 1_000);
    }

    #[test]
    fn grouped_integer_rejects_garbage() {
        assert!(parse_grouped_u64("", EN_US).is_err());
        assert!(parse_grouped_u64(",", EN_US).is_err());
        assert!(parse_grouped_u64("1,234.00", EN_US).is_err());
        assert!(parse_grouped_u64("12a4", EN_US).is_err());
        assert!(parse_grouped_u64("-5", EN_US).is_err());
    }

    #[test]
    fn percent() {
        assert_eq!(parse_percent("12.34", EN_US).unwrap(), 12.34);
        assert_eq!(parse_percent("0", EN_US).unwrap(), 0.0);
        assert_eq!(parse_percent("1,234.5", EN_US).unwrap(), 1234.5);
    }

    #[test]
    fn percent_rejects_garbage() {
        assert!(parse_percent("abc", EN_US).is_err());
        assert!(parse_percent("", EN_US).is_err());
        assert!(parse_percent("-1.5", EN_US).is_err());
        assert!(parse_percent("inf", EN_US).is_err());
    }

    #[test]
    fn alternate_locale_descriptor() {
        let eu = NumberFormat {
            group: '.',
            decimal: ',',
        };
        assert_eq!(parse_grouped_u64("1.234.567", eu).unwrap(), 1_234_567);
        assert_eq!(parse_percent("1.234,5", eu).unwrap(), 1234.5);
    }
}
