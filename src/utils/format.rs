/// Format a US dollar amount with thousands separators.
///
/// Amounts above one billion drop the cents. Non-finite input formats as zero.
pub fn format_currency(value: f64) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    let decimals = if value > 1_000_000_000.0 { 0 } else { 2 };
    format_usd(value, decimals)
}

/// Abbreviate a market capitalization to trillions (`$2.41T`) or billions (`$812.30B`).
///
/// Smaller values fall back to [`format_currency`].
pub fn format_market_cap(value: f64) -> String {
    const TRILLION: f64 = 1_000_000_000_000.0;
    const BILLION: f64 = 1_000_000_000.0;

    if value >= TRILLION && value.is_finite() {
        format!("${:.2}T", value / TRILLION)
    } else if value >= BILLION && value.is_finite() {
        format!("${:.2}B", value / BILLION)
    } else {
        format_currency(value)
    }
}

fn format_usd(value: f64, decimals: usize) -> String {
    let digits = format!("{:.*}", decimals, value.abs());
    let (whole, fraction) = match digits.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (digits.as_str(), None),
    };

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    // Amounts that round to zero never carry a sign
    let is_zero = digits.chars().all(|c| c == '0' || c == '.');
    let sign = if value < 0.0 && !is_zero { "-" } else { "" };

    match fraction {
        Some(fraction) => format!("{}${}.{}", sign, grouped, fraction),
        None => format!("{}${}", sign, grouped),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(4.5), "$4.50");
        assert_eq!(format_currency(999.999), "$1,000.00");
        assert_eq!(format_currency(128_456.32), "$128,456.32");
        assert_eq!(format_currency(1_000_000.0), "$1,000,000.00");
        assert_eq!(format_currency(-5_894.12), "-$5,894.12");
        assert_eq!(format_currency(-0.001), "$0.00");
    }

    #[test]
    fn test_format_currency_drops_cents_above_a_billion() {
        assert_eq!(format_currency(1_000_000_000.0), "$1,000,000,000.00");
        assert_eq!(format_currency(2_500_000_000.4), "$2,500,000,000");
    }

    #[test]
    fn test_format_currency_non_finite() {
        assert_eq!(format_currency(f64::NAN), "$0.00");
        assert_eq!(format_currency(f64::INFINITY), "$0.00");
    }

    #[test]
    fn test_format_market_cap() {
        assert_eq!(format_market_cap(2.41e12), "$2.41T");
        assert_eq!(format_market_cap(1e12), "$1.00T");
        assert_eq!(format_market_cap(812.3e9), "$812.30B");
        assert_eq!(format_market_cap(1e9), "$1.00B");
        assert_eq!(format_market_cap(950_000_000.0), "$950,000,000.00");
        assert_eq!(format_market_cap(f64::INFINITY), "$0.00");
    }
}
