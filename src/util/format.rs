//! Number rendering for reports. Amounts are whole currency units; there is no
//! sub-unit in this economy.

/// Thousands separator of the pt-BR locale the tool was built for.
pub const DEFAULT_THOUSANDS_SEPARATOR: char = '.';
/// Decimal mark matching [`DEFAULT_THOUSANDS_SEPARATOR`].
pub const DEFAULT_DECIMAL_MARK: char = ',';

/// Floor `value` to a whole amount and group thousands with `.`.
///
/// Non-finite input renders as `"0"`.
pub fn format_currency(value: f64) -> String {
    format_currency_with(value, DEFAULT_THOUSANDS_SEPARATOR)
}

pub fn format_currency_with(value: f64, separator: char) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    // floor, never round: 9.99 is 9
    let whole = value.floor() as i128;
    group_thousands(whole, separator)
}

/// One fractional digit, e.g. `1.234,5`.
pub fn format_decimal(value: f64, separator: char, decimal_mark: char) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let tenths = (value * 10.0).round() as i128;
    let whole = tenths.abs() / 10;
    let fraction = tenths.abs() % 10;
    let sign = if tenths < 0 { "-" } else { "" };
    format!(
        "{sign}{}{decimal_mark}{fraction}",
        group_thousands(whole, separator)
    )
}

/// Percentage with one fractional digit and a `.` decimal point, e.g. `12.5%`.
pub fn format_percent(value: f64) -> String {
    format!("{value:.1}%")
}

fn group_thousands(value: i128, separator: char) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(separator);
        }
        grouped.push(c);
    }
    if value < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}
