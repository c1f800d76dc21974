//! Number formatting for values spliced into generated source text.

/// Format `value` as a plain decimal literal: at most three fractional
/// digits, trailing zeros and a dangling dot removed.
///
/// `16.6666` becomes `16.667`, `60.0` becomes `60`, `0.5` stays `0.5`.
pub fn format_decimal(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let rounded = (value * 1000.0).round() / 1000.0;
    let mut text = format!("{rounded:.3}");
    while text.ends_with('0') {
        text.pop();
    }
    if text.ends_with('.') {
        text.pop();
    }
    if text == "-0" {
        text = "0".to_string();
    }
    text
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
