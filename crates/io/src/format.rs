// Display formatting shared by table cells and chart value labels

/// Post counts: integral values without decimals, others with one.
pub fn count(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.1}", value)
    }
}

/// `25.7%`
pub fn percent(value: f64) -> String {
    format!("{:.1}%", round1(value))
}

/// One decimal, no unit. Used for value labels on bars.
pub fn one_decimal(value: f64) -> String {
    format!("{:.1}", round1(value))
}

/// `+4`, `-5`, `0`. Only positive values carry a sign prefix.
pub fn signed_count(value: f64) -> String {
    let text = count(value);
    if value > 0.0 && text != "0" && text != "0.0" {
        format!("+{text}")
    } else {
        text
    }
}

/// `+1.6 pp`, `-2.3 pp`, `0.0 pp`.
pub fn signed_points(value: f64) -> String {
    let rounded = round1(value);
    if rounded > 0.0 {
        format!("+{:.1} pp", rounded)
    } else {
        format!("{:.1} pp", rounded)
    }
}

/// Round to one decimal, folding `-0.0` into `0.0`.
fn round1(value: f64) -> f64 {
    let r = (value * 10.0).round() / 10.0;
    if r == 0.0 {
        0.0
    } else {
        r
    }
}
