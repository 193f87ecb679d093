/// Format a number for display and matching.
///
/// Integral values drop the fractional part (`5.0` -> `"5"`), everything else
/// uses the shortest representation that round-trips.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "#NAN!".to_string()
    } else if n.is_infinite() {
        "#INF!".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{:.0}", n)
    } else {
        format!("{}", n)
    }
}

/// Format a money amount with two decimals, as shown in a cost breakdown.
pub fn format_amount(n: f64) -> String {
    format!("{:.2}", n)
}
