const SUFFIXES: [&str; 6] = ["", "k", "M", "G", "T", "P"];
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Decimal size with a unit suffix, e.g. `1.50k`, `12.00M`. Values below
/// 1000 print as whole bytes.
pub fn format_bytes(bytes: u64) -> String {
    format_scaled(bytes as f64)
}

/// Growth in bytes per day from a bytes-per-second rate.
pub fn format_rate_per_day(bytes_per_second: f64) -> String {
    format!("{}B/day", format_scaled(bytes_per_second * SECONDS_PER_DAY))
}

fn format_scaled(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude < 1000.0 {
        return format!("{}", value.round() as i64);
    }

    let mut scaled = value;
    let mut unit = 0;
    while scaled.abs() >= 1000.0 && unit < SUFFIXES.len() - 1 {
        scaled /= 1000.0;
        unit += 1;
    }
    format!("{scaled:.2}{}", SUFFIXES[unit])
}
