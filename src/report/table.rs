//! Plain text rendering for reports.
//!
//! One line per file: modification time, permission bits, size, growth per
//! day (growth rankings only, omitted when zero) and path.

use super::{Report, ReportEntry};
use crate::util::{format_bytes, format_rate_per_day};

pub fn render(report: &Report) -> String {
    let mut output = format!("*** {} ***\n", report.ranking.heading());

    for entry in &report.entries {
        output.push_str(&render_line(entry));
        output.push('\n');
    }

    output
}

fn render_line(entry: &ReportEntry) -> String {
    let mtime = chrono::DateTime::from_timestamp(entry.mtime, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let rate = match entry.rate {
        Some(rate) if rate != 0.0 => format!("{}\t", format_rate_per_day(rate)),
        _ => String::new(),
    };

    format!(
        "{mtime}\t{:o}\t{}\t{rate}{}",
        entry.mode & 0o7777,
        format_bytes(entry.size),
        entry.path
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Ranking;

    fn entry(rate: Option<f64>) -> ReportEntry {
        ReportEntry {
            path: "/data/log.txt".to_string(),
            sampled_at: 100,
            mode: 0o100644,
            size: 1500,
            mtime: 0,
            rate,
        }
    }

    #[test]
    fn line_has_mode_size_and_path() {
        assert_eq!(
            render_line(&entry(None)),
            "1970-01-01 00:00:00\t644\t1.50k\t/data/log.txt"
        );
    }

    #[test]
    fn zero_rate_is_omitted() {
        assert_eq!(render_line(&entry(Some(0.0))), render_line(&entry(None)));
    }

    #[test]
    fn growth_is_shown_per_day() {
        let line = render_line(&entry(Some(1.0)));
        assert!(line.contains("\t86.40kB/day\t"), "{line}");
    }

    #[test]
    fn report_starts_with_heading() {
        let report = Report {
            ranking: Ranking::Newest,
            entries: vec![entry(None)],
        };
        let text = render(&report);
        assert!(text.starts_with("*** NEWEST FILES ***\n"));
        assert_eq!(text.lines().count(), 2);
    }
}
