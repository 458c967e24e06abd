//! JSON output for reports.
//!
//! Serializes a Report to JSON for scripting and piping.

use super::Report;

pub fn render(report: &Report) -> String {
    serde_json::to_string_pretty(report)
        .unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{Ranking, ReportEntry};

    #[test]
    fn ranking_and_entries_are_serialized() {
        let report = Report {
            ranking: Ranking::Fastest,
            entries: vec![ReportEntry {
                path: "/x".to_string(),
                sampled_at: 2,
                mode: 0o100600,
                size: 10,
                mtime: 1,
                rate: Some(0.5),
            }],
        };

        let value: serde_json::Value = serde_json::from_str(&render(&report)).unwrap();
        assert_eq!(value["ranking"], "fastest");
        assert_eq!(value["entries"][0]["path"], "/x");
        assert_eq!(value["entries"][0]["rate"], 0.5);
    }

    #[test]
    fn missing_rate_is_left_out() {
        let report = Report {
            ranking: Ranking::Biggest,
            entries: vec![ReportEntry {
                path: "/x".to_string(),
                sampled_at: 2,
                mode: 0,
                size: 10,
                mtime: 1,
                rate: None,
            }],
        };

        let value: serde_json::Value = serde_json::from_str(&render(&report)).unwrap();
        assert!(value["entries"][0].get("rate").is_none());
    }
}
