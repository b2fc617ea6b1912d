use std::fmt::Write as _;

use serde::Serialize;

/// Final result of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlobalTotals {
    pub total_bytes: i64,
    pub top_urls: Vec<String>,
    pub top_referers: Vec<String>,
}

/// How much input made it into the totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub files_processed: u64,
    pub files_skipped: u64,
    pub lines_processed: u64,
    pub lines_skipped: u64,
    pub workers_failed: u64,
}

impl RunStats {
    pub fn absorb(&mut self, other: &RunStats) {
        self.files_processed += other.files_processed;
        self.files_skipped += other.files_skipped;
        self.lines_processed += other.lines_processed;
        self.lines_skipped += other.lines_skipped;
        self.workers_failed += other.workers_failed;
    }

    /// True when some input was left out of the totals.
    pub fn is_partial(&self) -> bool {
        self.files_skipped > 0 || self.lines_skipped > 0 || self.workers_failed > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    #[serde(flatten)]
    pub totals: GlobalTotals,
    pub stats: RunStats,
}

impl Report {
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Total bytes: {}", self.totals.total_bytes);

        let _ = writeln!(out, "\nTop URLs:");
        for (rank, url) in self.totals.top_urls.iter().enumerate() {
            let _ = writeln!(out, "{:>3}. {url}", rank + 1);
        }

        let _ = writeln!(out, "\nTop referers:");
        for (rank, referer) in self.totals.top_referers.iter().enumerate() {
            let _ = writeln!(out, "{:>3}. {referer}", rank + 1);
        }

        let s = &self.stats;
        if s.is_partial() {
            let _ = writeln!(
                out,
                "\nSkipped: {} of {} files, {} of {} lines, {} failed workers",
                s.files_skipped,
                s.files_processed + s.files_skipped,
                s.lines_skipped,
                s.lines_processed + s.lines_skipped,
                s.workers_failed,
            );
        }
        out
    }

    pub fn render_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn report(stats: RunStats) -> Report {
        Report {
            totals: GlobalTotals {
                total_bytes: 200,
                top_urls: vec!["/x".into(), "(none)".into()],
                top_referers: vec!["(no referer)".into(), "(none)".into()],
            },
            stats,
        }
    }

    #[test]
    fn text_report_lists_ranked_keys() {
        let text = report(RunStats::default()).render_text();
        assert_eq!(
            text,
            "Total bytes: 200\n\
             \n\
             Top URLs:\n  1. /x\n  2. (none)\n\
             \n\
             Top referers:\n  1. (no referer)\n  2. (none)\n"
        );
    }

    #[test]
    fn text_report_mentions_skipped_input() {
        let stats = RunStats {
            files_processed: 3,
            files_skipped: 1,
            lines_processed: 10,
            lines_skipped: 2,
            workers_failed: 0,
        };
        let text = report(stats).render_text();
        assert!(text.ends_with("\nSkipped: 1 of 4 files, 2 of 12 lines, 0 failed workers\n"));
    }

    #[test]
    fn json_report_flattens_totals() {
        let json: serde_json::Value =
            serde_json::from_str(&report(RunStats::default()).render_json().unwrap()).unwrap();
        assert_eq!(json["total_bytes"], 200);
        assert_eq!(json["top_urls"][0], "/x");
        assert_eq!(json["stats"]["lines_skipped"], 0);
    }

    #[test]
    fn absorb_sums_every_counter() {
        let mut total = RunStats::default();
        let one = RunStats {
            files_processed: 1,
            files_skipped: 2,
            lines_processed: 3,
            lines_skipped: 4,
            workers_failed: 5,
        };
        total.absorb(&one);
        total.absorb(&one);
        assert_eq!(total.files_processed, 2);
        assert_eq!(total.workers_failed, 10);
        assert!(total.is_partial());
    }
}
