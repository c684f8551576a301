//! `ScanSummary` (`spec.md` §3, §6) — the orchestrator's final aggregate,
//! and the structured (JSON) output schema `spec.md` §6 specifies.

use serde::Serialize;

use crate::notification::Notification;
use crate::reporter::FileScanResult;
use crate::rule::Severity;

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ViolationTotals {
    pub total: usize,
    pub error: usize,
    pub warning: usize,
    pub optimizing: usize,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryTotals {
    pub scanned_files: usize,
    pub files_with_errors: usize,
    pub files_with_warnings: usize,
    pub files_with_optimizing: usize,
    pub violation_totals: ViolationTotals,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    pub summary: SummaryTotals,
    pub files: Vec<FileScanResult>,
    pub notifications: Vec<Notification>,
}

impl ScanSummary {
    pub fn empty(notifications: Vec<Notification>) -> Self {
        Self {
            summary: SummaryTotals::default(),
            files: Vec::new(),
            notifications,
        }
    }

    /// `spec.md` §8: `violationTotals.total = Σ files[i].totalViolations`
    /// (and analogously per severity); `filesWithErrors` counts files whose
    /// `errorViolations > 0`, not violations.
    pub fn from_files(files: Vec<FileScanResult>, notifications: Vec<Notification>) -> Self {
        let mut totals = ViolationTotals::default();
        let mut files_with_errors = 0;
        let mut files_with_warnings = 0;
        let mut files_with_optimizing = 0;

        for file in &files {
            totals.total += file.total_violations;
            totals.error += file.severity_counts.error;
            totals.warning += file.severity_counts.warning;
            totals.optimizing += file.severity_counts.optimizing;

            // `error_violations`/`severity_counts` (not `violations`) are the
            // source of truth here: a parser-failure/unreadable-file result
            // carries `error_violations = 1` with an empty `violations` list
            // (spec.md §7's "without fabricating a specific violation"), and
            // must still count toward `filesWithErrors` for exit-code §8.
            if file.error_violations > 0 {
                files_with_errors += 1;
            }
            if file.severity_counts.warning > 0 {
                files_with_warnings += 1;
            }
            if file.severity_counts.optimizing > 0 {
                files_with_optimizing += 1;
            }
        }

        Self {
            summary: SummaryTotals {
                scanned_files: files.len(),
                files_with_errors,
                files_with_warnings,
                files_with_optimizing,
                violation_totals: totals,
            },
            files,
            notifications,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::reporter::{Suggestion, ViolationRecord};
    use crate::rule::Tag;

    fn file_with(severity: Severity) -> FileScanResult {
        let mut counts = crate::reporter::SeverityCounts::default();
        match severity {
            Severity::Error => counts.error = 1,
            Severity::Warning => counts.warning = 1,
            Severity::Optimizing => counts.optimizing = 1,
        }
        FileScanResult {
            file_path: PathBuf::from("a.ts"),
            severity_counts: counts,
            total_violations: 1,
            error_violations: if severity == Severity::Error { 1 } else { 0 },
            violations: vec![ViolationRecord {
                tag: Tag::Base,
                rule_name: "r".to_string(),
                severity,
                message: "m".to_string(),
                line: None,
                code: None,
                suggestions: vec![Suggestion::new("s")],
            }],
        }
    }

    #[test]
    fn aggregates_totals_across_files() {
        let files = vec![file_with(Severity::Error), file_with(Severity::Warning)];
        let summary = ScanSummary::from_files(files, Vec::new());
        assert_eq!(summary.summary.violation_totals.total, 2);
        assert_eq!(summary.summary.violation_totals.error, 1);
        assert_eq!(summary.summary.violation_totals.warning, 1);
        assert_eq!(summary.summary.files_with_errors, 1);
        assert_eq!(summary.summary.files_with_warnings, 1);
    }

    #[test]
    fn error_violations_matches_error_severity_count() {
        let file = file_with(Severity::Error);
        assert_eq!(
            file.error_violations,
            file.violations.iter().filter(|v| v.severity == Severity::Error).count()
        );
    }
}
