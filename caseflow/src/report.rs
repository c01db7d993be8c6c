//! Aggregate run reports and rendering.
//!
//! A [`RunReport`] is constructed once from the final per-file reports and
//! is immutable afterwards. It serializes to a single JSON document and
//! renders a tabulated text summary; both are written into the run's log
//! directory.

use crate::core::RunStatus;
use crate::errors::CaseflowError;
use crate::suite::FileReport;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

/// One failed or skipped test case, as shown in the summary table.
#[derive(Debug, Clone, Serialize)]
pub struct FailedCase {
    /// Fully-qualified case name.
    pub full_name: String,
    /// The captured error text, or the skip reason.
    pub reason: String,
}

/// The aggregate result of one harness run.
#[derive(Debug, Serialize)]
pub struct RunReport {
    /// Unique identifier of this run.
    pub run_id: Uuid,
    /// Number of test cases across all files.
    pub total: usize,
    /// Number of passed cases.
    pub passed: usize,
    /// Number of failed cases.
    pub failed: usize,
    /// Number of cases that never ran.
    pub skipped: usize,
    /// Wall-clock start of the run.
    pub start_time: DateTime<Utc>,
    /// Wall-clock end of the run.
    pub end_time: DateTime<Utc>,
    /// Elapsed time in milliseconds.
    pub duration_ms: f64,
    /// The run's log directory.
    pub log_dir: PathBuf,
    /// Every failed or skipped case with its reason.
    pub failed_cases: Vec<FailedCase>,
    /// Cleanup failures that did not change any verdict.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cleanup_warnings: Vec<String>,
    /// Per-file reports.
    pub files: Vec<FileReport>,
}

impl RunReport {
    /// Derives the aggregate report from the final per-file states.
    #[must_use]
    pub fn from_files(
        run_id: Uuid,
        files: Vec<FileReport>,
        log_dir: PathBuf,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        let mut total = 0;
        let mut passed = 0;
        let mut failed = 0;
        let mut skipped = 0;
        let mut failed_cases = Vec::new();
        let mut cleanup_warnings = Vec::new();

        for file in &files {
            for case in &file.cases {
                total += 1;
                match case.status {
                    RunStatus::Passed => passed += 1,
                    RunStatus::Failed => {
                        failed += 1;
                        failed_cases.push(FailedCase {
                            full_name: case.full_name.clone(),
                            reason: case.failure_reason(),
                        });
                    }
                    RunStatus::Skipped | RunStatus::Unset => {
                        skipped += 1;
                        failed_cases.push(FailedCase {
                            full_name: case.full_name.clone(),
                            reason: case.failure_reason(),
                        });
                    }
                }
                cleanup_warnings.extend(case.cleanup_warnings.iter().cloned());
            }
            // module-level cleanup failures never belong to a single case
            for record in &file.module_stages {
                if record.role.is_cleanup() && record.status.is_failure() {
                    let first_line = record
                        .error
                        .as_deref()
                        .and_then(|e| e.lines().next())
                        .unwrap_or("unknown error");
                    cleanup_warnings.push(format!("{} {} failed: {first_line}", record.role, record.name));
                }
            }
        }

        Self {
            run_id,
            total,
            passed,
            failed,
            skipped,
            start_time,
            end_time,
            duration_ms: (end_time - start_time).num_microseconds().unwrap_or(0) as f64 / 1000.0,
            log_dir,
            failed_cases,
            cleanup_warnings,
            files,
        }
    }

    /// Returns true if every case passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed == 0 && self.skipped == 0
    }

    /// Writes the JSON document to `report.json` under the log directory.
    pub fn write_json(&self) -> Result<PathBuf, CaseflowError> {
        let path = self.log_dir.join("report.json");
        let doc = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, doc)?;
        Ok(path)
    }

    /// Writes the text summary to `summary.txt` under the log directory.
    pub fn write_summary(&self) -> Result<PathBuf, CaseflowError> {
        let path = self.log_dir.join("summary.txt");
        std::fs::write(&path, self.render_summary())?;
        Ok(path)
    }

    /// Renders the tabulated text summary.
    #[must_use]
    pub fn render_summary(&self) -> String {
        let mut out = format!(
            "Total: {}, Passed: {}, Failed: {}, Skipped: {}\n",
            self.total, self.passed, self.failed, self.skipped
        );
        out.push_str(&format!(
            "Start Time: {}, End Time: {}\n",
            self.start_time.format("%Y-%m-%d %H:%M:%S"),
            self.end_time.format("%Y-%m-%d %H:%M:%S")
        ));
        out.push_str(&format!(
            "Duration: {:.3} secs\n\n",
            self.duration_ms / 1000.0
        ));

        out.push_str("Failed/Skipped Test Cases:\n");
        let rows: Vec<Vec<String>> = self
            .failed_cases
            .iter()
            .map(|case| {
                vec![
                    case.full_name.clone(),
                    case.reason.lines().next().unwrap_or("").to_string(),
                ]
            })
            .collect();
        out.push_str(&render_table(&["Test Case", "Reason"], &rows));

        if !self.cleanup_warnings.is_empty() {
            out.push_str("\nCleanup Warnings:\n");
            for warning in &self.cleanup_warnings {
                out.push_str(&format!("  - {warning}\n"));
            }
        }
        out
    }
}

/// Renders a grid-bordered text table.
#[must_use]
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let columns = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (idx, cell) in row.iter().take(columns).enumerate() {
            widths[idx] = widths[idx].max(cell.len());
        }
    }

    let border = |fill: char| {
        let mut line = String::from("+");
        for width in &widths {
            line.push_str(&fill.to_string().repeat(width + 2));
            line.push('+');
        }
        line.push('\n');
        line
    };
    let render_row = |cells: &[String]| {
        let mut line = String::from("|");
        for (idx, &width) in widths.iter().enumerate() {
            let cell = cells.get(idx).map_or("", String::as_str);
            line.push_str(&format!(" {cell:<width$} |"));
        }
        line.push('\n');
        line
    };

    let header_cells: Vec<String> = headers.iter().map(|h| (*h).to_string()).collect();
    let mut out = border('-');
    out.push_str(&render_row(&header_cells));
    out.push_str(&border('='));
    for row in rows {
        out.push_str(&render_row(row));
        out.push_str(&border('-'));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::CaseReport;
    use crate::core::RunStatus;

    fn case(full_name: &str, status: RunStatus, error: Option<&str>) -> CaseReport {
        CaseReport {
            name: full_name.rsplit('.').next().unwrap_or(full_name).to_string(),
            full_name: full_name.to_string(),
            description: None,
            status,
            error: error.map(str::to_string),
            output: None,
            stages: Vec::new(),
            cleanup_warnings: Vec::new(),
            start_time: None,
            end_time: None,
            duration_ms: 0.0,
            log_file: PathBuf::new(),
        }
    }

    fn file_report(cases: Vec<CaseReport>) -> FileReport {
        let now = Utc::now();
        FileReport {
            path: PathBuf::from("tests/feature1"),
            scope: "feature1".to_string(),
            args: crate::context::ArgMap::new(),
            log_dir: PathBuf::from("logs/feature1"),
            module_stages: Vec::new(),
            cases,
            start_time: now,
            end_time: now,
            duration_ms: 0.0,
        }
    }

    fn report(cases: Vec<CaseReport>) -> RunReport {
        let now = Utc::now();
        RunReport::from_files(
            Uuid::new_v4(),
            vec![file_report(cases)],
            PathBuf::from("logs"),
            now,
            now,
        )
    }

    #[test]
    fn test_counts() {
        let report = report(vec![
            case("feature1.test_case1", RunStatus::Passed, None),
            case("feature1.test_case2", RunStatus::Failed, Some("assertion failed")),
            case("feature1.test_case3", RunStatus::Skipped, None),
        ]);

        assert_eq!(report.total, 3);
        assert_eq!(report.passed, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.skipped, 1);
        assert!(!report.all_passed());
        assert_eq!(report.failed_cases.len(), 2);
        assert_eq!(report.failed_cases[1].reason, "Skipped");
    }

    #[test]
    fn test_summary_lists_failures() {
        let report = report(vec![
            case("feature1.test_case1", RunStatus::Passed, None),
            case("feature1.test_case2", RunStatus::Failed, Some("checked sum 2+3")),
        ]);

        let summary = report.render_summary();
        assert!(summary.contains("Total: 2, Passed: 1, Failed: 1, Skipped: 0"));
        assert!(summary.contains("feature1.test_case2"));
        assert!(summary.contains("checked sum 2+3"));
    }

    #[test]
    fn test_json_round_trips_counts() {
        let report = report(vec![case("feature1.test_case1", RunStatus::Passed, None)]);
        let doc = serde_json::to_value(&report).unwrap();

        assert_eq!(doc["total"], 1);
        assert_eq!(doc["passed"], 1);
        assert_eq!(doc["files"][0]["scope"], "feature1");
        assert_eq!(doc["files"][0]["cases"][0]["status"], "passed");
    }

    #[test]
    fn test_render_table_alignment() {
        let table = render_table(
            &["Id", "TestCase"],
            &[vec!["1".to_string(), "feature1.test_case1".to_string()]],
        );

        let lines: Vec<&str> = table.lines().collect();
        assert!(lines[0].starts_with("+--"));
        assert!(lines[1].contains("| Id"));
        assert!(lines[2].starts_with("+=="));
        assert!(lines[3].contains("feature1.test_case1"));
        // every border row has the same width
        assert_eq!(lines[0].len(), lines[2].len());
        assert_eq!(lines[0].len(), lines[4].len());
    }

    #[test]
    fn test_writes_report_files() {
        let tmp = tempfile::tempdir().unwrap();
        let now = Utc::now();
        let report = RunReport::from_files(
            Uuid::new_v4(),
            vec![file_report(vec![case(
                "feature1.test_case1",
                RunStatus::Passed,
                None,
            )])],
            tmp.path().to_path_buf(),
            now,
            now,
        );

        let json_path = report.write_json().unwrap();
        let summary_path = report.write_summary().unwrap();

        assert!(json_path.exists());
        let doc: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(json_path).unwrap()).unwrap();
        assert_eq!(doc["total"], 1);
        assert!(std::fs::read_to_string(summary_path)
            .unwrap()
            .contains("Total: 1"));
    }
}
