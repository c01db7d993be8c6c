//! Per-invocation stage run records.

use super::{RunStatus, StageRole};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The record of one stage invocation.
///
/// A `StageRecord` is produced exactly once per invocation by the stage
/// runner and is immutable afterwards. Skip decisions travel through these
/// values rather than through unwinding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRecord {
    /// The role the stage ran under.
    pub role: StageRole,

    /// Fully-qualified name of the stage that ran (or was skipped).
    pub name: String,

    /// The verdict of this invocation.
    pub status: RunStatus,

    /// Formatted error chain (for failed invocations).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Why the stage was skipped (for skipped invocations).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,

    /// The opaque output value returned by the body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,

    /// Wall-clock start of the invocation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,

    /// Wall-clock end of the invocation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,

    /// Elapsed time in milliseconds (zero for skipped stages).
    pub duration_ms: f64,
}

impl StageRecord {
    /// Creates a record for a stage that was skipped without running.
    #[must_use]
    pub fn skipped(role: StageRole, name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            role,
            name: name.into(),
            status: RunStatus::Skipped,
            error: None,
            skip_reason: Some(reason.into()),
            output: None,
            start_time: None,
            end_time: None,
            duration_ms: 0.0,
        }
    }

    /// Returns true if this invocation passed.
    #[must_use]
    pub fn is_passed(&self) -> bool {
        self.status.is_passed()
    }

    /// Returns true if this invocation failed.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.status.is_failure()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skipped_record() {
        let record = StageRecord::skipped(
            StageRole::TestCaseSetup,
            "feature1.test_case_setup",
            "framework_case_setup did not pass",
        );

        assert_eq!(record.status, RunStatus::Skipped);
        assert!(record.skip_reason.is_some());
        assert!(record.error.is_none());
        assert_eq!(record.duration_ms, 0.0);
        assert!(!record.is_passed());
        assert!(!record.is_failure());
    }

    #[test]
    fn test_record_serialization_skips_empty_fields() {
        let record = StageRecord::skipped(StageRole::Function, "f.test_x", "gate failed");
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["status"], "skipped");
        assert_eq!(json["role"], "function");
        assert!(json.get("error").is_none());
        assert!(json.get("output").is_none());
        assert!(json.get("start_time").is_none());
    }
}
