//! Single-stage execution with precondition gating.
//!
//! The runner owns the skip-on-failure rule: every stage invocation is
//! reduced to a [`StageRecord`] value, and downstream stages consult the
//! [`Gates`] table instead of catching anything. No unwinding crosses a
//! stage boundary; panics are caught at the body edge and converted to
//! failed records.

use crate::context::CaseContext;
use crate::core::{RunStatus, StageRecord, StageRole};
use crate::stage::Stage;
use chrono::Utc;
use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

/// The precondition gate table.
///
/// Setup stages record their verdict under their own role; dependents name
/// that role as their precondition. A role that was never recorded counts
/// as passing: an absent optional hook must not block its dependents.
#[derive(Debug, Clone, Default)]
pub struct Gates {
    states: HashMap<StageRole, RunStatus>,
}

impl Gates {
    /// Creates an empty gate table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a verdict for a gate.
    pub fn record(&mut self, role: StageRole, status: RunStatus) {
        self.states.insert(role, status);
    }

    /// Returns the recorded verdict for a gate, if any.
    #[must_use]
    pub fn get(&self, role: StageRole) -> Option<RunStatus> {
        self.states.get(&role).copied()
    }

    /// Returns true if the gate passed or was never recorded.
    #[must_use]
    pub fn is_passed(&self, role: StageRole) -> bool {
        self.states.get(&role).map_or(true, RunStatus::is_passed)
    }
}

/// Executes stages one at a time for a single test case (or a single test
/// file's module stages), tracking gates and the owning unit's verdict.
#[derive(Debug, Default)]
pub struct StageRunner {
    gates: Gates,
    failed: bool,
    error: Option<String>,
    warnings: Vec<String>,
}

impl StageRunner {
    /// Creates a fresh runner with empty gates.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs one stage under `role`, gated on `pre`, recording under `post`.
    ///
    /// Returns the stage's opaque output and its run record. An absent
    /// stage returns `(None, None)` without touching the gate table. A
    /// stage whose precondition did not pass is recorded as skipped, its
    /// postcondition gate is recorded as skipped, and (unless it is a
    /// cleanup) the owning unit is marked failed: a skipped prerequisite
    /// is not silently ignored.
    pub async fn run_stage(
        &mut self,
        stage: Option<&Stage>,
        role: StageRole,
        pre: Option<StageRole>,
        post: Option<StageRole>,
        ctx: &CaseContext,
    ) -> (Option<serde_json::Value>, Option<StageRecord>) {
        let Some(stage) = stage else {
            return (None, None);
        };

        let info = if *stage.id() == *ctx.case() {
            format!("{role} {}", stage.full_name())
        } else {
            // a shared helper (setup/cleanup) running on behalf of this case
            format!("{role} helper {} for {}", stage.full_name(), ctx.full_name())
        };

        tracing::info!(stage = %stage.full_name(), role = %role, "----Running {info}");
        ctx.logger().info(format!("Running {info}"));

        if let Some(pre_role) = pre {
            if !self.gates.is_passed(pre_role) {
                let notice = format!("Skipping {info} as pre-condition {pre_role} failed/skipped");
                tracing::info!(stage = %stage.full_name(), role = %role, "----{notice}");
                ctx.logger().info(&notice);

                if !role.is_cleanup() {
                    self.failed = true;
                    if self.error.is_none() {
                        self.error =
                            Some(format!("{role} skipped: pre-condition {pre_role} did not pass"));
                    }
                }
                if let Some(post_role) = post {
                    self.gates.record(post_role, RunStatus::Skipped);
                }

                let record = StageRecord::skipped(
                    role,
                    stage.full_name(),
                    format!("pre-condition {pre_role} did not pass"),
                );
                ctx.logger().info(format!("Completed {info}"));
                tracing::info!(stage = %stage.full_name(), role = %role, "----Completed {info}");
                return (None, Some(record));
            }
        }

        let stage_ctx = ctx.clone().with_extra_args(stage.extra_args().to_vec());
        let start_time = Utc::now();
        let started = Instant::now();

        let outcome = AssertUnwindSafe(stage.body().run(&stage_ctx))
            .catch_unwind()
            .await;

        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
        let end_time = Utc::now();

        let mut record = StageRecord {
            role,
            name: stage.full_name(),
            status: RunStatus::Unset,
            error: None,
            skip_reason: None,
            output: None,
            start_time: Some(start_time),
            end_time: Some(end_time),
            duration_ms,
        };

        let output = match outcome {
            Ok(Ok(output)) => {
                record.status = RunStatus::Passed;
                record.output = output.clone();
                if let Some(post_role) = post {
                    self.gates.record(post_role, RunStatus::Passed);
                }
                output
            }
            Ok(Err(err)) => {
                self.record_failure(&mut record, role, &info, post, format!("{err:?}"));
                None
            }
            Err(payload) => {
                self.record_failure(&mut record, role, &info, post, panic_message(&payload));
                None
            }
        };

        ctx.logger().info(format!("Completed {info}"));
        tracing::info!(stage = %stage.full_name(), role = %role, "----Completed {info}");
        (output, Some(record))
    }

    fn record_failure(
        &mut self,
        record: &mut StageRecord,
        role: StageRole,
        info: &str,
        post: Option<StageRole>,
        error_text: String,
    ) {
        tracing::error!(role = %role, error = %error_text, "stage failed");
        if let Some(post_role) = post {
            self.gates.record(post_role, RunStatus::Failed);
        }
        if role.is_cleanup() {
            let first_line = error_text.lines().next().unwrap_or("unknown error");
            self.warnings
                .push(format!("{role} {} failed: {first_line}", record.name));
        } else {
            self.failed = true;
            if self.error.is_none() {
                self.error = Some(error_text.clone());
            }
        }
        record.status = RunStatus::Failed;
        record.error = Some(error_text);
    }

    /// Returns the gate table.
    #[must_use]
    pub fn gates(&self) -> &Gates {
        &self.gates
    }

    /// Returns true if any non-cleanup stage failed or was skipped.
    #[must_use]
    pub fn case_failed(&self) -> bool {
        self.failed
    }

    /// The first captured error, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Cleanup failures recorded during this invocation.
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Consumes the runner, returning the cleanup warnings.
    #[must_use]
    pub fn into_warnings(self) -> Vec<String> {
        self.warnings
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("stage panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("stage panicked: {s}")
    } else {
        "stage panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::Stage;

    fn ctx() -> CaseContext {
        crate::testing::context("feature1", "test_case1")
    }

    fn passing(name: &str, output: serde_json::Value) -> Stage {
        Stage::from_fn("feature1", name, move |_ctx| Ok(Some(output.clone())))
    }

    fn failing(name: &str) -> Stage {
        Stage::from_fn("feature1", name, |_ctx| Err(anyhow::anyhow!("boom")))
    }

    #[tokio::test]
    async fn test_absent_stage_is_noop() {
        let mut runner = StageRunner::new();
        let (output, record) = runner
            .run_stage(
                None,
                StageRole::FrameworkCaseSetup,
                None,
                Some(StageRole::FrameworkCaseSetup),
                &ctx(),
            )
            .await;

        assert!(output.is_none());
        assert!(record.is_none());
        // the gate was never recorded, so dependents still pass
        assert!(runner.gates().is_passed(StageRole::FrameworkCaseSetup));
        assert!(!runner.case_failed());
    }

    #[tokio::test]
    async fn test_passing_stage_records_gate_and_output() {
        let mut runner = StageRunner::new();
        let stage = passing("test_case_setup", serde_json::json!({"ready": true}));

        let (output, record) = runner
            .run_stage(
                Some(&stage),
                StageRole::TestCaseSetup,
                Some(StageRole::FrameworkCaseSetup),
                Some(StageRole::TestCaseSetup),
                &ctx(),
            )
            .await;

        assert_eq!(output, Some(serde_json::json!({"ready": true})));
        let record = record.unwrap();
        assert_eq!(record.status, RunStatus::Passed);
        assert!(record.start_time.is_some());
        assert_eq!(runner.gates().get(StageRole::TestCaseSetup), Some(RunStatus::Passed));
        assert!(!runner.case_failed());
    }

    #[tokio::test]
    async fn test_failed_precondition_skips_body() {
        let mut runner = StageRunner::new();
        runner.gates.record(StageRole::FrameworkCaseSetup, RunStatus::Failed);

        let stage = passing("test_case_setup", serde_json::json!(1));
        let (output, record) = runner
            .run_stage(
                Some(&stage),
                StageRole::TestCaseSetup,
                Some(StageRole::FrameworkCaseSetup),
                Some(StageRole::TestCaseSetup),
                &ctx(),
            )
            .await;

        assert!(output.is_none());
        let record = record.unwrap();
        assert_eq!(record.status, RunStatus::Skipped);
        assert!(record.skip_reason.unwrap().contains("framework_case_setup"));
        // the skip cascades: this stage's own gate is now skipped too
        assert_eq!(runner.gates().get(StageRole::TestCaseSetup), Some(RunStatus::Skipped));
        assert!(runner.case_failed());
    }

    #[tokio::test]
    async fn test_failing_stage_captures_error_chain() {
        let mut runner = StageRunner::new();
        let stage = failing("test_case1");

        let (output, record) = runner
            .run_stage(
                Some(&stage),
                StageRole::Function,
                Some(StageRole::TestCaseSetup),
                None,
                &ctx(),
            )
            .await;

        assert!(output.is_none());
        let record = record.unwrap();
        assert_eq!(record.status, RunStatus::Failed);
        assert!(record.error.unwrap().contains("boom"));
        assert!(runner.case_failed());
        assert!(runner.error().unwrap().contains("boom"));
    }

    #[tokio::test]
    async fn test_panicking_stage_is_captured() {
        let mut runner = StageRunner::new();
        let stage = Stage::from_fn("feature1", "test_case2", |_ctx| {
            assert_eq!(2 + 3, 4, "checked sum");
            Ok(None)
        });

        let (_, record) = runner
            .run_stage(Some(&stage), StageRole::Function, None, None, &ctx())
            .await;

        let record = record.unwrap();
        assert_eq!(record.status, RunStatus::Failed);
        let error = record.error.unwrap();
        assert!(error.contains("panicked"));
        assert!(error.contains("checked sum"));
    }

    #[tokio::test]
    async fn test_cleanup_failure_becomes_warning() {
        let mut runner = StageRunner::new();
        let stage = failing("test_case_cleanup");

        let (_, record) = runner
            .run_stage(Some(&stage), StageRole::TestCaseCleanup, None, None, &ctx())
            .await;

        assert_eq!(record.unwrap().status, RunStatus::Failed);
        assert!(!runner.case_failed());
        assert_eq!(runner.warnings().len(), 1);
        assert!(runner.warnings()[0].contains("test_case_cleanup"));
    }

    #[tokio::test]
    async fn test_declared_extra_args_reach_the_body() {
        let mut runner = StageRunner::new();
        let stage = Stage::from_fn("framework", "framework_case_setup", |ctx| {
            Ok(Some(serde_json::json!(ctx.extra_args())))
        })
        .with_extra_args(vec![serde_json::json!("topo-a"), serde_json::json!(7)]);

        let (output, _) = runner
            .run_stage(
                Some(&stage),
                StageRole::FrameworkCaseSetup,
                None,
                Some(StageRole::FrameworkCaseSetup),
                &ctx(),
            )
            .await;

        assert_eq!(output, Some(serde_json::json!(["topo-a", 7])));
    }

    #[test]
    fn test_gates_default_to_passing() {
        let gates = Gates::new();
        assert!(gates.is_passed(StageRole::FrameworkModuleSetup));
        assert!(gates.get(StageRole::FrameworkModuleSetup).is_none());
    }
}
