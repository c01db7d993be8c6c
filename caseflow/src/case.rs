//! Test case assembly and the staged execution engine.
//!
//! One test case runs as a five-step state machine: framework case setup,
//! file case setup, the test function, then both cleanups. Each setup gates
//! the next step through [`StageRunner`]'s gate table; cleanups always run.

use crate::caselog::CaseLogger;
use crate::context::{ArgMap, CaseContext, SetupOutputs};
use crate::core::{RunStatus, StageRecord, StageRole};
use crate::runner::StageRunner;
use crate::stage::Stage;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The four optional companion stages around one test case.
///
/// An explicit capability record: a hook a file or framework did not supply
/// is `None`, and the engine never probes for hooks by name at run time.
#[derive(Debug, Clone, Default)]
pub struct CaseHooks {
    /// Framework setup, run first.
    pub framework_case_setup: Option<Stage>,
    /// File-level setup shared by the file's test cases.
    pub test_case_setup: Option<Stage>,
    /// Framework cleanup, run last.
    pub framework_case_cleanup: Option<Stage>,
    /// File-level cleanup shared by the file's test cases.
    pub test_case_cleanup: Option<Stage>,
}

/// A test function together with its companion hooks and the module-level
/// outputs its parent file captured before this case started.
#[derive(Debug, Clone)]
pub struct TestCase {
    stage: Stage,
    hooks: CaseHooks,
    framework_module_output: Option<serde_json::Value>,
    test_module_output: Option<serde_json::Value>,
    args: Arc<ArgMap>,
}

impl TestCase {
    /// Creates a test case around a test function stage.
    #[must_use]
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            hooks: CaseHooks::default(),
            framework_module_output: None,
            test_module_output: None,
            args: Arc::new(ArgMap::new()),
        }
    }

    /// Attaches the companion hooks.
    #[must_use]
    pub fn with_hooks(mut self, hooks: CaseHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Populates the module-level output slots.
    #[must_use]
    pub fn with_module_outputs(
        mut self,
        framework_module: Option<serde_json::Value>,
        test_module: Option<serde_json::Value>,
    ) -> Self {
        self.framework_module_output = framework_module;
        self.test_module_output = test_module;
        self
    }

    /// Attaches the file-scoped argument map.
    #[must_use]
    pub fn with_args(mut self, args: Arc<ArgMap>) -> Self {
        self.args = args;
        self
    }

    /// The underlying test function stage.
    #[must_use]
    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    /// Runs the full setup/test/cleanup chain, logging to a fresh file
    /// under `log_dir`, and returns the case's report.
    pub async fn run(&self, log_dir: &Path) -> CaseReport {
        let start_time = Utc::now();
        let logger = Arc::new(CaseLogger::create(log_dir, self.stage.name()));
        let full_name = self.stage.full_name();
        logger.info(format!("Start Test Case {full_name}"));

        let mut runner = StageRunner::new();
        let mut setups = SetupOutputs {
            framework_module_setup: self.framework_module_output.clone(),
            test_module_setup: self.test_module_output.clone(),
            ..SetupOutputs::default()
        };
        let base_ctx =
            CaseContext::new(self.stage.id().clone(), logger.clone(), self.args.clone());
        let mut records: Vec<StageRecord> = Vec::new();

        // 1. framework case setup (gate G1)
        let ctx = base_ctx.clone().with_setups(setups.clone());
        let (output, record) = runner
            .run_stage(
                self.hooks.framework_case_setup.as_ref(),
                StageRole::FrameworkCaseSetup,
                None,
                Some(StageRole::FrameworkCaseSetup),
                &ctx,
            )
            .await;
        setups.framework_case_setup = output;
        records.extend(record);

        // 2. file-level case setup (gated on G1, sets G2)
        let ctx = base_ctx.clone().with_setups(setups.clone());
        let (output, record) = runner
            .run_stage(
                self.hooks.test_case_setup.as_ref(),
                StageRole::TestCaseSetup,
                Some(StageRole::FrameworkCaseSetup),
                Some(StageRole::TestCaseSetup),
                &ctx,
            )
            .await;
        setups.test_case_setup = output;
        records.extend(record);

        // 3. the test function (gated on G2; never gates cleanups)
        let ctx = base_ctx.clone().with_setups(setups);
        let (case_output, record) = runner
            .run_stage(
                Some(&self.stage),
                StageRole::Function,
                Some(StageRole::TestCaseSetup),
                None,
                &ctx,
            )
            .await;
        records.extend(record);

        // 4–5. cleanups always run; they see no setup outputs
        let cleanup_ctx = base_ctx;
        let (_, record) = runner
            .run_stage(
                self.hooks.test_case_cleanup.as_ref(),
                StageRole::TestCaseCleanup,
                None,
                None,
                &cleanup_ctx,
            )
            .await;
        records.extend(record);
        let (_, record) = runner
            .run_stage(
                self.hooks.framework_case_cleanup.as_ref(),
                StageRole::FrameworkCaseCleanup,
                None,
                None,
                &cleanup_ctx,
            )
            .await;
        records.extend(record);

        let status = if runner.case_failed() {
            RunStatus::Failed
        } else {
            RunStatus::Passed
        };
        let end_time = Utc::now();
        logger.info(format!("End Test Case {full_name}, Status {status}"));

        CaseReport {
            name: self.stage.name().to_string(),
            full_name,
            description: self.stage.description().map(str::to_string),
            status,
            error: runner.error().map(str::to_string),
            output: case_output,
            stages: records,
            cleanup_warnings: runner.into_warnings(),
            start_time: Some(start_time),
            end_time: Some(end_time),
            duration_ms: (end_time - start_time).num_microseconds().unwrap_or(0) as f64 / 1000.0,
            log_file: logger.path().to_path_buf(),
        }
    }
}

/// The immutable result of one test case invocation.
#[derive(Debug, Clone, Serialize)]
pub struct CaseReport {
    /// The function name.
    pub name: String,
    /// The fully-qualified `scope.name`.
    pub full_name: String,
    /// The captured free-text description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The overall verdict.
    pub status: RunStatus,
    /// The first captured error, if the case failed or was skipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// The opaque output returned by the test function.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    /// Records of every stage that ran (or was skipped) in this chain.
    pub stages: Vec<StageRecord>,
    /// Cleanup failures that did not change the verdict.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cleanup_warnings: Vec<String>,
    /// Wall-clock start of the chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    /// Wall-clock end of the chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Elapsed time in milliseconds.
    pub duration_ms: f64,
    /// The per-case log file.
    pub log_file: PathBuf,
}

impl CaseReport {
    /// Builds the report for a case that never started because a
    /// module-level setup did not pass.
    #[must_use]
    pub fn skipped(stage: &Stage, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            name: stage.name().to_string(),
            full_name: stage.full_name(),
            description: stage.description().map(str::to_string),
            status: RunStatus::Skipped,
            error: Some(reason),
            output: None,
            stages: Vec::new(),
            cleanup_warnings: Vec::new(),
            start_time: None,
            end_time: None,
            duration_ms: 0.0,
            log_file: PathBuf::new(),
        }
    }

    /// Returns true if the case passed.
    #[must_use]
    pub fn is_passed(&self) -> bool {
        self.status.is_passed()
    }

    /// The reason shown in the failed/skipped table.
    #[must_use]
    pub fn failure_reason(&self) -> String {
        self.error.clone().unwrap_or_else(|| "Skipped".to_string())
    }
}
