//! Test files and the suite controller.
//!
//! The controller runs one file at a time: framework module setup, file
//! module setup, every test case in declaration order, then both module
//! cleanups unconditionally. Module-level setups gate everything beneath
//! them; a file whose module setup did not pass records all of its test
//! cases as skipped so the report can enumerate them.

use crate::case::{CaseHooks, CaseReport, TestCase};
use crate::caselog::CaseLogger;
use crate::context::{ArgMap, CaseContext, ScopedDir, SetupOutputs};
use crate::core::{StageRecord, StageRole};
use crate::errors::CaseflowError;
use crate::hooks::FrameworkHooks;
use crate::registry::ArgSpec;
use crate::report::RunReport;
use crate::runner::StageRunner;
use crate::stage::Stage;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// The optional module-level hooks of one test file.
#[derive(Debug, Clone, Default)]
pub struct ModuleHooks {
    /// Run once before the file's test cases.
    pub test_module_setup: Option<Stage>,
    /// Run once after the file's test cases.
    pub test_module_cleanup: Option<Stage>,
}

/// A loaded test file: an ordered collection of test cases sharing
/// module- and case-level hooks.
///
/// Built by [`crate::registry::TestFileBuilder`]; case order is declaration
/// order and is stable across runs.
#[derive(Debug, Clone)]
pub struct TestFile {
    pub(crate) path: PathBuf,
    pub(crate) scope: String,
    pub(crate) cases: Vec<Stage>,
    pub(crate) module_hooks: ModuleHooks,
    pub(crate) case_setup: Option<Stage>,
    pub(crate) case_cleanup: Option<Stage>,
    pub(crate) args: Arc<ArgMap>,
    pub(crate) arg_specs: Vec<ArgSpec>,
}

impl TestFile {
    /// The path the file was registered under.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The file scope used to qualify stage names.
    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// The test cases in declaration order (special hooks excluded).
    #[must_use]
    pub fn cases(&self) -> &[Stage] {
        &self.cases
    }

    /// The argument flags this file declares.
    #[must_use]
    pub fn arg_specs(&self) -> &[ArgSpec] {
        &self.arg_specs
    }

    /// The file-scoped argument map.
    #[must_use]
    pub fn args(&self) -> &Arc<ArgMap> {
        &self.args
    }

    /// Replaces the file-scoped argument map.
    pub fn set_args(&mut self, args: Arc<ArgMap>) {
        self.args = args;
    }
}

/// Aggregate record of one test file's run.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    /// The path the file was registered under.
    pub path: PathBuf,
    /// The file scope.
    pub scope: String,
    /// The file-scoped arguments it ran with.
    pub args: ArgMap,
    /// The file's log directory.
    pub log_dir: PathBuf,
    /// Records of the module-level stages, in execution order.
    pub module_stages: Vec<StageRecord>,
    /// Per-case reports, in declaration order.
    pub cases: Vec<CaseReport>,
    /// Wall-clock start of the file.
    pub start_time: DateTime<Utc>,
    /// Wall-clock end of the file.
    pub end_time: DateTime<Utc>,
    /// Elapsed time in milliseconds.
    pub duration_ms: f64,
}

/// Runs a collection of test files sequentially and aggregates the report.
#[derive(Debug, Default)]
pub struct SuiteRunner {
    framework: FrameworkHooks,
}

impl SuiteRunner {
    /// Creates a controller with no framework hooks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches the run-wide framework hooks.
    #[must_use]
    pub fn with_framework(mut self, framework: FrameworkHooks) -> Self {
        self.framework = framework;
        self
    }

    /// Runs every file in order and returns the aggregate report.
    ///
    /// Per-test failures never abort the run; only IO failures around the
    /// log directory surface as errors, before any stage has run.
    pub async fn run(
        &self,
        files: &[TestFile],
        log_dir: &Path,
    ) -> Result<RunReport, CaseflowError> {
        std::fs::create_dir_all(log_dir)?;
        let log_dir = log_dir.canonicalize()?;
        let start_time = Utc::now();
        let mut file_reports = Vec::with_capacity(files.len());

        for file in files {
            tracing::info!(file = %file.path.display(), "Planning to run {}", file.path.display());
            file_reports.push(self.run_file(file, &log_dir).await);
            tracing::info!(file = %file.path.display(), "Completed running {}", file.path.display());
        }

        let end_time = Utc::now();
        Ok(RunReport::from_files(
            Uuid::new_v4(),
            file_reports,
            log_dir,
            start_time,
            end_time,
        ))
    }

    async fn run_file(&self, file: &TestFile, run_log_dir: &Path) -> FileReport {
        let file_log_dir = run_log_dir.join(&file.scope);
        let start_time = Utc::now();

        // scope the process-wide working directory to this file
        let _dir_guard = file
            .path
            .parent()
            .filter(|dir| dir.is_dir())
            .and_then(|dir| match ScopedDir::enter(dir) {
                Ok(guard) => Some(guard),
                Err(err) => {
                    tracing::warn!(dir = %dir.display(), error = %err, "could not enter file directory");
                    None
                }
            });

        let mut module_runner = StageRunner::new();
        let mut module_stages: Vec<StageRecord> = Vec::new();

        // (a) framework module setup, once per file
        let framework_module_output = self
            .run_module_stage(
                &mut module_runner,
                self.framework.module_setup.as_ref(),
                StageRole::FrameworkModuleSetup,
                None,
                &file_log_dir,
                SetupOutputs::default(),
                self.framework.args.clone(),
                &mut module_stages,
            )
            .await;

        // (b) file module setup, gated on (a)
        let test_module_output = self
            .run_module_stage(
                &mut module_runner,
                file.module_hooks.test_module_setup.as_ref(),
                StageRole::TestModuleSetup,
                Some(StageRole::FrameworkModuleSetup),
                &file_log_dir,
                SetupOutputs {
                    framework_module_setup: framework_module_output.clone(),
                    ..SetupOutputs::default()
                },
                file.args.clone(),
                &mut module_stages,
            )
            .await;

        // (c) every test case in declaration order, or a skip record for
        // each if a module setup did not pass
        let gated_reason = if !module_runner.gates().is_passed(StageRole::FrameworkModuleSetup) {
            Some("framework_module_setup did not pass")
        } else if !module_runner.gates().is_passed(StageRole::TestModuleSetup) {
            Some("test_module_setup did not pass")
        } else {
            None
        };

        let mut cases = Vec::with_capacity(file.cases.len());
        for stage in &file.cases {
            if let Some(reason) = gated_reason {
                tracing::info!(case = %stage.full_name(), "--Skipping test_case {} from {}", stage.name(), file.path.display());
                cases.push(CaseReport::skipped(stage, reason));
                continue;
            }

            tracing::info!(case = %stage.full_name(), "--Running test_case {} from {}", stage.name(), file.path.display());
            let case = TestCase::new(stage.clone())
                .with_hooks(CaseHooks {
                    framework_case_setup: self.framework.case_setup.clone(),
                    test_case_setup: file.case_setup.clone(),
                    framework_case_cleanup: self.framework.case_cleanup.clone(),
                    test_case_cleanup: file.case_cleanup.clone(),
                })
                .with_module_outputs(framework_module_output.clone(), test_module_output.clone())
                .with_args(file.args.clone());
            cases.push(case.run(&file_log_dir).await);
            tracing::info!(case = %stage.full_name(), "--Completed test_case {} from {}", stage.name(), file.path.display());
        }

        // (d) both module cleanups run unconditionally
        let _ = self
            .run_module_stage(
                &mut module_runner,
                file.module_hooks.test_module_cleanup.as_ref(),
                StageRole::TestModuleCleanup,
                None,
                &file_log_dir,
                SetupOutputs::default(),
                file.args.clone(),
                &mut module_stages,
            )
            .await;
        let _ = self.run_module_stage(
            &mut module_runner,
            self.framework.module_cleanup.as_ref(),
            StageRole::FrameworkModuleCleanup,
            None,
            &file_log_dir,
            SetupOutputs::default(),
            self.framework.args.clone(),
            &mut module_stages,
        )
        .await;

        let end_time = Utc::now();
        FileReport {
            path: file.path.clone(),
            scope: file.scope.clone(),
            args: (*file.args).clone(),
            log_dir: file_log_dir,
            module_stages,
            cases,
            start_time,
            end_time,
            duration_ms: (end_time - start_time).num_microseconds().unwrap_or(0) as f64 / 1000.0,
        }
    }

    /// Runs one module-level stage with its own log destination.
    #[allow(clippy::too_many_arguments)]
    async fn run_module_stage(
        &self,
        runner: &mut StageRunner,
        stage: Option<&Stage>,
        role: StageRole,
        pre: Option<StageRole>,
        file_log_dir: &Path,
        setups: SetupOutputs,
        args: Arc<ArgMap>,
        records: &mut Vec<StageRecord>,
    ) -> Option<serde_json::Value> {
        let Some(stage) = stage else { return None };

        let logger = Arc::new(CaseLogger::create(file_log_dir, stage.name()));
        let ctx = CaseContext::new(stage.id().clone(), logger, args).with_setups(setups);
        let (output, record) = runner
            .run_stage(Some(stage), role, pre, Some(role), &ctx)
            .await;
        records.extend(record);
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RunStatus;
    use crate::registry::TestFileBuilder;
    use crate::testing::{FailingBody, RecordingBody, SuccessBody};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_empty_file_runs_module_hooks_once() {
        let tmp = tempfile::tempdir().unwrap();
        let setup = Arc::new(RecordingBody::new());
        let cleanup = Arc::new(RecordingBody::new());

        let file = TestFileBuilder::new("virtual/empty")
            .module_setup_body(setup.clone())
            .module_cleanup_body(cleanup.clone())
            .build();

        let report = SuiteRunner::new()
            .run(&[file], tmp.path())
            .await
            .unwrap();

        assert_eq!(report.total, 0);
        assert_eq!(report.passed, 0);
        assert_eq!(report.failed, 0);
        assert_eq!(setup.call_count(), 1);
        assert_eq!(cleanup.call_count(), 1);
    }

    #[tokio::test]
    async fn test_module_setup_failure_skips_cases_but_not_cleanups() {
        let tmp = tempfile::tempdir().unwrap();
        let cleanup = Arc::new(RecordingBody::new());
        let case_body = Arc::new(RecordingBody::new());

        let file = TestFileBuilder::new("virtual/feature1")
            .module_setup_body(Arc::new(FailingBody::new("env missing")))
            .module_cleanup_body(cleanup.clone())
            .case_body("test_case1", "", case_body.clone())
            .build();

        let report = SuiteRunner::new()
            .run(&[file], tmp.path())
            .await
            .unwrap();

        assert_eq!(report.total, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.passed, 0);
        assert_eq!(case_body.call_count(), 0);
        // cleanups are unconditional
        assert_eq!(cleanup.call_count(), 1);
        assert_eq!(report.files[0].cases[0].status, RunStatus::Skipped);
    }

    #[tokio::test]
    async fn test_module_outputs_thread_into_case() {
        let tmp = tempfile::tempdir().unwrap();
        let seen = Arc::new(parking_lot::Mutex::new((None, None)));
        let seen_in_body = seen.clone();

        let framework = FrameworkHooks::new().with_module_setup(Stage::new(
            crate::stage::StageId::new("framework", "framework_module_setup"),
            Arc::new(SuccessBody::with_output(serde_json::json!({"a": 1}))),
        ));

        let file = TestFileBuilder::new("virtual/feature1")
            .module_setup(move |_ctx| Ok(Some(serde_json::json!({"b": 2}))))
            .case("test_case1", "threading check", move |ctx| {
                *seen_in_body.lock() = (
                    ctx.setups().framework_module_setup.clone(),
                    ctx.setups().test_module_setup.clone(),
                );
                Ok(None)
            })
            .build();

        let report = SuiteRunner::new()
            .with_framework(framework)
            .run(&[file], tmp.path())
            .await
            .unwrap();

        assert_eq!(report.passed, 1);
        let (fw, tm) = seen.lock().clone();
        assert_eq!(fw, Some(serde_json::json!({"a": 1})));
        assert_eq!(tm, Some(serde_json::json!({"b": 2})));
    }
}
