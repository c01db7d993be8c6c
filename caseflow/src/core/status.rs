//! Run status and stage role enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The verdict of a stage or test case invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Not yet run.
    Unset,
    /// Completed without error.
    Passed,
    /// The body returned an error or panicked, or a prerequisite was skipped.
    Failed,
    /// Never invoked because a precondition did not pass.
    Skipped,
}

impl Default for RunStatus {
    fn default() -> Self {
        Self::Unset
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => write!(f, "unset"),
            Self::Passed => write!(f, "passed"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

impl RunStatus {
    /// Returns true if the status represents a finished invocation.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Unset)
    }

    /// Returns true if the status is `Passed`.
    #[must_use]
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Returns true if the status is `Failed`.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// The position of a stage in the setup/cleanup hierarchy.
///
/// Roles double as the keys of the precondition gate table: a setup stage
/// records its result under its own role, and dependent stages name that
/// role as their precondition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageRole {
    /// Run-wide framework setup, once per test file.
    FrameworkModuleSetup,
    /// File-level setup, once per test file.
    TestModuleSetup,
    /// Framework setup around each test case.
    FrameworkCaseSetup,
    /// File-level setup around each test case.
    TestCaseSetup,
    /// The test function itself.
    Function,
    /// File-level cleanup around each test case.
    TestCaseCleanup,
    /// Framework cleanup around each test case.
    FrameworkCaseCleanup,
    /// File-level cleanup, once per test file.
    TestModuleCleanup,
    /// Run-wide framework cleanup, once per test file.
    FrameworkModuleCleanup,
}

impl StageRole {
    /// The snake_case label used in log lines and reports.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::FrameworkModuleSetup => "framework_module_setup",
            Self::TestModuleSetup => "test_module_setup",
            Self::FrameworkCaseSetup => "framework_case_setup",
            Self::TestCaseSetup => "test_case_setup",
            Self::Function => "function",
            Self::TestCaseCleanup => "test_case_cleanup",
            Self::FrameworkCaseCleanup => "framework_case_cleanup",
            Self::TestModuleCleanup => "test_module_cleanup",
            Self::FrameworkModuleCleanup => "framework_module_cleanup",
        }
    }

    /// Returns true for the four cleanup roles.
    ///
    /// Cleanup failures are recorded and surfaced as warnings but never
    /// downgrade an already-earned verdict.
    #[must_use]
    pub fn is_cleanup(&self) -> bool {
        matches!(
            self,
            Self::TestCaseCleanup
                | Self::FrameworkCaseCleanup
                | Self::TestModuleCleanup
                | Self::FrameworkModuleCleanup
        )
    }

    /// Returns true for the four setup roles.
    #[must_use]
    pub fn is_setup(&self) -> bool {
        matches!(
            self,
            Self::FrameworkModuleSetup
                | Self::TestModuleSetup
                | Self::FrameworkCaseSetup
                | Self::TestCaseSetup
        )
    }
}

impl fmt::Display for StageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
