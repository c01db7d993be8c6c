//! Run-wide framework hook capability record.
//!
//! A team supplies zero or more of the four framework hooks once per run;
//! they are shared across every test file. Absence of any hook is valid and
//! treated as a no-op by the runner.

use crate::context::ArgMap;
use crate::registry::ArgSpec;
use crate::stage::Stage;
use std::sync::Arc;

/// The optional framework hooks plus the framework-scoped arguments.
#[derive(Debug, Clone, Default)]
pub struct FrameworkHooks {
    /// Run once per test file, before anything in the file.
    pub module_setup: Option<Stage>,
    /// Run once per test file, after everything in the file.
    pub module_cleanup: Option<Stage>,
    /// Run around every test case, first in the chain.
    pub case_setup: Option<Stage>,
    /// Run around every test case, last in the chain.
    pub case_cleanup: Option<Stage>,
    /// Parsed arguments scoped to the framework.
    pub args: Arc<ArgMap>,
    /// The argument flags the framework declares.
    pub arg_specs: Vec<ArgSpec>,
}

impl FrameworkHooks {
    /// Creates an empty hook record (every hook a no-op).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the per-file framework setup.
    #[must_use]
    pub fn with_module_setup(mut self, stage: Stage) -> Self {
        self.module_setup = Some(stage);
        self
    }

    /// Sets the per-file framework cleanup.
    #[must_use]
    pub fn with_module_cleanup(mut self, stage: Stage) -> Self {
        self.module_cleanup = Some(stage);
        self
    }

    /// Sets the per-case framework setup.
    #[must_use]
    pub fn with_case_setup(mut self, stage: Stage) -> Self {
        self.case_setup = Some(stage);
        self
    }

    /// Sets the per-case framework cleanup.
    #[must_use]
    pub fn with_case_cleanup(mut self, stage: Stage) -> Self {
        self.case_cleanup = Some(stage);
        self
    }

    /// Sets the framework-scoped argument map.
    #[must_use]
    pub fn with_args(mut self, args: Arc<ArgMap>) -> Self {
        self.args = args;
        self
    }

    /// Declares an argument flag the framework understands.
    #[must_use]
    pub fn with_flag(mut self, name: impl Into<String>, help: impl Into<String>) -> Self {
        self.arg_specs.push(ArgSpec::new(name, help));
        self
    }

    /// Returns true if no hook is supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.module_setup.is_none()
            && self.module_cleanup.is_none()
            && self.case_setup.is_none()
            && self.case_cleanup.is_none()
    }
}
