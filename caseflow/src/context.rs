//! Execution context threaded through stages.
//!
//! The original runner kept the working directory, logger, and setup
//! outputs as process-wide state; here everything a stage body may read is
//! carried by an explicit [`CaseContext`] parameter, and the per-file
//! working-directory change is held by a [`ScopedDir`] drop-guard.

use crate::caselog::CaseLogger;
use crate::stage::StageId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A read-only map of parsed argument flags.
///
/// The harness treats argument values as opaque JSON; scoping a shared map
/// down to a file's declared flags happens at the CLI edge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArgMap {
    values: HashMap<String, serde_json::Value>,
}

impl ArgMap {
    /// Creates an empty argument map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a map from `(key, value)` pairs.
    #[must_use]
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, serde_json::Value)>) -> Self {
        Self {
            values: pairs.into_iter().collect(),
        }
    }

    /// Inserts a value, replacing any previous value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.values.insert(key.into(), value);
    }

    /// Gets a value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.values.get(key)
    }

    /// Gets a string value.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(|v| v.as_str())
    }

    /// Returns true if no flags are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns a new map containing only the named keys.
    #[must_use]
    pub fn scoped<'a>(&self, keys: impl IntoIterator<Item = &'a str>) -> Self {
        let values = keys
            .into_iter()
            .filter_map(|k| self.values.get(k).map(|v| (k.to_string(), v.clone())))
            .collect();
        Self { values }
    }
}

/// The four named input slots carrying prior setup outputs.
///
/// Propagation is one-directional and ordered: framework_module →
/// test_module → framework_case → test_case(setup) → test function. The
/// parent populates the slots before a stage runs; bodies read them but do
/// not own them. Cleanup stages receive an empty set.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SetupOutputs {
    /// Output of the run-wide framework module setup.
    pub framework_module_setup: Option<serde_json::Value>,
    /// Output of the file's module setup.
    pub test_module_setup: Option<serde_json::Value>,
    /// Output of the framework case setup for this test case.
    pub framework_case_setup: Option<serde_json::Value>,
    /// Output of the file's case setup for this test case.
    pub test_case_setup: Option<serde_json::Value>,
}

/// The execution context supplied to every stage body.
///
/// Cheap to clone: the logger and argument map are shared, the setup slots
/// are snapshots owned by this context.
#[derive(Clone)]
pub struct CaseContext {
    case: StageId,
    logger: Arc<CaseLogger>,
    args: Arc<ArgMap>,
    setups: SetupOutputs,
    extra_args: Vec<serde_json::Value>,
}

impl CaseContext {
    /// Creates a context for the given owning case.
    #[must_use]
    pub fn new(case: StageId, logger: Arc<CaseLogger>, args: Arc<ArgMap>) -> Self {
        Self {
            case,
            logger,
            args,
            setups: SetupOutputs::default(),
            extra_args: Vec::new(),
        }
    }

    /// Replaces the setup-output slots.
    #[must_use]
    pub fn with_setups(mut self, setups: SetupOutputs) -> Self {
        self.setups = setups;
        self
    }

    /// Replaces the declared extra arguments.
    #[must_use]
    pub fn with_extra_args(mut self, extra_args: Vec<serde_json::Value>) -> Self {
        self.extra_args = extra_args;
        self
    }

    /// Identity of the owning test case (or module stage).
    #[must_use]
    pub fn case(&self) -> &StageId {
        &self.case
    }

    /// Fully-qualified name of the owning test case.
    #[must_use]
    pub fn full_name(&self) -> String {
        self.case.full_name()
    }

    /// The per-case logger.
    #[must_use]
    pub fn logger(&self) -> &CaseLogger {
        &self.logger
    }

    /// Shared handle to the per-case logger.
    #[must_use]
    pub fn logger_handle(&self) -> Arc<CaseLogger> {
        self.logger.clone()
    }

    /// The parsed argument flags scoped to this stage's file.
    #[must_use]
    pub fn args(&self) -> &ArgMap {
        &self.args
    }

    /// The prior setup outputs visible to this stage.
    #[must_use]
    pub fn setups(&self) -> &SetupOutputs {
        &self.setups
    }

    /// Extra arguments declared by the running stage.
    #[must_use]
    pub fn extra_args(&self) -> &[serde_json::Value] {
        &self.extra_args
    }
}

/// Changes the working directory for the lifetime of the guard.
///
/// The working directory is process-wide state; the guard restores the
/// previous directory on drop so the change cannot outlive the file being
/// processed, even on early return.
#[derive(Debug)]
pub struct ScopedDir {
    previous: PathBuf,
}

impl ScopedDir {
    /// Enters `dir`, remembering the current directory.
    pub fn enter(dir: &Path) -> std::io::Result<Self> {
        let previous = std::env::current_dir()?;
        std::env::set_current_dir(dir)?;
        Ok(Self { previous })
    }
}

impl Drop for ScopedDir {
    fn drop(&mut self) {
        if let Err(err) = std::env::set_current_dir(&self.previous) {
            tracing::warn!(
                previous = %self.previous.display(),
                error = %err,
                "failed to restore working directory"
            );
        }
    }
}
