//! # Caseflow
//!
//! A staged test-execution harness.
//!
//! Caseflow runs test cases through a layered setup/cleanup hierarchy
//! (framework-module, test-module, framework-case, and test-case levels)
//! with:
//!
//! - **Precondition-gated execution**: a failed setup deterministically
//!   skips every dependent stage, while cleanups always run
//! - **Output threading**: each setup stage's output flows into the stages
//!   after it through named slots on the execution context
//! - **Value-based verdicts**: every stage invocation reduces to a status
//!   record; no unwinding crosses a stage boundary
//! - **Per-case log isolation**: every test case writes to its own file
//! - **Aggregate reporting**: one JSON document plus a tabulated text
//!   summary per run
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use caseflow::prelude::*;
//!
//! let mut registry = FileRegistry::new();
//! registry.register(
//!     TestFileBuilder::new("tests/feature1")
//!         .module_setup(|ctx| Ok(Some(serde_json::json!({"env": "ready"}))))
//!         .case("test_case1", "Basic sanity test", |ctx| {
//!             anyhow::ensure!(1 + 2 == 3, "checked sum 1+2 expected 3");
//!             Ok(None)
//!         })
//!         .build(),
//! )?;
//!
//! let files = registry.resolve(&paths)?;
//! let report = SuiteRunner::new().run(&files, &log_dir).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod case;
pub mod caselog;
pub mod context;
pub mod core;
pub mod errors;
pub mod hooks;
pub mod registry;
pub mod report;
pub mod runner;
pub mod stage;
pub mod suite;
pub mod testing;


/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::case::{CaseHooks, CaseReport, TestCase};
    pub use crate::caselog::CaseLogger;
    pub use crate::context::{ArgMap, CaseContext, ScopedDir, SetupOutputs};
    pub use crate::core::{RunStatus, StageRecord, StageRole};
    pub use crate::errors::CaseflowError;
    pub use crate::hooks::FrameworkHooks;
    pub use crate::registry::{ArgSpec, FileRegistry, TestFileBuilder};
    pub use crate::report::{FailedCase, RunReport};
    pub use crate::runner::{Gates, StageRunner};
    pub use crate::stage::{AsyncFnBody, FnBody, Stage, StageBody, StageId, StageResult};
    pub use crate::suite::{FileReport, ModuleHooks, SuiteRunner, TestFile};
}
