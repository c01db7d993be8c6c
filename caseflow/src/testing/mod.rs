//! Testing utilities: canned stage bodies and context fixtures.
//!
//! Used by the crate's own tests and available to downstream users writing
//! tests against the harness.

use crate::caselog::CaseLogger;
use crate::context::{ArgMap, CaseContext};
use crate::stage::{StageBody, StageId, StageResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

/// Builds a context for a fictitious test case with a discarding logger.
#[must_use]
pub fn context(scope: &str, name: &str) -> CaseContext {
    CaseContext::new(
        StageId::new(scope, name),
        Arc::new(CaseLogger::discard()),
        Arc::new(ArgMap::new()),
    )
}

/// A body that always succeeds, optionally with a fixed output.
#[derive(Debug, Default)]
pub struct SuccessBody {
    output: Option<serde_json::Value>,
}

impl SuccessBody {
    /// A body returning no output.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A body returning the given output.
    #[must_use]
    pub fn with_output(output: serde_json::Value) -> Self {
        Self {
            output: Some(output),
        }
    }
}

#[async_trait]
impl StageBody for SuccessBody {
    async fn run(&self, _ctx: &CaseContext) -> StageResult {
        Ok(self.output.clone())
    }
}

/// A body that always fails with a fixed message.
#[derive(Debug)]
pub struct FailingBody {
    message: String,
}

impl FailingBody {
    /// A body failing with `message`.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl StageBody for FailingBody {
    async fn run(&self, _ctx: &CaseContext) -> StageResult {
        Err(anyhow::anyhow!("{}", self.message))
    }
}

/// A body that panics, for exercising panic capture.
#[derive(Debug)]
pub struct PanicBody {
    message: String,
}

impl PanicBody {
    /// A body panicking with `message`.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl StageBody for PanicBody {
    async fn run(&self, _ctx: &CaseContext) -> StageResult {
        panic!("{}", self.message);
    }
}

/// A body that records each invocation and the context it saw.
#[derive(Debug, Default)]
pub struct RecordingBody {
    calls: Mutex<usize>,
    contexts: Mutex<Vec<String>>,
    output: Option<serde_json::Value>,
}

impl RecordingBody {
    /// A recording body returning no output.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A recording body returning the given output.
    #[must_use]
    pub fn with_output(output: serde_json::Value) -> Self {
        Self {
            output: Some(output),
            ..Self::default()
        }
    }

    /// How many times the body ran.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.calls.lock()
    }

    /// The owning-case names seen by each invocation.
    #[must_use]
    pub fn seen_cases(&self) -> Vec<String> {
        self.contexts.lock().clone()
    }
}

#[async_trait]
impl StageBody for RecordingBody {
    async fn run(&self, ctx: &CaseContext) -> StageResult {
        *self.calls.lock() += 1;
        self.contexts.lock().push(ctx.full_name());
        Ok(self.output.clone())
    }
}
