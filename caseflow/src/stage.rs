//! Stage identity and executable bodies.
//!
//! A [`Stage`] is one named executable unit: a setup hook, a cleanup hook,
//! or a test function. Identity is immutable; per-invocation state lives in
//! the [`crate::core::StageRecord`] the runner produces, never on the stage
//! itself.

use crate::context::CaseContext;
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// The result of running a stage body: an opaque output value, or an
/// opaque error whose formatted chain becomes the captured trace.
pub type StageResult = anyhow::Result<Option<serde_json::Value>>;

/// Trait for stage bodies.
///
/// Bodies receive the owning test case's execution context (logger, args,
/// prior-stage output slots) and may be async; the engine awaits each body
/// to completion before starting the next stage.
#[async_trait]
pub trait StageBody: Send + Sync {
    /// Executes the body.
    async fn run(&self, ctx: &CaseContext) -> StageResult;
}

/// A body backed by a plain function or closure.
pub struct FnBody<F>
where
    F: Fn(&CaseContext) -> StageResult + Send + Sync,
{
    func: F,
}

impl<F> FnBody<F>
where
    F: Fn(&CaseContext) -> StageResult + Send + Sync,
{
    /// Wraps a plain function as a stage body.
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F> StageBody for FnBody<F>
where
    F: Fn(&CaseContext) -> StageResult + Send + Sync,
{
    async fn run(&self, ctx: &CaseContext) -> StageResult {
        (self.func)(ctx)
    }
}

/// A body backed by an async function or closure.
pub struct AsyncFnBody {
    func: Box<dyn Fn(CaseContext) -> BoxFuture<'static, StageResult> + Send + Sync>,
}

impl AsyncFnBody {
    /// Wraps an async function as a stage body.
    pub fn new<F, Fut>(func: F) -> Self
    where
        F: Fn(CaseContext) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = StageResult> + Send + 'static,
    {
        Self {
            func: Box::new(move |ctx| Box::pin(func(ctx))),
        }
    }
}

#[async_trait]
impl StageBody for AsyncFnBody {
    async fn run(&self, ctx: &CaseContext) -> StageResult {
        (self.func)(ctx.clone()).await
    }
}

/// The qualified identity of a stage: file scope plus function name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StageId {
    /// The owning file scope (e.g. the module name).
    pub scope: String,
    /// The function name within the scope.
    pub name: String,
}

impl StageId {
    /// Creates a new stage identity.
    #[must_use]
    pub fn new(scope: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            name: name.into(),
        }
    }

    /// The fully-qualified `scope.name` form used in logs and reports.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.scope, self.name)
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.scope, self.name)
    }
}

/// A single named executable unit.
///
/// Cloning a stage shares the body; the per-invocation run record is
/// produced by the runner, so a shared hook reused across test cases gets a
/// fresh record for each invocation.
#[derive(Clone)]
pub struct Stage {
    id: StageId,
    description: Option<String>,
    body: Arc<dyn StageBody>,
    extra_args: Vec<serde_json::Value>,
}

impl Stage {
    /// Creates a stage from an identity and a body.
    #[must_use]
    pub fn new(id: StageId, body: Arc<dyn StageBody>) -> Self {
        Self {
            id,
            description: None,
            body,
            extra_args: Vec::new(),
        }
    }

    /// Creates a stage from a plain function.
    pub fn from_fn<F>(scope: impl Into<String>, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&CaseContext) -> StageResult + Send + Sync + 'static,
    {
        Self::new(StageId::new(scope, name), Arc::new(FnBody::new(func)))
    }

    /// Sets the captured free-text description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Declares extra arguments passed to the body's context.
    #[must_use]
    pub fn with_extra_args(mut self, extra_args: Vec<serde_json::Value>) -> Self {
        self.extra_args = extra_args;
        self
    }

    /// Returns the stage identity.
    #[must_use]
    pub fn id(&self) -> &StageId {
        &self.id
    }

    /// Returns the function name within the file scope.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.id.name
    }

    /// Returns the fully-qualified name.
    #[must_use]
    pub fn full_name(&self) -> String {
        self.id.full_name()
    }

    /// Returns the description, if one was captured.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the declared extra arguments.
    #[must_use]
    pub fn extra_args(&self) -> &[serde_json::Value] {
        &self.extra_args
    }

    /// Returns the executable body.
    #[must_use]
    pub fn body(&self) -> &Arc<dyn StageBody> {
        &self.body
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("id", &self.id)
            .field("description", &self.description)
            .field("extra_args", &self.extra_args)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CaseContext;

    fn test_context() -> CaseContext {
        crate::testing::context("feature1", "test_case1")
    }

    #[tokio::test]
    async fn test_fn_body_stage() {
        let stage = Stage::from_fn("feature1", "test_case1", |_ctx| {
            Ok(Some(serde_json::json!({"sum": 3})))
        })
        .with_description("Basic sanity test");

        assert_eq!(stage.full_name(), "feature1.test_case1");
        assert_eq!(stage.description(), Some("Basic sanity test"));

        let output = stage.body().run(&test_context()).await.unwrap();
        assert_eq!(output, Some(serde_json::json!({"sum": 3})));
    }

    #[tokio::test]
    async fn test_async_fn_body_stage() {
        let body = AsyncFnBody::new(|ctx: CaseContext| async move {
            Ok(Some(serde_json::json!(ctx.full_name())))
        });
        let stage = Stage::new(StageId::new("feature1", "test_async"), Arc::new(body));

        let output = stage.body().run(&test_context()).await.unwrap();
        assert_eq!(output, Some(serde_json::json!("feature1.test_case1")));
    }

    #[test]
    fn test_stage_id_display() {
        let id = StageId::new("feature2", "test_case_setup");
        assert_eq!(id.to_string(), "feature2.test_case_setup");
        assert_eq!(id.full_name(), "feature2.test_case_setup");
    }

    #[test]
    fn test_stage_debug_elides_body() {
        let stage = Stage::from_fn("feature1", "test_case1", |_ctx| Ok(None));
        let rendered = format!("{stage:?}");
        assert!(rendered.contains("feature1"));
        assert!(!rendered.contains("body"));
    }
}
