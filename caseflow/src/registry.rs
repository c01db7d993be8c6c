//! Programmatic test-file registry.
//!
//! The loader contract: given a path, produce the ordered test functions of
//! a file plus its optional special hooks, already bound as stage bodies.
//! Registration replaces on-disk discovery: files are declared with
//! [`TestFileBuilder`] and declaration order is the order builder calls were
//! made, stable across runs. The four special hooks are builder methods, so
//! nothing is probed by name at run time.

use crate::context::{ArgMap, CaseContext};
use crate::errors::CaseflowError;
use crate::stage::{FnBody, Stage, StageBody, StageId, StageResult};
use crate::suite::{ModuleHooks, TestFile};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// A declared argument flag: name plus help text.
#[derive(Debug, Clone, Serialize)]
pub struct ArgSpec {
    /// The flag name (the key looked up in the argument map).
    pub name: String,
    /// One-line help text.
    pub help: String,
}

impl ArgSpec {
    /// Creates a flag declaration.
    #[must_use]
    pub fn new(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
        }
    }
}

/// Builds one test file: its cases in declaration order, its optional
/// module/case hooks, and its declared flags.
#[derive(Debug)]
pub struct TestFileBuilder {
    path: PathBuf,
    scope: String,
    cases: Vec<Stage>,
    module_setup: Option<Stage>,
    module_cleanup: Option<Stage>,
    case_setup: Option<Stage>,
    case_cleanup: Option<Stage>,
    arg_specs: Vec<ArgSpec>,
}

impl TestFileBuilder {
    /// Starts a file registered under `path`; the file scope is the path's
    /// stem.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let scope = path
            .file_stem()
            .map_or_else(|| "unnamed".to_string(), |s| s.to_string_lossy().into_owned());
        Self {
            path,
            scope,
            cases: Vec::new(),
            module_setup: None,
            module_cleanup: None,
            case_setup: None,
            case_cleanup: None,
            arg_specs: Vec::new(),
        }
    }

    fn hook(&self, name: &str, body: Arc<dyn StageBody>) -> Stage {
        Stage::new(StageId::new(&self.scope, name), body)
    }

    /// Appends a test case backed by a plain function.
    #[must_use]
    pub fn case<F>(mut self, name: &str, description: &str, func: F) -> Self
    where
        F: Fn(&CaseContext) -> StageResult + Send + Sync + 'static,
    {
        let mut stage = Stage::from_fn(&self.scope, name, func);
        if !description.is_empty() {
            stage = stage.with_description(description);
        }
        self.cases.push(stage);
        self
    }

    /// Appends a test case backed by any stage body.
    #[must_use]
    pub fn case_body(mut self, name: &str, description: &str, body: Arc<dyn StageBody>) -> Self {
        let mut stage = self.hook(name, body);
        if !description.is_empty() {
            stage = stage.with_description(description);
        }
        self.cases.push(stage);
        self
    }

    /// Appends an already-built stage as a test case.
    #[must_use]
    pub fn case_stage(mut self, stage: Stage) -> Self {
        self.cases.push(stage);
        self
    }

    /// Sets the file's module setup.
    #[must_use]
    pub fn module_setup<F>(mut self, func: F) -> Self
    where
        F: Fn(&CaseContext) -> StageResult + Send + Sync + 'static,
    {
        self.module_setup = Some(self.hook("test_module_setup", Arc::new(FnBody::new(func))));
        self
    }

    /// Sets the file's module setup from any stage body.
    #[must_use]
    pub fn module_setup_body(mut self, body: Arc<dyn StageBody>) -> Self {
        self.module_setup = Some(self.hook("test_module_setup", body));
        self
    }

    /// Sets the file's module cleanup.
    #[must_use]
    pub fn module_cleanup<F>(mut self, func: F) -> Self
    where
        F: Fn(&CaseContext) -> StageResult + Send + Sync + 'static,
    {
        self.module_cleanup = Some(self.hook("test_module_cleanup", Arc::new(FnBody::new(func))));
        self
    }

    /// Sets the file's module cleanup from any stage body.
    #[must_use]
    pub fn module_cleanup_body(mut self, body: Arc<dyn StageBody>) -> Self {
        self.module_cleanup = Some(self.hook("test_module_cleanup", body));
        self
    }

    /// Sets the case setup shared by every case in the file.
    #[must_use]
    pub fn case_setup<F>(mut self, func: F) -> Self
    where
        F: Fn(&CaseContext) -> StageResult + Send + Sync + 'static,
    {
        self.case_setup = Some(self.hook("test_case_setup", Arc::new(FnBody::new(func))));
        self
    }

    /// Sets the shared case setup from any stage body.
    #[must_use]
    pub fn case_setup_body(mut self, body: Arc<dyn StageBody>) -> Self {
        self.case_setup = Some(self.hook("test_case_setup", body));
        self
    }

    /// Sets the case cleanup shared by every case in the file.
    #[must_use]
    pub fn case_cleanup<F>(mut self, func: F) -> Self
    where
        F: Fn(&CaseContext) -> StageResult + Send + Sync + 'static,
    {
        self.case_cleanup = Some(self.hook("test_case_cleanup", Arc::new(FnBody::new(func))));
        self
    }

    /// Sets the shared case cleanup from any stage body.
    #[must_use]
    pub fn case_cleanup_body(mut self, body: Arc<dyn StageBody>) -> Self {
        self.case_cleanup = Some(self.hook("test_case_cleanup", body));
        self
    }

    /// Declares an argument flag this file understands.
    #[must_use]
    pub fn flag(mut self, name: impl Into<String>, help: impl Into<String>) -> Self {
        self.arg_specs.push(ArgSpec::new(name, help));
        self
    }

    /// Finishes the file.
    #[must_use]
    pub fn build(self) -> TestFile {
        TestFile {
            path: self.path,
            scope: self.scope,
            cases: self.cases,
            module_hooks: ModuleHooks {
                test_module_setup: self.module_setup,
                test_module_cleanup: self.module_cleanup,
            },
            case_setup: self.case_setup,
            case_cleanup: self.case_cleanup,
            args: Arc::new(ArgMap::new()),
            arg_specs: self.arg_specs,
        }
    }
}

/// All registered test files, in registration order.
#[derive(Debug, Default)]
pub struct FileRegistry {
    files: Vec<TestFile>,
}

impl FileRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a file. Paths must be unique.
    pub fn register(&mut self, file: TestFile) -> Result<(), CaseflowError> {
        if self.files.iter().any(|f| f.path() == file.path()) {
            return Err(CaseflowError::DuplicateTestFile(file.path().to_path_buf()));
        }
        self.files.push(file);
        Ok(())
    }

    /// Every registered file, in registration order.
    #[must_use]
    pub fn files(&self) -> &[TestFile] {
        &self.files
    }

    /// Resolves requested paths to registered files.
    ///
    /// A path matching a registered file selects it; a path that is a
    /// prefix of registered files selects all of them (directory
    /// expansion). Selection preserves registration order and drops
    /// duplicates. A path matching nothing is a fatal configuration
    /// error, surfaced before any execution begins.
    pub fn resolve(&self, paths: &[PathBuf]) -> Result<Vec<TestFile>, CaseflowError> {
        let mut selected: Vec<&TestFile> = Vec::new();
        for path in paths {
            let matches: Vec<&TestFile> = self
                .files
                .iter()
                .filter(|f| f.path() == path.as_path() || f.path().starts_with(path))
                .collect();
            if matches.is_empty() {
                return Err(CaseflowError::MissingTestFile(path.clone()));
            }
            for file in matches {
                if !selected.iter().any(|f| f.path() == file.path()) {
                    selected.push(file);
                }
            }
        }
        let mut ordered: Vec<TestFile> = Vec::with_capacity(selected.len());
        for file in &self.files {
            if selected.iter().any(|f| f.path() == file.path()) {
                ordered.push(file.clone());
            }
        }
        Ok(ordered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> FileRegistry {
        let mut registry = FileRegistry::new();
        registry
            .register(
                TestFileBuilder::new("tests/feature1")
                    .case("test_case1", "Basic sanity test", |_ctx| Ok(None))
                    .case("test_case2", "Basic sanity test 2", |_ctx| Ok(None))
                    .flag("num", "Number of requests")
                    .build(),
            )
            .unwrap();
        registry
            .register(
                TestFileBuilder::new("tests/feature2")
                    .case("test_case1", "", |_ctx| Ok(None))
                    .build(),
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_declaration_order_preserved() {
        let registry = registry();
        let file = &registry.files()[0];

        assert_eq!(file.scope(), "feature1");
        let names: Vec<&str> = file.cases().iter().map(Stage::name).collect();
        assert_eq!(names, vec!["test_case1", "test_case2"]);
    }

    #[test]
    fn test_resolve_exact_path() {
        let registry = registry();
        let files = registry.resolve(&[PathBuf::from("tests/feature2")]).unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].scope(), "feature2");
    }

    #[test]
    fn test_resolve_directory_expands_in_order() {
        let registry = registry();
        let files = registry.resolve(&[PathBuf::from("tests")]).unwrap();

        let scopes: Vec<&str> = files.iter().map(TestFile::scope).collect();
        assert_eq!(scopes, vec!["feature1", "feature2"]);
    }

    #[test]
    fn test_resolve_dedupes() {
        let registry = registry();
        let files = registry
            .resolve(&[PathBuf::from("tests/feature1"), PathBuf::from("tests")])
            .unwrap();

        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_resolve_unknown_path_is_fatal() {
        let registry = registry();
        let err = registry
            .resolve(&[PathBuf::from("tests/absent")])
            .unwrap_err();

        assert!(matches!(err, CaseflowError::MissingTestFile(_)));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = registry();
        let err = registry
            .register(TestFileBuilder::new("tests/feature1").build())
            .unwrap_err();

        assert!(matches!(err, CaseflowError::DuplicateTestFile(_)));
    }
}
