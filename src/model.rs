use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Parameters for building the project that owns `file_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildRequest {
    pub file_name: PathBuf,
    /// Falls back to the configured default (`Debug`) when absent.
    #[serde(default)]
    pub configuration: Option<String>,
    #[serde(default)]
    pub exclude_project_references: bool,
    #[serde(default = "default_language")]
    pub language: String,
}

impl BuildRequest {
    pub fn new(file_name: impl Into<PathBuf>) -> Self {
        Self {
            file_name: file_name.into(),
            configuration: None,
            exclude_project_references: false,
            language: default_language(),
        }
    }
}

fn default_language() -> String {
    "C#".to_string()
}

/// Which tests of the owning project to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunMode {
    #[default]
    All,
    CurrentTest,
    CurrentClass,
}

/// Parameters for running the tests of the project that owns `file_name`.
///
/// `line` and `column` are zero-based and only consulted when the run mode
/// narrows the selection to the test or class under the cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRequest {
    pub file_name: PathBuf,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: u32,
    #[serde(default)]
    pub run_mode: RunMode,
}

/// A diagnostic with an optional source location, suitable for editor navigation.
///
/// `line` and `column` are 1-based; 0 means the location is unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickFix {
    pub file_name: String,
    pub line: u32,
    pub column: u32,
    pub text: String,
}

/// Outcome of one build or test request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    pub success: bool,
    /// In output arrival order.
    pub diagnostics: Vec<QuickFix>,
}

impl RunResult {
    /// The empty, unsuccessful result returned when nothing was run.
    pub fn failed() -> Self {
        Self::default()
    }

    /// Fold another project's result into this one.
    pub fn merge(&mut self, other: RunResult) {
        self.success &= other.success;
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn errors(&self) -> usize {
        self.count_tagged("[error ")
    }

    pub fn warnings(&self) -> usize {
        self.count_tagged("[warning ")
    }

    fn count_tagged(&self, tag: &str) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.text.starts_with(tag))
            .count()
    }
}
