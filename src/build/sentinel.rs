/// Which tool is being supervised; decides how its output reports the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    /// msbuild: failed until it prints `Build succeeded.`
    Build,
    /// mstest: passed until it prints `Test Run Failed.`
    Test,
}

const BUILD_SUCCEEDED: &str = "Build succeeded.";
const TEST_RUN_FAILED: &str = "Test Run Failed.";

impl ToolKind {
    pub fn initial_success(self) -> bool {
        match self {
            ToolKind::Build => false,
            ToolKind::Test => true,
        }
    }

    /// The outcome signalled by `line`, if it is this tool's sentinel.
    pub fn sentinel(self, line: &str) -> Option<bool> {
        match self {
            ToolKind::Build if line == BUILD_SUCCEEDED => Some(true),
            ToolKind::Test if line == TEST_RUN_FAILED => Some(false),
            _ => None,
        }
    }
}

/// Latching success flag for one run.
#[derive(Debug, Clone)]
pub struct SuccessDetector {
    kind: ToolKind,
    success: bool,
}

impl SuccessDetector {
    pub fn new(kind: ToolKind) -> Self {
        Self {
            kind,
            success: kind.initial_success(),
        }
    }

    pub fn observe(&mut self, line: &str) {
        if let Some(outcome) = self.kind.sentinel(line) {
            self.success = outcome;
        }
    }

    pub fn success(&self) -> bool {
        self.success
    }
}
