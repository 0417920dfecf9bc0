use crate::model::{RunMode, TestRequest};
use crate::project::{Position, SymbolResolver};
use tracing::debug;

/// Which tests the test tool should run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestTarget {
    All,
    /// Fully qualified method or class name, as the test tool expects it.
    Selector(String),
}

impl TestTarget {
    /// Extra arguments for the test tool.
    pub fn args(&self) -> Vec<String> {
        match self {
            TestTarget::All => Vec::new(),
            TestTarget::Selector(name) => vec![format!("/test:{name}")],
        }
    }
}

/// Work out the selector for `request`. `None` means there is nothing to
/// run and the tool must not be launched.
pub fn resolve_target(request: &TestRequest, symbols: &dyn SymbolResolver) -> Option<TestTarget> {
    let position = Position::new(request.line, request.column);
    let target = match request.run_mode {
        RunMode::All => Some(TestTarget::All),
        RunMode::CurrentTest => resolve_current_test(request, position, symbols),
        RunMode::CurrentClass => resolve_current_class(request, position, symbols),
    };
    debug!(mode = ?request.run_mode, ?target, "resolved test target");
    target
}

fn resolve_current_test(
    request: &TestRequest,
    position: Position,
    symbols: &dyn SymbolResolver,
) -> Option<TestTarget> {
    match symbols.enclosing_method(&request.file_name, position) {
        Some(method) => Some(TestTarget::Selector(strip_parameter_list(&method).to_string())),
        None => resolve_current_class(request, position, symbols),
    }
}

fn resolve_current_class(
    request: &TestRequest,
    position: Position,
    symbols: &dyn SymbolResolver,
) -> Option<TestTarget> {
    symbols
        .enclosing_type(&request.file_name, position)
        .or_else(|| symbols.first_type(&request.file_name))
        .map(TestTarget::Selector)
}

/// `Ns.Tests.Adds(int, int)` -> `Ns.Tests.Adds`
fn strip_parameter_list(display_name: &str) -> &str {
    match display_name.find('(') {
        Some(idx) => &display_name[..idx],
        None => display_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    /// One class spanning lines 2..=20 with a single method on lines 5..=9.
    struct FakeSymbols {
        has_types: bool,
    }

    impl SymbolResolver for FakeSymbols {
        fn enclosing_method(&self, _file: &Path, at: Position) -> Option<String> {
            (self.has_types && (5..=9).contains(&at.line))
                .then(|| "Ns.CalculatorTests.Adds()".to_string())
        }

        fn enclosing_type(&self, _file: &Path, at: Position) -> Option<String> {
            (self.has_types && (2..=20).contains(&at.line))
                .then(|| "Ns.CalculatorTests".to_string())
        }

        fn first_type(&self, _file: &Path) -> Option<String> {
            self.has_types.then(|| "Ns.CalculatorTests".to_string())
        }
    }

    fn request(run_mode: RunMode, line: u32) -> TestRequest {
        TestRequest {
            file_name: "CalculatorTests.cs".into(),
            line,
            column: 4,
            run_mode,
        }
    }

    #[test]
    fn test_all_has_no_selector() {
        let symbols = FakeSymbols { has_types: false };
        let target = resolve_target(&request(RunMode::All, 0), &symbols).unwrap();
        assert_eq!(target, TestTarget::All);
        assert!(target.args().is_empty());
    }

    #[test]
    fn test_current_test_selects_method() {
        let symbols = FakeSymbols { has_types: true };
        let target = resolve_target(&request(RunMode::CurrentTest, 6), &symbols).unwrap();
        assert_eq!(target, TestTarget::Selector("Ns.CalculatorTests.Adds".into()));
        assert_eq!(target.args(), vec!["/test:Ns.CalculatorTests.Adds"]);
    }

    #[test]
    fn test_current_test_falls_back_to_class() {
        let symbols = FakeSymbols { has_types: true };
        let target = resolve_target(&request(RunMode::CurrentTest, 15), &symbols).unwrap();
        assert_eq!(target, TestTarget::Selector("Ns.CalculatorTests".into()));
    }

    #[test]
    fn test_current_class_ignores_enclosing_method() {
        let symbols = FakeSymbols { has_types: true };
        let target = resolve_target(&request(RunMode::CurrentClass, 6), &symbols).unwrap();
        assert_eq!(target, TestTarget::Selector("Ns.CalculatorTests".into()));
    }

    #[test]
    fn test_current_class_outside_type_uses_first_type() {
        let symbols = FakeSymbols { has_types: true };
        let target = resolve_target(&request(RunMode::CurrentClass, 40), &symbols).unwrap();
        assert_eq!(target, TestTarget::Selector("Ns.CalculatorTests".into()));
    }

    #[test]
    fn test_no_types_means_no_target() {
        let symbols = FakeSymbols { has_types: false };
        assert!(resolve_target(&request(RunMode::CurrentClass, 1), &symbols).is_none());
        assert!(resolve_target(&request(RunMode::CurrentTest, 1), &symbols).is_none());
    }

    #[test]
    fn test_strip_parameter_list() {
        assert_eq!(strip_parameter_list("A.B.C()"), "A.B.C");
        assert_eq!(strip_parameter_list("A.B.C(int, string)"), "A.B.C");
        assert_eq!(strip_parameter_list("A.B"), "A.B");
    }
}
