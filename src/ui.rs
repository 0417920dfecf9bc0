//! Terminal output for run results.
//!
//! Diagnostics are printed in the `file(line,col): text` form most editors
//! and terminals already know how to jump to, followed by a one-line summary.

use crate::build::ToolKind;
use crate::model::{QuickFix, RunResult};
use colored::*;

/// `Foo.cs(12,5): [warning CS0168] ...`, or just the file when the location is unknown.
pub fn format_quickfix(fix: &QuickFix) -> String {
    let text = fix.text.replace("''", "'");
    if fix.line == 0 {
        format!("{}: {}", fix.file_name, text)
    } else {
        format!("{}({},{}): {}", fix.file_name, fix.line, fix.column, text)
    }
}

fn paint(fix: &QuickFix) -> ColoredString {
    let line = format_quickfix(fix);
    if fix.text.starts_with("[error ") {
        line.red()
    } else if fix.text.starts_with("[warning ") {
        line.yellow()
    } else {
        line.normal()
    }
}

pub fn summary(result: &RunResult, kind: ToolKind) -> String {
    let verdict = match (kind, result.success) {
        (ToolKind::Build, true) => "Build succeeded".green().bold(),
        (ToolKind::Build, false) => "Build failed".red().bold(),
        (ToolKind::Test, true) => "Tests passed".green().bold(),
        (ToolKind::Test, false) => "Tests failed".red().bold(),
    };
    format!(
        "{} ({} error(s), {} warning(s))",
        verdict,
        result.errors(),
        result.warnings()
    )
}

pub fn print_result(result: &RunResult, kind: ToolKind) {
    for fix in &result.diagnostics {
        println!("{}", paint(fix));
    }
    if !result.diagnostics.is_empty() {
        println!();
    }
    let mark = if result.success { "✓".green() } else { "x".red() };
    println!("{} {}", mark, summary(result, kind));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_located() {
        let fix = QuickFix {
            file_name: "Foo.cs".into(),
            line: 12,
            column: 5,
            text: "[error CS0103] The name ''x'' does not exist".into(),
        };
        assert_eq!(
            format_quickfix(&fix),
            "Foo.cs(12,5): [error CS0103] The name 'x' does not exist"
        );
    }

    #[test]
    fn test_format_unlocated() {
        let fix = QuickFix {
            file_name: "Bar.cs".into(),
            line: 0,
            column: 0,
            text: "Source file ''Bar.cs'' could not be found".into(),
        };
        assert_eq!(format_quickfix(&fix), "Bar.cs: Source file 'Bar.cs' could not be found");
    }

    #[test]
    fn test_summary_counts() {
        colored::control::set_override(false);
        let result = RunResult {
            success: false,
            diagnostics: vec![QuickFix {
                file_name: "A.cs".into(),
                line: 1,
                column: 1,
                text: "[error CS1002] ; expected".into(),
            }],
        };
        assert_eq!(
            summary(&result, ToolKind::Build),
            "Build failed (1 error(s), 0 warning(s))"
        );
    }
}
