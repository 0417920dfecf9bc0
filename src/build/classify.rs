//! Turns individual compiler output lines into [`QuickFix`] records.

use crate::model::QuickFix;
use regex::Regex;
use std::sync::LazyLock;

/// `3>` style prefix msbuild puts in front of lines when building projects in parallel.
static PROJECT_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+>").unwrap());

static SOURCE_FILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Source file '(?P<file>[^']*)'[^\[]*").unwrap());

static LOCATED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?P<file>.+?cs)\((?P<line>\d+),(?P<column>\d+)\): (?P<severity>warning|error) CS(?P<code>\d+): (?P<message>.*) \[[^\[]*$",
    )
    .unwrap()
});

/// Parse one line of tool output. Returns `None` for anything that is not a
/// recognisable C# compiler diagnostic; never fails.
pub fn classify(line: &str) -> Option<QuickFix> {
    if !line.contains("warning CS") && !line.contains("error CS") {
        return None;
    }
    if line.contains('\n') || line.contains('\r') {
        return None;
    }
    if PROJECT_PREFIX.is_match(line) {
        return None;
    }

    source_file_diagnostic(line).or_else(|| located_diagnostic(line))
}

fn source_file_diagnostic(line: &str) -> Option<QuickFix> {
    let caps = SOURCE_FILE.captures(line)?;
    let phrase = caps.get(0)?.as_str().trim_end();
    Some(QuickFix {
        file_name: caps["file"].to_string(),
        line: 0,
        column: 0,
        text: double_quotes(phrase),
    })
}

fn located_diagnostic(line: &str) -> Option<QuickFix> {
    let caps = LOCATED.captures(line)?;
    Some(QuickFix {
        file_name: caps["file"].to_string(),
        line: caps["line"].parse().ok()?,
        column: caps["column"].parse().ok()?,
        text: format!(
            "[{} CS{}] {}",
            &caps["severity"],
            &caps["code"],
            double_quotes(&caps["message"])
        ),
    })
}

fn double_quotes(text: &str) -> String {
    text.replace('\'', "''")
}
