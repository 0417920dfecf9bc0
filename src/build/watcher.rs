use super::core::Orchestrator;
use crate::error::RunError;
use crate::model::{BuildRequest, RunResult, TestRequest};
use crate::project::{ProjectLocator, SymbolResolver};
use anyhow::Result;
use notify::{Config, RecursiveMode, Watcher};
use std::path::{Component, Path};
use std::sync::mpsc::channel;
use std::time::Duration;
use tracing::debug;

/// What to rerun whenever a source file changes.
#[derive(Debug, Clone)]
pub enum WatchAction {
    Build(BuildRequest),
    Test(TestRequest),
}

/// Run `action` once, then again after every relevant change below `root`.
/// Blocks until the watcher shuts down.
pub fn watch<L, S>(
    orchestrator: &Orchestrator<L, S>,
    root: &Path,
    action: &WatchAction,
    mut report: impl FnMut(Result<RunResult, RunError>),
) -> Result<()>
where
    L: ProjectLocator,
    S: SymbolResolver,
{
    let (tx, rx) = channel();
    let config_notify = Config::default().with_poll_interval(Duration::from_secs(1));
    let mut watcher = notify::RecommendedWatcher::new(tx, config_notify)?;
    watcher.watch(root, RecursiveMode::Recursive)?;

    report(run(orchestrator, action));

    while let Ok(event) = rx.recv() {
        let mut relevant = is_relevant(&event);
        // Editors save in bursts; fold them into one rerun.
        std::thread::sleep(Duration::from_millis(100));
        while let Ok(more) = rx.try_recv() {
            relevant |= is_relevant(&more);
        }
        if relevant {
            report(run(orchestrator, action));
        }
    }
    Ok(())
}

fn run<L: ProjectLocator, S: SymbolResolver>(
    orchestrator: &Orchestrator<L, S>,
    action: &WatchAction,
) -> Result<RunResult, RunError> {
    match action {
        WatchAction::Build(request) => orchestrator.build_project(request),
        WatchAction::Test(request) => orchestrator.run_tests(request),
    }
}

fn is_relevant(event: &notify::Result<notify::Event>) -> bool {
    match event {
        Ok(event) => event.paths.iter().any(|p| is_source_path(p)),
        Err(e) => {
            debug!(error = %e, "watch error");
            false
        }
    }
}

/// Sources and project files, excluding build output and our own logs.
fn is_source_path(path: &Path) -> bool {
    let in_output = path.components().any(|c| match c {
        Component::Normal(name) => name == "bin" || name == "obj",
        _ => false,
    });
    let is_source = path
        .extension()
        .is_some_and(|ext| ext == "cs" || ext == "csproj" || ext == "sln");
    is_source && !in_output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_paths() {
        assert!(is_source_path(Path::new("/src/App/Program.cs")));
        assert!(is_source_path(Path::new("App/App.csproj")));
        assert!(is_source_path(Path::new("Shop.sln")));
        assert!(!is_source_path(Path::new("App/obj/Debug/AssemblyInfo.cs")));
        assert!(!is_source_path(Path::new("App/bin/Debug/App.dll")));
        assert!(!is_source_path(Path::new("build.log")));
        assert!(!is_source_path(Path::new("mstest.log")));
    }
}
