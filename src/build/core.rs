use super::log_sink::{BUILD_LOG, LogSink, TEST_LOG};
use super::sentinel::ToolKind;
use super::supervisor::{Invocation, Supervisor};
use super::target::{TestTarget, resolve_target};
use crate::config::Settings;
use crate::error::RunError;
use crate::model::{BuildRequest, RunResult, TestRequest};
use crate::project::{Project, ProjectLocator, SymbolResolver, solution_dir_for};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Entry point for build and test requests.
///
/// Project ownership and symbol lookups are delegated to the `locator` and
/// `symbols` collaborators; everything else happens here and in the
/// [`Supervisor`].
pub struct Orchestrator<L, S> {
    settings: Settings,
    locator: L,
    symbols: S,
    supervisor: Supervisor,
}

impl<L: ProjectLocator, S: SymbolResolver> Orchestrator<L, S> {
    pub fn new(settings: Settings, locator: L, symbols: S) -> Self {
        let supervisor = Supervisor::new().with_timeout(settings.timeout());
        Self {
            settings,
            locator,
            symbols,
            supervisor,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Build every project owning `request.file_name` with the same
    /// configuration. Succeeds only if every project build succeeds.
    pub fn build_project(&self, request: &BuildRequest) -> Result<RunResult, RunError> {
        let projects = self.locator.locate(&request.file_name);
        let Some(first) = projects.first() else {
            warn!(file = %request.file_name.display(), "no project owns this file");
            return Ok(RunResult::failed());
        };

        let configuration = request
            .configuration
            .as_deref()
            .unwrap_or(self.settings.build.configuration.as_str());
        let solution_dir = self.solution_dir(first);
        let mut sink = LogSink::create(solution_dir.join(BUILD_LOG))?;
        debug!(language = %request.language, log = %sink.path().display(), "build requested");

        let mut total = RunResult {
            success: true,
            diagnostics: Vec::new(),
        };
        for project in &projects {
            info!("Building project {}", project.path.display());
            let invocation = Invocation::new(&self.settings.build.tool, &solution_dir)
                .args(self.settings.build.launcher_args.iter().cloned())
                .args(build_args(
                    &project.path,
                    configuration,
                    request.exclude_project_references,
                ))
                .args(self.settings.build.extra_args.iter().cloned());

            total.merge(self.supervisor.run(&invocation, ToolKind::Build, &mut sink)?);
        }

        close_log(sink);
        Ok(total)
    }

    /// Run the tests selected by `request.run_mode` in the project owning
    /// `request.file_name`.
    pub fn run_tests(&self, request: &TestRequest) -> Result<RunResult, RunError> {
        let Some(project) = self.locator.locate(&request.file_name).into_iter().next() else {
            warn!(file = %request.file_name.display(), "no project owns this file");
            return Ok(RunResult::failed());
        };

        let Some(target) = resolve_target(request, &self.symbols) else {
            info!(
                file = %request.file_name.display(),
                line = request.line,
                column = request.column,
                "no test or class found, nothing to run"
            );
            return Ok(RunResult::failed());
        };

        let solution_dir = self.solution_dir(&project);
        let container = project.target_path(&self.settings.build.configuration);
        let invocation = Invocation::new(&self.settings.test.tool, &solution_dir)
            .args(self.settings.test.launcher_args.iter().cloned())
            .args(test_args(&container, &target))
            .args(self.settings.test.extra_args.iter().cloned());
        debug!(command = %invocation.command_line(), "running tests");

        let mut sink = LogSink::create(solution_dir.join(TEST_LOG))?;
        let result = self.supervisor.run(&invocation, ToolKind::Test, &mut sink)?;
        close_log(sink);
        Ok(result)
    }

    fn solution_dir(&self, project: &Project) -> PathBuf {
        self.settings
            .solution_dir
            .clone()
            .unwrap_or_else(|| solution_dir_for(project))
    }
}

fn close_log(sink: LogSink) {
    let path = sink.path().to_path_buf();
    if let Err(e) = sink.close() {
        warn!(path = %path.display(), error = %e, "log file is incomplete");
    }
}

/// `<projectPath> /p:Configuration=<cfg> [/p:BuildProjectReferences=false]`
pub fn build_args(project: &Path, configuration: &str, exclude_references: bool) -> Vec<String> {
    let mut args = vec![
        project.display().to_string(),
        format!("/p:Configuration={configuration}"),
    ];
    if exclude_references {
        args.push("/p:BuildProjectReferences=false".to_string());
    }
    args
}

/// `/testcontainer:<path> /detail:errorstacktrace /detail:errormessage /noresults [/test:<selector>]`
pub fn test_args(container: &Path, target: &TestTarget) -> Vec<String> {
    let mut args = vec![
        format!("/testcontainer:{}", container.display()),
        "/detail:errorstacktrace".to_string(),
        "/detail:errormessage".to_string(),
        "/noresults".to_string(),
    ];
    args.extend(target.args());
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RunMode;
    use crate::project::Position;

    struct OneProject(Option<Project>);

    impl ProjectLocator for OneProject {
        fn locate(&self, _file: &Path) -> Vec<Project> {
            self.0.iter().cloned().collect()
        }
    }

    struct NoSymbols;

    impl SymbolResolver for NoSymbols {
        fn enclosing_method(&self, _file: &Path, _at: Position) -> Option<String> {
            None
        }
        fn enclosing_type(&self, _file: &Path, _at: Position) -> Option<String> {
            None
        }
        fn first_type(&self, _file: &Path) -> Option<String> {
            None
        }
    }

    fn unlaunchable(dir: &Path) -> Settings {
        let mut settings = Settings {
            solution_dir: Some(dir.to_path_buf()),
            ..Settings::default()
        };
        settings.build.tool = "msrun-missing-build-tool".into();
        settings.test.tool = "msrun-missing-test-tool".into();
        settings
    }

    fn project(dir: &Path) -> Project {
        Project {
            path: dir.join("App.csproj"),
            directory: dir.to_path_buf(),
            assembly_name: "App".into(),
        }
    }

    #[test]
    fn test_build_args() {
        assert_eq!(
            build_args(Path::new("src/App.csproj"), "Debug", false),
            vec!["src/App.csproj", "/p:Configuration=Debug"]
        );
        assert_eq!(
            build_args(Path::new("App.csproj"), "Release", true),
            vec![
                "App.csproj",
                "/p:Configuration=Release",
                "/p:BuildProjectReferences=false"
            ]
        );
    }

    #[test]
    fn test_test_args() {
        let container = Path::new("bin/Debug/App.Tests.dll");
        assert_eq!(
            test_args(container, &TestTarget::All).join(" "),
            "/testcontainer:bin/Debug/App.Tests.dll /detail:errorstacktrace /detail:errormessage /noresults"
        );
        let args = test_args(container, &TestTarget::Selector("Ns.T.M".into()));
        assert_eq!(args.last().unwrap(), "/test:Ns.T.M");
    }

    #[test]
    fn test_unowned_file_is_a_failed_result() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::new(unlaunchable(dir.path()), OneProject(None), NoSymbols);
        let build = orchestrator.build_project(&BuildRequest::new("Foo.cs")).unwrap();
        assert_eq!(build, RunResult::failed());
        assert!(!dir.path().join(BUILD_LOG).exists());
    }

    #[test]
    fn test_no_target_skips_launch() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::new(
            unlaunchable(dir.path()),
            OneProject(Some(project(dir.path()))),
            NoSymbols,
        );
        let request = TestRequest {
            file_name: dir.path().join("Empty.cs"),
            line: 3,
            column: 0,
            run_mode: RunMode::CurrentClass,
        };
        let result = orchestrator.run_tests(&request).unwrap();
        assert!(!result.success);
        assert!(result.diagnostics.is_empty());
        assert!(!dir.path().join(TEST_LOG).exists());
    }

    #[test]
    fn test_launch_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::new(
            unlaunchable(dir.path()),
            OneProject(Some(project(dir.path()))),
            NoSymbols,
        );
        let err = orchestrator
            .build_project(&BuildRequest::new(dir.path().join("Foo.cs")))
            .unwrap_err();
        assert!(err.is_launch_failure());

        let request = TestRequest {
            file_name: dir.path().join("Foo.cs"),
            line: 0,
            column: 0,
            run_mode: RunMode::All,
        };
        assert!(orchestrator.run_tests(&request).unwrap_err().is_launch_failure());
    }
}
