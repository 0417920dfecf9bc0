//! Lookups the orchestrator needs but does not own: which project a source
//! file belongs to, and which test method or class sits at a position.
//!
//! Both are traits so editors embedding the orchestrator can plug in their
//! own workspace model. [`FsProjectLocator`] and [`OutlineResolver`] are the
//! defaults used by the CLI.

mod outline;

pub use outline::{Declaration, DeclarationKind, OutlineResolver, SourceOutline};

use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex};
use tracing::debug;
use walkdir::WalkDir;

/// Zero-based line/column inside a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// Resolves source positions to fully qualified symbol names.
pub trait SymbolResolver {
    /// Display name of the method containing `at`, e.g. `Ns.Tests.Adds()`.
    fn enclosing_method(&self, file: &Path, at: Position) -> Option<String>;

    /// Fully qualified name of the innermost type containing `at`.
    fn enclosing_type(&self, file: &Path, at: Position) -> Option<String>;

    /// Fully qualified name of the first type declared in `file`.
    fn first_type(&self, file: &Path) -> Option<String>;
}

/// An msbuild project file and what is needed to build or test it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub path: PathBuf,
    pub directory: PathBuf,
    pub assembly_name: String,
}

impl Project {
    /// Assembly produced by building with `configuration`.
    pub fn target_path(&self, configuration: &str) -> PathBuf {
        self.directory
            .join("bin")
            .join(configuration)
            .join(format!("{}.dll", self.assembly_name))
    }
}

/// Finds the project(s) that own a source file. An empty result means the
/// file is not part of any known project.
pub trait ProjectLocator {
    fn locate(&self, file: &Path) -> Vec<Project>;
}

static ASSEMBLY_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<AssemblyName>\s*([^<]+?)\s*</AssemblyName>").unwrap());

/// Walks up from the source file to the nearest directory holding `*.csproj`
/// files. Results are cached per canonical directory.
#[derive(Debug, Default)]
pub struct FsProjectLocator {
    cache: Mutex<HashMap<PathBuf, Vec<Project>>>,
}

impl FsProjectLocator {
    pub fn new() -> Self {
        Self::default()
    }

    fn projects_in(&self, dir: &Path) -> Vec<Project> {
        if let Ok(cache) = self.cache.lock() {
            if let Some(found) = cache.get(dir) {
                return found.clone();
            }
        }

        let found: Vec<Project> = files_with_extension(dir, "csproj")
            .into_iter()
            .map(|path| load_project(dir, path))
            .collect();

        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(dir.to_path_buf(), found.clone());
        }
        found
    }
}

impl ProjectLocator for FsProjectLocator {
    fn locate(&self, file: &Path) -> Vec<Project> {
        let Some(start) = canonical_parent(file) else {
            return Vec::new();
        };

        for dir in start.ancestors() {
            let projects = self.projects_in(dir);
            if !projects.is_empty() {
                debug!(file = %file.display(), count = projects.len(), dir = %dir.display(), "located projects");
                return projects;
            }
        }
        Vec::new()
    }
}

fn canonical_parent(file: &Path) -> Option<PathBuf> {
    let file = fs::canonicalize(file).ok()?;
    if file.is_dir() {
        Some(file)
    } else {
        file.parent().map(Path::to_path_buf)
    }
}

fn load_project(dir: &Path, path: PathBuf) -> Project {
    let from_file = fs::read_to_string(&path)
        .ok()
        .and_then(|xml| ASSEMBLY_NAME.captures(&xml).map(|c| c[1].to_string()));
    let assembly_name = from_file.unwrap_or_else(|| {
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    });
    Project {
        path,
        directory: dir.to_path_buf(),
        assembly_name,
    }
}

/// Files directly inside `dir` with the given extension, sorted by name.
fn files_with_extension(dir: &Path, ext: &str) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|e| e == ext))
        .collect()
}

/// Nearest ancestor of the project directory containing a `*.sln`, falling
/// back to the project directory itself.
pub fn solution_dir_for(project: &Project) -> PathBuf {
    project
        .directory
        .ancestors()
        .find(|dir| !files_with_extension(dir, "sln").is_empty())
        .unwrap_or(&project.directory)
        .to_path_buf()
}
