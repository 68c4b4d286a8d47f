//! Backend runtime resolution
//!
//! Computes, once per run, which Python interpreter launches the backend
//! and from which working directory. Platform differences (path layout,
//! executable suffix, interpreter name) live in one strategy table instead
//! of being branched inline at every call site.

use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use lq_core::{LauncherError, RunMode};

/// Fully resolved backend invocation target, immutable after resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutableLocation {
    /// Interpreter to invoke
    pub python: PathBuf,
    /// Backend entrypoint script (`main.py`)
    pub entrypoint: PathBuf,
    /// Working directory for the backend process
    pub working_dir: PathBuf,
}

/// Per-OS path layout for interpreter candidates
struct PlatformPaths {
    /// Project-local virtualenv interpreter, relative to the backend root
    venv_python: &'static [&'static str],
    /// Bundled embedded runtime interpreter, relative to the backend root
    embedded_python: &'static [&'static str],
    /// System interpreter name looked up on PATH as a last resort
    system_python: &'static str,
}

const WINDOWS_PATHS: PlatformPaths = PlatformPaths {
    venv_python: &["venv-backend", "Scripts", "python.exe"],
    embedded_python: &["python", "python.exe"],
    system_python: "python.exe",
};

const UNIX_PATHS: PlatformPaths = PlatformPaths {
    venv_python: &["venv-backend", "bin", "python"],
    embedded_python: &["python", "bin", "python3"],
    system_python: "python3",
};

fn platform_paths() -> &'static PlatformPaths {
    if cfg!(windows) {
        &WINDOWS_PATHS
    } else {
        &UNIX_PATHS
    }
}

/// Backend entrypoint file name
const ENTRYPOINT: &str = "main.py";

/// Resolves the backend executable for the current run mode.
///
/// Pure function of the run mode, the operating system, and the two fixed
/// base directories handed in at construction; repeated calls return the
/// same answer as long as the filesystem doesn't change underneath.
pub struct BinaryResolver {
    dev_root: PathBuf,
    packaged_root: PathBuf,
}

impl BinaryResolver {
    /// Create a resolver over the two candidate backend roots
    pub fn new(dev_root: PathBuf, packaged_root: PathBuf) -> Self {
        Self {
            dev_root,
            packaged_root,
        }
    }

    /// Resolve the interpreter, entrypoint, and working directory.
    ///
    /// Search order for the interpreter: project virtualenv, bundled
    /// embedded runtime, system interpreter from PATH. First existing path
    /// wins; only file presence is checked, never version or integrity.
    pub fn resolve(&self, mode: RunMode) -> Result<ExecutableLocation, LauncherError> {
        let root = match mode {
            RunMode::Development => &self.dev_root,
            RunMode::Packaged => &self.packaged_root,
        };

        let entrypoint = root.join(ENTRYPOINT);
        if !entrypoint.is_file() {
            return Err(LauncherError::BinaryResolution {
                searched: root.clone(),
            });
        }

        let python = resolve_interpreter(root, env::var_os("PATH").as_deref()).ok_or_else(
            || LauncherError::BinaryResolution {
                searched: root.clone(),
            },
        )?;

        tracing::info!(
            "Resolved backend: {} {} (cwd {})",
            python.display(),
            entrypoint.display(),
            root.display()
        );

        Ok(ExecutableLocation {
            python,
            entrypoint,
            working_dir: root.clone(),
        })
    }
}

/// Pick the first interpreter candidate that exists on disk
fn resolve_interpreter(root: &Path, path_var: Option<&OsStr>) -> Option<PathBuf> {
    let paths = platform_paths();

    for relative in [paths.venv_python, paths.embedded_python] {
        let candidate = join_components(root, relative);
        if candidate.is_file() {
            return Some(candidate);
        }
    }

    find_in_path(paths.system_python, path_var)
}

fn join_components(root: &Path, components: &[&str]) -> PathBuf {
    let mut path = root.to_path_buf();
    for component in components {
        path.push(component);
    }
    path
}

/// Look an executable name up in a PATH-style variable
fn find_in_path(name: &str, path_var: Option<&OsStr>) -> Option<PathBuf> {
    let path_var = path_var?;
    env::split_paths(path_var)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn make_backend_root(dir: &TempDir) -> PathBuf {
        let root = dir.path().join("backend");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join(ENTRYPOINT), "# entrypoint\n").unwrap();
        root
    }

    fn plant_interpreter(root: &Path, components: &[&str]) -> PathBuf {
        let path = join_components(root, components);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "").unwrap();
        path
    }

    #[test]
    fn test_venv_wins_over_embedded() {
        let dir = TempDir::new().unwrap();
        let root = make_backend_root(&dir);
        let paths = platform_paths();

        let venv = plant_interpreter(&root, paths.venv_python);
        plant_interpreter(&root, paths.embedded_python);

        let resolved = resolve_interpreter(&root, None).unwrap();
        assert_eq!(resolved, venv);
    }

    #[test]
    fn test_embedded_when_no_venv() {
        let dir = TempDir::new().unwrap();
        let root = make_backend_root(&dir);
        let paths = platform_paths();

        let embedded = plant_interpreter(&root, paths.embedded_python);

        let resolved = resolve_interpreter(&root, None).unwrap();
        assert_eq!(resolved, embedded);
    }

    #[test]
    fn test_system_fallback_from_path_var() {
        let dir = TempDir::new().unwrap();
        let root = make_backend_root(&dir);
        let paths = platform_paths();

        let bin_dir = dir.path().join("sysbin");
        fs::create_dir_all(&bin_dir).unwrap();
        let system = bin_dir.join(paths.system_python);
        fs::write(&system, "").unwrap();

        let path_var = env::join_paths([bin_dir]).unwrap();
        let resolved = resolve_interpreter(&root, Some(path_var.as_os_str())).unwrap();
        assert_eq!(resolved, system);
    }

    #[test]
    fn test_no_candidates_is_none() {
        let dir = TempDir::new().unwrap();
        let root = make_backend_root(&dir);
        let empty = env::join_paths([dir.path().join("nowhere")]).unwrap();
        assert!(resolve_interpreter(&root, Some(empty.as_os_str())).is_none());
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let dir = TempDir::new().unwrap();
        let root = make_backend_root(&dir);
        let paths = platform_paths();
        plant_interpreter(&root, paths.venv_python);

        let resolver = BinaryResolver::new(root.clone(), dir.path().join("unused"));
        let first = resolver.resolve(RunMode::Development).unwrap();
        let second = resolver.resolve(RunMode::Development).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.working_dir, root);
        assert_eq!(first.entrypoint, root.join(ENTRYPOINT));
    }

    #[test]
    fn test_missing_entrypoint_fails_resolution() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("backend");
        fs::create_dir_all(&root).unwrap();

        let resolver = BinaryResolver::new(root.clone(), root.clone());
        let err = resolver.resolve(RunMode::Development).unwrap_err();
        assert!(matches!(err, LauncherError::BinaryResolution { .. }));
    }

    #[test]
    fn test_mode_selects_root() {
        let dir = TempDir::new().unwrap();
        let dev_root = make_backend_root(&dir);
        let paths = platform_paths();
        plant_interpreter(&dev_root, paths.venv_python);

        let packaged_dir = TempDir::new().unwrap();
        let packaged_root = make_backend_root(&packaged_dir);
        plant_interpreter(&packaged_root, paths.embedded_python);

        let resolver = BinaryResolver::new(dev_root.clone(), packaged_root.clone());
        assert_eq!(
            resolver.resolve(RunMode::Development).unwrap().working_dir,
            dev_root
        );
        assert_eq!(
            resolver.resolve(RunMode::Packaged).unwrap().working_dir,
            packaged_root
        );
    }
}
