use std::env;
use std::path::{Component, Path, PathBuf};

use crate::error::{ManifestError, Result};

/// Anchor a path at the current working directory if it is relative.
pub fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(normalize(path));
    }

    let cwd = env::current_dir().map_err(|e| ManifestError::io(".", e))?;
    Ok(normalize(&cwd.join(path)))
}

/// Drop `.` components and fold `..` into the component before it.
pub fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                // `/..` is `/`
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other.as_os_str()),
        }
    }

    normalized
}

/// Express `path` relative to `base`. Both must already be absolute.
pub fn relative_to(path: &Path, base: &Path) -> PathBuf {
    let path = normalize(path);
    let base = normalize(base);

    let path_components: Vec<_> = path.components().collect();
    let base_components: Vec<_> = base.components().collect();

    let common = path_components
        .iter()
        .zip(&base_components)
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in common..base_components.len() {
        relative.push("..");
    }
    for component in &path_components[common..] {
        relative.push(component.as_os_str());
    }

    if relative.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        relative
    }
}

/// Directory holding `file`, or the file itself if it has no parent.
pub fn parent_dir(file: &Path) -> PathBuf {
    file.parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| file.to_path_buf())
}

/// Re-express a source path written relative to `module_file` so it is
/// relative to `base_dir` instead.
pub fn rebase(source_path: &str, module_file: &Path, base_dir: &Path) -> String {
    let absolute = parent_dir(module_file).join(source_path);
    relative_to(&absolute, base_dir)
        .to_string_lossy()
        .into_owned()
}
