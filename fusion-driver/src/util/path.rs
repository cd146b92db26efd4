//! Lexical absolute-path resolution.

use std::path::{Component, Path, PathBuf};

use fusion_driver_shared::errors::{FusionError, FusionResult};

/// Make `path` absolute and lexically clean it.
///
/// Relative paths are joined onto the current working directory. `.` is
/// dropped and `..` removes the preceding component; symlinks are never
/// followed, so the result is purely textual.
pub fn absolute_path(path: &Path) -> FusionResult<PathBuf> {
    if path.is_absolute() {
        return Ok(clean(path));
    }

    resolve_against(path, std::env::current_dir())
}

fn resolve_against(path: &Path, cwd: std::io::Result<PathBuf>) -> FusionResult<PathBuf> {
    let cwd = cwd.map_err(|source| FusionError::PathResolution {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(clean(&cwd.join(path)))
}

fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    let mut depth = 0usize;

    for component in path.components() {
        match component {
            Component::Prefix(p) => out.push(p.as_os_str()),
            Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                // `/..` stays at the root
                if depth > 0 {
                    out.pop();
                    depth -= 1;
                }
            }
            Component::Normal(name) => {
                out.push(name);
                depth += 1;
            }
        }
    }

    out
}
