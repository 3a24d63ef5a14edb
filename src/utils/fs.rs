use crate::error::{Error, Result};
use std::path::{Component, Path, PathBuf};

// Symlinks may form cycles
const MAX_DEPTH: usize = 64;

/// Test if any `*.gradle` files are stored below `<outdir>/<repo_name>`
///
/// Follows symlinks. Hidden files and directories are skipped.
pub fn has_gradle_files(repo_name: &str, outdir: &Path) -> bool {
    contains_gradle_file(&outdir.join(repo_name), 0)
}

fn contains_gradle_file(dir: &Path, depth: usize) -> bool {
    if depth > MAX_DEPTH {
        return false;
    }
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };

    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with('.') {
            continue;
        }

        let path = entry.path();
        // std::fs::metadata follows symlinks
        match std::fs::metadata(&path) {
            Ok(meta) if meta.is_dir() => {
                if contains_gradle_file(&path, depth + 1) {
                    return true;
                }
            }
            Ok(meta) if meta.is_file() && name.ends_with(".gradle") => return true,
            _ => {}
        }
    }

    false
}

/// Name of the repository `<outdir>/<repo_name>` links to
///
/// Returns the two path components after `outdir` of the link target if
/// `<outdir>/<repo_name>` is a symlink (dangling links included), an empty
/// string if it does not exist or is not renamed.
pub fn get_new_repo_name(repo_name: &str, outdir: &Path) -> String {
    let path = outdir.join(repo_name);
    if std::fs::symlink_metadata(&path).is_err() {
        return String::new();
    }

    let real_path = real_path(&path);
    let real_outdir = real_path_or_self(outdir);

    let new_name = match real_path.strip_prefix(&real_outdir) {
        Ok(relative) => relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => real_path.to_string_lossy().into_owned(),
    };

    if new_name == repo_name.trim_end_matches('/') {
        String::new()
    } else {
        new_name
    }
}

/// Create a symlink from `<outdir>/<old_name>` to `<outdir>/<new_name>`
///
/// The link is relative and may dangle if the target does not exist yet.
pub fn symlink_repo(outdir: &Path, old_name: &str, new_name: &str) -> Result<()> {
    let old_name = old_name.trim_end_matches('/');
    let old_path = outdir.join(old_name);
    let dirname = old_path
        .parent()
        .ok_or_else(|| Error::Validation(format!("Invalid repository name: {old_name}")))?;
    std::fs::create_dir_all(dirname)?;

    let depth = Path::new(old_name).components().count().saturating_sub(1);
    let mut target = PathBuf::new();
    for _ in 0..depth {
        target.push("..");
    }
    target.push(new_name.trim_end_matches('/'));

    link(&target, &old_path)
}

#[cfg(unix)]
fn link(target: &Path, path: &Path) -> Result<()> {
    std::os::unix::fs::symlink(target, path)?;
    Ok(())
}

#[cfg(not(unix))]
fn link(target: &Path, path: &Path) -> Result<()> {
    Err(Error::Internal(format!(
        "Cannot link {} to {}: symlinks are only supported on unix",
        path.display(),
        target.display()
    )))
}

/// Resolve symlinks like `realpath`, also for dangling links
fn real_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }

    let parent = path.parent().map(real_path_or_self).unwrap_or_default();
    match std::fs::read_link(path) {
        Ok(target) => normalize(&parent.join(target)),
        Err(_) => normalize(&parent.join(path.file_name().unwrap_or_default())),
    }
}

fn real_path_or_self(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| normalize(path))
}

/// Lexically remove `.` and `..` components
fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                result.pop();
            }
            other => result.push(other.as_os_str()),
        }
    }
    result
}
