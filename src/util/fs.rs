//! Filesystem utilities.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

/// Directories that never contain project configuration: build output and
/// dependency trees.
pub const SKIP_DIRS: &[&str] = &["target", "node_modules", ".git", "dist"];

/// Read a file to string, with nice error messages.
pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .with_context(|| format!("failed to read file: {}", path.display()))
}

/// Write a string to a file, creating parent directories if needed.
pub fn write_string(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }
    fs::write(path, contents)
        .with_context(|| format!("failed to write file: {}", path.display()))
}

/// Walk from `start` toward the filesystem root, applying `test` at each
/// level. Returns the first `Some` produced by `test`, or `None` once the
/// root has been visited.
pub fn find_in_ancestors<T>(
    start: &Path,
    mut test: impl FnMut(&Path) -> Option<T>,
) -> Option<T> {
    start.ancestors().find_map(|dir| test(dir))
}

/// Find the first file under `root` whose name matches one of `names`,
/// skipping build-output and dependency directories. Entries are visited in
/// lexicographic order so the result is deterministic.
pub fn find_file_in_tree(root: &Path, names: &[&str]) -> Option<PathBuf> {
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if entry.file_type().is_dir() {
                let name = entry.file_name().to_string_lossy();
                !SKIP_DIRS.contains(&name.as_ref())
            } else {
                true
            }
        });

    for entry in walker.flatten() {
        if entry.file_type().is_file() {
            let name = entry.file_name().to_string_lossy();
            if names.contains(&name.as_ref()) {
                return Some(entry.into_path());
            }
        }
    }
    None
}

/// Canonicalize a path, falling back to the path as-is if it doesn't exist.
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_file_in_tree() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("src-tauri");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("tauri.conf.json"), "{}").unwrap();

        let found = find_file_in_tree(tmp.path(), &["tauri.conf.json", "Tauri.toml"]);
        assert_eq!(found, Some(nested.join("tauri.conf.json")));
    }

    #[test]
    fn test_find_file_skips_excluded_dirs() {
        let tmp = TempDir::new().unwrap();
        let ignored = tmp.path().join("node_modules").join("pkg");
        fs::create_dir_all(&ignored).unwrap();
        fs::write(ignored.join("tauri.conf.json"), "{}").unwrap();

        assert_eq!(find_file_in_tree(tmp.path(), &["tauri.conf.json"]), None);
    }

    #[test]
    fn test_find_in_ancestors() {
        let tmp = TempDir::new().unwrap();
        let deep = tmp.path().join("a").join("b");
        fs::create_dir_all(&deep).unwrap();
        fs::write(tmp.path().join("marker"), "").unwrap();

        let found = find_in_ancestors(&deep, |dir| {
            let candidate = dir.join("marker");
            candidate.exists().then_some(candidate)
        });
        assert_eq!(found, Some(tmp.path().join("marker")));

        let missing: Option<PathBuf> =
            find_in_ancestors(&deep, |dir| dir.join("absent").exists().then(|| dir.to_path_buf()));
        assert_eq!(missing, None);
    }
}
