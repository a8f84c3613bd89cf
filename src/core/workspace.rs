//! Workspace membership and cargo build-directory resolution.
//!
//! Neither of these can be asked of the tauri CLI, so capstan reproduces
//! cargo's rules: a crate belongs to the workspace of the nearest ancestor
//! manifest whose `[workspace] members` globs match it, and build output
//! lands in the directory named by `CARGO_TARGET_DIR`, a `build.target-dir`
//! key in an ancestor `.cargo/config`, or `<crate>/target`, extended by a
//! `build.target` triple when one is configured.

use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde::Deserialize;

use crate::core::manifest::{self, WorkspaceSection};
use crate::util::fs as fs_util;
use crate::util::GlobalContext;

/// Find the workspace root that lists `member_dir` as a member, walking
/// upward from `member_dir` itself. Returns `None` when no ancestor
/// workspace claims it.
pub fn workspace_dir(member_dir: &Path) -> Option<PathBuf> {
    let member = fs_util::normalize_path(member_dir);

    fs_util::find_in_ancestors(member_dir, |dir| {
        let section = match manifest::workspace_section(dir) {
            Ok(Some(ws)) if !ws.members.is_empty() => ws,
            Ok(_) => return None,
            Err(e) => {
                tracing::warn!("skipping manifest in {}: {e:#}", dir.display());
                return None;
            }
        };

        if member_globs_match(dir, &section, &member) {
            Some(dir.to_path_buf())
        } else {
            None
        }
    })
}

/// Expand a workspace's member globs relative to `root` and check whether
/// `member` is one of the matched directories.
fn member_globs_match(root: &Path, section: &WorkspaceSection, member: &Path) -> bool {
    let excluded = exclusion_set(&section.exclude);

    for pattern in &section.members {
        let full_pattern = root.join(pattern);
        let Ok(paths) = glob::glob(&full_pattern.to_string_lossy()) else {
            tracing::warn!("invalid workspace member glob: {pattern}");
            continue;
        };

        for path in paths.flatten() {
            if !path.is_dir() {
                continue;
            }
            if let Ok(rel) = path.strip_prefix(root) {
                if excluded.is_match(rel) {
                    continue;
                }
            }
            if fs_util::normalize_path(&path) == *member {
                return true;
            }
        }
    }
    false
}

/// Build the exclusion matcher: the manifest's `exclude` list plus the fixed
/// build-output and dependency directories.
fn exclusion_set(exclude: &[String]) -> GlobSet {
    let mut builder = GlobSetBuilder::new();

    for pattern in exclude
        .iter()
        .map(String::as_str)
        .chain(["**/target", "**/node_modules"])
    {
        match GlobBuilder::new(pattern).literal_separator(true).build() {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(e) => tracing::warn!("invalid exclude pattern `{pattern}`: {e}"),
        }
    }

    builder.build().unwrap_or_else(|_| GlobSet::empty())
}

#[derive(Debug, Default, Deserialize)]
struct CargoConfig {
    #[serde(default)]
    build: CargoBuildConfig,
}

#[derive(Debug, Default, Deserialize)]
struct CargoBuildConfig {
    #[serde(rename = "target-dir")]
    target_dir: Option<String>,

    target: Option<toml::Value>,
}

/// Resolve the cargo build directory for `crate_dir`.
///
/// `CARGO_TARGET_DIR` wins over any `build.target-dir` found while walking
/// upward through `.cargo/config` / `.cargo/config.toml` files; the default
/// is `<crate_dir>/target`. The same walk picks up a configured default
/// `build.target` triple (skipped when the caller passed `--target`, which
/// overrides it) and appends it as a trailing path segment. Each lookup
/// stops as soon as it is satisfied.
pub fn target_dir(ctx: &GlobalContext, crate_dir: &Path, target_overridden: bool) -> PathBuf {
    let mut dir_override = ctx.cargo_target_dir().map(Path::to_path_buf);
    let mut triple: Option<String> = None;

    // Both lookups share one ancestor walk; the walk ends early once neither
    // has anything left to find.
    fs_util::find_in_ancestors(crate_dir, |dir| {
        if let Some(config) = read_cargo_config(dir) {
            if dir_override.is_none() {
                if let Some(t) = config.build.target_dir {
                    let t = PathBuf::from(t);
                    dir_override = Some(if t.is_absolute() { t } else { dir.join(t) });
                }
            }

            // build.target also accepts an array of triples; only the
            // single-string form changes the output directory, same as the
            // tauri CLI.
            if !target_overridden && triple.is_none() {
                if let Some(toml::Value::String(t)) = config.build.target {
                    triple = Some(t);
                }
            }
        }

        (dir_override.is_some() && (triple.is_some() || target_overridden)).then_some(())
    });

    let root = dir_override.unwrap_or_else(|| crate_dir.join("target"));
    match triple {
        Some(t) => root.join(t),
        None => root,
    }
}

/// Read `<dir>/.cargo/config` (or `config.toml`), if present and parsable.
fn read_cargo_config(dir: &Path) -> Option<CargoConfig> {
    let mut config_path = dir.join(".cargo").join("config");
    if !config_path.exists() {
        config_path = dir.join(".cargo").join("config.toml");
    }
    if !config_path.exists() {
        return None;
    }

    let contents = match std::fs::read_to_string(&config_path) {
        Ok(contents) => contents,
        Err(e) => {
            tracing::warn!("skipping {}: {e}", config_path.display());
            return None;
        }
    };
    match toml::from_str(&contents) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!("skipping {}: {e}", config_path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn test_ctx() -> GlobalContext {
        GlobalContext::new().unwrap().with_cargo_target_dir(None)
    }

    #[test]
    fn test_workspace_dir_literal_member() {
        let tmp = TempDir::new().unwrap();
        let app = tmp.path().join("app");
        fs::create_dir_all(&app).unwrap();
        fs::write(
            tmp.path().join("Cargo.toml"),
            "[workspace]\nmembers = [\"app\"]\n",
        )
        .unwrap();

        assert_eq!(workspace_dir(&app), Some(tmp.path().to_path_buf()));
    }

    #[test]
    fn test_workspace_dir_glob_member() {
        let tmp = TempDir::new().unwrap();
        let member = tmp.path().join("crates").join("app");
        fs::create_dir_all(&member).unwrap();
        fs::write(
            tmp.path().join("Cargo.toml"),
            "[workspace]\nmembers = [\"crates/*\"]\n",
        )
        .unwrap();

        assert_eq!(workspace_dir(&member), Some(tmp.path().to_path_buf()));
    }

    #[test]
    fn test_workspace_dir_non_member() {
        let tmp = TempDir::new().unwrap();
        let other = tmp.path().join("other");
        fs::create_dir_all(&other).unwrap();
        fs::write(
            tmp.path().join("Cargo.toml"),
            "[workspace]\nmembers = [\"app\"]\n",
        )
        .unwrap();

        assert_eq!(workspace_dir(&other), None);
    }

    #[test]
    fn test_workspace_dir_honors_exclude() {
        let tmp = TempDir::new().unwrap();
        let member = tmp.path().join("crates").join("skipme");
        fs::create_dir_all(&member).unwrap();
        fs::write(
            tmp.path().join("Cargo.toml"),
            "[workspace]\nmembers = [\"crates/*\"]\nexclude = [\"crates/skipme\"]\n",
        )
        .unwrap();

        assert_eq!(workspace_dir(&member), None);
    }

    #[test]
    fn test_target_dir_default() {
        let tmp = TempDir::new().unwrap();
        let dir = target_dir(&test_ctx(), tmp.path(), false);
        assert_eq!(dir, tmp.path().join("target"));
    }

    #[test]
    fn test_target_dir_env_override() {
        let tmp = TempDir::new().unwrap();
        let ctx = test_ctx().with_cargo_target_dir(Some(PathBuf::from("/tmp/shared-target")));
        let dir = target_dir(&ctx, tmp.path(), false);
        assert_eq!(dir, PathBuf::from("/tmp/shared-target"));
    }

    #[test]
    fn test_target_dir_from_cargo_config() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("member");
        fs::create_dir_all(nested.join(".cargo")).unwrap();
        fs::write(
            nested.join(".cargo").join("config.toml"),
            "[build]\ntarget-dir = \"out\"\n",
        )
        .unwrap();

        let dir = target_dir(&test_ctx(), &nested, false);
        assert_eq!(dir, nested.join("out"));
    }

    #[test]
    fn test_target_dir_appends_configured_triple() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join(".cargo")).unwrap();
        fs::write(
            tmp.path().join(".cargo").join("config.toml"),
            "[build]\ntarget = \"aarch64-unknown-linux-gnu\"\n",
        )
        .unwrap();

        let dir = target_dir(&test_ctx(), tmp.path(), false);
        assert_eq!(
            dir,
            tmp.path().join("target").join("aarch64-unknown-linux-gnu")
        );

        // An explicit --target overrides the configured default.
        let dir = target_dir(&test_ctx(), tmp.path(), true);
        assert_eq!(dir, tmp.path().join("target"));
    }

    #[test]
    fn test_target_dir_extensionless_config_wins() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join(".cargo")).unwrap();
        fs::write(
            tmp.path().join(".cargo").join("config"),
            "[build]\ntarget-dir = \"legacy\"\n",
        )
        .unwrap();
        fs::write(
            tmp.path().join(".cargo").join("config.toml"),
            "[build]\ntarget-dir = \"modern\"\n",
        )
        .unwrap();

        let dir = target_dir(&test_ctx(), tmp.path(), false);
        assert_eq!(dir, tmp.path().join("legacy"));
    }
}
