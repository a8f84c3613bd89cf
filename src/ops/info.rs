//! Resolving the application's canonical identity.
//!
//! Name and version can come from the tauri configuration, from an external
//! JSON file the configuration points at, or from the crate's `Cargo.toml`,
//! in that order. The remaining fields (installer languages, RPM release
//! counter) come from the configuration with fixed defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::config::{self, AppConfig};
use crate::core::target::TargetInfo;
use crate::util::fs as fs_util;

/// Default Wix installer language.
pub const DEFAULT_WIX_LANGUAGE: &str = "en-US";

/// Default RPM package release counter.
pub const DEFAULT_RPM_RELEASE: &str = "1";

/// The resolved identity and packaging settings of the application.
#[derive(Debug, Clone)]
pub struct AppInfo {
    /// Directory containing the tauri configuration
    pub project_dir: PathBuf,

    pub name: String,
    pub version: String,
    pub identifier: String,

    /// Wix installer languages, one `.msi` per entry
    pub wix_language: Vec<String>,

    /// Version with `-`/`+` replaced by `.`, as Wix requires
    pub wix_app_version: String,

    pub rpm_release: String,

    /// Whether the build produces updater sidecar artifacts
    pub create_updater_artifacts: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct VersionFile {
    version: String,
}

/// A `version` value ending in `.json` is a pointer: the named file carries
/// the real version in its `version` field.
fn resolve_version_pointer(project_dir: &Path, version: &str) -> Result<String> {
    if !version.ends_with(".json") {
        return Ok(version.to_string());
    }

    let path = project_dir.join(version);
    let contents = fs_util::read_to_string(&path)?;
    let parsed: VersionFile = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse version file {}", path.display()))?;
    Ok(parsed.version)
}

/// Load, merge, and normalize the configuration for the project in
/// `project_dir`.
fn merged_config(
    root: &Path,
    project_dir: &Path,
    target: Option<&TargetInfo>,
    config_arg: Option<&str>,
) -> Result<AppConfig> {
    let mut raw = config::load_raw(project_dir)?;

    if let Some(target) = target {
        config::merge_platform_config(&mut raw, project_dir, target.platform);
    }
    if let Some(arg) = config_arg {
        config::merge_user_config(root, &mut raw, arg)?;
    }

    Ok(config::normalize(&raw)?)
}

/// Resolve the application's identity for the project under `root`.
///
/// Aborts the process when name and version cannot be determined: nothing
/// downstream can run without them, and callers are not expected to recover.
pub fn app_info(
    root: &Path,
    target: Option<&TargetInfo>,
    config_arg: Option<&str>,
) -> Result<AppInfo> {
    let project_dir = config::find_project_dir(root)
        .with_context(|| format!("no tauri project found under {}", root.display()))?;

    let config = merged_config(root, &project_dir, target, config_arg)?;

    let mut name = config.product_name.clone();
    let mut version = match config.version.as_deref() {
        Some(v) => Some(resolve_version_pointer(&project_dir, v)?),
        None => None,
    };

    if name.is_none() || version.is_none() {
        match crate::core::manifest::package_identity(&project_dir) {
            Ok(identity) => {
                name = name.or(Some(identity.name));
                version = version.or(Some(identity.version));
            }
            Err(e) => tracing::debug!("no cargo manifest fallback: {e:#}"),
        }
    }

    let (Some(name), Some(version)) = (name, version) else {
        eprintln!("error: could not determine package name and version");
        std::process::exit(1);
    };

    if semver::Version::parse(&version).is_err() {
        tracing::warn!("version `{version}` is not a semantic version");
    }

    let wix_app_version = version.replace(['-', '+'], ".");

    let wix_language = config
        .wix_language
        .as_ref()
        .map(|lang| lang.languages())
        .unwrap_or_else(|| vec![DEFAULT_WIX_LANGUAGE.to_string()]);

    let rpm_release = config
        .rpm_release
        .clone()
        .unwrap_or_else(|| DEFAULT_RPM_RELEASE.to_string());

    Ok(AppInfo {
        project_dir,
        name,
        version,
        identifier: config.identifier,
        wix_language,
        wix_app_version,
        rpm_release,
        create_updater_artifacts: config.create_updater_artifacts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_info_from_config() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("tauri.conf.json"),
            r#"{"productName": "Demo", "version": "1.0.0-beta.1", "identifier": "com.example.demo"}"#,
        )
        .unwrap();

        let info = app_info(tmp.path(), None, None).unwrap();
        assert_eq!(info.name, "Demo");
        assert_eq!(info.version, "1.0.0-beta.1");
        assert_eq!(info.wix_app_version, "1.0.0.beta.1");
        assert_eq!(info.wix_language, vec![DEFAULT_WIX_LANGUAGE.to_string()]);
        assert_eq!(info.rpm_release, DEFAULT_RPM_RELEASE);
    }

    #[test]
    fn test_version_pointer_resolves_to_file_contents() {
        let tmp = TempDir::new().unwrap();
        let project = tmp.path().join("src-tauri");
        fs::create_dir_all(&project).unwrap();
        fs::write(
            project.join("tauri.conf.json"),
            r#"{"productName": "Demo", "version": "../package.json", "identifier": "com.example.demo"}"#,
        )
        .unwrap();
        fs::write(tmp.path().join("package.json"), r#"{"version": "1.2.3"}"#).unwrap();

        let info = app_info(tmp.path(), None, None).unwrap();
        assert_eq!(info.version, "1.2.3");
    }

    #[test]
    fn test_cargo_manifest_fallback() {
        let tmp = TempDir::new().unwrap();
        let project = tmp.path().join("src-tauri");
        fs::create_dir_all(&project).unwrap();
        fs::write(
            project.join("tauri.conf.json"),
            r#"{"identifier": "com.example.demo"}"#,
        )
        .unwrap();
        fs::write(
            project.join("Cargo.toml"),
            "[package]\nname = \"demo-app\"\nversion = \"0.3.0\"\n",
        )
        .unwrap();

        let info = app_info(tmp.path(), None, None).unwrap();
        assert_eq!(info.name, "demo-app");
        assert_eq!(info.version, "0.3.0");
    }

    #[test]
    fn test_user_config_overrides() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("tauri.conf.json"),
            r#"{"productName": "Demo", "version": "1.0.0", "identifier": "com.example.demo"}"#,
        )
        .unwrap();

        let info = app_info(tmp.path(), None, Some(r#"{"version": "9.9.9"}"#)).unwrap();
        assert_eq!(info.version, "9.9.9");
    }
}
