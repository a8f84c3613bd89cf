//! Bootstrapping a tauri project that doesn't exist yet.
//!
//! `tauri init --ci` generates a working configuration, but its guesses for
//! name, version, and frontend paths come from interactive defaults capstan
//! already resolved elsewhere. The generated file is therefore rewritten
//! with the caller's values, and the generated `beforeBuildCommand` is
//! blanked: CI cannot assume any particular frontend build pipeline.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde_json::Value;

use crate::core::config::{self, ConfigFormat};
use crate::ops::runner::Runner;
use crate::util::fs as fs_util;

/// Values written into the generated configuration.
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    pub app_name: Option<String>,
    pub app_version: Option<String>,
    pub bundle_identifier: Option<String>,
    pub dist_path: Option<String>,
    pub icon_path: Option<String>,
}

/// Initialize a tauri project in `root` and patch the generated
/// configuration. Returns the new project directory.
pub fn init_project(runner: &Runner, root: &Path, opts: &InitOptions) -> Result<PathBuf> {
    runner.exec_tauri(&["init"], &["--ci".to_string()], root)?;

    let Some(project_dir) = config::find_project_dir(root) else {
        bail!("`tauri init` did not produce a configuration file");
    };

    patch_generated_config(&project_dir, opts)?;

    if let Some(icon) = &opts.icon_path {
        let icon_path = root.join(icon);
        runner.exec_tauri(&["icon", &icon_path.to_string_lossy()], &[], root)?;
    }

    Ok(project_dir)
}

/// Rewrite the generated configuration file with the resolved values,
/// never trusting the init command's own guesses.
pub fn patch_generated_config(project_dir: &Path, opts: &InitOptions) -> Result<()> {
    for (name, format) in config::CONFIG_NAMES {
        let path = project_dir.join(name);
        if !path.exists() {
            continue;
        }

        tracing::info!("patching generated config {}", path.display());
        return match format {
            ConfigFormat::Json | ConfigFormat::Json5 => patch_json_config(&path, *format, opts),
            ConfigFormat::Toml => patch_toml_config(&path, opts),
        };
    }

    bail!(
        "no configuration file to patch in {}",
        project_dir.display()
    )
}

fn set_or_remove(map: &mut serde_json::Map<String, Value>, key: &str, value: Option<&str>) {
    match value {
        Some(value) => {
            map.insert(key.to_string(), Value::String(value.to_string()));
        }
        None => {
            map.remove(key);
        }
    }
}

fn patch_json_config(path: &Path, format: ConfigFormat, opts: &InitOptions) -> Result<()> {
    let contents = fs_util::read_to_string(path)?;
    let mut raw = format
        .parse(&contents)
        .map_err(|e| anyhow::anyhow!("failed to parse {}: {e}", path.display()))?;

    let Some(map) = raw.as_object_mut() else {
        bail!("{} is not a configuration object", path.display());
    };

    set_or_remove(map, "productName", opts.app_name.as_deref());
    set_or_remove(map, "version", opts.app_version.as_deref());
    if opts.bundle_identifier.is_some() {
        set_or_remove(map, "identifier", opts.bundle_identifier.as_deref());
    }

    let build = map
        .entry("build")
        .or_insert_with(|| Value::Object(Default::default()));
    if let Some(build) = build.as_object_mut() {
        if let Some(dist) = &opts.dist_path {
            build.insert("frontendDist".to_string(), Value::String(dist.clone()));
        }
        build.insert(
            "beforeBuildCommand".to_string(),
            Value::String(String::new()),
        );
    }

    // JSON5 inputs are rewritten as plain JSON; `tauri init` itself only
    // ever generates tauri.conf.json.
    let serialized = serde_json::to_string_pretty(&raw)?;
    fs_util::write_string(path, &serialized)
}

fn patch_toml_config(path: &Path, opts: &InitOptions) -> Result<()> {
    let contents = fs_util::read_to_string(path)?;
    let mut doc: toml_edit::DocumentMut = contents
        .parse()
        .with_context(|| format!("failed to parse {}", path.display()))?;

    match &opts.app_name {
        Some(name) => doc["productName"] = toml_edit::value(name.as_str()),
        None => {
            doc.remove("productName");
        }
    }
    match &opts.app_version {
        Some(version) => doc["version"] = toml_edit::value(version.as_str()),
        None => {
            doc.remove("version");
        }
    }
    if let Some(identifier) = &opts.bundle_identifier {
        doc["identifier"] = toml_edit::value(identifier.as_str());
    }
    if let Some(dist) = &opts.dist_path {
        doc["build"]["frontendDist"] = toml_edit::value(dist.as_str());
    }
    doc["build"]["beforeBuildCommand"] = toml_edit::value("");

    fs_util::write_string(path, &doc.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const GENERATED_JSON: &str = r#"{
  "productName": "guessed-name",
  "version": "0.1.0",
  "identifier": "com.tauri.dev",
  "build": {
    "beforeBuildCommand": "npm run build",
    "frontendDist": "../src"
  }
}"#;

    fn opts() -> InitOptions {
        InitOptions {
            app_name: Some("Demo".to_string()),
            app_version: Some("1.0.0".to_string()),
            bundle_identifier: Some("com.example.demo".to_string()),
            dist_path: Some("../dist".to_string()),
            icon_path: None,
        }
    }

    #[test]
    fn test_patch_json_config() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("tauri.conf.json"), GENERATED_JSON).unwrap();

        patch_generated_config(tmp.path(), &opts()).unwrap();

        let patched: Value =
            serde_json::from_str(&fs::read_to_string(tmp.path().join("tauri.conf.json")).unwrap())
                .unwrap();
        assert_eq!(patched["productName"], "Demo");
        assert_eq!(patched["version"], "1.0.0");
        assert_eq!(patched["identifier"], "com.example.demo");
        assert_eq!(patched["build"]["frontendDist"], "../dist");
        assert_eq!(patched["build"]["beforeBuildCommand"], "");
    }

    #[test]
    fn test_patch_removes_unset_identity_fields() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("tauri.conf.json"), GENERATED_JSON).unwrap();

        patch_generated_config(tmp.path(), &InitOptions::default()).unwrap();

        let patched: Value =
            serde_json::from_str(&fs::read_to_string(tmp.path().join("tauri.conf.json")).unwrap())
                .unwrap();
        // removed so the cargo manifest fallback applies on the next read
        assert!(patched.get("productName").is_none());
        assert!(patched.get("version").is_none());
        // the generated identifier survives when no override is given
        assert_eq!(patched["identifier"], "com.tauri.dev");
    }

    #[test]
    fn test_patch_toml_config_preserves_formatting() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("Tauri.toml"),
            "# generated by tauri init\nproductName = \"guessed\"\nversion = \"0.1.0\"\nidentifier = \"com.tauri.dev\"\n",
        )
        .unwrap();

        patch_generated_config(tmp.path(), &opts()).unwrap();

        let contents = fs::read_to_string(tmp.path().join("Tauri.toml")).unwrap();
        assert!(contents.contains("# generated by tauri init"));
        assert!(contents.contains("productName = \"Demo\""));
        assert!(contents.contains("beforeBuildCommand = \"\""));
    }

    #[test]
    fn test_patch_without_config_fails() {
        let tmp = TempDir::new().unwrap();
        assert!(patch_generated_config(tmp.path(), &opts()).is_err());
    }
}
