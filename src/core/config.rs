//! Tauri configuration loading, merging, and normalization.
//!
//! The tauri CLI accepts its configuration in three formats
//! (`tauri.conf.json`, `tauri.conf.json5`, and `Tauri.toml`) plus
//! platform-suffixed variants and a user-supplied `--config` override, in
//! two schema generations (v1 nests the interesting settings under `tauri`
//! and `package`; v2 flattens them to the top level). All of them funnel
//! through this module: every format parses into a `serde_json::Value` so
//! merging is format-independent, the schema generation is detected once,
//! and a single normalization step produces the [`AppConfig`] the rest of
//! capstan consumes.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::target::TargetPlatform;
use crate::util::fs as fs_util;

/// Base configuration file names, in lookup priority order.
pub const CONFIG_NAMES: &[(&str, ConfigFormat)] = &[
    ("tauri.conf.json", ConfigFormat::Json),
    ("tauri.conf.json5", ConfigFormat::Json5),
    ("Tauri.toml", ConfigFormat::Toml),
];

/// Errors produced while loading or normalizing a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not locate or parse a tauri configuration in {}", .dir.display())]
    NotFound { dir: PathBuf },

    #[error("could not read config `{path}`: {message}")]
    Unreadable { path: String, message: String },

    #[error("could not parse `{path}` as {format}: {message}")]
    Unparsable {
        path: String,
        format: ConfigFormat,
        message: String,
    },

    #[error("configuration does not declare a bundle identifier")]
    MissingIdentifier,

    #[error("configuration does not match the {schema} schema: {message}")]
    Malformed { schema: &'static str, message: String },
}

/// The on-disk serialization of a configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Json5,
    Toml,
}

impl ConfigFormat {
    /// Guess the format from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "json" => Some(ConfigFormat::Json),
            "json5" => Some(ConfigFormat::Json5),
            "toml" => Some(ConfigFormat::Toml),
            _ => None,
        }
    }

    /// Parse file contents into the common in-memory representation.
    pub fn parse(self, contents: &str) -> Result<Value, String> {
        match self {
            ConfigFormat::Json => serde_json::from_str(contents).map_err(|e| e.to_string()),
            ConfigFormat::Json5 => json5::from_str(contents).map_err(|e| e.to_string()),
            ConfigFormat::Toml => toml::from_str::<toml::Value>(contents)
                .map_err(|e| e.to_string())
                .and_then(|v| serde_json::to_value(v).map_err(|e| e.to_string())),
        }
    }
}

impl std::fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigFormat::Json => f.write_str("JSON"),
            ConfigFormat::Json5 => f.write_str("JSON5"),
            ConfigFormat::Toml => f.write_str("TOML"),
        }
    }
}

/// Find the directory containing the tauri project's configuration file,
/// searching `root` recursively and skipping build-output and dependency
/// directories. Returns `None` when no project exists under `root`.
pub fn find_project_dir(root: &Path) -> Option<PathBuf> {
    let names: Vec<&str> = CONFIG_NAMES.iter().map(|(name, _)| *name).collect();
    fs_util::find_file_in_tree(root, &names)
        .and_then(|path| path.parent().map(Path::to_path_buf))
}

/// Load the raw configuration from `dir`, trying each supported file name in
/// priority order. A file that exists but doesn't parse is logged and the
/// next candidate is tried.
pub fn load_raw(dir: &Path) -> Result<Value, ConfigError> {
    for (name, format) in CONFIG_NAMES {
        let path = dir.join(name);
        if !path.exists() {
            continue;
        }
        let Ok(contents) = std::fs::read_to_string(&path) else {
            tracing::warn!("could not read {}", path.display());
            continue;
        };
        match format.parse(&contents) {
            Ok(value) => return Ok(value),
            Err(e) => {
                tracing::warn!("found {} but couldn't parse it as {format}: {e}", path.display());
            }
        }
    }

    Err(ConfigError::NotFound {
        dir: dir.to_path_buf(),
    })
}

/// Deep-merge `incoming` into `base`: incoming keys win, nested objects are
/// merged key-by-key rather than replaced wholesale.
pub fn merge_values(base: &mut Value, incoming: &Value) {
    match (base, incoming) {
        (Value::Object(base_map), Value::Object(incoming_map)) => {
            for (key, incoming_value) in incoming_map {
                match base_map.get_mut(key) {
                    Some(base_value) => merge_values(base_value, incoming_value),
                    None => {
                        base_map.insert(key.clone(), incoming_value.clone());
                    }
                }
            }
        }
        (base, incoming) => *base = incoming.clone(),
    }
}

/// Read the platform-suffixed configuration variant from `dir`, if present.
fn read_platform_config(dir: &Path, platform: TargetPlatform) -> Option<Value> {
    let candidates = [
        (format!("tauri.{platform}.conf.json"), ConfigFormat::Json),
        (format!("tauri.{platform}.conf.json5"), ConfigFormat::Json5),
        (format!("Tauri.{platform}.toml"), ConfigFormat::Toml),
    ];

    for (name, format) in candidates {
        let path = dir.join(&name);
        if !path.exists() {
            continue;
        }
        let Ok(contents) = std::fs::read_to_string(&path) else {
            continue;
        };
        match format.parse(&contents) {
            Ok(value) => return Some(value),
            Err(e) => {
                tracing::warn!("found {} but couldn't parse it as {format}: {e}", path.display());
            }
        }
    }
    None
}

/// Merge the platform-specific configuration override into `base`, if one
/// exists in `dir`.
pub fn merge_platform_config(base: &mut Value, dir: &Path, platform: TargetPlatform) {
    if let Some(overlay) = read_platform_config(dir, platform) {
        merge_values(base, &overlay);
    }
}

/// Merge a user-supplied `--config` override into `base`. The argument is
/// either inline JSON or a path (absolute, or relative to `root`) to a file
/// in any of the three supported formats.
pub fn merge_user_config(root: &Path, base: &mut Value, arg: &str) -> Result<(), ConfigError> {
    if let Ok(inline) = serde_json::from_str::<Value>(arg) {
        merge_values(base, &inline);
        return Ok(());
    }

    let path = if Path::new(arg).is_absolute() {
        PathBuf::from(arg)
    } else {
        root.join(arg)
    };

    let format = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(ConfigFormat::from_extension)
        .unwrap_or(ConfigFormat::Json);

    let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::Unreadable {
        path: arg.to_string(),
        message: e.to_string(),
    })?;

    let overlay = format.parse(&contents).map_err(|message| ConfigError::Unparsable {
        path: arg.to_string(),
        format,
        message,
    })?;

    merge_values(base, &overlay);
    Ok(())
}

/// Schema generation of a raw configuration, detected once at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaVersion {
    V1,
    V2,
}

/// Detect the schema generation: v2 declares `identifier` at the top level,
/// v1 nests everything interesting under `tauri`.
pub fn schema_version(raw: &Value) -> SchemaVersion {
    if raw.get("identifier").is_some() {
        SchemaVersion::V2
    } else if raw.get("tauri").is_some() {
        SchemaVersion::V1
    } else {
        SchemaVersion::V2
    }
}

/// A Wix installer language declaration: a single language, a list, or a
/// language-to-settings map.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WixLanguage {
    One(String),
    Many(Vec<String>),
    Settings(serde_json::Map<String, Value>),
}

impl WixLanguage {
    /// The declared language tags, in declaration order.
    pub fn languages(&self) -> Vec<String> {
        match self {
            WixLanguage::One(lang) => vec![lang.clone()],
            WixLanguage::Many(langs) => langs.clone(),
            WixLanguage::Settings(map) => map.keys().cloned().collect(),
        }
    }
}

/// The normalized configuration capstan works with, independent of the
/// on-disk format and schema generation.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub product_name: Option<String>,

    /// Declared version; may name an external JSON file that carries the
    /// real version in its `version` field.
    pub version: Option<String>,

    /// Bundle identifier. Always present after normalization.
    pub identifier: String,

    pub frontend_dist: Option<String>,
    pub before_build_command: Option<String>,

    /// Wix installer languages; `None` means the `en-US` default.
    pub wix_language: Option<WixLanguage>,

    /// RPM package release counter; `None` means `"1"`.
    pub rpm_release: Option<String>,

    /// Whether the build produces updater sidecar artifacts.
    pub create_updater_artifacts: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawV2 {
    product_name: Option<String>,
    version: Option<String>,
    identifier: Option<String>,
    #[serde(default)]
    build: RawV2Build,
    #[serde(default)]
    bundle: RawV2Bundle,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawV2Build {
    frontend_dist: Option<String>,
    before_build_command: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawV2Bundle {
    // true | false | "v1Compatible"
    create_updater_artifacts: Option<Value>,
    #[serde(default)]
    windows: RawWindowsBundle,
    #[serde(default)]
    linux: RawLinuxBundle,
}

#[derive(Debug, Default, Deserialize)]
struct RawWindowsBundle {
    #[serde(default)]
    wix: RawWix,
}

#[derive(Debug, Default, Deserialize)]
struct RawWix {
    language: Option<WixLanguage>,
}

#[derive(Debug, Default, Deserialize)]
struct RawLinuxBundle {
    #[serde(default)]
    rpm: RawRpm,
}

#[derive(Debug, Default, Deserialize)]
struct RawRpm {
    // string or integer
    release: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawV1 {
    #[serde(default)]
    package: RawV1Package,
    #[serde(default)]
    tauri: RawV1Tauri,
    #[serde(default)]
    build: RawV1Build,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawV1Package {
    product_name: Option<String>,
    version: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawV1Tauri {
    #[serde(default)]
    bundle: RawV1Bundle,
    #[serde(default)]
    updater: RawV1Updater,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawV1Bundle {
    identifier: Option<String>,
    #[serde(default)]
    windows: RawWindowsBundle,
}

#[derive(Debug, Default, Deserialize)]
struct RawV1Updater {
    active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawV1Build {
    dist_dir: Option<String>,
    before_build_command: Option<String>,
}

fn stringify(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn updater_flag(value: Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(flag),
        Value::String(_) => Some(true),
        _ => None,
    }
}

/// Normalize a merged raw configuration into the canonical [`AppConfig`]
/// shape, converting v1 layouts to the flattened v2 one.
pub fn normalize(raw: &Value) -> Result<AppConfig, ConfigError> {
    match schema_version(raw) {
        SchemaVersion::V2 => {
            let config: RawV2 =
                serde_json::from_value(raw.clone()).map_err(|e| ConfigError::Malformed {
                    schema: "v2",
                    message: e.to_string(),
                })?;

            Ok(AppConfig {
                product_name: config.product_name,
                version: config.version,
                identifier: config.identifier.ok_or(ConfigError::MissingIdentifier)?,
                frontend_dist: config.build.frontend_dist,
                before_build_command: config.build.before_build_command,
                wix_language: config.bundle.windows.wix.language,
                rpm_release: config.bundle.linux.rpm.release.and_then(stringify),
                create_updater_artifacts: config
                    .bundle
                    .create_updater_artifacts
                    .and_then(updater_flag),
            })
        }
        SchemaVersion::V1 => {
            let config: RawV1 =
                serde_json::from_value(raw.clone()).map_err(|e| ConfigError::Malformed {
                    schema: "v1",
                    message: e.to_string(),
                })?;

            Ok(AppConfig {
                product_name: config.package.product_name,
                version: config.package.version,
                identifier: config
                    .tauri
                    .bundle
                    .identifier
                    .ok_or(ConfigError::MissingIdentifier)?,
                frontend_dist: config.build.dist_dir,
                before_build_command: config.build.before_build_command,
                wix_language: config.tauri.bundle.windows.wix.language,
                rpm_release: None,
                create_updater_artifacts: config.tauri.updater.active,
            })
        }
    }
}
