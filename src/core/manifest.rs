//! Cargo manifest identity resolution.
//!
//! The bundled application's name and version fall back to the crate's
//! `Cargo.toml` when the tauri configuration doesn't declare them. Both
//! fields may be `{ workspace = true }` pointers, in which case the real
//! values live in the workspace manifest's `[workspace.package]` table.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::core::workspace;
use crate::util::fs as fs_util;

/// A manifest value that is either given inline or inherited from the
/// workspace.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MaybeWorkspace {
    Value(String),
    Inherited { workspace: bool },
}

impl MaybeWorkspace {
    fn as_value(&self) -> Option<&str> {
        match self {
            MaybeWorkspace::Value(v) => Some(v),
            MaybeWorkspace::Inherited { .. } => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawManifest {
    package: RawPackage,
}

#[derive(Debug, Deserialize)]
struct RawPackage {
    name: MaybeWorkspace,
    version: MaybeWorkspace,
}

/// The `[workspace]` half of a manifest, as read from a workspace root.
#[derive(Debug, Default, Deserialize)]
pub struct WorkspaceSection {
    #[serde(default)]
    pub members: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,

    #[serde(default)]
    pub package: WorkspacePackage,
}

/// Shared `[workspace.package]` values members can inherit.
#[derive(Debug, Default, Deserialize)]
pub struct WorkspacePackage {
    pub name: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawWorkspaceManifest {
    workspace: Option<WorkspaceSection>,
}

/// Read the `[workspace]` section of `<dir>/Cargo.toml`, if the manifest
/// exists and declares one.
pub fn workspace_section(dir: &Path) -> Result<Option<WorkspaceSection>> {
    let manifest_path = dir.join("Cargo.toml");
    if !manifest_path.exists() {
        return Ok(None);
    }
    let contents = fs_util::read_to_string(&manifest_path)?;
    let manifest: RawWorkspaceManifest = toml::from_str(&contents)
        .with_context(|| format!("failed to parse {}", manifest_path.display()))?;
    Ok(manifest.workspace)
}

/// The resolved name and version of the crate in `dir`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageIdentity {
    pub name: String,
    pub version: String,
}

/// Read `<dir>/Cargo.toml` and resolve `package.name` / `package.version`,
/// following `{ workspace = true }` pointers into the workspace manifest.
pub fn package_identity(dir: &Path) -> Result<PackageIdentity> {
    let manifest_path = dir.join("Cargo.toml");
    let contents = fs_util::read_to_string(&manifest_path)?;
    let manifest: RawManifest = toml::from_str(&contents)
        .with_context(|| format!("failed to parse {}", manifest_path.display()))?;

    let mut name = manifest.package.name.as_value().map(str::to_string);
    let mut version = manifest.package.version.as_value().map(str::to_string);

    if name.is_none() || version.is_none() {
        let Some(workspace_dir) = workspace::workspace_dir(dir) else {
            bail!(
                "{} inherits package.name or package.version from a workspace, \
                 but no workspace manifest lists it as a member",
                manifest_path.display()
            );
        };

        let shared = workspace_section(&workspace_dir)?
            .map(|ws| ws.package)
            .unwrap_or_default();

        if name.is_none() {
            name = shared.name;
        }
        if version.is_none() {
            version = shared.version;
        }
    }

    match (name, version) {
        (Some(name), Some(version)) => Ok(PackageIdentity { name, version }),
        _ => bail!(
            "could not resolve package name and version from {}",
            manifest_path.display()
        ),
    }
}
