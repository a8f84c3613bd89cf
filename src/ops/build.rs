//! Building the project and locating the installer artifacts.
//!
//! The tauri CLI offers no way to ask which files a build produced, so the
//! expected paths are reconstructed from the bundler's naming conventions:
//! per platform and architecture, compose the candidate file names from the
//! resolved app name and version, then keep only the candidates that exist
//! on disk. A candidate that doesn't exist just means that bundle target
//! wasn't produced.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use regex::Regex;

use crate::core::target::{TargetInfo, TargetPlatform};
use crate::core::{config, workspace};
use crate::ops::info::{app_info, AppInfo};
use crate::ops::init::{init_project, InitOptions};
use crate::ops::runner::{detect_runner, Runner};
use crate::util::GlobalContext;

/// Options for a single build invocation.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Explicit runner override (`tauriScript`)
    pub tauri_script: Option<String>,

    /// Pass-through arguments for `tauri build`
    pub args: Vec<String>,

    /// Values applied when the project has to be initialized first
    pub init: InitOptions,
}

/// A produced installer file plus the architecture label used in its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub arch: String,
}

impl Artifact {
    fn new(path: PathBuf, arch: &str) -> Self {
        Artifact {
            path,
            arch: arch.to_string(),
        }
    }
}

/// Find the value following any of `flags` in an argument list.
fn flag_value(args: &[String], flags: &[&str]) -> Option<String> {
    args.iter()
        .position(|arg| flags.contains(&arg.as_str()))
        .and_then(|idx| args.get(idx + 1))
        .cloned()
}

/// The bundler's Linux file-name normalization: camelCase and PascalCase
/// become kebab-case, spaces and separators become dashes.
pub fn kebab_case(name: &str) -> String {
    let pattern = Regex::new(r"([a-z0-9])([A-Z])").expect("valid pattern");
    let step = pattern.replace_all(name, "$1-$2");

    let pattern = Regex::new(r"([A-Z])([A-Z][a-z])").expect("valid pattern");
    let step = pattern.replace_all(&step, "$1-$2");

    step.replace([' ', '_', '.'], "-").to_lowercase()
}

// Each packaging format aliases CPU architectures its own way. The tables
// are intentionally separate: `arm` is `armhf` in Debian names, `armhfp` in
// RPM names, and unchanged in AppImage names.

fn macos_arch(arch: &str) -> &str {
    match arch {
        "x86_64" => "x64",
        "arm64" => "aarch64",
        other => other,
    }
}

fn windows_arch(arch: &str) -> &str {
    if arch.starts_with('i') {
        "x86"
    } else {
        "x64"
    }
}

fn debian_arch(arch: &str) -> &str {
    match arch {
        "x64" | "x86_64" => "amd64",
        "x32" | "i686" => "i386",
        "arm" => "armhf",
        "aarch64" | "arm64" => "arm64",
        other => other,
    }
}

fn appimage_arch(arch: &str) -> &str {
    match arch {
        "x64" | "x86_64" => "amd64",
        "x32" | "i686" => "i386",
        other => other,
    }
}

fn rpm_arch(arch: &str) -> &str {
    match arch {
        "x64" => "x86_64",
        "x32" | "i686" => "i386",
        "arm" => "armhfp",
        "arm64" => "aarch64",
        other => other,
    }
}

/// Compose every artifact path the bundler can have produced under
/// `bundle_base` (the profile directory, e.g. `target/release`).
pub fn artifact_candidates(
    info: &AppInfo,
    target: &TargetInfo,
    bundle_base: &Path,
) -> Vec<Artifact> {
    let bundle = bundle_base.join("bundle");
    let version = &info.version;
    let mut artifacts = Vec::new();

    match target.platform {
        TargetPlatform::Macos => {
            let arch = macos_arch(&target.arch);
            let name = &info.name;

            artifacts.push(Artifact::new(
                bundle.join("dmg").join(format!("{name}_{version}_{arch}.dmg")),
                arch,
            ));
            for ext in ["app", "app.tar.gz", "app.tar.gz.sig"] {
                artifacts.push(Artifact::new(
                    bundle.join("macos").join(format!("{name}.{ext}")),
                    arch,
                ));
            }
        }
        TargetPlatform::Windows => {
            let arch = windows_arch(&target.arch);
            let name = &info.name;
            let wix_version = &info.wix_app_version;

            // One .msi (plus updater sidecars) per configured installer
            // language.
            for lang in &info.wix_language {
                for ext in ["msi", "msi.zip", "msi.zip.sig"] {
                    artifacts.push(Artifact::new(
                        bundle
                            .join("msi")
                            .join(format!("{name}_{wix_version}_{arch}_{lang}.{ext}")),
                        arch,
                    ));
                }
            }
            for ext in ["exe", "nsis.zip", "nsis.zip.sig"] {
                artifacts.push(Artifact::new(
                    bundle
                        .join("nsis")
                        .join(format!("{name}_{version}_{arch}-setup.{ext}")),
                    arch,
                ));
            }
        }
        TargetPlatform::Linux => {
            // The bundler has normalized the product name differently across
            // releases; emit candidates under both the raw and the
            // kebab-cased name and let the existence filter decide.
            let mut names = vec![info.name.clone(), kebab_case(&info.name)];
            names.dedup();

            let deb_arch = debian_arch(&target.arch);
            let ai_arch = appimage_arch(&target.arch);
            let rpm_arch = rpm_arch(&target.arch);
            let rpm_release = &info.rpm_release;

            for name in &names {
                artifacts.push(Artifact::new(
                    bundle
                        .join("deb")
                        .join(format!("{name}_{version}_{deb_arch}.deb")),
                    deb_arch,
                ));
                for ext in ["AppImage", "AppImage.tar.gz", "AppImage.tar.gz.sig"] {
                    artifacts.push(Artifact::new(
                        bundle
                            .join("appimage")
                            .join(format!("{name}_{version}_{ai_arch}.{ext}")),
                        ai_arch,
                    ));
                }
                artifacts.push(Artifact::new(
                    bundle
                        .join("rpm")
                        .join(format!("{name}-{version}-{rpm_release}.{rpm_arch}.rpm")),
                    rpm_arch,
                ));
            }
        }
        // Mobile bundles come out of different tooling entirely; there is
        // nothing to template here.
        TargetPlatform::Android | TargetPlatform::Ios => {}
    }

    artifacts
}

/// Run `tauri build` for the project under `root` and return the artifacts
/// that exist on disk afterward.
pub fn build_project(
    ctx: &GlobalContext,
    root: &Path,
    debug: bool,
    opts: &BuildOptions,
) -> Result<Vec<Artifact>> {
    let runner = match &opts.tauri_script {
        Some(script) => Runner::from_script(script),
        None => detect_runner(root)?,
    };

    let mut tauri_args: Vec<String> = Vec::new();
    if debug {
        tauri_args.push("--debug".to_string());
    }
    tauri_args.extend(opts.args.iter().cloned());

    let target_triple = flag_value(&tauri_args, &["-t", "--target"]);
    let config_arg = flag_value(&tauri_args, &["-c", "--config"]);

    let target_info = TargetInfo::detect(ctx, target_triple.as_deref());

    if config::find_project_dir(root).is_none() {
        init_project(&runner, root, &opts.init)?;
    }

    let info = app_info(root, Some(&target_info), config_arg.as_deref())?;

    runner.exec_tauri(&["build"], &tauri_args, root)?;

    let crate_dir =
        workspace::workspace_dir(&info.project_dir).unwrap_or_else(|| info.project_dir.clone());

    let mut bundle_base = workspace::target_dir(ctx, &crate_dir, target_triple.is_some());
    if let Some(triple) = &target_triple {
        bundle_base = bundle_base.join(triple);
    }
    bundle_base = bundle_base.join(if debug { "debug" } else { "release" });

    let candidates = artifact_candidates(&info, &target_info, &bundle_base);
    tracing::info!(
        "looking for artifacts in:\n{}",
        candidates
            .iter()
            .map(|a| a.path.display().to_string())
            .collect::<Vec<_>>()
            .join("\n")
    );

    Ok(candidates
        .into_iter()
        .filter(|artifact| artifact.path.exists())
        .collect())
}

/// Replace bare `.app` bundle directories with `.app.tar.gz` archives ahead
/// of upload, since a directory cannot be uploaded as a release asset. An
/// archive that already exists next to the bundle was produced (and signed)
/// by the build itself and is kept untouched.
pub fn archive_app_bundles(artifacts: &mut Vec<Artifact>) -> Result<()> {
    let mut archived = Vec::with_capacity(artifacts.len());

    for artifact in artifacts.drain(..) {
        if artifact.path.extension().and_then(|e| e.to_str()) != Some("app") {
            archived.push(artifact);
            continue;
        }

        let archive_path = PathBuf::from(format!("{}.tar.gz", artifact.path.display()));
        if archive_path.exists() {
            // already listed as its own artifact
            continue;
        }

        create_tar_gz(&artifact.path, &archive_path)?;
        archived.push(Artifact {
            path: archive_path,
            arch: artifact.arch,
        });
    }

    *artifacts = archived;
    Ok(())
}

fn create_tar_gz(src_dir: &Path, dest: &Path) -> Result<()> {
    let name = src_dir
        .file_name()
        .with_context(|| format!("invalid bundle path: {}", src_dir.display()))?;

    let file = File::create(dest)
        .with_context(|| format!("failed to create archive: {}", dest.display()))?;
    let encoder = GzEncoder::new(file, Compression::default());

    let mut archive = tar::Builder::new(encoder);
    archive
        .append_dir_all(name, src_dir)
        .with_context(|| format!("failed to archive {}", src_dir.display()))?;
    archive.into_inner()?.finish()?;

    Ok(())
}
