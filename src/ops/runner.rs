//! Selecting and invoking the tauri CLI.
//!
//! The CLI may be reachable through a package-manager script (`npm run
//! tauri`, `yarn tauri`, ...), as a globally installed binary, or through an
//! explicit override supplied by the caller. Which one applies depends on
//! the project's `package.json` and on which lockfile is present.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::Value;

use crate::util::process::{find_executable, ProcessBuilder};

/// The tauri CLI package name looked up in `package.json`.
const TAURI_CLI_PACKAGE: &str = "@tauri-apps/cli";

/// An external command plus the fixed leading arguments that reach the tauri
/// CLI through it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Runner {
    bin: String,
    lead_args: Vec<String>,
}

impl Runner {
    pub fn new(bin: impl Into<String>, lead_args: Vec<String>) -> Self {
        Runner {
            bin: bin.into(),
            lead_args,
        }
    }

    /// Build a runner from an explicit override string, split verbatim into
    /// command + arguments.
    // FIXME: this also splits binary paths containing spaces.
    pub fn from_script(script: &str) -> Self {
        let mut parts = script.split_whitespace();
        let bin = parts.next().unwrap_or_default().to_string();
        Runner {
            bin,
            lead_args: parts.map(str::to_string).collect(),
        }
    }

    /// The command this runner invokes.
    pub fn bin(&self) -> &str {
        &self.bin
    }

    /// Assemble the final argument vector for a tauri subcommand, honoring
    /// package-manager conventions: npm needs a `run` subcommand in front of
    /// scripts and a `--` separator before pass-through options.
    fn command_args(&self, command: &[&str], options: &[String]) -> Vec<String> {
        let mut args = Vec::new();

        if self.bin == "npm" && self.lead_args.first().map(String::as_str) != Some("run") {
            args.push("run".to_string());
        }

        args.extend(self.lead_args.iter().cloned());
        args.extend(command.iter().map(|c| c.to_string()));

        if self.bin == "npm" && !options.is_empty() {
            args.push("--".to_string());
        }

        args.extend(options.iter().cloned());
        args
    }

    /// Run a tauri subcommand with stdio inherited and output coloring
    /// disabled.
    pub fn exec_tauri(&self, command: &[&str], options: &[String], cwd: &Path) -> Result<()> {
        let args = self.command_args(command, options);
        tracing::info!("running {} {}", self.bin, args.join(" "));

        ProcessBuilder::new(&self.bin)
            .args(&args)
            .cwd(cwd)
            .env("FORCE_COLOR", "0")
            .exec_inherited()
    }
}

fn package_json(root: &Path) -> Option<Value> {
    let path = root.join("package.json");
    let contents = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&contents).ok()
}

fn has_dependency(root: &Path, name: &str) -> bool {
    let Some(package) = package_json(root) else {
        return false;
    };
    ["dependencies", "devDependencies"]
        .iter()
        .any(|section| package.get(section).and_then(|deps| deps.get(name)).is_some())
}

fn uses_yarn(root: &Path) -> bool {
    root.join("yarn.lock").exists()
}

fn uses_pnpm(root: &Path) -> bool {
    root.join("pnpm-lock.yaml").exists()
}

fn uses_bun(root: &Path) -> bool {
    root.join("bun.lockb").exists() || root.join("bun.lock").exists()
}

/// Decide how to invoke the tauri CLI for the project in `root`.
///
/// When `package.json` declares the CLI as a dependency the package manager
/// is chosen by lockfile. Without a declared dependency the CLI is installed
/// globally (a deliberate side effect) and invoked directly.
pub fn detect_runner(root: &Path) -> Result<Runner> {
    if has_dependency(root, TAURI_CLI_PACKAGE) {
        if uses_yarn(root) {
            return Ok(Runner::new("yarn", vec!["tauri".to_string()]));
        }
        if uses_pnpm(root) {
            return Ok(Runner::new("pnpm", vec!["tauri".to_string()]));
        }
        if uses_bun(root) {
            return Ok(Runner::new("bun", vec!["tauri".to_string()]));
        }
        return Ok(Runner::new(
            "npm",
            vec!["run".to_string(), "tauri".to_string()],
        ));
    }

    tracing::info!("no {TAURI_CLI_PACKAGE} dependency found, installing it globally");
    ProcessBuilder::new("npm")
        .args(["install", "-g", TAURI_CLI_PACKAGE])
        .exec_inherited()
        .context("failed to install the tauri CLI")?;

    if find_executable("tauri").is_none() {
        bail!("installed {TAURI_CLI_PACKAGE} globally but `tauri` is not on PATH");
    }

    Ok(Runner::new("tauri", Vec::new()))
}
