//! CLI definitions using clap.
//!
//! Every input can be supplied as a flag or through the environment. The
//! `INPUT_*` names follow the GitHub Actions convention so the binary can
//! run directly as an action step; the `GITHUB_*` values are the ones
//! Actions provides on its own.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// capstan - build Tauri desktop apps and publish the installers
#[derive(Parser)]
#[command(name = "capstan")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the project and list the installer artifacts it produced
    Build(BuildArgs),

    /// Build the project and publish the installers to a GitHub release
    Publish(PublishArgs),
}

#[derive(Args)]
pub struct BuildArgs {
    /// Path to the project root
    #[arg(long, env = "INPUT_PROJECTPATH", default_value = ".")]
    pub project_path: PathBuf,

    /// Frontend dist path written into a freshly initialized project
    #[arg(long, env = "INPUT_DISTPATH")]
    pub dist_path: Option<String>,

    /// App icon handed to `tauri icon` after initialization
    #[arg(long, env = "INPUT_ICONPATH")]
    pub icon_path: Option<String>,

    /// Product name written into a freshly initialized project
    #[arg(long, env = "INPUT_APPNAME")]
    pub app_name: Option<String>,

    /// Version written into a freshly initialized project
    #[arg(long, env = "INPUT_APPVERSION")]
    pub app_version: Option<String>,

    /// Bundle identifier written into a freshly initialized project
    #[arg(long, env = "INPUT_BUNDLEIDENTIFIER")]
    pub bundle_identifier: Option<String>,

    /// Explicit command used to invoke the tauri CLI
    #[arg(long, env = "INPUT_TAURISCRIPT")]
    pub tauri_script: Option<String>,

    /// Extra arguments passed through to `tauri build`
    #[arg(long, env = "INPUT_ARGS", allow_hyphen_values = true)]
    pub args: Option<String>,

    /// Build the release profile (default: true)
    #[arg(long, env = "INPUT_INCLUDERELEASE")]
    pub include_release: Option<bool>,

    /// Additionally build the debug profile
    #[arg(long, env = "INPUT_INCLUDEDEBUG")]
    pub include_debug: Option<bool>,
}

impl BuildArgs {
    /// Pass-through arguments, whitespace-split.
    pub fn split_args(&self) -> Vec<String> {
        self.args
            .as_deref()
            .map(|args| args.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

#[derive(Args)]
pub struct PublishArgs {
    #[command(flatten)]
    pub build: BuildArgs,

    /// GitHub API credential
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Repository owner (defaults to the GITHUB_REPOSITORY owner)
    #[arg(long, env = "INPUT_OWNER")]
    pub owner: Option<String>,

    /// Repository name (defaults to the GITHUB_REPOSITORY name)
    #[arg(long, env = "INPUT_REPO")]
    pub repo: Option<String>,

    /// Tag to release under; `__VERSION__` expands to the app version
    #[arg(long, env = "INPUT_TAGNAME")]
    pub tag_name: Option<String>,

    /// Upload into an existing release instead of resolving one by tag
    #[arg(long, env = "INPUT_RELEASEID")]
    pub release_id: Option<u64>,

    /// Release title; `__VERSION__` expands to the app version
    #[arg(long, env = "INPUT_RELEASENAME")]
    pub release_name: Option<String>,

    /// Release body text
    #[arg(long, env = "INPUT_RELEASEBODY")]
    pub release_body: Option<String>,

    /// Create the release as a draft
    #[arg(long, env = "INPUT_RELEASEDRAFT")]
    pub release_draft: Option<bool>,

    /// Mark the release as a prerelease
    #[arg(long, env = "INPUT_PRERELEASE")]
    pub prerelease: Option<bool>,

    /// Commitish the release points at (defaults to GITHUB_SHA)
    #[arg(long, env = "INPUT_RELEASECOMMITISH")]
    pub release_commitish: Option<String>,

    /// Maintain the auto-updater latest.json asset (default: true)
    #[arg(long, env = "INPUT_INCLUDEUPDATERJSON")]
    pub include_updater_json: Option<bool>,
}
