//! Global context for capstan operations.
//!
//! Every environment variable capstan reads is captured here, once, when the
//! context is constructed. The rest of the crate receives a `GlobalContext`
//! instead of reaching into `std::env`, which keeps the components testable
//! and the process-wide reads in one place.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use url::Url;

/// Default GitHub REST API endpoint, used when `GITHUB_API_URL` is unset.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Global context containing the working directory and a snapshot of the
/// environment.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// `CARGO_TARGET_DIR` override, if set
    cargo_target_dir: Option<PathBuf>,

    /// `owner/repo` slug of the repository being released (`GITHUB_REPOSITORY`)
    repository: Option<String>,

    /// Commit that triggered the run (`GITHUB_SHA`)
    commit_sha: Option<String>,

    /// Path of the step-output file (`GITHUB_OUTPUT`), if running in Actions
    output_file: Option<PathBuf>,

    /// GitHub API base URL (`GITHUB_API_URL` or the public endpoint)
    api_url: Url,

    /// Host CPU architecture (e.g. `x86_64`, `aarch64`)
    host_arch: String,

    /// Host operating system (`linux`, `macos`, `windows`)
    host_os: String,
}

impl GlobalContext {
    /// Create a new GlobalContext from the process environment.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;

        let api_url = match std::env::var("GITHUB_API_URL") {
            Ok(raw) => Url::parse(&raw)
                .with_context(|| format!("invalid GITHUB_API_URL: {raw}"))?,
            Err(_) => Url::parse(DEFAULT_API_URL).expect("default API URL is valid"),
        };

        Ok(GlobalContext {
            cwd,
            cargo_target_dir: std::env::var_os("CARGO_TARGET_DIR").map(PathBuf::from),
            repository: std::env::var("GITHUB_REPOSITORY").ok(),
            commit_sha: std::env::var("GITHUB_SHA").ok(),
            output_file: std::env::var_os("GITHUB_OUTPUT").map(PathBuf::from),
            api_url,
            host_arch: std::env::consts::ARCH.to_string(),
            host_os: std::env::consts::OS.to_string(),
        })
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Result<Self> {
        let mut ctx = Self::new()?;
        ctx.cwd = cwd;
        Ok(ctx)
    }

    /// Override the `CARGO_TARGET_DIR` snapshot.
    pub fn with_cargo_target_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.cargo_target_dir = dir;
        self
    }

    /// Override the host architecture and operating system.
    pub fn with_host(mut self, arch: impl Into<String>, os: impl Into<String>) -> Self {
        self.host_arch = arch.into();
        self.host_os = os.into();
        self
    }

    /// Override the GitHub API base URL.
    pub fn with_api_url(mut self, url: Url) -> Self {
        self.api_url = url;
        self
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Get the `CARGO_TARGET_DIR` override, if any.
    pub fn cargo_target_dir(&self) -> Option<&Path> {
        self.cargo_target_dir.as_deref()
    }

    /// Get the `owner/repo` slug, if running under Actions.
    pub fn repository(&self) -> Option<&str> {
        self.repository.as_deref()
    }

    /// Split the repository slug into `(owner, repo)`.
    pub fn repo_parts(&self) -> Option<(&str, &str)> {
        self.repository.as_deref()?.split_once('/')
    }

    /// Get the commit that triggered the run, if known.
    pub fn commit_sha(&self) -> Option<&str> {
        self.commit_sha.as_deref()
    }

    /// Get the step-output file path, if running under Actions.
    pub fn output_file(&self) -> Option<&Path> {
        self.output_file.as_deref()
    }

    /// Get the GitHub API base URL.
    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    /// Get the host CPU architecture.
    pub fn host_arch(&self) -> &str {
        &self.host_arch
    }

    /// Get the host operating system.
    pub fn host_os(&self) -> &str {
        &self.host_os
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_cwd() {
        let ctx = GlobalContext::new().unwrap();
        assert!(ctx.cwd().is_absolute());
    }

    #[test]
    fn test_repo_parts() {
        let mut ctx = GlobalContext::new().unwrap();
        ctx.repository = Some("octo/widgets".to_string());
        assert_eq!(ctx.repo_parts(), Some(("octo", "widgets")));

        ctx.repository = Some("malformed".to_string());
        assert_eq!(ctx.repo_parts(), None);
    }

    #[test]
    fn test_host_override() {
        let ctx = GlobalContext::new()
            .unwrap()
            .with_host("aarch64", "macos");
        assert_eq!(ctx.host_arch(), "aarch64");
        assert_eq!(ctx.host_os(), "macos");
    }
}
