//! capstan - builds Tauri desktop apps in CI and publishes the installers
//! to GitHub releases.
//!
//! This crate provides the core library functionality for capstan,
//! including configuration resolution, artifact path templating, and the
//! release publishing client.

pub mod core;
pub mod ops;
pub mod publish;
pub mod util;

pub use crate::core::{
    config::AppConfig, manifest::PackageIdentity, target::TargetInfo, target::TargetPlatform,
};

pub use ops::{app_info, build_project, AppInfo, Artifact, BuildOptions, Runner};
pub use publish::{ReleaseClient, Release};
pub use util::context::GlobalContext;
