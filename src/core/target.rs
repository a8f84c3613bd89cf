//! Build target identification.

use std::fmt;

use crate::util::GlobalContext;

/// Operating systems the tauri CLI can bundle for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetPlatform {
    Windows,
    Macos,
    Linux,
    Android,
    Ios,
}

impl TargetPlatform {
    /// The name used in platform-specific configuration file names
    /// (`tauri.<platform>.conf.json`).
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetPlatform::Windows => "windows",
            TargetPlatform::Macos => "macos",
            TargetPlatform::Linux => "linux",
            TargetPlatform::Android => "android",
            TargetPlatform::Ios => "ios",
        }
    }

    /// The OS half of the updater manifest's platform key. The updater
    /// spells macOS `darwin`.
    pub fn updater_os(&self) -> &'static str {
        match self {
            TargetPlatform::Macos => "darwin",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for TargetPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The architecture and platform a build is produced for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetInfo {
    /// CPU architecture label as it appears in artifact names before
    /// per-format aliasing (e.g. `x86_64`, `aarch64`, `i686`)
    pub arch: String,

    /// Target operating system
    pub platform: TargetPlatform,
}

impl TargetInfo {
    /// The host machine's target.
    pub fn host(ctx: &GlobalContext) -> Self {
        let platform = match ctx.host_os() {
            "windows" => TargetPlatform::Windows,
            "macos" => TargetPlatform::Macos,
            _ => TargetPlatform::Linux,
        };
        TargetInfo {
            arch: ctx.host_arch().to_string(),
            platform,
        }
    }

    /// Derive the target from an explicit `--target` triple, falling back to
    /// the host for anything the triple doesn't say.
    pub fn from_triple(ctx: &GlobalContext, triple: &str) -> Self {
        let mut info = Self::host(ctx);

        if triple.contains("windows") {
            info.platform = TargetPlatform::Windows;
        } else if triple.contains("darwin") || triple.contains("macos") {
            info.platform = TargetPlatform::Macos;
        } else if triple.contains("linux") {
            info.platform = TargetPlatform::Linux;
        } else if triple.contains("android") {
            info.platform = TargetPlatform::Android;
        } else if triple.contains("ios") {
            info.platform = TargetPlatform::Ios;
        }

        if triple.contains('-') {
            if let Some(arch) = triple.split('-').next() {
                info.arch = arch.to_string();
            }
        }

        info
    }

    /// Derive the target from an optional `--target` triple.
    pub fn detect(ctx: &GlobalContext, triple: Option<&str>) -> Self {
        match triple {
            Some(t) => Self::from_triple(ctx, t),
            None => Self::host(ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> GlobalContext {
        GlobalContext::new().unwrap().with_host("x86_64", "linux")
    }

    #[test]
    fn test_host_target() {
        let info = TargetInfo::host(&ctx());
        assert_eq!(info.arch, "x86_64");
        assert_eq!(info.platform, TargetPlatform::Linux);
    }

    #[test]
    fn test_from_triple() {
        let info = TargetInfo::from_triple(&ctx(), "aarch64-apple-darwin");
        assert_eq!(info.arch, "aarch64");
        assert_eq!(info.platform, TargetPlatform::Macos);

        let info = TargetInfo::from_triple(&ctx(), "i686-pc-windows-msvc");
        assert_eq!(info.arch, "i686");
        assert_eq!(info.platform, TargetPlatform::Windows);

        let info = TargetInfo::from_triple(&ctx(), "aarch64-linux-android");
        assert_eq!(info.platform, TargetPlatform::Android);
    }

    #[test]
    fn test_triple_without_dashes_keeps_host_arch() {
        let info = TargetInfo::from_triple(&ctx(), "windows");
        assert_eq!(info.arch, "x86_64");
        assert_eq!(info.platform, TargetPlatform::Windows);
    }

    #[test]
    fn test_updater_os() {
        assert_eq!(TargetPlatform::Macos.updater_os(), "darwin");
        assert_eq!(TargetPlatform::Linux.updater_os(), "linux");
        assert_eq!(TargetPlatform::Windows.updater_os(), "windows");
    }
}
