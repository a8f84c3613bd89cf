//! Uploading installer artifacts as release assets.

use anyhow::{Context, Result};

use crate::ops::build::Artifact;
use crate::publish::client::{Release, ReleaseClient};

/// Multi-part extensions an artifact name can carry, longest first so the
/// signature sidecars match before the archives they sign.
pub const UPLOAD_EXTENSIONS: &[&str] = &[
    ".app.tar.gz.sig",
    ".app.tar.gz",
    ".dmg",
    ".AppImage.tar.gz.sig",
    ".AppImage.tar.gz",
    ".AppImage",
    ".deb",
    ".rpm",
    ".msi.zip.sig",
    ".msi.zip",
    ".msi",
    ".nsis.zip.sig",
    ".nsis.zip",
    ".exe",
];

/// Compute the asset name an artifact is uploaded under.
///
/// macOS app archives get an architecture suffix because their file names
/// carry none, and debug-profile artifacts get a `-debug` infix so the two
/// profiles can coexist on one release.
pub fn asset_name(path: &std::path::Path, host_arch: &str) -> String {
    let basename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let ext = UPLOAD_EXTENSIONS
        .iter()
        .find(|candidate| basename.contains(*candidate))
        .map(|s| s.to_string())
        .unwrap_or_else(|| {
            path.extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_default()
        });

    let filename = basename.replacen(&ext, "", 1);

    let path_str = path.to_string_lossy();
    let arch = if ext == ".app.tar.gz.sig" || ext == ".app.tar.gz" {
        if path_str.contains("universal-apple-darwin") {
            "_universal"
        } else if path_str.contains("aarch64-apple-darwin") {
            "_aarch64"
        } else if host_arch == "aarch64" || host_arch == "arm64" {
            "_aarch64"
        } else {
            "_x64"
        }
    } else {
        ""
    };

    let is_debug = path
        .components()
        .any(|component| component.as_os_str() == "debug");

    if is_debug {
        format!("{filename}-debug{arch}{ext}")
    } else {
        format!("{filename}{arch}{ext}")
    }
}

/// Upload the artifacts to `release`, one at a time. An existing asset with
/// a colliding name is deleted first so re-runs overwrite instead of
/// failing.
pub fn upload_assets(
    client: &ReleaseClient,
    release: &Release,
    artifacts: &[Artifact],
    host_arch: &str,
) -> Result<()> {
    let existing = client.assets(release.id)?;

    for artifact in artifacts {
        let name = asset_name(&artifact.path, host_arch);

        if let Some(asset) = existing.iter().find(|a| a.name == name) {
            tracing::info!("deleting existing asset {name}");
            client.delete_asset(asset.id)?;
        }

        let data = std::fs::read(&artifact.path)
            .with_context(|| format!("failed to read artifact {}", artifact.path.display()))?;
        tracing::info!("uploading {name} ({} bytes)", data.len());
        client.upload_asset(release, &name, data)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;
    use url::Url;

    #[test]
    fn test_asset_name_plain() {
        assert_eq!(
            asset_name(Path::new("/t/release/bundle/deb/demo_1.0.0_amd64.deb"), "x86_64"),
            "demo_1.0.0_amd64.deb"
        );
    }

    #[test]
    fn test_asset_name_debug_profile() {
        assert_eq!(
            asset_name(Path::new("/t/debug/bundle/deb/demo_1.0.0_amd64.deb"), "x86_64"),
            "demo_1.0.0_amd64-debug.deb"
        );
    }

    #[test]
    fn test_asset_name_app_archive_arch_suffix() {
        assert_eq!(
            asset_name(Path::new("/t/release/bundle/macos/Demo.app.tar.gz"), "x86_64"),
            "Demo_x64.app.tar.gz"
        );
        assert_eq!(
            asset_name(Path::new("/t/release/bundle/macos/Demo.app.tar.gz"), "aarch64"),
            "Demo_aarch64.app.tar.gz"
        );
        assert_eq!(
            asset_name(
                Path::new("/t/universal-apple-darwin/release/bundle/macos/Demo.app.tar.gz.sig"),
                "x86_64",
            ),
            "Demo_universal.app.tar.gz.sig"
        );
    }

    #[test]
    fn test_asset_name_compound_extension_kept_whole() {
        assert_eq!(
            asset_name(
                Path::new("/t/release/bundle/appimage/demo_1.0.0_amd64.AppImage.tar.gz.sig"),
                "x86_64",
            ),
            "demo_1.0.0_amd64.AppImage.tar.gz.sig"
        );
    }

    #[test]
    fn test_upload_deletes_colliding_asset_first() {
        let tmp = TempDir::new().unwrap();
        let artifact_path = tmp.path().join("demo_1.0.0_amd64.deb");
        fs::write(&artifact_path, "package bytes").unwrap();

        let mut server = mockito::Server::new();
        let _list = server
            .mock("GET", "/repos/octo/widgets/releases/7/assets")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[{"id": 40, "name": "demo_1.0.0_amd64.deb", "browser_download_url": "d"}]"#,
            )
            .create();
        let delete = server
            .mock("DELETE", "/repos/octo/widgets/releases/assets/40")
            .with_status(204)
            .expect(1)
            .create();
        let upload = server
            .mock("POST", "/upload/releases/7/assets")
            .match_query(mockito::Matcher::UrlEncoded(
                "name".into(),
                "demo_1.0.0_amd64.deb".into(),
            ))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": 41, "name": "demo_1.0.0_amd64.deb", "browser_download_url": "d"}"#)
            .expect(1)
            .create();

        let url = Url::parse(&server.url()).unwrap();
        let client = ReleaseClient::new(&url, "fake-token", "octo", "widgets").unwrap();
        let release = Release {
            id: 7,
            tag_name: "v1.0.0".to_string(),
            upload_url: format!("{}/upload/releases/7/assets{{?name,label}}", server.url()),
            html_url: "h".to_string(),
            draft: false,
        };

        let artifacts = vec![Artifact {
            path: PathBuf::from(&artifact_path),
            arch: "amd64".to_string(),
        }];
        upload_assets(&client, &release, &artifacts, "x86_64").unwrap();

        delete.assert();
        upload.assert();
    }
}
