//! Maintaining the auto-updater manifest (`latest.json`).
//!
//! The manifest is a single release asset shared by every platform build of
//! a version, so each run must merge rather than replace: download the
//! previous manifest to keep the platform entries other runs contributed,
//! delete the old asset, set this run's entry, and upload the result.

use std::collections::{BTreeMap, HashSet};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::core::target::TargetInfo;
use crate::ops::build::Artifact;
use crate::publish::assets::asset_name;
use crate::publish::client::{Release, ReleaseClient};

/// Asset name of the updater manifest.
pub const UPDATER_MANIFEST_NAME: &str = "latest.json";

/// The updater manifest as the updater runtime consumes it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdaterManifest {
    pub version: String,
    pub notes: String,
    pub pub_date: String,
    #[serde(default)]
    pub platforms: BTreeMap<String, PlatformEntry>,
}

/// One platform's download pointer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformEntry {
    pub signature: String,
    pub url: String,
}

/// The updater's architecture vocabulary.
fn updater_arch(arch: &str) -> &str {
    match arch {
        "x64" | "amd64" => "x86_64",
        "arm64" => "aarch64",
        "arm" => "armv7",
        "x32" => "i686",
        other => other,
    }
}

/// The `<os>-<arch>` key this run's build belongs under.
pub fn updater_platform_key(target: &TargetInfo) -> String {
    format!(
        "{}-{}",
        target.platform.updater_os(),
        updater_arch(&target.arch)
    )
}

/// Update the release's `latest.json` with this run's platform entry.
pub fn upload_updater_manifest(
    client: &ReleaseClient,
    release: &Release,
    version: &str,
    notes: &str,
    target: &TargetInfo,
    artifacts: &[Artifact],
    host_arch: &str,
) -> Result<()> {
    let assets = client.assets(release.id)?;

    let mut platforms = BTreeMap::new();
    if let Some(previous) = assets.iter().find(|a| a.name == UPDATER_MANIFEST_NAME) {
        match client
            .download(&previous.browser_download_url)
            .map_err(anyhow::Error::from)
            .and_then(|data| Ok(serde_json::from_slice::<UpdaterManifest>(&data)?))
        {
            Ok(manifest) => platforms = manifest.platforms,
            Err(e) => tracing::warn!("discarding unreadable {UPDATER_MANIFEST_NAME}: {e:#}"),
        }
        client.delete_asset(previous.id)?;
    }

    // The platform entry points at the updater archive uploaded by this run
    // and embeds its detached signature.
    let uploaded_names: HashSet<String> = artifacts
        .iter()
        .map(|artifact| asset_name(&artifact.path, host_arch))
        .collect();
    let download_url = assets
        .iter()
        .filter(|asset| uploaded_names.contains(&asset.name))
        .find(|asset| asset.name.ends_with(".tar.gz") || asset.name.ends_with(".zip"))
        .map(|asset| asset.browser_download_url.clone());

    if let Some(url) = download_url {
        let signature = match artifacts
            .iter()
            .find(|artifact| artifact.path.to_string_lossy().ends_with(".sig"))
        {
            Some(artifact) => std::fs::read_to_string(&artifact.path).with_context(|| {
                format!("failed to read signature {}", artifact.path.display())
            })?,
            None => String::new(),
        };

        platforms.insert(updater_platform_key(target), PlatformEntry { signature, url });
    } else {
        tracing::warn!("no updater archive among this run's assets; keeping previous entries only");
    }

    let manifest = UpdaterManifest {
        version: version.to_string(),
        notes: notes.to_string(),
        pub_date: Utc::now().to_rfc3339(),
        platforms,
    };

    tracing::info!("uploading {UPDATER_MANIFEST_NAME}");
    client.upload_asset(
        release,
        UPDATER_MANIFEST_NAME,
        serde_json::to_vec_pretty(&manifest)?,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::target::TargetPlatform;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use url::Url;

    fn linux_x64() -> TargetInfo {
        TargetInfo {
            arch: "x86_64".to_string(),
            platform: TargetPlatform::Linux,
        }
    }

    #[test]
    fn test_platform_keys() {
        assert_eq!(updater_platform_key(&linux_x64()), "linux-x86_64");

        let mac = TargetInfo {
            arch: "arm64".to_string(),
            platform: TargetPlatform::Macos,
        };
        assert_eq!(updater_platform_key(&mac), "darwin-aarch64");

        let win = TargetInfo {
            arch: "x64".to_string(),
            platform: TargetPlatform::Windows,
        };
        assert_eq!(updater_platform_key(&win), "windows-x86_64");
    }

    #[test]
    fn test_manifest_merge_keeps_other_platforms() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("demo_1.0.0_amd64.AppImage.tar.gz");
        fs::write(&archive, "archive").unwrap();
        let sig = tmp.path().join("demo_1.0.0_amd64.AppImage.tar.gz.sig");
        fs::write(&sig, "signature-content").unwrap();

        let mut server = mockito::Server::new();
        let previous_manifest = r#"{
            "version": "0.9.0",
            "notes": "old",
            "pub_date": "2026-01-01T00:00:00Z",
            "platforms": {
                "windows-x86_64": {"signature": "winsig", "url": "winurl"}
            }
        }"#;

        let _assets = server
            .mock("GET", "/repos/octo/widgets/releases/7/assets")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(
                r#"[
                    {{"id": 50, "name": "latest.json", "browser_download_url": "{0}/download/latest.json"}},
                    {{"id": 51, "name": "demo_1.0.0_amd64.AppImage.tar.gz", "browser_download_url": "{0}/download/archive"}}
                ]"#,
                server.url()
            ))
            .create();
        let _download = server
            .mock("GET", "/download/latest.json")
            .with_status(200)
            .with_body(previous_manifest)
            .create();
        let delete = server
            .mock("DELETE", "/repos/octo/widgets/releases/assets/50")
            .with_status(204)
            .expect(1)
            .create();
        let upload = server
            .mock("POST", "/upload/releases/7/assets")
            .match_query(mockito::Matcher::UrlEncoded(
                "name".into(),
                "latest.json".into(),
            ))
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::PartialJsonString(
                    r#"{"version": "1.0.0", "platforms": {"windows-x86_64": {"signature": "winsig"}}}"#
                        .to_string(),
                ),
                mockito::Matcher::PartialJsonString(
                    r#"{"platforms": {"linux-x86_64": {"signature": "signature-content"}}}"#
                        .to_string(),
                ),
            ]))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": 60, "name": "latest.json", "browser_download_url": "d"}"#)
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

        let artifacts = vec![
            Artifact {
                path: PathBuf::from(&archive),
                arch: "amd64".to_string(),
            },
            Artifact {
                path: PathBuf::from(&sig),
                arch: "amd64".to_string(),
            },
        ];

        upload_updater_manifest(
            &client,
            &release,
            "1.0.0",
            "release notes",
            &linux_x64(),
            &artifacts,
            "x86_64",
        )
        .unwrap();

        delete.assert();
        upload.assert();
    }
}
