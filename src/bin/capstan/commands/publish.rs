//! `capstan publish` command

use std::io::Write;

use anyhow::{bail, Context, Result};

use capstan::core::target::{TargetInfo, TargetPlatform};
use capstan::ops::build::archive_app_bundles;
use capstan::ops::info::app_info;
use capstan::publish::assets::upload_assets;
use capstan::publish::updater::upload_updater_manifest;
use capstan::publish::{create_or_find_release, NewRelease, Release, ReleaseClient};
use capstan::util::GlobalContext;

use crate::cli::PublishArgs;
use crate::commands::build::run_builds;

pub fn execute(args: PublishArgs) -> Result<()> {
    let ctx = GlobalContext::new()?;

    // Validate inputs before spending minutes on a build.
    if args.release_id.is_none() && args.tag_name.is_some() != args.release_name.is_some() {
        bail!("`tagName` is required along with `releaseName` when creating a release");
    }
    if args.release_id.is_none() && args.tag_name.is_none() {
        bail!("either `tagName` or `releaseId` is required to publish");
    }
    let Some(token) = args.token.clone() else {
        bail!("GITHUB_TOKEN is required");
    };

    let (owner, repo) = match (&args.owner, &args.repo) {
        (Some(owner), Some(repo)) => (owner.clone(), repo.clone()),
        _ => {
            let (owner, repo) = ctx
                .repo_parts()
                .context("GITHUB_REPOSITORY is not set; pass --owner and --repo")?;
            (
                args.owner.clone().unwrap_or_else(|| owner.to_string()),
                args.repo.clone().unwrap_or_else(|| repo.to_string()),
            )
        }
    };

    let mut artifacts = run_builds(&ctx, &args.build)?;
    if artifacts.is_empty() {
        bail!("no artifacts were found");
    }

    eprintln!("    Found {} artifact(s):", artifacts.len());
    for artifact in &artifacts {
        eprintln!("      {}", artifact.path.display());
    }

    let root = ctx.cwd().join(&args.build.project_path);
    let info = app_info(&root, None, None)?;

    let expand = |input: &str| input.replace("__VERSION__", &info.version);
    let body = args.release_body.as_deref().map(expand).unwrap_or_default();

    let client = ReleaseClient::new(ctx.api_url(), &token, &owner, &repo)?;

    let release: Release = match args.release_id {
        Some(id) => client.release_by_id(id)?,
        None => {
            let (Some(tag_name), Some(release_name)) =
                (args.tag_name.as_deref(), args.release_name.as_deref())
            else {
                bail!("`tagName` is required along with `releaseName` when creating a release");
            };
            let params = NewRelease {
                tag_name: expand(&tag_name.replace("refs/tags/", "")),
                name: expand(&release_name.replace("refs/tags/", "")),
                body: Some(body.clone()),
                draft: args.release_draft.unwrap_or(false),
                prerelease: args.prerelease.unwrap_or(false),
                target_commitish: args
                    .release_commitish
                    .clone()
                    .or_else(|| ctx.commit_sha().map(str::to_string)),
            };
            create_or_find_release(&client, &params)?
        }
    };

    let target_arg = {
        let split = args.build.split_args();
        ["-t", "--target"]
            .iter()
            .find_map(|flag| {
                split
                    .iter()
                    .position(|a| a == flag)
                    .and_then(|idx| split.get(idx + 1).cloned())
            })
    };
    let target_info = TargetInfo::detect(&ctx, target_arg.as_deref());

    // Bare .app bundles are directories and cannot be uploaded.
    if target_info.platform == TargetPlatform::Macos {
        archive_app_bundles(&mut artifacts)?;
    }

    upload_assets(&client, &release, &artifacts, ctx.host_arch())?;

    if args.include_updater_json.unwrap_or(true) && info.create_updater_artifacts != Some(false) {
        upload_updater_manifest(
            &client,
            &release,
            &info.version,
            &body,
            &target_info,
            &artifacts,
            ctx.host_arch(),
        )?;
    }

    set_output(&ctx, "releaseId", &release.id.to_string())?;
    set_output(&ctx, "releaseHtmlUrl", &release.html_url)?;
    let paths: Vec<String> = artifacts
        .iter()
        .map(|a| a.path.display().to_string())
        .collect();
    set_output(&ctx, "artifactPaths", &serde_json::to_string(&paths)?)?;

    eprintln!(
        "    Published {} asset(s) to {}",
        artifacts.len(),
        release.html_url
    );

    Ok(())
}

/// Record a step output for the surrounding workflow, if there is one.
fn set_output(ctx: &GlobalContext, name: &str, value: &str) -> Result<()> {
    let Some(path) = ctx.output_file() else {
        return Ok(());
    };
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open output file {}", path.display()))?;
    writeln!(file, "{name}={value}")?;
    Ok(())
}
