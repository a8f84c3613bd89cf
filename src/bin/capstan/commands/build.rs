//! `capstan build` command

use anyhow::Result;

use capstan::ops::build::{build_project, Artifact, BuildOptions};
use capstan::ops::init::InitOptions;
use capstan::util::GlobalContext;

use crate::cli::BuildArgs;

/// Run the builds requested by `args` and return everything they produced.
pub fn run_builds(ctx: &GlobalContext, args: &BuildArgs) -> Result<Vec<Artifact>> {
    let root = ctx.cwd().join(&args.project_path);

    let opts = BuildOptions {
        tauri_script: args.tauri_script.clone(),
        args: args.split_args(),
        init: InitOptions {
            app_name: args.app_name.clone(),
            app_version: args.app_version.clone(),
            bundle_identifier: args.bundle_identifier.clone(),
            dist_path: args.dist_path.clone(),
            icon_path: args.icon_path.clone(),
        },
    };

    let mut artifacts = Vec::new();
    if args.include_release.unwrap_or(true) {
        artifacts.extend(build_project(ctx, &root, false, &opts)?);
    }
    if args.include_debug.unwrap_or(false) {
        artifacts.extend(build_project(ctx, &root, true, &opts)?);
    }

    Ok(artifacts)
}

pub fn execute(args: BuildArgs) -> Result<()> {
    let ctx = GlobalContext::new()?;

    let artifacts = run_builds(&ctx, &args)?;

    if artifacts.is_empty() {
        eprintln!("warning: no artifacts were produced");
    }
    for artifact in &artifacts {
        println!("{}", artifact.path.display());
    }

    Ok(())
}
