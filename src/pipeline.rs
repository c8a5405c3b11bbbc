//! Acquisition pipeline: mount a source, save and extract every repository on
//! it, recurse into top-level images, then activate what was extracted.

use anyhow::{bail, Context as _, Result};
use std::path::{Path, PathBuf};

use crate::activate;
use crate::context::Context;
use crate::dd::DriverPackage;
use crate::disk::{self, MountKind};
use crate::repo;
use crate::util;

/// How a source reached us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    /// A disk named on the kernel command line, found at a device node
    Disk,
    /// An image downloaded by the network layer to a local file
    Net,
}

/// One user-supplied driver disk, identified as it appears in the to-do ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub mode: RequestMode,
    pub id: String,
    pub source: PathBuf,
}

impl Request {
    pub fn disk(id: impl Into<String>, device: impl Into<PathBuf>) -> Self {
        Self {
            mode: RequestMode::Disk,
            id: id.into(),
            source: device.into(),
        }
    }

    pub fn net(url: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        Self {
            mode: RequestMode::Net,
            id: url.into(),
            source: file.into(),
        }
    }
}

/// Process one request end to end. Returns whether every request is now finished.
pub fn handle_request(ctx: &Context, request: &Request) -> Result<bool> {
    tracing::info!(
        "{:?}: '{}' found at {}",
        request.mode,
        request.id,
        request.source.display()
    );

    let kind = MountKind::for_source(&request.source);
    process_source(ctx, &request.source, kind)
        .with_context(|| format!("Failed to process driver disk {}", request.id))?;
    finish(ctx, &request.id)
}

/// Mount `source`, handle every repository and nested image on it, unmount.
pub fn process_source(ctx: &Context, source: &Path, kind: MountKind) -> Result<()> {
    process_nested(ctx, source, kind, 0)
}

fn process_nested(ctx: &Context, source: &Path, kind: MountKind, depth: usize) -> Result<()> {
    if depth > ctx.config.max_nesting_depth {
        bail!(
            "{} is nested more than {} images deep",
            source.display(),
            ctx.config.max_nesting_depth
        );
    }

    let tools = ctx.tools();
    let mounted = disk::mount(&tools, &ctx.config.staging.mount_stem, source, kind)?;

    for repo in repo::find_repos(mounted.path(), &ctx.config.arch) {
        save_repo(ctx, &repo)?;
        extract_repo(ctx, &repo)?;
    }

    for iso in repo::find_isos(mounted.path())? {
        tracing::debug!("descending into {}", iso.display());
        process_nested(ctx, &iso, MountKind::Loop, depth + 1)?;
    }

    Ok(())
}

/// Copy a repository verbatim to the next free staging directory.
pub fn save_repo(ctx: &Context, repo: &Path) -> Result<PathBuf> {
    let dest = util::mkdir_seq(&ctx.config.staging.repo_stem)?;
    tracing::debug!("save_repo: copying {} to {}", repo.display(), dest.display());

    util::copy_tree(repo, &dest)
        .with_context(|| format!("Failed to save repository {}", repo.display()))?;
    Ok(dest)
}

/// Extract every package listed in `repo`. The first failure aborts the rest.
pub fn extract_repo(ctx: &Context, repo: &Path) -> Result<Vec<DriverPackage>> {
    let packages = ctx
        .tools()
        .list_packages(repo)
        .with_context(|| format!("Failed to list packages in {}", repo.display()))?;

    for package in &packages {
        extract_package(ctx, package)?;
    }

    Ok(packages)
}

/// Extract one package into the working directory, recording it in the
/// package ledger when it carries modules or firmware.
pub fn extract_package(ctx: &Context, package: &DriverPackage) -> Result<()> {
    tracing::info!("extracting {}", package.name);

    ctx.tools()
        .extract_package(&package.source, &ctx.config.staging.workdir)
        .with_context(|| format!("Failed to extract {}", package.source.display()))?;

    if package.provides_drivers() {
        util::append_line(&ctx.config.ledger.packages, &package.name)?;
    }
    Ok(())
}

/// Activate extracted drivers, load them, and record `request_id` as done.
///
/// Activation holds the ledger lock, since every process shares the work
/// directory. Returns whether that completed the last outstanding request.
pub fn finish(ctx: &Context, request_id: &str) -> Result<bool> {
    ctx.ledger().finish(request_id, || {
        let modules = activate::activate(
            &ctx.config.staging.workdir,
            &ctx.config.module_updates_dir(),
            &ctx.config.firmware_updates_dir(),
        )?;
        activate::load(&ctx.tools(), &modules);
        Ok(())
    })
}
