//! Interactive driver disk selection: pick a device, then the drivers (or
//! the image) on it, until the user continues without picking a device.

use anyhow::{bail, Context as _, Result};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use crate::context::Context;
use crate::dd::DriverPackage;
use crate::disk::{self, DeviceRecord, MountKind};
use crate::menu::{EndOfInput, TextMenu};
use crate::pipeline;
use crate::repo;

/// Request id recorded in the ledgers for an interactive session
pub const MENU_REQUEST: &str = "menu";

/// Run a session on the terminal. Returns whether every request is now finished.
pub fn run(ctx: &Context) -> Result<bool> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();
    Session::new(ctx, &mut input, &mut output).run()
}

pub struct Session<'a> {
    ctx: &'a Context,
    input: &'a mut dyn BufRead,
    output: &'a mut dyn Write,
}

impl<'a> Session<'a> {
    pub fn new(ctx: &'a Context, input: &'a mut dyn BufRead, output: &'a mut dyn Write) -> Self {
        Self { ctx, input, output }
    }

    /// Choose from the block devices blkid reports.
    pub fn run(&mut self) -> Result<bool> {
        let ctx = self.ctx;
        let tools = ctx.tools();
        let labels_dir = ctx.config.tools.labels_dir.clone();
        self.run_with_devices(|| disk::device_info(&tools, &labels_dir))
    }

    /// Choose from whatever `devices` returns, refreshed each round.
    pub fn run_with_devices(
        &mut self,
        devices: impl FnMut() -> Result<Vec<DeviceRecord>>,
    ) -> Result<bool> {
        let mut menu = TextMenu::with_provider(devices)?
            .header("DEVICES")
            .page_size(self.ctx.config.menu.page_size);

        loop {
            let chosen = menu.run(&mut *self.input, &mut *self.output)?;
            if chosen.is_empty() {
                break;
            }

            for dev in &chosen {
                let kind = MountKind::for_source(&dev.device);
                match self.dd_menu(&dev.device, kind, 0) {
                    Ok(()) => {}
                    Err(e) if e.is::<EndOfInput>() => return Err(e),
                    Err(e) => {
                        tracing::warn!("{:#}", e);
                        writeln!(
                            self.output,
                            "=== Error loading drivers from {}: {:#} ===",
                            dev.device.display(),
                            e
                        )?;
                    }
                }
            }

            menu.reset();
            menu.refresh()?;
        }

        pipeline::finish(self.ctx, MENU_REQUEST)
    }

    /// Mount `source` and offer its drivers, or its images if it has no drivers.
    fn dd_menu(&mut self, source: &Path, kind: MountKind, depth: usize) -> Result<()> {
        let ctx = self.ctx;
        if depth > ctx.config.max_nesting_depth {
            bail!(
                "{} is nested more than {} images deep",
                source.display(),
                ctx.config.max_nesting_depth
            );
        }

        let tools = ctx.tools();
        let mounted = disk::mount(&tools, &ctx.config.staging.mount_stem, source, kind)?;
        let repos = repo::find_repos(mounted.path(), &ctx.config.arch);
        let isos = repo::find_isos(mounted.path())?;

        if !repos.is_empty() {
            self.package_menu(&repos)
        } else if !isos.is_empty() {
            self.iso_menu(&isos, depth)
        } else {
            writeln!(
                self.output,
                "=== No driver disks found in {}! ===\n",
                source.display()
            )?;
            Ok(())
        }
    }

    /// Offer every package of every repository; save and extract the picks.
    fn package_menu(&mut self, repos: &[PathBuf]) -> Result<()> {
        let ctx = self.ctx;
        let tools = ctx.tools();

        let mut drivers: Vec<DriverPackage> = Vec::new();
        for repo in repos {
            let packages = tools
                .list_packages(repo)
                .with_context(|| format!("Failed to list packages in {}", repo.display()))?;
            drivers.extend(packages);
        }

        let mut menu = TextMenu::new(drivers)
            .header("DRIVERS")
            .multi(true)
            .page_size(ctx.config.menu.page_size);
        let chosen = menu.run(&mut *self.input, &mut *self.output)?;

        let mut saved: Vec<&Path> = Vec::new();
        for package in &chosen {
            if !saved.contains(&package.repo.as_path()) {
                pipeline::save_repo(ctx, &package.repo)?;
                saved.push(&package.repo);
            }
            pipeline::extract_package(ctx, package)?;
        }

        Ok(())
    }

    /// Pick one image and go through the same flow for it.
    fn iso_menu(&mut self, isos: &[PathBuf], depth: usize) -> Result<()> {
        let mut menu = TextMenu::with_formatter(isos.to_vec(), |iso: &PathBuf| {
            iso.display().to_string()
        })
        .header("ISOS")
        .page_size(self.ctx.config.menu.page_size);

        for iso in menu.run(&mut *self.input, &mut *self.output)? {
            self.dd_menu(&iso, MountKind::Loop, depth + 1)?;
        }
        Ok(())
    }
}
