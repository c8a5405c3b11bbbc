//! Activation of extracted kernel modules and firmware.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::tools::Tools;
use crate::util;

/// Kernel objects, compressed or not: `x.ko`, `x.ko.xz`, `x.ko.zst`.
pub fn is_kernel_object(file_name: &str) -> bool {
    file_name.contains(".ko")
}

/// Module short name: the file name up to its first `.ko`.
pub fn module_name(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_string_lossy();
    let stem = name.split(".ko").next()?;
    Some(stem.to_string())
}

/// `dir` relocated under `workdir`, e.g. `/updates` + `/lib/firmware/updates`.
fn mirrored(workdir: &Path, dir: &Path) -> PathBuf {
    workdir.join(dir.strip_prefix("/").unwrap_or(dir))
}

/// Copy freshly extracted modules and firmware into the live update
/// directories, then move them into the same directories mirrored under
/// `workdir` so the installed system can pick them up later.
///
/// Returns the short names of the modules found.
pub fn activate(workdir: &Path, module_dir: &Path, firmware_dir: &Path) -> Result<Vec<String>> {
    let modules = util::iter_files(&workdir.join("lib/modules"), is_kernel_object);
    let firmware = util::iter_files(&workdir.join("lib/firmware"), |_| true);
    tracing::debug!(
        "activating {} module(s) and {} firmware file(s) from {}",
        modules.len(),
        firmware.len(),
        workdir.display()
    );

    util::copy_files(&modules, module_dir).context("Failed to install module updates")?;
    util::copy_files(&firmware, firmware_dir).context("Failed to install firmware updates")?;
    util::move_files(&modules, &mirrored(workdir, module_dir))
        .context("Failed to stage module updates")?;
    util::move_files(&firmware, &mirrored(workdir, firmware_dir))
        .context("Failed to stage firmware updates")?;

    Ok(modules.iter().filter_map(|m| module_name(m)).collect())
}

/// Rebuild module dependencies and try to load `names`. Never fails.
pub fn load(tools: &Tools<'_>, names: &[String]) {
    tracing::debug!("load_drivers: {:?}", names);

    if !tools.depmod() {
        tracing::warn!("depmod failed, module dependencies may be stale");
    }
    if names.is_empty() {
        return;
    }
    if !tools.modprobe(names) {
        tracing::warn!("some driver modules failed to load: {}", names.join(" "));
    }
}
