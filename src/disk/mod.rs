pub mod blkid;

pub use blkid::*;

use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};

use crate::tools::Tools;
use crate::util;

/// How a source gets attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountKind {
    /// A block device node, mounted directly
    Device,
    /// A regular file (downloaded or nested image), mounted through a loop device
    Loop,
}

impl MountKind {
    pub fn for_source(source: &Path) -> Self {
        if source.starts_with("/dev") {
            MountKind::Device
        } else {
            MountKind::Loop
        }
    }

    pub fn options(&self) -> Option<&'static str> {
        match self {
            MountKind::Device => None,
            MountKind::Loop => Some("loop"),
        }
    }
}

/// A mounted source. Unmounted when dropped, whatever the reason the scope ends.
pub struct Mounted<'a> {
    tools: &'a Tools<'a>,
    source: PathBuf,
    mountpoint: PathBuf,
}

impl<'a> Mounted<'a> {
    pub fn path(&self) -> &Path {
        &self.mountpoint
    }
}

impl Drop for Mounted<'_> {
    fn drop(&mut self) {
        if !self.tools.umount(&self.mountpoint) {
            tracing::debug!(
                "umount of {} ({}) failed, leaving it",
                self.mountpoint.display(),
                self.source.display()
            );
        }
    }
}

/// Mount `source` on a fresh `<stem>N` directory.
pub fn mount<'a>(
    tools: &'a Tools<'a>,
    mount_stem: &Path,
    source: &Path,
    kind: MountKind,
) -> Result<Mounted<'a>> {
    let mountpoint = util::mkdir_seq(mount_stem)?;
    tools
        .mount(source, &mountpoint, kind.options())
        .with_context(|| format!("Failed to mount {}", source.display()))?;

    Ok(Mounted {
        tools,
        source: source.to_path_buf(),
        mountpoint,
    })
}
