//! Runtime configuration.
//!
//! Every path and tool name the program touches lives here, loaded once at
//! startup and passed down through [`crate::context::Context`]. Machine facts
//! (architecture, running kernel) are filled from `uname(2)` unless the
//! configuration file pins them.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Machine architecture used to locate `rpms/<arch>` (defaults to `uname -m`)
    pub arch: String,
    /// Running kernel release (defaults to `uname -r`)
    pub kernel_release: String,
    /// Installer version handed to the package listing tool
    pub installer_version: String,
    /// Flags handed to the package extraction tool
    pub extract_flags: String,
    /// Deepest chain of nested images that will be followed
    pub max_nesting_depth: usize,
    pub ledger: LedgerConfig,
    pub staging: StagingConfig,
    pub updates: UpdatesConfig,
    pub tools: ToolsConfig,
    pub menu: MenuConfig,
}

impl Default for Config {
    fn default() -> Self {
        let (arch, kernel_release) = detect_machine();
        Self {
            arch,
            kernel_release,
            installer_version: "19.0".into(),
            extract_flags: "-blmf".into(),
            max_nesting_depth: 8,
            ledger: LedgerConfig::default(),
            staging: StagingConfig::default(),
            updates: UpdatesConfig::default(),
            tools: ToolsConfig::default(),
            menu: MenuConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub todo: PathBuf,
    pub finished: PathBuf,
    pub sentinel: PathBuf,
    pub packages: PathBuf,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            todo: paths::TODO_LEDGER.into(),
            finished: paths::FINISHED_LEDGER.into(),
            sentinel: paths::DONE_SENTINEL.into(),
            packages: paths::PACKAGE_LEDGER.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StagingConfig {
    /// Prefix for saved repository copies (`<stem>1`, `<stem>2`, ...)
    pub repo_stem: PathBuf,
    /// Prefix for mount points
    pub mount_stem: PathBuf,
    /// Where packages are extracted
    pub workdir: PathBuf,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            repo_stem: paths::REPO_STAGING_STEM.into(),
            mount_stem: paths::MOUNT_STEM.into(),
            workdir: paths::WORKDIR.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdatesConfig {
    /// Overrides `/lib/modules/<kernel_release>/updates`
    pub module_dir: Option<PathBuf>,
    /// Overrides `/lib/firmware/updates`
    pub firmware_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub mount: String,
    pub umount: String,
    pub dd_list: String,
    pub dd_extract: String,
    pub depmod: String,
    pub modprobe: String,
    pub blkid: String,
    pub labels_dir: PathBuf,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            mount: "mount".into(),
            umount: "umount".into(),
            dd_list: "dd_list".into(),
            dd_extract: "dd_extract".into(),
            depmod: "depmod".into(),
            modprobe: "modprobe".into(),
            blkid: "blkid".into(),
            labels_dir: paths::DISK_LABELS_DIR.into(),
        }
    }
}

impl ToolsConfig {
    pub fn programs(&self) -> [&str; 7] {
        [
            self.mount.as_str(),
            self.umount.as_str(),
            self.dd_list.as_str(),
            self.dd_extract.as_str(),
            self.depmod.as_str(),
            self.modprobe.as_str(),
            self.blkid.as_str(),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuConfig {
    pub page_size: usize,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self { page_size: 20 }
    }
}

impl Config {
    /// Load from `$DRIVER_UPDATES_CONFIG`, then the system file, else defaults.
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var(paths::CONFIG_ENV) {
            return Self::from_file(Path::new(&path));
        }

        let system = Path::new(paths::CONFIG_FILE);
        if system.exists() {
            return Self::from_file(system);
        }

        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse TOML config")?;
        Ok(config)
    }

    /// Live module updates directory for the running kernel
    pub fn module_updates_dir(&self) -> PathBuf {
        self.updates
            .module_dir
            .clone()
            .unwrap_or_else(|| paths::module_updates_dir(&self.kernel_release).into())
    }

    /// Live firmware updates directory
    pub fn firmware_updates_dir(&self) -> PathBuf {
        self.updates
            .firmware_dir
            .clone()
            .unwrap_or_else(|| paths::FIRMWARE_UPDATES_DIR.into())
    }

    /// Configuration rooted entirely under `root`.
    #[cfg(test)]
    pub fn rooted_at(root: &Path) -> Self {
        let mut config = Self::default();
        config.arch = "x86_64".into();
        config.kernel_release = "6.1.0-test".into();
        config.ledger = LedgerConfig {
            todo: root.join("tmp/dd_todo"),
            finished: root.join("tmp/dd_finished"),
            sentinel: root.join("tmp/dd.done"),
            packages: root.join("run/install/dd_packages"),
        };
        config.staging = StagingConfig {
            repo_stem: root.join("run/install/DD-"),
            mount_stem: root.join("media/DD-"),
            workdir: root.join("updates"),
        };
        config.updates = UpdatesConfig {
            module_dir: Some(root.join("lib/modules/6.1.0-test/updates")),
            firmware_dir: Some(root.join("lib/firmware/updates")),
        };
        config.tools.labels_dir = root.join("dev/disk/by-label");
        config
    }
}

fn detect_machine() -> (String, String) {
    match nix::sys::utsname::uname() {
        Ok(uts) => (
            uts.machine().to_string_lossy().into_owned(),
            uts.release().to_string_lossy().into_owned(),
        ),
        Err(e) => {
            tracing::warn!("uname failed: {}", e);
            (std::env::consts::ARCH.to_string(), String::new())
        }
    }
}
