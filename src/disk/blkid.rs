use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::tools::Tools;
use crate::util;

/// One `KEY=value` block of `blkid -o export` output.
pub type BlkidRecord = BTreeMap<String, String>;

/// A block device the user can pick in interactive mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    pub device: PathBuf,
    pub uuid: Option<String>,
    pub fs_type: Option<String>,
    pub label: Option<String>,
}

impl DeviceRecord {
    pub fn from_blkid(record: &BlkidRecord) -> Option<Self> {
        let device = record.get("DEVNAME")?;
        Some(Self {
            device: PathBuf::from(device),
            uuid: record.get("UUID").cloned(),
            fs_type: record.get("TYPE").cloned(),
            label: record.get("LABEL").cloned(),
        })
    }
}

impl fmt::Display for DeviceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.device.display(),
            self.fs_type.as_deref().unwrap_or(""),
            self.label.as_deref().unwrap_or(""),
            self.uuid.as_deref().unwrap_or("")
        )
    }
}

/// Parse `blkid -o export` output: blank-line separated blocks of `KEY=value` lines.
pub fn parse_export(output: &str) -> Vec<BlkidRecord> {
    output
        .split("\n\n")
        .map(|block| {
            block
                .lines()
                .filter_map(|line| line.split_once('='))
                .map(|(k, v)| (k.trim().to_string(), v.to_string()))
                .collect::<BlkidRecord>()
        })
        .filter(|record| !record.is_empty())
        .collect()
}

/// Map of resolved device path to filesystem label, read from the by-label symlinks.
pub fn disk_labels(labels_dir: &Path) -> HashMap<PathBuf, String> {
    util::iter_files(labels_dir, |_| true)
        .into_iter()
        .filter_map(|link| {
            let device = fs::canonicalize(&link).ok()?;
            let label = link.file_name()?.to_string_lossy().into_owned();
            Some((device, label))
        })
        .collect()
}

/// Every block device blkid knows about, with labels filled in.
pub fn device_info(tools: &Tools<'_>, labels_dir: &Path) -> Result<Vec<DeviceRecord>> {
    let labels = disk_labels(labels_dir);
    let records = tools.blkid().context("Failed to enumerate block devices")?;

    Ok(records
        .iter()
        .filter_map(DeviceRecord::from_blkid)
        .map(|mut dev| {
            dev.label = labels.get(&dev.device).cloned();
            dev
        })
        .collect())
}
