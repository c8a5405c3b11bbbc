//! Cross-process completion tracking.
//!
//! Every source gets its own process. Each one appends its request id to the
//! finished ledger when done; whichever process sees the finished set equal to
//! the to-do set writes the sentinel. Nothing is cached: the ledgers are read
//! from disk on every check.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::config::LedgerConfig;
use crate::util;

const SENTINEL_CONTENT: &str = "true\n";

#[derive(Debug, Clone)]
pub struct CompletionLedger {
    todo: PathBuf,
    finished: PathBuf,
    sentinel: PathBuf,
}

impl CompletionLedger {
    pub fn new(todo: PathBuf, finished: PathBuf, sentinel: PathBuf) -> Self {
        Self {
            todo,
            finished,
            sentinel,
        }
    }

    pub fn from_config(config: &LedgerConfig) -> Self {
        Self::new(
            config.todo.clone(),
            config.finished.clone(),
            config.sentinel.clone(),
        )
    }

    #[cfg(test)]
    pub fn sentinel(&self) -> &Path {
        &self.sentinel
    }

    pub fn mark_finished(&self, request_id: &str) -> Result<()> {
        tracing::debug!("marking {} complete", request_id);
        util::append_line(&self.finished, request_id)
    }

    pub fn all_finished(&self) -> Result<bool> {
        let todo: BTreeSet<String> = util::read_lines(&self.todo)?.into_iter().collect();
        let finished: BTreeSet<String> = util::read_lines(&self.finished)?.into_iter().collect();
        Ok(todo == finished)
    }

    /// Run `work`, mark `request_id` finished and write the sentinel if
    /// nothing is left.
    ///
    /// All of it runs under an exclusive lock, so two processes finishing
    /// together neither share the work directory nor both miss (or both
    /// write) the sentinel. `request_id` is not marked when `work` fails.
    /// Returns whether every request is now finished.
    pub fn finish(&self, request_id: &str, work: impl FnOnce() -> Result<()>) -> Result<bool> {
        let _lock = self.lock()?;

        work()?;
        self.mark_finished(request_id)?;
        if !self.all_finished()? {
            return Ok(false);
        }

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.sentinel)
        {
            Ok(mut file) => {
                file.write_all(SENTINEL_CONTENT.as_bytes())
                    .with_context(|| format!("Failed to write {}", self.sentinel.display()))?;
                tracing::info!("all driver disks processed, wrote {}", self.sentinel.display());
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                tracing::debug!("{} already present", self.sentinel.display());
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to create {}", self.sentinel.display()))
            }
        }

        Ok(true)
    }

    /// `<finished>.lock`, next to the finished ledger.
    fn lock_path(&self) -> PathBuf {
        let mut path = self.finished.clone().into_os_string();
        path.push(".lock");
        PathBuf::from(path)
    }

    /// Held until the returned file is dropped.
    fn lock(&self) -> Result<fs::File> {
        let path = self.lock_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        FileExt::lock_exclusive(&file)
            .with_context(|| format!("Failed to lock {}", path.display()))?;
        Ok(file)
    }
}
