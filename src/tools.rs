//! Typed wrappers around the external tools the pipeline drives.
//!
//! Each call either returns parsed output or a [`ToolError`]; nothing here
//! retries. `umount`, `depmod` and `modprobe` are best-effort and only report
//! whether they succeeded.

use std::path::Path;

use crate::cmd::{self, Runner, ToolError};
use crate::config::Config;
use crate::dd::{self, DriverPackage};
use crate::disk::blkid::{self, BlkidRecord};

pub struct Tools<'a> {
    runner: &'a dyn Runner,
    config: &'a Config,
}

fn arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

impl<'a> Tools<'a> {
    pub fn new(runner: &'a dyn Runner, config: &'a Config) -> Self {
        Self { runner, config }
    }

    /// `dd_list -d <repo> -k <kernel> -a <installer version>`
    pub fn list_packages(&self, repo: &Path) -> Result<Vec<DriverPackage>, ToolError> {
        tracing::debug!("dd_list: listing {}", repo.display());

        let args = vec![
            "-d".to_string(),
            arg(repo),
            "-k".to_string(),
            self.config.kernel_release.clone(),
            "-a".to_string(),
            self.config.installer_version.clone(),
        ];
        let output = cmd::run_checked(self.runner, &self.config.tools.dd_list, &args)?;
        let packages = dd::parse_listing(&output, repo);

        tracing::debug!(
            "dd_list: found drivers: {}",
            packages
                .iter()
                .map(|p| p.name.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        );
        Ok(packages)
    }

    /// `dd_extract <flags> -r <package> -d <outdir> -k <kernel>`
    pub fn extract_package(&self, package: &Path, outdir: &Path) -> Result<(), ToolError> {
        tracing::debug!("dd_extract: extracting {}", package.display());

        let args = vec![
            self.config.extract_flags.clone(),
            "-r".to_string(),
            arg(package),
            "-d".to_string(),
            arg(outdir),
            "-k".to_string(),
            self.config.kernel_release.clone(),
        ];
        cmd::run_checked(self.runner, &self.config.tools.dd_extract, &args)?;
        Ok(())
    }

    /// `mount <source> <mountpoint> [-o <options>]`
    pub fn mount(
        &self,
        source: &Path,
        mountpoint: &Path,
        options: Option<&str>,
    ) -> Result<(), ToolError> {
        tracing::debug!("mounting {} at {}", source.display(), mountpoint.display());

        let mut args = vec![arg(source), arg(mountpoint)];
        if let Some(options) = options {
            args.push("-o".to_string());
            args.push(options.to_string());
        }
        cmd::run_checked(self.runner, &self.config.tools.mount, &args)?;
        Ok(())
    }

    pub fn umount(&self, mountpoint: &Path) -> bool {
        tracing::debug!("unmounting {}", mountpoint.display());
        cmd::run_best_effort(self.runner, &self.config.tools.umount, &[arg(mountpoint)])
    }

    /// Regenerate module dependency data for the running kernel.
    pub fn depmod(&self) -> bool {
        cmd::run_best_effort(self.runner, &self.config.tools.depmod, &["-a".to_string()])
    }

    /// Load all named modules in one `modprobe -a` call.
    pub fn modprobe(&self, modules: &[String]) -> bool {
        let mut args = vec!["-a".to_string()];
        args.extend(modules.iter().cloned());
        cmd::run_best_effort(self.runner, &self.config.tools.modprobe, &args)
    }

    /// `blkid -o export -s UUID -s TYPE`, one record per block device.
    pub fn blkid(&self) -> Result<Vec<BlkidRecord>, ToolError> {
        let args: Vec<String> = ["-o", "export", "-s", "UUID", "-s", "TYPE"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let output = cmd::run_checked(self.runner, &self.config.tools.blkid, &args)?;
        Ok(blkid::parse_export(&output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::ToolOutput;
    use crate::testing::FakeRunner;
    use tempfile::tempdir;

    #[test]
    fn list_packages_passes_kernel_and_installer_version() {
        let tmp = tempdir().unwrap();
        let config = Config::rooted_at(tmp.path());
        let runner = FakeRunner::new().respond(
            "dd_list",
            ToolOutput::ok("/repo/a.rpm\na\nmodules\nA driver\n---\n"),
        );
        let tools = Tools::new(&runner, &config);

        let packages = tools.list_packages(Path::new("/repo")).unwrap();

        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].repo, Path::new("/repo"));
        assert_eq!(
            runner.calls(),
            vec![vec!["dd_list", "-d", "/repo", "-k", "6.1.0-test", "-a", "19.0"]]
        );
    }

    #[test]
    fn extract_package_uses_configured_flags() {
        let tmp = tempdir().unwrap();
        let config = Config::rooted_at(tmp.path());
        let runner = FakeRunner::new().respond("dd_extract", ToolOutput::ok(""));
        let tools = Tools::new(&runner, &config);

        tools
            .extract_package(Path::new("/some/kind/of/path.rpm"), Path::new("/output/dir"))
            .unwrap();

        let call = &runner.calls()[0];
        assert_eq!(call[0], "dd_extract");
        assert!(call.contains(&"-blmf".to_string()));
        assert!(call.contains(&"/some/kind/of/path.rpm".to_string()));
        assert!(call.contains(&"/output/dir".to_string()));
        assert!(call.contains(&"6.1.0-test".to_string()));
    }

    #[test]
    fn extract_failure_propagates() {
        let tmp = tempdir().unwrap();
        let config = Config::rooted_at(tmp.path());
        let runner = FakeRunner::new().respond("dd_extract", ToolOutput::failed(1, "corrupt"));
        let tools = Tools::new(&runner, &config);

        let err = tools
            .extract_package(Path::new("/r/a.rpm"), Path::new("/updates"))
            .unwrap_err();
        assert!(err.to_string().contains("corrupt"));
    }

    #[test]
    fn mount_adds_options_only_when_given() {
        let tmp = tempdir().unwrap();
        let config = Config::rooted_at(tmp.path());
        let runner = FakeRunner::new()
            .respond("mount", ToolOutput::ok(""))
            .respond("umount", ToolOutput::ok(""));
        let tools = Tools::new(&runner, &config);

        tools
            .mount(Path::new("/dev/fake"), Path::new("/media/DD-1"), None)
            .unwrap();
        tools
            .mount(Path::new("/tmp/a.iso"), Path::new("/media/DD-2"), Some("loop"))
            .unwrap();
        assert!(tools.umount(Path::new("/media/DD-2")));

        assert_eq!(
            runner.calls(),
            vec![
                vec!["mount", "/dev/fake", "/media/DD-1"],
                vec!["mount", "/tmp/a.iso", "/media/DD-2", "-o", "loop"],
                vec!["umount", "/media/DD-2"],
            ]
        );
    }

    #[test]
    fn depmod_then_modprobe_batch() {
        let tmp = tempdir().unwrap();
        let config = Config::rooted_at(tmp.path());
        let runner = FakeRunner::new().respond("modprobe", ToolOutput::failed(1, "no such module"));
        let tools = Tools::new(&runner, &config);

        assert!(tools.depmod());
        assert!(!tools.modprobe(&["mod1".into(), "mod2".into()]));

        assert_eq!(
            runner.calls(),
            vec![vec!["depmod", "-a"], vec!["modprobe", "-a", "mod1", "mod2"]]
        );
    }
}
