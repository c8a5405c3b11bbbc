//! Test doubles for the external tools.
//!
//! [`FakeRunner`] records every invocation. Canned responses win; otherwise
//! programs succeed with empty output, or, when built with
//! [`FakeRunner::system`], `mount`, `dd_list` and `dd_extract` are emulated
//! against plain directories:
//!
//! - `mount SRC MNT` copies `SRC` onto `MNT` when it is a directory, or the
//!   directory named inside `SRC` when it is a file (a stand-in for an image).
//! - a package is a text file of `key: value` lines (`name`, `flags`,
//!   `description`, any number of `payload`, optionally `broken`).
//! - `dd_extract` creates every `payload` path under the output directory.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::cmd::{Runner, ToolOutput};
use crate::util;

#[derive(Clone, Default)]
pub struct FakeRunner {
    emulate: bool,
    responses: Rc<RefCell<HashMap<String, ToolOutput>>>,
    calls: Rc<RefCell<Vec<Vec<String>>>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn system() -> Self {
        Self {
            emulate: true,
            ..Self::default()
        }
    }

    /// Always answer `program` with `output`.
    pub fn respond(self, program: &str, output: ToolOutput) -> Self {
        self.responses
            .borrow_mut()
            .insert(program.to_string(), output);
        self
    }

    /// Every invocation so far, program first.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.borrow().clone()
    }

    pub fn calls_to(&self, program: &str) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter(|call| call[0] == program)
            .collect()
    }

    fn canned(&self, program: &str) -> Option<ToolOutput> {
        self.responses.borrow().get(program).cloned()
    }
}

impl Runner for FakeRunner {
    fn output(&self, program: &str, args: &[String]) -> io::Result<ToolOutput> {
        let mut call = vec![program.to_string()];
        call.extend(args.iter().cloned());
        self.calls.borrow_mut().push(call);

        if let Some(output) = self.canned(program) {
            return Ok(output);
        }
        if !self.emulate {
            return Ok(ToolOutput::ok(""));
        }

        let name = Path::new(program)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match name.as_str() {
            "mount" => Ok(emulate_mount(args)),
            "dd_list" => Ok(emulate_list(args)),
            "dd_extract" => Ok(emulate_extract(args)),
            _ => Ok(ToolOutput::ok("")),
        }
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn emulate_mount(args: &[String]) -> ToolOutput {
    let (Some(source), Some(mountpoint)) = (args.first(), args.get(1)) else {
        return ToolOutput::failed(1, "bad usage");
    };
    let source = Path::new(source);

    let tree = if source.is_dir() {
        source.to_path_buf()
    } else {
        match fs::read_to_string(source) {
            Ok(target) if Path::new(target.trim()).is_dir() => PathBuf::from(target.trim()),
            _ => return ToolOutput::failed(32, "wrong fs type, bad option, bad superblock"),
        }
    };

    match util::copy_tree(&tree, Path::new(mountpoint)) {
        Ok(()) => ToolOutput::ok(""),
        Err(e) => ToolOutput::failed(32, e.to_string()),
    }
}

struct FakePackage {
    name: String,
    flags: String,
    description: String,
    payload: Vec<String>,
    broken: bool,
}

fn read_package(path: &Path) -> Option<FakePackage> {
    let content = fs::read_to_string(path).ok()?;
    let mut pkg = FakePackage {
        name: String::new(),
        flags: String::new(),
        description: String::new(),
        payload: Vec::new(),
        broken: false,
    };
    for line in content.lines() {
        let Some((key, value)) = line.split_once(": ") else {
            continue;
        };
        match key {
            "name" => pkg.name = value.to_string(),
            "flags" => pkg.flags = value.to_string(),
            "description" => pkg.description = value.to_string(),
            "payload" => pkg.payload.push(value.to_string()),
            "broken" => pkg.broken = value == "true",
            _ => {}
        }
    }
    Some(pkg)
}

fn emulate_list(args: &[String]) -> ToolOutput {
    let Some(repo) = flag_value(args, "-d") else {
        return ToolOutput::failed(1, "no repo given");
    };

    let mut out = String::new();
    for rpm in util::iter_files(Path::new(repo), |name| name.ends_with(".rpm")) {
        if let Some(pkg) = read_package(&rpm) {
            out.push_str(&format!(
                "{}\n{}\n{}\n{}\n---\n",
                rpm.display(),
                pkg.name,
                pkg.flags,
                pkg.description
            ));
        }
    }
    ToolOutput::ok(out)
}

fn emulate_extract(args: &[String]) -> ToolOutput {
    let (Some(rpm), Some(outdir)) = (flag_value(args, "-r"), flag_value(args, "-d")) else {
        return ToolOutput::failed(1, "bad usage");
    };
    let Some(pkg) = read_package(Path::new(rpm)) else {
        return ToolOutput::failed(1, format!("cannot open {rpm}"));
    };
    if pkg.broken {
        return ToolOutput::failed(1, "cpio: premature end of archive");
    }

    for file in &pkg.payload {
        let dest = Path::new(outdir).join(file);
        let written = dest
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|_| fs::write(&dest, format!("payload of {}", pkg.name)));
        if let Err(e) = written {
            return ToolOutput::failed(1, e.to_string());
        }
    }
    ToolOutput::ok("")
}

/// Lay out a driver repository: marker file plus `rpms/<arch>`.
pub fn make_repo(dir: &Path, arch: &str) -> PathBuf {
    fs::create_dir_all(dir.join("rpms").join(arch)).unwrap();
    fs::write(dir.join(crate::repo::REPO_MARKER), "").unwrap();
    dir.to_path_buf()
}

/// Write a fake package into `repo/rpms/<arch>`.
pub fn make_package(
    repo: &Path,
    arch: &str,
    name: &str,
    flags: &[&str],
    payload: &[&str],
) -> PathBuf {
    let path = repo
        .join("rpms")
        .join(arch)
        .join(format!("{name}-1.0-1.{arch}.rpm"));
    let mut content = format!(
        "name: {name}\nflags: {}\ndescription: The {name} driver\n",
        flags.join(" ")
    );
    for file in payload {
        content.push_str(&format!("payload: {file}\n"));
    }
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();
    path
}

/// Mark an existing fake package as one that fails to extract.
pub fn break_package(path: &Path) {
    let mut content = fs::read_to_string(path).unwrap();
    content.push_str("broken: true\n");
    fs::write(path, content).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn canned_response_wins_over_emulation() {
        let runner = FakeRunner::system().respond("dd_list", ToolOutput::failed(2, "nope"));
        let out = runner.output("dd_list", &args(&["-d", "/x"])).unwrap();
        assert_eq!(out.status, Some(2));
    }

    #[test]
    fn emulated_list_and_extract() {
        let tmp = tempdir().unwrap();
        let repo = make_repo(&tmp.path().join("repo"), "x86_64");
        make_package(&repo, "x86_64", "e1000e", &["modules"], &["lib/modules/6.1.0-test/e1000e.ko"]);
        let runner = FakeRunner::system();

        let listing = runner
            .output("dd_list", &args(&["-d", &repo.to_string_lossy()]))
            .unwrap();
        let packages = crate::dd::parse_listing(&listing.stdout, &repo);
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].name, "e1000e");

        let out = tmp.path().join("out");
        let extracted = runner
            .output(
                "dd_extract",
                &args(&["-blmf", "-r", &packages[0].source.to_string_lossy(), "-d", &out.to_string_lossy()]),
            )
            .unwrap();
        assert!(extracted.success());
        assert!(out.join("lib/modules/6.1.0-test/e1000e.ko").is_file());
    }

    #[test]
    fn emulated_mount_follows_image_files() {
        let tmp = tempdir().unwrap();
        let contents = tmp.path().join("iso-contents");
        fs::create_dir_all(&contents).unwrap();
        fs::write(contents.join("hello"), "hi").unwrap();
        let image = tmp.path().join("dd.iso");
        fs::write(&image, contents.to_string_lossy().as_bytes()).unwrap();
        let mnt = tmp.path().join("mnt");

        let runner = FakeRunner::system();
        let out = runner
            .output("mount", &args(&[&image.to_string_lossy(), &mnt.to_string_lossy(), "-o", "loop"]))
            .unwrap();

        assert!(out.success());
        assert_eq!(fs::read_to_string(mnt.join("hello")).unwrap(), "hi");
    }
}
