//! Driver packages as reported by the `dd_list` tool.

use std::fmt;
use std::path::{Path, PathBuf};

/// Separator line between records in `dd_list` output
pub const RECORD_SEPARATOR: &str = "---";

/// One installable driver package found in a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverPackage {
    /// Absolute path to the package file
    pub source: PathBuf,
    pub name: String,
    /// Capability tags such as "modules", "firmwares", "binaries", "libraries"
    pub flags: Vec<String>,
    /// Free text, may span several lines
    pub description: String,
    /// Repository the package was listed from
    pub repo: PathBuf,
}

impl DriverPackage {
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }

    /// Packages carrying kernel modules or firmware must also reach the target system.
    pub fn provides_drivers(&self) -> bool {
        self.has_flag("modules") || self.has_flag("firmwares")
    }
}

impl fmt::Display for DriverPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.description.lines().next().filter(|l| !l.is_empty()) {
            Some(summary) => write!(f, "{} - {}", self.name, summary),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Parse `dd_list` output into packages belonging to `repo`.
///
/// Records are separated by a line that is exactly `---`. The first three
/// lines of a record are source, name and flags; everything after is the
/// description. Blank records are skipped.
pub fn parse_listing(output: &str, repo: &Path) -> Vec<DriverPackage> {
    let mut packages = Vec::new();
    let mut record: Vec<&str> = Vec::new();

    for line in output.lines() {
        if line == RECORD_SEPARATOR {
            packages.extend(parse_record(&record, repo));
            record.clear();
        } else {
            record.push(line);
        }
    }
    packages.extend(parse_record(&record, repo));

    packages
}

fn parse_record(lines: &[&str], repo: &Path) -> Option<DriverPackage> {
    if lines.iter().all(|l| l.trim().is_empty()) {
        return None;
    }

    let field = |i: usize| lines.get(i).copied().unwrap_or("").to_string();
    let description = lines.get(3..).map(|rest| rest.join("\n")).unwrap_or_default();

    Some(DriverPackage {
        source: PathBuf::from(field(0)),
        name: field(1),
        flags: field(2).split_whitespace().map(str::to_string).collect(),
        description,
        repo: repo.to_path_buf(),
    })
}
