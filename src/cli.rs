//! Command line handling.

use std::path::PathBuf;
use thiserror::Error;

pub const USAGE: &str = "\
usage: driver-updates --interactive
       driver-updates --disk DISK KERNELDEV
       driver-updates --net URL LOCALFILE
";

/// What the invocation asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// A disk named by the user (`DISK`), found by the kernel at `device`
    Disk { request: String, device: PathBuf },
    /// A driver disk image fetched from `url`, saved at `file`
    Net { url: String, file: PathBuf },
    Interactive,
    Help,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UsageError {
    #[error("no mode given")]
    MissingMode,
    #[error("unknown option: {0}")]
    UnknownOption(String),
    #[error("{option} takes exactly two arguments")]
    WrongArgumentCount { option: String },
    #[error("unexpected argument: {0}")]
    UnexpectedArgument(String),
}

/// Parse arguments, program name excluded.
pub fn parse_args(args: &[String]) -> Result<Mode, UsageError> {
    let Some((option, rest)) = args.split_first() else {
        return Err(UsageError::MissingMode);
    };

    match option.as_str() {
        "--interactive" => match rest.first() {
            Some(extra) => Err(UsageError::UnexpectedArgument(extra.clone())),
            None => Ok(Mode::Interactive),
        },
        "-h" | "--help" => Ok(Mode::Help),
        "--disk" | "--net" => {
            let [first, second] = rest else {
                return Err(UsageError::WrongArgumentCount {
                    option: option.clone(),
                });
            };
            if option == "--disk" {
                Ok(Mode::Disk {
                    request: first.clone(),
                    device: PathBuf::from(second),
                })
            } else {
                Ok(Mode::Net {
                    url: first.clone(),
                    file: PathBuf::from(second),
                })
            }
        }
        other => Err(UsageError::UnknownOption(other.to_string())),
    }
}
