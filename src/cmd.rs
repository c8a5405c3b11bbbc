use std::io;
use std::process::Command;
use thiserror::Error;

/// An external tool exited non-zero or could not be started.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("failed to run {tool}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },
    #[error("{tool} failed with exit code {status:?}: {stderr}")]
    Failed {
        tool: String,
        status: Option<i32>,
        stderr: String,
    },
}

/// Captured result of one tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(status: i32, stderr: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Runs external programs. Swapped for a fake in tests.
pub trait Runner {
    fn output(&self, program: &str, args: &[String]) -> io::Result<ToolOutput>;
}

/// Runs programs on the host with `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl Runner for SystemRunner {
    fn output(&self, program: &str, args: &[String]) -> io::Result<ToolOutput> {
        let output = Command::new(program).args(args).output()?;

        Ok(ToolOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Run a tool and return its stdout, failing on any non-zero exit.
pub fn run_checked(runner: &dyn Runner, program: &str, args: &[String]) -> Result<String, ToolError> {
    tracing::debug!("> {} {}", program, args.join(" "));

    let output = runner.output(program, args).map_err(|source| ToolError::Spawn {
        tool: program.to_string(),
        source,
    })?;

    if !output.success() {
        return Err(ToolError::Failed {
            tool: program.to_string(),
            status: output.status,
            stderr: output.stderr.trim().to_string(),
        });
    }

    Ok(output.stdout)
}

/// Run a tool whose failure must not stop the caller. Returns whether it succeeded.
pub fn run_best_effort(runner: &dyn Runner, program: &str, args: &[String]) -> bool {
    match run_checked(runner, program, args) {
        Ok(_) => true,
        Err(e) => {
            tracing::debug!("ignoring failure: {}", e);
            false
        }
    }
}

/// Configured tools that cannot be found on `PATH`.
pub fn missing_tools<'a, I>(programs: I) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    programs
        .into_iter()
        .filter(|program| which::which(program).is_err())
        .collect()
}
