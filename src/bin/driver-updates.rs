use anyhow::Result;
use std::env;
use tracing_subscriber::EnvFilter;

use driverdisk::cli::{self, Mode};
use driverdisk::cmd;
use driverdisk::config::Config;
use driverdisk::context::Context;
use driverdisk::interactive;
use driverdisk::pipeline::{self, Request};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let mode = match cli::parse_args(&args) {
        Ok(mode) => mode,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprint!("{}", cli::USAGE);
            std::process::exit(2);
        }
    };

    let done = match mode {
        Mode::Help => {
            print!("{}", cli::USAGE);
            return Ok(());
        }
        Mode::Disk { request, device } => {
            let ctx = setup()?;
            pipeline::handle_request(&ctx, &Request::disk(request, device))?
        }
        Mode::Net { url, file } => {
            let ctx = setup()?;
            pipeline::handle_request(&ctx, &Request::net(url, file))?
        }
        Mode::Interactive => {
            let ctx = setup()?;
            interactive::run(&ctx)?
        }
    };

    if !done {
        tracing::info!("waiting for the remaining driver disks");
    }
    Ok(())
}

fn setup() -> Result<Context> {
    if !nix::unistd::Uid::effective().is_root() {
        eprintln!("Error: driver-updates must be run as root");
        std::process::exit(1);
    }

    let config = Config::load()?;
    for tool in cmd::missing_tools(config.tools.programs()) {
        tracing::warn!("{} not found in PATH", tool);
    }
    tracing::debug!("arch {}, kernel {}", config.arch, config.kernel_release);

    Ok(Context::new(config))
}
