use crate::cmd::{Runner, SystemRunner};
use crate::config::Config;
use crate::ledger::CompletionLedger;
use crate::tools::Tools;

/// Configuration plus the process runner, handed to every pipeline step.
pub struct Context {
    pub config: Config,
    runner: Box<dyn Runner>,
}

impl Context {
    pub fn new(config: Config) -> Self {
        Self::with_runner(config, Box::new(SystemRunner))
    }

    pub fn with_runner(config: Config, runner: Box<dyn Runner>) -> Self {
        Self { config, runner }
    }

    pub fn tools(&self) -> Tools<'_> {
        Tools::new(self.runner.as_ref(), &self.config)
    }

    pub fn ledger(&self) -> CompletionLedger {
        CompletionLedger::from_config(&self.config.ledger)
    }
}
