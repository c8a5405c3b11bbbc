pub mod activate;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod context;
pub mod dd;
pub mod disk;
pub mod interactive;
pub mod ledger;
pub mod menu;
pub mod paths;
pub mod pipeline;
pub mod repo;
pub mod tools;
pub mod util;

#[cfg(test)]
pub(crate) mod testing;
