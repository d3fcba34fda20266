pub mod bank_config;
#[cfg(feature = "cli")]
pub mod cli;

pub use bank_config::{BankConfig, SinkKind};
#[cfg(feature = "cli")]
pub use cli::CliArgs;
