pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::sinks::SinkWriter;
pub use adapters::storage::LocalStorage;
pub use app::pipelines::{BankPipeline, CharacterPlan};
#[cfg(feature = "cli")]
pub use config::CliArgs;
pub use config::{BankConfig, SinkKind};
pub use crate::core::etl::EtlEngine;
pub use utils::error::{EtlError, Result};
