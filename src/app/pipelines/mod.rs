pub mod bank_pipeline;

pub use bank_pipeline::{BankPipeline, CharacterPlan};
