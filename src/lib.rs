pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{JsonFileRepository, LocalStorage, RestRepository};
pub use config::TomlConfig;
pub use core::{engine::ExportEngine, export::ExportPipeline};
pub use domain::cost::{calculate, CostInputs, CostSummary};
pub use utils::error::{AppError, Result};
