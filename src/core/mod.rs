pub mod engine;
pub mod export;

pub use crate::domain::model::{Dataset, ExportBundle, ExportFile};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Repository, Storage};
pub use crate::utils::error::Result;
