// Adapters layer: concrete implementations of the domain ports.

pub mod json_repository;
pub mod rest;
pub mod storage;

pub use json_repository::JsonFileRepository;
pub use rest::RestRepository;
pub use storage::LocalStorage;

use crate::config::toml_config::{SourceConfig, SourceType};
use crate::domain::ports::Repository;
use crate::utils::error::{AppError, Result};
use std::path::Path;

/// Builds the repository selected by `[source]`.
pub fn repository_from_config(source: &SourceConfig) -> Result<Box<dyn Repository>> {
    match source.r#type {
        SourceType::File => {
            let path = Path::new(&source.path);
            let file_name = path
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or_else(|| AppError::InvalidConfigValueError {
                    field: "source.path".to_string(),
                    value: source.path.clone(),
                    reason: "Path must name a file".to_string(),
                })?;
            let base = path
                .parent()
                .map(|p| p.to_string_lossy().into_owned())
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| ".".to_string());

            tracing::debug!("Using dataset file {} in {}", file_name, base);
            Ok(Box::new(JsonFileRepository::new(
                LocalStorage::new(base),
                file_name,
            )))
        }
        SourceType::Rest => {
            let endpoint = source.endpoint.as_deref().ok_or_else(|| AppError::MissingConfigError {
                field: "source.endpoint".to_string(),
            })?;
            tracing::debug!("Using hosted backend at {}", endpoint);
            Ok(Box::new(RestRepository::new(
                endpoint,
                source.api_key.clone(),
                source.timeout_seconds,
            )?))
        }
    }
}
