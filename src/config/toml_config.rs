use crate::domain::alerts::{
    AlertThresholds, DEFAULT_ARRIVAL_WINDOW_DAYS, DEFAULT_CUSTOMS_MAX_DAYS, DEFAULT_MAX_COEFFICIENT,
};
use crate::domain::cost::{CostInputs, DEFAULT_EXCHANGE_RATE, DEFAULT_TAX_RATE};
use crate::domain::model::DocumentKind;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{AppError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_amount, validate_positive_number,
    validate_range, validate_required_field, validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub business: BusinessConfig,
    pub costs: CostsConfig,
    pub alerts: AlertsConfig,
    pub source: SourceConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessConfig {
    pub name: String,
}

impl Default for BusinessConfig {
    fn default() -> Self {
        Self {
            name: "Import business".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CostsConfig {
    pub default_tax_rate: f64,
    pub default_exchange_rate: f64,
}

impl Default for CostsConfig {
    fn default() -> Self {
        Self {
            default_tax_rate: DEFAULT_TAX_RATE,
            default_exchange_rate: DEFAULT_EXCHANGE_RATE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    pub arrival_window_days: i64,
    pub customs_max_days: i64,
    pub max_coefficient: f64,
    pub required_documents: Vec<DocumentKind>,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            arrival_window_days: DEFAULT_ARRIVAL_WINDOW_DAYS,
            customs_max_days: DEFAULT_CUSTOMS_MAX_DAYS,
            max_coefficient: DEFAULT_MAX_COEFFICIENT,
            required_documents: AlertThresholds::default().required_documents,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    File,
    Rest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub r#type: SourceType,
    /// Dataset file for the `file` source.
    pub path: String,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            r#type: SourceType::File,
            path: "./data/dataset.json".to_string(),
            endpoint: None,
            api_key: None,
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub output_path: String,
    pub filename: String,
    pub include_documents: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_path: "./output".to_string(),
            filename: "embarques_export.zip".to_string(),
            include_documents: true,
        }
    }
}

impl TomlConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(AppError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// Parses configuration from TOML text, expanding `${VAR}` references.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| AppError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Unset variables are left as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| AppError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("business.name", &self.business.name)?;

        validate_range("costs.default_tax_rate", self.costs.default_tax_rate, 0.0, 100.0)?;
        validate_positive_amount("costs.default_exchange_rate", self.costs.default_exchange_rate)?;

        validate_positive_number("alerts.arrival_window_days", self.alerts.arrival_window_days, 0)?;
        validate_positive_number("alerts.customs_max_days", self.alerts.customs_max_days, 1)?;
        validate_range("alerts.max_coefficient", self.alerts.max_coefficient, 1.0, 10.0)?;

        match self.source.r#type {
            SourceType::File => validate_path("source.path", &self.source.path)?,
            SourceType::Rest => {
                let endpoint = validate_required_field("source.endpoint", &self.source.endpoint)?;
                validate_url("source.endpoint", endpoint)?;
                if let Some(key) = &self.source.api_key {
                    if key.contains("${") {
                        return Err(AppError::InvalidConfigValueError {
                            field: "source.api_key".to_string(),
                            value: key.clone(),
                            reason: "Environment variable is not set".to_string(),
                        });
                    }
                }
            }
        }
        validate_positive_number(
            "source.timeout_seconds",
            self.source.timeout_seconds as i64,
            1,
        )?;

        validate_path("export.output_path", &self.export.output_path)?;
        validate_non_empty_string("export.filename", &self.export.filename)?;
        if !self.export.filename.ends_with(".zip") {
            return Err(AppError::InvalidConfigValueError {
                field: "export.filename".to_string(),
                value: self.export.filename.clone(),
                reason: "Export archive must have a .zip extension".to_string(),
            });
        }

        Ok(())
    }

    /// Empty cost inputs carrying the configured default rates.
    pub fn blank_cost_inputs(&self) -> CostInputs {
        CostInputs::new(self.costs.default_tax_rate, self.costs.default_exchange_rate)
    }
}

impl ConfigProvider for TomlConfig {
    fn business_name(&self) -> &str {
        &self.business.name
    }

    fn output_path(&self) -> &str {
        &self.export.output_path
    }

    fn export_filename(&self) -> &str {
        &self.export.filename
    }

    fn include_documents(&self) -> bool {
        self.export.include_documents
    }

    fn alert_thresholds(&self) -> AlertThresholds {
        AlertThresholds {
            arrival_window_days: self.alerts.arrival_window_days,
            customs_max_days: self.alerts.customs_max_days,
            max_coefficient: self.alerts.max_coefficient,
            required_documents: self.alerts.required_documents.clone(),
        }
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
