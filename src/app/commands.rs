use crate::domain::alerts::{evaluate_alerts, Alert, AlertThresholds};
use crate::domain::cost::{calculate, CostInputs, CostSummary};
use crate::domain::model::{CostRecord, Dataset, Document, DocumentKind};
use crate::domain::ports::Repository;
use crate::domain::report::ExecutiveReport;
use crate::utils::error::{AppError, Result};
use crate::utils::validation::{validate_file_extensions, Validate};
use chrono::{DateTime, NaiveDate, Utc};
use std::path::{Path, PathBuf};

pub const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "jpg", "jpeg", "png", "xlsx", "xls", "csv", "docx"];

/// Changes requested by `calc`, applied over a base set of inputs.
#[derive(Debug, Clone, Default)]
pub struct CostOverrides {
    /// JSON or TOML file with cost fields.
    pub input: Option<PathBuf>,
    pub fob: Option<f64>,
    pub tax_rate: Option<f64>,
    pub exchange_rate: Option<f64>,
}

impl CostOverrides {
    pub fn apply(&self, base: CostInputs) -> Result<CostInputs> {
        let mut inputs = match &self.input {
            Some(path) => read_cost_inputs(path, &base)?,
            None => base,
        };
        if let Some(fob) = self.fob {
            inputs.fob_value = fob;
        }
        if let Some(rate) = self.tax_rate {
            inputs.tax_rate = rate;
        }
        if let Some(rate) = self.exchange_rate {
            inputs.exchange_rate = rate;
        }
        Ok(inputs)
    }
}

/// Reads cost fields from a JSON or TOML file over `base`.
/// Fields that are absent or null keep the base value.
pub fn read_cost_inputs(path: &Path, base: &CostInputs) -> Result<CostInputs> {
    let text = std::fs::read_to_string(path)?;
    let file: serde_json::Value = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => toml::from_str(&text)?,
        _ => serde_json::from_str(&text)?,
    };
    let fields = file.as_object().ok_or_else(|| AppError::ValidationError {
        message: format!("{} must contain a table of cost fields", path.display()),
    })?;

    let mut merged = serde_json::to_value(base)?;
    if let Some(target) = merged.as_object_mut() {
        for (key, value) in fields.iter().filter(|(_, v)| !v.is_null()) {
            target.insert(key.clone(), value.clone());
        }
    }
    Ok(serde_json::from_value(merged)?)
}

/// Computes a summary without touching any stored record.
pub fn calculate_only(overrides: &CostOverrides, defaults: CostInputs) -> Result<CostSummary> {
    let inputs = overrides.apply(defaults)?;
    inputs.validate()?;
    Ok(calculate(&inputs))
}

/// Updates the shipment's cost record in place and stores it. Without a
/// record yet, `defaults` is the starting point.
pub async fn store_cost_record(
    repository: &dyn Repository,
    reference: &str,
    overrides: &CostOverrides,
    defaults: CostInputs,
    now: DateTime<Utc>,
) -> Result<CostSummary> {
    let shipment = repository.get_shipment(reference).await?;
    let existing = repository.get_cost_record(&shipment.id).await?;

    let base = existing
        .as_ref()
        .map(|record| record.inputs.clone())
        .unwrap_or(defaults);
    let inputs = overrides.apply(base)?.with_fob_fallback(shipment.fob_total());
    inputs.validate()?;

    let mut record = match existing {
        Some(mut record) => {
            record.inputs = inputs;
            record
        }
        None => CostRecord::new(&shipment.id, inputs),
    };
    let summary = record.recalculate(now).clone();
    repository.save_cost_record(&record).await?;
    tracing::info!(
        shipment = %shipment.code,
        coefficient = summary.coefficient,
        "Cost record saved"
    );
    Ok(summary)
}

pub async fn load_costed_dataset(
    repository: &dyn Repository,
    now: DateTime<Utc>,
) -> Result<Dataset> {
    let mut dataset = repository.load_dataset().await?;
    dataset.recalculate_costs(now);
    Ok(dataset)
}

/// Alerts as of `date`, or as of the UTC date of `now`.
pub async fn current_alerts(
    repository: &dyn Repository,
    thresholds: &AlertThresholds,
    date: Option<NaiveDate>,
    now: DateTime<Utc>,
) -> Result<(NaiveDate, Vec<Alert>)> {
    let dataset = load_costed_dataset(repository, now).await?;
    let today = date.unwrap_or_else(|| now.date_naive());
    Ok((today, evaluate_alerts(&dataset, thresholds, today)))
}

pub async fn build_report(
    repository: &dyn Repository,
    business: &str,
    thresholds: &AlertThresholds,
    now: DateTime<Utc>,
) -> Result<ExecutiveReport> {
    let dataset = load_costed_dataset(repository, now).await?;
    let alerts = evaluate_alerts(&dataset, thresholds, now.date_naive());
    Ok(ExecutiveReport::build(business, &dataset, &alerts, now))
}

pub async fn attach_document(
    repository: &dyn Repository,
    reference: &str,
    kind: DocumentKind,
    file: &Path,
    now: DateTime<Utc>,
) -> Result<Document> {
    let file_name = file
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| AppError::ValidationError {
            message: format!("'{}' is not a file path", file.display()),
        })?;
    validate_file_extensions("document", &[file_name.clone()], DOCUMENT_EXTENSIONS)?;

    let target = repository.get_shipment(reference).await?;
    let content = std::fs::read(file)?;
    let document = Document::new(&target.id, kind, file_name, &content, now);
    repository.add_document(&document).await?;
    tracing::info!(
        shipment = %target.code,
        document = %document.file_name,
        bytes = content.len(),
        "Document attached"
    );
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{JsonFileRepository, LocalStorage};
    use crate::domain::alerts::AlertKind;
    use crate::domain::model::{OrderLine, PurchaseOrder, Shipment, ShipmentStatus};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 23, 30, 0).unwrap()
    }

    fn shipment() -> Shipment {
        Shipment {
            id: "s1".to_string(),
            code: "EMB-2024-007".to_string(),
            supplier: "Ningbo Tools".to_string(),
            origin: "CN".to_string(),
            status: ShipmentStatus::InTransit,
            departure_date: None,
            eta: NaiveDate::from_ymd_opt(2024, 6, 11),
            status_changed_at: None,
            purchase_orders: vec![PurchaseOrder {
                number: "OC-1".to_string(),
                supplier: "Ningbo Tools".to_string(),
                order_date: None,
                lines: vec![OrderLine {
                    sku: "DRL-18".to_string(),
                    description: "Drill".to_string(),
                    quantity: 100.0,
                    unit_fob: 10.0,
                }],
            }],
            notes: None,
        }
    }

    async fn repository(dir: &TempDir) -> JsonFileRepository<LocalStorage> {
        let repo = JsonFileRepository::new(
            LocalStorage::new(dir.path().to_str().unwrap().to_string()),
            "dataset.json",
        );
        repo.save_shipment(&shipment()).await.unwrap();
        repo
    }

    fn stored_inputs() -> CostInputs {
        let mut inputs = CostInputs::new(22.0, 39.8);
        inputs.international_freight = 150.0;
        inputs.broker_fees = 4855.6;
        inputs.vat = 250.0;
        inputs
    }

    #[tokio::test]
    async fn test_recalculate_keeps_stored_inputs() {
        let dir = TempDir::new().unwrap();
        let repo = repository(&dir).await;
        repo.save_cost_record(&CostRecord::new("s1", stored_inputs()))
            .await
            .unwrap();

        let overrides = CostOverrides {
            tax_rate: Some(22.0),
            ..Default::default()
        };
        let summary = store_cost_record(&repo, "EMB-2024-007", &overrides, CostInputs::default(), now())
            .await
            .unwrap();

        let record = repo.get_cost_record("s1").await.unwrap().unwrap();
        assert_eq!(record.inputs.exchange_rate, 39.8);
        assert_eq!(record.inputs.international_freight, 150.0);
        assert_eq!(record.inputs.broker_fees, 4855.6);
        assert_eq!(record.inputs.vat, 250.0);
        assert_eq!(record.inputs.fob_value, 1000.0);
        assert_eq!(record.updated_at, Some(now()));

        // 150 + 4855.6 / 39.8 / 1.22 = 250
        assert!((summary.coefficient - 1.25).abs() < 1e-9);
        assert_eq!(record.summary, Some(summary));
    }

    #[tokio::test]
    async fn test_overrides_apply_over_stored_inputs() {
        let dir = TempDir::new().unwrap();
        let repo = repository(&dir).await;
        repo.save_cost_record(&CostRecord::new("s1", stored_inputs()))
            .await
            .unwrap();

        let input = dir.path().join("update.json");
        std::fs::write(&input, r#"{"insurance": 50.0, "tax_rate": null}"#).unwrap();
        let overrides = CostOverrides {
            input: Some(input),
            fob: Some(2000.0),
            ..Default::default()
        };
        let summary = store_cost_record(&repo, "s1", &overrides, CostInputs::default(), now())
            .await
            .unwrap();

        let record = repo.get_cost_record("s1").await.unwrap().unwrap();
        assert_eq!(record.inputs.insurance, 50.0);
        assert_eq!(record.inputs.international_freight, 150.0);
        assert_eq!(record.inputs.tax_rate, 22.0);
        assert_eq!(record.inputs.fob_value, 2000.0);
        assert!((summary.additional_costs - 300.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_first_record_starts_from_defaults() {
        let dir = TempDir::new().unwrap();
        let repo = repository(&dir).await;

        let overrides = CostOverrides {
            fob: Some(500.0),
            ..Default::default()
        };
        store_cost_record(&repo, "s1", &overrides, CostInputs::new(10.0, 40.0), now())
            .await
            .unwrap();

        let record = repo.get_cost_record("s1").await.unwrap().unwrap();
        assert_eq!(record.inputs.tax_rate, 10.0);
        assert_eq!(record.inputs.exchange_rate, 40.0);
        assert_eq!(record.inputs.fob_value, 500.0);
    }

    #[tokio::test]
    async fn test_invalid_override_is_not_stored() {
        let dir = TempDir::new().unwrap();
        let repo = repository(&dir).await;
        repo.save_cost_record(&CostRecord::new("s1", stored_inputs()))
            .await
            .unwrap();

        let overrides = CostOverrides {
            exchange_rate: Some(0.0),
            ..Default::default()
        };
        let result = store_cost_record(&repo, "s1", &overrides, CostInputs::default(), now()).await;
        assert!(result.is_err());
        let record = repo.get_cost_record("s1").await.unwrap().unwrap();
        assert_eq!(record.inputs.exchange_rate, 39.8);
    }

    #[test]
    fn test_null_fields_keep_configured_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("inputs.toml");
        std::fs::write(&path, "fob_value = 1000\nterminal_handling = 122\n").unwrap();
        let json = dir.path().join("inputs.json");
        std::fs::write(&json, r#"{"fob_value": 1000, "tax_rate": null, "exchange_rate": null}"#)
            .unwrap();

        let defaults = CostInputs::new(10.0, 40.0);
        let from_toml = read_cost_inputs(&path, &defaults).unwrap();
        assert_eq!(from_toml.tax_rate, 10.0);
        assert_eq!(from_toml.terminal_handling, 122.0);

        let from_json = read_cost_inputs(&json, &defaults).unwrap();
        assert_eq!(from_json.tax_rate, 10.0);
        assert_eq!(from_json.exchange_rate, 40.0);

        let summary = calculate_only(
            &CostOverrides {
                input: Some(path),
                tax_rate: Some(22.0),
                ..Default::default()
            },
            defaults,
        )
        .unwrap();
        assert!((summary.coefficient - 1.10).abs() < 1e-9);
    }

    #[test]
    fn test_non_table_input_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("inputs.json");
        std::fs::write(&path, "[1, 2]").unwrap();
        assert!(matches!(
            read_cost_inputs(&path, &CostInputs::default()),
            Err(AppError::ValidationError { .. })
        ));
    }

    #[tokio::test]
    async fn test_alerts_and_report_share_the_utc_date() {
        let dir = TempDir::new().unwrap();
        let repo = repository(&dir).await;
        let thresholds = AlertThresholds::default();

        let (today, alerts) = current_alerts(&repo, &thresholds, None, now()).await.unwrap();
        assert_eq!(today, now().date_naive());
        assert_eq!(alerts[0].kind, AlertKind::ArrivingSoon);

        let report = build_report(&repo, "Importadora", &thresholds, now())
            .await
            .unwrap();
        assert_eq!(report.alerts_by_severity.values().sum::<usize>(), alerts.len());

        let (later, overdue) = current_alerts(
            &repo,
            &thresholds,
            NaiveDate::from_ymd_opt(2024, 6, 12),
            now(),
        )
        .await
        .unwrap();
        assert_eq!(later, NaiveDate::from_ymd_opt(2024, 6, 12).unwrap());
        assert_eq!(overdue[0].kind, AlertKind::OverdueArrival);
    }

    #[tokio::test]
    async fn test_attach_document() {
        let dir = TempDir::new().unwrap();
        let repo = repository(&dir).await;

        let file = dir.path().join("invoice.pdf");
        std::fs::write(&file, b"%PDF-1.4").unwrap();
        let document = attach_document(&repo, "EMB-2024-007", DocumentKind::Invoice, &file, now())
            .await
            .unwrap();
        assert_eq!(document.shipment_id, "s1");
        assert_eq!(repo.list_documents("s1").await.unwrap()[0].decode().unwrap(), b"%PDF-1.4");

        let script = dir.path().join("run.sh");
        std::fs::write(&script, b"#!/bin/sh").unwrap();
        assert!(attach_document(&repo, "s1", DocumentKind::Other, &script, now())
            .await
            .is_err());
    }
}
