use crate::core::{ConfigProvider, Dataset, ExportBundle, ExportFile, Pipeline, Repository, Storage};
use crate::domain::alerts::{evaluate_alerts, Alert};
use crate::domain::cost::{CostInputs, Treatment};
use crate::domain::landed::{landed_lines, LandedLine};
use crate::domain::report::ExecutiveReport;
use crate::utils::error::{AppError, Result};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::io::Write;
use std::path::Path;
use zip::write::{SimpleFileOptions, ZipWriter};

pub struct ExportPipeline<S: Storage, C: ConfigProvider> {
    repository: Box<dyn Repository>,
    storage: S,
    config: C,
    as_of: Option<DateTime<Utc>>,
}

impl<S: Storage, C: ConfigProvider> ExportPipeline<S, C> {
    pub fn new(repository: Box<dyn Repository>, storage: S, config: C) -> Self {
        Self {
            repository,
            storage,
            config,
            as_of: None,
        }
    }

    /// Pins the clock used for cost timestamps, alerts and the report.
    pub fn as_of(mut self, now: DateTime<Utc>) -> Self {
        self.as_of = Some(now);
        self
    }

    fn now(&self) -> DateTime<Utc> {
        self.as_of.unwrap_or_else(Utc::now)
    }

    fn collect_documents(&self, dataset: &Dataset) -> Vec<ExportFile> {
        let mut files = Vec::new();
        let mut used_names = HashSet::new();

        for document in &dataset.documents {
            let folder = dataset
                .shipment(&document.shipment_id)
                .map(|s| s.code.as_str())
                .unwrap_or("unassigned");

            let content = match document.decode() {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(
                        "Skipping document {} ({}): {}",
                        document.file_name,
                        document.id,
                        e
                    );
                    continue;
                }
            };

            let file_name = archive_file_name(&document.file_name, &document.id);
            let mut name = format!("documents/{}/{}", folder, file_name);
            if !used_names.insert(name.clone()) {
                name = format!("documents/{}/{}_{}", folder, document.id, file_name);
                used_names.insert(name.clone());
            }
            files.push(ExportFile { name, content });
        }

        files
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for ExportPipeline<S, C> {
    async fn extract(&self) -> Result<Dataset> {
        self.repository.load_dataset().await
    }

    async fn transform(&self, mut data: Dataset) -> Result<ExportBundle> {
        let now = self.now();
        data.recalculate_costs(now);

        let landed = landed_lines(&data);
        let alerts = evaluate_alerts(&data, &self.config.alert_thresholds(), now.date_naive());
        let report = ExecutiveReport::build(self.config.business_name(), &data, &alerts, now);

        let sheets = vec![
            shipments_sheet(&data)?,
            purchase_orders_sheet(&data)?,
            costs_sheet(&data)?,
            landed_sheet(&landed)?,
            alerts_sheet(&alerts)?,
            ExportFile {
                name: "report.json".to_string(),
                content: serde_json::to_vec_pretty(&report)?,
            },
            ExportFile {
                name: "report.txt".to_string(),
                content: report.render_text().into_bytes(),
            },
        ];

        let documents = if self.config.include_documents() {
            self.collect_documents(&data)
        } else {
            Vec::new()
        };

        Ok(ExportBundle {
            sheets,
            documents,
            report,
            alerts,
        })
    }

    async fn load(&self, bundle: ExportBundle) -> Result<String> {
        let filename = self.config.export_filename();
        let output_path = format!("{}/{}", self.config.output_path(), filename);

        tracing::debug!(
            "Creating ZIP file with {} files",
            bundle.sheets.len() + bundle.documents.len()
        );

        let zip_data = {
            let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
            for file in bundle.sheets.iter().chain(bundle.documents.iter()) {
                zip.start_file(file.name.as_str(), SimpleFileOptions::default())?;
                zip.write_all(&file.content)?;
            }

            let cursor = zip.finish()?;
            cursor.into_inner()
        };

        tracing::debug!("Writing ZIP file ({} bytes) to storage", zip_data.len());
        self.storage.write_file(filename, &zip_data).await?;

        Ok(output_path)
    }
}

/// Last path component of a stored file name; the document id when none is usable.
fn archive_file_name<'a>(file_name: &'a str, id: &'a str) -> &'a str {
    Path::new(file_name)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(id)
}

fn amount(value: f64) -> String {
    format!("{:.2}", value)
}

fn ratio(value: f64) -> String {
    format!("{:.4}", value)
}

fn date<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn sheet(name: &str, header: &[&str], rows: Vec<Vec<String>>) -> Result<ExportFile> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(&row)?;
    }
    let content = writer
        .into_inner()
        .map_err(|e| AppError::IoError(e.into_error()))?;
    Ok(ExportFile {
        name: name.to_string(),
        content,
    })
}

fn shipments_sheet(data: &Dataset) -> Result<ExportFile> {
    let rows = data
        .shipments
        .iter()
        .map(|s| {
            vec![
                s.code.clone(),
                s.supplier.clone(),
                s.origin.clone(),
                s.status.to_string(),
                date(s.departure_date),
                date(s.eta),
                s.purchase_orders.len().to_string(),
                amount(s.fob_total()),
                ratio(
                    data.cost_record_for(&s.id)
                        .map(|r| r.coefficient())
                        .unwrap_or(0.0),
                ),
                data.documents_for(&s.id).count().to_string(),
                s.notes.clone().unwrap_or_default(),
            ]
        })
        .collect();

    sheet(
        "shipments.csv",
        &[
            "code",
            "supplier",
            "origin",
            "status",
            "departure_date",
            "eta",
            "purchase_orders",
            "fob_total",
            "coefficient",
            "documents",
            "notes",
        ],
        rows,
    )
}

fn purchase_orders_sheet(data: &Dataset) -> Result<ExportFile> {
    let mut rows = Vec::new();
    for shipment in &data.shipments {
        for order in &shipment.purchase_orders {
            rows.push(vec![
                shipment.code.clone(),
                order.number.clone(),
                order.supplier.clone(),
                date(order.order_date),
                order.lines.len().to_string(),
                amount(order.fob_total()),
            ]);
        }
    }

    sheet(
        "purchase_orders.csv",
        &[
            "shipment_code",
            "order_number",
            "supplier",
            "order_date",
            "lines",
            "fob_total",
        ],
        rows,
    )
}

fn costs_sheet(data: &Dataset) -> Result<ExportFile> {
    let items = CostInputs::default().line_items();
    let mut header = vec![
        "shipment_code",
        "tax_rate",
        "exchange_rate",
        "fob_value",
        "additional_costs",
        "total_cost",
        "coefficient",
        "overhead_pct",
    ];
    header.extend(items.iter().map(|(name, _, _)| *name));

    let mut rows = Vec::new();
    for record in &data.cost_records {
        let Some(summary) = &record.summary else {
            continue;
        };
        let code = data
            .shipment(&record.shipment_id)
            .map(|s| s.code.clone())
            .unwrap_or_else(|| record.shipment_id.clone());

        let mut row = vec![
            code,
            amount(record.inputs.tax_rate),
            ratio(record.inputs.exchange_rate),
            amount(summary.fob_value),
            amount(summary.additional_costs),
            amount(summary.total_cost),
            ratio(summary.coefficient),
            amount(summary.overhead_pct),
        ];
        for (name, _, treatment) in &items {
            let source = match treatment {
                Treatment::Refundable => &summary.refundable,
                _ => &summary.breakdown,
            };
            row.push(amount(source.get(*name).copied().unwrap_or(0.0)));
        }
        rows.push(row);
    }

    sheet("costs.csv", &header, rows)
}

fn landed_sheet(lines: &[LandedLine]) -> Result<ExportFile> {
    let rows = lines
        .iter()
        .map(|l| {
            vec![
                l.shipment_code.clone(),
                l.order_number.clone(),
                l.sku.clone(),
                l.description.clone(),
                l.quantity.to_string(),
                amount(l.unit_fob),
                ratio(l.coefficient),
                amount(l.unit_landed),
                amount(l.total_landed),
            ]
        })
        .collect();

    sheet(
        "landed_costs.csv",
        &[
            "shipment_code",
            "order_number",
            "sku",
            "description",
            "quantity",
            "unit_fob",
            "coefficient",
            "unit_landed",
            "total_landed",
        ],
        rows,
    )
}

fn alerts_sheet(alerts: &[Alert]) -> Result<ExportFile> {
    let rows = alerts
        .iter()
        .map(|a| {
            vec![
                a.severity.as_str().to_string(),
                a.shipment_code.clone(),
                a.kind.as_str().to_string(),
                a.message.clone(),
            ]
        })
        .collect();

    sheet(
        "alerts.csv",
        &["severity", "shipment_code", "kind", "message"],
        rows,
    )
}
