use crate::domain::alerts::Alert;
use crate::domain::cost::{calculate, CostInputs, CostSummary};
use crate::domain::report::ExecutiveReport;
use crate::utils::error::{AppError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    Preparing,
    InTransit,
    InCustoms,
    Delivered,
}

impl ShipmentStatus {
    pub const ALL: [ShipmentStatus; 4] = [
        ShipmentStatus::Preparing,
        ShipmentStatus::InTransit,
        ShipmentStatus::InCustoms,
        ShipmentStatus::Delivered,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ShipmentStatus::Preparing => "preparing",
            ShipmentStatus::InTransit => "in_transit",
            ShipmentStatus::InCustoms => "in_customs",
            ShipmentStatus::Delivered => "delivered",
        }
    }

    /// Forward moves only; skipping a state is allowed.
    pub fn can_transition_to(&self, next: ShipmentStatus) -> bool {
        next >= *self
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShipmentStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "preparing" => Ok(ShipmentStatus::Preparing),
            "in_transit" => Ok(ShipmentStatus::InTransit),
            "in_customs" => Ok(ShipmentStatus::InCustoms),
            "delivered" => Ok(ShipmentStatus::Delivered),
            other => Err(AppError::ValidationError {
                message: format!(
                    "Unknown shipment status '{}'. Expected one of: preparing, in_transit, in_customs, delivered",
                    other
                ),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub sku: String,
    #[serde(default)]
    pub description: String,
    pub quantity: f64,
    pub unit_fob: f64,
}

impl OrderLine {
    pub fn fob_total(&self) -> f64 {
        self.quantity * self.unit_fob
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub number: String,
    pub supplier: String,
    #[serde(default)]
    pub order_date: Option<NaiveDate>,
    #[serde(default)]
    pub lines: Vec<OrderLine>,
}

impl PurchaseOrder {
    pub fn fob_total(&self) -> f64 {
        self.lines.iter().map(OrderLine::fob_total).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    pub id: String,
    pub code: String,
    pub supplier: String,
    #[serde(default)]
    pub origin: String,
    pub status: ShipmentStatus,
    #[serde(default)]
    pub departure_date: Option<NaiveDate>,
    #[serde(default)]
    pub eta: Option<NaiveDate>,
    #[serde(default)]
    pub status_changed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub purchase_orders: Vec<PurchaseOrder>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Shipment {
    pub fn fob_total(&self) -> f64 {
        self.purchase_orders.iter().map(PurchaseOrder::fob_total).sum()
    }

    /// Applies a status change. Returns `false` when the shipment already
    /// has the requested status.
    pub fn set_status(&mut self, next: ShipmentStatus, now: DateTime<Utc>) -> Result<bool> {
        if self.status == next {
            return Ok(false);
        }
        if !self.status.can_transition_to(next) {
            return Err(AppError::InvalidTransition {
                code: self.code.clone(),
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        tracing::info!(
            shipment = %self.code,
            from = %self.status,
            to = %next,
            "Shipment status changed"
        );
        self.status = next;
        self.status_changed_at = Some(now);
        Ok(true)
    }
}

/// Cost inputs of one shipment plus the last computed summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostRecord {
    pub shipment_id: String,
    #[serde(default)]
    pub inputs: CostInputs,
    #[serde(default)]
    pub summary: Option<CostSummary>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CostRecord {
    pub fn new(shipment_id: impl Into<String>, inputs: CostInputs) -> Self {
        Self {
            shipment_id: shipment_id.into(),
            inputs,
            summary: None,
            updated_at: None,
        }
    }

    pub fn recalculate(&mut self, now: DateTime<Utc>) -> &CostSummary {
        self.updated_at = Some(now);
        self.summary.insert(calculate(&self.inputs))
    }

    pub fn coefficient(&self) -> f64 {
        self.summary.as_ref().map(|s| s.coefficient).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Invoice,
    PackingList,
    BillOfLading,
    Dua,
    Other,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Invoice => "invoice",
            DocumentKind::PackingList => "packing_list",
            DocumentKind::BillOfLading => "bill_of_lading",
            DocumentKind::Dua => "dua",
            DocumentKind::Other => "other",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "invoice" => Ok(DocumentKind::Invoice),
            "packing_list" => Ok(DocumentKind::PackingList),
            "bill_of_lading" | "bl" => Ok(DocumentKind::BillOfLading),
            "dua" => Ok(DocumentKind::Dua),
            "other" => Ok(DocumentKind::Other),
            other => Err(AppError::ValidationError {
                message: format!("Unknown document kind '{}'", other),
            }),
        }
    }
}

/// A file attached to a shipment, stored as base64 text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub shipment_id: String,
    pub kind: DocumentKind,
    pub file_name: String,
    pub content_base64: String,
    #[serde(default)]
    pub uploaded_at: Option<DateTime<Utc>>,
}

impl Document {
    pub fn new(
        shipment_id: impl Into<String>,
        kind: DocumentKind,
        file_name: impl Into<String>,
        content: &[u8],
        uploaded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            shipment_id: shipment_id.into(),
            kind,
            file_name: file_name.into(),
            content_base64: STANDARD.encode(content),
            uploaded_at: Some(uploaded_at),
        }
    }

    pub fn decode(&self) -> Result<Vec<u8>> {
        Ok(STANDARD.decode(self.content_base64.trim())?)
    }
}

/// Everything the reports and exports read, loaded in one go.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub shipments: Vec<Shipment>,
    #[serde(default)]
    pub cost_records: Vec<CostRecord>,
    #[serde(default)]
    pub documents: Vec<Document>,
}

impl Dataset {
    /// Looks a shipment up by id or by code.
    pub fn shipment(&self, reference: &str) -> Option<&Shipment> {
        self.shipments
            .iter()
            .find(|s| s.id == reference || s.code == reference)
    }

    pub fn cost_record_for(&self, shipment_id: &str) -> Option<&CostRecord> {
        self.cost_records
            .iter()
            .find(|r| r.shipment_id == shipment_id)
    }

    pub fn documents_for<'a>(&'a self, shipment_id: &'a str) -> impl Iterator<Item = &'a Document> {
        self.documents
            .iter()
            .filter(move |d| d.shipment_id == shipment_id)
    }

    /// Recomputes every cost summary, seeding missing FOB values from the
    /// purchase orders of the matching shipment.
    pub fn recalculate_costs(&mut self, now: DateTime<Utc>) {
        for record in &mut self.cost_records {
            if let Some(shipment) = self
                .shipments
                .iter()
                .find(|s| s.id == record.shipment_id)
            {
                record.inputs = record.inputs.clone().with_fob_fallback(shipment.fob_total());
            }
            record.recalculate(now);
        }
    }
}

/// A file produced by the export, named by its path inside the archive.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportFile {
    pub name: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ExportBundle {
    pub sheets: Vec<ExportFile>,
    pub documents: Vec<ExportFile>,
    pub report: ExecutiveReport,
    pub alerts: Vec<Alert>,
}
