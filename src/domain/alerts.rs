//! Fixed threshold checks over the shipment dataset.

use crate::domain::cost::calculate;
use crate::domain::model::{Dataset, DocumentKind, Shipment, ShipmentStatus};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BTreeSet;

pub const DEFAULT_ARRIVAL_WINDOW_DAYS: i64 = 7;
pub const DEFAULT_CUSTOMS_MAX_DAYS: i64 = 5;
/// Above this the shipment carries more than 60% overhead on FOB.
pub const DEFAULT_MAX_COEFFICIENT: f64 = 1.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    OverdueArrival,
    ArrivingSoon,
    CustomsDelay,
    MissingCostRecord,
    HighCoefficient,
    MissingDocuments,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::OverdueArrival => "overdue_arrival",
            AlertKind::ArrivingSoon => "arriving_soon",
            AlertKind::CustomsDelay => "customs_delay",
            AlertKind::MissingCostRecord => "missing_cost_record",
            AlertKind::HighCoefficient => "high_coefficient",
            AlertKind::MissingDocuments => "missing_documents",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub shipment_code: String,
    pub kind: AlertKind,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertThresholds {
    pub arrival_window_days: i64,
    pub customs_max_days: i64,
    pub max_coefficient: f64,
    pub required_documents: Vec<DocumentKind>,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            arrival_window_days: DEFAULT_ARRIVAL_WINDOW_DAYS,
            customs_max_days: DEFAULT_CUSTOMS_MAX_DAYS,
            max_coefficient: DEFAULT_MAX_COEFFICIENT,
            required_documents: vec![DocumentKind::Invoice, DocumentKind::BillOfLading],
        }
    }
}

pub fn evaluate_alerts(
    dataset: &Dataset,
    thresholds: &AlertThresholds,
    today: NaiveDate,
) -> Vec<Alert> {
    let mut alerts = Vec::new();

    for shipment in &dataset.shipments {
        check_arrival(shipment, thresholds, today, &mut alerts);
        check_customs_delay(shipment, thresholds, today, &mut alerts);
        check_costs(dataset, shipment, thresholds, &mut alerts);
        check_documents(dataset, shipment, thresholds, &mut alerts);
    }

    alerts.sort_by(|a, b| {
        Reverse(a.severity)
            .cmp(&Reverse(b.severity))
            .then_with(|| a.shipment_code.cmp(&b.shipment_code))
    });

    tracing::debug!(
        "Evaluated {} alerts over {} shipments",
        alerts.len(),
        dataset.shipments.len()
    );
    alerts
}

fn push(
    alerts: &mut Vec<Alert>,
    shipment: &Shipment,
    kind: AlertKind,
    severity: Severity,
    message: String,
) {
    alerts.push(Alert {
        shipment_code: shipment.code.clone(),
        kind,
        severity,
        message,
    });
}

fn check_arrival(
    shipment: &Shipment,
    thresholds: &AlertThresholds,
    today: NaiveDate,
    alerts: &mut Vec<Alert>,
) {
    let Some(eta) = shipment.eta else {
        return;
    };
    let days_left = (eta - today).num_days();

    match shipment.status {
        ShipmentStatus::Preparing | ShipmentStatus::InTransit if days_left < 0 => push(
            alerts,
            shipment,
            AlertKind::OverdueArrival,
            Severity::Critical,
            format!("ETA {} passed {} day(s) ago", eta, -days_left),
        ),
        ShipmentStatus::InTransit if days_left <= thresholds.arrival_window_days => push(
            alerts,
            shipment,
            AlertKind::ArrivingSoon,
            Severity::Info,
            format!("Arriving on {} ({} day(s))", eta, days_left),
        ),
        _ => {}
    }
}

fn check_customs_delay(
    shipment: &Shipment,
    thresholds: &AlertThresholds,
    today: NaiveDate,
    alerts: &mut Vec<Alert>,
) {
    if shipment.status != ShipmentStatus::InCustoms {
        return;
    }
    let Some(since) = shipment.status_changed_at else {
        return;
    };
    let days = (today - since.date_naive()).num_days();
    if days > thresholds.customs_max_days {
        push(
            alerts,
            shipment,
            AlertKind::CustomsDelay,
            Severity::Warning,
            format!(
                "In customs for {} day(s), limit is {}",
                days, thresholds.customs_max_days
            ),
        );
    }
}

fn check_costs(
    dataset: &Dataset,
    shipment: &Shipment,
    thresholds: &AlertThresholds,
    alerts: &mut Vec<Alert>,
) {
    let inputs = dataset
        .cost_record_for(&shipment.id)
        .map(|r| r.inputs.clone().with_fob_fallback(shipment.fob_total()));

    let needs_costs = shipment.status >= ShipmentStatus::InCustoms;
    match inputs {
        Some(inputs) if inputs.fob_value > 0.0 => {
            let coefficient = calculate(&inputs).coefficient;
            if coefficient > thresholds.max_coefficient {
                push(
                    alerts,
                    shipment,
                    AlertKind::HighCoefficient,
                    Severity::Warning,
                    format!(
                        "Cost coefficient {:.4} exceeds {:.4}",
                        coefficient, thresholds.max_coefficient
                    ),
                );
            }
        }
        _ if needs_costs => push(
            alerts,
            shipment,
            AlertKind::MissingCostRecord,
            Severity::Warning,
            format!("No cost data recorded while {}", shipment.status),
        ),
        _ => {}
    }
}

fn check_documents(
    dataset: &Dataset,
    shipment: &Shipment,
    thresholds: &AlertThresholds,
    alerts: &mut Vec<Alert>,
) {
    if shipment.status < ShipmentStatus::InCustoms {
        return;
    }
    let present: BTreeSet<DocumentKind> = dataset
        .documents_for(&shipment.id)
        .map(|d| d.kind)
        .collect();
    let missing: Vec<&str> = thresholds
        .required_documents
        .iter()
        .filter(|kind| !present.contains(*kind))
        .map(DocumentKind::as_str)
        .collect();

    if !missing.is_empty() {
        push(
            alerts,
            shipment,
            AlertKind::MissingDocuments,
            Severity::Warning,
            format!("Missing documents: {}", missing.join(", ")),
        );
    }
}
