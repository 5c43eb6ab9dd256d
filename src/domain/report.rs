use crate::domain::alerts::{Alert, Severity};
use crate::domain::model::{Dataset, ShipmentStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierTotals {
    pub supplier: String,
    pub shipments: usize,
    pub fob_total: f64,
    pub landed_total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutiveReport {
    pub business: String,
    pub generated_at: DateTime<Utc>,
    pub total_shipments: usize,
    pub by_status: BTreeMap<ShipmentStatus, usize>,
    pub fob_total: f64,
    pub landed_total: f64,
    /// FOB-weighted over shipments with a computed coefficient.
    pub average_coefficient: f64,
    pub suppliers: Vec<SupplierTotals>,
    pub alerts_by_severity: BTreeMap<Severity, usize>,
}

impl ExecutiveReport {
    /// Expects cost summaries to be current (see `Dataset::recalculate_costs`).
    pub fn build(
        business: &str,
        dataset: &Dataset,
        alerts: &[Alert],
        generated_at: DateTime<Utc>,
    ) -> Self {
        let mut by_status: BTreeMap<ShipmentStatus, usize> =
            ShipmentStatus::ALL.iter().map(|s| (*s, 0)).collect();
        let mut suppliers: BTreeMap<String, SupplierTotals> = BTreeMap::new();
        let mut fob_total = 0.0;
        let mut landed_total = 0.0;
        let mut costed_fob = 0.0;
        let mut costed_landed = 0.0;

        for shipment in &dataset.shipments {
            *by_status.entry(shipment.status).or_insert(0) += 1;

            let summary = dataset
                .cost_record_for(&shipment.id)
                .and_then(|r| r.summary.as_ref())
                .filter(|s| s.coefficient > 0.0);

            let (fob, landed) = match summary {
                Some(s) => {
                    costed_fob += s.fob_value;
                    costed_landed += s.total_cost;
                    (s.fob_value, s.total_cost)
                }
                None => (shipment.fob_total(), 0.0),
            };
            fob_total += fob;
            landed_total += landed;

            let entry = suppliers
                .entry(shipment.supplier.clone())
                .or_insert_with(|| SupplierTotals {
                    supplier: shipment.supplier.clone(),
                    shipments: 0,
                    fob_total: 0.0,
                    landed_total: 0.0,
                });
            entry.shipments += 1;
            entry.fob_total += fob;
            entry.landed_total += landed;
        }

        let mut suppliers: Vec<SupplierTotals> = suppliers.into_values().collect();
        suppliers.sort_by(|a, b| b.fob_total.total_cmp(&a.fob_total));

        let mut alerts_by_severity = BTreeMap::new();
        for alert in alerts {
            *alerts_by_severity.entry(alert.severity).or_insert(0) += 1;
        }

        Self {
            business: business.to_string(),
            generated_at,
            total_shipments: dataset.shipments.len(),
            by_status,
            fob_total,
            landed_total,
            average_coefficient: if costed_fob > 0.0 {
                costed_landed / costed_fob
            } else {
                0.0
            },
            suppliers,
            alerts_by_severity,
        }
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} - executive report", self.business);
        let _ = writeln!(out, "Generated: {}", self.generated_at.format("%Y-%m-%d %H:%M UTC"));
        let _ = writeln!(out);
        let _ = writeln!(out, "Shipments: {}", self.total_shipments);
        for (status, count) in &self.by_status {
            let _ = writeln!(out, "  {:<12} {}", status.as_str(), count);
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "FOB total:           {:.2}", self.fob_total);
        let _ = writeln!(out, "Landed total:        {:.2}", self.landed_total);
        let _ = writeln!(out, "Average coefficient: {:.4}", self.average_coefficient);

        if !self.suppliers.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Suppliers:");
            for s in &self.suppliers {
                let _ = writeln!(
                    out,
                    "  {:<24} {:>3} shipment(s)  FOB {:>12.2}  landed {:>12.2}",
                    s.supplier, s.shipments, s.fob_total, s.landed_total
                );
            }
        }

        let _ = writeln!(out);
        if self.alerts_by_severity.is_empty() {
            let _ = writeln!(out, "Alerts: none");
        } else {
            let counts: Vec<String> = self
                .alerts_by_severity
                .iter()
                .rev()
                .map(|(severity, count)| format!("{} {}", count, severity.as_str()))
                .collect();
            let _ = writeln!(out, "Alerts: {}", counts.join(", "));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::alerts::AlertKind;
    use crate::domain::cost::CostInputs;
    use crate::domain::model::{CostRecord, OrderLine, PurchaseOrder, Shipment};
    use chrono::TimeZone;

    fn shipment(id: &str, supplier: &str, status: ShipmentStatus, fob: f64) -> Shipment {
        Shipment {
            id: id.to_string(),
            code: format!("EMB-{}", id),
            supplier: supplier.to_string(),
            origin: "CN".to_string(),
            status,
            departure_date: None,
            eta: None,
            status_changed_at: None,
            purchase_orders: vec![PurchaseOrder {
                number: format!("OC-{}", id),
                supplier: supplier.to_string(),
                order_date: None,
                lines: vec![OrderLine {
                    sku: "SKU".to_string(),
                    description: String::new(),
                    quantity: 1.0,
                    unit_fob: fob,
                }],
            }],
            notes: None,
        }
    }

    fn costed(id: &str, fob: f64, freight: f64) -> CostRecord {
        let mut inputs = CostInputs::default();
        inputs.fob_value = fob;
        inputs.international_freight = freight;
        let mut record = CostRecord::new(id, inputs);
        record.recalculate(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        record
    }

    #[test]
    fn test_build_report_totals() {
        let dataset = Dataset {
            shipments: vec![
                shipment("1", "Acme", ShipmentStatus::Delivered, 1000.0),
                shipment("2", "Acme", ShipmentStatus::InCustoms, 3000.0),
                shipment("3", "Bolt", ShipmentStatus::InTransit, 500.0),
            ],
            cost_records: vec![costed("1", 1000.0, 100.0), costed("2", 3000.0, 900.0)],
            documents: vec![],
        };
        let alerts = vec![
            Alert {
                shipment_code: "EMB-3".to_string(),
                kind: AlertKind::OverdueArrival,
                severity: Severity::Critical,
                message: String::new(),
            },
            Alert {
                shipment_code: "EMB-2".to_string(),
                kind: AlertKind::MissingDocuments,
                severity: Severity::Warning,
                message: String::new(),
            },
        ];
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 8, 0, 0).unwrap();

        let report = ExecutiveReport::build("Importadora Sur", &dataset, &alerts, now);

        assert_eq!(report.total_shipments, 3);
        assert_eq!(report.by_status[&ShipmentStatus::Preparing], 0);
        assert_eq!(report.by_status[&ShipmentStatus::InTransit], 1);
        assert_eq!(report.fob_total, 4500.0);
        assert!((report.landed_total - 5000.0).abs() < 1e-9);
        assert!((report.average_coefficient - 1.25).abs() < 1e-9);
        assert_eq!(report.suppliers[0].supplier, "Acme");
        assert_eq!(report.suppliers[0].shipments, 2);
        assert_eq!(report.suppliers[1].landed_total, 0.0);
        assert_eq!(report.alerts_by_severity[&Severity::Critical], 1);

        let text = report.render_text();
        assert!(text.starts_with("Importadora Sur - executive report"));
        assert!(text.contains("Average coefficient: 1.2500"));
        assert!(text.contains("Alerts: 1 critical, 1 warning"));
    }

    #[test]
    fn test_empty_dataset() {
        let report = ExecutiveReport::build("X", &Dataset::default(), &[], Utc::now());
        assert_eq!(report.total_shipments, 0);
        assert_eq!(report.average_coefficient, 0.0);
        assert!(report.render_text().contains("Alerts: none"));
    }
}
