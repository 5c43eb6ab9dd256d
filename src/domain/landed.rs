use crate::domain::cost::landed_unit_cost;
use crate::domain::model::Dataset;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandedLine {
    pub shipment_code: String,
    pub order_number: String,
    pub sku: String,
    pub description: String,
    pub quantity: f64,
    pub unit_fob: f64,
    pub coefficient: f64,
    pub unit_landed: f64,
    pub total_landed: f64,
}

/// One row per order line. Lines of shipments without a computed cost
/// record carry a zero coefficient and zero landed cost.
pub fn landed_lines(dataset: &Dataset) -> Vec<LandedLine> {
    let mut lines = Vec::new();

    for shipment in &dataset.shipments {
        let coefficient = dataset
            .cost_record_for(&shipment.id)
            .map(|r| r.coefficient())
            .unwrap_or(0.0);

        for order in &shipment.purchase_orders {
            for line in &order.lines {
                let unit_landed = landed_unit_cost(line.unit_fob, coefficient);
                lines.push(LandedLine {
                    shipment_code: shipment.code.clone(),
                    order_number: order.number.clone(),
                    sku: line.sku.clone(),
                    description: line.description.clone(),
                    quantity: line.quantity,
                    unit_fob: line.unit_fob,
                    coefficient,
                    unit_landed,
                    total_landed: unit_landed * line.quantity,
                });
            }
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cost::CostInputs;
    use crate::domain::model::{CostRecord, OrderLine, PurchaseOrder, Shipment, ShipmentStatus};
    use chrono::Utc;

    fn shipment(id: &str, code: &str) -> Shipment {
        Shipment {
            id: id.to_string(),
            code: code.to_string(),
            supplier: "Shenzhen Lamps".to_string(),
            origin: "CN".to_string(),
            status: ShipmentStatus::Delivered,
            departure_date: None,
            eta: None,
            status_changed_at: None,
            purchase_orders: vec![PurchaseOrder {
                number: format!("OC-{}", id),
                supplier: "Shenzhen Lamps".to_string(),
                order_date: None,
                lines: vec![OrderLine {
                    sku: "LED-9W".to_string(),
                    description: "LED bulb 9W".to_string(),
                    quantity: 100.0,
                    unit_fob: 2.0,
                }],
            }],
            notes: None,
        }
    }

    #[test]
    fn test_landed_lines_apply_coefficient() {
        let mut inputs = CostInputs::new(22.0, 40.0);
        inputs.fob_value = 200.0;
        inputs.international_freight = 50.0;
        let mut record = CostRecord::new("a", inputs);
        record.recalculate(Utc::now());

        let dataset = Dataset {
            shipments: vec![shipment("a", "EMB-A"), shipment("b", "EMB-B")],
            cost_records: vec![record],
            documents: vec![],
        };

        let lines = landed_lines(&dataset);
        assert_eq!(lines.len(), 2);

        let costed = &lines[0];
        assert_eq!(costed.shipment_code, "EMB-A");
        assert!((costed.coefficient - 1.25).abs() < 1e-9);
        assert!((costed.unit_landed - 2.5).abs() < 1e-9);
        assert!((costed.total_landed - 250.0).abs() < 1e-9);

        let uncosted = &lines[1];
        assert_eq!(uncosted.coefficient, 0.0);
        assert_eq!(uncosted.unit_landed, 0.0);
    }
}
