// Domain layer: shipment model, cost calculation, alerts and reporting, plus
// the ports the adapters implement.

pub mod alerts;
pub mod cost;
pub mod landed;
pub mod model;
pub mod ports;
pub mod report;
