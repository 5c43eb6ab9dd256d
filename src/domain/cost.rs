//! Import cost coefficient.
//!
//! Every cost line of a shipment is normalized to a tax-exclusive amount in
//! the foreign (invoicing) currency, summed, and related to the FOB value of
//! the goods. The resulting coefficient is the multiplier that turns an FOB
//! unit cost into an approximate landed unit cost.

use crate::utils::error::{AppError, Result};
use crate::utils::validation::{validate_positive_amount, validate_range, Validate};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Uruguayan basic VAT rate, in percent.
pub const DEFAULT_TAX_RATE: f64 = 22.0;
pub const DEFAULT_EXCHANGE_RATE: f64 = 1.0;

/// How a line item is brought to a tax-exclusive foreign-currency amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Treatment {
    /// Foreign currency, already tax-exclusive.
    ForeignNet,
    /// Foreign currency, tax-inclusive.
    ForeignGross,
    /// Local currency, tax-inclusive.
    LocalGross,
    /// DUA item, foreign currency, not subject to VAT.
    CustomsFee,
    /// DUA item the business recovers later; never loaded into cost.
    Refundable,
}

/// Raw cost inputs of one shipment. Missing or null amounts read as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostInputs {
    #[serde(deserialize_with = "tax_rate_or_default")]
    pub tax_rate: f64,
    /// Local currency units per one foreign unit.
    #[serde(deserialize_with = "exchange_rate_or_default")]
    pub exchange_rate: f64,

    #[serde(deserialize_with = "amount")]
    pub fob_value: f64,

    #[serde(deserialize_with = "amount")]
    pub international_freight: f64,
    #[serde(deserialize_with = "amount")]
    pub insurance: f64,
    #[serde(deserialize_with = "amount")]
    pub origin_charges: f64,

    #[serde(deserialize_with = "amount")]
    pub terminal_handling: f64,
    #[serde(deserialize_with = "amount")]
    pub forwarder_fees: f64,
    #[serde(deserialize_with = "amount")]
    pub warehouse_storage: f64,

    /// Despachante (customs broker) fees.
    #[serde(deserialize_with = "amount")]
    pub broker_fees: f64,
    #[serde(deserialize_with = "amount")]
    pub inland_freight: f64,
    #[serde(deserialize_with = "amount")]
    pub bank_charges: f64,
    #[serde(deserialize_with = "amount")]
    pub other_local_costs: f64,

    #[serde(deserialize_with = "amount")]
    pub customs_duty: f64,
    #[serde(deserialize_with = "amount")]
    pub consular_fee: f64,
    #[serde(deserialize_with = "amount")]
    pub customs_service_fee: f64,
    #[serde(deserialize_with = "amount")]
    pub stamp_duty: f64,
    #[serde(deserialize_with = "amount")]
    pub other_customs_fees: f64,
    /// Anticipo de IRAE.
    #[serde(deserialize_with = "amount")]
    pub income_tax_prepayment: f64,
    #[serde(deserialize_with = "amount")]
    pub vat: f64,
    #[serde(deserialize_with = "amount")]
    pub vat_prepayment: f64,
}

impl Default for CostInputs {
    fn default() -> Self {
        Self::new(DEFAULT_TAX_RATE, DEFAULT_EXCHANGE_RATE)
    }
}

impl CostInputs {
    pub fn new(tax_rate: f64, exchange_rate: f64) -> Self {
        Self {
            tax_rate,
            exchange_rate,
            fob_value: 0.0,
            international_freight: 0.0,
            insurance: 0.0,
            origin_charges: 0.0,
            terminal_handling: 0.0,
            forwarder_fees: 0.0,
            warehouse_storage: 0.0,
            broker_fees: 0.0,
            inland_freight: 0.0,
            bank_charges: 0.0,
            other_local_costs: 0.0,
            customs_duty: 0.0,
            consular_fee: 0.0,
            customs_service_fee: 0.0,
            stamp_duty: 0.0,
            other_customs_fees: 0.0,
            income_tax_prepayment: 0.0,
            vat: 0.0,
            vat_prepayment: 0.0,
        }
    }

    /// Seeds the FOB value from the shipment's purchase orders when the
    /// record does not state one.
    pub fn with_fob_fallback(mut self, orders_fob: f64) -> Self {
        if self.fob_value == 0.0 {
            self.fob_value = orders_fob;
        }
        self
    }

    /// Every line item except the FOB value, with its treatment.
    pub fn line_items(&self) -> [(&'static str, f64, Treatment); 18] {
        use Treatment::*;
        [
            ("international_freight", self.international_freight, ForeignNet),
            ("insurance", self.insurance, ForeignNet),
            ("origin_charges", self.origin_charges, ForeignNet),
            ("terminal_handling", self.terminal_handling, ForeignGross),
            ("forwarder_fees", self.forwarder_fees, ForeignGross),
            ("warehouse_storage", self.warehouse_storage, ForeignGross),
            ("broker_fees", self.broker_fees, LocalGross),
            ("inland_freight", self.inland_freight, LocalGross),
            ("bank_charges", self.bank_charges, LocalGross),
            ("other_local_costs", self.other_local_costs, LocalGross),
            ("customs_duty", self.customs_duty, CustomsFee),
            ("consular_fee", self.consular_fee, CustomsFee),
            ("customs_service_fee", self.customs_service_fee, CustomsFee),
            ("stamp_duty", self.stamp_duty, CustomsFee),
            ("other_customs_fees", self.other_customs_fees, CustomsFee),
            ("income_tax_prepayment", self.income_tax_prepayment, Refundable),
            ("vat", self.vat, Refundable),
            ("vat_prepayment", self.vat_prepayment, Refundable),
        ]
    }
}

impl Validate for CostInputs {
    fn validate(&self) -> Result<()> {
        validate_range("tax_rate", self.tax_rate, 0.0, 100.0)?;
        validate_positive_amount("exchange_rate", self.exchange_rate)?;
        if !self.fob_value.is_finite() || self.fob_value < 0.0 {
            return Err(AppError::ValidationError {
                message: format!("fob_value must be a non-negative amount, got {}", self.fob_value),
            });
        }
        for (name, value, _) in self.line_items() {
            if !value.is_finite() || value < 0.0 {
                return Err(AppError::ValidationError {
                    message: format!("{} must be a non-negative amount, got {}", name, value),
                });
            }
        }
        Ok(())
    }
}

/// Result of one coefficient calculation. All amounts are tax-exclusive and
/// in the foreign currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostSummary {
    pub fob_value: f64,
    pub additional_costs: f64,
    pub total_cost: f64,
    pub coefficient: f64,
    pub coefficient_pct: f64,
    pub overhead_pct: f64,
    pub breakdown: BTreeMap<String, f64>,
    pub refundable: BTreeMap<String, f64>,
}

pub fn to_tax_exclusive(amount: f64, tax_rate: f64) -> f64 {
    let divisor = 1.0 + tax_rate / 100.0;
    if divisor <= 0.0 {
        return 0.0;
    }
    amount / divisor
}

/// Local to foreign currency. A missing (non-positive) rate yields zero.
pub fn to_foreign(amount: f64, exchange_rate: f64) -> f64 {
    if exchange_rate <= 0.0 {
        return 0.0;
    }
    amount / exchange_rate
}

pub fn normalize(amount: f64, treatment: Treatment, tax_rate: f64, exchange_rate: f64) -> f64 {
    match treatment {
        Treatment::ForeignNet | Treatment::CustomsFee | Treatment::Refundable => amount,
        Treatment::ForeignGross => to_tax_exclusive(amount, tax_rate),
        Treatment::LocalGross => to_tax_exclusive(to_foreign(amount, exchange_rate), tax_rate),
    }
}

pub fn calculate(inputs: &CostInputs) -> CostSummary {
    let mut breakdown = BTreeMap::new();
    let mut refundable = BTreeMap::new();

    for (name, amount, treatment) in inputs.line_items() {
        let normalized = normalize(amount, treatment, inputs.tax_rate, inputs.exchange_rate);
        match treatment {
            Treatment::Refundable => refundable.insert(name.to_string(), normalized),
            _ => breakdown.insert(name.to_string(), normalized),
        };
    }

    let fob_value = inputs.fob_value;
    let additional_costs: f64 = breakdown.values().sum();
    let total_cost = fob_value + additional_costs;
    let coefficient = if fob_value == 0.0 {
        0.0
    } else {
        total_cost / fob_value
    };
    let overhead_pct = if coefficient == 0.0 {
        0.0
    } else {
        (coefficient - 1.0) * 100.0
    };

    tracing::debug!(
        fob_value,
        additional_costs,
        coefficient,
        "Calculated cost coefficient"
    );

    CostSummary {
        fob_value,
        additional_costs,
        total_cost,
        coefficient,
        coefficient_pct: coefficient * 100.0,
        overhead_pct,
        breakdown,
        refundable,
    }
}

pub fn landed_unit_cost(unit_fob: f64, coefficient: f64) -> f64 {
    unit_fob * coefficient
}

fn amount<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}

fn tax_rate_or_default<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(DEFAULT_TAX_RATE))
}

fn exchange_rate_or_default<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(DEFAULT_EXCHANGE_RATE))
}
