//! Weekly settlement calculator.
//!
//! Turns one cycle's platform earnings plus known charges into a [`SettlementRecord`].
//! Everything here is pure: persistence is the caller's concern.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::domain::{
    DriverId, RegistrationNumber, SettlementDraft, SettlementId, SettlementRecord,
    SettlementStatus, ValidationError,
};
use super::money::Money;

/// Commission owed to the fleet for the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum Commission {
    /// Absolute amount deducted.
    Flat(Money),
    /// Fraction of gross earnings, between 0 and 1 inclusive.
    Rate(Decimal),
}

impl Default for Commission {
    fn default() -> Self {
        Commission::Flat(Money::ZERO)
    }
}

/// Raw earnings input for one driver and one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementInput {
    pub driver_id: DriverId,
    pub vehicle_registration: RegistrationNumber,
    pub cycle_end: NaiveDate,
    pub gross_earnings: Money,
    #[serde(default)]
    pub commission: Commission,
    #[serde(default)]
    pub fast_tag_charge: Money,
    #[serde(default)]
    pub rto_fine: Money,
    #[serde(default)]
    pub private_toll_charges: Money,
    #[serde(default)]
    pub other_charges: Money,
}

/// What to do when deductions exceed gross earnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegativePayoutPolicy {
    /// Fail with [`InvalidAmountError::NegativeNetPayable`].
    #[default]
    Reject,
    /// Pay zero and carry the deficit on the record as `shortfall`.
    Clamp,
}

impl NegativePayoutPolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "reject" => Some(Self::Reject),
            "clamp" => Some(Self::Clamp),
            _ => None,
        }
    }
}

/// Monetary input the calculator refuses.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidAmountError {
    #[error("{field} must not be negative (found {value})")]
    Negative { field: &'static str, value: Money },
    #[error("{field} of {value} is above the ledger limit")]
    TooLarge { field: &'static str, value: Money },
    #[error("commission {commission} exceeds gross earnings {gross}")]
    CommissionExceedsGross { commission: Money, gross: Money },
    #[error("commission rate {0} must be between 0 and 1")]
    CommissionRate(Decimal),
    #[error("deductions exceed earnings: net payable would be {0}")]
    NegativeNetPayable(Money),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

#[derive(Debug, Clone, Default)]
pub struct SettlementCalculator {
    policy: NegativePayoutPolicy,
}

impl SettlementCalculator {
    pub fn new(policy: NegativePayoutPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> NegativePayoutPolicy {
        self.policy
    }

    /// Compute a `Pending` record with a freshly generated id.
    pub fn compute(&self, input: SettlementInput) -> Result<SettlementRecord, InvalidAmountError> {
        let id = SettlementId(uuid::Uuid::new_v4().to_string());
        self.compute_with_id(id, input)
    }

    pub fn compute_with_id(
        &self,
        id: SettlementId,
        input: SettlementInput,
    ) -> Result<SettlementRecord, InvalidAmountError> {
        let gross = input.gross_earnings;
        non_negative("gross earnings", gross)?;

        let commission = match input.commission {
            Commission::Flat(amount) => {
                non_negative("commission", amount)?;
                amount
            }
            Commission::Rate(rate) => {
                if rate < Decimal::ZERO || rate > Decimal::ONE {
                    return Err(InvalidAmountError::CommissionRate(rate));
                }
                gross.apply_rate(rate)
            }
        };
        if commission > gross {
            return Err(InvalidAmountError::CommissionExceedsGross { commission, gross });
        }

        non_negative("fast tag charge", input.fast_tag_charge)?;
        non_negative("rto fine", input.rto_fine)?;
        non_negative("private toll charges", input.private_toll_charges)?;
        non_negative("other charges", input.other_charges)?;

        let deductions = commission
            + input.fast_tag_charge
            + input.rto_fine
            + input.private_toll_charges
            + input.other_charges;
        let net = gross - deductions;

        let (net_payable, shortfall) = if net.is_negative() {
            match self.policy {
                NegativePayoutPolicy::Reject => {
                    return Err(InvalidAmountError::NegativeNetPayable(net))
                }
                NegativePayoutPolicy::Clamp => (Money::ZERO, net.abs()),
            }
        } else {
            (net, Money::ZERO)
        };

        let record = SettlementRecord::new(SettlementDraft {
            id,
            driver_id: input.driver_id,
            vehicle_registration: input.vehicle_registration,
            cycle_end: input.cycle_end,
            gross_earnings: gross,
            commission,
            fast_tag_charge: input.fast_tag_charge,
            rto_fine: input.rto_fine,
            private_toll_charges: input.private_toll_charges,
            other_charges: input.other_charges,
            net_payable,
            shortfall,
            status: SettlementStatus::Pending,
        })?;

        Ok(record)
    }
}

/// Compute a settlement under the default `Reject` policy.
pub fn compute_settlement(input: SettlementInput) -> Result<SettlementRecord, InvalidAmountError> {
    SettlementCalculator::default().compute(input)
}

fn non_negative(field: &'static str, value: Money) -> Result<(), InvalidAmountError> {
    if value.is_negative() {
        Err(InvalidAmountError::Negative { field, value })
    } else if value.exceeds_ledger_limit() {
        Err(InvalidAmountError::TooLarge { field, value })
    } else {
        Ok(())
    }
}
