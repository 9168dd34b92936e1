//! Adapter for settlement payloads written by earlier dashboard releases.
//!
//! Three shapes are in circulation:
//! - `olaUberEarnings`, `fastTagCharges`, `rtoFines`, `tollTax`, `commissionDeducted`
//!   (no vehicle plate);
//! - `olaUberEarnings`, `vehRegNumber`, `fastTagCharge`, `rtoFine`, `privateTollCharges`,
//!   `anyOtherCharges`;
//! - the canonical snake_case [`SettlementRecord`] layout.
//!
//! Everything is funnelled into the canonical record here so the calculator and reducers
//! never see the older field names.

use chrono::NaiveDate;
use serde::Deserialize;

use super::domain::{
    DriverId, RegistrationNumber, SettlementDraft, SettlementId, SettlementRecord,
    SettlementStatus, ValidationError,
};
use super::money::Money;

#[derive(Debug, thiserror::Error)]
pub enum LegacyImportError {
    #[error("invalid settlement payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("settlement {id}: no vehicle registration recorded for driver {driver_id}")]
    MissingVehicle { id: String, driver_id: String },
    #[error("settlement {id}: unknown status '{status}'")]
    UnknownStatus { id: String, status: String },
    #[error("settlement {id}: {source}")]
    Invalid {
        id: String,
        #[source]
        source: ValidationError,
    },
}

/// Superset of every settlement shape the dashboard has persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct LegacySettlement {
    pub id: String,
    #[serde(alias = "driverId")]
    pub driver_id: String,
    #[serde(default, alias = "vehRegNumber")]
    pub vehicle_registration: Option<String>,
    #[serde(alias = "weekEnding")]
    pub cycle_end: NaiveDate,
    #[serde(alias = "olaUberEarnings")]
    pub gross_earnings: Money,
    #[serde(default, alias = "commissionDeducted")]
    pub commission: Money,
    #[serde(default, alias = "fastTagCharges", alias = "fastTagCharge")]
    pub fast_tag_charge: Money,
    #[serde(default, alias = "rtoFines", alias = "rtoFine")]
    pub rto_fine: Money,
    #[serde(default, alias = "tollTax", alias = "privateTollCharges")]
    pub private_toll_charges: Money,
    #[serde(default, alias = "anyOtherCharges")]
    pub other_charges: Money,
    #[serde(default, alias = "netPayable")]
    pub net_payable: Option<Money>,
    #[serde(default)]
    pub shortfall: Money,
    #[serde(default)]
    pub status: Option<String>,
}

impl LegacySettlement {
    /// Convert to the canonical record.
    ///
    /// `resolve_vehicle` supplies a plate for payloads that predate the vehicle field,
    /// typically the driver's current assignment. A stored net payable must agree with the
    /// components; when absent it is recomputed, clamping a negative result into `shortfall`.
    pub fn into_record<F>(self, resolve_vehicle: F) -> Result<SettlementRecord, LegacyImportError>
    where
        F: FnOnce(&DriverId) -> Option<RegistrationNumber>,
    {
        let id = self.id;
        let driver_id = DriverId(self.driver_id);

        let stored_plate = self
            .vehicle_registration
            .as_deref()
            .and_then(|raw| RegistrationNumber::parse(raw).ok());
        let vehicle_registration = match stored_plate.or_else(|| resolve_vehicle(&driver_id)) {
            Some(plate) => plate,
            None => {
                return Err(LegacyImportError::MissingVehicle {
                    id,
                    driver_id: driver_id.0,
                })
            }
        };

        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => SettlementStatus::Pending,
            Some(raw) if raw.eq_ignore_ascii_case("pending") => SettlementStatus::Pending,
            Some(raw) if raw.eq_ignore_ascii_case("settled") => SettlementStatus::Settled,
            Some(raw) => {
                return Err(LegacyImportError::UnknownStatus {
                    id,
                    status: raw.to_string(),
                })
            }
        };

        let deductions = self.commission
            + self.fast_tag_charge
            + self.rto_fine
            + self.private_toll_charges
            + self.other_charges;
        let computed = self.gross_earnings - deductions;
        let (net_payable, shortfall) = match self.net_payable {
            Some(stored) => (stored, self.shortfall),
            None if computed.is_negative() => (Money::ZERO, computed.abs()),
            None => (computed, Money::ZERO),
        };

        SettlementRecord::new(SettlementDraft {
            id: SettlementId(id.clone()),
            driver_id,
            vehicle_registration,
            cycle_end: self.cycle_end,
            gross_earnings: self.gross_earnings,
            commission: self.commission,
            fast_tag_charge: self.fast_tag_charge,
            rto_fine: self.rto_fine,
            private_toll_charges: self.private_toll_charges,
            other_charges: self.other_charges,
            net_payable,
            shortfall,
            status,
        })
        .map_err(|source| LegacyImportError::Invalid { id, source })
    }
}

/// Parse a JSON array of settlements in any historical shape.
pub fn parse_legacy_settlements(json: &str) -> Result<Vec<LegacySettlement>, LegacyImportError> {
    Ok(serde_json::from_str(json)?)
}
