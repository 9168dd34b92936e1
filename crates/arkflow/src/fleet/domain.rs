use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::money::Money;

/// Identifier wrapper for onboarded drivers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DriverId(pub String);

/// Identifier wrapper for registered vehicles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VehicleId(pub String);

/// Identifier wrapper for settlement ledger entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SettlementId(pub String);

/// Human-meaningful registration plate, e.g. `MH-12-AB-1234`.
///
/// Plates are compared after trimming and upper-casing so `mh-12-ab-1234 ` and
/// `MH-12-AB-1234` refer to the same vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RegistrationNumber(String);

impl RegistrationNumber {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let normalized = raw.trim().to_ascii_uppercase();
        if normalized.is_empty() {
            return Err(ValidationError::MissingField("registration number"));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RegistrationNumber {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RegistrationNumber> for String {
    fn from(value: RegistrationNumber) -> Self {
        value.0
    }
}

impl fmt::Display for RegistrationNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How the driver pays for the car: a flat daily rent or a cut of platform earnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentModel {
    Daily,
    Commission,
}

impl PaymentModel {
    pub const fn label(self) -> &'static str {
        match self {
            PaymentModel::Daily => "daily",
            PaymentModel::Commission => "commission",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriverStatus {
    Onboarding,
    Active,
    Inactive,
}

impl DriverStatus {
    pub const fn label(self) -> &'static str {
        match self {
            DriverStatus::Onboarding => "onboarding",
            DriverStatus::Active => "active",
            DriverStatus::Inactive => "inactive",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleStatus {
    Active,
    Idle,
    Maintenance,
}

impl VehicleStatus {
    pub const fn label(self) -> &'static str {
        match self {
            VehicleStatus::Active => "active",
            VehicleStatus::Idle => "idle",
            VehicleStatus::Maintenance => "maintenance",
        }
    }

    pub const fn ordered() -> [VehicleStatus; 3] {
        [
            VehicleStatus::Active,
            VehicleStatus::Idle,
            VehicleStatus::Maintenance,
        ]
    }
}

/// Two-state settlement lifecycle; `Settled` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementStatus {
    Pending,
    Settled,
}

impl SettlementStatus {
    pub const fn label(self) -> &'static str {
        match self {
            SettlementStatus::Pending => "pending",
            SettlementStatus::Settled => "settled",
        }
    }
}

/// Validation errors raised while constructing domain records.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("{field} must not be negative (found {value})")]
    NegativeAmount { field: &'static str, value: Money },
    #[error("{field} of {value} is above the ledger limit")]
    AmountTooLarge { field: &'static str, value: Money },
    #[error("shortfall {shortfall} recorded alongside a payout of {net_payable}")]
    ShortfallWithPayout { net_payable: Money, shortfall: Money },
    #[error("net payable {found} does not match components (expected {expected})")]
    NetPayableMismatch { expected: Money, found: Money },
    #[error("insurance ends on {end} before it starts on {start}")]
    InsuranceWindow { start: NaiveDate, end: NaiveDate },
    #[error("odometer reading {found} km is below the last recorded {current} km")]
    OdometerRollback { current: u32, found: u32 },
    #[error("driver status cannot change from {from} to {to}")]
    StatusTransition {
        from: &'static str,
        to: &'static str,
    },
    #[error("settlement already settled")]
    AlreadySettled,
}

/// Onboarding form for a new driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverRegistration {
    #[serde(default)]
    pub code: Option<String>,
    pub name: String,
    pub phone: String,
    pub license_number: String,
    #[serde(default)]
    pub aadhaar_number: Option<String>,
    #[serde(default)]
    pub pan_number: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    pub onboarded_on: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Driver {
    pub id: DriverId,
    pub code: String,
    pub name: String,
    pub phone: String,
    pub license_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aadhaar_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pan_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub status: DriverStatus,
    /// Back-reference by plate; the vehicle record is never owned by the driver.
    #[serde(default)]
    pub assigned_vehicle: Option<RegistrationNumber>,
    #[serde(default)]
    pub payment_model: Option<PaymentModel>,
    pub onboarded_on: NaiveDate,
}

impl Driver {
    /// Create a driver in `Onboarding` status from an onboarding form.
    pub fn onboard(id: DriverId, form: DriverRegistration) -> Result<Self, ValidationError> {
        let name = required(&form.name, "name")?;
        let phone = required(&form.phone, "phone")?;
        let license_number = required(&form.license_number, "license number")?.to_ascii_uppercase();
        let code = form
            .code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| id.0.clone());

        Ok(Self {
            id,
            code,
            name,
            phone,
            license_number,
            aadhaar_number: optional(form.aadhaar_number),
            pan_number: optional(form.pan_number).map(|pan| pan.to_ascii_uppercase()),
            city: optional(form.city),
            state: optional(form.state),
            status: DriverStatus::Onboarding,
            assigned_vehicle: None,
            payment_model: None,
            onboarded_on: form.onboarded_on,
        })
    }

    pub fn is_assigned(&self) -> bool {
        self.assigned_vehicle.is_some()
    }

    /// Promote an onboarding driver once documents are verified.
    pub fn activate(&self) -> Result<Driver, ValidationError> {
        match self.status {
            DriverStatus::Onboarding | DriverStatus::Inactive => Ok(Driver {
                status: DriverStatus::Active,
                ..self.clone()
            }),
            DriverStatus::Active => Err(ValidationError::StatusTransition {
                from: self.status.label(),
                to: DriverStatus::Active.label(),
            }),
        }
    }

    /// Soft-retire a driver. Assigned drivers must be released first.
    pub fn deactivate(&self) -> Result<Driver, ValidationError> {
        if self.is_assigned() || self.status == DriverStatus::Inactive {
            return Err(ValidationError::StatusTransition {
                from: self.status.label(),
                to: DriverStatus::Inactive.label(),
            });
        }
        Ok(Driver {
            status: DriverStatus::Inactive,
            ..self.clone()
        })
    }
}

/// One service visit logged against a vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceEntry {
    pub id: String,
    pub service_date: NaiveDate,
    pub service_type: String,
    pub expense: Money,
    pub odometer_km: u32,
}

/// Registration form for a new vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleRegistration {
    pub registration: String,
    #[serde(default)]
    pub make: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub chassis_number: Option<String>,
    #[serde(default)]
    pub insurance_start: Option<NaiveDate>,
    #[serde(default)]
    pub insurance_end: Option<NaiveDate>,
    #[serde(default)]
    pub puc_expiry: Option<NaiveDate>,
    #[serde(default)]
    pub odometer_km: u32,
    pub registered_on: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub registration: RegistrationNumber,
    pub make: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chassis_number: Option<String>,
    #[serde(default)]
    pub insurance_start: Option<NaiveDate>,
    #[serde(default)]
    pub insurance_end: Option<NaiveDate>,
    #[serde(default)]
    pub puc_expiry: Option<NaiveDate>,
    pub status: VehicleStatus,
    pub odometer_km: u32,
    pub odometer_read_on: NaiveDate,
    #[serde(default)]
    pub maintenance_cost: Money,
    #[serde(default)]
    pub maintenance_history: Vec<MaintenanceEntry>,
}

impl Vehicle {
    /// Register a vehicle; new vehicles start `Idle` and available for assignment.
    pub fn register(id: VehicleId, form: VehicleRegistration) -> Result<Self, ValidationError> {
        let registration = RegistrationNumber::parse(&form.registration)?;

        if let (Some(start), Some(end)) = (form.insurance_start, form.insurance_end) {
            if end < start {
                return Err(ValidationError::InsuranceWindow { start, end });
            }
        }

        Ok(Self {
            id,
            registration,
            make: form.make.trim().to_string(),
            model: form.model.trim().to_string(),
            chassis_number: optional(form.chassis_number).map(|c| c.to_ascii_uppercase()),
            insurance_start: form.insurance_start,
            insurance_end: form.insurance_end,
            puc_expiry: form.puc_expiry,
            status: VehicleStatus::Idle,
            odometer_km: form.odometer_km,
            odometer_read_on: form.registered_on,
            maintenance_cost: Money::ZERO,
            maintenance_history: Vec::new(),
        })
    }

    /// Record a service visit: newest entry first, cost accumulated, odometer advanced.
    pub fn log_maintenance(&self, entry: MaintenanceEntry) -> Result<Vehicle, ValidationError> {
        if entry.expense.is_negative() {
            return Err(ValidationError::NegativeAmount {
                field: "service expense",
                value: entry.expense,
            });
        }
        if entry.expense.exceeds_ledger_limit() {
            return Err(ValidationError::AmountTooLarge {
                field: "service expense",
                value: entry.expense,
            });
        }
        if entry.odometer_km < self.odometer_km {
            return Err(ValidationError::OdometerRollback {
                current: self.odometer_km,
                found: entry.odometer_km,
            });
        }

        let mut updated = self.clone();
        updated.maintenance_cost += entry.expense;
        updated.odometer_km = entry.odometer_km;
        updated.odometer_read_on = entry.service_date;
        updated.maintenance_history.insert(0, entry);
        Ok(updated)
    }
}

/// Fields a caller supplies to materialise a ledger entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementDraft {
    pub id: SettlementId,
    pub driver_id: DriverId,
    pub vehicle_registration: RegistrationNumber,
    pub cycle_end: NaiveDate,
    pub gross_earnings: Money,
    pub commission: Money,
    pub fast_tag_charge: Money,
    pub rto_fine: Money,
    pub private_toll_charges: Money,
    pub other_charges: Money,
    pub net_payable: Money,
    pub shortfall: Money,
    pub status: SettlementStatus,
}

/// One driver's billing result for one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRecord {
    pub id: SettlementId,
    pub driver_id: DriverId,
    pub vehicle_registration: RegistrationNumber,
    pub cycle_end: NaiveDate,
    pub gross_earnings: Money,
    pub commission: Money,
    pub fast_tag_charge: Money,
    pub rto_fine: Money,
    pub private_toll_charges: Money,
    pub other_charges: Money,
    pub net_payable: Money,
    /// Deficit absorbed when a negative payout was clamped to zero.
    #[serde(default, skip_serializing_if = "Money::is_zero")]
    pub shortfall: Money,
    pub status: SettlementStatus,
}

impl SettlementRecord {
    /// Validate a draft and build the record.
    ///
    /// Rejects negative components and any draft where
    /// `net_payable - shortfall != gross_earnings - total_deductions`.
    pub fn new(draft: SettlementDraft) -> Result<Self, ValidationError> {
        let components = [
            ("gross earnings", draft.gross_earnings),
            ("commission", draft.commission),
            ("fast tag charge", draft.fast_tag_charge),
            ("rto fine", draft.rto_fine),
            ("private toll charges", draft.private_toll_charges),
            ("other charges", draft.other_charges),
            ("net payable", draft.net_payable),
            ("shortfall", draft.shortfall),
        ];
        for (field, value) in components {
            if value.is_negative() {
                return Err(ValidationError::NegativeAmount { field, value });
            }
            if value.exceeds_ledger_limit() {
                return Err(ValidationError::AmountTooLarge { field, value });
            }
        }
        // A shortfall only exists when the payout was clamped to zero.
        if !draft.shortfall.is_zero() && !draft.net_payable.is_zero() {
            return Err(ValidationError::ShortfallWithPayout {
                net_payable: draft.net_payable,
                shortfall: draft.shortfall,
            });
        }

        let record = Self {
            id: draft.id,
            driver_id: draft.driver_id,
            vehicle_registration: draft.vehicle_registration,
            cycle_end: draft.cycle_end,
            gross_earnings: draft.gross_earnings,
            commission: draft.commission,
            fast_tag_charge: draft.fast_tag_charge,
            rto_fine: draft.rto_fine,
            private_toll_charges: draft.private_toll_charges,
            other_charges: draft.other_charges,
            net_payable: draft.net_payable,
            shortfall: draft.shortfall,
            status: draft.status,
        };

        let expected = record.gross_earnings - record.total_deductions() + record.shortfall;
        if expected != record.net_payable {
            return Err(ValidationError::NetPayableMismatch {
                expected,
                found: record.net_payable,
            });
        }

        Ok(record)
    }

    /// Sum of the five deduction components.
    pub fn total_deductions(&self) -> Money {
        self.commission
            + self.fast_tag_charge
            + self.rto_fine
            + self.private_toll_charges
            + self.other_charges
    }

    /// Confirm payout. `Settled` is terminal.
    pub fn settle(&self) -> Result<SettlementRecord, ValidationError> {
        match self.status {
            SettlementStatus::Pending => Ok(SettlementRecord {
                status: SettlementStatus::Settled,
                ..self.clone()
            }),
            SettlementStatus::Settled => Err(ValidationError::AlreadySettled),
        }
    }
}

fn required(value: &str, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(trimmed.to_string())
    }
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}
