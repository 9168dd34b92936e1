//! Fleet back office: settlement calculator, driver–vehicle matcher and dashboard reducers.
//!
//! `money`, `domain`, `settlement`, `matcher`, `stats` and `report` are pure and
//! synchronous; they never log and never touch storage. `service` and `router` layer the
//! async collaborators and HTTP surface on top.

pub mod domain;
pub mod import;
pub mod legacy;
pub mod matcher;
pub mod money;
pub mod report;
pub mod repository;
pub mod router;
pub mod service;
pub mod settlement;
pub mod stats;
pub mod store;

#[cfg(test)]
mod tests;

pub use domain::{
    Driver, DriverId, DriverRegistration, DriverStatus, MaintenanceEntry, PaymentModel,
    RegistrationNumber, SettlementDraft, SettlementId, SettlementRecord, SettlementStatus,
    ValidationError, Vehicle, VehicleId, VehicleRegistration, VehicleStatus,
};
pub use import::{parse_earnings_csv, EarningsRow};
pub use legacy::{parse_legacy_settlements, LegacyImportError, LegacySettlement};
pub use matcher::{
    apply_assignment, candidate_pairs, eligible_drivers, eligible_pairs, idle_vehicles,
    release_assignment, Assignment, AssignmentError, AssignmentLink, CandidatePair,
    EligiblePairs, Release,
};
pub use money::Money;
pub use report::{
    compliance_alerts, driver_billing, utilization, ComplianceAlert, ComplianceDocument,
    ComplianceSeverity, DriverBillingEntry, UtilizationEntry,
};
pub use repository::{AdvisoryError, AdvisoryService, DataSourceError, FleetDataSource};
pub use router::fleet_router;
pub use service::{
    AssignmentRequest, EarningsImport, FleetService, FleetServiceError, LedgerSettings,
    MaintenanceRequest, MatchAdvice, SkippedRow,
};
pub use settlement::{
    compute_settlement, Commission, InvalidAmountError, NegativePayoutPolicy,
    SettlementCalculator, SettlementInput,
};
pub use stats::{compute_stats, FleetStats};
pub use store::{FallbackDataSource, JsonFileStore};
