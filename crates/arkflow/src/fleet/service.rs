use std::io::Read;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::domain::{
    Driver, DriverId, DriverRegistration, MaintenanceEntry, PaymentModel, RegistrationNumber,
    SettlementId, SettlementRecord, ValidationError, Vehicle, VehicleId, VehicleRegistration,
};
use super::import::parse_earnings_csv;
use super::matcher::{
    apply_assignment, candidate_pairs, release_assignment, Assignment, AssignmentError,
    CandidatePair, Release,
};
use super::money::Money;
use super::report::{
    compliance_alerts, driver_billing, utilization, ComplianceAlert, DriverBillingEntry,
    UtilizationEntry,
};
use super::repository::{
    AdvisoryError, AdvisoryService, DataSourceError, FleetDataSource,
};
use super::settlement::{
    Commission, InvalidAmountError, NegativePayoutPolicy, SettlementCalculator, SettlementInput,
};
use super::stats::{compute_stats, FleetStats};

/// Ledger behaviour the service needs from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerSettings {
    pub negative_payout: NegativePayoutPolicy,
    pub compliance_horizon_days: i64,
    /// Charges applied to every imported earnings row.
    pub default_fast_tag: Money,
    pub default_toll: Money,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            negative_payout: NegativePayoutPolicy::Reject,
            compliance_horizon_days: 30,
            default_fast_tag: Money::from_major(500),
            default_toll: Money::from_major(100),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentRequest {
    pub driver_id: DriverId,
    pub registration: RegistrationNumber,
    pub payment_model: PaymentModel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceRequest {
    pub service_date: NaiveDate,
    pub service_type: String,
    pub expense: Money,
    pub odometer_km: u32,
}

/// Earnings row that did not produce a settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    pub driver_name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EarningsImport {
    pub created: Vec<SettlementRecord>,
    pub skipped: Vec<SkippedRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchAdvice {
    pub candidates: Vec<CandidatePair>,
    pub suggestion: Option<String>,
}

/// Service composing the ledger core with the data source and advisory collaborators.
///
/// Every read-modify-write goes through `writer`, so two assignments racing for the same
/// vehicle are decided one after the other against fresh data.
pub struct FleetService<D, A> {
    source: Arc<D>,
    advisor: Arc<A>,
    calculator: SettlementCalculator,
    settings: LedgerSettings,
    writer: Mutex<()>,
}

impl<D, A> FleetService<D, A>
where
    D: FleetDataSource + 'static,
    A: AdvisoryService + 'static,
{
    pub fn new(source: Arc<D>, advisor: Arc<A>, settings: LedgerSettings) -> Self {
        Self {
            source,
            advisor,
            calculator: SettlementCalculator::new(settings.negative_payout),
            settings,
            writer: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    pub async fn drivers(&self) -> Result<Vec<Driver>, FleetServiceError> {
        Ok(self.source.fetch_drivers().await?)
    }

    pub async fn vehicles(&self) -> Result<Vec<Vehicle>, FleetServiceError> {
        Ok(self.source.fetch_vehicles().await?)
    }

    pub async fn settlements(&self) -> Result<Vec<SettlementRecord>, FleetServiceError> {
        Ok(self.source.fetch_settlements().await?)
    }

    /// Onboard a new driver. License numbers are unique across the roster.
    pub async fn onboard_driver(
        &self,
        form: DriverRegistration,
    ) -> Result<Driver, FleetServiceError> {
        let _writer = self.writer.lock().await;
        let driver = Driver::onboard(DriverId(uuid::Uuid::new_v4().to_string()), form)?;

        let drivers = self.source.fetch_drivers().await?;
        if drivers
            .iter()
            .any(|existing| existing.license_number == driver.license_number)
        {
            return Err(FleetServiceError::Duplicate {
                kind: "driver license",
                key: driver.license_number,
            });
        }

        self.source.save_driver(driver.clone()).await?;
        info!(driver_id = %driver.id.0, code = %driver.code, "driver onboarded");
        Ok(driver)
    }

    pub async fn activate_driver(&self, driver_id: &DriverId) -> Result<Driver, FleetServiceError> {
        let _writer = self.writer.lock().await;
        let drivers = self.source.fetch_drivers().await?;
        let driver = find_driver(&drivers, driver_id)?.activate()?;

        self.source.save_driver(driver.clone()).await?;
        info!(driver_id = %driver.id.0, "driver activated");
        Ok(driver)
    }

    /// Retire a driver without deleting their history. The vehicle must be released first.
    pub async fn deactivate_driver(
        &self,
        driver_id: &DriverId,
    ) -> Result<Driver, FleetServiceError> {
        let _writer = self.writer.lock().await;
        let drivers = self.source.fetch_drivers().await?;
        let driver = find_driver(&drivers, driver_id)?.deactivate()?;

        self.source.save_driver(driver.clone()).await?;
        info!(driver_id = %driver.id.0, "driver deactivated");
        Ok(driver)
    }

    /// Register a vehicle. Plates are unique across the fleet.
    pub async fn register_vehicle(
        &self,
        form: VehicleRegistration,
    ) -> Result<Vehicle, FleetServiceError> {
        let _writer = self.writer.lock().await;
        let vehicle = Vehicle::register(VehicleId(uuid::Uuid::new_v4().to_string()), form)?;

        let vehicles = self.source.fetch_vehicles().await?;
        if vehicles
            .iter()
            .any(|existing| existing.registration == vehicle.registration)
        {
            return Err(FleetServiceError::Duplicate {
                kind: "vehicle registration",
                key: vehicle.registration.to_string(),
            });
        }

        self.source.save_vehicle(vehicle.clone()).await?;
        info!(registration = %vehicle.registration, "vehicle registered");
        Ok(vehicle)
    }

    pub async fn log_maintenance(
        &self,
        registration: &RegistrationNumber,
        request: MaintenanceRequest,
    ) -> Result<Vehicle, FleetServiceError> {
        let _writer = self.writer.lock().await;
        let vehicles = self.source.fetch_vehicles().await?;
        let vehicle = find_vehicle(&vehicles, registration)?;

        let updated = vehicle.log_maintenance(MaintenanceEntry {
            id: uuid::Uuid::new_v4().to_string(),
            service_date: request.service_date,
            service_type: request.service_type,
            expense: request.expense,
            odometer_km: request.odometer_km,
        })?;

        self.source.save_vehicle(updated.clone()).await?;
        info!(
            registration = %updated.registration,
            expense = %request.expense,
            total = %updated.maintenance_cost,
            "maintenance logged"
        );
        Ok(updated)
    }

    /// Current eligible driver–vehicle pairs, drivers outer and vehicles inner.
    pub async fn eligible_pairs(&self) -> Result<Vec<CandidatePair>, FleetServiceError> {
        let drivers = self.source.fetch_drivers().await?;
        let vehicles = self.source.fetch_vehicles().await?;
        Ok(candidate_pairs(&drivers, &vehicles))
    }

    /// Pair a driver with an idle vehicle and persist both sides.
    pub async fn assign(&self, request: AssignmentRequest) -> Result<Assignment, FleetServiceError> {
        let _writer = self.writer.lock().await;
        let drivers = self.source.fetch_drivers().await?;
        let vehicles = self.source.fetch_vehicles().await?;
        let driver = find_driver(&drivers, &request.driver_id)?;
        let vehicle = find_vehicle(&vehicles, &request.registration)?;

        let assignment = match apply_assignment(driver, vehicle, request.payment_model) {
            Ok(assignment) => assignment,
            Err(err) => {
                warn!(
                    driver_id = %request.driver_id.0,
                    registration = %request.registration,
                    error = %err,
                    "assignment rejected"
                );
                return Err(err.into());
            }
        };

        self.source.save_vehicle(assignment.vehicle.clone()).await?;
        if let Err(err) = self.source.save_driver(assignment.driver.clone()).await {
            self.restore_vehicle(vehicle.clone()).await;
            return Err(err.into());
        }
        info!(
            driver_id = %assignment.link.driver_id.0,
            registration = %assignment.link.registration,
            payment_model = assignment.link.payment_model.label(),
            "vehicle assigned"
        );
        Ok(assignment)
    }

    /// Release whatever vehicle the driver holds.
    pub async fn release(&self, driver_id: &DriverId) -> Result<Release, FleetServiceError> {
        let _writer = self.writer.lock().await;
        let drivers = self.source.fetch_drivers().await?;
        let vehicles = self.source.fetch_vehicles().await?;
        let driver = find_driver(&drivers, driver_id)?;
        let registration = driver
            .assigned_vehicle
            .as_ref()
            .ok_or_else(|| AssignmentError::NotAssigned(driver.id.clone()))?;
        let vehicle = find_vehicle(&vehicles, registration)?;

        let release = release_assignment(driver, vehicle)?;
        self.source.save_driver(release.driver.clone()).await?;
        if let Err(err) = self.source.save_vehicle(release.vehicle.clone()).await {
            self.restore_driver(driver.clone()).await;
            return Err(err.into());
        }
        info!(driver_id = %driver_id.0, registration = %release.vehicle.registration, "vehicle released");
        Ok(release)
    }

    /// Compute and persist one settlement for a known driver and vehicle.
    ///
    /// A driver who currently holds a vehicle can only be settled against that plate; a
    /// driver without one may still be settled for a cycle already driven. Each driver gets
    /// at most one settlement per cycle.
    pub async fn record_settlement(
        &self,
        input: SettlementInput,
    ) -> Result<SettlementRecord, FleetServiceError> {
        let _writer = self.writer.lock().await;
        let drivers = self.source.fetch_drivers().await?;
        let vehicles = self.source.fetch_vehicles().await?;
        let driver = find_driver(&drivers, &input.driver_id)?;
        find_vehicle(&vehicles, &input.vehicle_registration)?;
        if let Some(held) = &driver.assigned_vehicle {
            if held != &input.vehicle_registration {
                return Err(AssignmentError::Mismatch {
                    held: held.clone(),
                    requested: input.vehicle_registration.clone(),
                }
                .into());
            }
        }

        let settlements = self.source.fetch_settlements().await?;
        if already_settled(&settlements, &input.driver_id, input.cycle_end) {
            return Err(FleetServiceError::Duplicate {
                kind: "settlement",
                key: format!("{} for cycle ending {}", input.driver_id.0, input.cycle_end),
            });
        }

        let record = self.calculator.compute(input)?;
        self.source.save_settlement(record.clone()).await?;
        info!(
            settlement_id = %record.id.0,
            driver_id = %record.driver_id.0,
            net_payable = %record.net_payable,
            "settlement recorded"
        );
        if !record.shortfall.is_zero() {
            warn!(settlement_id = %record.id.0, shortfall = %record.shortfall, "payout clamped to zero");
        }
        Ok(record)
    }

    pub async fn settle(
        &self,
        settlement_id: &SettlementId,
    ) -> Result<SettlementRecord, FleetServiceError> {
        let _writer = self.writer.lock().await;
        let settlements = self.source.fetch_settlements().await?;
        let record = settlements
            .iter()
            .find(|record| &record.id == settlement_id)
            .ok_or_else(|| FleetServiceError::NotFound {
                kind: "settlement",
                key: settlement_id.0.clone(),
            })?
            .settle()?;

        self.source.save_settlement(record.clone()).await?;
        info!(settlement_id = %record.id.0, net_payable = %record.net_payable, "settlement paid out");
        Ok(record)
    }

    /// Turn a platform earnings CSV into pending settlements for `cycle_end`.
    ///
    /// Rows are matched to drivers by name, ignoring case. Rows for unknown or unassigned
    /// drivers, drivers already settled for the cycle, and rows the calculator refuses are
    /// reported back instead of failing the whole upload.
    pub async fn import_earnings<R: Read>(
        &self,
        reader: R,
        cycle_end: NaiveDate,
    ) -> Result<EarningsImport, FleetServiceError> {
        let rows = parse_earnings_csv(reader)?;
        let _writer = self.writer.lock().await;
        let drivers = self.source.fetch_drivers().await?;
        let mut settlements = self.source.fetch_settlements().await?;
        let mut outcome = EarningsImport::default();

        for row in rows {
            let driver = drivers
                .iter()
                .find(|driver| driver.name.eq_ignore_ascii_case(row.driver_name.trim()));
            let Some(driver) = driver else {
                outcome.skipped.push(SkippedRow {
                    driver_name: row.driver_name,
                    reason: "no driver with this name".to_string(),
                });
                continue;
            };
            let Some(registration) = driver.assigned_vehicle.clone() else {
                outcome.skipped.push(SkippedRow {
                    driver_name: row.driver_name,
                    reason: "driver has no assigned vehicle".to_string(),
                });
                continue;
            };
            if already_settled(&settlements, &driver.id, cycle_end) {
                outcome.skipped.push(SkippedRow {
                    driver_name: row.driver_name,
                    reason: "settlement already recorded for this cycle".to_string(),
                });
                continue;
            }

            let input = SettlementInput {
                driver_id: driver.id.clone(),
                vehicle_registration: registration,
                cycle_end,
                gross_earnings: row.earnings,
                commission: Commission::Flat(row.commission),
                fast_tag_charge: self.settings.default_fast_tag,
                rto_fine: Money::ZERO,
                private_toll_charges: self.settings.default_toll,
                other_charges: Money::ZERO,
            };
            match self.calculator.compute(input) {
                Ok(record) => {
                    self.source.save_settlement(record.clone()).await?;
                    settlements.push(record.clone());
                    outcome.created.push(record);
                }
                Err(err) => outcome.skipped.push(SkippedRow {
                    driver_name: row.driver_name,
                    reason: err.to_string(),
                }),
            }
        }

        info!(
            created = outcome.created.len(),
            skipped = outcome.skipped.len(),
            %cycle_end,
            "earnings imported"
        );
        Ok(outcome)
    }

    pub async fn dashboard(&self) -> Result<FleetStats, FleetServiceError> {
        let drivers = self.source.fetch_drivers().await?;
        let vehicles = self.source.fetch_vehicles().await?;
        let settlements = self.source.fetch_settlements().await?;
        Ok(compute_stats(&drivers, &vehicles, &settlements))
    }

    pub async fn billing_report(&self) -> Result<Vec<DriverBillingEntry>, FleetServiceError> {
        let drivers = self.source.fetch_drivers().await?;
        let settlements = self.source.fetch_settlements().await?;
        Ok(driver_billing(&drivers, &settlements))
    }

    pub async fn utilization_report(&self) -> Result<Vec<UtilizationEntry>, FleetServiceError> {
        let vehicles = self.source.fetch_vehicles().await?;
        Ok(utilization(&vehicles))
    }

    /// Insurance and PUC renewals due within the configured horizon of `today`.
    pub async fn compliance(
        &self,
        today: NaiveDate,
    ) -> Result<Vec<ComplianceAlert>, FleetServiceError> {
        let vehicles = self.source.fetch_vehicles().await?;
        Ok(compliance_alerts(
            &vehicles,
            today,
            self.settings.compliance_horizon_days,
        ))
    }

    async fn restore_vehicle(&self, vehicle: Vehicle) {
        let registration = vehicle.registration.clone();
        if let Err(err) = self.source.save_vehicle(vehicle).await {
            warn!(%registration, error = %err, "vehicle rollback failed");
        }
    }

    async fn restore_driver(&self, driver: Driver) {
        let driver_id = driver.id.clone();
        if let Err(err) = self.source.save_driver(driver).await {
            warn!(driver_id = %driver_id.0, error = %err, "driver rollback failed");
        }
    }

    /// Ask the advisor to pick among the current eligible pairs.
    ///
    /// The advisor is not consulted when nothing is eligible.
    pub async fn suggest_match(&self) -> Result<MatchAdvice, FleetServiceError> {
        let candidates = self.eligible_pairs().await?;
        if candidates.is_empty() {
            return Ok(MatchAdvice {
                candidates,
                suggestion: None,
            });
        }

        let suggestion = self.advisor.suggest(&candidates).await?;
        Ok(MatchAdvice {
            candidates,
            suggestion: Some(suggestion),
        })
    }
}

fn find_driver<'a>(drivers: &'a [Driver], id: &DriverId) -> Result<&'a Driver, FleetServiceError> {
    drivers
        .iter()
        .find(|driver| &driver.id == id)
        .ok_or_else(|| FleetServiceError::NotFound {
            kind: "driver",
            key: id.0.clone(),
        })
}

fn already_settled(
    settlements: &[SettlementRecord],
    driver_id: &DriverId,
    cycle_end: NaiveDate,
) -> bool {
    settlements
        .iter()
        .any(|record| &record.driver_id == driver_id && record.cycle_end == cycle_end)
}

fn find_vehicle<'a>(
    vehicles: &'a [Vehicle],
    registration: &RegistrationNumber,
) -> Result<&'a Vehicle, FleetServiceError> {
    vehicles
        .iter()
        .find(|vehicle| &vehicle.registration == registration)
        .ok_or_else(|| FleetServiceError::NotFound {
            kind: "vehicle",
            key: registration.to_string(),
        })
}

/// Error raised by the fleet service.
#[derive(Debug, thiserror::Error)]
pub enum FleetServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Amount(#[from] InvalidAmountError),
    #[error(transparent)]
    Assignment(#[from] AssignmentError),
    #[error(transparent)]
    DataSource(#[from] DataSourceError),
    #[error(transparent)]
    Advisory(#[from] AdvisoryError),
    #[error("earnings file could not be read: {0}")]
    Import(#[from] csv::Error),
    #[error("{kind} '{key}' not found")]
    NotFound { kind: &'static str, key: String },
    #[error("{kind} '{key}' already exists")]
    Duplicate { kind: &'static str, key: String },
}
