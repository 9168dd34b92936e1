use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::fleet::domain::{
    Driver, DriverId, DriverStatus, RegistrationNumber, SettlementRecord, Vehicle, VehicleId,
    VehicleStatus,
};
use crate::fleet::matcher::CandidatePair;
use crate::fleet::money::Money;
use crate::fleet::repository::{AdvisoryError, AdvisoryService, DataSourceError, FleetDataSource};
use crate::fleet::service::{FleetService, LedgerSettings};
use crate::fleet::settlement::{Commission, SettlementInput};

pub(crate) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(crate) fn plate(raw: &str) -> RegistrationNumber {
    RegistrationNumber::parse(raw).expect("valid plate")
}

pub(crate) fn active_driver(id: &str, name: &str) -> Driver {
    Driver {
        id: DriverId(id.to_string()),
        code: format!("DRV-{id}"),
        name: name.to_string(),
        phone: "9876543210".to_string(),
        license_number: format!("MH12 2020{id:0>7}"),
        aadhaar_number: None,
        pan_number: None,
        city: Some("Pune".to_string()),
        state: Some("Maharashtra".to_string()),
        status: DriverStatus::Active,
        assigned_vehicle: None,
        payment_model: None,
        onboarded_on: date(2023, 10, 1),
    }
}

pub(crate) fn onboarding_driver(id: &str, name: &str) -> Driver {
    Driver {
        status: DriverStatus::Onboarding,
        ..active_driver(id, name)
    }
}

pub(crate) fn idle_vehicle(id: &str, registration: &str) -> Vehicle {
    Vehicle {
        id: VehicleId(id.to_string()),
        registration: plate(registration),
        make: "Maruti Suzuki".to_string(),
        model: "Dzire".to_string(),
        chassis_number: None,
        insurance_start: Some(date(2023, 6, 1)),
        insurance_end: Some(date(2024, 5, 31)),
        puc_expiry: Some(date(2024, 3, 15)),
        status: VehicleStatus::Idle,
        odometer_km: 42_000,
        odometer_read_on: date(2023, 10, 1),
        maintenance_cost: Money::ZERO,
        maintenance_history: Vec::new(),
    }
}

pub(crate) fn vehicle_with_status(id: &str, registration: &str, status: VehicleStatus) -> Vehicle {
    Vehicle {
        status,
        ..idle_vehicle(id, registration)
    }
}

/// The weekly cycle from the dashboard's first settlement screen.
pub(crate) fn weekly_input() -> SettlementInput {
    SettlementInput {
        driver_id: DriverId("d1".to_string()),
        vehicle_registration: plate("MH-12-AB-1234"),
        cycle_end: date(2023, 11, 20),
        gross_earnings: Money::from_major(15_400),
        commission: Commission::Flat(Money::from_major(3_080)),
        fast_tag_charge: Money::from_major(450),
        rto_fine: Money::ZERO,
        private_toll_charges: Money::from_major(200),
        other_charges: Money::ZERO,
    }
}

#[derive(Default, Clone)]
pub(crate) struct MemorySource {
    drivers: Arc<Mutex<HashMap<DriverId, Driver>>>,
    vehicles: Arc<Mutex<HashMap<VehicleId, Vehicle>>>,
    settlements: Arc<Mutex<Vec<SettlementRecord>>>,
}

impl MemorySource {
    pub(crate) fn seeded(drivers: Vec<Driver>, vehicles: Vec<Vehicle>) -> Self {
        let source = Self::default();
        {
            let mut guard = source.drivers.lock().expect("driver mutex poisoned");
            for driver in drivers {
                guard.insert(driver.id.clone(), driver);
            }
        }
        {
            let mut guard = source.vehicles.lock().expect("vehicle mutex poisoned");
            for vehicle in vehicles {
                guard.insert(vehicle.id.clone(), vehicle);
            }
        }
        source
    }

    pub(crate) fn driver(&self, id: &str) -> Option<Driver> {
        self.drivers
            .lock()
            .expect("driver mutex poisoned")
            .get(&DriverId(id.to_string()))
            .cloned()
    }

    pub(crate) fn vehicle(&self, id: &str) -> Option<Vehicle> {
        self.vehicles
            .lock()
            .expect("vehicle mutex poisoned")
            .get(&VehicleId(id.to_string()))
            .cloned()
    }
}

#[async_trait]
impl FleetDataSource for MemorySource {
    async fn fetch_drivers(&self) -> Result<Vec<Driver>, DataSourceError> {
        let mut drivers: Vec<Driver> = self
            .drivers
            .lock()
            .expect("driver mutex poisoned")
            .values()
            .cloned()
            .collect();
        drivers.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(drivers)
    }

    async fn fetch_vehicles(&self) -> Result<Vec<Vehicle>, DataSourceError> {
        let mut vehicles: Vec<Vehicle> = self
            .vehicles
            .lock()
            .expect("vehicle mutex poisoned")
            .values()
            .cloned()
            .collect();
        vehicles.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(vehicles)
    }

    async fn fetch_settlements(&self) -> Result<Vec<SettlementRecord>, DataSourceError> {
        Ok(self
            .settlements
            .lock()
            .expect("settlement mutex poisoned")
            .clone())
    }

    async fn save_driver(&self, driver: Driver) -> Result<(), DataSourceError> {
        self.drivers
            .lock()
            .expect("driver mutex poisoned")
            .insert(driver.id.clone(), driver);
        Ok(())
    }

    async fn save_vehicle(&self, vehicle: Vehicle) -> Result<(), DataSourceError> {
        self.vehicles
            .lock()
            .expect("vehicle mutex poisoned")
            .insert(vehicle.id.clone(), vehicle);
        Ok(())
    }

    async fn save_settlement(&self, settlement: SettlementRecord) -> Result<(), DataSourceError> {
        let mut guard = self.settlements.lock().expect("settlement mutex poisoned");
        match guard.iter().position(|existing| existing.id == settlement.id) {
            Some(index) => guard[index] = settlement,
            None => guard.push(settlement),
        }
        Ok(())
    }
}

pub(crate) struct UnavailableSource;

#[async_trait]
impl FleetDataSource for UnavailableSource {
    async fn fetch_drivers(&self) -> Result<Vec<Driver>, DataSourceError> {
        Err(DataSourceError::Unavailable("sheet offline".to_string()))
    }

    async fn fetch_vehicles(&self) -> Result<Vec<Vehicle>, DataSourceError> {
        Err(DataSourceError::Unavailable("sheet offline".to_string()))
    }

    async fn fetch_settlements(&self) -> Result<Vec<SettlementRecord>, DataSourceError> {
        Err(DataSourceError::Unavailable("sheet offline".to_string()))
    }

    async fn save_driver(&self, _driver: Driver) -> Result<(), DataSourceError> {
        Err(DataSourceError::Unavailable("sheet offline".to_string()))
    }

    async fn save_vehicle(&self, _vehicle: Vehicle) -> Result<(), DataSourceError> {
        Err(DataSourceError::Unavailable("sheet offline".to_string()))
    }

    async fn save_settlement(&self, _settlement: SettlementRecord) -> Result<(), DataSourceError> {
        Err(DataSourceError::Unavailable("sheet offline".to_string()))
    }
}

/// Primary that serves reads from a memory snapshot but cannot take writes.
pub(crate) struct ReadOnlySource(pub(crate) MemorySource);

#[async_trait]
impl FleetDataSource for ReadOnlySource {
    async fn fetch_drivers(&self) -> Result<Vec<Driver>, DataSourceError> {
        self.0.fetch_drivers().await
    }

    async fn fetch_vehicles(&self) -> Result<Vec<Vehicle>, DataSourceError> {
        self.0.fetch_vehicles().await
    }

    async fn fetch_settlements(&self) -> Result<Vec<SettlementRecord>, DataSourceError> {
        self.0.fetch_settlements().await
    }

    async fn save_driver(&self, _driver: Driver) -> Result<(), DataSourceError> {
        Err(DataSourceError::Unavailable("sheet is read-only".to_string()))
    }

    async fn save_vehicle(&self, _vehicle: Vehicle) -> Result<(), DataSourceError> {
        Err(DataSourceError::Unavailable("sheet is read-only".to_string()))
    }

    async fn save_settlement(&self, _settlement: SettlementRecord) -> Result<(), DataSourceError> {
        Err(DataSourceError::Unavailable("sheet is read-only".to_string()))
    }
}

/// Memory source whose driver or vehicle writes can be made to fail.
#[derive(Default, Clone)]
pub(crate) struct BrokenWrites {
    pub(crate) inner: MemorySource,
    pub(crate) drivers: bool,
    pub(crate) vehicles: bool,
}

#[async_trait]
impl FleetDataSource for BrokenWrites {
    async fn fetch_drivers(&self) -> Result<Vec<Driver>, DataSourceError> {
        self.inner.fetch_drivers().await
    }

    async fn fetch_vehicles(&self) -> Result<Vec<Vehicle>, DataSourceError> {
        self.inner.fetch_vehicles().await
    }

    async fn fetch_settlements(&self) -> Result<Vec<SettlementRecord>, DataSourceError> {
        self.inner.fetch_settlements().await
    }

    async fn save_driver(&self, driver: Driver) -> Result<(), DataSourceError> {
        if self.drivers {
            return Err(DataSourceError::Codec("driver row rejected".to_string()));
        }
        self.inner.save_driver(driver).await
    }

    async fn save_vehicle(&self, vehicle: Vehicle) -> Result<(), DataSourceError> {
        if self.vehicles {
            return Err(DataSourceError::Codec("vehicle row rejected".to_string()));
        }
        self.inner.save_vehicle(vehicle).await
    }

    async fn save_settlement(&self, settlement: SettlementRecord) -> Result<(), DataSourceError> {
        self.inner.save_settlement(settlement).await
    }
}

/// Advisor that records how often it was consulted and echoes the first candidate.
#[derive(Default, Clone)]
pub(crate) struct EchoAdvisor {
    calls: Arc<Mutex<usize>>,
}

impl EchoAdvisor {
    pub(crate) fn calls(&self) -> usize {
        *self.calls.lock().expect("advisor mutex poisoned")
    }
}

#[async_trait]
impl AdvisoryService for EchoAdvisor {
    async fn suggest(&self, candidates: &[CandidatePair]) -> Result<String, AdvisoryError> {
        *self.calls.lock().expect("advisor mutex poisoned") += 1;
        let first = candidates
            .first()
            .ok_or_else(|| AdvisoryError::Transport("no candidates".to_string()))?;
        Ok(format!("{} -> {}", first.driver_name, first.registration))
    }
}

pub(crate) struct OfflineAdvisor;

#[async_trait]
impl AdvisoryService for OfflineAdvisor {
    async fn suggest(&self, _candidates: &[CandidatePair]) -> Result<String, AdvisoryError> {
        Err(AdvisoryError::Transport("connection refused".to_string()))
    }
}

pub(crate) fn build_service(
    source: MemorySource,
) -> (FleetService<MemorySource, EchoAdvisor>, Arc<MemorySource>, Arc<EchoAdvisor>) {
    build_service_with(source, LedgerSettings::default())
}

pub(crate) fn build_service_with(
    source: MemorySource,
    settings: LedgerSettings,
) -> (FleetService<MemorySource, EchoAdvisor>, Arc<MemorySource>, Arc<EchoAdvisor>) {
    let source = Arc::new(source);
    let advisor = Arc::new(EchoAdvisor::default());
    let service = FleetService::new(source.clone(), advisor.clone(), settings);
    (service, source, advisor)
}

/// Driver `d1` and vehicle `v1` (`MH-12-AB-1234`), both free.
pub(crate) fn pune_fleet() -> MemorySource {
    MemorySource::seeded(
        vec![
            active_driver("d1", "Rahul Sharma"),
            active_driver("d2", "Amit Patel"),
            onboarding_driver("d3", "Sunil Kumar"),
        ],
        vec![
            idle_vehicle("v1", "MH-12-AB-1234"),
            idle_vehicle("v2", "MH-12-CC-4444"),
            vehicle_with_status("v3", "MH-14-XY-9876", VehicleStatus::Maintenance),
        ],
    )
}

pub(crate) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(crate) fn build_service_over<D: FleetDataSource + 'static>(
    source: D,
) -> (FleetService<D, EchoAdvisor>, Arc<D>, Arc<EchoAdvisor>) {
    let source = Arc::new(source);
    let advisor = Arc::new(EchoAdvisor::default());
    let service = FleetService::new(source.clone(), advisor.clone(), LedgerSettings::default());
    (service, source, advisor)
}
