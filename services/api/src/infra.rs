use arkflow::fleet::{
    AdvisoryError, AdvisoryService, CandidatePair, DataSourceError, Driver, DriverId,
    FleetDataSource, Money, SettlementId, SettlementRecord, Vehicle, VehicleId,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local ledger used when no data directory is configured, and as the cache in
/// front of the JSON store.
#[derive(Default, Clone)]
pub(crate) struct InMemoryFleetStore {
    drivers: Arc<Mutex<BTreeMap<DriverId, Driver>>>,
    vehicles: Arc<Mutex<BTreeMap<VehicleId, Vehicle>>>,
    settlements: Arc<Mutex<HashMap<SettlementId, SettlementRecord>>>,
}

#[async_trait]
impl FleetDataSource for InMemoryFleetStore {
    async fn fetch_drivers(&self) -> Result<Vec<Driver>, DataSourceError> {
        let guard = self.drivers.lock().expect("driver store mutex poisoned");
        Ok(guard.values().cloned().collect())
    }

    async fn fetch_vehicles(&self) -> Result<Vec<Vehicle>, DataSourceError> {
        let guard = self.vehicles.lock().expect("vehicle store mutex poisoned");
        Ok(guard.values().cloned().collect())
    }

    async fn fetch_settlements(&self) -> Result<Vec<SettlementRecord>, DataSourceError> {
        let guard = self
            .settlements
            .lock()
            .expect("settlement store mutex poisoned");
        let mut settlements: Vec<SettlementRecord> = guard.values().cloned().collect();
        settlements.sort_by(|a, b| b.cycle_end.cmp(&a.cycle_end).then(a.id.cmp(&b.id)));
        Ok(settlements)
    }

    async fn save_driver(&self, driver: Driver) -> Result<(), DataSourceError> {
        let mut guard = self.drivers.lock().expect("driver store mutex poisoned");
        guard.insert(driver.id.clone(), driver);
        Ok(())
    }

    async fn save_vehicle(&self, vehicle: Vehicle) -> Result<(), DataSourceError> {
        let mut guard = self.vehicles.lock().expect("vehicle store mutex poisoned");
        guard.insert(vehicle.id.clone(), vehicle);
        Ok(())
    }

    async fn save_settlement(&self, settlement: SettlementRecord) -> Result<(), DataSourceError> {
        let mut guard = self
            .settlements
            .lock()
            .expect("settlement store mutex poisoned");
        guard.insert(settlement.id.clone(), settlement);
        Ok(())
    }
}

/// Offline stand-in for the pairing advisor: proposes the first eligible pair and says how
/// many alternatives exist.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct RuleBasedAdvisor;

#[async_trait]
impl AdvisoryService for RuleBasedAdvisor {
    async fn suggest(&self, candidates: &[CandidatePair]) -> Result<String, AdvisoryError> {
        let Some(first) = candidates.first() else {
            return Err(AdvisoryError::Transport(
                "no eligible pairs to rank".to_string(),
            ));
        };
        let alternatives = candidates.len() - 1;
        Ok(format!(
            "Assign {} to {} ({}); {} other pairing(s) available",
            first.driver_name,
            first.registration,
            first.vehicle_label,
            alternatives
        ))
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// Rupee amount such as `15400` or `1,250.50`; negative amounts are left to the calculator.
pub(crate) fn parse_money(raw: &str) -> Result<Money, String> {
    let cleaned: String = raw.trim().chars().filter(|ch| *ch != ',').collect();
    cleaned
        .parse::<Decimal>()
        .map(Money::new)
        .map_err(|err| format!("failed to parse '{raw}' as an amount ({err})"))
}
