//! Local persistence collaborators.
//!
//! [`JsonFileStore`] keeps one JSON array per collection on disk, the same key-value blob
//! layout the browser dashboard kept in local storage. [`FallbackDataSource`] layers a
//! primary source over a cache: reads fall back when the primary fails, successful writes
//! are copied into the cache, and writes the primary cannot accept are parked there.

use std::collections::HashSet;
use std::hash::Hash;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::warn;

use super::domain::{Driver, DriverId, SettlementId, SettlementRecord, Vehicle, VehicleId};
use super::legacy::LegacySettlement;
use super::repository::{DataSourceError, FleetDataSource};

pub const DRIVERS_KEY: &str = "arkflow_drivers";
pub const VEHICLES_KEY: &str = "arkflow_vehicles";
pub const SETTLEMENTS_KEY: &str = "arkflow_settlements";

#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    async fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, DataSourceError> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|err| DataSourceError::Codec(format!("{key}: {err}"))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(DataSourceError::Unavailable(format!("{key}: {err}"))),
        }
    }

    async fn store<T: Serialize>(&self, key: &str, records: &[T]) -> Result<(), DataSourceError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|err| DataSourceError::Unavailable(err.to_string()))?;

        let bytes = serde_json::to_vec_pretty(records)
            .map_err(|err| DataSourceError::Codec(err.to_string()))?;
        let target = self.path_for(key);
        let staging = target.with_extension("json.tmp");
        tokio::fs::write(&staging, bytes)
            .await
            .map_err(|err| DataSourceError::Unavailable(err.to_string()))?;
        tokio::fs::rename(&staging, &target)
            .await
            .map_err(|err| DataSourceError::Unavailable(err.to_string()))
    }

    /// Settlements are read through the legacy adapter so older dashboard payloads load
    /// as canonical records. Plates missing from first-generation rows are resolved from
    /// the driver's current assignment.
    async fn load_settlements(&self) -> Result<Vec<SettlementRecord>, DataSourceError> {
        let stored: Vec<LegacySettlement> = self.load(SETTLEMENTS_KEY).await?;
        if stored.is_empty() {
            return Ok(Vec::new());
        }
        let drivers: Vec<Driver> = self.load(DRIVERS_KEY).await?;

        stored
            .into_iter()
            .map(|legacy| {
                legacy
                    .into_record(|driver_id| {
                        drivers
                            .iter()
                            .find(|driver| &driver.id == driver_id)
                            .and_then(|driver| driver.assigned_vehicle.clone())
                    })
                    .map_err(|err| DataSourceError::Codec(format!("{SETTLEMENTS_KEY}: {err}")))
            })
            .collect()
    }
}

/// Replace the record matching `same` or insert it; newest records go first.
fn upsert_into<T, F>(records: &mut Vec<T>, record: T, same: F)
where
    F: Fn(&T, &T) -> bool,
{
    match records.iter().position(|existing| same(existing, &record)) {
        Some(index) => records[index] = record,
        None => records.insert(0, record),
    }
}

#[async_trait]
impl FleetDataSource for JsonFileStore {
    async fn fetch_drivers(&self) -> Result<Vec<Driver>, DataSourceError> {
        self.load(DRIVERS_KEY).await
    }

    async fn fetch_vehicles(&self) -> Result<Vec<Vehicle>, DataSourceError> {
        self.load(VEHICLES_KEY).await
    }

    async fn fetch_settlements(&self) -> Result<Vec<SettlementRecord>, DataSourceError> {
        self.load_settlements().await
    }

    async fn save_driver(&self, driver: Driver) -> Result<(), DataSourceError> {
        let _guard = self.write_lock.lock().await;
        let mut drivers: Vec<Driver> = self.load(DRIVERS_KEY).await?;
        upsert_into(&mut drivers, driver, |a, b| a.id == b.id);
        self.store(DRIVERS_KEY, &drivers).await
    }

    async fn save_vehicle(&self, vehicle: Vehicle) -> Result<(), DataSourceError> {
        let _guard = self.write_lock.lock().await;
        let mut vehicles: Vec<Vehicle> = self.load(VEHICLES_KEY).await?;
        upsert_into(&mut vehicles, vehicle, |a, b| a.id == b.id);
        self.store(VEHICLES_KEY, &vehicles).await
    }

    async fn save_settlement(&self, settlement: SettlementRecord) -> Result<(), DataSourceError> {
        let _guard = self.write_lock.lock().await;
        let mut settlements = self.load_settlements().await?;
        upsert_into(&mut settlements, settlement, |a, b| a.id == b.id);
        self.store(SETTLEMENTS_KEY, &settlements).await
    }
}

/// Primary source with a local cache behind it.
///
/// Writes the primary refuses as `Unavailable` are parked in the cache and remembered by
/// id. Until the primary accepts a newer write for the same id, every read from the
/// primary is overlaid with the parked copy, so callers never see a record older than
/// one they were told was saved.
pub struct FallbackDataSource<P, C> {
    primary: P,
    cache: C,
    parked: Mutex<ParkedWrites>,
}

#[derive(Debug, Default)]
struct ParkedWrites {
    drivers: HashSet<DriverId>,
    vehicles: HashSet<VehicleId>,
    settlements: HashSet<SettlementId>,
}

impl<P, C> FallbackDataSource<P, C>
where
    P: FleetDataSource,
    C: FleetDataSource,
{
    pub fn new(primary: P, cache: C) -> Self {
        Self {
            primary,
            cache,
            parked: Mutex::new(ParkedWrites::default()),
        }
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Number of records whose latest write only reached the cache.
    pub async fn parked_writes(&self) -> usize {
        let parked = self.parked.lock().await;
        parked.drivers.len() + parked.vehicles.len() + parked.settlements.len()
    }
}

/// Replace or add every cached record whose id was parked.
fn overlay_parked<T, K, F>(records: &mut Vec<T>, cached: Vec<T>, parked: &HashSet<K>, key: F)
where
    K: Eq + Hash,
    F: Fn(&T) -> &K,
{
    for record in cached {
        if parked.contains(key(&record)) {
            upsert_into(records, record, |a, b| key(a) == key(b));
        }
    }
}

#[async_trait]
impl<P, C> FleetDataSource for FallbackDataSource<P, C>
where
    P: FleetDataSource,
    C: FleetDataSource,
{
    async fn fetch_drivers(&self) -> Result<Vec<Driver>, DataSourceError> {
        let parked = self.parked.lock().await.drivers.clone();
        match self.primary.fetch_drivers().await {
            Ok(mut drivers) => {
                if !parked.is_empty() {
                    let cached = self.cache.fetch_drivers().await?;
                    overlay_parked(&mut drivers, cached, &parked, |driver| &driver.id);
                }
                Ok(drivers)
            }
            Err(err) => {
                warn!(error = %err, "driver fetch failed, using local cache");
                self.cache.fetch_drivers().await
            }
        }
    }

    async fn fetch_vehicles(&self) -> Result<Vec<Vehicle>, DataSourceError> {
        let parked = self.parked.lock().await.vehicles.clone();
        match self.primary.fetch_vehicles().await {
            Ok(mut vehicles) => {
                if !parked.is_empty() {
                    let cached = self.cache.fetch_vehicles().await?;
                    overlay_parked(&mut vehicles, cached, &parked, |vehicle| &vehicle.id);
                }
                Ok(vehicles)
            }
            Err(err) => {
                warn!(error = %err, "vehicle fetch failed, using local cache");
                self.cache.fetch_vehicles().await
            }
        }
    }

    async fn fetch_settlements(&self) -> Result<Vec<SettlementRecord>, DataSourceError> {
        let parked = self.parked.lock().await.settlements.clone();
        match self.primary.fetch_settlements().await {
            Ok(mut settlements) => {
                if !parked.is_empty() {
                    let cached = self.cache.fetch_settlements().await?;
                    overlay_parked(&mut settlements, cached, &parked, |record| &record.id);
                }
                Ok(settlements)
            }
            Err(err) => {
                warn!(error = %err, "settlement fetch failed, using local cache");
                self.cache.fetch_settlements().await
            }
        }
    }

    async fn save_driver(&self, driver: Driver) -> Result<(), DataSourceError> {
        match self.primary.save_driver(driver.clone()).await {
            Ok(()) => {
                self.parked.lock().await.drivers.remove(&driver.id);
                if let Err(err) = self.cache.save_driver(driver).await {
                    warn!(error = %err, "driver cache refresh failed");
                }
                Ok(())
            }
            Err(DataSourceError::Unavailable(reason)) => {
                warn!(%reason, driver_id = %driver.id.0, "driver save parked in local cache");
                let id = driver.id.clone();
                self.cache.save_driver(driver).await?;
                self.parked.lock().await.drivers.insert(id);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    async fn save_vehicle(&self, vehicle: Vehicle) -> Result<(), DataSourceError> {
        match self.primary.save_vehicle(vehicle.clone()).await {
            Ok(()) => {
                self.parked.lock().await.vehicles.remove(&vehicle.id);
                if let Err(err) = self.cache.save_vehicle(vehicle).await {
                    warn!(error = %err, "vehicle cache refresh failed");
                }
                Ok(())
            }
            Err(DataSourceError::Unavailable(reason)) => {
                warn!(%reason, registration = %vehicle.registration, "vehicle save parked in local cache");
                let id = vehicle.id.clone();
                self.cache.save_vehicle(vehicle).await?;
                self.parked.lock().await.vehicles.insert(id);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    async fn save_settlement(&self, settlement: SettlementRecord) -> Result<(), DataSourceError> {
        match self.primary.save_settlement(settlement.clone()).await {
            Ok(()) => {
                self.parked.lock().await.settlements.remove(&settlement.id);
                if let Err(err) = self.cache.save_settlement(settlement).await {
                    warn!(error = %err, "settlement cache refresh failed");
                }
                Ok(())
            }
            Err(DataSourceError::Unavailable(reason)) => {
                warn!(%reason, settlement_id = %settlement.id.0, "settlement save parked in local cache");
                let id = settlement.id.clone();
                self.cache.save_settlement(settlement).await?;
                self.parked.lock().await.settlements.insert(id);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}
