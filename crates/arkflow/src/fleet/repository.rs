use async_trait::async_trait;

use super::domain::{Driver, SettlementRecord, Vehicle};
use super::matcher::CandidatePair;

/// Storage abstraction over the remote fleet tables or a local snapshot.
///
/// Saves are upserts keyed by record id. Callers decide how to react to failures; the
/// collaborator may already have fallen back to a cache.
#[async_trait]
pub trait FleetDataSource: Send + Sync {
    async fn fetch_drivers(&self) -> Result<Vec<Driver>, DataSourceError>;
    async fn fetch_vehicles(&self) -> Result<Vec<Vehicle>, DataSourceError>;
    async fn fetch_settlements(&self) -> Result<Vec<SettlementRecord>, DataSourceError>;
    async fn save_driver(&self, driver: Driver) -> Result<(), DataSourceError>;
    async fn save_vehicle(&self, vehicle: Vehicle) -> Result<(), DataSourceError>;
    async fn save_settlement(&self, settlement: SettlementRecord) -> Result<(), DataSourceError>;
}

/// Error enumeration for data-source failures.
#[derive(Debug, thiserror::Error)]
pub enum DataSourceError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("data source unavailable: {0}")]
    Unavailable(String),
    #[error("stored data could not be decoded: {0}")]
    Codec(String),
}

/// Outbound hook for a pairing advisor (e.g. an LLM endpoint). Output is display-only.
#[async_trait]
pub trait AdvisoryService: Send + Sync {
    async fn suggest(&self, candidates: &[CandidatePair]) -> Result<String, AdvisoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AdvisoryError {
    #[error("advisory transport unavailable: {0}")]
    Transport(String),
}
