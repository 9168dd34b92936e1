use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryFleetStore, RuleBasedAdvisor};
use crate::routes::with_fleet_routes;
use arkflow::config::AppConfig;
use arkflow::error::AppError;
use arkflow::fleet::{FallbackDataSource, FleetDataSource, FleetService, JsonFileStore};
use arkflow::telemetry;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    match config.ledger.data_dir.clone() {
        Some(dir) => {
            info!(data_dir = %dir.display(), "using JSON ledger store with in-memory fallback");
            let source = FallbackDataSource::new(
                JsonFileStore::new(dir),
                InMemoryFleetStore::default(),
            );
            serve(config, Arc::new(source)).await
        }
        None => {
            info!("no data directory configured; ledger is held in memory");
            serve(config, Arc::new(InMemoryFleetStore::default())).await
        }
    }
}

async fn serve<D>(config: AppConfig, source: Arc<D>) -> Result<(), AppError>
where
    D: FleetDataSource + 'static,
{
    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let fleet_service = Arc::new(FleetService::new(
        source,
        Arc::new(RuleBasedAdvisor),
        config.ledger.settings(),
    ));

    let app = with_fleet_routes(fleet_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        negative_payout = ?config.ledger.negative_payout,
        "fleet ledger ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
