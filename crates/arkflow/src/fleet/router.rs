use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

use super::domain::{
    DriverId, DriverRegistration, RegistrationNumber, SettlementId, VehicleRegistration,
};
use super::repository::{AdvisoryService, FleetDataSource};
use super::service::{AssignmentRequest, FleetService, FleetServiceError, MaintenanceRequest};
use super::settlement::SettlementInput;

/// Router builder exposing the fleet ledger over HTTP.
pub fn fleet_router<D, A>(service: Arc<FleetService<D, A>>) -> Router
where
    D: FleetDataSource + 'static,
    A: AdvisoryService + 'static,
{
    Router::new()
        .route("/api/v1/fleet/stats", get(stats_handler::<D, A>))
        .route(
            "/api/v1/fleet/drivers",
            get(list_drivers_handler::<D, A>).post(onboard_handler::<D, A>),
        )
        .route(
            "/api/v1/fleet/drivers/:driver_id/activate",
            post(activate_handler::<D, A>),
        )
        .route(
            "/api/v1/fleet/drivers/:driver_id/deactivate",
            post(deactivate_handler::<D, A>),
        )
        .route(
            "/api/v1/fleet/vehicles",
            get(list_vehicles_handler::<D, A>).post(register_vehicle_handler::<D, A>),
        )
        .route(
            "/api/v1/fleet/vehicles/:registration/maintenance",
            post(maintenance_handler::<D, A>),
        )
        .route(
            "/api/v1/fleet/assignments/eligible",
            get(eligible_handler::<D, A>),
        )
        .route("/api/v1/fleet/assignments", post(assign_handler::<D, A>))
        .route(
            "/api/v1/fleet/assignments/:driver_id",
            delete(release_handler::<D, A>),
        )
        .route(
            "/api/v1/fleet/settlements",
            get(list_settlements_handler::<D, A>).post(record_settlement_handler::<D, A>),
        )
        .route(
            "/api/v1/fleet/settlements/:settlement_id/settle",
            post(settle_handler::<D, A>),
        )
        .route(
            "/api/v1/fleet/settlements/import",
            post(import_handler::<D, A>),
        )
        .route(
            "/api/v1/fleet/reports/billing",
            get(billing_handler::<D, A>),
        )
        .route(
            "/api/v1/fleet/reports/utilization",
            get(utilization_handler::<D, A>),
        )
        .route(
            "/api/v1/fleet/reports/compliance",
            get(compliance_handler::<D, A>),
        )
        .route("/api/v1/fleet/advisory", get(advisory_handler::<D, A>))
        .with_state(service)
}

type FleetState<D, A> = State<Arc<FleetService<D, A>>>;

#[derive(Debug, Deserialize)]
pub(crate) struct ImportQuery {
    cycle_end: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ComplianceQuery {
    today: Option<NaiveDate>,
}

fn respond<T: Serialize>(status: StatusCode, result: Result<T, FleetServiceError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: FleetServiceError) -> Response {
    AppError::from(error).into_response()
}

pub(crate) async fn stats_handler<D, A>(State(service): FleetState<D, A>) -> Response
where
    D: FleetDataSource + 'static,
    A: AdvisoryService + 'static,
{
    respond(StatusCode::OK, service.dashboard().await)
}

pub(crate) async fn list_drivers_handler<D, A>(State(service): FleetState<D, A>) -> Response
where
    D: FleetDataSource + 'static,
    A: AdvisoryService + 'static,
{
    respond(StatusCode::OK, service.drivers().await)
}

pub(crate) async fn onboard_handler<D, A>(
    State(service): FleetState<D, A>,
    Json(form): Json<DriverRegistration>,
) -> Response
where
    D: FleetDataSource + 'static,
    A: AdvisoryService + 'static,
{
    respond(StatusCode::CREATED, service.onboard_driver(form).await)
}

pub(crate) async fn activate_handler<D, A>(
    State(service): FleetState<D, A>,
    Path(driver_id): Path<String>,
) -> Response
where
    D: FleetDataSource + 'static,
    A: AdvisoryService + 'static,
{
    respond(
        StatusCode::OK,
        service.activate_driver(&DriverId(driver_id)).await,
    )
}

pub(crate) async fn deactivate_handler<D, A>(
    State(service): FleetState<D, A>,
    Path(driver_id): Path<String>,
) -> Response
where
    D: FleetDataSource + 'static,
    A: AdvisoryService + 'static,
{
    respond(
        StatusCode::OK,
        service.deactivate_driver(&DriverId(driver_id)).await,
    )
}

pub(crate) async fn list_vehicles_handler<D, A>(State(service): FleetState<D, A>) -> Response
where
    D: FleetDataSource + 'static,
    A: AdvisoryService + 'static,
{
    respond(StatusCode::OK, service.vehicles().await)
}

pub(crate) async fn register_vehicle_handler<D, A>(
    State(service): FleetState<D, A>,
    Json(form): Json<VehicleRegistration>,
) -> Response
where
    D: FleetDataSource + 'static,
    A: AdvisoryService + 'static,
{
    respond(StatusCode::CREATED, service.register_vehicle(form).await)
}

pub(crate) async fn maintenance_handler<D, A>(
    State(service): FleetState<D, A>,
    Path(registration): Path<String>,
    Json(request): Json<MaintenanceRequest>,
) -> Response
where
    D: FleetDataSource + 'static,
    A: AdvisoryService + 'static,
{
    let registration = match RegistrationNumber::parse(&registration) {
        Ok(registration) => registration,
        Err(error) => return error_response(error.into()),
    };
    respond(
        StatusCode::OK,
        service.log_maintenance(&registration, request).await,
    )
}

pub(crate) async fn eligible_handler<D, A>(State(service): FleetState<D, A>) -> Response
where
    D: FleetDataSource + 'static,
    A: AdvisoryService + 'static,
{
    respond(StatusCode::OK, service.eligible_pairs().await)
}

pub(crate) async fn assign_handler<D, A>(
    State(service): FleetState<D, A>,
    Json(request): Json<AssignmentRequest>,
) -> Response
where
    D: FleetDataSource + 'static,
    A: AdvisoryService + 'static,
{
    respond(StatusCode::CREATED, service.assign(request).await)
}

pub(crate) async fn release_handler<D, A>(
    State(service): FleetState<D, A>,
    Path(driver_id): Path<String>,
) -> Response
where
    D: FleetDataSource + 'static,
    A: AdvisoryService + 'static,
{
    respond(StatusCode::OK, service.release(&DriverId(driver_id)).await)
}

pub(crate) async fn list_settlements_handler<D, A>(State(service): FleetState<D, A>) -> Response
where
    D: FleetDataSource + 'static,
    A: AdvisoryService + 'static,
{
    respond(StatusCode::OK, service.settlements().await)
}

pub(crate) async fn record_settlement_handler<D, A>(
    State(service): FleetState<D, A>,
    Json(input): Json<SettlementInput>,
) -> Response
where
    D: FleetDataSource + 'static,
    A: AdvisoryService + 'static,
{
    respond(StatusCode::CREATED, service.record_settlement(input).await)
}

pub(crate) async fn settle_handler<D, A>(
    State(service): FleetState<D, A>,
    Path(settlement_id): Path<String>,
) -> Response
where
    D: FleetDataSource + 'static,
    A: AdvisoryService + 'static,
{
    respond(
        StatusCode::OK,
        service.settle(&SettlementId(settlement_id)).await,
    )
}

pub(crate) async fn import_handler<D, A>(
    State(service): FleetState<D, A>,
    Query(query): Query<ImportQuery>,
    body: String,
) -> Response
where
    D: FleetDataSource + 'static,
    A: AdvisoryService + 'static,
{
    respond(
        StatusCode::OK,
        service
            .import_earnings(body.as_bytes(), query.cycle_end)
            .await,
    )
}

pub(crate) async fn billing_handler<D, A>(State(service): FleetState<D, A>) -> Response
where
    D: FleetDataSource + 'static,
    A: AdvisoryService + 'static,
{
    respond(StatusCode::OK, service.billing_report().await)
}

pub(crate) async fn utilization_handler<D, A>(State(service): FleetState<D, A>) -> Response
where
    D: FleetDataSource + 'static,
    A: AdvisoryService + 'static,
{
    respond(StatusCode::OK, service.utilization_report().await)
}

pub(crate) async fn compliance_handler<D, A>(
    State(service): FleetState<D, A>,
    Query(query): Query<ComplianceQuery>,
) -> Response
where
    D: FleetDataSource + 'static,
    A: AdvisoryService + 'static,
{
    let today = query.today.unwrap_or_else(|| Local::now().date_naive());
    respond(StatusCode::OK, service.compliance(today).await)
}

pub(crate) async fn advisory_handler<D, A>(State(service): FleetState<D, A>) -> Response
where
    D: FleetDataSource + 'static,
    A: AdvisoryService + 'static,
{
    respond(StatusCode::OK, service.suggest_match().await)
}
