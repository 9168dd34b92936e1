mod cli;
mod demo;
mod infra;
mod ledger;
mod routes;
mod server;

use arkflow::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
