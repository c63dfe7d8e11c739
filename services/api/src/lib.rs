mod cli;
mod infra;
mod render;
mod report;
mod routes;
mod server;

use nutrition_priority::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
