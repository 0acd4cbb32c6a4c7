mod cli;
mod infra;
mod routes;
mod server;

use edun::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
