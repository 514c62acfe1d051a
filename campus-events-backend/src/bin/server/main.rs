use campus_events_backend::error::AppError;
use campus_events_backend::run_server;
use campus_events_config::get_config;
use campus_events_telemetry::setup_telemetry;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    setup_telemetry();

    let config = get_config()?;
    run_server(&config).await?.await
}
