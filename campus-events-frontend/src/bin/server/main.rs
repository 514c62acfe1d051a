use campus_events_client::connect;
use campus_events_config::get_config;
use campus_events_frontend::{run_server, FrontendError};
use campus_events_telemetry::setup_telemetry;

#[tokio::main]
async fn main() -> Result<(), FrontendError> {
    setup_telemetry();

    let config = get_config()?;
    let api = connect(&config)?;
    run_server(&config, api).await?.await
}
