use enviro_sensorhub::config::config_dir;
use enviro_sensorhub::{init_tracing, run_sensor_hub};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    // CONFIG_PATH overrides the default config/ directory
    let config_path = config_dir();
    tracing::info!("[main] configuration path: {}", config_path);

    run_sensor_hub(&config_path).await
}
