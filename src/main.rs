use gpio_status_sync::config::Config;
use gpio_status_sync::controller::Controller;
use gpio_status_sync::instance_lock::InstanceLock;
use gpio_status_sync::output;
use gpio_status_sync::shutdown::shutdown_signal;
use gpio_status_sync::source::StatusSource;
use log::{error, info};

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_logger();
    info!("Starting GPIO status sync");

    // Load configuration
    let config = Config::from_env();
    info!("Configuration loaded:");
    info!("  Output pin: {} ({})", config.output.pin, config.output.driver);
    info!("  Status source: {}", config.source);
    info!("  Device ID: {}", config.device_id);
    info!("  Poll interval: {:?}", config.poll_interval);

    let _lock = match InstanceLock::acquire(config.output.pin) {
        Ok(lock) => lock,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let source = match StatusSource::from_config(&config).await {
        Ok(source) => source,
        Err(e) => {
            error!("Failed to set up status source: {}", e);
            std::process::exit(1);
        }
    };
    match &source {
        StatusSource::Database(db) => {
            info!("Using direct MongoDB connection for device {}", db.device_id())
        }
        StatusSource::Api(api) => info!("Using API connection to {}", api.url()),
    }

    let driver = match output::open(&config.output) {
        Ok(driver) => driver,
        Err(e) => {
            error!("Failed to open output pin {}: {}", config.output.pin, e);
            std::process::exit(1);
        }
    };

    info!("  - Press Ctrl+C to exit");
    Controller::new(source, driver, config.poll_interval)
        .run(shutdown_signal())
        .await;

    info!("GPIO status sync stopped");
}
