use log::{error, info, warn};
use service::{config::Config, heartbeat, logging::Logger, AppState};

#[tokio::main]
async fn main() {
    let config = Config::new();
    if let Err(e) = Logger::init_logger(&config) {
        eprintln!("Failed to initialize logger: {e}");
    }

    info!("Starting event stream server [{}]...", config.runtime_env());
    if config.topics.is_empty() {
        warn!("No topics configured, only /events will be served");
    }

    let app_state = AppState::new(config);

    let heartbeat = app_state.config.heartbeat_interval().map(|interval| {
        heartbeat::spawn(
            app_state.stream.clone(),
            interval,
            app_state.config.retry_ms,
        )
    });

    let result = web::init_server(app_state).await;

    if let Some(heartbeat) = heartbeat {
        heartbeat.abort();
    }

    if let Err(e) = result {
        error!("Server failed: {e}");
        std::process::exit(1);
    }

    info!("Server stopped");
}
