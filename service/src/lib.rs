use config::Config;
use eventsource::Stream;

pub mod config;
pub mod heartbeat;
pub mod logging;

// Service-level state shared by every handler.
// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub stream: Stream,
}

impl AppState {
    pub fn new(app_config: Config) -> Self {
        Self {
            config: app_config,
            stream: Stream::new(),
        }
    }
}
