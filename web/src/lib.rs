use log::*;
use service::AppState;
use tokio::net::TcpListener;

mod controller;
mod error;
mod params;
mod router;

pub use error::Error;

/// Serves the router on the configured address until Ctrl-C, then shuts the event stream
/// down so every connected client's response ends.
pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let listen_addr = app_state.config.listen_addr();
    let stream = app_state.stream.clone();

    info!(
        "Server starting... listening for connections on http://{listen_addr} ({})",
        app_state.config.runtime_env()
    );

    let listener = TcpListener::bind(&listen_addr).await?;
    let app = router::define_routes(app_state);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {e}");
                std::future::pending::<()>().await;
            }
            info!("Shutting down, closing {} event stream(s)", stream.num_clients().await);
            stream.shutdown().await;
        })
        .await
}
