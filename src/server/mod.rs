//! HTTP Server
//!
//! - `routes` - Router and request handlers
//! - `sse` - Event-stream framing and response headers

pub mod routes;
pub mod sse;

use std::net::SocketAddr;

use tokio::net::TcpListener;

use crate::state::AppState;
use crate::utils::error::AppResult;

pub use routes::build_router;
pub use sse::{guarded_frames, sse_response};

/// Bind the configured address and serve until Ctrl-C.
pub async fn serve(state: AppState) -> AppResult<()> {
    let bind = state.config().server.bind.clone();
    let listener = TcpListener::bind(&bind).await?;
    tracing::info!("[Server] listening on {}", listener.local_addr()?);

    let app = build_router(state);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("[Server] shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("[Server] cannot listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
