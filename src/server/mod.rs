mod routes;
mod state;
mod tenant_layer;

pub use state::ServerState;
pub use tenant_layer::TENANT_ID_HEADER;

use anyhow::Result;
use axum::routing::{get, post};
use axum::{middleware, Router};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub fn make_app(state: ServerState) -> Router {
    Router::new()
        .route("/users", post(routes::create_user).get(routes::list_users))
        .route("/users/count", get(routes::count_users))
        .route("/auth/register", post(routes::register))
        .route("/auth/forgot-password", post(routes::forgot_password))
        .route("/jobs", get(routes::list_jobs))
        .route("/jobs/{id}", get(routes::get_job))
        .layer(middleware::from_fn(tenant_layer::require_tenant))
        .with_state(state)
}

pub async fn run_server(
    listener: TcpListener,
    state: ServerState,
    shutdown: CancellationToken,
) -> Result<()> {
    info!("Server listening on {}", listener.local_addr()?);
    axum::serve(listener, make_app(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}
