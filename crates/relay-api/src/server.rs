//! HTTP server
//!
//! Builds the axum application over shared state and serves it until the
//! shutdown future resolves.

use axum::Router;
use http::HeaderValue;
use relay_catalog::CatalogProvider;
use relay_core::{Store, TenantDirectory};
use relay_inbound::Classifier;
use relay_schedule::EventScheduler;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::routes::routes;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub tenants: Arc<dyn TenantDirectory>,
    pub catalog: Arc<dyn CatalogProvider>,
    pub store: Arc<Store>,
    pub scheduler: EventScheduler,
    pub classifier: Classifier,
}

/// Application router with CORS and request tracing.
///
/// CORS is permissive unless `allowed_origins` lists the accepted origins.
pub fn app(state: AppState, allowed_origins: Option<&[String]>) -> Router {
    Router::new()
        .merge(routes())
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(allowed_origins: Option<&[String]>) -> CorsLayer {
    let Some(origins) = allowed_origins else {
        return CorsLayer::permissive();
    };

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}

/// Serve `app` on `port` until `shutdown` resolves
pub async fn start_server<F>(port: u16, app: Router, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("HTTP API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
