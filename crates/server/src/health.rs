use std::future::Future;
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{error, info};
use waiter_core::menu::Catalog;
use waiter_core::sessions::SessionStore;

#[derive(Clone)]
pub struct HealthState {
    pub catalog: Arc<Catalog>,
    pub sessions: Arc<SessionStore>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CatalogCheck {
    pub status: &'static str,
    pub products: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub catalog: CatalogCheck,
    pub sessions: usize,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

pub async fn spawn<S>(
    bind_address: &str,
    port: u16,
    state: HealthState,
    shutdown: S,
) -> std::io::Result<JoinHandle<()>>
where
    S: Future<Output = ()> + Send + 'static,
{
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.health.start",
        correlation_id = "bootstrap",
        bind_address = %address,
        "health endpoint started"
    );

    Ok(tokio::spawn(async move {
        if let Err(error) =
            axum::serve(listener, router(state)).with_graceful_shutdown(shutdown).await
        {
            error!(
                event_name = "system.health.error",
                correlation_id = "bootstrap",
                error = %error,
                "health endpoint server terminated unexpectedly"
            );
        }
    }))
}

/// Ready when the menu has products. An empty catalog still serves
/// conversations, but nothing can be ordered, so it reports degraded.
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let products = state.catalog.len();
    let ready = products > 0;

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        catalog: CatalogCheck { status: if ready { "ready" } else { "empty" }, products },
        sessions: state.sessions.len(),
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{extract::State, http::StatusCode, Json};
    use waiter_core::domain::product::Product;
    use waiter_core::domain::session::UserId;
    use waiter_core::menu::Catalog;
    use waiter_core::sessions::SessionStore;

    use crate::health::{health, HealthState};

    #[tokio::test]
    async fn health_returns_ready_when_menu_is_loaded() {
        let sessions = Arc::new(SessionStore::new());
        sessions.get_or_create(&UserId::from(1_i64));
        sessions.get_or_create(&UserId::from(2_i64));
        let state = HealthState {
            catalog: Arc::new(Catalog::new(vec![Product::new("Піца Маргарита", "150")])),
            sessions,
        };

        let (status, Json(payload)) = health(State(state)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.catalog.products, 1);
        assert_eq!(payload.sessions, 2);
    }

    #[tokio::test]
    async fn health_returns_service_unavailable_when_menu_is_empty() {
        let state =
            HealthState { catalog: Arc::new(Catalog::empty()), sessions: Arc::new(SessionStore::new()) };

        let (status, Json(payload)) = health(State(state)).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.catalog.status, "empty");

        let json = serde_json::to_value(&payload).expect("payload serializes");
        assert_eq!(json["catalog"], serde_json::json!({"status": "empty", "products": 0}));
        assert!(json["checked_at"].is_string());
    }
}
