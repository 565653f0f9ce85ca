//! Router assembly and the health probe.

use axum::{extract::State, http::StatusCode, middleware, response::Json, routing::get, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::{admin_routes, attendance_routes, report_routes, self_service_routes};
use super::middleware::{admin_middleware, auth_middleware};
use super::openapi::ApiDoc;
use super::AppState;

/// Build the full router: public kiosk routes, token-guarded self-service,
/// admin-only ledger and analytics, plus docs and health.
pub fn create_router(state: AppState) -> Router {
    // Layers run bottom-up: authenticate first, then check the role
    let auth_state = state.clone();
    let admin_only = move |routes: Router<AppState>| {
        routes
            .route_layer(middleware::from_fn(admin_middleware))
            .route_layer(middleware::from_fn_with_state(
                auth_state.clone(),
                auth_middleware,
            ))
    };

    Router::new()
        .route("/health", get(health))
        // OpenAPI Swagger UI documentation
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Kiosk events are public; self-service needs a token
        .nest(
            "/attendance",
            attendance_routes().merge(self_service_routes().route_layer(
                middleware::from_fn_with_state(state.clone(), auth_middleware),
            )),
        )
        .nest("/admin/attendance", admin_only(admin_routes()))
        .nest("/analytics", admin_only(report_routes()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    services: ServiceHealth,
}

#[derive(Serialize)]
struct ServiceHealth {
    database: Probe,
    redis: Probe,
}

/// Outcome of probing one backing service.
#[derive(Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum Probe {
    Healthy,
    Unhealthy { error: String },
    /// Not configured for this instance
    Disabled,
}

impl Probe {
    async fn run<F, E>(check: Option<F>) -> Self
    where
        F: std::future::Future<Output = Result<(), E>>,
        E: std::fmt::Display,
    {
        match check {
            None => Probe::Disabled,
            Some(check) => match check.await {
                Ok(()) => Probe::Healthy,
                Err(e) => Probe::Unhealthy {
                    error: e.to_string(),
                },
            },
        }
    }

    fn is_unhealthy(&self) -> bool {
        matches!(self, Probe::Unhealthy { .. })
    }
}

/// Database and Redis reachability; 503 when either fails.
async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (database, redis) = futures::join!(
        Probe::run(state.database.as_ref().map(|db| db.ping())),
        // Redis only backs distributed locks, so it may be absent
        Probe::run(state.cache.as_ref().map(|cache| cache.ping())),
    );

    let degraded = database.is_unhealthy() || redis.is_unhealthy();
    let (code, status) = if degraded {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    } else {
        (StatusCode::OK, "healthy")
    };

    (
        code,
        Json(HealthResponse {
            status,
            services: ServiceHealth { database, redis },
        }),
    )
}
