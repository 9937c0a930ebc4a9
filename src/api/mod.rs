use crate::{
    auth::{role, AuthConfig, AuthError},
    store::PgStore,
};
use anyhow::{anyhow, Context, Result};
use axum::{
    body::Body,
    extract::{Extension, MatchedPath},
    http::{HeaderName, HeaderValue, Request},
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::{any::Any, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer, request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use utoipa_swagger_ui::SwaggerUi;

pub mod error;
pub mod handlers;
pub mod middleware;
mod openapi;
pub mod state;

pub use openapi::openapi;
pub use state::AuthState;

use self::{
    error::{ApiError, Service},
    middleware::{authenticate, require_roles},
};

/// Build the application router.
///
/// Every route except the public allow-list goes through [`authenticate`]; the
/// Swagger UI and its document are mounted outside of it.
pub fn router(state: Arc<AuthState>) -> Router {
    let api = Router::new()
        .route(
            "/health",
            get(handlers::health::health).options(handlers::health::health),
        )
        .route(
            "/auth/dogowner/token",
            post(handlers::auth::login_pet_owner),
        )
        .route(
            "/auth/dogrunmg/token",
            post(handlers::auth::login_facility_manager),
        )
        .route(
            "/auth/dogowner/revoke",
            post(handlers::auth::revoke_pet_owner)
                .route_layer(from_fn_with_state(role::PET_MANAGE, require_roles)),
        )
        .route(
            "/auth/dogrunmg/revoke",
            post(handlers::auth::revoke_facility_manager)
                .route_layer(from_fn_with_state(role::FACILITY_MANAGE, require_roles)),
        )
        .route(
            "/auth/session",
            get(handlers::auth::session).route_layer(from_fn_with_state(role::ALL, require_roles)),
        )
        .route("/dogowner/signUp", post(handlers::signup::signup_pet_owner))
        .route(
            "/dogrunmg/signUp",
            post(handlers::signup::signup_facility_manager).route_layer(from_fn_with_state(
                role::FACILITY_SUPER_MANAGE,
                require_roles,
            )),
        )
        .route("/org/contract", post(handlers::org::contract))
        .layer(from_fn_with_state(state.clone(), authenticate));

    api.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(CatchPanicLayer::custom(panic_response))
                .layer(Extension(state)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, dsn: String, config: AuthConfig) -> Result<()> {
    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    let state = Arc::new(AuthState::new(&config, Arc::new(PgStore::new(pool))));
    let app = router(state);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {err}");
        return;
    }
    info!("Gracefully shutdown");
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

fn panic_response(_payload: Box<dyn Any + Send + 'static>) -> Response {
    ApiError::new(
        Service::Other,
        AuthError::store(anyhow!("request handler panicked")),
    )
    .into_response()
}

#[cfg(test)]
mod tests;
