use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware::from_fn_with_state,
    routing::{get, post},
};
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::{config::Config, handlers, middleware_layer, state::AppState};

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("⚠️ Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .allow_credentials(true)
        .max_age(Duration::from_secs(86400))
}

/// Register and login. Exchanged in clear, optionally rate limited per client IP.
fn public_auth_routes(state: &AppState) -> Router<AppState> {
    let routes = Router::new()
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login));

    let per_second = state.config.auth_rate_limit_per_second;
    if per_second == 0 {
        return routes;
    }

    let replenish_ms = (1000 / per_second).max(1);
    match GovernorConfigBuilder::default()
        .per_millisecond(replenish_ms)
        .burst_size(state.config.auth_rate_limit_burst)
        .use_headers()
        .finish()
    {
        Some(conf) => routes.layer(GovernorLayer::new(Arc::new(conf))),
        None => {
            tracing::warn!("⚠️ Invalid auth rate limit settings, rate limiting disabled");
            routes
        }
    }
}

fn protected_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/api/auth/profile", get(handlers::auth::profile))
        .route("/api/auth/verify", get(handlers::auth::verify))
        .route("/api/users", get(handlers::users::list_users))
        .route("/api/users/{id}", get(handlers::users::get_user))
        .route("/api/users/{id}/tasks", get(handlers::users::get_user_tasks))
        .route(
            "/api/tasks",
            get(handlers::tasks::list_tasks).post(handlers::tasks::create_task),
        )
        .route(
            "/api/tasks/{id}",
            get(handlers::tasks::get_task)
                .put(handlers::tasks::update_task)
                .delete(handlers::tasks::delete_task),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::auth::require_auth,
        ))
}

/// Builds the full application.
///
/// The transport codec wraps every route, the fallback included: request
/// bodies are opened before routing and successful responses are sealed
/// after the handler. Requires `into_make_service_with_connect_info` when
/// auth rate limiting is enabled.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health::index))
        .merge(public_auth_routes(&state))
        .merge(protected_routes(&state))
        .fallback(handlers::health::not_found)
        .layer(from_fn_with_state(
            state.clone(),
            middleware_layer::encryption::encrypt_response,
        ))
        .layer(from_fn_with_state(
            state.clone(),
            middleware_layer::encryption::decrypt_request,
        ))
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(false))
                .on_request(DefaultOnRequest::default().level(Level::DEBUG))
                .on_response(DefaultOnResponse::default().level(Level::DEBUG))
                .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
        )
        .layer(cors_layer(&state.config))
        .with_state(state)
}
