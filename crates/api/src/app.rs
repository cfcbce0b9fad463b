use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Router,
};
use domain::services::{RegistrationNotifier, RegistrationService};
use persistence::PgRegistrationStore;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{
    metrics_handler, metrics_middleware, rate_limit_middleware, security_headers_middleware,
    spawn_pruner, trace_id, RateLimiterState,
};
use crate::routes::{admin, health, registrations};
use crate::services::EmailService;

const RATE_LIMIT_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub registrations: RegistrationService,
    pub rate_limiter: Option<Arc<RateLimiterState>>,
    pub email_configured: bool,
}

/// Build the application with the email notifier from configuration.
pub fn create_app(config: Config, pool: PgPool) -> Router {
    let email = EmailService::new(config.email.clone(), config.event.clone());
    let configured = email.is_configured();
    build_router(config, pool, Arc::new(email), configured)
}

/// Build the application with a caller-supplied notifier.
pub fn create_app_with_notifier(
    config: Config,
    pool: PgPool,
    notifier: Arc<dyn RegistrationNotifier>,
) -> Router {
    build_router(config, pool, notifier, true)
}

fn build_router(
    config: Config,
    pool: PgPool,
    notifier: Arc<dyn RegistrationNotifier>,
    email_configured: bool,
) -> Router {
    let config = Arc::new(config);

    let rate_limiter = RateLimiterState::new(
        config.security.register_rate_limit,
        Duration::from_secs(config.security.register_rate_window_secs),
        config.security.trusted_proxy_addrs(),
    )
    .map(Arc::new);
    if let Some(ref limiter) = rate_limiter {
        spawn_pruner(limiter, RATE_LIMIT_PRUNE_INTERVAL);
    }

    let store = Arc::new(PgRegistrationStore::new(pool.clone()));
    let registrations =
        RegistrationService::new(store, notifier, config.event.intake_policy());

    let state = AppState {
        pool,
        config: config.clone(),
        registrations,
        rate_limiter,
        email_configured,
    };

    let cors = if config.security.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Only intake is rate limited.
    let intake_routes = Router::new()
        .route("/api/register", post(registrations::register))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));

    let public_routes = Router::new()
        .route(
            "/api/registration/:email",
            get(registrations::lookup_by_email),
        )
        .route("/api/stats", get(admin::stats))
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    let admin_routes = Router::new()
        .route("/api/admin/registrations", get(admin::list_registrations))
        .route(
            "/api/admin/registrations/:id/notifications",
            get(admin::notification_log),
        )
        .route("/api/day/:day_number", get(admin::registrations_for_day))
        .route(
            "/api/registrations/status/:status",
            get(admin::registrations_by_status),
        )
        .route(
            "/api/registration/:id/status",
            put(admin::update_registration_status),
        )
        .route(
            "/api/registration/:id/payment",
            put(admin::update_payment_status),
        );

    Router::new()
        .merge(intake_routes)
        .merge(public_routes)
        .merge(admin_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(DefaultBodyLimit::max(config.server.max_body_size))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            security_headers_middleware,
        ))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
