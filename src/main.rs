use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use backend::{
    AppState,
    config::Config,
    middleware::{RateLimiter, auth_middleware, log_errors, rate_limit},
    routes,
};
use sqlx::Executor;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().expect("Failed to load configuration");

    #[cfg(debug_assertions)]
    tracing::info!("Running in debug mode with CORS enabled");

    #[cfg(not(debug_assertions))]
    tracing::info!("Running in production mode with CORS disabled");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'nightout_backend';")
                    .await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");

    let redis_client =
        redis::Client::open(config.redis_url.clone()).expect("Failed to create Redis client");
    let redis_arc = Arc::new(redis_client.clone());

    let state = AppState {
        pool,
        config: config.clone(),
        redis: redis_arc,
    };

    let rate_limiter = Arc::new(RateLimiter::new(redis_client, config.clone()));

    // Discovery and login are public; every write and account route sits
    // behind the auth middleware.
    let public_routes = Router::new()
        .route(
            "/auth/verify-token/public",
            post(routes::auth::verify_public_token),
        )
        .route(
            "/auth/verify-token/business",
            post(routes::auth::verify_business_token),
        )
        .route("/auth/refresh-token", post(routes::auth::refresh_token))
        .route(
            "/carousel/posters/nearby",
            get(routes::carousel::find_nearby_posters),
        );

    let protected_routes = Router::new()
        .route("/auth/logout", get(routes::auth::logout))
        // Venue routes
        .route("/venues/create", post(routes::venue::create_venue))
        .route("/venues/by-id", get(routes::venue::find_by_id))
        .route("/venues/list", get(routes::venue::list_venues))
        .route("/venues/update", put(routes::venue::update_venue))
        .route(
            "/venues/update-location",
            put(routes::venue::update_location),
        )
        .route("/venues/delete", delete(routes::venue::delete_venue))
        // Event routes
        .route("/events/create", post(routes::event::create_event))
        .route("/events/by-id", get(routes::event::find_by_id))
        .route("/events/by-venue", get(routes::event::find_by_venue))
        .route("/events/delete", delete(routes::event::delete_event))
        // Carousel poster routes
        .route(
            "/carousel/posters/create",
            post(routes::carousel::create_poster),
        )
        .route(
            "/carousel/posters/update",
            put(routes::carousel::update_poster),
        )
        .route(
            "/carousel/posters/delete",
            delete(routes::carousel::delete_poster),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let router = Router::new().nest(
        &config.api_base_uri.clone(),
        Router::new().merge(public_routes).merge(protected_routes),
    );

    let router = router.layer(axum::middleware::from_fn(log_errors)).layer(
        axum::middleware::from_fn_with_state(rate_limiter, rate_limit),
    );

    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(CorsLayer::permissive())
    };

    let app = router.with_state(state.clone());

    let addr = SocketAddr::new(
        state.config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        state.config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}
