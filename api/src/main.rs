use std::{net::IpAddr, net::SocketAddr, num::NonZeroU32, sync::Arc};

use axum::{Router, http::HeaderValue};
use diesel_async::{
    AsyncPgConnection,
    pooled_connection::{AsyncDieselConnectionManager, deadpool::Pool},
};
use dotenv::dotenv;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod admin;
mod analytics;
mod blog;
mod config;
mod contact;
mod error;
mod identity;
mod json;
mod markdown;
mod media;
mod real_ip;
mod schema;
mod utils;

use analytics::tracker::ViewTracker;
use error::AppError;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Clone)]
pub struct App {
    pub diesel: Pool<AsyncPgConnection>,
    pub config: Arc<config::ServerConfig>,
    pub tracker: Arc<ViewTracker>,
    pub public_limiter: Arc<DefaultKeyedRateLimiter<IpAddr>>,
}

impl App {
    /// Shared throttle for the unauthenticated write endpoints.
    pub fn check_public_rate(&self, ip: IpAddr) -> Result<(), AppError> {
        if self.public_limiter.check_key(&ip).is_err() {
            return Err((
                "Too many requests, slow down",
                axum::http::StatusCode::TOO_MANY_REQUESTS,
            ))?;
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let app = init().await?;

    let addr = SocketAddr::from(([0, 0, 0, 0], app.config.listen_port));
    let router = build_router(&app);

    tracing::info!("listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

async fn init() -> eyre::Result<App> {
    let config = config::ServerConfig::new_from_env();

    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&config.database_url);
    let pool = Pool::builder(manager)
        .max_size(10)
        .build()
        .map_err(|e| eyre::eyre!("couldn't build the connection pool: {e}"))?;

    Ok(App {
        diesel: pool,
        config: Arc::new(config),
        tracker: Arc::new(ViewTracker::new()),
        public_limiter: Arc::new(RateLimiter::keyed(Quota::per_minute(
            NonZeroU32::new(10).expect("nonzero quota"),
        ))),
    })
}

fn build_router(app: &App) -> Router {
    let cors = match app
        .config
        .cors_origin
        .as_deref()
        .and_then(|origin| origin.parse::<HeaderValue>().ok())
    {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::permissive(),
    };

    Router::new()
        .nest(
            "/public/blog",
            blog::routes::route().merge(analytics::routes::route()),
        )
        .nest("/public", contact::route())
        .nest("/identity", identity::routes::route())
        .nest("/admin", admin::routes::route())
        .nest_service("/media", ServeDir::new(&app.config.media_dir))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app.clone())
}
