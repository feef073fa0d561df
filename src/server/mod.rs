//! HTTP surface: the page, the submission endpoints and the `/api` relay.

mod logging;
mod page;
mod relay;
mod tryon;

use std::sync::Arc;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{error, info};

use crate::config::Config;
use crate::status::StatusChecker;
use crate::transform::TransformClient;
use crate::upload::UploadResolver;

pub use relay::{CorsHeaders, PROXY_ERROR};

pub struct AppState {
    pub config: Config,
    /// Relay client; carries the upstream timeout.
    pub relay_http: reqwest::Client,
    pub cors: CorsHeaders,
    pub resolver: Arc<UploadResolver>,
    pub client: TransformClient,
    pub status: StatusChecker,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::new();
        let relay_http = reqwest::Client::builder()
            .timeout(config.relay.timeout)
            .build()
            .context("building relay HTTP client")?;
        let cors = CorsHeaders {
            allow_methods: HeaderValue::from_str(&config.relay.allow_methods).context("CORS_ALLOW_METHODS")?,
            allow_headers: HeaderValue::from_str(&config.relay.allow_headers).context("CORS_ALLOW_HEADERS")?,
        };
        let resolver = Arc::new(UploadResolver::from_config(&config.upload, http.clone()));
        let client = TransformClient::new(http.clone(), &config.client);
        let status = StatusChecker::new(http, &config.relay.upstream_base_url, client.endpoint());

        info!("upload backends: {:?}", resolver.backend_names());
        Ok(Self {
            config,
            relay_http,
            cors,
            resolver,
            client,
            status,
        })
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let app_routes = Router::new()
        .route("/", get(page::index))
        .route("/health", get(tryon::handle_health))
        .route("/status", get(tryon::handle_status))
        .route("/tryon", post(tryon::handle_submit))
        .route("/tryon/demo", post(tryon::handle_demo))
        .layer(CorsLayer::permissive());

    let relay_routes = Router::new().route(
        "/api/*path",
        post(relay::handle_forward).options(relay::handle_preflight),
    );

    let mut router = Router::new().merge(app_routes).merge(relay_routes);
    if let Some(dir) = &state.config.static_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .layer(axum::middleware::from_fn(logging::logging_middleware))
        .with_state(state)
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr = config.listen_addr();
    let upstream = config.relay.upstream_base_url.clone();
    let state = Arc::new(AppState::new(config)?);
    let app = build_router(state);

    let listener = TcpListener::bind(addr).await.with_context(|| format!("binding {addr}"))?;

    info!("🚀 Server running on http://{}", addr);
    info!("🔁 Proxying /api/* to {}/api/*", upstream);

    axum::serve(listener, app).await.map_err(|err| {
        error!("HTTP server terminated unexpectedly addr={} error={}", addr, err);
        anyhow::Error::from(err)
    })
}
