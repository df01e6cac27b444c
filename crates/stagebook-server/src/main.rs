use axum::{http::HeaderValue, routing::get, Json, Router};
use serde::Serialize;
use stagebook_db::{AppState, BlobConfig, ServerConfig, StoreConfig};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod api;

#[derive(Serialize)]
struct ApiStatus {
    status: &'static str,
    version: &'static str,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let server_config = ServerConfig::from_env().expect("invalid server configuration");
    let store_config = StoreConfig::from_env().expect("invalid store configuration");
    let blob_config = BlobConfig::from_env().expect("invalid image storage configuration");

    tracing::info!(
        backend = store_config.backend_name(),
        environment = %server_config.environment,
        "connecting to key-value store..."
    );
    let kv = store_config
        .connect()
        .await
        .expect("failed to connect to key-value store");
    let blobs = blob_config
        .build()
        .expect("failed to initialize image storage");

    let state = Arc::new(AppState::new(kv, blobs, &server_config));

    let cors = {
        let methods = [
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PATCH,
            axum::http::Method::OPTIONS,
        ];
        if server_config.cors_origins.is_empty() {
            tracing::warn!("CORS_ORIGINS not set, cross-origin requests are refused. Set CORS_ORIGINS=http://localhost:3000 for dev.");
            CorsLayer::new().allow_methods(methods)
        } else {
            let origins: Vec<HeaderValue> = server_config
                .cors_origins
                .iter()
                .filter_map(|s| HeaderValue::from_str(s).ok())
                .collect();
            tracing::info!("CORS allowed origins: {:?}", origins);
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(methods)
                .allow_headers(tower_http::cors::Any)
        }
    };

    let mut app = Router::new()
        .route("/healthz", get(healthz))
        .nest("/api", api::routes());

    // Locally stored images are served by this process
    if let Some((mount, path)) = blob_config.local_mount() {
        let mount = mount.trim_end_matches('/');
        if mount.is_empty() {
            tracing::warn!("UPLOAD_PUBLIC_URL is the site root, uploaded images are not served");
        } else {
            tracing::info!(%mount, path = %path.display(), "serving uploaded images");
            app = app.nest_service(mount, ServeDir::new(path));
        }
    }

    let app = app
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .with_state(state);

    let addr = server_config.bind;
    tracing::info!(%addr, "server started");

    axum::serve(
        tokio::net::TcpListener::bind(addr)
            .await
            .expect("failed to bind listener"),
        app,
    )
    .await
    .expect("server error");
}

async fn healthz() -> Json<ApiStatus> {
    Json(ApiStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
