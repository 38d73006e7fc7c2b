//! api-server — Local development HTTP API for the link shortener workspace.
//!
//! Exposes the full public surface against local storage:
//! - `POST /` — create a short link under a random code.
//! - `POST /createcustom` — create a short link under a custom code.
//! - `GET /{code}` — resolve and redirect (301 + Location).
//! - CORS preflight is answered by the CORS layer.
//!
//! Storage: In-memory (default) or SQLite (file) when the `sqlite` feature is
//! enabled; DynamoDB behind the `dynamo` feature.
//!
//! Run:
//! ```bash
//! # pretty logs (default); PORT optional
//! cargo run -p api-server
//!
//! # with SQLite storage
//! STORAGE_PROVIDER=sqlite DB_PATH=./data/links.db cargo run -p api-server
//! ```
//!
//! Configuration: See `config.rs` for all environment variables.

mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use domain::adapters::memory_store::MemoryStore;
use domain::alphabet::Alphabet;
use domain::codegen::RandomCodeGenerator;
use domain::service::{LinkService, ServiceConfig};
use domain::{Clock, Code, CoreError, Link, LinkStore, PutMode};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use config::{Config, LogFormat, StorageProvider};

// Local store abstraction supporting memory or sqlite/dynamo (feature-gated).
enum StoreKind {
    Memory(MemoryStore),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite_store::SqliteStore),
    #[cfg(feature = "dynamo")]
    Dynamo(dynamo_store::DynamoStore),
}

#[derive(Clone)]
struct AnyStore {
    kind: Arc<StoreKind>,
}

impl AnyStore {
    fn memory() -> Self {
        Self {
            kind: Arc::new(StoreKind::Memory(MemoryStore::new())),
        }
    }

    #[cfg(feature = "sqlite")]
    fn sqlite(path: &std::path::Path) -> Result<Self, CoreError> {
        if let Some(dir) = path.parent() {
            let _ = std::fs::create_dir_all(dir);
        }
        Ok(Self {
            kind: Arc::new(StoreKind::Sqlite(sqlite_store::SqliteStore::new(path)?)),
        })
    }

    #[cfg(feature = "dynamo")]
    fn dynamo_from_env() -> Result<Self, CoreError> {
        Ok(Self {
            kind: Arc::new(StoreKind::Dynamo(dynamo_store::DynamoStore::from_env()?)),
        })
    }
}

impl LinkStore for AnyStore {
    fn put(&self, link: Link, mode: PutMode) -> Result<(), CoreError> {
        match &*self.kind {
            StoreKind::Memory(s) => s.put(link, mode),
            #[cfg(feature = "sqlite")]
            StoreKind::Sqlite(s) => s.put(link, mode),
            #[cfg(feature = "dynamo")]
            StoreKind::Dynamo(s) => s.put(link, mode),
        }
    }

    fn get_by_code(&self, code: &Code) -> Result<Option<Link>, CoreError> {
        match &*self.kind {
            StoreKind::Memory(s) => s.get_by_code(code),
            #[cfg(feature = "sqlite")]
            StoreKind::Sqlite(s) => s.get_by_code(code),
            #[cfg(feature = "dynamo")]
            StoreKind::Dynamo(s) => s.get_by_code(code),
        }
    }
}

#[derive(Clone)]
struct StdClock;
impl Clock for StdClock {
    fn now(&self) -> std::time::SystemTime {
        std::time::SystemTime::now()
    }
}

type Service = LinkService<AnyStore, RandomCodeGenerator, StdClock>;

#[derive(Clone)]
struct AppState {
    svc: Arc<Service>,
}

#[derive(Deserialize)]
struct CreateReq {
    url: String,
    #[serde(default)]
    code: Option<String>,
}

#[derive(Serialize)]
struct CreateResp {
    short_url: String,
    created_at: String,
}

fn created_response(state: &AppState, link: Link) -> Response {
    let body = CreateResp {
        short_url: state.svc.short_url(&link.code),
        created_at: http_common::system_time_to_rfc3339(link.created_at),
    };
    (StatusCode::OK, Json(body)).into_response()
}

fn error_response(e: &CoreError) -> Response {
    let (status, code) = match e {
        CoreError::InvalidUrl(_) => (StatusCode::BAD_REQUEST, "bad_request"),
        CoreError::InvalidCode(_) => (StatusCode::BAD_REQUEST, "invalid_code"),
        CoreError::AlreadyExists => (StatusCode::CONFLICT, "conflict"),
        CoreError::NotFound => (StatusCode::NOT_FOUND, "not_found"),
        CoreError::CollisionExhausted | CoreError::Storage(_) => {
            error!(err = %e, "internal error");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal")
        }
    };
    (
        status,
        Json(http_common::json_error_with_message(code, &e.to_string())),
    )
        .into_response()
}

// The default Json rejection is a 422; the error taxonomy only knows 400
// for malformed input, so rejections are mapped by hand.
fn unwrap_body(payload: Result<Json<CreateReq>, JsonRejection>) -> Result<CreateReq, Response> {
    payload.map(|Json(p)| p).map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(http_common::json_error_with_message(
                "bad_request",
                "bad json",
            )),
        )
            .into_response()
    })
}

async fn create_link(
    State(state): State<AppState>,
    payload: Result<Json<CreateReq>, JsonRejection>,
) -> Response {
    let payload = match unwrap_body(payload) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    match state.svc.create(&payload.url) {
        Ok(link) => {
            info!(code = %link.code.as_str(), "create ok");
            created_response(&state, link)
        }
        Err(e) => error_response(&e),
    }
}

async fn create_custom_link(
    State(state): State<AppState>,
    payload: Result<Json<CreateReq>, JsonRejection>,
) -> Response {
    let payload = match unwrap_body(payload) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let Some(ref code) = payload.code else {
        return (
            StatusCode::BAD_REQUEST,
            Json(http_common::json_error_with_message(
                "bad_request",
                "missing code",
            )),
        )
            .into_response();
    };
    match state.svc.create_custom(&payload.url, code) {
        Ok(link) => {
            info!(code = %link.code.as_str(), "custom create ok");
            created_response(&state, link)
        }
        Err(e) => error_response(&e),
    }
}

async fn redirect_link(State(state): State<AppState>, Path(code): Path<String>) -> Response {
    match state.svc.resolve(&code) {
        Ok(long_url) => {
            info!(code = %code, redirect_to = %long_url, "resolve ok");
            (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, long_url)]).into_response()
        }
        Err(e) => error_response(&e),
    }
}

fn build_router(state: AppState, cors_allow_origin: HeaderValue) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(cors_allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", post(create_link))
        .route("/createcustom", post(create_custom_link))
        .route("/:code", get(redirect_link))
        .layer(cors)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

fn init_tracing(format: &LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer())
            .init(),
    }
}

fn build_store(config: &Config) -> Result<AnyStore, CoreError> {
    match config.storage_provider {
        StorageProvider::Memory => Ok(AnyStore::memory()),
        StorageProvider::Sqlite => {
            #[cfg(feature = "sqlite")]
            {
                AnyStore::sqlite(&config.db_path)
            }
            #[cfg(not(feature = "sqlite"))]
            {
                Err(CoreError::Storage(
                    "built without the sqlite feature".into(),
                ))
            }
        }
        StorageProvider::Dynamo => {
            #[cfg(feature = "dynamo")]
            {
                AnyStore::dynamo_from_env()
            }
            #[cfg(not(feature = "dynamo"))]
            {
                Err(CoreError::Storage(
                    "built without the dynamo feature".into(),
                ))
            }
        }
    }
}

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };
    init_tracing(&config.log_format);

    let store = match build_store(&config) {
        Ok(s) => s,
        Err(e) => {
            error!(err = %e, "storage init failed");
            std::process::exit(1);
        }
    };

    let svc_config =
        ServiceConfig::new(config.base_url.clone()).with_code_length(config.code_length);
    let state = AppState {
        svc: Arc::new(LinkService::new(
            store,
            RandomCodeGenerator::new(Alphabet::BASE62),
            StdClock,
            svc_config,
        )),
    };

    let app = build_router(state, config.cors_allow_origin.clone());
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(%addr, storage = ?config.storage_provider, base_url = %config.base_url, "listening");

    match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => {
            if let Err(e) = axum::serve(listener, app).await {
                error!(err = %e, "server error");
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!(err = %e, "bind failed");
            std::process::exit(1);
        }
    }
}
