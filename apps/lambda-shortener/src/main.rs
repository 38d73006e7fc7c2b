//! lambda-shortener — AWS Lambda entrypoint for the link shortener.
//!
//! Purpose
//! - Handle API Gateway HTTP API (v2) events for the whole public surface:
//!   - `POST /` — create a short link under a random code.
//!   - `POST /createcustom` — create a short link under a caller-supplied code.
//!   - `GET /{code}` — resolve and redirect with `301` + `Location`.
//!   - `OPTIONS *` — CORS preflight no-op.
//!   - anything else — `405`.
//! - Use `LinkService` backed by the DynamoDB adapter; map domain errors to
//!   HTTP codes for API Gateway responses.
//!
//! Notes
//! - This crate depends only on the `domain` and `dynamo-store` adapter for data.
//! - It initializes minimal `tracing` logging compatible with Lambda CloudWatch.

use domain::alphabet::Alphabet;
use domain::codegen::RandomCodeGenerator;
use domain::service::{LinkService, ServiceConfig};
use domain::{Clock, CoreError, LinkStore};
use dynamo_store::DynamoStore;
use http_common::lambda::{get_host, resp, resp_with_error, with_cors};
use lambda_http::{run, service_fn, Body, Error, Request, Response};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// Generic over the store so the dispatch logic is exercisable without AWS.
struct AppState<S: LinkStore> {
    svc: Arc<LinkService<S, RandomCodeGenerator, StdClock>>,
}

impl<S: LinkStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            svc: Arc::clone(&self.svc),
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

#[derive(serde::Deserialize)]
struct CreateReq {
    url: String,
    #[serde(default)]
    code: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();
    // Build store from env; if it fails, crash early to surface misconfiguration.
    let store = DynamoStore::from_env().map_err(|e| format!("dynamo init error: {e}"))?;
    let mut config = ServiceConfig::new(std::env::var("BASE_URL").unwrap_or_default());
    if let Some(len) = std::env::var("CODE_LENGTH")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
    {
        config = config.with_code_length(len);
    }
    let state = AppState {
        svc: Arc::new(LinkService::new(
            store,
            RandomCodeGenerator::new(Alphabet::BASE62),
            StdClock,
            config,
        )),
    };

    let handler = service_fn(move |req: Request| {
        let st = state.clone();
        async move { handle_request(st, req).await }
    });
    run(handler).await?;
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stdout))
        .init();
}

async fn handle_request<S: LinkStore>(
    state: AppState<S>,
    req: Request,
) -> Result<Response<Body>, Error> {
    let method = req.method().as_str().to_string();
    match method.as_str() {
        "OPTIONS" => Ok(with_cors(resp(204, None, None))),
        "POST" => Ok(with_cors(handle_create(state, req))),
        "GET" => Ok(handle_resolve(state, req)),
        other => {
            warn!(method = %other, "unsupported method");
            Ok(with_cors(resp(
                405,
                None,
                Some(http_common::json_err("method_not_allowed")),
            )))
        }
    }
}

/// API Gateway HTTP API includes the stage prefix in rawPath (e.g.
/// /dev/abc123); the last segment is what routing decisions are made on.
fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or("")
}

fn handle_create<S: LinkStore>(state: AppState<S>, req: Request) -> Response<Body> {
    let is_custom = last_segment(req.uri().path()) == "createcustom";

    let body_str = match req.body() {
        Body::Empty => {
            return resp_with_error(400, "bad_request", "missing body");
        }
        Body::Text(s) => s.clone(),
        Body::Binary(b) => String::from_utf8(b.clone()).unwrap_or_default(),
        _ => String::new(),
    };

    let payload: CreateReq = match serde_json::from_str(&body_str) {
        Ok(p) => p,
        Err(_) => {
            return resp_with_error(400, "bad_request", "bad json");
        }
    };

    let result = if is_custom {
        let Some(ref code) = payload.code else {
            return resp_with_error(400, "bad_request", "missing code");
        };
        state.svc.create_custom(&payload.url, code)
    } else {
        state.svc.create(&payload.url)
    };

    match result {
        Ok(link) => {
            let short_url =
                http_common::build_short_url_from_host(get_host(&req), link.code.as_str());
            info!(code = %link.code.as_str(), custom = is_custom, "create ok");
            resp(
                200,
                None,
                Some(serde_json::json!({
                    "short_url": short_url,
                    "created_at": http_common::system_time_to_rfc3339(link.created_at),
                })),
            )
        }
        Err(e) => error_response(&e),
    }
}

fn handle_resolve<S: LinkStore>(state: AppState<S>, req: Request) -> Response<Body> {
    let raw_path = req.uri().path();
    let code = last_segment(raw_path);

    // Trailing-slash path with no segment is a caller error, not a miss.
    if code.is_empty() {
        warn!(path = %raw_path, "empty code in redirect");
        return resp(400, None, Some(http_common::json_err("bad_request")));
    }

    match state.svc.resolve(code) {
        Ok(long_url) => {
            info!(code = %code, redirect_to = %long_url, "resolve ok");
            resp(301, Some(("Location", long_url)), None)
        }
        Err(e) => {
            match &e {
                CoreError::NotFound => warn!(code = %code, "not found"),
                CoreError::InvalidCode(_) => warn!(code = %code, "invalid code"),
                other => error!(code = %code, err = ?other, "resolve error"),
            }
            error_response(&e)
        }
    }
}

fn error_response(e: &CoreError) -> Response<Body> {
    match e {
        CoreError::InvalidUrl(_) => resp_with_error(400, "bad_request", &e.to_string()),
        CoreError::InvalidCode(_) => resp_with_error(400, "invalid_code", &e.to_string()),
        CoreError::AlreadyExists => resp_with_error(409, "conflict", &e.to_string()),
        CoreError::NotFound => resp(404, None, Some(http_common::json_err("not_found"))),
        CoreError::CollisionExhausted | CoreError::Storage(_) => {
            error!(err = %e, "internal error");
            resp(500, None, Some(http_common::json_err("internal")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::adapters::memory_store::MemoryStore;

    fn test_state() -> AppState<MemoryStore> {
        AppState {
            svc: Arc::new(LinkService::new(
                MemoryStore::new(),
                RandomCodeGenerator::new(Alphabet::BASE62),
                StdClock,
                ServiceConfig::new("https://sho.rt"),
            )),
        }
    }

    fn request(method: &str, path: &str, body: Body) -> Request {
        lambda_http::http::Request::builder()
            .method(method)
            .uri(format!("https://sho.rt{path}"))
            .header("host", "sho.rt")
            .body(body)
            .unwrap()
    }

    fn body_json(resp: &Response<Body>) -> serde_json::Value {
        match resp.body() {
            Body::Text(s) => serde_json::from_str(s).unwrap(),
            other => panic!("expected text body, got {other:?}"),
        }
    }

    #[test]
    fn last_segment_strips_stage_prefix() {
        assert_eq!(last_segment("/dev/abc123"), "abc123");
        assert_eq!(last_segment("/abc123"), "abc123");
        assert_eq!(last_segment("/dev/createcustom"), "createcustom");
        assert_eq!(last_segment("/"), "");
        assert_eq!(last_segment("/abc123/"), "");
    }

    #[tokio::test]
    async fn options_preflight_is_a_cors_no_op() {
        let resp = handle_request(test_state(), request("OPTIONS", "/", Body::Empty))
            .await
            .unwrap();
        assert_eq!(resp.status(), 204);
        assert_eq!(
            resp.headers()
                .get("access-control-allow-origin")
                .and_then(|v| v.to_str().ok()),
            Some("*")
        );
    }

    #[tokio::test]
    async fn unsupported_method_gets_405() {
        let resp = handle_request(test_state(), request("DELETE", "/abc123", Body::Empty))
            .await
            .unwrap();
        assert_eq!(resp.status(), 405);
        let body = body_json(&resp);
        assert_eq!(body["error"]["code"], "method_not_allowed");
        assert!(resp.headers().contains_key("access-control-allow-origin"));
    }

    #[tokio::test]
    async fn create_then_redirect_through_dispatch() {
        let state = test_state();
        let create = request(
            "POST",
            "/",
            Body::Text(r#"{"url":"https://example.com/target"}"#.into()),
        );
        let resp = handle_request(state.clone(), create).await.unwrap();
        assert_eq!(resp.status(), 200);
        let body = body_json(&resp);
        let short_url = body["short_url"].as_str().unwrap();
        let code = short_url.rsplit('/').next().unwrap().to_string();
        assert!(!code.is_empty());

        let resolve = request("GET", &format!("/{code}"), Body::Empty);
        let resp = handle_request(state, resolve).await.unwrap();
        assert_eq!(resp.status(), 301);
        assert_eq!(
            resp.headers()
                .get("Location")
                .and_then(|v| v.to_str().ok()),
            Some("https://example.com/target")
        );
    }

    #[tokio::test]
    async fn create_with_bad_json_gets_400() {
        let resp = handle_request(
            test_state(),
            request("POST", "/", Body::Text("not json".into())),
        )
        .await
        .unwrap();
        assert_eq!(resp.status(), 400);
        assert_eq!(body_json(&resp)["error"]["code"], "bad_request");
    }
}
