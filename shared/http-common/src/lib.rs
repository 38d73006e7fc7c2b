//! Shared HTTP utilities for the link shortener workspace.
//!
//! Provides common response builders and utility functions used across
//! api-server and lambda-shortener.

use chrono::{DateTime, SecondsFormat, Utc};
use std::time::SystemTime;

// ============================================================================
// JSON Response Helpers (framework-agnostic)
// ============================================================================

/// Create a structured error JSON with a default message based on the code.
///
/// Returns: `{"error": {"code": "<code>", "message": "<default message>"}}`
pub fn json_err(code: &str) -> serde_json::Value {
    let message = match code {
        "not_found" => "Code not found",
        "bad_request" => "Bad request",
        "invalid_code" => "Invalid code format",
        "conflict" => "Code already taken",
        "method_not_allowed" => "Method not allowed",
        "error" | "internal" => "Internal server error",
        _ => code, // Fallback to code as message for unknown codes
    };
    serde_json::json!({"error": {"code": code, "message": message}})
}

/// Create a structured error JSON with a custom message.
///
/// Returns: `{"error": {"code": "<code>", "message": "<message>"}}`
pub fn json_error_with_message(code: &str, message: &str) -> serde_json::Value {
    serde_json::json!({"error": {"code": code, "message": message}})
}

// ============================================================================
// URL Building
// ============================================================================

/// Build a short URL from a host and code.
///
/// If `BASE_URL` env var is set and non-empty, uses that as the base.
/// Otherwise falls back to `https://{host}/{code}` or `/{code}` if host is empty.
pub fn build_short_url_from_host(host: &str, code: &str) -> String {
    if let Ok(base) = std::env::var("BASE_URL") {
        if !base.is_empty() {
            return format!("{}/{}", base.trim_end_matches('/'), code);
        }
    }
    if host.is_empty() {
        format!("/{}", code)
    } else {
        format!("https://{}/{}", host, code)
    }
}

// ============================================================================
// Time Utilities
// ============================================================================

/// Convert SystemTime to RFC3339 string (seconds precision, UTC).
pub fn system_time_to_rfc3339(t: SystemTime) -> String {
    let dt: DateTime<Utc> = t.into();
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

// ============================================================================
// Lambda HTTP Helpers (feature-gated)
// ============================================================================

#[cfg(feature = "lambda")]
pub mod lambda {
    //! Lambda-specific HTTP response builders using `lambda_http` types.

    use lambda_http::{Body, Response};

    /// Build an HTTP response with optional header and JSON body.
    ///
    /// # Panics
    /// Panics if JSON serialization or response construction fails (should not happen
    /// for well-formed JSON values).
    pub fn resp(
        status: u16,
        header: Option<(&str, String)>,
        body_json: Option<serde_json::Value>,
    ) -> Response<Body> {
        let mut rb = Response::builder().status(status);
        if let Some((k, v)) = header {
            rb = rb.header(k, v);
        }
        if let Some(val) = body_json {
            rb.header("content-type", "application/json")
                .body(Body::Text(
                    serde_json::to_string(&val).expect("JSON value serialization"),
                ))
                .expect("response body construction")
        } else {
            rb.body(Body::Empty)
                .expect("empty response body construction")
        }
    }

    /// Build an error response with status code and structured error body.
    pub fn resp_with_error(status: u16, code: &str, message: &str) -> Response<Body> {
        let body = crate::json_error_with_message(code, message);
        resp(status, None, Some(body))
    }

    /// Add CORS headers to a response.
    ///
    /// Uses `CORS_ALLOW_ORIGIN` env var, defaulting to `*`.
    pub fn with_cors(mut resp: Response<Body>) -> Response<Body> {
        use http::header::{HeaderName, HeaderValue};
        let headers = resp.headers_mut();
        let allow_origin =
            std::env::var("CORS_ALLOW_ORIGIN").unwrap_or_else(|_| "*".to_string());
        headers.insert(
            HeaderName::from_static("access-control-allow-origin"),
            HeaderValue::from_str(&allow_origin).unwrap_or(HeaderValue::from_static("*")),
        );
        headers.insert(
            HeaderName::from_static("access-control-allow-headers"),
            HeaderValue::from_static("content-type"),
        );
        headers.insert(
            HeaderName::from_static("access-control-allow-methods"),
            HeaderValue::from_static("OPTIONS, GET, POST"),
        );
        resp
    }

    /// Extract the Host header value from a Lambda request.
    pub fn get_host(req: &lambda_http::Request) -> &str {
        req.headers()
            .get("host")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    }
}
