use axum::http::{header, HeaderName, HeaderValue};

const X_REQUEST_ID: &str = "x-request-id";

/// Middleware: tags every response with an `x-request-id` so clients can
/// correlate failures with gateway logs. An id supplied by the caller is
/// echoed back unchanged.
pub async fn request_id(
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let incoming = req.headers().get(X_REQUEST_ID).cloned();
    let mut resp = next.run(req).await;
    let value = incoming
        .or_else(|| HeaderValue::from_str(&uuid::Uuid::new_v4().to_string()).ok());
    if let Some(value) = value {
        resp.headers_mut()
            .insert(HeaderName::from_static(X_REQUEST_ID), value);
    }
    resp
}

/// Middleware: hardening headers for an API that handles credentials.
pub async fn security_headers(
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let mut resp = next.run(req).await;
    let headers = resp.headers_mut();

    headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    // responses may describe keys; keep them out of shared caches
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(header::REFERRER_POLICY, HeaderValue::from_static("no-referrer"));
    headers.remove(header::SERVER);

    resp
}
