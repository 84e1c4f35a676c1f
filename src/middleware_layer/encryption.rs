use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sonic_rs::JsonValueTrait;

use crate::{
    crypto::envelope::CipherEnvelope,
    error::{AppError, failure_response},
    state::AppState,
};

/// Paths containing this marker are exchanged in clear in both directions.
pub const AUTH_ROUTE_MARKER: &str = "/auth";
/// The request-body field carrying an encrypted payload.
pub const ENCRYPTED_DATA_FIELD: &str = "encryptedData";

/// Returns `true` for the authentication route group.
pub fn is_auth_route(path: &str) -> bool {
    path.contains(AUTH_ROUTE_MARKER)
}

/// Returns `true` for methods that carry no meaningful request body.
pub fn is_safe_method(method: &Method) -> bool {
    method == Method::GET || method == Method::HEAD || method == Method::OPTIONS
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"))
}

fn with_body<T>(mut parts: http::request::Parts, body: T) -> Request
where
    T: Into<Bytes>,
{
    let body: Bytes = body.into();
    parts.headers.insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));
    Request::from_parts(parts, Body::from(body))
}

/// Returns `true` for marker values that count as absent: `null`, `false`, `0` and `""`.
fn is_blank_marker(value: &sonic_rs::Value) -> bool {
    value.is_null()
        || value.as_bool() == Some(false)
        || value.as_str() == Some("")
        || value.as_i64() == Some(0)
        || value.as_f64() == Some(0.0)
}

/// Opens an `{"encryptedData": "<hex>"}` body.
///
/// Returns `Ok(None)` when the body is not a JSON object carrying a non-blank
/// marker, so ordinary clear bodies pass through untouched.
pub fn open_request_body(cipher: &CipherEnvelope, body: &[u8]) -> Result<Option<String>, AppError> {
    let Ok(value) = sonic_rs::from_slice::<sonic_rs::Value>(body) else {
        return Ok(None);
    };
    if !value.is_object() {
        return Ok(None);
    }
    let Some(field) = value.get(ENCRYPTED_DATA_FIELD) else {
        return Ok(None);
    };
    if is_blank_marker(field) {
        return Ok(None);
    }

    let envelope = field.as_str().ok_or_else(|| {
        AppError::MalformedEncryptedBody(format!("{} is not a string", ENCRYPTED_DATA_FIELD))
    })?;

    let plaintext = cipher
        .decrypt(envelope)
        .map_err(|e| AppError::MalformedEncryptedBody(e.to_string()))?;

    sonic_rs::from_str::<sonic_rs::Value>(&plaintext)
        .map_err(|e| AppError::MalformedEncryptedBody(format!("decrypted body is not JSON: {}", e)))?;

    Ok(Some(plaintext))
}

/// Inbound stage: replaces an encrypted request body with its decrypted JSON.
///
/// Safe methods and the authentication route group are passed through
/// without reading the body.
pub async fn decrypt_request(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if is_safe_method(req.method()) || is_auth_route(req.uri().path()) {
        return next.run(req).await;
    }

    let (mut parts, body) = req.into_parts();
    let bytes = match axum::body::to_bytes(body, state.config.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(_) => return AppError::PayloadTooLarge.into_response(),
    };

    match open_request_body(&state.cipher, &bytes) {
        Ok(Some(plaintext)) => {
            tracing::debug!("🔓 Request body decrypted for {}", parts.uri.path());
            parts
                .headers
                .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
            next.run(with_body(parts, plaintext)).await
        }
        Ok(None) => next.run(with_body(parts, bytes)).await,
        Err(e) => e.into_response(),
    }
}

/// The body substituted whenever the outbound stage cannot seal a response.
pub fn encryption_failed() -> Response {
    failure_response(StatusCode::INTERNAL_SERVER_ERROR, "Response encryption failed")
}

/// Seals a successful JSON response into `{"success":true,"encrypted":true,"data":"<hex>"}`.
///
/// Non-JSON responses and responses whose `success` is not `true` are
/// returned unchanged. Any failure yields [`encryption_failed`], never the
/// original plaintext.
pub async fn seal_response(cipher: &CipherEnvelope, response: Response) -> Response {
    if !is_json(response.headers()) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!("Response encryption error: unreadable body: {}", e);
            return encryption_failed();
        }
    };

    let value: sonic_rs::Value = match sonic_rs::from_slice(&bytes) {
        Ok(value) => value,
        Err(e) => {
            tracing::error!("Response encryption error: body is not JSON: {}", e);
            return encryption_failed();
        }
    };

    let succeeded = value.get("success").and_then(|v| v.as_bool()) == Some(true);
    if !succeeded {
        return Response::from_parts(parts, Body::from(bytes));
    }

    let envelope = match cipher.encrypt_json(&value) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::error!("Response encryption error: {}", e);
            return encryption_failed();
        }
    };

    let sealed = match sonic_rs::to_string(&sonic_rs::json!({
        "success": true,
        "encrypted": true,
        "data": envelope
    })) {
        Ok(sealed) => sealed,
        Err(e) => {
            tracing::error!("Response encryption error: {}", e);
            return encryption_failed();
        }
    };

    parts.headers.remove(header::CONTENT_LENGTH);
    parts
        .headers
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    tracing::debug!("🔒 Response encrypted");
    Response::from_parts(parts, Body::from(sealed))
}

/// Outbound stage: encrypts successful responses outside the authentication route group.
pub async fn encrypt_response(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let bypass = is_auth_route(req.uri().path());
    let response = next.run(req).await;
    if bypass {
        return response;
    }
    seal_response(&state.cipher, response).await
}
