//! Request middleware and the JSON body extractor.

use std::any::Any;
use std::net::SocketAddr;
use std::time::Instant;

use axum::async_trait;
use axum::body::Bytes;
use axum::extract::{ConnectInfo, FromRequest, Request};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ALLOW,
    CONTENT_TYPE,
};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use family_core::Person;
use serde_json::json;

use crate::error::ApiError;

pub const ALLOWED_METHODS: &str = "GET,POST,PUT,PATCH,DELETE,OPTIONS";
pub const ALLOWED_HEADERS: &str = "authorization, origin, content-type, accept";
const ALLOW_VERBS: &str = "HEAD,GET,POST,PUT,PATCH,DELETE,OPTIONS";

/// Log method, path, requester, status and latency of every request.
pub async fn log_requests(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let requester = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "-".to_string());

    let response = next.run(req).await;

    tracing::info!(
        method = %method,
        path = %path,
        requester = %requester,
        status = response.status().as_u16(),
        latency_ms = start.elapsed().as_millis() as u64,
        "Handled request"
    );
    response
}

/// Permissive CORS. Preflight `OPTIONS` requests are answered here and never
/// reach a handler.
pub async fn allow_origin_requests(req: Request, next: Next) -> Response {
    let mut response = if req.method() == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(req).await
    };

    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );
    headers.insert(ALLOW, HeaderValue::from_static(ALLOW_VERBS));
    response
}

/// Turn a handler panic into a JSON 500.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(panic = %detail, "Handler panicked");

    let body = json!({ "error": "Internal server error" }).to_string();
    let mut response = (StatusCode::INTERNAL_SERVER_ERROR, body).into_response();
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// A JSON-decoded `Person` request body. Malformed bodies are rejected with
/// 400 before the handler runs.
#[derive(Debug)]
pub struct PersonBody(pub Person);

#[async_trait]
impl<S> FromRequest<S> for PersonBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        let person = serde_json::from_slice(&bytes)
            .map_err(|e| ApiError::BadRequest(format!("Invalid person payload: {e}")))?;
        Ok(Self(person))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[tokio::test]
    async fn test_person_body_decodes() {
        let req = Request::builder()
            .body(Body::from(r#"{"name":"Alice","gender":"female"}"#))
            .unwrap();
        let PersonBody(person) = PersonBody::from_request(req, &()).await.unwrap();
        assert_eq!(person.name.as_deref(), Some("Alice"));
    }

    #[tokio::test]
    async fn test_person_body_rejects_malformed_json() {
        let req = Request::builder().body(Body::from("{name:")).unwrap();
        let err = PersonBody::from_request(req, &()).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_panic_becomes_json_500() {
        let response = handle_panic(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers()[CONTENT_TYPE],
            HeaderValue::from_static("application/json")
        );
    }
}
