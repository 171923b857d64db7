//! Request ID middleware for request tracing and correlation.
//!
//! Uses the caller's `x-request-id` when it is a short printable token,
//! otherwise generates a UUID v4. The ID is recorded on the `http_request`
//! span, tagged on the Sentry scope and echoed in the response headers.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest caller-supplied request ID we accept.
const MAX_REQUEST_ID_LEN: usize = 128;

fn accepted_request_id(value: &str) -> Option<&str> {
    let value = value.trim();
    let valid = !value.is_empty()
        && value.len() <= MAX_REQUEST_ID_LEN
        && value.bytes().all(|b| b.is_ascii_graphic());
    valid.then_some(value)
}

/// Middleware that ensures every request has a request ID.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(accepted_request_id)
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    Span::current().record("request_id", request_id.as_str());

    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
    });

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepted_request_id() {
        assert_eq!(accepted_request_id(" abc-123 "), Some("abc-123"));
        assert_eq!(accepted_request_id(""), None);
        assert_eq!(accepted_request_id("has space"), None);
        assert_eq!(accepted_request_id(&"x".repeat(129)), None);
    }
}
