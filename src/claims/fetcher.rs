// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! GraphQL fetcher for custom claims.
//!
//! Sends the compiled claims query for one user and returns the `user`
//! object from the response. Requests carry `Content-Type` and `Accept`
//! headers plus anything added by the configured interceptors (typically
//! the admin secret). Gzip-encoded responses are decompressed. Bodies are
//! capped at [`MAX_RESPONSE_BYTES`] both on the wire and after decompression.
//!
//! There is no retry: a failed fetch is reported to the caller, which
//! decides whether to degrade.

use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use flate2::read::GzDecoder;
use reqwest::header::{ACCEPT, CONTENT_ENCODING, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Map, Value};
use url::Url;

use super::error::{ClaimsConfigError, FetchError};

/// Default timeout for a claims request.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Largest response body accepted, before and after decompression.
pub const MAX_RESPONSE_BYTES: usize = 4 * 1024 * 1024;

/// Header carrying the Hasura admin secret.
pub const ADMIN_SECRET_HEADER: &str = "X-Hasura-Admin-Secret";

/// Field of `data` holding the user entity.
pub const ENTITY_FIELD: &str = "user";

/// Hook applied to every outgoing claims request.
pub trait RequestInterceptor: Send + Sync {
    fn intercept(&self, request: RequestBuilder) -> RequestBuilder;
}

impl<F> RequestInterceptor for F
where
    F: Fn(RequestBuilder) -> RequestBuilder + Send + Sync,
{
    fn intercept(&self, request: RequestBuilder) -> RequestBuilder {
        self(request)
    }
}

/// Adds the Hasura admin secret header.
pub struct AdminSecretInterceptor {
    secret: String,
}

impl AdminSecretInterceptor {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl RequestInterceptor for AdminSecretInterceptor {
    fn intercept(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(ADMIN_SECRET_HEADER, &self.secret)
    }
}

/// HTTP client for the claims endpoint.
#[derive(Clone)]
pub struct ClaimsFetcher {
    graphql_url: Url,
    http: Client,
    interceptors: Vec<Arc<dyn RequestInterceptor>>,
}

impl std::fmt::Debug for ClaimsFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaimsFetcher")
            .field("graphql_url", &self.graphql_url.as_str())
            .field("interceptors", &self.interceptors.len())
            .finish()
    }
}

impl ClaimsFetcher {
    /// Create a fetcher with the default timeout.
    pub fn new(graphql_url: &str) -> Result<Self, ClaimsConfigError> {
        Self::with_timeout(graphql_url, DEFAULT_FETCH_TIMEOUT)
    }

    pub fn with_timeout(graphql_url: &str, timeout: Duration) -> Result<Self, ClaimsConfigError> {
        let url = Url::parse(graphql_url).map_err(|e| ClaimsConfigError::InvalidUrl {
            url: graphql_url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClaimsConfigError::InvalidUrl {
                url: graphql_url.to_string(),
                reason: "scheme must be http or https".to_string(),
            });
        }

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClaimsConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            graphql_url: url,
            http,
            interceptors: Vec::new(),
        })
    }

    /// Add a request interceptor. Interceptors run in insertion order.
    pub fn with_interceptor(mut self, interceptor: impl RequestInterceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Run `query` for `user_id` and return the user entity.
    ///
    /// Dropping the returned future aborts the request and releases the
    /// connection.
    pub async fn fetch_entity(
        &self,
        query: &str,
        user_id: &str,
    ) -> Result<Map<String, Value>, FetchError> {
        let body = serde_json::to_vec(&json!({
            "query": query,
            "variables": { "id": user_id },
        }))
        .map_err(|e| FetchError::Encode(e.to_string()))?;

        let mut request = self
            .http
            .post(self.graphql_url.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(body);

        for interceptor in &self.interceptors {
            request = interceptor.intercept(request);
        }

        let mut response = request
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        let gzipped = response
            .headers()
            .get(CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("gzip"));

        if response
            .content_length()
            .is_some_and(|len| len > MAX_RESPONSE_BYTES as u64)
        {
            return Err(FetchError::ResponseTooLarge(MAX_RESPONSE_BYTES));
        }

        let mut raw = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?
        {
            if raw.len() + chunk.len() > MAX_RESPONSE_BYTES {
                return Err(FetchError::ResponseTooLarge(MAX_RESPONSE_BYTES));
            }
            raw.extend_from_slice(&chunk);
        }

        let body = if gzipped {
            gunzip(&raw, MAX_RESPONSE_BYTES)?
        } else {
            raw
        };

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        let envelope: Value =
            serde_json::from_slice(&body).map_err(|e| FetchError::Decode(e.to_string()))?;

        unwrap_entity(envelope)
    }
}

/// Decompress `raw`, refusing output larger than `limit`.
fn gunzip(raw: &[u8], limit: usize) -> Result<Vec<u8>, FetchError> {
    let mut decoded = Vec::new();
    GzDecoder::new(raw)
        .take(limit as u64 + 1)
        .read_to_end(&mut decoded)
        .map_err(|e| FetchError::Decompress(e.to_string()))?;
    if decoded.len() > limit {
        return Err(FetchError::Decompress(format!(
            "decompressed body exceeds {limit} bytes"
        )));
    }
    Ok(decoded)
}

/// `{"data": {"user": {...}}}` to the inner object. Both levels must be
/// objects.
fn unwrap_entity(envelope: Value) -> Result<Map<String, Value>, FetchError> {
    let Value::Object(mut top) = envelope else {
        return Err(FetchError::MissingData);
    };
    let Some(Value::Object(mut data)) = top.remove("data") else {
        return Err(FetchError::MissingData);
    };
    match data.remove(ENTITY_FIELD) {
        Some(Value::Object(entity)) => Ok(entity),
        _ => Err(FetchError::MissingEntity(ENTITY_FIELD)),
    }
}


#[cfg(test)]
mod tests {
    use super::test_server::{spawn, Endpoint};
    use super::*;
    use axum::http::StatusCode;

    const QUERY: &str = "query GetClaims($id: uuid!) { user(id:$id) {m{k }} }";

    #[tokio::test]
    async fn fetches_entity_and_sends_headers() {
        let endpoint = Endpoint::ok(json!({"data": {"user": {"m": {"k": "v"}}}}));
        let url = spawn(endpoint.clone()).await;

        let fetcher = ClaimsFetcher::new(&url)
            .unwrap()
            .with_interceptor(AdminSecretInterceptor::new("s3cret"));
        let entity = fetcher.fetch_entity(QUERY, "user-1").await.unwrap();
        assert_eq!(Value::Object(entity), json!({"m": {"k": "v"}}));

        let headers = endpoint.seen_headers.lock().unwrap().clone().unwrap();
        assert_eq!(headers["content-type"], "application/json");
        assert_eq!(headers["accept"], "application/json");
        assert_eq!(headers["x-hasura-admin-secret"], "s3cret");

        let body = endpoint.seen_body.lock().unwrap().clone().unwrap();
        assert_eq!(body, json!({"query": QUERY, "variables": {"id": "user-1"}}));
    }

    #[tokio::test]
    async fn closures_are_interceptors() {
        let endpoint = Endpoint::ok(json!({"data": {"user": {}}}));
        let url = spawn(endpoint.clone()).await;

        let fetcher = ClaimsFetcher::new(&url)
            .unwrap()
            .with_interceptor(|req: RequestBuilder| req.header("x-request-source", "auth"));
        fetcher.fetch_entity(QUERY, "user-1").await.unwrap();

        let headers = endpoint.seen_headers.lock().unwrap().clone().unwrap();
        assert_eq!(headers["x-request-source"], "auth");
    }

    #[tokio::test]
    async fn decompresses_gzip_responses() {
        let mut endpoint = Endpoint::ok(json!({"data": {"user": {"k": 1}}}));
        endpoint.gzip = true;
        let url = spawn(endpoint).await;

        let entity = ClaimsFetcher::new(&url)
            .unwrap()
            .fetch_entity(QUERY, "user-1")
            .await
            .unwrap();
        assert_eq!(entity["k"], json!(1));
    }

    #[tokio::test]
    async fn non_success_status_captures_body() {
        let mut endpoint = Endpoint::ok(json!({"errors": [{"message": "denied"}]}));
        endpoint.status = StatusCode::FORBIDDEN;
        endpoint.gzip = true;
        let url = spawn(endpoint).await;

        let err = ClaimsFetcher::new(&url)
            .unwrap()
            .fetch_entity(QUERY, "user-1")
            .await
            .unwrap_err();
        match err {
            FetchError::Status { status, body } => {
                assert_eq!(status, 403);
                assert!(body.contains("denied"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_levels_are_errors() {
        let url = spawn(Endpoint::ok(json!({"errors": []}))).await;
        let err = ClaimsFetcher::new(&url)
            .unwrap()
            .fetch_entity(QUERY, "user-1")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::MissingData));

        let url = spawn(Endpoint::ok(json!({"data": {"user": null}}))).await;
        let err = ClaimsFetcher::new(&url)
            .unwrap()
            .fetch_entity(QUERY, "user-1")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::MissingEntity("user")));
    }

    #[tokio::test]
    async fn transport_failure_is_reported() {
        // Bind and drop to get a port nobody listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = ClaimsFetcher::with_timeout(&format!("http://{addr}/v1/graphql"), Duration::from_secs(2))
            .unwrap()
            .fetch_entity(QUERY, "user-1")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }

    #[tokio::test]
    async fn timeout_aborts_slow_request() {
        let mut endpoint = Endpoint::ok(json!({"data": {"user": {}}}));
        endpoint.delay = Some(Duration::from_secs(5));
        let url = spawn(endpoint).await;

        let started = std::time::Instant::now();
        let err = ClaimsFetcher::with_timeout(&url, Duration::from_millis(300))
            .unwrap()
            .fetch_entity(QUERY, "user-1")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn malformed_body_is_decode_error() {
        let mut endpoint = Endpoint::ok(Value::Null);
        endpoint.raw_body = Some(b"not json".to_vec());
        let url = spawn(endpoint).await;

        let err = ClaimsFetcher::new(&url)
            .unwrap()
            .fetch_entity(QUERY, "user-1")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let mut endpoint = Endpoint::ok(Value::Null);
        endpoint.raw_body = Some(vec![b' '; MAX_RESPONSE_BYTES + 1]);
        let url = spawn(endpoint).await;

        let err = ClaimsFetcher::new(&url)
            .unwrap()
            .fetch_entity(QUERY, "user-1")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::ResponseTooLarge(MAX_RESPONSE_BYTES)));
    }

    #[test]
    fn gunzip_stops_at_limit() {
        use flate2::{write::GzEncoder, Compression};
        use std::io::Write;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(&vec![0u8; 64 * 1024]).unwrap();
        let compressed = encoder.finish().unwrap();
        assert!(compressed.len() < 1024);

        let err = gunzip(&compressed, 1024).unwrap_err();
        assert!(matches!(err, FetchError::Decompress(_)));
        assert_eq!(gunzip(&compressed, 64 * 1024).unwrap().len(), 64 * 1024);
    }

    #[test]
    fn rejects_bad_urls() {
        assert!(matches!(
            ClaimsFetcher::new("not a url"),
            Err(ClaimsConfigError::InvalidUrl { .. })
        ));
        assert!(matches!(
            ClaimsFetcher::new("ftp://example.com/graphql"),
            Err(ClaimsConfigError::InvalidUrl { .. })
        ));
    }
}
