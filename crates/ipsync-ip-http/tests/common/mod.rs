//! Shared helpers for IP endpoint tests
//!
//! Endpoints are served by a `wiremock` server with request recording on.

#![allow(dead_code)]

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Answer `GET endpoint` with `response`
pub async fn serve(server: &MockServer, endpoint: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(endpoint))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Answer `GET endpoint` with a 200 plain-text body
pub async fn serve_text(server: &MockServer, endpoint: &str, body: &str) {
    serve(server, endpoint, ResponseTemplate::new(200).set_body_string(body)).await;
}

/// Number of requests the server has seen
pub async fn request_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .map(|requests| requests.len())
        .unwrap_or_default()
}

/// HTTP client that ignores proxy settings from the environment
pub fn local_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
