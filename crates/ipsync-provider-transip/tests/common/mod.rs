//! A fake TransIP API for client contract tests
//!
//! Built on a `wiremock` server with request recording on, so tests can
//! inspect every request the client sent.

#![allow(dead_code)]

use std::collections::HashMap;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use wiremock::matchers::{any, header, method, path, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const PKCS8_KEY: &[u8] = include_bytes!("../fixtures/test_key_pkcs8.pem");
pub const PKCS1_KEY: &[u8] = include_bytes!("../fixtures/test_key_pkcs1.pem");

const DNS_PATH: &str = r"^/v6/domains/[^/]+/dns$";

/// Answers every request through a closure
struct Handler(Box<dyn Fn(&Request) -> ResponseTemplate + Send + Sync>);

impl Respond for Handler {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        (self.0)(request)
    }
}

pub struct FakeTransip {
    server: MockServer,
}

impl FakeTransip {
    /// Start a server answering every request with `handler`
    pub async fn start<F>(handler: F) -> Self
    where
        F: Fn(&Request) -> ResponseTemplate + Send + Sync + 'static,
    {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(Handler(Box::new(handler)))
            .mount(&server)
            .await;

        Self { server }
    }

    /// Start a server that behaves like TransIP for the given zones
    ///
    /// Auth returns `token`; reads return the zone's entries; PATCH returns
    /// 204. Requests without the bearer token are rejected with 401.
    pub async fn with_zones(token: String, zones: HashMap<String, serde_json::Value>) -> Self {
        let server = MockServer::start().await;
        let bearer = format!("Bearer {}", token);

        Mock::given(method("POST"))
            .and(path("/v6/auth"))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(serde_json::json!({ "token": token })),
            )
            .mount(&server)
            .await;

        for (zone, entries) in zones {
            Mock::given(method("GET"))
                .and(path(format!("/v6/domains/{}/dns", zone)))
                .and(header("authorization", bearer.as_str()))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(serde_json::json!({ "dnsEntries": entries })),
                )
                .mount(&server)
                .await;
        }

        Mock::given(method("PATCH"))
            .and(path_regex(DNS_PATH))
            .and(header("authorization", bearer.as_str()))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path_regex(DNS_PATH))
            .and(header("authorization", bearer.as_str()))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(serde_json::json!({ "error": "Domain not found" })),
            )
            .with_priority(10)
            .mount(&server)
            .await;

        Mock::given(any())
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(serde_json::json!({ "error": "Your access token is invalid" })),
            )
            .with_priority(20)
            .mount(&server)
            .await;

        Self { server }
    }

    pub fn api_base(&self) -> String {
        format!("{}/v6", self.server.uri())
    }

    pub async fn requests(&self) -> Vec<Request> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
    }

    pub async fn requests_to(&self, method: &str, path: &str) -> Vec<Request> {
        self.requests()
            .await
            .into_iter()
            .filter(|r| r.method.as_str() == method && r.url.path() == path)
            .collect()
    }
}

/// The JSON body of a recorded request
pub fn json_body(request: &Request) -> serde_json::Value {
    serde_json::from_slice(&request.body).unwrap()
}

/// A header of a recorded request
pub fn header_value(request: &Request, name: &str) -> Option<String> {
    request
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// A JWT-shaped token expiring `secs_from_now` seconds from now
pub fn jwt_expiring_in(secs_from_now: i64) -> String {
    let exp = chrono::Utc::now().timestamp() + secs_from_now;
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"iss":"api.transip.nl","exp":{}}}"#, exp));
    format!("eyJhbGciOiJSUzUxMiJ9.{}.c2lnbmF0dXJl", payload)
}

/// HTTP client that ignores proxy settings from the environment
pub fn local_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
