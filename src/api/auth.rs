//! `api/auth`: OAuth token exchange for the extension
//!
//! - `GET ?saved=<anything>` returns the pre-provisioned token, if any.
//! - Any other method takes a JSON body `{ "code": ... }`, exchanges the
//!   authorization code at the provider's token endpoint and returns
//!   `{ "token": ... }`.
//!
//! Missing input is a 400; any failure to obtain a token is a 500.

use crate::config::OAuthConfig;
use crate::handler::{Handler, HandlerError, HandlerFuture};
use crate::http::{self, Body};
use crate::logger;
use hyper::body::Bytes;
use hyper::header::ACCEPT;
use hyper::{Method, Request, Response, StatusCode, Uri};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("missing GITHUB_CLIENT_ID or GITHUB_CLIENT_SECRET")]
    MissingCredentials,
    #[error("token request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("provider reply has no access_token")]
    MissingToken,
}

/// Handler for the token exchange endpoint
pub struct AuthHandler {
    config: Arc<OAuthConfig>,
    client: reqwest::Client,
}

impl AuthHandler {
    pub fn new(config: OAuthConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    pub fn with_client(config: OAuthConfig, client: reqwest::Client) -> Self {
        Self {
            config: Arc::new(config),
            client,
        }
    }
}

impl Handler for AuthHandler {
    fn call(&self, req: Request<Bytes>) -> HandlerFuture {
        let config = Arc::clone(&self.config);
        let client = self.client.clone();
        Box::pin(async move { Ok::<_, HandlerError>(handle(&config, &client, &req).await) })
    }
}

async fn handle(
    config: &OAuthConfig,
    client: &reqwest::Client,
    req: &Request<Bytes>,
) -> Response<Body> {
    if req.method() == Method::GET {
        if !has_saved_flag(req.uri()) {
            return bad_request();
        }
        return match config.token.as_deref() {
            Some(token) => success(token),
            None => server_error("access token not found"),
        };
    }

    let Some(code) = extract_code(req.body()) else {
        return bad_request();
    };
    match exchange_code(client, config, &code).await {
        Ok(token) => success(&token),
        Err(e) => {
            logger::log_warning(&format!("OAuth code exchange failed: {e}"));
            server_error("missing access token")
        }
    }
}

/// POST the code to the provider and pull `access_token` out of the reply
pub async fn exchange_code(
    client: &reqwest::Client,
    config: &OAuthConfig,
    code: &str,
) -> Result<String, TokenError> {
    let (Some(client_id), Some(client_secret)) = (&config.client_id, &config.client_secret)
    else {
        return Err(TokenError::MissingCredentials);
    };

    let reply = client
        .post(&config.token_url)
        .header(ACCEPT, "application/json")
        .json(&json!({
            "client_id": client_id,
            "client_secret": client_secret,
            "code": code,
        }))
        .send()
        .await?;

    // Providers answer errors with 200 and an `error` field, so only the
    // presence of a token counts
    let body: Value = reply.json().await.unwrap_or(Value::Null);
    truthy_string(body.get("access_token")).ok_or(TokenError::MissingToken)
}

/// First decoded `saved` query parameter is non-empty
fn has_saved_flag(uri: &Uri) -> bool {
    let query = uri.query().unwrap_or_default();
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "saved")
        .is_some_and(|(_, value)| !value.is_empty())
}

/// `code` from a JSON body; an unparseable body counts as `{}`
fn extract_code(body: &[u8]) -> Option<String> {
    let parsed: Value = serde_json::from_slice(body).ok()?;
    truthy_string(parsed.get("code"))
}

/// Non-empty strings and non-zero numbers; anything else counts as absent
fn truthy_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    }
}

fn success(token: &str) -> Response<Body> {
    http::build_json_response(StatusCode::OK, &json!({ "token": token }))
}

fn bad_request() -> Response<Body> {
    http::build_error_response(StatusCode::BAD_REQUEST, "bad request")
}

fn server_error(message: &str) -> Response<Body> {
    http::build_error_response(StatusCode::INTERNAL_SERVER_ERROR, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::{BodyExt, Full};
    use hyper::body::Incoming;
    use hyper::server::conn::http1;
    use hyper::service::service_fn;
    use hyper_util::rt::TokioIo;
    use std::sync::Mutex;
    use tokio::net::TcpListener;

    /// Local stand-in for the provider's token endpoint; records the last
    /// JSON body it received
    async fn spawn_token_stub(reply: &'static str) -> (String, Arc<Mutex<Option<Value>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen = Arc::new(Mutex::new(None));
        let recorder = Arc::clone(&seen);

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let recorder = Arc::clone(&recorder);
                tokio::spawn(async move {
                    let service = service_fn(move |req: Request<Incoming>| {
                        let recorder = Arc::clone(&recorder);
                        async move {
                            let body = req.into_body().collect().await?.to_bytes();
                            *recorder.lock().unwrap() = serde_json::from_slice(&body).ok();
                            Ok::<_, hyper::Error>(
                                Response::builder()
                                    .header("content-type", "application/json")
                                    .body(Full::new(Bytes::from_static(reply.as_bytes())))
                                    .unwrap(),
                            )
                        }
                    });
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
        });

        (format!("http://{addr}/login/oauth/access_token"), seen)
    }

    fn handler(config: OAuthConfig) -> AuthHandler {
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        AuthHandler::with_client(config, client)
    }

    fn credentials(token_url: String) -> OAuthConfig {
        OAuthConfig {
            token_url,
            client_id: Some("client-id".to_string()),
            client_secret: Some("client-secret".to_string()),
            token: None,
        }
    }

    fn post(body: &'static str) -> Request<Bytes> {
        Request::post("/api/auth")
            .header("content-type", "application/json")
            .body(Bytes::from_static(body.as_bytes()))
            .unwrap()
    }

    async fn call(handler: &AuthHandler, req: Request<Bytes>) -> (StatusCode, Value) {
        let response = handler.call(req).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_code_exchange() {
        let (url, seen) =
            spawn_token_stub(r#"{"access_token":"xyz","token_type":"bearer"}"#).await;
        let auth = handler(credentials(url));

        let (status, body) = call(&auth, post(r#"{"code":"abc"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "token": "xyz" }));

        let sent = seen.lock().unwrap().clone().unwrap();
        assert_eq!(
            sent,
            json!({ "client_id": "client-id", "client_secret": "client-secret", "code": "abc" })
        );
    }

    #[tokio::test]
    async fn test_provider_without_token_is_500() {
        let (url, _) = spawn_token_stub(r#"{"error":"bad_verification_code"}"#).await;
        let auth = handler(credentials(url));

        let (status, body) = call(&auth, post(r#"{"code":"expired"}"#)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "missing access token" }));
    }

    #[tokio::test]
    async fn test_missing_credentials_is_500() {
        let auth = handler(OAuthConfig::default());
        let (status, body) = call(&auth, post(r#"{"code":"abc"}"#)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "missing access token" }));
    }

    #[tokio::test]
    async fn test_missing_code_is_400() {
        let auth = handler(OAuthConfig::default());
        for body in ["", "not json", "{}", r#"{"code":""}"#, r#"{"code":null}"#] {
            let (status, reply) = call(&auth, post(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
            assert_eq!(reply, json!({ "error": "bad request" }));
        }
    }

    #[tokio::test]
    async fn test_saved_token() {
        let mut config = OAuthConfig::default();
        config.token = Some("saved-token".to_string());
        let auth = handler(config);

        let get = |uri: &'static str| Request::get(uri).body(Bytes::new()).unwrap();

        let (status, body) = call(&auth, get("/api/auth?saved=true")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "token": "saved-token" }));

        let (status, _) = call(&auth, get("/api/auth")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&auth, get("/api/auth?saved=")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_saved_flag_uses_first_decoded_value() {
        let mut config = OAuthConfig::default();
        config.token = Some("saved-token".to_string());
        let auth = handler(config);

        let get = |uri: &'static str| Request::get(uri).body(Bytes::new()).unwrap();

        let (status, _) = call(&auth, get("/api/auth?saved=&saved=1")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(&auth, get("/api/auth?sav%65d=1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "token": "saved-token" }));

        let (status, _) = call(&auth, get("/api/auth?saved=1&saved=")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[test]
    fn test_has_saved_flag() {
        let uri = |s: &'static str| s.parse::<Uri>().unwrap();
        assert!(has_saved_flag(&uri("/api/auth?x=1&saved=yes")));
        assert!(has_saved_flag(&uri("/api/auth?saved=%20")));
        assert!(!has_saved_flag(&uri("/api/auth?saved")));
        assert!(!has_saved_flag(&uri("/api/auth?other=1")));
        assert!(!has_saved_flag(&uri("/api/auth")));
    }

    #[tokio::test]
    async fn test_saved_without_token_is_500() {
        let auth = handler(OAuthConfig::default());
        let req = Request::get("/api/auth?saved=1").body(Bytes::new()).unwrap();
        let (status, body) = call(&auth, req).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "access token not found" }));
    }

    #[test]
    fn test_truthy_string() {
        assert_eq!(truthy_string(Some(&json!("abc"))), Some("abc".to_string()));
        assert_eq!(truthy_string(Some(&json!(42))), Some("42".to_string()));
        assert_eq!(truthy_string(Some(&json!(0))), None);
        assert_eq!(truthy_string(Some(&json!(false))), None);
        assert_eq!(truthy_string(None), None);
    }
}
