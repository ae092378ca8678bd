use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, Response, StatusCode, header};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde_json::{Value, json};
use tenant_gate::apps::{AppDirectory, MemoryAppStore};
use tenant_gate::auth::{AuthState, Claims, JwtConfig, JwtValidator};
use tenant_gate::oauth::{
    AuthorizationCodeExchanger, ClientAuthenticator, ClientCredentialsIssuer, ClientType,
    OAuthClient, OAuthError, ProviderResult, RefreshTokenRotator, TokenEndpoint, TokenResponse,
};
use tenant_gate::ratelimit::{AppRateLimitState, IpRateLimitState, RateLimiter};
use tenant_gate::{Gateway, build_router};
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &str = "integration-secret-at-least-32-bytes";

struct Provider;

#[async_trait]
impl ClientAuthenticator for Provider {
    async fn authenticate(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> ProviderResult<OAuthClient> {
        if client_id == "reporting" && client_secret == "s3cret" {
            Ok(OAuthClient {
                client_id: client_id.into(),
                client_type: ClientType::Confidential,
                allowed_scopes: vec!["read".into()],
                redirect_uris: vec![],
            })
        } else {
            Err(OAuthError::invalid_client("invalid client credentials").into())
        }
    }
}

#[async_trait]
impl AuthorizationCodeExchanger for Provider {
    async fn exchange_code(
        &self,
        _client: &OAuthClient,
        _code: &str,
        _redirect_uri: &str,
        _code_verifier: &str,
    ) -> ProviderResult<TokenResponse> {
        Err(OAuthError::invalid_grant("unknown code").into())
    }
}

#[async_trait]
impl ClientCredentialsIssuer for Provider {
    async fn issue(
        &self,
        _client: &OAuthClient,
        scopes: &[String],
        _allowed_tables: &[String],
    ) -> ProviderResult<TokenResponse> {
        Ok(TokenResponse::bearer("issued-token", 900).with_scope(scopes.join(" ")))
    }
}

#[async_trait]
impl RefreshTokenRotator for Provider {
    async fn rotate(&self, _client_id: &str, _refresh_token: &str) -> ProviderResult<TokenResponse> {
        Err(anyhow::anyhow!("refresh store offline").into())
    }
}

struct Harness {
    router: Router,
    owner: Uuid,
}

fn harness(ip_limit: u32) -> Harness {
    let store = Arc::new(MemoryAppStore::new());
    let owner = Uuid::new_v4();
    store.add_user(owner);

    let provider = Arc::new(Provider);
    let validator = JwtValidator::new(JwtConfig::new(SECRET)).unwrap();

    let router = build_router(Gateway {
        directory: AppDirectory::new(store, Duration::from_secs(5)),
        auth: AuthState::new(Some(Arc::new(validator))),
        ip_limit: IpRateLimitState::new(RateLimiter::new("ip"), ip_limit, Duration::from_secs(60)),
        app_limit: AppRateLimitState::new(RateLimiter::new("app")),
        token_endpoint: Some(TokenEndpoint::new(
            provider.clone(),
            provider.clone(),
            provider.clone(),
            provider,
        )),
        pool: None,
        request_timeout: Duration::from_secs(30),
    });

    Harness { router, owner }
}

fn bearer(claims: Claims) -> String {
    let claims = Claims {
        exp: chrono::Utc::now().timestamp() + 3600,
        ..claims
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();
    format!("Bearer {token}")
}

fn from_peer(mut request: Request<Body>, peer: &str) -> Request<Body> {
    let addr: SocketAddr = peer.parse().unwrap();
    request.extensions_mut().insert(ConnectInfo(addr));
    request
}

fn token_request(auth: &str, body: &str) -> Request<Body> {
    Request::post("/oauth/token")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(header::AUTHORIZATION, auth)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn basic(user: &str, pass: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{user}:{pass}")))
}

async fn send(router: &Router, request: Request<Body>) -> Response<Body> {
    router.clone().oneshot(request).await.unwrap()
}

async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_token_endpoint_issues_client_credentials_token() {
    let h = harness(100);

    let response = send(
        &h.router,
        token_request(
            &basic("reporting", "s3cret"),
            "grant_type=client_credentials&scope=read",
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
    assert_eq!(response.headers()[header::PRAGMA], "no-cache");
    let body = json_body(response).await;
    assert_eq!(body["access_token"], "issued-token");
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["scope"], "read");
}

#[tokio::test]
async fn test_token_endpoint_rejects_bad_client() {
    let h = harness(100);

    let response = send(
        &h.router,
        token_request(
            &basic("reporting", "wrong"),
            "grant_type=client_credentials&scope=read",
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    let body = json_body(response).await;
    assert_eq!(body["error"], "invalid_client");
}

#[tokio::test]
async fn test_token_endpoint_hides_internal_errors() {
    let h = harness(100);

    let response = send(
        &h.router,
        token_request(
            &basic("reporting", "s3cret"),
            "grant_type=refresh_token&refresh_token=rt-1",
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["error"], "server_error");
    assert_eq!(body["error_description"], "internal server error");
}

#[tokio::test]
async fn test_token_endpoint_requires_form_content_type() {
    let h = harness(100);

    let request = Request::post("/oauth/token")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let response = send(&h.router, request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "invalid_request");
}

#[tokio::test]
async fn test_client_address_limit_applies_per_peer() {
    let h = harness(2);

    for _ in 0..2 {
        let request = from_peer(
            token_request(&basic("reporting", "s3cret"), "grant_type=client_credentials&scope=read"),
            "203.0.113.9:40000",
        );
        let response = send(&h.router, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-ratelimit-limit"], "2");
    }

    let request = from_peer(
        token_request(&basic("reporting", "s3cret"), "grant_type=client_credentials&scope=read"),
        "203.0.113.9:40001",
    );
    let response = send(&h.router, request).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()["x-ratelimit-remaining"], "0");
    let retry_after: u64 = response.headers()[header::RETRY_AFTER]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!((1..=60).contains(&retry_after));
    assert_eq!(json_body(response).await["error"], "rate_limit_exceeded");

    // another peer has its own bucket
    let request = from_peer(
        token_request(&basic("reporting", "s3cret"), "grant_type=client_credentials&scope=read"),
        "198.51.100.7:5000",
    );
    assert_eq!(send(&h.router, request).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_forwarded_for_is_ignored_from_public_peers() {
    let h = harness(1);

    let first = from_peer(
        Request::get("/v1/apps")
            .header("x-forwarded-for", "10.1.1.1")
            .body(Body::empty())
            .unwrap(),
        "203.0.113.20:1000",
    );
    assert_eq!(send(&h.router, first).await.status(), StatusCode::UNAUTHORIZED);

    let spoofed = from_peer(
        Request::get("/v1/apps")
            .header("x-forwarded-for", "10.2.2.2")
            .body(Body::empty())
            .unwrap(),
        "203.0.113.20:1001",
    );
    assert_eq!(
        send(&h.router, spoofed).await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );
}

#[tokio::test]
async fn test_app_lifecycle_over_http() {
    let h = harness(100);
    let auth = bearer(Claims::new(h.owner.to_string(), "owner@example.com"));

    let create = Request::post("/v1/apps")
        .header(header::AUTHORIZATION, &auth)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"name": " billing ", "rate_limit_rps": 5}).to_string(),
        ))
        .unwrap();
    let response = send(&h.router, create).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let app = json_body(response).await;
    assert_eq!(app["name"], "billing");
    assert_eq!(app["owner_user_id"], h.owner.to_string());
    let id = app["id"].as_str().unwrap().to_string();

    let list = Request::get("/v1/apps?page=1&page_size=10")
        .header(header::AUTHORIZATION, &auth)
        .body(Body::empty())
        .unwrap();
    let page = json_body(send(&h.router, list).await).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["id"], id.as_str());

    let update = Request::put(format!("/v1/apps/{id}"))
        .header(header::AUTHORIZATION, &auth)
        .body(Body::from(
            json!({"name": "billing-v2", "description": "invoices"}).to_string(),
        ))
        .unwrap();
    let response = send(&h.router, update).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["name"], "billing-v2");

    let delete = Request::delete(format!("/v1/apps/{id}"))
        .header(header::AUTHORIZATION, &auth)
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&h.router, delete).await.status(), StatusCode::NO_CONTENT);

    let get = Request::get(format!("/v1/apps/{id}"))
        .header(header::AUTHORIZATION, &auth)
        .body(Body::empty())
        .unwrap();
    let response = send(&h.router, get).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"], "not_found");
}

#[tokio::test]
async fn test_app_api_rejects_bad_input() {
    let h = harness(100);
    let auth = bearer(Claims::new(h.owner.to_string(), ""));

    let malformed = Request::post("/v1/apps")
        .header(header::AUTHORIZATION, &auth)
        .body(Body::from("{not json"))
        .unwrap();
    let response = send(&h.router, malformed).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "invalid_json");

    let blank = Request::post("/v1/apps")
        .header(header::AUTHORIZATION, &auth)
        .body(Body::from(json!({"name": "   "}).to_string()))
        .unwrap();
    let response = send(&h.router, blank).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "name_required");

    let not_a_user = bearer(Claims::new("service-account", ""));
    let request = Request::post("/v1/apps")
        .header(header::AUTHORIZATION, not_a_user)
        .body(Body::from(json!({"name": "x"}).to_string()))
        .unwrap();
    assert_eq!(send(&h.router, request).await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invalid_bearer_token_is_rejected() {
    let h = harness(100);

    let request = Request::get("/v1/apps")
        .header(header::AUTHORIZATION, "Bearer not-a-jwt")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&h.router, request).await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_tenant_limit_comes_from_claims() {
    let h = harness(100);
    let auth = bearer(
        Claims::new(h.owner.to_string(), "owner@example.com").with_app("app-42", 2, 60),
    );

    for remaining in ["1", "0"] {
        let request = Request::get("/v1/apps")
            .header(header::AUTHORIZATION, &auth)
            .body(Body::empty())
            .unwrap();
        let response = send(&h.router, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-app-ratelimit-limit"], "2");
        assert_eq!(response.headers()["x-app-ratelimit-remaining"], remaining);
    }

    let request = Request::get("/v1/apps")
        .header(header::AUTHORIZATION, &auth)
        .body(Body::empty())
        .unwrap();
    let response = send(&h.router, request).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));

    // a token without an app is not metered by the tenant limiter
    let unmetered = bearer(Claims::new(h.owner.to_string(), "owner@example.com"));
    let request = Request::get("/v1/apps")
        .header(header::AUTHORIZATION, unmetered)
        .body(Body::empty())
        .unwrap();
    let response = send(&h.router, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!response.headers().contains_key("x-app-ratelimit-limit"));
}
