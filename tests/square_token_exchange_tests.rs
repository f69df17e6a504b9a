use axum::{
    Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
};
use serde_json::{Value, json};
use squaregate::config::Config;
use squaregate::{HttpError, ProviderResponse, SquareClient};
use squaregate_schema::ObtainTokenPayload;
use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};
use tokio::net::TcpListener;
use url::Url;

const TOKEN_BODY: &str = r#"{"access_token":"AT","token_type":"bearer","expires_at":"2030-01-01T00:00:00Z","merchant_id":"M1","refresh_token":"RT"}"#;

#[derive(Clone, Default)]
struct CaptureState {
    reqs: Arc<Mutex<Vec<Captured>>>,
}

impl CaptureState {
    fn record(&self, headers: HeaderMap, body: &[u8]) {
        self.reqs.lock().unwrap().push(Captured {
            headers,
            body: body.to_vec(),
        });
    }

    fn count(&self) -> usize {
        self.reqs.lock().unwrap().len()
    }
}

#[derive(Debug, Clone)]
struct Captured {
    headers: HeaderMap,
    body: Vec<u8>,
}

async fn spawn_test_server(app: Router) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    let base = Url::parse(&format!("http://{}", addr)).expect("valid base url");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    base
}

/// Mock token endpoint answering every call with `status` and `body`.
async fn spawn_token_endpoint(status: StatusCode, body: &'static str) -> (Url, CaptureState) {
    let captured = CaptureState::default();
    let mock = Router::new()
        .route(
            "/oauth2/token",
            post(
                move |State(state): State<CaptureState>,
                      headers: HeaderMap,
                      req_body: axum::body::Bytes| async move {
                    state.record(headers, &req_body);
                    (status, body)
                },
            ),
        )
        .with_state(captured.clone());
    (spawn_test_server(mock).await, captured)
}

fn config_for(base: &Url) -> Config {
    let mut cfg = Config::default();
    cfg.square.base_url = Some(base.clone());
    cfg.square.retry.tries = 2;
    cfg.square.retry.interval_ms = 10;
    cfg.square.retry.total_timeout_ms = 2_000;
    cfg
}

fn ready_client(cfg: &Config) -> SquareClient {
    let client = SquareClient::new(&cfg.square()).expect("valid Square client");
    client.setup().expect("session setup");
    client
}

#[tokio::test]
async fn exchange_returns_token_mapping_unchanged() {
    let (base, captured) = spawn_token_endpoint(StatusCode::OK, TOKEN_BODY).await;
    let client = ready_client(&config_for(&base));

    let token = client
        .exchange_code_for_token("id1", "secret1", "code1", "authorization_code")
        .await
        .expect("no local error")
        .expect("token mapping");

    let expected: Value = serde_json::from_str(TOKEN_BODY).expect("valid fixture");
    assert_eq!(Value::Object(token), expected);

    let reqs = captured.reqs.lock().unwrap().clone();
    assert_eq!(reqs.len(), 1);
    let req = &reqs[0];
    assert_eq!(
        req.headers
            .get("square-version")
            .and_then(|v| v.to_str().ok()),
        Some("2022-08-23")
    );
    assert_eq!(
        req.headers
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("application/json")
    );
    let body: Value = serde_json::from_slice(&req.body).expect("json request body");
    assert_eq!(
        body,
        json!({
            "client_id": "id1",
            "client_secret": "secret1",
            "code": "code1",
            "grant_type": "authorization_code"
        })
    );
}

#[tokio::test]
async fn created_status_counts_as_success() {
    let (base, _captured) = spawn_token_endpoint(StatusCode::CREATED, TOKEN_BODY).await;
    let client = ready_client(&config_for(&base));

    let token = client
        .exchange_code_for_token("id1", "secret1", "code1", "authorization_code")
        .await
        .expect("no local error");
    assert_eq!(
        token.and_then(|t| t.get("merchant_id").cloned()),
        Some(json!("M1"))
    );
}

#[tokio::test]
async fn rejected_exchange_is_absent_and_not_retried() {
    let (base, captured) =
        spawn_token_endpoint(StatusCode::UNAUTHORIZED, r#"{"error":"invalid_grant"}"#).await;
    let mut cfg = config_for(&base);
    cfg.square.retry.tries = 3;
    let client = ready_client(&cfg);

    let token = client
        .exchange_code_for_token("id1", "secret1", "code1", "authorization_code")
        .await
        .expect("no local error");
    assert!(token.is_none());
    assert_eq!(captured.count(), 1, "HTTP statuses must not be retried");

    let payload = ObtainTokenPayload {
        client_id: "id1".to_string(),
        client_secret: "secret1".to_string(),
        code: "code1".to_string(),
        grant_type: "authorization_code".to_string(),
    };
    match client.obtain_token(&payload).await.expect("no local error") {
        ProviderResponse::Rejected { status, diagnostic } => {
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert!(diagnostic.contains("invalid_grant"));
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_success_body_is_distinguished_but_still_absent() {
    let (base, _captured) = spawn_token_endpoint(StatusCode::OK, "").await;
    let client = ready_client(&config_for(&base));

    let payload = ObtainTokenPayload {
        client_id: "id1".to_string(),
        client_secret: "secret1".to_string(),
        code: "code1".to_string(),
        grant_type: "authorization_code".to_string(),
    };
    assert_eq!(
        client.obtain_token(&payload).await.expect("no local error"),
        ProviderResponse::EmptyBody
    );
    assert!(
        client
            .exchange_code_for_token("id1", "secret1", "code1", "authorization_code")
            .await
            .expect("no local error")
            .is_none()
    );
}

#[tokio::test]
async fn non_object_json_is_absent() {
    let (base, _captured) = spawn_token_endpoint(StatusCode::OK, r#"["AT"]"#).await;
    let client = ready_client(&config_for(&base));

    let token = client
        .exchange_code_for_token("id1", "secret1", "code1", "authorization_code")
        .await
        .expect("no local error");
    assert!(token.is_none());
}

#[tokio::test]
async fn unreachable_provider_degrades_to_absent_result() {
    // Reserve a port, then close it so every connection is refused.
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    let base = Url::parse(&format!("http://{}", addr)).expect("valid base url");

    let mut cfg = config_for(&base);
    cfg.square.retry.tries = 3;
    let client = ready_client(&cfg);

    let payload = ObtainTokenPayload {
        client_id: "id1".to_string(),
        client_secret: "secret1".to_string(),
        code: "code1".to_string(),
        grant_type: "authorization_code".to_string(),
    };
    assert_eq!(
        client.obtain_token(&payload).await.expect("no local error"),
        ProviderResponse::Unreachable
    );
}

async fn spawn_slow_token_endpoint(delay: Duration) -> (Url, CaptureState) {
    let captured = CaptureState::default();
    let mock = Router::new()
        .route(
            "/oauth2/token",
            post(
                move |State(state): State<CaptureState>,
                      headers: HeaderMap,
                      req_body: axum::body::Bytes| async move {
                    state.record(headers, &req_body);
                    tokio::time::sleep(delay).await;
                    (StatusCode::OK, TOKEN_BODY)
                },
            ),
        )
        .with_state(captured.clone());
    (spawn_test_server(mock).await, captured)
}

#[tokio::test]
async fn slow_provider_times_out_on_every_attempt() {
    let (base, captured) = spawn_slow_token_endpoint(Duration::from_secs(2)).await;
    let mut cfg = config_for(&base);
    cfg.square.retry.total_timeout_ms = 100;
    let client = ready_client(&cfg);

    let token = client
        .exchange_code_for_token("id1", "secret1", "code1", "authorization_code")
        .await
        .expect("timeouts are absorbed");
    assert!(token.is_none());
    assert_eq!(captured.count(), 2);
}

#[tokio::test]
async fn raise_on_failure_surfaces_timeout() {
    let (base, captured) = spawn_slow_token_endpoint(Duration::from_secs(2)).await;
    let mut cfg = config_for(&base);
    cfg.square.retry.total_timeout_ms = 100;
    cfg.square.retry.raise_on_failure = true;
    let client = ready_client(&cfg);

    let err = client
        .exchange_code_for_token("id1", "secret1", "code1", "authorization_code")
        .await
        .expect_err("timeout must be raised");
    assert!(matches!(err, HttpError::Timeout { attempts: 1, .. }));
    assert_eq!(captured.count(), 1);
}

#[tokio::test]
async fn exchange_before_setup_is_a_local_error() {
    let (base, captured) = spawn_token_endpoint(StatusCode::OK, TOKEN_BODY).await;
    let client = SquareClient::new(&config_for(&base).square()).expect("valid Square client");

    let err = client
        .exchange_code_for_token("id1", "secret1", "code1", "authorization_code")
        .await
        .expect_err("session was never opened");
    assert!(matches!(err, HttpError::SessionNotReady));
    assert_eq!(captured.count(), 0);
}

#[tokio::test]
async fn concurrent_exchanges_share_one_session() {
    let (base, captured) = spawn_token_endpoint(StatusCode::OK, TOKEN_BODY).await;
    let client = Arc::new(ready_client(&config_for(&base)));

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..8 {
        let client = client.clone();
        tasks.spawn(async move {
            let code = format!("code-{i}");
            client
                .exchange_code_for_token("id1", "secret1", &code, "authorization_code")
                .await
        });
    }

    while let Some(joined) = tasks.join_next().await {
        let token = joined
            .expect("task panicked")
            .expect("no local error")
            .expect("token mapping");
        assert_eq!(token.get("access_token"), Some(&json!("AT")));
    }
    assert_eq!(captured.count(), 8);

    let client = Arc::into_inner(client).expect("all tasks finished");
    let start = Instant::now();
    client.shutdown().await;
    assert!(start.elapsed() >= squaregate::http::SHUTDOWN_GRACE);
}
