use std::sync::Arc;

use bytes::Bytes;
use http::{Method, StatusCode};
use mindful_backend::models::current_period;
use mindful_backend::test_util::{
    discovery_json, generate_test_jwt, generate_unknown_kid_jwt, jwks_json, mock_gemini,
    test_config,
};
use mindful_backend::{
    app, AccountStore, AppState, Config, ContentWorkflow, GeminiClient, IdentityProvider,
    Metrics, RestIdentityClient, SessionVerifier,
};
use mindful_common::SubscriptionPlan;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GENERATE_PATH: &str = "/v1beta/models/test-model:generateContent";

struct TestApp {
    server: MockServer,
    state: Arc<AppState>,
    router: axum::Router,
}

impl TestApp {
    async fn start() -> Self {
        Self::start_with_identity(true).await
    }

    async fn start_with_identity(with_identity: bool) -> Self {
        Self::start_with(with_identity, |_| {}).await
    }

    async fn start_with(with_identity: bool, adjust: impl FnOnce(&mut Config)) -> Self {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/.well-known/openid-configuration"))
            .respond_with(ResponseTemplate::new(200).set_body_json(discovery_json(&server.uri())))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/.well-known/jwks.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_json()))
            .mount(&server)
            .await;

        let mut config = test_config(&server.uri());
        adjust(&mut config);
        let sessions = SessionVerifier::new(&config.identity).await.unwrap();
        let store = Arc::new(AccountStore::new(&config.database.url).unwrap());
        let gemini = Arc::new(GeminiClient::new(&config.gemini).unwrap());
        let metrics = Arc::new(Metrics::new().unwrap());
        let workflow = ContentWorkflow::new(gemini, store.clone(), metrics.clone());
        let identity: Option<Arc<dyn IdentityProvider>> = if with_identity {
            Some(Arc::new(RestIdentityClient::new(
                &config.identity.base_url,
                "test-identity-key",
            )))
        } else {
            None
        };

        let state = Arc::new(AppState {
            config,
            sessions,
            identity,
            store,
            workflow,
            metrics,
        });
        let router = app(state.clone());

        Self {
            server,
            state,
            router,
        }
    }

    fn token_for(&self, uid: &str) -> String {
        generate_test_jwt(uid, Some(&format!("{}@example.com", uid)), &self.server.uri())
    }

    /// Create `uid` on `plan` with `used` generations already recorded this month.
    fn seed_account(&self, uid: &str, plan: SubscriptionPlan, used: u32) {
        let store = &self.state.store;
        store.get_or_create_account(uid, None).unwrap();
        store.set_plan(uid, SubscriptionPlan::Team).unwrap();
        let period = current_period();
        for _ in 0..used {
            store
                .record_generation(uid, SubscriptionPlan::Team.allotment(), &period)
                .unwrap()
                .unwrap();
        }
        store.set_plan(uid, plan).unwrap();
    }

    fn tokens_used(&self, uid: &str) -> u32 {
        self.state
            .store
            .get_account(uid)
            .unwrap()
            .unwrap()
            .tokens_used_in(&current_period())
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = http::Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        if body.is_some() {
            builder = builder.header("Content-Type", "application/json");
        }

        let request = builder
            .body(match body {
                Some(b) => axum::body::Body::from(Bytes::from(b.to_string())),
                None => axum::body::Body::empty(),
            })
            .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }
}

#[tokio::test]
async fn test_health_and_metrics() {
    let app = TestApp::start().await;

    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let request = http::Request::builder()
        .uri("/metrics")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_pricing_table_is_public() {
    let app = TestApp::start().await;

    let (status, body) = app.send(Method::GET, "/plans", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let plans = body.as_array().unwrap();
    assert_eq!(plans.len(), 3);
    assert_eq!(plans[0]["key"], "free");
    assert_eq!(plans[0]["tokens"], 5);
    assert_eq!(plans[1]["tokens"], 50);
    assert_eq!(plans[2]["tokens"], 200);
}

#[tokio::test]
async fn test_protected_routes_require_auth() {
    let app = TestApp::start().await;

    let cases = [
        (Method::GET, "/account", None),
        (Method::PUT, "/account/plan", Some(json!({ "plan": "pro" }))),
        (Method::POST, "/generate", Some(json!({ "topic": "rest" }))),
        (
            Method::POST,
            "/generate/refine",
            Some(json!({ "previous_content": "text", "instruction": "shorter" })),
        ),
        (Method::POST, "/generate/persona", Some(json!({ "audience": "nurses" }))),
        (Method::POST, "/generate/plan", Some(json!({ "theme": "sleep" }))),
        (Method::GET, "/artifacts", None),
        (
            Method::POST,
            "/artifacts",
            Some(json!({ "content": "text", "prompt": "topic" })),
        ),
        (Method::DELETE, "/artifacts/some-id", None),
    ];

    for (method, uri, body) in cases {
        let (status, body) = app.send(method.clone(), uri, None, body).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{} {}", method, uri);
        assert_eq!(body["error"]["type"], "unauthorized");
    }

    let (status, _) = app
        .send(Method::GET, "/account", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_first_access_creates_free_account() {
    let app = TestApp::start().await;
    let token = app.token_for("new-user");

    let (status, body) = app.send(Method::GET, "/account", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "new-user");
    assert_eq!(body["subscription_plan"], "free");
    assert_eq!(body["usage"]["tokens_used"], 0);
    assert_eq!(body["usage"]["tokens_limit"], 5);
    assert_eq!(body["usage"]["tokens_remaining"], 5);
}

#[tokio::test]
async fn test_generate_increments_counter() {
    let app = TestApp::start().await;
    app.seed_account("pro-user", SubscriptionPlan::Pro, 10);

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(header("x-goog-api-key", "test-gemini-key"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(mock_gemini::text_response("Breathe in. Breathe out.")),
        )
        .expect(1)
        .mount(&app.server)
        .await;

    let token = app.token_for("pro-user");
    let (status, body) = app
        .send(
            Method::POST,
            "/generate",
            Some(&token),
            Some(json!({
                "topic": "mindful breathing for anxiety",
                "content_type": "Instagram Post"
            })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "Breathe in. Breathe out.");
    assert_eq!(body["usage"]["tokens_used"], 11);
    assert_eq!(body["usage"]["tokens_remaining"], 39);
    assert_eq!(app.tokens_used("pro-user"), 11);
}

#[tokio::test]
async fn test_exhausted_quota_skips_generation() {
    let app = TestApp::start().await;
    app.seed_account("free-user", SubscriptionPlan::Free, 5);

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_gemini::text_response("x")))
        .expect(0)
        .mount(&app.server)
        .await;

    let token = app.token_for("free-user");
    let (status, body) = app
        .send(
            Method::POST,
            "/generate",
            Some(&token),
            Some(json!({ "topic": "gratitude" })),
        )
        .await;

    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["error"]["type"], "quota_exhausted");
    assert_eq!(app.tokens_used("free-user"), 5);
}

#[tokio::test]
async fn test_upstream_failure_is_not_metered() {
    let app = TestApp::start().await;
    app.seed_account("pro-user", SubscriptionPlan::Pro, 3);

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(mock_gemini::error_json(400, "bad request")),
        )
        .mount(&app.server)
        .await;

    let token = app.token_for("pro-user");
    let (status, body) = app
        .send(
            Method::POST,
            "/generate/refine",
            Some(&token),
            Some(json!({
                "previous_content": "Some earlier text",
                "instruction": "Make it shorter"
            })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["type"], "generation_failed");
    assert_eq!(app.tokens_used("pro-user"), 3);
}

#[tokio::test]
async fn test_blank_topic_is_rejected() {
    let app = TestApp::start().await;
    let token = app.token_for("pro-user");
    app.seed_account("pro-user", SubscriptionPlan::Pro, 0);

    let (status, body) = app
        .send(
            Method::POST,
            "/generate",
            Some(&token),
            Some(json!({ "topic": "   " })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "validation");
    assert_eq!(app.tokens_used("pro-user"), 0);
}

#[tokio::test]
async fn test_persona_is_metered() {
    let app = TestApp::start().await;
    app.seed_account("pro-user", SubscriptionPlan::Pro, 0);

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_gemini::text_response(
            "  Meet Sam, a 30-something nurse juggling night shifts.  ",
        )))
        .mount(&app.server)
        .await;

    let token = app.token_for("pro-user");
    let (status, body) = app
        .send(
            Method::POST,
            "/generate/persona",
            Some(&token),
            Some(json!({ "audience": "busy healthcare workers" })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["content"],
        "Meet Sam, a 30-something nurse juggling night shifts."
    );
    assert_eq!(app.tokens_used("pro-user"), 1);
}

#[tokio::test]
async fn test_week_plan() {
    let app = TestApp::start().await;
    app.seed_account("team-user", SubscriptionPlan::Team, 0);

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(mock_gemini::week_plan_response("Self-care")),
        )
        .mount(&app.server)
        .await;

    let token = app.token_for("team-user");
    let (status, body) = app
        .send(
            Method::POST,
            "/generate/plan",
            Some(&token),
            Some(json!({ "theme": "Self-care" })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    let days = body["days"].as_array().unwrap();
    assert_eq!(days.len(), 7);
    assert_eq!(days[0]["day"], "Monday");
    assert_eq!(days[6]["day"], "Sunday");
    assert_eq!(body["usage"]["tokens_used"], 1);
}

#[tokio::test]
async fn test_malformed_plan_is_not_metered() {
    let app = TestApp::start().await;
    app.seed_account("team-user", SubscriptionPlan::Team, 0);

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(mock_gemini::text_response(r#"[{"day":"Monday"}]"#)),
        )
        .mount(&app.server)
        .await;

    let token = app.token_for("team-user");
    let (status, _) = app
        .send(
            Method::POST,
            "/generate/plan",
            Some(&token),
            Some(json!({ "theme": "Rest" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(app.tokens_used("team-user"), 0);
}

#[tokio::test]
async fn test_plan_change() {
    let app = TestApp::start().await;
    app.seed_account("user-1", SubscriptionPlan::Free, 4);
    let token = app.token_for("user-1");

    let (status, body) = app
        .send(
            Method::PUT,
            "/account/plan",
            Some(&token),
            Some(json!({ "plan": "pro" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["subscription_plan"], "pro");
    assert_eq!(body["usage"]["tokens_used"], 4);
    assert_eq!(body["usage"]["tokens_limit"], 50);

    let (status, body) = app
        .send(
            Method::PUT,
            "/account/plan",
            Some(&token),
            Some(json!({ "plan": "enterprise" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "validation");
}

#[tokio::test]
async fn test_free_plan_cannot_save() {
    let app = TestApp::start().await;
    app.seed_account("free-user", SubscriptionPlan::Free, 0);
    let token = app.token_for("free-user");

    let (status, body) = app
        .send(
            Method::POST,
            "/artifacts",
            Some(&token),
            Some(json!({ "content": "text", "prompt": "topic" })),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["type"], "plan_restricted");
}

#[tokio::test]
async fn test_artifact_library() {
    let app = TestApp::start().await;
    app.seed_account("pro-user", SubscriptionPlan::Pro, 2);
    let token = app.token_for("pro-user");

    for topic in ["first", "second"] {
        let (status, body) = app
            .send(
                Method::POST,
                "/artifacts",
                Some(&token),
                Some(json!({
                    "content": format!("Content about {}", topic),
                    "prompt": topic,
                    "content_type": "Blog Post Idea"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["content_type"], "Blog Post Idea");
    }

    let (status, body) = app.send(Method::GET, "/artifacts", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["prompt"], "second");

    // Saving is not metered.
    assert_eq!(app.tokens_used("pro-user"), 2);

    let id = items[1]["id"].as_str().unwrap().to_string();
    let uri = format!("/artifacts/{}", id);
    let (status, _) = app.send(Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.send(Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Another user cannot see or delete the remaining item.
    let other = app.token_for("someone-else");
    let (_, body) = app.send(Method::GET, "/artifacts", Some(&other), None).await;
    assert!(body.as_array().unwrap().is_empty());
    let remaining = format!("/artifacts/{}", items[0]["id"].as_str().unwrap());
    let (status, _) = app.send(Method::DELETE, &remaining, Some(&other), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_signup_creates_account() {
    let app = TestApp::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/accounts:signUp"))
        .and(header("x-goog-api-key", "test-identity-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "localId": "fresh-uid",
            "email": "new@example.com",
            "idToken": "id-token",
            "refreshToken": "refresh-token",
            "expiresIn": "3600"
        })))
        .mount(&app.server)
        .await;

    let (status, body) = app
        .send(
            Method::POST,
            "/auth/signup",
            None,
            Some(json!({ "email": "new@example.com", "password": "secret1" })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["uid"], "fresh-uid");
    assert_eq!(body["id_token"], "id-token");

    let account = app.state.store.get_account("fresh-uid").unwrap().unwrap();
    assert_eq!(account.subscription_plan, SubscriptionPlan::Free);
    assert_eq!(account.email.as_deref(), Some("new@example.com"));
}

#[tokio::test]
async fn test_login_rejection_is_user_facing() {
    let app = TestApp::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithPassword"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "code": 400, "message": "INVALID_LOGIN_CREDENTIALS" }
        })))
        .mount(&app.server)
        .await;

    let (status, body) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "a@example.com", "password": "wrong" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "identity_rejected");
    assert!(!body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("INVALID_LOGIN_CREDENTIALS"));
}

#[tokio::test]
async fn test_auth_unready_without_identity_key() {
    let app = TestApp::start_with_identity(false).await;

    let (status, body) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "a@example.com", "password": "pw" })),
        )
        .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["type"], "service_unready");
}

#[tokio::test]
async fn test_logout() {
    let app = TestApp::start().await;
    let (status, _) = app.send(Method::POST, "/auth/logout", None, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_account_events_start_with_snapshot() {
    use futures_util::StreamExt;

    let app = TestApp::start().await;
    app.seed_account("pro-user", SubscriptionPlan::Pro, 7);
    let token = app.token_for("pro-user");

    let request = http::Request::builder()
        .uri(format!("/account/events?token={}", token))
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut frames = response.into_body().into_data_stream();
    let first = frames.next().await.unwrap().unwrap();
    let text = String::from_utf8(first.to_vec()).unwrap();

    assert!(text.contains("event: account_changed"));
    assert!(text.contains("\"tokens_used\":7"));
}

#[tokio::test]
async fn test_account_events_reject_bad_token() {
    let app = TestApp::start().await;

    let (status, _) = app
        .send(Method::GET, "/account/events?token=garbage", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = TestApp::start().await;

    let request = http::Request::builder()
        .uri("/health")
        .header("x-request-id", "req-123")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "req-123");

    let request = http::Request::builder()
        .uri("/health")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_metrics_count_generations() {
    let app = TestApp::start().await;
    app.seed_account("pro-user", SubscriptionPlan::Pro, 0);

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_gemini::text_response("ok")))
        .mount(&app.server)
        .await;

    let token = app.token_for("pro-user");
    let (status, _) = app
        .send(
            Method::POST,
            "/generate",
            Some(&token),
            Some(json!({ "topic": "boundaries" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let request = http::Request::builder()
        .uri("/metrics")
        .body(axum::body::Body::empty())
        .unwrap();
    let text = body_text(app.router.clone().oneshot(request).await.unwrap()).await;
    assert!(text.contains("mindful_generations_total{operation=\"generate\"} 1"));
}

#[tokio::test]
async fn test_unreachable_generation_api_hides_key() {
    // Nothing listens on port 1.
    let app = TestApp::start_with(true, |config| {
        config.gemini.base_url = "http://127.0.0.1:1".to_string();
    })
    .await;
    app.seed_account("pro-user", SubscriptionPlan::Pro, 0);

    let token = app.token_for("pro-user");
    let (status, body) = app
        .send(
            Method::POST,
            "/generate",
            Some(&token),
            Some(json!({ "topic": "sleep" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["type"], "generation_failed");
    assert!(!body.to_string().contains("test-gemini-key"), "{}", body);
    assert_eq!(app.tokens_used("pro-user"), 0);
}

#[tokio::test]
async fn test_unreachable_identity_api_hides_key() {
    let app = TestApp::start_with(true, |config| {
        config.identity.base_url = "http://127.0.0.1:1".to_string();
    })
    .await;

    let (status, body) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "a@example.com", "password": "pw" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["type"], "identity_unavailable");
    assert!(!body.to_string().contains("test-identity-key"), "{}", body);
}

#[tokio::test]
async fn test_forged_key_ids_do_not_refetch_keys() {
    let app = TestApp::start().await;
    let forged = generate_unknown_kid_jwt("intruder", &app.server.uri());

    for _ in 0..20 {
        let (status, _) = app.send(Method::GET, "/account", Some(&forged), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let jwks_fetches = app
        .server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == "/.well-known/jwks.json")
        .count();
    assert_eq!(jwks_fetches, 1);
}
