use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;

use mathnook_types::api::{ChatRequest, LoginRequest, LogoutRequest, ProxyRequest};

use crate::error::{INVALID_SESSION, SecretError};
use crate::middleware::{Caller, identify_caller};
use crate::secret::AppState;

/// Header carrying the secret session token on GET routes.
pub const SESSION_HEADER: &str = "x-secret-session";

/// All secret-panel routes, with caller identification applied.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/secret/login", post(login))
        .route("/secret/logout", post(logout))
        .route("/secret/chat", post(chat))
        .route("/secret/proxy", post(proxy))
        .route("/secret/history", get(history))
        .layer(middleware::from_fn_with_state(state.clone(), identify_caller))
        .with_state(state)
}

pub async fn login(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, SecretError> {
    let res = state.login(req, caller.claims()).await?;
    Ok(Json(res))
}

pub async fn logout(
    State(state): State<AppState>,
    Json(req): Json<LogoutRequest>,
) -> Result<impl IntoResponse, SecretError> {
    state.logout(&req.session_token).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn chat(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(req): Json<ChatRequest>,
) -> Result<impl IntoResponse, SecretError> {
    let res = state.chat(req, caller.claims()).await?;
    Ok(Json(res))
}

pub async fn proxy(
    State(state): State<AppState>,
    Json(req): Json<ProxyRequest>,
) -> Result<impl IntoResponse, SecretError> {
    let res = state.proxy(req).await?;
    Ok(Json(res))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<u32>,
}

pub async fn history(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<HistoryQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, SecretError> {
    let token = headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(SecretError::Unauthorized(INVALID_SESSION))?;

    let messages = state.history(token, caller.claims(), query.limit).await?;
    Ok(Json(messages))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, header};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use uuid::Uuid;

    use mathnook_db::Database;

    use crate::chat_log::ChatLog;
    use crate::config::SecretConfig;
    use crate::middleware::create_caller_token;
    use crate::secret::SecretService;

    fn app() -> Router {
        let config = SecretConfig::default();
        let db = Arc::new(Database::open_in_memory().unwrap());
        let (chat_log, _writer) = ChatLog::spawn(db.clone(), 16);
        let service = SecretService::new(&config, db, chat_log).unwrap();
        router(Arc::new(service))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn login(app: &Router) -> String {
        let (status, body) = send(
            app,
            post_json("/secret/login", json!({"username": "admin", "password": "secret123"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["sessionToken"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn login_rejects_bad_credentials_with_error_body() {
        let app = app();
        let (status, body) = send(
            &app,
            post_json("/secret/login", json!({"username": "wrong", "password": "wrong"})),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
        assert_eq!(body["error"]["message"], "Invalid credentials");
    }

    #[tokio::test]
    async fn login_returns_contract_fields() {
        let app = app();
        let (status, body) = send(
            &app,
            post_json("/secret/login", json!({"username": "admin", "password": "secret123"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sessionToken"].as_str().unwrap().len(), 64);
        let expires: chrono::DateTime<chrono::Utc> =
            serde_json::from_value(body["expiresAt"].clone()).unwrap();
        assert!(expires > chrono::Utc::now());
    }

    #[tokio::test]
    async fn chat_roundtrip_over_http() {
        let app = app();
        let token = login(&app).await;

        let (status, body) = send(
            &app,
            post_json("/secret/chat", json!({"message": "What is 2+2?", "sessionToken": token})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["response"].as_str().unwrap().contains("2 + 2"));

        let (status, body) = send(
            &app,
            post_json("/secret/chat", json!({"message": "Hello", "sessionToken": "invalid-token"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["message"], "Invalid or expired secret session");
    }

    #[tokio::test]
    async fn proxy_status_codes() {
        let app = app();
        let (status, _) = send(
            &app,
            post_json("/secret/proxy", json!({"url": "https://example.com", "sessionToken": "invalid-token"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let token = login(&app).await;
        let (status, body) = send(
            &app,
            post_json("/secret/proxy", json!({"url": "not-a-valid-url", "sessionToken": token})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn logout_then_token_is_dead() {
        let app = app();
        let token = login(&app).await;

        let (status, _) = send(&app, post_json("/secret/logout", json!({"sessionToken": token}))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(
            &app,
            post_json("/secret/chat", json!({"message": "2+2", "sessionToken": token})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn history_follows_caller_identity() {
        let app = app();
        let token = login(&app).await;
        let caller_jwt = create_caller_token(
            "dev-secret-change-me",
            Uuid::new_v4(),
            "student",
            chrono::Duration::hours(1),
        )
        .unwrap();

        let mut chat = post_json(
            "/secret/chat",
            json!({"message": "derivative of x^2", "sessionToken": token}),
        );
        chat.headers_mut().insert(
            header::AUTHORIZATION,
            format!("Bearer {}", caller_jwt).parse().unwrap(),
        );
        let (status, _) = send(&app, chat).await;
        assert_eq!(status, StatusCode::OK);

        let history_req = || {
            Request::get("/secret/history?limit=10")
                .header(SESSION_HEADER, token.as_str())
                .header(header::AUTHORIZATION, format!("Bearer {}", caller_jwt))
                .body(Body::empty())
                .unwrap()
        };

        // The chat log is written off the request path.
        let mut entries = Vec::new();
        for _ in 0..50 {
            let (status, body) = send(&app, history_req()).await;
            assert_eq!(status, StatusCode::OK);
            entries = body.as_array().cloned().unwrap_or_default();
            if entries.len() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["role"], "user");
        assert_eq!(entries[0]["content"], "derivative of x^2");
        assert_eq!(entries[1]["role"], "assistant");

        let anonymous = Request::get("/secret/history")
            .header(SESSION_HEADER, token.as_str())
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, anonymous).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["message"], "Caller identity required");
    }

    #[tokio::test]
    async fn invalid_caller_jwt_does_not_block_login() {
        let app = app();
        let mut req = post_json("/secret/login", json!({"username": "admin", "password": "secret123"}));
        req.headers_mut()
            .insert(header::AUTHORIZATION, "Bearer not-a-jwt".parse().unwrap());

        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
    }
}
