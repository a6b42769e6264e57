use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::debug;

use mathnook_types::api::Claims;

use crate::secret::AppState;

/// Optional caller identity from the surrounding application. Always present
/// as a request extension; `None` when no valid bearer JWT was sent.
#[derive(Debug, Clone, Default)]
pub struct Caller(pub Option<Claims>);

impl Caller {
    pub fn claims(&self) -> Option<&Claims> {
        self.0.as_ref()
    }
}

/// Attach the caller identity, if any. Never rejects: secret-panel routes
/// are gated by their own session token, not by the caller JWT.
pub async fn identify_caller(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let claims = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(|token| decode_caller(token, state.jwt_secret()));

    req.extensions_mut().insert(Caller(claims));
    next.run(req).await
}

fn decode_caller(token: &str, secret: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| debug!("Ignoring invalid caller token: {}", e))
    .ok()
    .map(|data| data.claims)
}

/// Issues a caller-identity JWT in the format [`identify_caller`] accepts.
#[cfg(test)]
pub(crate) fn create_caller_token(
    secret: &str,
    user_id: uuid::Uuid,
    username: &str,
    ttl: chrono::Duration,
) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + ttl).timestamp() as usize,
    };

    let token = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
