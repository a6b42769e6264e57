use std::sync::Arc;

use tracing::{error, info, warn};

use mathnook_db::Database;
use mathnook_types::api::{
    ChatRequest, ChatResponse, Claims, LoginRequest, LoginResponse, ProxyRequest, ProxyResponse,
};
use mathnook_types::models::{ChatMessage, ChatRole, Session};

use crate::chat_log::{ChatLog, ChatTurn};
use crate::config::SecretConfig;
use crate::credentials::Credentials;
use crate::error::{CALLER_REQUIRED, INVALID_CREDENTIALS, STORAGE_FAILED, SecretError};
use crate::proxy::ProxyFetcher;
use crate::session::{SessionStore, prefix};
use crate::tutor::generate_math_response;

pub type AppState = Arc<SecretService>;

pub const DEFAULT_HISTORY_LIMIT: u32 = 50;
pub const MAX_HISTORY_LIMIT: u32 = 200;

/// The secret panel: credential login plus the session-gated chat and
/// proxy operations. Every gated operation verifies its token first.
pub struct SecretService {
    credentials: Credentials,
    sessions: Arc<SessionStore>,
    proxy: ProxyFetcher,
    chat_log: ChatLog,
    db: Arc<Database>,
    jwt_secret: String,
}

impl SecretService {
    pub fn new(config: &SecretConfig, db: Arc<Database>, chat_log: ChatLog) -> anyhow::Result<Self> {
        Ok(Self {
            credentials: Credentials::new(&config.username, &config.password),
            sessions: Arc::new(SessionStore::new(db.clone(), config.session_ttl)),
            proxy: ProxyFetcher::new(config.proxy_timeout, config.proxy_allowed_hosts.clone())?,
            chat_log,
            db,
            jwt_secret: config.jwt_secret.clone(),
        })
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }

    pub async fn login(
        &self,
        req: LoginRequest,
        caller: Option<&Claims>,
    ) -> Result<LoginResponse, SecretError> {
        if !self.credentials.verify(&req.username, &req.password) {
            warn!("Rejected secret login attempt");
            return Err(SecretError::Unauthorized(INVALID_CREDENTIALS));
        }

        let session = self.sessions.issue(caller.map(|c| c.sub)).await;

        Ok(LoginResponse {
            session_token: session.token,
            expires_at: session.expires_at,
        })
    }

    pub async fn verify_session(&self, token: &str) -> Result<Session, SecretError> {
        self.sessions.verify(token).await
    }

    pub async fn chat(
        &self,
        req: ChatRequest,
        caller: Option<&Claims>,
    ) -> Result<ChatResponse, SecretError> {
        self.verify_session(&req.session_token).await?;

        let response = generate_math_response(&req.message, req.image_url.is_some());

        if let Some(claims) = caller {
            self.chat_log.record(ChatTurn {
                owner_id: claims.sub,
                message: req.message,
                image_url: req.image_url,
                response: response.clone(),
            });
        }

        Ok(ChatResponse { response })
    }

    pub async fn proxy(&self, req: ProxyRequest) -> Result<ProxyResponse, SecretError> {
        let session = self.verify_session(&req.session_token).await?;

        let url = self.proxy.parse_target(&req.url)?;
        info!("Session {} proxying {}", prefix(&session.token), url);
        let content = self.proxy.fetch(url).await?;

        Ok(ProxyResponse { content })
    }

    pub async fn logout(&self, token: &str) -> Result<(), SecretError> {
        self.verify_session(token).await?;
        self.sessions.revoke(token).await
    }

    /// Chat history for the calling user, oldest first.
    pub async fn history(
        &self,
        token: &str,
        caller: Option<&Claims>,
        limit: Option<u32>,
    ) -> Result<Vec<ChatMessage>, SecretError> {
        self.verify_session(token).await?;
        let claims = caller.ok_or(SecretError::Unauthorized(CALLER_REQUIRED))?;

        let db = self.db.clone();
        let owner = claims.sub.to_string();
        let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, MAX_HISTORY_LIMIT);
        let rows = tokio::task::spawn_blocking(move || db.get_chat_messages(&owner, limit))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                SecretError::Internal(STORAGE_FAILED)
            })?
            .map_err(|e| {
                error!("Chat history query failed: {}", e);
                SecretError::Internal(STORAGE_FAILED)
            })?;

        let messages = rows
            .into_iter()
            .filter_map(|row| {
                let role = row
                    .role
                    .parse::<ChatRole>()
                    .map_err(|e| warn!("Corrupt role on chat message '{}': {}", row.id, e))
                    .ok()?;
                let timestamp = mathnook_db::parse_timestamp(&row.created_at)
                    .map_err(|e| warn!("Corrupt created_at '{}' on chat message '{}': {}", row.created_at, row.id, e))
                    .ok()?;
                let id = row
                    .id
                    .parse()
                    .map_err(|e| warn!("Corrupt chat message id '{}': {}", row.id, e))
                    .ok()?;
                Some(ChatMessage {
                    id,
                    role,
                    content: row.content,
                    image_url: row.image_url,
                    timestamp,
                })
            })
            .collect();

        Ok(messages)
    }
}
