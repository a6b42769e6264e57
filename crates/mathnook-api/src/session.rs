use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use rand::distr::Alphanumeric;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use mathnook_db::Database;
use mathnook_db::models::SessionRow;
use mathnook_types::models::Session;

use crate::error::{INVALID_SESSION, STORAGE_FAILED, SecretError};

pub const TOKEN_LEN: usize = 64;

/// Secret sessions with the database as the authority and an in-process
/// write-through cache in front of it.
///
/// Every login writes both. Every durable hit refills the cache without
/// overwriting what is already there. Revoked sessions stay cached as
/// inactive tombstones until they expire, so a refill racing a revoke cannot
/// bring the token back. Expired entries are evicted lazily on lookup and in
/// bulk by [`SessionStore::sweep`].
pub struct SessionStore {
    db: Arc<Database>,
    cache: RwLock<HashMap<String, Session>>,
    ttl: chrono::Duration,
}

impl SessionStore {
    pub fn new(db: Arc<Database>, ttl: chrono::Duration) -> Self {
        Self {
            db,
            cache: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Mints a fresh session. The durable write is best-effort: if it fails
    /// the token still works for the lifetime of this process.
    pub async fn issue(&self, owner_id: Option<Uuid>) -> Session {
        let session = Session {
            token: generate_token(),
            expires_at: Utc::now() + self.ttl,
            is_active: true,
            owner_id,
        };

        let db = self.db.clone();
        let token = session.token.clone();
        let expires_at = session.expires_at;
        let owner = owner_id.map(|id| id.to_string());
        match tokio::task::spawn_blocking(move || {
            db.create_session(owner.as_deref(), &token, expires_at)
        })
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Failed to persist secret session {}: {}", prefix(&session.token), e),
            Err(e) => error!("spawn_blocking join error: {}", e),
        }

        self.cache_insert(session.clone());
        info!("Issued secret session {}", prefix(&session.token));
        session
    }

    /// Resolves a token to a usable session or fails with `Unauthorized`.
    /// Never-issued, expired and revoked tokens are indistinguishable.
    pub async fn verify(&self, token: &str) -> Result<Session, SecretError> {
        let now = Utc::now();

        if let Some(cached) = self.cache_get(token) {
            if cached.is_usable_at(now) {
                return Ok(cached);
            }
            if cached.expires_at <= now {
                self.cache_remove(token);
            }
            return Err(SecretError::Unauthorized(INVALID_SESSION));
        }

        let db = self.db.clone();
        let lookup = token.to_string();
        let row = tokio::task::spawn_blocking(move || db.get_session_by_token(&lookup))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                SecretError::Unauthorized(INVALID_SESSION)
            })?
            .map_err(|e| {
                error!("Secret session lookup failed: {}", e);
                SecretError::Unauthorized(INVALID_SESSION)
            })?;

        let session = row
            .and_then(session_from_row)
            .filter(|s| s.is_usable_at(now))
            .ok_or(SecretError::Unauthorized(INVALID_SESSION))?;

        debug!("Refilled cache for secret session {}", prefix(token));
        let cached = self.cache_refill(session);
        if cached.is_usable_at(now) {
            Ok(cached)
        } else {
            Err(SecretError::Unauthorized(INVALID_SESSION))
        }
    }

    /// Deactivates a session everywhere. The durable update happens first so
    /// a failure leaves both copies untouched; the cache then keeps an
    /// inactive tombstone until the session would have expired.
    pub async fn revoke(&self, token: &str) -> Result<(), SecretError> {
        let db = self.db.clone();
        let target = token.to_string();
        tokio::task::spawn_blocking(move || db.deactivate_session(&target))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                SecretError::Internal(STORAGE_FAILED)
            })?
            .map_err(|e| {
                error!("Failed to revoke secret session {}: {}", prefix(token), e);
                SecretError::Internal(STORAGE_FAILED)
            })?;

        let expires_at = self
            .cache_get(token)
            .map(|s| s.expires_at)
            .unwrap_or_else(|| Utc::now() + self.ttl);
        self.cache_insert(Session {
            token: token.to_string(),
            expires_at,
            is_active: false,
            owner_id: None,
        });
        info!("Revoked secret session {}", prefix(token));
        Ok(())
    }

    /// Drops expired cache entries, tombstones included, and deactivates
    /// expired durable rows. Returns the number of cache entries removed.
    pub async fn sweep(&self) -> usize {
        let now = Utc::now();

        let removed = {
            let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
            let before = cache.len();
            cache.retain(|_, s| s.expires_at > now);
            before - cache.len()
        };

        let db = self.db.clone();
        match tokio::task::spawn_blocking(move || db.deactivate_expired_sessions(now)).await {
            Ok(Ok(count)) if count > 0 => debug!("Deactivated {} expired secret sessions", count),
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!("Session sweep DB error: {}", e),
            Err(e) => error!("spawn_blocking join error: {}", e),
        }

        removed
    }

    #[cfg(test)]
    fn cached_len(&self) -> usize {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn cache_get(&self, token: &str) -> Option<Session> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(token)
            .cloned()
    }

    fn cache_insert(&self, session: Session) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session.token.clone(), session);
    }

    /// Inserts only if the token has no entry yet; returns whichever entry
    /// ends up cached.
    fn cache_refill(&self, session: Session) -> Session {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(session.token.clone())
            .or_insert(session)
            .clone()
    }

    fn cache_remove(&self, token: &str) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(token);
    }
}

/// Background task that bounds the session cache.
pub async fn run_sweep_loop(store: Arc<SessionStore>, interval: Duration) {
    let mut interval = tokio::time::interval(interval);

    loop {
        interval.tick().await;

        let removed = store.sweep().await;
        if removed > 0 {
            info!("Sweep: evicted {} secret sessions from cache", removed);
        }
    }
}

/// 64 alphanumeric characters from the thread-local CSPRNG.
pub fn generate_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

fn session_from_row(row: SessionRow) -> Option<Session> {
    let expires_at = match mathnook_db::parse_timestamp(&row.expires_at) {
        Ok(ts) => ts,
        Err(e) => {
            warn!("Corrupt expires_at '{}' on secret session {}: {}", row.expires_at, prefix(&row.token), e);
            return None;
        }
    };

    let owner_id = row.owner_id.as_deref().and_then(|raw| {
        raw.parse::<Uuid>()
            .map_err(|e| warn!("Corrupt owner_id '{}' on secret session {}: {}", raw, prefix(&row.token), e))
            .ok()
    });

    Some(Session {
        token: row.token,
        expires_at,
        is_active: row.is_active,
        owner_id,
    })
}

/// Tokens are bearer secrets; logs only ever see a short prefix.
pub(crate) fn prefix(token: &str) -> &str {
    let end = token
        .char_indices()
        .nth(8)
        .map(|(i, _)| i)
        .unwrap_or(token.len());
    &token[..end]
}
