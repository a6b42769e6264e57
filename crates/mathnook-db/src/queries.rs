use crate::models::{ChatMessageRow, SessionRow};
use crate::{Database, format_timestamp};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

impl Database {
    // -- Secret sessions --

    pub fn create_session(
        &self,
        owner_id: Option<&str>,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO secret_sessions (token, owner_id, expires_at, is_active) VALUES (?1, ?2, ?3, 1)",
                rusqlite::params![token, owner_id, format_timestamp(expires_at)],
            )?;
            Ok(())
        })
    }

    pub fn get_session_by_token(&self, token: &str) -> Result<Option<SessionRow>> {
        self.with_conn(|conn| query_session(conn, token))
    }

    /// Returns true if a row was deactivated.
    pub fn deactivate_session(&self, token: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE secret_sessions SET is_active = 0 WHERE token = ?1 AND is_active = 1",
                [token],
            )?;
            Ok(changed > 0)
        })
    }

    /// Marks every session whose expiry is at or before `now` inactive.
    /// Rows are kept for auditing.
    pub fn deactivate_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE secret_sessions SET is_active = 0 WHERE is_active = 1 AND expires_at <= ?1",
                [format_timestamp(now)],
            )?;
            Ok(changed)
        })
    }

    // -- Chat log --

    /// Appends one chat entry and returns its id.
    pub fn append_chat_message(
        &self,
        owner_id: &str,
        role: &str,
        content: &str,
        image_url: Option<&str>,
    ) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let created_at = format_timestamp(Utc::now());
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO chat_messages (id, owner_id, role, content, image_url, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, owner_id, role, content, image_url, created_at],
            )?;
            Ok(())
        })?;
        Ok(id)
    }

    /// Most recent `limit` entries for an owner, oldest first.
    pub fn get_chat_messages(&self, owner_id: &str, limit: u32) -> Result<Vec<ChatMessageRow>> {
        self.with_conn(|conn| query_chat_messages(conn, owner_id, limit))
    }
}

fn query_session(conn: &Connection, token: &str) -> Result<Option<SessionRow>> {
    let mut stmt = conn.prepare(
        "SELECT token, owner_id, expires_at, is_active FROM secret_sessions WHERE token = ?1",
    )?;

    let row = stmt
        .query_row([token], |row| {
            Ok(SessionRow {
                token: row.get(0)?,
                owner_id: row.get(1)?,
                expires_at: row.get(2)?,
                is_active: row.get::<_, i64>(3)? != 0,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_chat_messages(conn: &Connection, owner_id: &str, limit: u32) -> Result<Vec<ChatMessageRow>> {
    // rowid breaks ties between the two halves of a turn written in the same microsecond
    let mut stmt = conn.prepare(
        "SELECT id, owner_id, role, content, image_url, created_at FROM (
             SELECT rowid AS seq, id, owner_id, role, content, image_url, created_at
             FROM chat_messages
             WHERE owner_id = ?1
             ORDER BY created_at DESC, seq DESC
             LIMIT ?2
         )
         ORDER BY created_at ASC, seq ASC",
    )?;

    let rows = stmt
        .query_map(rusqlite::params![owner_id, limit], |row| {
            Ok(ChatMessageRow {
                id: row.get(0)?,
                owner_id: row.get(1)?,
                role: row.get(2)?,
                content: row.get(3)?,
                image_url: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}
