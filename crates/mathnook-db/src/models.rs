/// Database row types, mapped directly from SQLite rows.
/// Timestamps stay as stored strings; callers parse them with
/// `crate::parse_timestamp`.

pub struct SessionRow {
    pub token: String,
    pub owner_id: Option<String>,
    pub expires_at: String,
    pub is_active: bool,
}

pub struct ChatMessageRow {
    pub id: String,
    pub owner_id: String,
    pub role: String,
    pub content: String,
    pub image_url: Option<String>,
    pub created_at: String,
}
