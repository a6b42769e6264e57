use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- JWT Claims --

/// Claims of the optional caller-identity JWT issued by the surrounding
/// application. Only used for attributing persisted sessions and chat logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Secret login --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub session_token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LogoutRequest {
    pub session_token: String,
}

// -- Chat --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChatRequest {
    pub message: String,
    pub session_token: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

// -- Proxy --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProxyRequest {
    pub url: String,
    pub session_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProxyResponse {
    pub content: String,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_accepts_camel_case_and_optional_image() {
        let req: ChatRequest =
            serde_json::from_str(r#"{"message":"hi","sessionToken":"abc"}"#).unwrap();
        assert_eq!(req.session_token, "abc");
        assert!(req.image_url.is_none());

        let req: ChatRequest = serde_json::from_str(
            r#"{"message":"hi","sessionToken":"abc","imageUrl":"https://example.com/a.png"}"#,
        )
        .unwrap();
        assert_eq!(req.image_url.as_deref(), Some("https://example.com/a.png"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let res = serde_json::from_str::<ProxyRequest>(
            r#"{"url":"https://example.com","sessionToken":"abc","extra":1}"#,
        );
        assert!(res.is_err());
    }

    #[test]
    fn login_response_uses_contract_field_names() {
        let json = serde_json::to_value(LoginResponse {
            session_token: "tok".into(),
            expires_at: Utc::now(),
        })
        .unwrap();
        assert_eq!(json["sessionToken"], "tok");
        assert!(json.get("expiresAt").is_some());
    }
}
