use serde::{Deserialize, Serialize};

/// Successful `POST auth/token` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// `GET auth/me` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct UserProfile {
    #[serde(default)]
    pub id: Option<i64>,
    pub username: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl UserProfile {
    /// Full name when the server has one, otherwise the username
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_token_response() {
        let json = r#"{"access_token": "abc123", "token_type": "bearer"}"#;
        let token: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(token.access_token, "abc123");
        assert_eq!(token.token_type.as_deref(), Some("bearer"));

        // token_type is optional
        let token: TokenResponse = serde_json::from_str(r#"{"access_token": "x"}"#).unwrap();
        assert_eq!(token.token_type, None);
    }

    #[test]
    fn test_token_response_requires_access_token() {
        assert!(serde_json::from_str::<TokenResponse>(r#"{"token_type": "bearer"}"#).is_err());
    }

    #[test]
    fn test_parse_user_profile() {
        let json = r#"{"id": 1, "username": "admin", "is_admin": true, "full_name": null, "email": "admin@example.com"}"#;
        let user: UserProfile = serde_json::from_str(json).unwrap();
        assert_eq!(user.username, "admin");
        assert!(user.is_admin);
        assert_eq!(user.display_name(), "admin");

        // Missing is_admin defaults to false
        let user: UserProfile = serde_json::from_str(r#"{"username": "bob", "full_name": "Bob B"}"#).unwrap();
        assert!(!user.is_admin);
        assert_eq!(user.display_name(), "Bob B");
    }
}
