use anyhow::{anyhow, Result};
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::watch;

use crate::types::User;

const AVATAR_BASE_URL: &str = "https://api.dicebear.com/7.x/avataaars/svg";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix seconds.
    pub expires_at: i64,
    pub user: AuthUser,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: Option<i64>,
    expires_at: Option<i64>,
    user: AuthUser,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        let expires_at = self
            .expires_at
            .unwrap_or_else(|| Utc::now().timestamp() + self.expires_in.unwrap_or(3600));
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

/// Storefront view of an auth user: display name falls back to the email's local part.
pub fn map_user(user: &AuthUser) -> User {
    let email = user.email.clone().unwrap_or_default();
    let name = user
        .user_metadata
        .get("display_name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());

    User {
        id: user.id.clone(),
        avatar: format!("{}?seed={}", AVATAR_BASE_URL, email),
        name,
        email,
    }
}

// GoTrue reports failures under a handful of different keys depending on the endpoint.
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            ["error_description", "msg", "message", "error"]
                .iter()
                .find_map(|key| v.get(key).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| format!("HTTP {}", status))
}

/// Password auth against a Supabase project's GoTrue endpoint.
///
/// Holds the current session and broadcasts every change to subscribers.
pub struct SupabaseClient {
    http: reqwest::Client,
    auth_url: String,
    anon_key: String,
    session: watch::Sender<Option<Session>>,
}

impl SupabaseClient {
    pub fn new(url: &str, anon_key: &str) -> Self {
        // Ensure URL ends with /auth/v1
        let auth_url = if url.ends_with("/auth/v1") {
            url.to_string()
        } else {
            format!("{}/auth/v1", url.trim_end_matches('/'))
        };

        let (session, _) = watch::channel(None);

        SupabaseClient {
            http: reqwest::Client::new(),
            auth_url,
            anon_key: anon_key.to_string(),
            session,
        }
    }

    pub fn auth_url(&self) -> &str {
        &self.auth_url
    }

    fn headers(&self, bearer: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert("apikey", HeaderValue::from_str(&self.anon_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let token = bearer.unwrap_or(&self.anon_key);
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", token))?);
        Ok(headers)
    }

    async fn post(&self, path: &str, bearer: Option<&str>, body: &Value) -> Result<String> {
        let url = format!("{}{}", self.auth_url, path);
        let response = self
            .http
            .post(&url)
            .headers(self.headers(bearer)?)
            .json(body)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to reach auth service: {}", e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| anyhow!("Failed to read response: {}", e))?;

        if !status.is_success() {
            return Err(anyhow!(error_message(status, &text)));
        }
        Ok(text)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        tracing::info!("Signing in {}", email);
        let text = self
            .post(
                "/token?grant_type=password",
                None,
                &json!({ "email": email, "password": password }),
            )
            .await?;

        let token: TokenResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse session: {}", e))?;
        let session = token.into_session();
        self.set_session(Some(session.clone()));
        Ok(session)
    }

    /// Register a new account. Returns a session only when the project auto-confirms email.
    pub async fn sign_up(&self, email: &str, password: &str, display_name: &str) -> Result<Option<Session>> {
        tracing::info!("Signing up {}", email);
        let text = self
            .post(
                "/signup",
                None,
                &json!({
                    "email": email,
                    "password": password,
                    "data": { "display_name": display_name },
                }),
            )
            .await?;

        let value: Value = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse signup response: {}", e))?;
        if value.get("access_token").is_none() {
            tracing::info!("Signup for {} awaits email confirmation", email);
            return Ok(None);
        }

        let token: TokenResponse = serde_json::from_value(value)
            .map_err(|e| anyhow!("Failed to parse session: {}", e))?;
        let session = token.into_session();
        self.set_session(Some(session.clone()));
        Ok(Some(session))
    }

    /// Revoke the current session. The local session is cleared even if the call fails.
    pub async fn sign_out(&self) -> Result<()> {
        let current = self.session();
        self.set_session(None);

        if let Some(session) = current {
            if let Err(e) = self.post("/logout", Some(session.access_token.as_str()), &json!({})).await {
                tracing::warn!("Remote sign-out failed: {}", e);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Current session, if any and not yet expired.
    pub fn session(&self) -> Option<Session> {
        self.session.borrow().clone().filter(|s| !s.is_expired())
    }

    pub fn current_user(&self) -> Option<User> {
        self.session().map(|s| map_user(&s.user))
    }

    /// Install a previously persisted session.
    pub fn restore(&self, session: Session) {
        if session.is_expired() {
            tracing::debug!("Discarding expired session for {}", session.user.id);
            return;
        }
        self.set_session(Some(session));
    }

    /// Receive every session change: sign-in, sign-up with auto-confirm, sign-out, restore.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.session.subscribe()
    }

    fn set_session(&self, session: Option<Session>) {
        self.session.send_replace(session);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth_user(metadata: Value) -> AuthUser {
        AuthUser {
            id: "user-1".into(),
            email: Some("dara@example.com".into()),
            user_metadata: metadata,
        }
    }

    fn session(expires_at: i64) -> Session {
        Session {
            access_token: "at".into(),
            refresh_token: "rt".into(),
            expires_at,
            user: auth_user(json!({})),
        }
    }

    #[test]
    fn test_map_user_prefers_display_name() {
        let user = map_user(&auth_user(json!({ "display_name": "Dara" })));
        assert_eq!(user.name, "Dara");
        assert_eq!(user.email, "dara@example.com");
        assert_eq!(user.avatar, "https://api.dicebear.com/7.x/avataaars/svg?seed=dara@example.com");
    }

    #[test]
    fn test_map_user_falls_back_to_email_local_part() {
        assert_eq!(map_user(&auth_user(json!({}))).name, "dara");
        assert_eq!(map_user(&auth_user(json!({ "display_name": "" }))).name, "dara");
    }

    #[test]
    fn test_token_response_parsing() {
        let body = r#"{
            "access_token": "at",
            "token_type": "bearer",
            "expires_in": 3600,
            "expires_at": 1900000000,
            "refresh_token": "rt",
            "user": { "id": "u1", "email": "a@b.c", "user_metadata": { "display_name": "A" } }
        }"#;
        let session = serde_json::from_str::<TokenResponse>(body).unwrap().into_session();
        assert_eq!(session.expires_at, 1900000000);
        assert_eq!(map_user(&session.user).name, "A");
    }

    #[test]
    fn test_error_message_extraction() {
        let status = reqwest::StatusCode::BAD_REQUEST;
        assert_eq!(
            error_message(status, r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#),
            "Invalid login credentials"
        );
        assert_eq!(error_message(status, r#"{"msg":"User already registered"}"#), "User already registered");
        assert_eq!(error_message(status, "<html>"), "HTTP 400 Bad Request");
    }

    #[test]
    fn test_auth_url_normalization() {
        assert_eq!(SupabaseClient::new("https://x.supabase.co/", "k").auth_url(), "https://x.supabase.co/auth/v1");
        assert_eq!(SupabaseClient::new("https://x.supabase.co/auth/v1", "k").auth_url(), "https://x.supabase.co/auth/v1");
    }

    #[tokio::test]
    async fn test_restore_notifies_and_skips_expired() {
        let client = SupabaseClient::new("https://x.supabase.co", "k");
        let mut rx = client.subscribe();

        client.restore(session(0));
        assert!(client.session().is_none());

        client.restore(session(Utc::now().timestamp() + 600));
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_some());
        assert_eq!(client.current_user().unwrap().name, "dara");

        // No network call is made without a session.
        client.set_session(None);
        client.sign_out().await.unwrap();
        assert!(client.session().is_none());
    }
}
