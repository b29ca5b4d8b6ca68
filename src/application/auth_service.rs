// Auth service - Credential issuance and validation against the auth backend
use crate::application::bounded_fetch::BoundedFetch;
use crate::application::error::FetchError;
use crate::application::session::Session;
use crate::application::transport::ApiRequest;
use crate::domain::session::{Credential, UserRecord};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum AuthError {
    #[error("{0}")]
    Rejected(String),

    #[error("No token available. Please log in first.")]
    NotLoggedIn,

    #[error(transparent)]
    Fetch(FetchError),
}

impl From<FetchError> for AuthError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Http {
                message: Some(message),
                ..
            } => AuthError::Rejected(message),
            other => AuthError::Fetch(other),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginBody {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    user_id: Option<serde_json::Value>,
    #[serde(default)]
    short_token: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VerifyBody {
    user: UserRecord,
}

#[derive(Clone)]
pub struct AuthService {
    fetch: BoundedFetch,
    session: Arc<Session>,
    bound: Duration,
}

impl AuthService {
    pub fn new(fetch: BoundedFetch, session: Arc<Session>, bound: Duration) -> Self {
        Self {
            fetch,
            session,
            bound,
        }
    }

    pub fn current_user(&self) -> Option<UserRecord> {
        self.session.credential().and_then(|c| c.user)
    }

    pub async fn register(&self, email: &str, password: &str, name: &str) -> Result<String, AuthError> {
        let request = ApiRequest::post("/api/auth/register")
            .with_json(json!({ "email": email, "password": password, "name": name }));
        let body: MessageBody = self.fetch.fetch_json(request, self.bound).await?;
        Ok(body
            .message
            .unwrap_or_else(|| "User registered successfully.".to_string()))
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<String, AuthError> {
        let request = ApiRequest::post("/api/auth/login")
            .with_json(json!({ "email": email, "password": password }));
        let body: LoginBody = self.fetch.fetch_json(request, self.bound).await?;

        let token = body
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::Rejected("Login response carried no token.".to_string()))?;
        self.session.replace(Some(Credential {
            token,
            user: Some(UserRecord {
                id: body.user_id,
                email: Some(email.to_string()),
                name: None,
                short_token: body.short_token,
            }),
        }));
        tracing::info!(email, "logged in");

        Ok(body.message.unwrap_or_else(|| "Login successful.".to_string()))
    }

    /// Check the stored token and refresh the stored user record.
    pub async fn verify(&self) -> Result<UserRecord, AuthError> {
        let mut credential = self.session.credential().ok_or(AuthError::NotLoggedIn)?;
        let body: VerifyBody = self
            .fetch
            .fetch_json(ApiRequest::get("/api/auth/verify"), self.bound)
            .await?;

        credential.user = Some(body.user.clone());
        self.session.replace(Some(credential));
        Ok(body.user)
    }

    /// Sign out. The local credential is dropped whatever the server says.
    pub async fn logout(&self) -> Result<String, AuthError> {
        if self.session.credential().is_none() {
            return Ok("Already logged out.".to_string());
        }

        let result: Result<MessageBody, FetchError> = self
            .fetch
            .fetch_json(ApiRequest::post("/api/auth/logout"), self.bound)
            .await;
        self.session.replace(None);
        tracing::info!("logged out");

        let body = result?;
        Ok(body.message.unwrap_or_else(|| "Logout successful.".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::session::tests::MemoryStore;
    use crate::application::testing::{Reply, ScriptedTransport};
    use crate::application::transport::Method;

    fn service(transport: &Arc<ScriptedTransport>) -> (AuthService, Arc<Session>) {
        let session = Arc::new(Session::restore(Arc::new(MemoryStore::default())));
        let auth = AuthService::new(
            BoundedFetch::new(transport.clone()),
            session.clone(),
            Duration::from_secs(3),
        );
        (auth, session)
    }

    #[tokio::test]
    async fn test_login_stores_credential() {
        let transport = ScriptedTransport::new();
        transport.respond(
            Method::Post,
            "/api/auth/login",
            Reply::ok(json!({"token": "tok", "user_id": 7, "short_token": "tok…", "message": "Welcome"})),
        );
        let (auth, session) = service(&transport);

        assert_eq!(auth.login("a@b.c", "pw").await.unwrap(), "Welcome");
        let credential = session.credential().unwrap();
        assert_eq!(credential.token, "tok");
        assert_eq!(auth.current_user().unwrap().email.as_deref(), Some("a@b.c"));
    }

    #[tokio::test]
    async fn test_login_rejection_message() {
        let transport = ScriptedTransport::new();
        transport.respond(
            Method::Post,
            "/api/auth/login",
            Reply::json(401, json!({"error": "Invalid credentials."})),
        );
        let (auth, session) = service(&transport);

        let err = auth.login("a@b.c", "bad").await.unwrap_err();
        assert_eq!(err, AuthError::Rejected("Invalid credentials.".to_string()));
        assert!(session.credential().is_none());
    }

    #[tokio::test]
    async fn test_verify_requires_token() {
        let transport = ScriptedTransport::new();
        let (auth, _session) = service(&transport);

        assert_eq!(auth.verify().await.unwrap_err(), AuthError::NotLoggedIn);
        assert_eq!(transport.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_logout_clears_even_on_failure() {
        let transport = ScriptedTransport::new();
        transport.respond(Method::Post, "/api/auth/logout", Reply::unreachable());
        let (auth, session) = service(&transport);
        session.replace(Some(Credential {
            token: "tok".to_string(),
            user: None,
        }));

        assert!(auth.logout().await.is_err());
        assert!(session.credential().is_none());
        assert_eq!(auth.logout().await.unwrap(), "Already logged out.");
    }
}
