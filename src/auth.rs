//! Admin session gate: credential check, session store, and the guard
//! middleware protecting admin-only routes.
//!
//! Password hashing uses Argon2id with OWASP-recommended parameters
//! (memory: 19 MiB, iterations: 2, parallelism: 1). Salt is randomly
//! generated per hash.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use axum::http::header::COOKIE;
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::Response;
use sqlx::PgPool;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::db;
use crate::error::AppError;
use crate::models::AdminIdentity;

pub const SESSION_COOKIE: &str = "qareebeen_session";

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    // OWASP ASVS recommended: m=19456 (19 MiB), t=2, p=1
    let params = argon2::Params::new(19456, 2, 1, None)
        .map_err(|e| anyhow!("argon2 params error: {e}"))?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("password hash error: {e}"))?;

    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed_hash = argon2::PasswordHash::new(hash)
        .map_err(|e| anyhow!("invalid hash format: {e}"))?;

    let argon2 = Argon2::default();
    match argon2.verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow!("verify error: {e}")),
    }
}

#[derive(Debug, Clone)]
struct SessionEntry {
    identity: AdminIdentity,
    expires_at: Instant,
}

/// In-process store mapping opaque tokens to admin identities. Expired
/// entries are dropped lazily on access.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<String, SessionEntry>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Mint a fresh opaque token for an authenticated admin. Stale entries
    /// are swept here so abandoned tokens do not pile up between logins.
    pub async fn insert(&self, identity: AdminIdentity) -> String {
        let token = Uuid::new_v4().to_string();
        let now = Instant::now();
        let entry = SessionEntry {
            identity,
            expires_at: now + self.ttl,
        };

        let mut sessions = self.sessions.lock().await;
        sessions.retain(|_, existing| existing.expires_at > now);
        sessions.insert(token.clone(), entry);
        token
    }

    pub async fn get(&self, token: &str) -> Option<AdminIdentity> {
        let mut sessions = self.sessions.lock().await;
        match sessions.get(token) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.identity.clone()),
            Some(_) => {
                sessions.remove(token);
                None
            }
            None => None,
        }
    }

    pub async fn remove(&self, token: &str) {
        self.sessions.lock().await.remove(token);
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

/// Credential check: email lookup plus password-hash comparison. Unknown
/// email and wrong password produce the same `Unauthorized` answer.
pub async fn login(
    pool: &PgPool,
    store: &SessionStore,
    email: &str,
    password: &str,
) -> Result<(String, AdminIdentity), AppError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(AppError::validation(
            "البريد الإلكتروني وكلمة المرور مطلوبان",
        ));
    }

    let admin = db::find_admin_by_email(pool, email.trim())
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !verify_password(password, &admin.password_hash)? {
        return Err(AppError::Unauthorized);
    }

    let identity = AdminIdentity {
        id: admin.id,
        email: admin.email,
        name: admin.name,
    };
    let token = store.insert(identity.clone()).await;

    tracing::info!(admin = %identity.email, "admin logged in");
    Ok((token, identity))
}

/// Pull the session token out of the Cookie header, if any.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(COOKIE)?.to_str().ok()?;
    for pair in cookies.split(';') {
        let mut parts = pair.trim().splitn(2, '=');
        if parts.next() == Some(SESSION_COOKIE) {
            return parts.next().map(str::to_string);
        }
    }
    None
}

/// Guard middleware for admin-only routes. Resolves the session cookie and
/// stashes the admin identity in request extensions for handlers.
pub async fn require_admin(
    axum::extract::State(store): axum::extract::State<SessionStore>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = session_token(req.headers()).ok_or(AppError::Unauthorized)?;
    let identity = store.get(&token).await.ok_or(AppError::Unauthorized)?;

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn identity() -> AdminIdentity {
        AdminIdentity {
            id: Uuid::new_v4(),
            email: "admin@qareebeen.com".to_string(),
            name: "Admin".to_string(),
        }
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("qareeben@qareeben#5").unwrap();
        assert!(verify_password("qareeben@qareeben#5", &hash).unwrap());
        assert!(!verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash_password("secret").unwrap();
        let b = hash_password("secret").unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn session_round_trip() {
        let store = SessionStore::new(Duration::from_secs(60));
        let token = store.insert(identity()).await;

        let resolved = store.get(&token).await.unwrap();
        assert_eq!(resolved.email, "admin@qareebeen.com");

        store.remove(&token).await;
        assert!(store.get(&token).await.is_none());
    }

    #[tokio::test]
    async fn expired_session_is_dropped() {
        let store = SessionStore::new(Duration::from_secs(0));
        let token = store.insert(identity()).await;
        assert!(store.get(&token).await.is_none());
        // A second lookup must not resurrect it.
        assert!(store.get(&token).await.is_none());
    }

    #[tokio::test]
    async fn stale_sessions_are_swept_on_insert() {
        let store = SessionStore::new(Duration::from_secs(0));
        let abandoned = store.insert(identity()).await;
        store.insert(identity()).await;

        let sessions = store.sessions.lock().await;
        assert_eq!(sessions.len(), 1);
        assert!(!sessions.contains_key(&abandoned));
    }

    #[tokio::test]
    async fn unknown_token_is_anonymous() {
        let store = SessionStore::new(Duration::from_secs(60));
        assert!(store.get("not-a-token").await.is_none());
    }

    #[test]
    fn session_token_parses_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; qareebeen_session=abc123; lang=ar"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("abc123"));

        headers.insert(COOKIE, HeaderValue::from_static("theme=dark"));
        assert!(session_token(&headers).is_none());
    }
}
