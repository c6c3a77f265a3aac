//! Authentication sessions.
//!
//! A [`SessionProvider`] answers one question: who, if anyone, is signed in
//! right now. The answer is an opaque session uid which the identity
//! resolver maps onto an owner record.

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use parking_lot::Mutex;
use serde::Deserialize;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub uid: String,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid session token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
    #[error("auth service refused the request: {0}")]
    Refused(String),
}

#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn current_session(&self) -> Result<Option<Session>, SessionError>;
    async fn end_session(&self) -> Result<(), SessionError>;
}

/// In-process session handle, signed in and out explicitly.
#[derive(Debug, Default)]
pub struct StaticSession {
    uid: Mutex<Option<String>>,
    refuse_sign_out: Mutex<Option<String>>,
}

impl StaticSession {
    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn signed_in(uid: impl Into<String>) -> Self {
        let session = Self::default();
        session.sign_in(uid);
        session
    }

    pub fn sign_in(&self, uid: impl Into<String>) {
        *self.uid.lock() = Some(uid.into());
    }

    /// Make subsequent `end_session` calls fail with `reason`.
    pub fn refuse_sign_out(&self, reason: impl Into<String>) {
        *self.refuse_sign_out.lock() = Some(reason.into());
    }
}

#[async_trait]
impl SessionProvider for StaticSession {
    async fn current_session(&self) -> Result<Option<Session>, SessionError> {
        Ok(self.uid.lock().clone().map(|uid| Session { uid }))
    }

    async fn end_session(&self) -> Result<(), SessionError> {
        if let Some(reason) = self.refuse_sign_out.lock().clone() {
            return Err(SessionError::Refused(reason));
        }
        *self.uid.lock() = None;
        Ok(())
    }
}

#[derive(Deserialize, Clone, Debug)]
struct Claims {
    sub: String,
}

/// Session carried by an HS256-signed bearer token; the `sub` claim is the
/// session uid. Ending the session drops the token.
pub struct TokenSession {
    key: DecodingKey,
    token: Mutex<Option<String>>,
}

impl TokenSession {
    pub fn new(secret: &str, token: Option<String>) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            token: Mutex::new(token),
        }
    }
}

#[async_trait]
impl SessionProvider for TokenSession {
    async fn current_session(&self) -> Result<Option<Session>, SessionError> {
        let Some(token) = self.token.lock().clone() else {
            return Ok(None);
        };
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        let data = decode::<Claims>(&token, &self.key, &validation)?;
        Ok(Some(Session {
            uid: data.claims.sub,
        }))
    }

    async fn end_session(&self) -> Result<(), SessionError> {
        self.token.lock().take();
        Ok(())
    }
}
