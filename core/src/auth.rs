use std::fmt;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::error::{AgentError, Result};

/// An authenticated session
#[derive(Clone)]
pub struct Session {
    token: String,
    established_at: DateTime<Utc>,
}

impl Session {
    pub fn established_at(&self) -> DateTime<Utc> {
        self.established_at
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("established_at", &self.established_at)
            .finish()
    }
}

/// Explicit holder of the bearer token.
///
/// Collaborators that talk to the backend receive an `Arc<AuthContext>`.
/// The session begins with [`AuthContext::login`] and ends with
/// [`AuthContext::logout`]; requests made outside a session fail with
/// [`AgentError::Unauthorized`].
///
/// # Examples
///
/// ```rust
/// use agent_core::auth::AuthContext;
///
/// let auth = AuthContext::new();
/// assert!(auth.bearer().is_err());
///
/// auth.login("abc123").unwrap();
/// assert_eq!(auth.bearer().unwrap(), "Bearer abc123");
///
/// auth.logout();
/// assert!(!auth.is_authenticated());
/// ```
#[derive(Debug, Default)]
pub struct AuthContext {
    session: RwLock<Option<Session>>,
}

impl AuthContext {
    /// Context without a session
    pub fn new() -> Self {
        Self::default()
    }

    /// Context with a session already established
    pub fn with_token(token: impl Into<String>) -> Result<Self> {
        let context = Self::new();
        context.login(token)?;
        Ok(context)
    }

    /// Begin a session, replacing any previous one
    pub fn login(&self, token: impl Into<String>) -> Result<()> {
        let token = token.into().trim().to_string();
        if token.is_empty() {
            return Err(AgentError::empty_field("token"));
        }

        let replaced = self
            .session
            .write()
            .replace(Session {
                token,
                established_at: Utc::now(),
            })
            .is_some();
        info!(replaced_session = replaced, "Session established");
        Ok(())
    }

    /// End the session; returns whether one was active
    pub fn logout(&self) -> bool {
        let ended = self.session.write().take().is_some();
        if ended {
            info!("Session ended");
        }
        ended
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.read().is_some()
    }

    pub fn session(&self) -> Option<Session> {
        self.session.read().clone()
    }

    /// `Authorization` header value for the active session
    pub fn bearer(&self) -> Result<String> {
        match self.session.read().as_ref() {
            Some(session) => Ok(format!("Bearer {}", session.token)),
            None => {
                debug!("Request attempted without an active session");
                Err(AgentError::Unauthorized("no active session".to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_rejects_blank_token() {
        let auth = AuthContext::new();
        assert!(auth.login("   ").unwrap_err().is_validation());
        assert!(!auth.is_authenticated());
    }

    #[test]
    fn test_login_replaces_session() {
        let auth = AuthContext::with_token("first").unwrap();
        auth.login("second").unwrap();
        assert_eq!(auth.bearer().unwrap(), "Bearer second");
        assert!(auth.logout());
        assert!(!auth.logout());
    }

    #[test]
    fn test_session_debug_redacts_token() {
        let auth = AuthContext::with_token("super-secret").unwrap();
        let rendered = format!("{:?}", auth.session().unwrap());
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_unauthenticated_bearer_is_auth_error() {
        let err = AuthContext::new().bearer().unwrap_err();
        assert_eq!(err.class(), crate::error::ErrorClass::Auth);
    }
}
