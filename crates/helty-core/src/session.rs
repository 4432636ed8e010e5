//! Session management: token lifecycle and renewal.
//!
//! A [`SessionManager`] owns the current [`TokenState`] and the credentials of
//! the last successful login. Before every API call the client asks it to
//! [`ensure_fresh_token`](SessionManager::ensure_fresh_token): nothing happens
//! while the token is fresh; otherwise it refreshes, then falls back to a full
//! password login.
//!
//! Renewals are serialized. When several tasks find the token stale at the
//! same time, only the first renews it and the others reuse the result.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{AuthFailureReason, Error, Result};
use crate::identity::{AuthOutcome, AuthRequest, AuthenticationResult, IdentityProvider};

/// Lifetime assumed when the provider does not report `ExpiresIn`.
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

/// Account credentials kept for re-authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    email: String,
    password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    fn login_request(&self) -> AuthRequest {
        AuthRequest::password(&self.email, &self.password)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Tokens of the current session.
///
/// Always replaced as a whole, so a reader never sees an id token paired with
/// the expiry of another.
#[derive(Clone)]
pub struct TokenState {
    pub access_token: Option<String>,
    /// Bearer token sent to the API.
    pub id_token: String,
    pub refresh_token: Option<String>,
    /// Provider expiry minus the renewal margin.
    pub expires_at: Instant,
    /// Wall-clock time the tokens were received.
    pub issued_at: OffsetDateTime,
    /// Lifetime declared by the provider.
    pub lifetime: Duration,
}

impl TokenState {
    /// Build the state for a fresh authentication result.
    ///
    /// `previous_refresh` is kept when the result carries no refresh token.
    pub fn from_result(
        result: AuthenticationResult,
        previous_refresh: Option<String>,
        margin: Duration,
    ) -> Self {
        let lifetime = result
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME);
        Self {
            access_token: result.access_token,
            id_token: result.id_token,
            refresh_token: result.refresh_token.or(previous_refresh),
            expires_at: Instant::now() + lifetime.saturating_sub(margin),
            issued_at: OffsetDateTime::now_utc(),
            lifetime,
        }
    }

    /// Whether the token can still be used without renewal.
    pub fn is_fresh(&self) -> bool {
        Instant::now() < self.expires_at
    }

    /// Time left until renewal is due.
    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}

impl fmt::Debug for TokenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenState")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_at", &self.expires_at)
            .field("issued_at", &self.issued_at)
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct SessionState {
    credentials: Option<Credentials>,
    tokens: Option<TokenState>,
}

/// Owns the token lifecycle of one account.
pub struct SessionManager {
    provider: Arc<dyn IdentityProvider>,
    expiry_margin: Duration,
    state: RwLock<SessionState>,
    renewal: Mutex<()>,
}

impl SessionManager {
    pub fn new(provider: Arc<dyn IdentityProvider>, expiry_margin: Duration) -> Self {
        Self {
            provider,
            expiry_margin,
            state: RwLock::new(SessionState::default()),
            renewal: Mutex::new(()),
        }
    }

    /// Log in with email and password.
    ///
    /// On success the credentials are kept for later re-authentication. On
    /// failure the previous session, if any, is left untouched.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<TokenState> {
        let credentials = Credentials::new(email, password);
        let tokens = self.login(&credentials).await?;

        let mut state = self.state.write().await;
        state.credentials = Some(credentials);
        state.tokens = Some(tokens.clone());
        info!(email, lifetime_secs = tokens.lifetime.as_secs(), "authenticated");
        Ok(tokens)
    }

    /// Renew the tokens with the refresh token.
    ///
    /// The refresh token itself is kept unless the provider issues a new one.
    pub async fn refresh(&self) -> Result<TokenState> {
        let refresh_token = {
            let state = self.state.read().await;
            state
                .tokens
                .as_ref()
                .and_then(|t| t.refresh_token.clone())
                .ok_or(Error::Auth(AuthFailureReason::NoRefreshToken))?
        };

        let request = AuthRequest::refresh(refresh_token.clone());
        let result = match self.provider.initiate_auth(&request).await? {
            AuthOutcome::Authenticated(result) => result,
            AuthOutcome::Challenge { name } => {
                return Err(Error::Auth(AuthFailureReason::ChallengeRequired {
                    challenge: name,
                }));
            }
        };

        let tokens = TokenState::from_result(result, Some(refresh_token), self.expiry_margin);
        self.state.write().await.tokens = Some(tokens.clone());
        debug!(lifetime_secs = tokens.lifetime.as_secs(), "token refreshed");
        Ok(tokens)
    }

    /// Make sure the current token is usable.
    ///
    /// Performs no provider call while the token is fresh. Otherwise tries a
    /// refresh, then a password login with the stored credentials.
    ///
    /// # Errors
    ///
    /// [`AuthFailureReason::NoCredentials`] when renewal is needed and no
    /// credentials are stored; any error of the final password login.
    pub async fn ensure_fresh_token(&self) -> Result<()> {
        if self.has_fresh_token().await {
            return Ok(());
        }

        let _renewal = self.renewal.lock().await;
        if self.has_fresh_token().await {
            debug!("token already renewed by a concurrent caller");
            return Ok(());
        }

        let (has_refresh_token, credentials) = {
            let state = self.state.read().await;
            (
                state
                    .tokens
                    .as_ref()
                    .is_some_and(|t| t.refresh_token.is_some()),
                state.credentials.clone(),
            )
        };

        if has_refresh_token {
            match self.refresh().await {
                Ok(_) => return Ok(()),
                Err(e) => debug!(error = %e, "token refresh failed, logging in again"),
            }
        }

        let Some(credentials) = credentials else {
            warn!("token expired and no credentials are stored");
            return Err(Error::Auth(AuthFailureReason::NoCredentials));
        };

        let tokens = self.login(&credentials).await?;
        self.state.write().await.tokens = Some(tokens);
        info!(email = credentials.email(), "re-authenticated");
        Ok(())
    }

    /// Mark the token as expired after the API rejected it.
    ///
    /// Only acts if `rejected_id_token` is still the current token, so a
    /// token renewed in the meantime by another task is not thrown away.
    /// Returns whether the token was expired.
    pub async fn force_expiry(&self, rejected_id_token: &str) -> bool {
        let mut state = self.state.write().await;
        match state.tokens.as_mut() {
            Some(tokens) if tokens.id_token == rejected_id_token => {
                tokens.expires_at = Instant::now();
                true
            }
            _ => false,
        }
    }

    /// Current bearer token, fresh or not.
    pub async fn id_token(&self) -> Option<String> {
        self.state
            .read()
            .await
            .tokens
            .as_ref()
            .map(|t| t.id_token.clone())
    }

    /// Snapshot of the current tokens.
    pub async fn tokens(&self) -> Option<TokenState> {
        self.state.read().await.tokens.clone()
    }

    /// Email of the authenticated account.
    pub async fn email(&self) -> Option<String> {
        self.state
            .read()
            .await
            .credentials
            .as_ref()
            .map(|c| c.email().to_string())
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.tokens.is_some()
    }

    /// Forget tokens and credentials.
    pub async fn sign_out(&self) {
        let mut state = self.state.write().await;
        *state = SessionState::default();
    }

    async fn has_fresh_token(&self) -> bool {
        self.state
            .read()
            .await
            .tokens
            .as_ref()
            .is_some_and(TokenState::is_fresh)
    }

    async fn login(&self, credentials: &Credentials) -> Result<TokenState> {
        let outcome = self
            .provider
            .initiate_auth(&credentials.login_request())
            .await?;
        match outcome {
            AuthOutcome::Authenticated(result) => {
                let previous = self
                    .state
                    .read()
                    .await
                    .tokens
                    .as_ref()
                    .and_then(|t| t.refresh_token.clone());
                Ok(TokenState::from_result(result, previous, self.expiry_margin))
            }
            AuthOutcome::Challenge { name } => {
                warn!(challenge = %name, "login requires an unsupported challenge");
                Err(Error::Auth(AuthFailureReason::ChallengeRequired {
                    challenge: name,
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockAuthReply, MockIdentityProvider};

    const MARGIN: Duration = Duration::from_secs(300);

    fn session() -> (SessionManager, Arc<MockIdentityProvider>) {
        let provider = Arc::new(MockIdentityProvider::new());
        (SessionManager::new(provider.clone(), MARGIN), provider)
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_is_lifetime_minus_margin() {
        let (session, _) = session();
        let start = Instant::now();

        let tokens = session.authenticate("ada@example.com", "pw").await.unwrap();

        assert_eq!(tokens.expires_at, start + Duration::from_secs(3300));
        assert_eq!(tokens.lifetime, Duration::from_secs(3600));
        assert_eq!(tokens.id_token, "id-token-1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_expires_in_defaults_to_an_hour() {
        let provider = Arc::new(MockIdentityProvider::new().with_expires_in(None));
        let session = SessionManager::new(provider, MARGIN);
        let start = Instant::now();

        let tokens = session.authenticate("ada@example.com", "pw").await.unwrap();
        assert_eq!(tokens.expires_at, start + Duration::from_secs(3300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_lifetime_saturates_to_immediate_expiry() {
        let provider = Arc::new(MockIdentityProvider::new().with_expires_in(Some(120)));
        let session = SessionManager::new(provider, MARGIN);

        let tokens = session.authenticate("ada@example.com", "pw").await.unwrap();
        assert!(!tokens.is_fresh());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_renewal_before_margin() {
        let (session, provider) = session();
        session.authenticate("ada@example.com", "pw").await.unwrap();

        tokio::time::advance(Duration::from_secs(3299)).await;
        session.ensure_fresh_token().await.unwrap();
        assert_eq!(provider.call_count(), 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        session.ensure_fresh_token().await.unwrap();
        assert_eq!(provider.call_count(), 2);
        assert_eq!(provider.refresh_calls(), 1);
        assert_eq!(session.id_token().await.as_deref(), Some("id-token-2"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_keeps_refresh_token() {
        let (session, _) = session();
        session.authenticate("ada@example.com", "pw").await.unwrap();

        let tokens = session.refresh().await.unwrap();
        assert_eq!(tokens.id_token, "id-token-2");
        assert_eq!(tokens.refresh_token.as_deref(), Some("refresh-token-1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_adopts_new_refresh_token() {
        let (session, provider) = session();
        session.authenticate("ada@example.com", "pw").await.unwrap();
        provider.push_reply(MockAuthReply::Tokens(AuthenticationResult {
            access_token: None,
            id_token: "rotated-id".to_string(),
            refresh_token: Some("rotated-refresh".to_string()),
            expires_in: Some(3600),
        }));

        let tokens = session.refresh().await.unwrap();
        assert_eq!(tokens.refresh_token.as_deref(), Some("rotated-refresh"));
    }

    #[tokio::test]
    async fn test_refresh_without_session() {
        let (session, provider) = session();
        let err = session.refresh().await.unwrap_err();
        assert_eq!(err, Error::Auth(AuthFailureReason::NoRefreshToken));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_falls_back_to_login() {
        let (session, provider) = session();
        session.authenticate("ada@example.com", "pw").await.unwrap();
        tokio::time::advance(Duration::from_secs(3300)).await;
        provider.push_reply(MockAuthReply::Reject(AuthFailureReason::InvalidCredentials));

        session.ensure_fresh_token().await.unwrap();

        let requests = provider.requests();
        assert_eq!(requests.len(), 3);
        assert!(!requests[0].is_refresh());
        assert!(requests[1].is_refresh());
        assert_eq!(requests[2], AuthRequest::password("ada@example.com", "pw"));
        assert!(session.tokens().await.unwrap().is_fresh());
    }

    #[tokio::test]
    async fn test_ensure_without_credentials() {
        let (session, provider) = session();
        let err = session.ensure_fresh_token().await.unwrap_err();
        assert_eq!(err, Error::Auth(AuthFailureReason::NoCredentials));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_challenge_is_an_auth_error_and_stores_nothing() {
        let (session, provider) = session();
        provider.push_reply(MockAuthReply::Challenge("NEW_PASSWORD_REQUIRED".to_string()));

        let err = session.authenticate("ada@example.com", "pw").await.unwrap_err();
        assert_eq!(
            err,
            Error::Auth(AuthFailureReason::ChallengeRequired {
                challenge: "NEW_PASSWORD_REQUIRED".to_string()
            })
        );
        assert!(session.email().await.is_none());
        assert!(!session.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_rejected_login_keeps_previous_session() {
        let (session, provider) = session();
        session.authenticate("ada@example.com", "pw").await.unwrap();
        provider.push_reply(MockAuthReply::Reject(AuthFailureReason::InvalidCredentials));

        assert!(session.authenticate("ada@example.com", "wrong").await.is_err());
        assert_eq!(session.id_token().await.as_deref(), Some("id-token-1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_renewal() {
        let provider =
            Arc::new(MockIdentityProvider::new().with_latency(Duration::from_millis(200)));
        let session = SessionManager::new(provider.clone(), MARGIN);
        session.authenticate("ada@example.com", "pw").await.unwrap();
        tokio::time::advance(Duration::from_secs(3600)).await;

        let (a, b, c) = tokio::join!(
            session.ensure_fresh_token(),
            session.ensure_fresh_token(),
            session.ensure_fresh_token()
        );
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(provider.refresh_calls(), 1);
    }

    #[tokio::test]
    async fn test_force_expiry_only_hits_matching_token() {
        let (session, _) = session();
        session.authenticate("ada@example.com", "pw").await.unwrap();

        assert!(!session.force_expiry("some-older-token").await);
        assert!(session.tokens().await.unwrap().is_fresh());

        assert!(session.force_expiry("id-token-1").await);
        assert!(!session.tokens().await.unwrap().is_fresh());
    }

    #[tokio::test]
    async fn test_sign_out_forgets_everything() {
        let (session, _) = session();
        session.authenticate("ada@example.com", "pw").await.unwrap();
        session.sign_out().await;

        assert!(session.id_token().await.is_none());
        assert_eq!(
            session.ensure_fresh_token().await.unwrap_err(),
            Error::Auth(AuthFailureReason::NoCredentials)
        );
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let credentials = Credentials::new("ada@example.com", "hunter2");
        assert!(!format!("{:?}", credentials).contains("hunter2"));
    }
}
