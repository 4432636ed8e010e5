//! In-memory identity provider and transport for testing.
//!
//! Both mocks record every call so tests can assert on how many network round
//! trips an operation took, in what order, and when.
//!
//! ```
//! use std::sync::Arc;
//! use helty_core::mock::{MockIdentityProvider, MockReply, MockTransport};
//! use helty_core::{ClientConfig, HeltyClient};
//!
//! # async fn demo() -> helty_core::Result<()> {
//! let provider = Arc::new(MockIdentityProvider::new());
//! let transport = Arc::new(MockTransport::new());
//! transport.on("/board/product/search", MockReply::json(200, &serde_json::json!({ "data": [] })));
//!
//! let client = HeltyClient::with_backends(ClientConfig::default(), provider.clone(), transport.clone());
//! client.authenticate("owner@example.com", "secret").await?;
//! assert!(client.find_devices().await?.is_empty());
//! assert_eq!(provider.call_count(), 1);
//! # Ok(())
//! # }
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tokio::time::Instant;

use crate::error::{AuthFailureReason, ConnectionFailureReason, Error, Result};
use crate::identity::{AuthOutcome, AuthRequest, AuthenticationResult, IdentityProvider};
use crate::transport::{ApiRequest, ApiResponse, Transport};

/// A scripted identity provider answer.
#[derive(Debug, Clone)]
pub enum MockAuthReply {
    Tokens(AuthenticationResult),
    Challenge(String),
    Reject(AuthFailureReason),
    Fail(ConnectionFailureReason),
}

/// Identity provider that issues numbered tokens.
///
/// Scripted replies queued with [`push_reply`](Self::push_reply) are consumed
/// first. Once the queue is empty every call succeeds: password logins get
/// `id-token-N` plus `refresh-token-N`, refreshes get `id-token-N` only, as
/// Cognito does.
pub struct MockIdentityProvider {
    replies: Mutex<VecDeque<MockAuthReply>>,
    requests: Mutex<Vec<AuthRequest>>,
    issued: AtomicU32,
    expires_in: Option<u64>,
    latency: Duration,
}

impl Default for MockIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockIdentityProvider {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            issued: AtomicU32::new(0),
            expires_in: Some(3600),
            latency: Duration::ZERO,
        }
    }

    /// Lifetime reported with automatically issued tokens (`None` omits it).
    #[must_use]
    pub fn with_expires_in(mut self, expires_in: Option<u64>) -> Self {
        self.expires_in = expires_in;
        self
    }

    /// Simulated round-trip time of every call.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Queue a scripted reply.
    pub fn push_reply(&self, reply: MockAuthReply) {
        lock(&self.replies).push_back(reply);
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<AuthRequest> {
        lock(&self.requests).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }

    pub fn password_calls(&self) -> usize {
        lock(&self.requests)
            .iter()
            .filter(|r| !r.is_refresh())
            .count()
    }

    pub fn refresh_calls(&self) -> usize {
        lock(&self.requests)
            .iter()
            .filter(|r| r.is_refresh())
            .count()
    }

    fn issue(&self, request: &AuthRequest) -> AuthenticationResult {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        AuthenticationResult {
            access_token: Some(format!("access-token-{}", n)),
            id_token: format!("id-token-{}", n),
            refresh_token: (!request.is_refresh()).then(|| format!("refresh-token-{}", n)),
            expires_in: self.expires_in,
        }
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn initiate_auth(&self, request: &AuthRequest) -> Result<AuthOutcome> {
        lock(&self.requests).push(request.clone());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let scripted = lock(&self.replies).pop_front();
        match scripted {
            None => Ok(AuthOutcome::Authenticated(self.issue(request))),
            Some(MockAuthReply::Tokens(result)) => Ok(AuthOutcome::Authenticated(result)),
            Some(MockAuthReply::Challenge(name)) => Ok(AuthOutcome::Challenge { name }),
            Some(MockAuthReply::Reject(reason)) => Err(Error::Auth(reason)),
            Some(MockAuthReply::Fail(reason)) => Err(Error::Connection(reason)),
        }
    }
}

/// A scripted transport answer.
#[derive(Debug, Clone)]
pub enum MockReply {
    Respond(ApiResponse),
    /// No HTTP response at all (connection refused, timeout...).
    Fail(String),
}

impl MockReply {
    pub fn json(status: u16, body: &Value) -> Self {
        Self::Respond(ApiResponse::json(status, body))
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Respond(ApiResponse::new(status, body))
    }

    /// `200` with an empty body.
    pub fn empty() -> Self {
        Self::status(200, "")
    }
}

/// A request seen by [`MockTransport`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub url: String,
    pub bearer_token: String,
    pub body: Option<Value>,
    pub at: Instant,
}

impl RecordedCall {
    /// Whether the URL ends with `path`.
    pub fn is_for(&self, path: &str) -> bool {
        self.url.ends_with(path)
    }
}

/// Transport answering from per-path reply queues.
///
/// A route's replies are consumed in order; the last one is repeated for any
/// further call. Requests that match no route get a 404.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<String, VecDeque<MockReply>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a reply for requests whose URL ends with `path`.
    pub fn on(&self, path: impl Into<String>, reply: MockReply) {
        lock(&self.routes)
            .entry(path.into())
            .or_default()
            .push_back(reply);
    }

    /// Every request received so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Requests whose URL ends with `path`.
    pub fn calls_to(&self, path: &str) -> Vec<RecordedCall> {
        lock(&self.calls)
            .iter()
            .filter(|c| c.is_for(path))
            .cloned()
            .collect()
    }

    fn next_reply(&self, url: &str) -> Option<MockReply> {
        let mut routes = lock(&self.routes);
        // longest matching path wins
        let key = routes
            .keys()
            .filter(|path| url.ends_with(path.as_str()))
            .max_by_key(|path| path.len())
            .cloned()?;
        let queue = routes.get_mut(&key)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        lock(&self.calls).push(RecordedCall {
            method: request.method.clone(),
            url: request.url.clone(),
            bearer_token: request.bearer_token.clone(),
            body: request.body.clone(),
            at: Instant::now(),
        });

        match self.next_reply(&request.url) {
            Some(MockReply::Respond(response)) => Ok(response),
            Some(MockReply::Fail(message)) => Err(Error::transport(message)),
            None => Ok(ApiResponse::new(404, format!("no mock route for {}", request.url))),
        }
    }
}

// Poisoning only happens if a test already panicked while holding the lock.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(url: &str) -> ApiRequest {
        ApiRequest {
            method: Method::POST,
            url: url.to_string(),
            bearer_token: "t".to_string(),
            body: None,
        }
    }

    #[tokio::test]
    async fn test_transport_replies_in_order_then_repeats_last() {
        let transport = MockTransport::new();
        transport.on("/a", MockReply::status(401, ""));
        transport.on("/a", MockReply::status(200, "ok"));

        let first = transport.execute(request("http://x/a")).await.unwrap();
        let second = transport.execute(request("http://x/a")).await.unwrap();
        let third = transport.execute(request("http://x/a")).await.unwrap();

        assert_eq!(first.status, 401);
        assert_eq!(second.body, "ok");
        assert_eq!(third.body, "ok");
        assert_eq!(transport.call_count(), 3);
    }

    #[tokio::test]
    async fn test_transport_unrouted_and_failures() {
        let transport = MockTransport::new();
        transport.on("/down", MockReply::Fail("connection refused".to_string()));

        let response = transport.execute(request("http://x/other")).await.unwrap();
        assert_eq!(response.status, 404);

        let err = transport.execute(request("http://x/down")).await.unwrap_err();
        assert!(err.is_connection());
        assert_eq!(transport.calls_to("/down").len(), 1);
    }

    #[tokio::test]
    async fn test_transport_prefers_longest_route() {
        let transport = MockTransport::new();
        transport.on("/status", MockReply::status(200, "short"));
        transport.on("/laststatus", MockReply::status(200, "long"));

        let response = transport.execute(request("http://x/log/laststatus")).await.unwrap();
        assert_eq!(response.body, "long");
    }

    #[tokio::test]
    async fn test_provider_issues_numbered_tokens() {
        let provider = MockIdentityProvider::new();

        let login = provider
            .initiate_auth(&AuthRequest::password("a@b.c", "pw"))
            .await
            .unwrap();
        let refresh = provider
            .initiate_auth(&AuthRequest::refresh("refresh-token-1"))
            .await
            .unwrap();

        let AuthOutcome::Authenticated(login) = login else {
            panic!("expected tokens");
        };
        let AuthOutcome::Authenticated(refresh) = refresh else {
            panic!("expected tokens");
        };
        assert_eq!(login.id_token, "id-token-1");
        assert_eq!(login.refresh_token.as_deref(), Some("refresh-token-1"));
        assert_eq!(refresh.id_token, "id-token-2");
        assert!(refresh.refresh_token.is_none());
        assert_eq!(provider.password_calls(), 1);
        assert_eq!(provider.refresh_calls(), 1);
    }

    #[tokio::test]
    async fn test_provider_scripted_replies_come_first() {
        let provider = MockIdentityProvider::new();
        provider.push_reply(MockAuthReply::Reject(AuthFailureReason::InvalidCredentials));

        let err = provider
            .initiate_auth(&AuthRequest::password("a@b.c", "bad"))
            .await
            .unwrap_err();
        assert_eq!(err, Error::Auth(AuthFailureReason::InvalidCredentials));

        assert!(
            provider
                .initiate_auth(&AuthRequest::password("a@b.c", "good"))
                .await
                .is_ok()
        );
    }
}
