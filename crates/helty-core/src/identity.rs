//! Identity provider backends.
//!
//! The Helty cloud authenticates users through an AWS Cognito user pool. The
//! client only needs a single operation from it, `InitiateAuth`, with either a
//! password or a refresh token. [`IdentityProvider`] is that seam, so the
//! session logic can be exercised against [`MockIdentityProvider`](crate::mock::MockIdentityProvider)
//! without network access.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{AuthFailureReason, ConnectionFailureReason, Error, Result};

const AMZ_JSON: &str = "application/x-amz-json-1.1";
const INITIATE_AUTH_TARGET: &str = "AWSCognitoIdentityProviderService.InitiateAuth";

/// A single `InitiateAuth` call.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthRequest {
    /// Email/password login (`USER_PASSWORD_AUTH`).
    Password { username: String, password: String },
    /// Token renewal (`REFRESH_TOKEN_AUTH`).
    Refresh { refresh_token: String },
}

impl AuthRequest {
    pub fn password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Password {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn refresh(refresh_token: impl Into<String>) -> Self {
        Self::Refresh {
            refresh_token: refresh_token.into(),
        }
    }

    /// Name of the auth flow on the wire.
    pub fn flow(&self) -> &'static str {
        match self {
            Self::Password { .. } => "USER_PASSWORD_AUTH",
            Self::Refresh { .. } => "REFRESH_TOKEN_AUTH",
        }
    }

    pub fn is_refresh(&self) -> bool {
        matches!(self, Self::Refresh { .. })
    }

    fn parameters(&self) -> BTreeMap<&'static str, &str> {
        let mut params = BTreeMap::new();
        match self {
            Self::Password { username, password } => {
                params.insert("USERNAME", username.as_str());
                params.insert("PASSWORD", password.as_str());
            }
            Self::Refresh { refresh_token } => {
                params.insert("REFRESH_TOKEN", refresh_token.as_str());
            }
        }
        params
    }
}

impl fmt::Debug for AuthRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::Refresh { .. } => f
                .debug_struct("Refresh")
                .field("refresh_token", &"<redacted>")
                .finish(),
        }
    }
}

/// Tokens issued by a successful authentication.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuthenticationResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Bearer token for the Helty API.
    pub id_token: String,
    /// Only issued by password logins; refreshes keep the previous one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Token lifetime in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
}

impl fmt::Debug for AuthenticationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticationResult")
            .field("has_access_token", &self.access_token.is_some())
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

/// Result of an `InitiateAuth` call that reached the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated(AuthenticationResult),
    /// The provider wants an interactive step (MFA, password change...).
    Challenge { name: String },
}

/// A backend able to run `InitiateAuth`.
///
/// Implementations map a rejected credential to
/// [`AuthFailureReason::InvalidCredentials`] and an unknown user to
/// [`AuthFailureReason::UserNotFound`]; anything else that goes wrong is a
/// connection error.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn initiate_auth(&self, request: &AuthRequest) -> Result<AuthOutcome>;
}

/// Cognito user pool reached over its JSON protocol.
#[derive(Debug, Clone)]
pub struct CognitoIdentityProvider {
    http: reqwest::Client,
    endpoint: String,
    client_id: String,
}

impl CognitoIdentityProvider {
    /// Create a provider with its own HTTP client.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| Error::invalid_config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(config, http))
    }

    /// Create a provider sharing an existing HTTP client.
    pub fn with_client(config: &ClientConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            endpoint: config.identity_endpoint(),
            client_id: config.client_id.clone(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct InitiateAuthBody<'a> {
    auth_flow: &'static str,
    client_id: &'a str,
    auth_parameters: BTreeMap<&'static str, &'a str>,
}

#[async_trait]
impl IdentityProvider for CognitoIdentityProvider {
    async fn initiate_auth(&self, request: &AuthRequest) -> Result<AuthOutcome> {
        let body = InitiateAuthBody {
            auth_flow: request.flow(),
            client_id: &self.client_id,
            auth_parameters: request.parameters(),
        };
        let payload = serde_json::to_vec(&body).map_err(|e| Error::malformed(e.to_string()))?;

        debug!(flow = request.flow(), "calling InitiateAuth");
        let response = self
            .http
            .post(&self.endpoint)
            .header(CONTENT_TYPE, AMZ_JSON)
            .header("X-Amz-Target", INITIATE_AUTH_TARGET)
            .body(payload)
            .send()
            .await
            .map_err(|e| Error::transport(format!("InitiateAuth: {}", e)))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| Error::transport(format!("InitiateAuth body: {}", e)))?;

        interpret_initiate_auth(status, &text)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InitiateAuthResponse {
    authentication_result: Option<AuthenticationResult>,
    challenge_name: Option<String>,
}

#[derive(Deserialize)]
struct ProviderErrorBody {
    #[serde(rename = "__type", default)]
    error_type: String,
    #[serde(default, alias = "Message")]
    message: String,
}

/// Turn an `InitiateAuth` HTTP response into an outcome.
///
/// Error types are matched by substring because Cognito may prefix them with
/// a namespace (`com.amazonaws...#NotAuthorizedException`).
pub fn interpret_initiate_auth(status: u16, body: &str) -> Result<AuthOutcome> {
    if !(200..300).contains(&status) {
        let error = serde_json::from_str::<ProviderErrorBody>(body).unwrap_or(ProviderErrorBody {
            error_type: String::new(),
            message: body.to_string(),
        });
        return Err(classify_provider_error(status, error));
    }

    let response: InitiateAuthResponse = serde_json::from_str(body)
        .map_err(|e| Error::malformed(format!("InitiateAuth response: {}", e)))?;

    match response.authentication_result {
        Some(result) => Ok(AuthOutcome::Authenticated(result)),
        None => Ok(AuthOutcome::Challenge {
            name: response
                .challenge_name
                .unwrap_or_else(|| "unknown".to_string()),
        }),
    }
}

fn classify_provider_error(status: u16, error: ProviderErrorBody) -> Error {
    if error.error_type.contains("NotAuthorized") {
        Error::Auth(AuthFailureReason::InvalidCredentials)
    } else if error.error_type.contains("UserNotFound") {
        Error::Auth(AuthFailureReason::UserNotFound)
    } else if error.error_type.is_empty() {
        Error::status(status, error.message)
    } else {
        Error::Connection(ConnectionFailureReason::Provider {
            error_type: error.error_type,
            message: error.message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let request = AuthRequest::password("ada@example.com", "hunter2");
        let body = InitiateAuthBody {
            auth_flow: request.flow(),
            client_id: "client",
            auth_parameters: request.parameters(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "AuthFlow": "USER_PASSWORD_AUTH",
                "ClientId": "client",
                "AuthParameters": { "USERNAME": "ada@example.com", "PASSWORD": "hunter2" }
            })
        );

        let refresh = AuthRequest::refresh("r-1");
        assert_eq!(refresh.flow(), "REFRESH_TOKEN_AUTH");
        assert_eq!(refresh.parameters().get("REFRESH_TOKEN"), Some(&"r-1"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let request = AuthRequest::password("ada@example.com", "hunter2");
        let printed = format!("{:?}", request);
        assert!(printed.contains("ada@example.com"));
        assert!(!printed.contains("hunter2"));

        let result = AuthenticationResult {
            access_token: Some("access".to_string()),
            id_token: "id-secret".to_string(),
            refresh_token: None,
            expires_in: Some(3600),
        };
        assert!(!format!("{:?}", result).contains("id-secret"));
    }

    #[test]
    fn test_interpret_success() {
        let body = r#"{"AuthenticationResult":{"AccessToken":"a","IdToken":"i","RefreshToken":"r","ExpiresIn":3600,"TokenType":"Bearer"},"ChallengeParameters":{}}"#;
        let outcome = interpret_initiate_auth(200, body).unwrap();
        let AuthOutcome::Authenticated(result) = outcome else {
            panic!("expected tokens, got {:?}", outcome);
        };
        assert_eq!(result.id_token, "i");
        assert_eq!(result.refresh_token.as_deref(), Some("r"));
        assert_eq!(result.expires_in, Some(3600));
    }

    #[test]
    fn test_interpret_refresh_without_refresh_token() {
        let body = r#"{"AuthenticationResult":{"IdToken":"i2","ExpiresIn":1800}}"#;
        let AuthOutcome::Authenticated(result) = interpret_initiate_auth(200, body).unwrap() else {
            panic!("expected tokens");
        };
        assert!(result.refresh_token.is_none());
        assert!(result.access_token.is_none());
    }

    #[test]
    fn test_interpret_challenge() {
        let body = r#"{"ChallengeName":"NEW_PASSWORD_REQUIRED","Session":"s"}"#;
        assert_eq!(
            interpret_initiate_auth(200, body).unwrap(),
            AuthOutcome::Challenge {
                name: "NEW_PASSWORD_REQUIRED".to_string()
            }
        );
        assert_eq!(
            interpret_initiate_auth(200, "{}").unwrap(),
            AuthOutcome::Challenge {
                name: "unknown".to_string()
            }
        );
    }

    #[test]
    fn test_interpret_rejections() {
        let body = r#"{"__type":"NotAuthorizedException","message":"Incorrect username or password."}"#;
        assert_eq!(
            interpret_initiate_auth(400, body),
            Err(Error::Auth(AuthFailureReason::InvalidCredentials))
        );

        let body = r#"{"__type":"com.amazonaws.cognito#UserNotFoundException","message":"User does not exist."}"#;
        assert_eq!(
            interpret_initiate_auth(400, body),
            Err(Error::Auth(AuthFailureReason::UserNotFound))
        );
    }

    #[test]
    fn test_interpret_other_provider_errors() {
        let body = r#"{"__type":"TooManyRequestsException","message":"Rate exceeded"}"#;
        let err = interpret_initiate_auth(400, body).unwrap_err();
        assert_eq!(
            err,
            Error::Connection(ConnectionFailureReason::Provider {
                error_type: "TooManyRequestsException".to_string(),
                message: "Rate exceeded".to_string(),
            })
        );
        assert!(err.is_transient());

        let err = interpret_initiate_auth(502, "Bad Gateway").unwrap_err();
        assert_eq!(err, Error::status(502, "Bad Gateway"));
    }

    #[test]
    fn test_interpret_malformed_success_body() {
        let err = interpret_initiate_auth(200, "<html>").unwrap_err();
        assert!(matches!(
            err,
            Error::Connection(ConnectionFailureReason::MalformedResponse(_))
        ));

        // IdToken is mandatory in a result
        let err = interpret_initiate_auth(200, r#"{"AuthenticationResult":{}}"#).unwrap_err();
        assert!(matches!(
            err,
            Error::Connection(ConnectionFailureReason::MalformedResponse(_))
        ));
    }
}
