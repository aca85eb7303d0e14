//! Login flow: form validation, credential exchange, and the mount-time
//! check of a token left over from an earlier run.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::api::{ApiError, IdentityService, LoginRequest, Site};

use super::{SessionContext, Token};

/// Shown when the site list cannot be loaded.
pub const SITES_UNAVAILABLE: &str = "Unable to reach the server.";

/// Values typed into the login form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub identifier: String,
    pub secret: String,
    pub site_id: Option<i64>,
}

/// A single failed form rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    MissingIdentifier,
    MissingSecret,
    SecretTooShort { min: usize },
    MissingSite,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::MissingIdentifier => write!(f, "Enter your username."),
            Violation::MissingSecret => write!(f, "Enter your password."),
            Violation::SecretTooShort { min } => {
                write!(f, "Password must be at least {} characters.", min)
            }
            Violation::MissingSite => write!(f, "Select a site."),
        }
    }
}

/// Every rule the form broke, reported together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors {
    pub violations: Vec<Violation>,
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for ValidationErrors {}

impl ValidationErrors {
    pub fn message(&self) -> String {
        self.violations
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Error, Debug)]
pub enum LoginError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error("{message}")]
    Authentication { message: String },
}

impl LoginError {
    /// The one line shown to the operator.
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

/// Successful sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    /// Name to greet: the service's echo, else what was typed.
    pub identifier: String,
}

impl LoginOutcome {
    pub fn welcome(&self) -> String {
        format!("Welcome {}", self.identifier)
    }
}

/// Result of checking a token found at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoredTokenCheck {
    NoToken,
    Valid,
    Discarded,
}

/// What the login view needs when it opens.
#[derive(Debug, Clone, PartialEq)]
pub struct MountReport {
    pub sites: Vec<Site>,
    pub stored_token: StoredTokenCheck,
    /// Only set when the site list failed; token cleanup is always silent.
    pub notice: Option<String>,
}

pub struct LoginFlow {
    session: SessionContext,
    identity: Arc<dyn IdentityService>,
    min_secret_len: usize,
}

impl LoginFlow {
    pub fn new(session: SessionContext, identity: Arc<dyn IdentityService>, min_secret_len: usize) -> Self {
        Self {
            session,
            identity,
            min_secret_len,
        }
    }

    /// Check every rule and build the request, or report all violations.
    pub fn validate(&self, form: &LoginForm) -> Result<LoginRequest, ValidationErrors> {
        let mut violations = Vec::new();

        if form.identifier.trim().is_empty() {
            violations.push(Violation::MissingIdentifier);
        }
        if form.secret.trim().is_empty() {
            violations.push(Violation::MissingSecret);
        } else if form.secret.chars().count() < self.min_secret_len {
            violations.push(Violation::SecretTooShort {
                min: self.min_secret_len,
            });
        }
        if form.site_id.is_none() {
            violations.push(Violation::MissingSite);
        }

        match form.site_id {
            Some(site_id) if violations.is_empty() => Ok(LoginRequest {
                identifier: form.identifier.trim().to_string(),
                secret: form.secret.clone(),
                site_id,
            }),
            _ => Err(ValidationErrors { violations }),
        }
    }

    /// Validate, then exchange the credentials for a token and hand it to the
    /// session. Session state is untouched on any failure.
    pub async fn submit(&self, form: &LoginForm) -> Result<LoginOutcome, LoginError> {
        let request = self.validate(form).map_err(|e| {
            debug!(violations = e.violations.len(), "Login form rejected");
            e
        })?;

        let response = match self.identity.authenticate(&request).await {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "Login failed");
                return Err(LoginError::Authentication {
                    message: Self::authentication_message(&e),
                });
            }
        };

        let Some(token) = Token::new(response.token) else {
            warn!("Login succeeded without a usable token");
            return Err(LoginError::Authentication {
                message: "Login failed: the server did not issue a session.".to_string(),
            });
        };

        self.session.set_token(Some(token.as_str().to_string()));
        info!(site_id = request.site_id, "Login successful");

        Ok(LoginOutcome {
            identifier: response
                .identifier_echo
                .filter(|s| !s.is_empty())
                .unwrap_or(request.identifier),
        })
    }

    /// Map a failed credential exchange to a message the operator can act on.
    fn authentication_message(e: &ApiError) -> String {
        match e {
            ApiError::Unauthorized => "Invalid username or password".to_string(),
            ApiError::Rejected(msg) | ApiError::AccessDenied(msg) => msg.clone(),
            ApiError::NetworkError(inner) if inner.is_timeout() => {
                "Connection timed out. Please try again.".to_string()
            }
            ApiError::NetworkError(_) => {
                "Unable to connect to server. Check your connection.".to_string()
            }
            ApiError::ServerError(_) => {
                "The server could not complete the sign-in. Try again later.".to_string()
            }
            other => format!("Login failed: {}", other),
        }
    }

    /// Validate a token restored from storage. A rejected or unverifiable
    /// token is dropped without telling the operator.
    pub async fn check_stored_token(&self) -> StoredTokenCheck {
        let Some(token) = self.session.token() else {
            return StoredTokenCheck::NoToken;
        };

        match self.identity.validate_token(&token).await {
            Ok(()) => {
                debug!("Stored token is valid");
                StoredTokenCheck::Valid
            }
            Err(e) => {
                debug!(error = %e, "Stored token rejected, discarding");
                self.session.discard_token(&token);
                StoredTokenCheck::Discarded
            }
        }
    }

    /// Sites for the selector.
    pub async fn load_sites(&self) -> Result<Vec<Site>, ApiError> {
        self.identity.fetch_sites().await
    }

    /// Everything the login view does when it opens: load the selector and
    /// check any stored token, concurrently.
    pub async fn mount(&self) -> MountReport {
        let (sites, stored_token) = futures::join!(self.load_sites(), self.check_stored_token());

        match sites {
            Ok(sites) => MountReport {
                sites,
                stored_token,
                notice: None,
            },
            Err(e) => {
                warn!(error = %e, "Failed to load sites");
                MountReport {
                    sites: Vec::new(),
                    stored_token,
                    notice: Some(SITES_UNAVAILABLE.to_string()),
                }
            }
        }
    }
}
