//! Scripted identity service shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use einventory_core::api::{ApiError, IdentityService, LoginRequest, LoginResponse, Profile, Site};
use einventory_core::auth::{MemoryTokenStore, SessionContext};
use einventory_core::Token;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Authenticate { identifier: String, site_id: i64 },
    ValidateToken(String),
    FetchProfile(String),
    FetchSites,
}

#[derive(Clone)]
struct ProfileScript {
    delay: Duration,
    profile: Option<Profile>,
}

#[derive(Default)]
pub struct FakeIdentity {
    calls: Mutex<Vec<Call>>,
    login: Mutex<Option<(String, Option<String>)>>,
    login_failure: Mutex<Option<(u16, String)>>,
    valid_tokens: Mutex<HashSet<String>>,
    profiles: Mutex<HashMap<String, ProfileScript>>,
    sites: Mutex<Option<Vec<Site>>>,
}

impl FakeIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accepting_login(self, token: &str, echo: Option<&str>) -> Self {
        *self.login.lock().unwrap() = Some((token.to_string(), echo.map(str::to_string)));
        self
    }

    pub fn rejecting_login(self, status: u16, body: &str) -> Self {
        *self.login_failure.lock().unwrap() = Some((status, body.to_string()));
        self
    }

    pub fn with_valid_token(self, token: &str) -> Self {
        self.valid_tokens.lock().unwrap().insert(token.to_string());
        self
    }

    pub fn with_profile(self, token: &str, delay: Duration, username: Option<&str>) -> Self {
        let profile = username.map(|name| Profile {
            username: Some(name.to_string()),
            ..Profile::default()
        });
        self.profiles
            .lock()
            .unwrap()
            .insert(token.to_string(), ProfileScript { delay, profile });
        self
    }

    pub fn with_sites(self, sites: Vec<Site>) -> Self {
        *self.sites.lock().unwrap() = Some(sites);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn profile_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::FetchProfile(token) => Some(token),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn status_error(status: u16, body: &str) -> ApiError {
        ApiError::from_status(StatusCode::from_u16(status).unwrap(), body)
    }
}

#[async_trait]
impl IdentityService for FakeIdentity {
    async fn authenticate(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError> {
        self.record(Call::Authenticate {
            identifier: request.identifier.clone(),
            site_id: request.site_id,
        });
        if let Some((status, body)) = self.login_failure.lock().unwrap().clone() {
            return Err(Self::status_error(status, &body));
        }
        match self.login.lock().unwrap().clone() {
            Some((token, identifier_echo)) => Ok(LoginResponse {
                token,
                identifier_echo,
            }),
            None => Err(ApiError::Unauthorized),
        }
    }

    async fn validate_token(&self, token: &Token) -> Result<(), ApiError> {
        self.record(Call::ValidateToken(token.as_str().to_string()));
        if self.valid_tokens.lock().unwrap().contains(token.as_str()) {
            Ok(())
        } else {
            Err(Self::status_error(401, r#"{"error":"Token invalid or expired"}"#))
        }
    }

    async fn fetch_profile(&self, token: &Token) -> Result<Profile, ApiError> {
        self.record(Call::FetchProfile(token.as_str().to_string()));
        let script = self.profiles.lock().unwrap().get(token.as_str()).cloned();
        match script {
            Some(script) => {
                tokio::time::sleep(script.delay).await;
                script
                    .profile
                    .ok_or_else(|| Self::status_error(500, "profile backend down"))
            }
            None => Err(Self::status_error(401, "")),
        }
    }

    async fn fetch_sites(&self) -> Result<Vec<Site>, ApiError> {
        self.record(Call::FetchSites);
        self.sites
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| Self::status_error(500, r#"{"error":"database unavailable"}"#))
    }
}

pub fn session_with(store: &MemoryTokenStore, identity: &Arc<FakeIdentity>) -> SessionContext {
    SessionContext::new(Box::new(store.clone()), identity.clone())
}

pub fn site(id: i64, name: &str) -> Site {
    Site {
        id,
        name: name.to_string(),
        city: "Bogota".to_string(),
        address: None,
    }
}
