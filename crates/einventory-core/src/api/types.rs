//! Wire types exchanged with the identity service.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of the login call.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    #[serde(rename = "username")]
    pub identifier: String,
    #[serde(rename = "password")]
    pub secret: String,
    #[serde(rename = "sede_id")]
    pub site_id: i64,
}

/// Successful login answer.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "RawLoginResponse")]
pub struct LoginResponse {
    pub token: String,
    pub identifier_echo: Option<String>,
}

/// The service names the token `access`; older deployments send `token`,
/// and some send both.
#[derive(Deserialize)]
struct RawLoginResponse {
    #[serde(default)]
    access: Option<String>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    username: Option<String>,
}

impl From<RawLoginResponse> for LoginResponse {
    fn from(raw: RawLoginResponse) -> Self {
        let token = raw
            .access
            .filter(|t| !t.is_empty())
            .or(raw.token)
            .unwrap_or_default();
        Self {
            token,
            identifier_echo: raw.username,
        }
    }
}

/// Profile data returned for a valid token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    /// Anything else the service sends along.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Profile {
    /// Name to greet the operator with, if the service sent one.
    pub fn display_name(&self) -> Option<&str> {
        self.username.as_deref().filter(|s| !s.is_empty())
    }
}

/// A site ("sede") the operator can sign in for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub id: i64,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "ciudad", default)]
    pub city: String,
    #[serde(rename = "direccion", default)]
    pub address: Option<String>,
}

impl Site {
    pub fn label(&self) -> String {
        if self.city.is_empty() {
            self.name.clone()
        } else {
            format!("{} - {}", self.name, self.city)
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SitesResponse {
    #[serde(default)]
    pub sedes: Vec<Site>,
}
