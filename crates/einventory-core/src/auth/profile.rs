use std::sync::Arc;

use tracing::{debug, warn};

use crate::api::{ApiError, IdentityService, Profile};

use super::Token;

/// Retrieves the operator profile for a token.
///
/// The fetcher itself never touches session state: `SessionContext` runs it
/// and decides whether the result still applies.
#[derive(Clone)]
pub struct ProfileFetcher {
    identity: Arc<dyn IdentityService>,
}

impl ProfileFetcher {
    pub fn new(identity: Arc<dyn IdentityService>) -> Self {
        Self { identity }
    }

    /// One request to the profile endpoint with `token` as bearer credential.
    pub async fn fetch(&self, token: &Token) -> Result<Profile, ApiError> {
        debug!("Fetching profile");
        match self.identity.fetch_profile(token).await {
            Ok(profile) => {
                debug!(username = ?profile.display_name(), "Profile loaded");
                Ok(profile)
            }
            Err(e) => {
                warn!(error = %e, "Profile fetch failed");
                Err(e)
            }
        }
    }
}
