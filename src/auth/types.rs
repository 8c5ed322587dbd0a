//! Auth configuration types

use crate::config::AuthSettings;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};

/// Authentication configuration for the playback API
#[derive(Debug, Clone)]
pub enum AuthConfig {
    /// Static bearer token, used as-is on every request
    Bearer {
        /// The bearer token
        token: String,
    },

    /// OAuth2 refresh-token flow; access tokens are fetched and cached
    Oauth2Refresh {
        /// Token endpoint URL
        token_url: String,
        /// OAuth client id
        client_id: String,
        /// OAuth client secret
        client_secret: String,
        /// Long-lived refresh token
        refresh_token: String,
    },
}

impl AuthConfig {
    /// Build the auth configuration from connector credential settings.
    ///
    /// The refresh flow wins when both are present: a static token is then
    /// only a seed the API may have already expired.
    pub fn from_settings(settings: &AuthSettings) -> Result<Self> {
        if let Some(refresh) = &settings.refresh {
            return Ok(Self::Oauth2Refresh {
                token_url: refresh.token_url.clone(),
                client_id: refresh.client_id.clone(),
                client_secret: refresh.client_secret.clone(),
                refresh_token: refresh.refresh_token.clone(),
            });
        }

        match &settings.access_token {
            Some(token) => Ok(Self::Bearer {
                token: token.clone(),
            }),
            None => Err(Error::auth("no credentials configured")),
        }
    }
}

/// Cached token with expiration
#[derive(Debug, Clone)]
pub struct CachedToken {
    /// The access token
    pub token: String,
    /// When the token expires
    pub expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    /// Create a new cached token
    pub fn new(token: String, expires_at: Option<DateTime<Utc>>) -> Self {
        Self { token, expires_at }
    }

    /// Create a token that expires in N seconds from now
    pub fn expires_in(token: String, seconds: i64) -> Self {
        let expires_at = Utc::now() + chrono::Duration::seconds(seconds);
        Self {
            token,
            expires_at: Some(expires_at),
        }
    }

    /// Check if the token is expired (with 30 second buffer)
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => {
                let buffer = chrono::Duration::seconds(30);
                Utc::now() + buffer >= expires_at
            }
            None => false, // No expiration = never expires
        }
    }
}
