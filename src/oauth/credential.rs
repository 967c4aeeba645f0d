//! Usage: The persisted OAuth credential (access/refresh token pair plus expiry).

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Access tokens expiring within this window are treated as already expired.
pub const REFRESH_LEAD_SECS: i64 = 10;

pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";

/// JSON layout matches `{"access_token","token_type","refresh_token","expiry"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_expiry"
    )]
    pub expiry: Option<DateTime<Utc>>,
}

/// `0001-01-01T00:00:00Z` is the zero time written for tokens without an expiry.
fn deserialize_expiry<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<DateTime<Utc>>::deserialize(deserializer)?;
    Ok(value.filter(|expiry| expiry.year() > 1))
}

fn default_token_type() -> String {
    DEFAULT_TOKEN_TYPE.to_string()
}

impl Credential {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expiry: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: default_token_type(),
            refresh_token,
            expiry,
        }
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token().is_some()
    }

    /// True once `now` is inside the refresh lead window of the expiry.
    /// An unknown expiry never needs a refresh.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        let Some(expiry) = self.expiry else {
            return false;
        };
        expiry - Duration::seconds(REFRESH_LEAD_SECS) <= now
    }

    /// A stored credential can back a client when it has an access token and is
    /// either still fresh or refreshable.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        if self.access_token.trim().is_empty() {
            return false;
        }
        !self.needs_refresh(now) || self.has_refresh_token()
    }

    pub fn authorization_header(&self) -> String {
        let token_type = match self.token_type.trim() {
            // Token endpoints may answer "bearer"; always send the canonical scheme.
            t if t.is_empty() || t.eq_ignore_ascii_case("bearer") => DEFAULT_TOKEN_TYPE,
            t => t,
        };
        format!("{token_type} {}", self.access_token.trim())
    }
}
