use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// LoginResponse holds the response from a successful login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Bearer token (JWT) for API requests
    #[serde(rename = "access_token")]
    pub access_token: String,

    /// Token lifetime in seconds
    #[serde(rename = "expires_in")]
    pub expires_in: i64,

    /// Token type (usually "bearer")
    #[serde(rename = "token_type")]
    pub token_type: String,
}

impl fmt::Display for LoginResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.access_token, self.expires_in, self.token_type)
    }
}

/// Credential is a bearer token together with the instant it stops being usable.
/// Each login produces a new credential; it is replaced, never merged.
#[derive(Clone)]
pub struct Credential {
    access_token: String,
    token_type: String,
    valid_until: DateTime<Utc>,
}

impl Credential {
    /// Build a credential from a login response received at `issued_at`
    pub fn from_login(login: LoginResponse, issued_at: DateTime<Utc>) -> Self {
        let lifetime = TimeDelta::try_seconds(login.expires_in).unwrap_or(TimeDelta::MAX);
        let valid_until = issued_at
            .checked_add_signed(lifetime)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Credential {
            access_token: login.access_token,
            token_type: login.token_type,
            valid_until,
        }
    }

    /// Bearer token sent in the Authorization header
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Token type reported by the login, usually "bearer"
    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    /// Instant from which the token must no longer be used
    pub fn valid_until(&self) -> DateTime<Utc> {
        self.valid_until
    }

    /// A token is usable only strictly before its expiry instant
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.access_token.is_empty() && now < self.valid_until
    }

    /// Check validity against the current time
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    #[cfg(test)]
    pub(crate) fn expire(&mut self) {
        self.valid_until = Utc::now() - TimeDelta::seconds(1);
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &format_args!("<{} bytes>", self.access_token.len()))
            .field("token_type", &self.token_type)
            .field("valid_until", &self.valid_until)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn login(expires_in: i64) -> LoginResponse {
        serde_json::from_value(serde_json::json!({
            "access_token": "abc",
            "expires_in": expires_in,
            "token_type": "bearer"
        }))
        .unwrap()
    }

    #[test]
    fn test_login_response_display() {
        assert_eq!(login(60).to_string(), "abc 60 bearer");
    }

    #[test]
    fn test_credential_expiry_window() {
        let issued_at = Utc::now();
        let credential = Credential::from_login(login(60), issued_at);

        assert_eq!(credential.valid_until(), issued_at + TimeDelta::seconds(60));
        assert!(credential.is_valid_at(issued_at));
        assert!(credential.is_valid_at(issued_at + TimeDelta::seconds(59)));
        assert!(!credential.is_valid_at(issued_at + TimeDelta::seconds(60)));
        assert!(!credential.is_valid_at(issued_at + TimeDelta::seconds(61)));
    }

    #[test]
    fn test_empty_token_is_never_valid() {
        let mut response = login(3600);
        response.access_token.clear();
        let credential = Credential::from_login(response, Utc::now());
        assert!(!credential.is_valid());
    }

    #[test]
    fn test_huge_lifetime_saturates() {
        let credential = Credential::from_login(login(i64::MAX), Utc::now());
        assert_eq!(credential.valid_until(), DateTime::<Utc>::MAX_UTC);
        assert!(credential.is_valid());
    }

    #[test]
    fn test_debug_hides_token() {
        let credential = Credential::from_login(login(60), Utc::now());
        let debug = format!("{:?}", credential);
        assert!(!debug.contains("abc"));
        assert!(debug.contains("<3 bytes>"));
    }
}
