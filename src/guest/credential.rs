//! Guest credential model.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{FetchError, FetchResult};

/// An ephemeral guest session token issued by the upstream platform.
///
/// Credentials are never mutated; a refresh replaces the cached payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestCredential {
    /// Opaque token value.
    #[serde(rename = "guest_token")]
    pub token: String,
    /// Issuance time (seconds since epoch).
    pub issued_at: u64,
    /// Maximum age in seconds.
    pub max_age_secs: u64,
}

/// Body of the activation endpoint.
#[derive(Debug, Deserialize)]
struct ActivateResponse {
    guest_token: String,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

impl GuestCredential {
    /// A credential issued now.
    pub fn new(token: impl Into<String>, max_age: Duration) -> Self {
        Self {
            token: token.into(),
            issued_at: now_secs(),
            max_age_secs: max_age.as_secs(),
        }
    }

    /// Parse the activation endpoint's body.
    pub fn from_activation(body: &[u8], max_age: Duration) -> FetchResult<Self> {
        let parsed: ActivateResponse = serde_json::from_slice(body)
            .map_err(|e| FetchError::MalformedCredential(e.to_string()))?;
        if parsed.guest_token.is_empty() {
            return Err(FetchError::MalformedCredential("empty guest_token".to_string()));
        }
        Ok(Self::new(parsed.guest_token, max_age))
    }

    /// Serialize for the credential store.
    pub fn encode(&self) -> FetchResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize a cached payload.
    pub fn decode(payload: &str) -> FetchResult<Self> {
        let credential: Self = serde_json::from_str(payload)
            .map_err(|e| FetchError::MalformedCredential(e.to_string()))?;
        if credential.token.is_empty() {
            return Err(FetchError::MalformedCredential("empty guest_token".to_string()));
        }
        Ok(credential)
    }

    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THREE_HOURS: Duration = Duration::from_secs(3 * 60 * 60);

    #[test]
    fn test_from_activation() {
        let credential =
            GuestCredential::from_activation(br#"{"guest_token":"1690000000000000000"}"#, THREE_HOURS)
                .unwrap();
        assert_eq!(credential.token, "1690000000000000000");
        assert_eq!(credential.max_age(), THREE_HOURS);
    }

    #[test]
    fn test_malformed_activation() {
        let bodies: [&[u8]; 3] = [
            b"<html>rate limited</html>",
            br#"{"errors":[]}"#,
            br#"{"guest_token":""}"#,
        ];
        for body in bodies {
            let err = GuestCredential::from_activation(body, THREE_HOURS).unwrap_err();
            assert!(matches!(err, FetchError::MalformedCredential(_)));
        }
    }

    #[test]
    fn test_encode_decode() {
        let credential = GuestCredential::new("T0", THREE_HOURS);
        let payload = credential.encode().unwrap();
        assert!(payload.contains(r#""guest_token":"T0""#));
        assert_eq!(GuestCredential::decode(&payload).unwrap(), credential);
        assert!(GuestCredential::decode("garbage").is_err());
    }
}
