//! Platform credentials.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};

use crate::errors::SessionError;

/// API id, API secret, and an optional identity hint.
///
/// The secret never appears in `Debug` output.
#[derive(Clone)]
pub struct Credentials {
    api_id: String,
    api_hash: SecretString,
    phone_number: Option<String>,
}

impl Credentials {
    /// Validate and assemble credentials. Blank values count as missing.
    pub fn new(
        api_id: Option<&str>,
        api_hash: Option<&str>,
        phone_number: Option<&str>,
    ) -> Result<Self, SessionError> {
        fn present(v: Option<&str>) -> Option<&str> {
            v.map(str::trim).filter(|v| !v.is_empty())
        }

        let api_id = present(api_id).ok_or(SessionError::MissingCredentials("API_ID"))?;
        let api_hash = present(api_hash).ok_or(SessionError::MissingCredentials("API_HASH"))?;

        Ok(Self {
            api_id: api_id.to_owned(),
            api_hash: SecretString::from(api_hash.to_owned()),
            phone_number: present(phone_number).map(str::to_owned),
        })
    }

    /// The public API id.
    pub fn api_id(&self) -> &str {
        &self.api_id
    }

    /// Identity hint, if configured.
    pub fn phone_number(&self) -> Option<&str> {
        self.phone_number.as_deref()
    }

    /// The combined bearer token `{api_id}:{api_hash}`.
    pub(crate) fn token(&self) -> SecretString {
        SecretString::from(format!("{}:{}", self.api_id, self.api_hash.expose_secret()))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_id", &self.api_id)
            .field("api_hash", &"[REDACTED]")
            .field("phone_number", &self.phone_number)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn missing_values_are_rejected() {
        assert_matches!(
            Credentials::new(None, Some("h"), None),
            Err(SessionError::MissingCredentials("API_ID"))
        );
        assert_matches!(
            Credentials::new(Some("1"), Some("  "), None),
            Err(SessionError::MissingCredentials("API_HASH"))
        );
    }

    #[test]
    fn values_are_trimmed() {
        let creds = Credentials::new(Some(" 42\n"), Some("\ts3cr3t "), Some("  ")).unwrap();
        assert_eq!(creds.api_id(), "42");
        assert_eq!(creds.token().expose_secret(), "42:s3cr3t");
        assert_eq!(creds.phone_number(), None);
    }

    #[test]
    fn token_and_debug() {
        let creds = Credentials::new(Some("42"), Some("s3cr3t"), Some("+1555")).unwrap();
        assert_eq!(creds.token().expose_secret(), "42:s3cr3t");
        assert_eq!(creds.phone_number(), Some("+1555"));
        assert!(!format!("{creds:?}").contains("s3cr3t"));
    }
}
