//! Secret encodings

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use ci_lifecycle_core::LifecycleError;

/// How the `secret` input is encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretType {
    /// Written as-is
    Text,
    /// Standard base64, decoded before writing
    Base64,
}

impl SecretType {
    /// Bytes to write for `secret`
    pub fn decode(&self, secret: &str) -> Result<Vec<u8>, base64::DecodeError> {
        match self {
            SecretType::Text => Ok(secret.as_bytes().to_vec()),
            SecretType::Base64 => base64::engine::general_purpose::STANDARD.decode(secret),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SecretType::Text => "text",
            SecretType::Base64 => "base64",
        }
    }
}

impl FromStr for SecretType {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(SecretType::Text),
            "base64" => Ok(SecretType::Base64),
            _ => Err(LifecycleError::InvalidArgument(
                "type needs to be either base64 or text".to_string(),
            )),
        }
    }
}

impl fmt::Display for SecretType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
