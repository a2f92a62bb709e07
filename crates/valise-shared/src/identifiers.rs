//! Service identifiers: ACI (account identity), PNI (phone-number identity)
//! and E.164 phone numbers.
//!
//! The running device's own identifiers are supplied by the caller as
//! [`LocalIdentifiers`]; they are required to resolve "local user" references
//! during import/export and are never themselves written into an archive.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::IdentifierError;

/// Account identity: a UUID assigned at registration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Aci(pub Uuid);

impl Aci {
    pub fn parse(s: &str) -> Result<Self, IdentifierError> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| IdentifierError::InvalidServiceId(s.to_string()))
    }
}

impl std::fmt::Display for Aci {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Phone-number identity: a UUID distinct from the ACI.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pni(pub Uuid);

impl Pni {
    pub fn parse(s: &str) -> Result<Self, IdentifierError> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| IdentifierError::InvalidServiceId(s.to_string()))
    }
}

impl std::fmt::Display for Pni {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An E.164-formatted phone number (`+` followed by up to 15 digits).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct E164(String);

impl E164 {
    pub fn parse(s: &str) -> Result<Self, IdentifierError> {
        let rest = s
            .strip_prefix('+')
            .ok_or_else(|| IdentifierError::InvalidE164(s.to_string()))?;
        if rest.is_empty() || rest.len() > 15 || !rest.bytes().all(|b| b.is_ascii_digit()) {
            return Err(IdentifierError::InvalidE164(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for E164 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The local device's own identifiers, supplied by the caller of an import
/// or export. Never serialized into an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalIdentifiers {
    pub aci: Aci,
    pub pni: Pni,
    pub e164: E164,
}

impl LocalIdentifiers {
    /// Whether a frame-level contact reference points at the local user.
    pub fn matches(&self, aci: Option<&Aci>, pni: Option<&Pni>, e164: Option<&E164>) -> bool {
        aci == Some(&self.aci) || pni == Some(&self.pni) || e164 == Some(&self.e164)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_e164_accepts_valid() {
        assert!(E164::parse("+17735550199").is_ok());
    }

    #[test]
    fn test_e164_rejects_garbage() {
        assert!(E164::parse("17735550199").is_err());
        assert!(E164::parse("+").is_err());
        assert!(E164::parse("+1773555019x").is_err());
        assert!(E164::parse("+1234567890123456").is_err());
    }

    #[test]
    fn test_local_identifiers_match() {
        let local = LocalIdentifiers {
            aci: Aci(Uuid::new_v4()),
            pni: Pni(Uuid::new_v4()),
            e164: E164::parse("+17735550199").unwrap(),
        };

        assert!(local.matches(Some(&local.aci), None, None));
        assert!(local.matches(None, None, Some(&local.e164)));
        assert!(!local.matches(Some(&Aci(Uuid::new_v4())), None, None));
    }
}
