pub mod update;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::DerivationError;
use crate::security::ENCODED_DIGEST_LEN;

pub use update::{SiteChange, SiteUpdate};

/// All known sites, keyed by nickname.
pub type SiteList = BTreeMap<String, SiteRecord>;

/// Derivation parameters for one site.
///
/// Only `user`, `salt`, `domain`, `length` and `suffix` feed the derivation.
/// The remaining fields are informational, or in the case of `check_digest`
/// used to verify a derivation after the fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteRecord {
    pub user: String,
    #[serde(default)]
    pub salt: String,
    pub domain: String,
    #[serde(default)]
    pub length: usize,
    #[serde(
        default,
        serialize_with = "serialize_optional_text",
        deserialize_with = "deserialize_optional_text"
    )]
    pub suffix: Option<String>,
    #[serde(
        default,
        serialize_with = "serialize_optional_text",
        deserialize_with = "deserialize_optional_text"
    )]
    pub notes: Option<String>,
    #[serde(
        rename = "security",
        default,
        serialize_with = "serialize_optional_text",
        deserialize_with = "deserialize_optional_text"
    )]
    pub security_hint: Option<String>,
    #[serde(
        rename = "check",
        default,
        serialize_with = "serialize_optional_text",
        deserialize_with = "deserialize_optional_text"
    )]
    pub check_digest: Option<String>,
}

impl SiteRecord {
    pub fn new(
        user: impl Into<String>,
        salt: impl Into<String>,
        domain: impl Into<String>,
        length: usize,
    ) -> Self {
        Self {
            user: user.into(),
            salt: salt.into(),
            domain: domain.into(),
            length,
            suffix: None,
            notes: None,
            security_hint: None,
            check_digest: None,
        }
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = non_empty(suffix.into());
        self
    }

    pub fn with_check_digest(mut self, digest: impl Into<String>) -> Self {
        self.check_digest = non_empty(digest.into());
        self
    }

    /// Suffix text, empty when none is set.
    pub fn suffix(&self) -> &str {
        self.suffix.as_deref().unwrap_or_default()
    }

    /// Stored check digest, if one has been recorded.
    pub fn check_digest(&self) -> Option<&str> {
        self.check_digest.as_deref().filter(|d| !d.is_empty())
    }

    /// Whether `other` would derive a different password than `self`.
    pub fn derivation_differs(&self, other: &SiteRecord) -> bool {
        self.user != other.user
            || self.salt != other.salt
            || self.domain != other.domain
            || self.length != other.length
            || self.suffix() != other.suffix()
    }

    /// Check the record can be fed to the derivation.
    ///
    /// The truncated digest plus the suffix must fit within the encoded
    /// digest length.
    pub fn validate(&self) -> Result<(), DerivationError> {
        if self.user.is_empty() {
            return Err(DerivationError::InvalidRecord(
                "user must not be empty".to_string(),
            ));
        }
        if self.length == 0 {
            return Err(DerivationError::InvalidRecord(
                "length must be greater than zero".to_string(),
            ));
        }

        let suffix_len = self.suffix().chars().count();
        if self.length.saturating_add(suffix_len) > ENCODED_DIGEST_LEN {
            return Err(DerivationError::InvalidRecord(format!(
                "length {} with a {}-character suffix exceeds the {} available characters",
                self.length, suffix_len, ENCODED_DIGEST_LEN
            )));
        }

        Ok(())
    }
}

/// A password computed from a site record and the master secret.
///
/// `verified` is false when the record carried no check digest to compare
/// against; callers may then offer to store one.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct DerivedPassword {
    pub value: String,
    pub verified: bool,
}

impl fmt::Debug for DerivedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedPassword")
            .field("value", &"<redacted>")
            .field("verified", &self.verified)
            .finish()
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

// Absent optional fields are written as "" so older readers of the
// site list keep working.
fn serialize_optional_text<S>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(value.as_deref().unwrap_or_default())
}

// Accepts a string or null; "" and null both mean the field is unset.
fn deserialize_optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};

    struct OptionalTextVisitor;

    impl<'de> Visitor<'de> for OptionalTextVisitor {
        type Value = Option<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or null")
        }

        fn visit_str<E>(self, value: &str) -> Result<Option<String>, E>
        where
            E: de::Error,
        {
            Ok(non_empty(value.to_owned()))
        }

        fn visit_string<E>(self, value: String) -> Result<Option<String>, E>
        where
            E: de::Error,
        {
            Ok(non_empty(value))
        }

        fn visit_none<E>(self) -> Result<Option<String>, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Option<String>, E>
        where
            E: de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(OptionalTextVisitor)
}
