pub mod prompt;

use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::DerivationError;
use crate::models::{DerivedPassword, SiteRecord};

pub use prompt::{MasterSecretSource, TerminalPrompt};

type HmacSha256 = Hmac<Sha256>;

/// Length of a standard, padded base64 encoding of a SHA-256 output.
pub const ENCODED_DIGEST_LEN: usize = 44;

/// The secret a user remembers. Never persisted; wiped on drop.
///
/// An empty secret is the "aborted by user" sentinel.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterSecret(String);

impl MasterSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn is_abort(&self) -> bool {
        self.0.is_empty()
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for MasterSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterSecret(<redacted>)")
    }
}

/// Derives site passwords under one master secret.
pub struct DerivationEngine {
    master_secret: MasterSecret,
}

impl DerivationEngine {
    /// Fails with `AbortedByUser` on the empty sentinel.
    pub fn new(master_secret: MasterSecret) -> Result<Self, DerivationError> {
        if master_secret.is_abort() {
            return Err(DerivationError::AbortedByUser);
        }
        Ok(Self { master_secret })
    }

    /// Compute the password for `record` and verify it against the stored
    /// check digest, if any.
    pub fn derive(&self, record: &SiteRecord) -> Result<DerivedPassword, DerivationError> {
        record.validate()?;

        let mut mac = HmacSha256::new_from_slice(self.master_secret.expose().as_bytes())
            .map_err(|_| DerivationError::InvalidRecord("unusable master secret".to_string()))?;
        mac.update(canonical_message(record).as_bytes());
        let mut encoded = general_purpose::STANDARD.encode(mac.finalize().into_bytes());

        // base64 output is ASCII, so byte and char positions agree.
        encoded.truncate(record.length);
        encoded.push_str(record.suffix());

        let mut password = DerivedPassword {
            value: encoded,
            verified: false,
        };

        if let Some(stored) = record.check_digest() {
            let computed = check_digest(&password.value);
            if !bool::from(stored.as_bytes().ct_eq(computed.as_bytes())) {
                return Err(DerivationError::CheckMismatch);
            }
            password.verified = true;
        }

        Ok(password)
    }
}

/// Derive the password for `record` under `master_secret`.
pub fn derive(record: &SiteRecord, master_secret: &str) -> Result<DerivedPassword, DerivationError> {
    DerivationEngine::new(MasterSecret::new(master_secret))?.derive(record)
}

/// The message the MAC is computed over: `user+salt@domain`.
///
/// Separators inside the fields are not escaped, so `a+b` / `c` and
/// `a` / `b+c` produce the same message. Changing this would change every
/// existing password.
pub fn canonical_message(record: &SiteRecord) -> String {
    format!("{}+{}@{}", record.user, record.salt, record.domain)
}

/// Digest stored alongside a record to recognise its password later.
pub fn check_digest(password: &str) -> String {
    let mut hasher = <Sha256 as Digest>::new();
    hasher.update(password.as_bytes());
    general_purpose::STANDARD.encode(hasher.finalize())
}
