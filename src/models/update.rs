//! Creation and partial update of site records.
//!
//! Every field of [`SiteUpdate`] is optional so that "not given" can be
//! told apart from "given, and equal to the default".

use tracing::warn;

use super::{SiteList, SiteRecord};
use crate::error::DerivationError;

pub const MIN_NICK_LEN: usize = 3;

pub const PLACEHOLDER_NICK: &str = "test";
pub const PLACEHOLDER_USER: &str = "alice";
pub const PLACEHOLDER_DOMAIN: &str = "foo.com";
pub const DEFAULT_SALT: &str = "1";
pub const DEFAULT_LENGTH: usize = 12;

/// Field values supplied for a new or existing site.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteUpdate {
    pub nick: Option<String>,
    pub user: Option<String>,
    pub salt: Option<String>,
    pub domain: Option<String>,
    pub length: Option<usize>,
    pub suffix: Option<String>,
    pub notes: Option<String>,
    pub security_hint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteChange {
    Created,
    Updated,
}

impl SiteChange {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiteChange::Created => "CREATED",
            SiteChange::Updated => "UPDATED",
        }
    }
}

impl SiteUpdate {
    /// Nickname the update targets, falling back to the placeholder.
    pub fn nick(&self) -> &str {
        self.nick.as_deref().unwrap_or(PLACEHOLDER_NICK)
    }

    /// Build a fresh record, refusing placeholder identity fields unless
    /// `force` is set.
    pub fn create(&self, force: bool) -> Result<SiteRecord, DerivationError> {
        let user = require(&self.user, "Username", PLACEHOLDER_USER, force)?;
        let domain = require(&self.domain, "Domain", PLACEHOLDER_DOMAIN, force)?;

        let record = SiteRecord {
            user,
            salt: self
                .salt
                .clone()
                .unwrap_or_else(|| DEFAULT_SALT.to_string()),
            domain,
            length: self.length.unwrap_or(DEFAULT_LENGTH),
            suffix: self.suffix.clone().filter(|s| !s.is_empty()),
            notes: self.notes.clone().filter(|s| !s.is_empty()),
            security_hint: self.security_hint.clone().filter(|s| !s.is_empty()),
            check_digest: None,
        };
        record.validate()?;
        Ok(record)
    }

    /// Merge the supplied fields over `current`.
    ///
    /// Unsupplied fields keep their stored value; stored fields that are
    /// empty fall back to their default where one exists. The check digest
    /// is dropped when the derivation inputs change.
    pub fn merge_into(&self, current: &SiteRecord) -> Result<SiteRecord, DerivationError> {
        let mut merged = current.clone();

        if let Some(user) = &self.user {
            merged.user = user.clone();
        }
        match &self.salt {
            Some(salt) => merged.salt = salt.clone(),
            None if merged.salt.is_empty() => merged.salt = DEFAULT_SALT.to_string(),
            None => {}
        }
        if let Some(domain) = &self.domain {
            merged.domain = domain.clone();
        }
        match self.length {
            Some(length) => merged.length = length,
            None if merged.length == 0 => merged.length = DEFAULT_LENGTH,
            None => {}
        }
        if let Some(suffix) = &self.suffix {
            merged.suffix = Some(suffix.clone()).filter(|s| !s.is_empty());
        }
        if let Some(notes) = &self.notes {
            merged.notes = Some(notes.clone()).filter(|s| !s.is_empty());
        }
        if let Some(hint) = &self.security_hint {
            merged.security_hint = Some(hint.clone()).filter(|s| !s.is_empty());
        }

        if merged.check_digest.is_some() && merged.derivation_differs(current) {
            warn!("Derivation inputs changed, dropping stale check digest");
            merged.check_digest = None;
        }

        merged.validate()?;
        Ok(merged)
    }

    /// Create or update the targeted site in `sites`.
    pub fn apply(&self, sites: &mut SiteList, force: bool) -> Result<SiteChange, DerivationError> {
        let nick = match &self.nick {
            Some(nick) => nick.clone(),
            None => {
                if !force {
                    return Err(DerivationError::UnconfirmedDefault {
                        field: "Nickname",
                        placeholder: PLACEHOLDER_NICK,
                    });
                }
                PLACEHOLDER_NICK.to_string()
            }
        };
        validate_nick(&nick)?;

        match sites.get(&nick) {
            Some(current) => {
                if !force {
                    return Err(DerivationError::WouldOverwrite(nick));
                }
                let merged = self.merge_into(current)?;
                sites.insert(nick, merged);
                Ok(SiteChange::Updated)
            }
            None => {
                let record = self.create(force)?;
                sites.insert(nick, record);
                Ok(SiteChange::Created)
            }
        }
    }
}

pub fn validate_nick(nick: &str) -> Result<(), DerivationError> {
    if nick.chars().count() < MIN_NICK_LEN {
        return Err(DerivationError::InvalidNickname {
            nick: nick.to_string(),
            min: MIN_NICK_LEN,
        });
    }
    Ok(())
}

fn require(
    value: &Option<String>,
    field: &'static str,
    placeholder: &'static str,
    force: bool,
) -> Result<String, DerivationError> {
    match value {
        Some(value) => Ok(value.clone()),
        None if force => Ok(placeholder.to_string()),
        None => Err(DerivationError::UnconfirmedDefault { field, placeholder }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn github() -> SiteUpdate {
        SiteUpdate {
            nick: Some("github".to_string()),
            user: Some("octocat".to_string()),
            domain: Some("github.com".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn create_fills_salt_and_length_defaults() {
        let record = github().create(false).unwrap();
        assert_eq!(record.salt, DEFAULT_SALT);
        assert_eq!(record.length, DEFAULT_LENGTH);
        assert_eq!(record.suffix, None);
    }

    #[test]
    fn create_without_user_needs_force() {
        let update = SiteUpdate {
            user: None,
            ..github()
        };
        assert_eq!(
            update.create(false),
            Err(DerivationError::UnconfirmedDefault {
                field: "Username",
                placeholder: PLACEHOLDER_USER,
            })
        );

        let forced = update.create(true).unwrap();
        assert_eq!(forced.user, PLACEHOLDER_USER);
    }

    #[test]
    fn create_without_domain_needs_force() {
        let update = SiteUpdate {
            domain: None,
            ..github()
        };
        assert!(matches!(
            update.create(false),
            Err(DerivationError::UnconfirmedDefault { field: "Domain", .. })
        ));
    }

    #[test]
    fn explicit_placeholder_value_is_not_a_default() {
        let update = SiteUpdate {
            user: Some(PLACEHOLDER_USER.to_string()),
            ..github()
        };
        assert_eq!(update.create(false).unwrap().user, PLACEHOLDER_USER);
    }

    #[test]
    fn apply_without_nick_needs_force() {
        let mut sites = SiteList::new();
        let update = SiteUpdate {
            nick: None,
            ..github()
        };
        assert!(matches!(
            update.apply(&mut sites, false),
            Err(DerivationError::UnconfirmedDefault { field: "Nickname", .. })
        ));
        assert_eq!(update.apply(&mut sites, true), Ok(SiteChange::Created));
        assert!(sites.contains_key(PLACEHOLDER_NICK));
    }

    #[test]
    fn apply_rejects_short_nick() {
        let mut sites = SiteList::new();
        let update = SiteUpdate {
            nick: Some("gh".to_string()),
            ..github()
        };
        assert!(matches!(
            update.apply(&mut sites, true),
            Err(DerivationError::InvalidNickname { .. })
        ));
        assert!(sites.is_empty());
    }

    #[test]
    fn apply_refuses_overwrite_without_force() {
        let mut sites = SiteList::new();
        github().apply(&mut sites, false).unwrap();

        assert_eq!(
            github().apply(&mut sites, false),
            Err(DerivationError::WouldOverwrite("github".to_string()))
        );
        assert_eq!(github().apply(&mut sites, true), Ok(SiteChange::Updated));
    }

    #[test]
    fn updating_notes_keeps_derivation_fields() {
        let mut sites = SiteList::new();
        SiteUpdate {
            salt: Some("7".to_string()),
            length: Some(20),
            suffix: Some("#1".to_string()),
            ..github()
        }
        .apply(&mut sites, false)
        .unwrap();
        sites.get_mut("github").unwrap().check_digest = Some("digest".to_string());
        let before = sites["github"].clone();

        let notes_only = SiteUpdate {
            nick: Some("github".to_string()),
            notes: Some("2fa enabled".to_string()),
            ..Default::default()
        };
        notes_only.apply(&mut sites, true).unwrap();

        let after = &sites["github"];
        assert_eq!(after.user, before.user);
        assert_eq!(after.salt, before.salt);
        assert_eq!(after.domain, before.domain);
        assert_eq!(after.length, before.length);
        assert_eq!(after.suffix, before.suffix);
        assert_eq!(after.check_digest, before.check_digest);
        assert_eq!(after.notes.as_deref(), Some("2fa enabled"));
    }

    #[test]
    fn merge_fills_empty_stored_fields_with_defaults() {
        let mut current = SiteRecord::new("octocat", "", "github.com", 0);
        current.notes = Some("imported".to_string());

        let merged = SiteUpdate::default().merge_into(&current).unwrap();
        assert_eq!(merged.salt, DEFAULT_SALT);
        assert_eq!(merged.length, DEFAULT_LENGTH);
        assert_eq!(merged.notes.as_deref(), Some("imported"));
    }

    #[test]
    fn merge_can_set_value_equal_to_default() {
        let current = SiteRecord::new("octocat", "5", "github.com", 30);
        let update = SiteUpdate {
            salt: Some(DEFAULT_SALT.to_string()),
            length: Some(DEFAULT_LENGTH),
            ..Default::default()
        };

        let merged = update.merge_into(&current).unwrap();
        assert_eq!(merged.salt, DEFAULT_SALT);
        assert_eq!(merged.length, DEFAULT_LENGTH);
    }

    #[test]
    fn merge_drops_stale_check_digest() {
        let current = SiteRecord::new("octocat", "1", "github.com", 12).with_check_digest("digest");
        let update = SiteUpdate {
            salt: Some("2".to_string()),
            ..Default::default()
        };

        let merged = update.merge_into(&current).unwrap();
        assert_eq!(merged.check_digest, None);
    }

    #[test]
    fn merge_rejects_emptied_user() {
        let current = SiteRecord::new("octocat", "1", "github.com", 12);
        let update = SiteUpdate {
            user: Some(String::new()),
            ..Default::default()
        };
        assert!(matches!(
            update.merge_into(&current),
            Err(DerivationError::InvalidRecord(_))
        ));
    }

    #[test]
    fn merge_fills_length_missing_from_stored_json() {
        let json = r#"{"user":"octocat","salt":"1","domain":"github.com"}"#;
        let current: SiteRecord = serde_json::from_str(json).unwrap();

        let merged = SiteUpdate::default().merge_into(&current).unwrap();
        assert_eq!(merged.length, DEFAULT_LENGTH);
    }

    #[test]
    fn merge_validates_result() {
        let current = SiteRecord::new("octocat", "1", "github.com", 12);
        let update = SiteUpdate {
            length: Some(45),
            ..Default::default()
        };
        assert!(matches!(
            update.merge_into(&current),
            Err(DerivationError::InvalidRecord(_))
        ));
    }

    #[test]
    fn empty_suffix_clears_existing_suffix() {
        let current = SiteRecord::new("octocat", "1", "github.com", 12).with_suffix("!");
        let update = SiteUpdate {
            suffix: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(update.merge_into(&current).unwrap().suffix, None);
    }
}
