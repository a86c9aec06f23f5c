use anyhow::{Context, Result};
use std::io::{self, Write};
use tracing::{debug, error, info, warn};

use crate::{
    error::DerivationError,
    models::{update::validate_nick, SiteChange, SiteRecord, SiteUpdate},
    security::{canonical_message, check_digest, DerivationEngine, MasterSecretSource},
    state::AppState,
};

/// Receives a derived password and hands it to the user.
pub trait SecretSink {
    fn deliver(&mut self, password: &str) -> Result<()>;
}

/// Prints the password on its own line.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl SecretSink for StdoutSink {
    fn deliver(&mut self, password: &str) -> Result<()> {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{}", password).context("Failed to write password")?;
        stdout.flush().context("Failed to flush stdout")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteSummary {
    pub nick: String,
    /// `user+salt@domain`
    pub identity: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetOutcome {
    /// The password matched a stored check digest.
    pub verified: bool,
    /// A new check digest was written to the site list.
    pub check_saved: bool,
    /// Reminder stored with the site, shown alongside the password.
    pub security_hint: Option<String>,
}

/// List every site with the identity its password is derived from.
pub fn list_sites(state: &AppState) -> Result<Vec<SiteSummary>> {
    debug!("Listing sites from {}", state.config.sitelist_path.display());
    let sites = state.store.load()?;
    Ok(sites
        .iter()
        .map(|(nick, record)| SiteSummary {
            nick: nick.clone(),
            identity: canonical_message(record),
        })
        .collect())
}

/// Add a site, or update it when `force` is set.
pub fn add_site(state: &AppState, update: &SiteUpdate, force: bool) -> Result<SiteChange> {
    let mut sites = state.store.load()?;

    let change = update.apply(&mut sites, force).map_err(|e| {
        warn!("Refusing to change site `{}`: {}", update.nick(), e);
        e
    })?;

    state.store.save(&sites)?;
    info!("{} site `{}`", change.as_str(), update.nick());
    Ok(change)
}

/// Remove a site, returning the record that was dropped.
pub fn remove_site(state: &AppState, nick: &str) -> Result<SiteRecord> {
    validate_nick(nick)?;
    let mut sites = state.store.load()?;

    let removed = sites
        .remove(nick)
        .ok_or_else(|| DerivationError::UnknownSite(nick.to_string()))?;

    state.store.save(&sites)?;
    info!("Deleted `{}` from config", nick);
    Ok(removed)
}

/// Derive the password for `nick` and deliver it.
///
/// Nothing reaches the sink when the stored check digest disagrees. With
/// `save_check`, an unverified password has its digest recorded so later
/// runs can verify.
pub fn get_password(
    state: &AppState,
    nick: &str,
    source: &mut dyn MasterSecretSource,
    sink: &mut dyn SecretSink,
    save_check: bool,
) -> Result<GetOutcome> {
    let mut sites = state.store.load()?;
    let record = sites
        .get(nick)
        .ok_or_else(|| DerivationError::UnknownSite(nick.to_string()))?;
    record.validate()?;

    let security_hint = record.security_hint.clone();

    let secret = source.read_secret(&format!("Master secret for `{}`: ", nick))?;
    if secret.is_abort() {
        debug!("Empty master secret, aborting");
        return Err(DerivationError::AbortedByUser.into());
    }

    let engine = DerivationEngine::new(secret)?;
    let password = engine.derive(record).map_err(|e| {
        if e == DerivationError::CheckMismatch {
            error!("Check digest mismatch for `{}`", nick);
        }
        e
    })?;

    let mut check_saved = false;
    if password.verified {
        debug!("Password for `{}` verified against stored check", nick);
    } else if save_check {
        let digest = check_digest(&password.value);
        if let Some(record) = sites.get_mut(nick) {
            record.check_digest = Some(digest);
        }
        state.store.save(&sites)?;
        check_saved = true;
        info!("Stored check digest for `{}`", nick);
    } else {
        warn!(
            "No check digest stored for `{}`; the password could not be verified",
            nick
        );
    }

    sink.deliver(&password.value)?;

    Ok(GetOutcome {
        verified: password.verified,
        check_saved,
        security_hint,
    })
}
