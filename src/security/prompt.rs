use anyhow::{Context, Result};
use std::io::{self, IsTerminal, Read};

use super::MasterSecret;

/// Where the master secret comes from. Invoked once per derivation.
///
/// Returning an empty secret means the user aborted.
pub trait MasterSecretSource {
    fn read_secret(&mut self, prompt: &str) -> Result<MasterSecret>;
}

/// Reads the secret from the controlling terminal with echo disabled, or
/// from stdin when it is not a terminal.
#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl MasterSecretSource for TerminalPrompt {
    fn read_secret(&mut self, prompt: &str) -> Result<MasterSecret> {
        if io::stdin().is_terminal() {
            let secret =
                rpassword::prompt_password(prompt).context("Failed to read master secret")?;
            return Ok(MasterSecret::new(secret));
        }

        let mut input = String::new();
        io::stdin()
            .read_to_string(&mut input)
            .context("Failed to read master secret from stdin")?;
        let secret = MasterSecret::new(input.trim_end_matches(['\r', '\n']));
        zeroize::Zeroize::zeroize(&mut input);
        Ok(secret)
    }
}

/// A fixed secret, for scripted use and tests.
#[derive(Debug, Clone)]
pub struct StaticSecret(pub MasterSecret);

impl MasterSecretSource for StaticSecret {
    fn read_secret(&mut self, _prompt: &str) -> Result<MasterSecret> {
        Ok(self.0.clone())
    }
}
