use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hap2::{
    config::Config,
    error::DerivationError,
    handlers::{self, StdoutSink},
    models::SiteUpdate,
    security::TerminalPrompt,
    state::AppState,
};

/// Calculate secure passwords
#[derive(Debug, Parser)]
#[command(name = "hap2", about = "Calculate secure passwords")]
struct Cli {
    /// Be verbose
    #[arg(short = 'V', long, global = true)]
    verbose: bool,

    /// Site list to use instead of the configured one
    #[arg(long, global = true, value_name = "PATH")]
    sitelist: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List sites in hap2 config file
    #[command(visible_alias = "l")]
    List,

    /// Manage sites in the hap2 config file
    #[command(visible_alias = "s", subcommand)]
    Site(SiteCommand),

    /// Calculate the password for a site
    #[command(visible_alias = "g")]
    Get {
        /// Nickname for the site
        nick: String,

        /// Store a check digest when the site has none yet
        #[arg(long)]
        save_check: bool,
    },
}

#[derive(Debug, Subcommand)]
enum SiteCommand {
    /// Add a site to hap2 config file
    #[command(visible_alias = "a")]
    Add(AddArgs),

    /// Remove a site from hap2 config file
    #[command(visible_alias = "r")]
    Remove {
        /// Nickname for the site
        #[arg(long)]
        nick: String,
    },
}

#[derive(Debug, Args)]
struct AddArgs {
    /// Force the change
    #[arg(short, long)]
    force: bool,

    /// Nickname for the site
    #[arg(long)]
    nick: Option<String>,

    /// Username for the site
    #[arg(long)]
    user: Option<String>,

    /// Salt for the site, default is 1
    #[arg(long)]
    salt: Option<String>,

    /// Domain name which is being added
    #[arg(long)]
    domain: Option<String>,

    /// Length of calculated password, default is 12
    #[arg(long)]
    length: Option<usize>,

    /// Suffix for password to be added [optional]
    #[arg(long)]
    suffix: Option<String>,

    /// Notes for the site [optional]
    #[arg(long)]
    notes: Option<String>,

    /// Security hint for the site [optional]
    #[arg(long)]
    security: Option<String>,
}

impl From<AddArgs> for SiteUpdate {
    fn from(args: AddArgs) -> Self {
        SiteUpdate {
            nick: args.nick,
            user: args.user,
            salt: args.salt,
            domain: args.domain,
            length: args.length,
            suffix: args.suffix,
            notes: args.notes,
            security_hint: args.security,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match e.downcast_ref::<DerivationError>() {
            Some(DerivationError::AbortedByUser) => ExitCode::SUCCESS,
            _ => {
                eprintln!("[Error] {:#}", e);
                ExitCode::FAILURE
            }
        },
    }
}

fn run(cli: Cli) -> Result<()> {
    // Load configuration
    let config = Config::from_env(cli.sitelist)?;
    config.validate()?;

    // Initialize logging
    let default_level = if cli.verbose {
        "debug".to_string()
    } else {
        config.log_level.clone()
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let state = AppState::new(config);
    debug!("Using site list {}", state.config.sitelist_path.display());

    match cli.command {
        Command::List => {
            println!("List of sites in the config");
            for site in handlers::list_sites(&state)? {
                println!("{} => {}", site.nick, site.identity);
            }
        }
        Command::Site(SiteCommand::Add(args)) => {
            let force = args.force;
            let update = SiteUpdate::from(args);
            handlers::add_site(&state, &update, force)?;
            println!("Saved site `{}` to the config", update.nick());
        }
        Command::Site(SiteCommand::Remove { nick }) => {
            handlers::remove_site(&state, &nick)?;
            println!("Deleted `{}` from config", nick);
        }
        Command::Get { nick, save_check } => {
            let outcome = handlers::get_password(
                &state,
                &nick,
                &mut TerminalPrompt,
                &mut StdoutSink,
                save_check,
            )?;
            if let Some(hint) = &outcome.security_hint {
                eprintln!("Security hint: {}", hint);
            }
            if outcome.check_saved {
                eprintln!("Stored check digest for `{}`", nick);
            } else if !outcome.verified {
                eprintln!(
                    "Warning: `{}` has no check digest, rerun with --save-check to store one",
                    nick
                );
            }
        }
    }

    Ok(())
}
