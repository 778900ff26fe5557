use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};

use imapmirror::config::{Config, ImapSecurity};
use imapmirror::connection::connect;
use imapmirror::{LogReporter, MailSession, SyncEngine, SyncOptions};

/// Copy every mailbox of one IMAP account into another, skipping messages
/// whose Message-ID already exists at the destination. The source is only
/// ever opened read-only.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Source account as user:password[:host[:port]]
    source: Option<String>,

    /// Destination account as user:password[:host[:port]]
    destination: Option<String>,

    /// Skip source mailboxes matching this regex (can be given several times)
    #[clap(short, long, value_name = "PATTERN")]
    exclude: Vec<String>,

    /// Source connection security (none, starttls, ssl)
    #[clap(long)]
    source_security: Option<String>,

    /// Destination connection security (none, starttls, ssl)
    #[clap(long)]
    destination_security: Option<String>,

    /// Path to a JSON config file
    #[clap(short, long)]
    config: Option<String>,

    /// Report what would be copied without changing the destination
    #[clap(short = 'n', long)]
    dry_run: bool,

    /// Enable debug logging
    #[clap(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(if args.debug { log::LevelFilter::Debug } else { log::LevelFilter::Info })
        .parse_default_env()
        .init();

    let config = build_config(&args)?;
    let exclusions = config
        .exclusion_rules()
        .context("Failed to compile exclude patterns")?;
    let source_account = config.source()?;
    let destination_account = config.destination()?;

    let mut source = connect(source_account)
        .with_context(|| format!("Failed to connect to source {}", source_account))?;
    let mut destination = connect(destination_account)
        .with_context(|| format!("Failed to connect to destination {}", destination_account))?;

    if config.dry_run {
        info!("Dry run: the destination will not be modified");
    }

    let result = SyncEngine::new(source.as_mut(), destination.as_mut(), &exclusions, &LogReporter)
        .with_options(SyncOptions { dry_run: config.dry_run })
        .run();

    logout("source", source.as_mut());
    logout("destination", destination.as_mut());

    result.context("Synchronization aborted")?;
    Ok(())
}

fn build_config(args: &Args) -> Result<Config> {
    let config_path = match &args.config {
        Some(path) => shellexpand::tilde(path).into_owned(),
        None => default_config_path(),
    };
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path))?;

    if let Some(source) = &args.source {
        config.source = Some(source.parse().context("Invalid source account")?);
    }
    if let Some(destination) = &args.destination {
        config.destination = Some(destination.parse().context("Invalid destination account")?);
    }

    if let Some(security) = &args.source_security {
        let security: ImapSecurity = security.parse()?;
        if let Some(account) = config.source.as_mut() {
            account.security = security;
        }
    }
    if let Some(security) = &args.destination_security {
        let security: ImapSecurity = security.parse()?;
        if let Some(account) = config.destination.as_mut() {
            account.security = security;
        }
    }

    config.exclude.extend(args.exclude.iter().cloned());
    config.dry_run |= args.dry_run;

    Ok(config)
}

fn default_config_path() -> String {
    match dirs::config_dir() {
        Some(dir) => dir.join("imapmirror").join("config.json").to_string_lossy().into_owned(),
        None => shellexpand::tilde("~/.config/imapmirror/config.json").into_owned(),
    }
}

fn logout(role: &str, session: &mut dyn MailSession) {
    if let Err(e) = session.logout() {
        warn!("Logout from {} failed: {}", role, e);
    }
}
