use clap::Parser;
use miette::Result;
use tracing_subscriber::{fmt, EnvFilter};

use consentd::keys;
use consentd::manager::ConsentManager;
use consentd::request::RequestVerifier;
use consentd::settings::Settings;
use consentd::storage::Stores;
use consentd::web;

#[derive(Parser, Debug)]
#[command(name = "consentd", version, about = "Consent management service")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // logging
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    // load settings
    let settings = Settings::load(&cli.config)?;
    tracing::info!(
        backend = ?settings.storage.backend,
        trusted_keys = settings.keys.trusted.len(),
        ticket_ttl_secs = settings.policy.ticket_ttl_secs,
        max_months_valid = settings.policy.max_months_valid,
        "Loaded configuration"
    );

    // load trusted public keys; a malformed key file is fatal
    let verifiers = keys::load_trusted_keys(&settings.keys.trusted)?;
    if verifiers.is_empty() {
        tracing::warn!("No trusted keys configured; every consent request will be rejected");
    }

    // init storage (connects and migrates the SQL backend)
    let stores = Stores::build(&settings.storage, &settings.policy).await?;

    let manager = ConsentManager::new(stores, RequestVerifier::new(verifiers), &settings.policy);

    // start web server
    web::serve(settings, manager).await?;
    Ok(())
}
