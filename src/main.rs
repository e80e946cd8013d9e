use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use nomad_acme_store::config::{default_config_path, ResolvedConfig};
use nomad_acme_store::models::{Account, CertificateBundle};
use nomad_acme_store::placement::PlacementContext;
use nomad_acme_store::store::{
    item_path, resolve_variables_path, select_store, ItemKind, LocalStore, Store, NOMAD_SCHEME,
};

#[derive(Parser)]
#[command(name = "nomad-acme-store")]
#[command(about = "Inspect and migrate ACME state kept in Nomad Variables")]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the Variables paths a resolver's state is stored under
    Path {
        resolver: String,

        /// Storage hint; defaults to the resolver's configured storage
        #[arg(long)]
        storage: Option<String>,
    },
    /// Show the stored ACME account of a resolver
    Account { resolver: String },
    /// List the stored certificates of a resolver
    Certificates { resolver: String },
    /// Copy a resolver's account and certificates from a local acme.json
    Import {
        resolver: String,

        /// The acme.json file to read
        #[arg(long)]
        from: PathBuf,

        /// Resolver name in the source file; defaults to RESOLVER
        #[arg(long)]
        source_resolver: Option<String>,
    },
}

#[derive(Serialize)]
struct AccountSummary<'a> {
    resolver: &'a str,
    email: &'a str,
    key_type: &'a str,
    status: Option<&'a str>,
    registration_uri: Option<&'a str>,
}

impl<'a> AccountSummary<'a> {
    fn new(resolver: &'a str, account: &'a Account) -> Self {
        Self {
            resolver,
            email: &account.email,
            key_type: account.key_type.as_str(),
            status: account.registration.as_ref().map(|r| r.body.status.as_str()),
            registration_uri: account.registration.as_ref().map(|r| r.uri.as_str()),
        }
    }
}

#[derive(Serialize)]
struct CertificateSummary<'a> {
    main: &'a str,
    sans: &'a [String],
    store: &'a str,
    has_key: bool,
}

impl<'a> From<&'a CertificateBundle> for CertificateSummary<'a> {
    fn from(bundle: &'a CertificateBundle) -> Self {
        Self {
            main: &bundle.domain.main,
            sans: &bundle.domain.sans,
            store: &bundle.store,
            has_key: !bundle.key.is_empty(),
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .init();
    } else {
        tracing_subscriber::registry().with(filter).with(layer).init();
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize output")?
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config_path = cli.config.unwrap_or_else(default_config_path);
    let config = ResolvedConfig::load_or_default(&config_path)
        .with_context(|| format!("Failed to load config: {}", config_path.display()))?;
    let placement = PlacementContext::from_env();

    match cli.command {
        Command::Path { resolver, storage } => {
            let storage = storage
                .or_else(|| config.resolvers.get(&resolver).map(|r| r.storage.clone()))
                .unwrap_or_else(|| NOMAD_SCHEME.to_string());
            let base = resolve_variables_path(&resolver, &storage, &placement);
            println!("{base}");
            println!("{}", item_path(&base, ItemKind::Account));
            println!("{}", item_path(&base, ItemKind::Certificates));
        }
        Command::Account { resolver } => {
            let store = select_store(&config, &placement).await;
            match store.get_account(&resolver).await? {
                Some(account) => print_json(&AccountSummary::new(&resolver, &account))?,
                None => println!("No account stored for resolver {resolver}"),
            }
        }
        Command::Certificates { resolver } => {
            let store = select_store(&config, &placement).await;
            let certificates = store.get_certificates(&resolver).await?;
            let summaries: Vec<CertificateSummary> =
                certificates.iter().map(CertificateSummary::from).collect();
            print_json(&summaries)?;
        }
        Command::Import {
            resolver,
            from,
            source_resolver,
        } => {
            let source = LocalStore::new(&from);
            let source_resolver = source_resolver.as_deref().unwrap_or(&resolver);
            let store = select_store(&config, &placement).await;

            let account = source
                .get_account(source_resolver)
                .await
                .with_context(|| format!("Failed to read {}", from.display()))?;
            if let Some(account) = &account {
                store
                    .save_account(&resolver, account)
                    .await
                    .context("Failed to save account")?;
            }

            let certificates = source
                .get_certificates(source_resolver)
                .await
                .with_context(|| format!("Failed to read {}", from.display()))?;
            if !certificates.is_empty() {
                store
                    .save_certificates(&resolver, &certificates)
                    .await
                    .context("Failed to save certificates")?;
            }

            tracing::info!(
                resolver = %resolver,
                account = account.is_some(),
                certificates = certificates.len(),
                "Imported ACME state"
            );
        }
    }

    Ok(())
}
