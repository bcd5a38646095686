use anyhow::Context;
use cart_inspections::app::ports::{MailerPort, MediaStorePort};
use cart_inspections::app::InspectionUseCase;
use cart_inspections::config::Config;
use cart_inspections::infra::{FsMediaStore, LogMailer, SendGridMailer, SupabaseMediaStore};
use cart_inspections::storage::{SqliteStorage, Storage};
use cart_inspections::{logging, metrics, server};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "cart_inspections")]
#[command(about = "Golf cart damage inspections with guest sign-off")]
#[command(version)]
struct Cli {
    /// Path to config.toml (optional; environment variables override it)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Port to listen on (overrides config and PORT)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Create or update the database schema
    Migrate,
    /// Insert the default cart parts, damage types and property
    SeedCatalog,
}

fn build_mailer(config: &Config) -> Arc<dyn MailerPort> {
    match &config.mail.sendgrid_api_key {
        Some(key) => Arc::new(SendGridMailer::new(key.clone(), config.mail.from_address.clone())),
        None => {
            warn!("SENDGRID_API_KEY not set; emails will only be logged");
            Arc::new(LogMailer)
        }
    }
}

fn build_media_store(config: &Config) -> Arc<dyn MediaStorePort> {
    match config.media.supabase() {
        Some((url, key)) => {
            info!(bucket = %config.media.supabase_bucket, "Storing media in Supabase");
            Arc::new(SupabaseMediaStore::new(
                url,
                key,
                config.media.supabase_bucket.clone(),
                config.media.supabase_prefix.clone(),
            ))
        }
        None => {
            info!(root = %config.media.root.display(), "Storing media on the local filesystem");
            Arc::new(FsMediaStore::new(config.media.root.clone(), "/media"))
        }
    }
}

fn build_use_case(config: &Config, storage: Arc<dyn Storage>) -> InspectionUseCase {
    InspectionUseCase::new(
        storage,
        build_mailer(config),
        build_media_store(config),
        config.server.public_base_url.clone(),
        config.mail.manager_email.clone(),
    )
    .with_token_ttl(config.server.token_ttl())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    let _log_guard =
        logging::init_logging(&config.server.log_dir).context("initializing logging")?;

    let sqlite =
        Arc::new(SqliteStorage::open(&config.database.path).context("opening inspection database")?);
    let storage: Arc<dyn Storage> = sqlite.clone();

    match cli.command {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(metrics_port) = config.server.metrics_port {
                metrics::init_metrics(metrics_port);
            }

            let use_case = build_use_case(&config, storage);
            use_case.seed_catalog().await.context("seeding catalog")?;

            tokio::fs::create_dir_all(&config.media.root)
                .await
                .context("creating media directory")?;

            server::start_server(
                Arc::new(use_case),
                config.media.root.clone(),
                &config.server.host,
                config.server.port,
            )
            .await
            .context("running HTTP server")?;
        }
        Commands::Migrate => {
            sqlite.run_migrations().context("running migrations")?;
            info!(path = %config.database.path.display(), "Database schema is up to date");
        }
        Commands::SeedCatalog => {
            build_use_case(&config, storage)
                .seed_catalog()
                .await
                .context("seeding catalog")?;
        }
    }
    Ok(())
}
