use clap::Parser;
use coursepay::bootstrap::{Stores, build_state, init_tracing};
use coursepay::config::Settings;
use coursepay::infrastructure::mail::build_mailer;
use coursepay::infrastructure::providers::build_provider;
use coursepay::interfaces::csv::catalog_reader::{CatalogReader, seed_accounts, seed_courses};
use coursepay::interfaces::http::{router, serve};
use miette::{IntoDiagnostic, Result, WrapErr};
use std::fs::File;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about = "Course purchase and enrollment settlement service", long_about = None)]
struct Cli {
    /// Configuration file (YAML, TOML or JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Course catalog CSV to load before serving (id, name, price[, status])
    #[arg(long)]
    courses: Option<PathBuf>,

    /// Account CSV to load before serving (id, email[, first_name, last_name, role])
    #[arg(long)]
    accounts: Option<PathBuf>,

    /// Overrides `server.port`
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let mut settings = Settings::load(cli.config.as_deref()).into_diagnostic()?;
    if let Some(port) = cli.port {
        settings.server.port = port;
    }

    let stores = open_stores(cli.db_path)?;

    if let Some(path) = cli.courses {
        let file = File::open(&path)
            .into_diagnostic()
            .wrap_err_with(|| format!("Cannot open {}", path.display()))?;
        seed_courses(CatalogReader::new(file), stores.courses.as_ref())
            .await
            .into_diagnostic()
            .wrap_err("Failed to seed courses")?;
    }
    if let Some(path) = cli.accounts {
        let file = File::open(&path)
            .into_diagnostic()
            .wrap_err_with(|| format!("Cannot open {}", path.display()))?;
        seed_accounts(CatalogReader::new(file), stores.accounts.as_ref())
            .await
            .into_diagnostic()
            .wrap_err("Failed to seed accounts")?;
    }

    let provider = build_provider(&settings.payments, &settings.server).into_diagnostic()?;
    let mailer = build_mailer(&settings.mail).into_diagnostic()?;
    let (state, _worker) = build_state(&settings, &stores, provider, mailer);

    let address = format!("0.0.0.0:{}", settings.server.port);
    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await.into_diagnostic()?;
    serve(listener, router(state, &settings.server))
        .await
        .into_diagnostic()?;
    Ok(())
}

#[cfg(feature = "storage-rocksdb")]
fn open_stores(db_path: Option<PathBuf>) -> Result<Stores> {
    match db_path {
        Some(path) => Stores::rocksdb(path).into_diagnostic(),
        None => Ok(Stores::in_memory()),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_stores(db_path: Option<PathBuf>) -> Result<Stores> {
    if let Some(path) = db_path {
        tracing::warn!(
            path = %path.display(),
            "Built without the storage-rocksdb feature, using in-memory storage"
        );
    }
    Ok(Stores::in_memory())
}
