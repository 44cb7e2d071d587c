use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use migration::MigratorTrait;
use service::cdn::repo::SeaOrmCdnRepository;
use service::cdn::{CdnService, UploadRequest};
use tracing::{error, info};
use uuid::Uuid;

/// Admin tool for the CDN file store
#[derive(Parser, Debug)]
#[command(name = "cdnctl", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply pending database migrations
    Migrate,
    /// List active categories
    Categories,
    /// List folders of a category, ordered by path
    Folders { category: String },
    /// Upload a local file and print its URL
    Upload {
        file: PathBuf,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        folder: Option<String>,
        #[arg(long)]
        content_type: Option<String>,
        #[arg(long, default_value = "cdnctl")]
        uploaded_by: String,
    },
    /// Delete the file behind a URL
    Delete { url: String },
    /// Rename the file behind a URL, keeping its extension
    Rename { url: String, new_name: String },
    /// Print the physical path of a URL
    Resolve { url: String },
    /// List files of a category
    List {
        category: String,
        /// Only this folder
        #[arg(long, conflicts_with = "root")]
        folder: Option<String>,
        /// Only files stored directly under the category
        #[arg(long)]
        root: bool,
        #[arg(long)]
        search: Option<String>,
    },
    /// Print the effective API key
    ApiKey,
    /// Store the `[cdn]` settings as the only active storage configuration
    ActivateConfig,
}

fn init_logging() {
    // 提前加载 .env，使得 RUST_LOG 等环境变量生效
    dotenv().ok();
    common::utils::logging::init_logging_from_env();
}

fn main() -> std::process::ExitCode {
    init_logging();
    let cli = Cli::parse();

    let run_id = Uuid::new_v4();
    std::panic::set_hook(Box::new(move |info| {
        error!(service = "cdnctl", event = "panic", %run_id, message = %info, "unhandled panic occurred");
    }));

    let cfg = match configs::AppConfig::load_or_default() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(service = "cdnctl", event = "config_invalid", error = %e, "invalid configuration");
            return std::process::ExitCode::FAILURE;
        }
    };

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(w) = cfg.runtime.worker_threads { builder.worker_threads(w); }
    let rt = match builder.build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(service = "cdnctl", event = "runtime_build_failed", error = %e, "failed to build tokio runtime");
            return std::process::ExitCode::FAILURE;
        }
    };

    match rt.block_on(run(cli.command, cfg)) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            error!(service = "cdnctl", event = "command_failed", %run_id, error = %e, "command failed");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, cfg: configs::AppConfig) -> anyhow::Result<()> {
    let db = models::db::connect_with_config(&cfg.database).await?;
    if let Command::Migrate = command {
        migration::Migrator::up(&db, None).await?;
        info!(service = "cdnctl", event = "migrated", "migrations applied");
        return Ok(());
    }
    if let Command::ActivateConfig = command {
        let row = models::storage_config::activate(&db, stored_config(&cfg.cdn)?).await?;
        info!(service = "cdnctl", event = "config_activated", id = %row.id, base_url = %row.base_url, "storage configuration activated");
        return Ok(());
    }

    service::runtime::ensure_storage_dirs(&cfg.cdn).await?;
    let svc = CdnService::new(Arc::new(SeaOrmCdnRepository::new(db)), cfg.cdn.clone());

    match command {
        Command::Migrate | Command::ActivateConfig => {}
        Command::Categories => println!("{}", serde_json::to_string_pretty(&svc.list_categories().await)?),
        Command::Folders { category } => println!("{}", serde_json::to_string_pretty(&svc.list_folders(&category).await?)?),
        Command::Upload { file, category, folder, content_type, uploaded_by } => {
            let name = file
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| anyhow::anyhow!("{} has no usable file name", file.display()))?
                .to_string();
            let mut request = UploadRequest::new(name).uploaded_by(uploaded_by);
            if let Some(c) = category { request = request.category(c); }
            if let Some(f) = folder { request = request.folder(f); }
            if let Some(t) = content_type { request = request.content_type(t); }
            let mut reader = tokio::fs::File::open(&file).await?;
            println!("{}", svc.upload(&mut reader, request).await?);
        }
        Command::Delete { url } => {
            if !svc.delete(&url).await? {
                println!("not found: {url}");
            }
        }
        Command::Rename { url, new_name } => match svc.rename(&url, &new_name).await? {
            Some(new_url) => println!("{new_url}"),
            None => println!("not found: {url}"),
        },
        Command::Resolve { url } => println!("{}", svc.get_physical_path(&url).await?.display()),
        Command::List { category, folder, root, search } => {
            let folder = if root { Some(String::new()) } else { folder };
            let files = svc.list_files(&category, folder.as_deref(), search.as_deref()).await?;
            println!("{}", serde_json::to_string_pretty(&files)?);
        }
        Command::ApiKey => println!("{}", svc.get_api_key().await),
    }
    Ok(())
}

fn stored_config(cdn: &configs::CdnSettings) -> anyhow::Result<models::storage_config::NewStorageConfig> {
    Ok(models::storage_config::NewStorageConfig {
        base_url: cdn.base_url.clone(),
        storage_path: cdn.storage_path.clone(),
        api_key: cdn.api_key.clone(),
        max_file_size_mb: i64::try_from(cdn.max_file_size_mb)?,
        allowed_file_types: cdn.allowed_file_types.clone(),
        enforce_authentication: cdn.enforce_authentication,
        allow_direct_access: cdn.allow_direct_access,
        enable_caching: cdn.enable_caching,
    })
}
