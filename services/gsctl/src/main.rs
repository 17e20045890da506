//! Command line client for a GeoServer configuration catalog.
//!
//! Connection settings come from a YAML file (`--config`), else from the
//! `GEOSERVER_*` environment (a `.env` file is honored), and individual flags
//! override either.

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gs_catalog::{Catalog, CatalogConfig};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "gsctl")]
#[command(about = "Inspect and edit a GeoServer catalog over its REST API")]
struct Args {
    /// REST endpoint, e.g. http://localhost:8080/geoserver/rest
    #[arg(long, env = "GEOSERVER_URL", global = true)]
    url: Option<String>,

    #[arg(long, env = "GEOSERVER_USER", global = true)]
    user: Option<String>,

    #[arg(long, env = "GEOSERVER_PASSWORD", hide_env_values = true, global = true)]
    password: Option<String>,

    /// Bearer token; takes precedence over user and password
    #[arg(long, env = "GEOSERVER_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// Retries for idempotent requests
    #[arg(long, env = "GEOSERVER_RETRIES", global = true)]
    retries: Option<u32>,

    /// YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level or filter directive
    #[arg(long, env = "RUST_LOG", default_value = "warn", global = true)]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Server version
    Version,
    Workspaces {
        #[command(subcommand)]
        action: WorkspaceAction,
    },
    Stores {
        #[command(subcommand)]
        action: ScopedList,
    },
    Layers {
        #[command(subcommand)]
        action: LayerAction,
    },
    Layergroups {
        #[command(subcommand)]
        action: ScopedList,
    },
    Styles {
        #[command(subcommand)]
        action: ScopedList,
    },
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Reload the configuration from the data directory
    Reload,
}

#[derive(Subcommand, Debug)]
enum WorkspaceAction {
    List,
    Create {
        name: String,
        /// Namespace URI; defaults to http://<name>
        #[arg(long)]
        uri: Option<String>,
    },
    Delete {
        name: String,
        /// Also delete everything the workspace contains
        #[arg(long)]
        recurse: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ScopedList {
    List {
        /// Restrict to these workspaces
        #[arg(short, long)]
        workspace: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
enum LayerAction {
    List {
        /// Only layers publishing this resource (`ws:name`)
        #[arg(long)]
        resource: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum SettingsAction {
    /// Global settings document
    Show,
}

fn init_tracing(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

fn load_config(args: &Args) -> Result<CatalogConfig> {
    let mut config = match &args.config {
        Some(path) => CatalogConfig::from_yaml_file(path)?,
        None => CatalogConfig::from_env()?,
    };

    if let Some(url) = &args.url {
        config.service_url = url.clone();
    }
    if let Some(token) = args.token.as_deref().filter(|t| !t.is_empty()) {
        config = config.with_token(token);
    } else if args.user.is_some() || args.password.is_some() {
        config = config.with_basic_auth(
            args.user.as_deref().unwrap_or("admin"),
            args.password.as_deref().unwrap_or("geoserver"),
        );
    }
    if let Some(retries) = args.retries {
        config.retries = retries;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(&args.log_level, args.json_logs)?;

    let config = load_config(&args)?;
    debug!(service_url = %config.service_url, auth = ?config.auth, "Resolved configuration");
    let catalog = Catalog::new(&config)
        .with_context(|| format!("cannot build a client for {}", config.service_url))?;

    let out = commands::Output { json: args.json };
    match args.command {
        Command::Version => commands::version(&catalog, &out).await,
        Command::Workspaces { action } => match action {
            WorkspaceAction::List => commands::list_workspaces(&catalog, &out).await,
            WorkspaceAction::Create { name, uri } => {
                let uri = uri.unwrap_or_else(|| format!("http://{}", name));
                commands::create_workspace(&catalog, &name, &uri).await
            }
            WorkspaceAction::Delete { name, recurse } => {
                commands::delete_workspace(&catalog, &name, recurse).await
            }
        },
        Command::Stores {
            action: ScopedList::List { workspace },
        } => commands::list_stores(&catalog, &workspace, &out).await,
        Command::Layers {
            action: LayerAction::List { resource },
        } => commands::list_layers(&catalog, resource.as_deref(), &out).await,
        Command::Layergroups {
            action: ScopedList::List { workspace },
        } => commands::list_layergroups(&catalog, &workspace, &out).await,
        Command::Styles {
            action: ScopedList::List { workspace },
        } => commands::list_styles(&catalog, &workspace, &out).await,
        Command::Settings {
            action: SettingsAction::Show,
        } => commands::show_settings(&catalog, &out).await,
        Command::Reload => {
            catalog.reload().await?;
            info!("Configuration reloaded");
            Ok(())
        }
    }
}
