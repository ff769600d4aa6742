//! `flowlink` CLI entry-point.
//!
//! Available sub-commands:
//! - `serve`    start the API server.
//! - `migrate`  run pending database migrations.
//! - `validate` check a workflow JSON file against the built-in providers.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use db::pool::{create_pool, run_migrations, PoolConfig};
use engine::store::PgStore;
use engine::{Engine, EngineConfig, ProviderRegistry, TransformerRegistry, Workflow};
use providers::http::HttpProvider;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "flowlink", about = "Trigger-to-action workflow engine", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the REST API server.
    Serve {
        #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
        bind: String,
        #[command(flatten)]
        database: DatabaseArgs,
        /// Deadline for a single provider action call, in seconds.
        #[arg(long, env = "ACTION_TIMEOUT_SECS", default_value_t = 60)]
        action_timeout_secs: u64,
    },
    /// Run pending database migrations.
    Migrate {
        #[command(flatten)]
        database: DatabaseArgs,
    },
    /// Validate a workflow definition JSON file.
    Validate {
        /// Path to the workflow JSON file.
        path: PathBuf,
    },
}

#[derive(Args)]
struct DatabaseArgs {
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,
    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = 10)]
    max_connections: u32,
}

impl DatabaseArgs {
    fn pool_config(&self) -> PoolConfig {
        PoolConfig::new(&self.database_url).max_connections(self.max_connections)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Cli::parse().command {
        Command::Serve {
            bind,
            database,
            action_timeout_secs,
        } => {
            let pool = create_pool(&database.pool_config())
                .await
                .context("failed to connect to database")?;
            let config = EngineConfig {
                action_timeout: Duration::from_secs(action_timeout_secs),
            };
            let engine = Arc::new(Engine::with_store(Arc::new(PgStore::new(pool)), config));
            engine.register_service_provider(Arc::new(HttpProvider::new()));

            info!(
                "starting API server on {bind} with providers {:?}",
                engine.providers().services()
            );
            api::serve(&bind, engine).await.context("API server stopped")?;
        }
        Command::Migrate { database } => {
            let pool = create_pool(&database.pool_config())
                .await
                .context("failed to connect to database")?;
            run_migrations(&pool).await.context("migration failed")?;
            info!("migrations applied successfully");
        }
        Command::Validate { path } => {
            let workflow = read_workflow(&path)?;
            let providers = builtin_providers();
            match engine::validate_workflow(&workflow, &providers, &TransformerRegistry::with_builtins()) {
                Ok(()) => println!(
                    "workflow '{}' is valid ({} actions)",
                    workflow.name,
                    workflow.actions.len()
                ),
                Err(e) => {
                    eprintln!("validation failed: {e}");
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

fn builtin_providers() -> ProviderRegistry {
    let registry = ProviderRegistry::new();
    registry.register(Arc::new(HttpProvider::new()));
    registry
}

fn read_workflow(path: &Path) -> anyhow::Result<Workflow> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read file {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("{} is not a workflow", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_takes_a_path() {
        let cli = Cli::try_parse_from(["flowlink", "validate", "wf.json"]).unwrap();
        assert!(matches!(cli.command, Command::Validate { path } if path == PathBuf::from("wf.json")));
    }

    #[test]
    fn serve_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "flowlink",
            "serve",
            "--bind",
            "127.0.0.1:9000",
            "--database-url",
            "postgres://localhost/flowlink",
            "--max-connections",
            "4",
            "--action-timeout-secs",
            "5",
        ])
        .unwrap();

        match cli.command {
            Command::Serve {
                bind,
                database,
                action_timeout_secs,
            } => {
                assert_eq!(bind, "127.0.0.1:9000");
                assert_eq!(database.max_connections, 4);
                assert_eq!(action_timeout_secs, 5);
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn builtin_registry_knows_http() {
        assert!(builtin_providers().get("http").is_ok());
    }
}
