use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use colored::Colorize;
use todo_mongo::MongoTodoStore;
use todo_postgres::PostgresTodoStore;
use todo_store::{BackendKind, InMemoryTodoStore, TodoStore};
use todo_server::{ServerConfig, SharedStore, TodoServer};

use crate::cli::{Cli, Command, ConfigArgs, OutputFormat, ServeArgs, SettingsArgs};

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args).await,
        Command::Schema => cmd_schema(),
        Command::Config(args) => cmd_config(args, &cli.format),
    }
}

/// Layer flags and the process environment over the config file.
fn resolve_config(settings: &SettingsArgs) -> anyhow::Result<ServerConfig> {
    layer_config(settings, |key| std::env::var(key).ok())
}

fn layer_config<F>(settings: &SettingsArgs, env: F) -> anyhow::Result<ServerConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let base = match &settings.config {
        Some(path) => ServerConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ServerConfig::default(),
    };
    let config = base
        .resolve(&settings.overrides(), env)
        .context("invalid configuration")?;
    Ok(config)
}

/// Connect to the configured backend and check it answers.
///
/// With `prepare`, the relational schema is created and the document
/// indexes are built before the store is handed out.
pub async fn connect_store(config: &ServerConfig, prepare: bool) -> anyhow::Result<SharedStore> {
    let store: SharedStore = match config.backend()? {
        BackendKind::Memory => Arc::new(InMemoryTodoStore::new()),
        BackendKind::Mongo => {
            let conn = config.mongo.connection()?;
            let mut builder = MongoTodoStore::builder()
                .url(conn.dsn)
                .database(conn.database)
                .collection(conn.collection)
                .timeout(Duration::from_secs(config.mongo.timeout_secs));
            if let Some(size) = config.mongo.max_pool_size {
                builder = builder.max_pool_size(size);
            }
            let store = builder.build().await.context("creating MongoDB client")?;
            store.ping().await.context("MongoDB is unreachable")?;
            if prepare {
                store
                    .create_indexes()
                    .await
                    .context("creating MongoDB indexes")?;
            }
            Arc::new(store)
        }
        BackendKind::Postgres => {
            let dsn = config.postgres.connection()?;
            let store = PostgresTodoStore::connect_with(dsn, config.postgres.max_connections)
                .await
                .context("connecting to PostgreSQL")?;
            store.ping().await.context("PostgreSQL is unreachable")?;
            if prepare {
                store.migrate().await.context("applying PostgreSQL schema")?;
            }
            Arc::new(store)
        }
    };
    tracing::info!(backend = %store.backend(), "store ready");
    Ok(store)
}

async fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = resolve_config(&args.settings)?;
    let store = connect_store(&config, !args.no_migrate).await?;
    println!(
        "{} todo server on {} ({} store)",
        "✓".green().bold(),
        config.listen_addr()?.to_string().bold(),
        store.backend().to_string().cyan()
    );
    TodoServer::new(config, store)
        .serve()
        .await
        .context("server failed")
}

fn cmd_schema() -> anyhow::Result<()> {
    print!("{}", todo_postgres::schema_sql());
    Ok(())
}

fn cmd_config(args: ConfigArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let config = resolve_config(&args.settings)?;
    let config = if args.show_secrets {
        config
    } else {
        config.redacted()
    };
    match format {
        OutputFormat::Text => print!("{}", config.to_toml()?),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn memory_backend_needs_no_connection() {
        let store = connect_store(&ServerConfig::default(), true).await.unwrap();
        assert_eq!(store.backend(), BackendKind::Memory);
        store.ping().await.unwrap();
    }

    #[tokio::test]
    async fn unknown_backend_is_rejected() {
        let config = ServerConfig {
            store: "redis".into(),
            ..ServerConfig::default()
        };
        let err = connect_store(&config, false).await.err().unwrap();
        assert!(err.to_string().contains("redis"));
    }

    #[tokio::test]
    async fn mongo_without_connection_values_is_rejected() {
        let config = ServerConfig {
            store: "mongo".into(),
            ..ServerConfig::default()
        };
        let err = connect_store(&config, false).await.err().unwrap();
        assert!(err.to_string().contains("CONNECTION_STRING"));
    }

    fn config_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn config_file_is_the_base_layer() {
        let file = config_file("addr = \"127.0.0.1:7070\"\nstore = \"memory\"\n");
        let settings = SettingsArgs {
            config: Some(file.path().to_path_buf()),
            ..SettingsArgs::default()
        };
        let config = layer_config(&settings, |_| None).unwrap();
        assert_eq!(config.backend().unwrap(), BackendKind::Memory);
        assert_eq!(config.listen_addr().unwrap().port(), 7070);
    }

    #[test]
    fn environment_and_flags_override_the_file() {
        let file = config_file("addr = \"127.0.0.1:7070\"\nstore = \"mongo\"\n");
        let settings = SettingsArgs {
            config: Some(file.path().to_path_buf()),
            store: Some("memory".into()),
            ..SettingsArgs::default()
        };
        let config = layer_config(&settings, |key| {
            (key == "TODO_ADDR").then(|| "127.0.0.1:9090".to_string())
        })
        .unwrap();
        assert_eq!(config.backend().unwrap(), BackendKind::Memory);
        assert_eq!(config.listen_addr().unwrap().port(), 9090);
    }

    #[test]
    fn missing_config_file_names_the_path() {
        let settings = SettingsArgs {
            config: Some("/nonexistent/todo.toml".into()),
            ..SettingsArgs::default()
        };
        let err = layer_config(&settings, |_| None).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/todo.toml"));
    }

    #[test]
    fn schema_prints() {
        cmd_schema().unwrap();
    }
}
