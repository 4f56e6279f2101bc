use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use todo_server::ConfigOverrides;

#[derive(Parser)]
#[command(
    name = "todo",
    about = "Todo and project CRUD backend over memory, MongoDB or PostgreSQL",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Print the PostgreSQL schema
    Schema,
    /// Print the resolved configuration
    Config(ConfigArgs),
}

/// Where settings come from. Flags beat environment variables, which beat
/// the config file.
#[derive(Args, Debug, Default)]
pub struct SettingsArgs {
    /// TOML file with server settings
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Listen address [env: TODO_ADDR]
    #[arg(long)]
    pub addr: Option<String>,
    /// Backend: memory, mongo or postgres [env: TODO_STORE]
    #[arg(long)]
    pub store: Option<String>,
    /// MongoDB connection string [env: CONNECTION_STRING]
    #[arg(long = "mongo-dsn", alias = "mongoDSN")]
    pub mongo_dsn: Option<String>,
    /// MongoDB database [env: DATABASE_NAME]
    #[arg(long = "mongo-db", alias = "mongoDBname")]
    pub mongo_db: Option<String>,
    /// MongoDB collection [env: COLLECTION_NAME]
    #[arg(long = "mongo-collection", alias = "mongoCollection")]
    pub mongo_collection: Option<String>,
    /// PostgreSQL connection string [env: POSTGRES_CONNECTION_STRING]
    #[arg(long = "postgres-dsn", alias = "postgresDSN")]
    pub postgres_dsn: Option<String>,
}

impl SettingsArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            addr: self.addr.clone(),
            store: self.store.clone(),
            mongo_dsn: self.mongo_dsn.clone(),
            mongo_db: self.mongo_db.clone(),
            mongo_collection: self.mongo_collection.clone(),
            postgres_dsn: self.postgres_dsn.clone(),
        }
    }
}

#[derive(Args)]
pub struct ServeArgs {
    #[command(flatten)]
    pub settings: SettingsArgs,
    /// Skip creating tables or indexes at startup
    #[arg(long)]
    pub no_migrate: bool,
}

#[derive(Args)]
pub struct ConfigArgs {
    #[command(flatten)]
    pub settings: SettingsArgs,
    /// Print connection strings unmasked
    #[arg(long)]
    pub show_secrets: bool,
}
