//! `sgtn` command-line front end.
//!
//! Loads the client configuration (defaults, optional TOML file, `SGTN_*`
//! environment variables), runs one lookup and prints the result as JSON on
//! stdout. Logs go to stderr.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sgtn_client::Client;
use sgtn_core::ClientConfig;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "sgtn", version, about = "Resolve localized messages from a translation service or local bundles")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, env = "SGTN_CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve one message, substituting positional arguments.
    Message {
        product: String,
        version: String,
        locale: String,
        component: String,
        key: String,
        /// Values for `{0}`, `{1}`, ...
        args: Vec<String>,
    },
    /// Print every message of a component.
    Messages { product: String, version: String, locale: String, component: String },
    /// List the locales of a product version.
    Locales { product: String, version: String },
    /// List the components of a product version.
    Components { product: String, version: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json);

    let config = ClientConfig::from_figment(&ClientConfig::figment(cli.config.as_deref()))
        .context("failed to load configuration")?;
    let client = Client::initialize(config)?;

    let output = match cli.command {
        Command::Message { product, version, locale, component, key, args } => {
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            match client
                .get_string_message(&product, &version, &locale, &component, &key, &args)
                .await
            {
                Ok(message) => serde_json::json!({ "key": key, "message": message }),
                Err(err) => {
                    tracing::warn!(error = %err.error, "message lookup failed, printing the key");
                    serde_json::json!({ "key": key, "message": err.fallback_text(), "error": err.to_string() })
                }
            }
        }
        Command::Messages { product, version, locale, component } => {
            let messages = client
                .get_component_messages(&product, &version, &locale, &component)
                .await?;
            serde_json::to_value(messages.as_ref())?
        }
        Command::Locales { product, version } => {
            serde_json::to_value(client.get_locale_list(&product, &version).await?.as_ref())?
        }
        Command::Components { product, version } => {
            serde_json::to_value(client.get_component_list(&product, &version).await?.as_ref())?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn init_logging(json: bool) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
