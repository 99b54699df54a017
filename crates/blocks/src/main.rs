//! Pagestream operator tool.
//!
//! Prints the block schema, validates stored content streams, and shows
//! block preview contexts.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use pagestream_blocks::content::parse_stream;
use pagestream_blocks::{BlockKind, Config, StreamSchema};

#[derive(Debug, Parser)]
#[command(name = "pagestream", version, about = "Inspect and validate page content streams")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the stream schema as JSON.
    Schema,
    /// Validate a stored content stream (a JSON array of blocks).
    Validate {
        /// Path to the stream JSON file.
        file: PathBuf,
        /// Also check embed URLs against the provider whitelist.
        #[arg(long)]
        check_embeds: bool,
    },
    /// Print the preview template and context of one block type.
    Preview {
        /// Block type tag, e.g. heading_block.
        block_type: String,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    init_tracing();

    let cli = Cli::parse();

    let config = Config::from_env().context("failed to load configuration")?;
    let schema = StreamSchema::from_config(&config);
    info!(block_types = schema.len(), "Stream schema loaded");

    match cli.command {
        Command::Schema => print_json(&serde_json::to_value(schema.describe())?),
        Command::Validate { file, check_embeds } => {
            let raw = fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let entries = parse_stream(&raw)
                .with_context(|| format!("{} is not a valid content stream", file.display()))?;

            let result = if check_embeds {
                schema.validate_with(&entries, &config.embed_whitelist())
            } else {
                schema.validate(&entries)
            };

            match result {
                Ok(()) => {
                    info!(entries = entries.len(), "Content stream is valid");
                    Ok(())
                }
                Err(errors) => {
                    for failure in errors.iter() {
                        eprintln!("{failure}");
                    }
                    bail!(errors)
                }
            }
        }
        Command::Preview { block_type } => {
            let kind: BlockKind = block_type.parse()?;
            let definition = schema
                .get(kind)
                .with_context(|| format!("block type '{kind}' is not in the schema"))?;
            print_json(&json!({
                "template": definition.preview_template,
                "context": definition.preview_context(&Value::Null),
            }))
        }
    }
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
