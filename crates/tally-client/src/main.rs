//! `tally` — command-line front end for the Tally API.
//!
//! # Usage
//!
//! ```text
//! tally --url http://localhost:8080 --api-key secret categories
//! tally --config ~/.config/tally/client.toml entries --grouped
//! tally add-entry "Dune" --category 6f1c… --description "Herbert"
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tally_client::{ApiClient, ApiConfig, CachedClient};
use tally_core::{
  category::{CategoryPatch, NewCategory},
  entry::{EntryPatch, NewEntry},
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "tally", about = "Command-line client for the Tally API")]
struct Args {
  /// Path to a TOML config file (url, api_key).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the tally server (default: http://localhost:8080).
  #[arg(long, env = "TALLY_URL")]
  url: Option<String>,

  /// Shared API key sent as `x-api-key`.
  #[arg(long, env = "TALLY_API_KEY")]
  api_key: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List categories with their active entry counts.
  Categories,
  /// Show one category.
  Category { id: Uuid },
  /// Create a category.
  AddCategory { name: String },
  /// Rename a category.
  RenameCategory { id: Uuid, name: String },
  /// List active entries.
  Entries {
    /// Group by category name.
    #[arg(long, conflicts_with = "category")]
    grouped:  bool,
    /// Only entries in this category.
    #[arg(long)]
    category: Option<Uuid>,
  },
  /// Show one entry with its category.
  Entry { id: Uuid },
  /// Create an entry.
  AddEntry {
    name:        String,
    #[arg(long)]
    category:    Option<Uuid>,
    #[arg(long)]
    description: Option<String>,
  },
  /// Change fields of an entry.
  EditEntry {
    id:                Uuid,
    #[arg(long)]
    name:              Option<String>,
    #[arg(long, conflicts_with = "uncategorize")]
    category:          Option<Uuid>,
    /// Remove the entry from its category.
    #[arg(long)]
    uncategorize:      bool,
    #[arg(long, conflicts_with = "clear_description")]
    description:       Option<String>,
    #[arg(long)]
    clear_description: bool,
  },
  /// Soft-delete an entry.
  RemoveEntry { id: Uuid },
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:     String,
  #[serde(default)]
  api_key: String,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let api_config = ApiConfig {
    base_url: args
      .url
      .or_else(|| (!file_cfg.url.is_empty()).then(|| file_cfg.url.clone()))
      .unwrap_or_else(|| "http://localhost:8080".to_string()),
    api_key:  args
      .api_key
      .or_else(|| (!file_cfg.api_key.is_empty()).then(|| file_cfg.api_key.clone()))
      .unwrap_or_default(),
  };
  if api_config.api_key.is_empty() {
    bail!("no API key: pass --api-key, set TALLY_API_KEY, or add api_key to the config file");
  }

  let client = CachedClient::new(ApiClient::new(api_config)?);
  run(&client, args.command).await
}

async fn run(client: &CachedClient, command: Command) -> Result<()> {
  match command {
    Command::Categories => print(&client.categories().await?),
    Command::Category { id } => print(&client.category(id).await?),
    Command::AddCategory { name } => {
      print(&client.create_category(&NewCategory::new(name)).await?)
    }
    Command::RenameCategory { id, name } => {
      print(&client.update_category(id, &CategoryPatch { name: Some(name) }).await?)
    }
    Command::Entries { grouped, category } => {
      let listing = match category {
        Some(id) => client.entries_in_category(id).await?,
        None if grouped => client.entries_grouped().await?,
        None => client.entries().await?,
      };
      print(&listing)
    }
    Command::Entry { id } => print(&client.entry(id).await?),
    Command::AddEntry { name, category, description } => {
      let input = NewEntry { name, category_id: category, description };
      print(&client.create_entry(&input).await?)
    }
    Command::EditEntry { id, name, category, uncategorize, description, clear_description } => {
      let patch = EntryPatch {
        name,
        category_id: if uncategorize { Some(None) } else { category.map(Some) },
        description: if clear_description { Some(None) } else { description.map(Some) },
      };
      if patch.is_empty() {
        bail!("nothing to change");
      }
      print(&client.update_entry(id, &patch).await?)
    }
    Command::RemoveEntry { id } => print(&client.delete_entry(id).await?),
  }
}

fn print<T: Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}
