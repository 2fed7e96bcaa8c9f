//! `mend` — bulk metadata curation for a repository value store.
//!
//! Subcommands mirror the routine data-quality jobs: mass delete, find and
//! replace, field-to-field moves, identifier linking, and unique-key (DOI)
//! lookups. Every mutating subcommand honours `--dry-run`.
//!
//! # Usage
//!
//! ```text
//! mend --database metadata.db fix -i fixes.csv -f from -t to -m 3
//! mend --database metadata.db delete -i deletes.csv -f delete -m 57 -n
//! mend --database metadata.db link -i orcids.csv
//! ```

mod input;
mod render;

use std::{fs::File, io::BufReader, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mend_core::{
  CancelToken, Correction, FieldId, FieldRef, store::MetadataStore,
};
use mend_engine::{Engine, LookupFields, LookupOutcome};
use mend_store_sqlite::SqliteStore;
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "mend", about = "Bulk metadata curation for a repository value store")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "mend.toml", global = true)]
  config: PathBuf,

  /// Path to the SQLite metadata database (overrides the config file).
  #[arg(long, env = "MEND_DATABASE", global = true)]
  database: Option<PathBuf>,

  /// Only print changes that would be made.
  #[arg(short = 'n', long, global = true)]
  dry_run: bool,

  /// Do not print progress messages.
  #[arg(short, long, global = true)]
  quiet: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Delete matching metadata values.
  Delete {
    /// CSV file with one column of values to delete.
    #[arg(short, long)]
    input: PathBuf,

    /// Name of the column with values to delete.
    #[arg(short = 'f', long, default_value = "delete")]
    column: String,

    /// Id of the field in the site's field registry.
    #[arg(short = 'm', long)]
    field_id: i32,
  },

  /// Find and replace metadata values.
  Fix {
    /// CSV file with a "bad value" column and a "good value" column.
    #[arg(short, long)]
    input: PathBuf,

    /// Name of the column with values to be replaced.
    #[arg(short = 'f', long)]
    from_column: String,

    /// Name of the column with replacement values.
    #[arg(short = 't', long)]
    to_column: String,

    /// Id of the field in the site's field registry.
    #[arg(short = 'm', long)]
    field_id: i32,
  },

  /// Move matching values from one field to another.
  Move {
    /// Text file with one value per line, matched literally.
    #[arg(short, long)]
    input: PathBuf,

    /// Source field id.
    #[arg(short = 'f', long)]
    from_field_id: i32,

    /// Destination field id.
    #[arg(short = 't', long)]
    to_field_id: i32,
  },

  /// Add identifier assertions for author names, preserving author order.
  Link {
    /// CSV file with author names and assertion texts.
    #[arg(short, long)]
    input: PathBuf,

    /// Name of the column with author names.
    #[arg(long, default_value = "dc.contributor.author")]
    name_column: String,

    /// Name of the column with assertions in "Name: IDENTIFIER" format.
    #[arg(long, default_value = "cg.creator.id")]
    assertion_column: String,

    /// Field id holding author names.
    #[arg(long, default_value_t = 3)]
    name_field_id: i32,

    /// Field id to write assertions to. If omitted, `--assertion-field`
    /// is resolved against the registry once at startup.
    #[arg(long)]
    assertion_field_id: Option<i32>,

    /// Symbolic assertion field as `schema_id:element[:qualifier]`.
    #[arg(long, default_value = "2:creator:id")]
    assertion_field: String,
  },

  /// Resolve titles and handles for a list of unique keys (DOIs).
  Doi2handle {
    /// Text file with one key per line.
    #[arg(short, long)]
    input: PathBuf,

    /// CSV file to write `title,handle,doi` rows to.
    #[arg(short, long)]
    output: PathBuf,

    /// Field id holding the unique key.
    #[arg(long, default_value_t = 220)]
    doi_field_id: i32,

    /// Field id holding the item title.
    #[arg(long, default_value_t = 64)]
    title_field_id: i32,

    /// Field id holding the item handle.
    #[arg(long, default_value_t = 25)]
    handle_field_id: i32,
  },
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct Settings {
  database: Option<PathBuf>,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  let database = resolve_database(&cli)?;

  // Connectivity problems are fatal, reported once, before any record.
  let store = SqliteStore::open(&database).await.with_context(|| {
    format!("could not open metadata store at {}", database.display())
  })?;
  tracing::debug!(database = %database.display(), "connected to the store");

  // Structured cancellation: the interrupt handler only arms the token; the
  // engine stops between records and the store is still released below.
  let cancel = CancelToken::new();
  {
    let cancel = cancel.clone();
    tokio::spawn(async move {
      if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("interrupt received; finishing the current record");
        cancel.cancel();
      }
    });
  }

  let engine = Engine::new(store, cli.dry_run);
  let result = run_command(&engine, &cli, &cancel).await;

  // Release the store on every exit path.
  if let Err(error) = engine.into_store().close().await {
    tracing::warn!(%error, "failed to close the metadata store");
  }

  result
}

/// CLI flag and environment override the config file.
fn resolve_database(cli: &Cli) -> Result<PathBuf> {
  if let Some(database) = &cli.database {
    return Ok(database.clone());
  }

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config.clone()).required(false))
    .add_source(config::Environment::with_prefix("MEND"))
    .build()
    .context("failed to read configuration")?;
  let settings: Settings = settings
    .try_deserialize()
    .context("failed to deserialise configuration")?;

  settings.database.context(
    "no database given; use --database, MEND_DATABASE, or the config file",
  )
}

// ─── Subcommands ──────────────────────────────────────────────────────────────

async fn run_command(
  engine: &Engine<SqliteStore>,
  cli: &Cli,
  cancel: &CancelToken,
) -> Result<()> {
  match &cli.command {
    Command::Delete { input, column, field_id } => {
      let corrections = input::read_deletions(
        open(input)?,
        column,
        FieldId(*field_id),
      )?;
      run_batch(engine, &corrections, cancel, cli.quiet).await
    }

    Command::Fix { input, from_column, to_column, field_id } => {
      let corrections = input::read_replacements(
        open(input)?,
        from_column,
        to_column,
        FieldId(*field_id),
      )?;
      run_batch(engine, &corrections, cancel, cli.quiet).await
    }

    Command::Move { input, from_field_id, to_field_id } => {
      let corrections = input::read_moves(
        open(input)?,
        FieldId(*from_field_id),
        FieldId(*to_field_id),
      )?;
      run_batch(engine, &corrections, cancel, cli.quiet).await
    }

    Command::Link {
      input,
      name_column,
      assertion_column,
      name_field_id,
      assertion_field_id,
      assertion_field,
    } => {
      let assertion_field = resolve_assertion_field(
        engine.store(),
        *assertion_field_id,
        assertion_field,
      )
      .await?;

      let corrections = input::read_links(
        open(input)?,
        name_column,
        assertion_column,
        FieldId(*name_field_id),
        assertion_field,
      )?;
      run_batch(engine, &corrections, cancel, cli.quiet).await
    }

    Command::Doi2handle {
      input,
      output,
      doi_field_id,
      title_field_id,
      handle_field_id,
    } => {
      let fields = LookupFields {
        key_field:    FieldId(*doi_field_id),
        title_field:  FieldId(*title_field_id),
        handle_field: FieldId(*handle_field_id),
      };
      let keys = input::read_keys(open(input)?)?;
      resolve_keys(engine, &fields, &keys, output, cancel, cli.quiet).await
    }
  }
}

fn open(path: &PathBuf) -> Result<BufReader<File>> {
  Ok(BufReader::new(File::open(path).with_context(|| {
    format!("could not open input file {}", path.display())
  })?))
}

async fn run_batch(
  engine: &Engine<SqliteStore>,
  corrections: &[Correction],
  cancel: &CancelToken,
  quiet: bool,
) -> Result<()> {
  let summary = engine
    .run(corrections, cancel, |_, correction, outcome| {
      render::print_progress(correction, outcome, quiet);
    })
    .await?;

  if summary.cancelled {
    tracing::info!(
      processed = summary.processed,
      remaining = corrections.len() - summary.processed,
      "batch interrupted; committed records are kept"
    );
  }
  Ok(())
}

async fn resolve_keys(
  engine: &Engine<SqliteStore>,
  fields: &LookupFields,
  keys: &[String],
  output: &PathBuf,
  cancel: &CancelToken,
  quiet: bool,
) -> Result<()> {
  let mut writer = csv::Writer::from_path(output).with_context(|| {
    format!("could not open output file {}", output.display())
  })?;
  writer.write_record(["title", "handle", "doi"])?;

  for key in keys {
    if cancel.is_cancelled() {
      tracing::info!("interrupted; partial output kept");
      break;
    }

    match engine.resolve_key(fields, key).await? {
      LookupOutcome::Resolved { title, handle, .. } => {
        if !quiet {
          println!("Found: {key}");
        }
        writer.write_record([
          title.as_deref().unwrap_or(""),
          handle.as_deref().unwrap_or(""),
          key,
        ])?;
      }
      LookupOutcome::NotFound => {
        if !quiet {
          println!("Not found: {key}");
        }
      }
      LookupOutcome::Ambiguous { matches } => {
        tracing::warn!(key = %key, matches, "key matches several items; skipping");
      }
    }
  }

  writer.flush().context("flushing output file")?;
  Ok(())
}

/// Resolve the assertion field once at batch start, not per record. An
/// explicit id wins; otherwise the symbolic reference is looked up in the
/// site's field registry.
async fn resolve_assertion_field(
  store: &SqliteStore,
  id: Option<i32>,
  symbolic: &str,
) -> Result<FieldId> {
  match id {
    Some(id) => Ok(FieldId(id)),
    None => {
      let field_ref = parse_field_ref(symbolic)?;
      store
        .resolve_field(&field_ref)
        .await?
        .with_context(|| format!("field {symbolic:?} is not registered"))
    }
  }
}

/// Parse `schema_id:element[:qualifier]` into a [`FieldRef`].
fn parse_field_ref(s: &str) -> Result<FieldRef> {
  let mut parts = s.splitn(3, ':');
  let schema_id = parts
    .next()
    .filter(|p| !p.is_empty())
    .with_context(|| format!("bad field reference {s:?}"))?
    .parse()
    .with_context(|| format!("bad schema id in field reference {s:?}"))?;
  let element = parts
    .next()
    .filter(|p| !p.is_empty())
    .with_context(|| format!("field reference {s:?} needs an element"))?;
  let qualifier = parts.next().map(str::to_owned);
  Ok(FieldRef::new(schema_id, element, qualifier))
}
