//! `incumbent`: administrative command line for the officeholder store.
//!
//! Reads `incumbent.toml` (or the path given with `--config`) plus
//! `INCUMBENT_*` environment variables, opens the SQLite store, runs one
//! command and prints its result as JSON.
//!
//! # Usage
//!
//! ```
//! incumbent position add Mayor --level city --branch executive
//! incumbent assign --politician <ID> --position <ID> --city <ID> --start 2022-06-30
//! incumbent archive --election <ID> --position <ID> --position <ID>
//! ```

mod config;

use std::path::PathBuf;

use anyhow::{Context as _, bail};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use incumbent_core::{
  assignment::{AssignmentMode, AssignmentRequest},
  cache::MemoryCache,
  jurisdiction::JurisdictionScope,
  reference::{Branch, NewPosition, PositionLevel},
  registry::Registry,
  store::TenureStore,
  tenure::{EndedReason, TenurePatch},
};
use incumbent_store_sqlite::SqliteStore;
use serde::Serialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::config::{AppConfig, expand_tilde};

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "incumbent", version, about = "Officeholder position-history store")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, value_name = "FILE", default_value = "incumbent.toml")]
  config: PathBuf,

  /// SQLite database file; overrides `store_path` from the config.
  #[arg(long, value_name = "PATH", env = "INCUMBENT_STORE")]
  store: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Manage politicians.
  #[command(subcommand)]
  Politician(PoliticianCommand),

  /// Manage parties.
  #[command(subcommand)]
  Party(PartyCommand),

  /// Manage government positions.
  #[command(subcommand)]
  Position(PositionCommand),

  /// Manage election events.
  #[command(subcommand)]
  Election(ElectionCommand),

  /// Put a politician in a seat, closing out the previous holder if needed.
  Assign {
    #[arg(long)]
    politician: Uuid,
    #[arg(long)]
    position:   Uuid,
    #[command(flatten)]
    seat:       SeatArgs,
    #[arg(long, value_name = "YYYY-MM-DD")]
    start:      NaiveDate,
    #[arg(long, value_name = "YYYY-MM-DD")]
    end:        Option<NaiveDate>,
    #[arg(long)]
    party:      Option<Uuid>,
    #[arg(long)]
    election:   Option<Uuid>,
    /// Treat a same-holder assignment as a new term instead of a correction.
    #[arg(long)]
    new_term:   bool,
  },

  /// Close a current tenure.
  EndTerm {
    tenure: Uuid,
    #[arg(long, value_name = "YYYY-MM-DD")]
    date:   NaiveDate,
    #[arg(long, default_value = "term_change")]
    reason: EndedReason,
  },

  /// Fix fields of a current tenure in place.
  Correct {
    tenure: Uuid,
    #[arg(long)]
    party:  Option<Uuid>,
    #[arg(long, value_name = "YYYY-MM-DD")]
    start:  Option<NaiveDate>,
    #[arg(long, value_name = "YYYY-MM-DD")]
    end:    Option<NaiveDate>,
  },

  /// Remove a tenure entered in error.
  Delete { tenure: Uuid },

  /// Show a seat's current holder.
  Current {
    #[arg(long)]
    position: Uuid,
    #[command(flatten)]
    seat:     SeatArgs,
  },

  /// Every tenure a politician has held.
  History { politician: Uuid },

  /// Every tenure of a position, across jurisdictions.
  Holders { position: Uuid },

  /// Close out current holders ahead of importing an election's results.
  Archive {
    #[arg(long)]
    election: Uuid,
    #[arg(long = "position", required = true)]
    positions: Vec<Uuid>,
  },
}

#[derive(Subcommand, Debug)]
enum PoliticianCommand {
  Add { name: String },
}

#[derive(Subcommand, Debug)]
enum PartyCommand {
  Add {
    name:         String,
    #[arg(long)]
    abbreviation: Option<String>,
  },
}

#[derive(Subcommand, Debug)]
enum PositionCommand {
  Add {
    name:       String,
    #[arg(long)]
    level:      PositionLevel,
    #[arg(long)]
    branch:     Branch,
    /// The office is filled by appointment rather than election.
    #[arg(long)]
    appointed:  bool,
    #[arg(long)]
    max_terms:  Option<u32>,
    #[arg(long)]
    term_years: Option<u32>,
  },
}

#[derive(Subcommand, Debug)]
enum ElectionCommand {
  Add {
    name: String,
    #[arg(long, value_name = "YYYY-MM-DD")]
    date: NaiveDate,
  },
}

/// Jurisdiction flags. When several are given the most general wins:
/// national, region, province, city, barangay, district.
#[derive(Args, Debug)]
struct SeatArgs {
  #[arg(long)]
  national: bool,
  #[arg(long, value_name = "ID")]
  region:   Option<Uuid>,
  #[arg(long, value_name = "ID")]
  province: Option<Uuid>,
  #[arg(long, value_name = "ID")]
  city:     Option<Uuid>,
  #[arg(long, value_name = "ID")]
  barangay: Option<Uuid>,
  #[arg(long, value_name = "ID")]
  district: Option<Uuid>,
}

impl From<SeatArgs> for JurisdictionScope {
  fn from(seat: SeatArgs) -> Self {
    Self {
      is_national: seat.national,
      region_id:   seat.region,
      province_id: seat.province,
      city_id:     seat.city,
      barangay_id: seat.barangay,
      district_id: seat.district,
    }
  }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Logs go to stderr; stdout carries the JSON result.
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let mut cfg = AppConfig::load(&cli.config)?;
  if let Some(path) = cli.store {
    cfg.store_path = expand_tilde(&path);
  }

  if let Some(parent) = cfg.store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {}", parent.display()))?;
  }

  let store = SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;
  let registry = Registry::new(store, MemoryCache::new(), cfg.registry);

  run(&registry, cli.command).await
}

async fn run(
  registry: &Registry<SqliteStore, MemoryCache>,
  command: Command,
) -> anyhow::Result<()> {
  let store = registry.store();

  match command {
    Command::Politician(PoliticianCommand::Add { name }) => {
      print_json(&store.add_politician(name).await?)
    }

    Command::Party(PartyCommand::Add { name, abbreviation }) => {
      print_json(&store.add_party(name, abbreviation).await?)
    }

    Command::Position(PositionCommand::Add {
      name,
      level,
      branch,
      appointed,
      max_terms,
      term_years,
    }) => {
      let input = NewPosition {
        name,
        level,
        branch,
        is_elected: !appointed,
        max_terms,
        term_years,
      };
      print_json(&store.add_position(input).await?)
    }

    Command::Election(ElectionCommand::Add { name, date }) => {
      print_json(&store.add_election(name, date).await?)
    }

    Command::Assign {
      politician,
      position,
      seat,
      start,
      end,
      party,
      election,
      new_term,
    } => {
      let jurisdiction = JurisdictionScope::from(seat).resolve()?;
      let mut request = AssignmentRequest::new(politician, position, jurisdiction, start)
        .with_mode(if new_term { AssignmentMode::NewTerm } else { AssignmentMode::Correction });
      request.term_end = end;
      request.party_id = party;
      request.election_id = election;

      require_reference(store, politician, position).await?;
      print_json(&registry.assign(request).await?)
    }

    Command::EndTerm { tenure, date, reason } => {
      print_json(&registry.end_term(tenure, date, reason).await?)
    }

    Command::Correct { tenure, party, start, end } => {
      let patch = TenurePatch {
        party_id: party.map(Some),
        term_start: start,
        term_end: end.map(Some),
        ..Default::default()
      };
      if patch.is_empty() {
        bail!("nothing to correct; pass at least one of --party, --start, --end");
      }
      print_json(&registry.update(tenure, patch).await?)
    }

    Command::Delete { tenure } => print_json(&registry.delete(tenure).await?),

    Command::Current { position, seat } => {
      let holder = registry
        .current_holder_in(position, JurisdictionScope::from(seat))
        .await?;
      print_json(&holder)
    }

    Command::History { politician } => print_json(&registry.history(politician).await?),

    Command::Holders { position } => print_json(&registry.holders(position).await?),

    Command::Archive { election, positions } => {
      print_json(&registry.archive_for_election(election, &positions).await?)
    }
  }
}

/// Fail with a readable message before an assignment references a missing
/// politician or position, rather than surfacing a foreign-key error.
async fn require_reference(
  store: &SqliteStore,
  politician_id: Uuid,
  position_id: Uuid,
) -> anyhow::Result<()> {
  if store.get_politician(politician_id).await?.is_none() {
    return Err(incumbent_core::Error::PoliticianNotFound(politician_id).into());
  }
  if store.get_position(position_id).await?.is_none() {
    return Err(incumbent_core::Error::PositionNotFound(position_id).into());
  }
  Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
  let out = serde_json::to_string_pretty(value).context("failed to encode output")?;
  println!("{out}");
  Ok(())
}
