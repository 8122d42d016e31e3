mod api;
mod app;
mod config;
mod event;
mod logging;
mod query;
mod seed;
mod store;
mod sync;
mod ui;

use api::CaseClient;
use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use std::sync::Arc;
use store::{CaseStore, SqliteStore};

#[derive(Parser, Debug)]
#[command(name = "mk9s")]
#[command(about = "A terminal browser for missing-children case records")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/mk9s/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Two-letter state code to search
  #[arg(short, long)]
  state: Option<String>,

  /// Database file (":memory:" for a throwaway database)
  #[arg(long)]
  db: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Browse stored cases (default)
  Tui {
    /// Insert fake cases before loading
    #[arg(long)]
    seed: bool,
    /// Fetch from the search service on launch
    #[arg(long)]
    refresh: bool,
  },
  /// Fetch every search page and store the results
  Fetch,
  /// Print stored cases
  List,
  /// Insert fake cases
  Seed,
  /// Print the service URLs for the configured state
  Urls {
    /// Case number for the detail URL
    #[arg(long, requires = "org")]
    case: Option<String>,
    /// Organization prefix for the detail URL
    #[arg(long, requires = "case")]
    org: Option<String>,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let mut config = config::Config::load(args.config.as_deref())?;
  if let Some(state) = args.state {
    config.api.state = state.trim().to_uppercase();
  }
  if let Some(db) = args.db {
    config.db_path = Some(db);
  }

  let command = args.command.unwrap_or(Command::Tui {
    seed: false,
    refresh: false,
  });

  match command {
    Command::Tui { seed, refresh } => {
      let _guard = logging::init_file()?;
      let store = Arc::new(open_store(&config)?);
      if seed {
        seed::populate(&*store)?;
      }
      config.refresh_on_start |= refresh;

      let client = CaseClient::new(&config)?;
      let mut app = app::App::new(&config, client, store);
      app.run().await?;
    }
    Command::Fetch => {
      logging::init_stderr()?;
      let store = open_store(&config)?;
      let client = CaseClient::new(&config)?;
      let report = sync::refresh(&client, &store).await?;
      println!(
        "fetched {} of {} entries over {} pages, stored {}, skipped {} ({} cases in database)",
        report.fetched,
        report.total_records,
        report.total_pages.max(1),
        report.stored,
        report.skipped,
        store.count()?
      );
    }
    Command::List => {
      logging::init_stderr()?;
      let store = open_store(&config)?;
      for case in store.load_all_cases()? {
        println!(
          "{:<14} {:>3}  {:<32} {:<24} {}",
          case.key(),
          case.age.as_deref().unwrap_or("?"),
          case.full_name(),
          case.location(),
          case.missing_date.as_deref().unwrap_or("")
        );
      }
      if let Some(at) = store.last_stored_at()? {
        eprintln!("last stored {}", at.format("%Y-%m-%d %H:%M UTC"));
      }
    }
    Command::Seed => {
      logging::init_stderr()?;
      let store = open_store(&config)?;
      let written = seed::populate(&store)?;
      println!("seeded {} cases", written);
    }
    Command::Urls { case, org } => {
      logging::init_stderr()?;
      let base = &config.api.base_url;
      let state = &config.api.state;
      println!("search: {}", api::urls::begin_search_url(base, state)?);
      println!("page 1: {}", api::urls::search_page_url(base, state, 1)?);
      println!("html:   {}", api::urls::html_search_url(base, state)?);
      if let (Some(case), Some(org)) = (case, org) {
        println!("detail: {}", api::urls::detail_url(base, &case, &org)?);
      }
    }
  }

  Ok(())
}

fn open_store(config: &config::Config) -> Result<SqliteStore> {
  match config.db_path.as_deref() {
    Some(path) if path.as_os_str() == ":memory:" => SqliteStore::open_in_memory(),
    Some(path) => SqliteStore::open(path),
    None => SqliteStore::open_default(),
  }
  .map_err(|e| eyre!("Could not open case database: {}", e))
}
