use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::{builder::ArgAction, Parser, Subcommand};
use console::{style, Emoji};
use errors::ScipaperCliError;
use scipaper::{
  config::Config,
  format::{format_authors, truncate_title},
  paper::{Paper, Source},
  pipeline,
  store::PaperStore,
};
use tracing::{debug, trace};
use tracing_subscriber::EnvFilter;

pub mod errors;

static LOOKING_GLASS: Emoji<'_, '_> = Emoji("🔍 ", "");
static BOOKS: Emoji<'_, '_> = Emoji("📚 ", "");
static PAPER: Emoji<'_, '_> = Emoji("📄 ", "");
static SAVE: Emoji<'_, '_> = Emoji("💾 ", "");
static WARNING: Emoji<'_, '_> = Emoji("⚠️  ", "");
static SUCCESS: Emoji<'_, '_> = Emoji("✨ ", "");

/// Titles listed in a dry run
const DRY_RUN_PREVIEW: usize = 10;

#[derive(Parser)]
#[command(author, version, about = "Harvest keyword-matched preprints into a JSON snapshot")]
struct Cli {
  /// Verbose mode (-v, -vv, -vvv)
  #[arg(
        short,
        long,
        action = ArgAction::Count,
        global = true,
        help = "Increase logging verbosity"
    )]
  verbose: u8,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Fetch recent papers from the enabled sources and match them against the keywords
  Update {
    /// Path to the YAML configuration
    #[arg(long, short)]
    config:      Option<PathBuf>,
    /// Override `days_back`
    #[arg(long)]
    days:        Option<u32>,
    /// Override `max_results`
    #[arg(long)]
    max_results: Option<usize>,
    /// Write the snapshot to `site_data_path` instead of printing a summary
    #[arg(long)]
    write:       bool,
  },
  /// List the papers in a snapshot
  List {
    /// Path to the snapshot file
    #[arg(long, short)]
    path:   Option<PathBuf>,
    /// Only show papers from these sources (arxiv, biorxiv, medrxiv, pubmed, chemrxiv)
    #[arg(long, short)]
    source: Vec<Source>,
  },
  /// Removes the snapshot file
  Clean {
    /// Path to the snapshot file
    #[arg(long, short)]
    path: Option<PathBuf>,
    /// Skip the confirmation prompt
    #[arg(long, short)]
    yes:  bool,
  },
}

/// Setup logging with the specified verbosity level
fn setup_logging(verbosity: u8) {
  let filter = match verbosity {
    0 => "warn",
    1 => "info",
    2 => "debug",
    _ => "trace",
  };

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_file(true)
    .with_line_number(true)
    .with_thread_ids(true)
    .with_target(true)
    .init();
}

/// Loads the configuration from `path`, or from the default location when it exists.
fn load_config(path: Option<PathBuf>) -> Result<Config, ScipaperCliError> {
  let path = match path {
    Some(path) => path,
    None => {
      let default_path = Config::default_path();
      if !default_path.exists() {
        println!(
          "{} No configuration at {}, using defaults",
          style(WARNING).yellow(),
          style(default_path.display()).yellow()
        );
        return Ok(Config::default());
      }
      default_path
    },
  };
  trace!("Using configuration at: {}", path.display());
  Ok(Config::load(path)?)
}

/// Prints one paper as a list entry.
fn print_paper(index: usize, paper: &Paper) {
  debug!("Paper details: {:?}", paper);
  println!(
    "\n{}. {}",
    style(index + 1).yellow(),
    style(truncate_title(&paper.title, None)).white().bold()
  );
  println!("   {} {}", style("Authors:").green(), style(format_authors(&paper.authors, 3)).white());
  println!(
    "   {} {} {}",
    style("Source:").green(),
    style(paper.source).cyan(),
    style(paper.published.format("%Y-%m-%d")).yellow()
  );
  if let Some(keywords) = &paper.matched_keywords {
    println!("   {} {}", style("Keywords:").green(), style(keywords.join(", ")).magenta());
  }
  println!("   {} {}", style("Link:").green(), style(&paper.link).blue().underlined());
}

/// Resolves the snapshot path for `list` and `clean`.
fn snapshot_path(path: Option<PathBuf>) -> PathBuf {
  path.unwrap_or_else(|| {
    let default_path = PaperStore::default_path();
    println!(
      "{} Using default snapshot path: {}",
      style(BOOKS).cyan(),
      style(default_path.display()).yellow()
    );
    default_path
  })
}

/// Asks before deleting the snapshot at `path`.
fn confirm_removal(path: &Path) -> Result<bool, ScipaperCliError> {
  Ok(
    dialoguer::Confirm::new()
      .with_prompt(format!("Are you sure you want to delete {}?", path.display()))
      .default(false)
      .wait_for_newline(true)
      .interact()?,
  )
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), ScipaperCliError> {
  let cli = Cli::parse();
  setup_logging(cli.verbose);

  match cli.command {
    Commands::Update { config, days, max_results, write } => {
      let mut config = load_config(config)?;
      if let Some(days) = days {
        config.days_back = days;
      }
      if let Some(max_results) = max_results {
        config.max_results = max_results;
      }
      config.validate()?;

      println!(
        "{} Fetching papers for {} keywords, days_back={}...",
        style(LOOKING_GLASS).cyan(),
        style(config.keywords.len()).yellow(),
        style(config.days_back).yellow()
      );

      let papers = pipeline::harvest(&config, Utc::now()).await?;
      println!(
        "{} Collected {} papers across sources within last {} days.",
        style(SUCCESS).green(),
        style(papers.len()).yellow(),
        config.days_back
      );

      if write {
        PaperStore::new(&config.site_data_path).save(&papers)?;
        println!(
          "{} Wrote {} papers -> {}",
          style(SAVE).green(),
          style(papers.len()).yellow(),
          style(config.site_data_path.display()).yellow()
        );
      } else {
        for paper in papers.iter().take(DRY_RUN_PREVIEW) {
          println!(
            "- {} | {}",
            style(paper.published.format("%Y-%m-%d")).yellow(),
            truncate_title(&paper.title, None)
          );
        }
        if papers.len() > DRY_RUN_PREVIEW {
          println!("... and {} more", papers.len() - DRY_RUN_PREVIEW);
        }
        println!("{} Dry run, nothing written (use --write)", style(PAPER).cyan());
      }
      Ok(())
    },

    Commands::List { path, source } => {
      let store = PaperStore::new(snapshot_path(path));
      let papers: Vec<Paper> = store
        .load()?
        .into_iter()
        .filter(|paper| source.is_empty() || source.contains(&paper.source))
        .collect();

      if papers.is_empty() {
        println!(
          "{} No papers in snapshot: {}",
          style(WARNING).yellow(),
          style(store.path().display()).yellow()
        );
        return Ok(());
      }

      println!("{} Found {} papers:", style(SUCCESS).green(), style(papers.len()).yellow());
      for (i, paper) in papers.iter().enumerate() {
        print_paper(i, paper);
      }
      Ok(())
    },

    Commands::Clean { path, yes } => {
      let store = PaperStore::new(snapshot_path(path));
      if !store.path().exists() {
        println!(
          "{} No snapshot found at: {}",
          style(WARNING).yellow(),
          style(store.path().display()).yellow()
        );
        return Ok(());
      }

      println!(
        "{} Snapshot found at: {}",
        style(WARNING).yellow(),
        style(store.path().display()).yellow()
      );
      if !yes && !confirm_removal(store.path())? {
        println!("{} Operation cancelled", style("✖").red());
        return Ok(());
      }

      store.remove()?;
      println!("{} Snapshot removed", style(SUCCESS).green());
      Ok(())
    },
  }
}
