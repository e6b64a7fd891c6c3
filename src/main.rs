mod config;
mod dedupe;
mod filters;
mod job;
mod normalize;
mod pipeline;
mod policy;
mod search;
mod server;
mod store;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use config::{ProfileName, ScrapeProfile, Settings, StoreBackend};
use job::JobSource;
use pipeline::{RunOptions, RunSummary};
use search::SerpApiClient;
use server::{AppState, RunGuard, Trigger};
use store::sheets::SheetsStore;
use store::sqlite::SqliteStore;
use store::JobStore;

#[derive(Parser)]
#[command(name = "job_scout", about = "Job posting scraper: SerpAPI search, dedupe, append to a job table")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one scrape and append new jobs
    Run {
        /// Scrape profile (filtered, general, boards)
        #[arg(short, long, default_value = "filtered")]
        profile: ProfileName,
        /// Override the profile's search query
        #[arg(short, long)]
        query: Option<String>,
        /// Override the profile's result budget
        #[arg(short = 'n', long)]
        total: Option<usize>,
    },
    /// Serve HTTP triggers (and the scheduler, if configured)
    Serve {
        /// Port to listen on (default: from settings)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Most recently stored jobs (SQLite store)
    List {
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "30")]
        limit: usize,
        /// Filter by source (greenhouse, lever, ashby, workable, linkedin, other)
        #[arg(short, long)]
        source: Option<JobSource>,
    },
    /// Stored job counts (SQLite store)
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load()?;

    let result = match cli.command {
        Commands::Run { profile, query, total } => {
            let mut profile = ScrapeProfile::named(profile);
            if let Some(q) = query {
                profile.query = q;
            }
            if let Some(n) = total {
                profile.total_results = n;
            }

            let store = open_store(&settings)?;
            let search = search_client(&settings, &profile)?;
            let options = RunOptions::from_profile(&profile, settings.policy_mode);

            println!(
                "Scraping up to {} results ({} profile): {}",
                profile.total_results, profile.name, profile.query
            );
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {pos} fetched, {msg}")
                    .context("Bad progress template")?,
            );
            pb.enable_steady_tick(Duration::from_millis(120));

            let summary = pipeline::run(&search, store.as_ref(), &options, &pb).await;
            pb.finish_and_clear();
            print_summary(&summary?);
            Ok(())
        }
        Commands::Serve { port } => {
            let store = open_store(&settings)?;
            let state = AppState {
                store,
                filtered: Arc::new(trigger(&settings, ProfileName::Filtered)?),
                general: Arc::new(trigger(&settings, ProfileName::General)?),
                guard: RunGuard::default(),
            };
            let addr = format!("{}:{}", settings.host, port.unwrap_or(settings.port));
            server::serve(state, &addr, settings.schedule_interval()).await
        }
        Commands::List { limit, source } => {
            let db = local_db(&settings)?;
            let rows = db.fetch_recent(source.map(|s| s.as_str()), limit)?;
            if rows.is_empty() {
                println!("No jobs stored. Run 'run' first.");
                return Ok(());
            }

            println!(
                "{:>3} | {:<32} | {:<20} | {:<14} | {:<10} | {:<12} | {:<4}",
                "#", "Title", "Company", "Location", "Source", "Posted", "Flag"
            );
            println!("{}", "-".repeat(112));

            for (i, r) in rows.iter().enumerate() {
                println!(
                    "{:>3} | {:<32} | {:<20} | {:<14} | {:<10} | {:<12} | {:<4}",
                    i + 1,
                    truncate(&r.title, 32),
                    truncate(&r.company, 20),
                    truncate(&r.location, 14),
                    r.source,
                    truncate(&r.posted_at, 12),
                    if r.policy_flag { "yes" } else { "" },
                );
            }

            let newest = rows.first().map(|r| r.scraped_at.as_str()).unwrap_or("-");
            println!("\n{} jobs | newest scraped at {}", rows.len(), newest);
            Ok(())
        }
        Commands::Stats => {
            let db = local_db(&settings)?;
            let s = db.stats()?;
            println!("Total:     {}", s.total);
            println!("Flagged:   {}", s.flagged);
            if !s.by_source.is_empty() {
                println!("\n--- By source ---");
                for (source, count) in &s.by_source {
                    println!("  {:<12} {}", source, count);
                }
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn open_store(settings: &Settings) -> anyhow::Result<Arc<dyn JobStore>> {
    let store: Arc<dyn JobStore> = match settings.store {
        StoreBackend::Sqlite => Arc::new(
            SqliteStore::open(&settings.db_path)
                .with_context(|| format!("Failed to open {}", settings.db_path))?,
        ),
        StoreBackend::Sheets => Arc::new(
            SheetsStore::new(
                &settings.spreadsheet_id,
                &settings.sheet_name,
                &settings.google_access_token,
            )
            .context("Failed to set up Google Sheets store")?,
        ),
    };
    Ok(store)
}

fn local_db(settings: &Settings) -> anyhow::Result<SqliteStore> {
    if settings.store != StoreBackend::Sqlite {
        bail!("'list' and 'stats' read the SQLite store; set JOB_SCOUT_STORE=sqlite");
    }
    SqliteStore::open(&settings.db_path).with_context(|| format!("Failed to open {}", settings.db_path))
}

fn search_client(settings: &Settings, profile: &ScrapeProfile) -> anyhow::Result<SerpApiClient> {
    Ok(SerpApiClient::new(&settings.serpapi_key, profile.engine, profile.pagination)
        .context("Set JOB_SCOUT_SERPAPI_KEY")?
        .with_params(&profile.engine_params))
}

fn trigger(settings: &Settings, name: ProfileName) -> anyhow::Result<Trigger> {
    let profile = ScrapeProfile::named(name);
    Ok(Trigger {
        name,
        options: RunOptions::from_profile(&profile, settings.policy_mode),
        search: Arc::new(search_client(settings, &profile)?),
    })
}

fn print_summary(s: &RunSummary) {
    println!("Fetched:          {} ({} pages)", s.total_fetched, s.pages);
    println!("New jobs added:   {}", s.new_jobs_added);
    println!("Duplicates:       {}", s.duplicates);
    println!("Policy excluded:  {}", s.policy_excluded);
    if s.policy_flagged > 0 {
        println!("Policy flagged:   {}", s.policy_flagged);
    }
    println!("Filtered out:     {}", s.filtered_out);
    if s.malformed + s.missing_url > 0 {
        println!("Dropped:          {} malformed, {} without URL", s.malformed, s.missing_url);
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
