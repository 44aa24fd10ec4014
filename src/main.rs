mod client;
mod crawl;
mod db;
mod events;
mod export;
mod pacing;
mod parser;
mod record;
mod sampler;
mod settings;
mod site;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use client::HttpFetcher;
use crawl::CrawlOrchestrator;
use events::{CrawlEvent, Observer, TracingObserver};
use pacing::RngSource;
use record::BookRecord;
use sampler::UrlSampler;
use settings::Settings;
use site::Catalog;

#[derive(Parser)]
#[command(name = "elib_harvester", about = "Sample and harvest book records from the DTU e-library catalog")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample detail pages, harvest them, save to SQLite and JSON
    Crawl {
        /// Number of books to sample
        #[arg(short = 'n', long, default_value = "36")]
        count: usize,
        /// Seed for page choice and delays (default: random)
        #[arg(long)]
        seed: Option<u64>,
        /// JSON export path (default: settings json_path)
        #[arg(long)]
        json: Option<PathBuf>,
        /// SQLite path (default: settings db_path)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Print sampled detail URLs without visiting them
    Sample {
        #[arg(short = 'n', long, default_value = "10")]
        count: usize,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Harvest a single detail page and print it as JSON
    Book {
        /// Detail page URL or numeric book id
        target: String,
        /// Also append it to this JSON file's contents
        #[arg(long)]
        json: Option<PathBuf>,
        /// Also save it to this SQLite database
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Dump the SQLite table to a JSON file
    Export {
        #[arg(long)]
        db: Option<PathBuf>,
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Show what is stored so far
    Stats {
        #[arg(long)]
        db: Option<PathBuf>,
        /// Latest rows to list
        #[arg(short = 'n', long, default_value = "5")]
        limit: usize,
    },
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
    let settings = Settings::load().context("loading settings")?;

    let result = match cli.command {
        Commands::Crawl { count, seed, json, db } => {
            let catalog = Catalog::new(&settings.base_url).context("invalid base_url")?;
            let fetcher = HttpFetcher::new(&settings.user_agent, settings.timeout())?;
            let sampler = UrlSampler::new(&fetcher, &catalog, settings.sample_options());
            let crawler = CrawlOrchestrator::new(&fetcher, settings.book_delay());
            let mut rng = rng_source(seed);
            let mut progress = ProgressObserver::new();

            println!("Harvesting {} books from {}...", count, catalog.base());
            let books = crawl::harvest(&sampler, &crawler, count, &mut rng, &mut progress).await;
            progress.finish();
            let books = books?;

            let db_path = db.unwrap_or_else(|| settings.db_path.clone());
            let json_path = json.unwrap_or_else(|| settings.json_path.clone());
            persist(&books, &db_path, Some(json_path.as_path()))?;

            print_summary(&books);
            print_languages(&record::language_counts(&books));
            Ok(())
        }
        Commands::Sample { count, seed } => {
            let catalog = Catalog::new(&settings.base_url).context("invalid base_url")?;
            let fetcher = HttpFetcher::new(&settings.user_agent, settings.timeout())?;
            let sampler = UrlSampler::new(&fetcher, &catalog, settings.sample_options());
            let mut rng = rng_source(seed);

            let urls = sampler.sample(count, &mut rng, &mut TracingObserver).await;
            for url in &urls {
                println!("{}", url);
            }
            println!("\n{} of {} requested", urls.len(), count);
            Ok(())
        }
        Commands::Book { target, json, db } => {
            let catalog = Catalog::new(&settings.base_url).context("invalid base_url")?;
            let url = match target.parse::<u64>() {
                Ok(id) => catalog.detail_url(id),
                Err(_) => target,
            };
            let fetcher = HttpFetcher::new(&settings.user_agent, settings.timeout())?;
            let crawler = CrawlOrchestrator::new(&fetcher, settings.book_delay());
            let book = crawler
                .harvest_one(&url)
                .await
                .with_context(|| format!("harvesting {}", url))?;

            println!("{}", serde_json::to_string_pretty(&book)?);
            if let Some(path) = json {
                let mut books = if path.exists() { export::read_json(&path)? } else { Vec::new() };
                books.push(book.clone());
                export::write_json(&path, &books)?;
            }
            if let Some(path) = db {
                persist(std::slice::from_ref(&book), &path, None)?;
            }
            Ok(())
        }
        Commands::Export { db, json } => {
            let db_path = db.unwrap_or_else(|| settings.db_path.clone());
            let json_path = json.unwrap_or_else(|| settings.json_path.clone());
            let conn = db::connect(&db_path)?;
            db::init_schema(&conn)?;

            let books: Vec<BookRecord> = db::fetch_books(&conn)?
                .into_iter()
                .map(|row| row.book)
                .collect();
            export::write_json(&json_path, &books)?;
            println!("Exported {} books to {}", books.len(), json_path.display());
            Ok(())
        }
        Commands::Stats { db, limit } => {
            let path = db.unwrap_or_else(|| settings.db_path.clone());
            let conn = db::connect(&path)?;
            db::init_schema(&conn)?;

            println!("Database:  {}", path.display());
            println!("Books:     {}", db::count_books(&conn)?);
            print_languages(&db::language_breakdown(&conn)?);

            let latest = db::latest_books(&conn, limit)?;
            if !latest.is_empty() {
                println!("\n--- Latest ---");
                for row in &latest {
                    let at = row
                        .scraped_at
                        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_else(|| "-".into());
                    println!(
                        "{:>5} | {} | {:<40} | {}",
                        row.id,
                        at,
                        truncate(row.book.display_title(), 40),
                        row.book.author.as_deref().unwrap_or("-"),
                    );
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

fn rng_source(seed: Option<u64>) -> RngSource {
    match seed {
        Some(s) => RngSource::seeded(s),
        None => RngSource::from_entropy(),
    }
}

fn persist(books: &[BookRecord], db_path: &std::path::Path, json_path: Option<&std::path::Path>) -> anyhow::Result<()> {
    let conn = db::connect(db_path)?;
    db::init_schema(&conn)?;
    let saved = db::save_books(&conn, books)?;
    println!("Saved {} books to {}", saved, db_path.display());

    if let Some(path) = json_path {
        export::write_json(path, books)?;
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn print_summary(books: &[BookRecord]) {
    println!("\nHarvested {} books", books.len());
    for (i, b) in books.iter().take(3).enumerate() {
        println!(
            "{:>3}. {} | {} | {}",
            i + 1,
            truncate(b.display_title(), 50),
            b.author.as_deref().unwrap_or("-"),
            b.publication_year.map(|y| y.to_string()).unwrap_or_else(|| "-".into()),
        );
    }
}

fn print_languages(langs: &[(String, usize)]) {
    if langs.is_empty() {
        return;
    }
    println!("\n--- Languages ---");
    for (lang, n) in langs {
        println!("  {:<20} {}", truncate(lang, 20), n);
    }
}

/// Progress bar over the book loop; every event is still logged.
struct ProgressObserver {
    bar: ProgressBar,
    inner: TracingObserver,
}

impl ProgressObserver {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        Self {
            bar,
            inner: TracingObserver,
        }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Observer for ProgressObserver {
    fn notify(&mut self, event: CrawlEvent) {
        match &event {
            CrawlEvent::SampleStarted { target, .. } => {
                self.bar.set_length(*target as u64);
                self.bar.set_message("sampling");
            }
            CrawlEvent::ListingFetched { collected, .. } => {
                self.bar.set_position(*collected as u64);
            }
            CrawlEvent::BookStarted { index, total, .. } => {
                self.bar.set_length(*total as u64);
                self.bar.set_position(*index as u64);
                self.bar.set_message("harvesting");
            }
            _ => {}
        }
        let inner = &mut self.inner;
        self.bar.suspend(|| inner.notify(event));
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
