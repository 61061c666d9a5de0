mod archive;
mod db;
mod fetch;
mod parser;
mod records;
mod seeds;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use tracing::error;

use records::{DiscoveredPage, PageKind, Record, UNKNOWN};

#[derive(Parser)]
#[command(name = "set_scraper", about = "SET company profile and major-holder scraper")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed the URL queue with symbol directory pages
    Init {
        /// Prefix buckets to enumerate: 'test' (NUMBER only) or 'full' (NUMBER + A-Z)
        #[arg(short, long, default_value = "test")]
        mode: seeds::Mode,
    },
    /// Fetch unvisited pages, following directory links as they are found
    Scrape {
        /// Max pages to fetch (default: until the queue drains)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Extract records from fetched profile and holders pages
    Process {
        /// Max pages to process (default: all unprocessed)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Archive raw pages as <symbol>-<kind>.html under this directory
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Scrape + process in one pipeline
    Run {
        /// Max pages to fetch before processing
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Dump extracted records as JSON lines
    Export {
        /// Output file
        #[arg(short, long, default_value = "data/records.jsonl")]
        out: PathBuf,
    },
    /// Show crawl statistics
    Stats,
    /// Extracted profiles overview table
    Overview {
        /// Filter by market code (e.g. SET, MAI)
        #[arg(short, long)]
        market: Option<String>,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { mode } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let directories: Vec<DiscoveredPage> = seeds::directory_urls(mode)
                .into_iter()
                .map(|(url, prefix)| DiscoveredPage {
                    url,
                    kind: PageKind::Directory,
                    symbol: Some(prefix),
                })
                .collect();
            let inserted = db::insert_pages(&conn, &directories)?;
            println!(
                "Queued {} new directory pages ({} enumerated, {} mode)",
                inserted,
                directories.len(),
                mode
            );
            Ok(())
        }
        Commands::Scrape { limit } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            scrape_rounds(&conn, limit).await?;
            Ok(())
        }
        Commands::Process { limit, data_dir } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let pages = db::fetch_unprocessed(&conn, limit)?;
            if pages.is_empty() {
                println!("No unprocessed pages. Run 'scrape' first.");
                return Ok(());
            }
            println!("Processing {} pages...", pages.len());
            let counts = process_pages(&conn, &pages, data_dir.as_deref())?;
            counts.print();
            Ok(())
        }
        Commands::Run { limit, data_dir } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;

            // Phase 1: fetch until the queue drains
            let t_scrape = Instant::now();
            let fetched = scrape_rounds(&conn, limit).await?;
            if fetched > 0 {
                println!(
                    "Fetched {} pages in {:.1}s",
                    fetched,
                    t_scrape.elapsed().as_secs_f64()
                );
            }

            // Phase 2: extract records
            let unprocessed = db::fetch_unprocessed(&conn, None)?;
            if unprocessed.is_empty() {
                println!("Nothing to process (no fetched detail pages).");
                return Ok(());
            }
            println!("Processing {} pages...", unprocessed.len());
            let counts = process_pages(&conn, &unprocessed, data_dir.as_deref())?;
            counts.print();
            Ok(())
        }
        Commands::Export { out } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let profiles = db::fetch_profiles(&conn)?;
            let holders = db::fetch_holders(&conn)?;
            if profiles.is_empty() && holders.is_empty() {
                println!("Nothing to export. Run 'process' first.");
                return Ok(());
            }

            let file = std::fs::File::create(&out)
                .with_context(|| format!("cannot create {}", out.display()))?;
            let mut writer = std::io::BufWriter::new(file);
            let mut written = 0usize;
            for profile in profiles {
                serde_json::to_writer(&mut writer, &Record::Info(profile))?;
                writer.write_all(b"\n")?;
                written += 1;
            }
            for holder in holders {
                serde_json::to_writer(&mut writer, &Record::Holder(holder))?;
                writer.write_all(b"\n")?;
                written += 1;
            }
            writer.flush()?;
            println!("Wrote {} records to {}", written, out.display());
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Queued:      {}", s.queued);
            println!("Visited:     {}", s.visited);
            println!("Unvisited:   {}", s.unvisited);
            println!("Fetched:     {}", s.fetched);
            println!("Errors:      {}", s.errors);
            println!("Unprocessed: {}", s.unprocessed);
            println!("Profiles:    {}", s.profiles);
            println!("Holders:     {}", s.holders);
            Ok(())
        }
        Commands::Overview { market, limit } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let rows = db::fetch_overview(&conn, market.as_deref(), limit)?;
            if rows.is_empty() {
                println!("No profiles found.");
                return Ok(());
            }

            println!(
                "{:>3} | {:<8} | {:<34} | {:<4} | {:<22} | {:<12} | {:>7}",
                "#", "Symbol", "Company", "Mkt", "Sector", "First Trade", "Holders"
            );
            println!("{}", "-".repeat(108));

            for (i, r) in rows.iter().enumerate() {
                println!(
                    "{:>3} | {:<8} | {:<34} | {:<4} | {:<22} | {:<12} | {:>7}",
                    i + 1,
                    r.symbol,
                    truncate(&r.company, 34),
                    r.market,
                    truncate(&r.sector, 22),
                    r.first_trade_date,
                    r.holder_count
                );
            }

            println!("\n{} profiles", rows.len());
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

/// Fetch in rounds: the first round visits the seeded directory pages, whose
/// discovered links feed the next round, until nothing unvisited remains.
async fn scrape_rounds(conn: &Connection, limit: Option<usize>) -> Result<usize> {
    let mut remaining = limit;
    let mut fetched = 0usize;
    let mut round = 0usize;

    loop {
        let pages = db::fetch_unvisited(conn, remaining)?;
        if pages.is_empty() {
            break;
        }
        round += 1;
        println!("Round {}: fetching {} pages (streaming to DB)...", round, pages.len());
        let stats = fetch::scrape_pages_streaming(conn, pages).await?;
        fetched += stats.total;

        if let Some(n) = remaining {
            if stats.total >= n {
                break;
            }
            remaining = Some(n - stats.total);
        }
    }

    if fetched == 0 {
        println!("No unvisited pages. Run 'init' first or everything is fetched.");
    }
    Ok(fetched)
}

struct ProcessCounts {
    profiles: usize,
    holders: usize,
    failed_pages: usize,
}

impl ProcessCounts {
    fn print(&self) {
        println!(
            "Saved {} profiles and {} holder rows ({} pages failed).",
            self.profiles, self.holders, self.failed_pages,
        );
    }
}

struct PageOutput {
    profile: Option<records::SymbolProfile>,
    holders: Vec<records::HolderRecord>,
    symbol_label: String,
    failed: bool,
}

fn process_pages(
    conn: &Connection,
    pages: &[db::FetchedPage],
    data_dir: Option<&Path>,
) -> Result<ProcessCounts> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    let pb = ProgressBar::new(pages.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
            .unwrap()
            .progress_chars("#>-"),
    );

    let mut counts = ProcessCounts {
        profiles: 0,
        holders: 0,
        failed_pages: 0,
    };

    for chunk in pages.chunks(200) {
        let results: Vec<PageOutput> = chunk.par_iter().map(extract_page).collect();

        let mut profile_rows = Vec::new();
        let mut holder_rows = Vec::new();
        let mut done_ids = Vec::new();

        for (page, output) in chunk.iter().zip(results) {
            if let Some(dir) = data_dir {
                archive::save_original(dir, &output.symbol_label, page.kind, &page.html);
            }
            if output.failed {
                counts.failed_pages += 1;
            }
            if let Some(profile) = output.profile {
                counts.profiles += 1;
                profile_rows.push(db::ProfileRow {
                    page_data_id: page.page_data_id,
                    record: profile,
                });
            }
            counts.holders += output.holders.len();
            holder_rows.extend(output.holders.into_iter().map(|record| db::HolderRow {
                page_data_id: page.page_data_id,
                record,
            }));
            done_ids.push(page.page_data_id);
        }

        db::save_extracted(conn, &profile_rows, &holder_rows)?;
        db::mark_processed(conn, &done_ids)?;
        pb.inc(chunk.len() as u64);
    }

    pb.finish_and_clear();
    Ok(counts)
}

fn extract_page(page: &db::FetchedPage) -> PageOutput {
    match page.kind {
        PageKind::Info => {
            let profile = parser::parse_profile(&page.html, &page.url);
            let symbol_label = profile
                .symbol
                .clone()
                .unwrap_or_else(|| UNKNOWN.to_string());
            PageOutput {
                profile: Some(profile),
                holders: Vec::new(),
                symbol_label,
                failed: false,
            }
        }
        PageKind::Holders => match parser::parse_holders(&page.html, &page.url) {
            Ok(extracted) => PageOutput {
                symbol_label: extracted.identity.symbol_label().to_string(),
                profile: None,
                holders: extracted.holders,
                failed: false,
            },
            Err(err) => {
                error!(url = %page.url, %err, "holder extraction failed");
                PageOutput {
                    profile: None,
                    holders: Vec::new(),
                    symbol_label: UNKNOWN.to_string(),
                    failed: true,
                }
            }
        },
        // Directory pages are consumed during the fetch phase
        PageKind::Directory => PageOutput {
            profile: None,
            holders: Vec::new(),
            symbol_label: UNKNOWN.to_string(),
            failed: false,
        },
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
