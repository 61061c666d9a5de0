use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use rusqlite::Connection;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::db::{self, PendingPage};
use crate::parser;
use crate::records::PageKind;

const CONCURRENCY: usize = 8;
const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF_MS: u64 = 2000;
const REQUEST_TIMEOUT_SECS: u64 = 30;
const USER_AGENT: &str = concat!("set_scraper/", env!("CARGO_PKG_VERSION"));

/// Fetch stats returned after a round completes.
pub struct ScrapeStats {
    pub total: usize,
    pub ok: usize,
    pub errors: usize,
    pub discovered: usize,
}

struct FetchRow {
    page_id: i64,
    url: String,
    kind: PageKind,
    symbol: Option<String>,
    html: Option<String>,
    status: Option<i64>,
    error: Option<String>,
    latency_ms: i64,
}

/// Fetch pages concurrently, saving each result to the DB as it arrives.
/// Directory pages are parsed on arrival so the profile and holders links
/// they list join the queue within the same round.
pub async fn scrape_pages_streaming(
    conn: &Connection,
    pages: Vec<PendingPage>,
) -> Result<ScrapeStats> {
    let client = Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()?;
    let semaphore = Arc::new(Semaphore::new(CONCURRENCY));
    let total = pages.len();

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    // Channel: workers send results, the main loop owns the DB writes
    let (tx, mut rx) = tokio::sync::mpsc::channel::<FetchRow>(CONCURRENCY * 2);

    for page in pages {
        let client = client.clone();
        let sem = Arc::clone(&semaphore);
        let tx = tx.clone();

        tokio::spawn(async move {
            let _permit = sem.acquire().await.unwrap();
            let row = fetch_with_retry(&client, page).await;
            let _ = tx.send(row).await;
        });
    }

    // Drop our copy of tx so rx closes when all spawned tasks finish
    drop(tx);

    let mut ok = 0usize;
    let mut errors = 0usize;
    let mut discovered = 0usize;

    // Prepare statements once, reuse for each row
    let mut insert_stmt = conn.prepare(
        "INSERT INTO page_data (page_id, url, kind, symbol, html, status, error, latency_ms)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )?;
    let mut update_stmt =
        conn.prepare("UPDATE pages SET visited = 1, visited_at = datetime('now') WHERE id = ?1")?;

    while let Some(row) = rx.recv().await {
        if row.error.is_some() {
            errors += 1;
        } else {
            ok += 1;
        }

        insert_stmt.execute(rusqlite::params![
            row.page_id,
            row.url,
            row.kind.as_str(),
            row.symbol,
            row.html,
            row.status,
            row.error,
            row.latency_ms,
        ])?;
        update_stmt.execute(rusqlite::params![row.page_id])?;

        if row.kind == PageKind::Directory {
            if let Some(html) = &row.html {
                match parser::parse_directory(html, &row.url) {
                    Ok(found) => discovered += db::insert_pages(conn, &found)?,
                    Err(err) => warn!(url = %row.url, %err, "directory page not parseable"),
                }
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    info!(
        "Fetched {} pages ({} ok, {} errors, {} links discovered)",
        total, ok, errors, discovered
    );

    Ok(ScrapeStats {
        total,
        ok,
        errors,
        discovered,
    })
}

async fn fetch_with_retry(client: &Client, page: PendingPage) -> FetchRow {
    let started = Instant::now();
    let mut outcome = (None, None, None);

    for attempt in 0..=MAX_RETRIES {
        outcome = fetch_once(client, &page.url).await;

        let should_retry = match &outcome {
            (Some(status), _, _) if *status == 429 || *status >= 500 => true,
            (None, _, Some(_)) => true,
            _ => false,
        };
        if !should_retry || attempt == MAX_RETRIES {
            break;
        }

        let backoff = Duration::from_millis(BASE_BACKOFF_MS * 2u64.pow(attempt));
        warn!(
            url = %page.url,
            attempt = attempt + 1,
            "retrying after {:.1}s",
            backoff.as_secs_f64()
        );
        tokio::time::sleep(backoff).await;
    }

    let (status, html, error) = outcome;
    FetchRow {
        page_id: page.id,
        url: page.url,
        kind: page.kind,
        symbol: page.symbol,
        html,
        status,
        error,
        latency_ms: started.elapsed().as_millis() as i64,
    }
}

async fn fetch_once(client: &Client, url: &str) -> (Option<i64>, Option<String>, Option<String>) {
    match client.get(url).send().await {
        Ok(response) => {
            let status = response.status();
            match response.text().await {
                Ok(body) if status.is_success() => (Some(status.as_u16() as i64), Some(body), None),
                Ok(_) => (
                    Some(status.as_u16() as i64),
                    None,
                    Some(format!("HTTP {}", status)),
                ),
                Err(err) => (Some(status.as_u16() as i64), None, Some(err.to_string())),
            }
        }
        Err(err) => (None, None, Some(err.to_string())),
    }
}
