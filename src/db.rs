use anyhow::{anyhow, Result};
use rusqlite::Connection;

use crate::records::{DiscoveredPage, HolderRecord, PageKind, SymbolProfile};

const DB_PATH: &str = "data/set.sqlite";

pub fn connect() -> Result<Connection> {
    std::fs::create_dir_all("data")?;
    let conn = Connection::open(DB_PATH)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS pages (
            id         INTEGER PRIMARY KEY,
            url        TEXT UNIQUE NOT NULL,
            symbol     TEXT,
            kind       TEXT NOT NULL CHECK(kind IN ('directory','info','holders')),
            visited    BOOLEAN NOT NULL DEFAULT 0,
            visited_at TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_pages_visited ON pages(visited);

        CREATE TABLE IF NOT EXISTS page_data (
            id         INTEGER PRIMARY KEY,
            page_id    INTEGER NOT NULL REFERENCES pages(id),
            url        TEXT NOT NULL,
            kind       TEXT NOT NULL,
            symbol     TEXT,
            html       TEXT,
            status     INTEGER,
            error      TEXT,
            latency_ms INTEGER,
            processed  BOOLEAN NOT NULL DEFAULT 0,
            scraped_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_page_data_processed ON page_data(processed);

        -- Extracted records
        CREATE TABLE IF NOT EXISTS profiles (
            id                 INTEGER PRIMARY KEY,
            page_data_id       INTEGER NOT NULL UNIQUE REFERENCES page_data(id),
            symbol             TEXT,
            company            TEXT,
            market             TEXT,
            industry           TEXT,
            sector             TEXT,
            first_trade_date   TEXT,
            address            TEXT,
            authorized_capital TEXT,
            paid_up_capital    TEXT,
            created_at         TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_profiles_symbol ON profiles(symbol);

        CREATE TABLE IF NOT EXISTS holders (
            id            INTEGER PRIMARY KEY,
            page_data_id  INTEGER NOT NULL REFERENCES page_data(id),
            symbol        TEXT,
            company       TEXT,
            rank          INTEGER NOT NULL,
            name          TEXT NOT NULL,
            share_count   INTEGER NOT NULL,
            share_percent REAL NOT NULL,
            UNIQUE(page_data_id, rank)
        );
        CREATE INDEX IF NOT EXISTS idx_holders_symbol ON holders(symbol);
        ",
    )?;
    Ok(())
}

// ── Queue ──

pub struct PendingPage {
    pub id: i64,
    pub url: String,
    pub kind: PageKind,
    pub symbol: Option<String>,
}

pub fn insert_pages(conn: &Connection, pages: &[DiscoveredPage]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt =
            tx.prepare("INSERT OR IGNORE INTO pages (url, symbol, kind) VALUES (?1, ?2, ?3)")?;
        for page in pages {
            count += stmt.execute(rusqlite::params![page.url, page.symbol, page.kind.as_str()])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

pub fn fetch_unvisited(conn: &Connection, limit: Option<usize>) -> Result<Vec<PendingPage>> {
    let sql = match limit {
        Some(n) => format!(
            "SELECT id, url, kind, symbol FROM pages WHERE visited = 0 ORDER BY id LIMIT {}",
            n
        ),
        None => "SELECT id, url, kind, symbol FROM pages WHERE visited = 0 ORDER BY id".to_string(),
    };
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(id, url, kind, symbol)| {
            let kind = PageKind::parse(&kind)
                .ok_or_else(|| anyhow!("unknown page kind '{}' in queue", kind))?;
            Ok(PendingPage {
                id,
                url,
                kind,
                symbol,
            })
        })
        .collect()
}

// ── Fetched pages ──

pub struct FetchedPage {
    pub page_data_id: i64,
    pub url: String,
    pub kind: PageKind,
    pub html: String,
}

pub fn fetch_unprocessed(conn: &Connection, limit: Option<usize>) -> Result<Vec<FetchedPage>> {
    let sql = format!(
        "SELECT id, url, kind, html FROM page_data
         WHERE html IS NOT NULL AND processed = 0 AND kind IN ('info', 'holders')
         ORDER BY id{}",
        match limit {
            Some(n) => format!(" LIMIT {}", n),
            None => String::new(),
        }
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(page_data_id, url, kind, html)| {
            let kind = PageKind::parse(&kind)
                .ok_or_else(|| anyhow!("unknown page kind '{}' in page_data", kind))?;
            Ok(FetchedPage {
                page_data_id,
                url,
                kind,
                html,
            })
        })
        .collect()
}

pub fn mark_processed(conn: &Connection, ids: &[i64]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare("UPDATE page_data SET processed = 1 WHERE id = ?1")?;
        for id in ids {
            stmt.execute(rusqlite::params![id])?;
        }
    }
    tx.commit()?;
    Ok(())
}

// ── Extracted records ──

pub struct ProfileRow {
    pub page_data_id: i64,
    pub record: SymbolProfile,
}

pub struct HolderRow {
    pub page_data_id: i64,
    pub record: HolderRecord,
}

pub fn save_extracted(
    conn: &Connection,
    profiles: &[ProfileRow],
    holders: &[HolderRow],
) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut p_stmt = tx.prepare(
            "INSERT OR REPLACE INTO profiles
             (page_data_id, symbol, company, market, industry, sector,
              first_trade_date, address, authorized_capital, paid_up_capital)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )?;
        for p in profiles {
            let r = &p.record;
            p_stmt.execute(rusqlite::params![
                p.page_data_id,
                r.symbol,
                r.company,
                r.market,
                r.industry,
                r.sector,
                r.first_trade_date,
                r.address,
                r.authorized_capital,
                r.paid_up_capital,
            ])?;
        }

        let mut h_stmt = tx.prepare(
            "INSERT OR REPLACE INTO holders
             (page_data_id, symbol, company, rank, name, share_count, share_percent)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for h in holders {
            let r = &h.record;
            h_stmt.execute(rusqlite::params![
                h.page_data_id,
                r.symbol,
                r.company,
                r.rank,
                r.name,
                r.share_count as i64,
                r.share_percent,
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}

pub fn fetch_profiles(conn: &Connection) -> Result<Vec<SymbolProfile>> {
    let mut stmt = conn.prepare(
        "SELECT symbol, company, market, industry, sector, first_trade_date,
                address, authorized_capital, paid_up_capital
         FROM profiles ORDER BY symbol",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(SymbolProfile {
                symbol: row.get(0)?,
                company: row.get(1)?,
                market: row.get(2)?,
                industry: row.get(3)?,
                sector: row.get(4)?,
                first_trade_date: row.get(5)?,
                address: row.get(6)?,
                authorized_capital: row.get(7)?,
                paid_up_capital: row.get(8)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn fetch_holders(conn: &Connection) -> Result<Vec<HolderRecord>> {
    let mut stmt = conn.prepare(
        "SELECT symbol, company, rank, name, share_count, share_percent
         FROM holders ORDER BY symbol, rank",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(HolderRecord {
                symbol: row.get(0)?,
                company: row.get(1)?,
                rank: row.get::<_, i64>(2)? as u32,
                name: row.get(3)?,
                share_count: row.get::<_, i64>(4)? as u64,
                share_percent: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Overview ──

pub struct OverviewRow {
    pub symbol: String,
    pub company: String,
    pub market: String,
    pub sector: String,
    pub first_trade_date: String,
    pub holder_count: i64,
}

pub fn fetch_overview(
    conn: &Connection,
    market: Option<&str>,
    limit: usize,
) -> Result<Vec<OverviewRow>> {
    let mut conditions = Vec::new();
    let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(m) = market {
        conditions.push(format!("p.market = ?{}", params.len() + 1));
        params.push(Box::new(m.to_string()));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    let sql = format!(
        "SELECT COALESCE(p.symbol, 'Unknown'), COALESCE(p.company, ''),
                COALESCE(p.market, ''), COALESCE(p.sector, ''),
                COALESCE(p.first_trade_date, ''),
                (SELECT COUNT(*) FROM holders h WHERE h.symbol = p.symbol)
         FROM profiles p{}
         ORDER BY p.symbol
         LIMIT {}",
        where_clause, limit
    );

    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn rusqlite::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let rows = stmt
        .query_map(param_refs.as_slice(), |row| {
            Ok(OverviewRow {
                symbol: row.get(0)?,
                company: row.get(1)?,
                market: row.get(2)?,
                sector: row.get(3)?,
                first_trade_date: row.get(4)?,
                holder_count: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Stats ──

pub struct Stats {
    pub queued: usize,
    pub visited: usize,
    pub unvisited: usize,
    pub fetched: usize,
    pub errors: usize,
    pub unprocessed: usize,
    pub profiles: usize,
    pub holders: usize,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let queued: usize = conn.query_row("SELECT COUNT(*) FROM pages", [], |r| r.get(0))?;
    let visited: usize =
        conn.query_row("SELECT COUNT(*) FROM pages WHERE visited = 1", [], |r| r.get(0))?;
    let fetched: usize = conn.query_row("SELECT COUNT(*) FROM page_data", [], |r| r.get(0))?;
    let errors: usize = conn.query_row(
        "SELECT COUNT(*) FROM page_data WHERE error IS NOT NULL",
        [],
        |r| r.get(0),
    )?;
    let unprocessed: usize = conn.query_row(
        "SELECT COUNT(*) FROM page_data
         WHERE html IS NOT NULL AND processed = 0 AND kind IN ('info', 'holders')",
        [],
        |r| r.get(0),
    )?;
    let profiles: usize = conn.query_row("SELECT COUNT(*) FROM profiles", [], |r| r.get(0))?;
    let holders: usize = conn.query_row("SELECT COUNT(*) FROM holders", [], |r| r.get(0))?;
    Ok(Stats {
        queued,
        visited,
        unvisited: queued - visited,
        fetched,
        errors,
        unprocessed,
        profiles,
        holders,
    })
}
