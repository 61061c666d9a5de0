use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::warn;

use super::identity::extract_identity;
use super::numeric::{parse_grouped_u64, parse_percent, EN_US};
use super::text::text_fragments;
use super::ExtractError;
use crate::records::{HolderRecord, PageIdentity};

static HOLDER_ROW_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tbody tr").expect("holder row selector"));

#[derive(Debug)]
pub struct HoldersPage {
    pub identity: PageIdentity,
    pub holders: Vec<HolderRecord>,
}

/// Extract the ranked major-holder rows from a holders page.
///
/// A row must yield exactly four text tokens (`rank.`, name, share count,
/// share percent); any other shape is logged with the raw tokens and
/// skipped. A malformed share count or percent drops only that row. A
/// malformed rank fails the whole page: it means the table structure
/// changed, not just one noisy cell.
pub fn parse_holders(html: &str, url: &str) -> Result<HoldersPage, ExtractError> {
    let doc = Html::parse_document(html);
    let identity = extract_identity(&doc, url);

    let mut holders = Vec::new();
    for row in doc.select(&HOLDER_ROW_SEL) {
        let tokens = text_fragments(row);
        let (rank_text, name, share_text, percent_text) = match tokens.as_slice() {
            [rank, name, shares, percent] => (rank, name, shares, percent),
            other => {
                warn!(url, tokens = ?other, "suspicious holder row shape");
                continue;
            }
        };

        let rank = parse_rank(rank_text)?;

        let share_count = match parse_grouped_u64(share_text, EN_US) {
            Ok(count) => count,
            Err(err) => {
                warn!(url, holder = %name, %err, "dropping holder row");
                continue;
            }
        };
        let share_percent = match parse_percent(percent_text, EN_US) {
            Ok(percent) => percent,
            Err(err) => {
                warn!(url, holder = %name, %err, "dropping holder row");
                continue;
            }
        };

        holders.push(HolderRecord {
            symbol: identity.symbol.clone(),
            company: identity.company.clone(),
            rank,
            name: name.clone(),
            share_count,
            share_percent,
        });
    }

    Ok(HoldersPage { identity, holders })
}

fn parse_rank(raw: &str) -> Result<u32, ExtractError> {
    let digits = raw.strip_suffix('.').unwrap_or(raw);
    digits
        .parse()
        .map_err(|_| ExtractError::BadRank(raw.to_string()))
}
