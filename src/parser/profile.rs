use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use super::identity::extract_identity;
use super::text::direct_text;
use crate::records::SymbolProfile;

static ROW_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table tr td div.row").expect("profile row selector"));
static STRONG_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div div strong").expect("emphasized key selector"));
static PLAIN_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div div").expect("plain cell selector"));

/// Label classification for one profile row. The table renders its label in
/// two shapes: an emphasized `<strong>` node, or the first of two plain
/// cells. Anything else leaves the row unkeyed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowKey {
    Key(String),
    NoKey,
}

fn classify_key(strong: &[String], plain: &[String]) -> RowKey {
    if let [key] = strong {
        return RowKey::Key(key.clone());
    }
    match plain {
        [] | [_] => RowKey::NoKey,
        [key, _] => RowKey::Key(key.clone()),
        [_, _, ..] => RowKey::NoKey,
    }
}

fn classify_value(plain: &[String]) -> Option<String> {
    match plain {
        [] => None,
        [value] => Some(value.clone()),
        [_, value] => Some(value.clone()),
        [_, _, ..] => None,
    }
}

fn cell_texts(row: ElementRef, selector: &Selector) -> Vec<String> {
    row.select(selector).flat_map(direct_text).collect()
}

/// Extract one `SymbolProfile` from a company profile page. Never fails:
/// unrecognized or malformed rows are skipped and the record is returned
/// however partial. Only the first observed value per field is kept.
pub fn parse_profile(html: &str, url: &str) -> SymbolProfile {
    let doc = Html::parse_document(html);
    let mut profile = SymbolProfile::new(extract_identity(&doc, url));

    for row in doc.select(&ROW_SEL) {
        let plain = cell_texts(row, &PLAIN_SEL);
        let RowKey::Key(key) = classify_key(&cell_texts(row, &STRONG_SEL), &plain) else {
            continue;
        };
        let value = classify_value(&plain);
        match key.as_str() {
            "Market" => set_once(&mut profile.market, value.map(|v| v.to_uppercase())),
            "Industry" => set_once(&mut profile.industry, value),
            "Sector" => set_once(&mut profile.sector, value),
            "First Trade Date" => set_once(&mut profile.first_trade_date, value),
            "Address" => set_once(&mut profile.address, value),
            "Authorized Capital" => set_once(&mut profile.authorized_capital, value),
            "Paid-up Capital" => set_once(&mut profile.paid_up_capital, value),
            _ => {}
        }
    }

    profile
}

fn set_once(slot: &mut Option<String>, value: Option<String>) {
    if slot.is_none() {
        *slot = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "http://test.local/companyprofile.do?symbol=MINT";

    fn strong_row(key: &str, value: &str) -> String {
        format!(
            r#"<div class="row"><div class="col-a"><strong>{key}</strong></div><div class="col-b">{value}</div></div>"#
        )
    }

    fn plain_row(key: &str, value: &str) -> String {
        format!(r#"<div class="row"><div class="col-a">{key}</div><div class="col-b">{value}</div></div>"#)
    }

    fn page(rows: &str) -> String {
        format!(
            "<html><body><div><h3>MINT : MINOR INTERNATIONAL PUBLIC COMPANY LIMITED</h3></div>\
             <table><tr><td>{rows}</td></tr></table></body></html>"
        )
    }

    #[test]
    fn key_classification_is_exhaustive_over_node_counts() {
        let s = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        // One emphasized node wins outright
        assert_eq!(
            classify_key(&s(&["Market"]), &s(&["junk", "junk"])),
            RowKey::Key("Market".into())
        );
        // Zero emphasized, exactly two plain: first is the key
        assert_eq!(
            classify_key(&[], &s(&["Industry", "Agro"])),
            RowKey::Key("Industry".into())
        );
        // Everything else is unkeyed
        assert_eq!(classify_key(&[], &[]), RowKey::NoKey);
        assert_eq!(classify_key(&[], &s(&["lonely"])), RowKey::NoKey);
        assert_eq!(classify_key(&[], &s(&["a", "b", "c"])), RowKey::NoKey);
        assert_eq!(classify_key(&s(&["two", "strongs"]), &s(&["a"])), RowKey::NoKey);
    }

    #[test]
    fn value_classification() {
        let s = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(classify_value(&[]), None);
        assert_eq!(classify_value(&s(&["SET"])), Some("SET".into()));
        assert_eq!(classify_value(&s(&["Market", "SET"])), Some("SET".into()));
        assert_eq!(classify_value(&s(&["a", "b", "c"])), None);
    }

    #[test]
    fn recognized_labels_fill_their_fields() {
        let rows = [
            strong_row("Market", "set"),
            plain_row("Industry", "Agro &amp; Food Industry"),
            plain_row("Sector", "Food &amp; Beverage"),
            plain_row("First Trade Date", "14 Oct 1988"),
        ]
        .concat();
        let profile = parse_profile(&page(&rows), URL);

        assert_eq!(profile.symbol.as_deref(), Some("MINT"));
        assert_eq!(profile.market.as_deref(), Some("SET"), "market is uppercased");
        assert_eq!(profile.industry.as_deref(), Some("Agro & Food Industry"));
        assert_eq!(profile.sector.as_deref(), Some("Food & Beverage"));
        assert_eq!(profile.first_trade_date.as_deref(), Some("14 Oct 1988"));
        assert_eq!(profile.address, None);
    }

    #[test]
    fn first_occurrence_wins() {
        let rows = [
            strong_row("Paid-up Capital", "4,618,914,291.00 Baht"),
            strong_row("Paid-up Capital", "overwritten value"),
        ]
        .concat();
        let profile = parse_profile(&page(&rows), URL);
        assert_eq!(
            profile.paid_up_capital.as_deref(),
            Some("4,618,914,291.00 Baht")
        );
    }

    #[test]
    fn unkeyed_and_unknown_rows_are_skipped() {
        let rows = [
            r#"<div class="row"><div><span>no text nodes here</span></div></div>"#.to_string(),
            plain_row("Registered No.", "0107536000919"),
            strong_row("Sector", "Food &amp; Beverage"),
        ]
        .concat();
        let profile = parse_profile(&page(&rows), URL);
        assert_eq!(profile.sector.as_deref(), Some("Food & Beverage"));
        assert_eq!(profile.industry, None);
    }

    #[test]
    fn always_exactly_one_record_even_for_an_empty_page() {
        let profile = parse_profile("<html><body></body></html>", URL);
        assert_eq!(profile.symbol, None);
        assert_eq!(profile.market, None);
    }

    #[test]
    fn mint_fixture_matches_the_live_page_shape() {
        let html = std::fs::read_to_string("tests/fixtures/mint-info.html").unwrap();
        let profile = parse_profile(&html, URL);

        assert_eq!(profile.symbol.as_deref(), Some("MINT"));
        assert_eq!(
            profile.company.as_deref(),
            Some("MINOR INTERNATIONAL PUBLIC COMPANY LIMITED")
        );
        assert_eq!(profile.market.as_deref(), Some("SET"));
        assert_eq!(profile.industry.as_deref(), Some("Agro & Food Industry"));
        assert_eq!(profile.sector.as_deref(), Some("Food & Beverage"));
        assert_eq!(profile.first_trade_date.as_deref(), Some("14 Oct 1988"));
        assert_eq!(
            profile.address.as_deref(),
            Some("BERLI JUCKER HOUSE,FL16, 99 SUKHUMVIT 42 RD, KHLONG TOEI Bangkok")
        );
        assert_eq!(
            profile.authorized_capital.as_deref(),
            Some("4,849,860,006.00 Baht")
        );
        assert_eq!(
            profile.paid_up_capital.as_deref(),
            Some("4,618,914,291.00 Baht")
        );
    }
}
