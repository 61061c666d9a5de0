use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::warn;

use crate::records::PageIdentity;

static HEADING_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div h3").expect("heading selector"));

/// Both detail page types carry a `"<SYMBOL> : <COMPANY NAME>"` heading.
/// A missing heading, or one without a colon, leaves both sides unset and
/// surfaces a warning; extraction of the rest of the page continues.
pub fn extract_identity(doc: &Html, url: &str) -> PageIdentity {
    let Some(heading) = doc.select(&HEADING_SEL).next() else {
        warn!(url, "cannot extract symbol and company: no heading");
        return PageIdentity::default();
    };
    let text: String = heading.text().collect();
    match text.split_once(':') {
        Some((symbol, company)) => PageIdentity {
            symbol: Some(symbol.trim().to_string()),
            company: Some(company.trim().to_string()),
        },
        None => {
            warn!(url, heading = text.trim(), "symbol heading has no separator");
            PageIdentity::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_of(html: &str) -> PageIdentity {
        extract_identity(&Html::parse_document(html), "http://test.local/page")
    }

    #[test]
    fn splits_on_first_colon() {
        let id = identity_of(
            "<html><body><div><h3>MINT : MINOR INTERNATIONAL PUBLIC COMPANY LIMITED</h3></div></body></html>",
        );
        assert_eq!(id.symbol.as_deref(), Some("MINT"));
        assert_eq!(
            id.company.as_deref(),
            Some("MINOR INTERNATIONAL PUBLIC COMPANY LIMITED")
        );
    }

    #[test]
    fn company_may_itself_contain_a_colon() {
        let id = identity_of("<div><h3>AB : ALPHA : BETA PCL</h3></div>");
        assert_eq!(id.symbol.as_deref(), Some("AB"));
        assert_eq!(id.company.as_deref(), Some("ALPHA : BETA PCL"));
    }

    #[test]
    fn missing_heading_yields_unset_identity() {
        let id = identity_of("<div><p>no heading here</p></div>");
        assert_eq!(id, PageIdentity::default());
        assert_eq!(id.symbol_label(), "Unknown");
    }

    #[test]
    fn heading_without_colon_yields_unset_identity() {
        let id = identity_of("<div><h3>MINT</h3></div>");
        assert_eq!(id, PageIdentity::default());
    }
}
