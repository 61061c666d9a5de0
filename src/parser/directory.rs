use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use tracing::warn;
use url::Url;

use super::ExtractError;
use crate::records::{DiscoveredPage, PageKind};

static SYMBOL_ROW_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"tr[valign="top"]"#).expect("directory row selector"));
static ROW_LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td a").expect("directory link selector"));
static SYMBOL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"symbol=(\w*)").unwrap());

const PROFILE_SEGMENT: &str = "companyprofile";
const HOLDERS_SEGMENT: &str = "companyholder";

/// Derive the holders-page link for a profile-page link: substitute the
/// profile path token, leave the query string untouched. A link without the
/// token means the directory page changed shape.
pub fn derive_holders_url(profile_url: &str) -> Result<String, ExtractError> {
    if !profile_url.contains(PROFILE_SEGMENT) {
        return Err(ExtractError::UnexpectedLinkShape(profile_url.to_string()));
    }
    Ok(profile_url.replacen(PROFILE_SEGMENT, HOLDERS_SEGMENT, 1))
}

fn page_symbol(link: &str) -> Option<String> {
    SYMBOL_RE
        .captures(link)
        .map(|caps| caps[1].to_string())
        .filter(|s| !s.is_empty())
}

/// Walk the symbol rows of a directory page. Each row's profile link yields
/// two follow-up pages: the profile itself and the derived holders page.
/// Rows with missing or underivable links are skipped with a warning.
pub fn parse_directory(html: &str, url: &str) -> Result<Vec<DiscoveredPage>, ExtractError> {
    let base = Url::parse(url).map_err(|_| ExtractError::BadBaseUrl(url.to_string()))?;
    let doc = Html::parse_document(html);

    let mut pages = Vec::new();
    for row in doc.select(&SYMBOL_ROW_SEL) {
        let Some(href) = row.select(&ROW_LINK_SEL).find_map(|a| a.value().attr("href")) else {
            warn!(url, "directory row without a link");
            continue;
        };
        let profile = match base.join(href) {
            Ok(joined) => joined.to_string(),
            Err(_) => {
                warn!(url, href, "unresolvable link in directory row");
                continue;
            }
        };
        let holders = match derive_holders_url(&profile) {
            Ok(derived) => derived,
            Err(err) => {
                warn!(url, href, %err, "skipping directory row");
                continue;
            }
        };
        let symbol = page_symbol(&profile);
        pages.push(DiscoveredPage {
            url: profile,
            kind: PageKind::Info,
            symbol: symbol.clone(),
        });
        pages.push(DiscoveredPage {
            url: holders,
            kind: PageKind::Holders,
            symbol,
        });
    }
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE_URL: &str =
        "https://www.set.or.th/set/companyprofile.do?symbol=A&ssoPageId=4&language=en&country=TH";
    const HOLDERS_URL: &str =
        "https://www.set.or.th/set/companyholder.do?symbol=A&ssoPageId=4&language=en&country=TH";

    #[test]
    fn derives_holders_url_preserving_the_query() {
        assert_eq!(derive_holders_url(PROFILE_URL).unwrap(), HOLDERS_URL);
    }

    #[test]
    fn an_already_derived_url_errors_instead_of_corrupting() {
        let err = derive_holders_url(HOLDERS_URL).unwrap_err();
        assert!(matches!(err, ExtractError::UnexpectedLinkShape(_)));
    }

    #[test]
    fn unrelated_links_error() {
        assert!(derive_holders_url("https://www.set.or.th/set/news.do?id=1").is_err());
    }

    #[test]
    fn symbol_is_read_from_the_query() {
        assert_eq!(page_symbol(PROFILE_URL).as_deref(), Some("A"));
        assert_eq!(page_symbol("https://x/y?symbol=7UP&z=1").as_deref(), Some("7UP"));
        assert_eq!(page_symbol("https://x/y?symbol=&z=1"), None);
        assert_eq!(page_symbol("https://x/y"), None);
    }

    #[test]
    fn each_symbol_row_yields_a_profile_and_a_holders_page() {
        let html = std::fs::read_to_string("tests/fixtures/commonslookup-number.html").unwrap();
        let base = "https://www.set.or.th/set/commonslookup.do?language=en&country=US&prefix=NUMBER";
        let pages = parse_directory(&html, base).unwrap();
        let urls: Vec<&str> = pages.iter().map(|p| p.url.as_str()).collect();

        assert!(urls.contains(
            &"https://www.set.or.th/set/companyprofile.do?symbol=2S&ssoPageId=4&language=en&country=US"
        ));
        assert!(urls.contains(
            &"https://www.set.or.th/set/companyprofile.do?symbol=7UP&ssoPageId=4&language=en&country=US"
        ));
        assert!(urls.contains(
            &"https://www.set.or.th/set/companyholder.do?symbol=2S&ssoPageId=4&language=en&country=US"
        ));
        assert!(urls.contains(
            &"https://www.set.or.th/set/companyholder.do?symbol=7UP&ssoPageId=4&language=en&country=US"
        ));

        let symbols: Vec<_> = pages.iter().filter_map(|p| p.symbol.as_deref()).collect();
        assert_eq!(symbols, ["2S", "2S", "7UP", "7UP"]);
        assert!(pages.iter().any(|p| p.kind == PageKind::Info));
        assert!(pages.iter().any(|p| p.kind == PageKind::Holders));
    }

    #[test]
    fn rows_without_links_are_skipped() {
        let html = r#"<html><body><table>
            <tr valign="top"><td>no anchor here</td></tr>
            <tr valign="top"><td><a href="/set/companyprofile.do?symbol=2S&ssoPageId=4">2S</a></td></tr>
        </table></body></html>"#;
        let pages = parse_directory(html, "https://www.set.or.th/set/commonslookup.do?prefix=NUMBER").unwrap();
        assert_eq!(pages.len(), 2);
    }
}
