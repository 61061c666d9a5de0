use serde::Serialize;

/// Placeholder used at display and filename boundaries when the symbol or
/// company heading could not be extracted. The records themselves keep the
/// unset state so consumers can tell "not found" apart from a literal name.
pub const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Directory,
    Info,
    Holders,
}

impl PageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PageKind::Directory => "directory",
            PageKind::Info => "info",
            PageKind::Holders => "holders",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "directory" => Some(PageKind::Directory),
            "info" => Some(PageKind::Info),
            "holders" => Some(PageKind::Holders),
            _ => None,
        }
    }
}

/// Symbol + company name taken from a detail page heading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageIdentity {
    pub symbol: Option<String>,
    pub company: Option<String>,
}

impl PageIdentity {
    pub fn symbol_label(&self) -> &str {
        self.symbol.as_deref().unwrap_or(UNKNOWN)
    }
}

/// A follow-up link found on a directory page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredPage {
    pub url: String,
    pub kind: PageKind,
    pub symbol: Option<String>,
}

/// Registration facts from a company profile page. Exactly one per page,
/// partially populated when labels are missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SymbolProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_trade_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorized_capital: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_up_capital: Option<String>,
}

impl SymbolProfile {
    pub fn new(identity: PageIdentity) -> Self {
        SymbolProfile {
            symbol: identity.symbol,
            company: identity.company,
            ..Default::default()
        }
    }
}

/// One major-shareholder row. Ranks are contiguous from 1 within a page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HolderRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    pub rank: u32,
    pub name: String,
    pub share_count: u64,
    pub share_percent: f64,
}

/// One element of the output stream, tagged the way the original feed was.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Record {
    Info(SymbolProfile),
    Holder(HolderRecord),
}
