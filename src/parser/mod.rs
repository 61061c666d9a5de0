pub mod directory;
pub mod holders;
pub mod identity;
pub mod numeric;
pub mod profile;
pub mod text;

use thiserror::Error;

pub use directory::{derive_holders_url, parse_directory};
pub use holders::{parse_holders, HoldersPage};
pub use profile::parse_profile;

/// Failures the pure extraction functions can report. Structural drift in a
/// single row is recovered locally with a warning instead; these are the
/// conditions that make a value, link, or page unusable.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("page URL is not parseable: {0}")]
    BadBaseUrl(String),
    #[error("link has no profile-page segment: {0}")]
    UnexpectedLinkShape(String),
    #[error("malformed holder rank {0:?}")]
    BadRank(String),
    #[error("malformed grouped integer {0:?}")]
    BadGroupedInteger(String),
    #[error("malformed decimal {0:?}")]
    BadDecimal(String),
}
