use std::fmt;
use std::str::FromStr;

const LOOKUP_URL: &str = "https://www.set.or.th/set/commonslookup.do?language=en&country=TH";
const NUMBER_BUCKET: &str = "NUMBER";

/// Which prefix buckets to enumerate. `test` walks only the numeric bucket;
/// `full` adds every uppercase letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Test,
    Full,
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "test" => Ok(Mode::Test),
            "full" => Ok(Mode::Full),
            other => Err(format!("unknown mode '{other}' (expected 'test' or 'full')")),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Test => "test",
            Mode::Full => "full",
        })
    }
}

/// Directory URLs to seed the queue with, one `(url, prefix)` pair per
/// bucket.
pub fn directory_urls(mode: Mode) -> Vec<(String, String)> {
    let mut prefixes = vec![NUMBER_BUCKET.to_string()];
    if mode == Mode::Full {
        prefixes.extend(('A'..='Z').map(|c| c.to_string()));
    }
    prefixes
        .into_iter()
        .map(|prefix| (format!("{LOOKUP_URL}&prefix={prefix}"), prefix))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_walks_only_the_numeric_bucket() {
        let urls = directory_urls(Mode::Test);
        assert_eq!(urls.len(), 1);
        assert_eq!(
            urls[0].0,
            "https://www.set.or.th/set/commonslookup.do?language=en&country=TH&prefix=NUMBER"
        );
        assert_eq!(urls[0].1, "NUMBER");
    }

    #[test]
    fn full_mode_adds_every_uppercase_letter() {
        let urls = directory_urls(Mode::Full);
        assert_eq!(urls.len(), 27);
        assert_eq!(urls[0].1, "NUMBER");
        assert_eq!(urls[1].1, "A");
        assert_eq!(urls[26].1, "Z");
        assert!(urls.iter().all(|(u, p)| u.ends_with(&format!("&prefix={p}"))));
    }

    #[test]
    fn unknown_mode_refuses_to_parse() {
        assert_eq!("test".parse::<Mode>().unwrap(), Mode::Test);
        assert_eq!("full".parse::<Mode>().unwrap(), Mode::Full);
        assert!("TEST".parse::<Mode>().is_err());
        assert!("all".parse::<Mode>().is_err());
    }
}
