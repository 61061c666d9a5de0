use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::records::PageKind;

/// Archive a raw fetched page as `<symbol>-<kind>.html`. Best effort: a
/// failed write is logged and never interrupts record extraction.
pub fn save_original(data_dir: &Path, symbol: &str, kind: PageKind, html: &str) {
    let path = data_dir.join(format!("{}-{}.html", symbol, kind.as_str()));
    match fs::write(&path, html) {
        Ok(()) => debug!(file = %path.display(), "saved original page"),
        Err(err) => warn!(file = %path.display(), %err, "cannot save original page"),
    }
}
