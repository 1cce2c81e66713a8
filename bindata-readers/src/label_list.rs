//! Label allow-list parsing

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::Result;

/// Parse a label allow list.
///
/// `list` is either a path to a file with one label per line, or a
/// comma-separated list of labels. Blank entries are dropped; an empty list
/// means every label is processed and yields `None`.
pub fn load_label_list(list: &str) -> Result<Option<Vec<String>>> {
    let list = list.trim();
    if list.is_empty() {
        return Ok(None);
    }

    let path = Path::new(list);
    let labels: Vec<String> = if path.is_file() {
        debug!(path = %path.display(), "reading label list from file");
        fs::read_to_string(path)?
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    } else {
        list.split(',')
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    };

    Ok((!labels.is_empty()).then_some(labels))
}
