//! Resolves where an incremental archive run has to resume.
//!
//! Every archived message lives in a file whose stem is the sequence number
//! it had on the server when it was downloaded. The highest such number is
//! taken as the last message archived; gaps below it are not detected.

use log::{debug, warn};
use std::fs;
use std::io::{ErrorKind, Result};
use std::path::Path;

/// Numeric value of a file name's stem, i.e. everything before the last `.`.
pub fn stem_value(name: &str) -> Option<u32> {
    let stem = match name.rfind('.') {
        Some(i) => &name[..i],
        None => name,
    };
    stem.parse().ok()
}

fn sort_key(name: &str) -> u32 {
    stem_value(name).unwrap_or(0)
}

/// Lists the files of an archive directory, ordered by the numeric value
/// of their stems. Subdirectories are skipped. A missing directory is an empty archive.
pub fn list_names(dir: &Path) -> Result<Vec<String>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("archive dir {:?} does not exist yet", dir);
            return Ok(Vec::new());
        }
        Err(e) => return Err(e),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        // child mailboxes are archived in subdirectories
        if !entry.file_type()?.is_file() {
            debug!("ignoring {:?} in archive dir {:?}, not a file", name, dir);
            continue;
        }
        if stem_value(&name).is_none() {
            warn!(
                "unexpected file {:?} in archive dir {:?}, counting it as 0",
                name, dir
            );
        }
        names.push(name);
    }
    names.sort_by_key(|n| sort_key(n));
    Ok(names)
}

/// Sequence number of the last archived message, 0 if nothing is archived.
/// Expects `names` as returned by [`list_names`].
pub fn last_archived(names: &[String]) -> u32 {
    names.last().map(|n| sort_key(n)).unwrap_or(0)
}

/// First sequence number that still has to be fetched into `dir`.
pub fn next_sequence(dir: &Path) -> Result<u32> {
    let names = list_names(dir)?;
    let last = last_archived(&names);
    debug!("{:?}: {} entries, last archived {}", dir, names.len(), last);
    Ok(last.saturating_add(1))
}
