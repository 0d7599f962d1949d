use log::debug;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

pub fn message_path(dir: &Path, seq: u32) -> PathBuf {
    dir.join(format!("{}.eml", seq))
}

/// Writes everything `body` yields to `{seq}.eml` inside `dir`, replacing any
/// file of that name. The file is written in place, so a crash midway leaves
/// a truncated file that still counts as archived.
pub fn write_message<R: Read>(dir: &Path, seq: u32, mut body: R) -> io::Result<PathBuf> {
    let path = message_path(dir, seq);
    let mut out = BufWriter::new(File::create(&path)?);
    let written = io::copy(&mut body, &mut out)?;
    out.flush()?;
    debug!("wrote {} bytes to {:?}", written, path);
    Ok(path)
}
