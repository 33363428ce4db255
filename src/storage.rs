//! Content-addressed file layout for stored document bytes.
//!
//! Files land under `{documents_dir}/{hh}/{title}-{hhhhhhhh}.{ext}` where
//! `hh` is the first two hex digits of the content hash. The two-level
//! fanout keeps directory sizes manageable on large archives, and the
//! hash fragment in the basename makes collisions between same-titled
//! documents impossible.

use std::path::{Path, PathBuf};

use crate::models::DocumentVersion;
use crate::utils::{mime_to_extension, sanitize_filename};

/// How many leading hash characters go into the fanout directory.
const FANOUT_CHARS: usize = 2;

/// How many leading hash characters go into the basename.
const BASENAME_HASH_CHARS: usize = 8;

/// Write `content` under its hash-derived path and return that path.
///
/// Creating the fanout directory is part of the write; callers only need
/// the documents root to exist.
pub fn store_content(
    content: &[u8],
    mime_type: &str,
    title: &str,
    documents_dir: &Path,
) -> std::io::Result<PathBuf> {
    let hash = DocumentVersion::compute_hash(content);
    let dest = stored_path(documents_dir, &hash, title, mime_to_extension(mime_type));

    if let Some(fanout) = dest.parent() {
        std::fs::create_dir_all(fanout)?;
    }
    std::fs::write(&dest, content)?;
    Ok(dest)
}

fn stored_path(documents_dir: &Path, hash: &str, title: &str, ext: &str) -> PathBuf {
    let basename = format!(
        "{}-{}.{}",
        sanitize_filename(title),
        &hash[..BASENAME_HASH_CHARS],
        ext
    );
    documents_dir.join(&hash[..FANOUT_CHARS]).join(basename)
}
