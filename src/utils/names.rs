//! Filename helpers for stored content and temporary files.

/// Minimum filename stem length accepted for temporary files.
const MIN_STEM_LEN: usize = 3;

/// Make a filename stem safe for temporary-file creation.
///
/// Keeps alphanumerics, `-` and `_`; anything else becomes `_`. Stems
/// shorter than three characters are padded with random characters so the
/// result is always a valid temp-file prefix.
pub fn safe_stem(name: &str) -> String {
    let mut stem: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if stem.chars().count() < MIN_STEM_LEN {
        let pad = uuid::Uuid::new_v4().simple().to_string();
        for c in pad.chars() {
            if stem.chars().count() >= MIN_STEM_LEN {
                break;
            }
            stem.push(c);
        }
    }
    stem
}

/// Sanitize a title for use as part of a stored filename.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '-'
            }
        })
        .collect();
    cleaned.trim_matches('-').chars().take(80).collect()
}
