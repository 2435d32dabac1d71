//! Multipart upload helpers

const MAX_FILENAME_LENGTH: usize = 255;
const FALLBACK_FILENAME: &str = "file";

/// Display name of an uploaded part.
///
/// Browsers on some platforms send the full client path, so only the last
/// segment (split on both `/` and `\`) is kept. Characters are otherwise
/// preserved since the name is echoed back in the batch report; stored files
/// get generated names and never use it.
pub fn client_filename(raw: Option<&str>) -> String {
    let last = raw
        .unwrap_or_default()
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .trim();

    if last.is_empty() || last == "." || last == ".." {
        return FALLBACK_FILENAME.to_string();
    }

    truncate_keeping_extension(last)
}

/// Cap `name` at `MAX_FILENAME_LENGTH` characters by shortening the stem, so
/// the extension that drives classification survives.
fn truncate_keeping_extension(name: &str) -> String {
    if name.chars().count() <= MAX_FILENAME_LENGTH {
        return name.to_string();
    }

    if let Some(dot) = name.rfind('.').filter(|&dot| dot > 0) {
        let extension = &name[dot..];
        let extension_len = extension.chars().count();
        if extension_len < MAX_FILENAME_LENGTH {
            let stem: String = name[..dot]
                .chars()
                .take(MAX_FILENAME_LENGTH - extension_len)
                .collect();
            return format!("{}{}", stem, extension);
        }
    }

    name.chars().take(MAX_FILENAME_LENGTH).collect()
}
