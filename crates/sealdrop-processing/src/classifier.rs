use std::path::Path;

use sealdrop_core::models::FileKind;

/// Lowercased extension of `filename`, without the dot.
///
/// Dotfiles such as `.csv` have no extension.
pub fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(|e| e.to_ascii_lowercase())
}

/// Resolve the kind of a file from its extension.
pub fn classify(filename: &str) -> FileKind {
    match extension_of(filename).as_deref() {
        Some("csv" | "xls" | "xlsx") => FileKind::StructuredData,
        Some("mp3") => FileKind::Audio,
        Some("mp4") => FileKind::Video,
        _ => FileKind::Rejected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_extensions() {
        assert_eq!(classify("prices.csv"), FileKind::StructuredData);
        assert_eq!(classify("book.xls"), FileKind::StructuredData);
        assert_eq!(classify("book.xlsx"), FileKind::StructuredData);
        assert_eq!(classify("song.mp3"), FileKind::Audio);
        assert_eq!(classify("clip.mp4"), FileKind::Video);
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        for name in ["A.CSV", "a.Csv", "a.csv"] {
            assert_eq!(classify(name), FileKind::StructuredData);
        }
        assert_eq!(classify("SONG.MP3"), classify("song.mp3"));
    }

    #[test]
    fn test_classify_rejects_everything_else() {
        for name in ["notes.txt", "archive.tar.gz", "README", ".csv", "trailing.", "", "x.mp3.exe"] {
            assert_eq!(classify(name), FileKind::Rejected, "{name}");
        }
    }

    #[test]
    fn test_classify_uses_final_extension_only() {
        assert_eq!(classify("backup.exe.csv"), FileKind::StructuredData);
        assert_eq!(classify("dir/sub/track.mp3"), FileKind::Audio);
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("Report.XLSX").as_deref(), Some("xlsx"));
        assert_eq!(extension_of(".csv"), None);
        assert_eq!(extension_of("noext"), None);
    }
}
