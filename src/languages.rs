//! The language/extension table.
//!
//! One static table drives both sides of file handling: selecting which
//! files in an uploaded tree are convertible (any listed extension matches,
//! case-insensitively) and choosing the output extension when a converted
//! file is renamed (the first listed extension is the canonical one).
//!
//! Every language offered to users must have a non-empty entry here —
//! an unknown language makes the selector yield zero files, which is valid
//! but almost never what the caller wanted.

/// Language identifier → recognised file extensions, canonical first.
///
/// Extensions are stored lowercase with the leading dot.
const EXTENSION_TABLE: &[(&str, &[&str])] = &[
    ("c", &[".c", ".h"]),
    ("cpp", &[".cpp", ".hpp", ".cc", ".hh"]),
    ("python", &[".py"]),
    ("java", &[".java"]),
    ("js", &[".js", ".jsx"]),
    ("go", &[".go"]),
    ("rust", &[".rs"]),
    ("ruby", &[".rb"]),
];

/// All extensions recognised for `lang`, canonical first.
///
/// Returns an empty slice for unknown languages.
pub fn extensions_for(lang: &str) -> &'static [&'static str] {
    EXTENSION_TABLE
        .iter()
        .find(|(l, _)| l.eq_ignore_ascii_case(lang))
        .map(|(_, exts)| *exts)
        .unwrap_or(&[])
}

/// The canonical (first-listed) extension for `lang`, used when renaming
/// converted output. `None` for unknown languages.
pub fn canonical_extension(lang: &str) -> Option<&'static str> {
    extensions_for(lang).first().copied()
}

/// Whether `ext` (with leading dot, any case) is recognised for `lang`.
pub fn matches_language(lang: &str, ext: &str) -> bool {
    extensions_for(lang)
        .iter()
        .any(|e| e.eq_ignore_ascii_case(ext))
}

/// Language identifiers with a non-empty table entry.
pub fn supported_languages() -> impl Iterator<Item = &'static str> {
    EXTENSION_TABLE.iter().map(|(l, _)| *l)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_is_first_listed() {
        assert_eq!(canonical_extension("c"), Some(".c"));
        assert_eq!(canonical_extension("js"), Some(".js"));
        assert_eq!(canonical_extension("python"), Some(".py"));
    }

    #[test]
    fn unknown_language_has_no_extensions() {
        assert!(extensions_for("cobol").is_empty());
        assert_eq!(canonical_extension("cobol"), None);
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert!(matches_language("python", ".PY"));
        assert!(matches_language("PYTHON", ".py"));
        assert!(matches_language("c", ".H"));
        assert!(!matches_language("python", ".txt"));
    }

    #[test]
    fn every_entry_is_non_empty() {
        for lang in supported_languages() {
            assert!(
                !extensions_for(lang).is_empty(),
                "language '{lang}' has an empty extension list"
            );
        }
    }
}
