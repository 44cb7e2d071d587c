//! Folder-path cleaning and collision-proof file naming.

use chrono::{DateTime, Utc};
use uuid::Uuid;

const MAX_BASE_NAME_LEN: usize = 100;

/// Normalize a user-supplied folder path.
///
/// Backslashes become forward slashes, empty / `.` / `..` segments are dropped and
/// surrounding whitespace is trimmed per segment. The result never starts or ends
/// with `/` and never contains `//` or a `..` segment.
pub fn clean_folder_path(input: &str) -> String {
    input
        .replace('\\', "/")
        .split('/')
        .map(str::trim)
        .filter(|seg| !seg.is_empty() && *seg != "." && *seg != "..")
        .collect::<Vec<_>>()
        .join("/")
}

/// Last path segment of a client-supplied file name (`C:\tmp\a.pdf` → `a.pdf`).
pub fn file_name_only(name: &str) -> &str {
    name.rsplit(|c| c == '/' || c == '\\').next().unwrap_or(name).trim()
}

/// Split into stem and lowercase dotted extension. Dotfiles and odd suffixes have no extension.
pub fn split_extension(name: &str) -> (&str, String) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => {
            let ext = &name[idx + 1..];
            if !ext.is_empty() && ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
                (&name[..idx], format!(".{}", ext.to_lowercase()))
            } else {
                (name, String::new())
            }
        }
        _ => (name, String::new()),
    }
}

/// Reduce a base name to `[A-Za-z0-9_-]`, collapsing runs of replaced characters.
pub fn sanitize_base_name(stem: &str) -> String {
    let mut out = String::with_capacity(stem.len());
    for c in stem.trim().chars() {
        if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
            out.push(c);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    let trimmed = out.trim_matches('_');
    let mut base: String = trimmed.chars().take(MAX_BASE_NAME_LEN).collect();
    if base.is_empty() {
        base.push_str("file");
    }
    base
}

/// `{sanitizedBaseName}_{yyyyMMddHHmmss}_{8-hex-random}{ext}`
pub fn unique_file_name(original: &str, now: DateTime<Utc>) -> String {
    let random = Uuid::new_v4().simple().to_string();
    unique_file_name_with(original, now, &random[..8])
}

pub(crate) fn unique_file_name_with(original: &str, now: DateTime<Utc>, random: &str) -> String {
    let (stem, ext) = split_extension(file_name_only(original));
    format!("{}_{}_{}{}", sanitize_base_name(stem), now.format("%Y%m%d%H%M%S"), random, ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn folder_paths_are_cleaned() {
        let cases = [
            ("", ""),
            ("/", ""),
            ("2024/january", "2024/january"),
            ("/2024//january/", "2024/january"),
            ("..\\..\\etc\\passwd", "etc/passwd"),
            ("a/./b/../c", "a/b/c"),
            ("  leases / 2024 ", "leases/2024"),
        ];
        for (input, expected) in cases {
            assert_eq!(clean_folder_path(input), expected, "input {input:?}");
        }
    }

    #[test]
    fn cleaned_paths_hold_invariants() {
        let inputs = ["../../x", "a\\b\\\\c", "///", "a/..//..\\b/", "..", "x/../../y//z/"];
        for input in inputs {
            let out = clean_folder_path(input);
            assert!(!out.split('/').any(|s| s == ".."), "{out}");
            assert!(!out.contains('\\'));
            assert!(!out.contains("//"));
            assert!(!out.starts_with('/') && !out.ends_with('/'));
        }
    }

    #[test]
    fn extensions_and_names() {
        assert_eq!(split_extension("report.PDF"), ("report", ".pdf".to_string()));
        assert_eq!(split_extension("archive.tar.gz"), ("archive.tar", ".gz".to_string()));
        assert_eq!(split_extension(".env"), (".env", String::new()));
        assert_eq!(split_extension("noext"), ("noext", String::new()));
        assert_eq!(file_name_only("C:\\Users\\me\\lease.docx"), "lease.docx");
        assert_eq!(sanitize_base_name("Lease Agreement (final)"), "Lease_Agreement_final");
        assert_eq!(sanitize_base_name("???"), "file");
    }

    #[test]
    fn unique_name_format() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(unique_file_name_with("report.pdf", now, "0a1b2c3d"), "report_20240309140507_0a1b2c3d.pdf");

        let generated = unique_file_name("report.pdf", now);
        let rest = generated.strip_prefix("report_20240309140507_").unwrap();
        let (hex, ext) = rest.split_at(8);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(ext, ".pdf");
        assert_ne!(generated, unique_file_name("report.pdf", now));
    }
}
