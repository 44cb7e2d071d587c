//! Mapping between logical CDN URLs, category-relative paths and physical paths.
//!
//! Resolution order for an input:
//! 1. a local/dev URL prefix (`/cdn/...`), when dev mode supplies one;
//! 2. the configured base URL, compared case-insensitively;
//! 3. any other absolute URL: the path is cut at the first segment naming a known
//!    category, or taken whole when none matches. This is a compatibility
//!    fallback for URLs minted under a different host, not an addressing scheme;
//! 4. anything else is already relative.

use percent_encoding::percent_decode_str;
use std::path::{Path, PathBuf};

use super::errors::CdnError;
use super::naming::clean_folder_path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Category-relative path, forward-slash separated: `documents/2024/a.pdf`.
    pub relative: String,
    /// `relative` joined onto the configured storage root.
    pub physical: PathBuf,
}

/// Pure resolver over one configuration snapshot. No I/O.
#[derive(Debug, Clone, Copy)]
pub struct PathResolver<'a> {
    base_url: &'a str,
    storage_root: &'a Path,
    categories: &'a [String],
    local_prefixes: &'a [String],
}

impl<'a> PathResolver<'a> {
    pub fn new(base_url: &'a str, storage_root: &'a Path, categories: &'a [String], local_prefixes: &'a [String]) -> Self {
        Self { base_url: base_url.trim_end_matches('/'), storage_root, categories, local_prefixes }
    }

    pub fn relative_path(&self, input: &str) -> String {
        let input = input.trim();

        for prefix in self.local_prefixes {
            if let Some(rest) = strip_prefix_ignore_case(input, prefix) {
                return self.canonical_relative(without_query(rest));
            }
        }

        if !self.base_url.is_empty() {
            if let Some(rest) = strip_prefix_ignore_case(input, self.base_url) {
                if rest.is_empty() || rest.starts_with('/') || rest.starts_with('?') {
                    return self.canonical_relative(without_query(rest));
                }
            }
        }

        if let Ok(parsed) = url::Url::parse(input) {
            if matches!(parsed.scheme(), "http" | "https") {
                let segments: Vec<String> = parsed
                    .path_segments()
                    .map(|segs| segs.filter(|s| !s.is_empty()).map(decode).collect())
                    .unwrap_or_default();
                let start = segments.iter().position(|s| self.is_category(s)).unwrap_or(0);
                return self.canonical_relative(&segments[start..].join("/"));
            }
        }

        self.canonical_relative(without_query(input))
    }

    /// Resolve to relative + physical path under the configured storage root.
    pub fn resolve(&self, input: &str) -> Result<ResolvedPath, CdnError> {
        let relative = self.relative_path(input);
        if relative.is_empty() {
            return Err(CdnError::Validation(format!("'{input}' does not address a file")));
        }
        if relative.split('/').any(|s| s == "..") {
            return Err(CdnError::Validation(format!("'{input}' escapes the storage root")));
        }
        Ok(ResolvedPath { physical: physical_path(self.storage_root, &relative), relative })
    }

    fn is_category(&self, segment: &str) -> bool {
        self.categories.iter().any(|c| c.eq_ignore_ascii_case(segment))
    }

    /// Split into segments, decode, drop empty/`.` segments and lowercase a leading category name.
    fn canonical_relative(&self, raw: &str) -> String {
        let mut segments: Vec<String> = raw
            .replace('\\', "/")
            .split('/')
            .filter(|s| !s.is_empty() && *s != ".")
            .map(decode)
            .collect();
        if let Some(first) = segments.first_mut() {
            if self.is_category(first) {
                *first = first.to_lowercase();
            }
        }
        segments.join("/")
    }
}

/// `root` joined with each segment of a forward-slash relative path.
pub fn physical_path(root: &Path, relative: &str) -> PathBuf {
    relative.split('/').filter(|s| !s.is_empty()).fold(root.to_path_buf(), |acc, seg| acc.join(seg))
}

/// `{base}/{category}/[{folder}/]{file}` with no trailing or doubled slashes.
///
/// ```
/// use service::cdn::resolver::build_url;
/// assert_eq!(
///     build_url("https://cdn.example.com/", "documents", "a.pdf", Some("/2024//leases/")),
///     "https://cdn.example.com/documents/2024/leases/a.pdf"
/// );
/// assert_eq!(build_url("https://cdn.example.com", "images", "b.png", None), "https://cdn.example.com/images/b.png");
/// ```
pub fn build_url(base_url: &str, category: &str, file_name: &str, folder_path: Option<&str>) -> String {
    let tail: Vec<String> = [category, folder_path.unwrap_or(""), file_name]
        .iter()
        .map(|part| clean_folder_path(part))
        .filter(|part| !part.is_empty())
        .collect();
    format!("{}/{}", base_url.trim_end_matches('/'), tail.join("/"))
}

/// Inverse of the tail of [`build_url`]: `(category, folder, file)`.
pub fn split_relative(relative: &str) -> (String, String, String) {
    let segments: Vec<&str> = relative.split('/').filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        [] => (String::new(), String::new(), String::new()),
        [file] => (String::new(), String::new(), file.to_string()),
        [category, middle @ .., file] => (category.to_string(), middle.join("/"), file.to_string()),
    }
}

fn strip_prefix_ignore_case<'s>(input: &'s str, prefix: &str) -> Option<&'s str> {
    let head = input.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) { input.get(prefix.len()..) } else { None }
}

fn without_query(s: &str) -> &str {
    s.split(['?', '#']).next().unwrap_or(s)
}

fn decode(segment: &str) -> String {
    percent_decode_str(segment).decode_utf8_lossy().into_owned()
}
