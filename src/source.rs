//! Document sources: local paths or `http(s)://` URLs.

use std::fmt;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use docload_core::Value;

/// Where a document to load comes from.
#[derive(Debug, Clone)]
pub enum FileSource {
    /// A path on the local filesystem
    Local(PathBuf),
    /// A remote document fetched over HTTP(S)
    Remote(String),
}

impl FileSource {
    /// Classify a raw CLI argument.
    pub fn parse(raw: &str) -> FileSource {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            FileSource::Remote(raw.to_string())
        } else {
            FileSource::Local(PathBuf::from(raw))
        }
    }

    /// Read and parse the JSON document.
    pub fn read(&self) -> Result<Value> {
        let json: serde_json::Value = match self {
            FileSource::Local(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parsing {}", path.display()))?
            }
            FileSource::Remote(url) => reqwest::blocking::get(url)
                .and_then(reqwest::blocking::Response::error_for_status)
                .with_context(|| format!("fetching {url}"))?
                .json()
                .with_context(|| format!("parsing {url}"))?,
        };
        Ok(Value::from(json))
    }

    /// The name used as a fallback document id: the file stem, or the last
    /// URL segment with any `.json` extension dropped.
    pub fn stem(&self) -> Option<String> {
        match self {
            FileSource::Local(path) => {
                path.file_stem().map(|s| s.to_string_lossy().into_owned())
            }
            FileSource::Remote(url) => url
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .map(|name| name.trim_end_matches(".json").to_string())
                .filter(|name| !name.is_empty()),
        }
    }
}

impl fmt::Display for FileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileSource::Local(path) => write!(f, "{}", path.display()),
            FileSource::Remote(url) => f.write_str(url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_classifies() {
        assert!(matches!(
            FileSource::parse("dump/13901.json"),
            FileSource::Local(_)
        ));
        assert!(matches!(
            FileSource::parse("https://example.org/dump/13901.json"),
            FileSource::Remote(_)
        ));
    }

    #[test]
    fn test_stem_local() {
        let s = FileSource::parse("dump/13901.json");
        assert_eq!(s.stem().as_deref(), Some("13901"));
    }

    #[test]
    fn test_stem_remote() {
        let s = FileSource::parse("https://example.org/dump/13901.json");
        assert_eq!(s.stem().as_deref(), Some("13901"));
    }

    #[test]
    fn test_read_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("13901.json");
        fs::write(&path, r#"{"pmcid": "PMC13901"}"#).unwrap();
        let doc = FileSource::parse(path.to_str().unwrap()).read().unwrap();
        assert_eq!(doc.get("pmcid"), Some(&Value::from("PMC13901")));
    }

    #[test]
    fn test_read_missing_file_is_an_error() {
        assert!(FileSource::parse("no/such/file.json").read().is_err());
    }
}
