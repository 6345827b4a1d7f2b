//! Store location resolution for the CLI.
//!
//! Judgments and recorded engine responses live under one store root:
//!
//! ```text
//! <root>/<eval-database>/ideal_rankings.json
//! <root>/<search-database>/<search-collection>.results.json
//! ```
//!
//! The root is chosen from, in order:
//! 1. `--uri` (a path or `file://` URI)
//! 2. `$NDCG_STORE_URI`
//! 3. The platform data directory

use anyhow::{anyhow, bail, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Environment variable for a custom store location
const STORE_URI_ENV: &str = "NDCG_STORE_URI";

/// Suffix of recorded-response files next to a search collection
const RECORDINGS_SUFFIX: &str = ".results.json";

/// Resolves the store root from the flag, the environment, or the platform default.
pub fn store_root(uri: Option<&str>) -> Result<PathBuf> {
    let env = std::env::var(STORE_URI_ENV).ok();
    match uri.or(env.as_deref()) {
        Some(uri) => parse_store_uri(uri),
        None => default_store_root(),
    }
}

/// Converts a store URI into a directory path.
///
/// Plain paths and `file://` URIs are accepted; any other scheme is rejected.
pub fn parse_store_uri(uri: &str) -> Result<PathBuf> {
    let uri = uri.trim();
    if uri.is_empty() {
        bail!("Store URI is empty");
    }
    if let Some(path) = uri.strip_prefix("file://") {
        return Ok(PathBuf::from(path));
    }
    if let Some((scheme, _)) = uri.split_once("://") {
        bail!(
            "Unsupported store URI scheme '{}': expected a directory path or file:// URI",
            scheme
        );
    }
    Ok(PathBuf::from(uri))
}

/// Returns the platform data directory.
///
/// - macOS: `~/Library/Application Support/dev.ndcg.ndcg-eval/`
/// - Linux: `~/.local/share/ndcg-eval/`
/// - Windows: `%APPDATA%\ndcg\ndcg-eval\data\`
pub fn default_store_root() -> Result<PathBuf> {
    ProjectDirs::from("dev", "ndcg", "ndcg-eval")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| anyhow!("Could not determine data directory"))
}

/// Returns the recorded-response file for a search collection.
pub fn recordings_path(root: &Path, database: &str, collection: &str) -> PathBuf {
    root.join(database)
        .join(format!("{collection}{RECORDINGS_SUFFIX}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_path() {
        assert_eq!(
            parse_store_uri("/srv/evals").unwrap(),
            PathBuf::from("/srv/evals")
        );
    }

    #[test]
    fn test_file_uri() {
        assert_eq!(
            parse_store_uri("file:///srv/evals").unwrap(),
            PathBuf::from("/srv/evals")
        );
    }

    #[test]
    fn test_rejects_other_schemes() {
        let err = parse_store_uri("mongodb://localhost:27017").unwrap_err();
        assert!(err.to_string().contains("mongodb"));
        assert!(parse_store_uri("  ").is_err());
    }

    #[test]
    fn test_flag_takes_precedence() {
        let root = store_root(Some("/tmp/from-flag")).unwrap();
        assert_eq!(root, PathBuf::from("/tmp/from-flag"));
    }

    #[test]
    fn test_default_store_root() {
        // No home directory in some CI sandboxes
        if let Ok(dir) = default_store_root() {
            assert!(dir.to_string_lossy().contains("ndcg"));
        }
    }

    #[test]
    fn test_recordings_path() {
        let path = recordings_path(Path::new("/data"), "search", "documents");
        assert_eq!(path, PathBuf::from("/data/search/documents.results.json"));
    }
}
