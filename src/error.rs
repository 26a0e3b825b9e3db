use std::fmt;
use std::path::PathBuf;

/// Errors raised while loading, converting or classifying map data.
///
/// Every variant is returned at the point of detection and never retried;
/// the UI surfaces the message in the status line.
#[derive(Debug)]
pub enum MapError {
    /// The topology has no object layers to convert.
    EmptyTopology,
    /// Boundary fetch answered with a non-success status.
    Load { url: String, status: u16 },
    /// A required tabular column is absent or null on a validated row.
    MissingColumn { column: String },
    /// Min/max (or validation) requested on a row set without values.
    EmptyDataset,
    /// A range failed construction-time checks.
    InvalidRange { reason: String },
    Io { path: PathBuf, source: std::io::Error },
    Decode { what: &'static str, reason: String },
    Csv(csv::Error),
    Http(reqwest::Error),
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyTopology => write!(f, "no objects found in topology"),
            Self::Load { url, status } => {
                write!(f, "error loading data from {url}: HTTP {status}")
            }
            Self::MissingColumn { column } => {
                write!(f, "dataset is missing required column `{column}`")
            }
            Self::EmptyDataset => write!(f, "dataset has no values"),
            Self::InvalidRange { reason } => write!(f, "invalid range: {reason}"),
            Self::Io { path, source } => write!(f, "failed to read {}: {source}", path.display()),
            Self::Decode { what, reason } => write!(f, "failed to decode {what}: {reason}"),
            Self::Csv(e) => write!(f, "failed to parse delimited file: {e}"),
            Self::Http(e) => write!(f, "request failed: {e}"),
        }
    }
}

impl std::error::Error for MapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Csv(e) => Some(e),
            Self::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<csv::Error> for MapError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e)
    }
}

impl From<reqwest::Error> for MapError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e)
    }
}

pub type Result<T> = std::result::Result<T, MapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_error_carries_status() {
        let err = MapError::Load {
            url: "/topojson/chile.topojson".to_string(),
            status: 404,
        };
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn test_missing_column_names_column() {
        let err = MapError::MissingColumn {
            column: "Canton".to_string(),
        };
        assert!(err.to_string().contains("`Canton`"));
    }
}
