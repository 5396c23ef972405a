use thiserror::Error;

/// Result type alias for filtering operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building matchers or consulting external storage.
#[derive(Error, Debug)]
pub enum Error {
    /// A pattern, word or custom word could not be compiled into a matcher.
    #[error("invalid pattern {pattern:?}: {source}")]
    Pattern {
        /// Source of the offending pattern.
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A data asset contained a malformed line.
    #[error("malformed line {line} in {asset}: {reason}")]
    Asset {
        /// Name of the asset.
        asset: String,
        /// One-based line number.
        line: usize,
        reason: String,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// The custom blocklist store failed to load or save.
    #[error("blocklist store error: {0}")]
    Store(String),
}

impl Error {
    pub(crate) fn pattern(pattern: impl Into<String>, source: regex::Error) -> Self {
        Self::Pattern {
            pattern: pattern.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::Error;

    #[test]
    fn display() {
        let source = regex::Regex::new("(").unwrap_err();
        let error = Error::pattern("(", source);
        assert!(error.to_string().starts_with("invalid pattern \"(\""));

        let error = Error::Asset {
            asset: "profanity.csv".to_owned(),
            line: 3,
            reason: "unknown tier \"worst\"".to_owned(),
        };
        assert_eq!(
            error.to_string(),
            "malformed line 3 in profanity.csv: unknown tier \"worst\""
        );
    }
}
