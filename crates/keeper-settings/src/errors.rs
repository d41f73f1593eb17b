//! Errors raised while loading settings.

use thiserror::Error;

/// Why settings could not be produced.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file exists but could not be read.
    #[error("cannot read settings file: {0}")]
    Io(#[from] std::io::Error),
    /// The settings file is not valid JSON, or does not fit the schema.
    #[error("malformed settings: {0}")]
    Json(#[from] serde_json::Error),
    /// No layer supplied a value the run cannot do without.
    #[error("missing required setting: {0}")]
    Missing(&'static str),
}

/// Shorthand for settings results.
pub type Result<T> = std::result::Result<T, SettingsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_file_names_the_cause() {
        let cause = serde_json::from_str::<serde_json::Value>("{panel:").unwrap_err();
        let err = SettingsError::from(cause);
        assert!(err.to_string().starts_with("malformed settings: "));
    }

    #[test]
    fn missing_names_the_setting() {
        let err = SettingsError::Missing("account.email (PELLA_EMAIL)");
        assert_eq!(
            err.to_string(),
            "missing required setting: account.email (PELLA_EMAIL)"
        );
    }
}
