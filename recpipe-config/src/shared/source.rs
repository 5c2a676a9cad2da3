use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Location and dialect of a delimited source file.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct SourceConfig {
    /// Path of the file to scan.
    pub path: PathBuf,
    /// Single-byte field delimiter. Defaults to a tab.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// Whether the first row holds column names and must be skipped.
    #[serde(default = "default_has_header")]
    pub has_header: bool,
    /// Whether double quotes delimit fields.
    ///
    /// Disabled by default since IMDb-style TSV dumps carry bare quotes inside values.
    #[serde(default)]
    pub quoting: bool,
}

impl SourceConfig {
    /// Default field delimiter.
    pub const DEFAULT_DELIMITER: char = '\t';

    /// Creates a configuration for `path` using the default dialect.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: default_delimiter(),
            has_header: default_has_header(),
            quoting: false,
        }
    }

    /// Returns the delimiter as the byte expected by the reader.
    pub fn delimiter_byte(&self) -> Result<u8, ValidationError> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| ValidationError::InvalidFieldValue {
                field: "source.delimiter".to_string(),
                constraint: "must be a single ASCII character".to_string(),
            })
    }

    /// Validates source configuration settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.path.as_os_str().is_empty() {
            return Err(ValidationError::MissingSourcePath);
        }

        self.delimiter_byte()?;

        Ok(())
    }
}

fn default_delimiter() -> char {
    SourceConfig::DEFAULT_DELIMITER
}

fn default_has_header() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_ascii_delimiter() {
        let config = SourceConfig {
            delimiter: '§',
            ..SourceConfig::new("titles.tsv")
        };

        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidFieldValue { .. })
        ));
        assert!(config.delimiter_byte().is_err());
    }

    #[test]
    fn latin1_delimiter_is_not_truncated_to_a_byte() {
        let config = SourceConfig {
            delimiter: 'é',
            ..SourceConfig::new("titles.tsv")
        };

        assert!(config.delimiter_byte().is_err());
    }

    #[test]
    fn defaults_to_tab_separated_with_header() {
        let config: SourceConfig = serde_json::from_str(r#"{ "path": "titles.tsv" }"#).unwrap();

        assert_eq!(config.delimiter_byte().unwrap(), b'\t');
        assert!(config.has_header);
        assert!(!config.quoting);
        assert!(config.validate().is_ok());
    }
}
