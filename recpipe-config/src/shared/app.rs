use serde::Deserialize;

use crate::shared::{FilterConfig, PipelineConfig, SourceConfig, ValidationError};

/// Top-level configuration of the `recpipe` binary.
#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    /// Source file settings.
    pub source: SourceConfig,
    /// Pipeline run settings.
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Match filter settings.
    #[serde(default)]
    pub filter: FilterConfig,
}

impl AppConfig {
    /// Validates every section of the configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.source.validate()?;
        self.pipeline.validate()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_source_section_is_required() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "source": { "path": "data/title.basics.tsv" } }"#).unwrap();

        assert_eq!(config.pipeline, PipelineConfig::default());
        assert_eq!(config.filter.primary_title(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_title_filter_means_no_filter() {
        let config: AppConfig = serde_json::from_str(
            r#"{ "source": { "path": "t.tsv" }, "filter": { "primary_title": "" } }"#,
        )
        .unwrap();

        assert_eq!(config.filter.primary_title(), None);
    }
}
