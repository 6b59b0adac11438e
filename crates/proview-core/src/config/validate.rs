//! Configuration validation with range checks.

use crate::error::ConfigError;
use crate::pipeline::classify::FormatTag;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.ingest.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "ingest.batch_size must be > 0".into(),
            ));
        }
        if self.ingest.channel_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "ingest.channel_capacity must be > 0".into(),
            ));
        }
        if let Some(ext) = self
            .ingest
            .extensions
            .iter()
            .find(|ext| FormatTag::from_extension(ext).is_none())
        {
            return Err(ConfigError::ValidationError(format!(
                "ingest.extensions contains unsupported extension '{ext}'"
            )));
        }
        if self.thumbnail.width == 0 || self.thumbnail.height == 0 {
            return Err(ConfigError::ValidationError(
                "thumbnail.width and thumbnail.height must be > 0".into(),
            ));
        }
        if self.limits.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_file_size_mb must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        if self.limits.decode_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.decode_timeout_ms must be > 0".into(),
            ));
        }
        Ok(())
    }
}
