//! Loader factory for selecting a loader implementation from configuration.
//!
//! Every configured model names a format; the factory maps that name to the
//! loader implementation that understands it.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use catwalk_abstraction::{ModelError, ModelLoader, Storage};
use tracing::debug;

use crate::{LinearLoader, MockLoader, RawLoader};

/// Supported model formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelFormat {
    /// In-memory mock models for testing.
    Mock,
    /// Opaque artifact bytes.
    Raw,
    /// JSON-encoded linear model.
    Linear,
}

impl ModelFormat {
    /// All supported formats.
    pub const ALL: [Self; 3] = [Self::Mock, Self::Raw, Self::Linear];

    /// Canonical name of the format.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mock => "mock",
            Self::Raw => "raw",
            Self::Linear => "linear",
        }
    }
}

impl FromStr for ModelFormat {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "raw" | "bytes" | "binary" => Ok(Self::Raw),
            "linear" | "linear-json" => Ok(Self::Linear),
            other => Err(ModelError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ModelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Factory for creating loader instances.
pub struct LoaderFactory;

impl LoaderFactory {
    /// Creates the loader for `format`, reading artifacts from `storage`.
    pub fn create(format: ModelFormat, storage: Arc<dyn Storage>) -> Arc<dyn ModelLoader> {
        debug!(format = %format, "Creating model loader");

        match format {
            ModelFormat::Mock => Arc::new(MockLoader::new()),
            ModelFormat::Raw => Arc::new(RawLoader::new(storage)),
            ModelFormat::Linear => Arc::new(LinearLoader::new(storage)),
        }
    }

    /// Creates a loader from a format name.
    ///
    /// # Errors
    /// Returns `ModelError::UnsupportedFormat` if the name is unknown.
    pub fn create_from_str(
        format: &str,
        storage: Arc<dyn Storage>,
    ) -> Result<Arc<dyn ModelLoader>, ModelError> {
        let format = ModelFormat::from_str(format)?;
        Ok(Self::create(format, storage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FileSystemStorage;

    #[test]
    fn test_model_format_from_str() {
        assert_eq!(ModelFormat::from_str("RAW").unwrap(), ModelFormat::Raw);
        assert_eq!(ModelFormat::from_str("linear-json").unwrap(), ModelFormat::Linear);
        assert_eq!(ModelFormat::from_str("mock").unwrap(), ModelFormat::Mock);
        assert!(matches!(
            ModelFormat::from_str("pytorch"),
            Err(ModelError::UnsupportedFormat(name)) if name == "pytorch"
        ));
    }

    #[test]
    fn test_model_format_round_trips_through_display() {
        for format in ModelFormat::ALL {
            assert_eq!(ModelFormat::from_str(&format.to_string()).unwrap(), format);
        }
    }

    #[test]
    fn test_factory_selects_loader_by_format() {
        let storage: Arc<dyn Storage> = Arc::new(FileSystemStorage::new("."));

        for format in ModelFormat::ALL {
            let loader = LoaderFactory::create(format, Arc::clone(&storage));
            assert_eq!(loader.format(), format.as_str());
        }

        assert!(LoaderFactory::create_from_str("tensorflow", storage).is_err());
    }
}
