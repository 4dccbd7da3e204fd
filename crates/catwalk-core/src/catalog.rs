//! Catalog of models the cache may load.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use catwalk_abstraction::{ModelDescriptor, ModelLoader};

/// A known model and the loader responsible for it.
#[derive(Clone)]
pub struct CatalogEntry {
    /// Static description of the model.
    pub descriptor: ModelDescriptor,
    /// Loader used for this model.
    pub loader: Arc<dyn ModelLoader>,
}

impl fmt::Debug for CatalogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogEntry")
            .field("descriptor", &self.descriptor)
            .field("loader", &self.loader.format())
            .finish()
    }
}

/// Models keyed by id, in id order.
#[derive(Debug, Clone, Default)]
pub struct ModelCatalog {
    models: BTreeMap<String, CatalogEntry>,
}

impl ModelCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a model, returning the entry it replaced.
    pub fn register(
        &mut self,
        descriptor: ModelDescriptor,
        loader: Arc<dyn ModelLoader>,
    ) -> Option<CatalogEntry> {
        self.models.insert(descriptor.id.clone(), CatalogEntry { descriptor, loader })
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&CatalogEntry> {
        self.models.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.models.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.models.values()
    }

    /// Model ids, sorted.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    /// Ids of models flagged for preloading, sorted.
    pub fn preload_ids(&self) -> impl Iterator<Item = &str> {
        self.models
            .values()
            .filter(|entry| entry.descriptor.preload)
            .map(|entry| entry.descriptor.id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catwalk_models::MockLoader;

    fn descriptor(id: &str) -> ModelDescriptor {
        ModelDescriptor::new(id, "mock", format!("{id}.bin"), 100)
    }

    #[test]
    fn test_register_and_lookup() {
        let mut catalog = ModelCatalog::new();
        let loader: Arc<dyn ModelLoader> = Arc::new(MockLoader::new());

        assert!(catalog.register(descriptor("b"), Arc::clone(&loader)).is_none());
        assert!(catalog.register(descriptor("a"), Arc::clone(&loader)).is_none());
        assert!(catalog.register(descriptor("a"), loader).is_some());

        assert_eq!(catalog.len(), 2);
        assert!(catalog.contains("a"));
        assert!(catalog.get("missing").is_none());
        assert_eq!(catalog.ids().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_preload_ids() {
        let mut catalog = ModelCatalog::new();
        let loader: Arc<dyn ModelLoader> = Arc::new(MockLoader::new());
        catalog.register(descriptor("a").with_preload(true), Arc::clone(&loader));
        catalog.register(descriptor("b"), loader);

        assert_eq!(catalog.preload_ids().collect::<Vec<_>>(), vec!["a"]);
    }
}
