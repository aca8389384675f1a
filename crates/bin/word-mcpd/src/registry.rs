use word_core::DocumentControl;
use word_core::services::{DocumentRegistry, DocumentRegistryConfig};
use word_core::store::DocumentStore;

use crate::config::ServerConfig;

pub fn build_registry(config: &ServerConfig) -> DocumentRegistry {
    let mut registry_config = DocumentRegistryConfig::default();
    if let Some(ttl) = config.lock_ttl {
        registry_config = registry_config.with_ttl(ttl).with_sweep_interval(ttl);
    }
    if let Some(max_entries) = config.lock_max {
        registry_config = registry_config.with_max_entries(max_entries);
    }
    DocumentRegistry::new(registry_config)
}

pub fn build_control(config: &ServerConfig, registry: DocumentRegistry) -> DocumentControl {
    let store = config
        .root
        .as_ref()
        .map_or_else(DocumentStore::current_dir, |root| DocumentStore::new(root.clone()));
    DocumentControl::new(store, registry)
        .with_author(config.author.clone(), config.author_initials.clone())
        .with_pdf_timeout(config.pdf_timeout)
}
