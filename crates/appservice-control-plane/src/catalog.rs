//! App catalog: the registry of runnable apps.

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;
use tracing::info;

use appservice_core::{AppDescriptor, AppId, CallerContext};

/// Catalog loading errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse catalog '{path}': {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    #[error("Duplicate app id in catalog: {0}")]
    DuplicateApp(AppId),
}

/// Source of app descriptors.
///
/// The caller context is passed through so implementations can hide apps a
/// caller may not run.
pub trait AppCatalog: Send + Sync {
    /// All apps visible to `caller`.
    fn list(&self, caller: &CallerContext) -> Vec<AppDescriptor>;

    /// One app, if it exists and is visible to `caller`.
    fn get(&self, id: &AppId, caller: &CallerContext) -> Option<AppDescriptor>;
}

/// Fixed catalog, built in code or loaded from a JSON file.
#[derive(Debug, Default)]
pub struct StaticCatalog {
    apps: BTreeMap<AppId, AppDescriptor>,
}

impl StaticCatalog {
    /// Build a catalog from descriptors.
    pub fn new<I>(apps: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = AppDescriptor>,
    {
        let mut map = BTreeMap::new();
        for app in apps {
            if map.contains_key(&app.id) {
                return Err(CatalogError::DuplicateApp(app.id));
            }
            map.insert(app.id.clone(), app);
        }
        Ok(Self { apps: map })
    }

    /// Load a JSON array of app descriptors.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let path_str = path.display().to_string();
        let raw = std::fs::read(path).map_err(|source| CatalogError::Io {
            path: path_str.clone(),
            source,
        })?;
        let apps: Vec<AppDescriptor> =
            serde_json::from_slice(&raw).map_err(|source| CatalogError::Parse {
                path: path_str.clone(),
                source,
            })?;

        let catalog = Self::new(apps)?;
        info!(path = %path_str, apps = catalog.len(), "App catalog loaded");
        Ok(catalog)
    }

    /// Number of apps.
    pub fn len(&self) -> usize {
        self.apps.len()
    }

    /// Returns true if the catalog has no apps.
    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }
}

impl AppCatalog for StaticCatalog {
    fn list(&self, _caller: &CallerContext) -> Vec<AppDescriptor> {
        self.apps.values().cloned().collect()
    }

    fn get(&self, id: &AppId, _caller: &CallerContext) -> Option<AppDescriptor> {
        self.apps.get(id).cloned()
    }
}
