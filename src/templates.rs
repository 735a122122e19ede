//! Static workflow templates served alongside the generator.
//!
//! The file is read on every call and returned byte-for-byte; the service
//! never parses or rewrites it.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Default location, relative to the working directory.
pub const DEFAULT_TEMPLATES_PATH: &str = "templates/tars_routes.json";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Templates file not found: '{}'", path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to read templates file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Read-only handle on the templates JSON file.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    path: PathBuf,
}

impl Default for TemplateStore {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATES_PATH)
    }
}

impl TemplateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The file's contents, verbatim.
    pub async fn load(&self) -> Result<String, TemplateError> {
        let data = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => TemplateError::NotFound {
                    path: self.path.clone(),
                },
                _ => TemplateError::Io {
                    path: self.path.clone(),
                    source: e,
                },
            })?;
        debug!("Loaded {} bytes of templates from {}", data.len(), self.path.display());
        Ok(data)
    }
}
