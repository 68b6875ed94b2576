//! Blob URL parsing shared by all backends.
//!
//! URL format: `{scheme}://{container}/{path}` where the scheme selects the
//! backend (`gs` or `file`).

use crate::traits::{StorageError, StorageResult};
use crate::StorageBackend;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Address of one object: backend, container (bucket or directory) and path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobLocation {
    backend: StorageBackend,
    container: String,
    path: String,
}

impl BlobLocation {
    /// Build a location, validating container and path.
    pub fn new(
        backend: StorageBackend,
        container: impl Into<String>,
        path: impl Into<String>,
    ) -> StorageResult<Self> {
        let container = container.into();
        let path = path.into();

        if container.is_empty() || container.contains('/') || container == ".." {
            return Err(StorageError::InvalidLocation(format!(
                "invalid container name: {:?}",
                container
            )));
        }
        let path = path.trim_start_matches('/').to_string();
        if path.is_empty() {
            return Err(StorageError::InvalidLocation(
                "object path cannot be empty".to_string(),
            ));
        }
        if path.split('/').any(|segment| segment == "..") {
            return Err(StorageError::InvalidLocation(format!(
                "object path must not contain '..': {}",
                path
            )));
        }

        Ok(Self {
            backend,
            container,
            path,
        })
    }

    /// Parse `gs://bucket/path` or `file://dir/path`.
    pub fn parse(url: &str) -> StorageResult<Self> {
        let (scheme, rest) = url.trim().split_once("://").ok_or_else(|| {
            StorageError::InvalidLocation(format!("missing scheme in blob URL: {}", url))
        })?;
        let backend = StorageBackend::from_scheme(scheme).ok_or_else(|| {
            StorageError::InvalidLocation(format!("unsupported blob URL scheme: {}", scheme))
        })?;
        let (container, path) = rest.split_once('/').ok_or_else(|| {
            StorageError::InvalidLocation(format!("blob URL has no object path: {}", url))
        })?;

        Self::new(backend, container, path)
    }

    pub fn backend(&self) -> StorageBackend {
        self.backend
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Last path segment, used to name scratch files.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

impl Display for BlobLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "{}://{}/{}",
            self.backend.scheme(),
            self.container,
            self.path
        )
    }
}
