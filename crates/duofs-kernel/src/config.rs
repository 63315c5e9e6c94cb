//! Mount configuration.
//!
//! A [`MountConfig`] is built once at startup and shared read-only by every
//! component. Values come from the built-in defaults, then an optional RON
//! options file ([`MountOptions`]), then the command line.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::constants::{DEFAULT_MAX_PATH_LEN, DEFAULT_STRIPE_UNIT};
use crate::vfs::{PathResolver, SelectionPolicy, SizeCachePolicy};

/// Errors while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse options: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Optional overrides read from a RON file.
///
/// ```ron
/// (
///     stripe_unit: Some(4096),
///     selection: Some(random),
///     size_cache: Some(single_slot),
/// )
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MountOptions {
    pub stripe_unit: Option<usize>,
    pub selection: Option<SelectionPolicy>,
    pub size_cache: Option<SizeCachePolicy>,
    pub max_path_len: Option<usize>,
    pub allow_other: Option<bool>,
    pub auto_unmount: Option<bool>,
}

impl MountOptions {
    /// Parse options from RON text.
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    /// Read and parse a RON options file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron(&text)
    }
}

/// Process-wide mount configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountConfig {
    /// Where the virtual filesystem is mounted.
    pub mount_point: PathBuf,
    /// Root of backend A.
    pub backend_a: PathBuf,
    /// Root of backend B.
    pub backend_b: PathBuf,
    /// Chunk size alternated between the backends.
    pub stripe_unit: usize,
    pub selection: SelectionPolicy,
    pub size_cache: SizeCachePolicy,
    /// Longest physical path accepted, trailing NUL included.
    pub max_path_len: usize,
    pub allow_other: bool,
    pub auto_unmount: bool,
}

impl MountConfig {
    /// Configuration with defaults for everything but the three paths.
    pub fn new(
        mount_point: impl Into<PathBuf>,
        backend_a: impl Into<PathBuf>,
        backend_b: impl Into<PathBuf>,
    ) -> Self {
        Self {
            mount_point: mount_point.into(),
            backend_a: backend_a.into(),
            backend_b: backend_b.into(),
            stripe_unit: DEFAULT_STRIPE_UNIT,
            selection: SelectionPolicy::default(),
            size_cache: SizeCachePolicy::default(),
            max_path_len: DEFAULT_MAX_PATH_LEN,
            allow_other: false,
            auto_unmount: false,
        }
    }

    /// Set the stripe unit.
    pub fn with_stripe_unit(mut self, unit: usize) -> Self {
        self.stripe_unit = unit;
        self
    }

    /// Set the backend selection policy.
    pub fn with_selection(mut self, selection: SelectionPolicy) -> Self {
        self.selection = selection;
        self
    }

    /// Set the size cache policy.
    pub fn with_size_cache(mut self, policy: SizeCachePolicy) -> Self {
        self.size_cache = policy;
        self
    }

    /// Overlay values present in `options`.
    pub fn apply(mut self, options: &MountOptions) -> Self {
        if let Some(unit) = options.stripe_unit {
            self.stripe_unit = unit;
        }
        if let Some(selection) = options.selection {
            self.selection = selection;
        }
        if let Some(policy) = options.size_cache {
            self.size_cache = policy;
        }
        if let Some(len) = options.max_path_len {
            self.max_path_len = len;
        }
        if let Some(allow) = options.allow_other {
            self.allow_other = allow;
        }
        if let Some(auto) = options.auto_unmount {
            self.auto_unmount = auto;
        }
        self
    }

    /// Check the configuration against the filesystem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stripe_unit == 0 {
            return Err(ConfigError::Invalid("stripe unit must be > 0".into()));
        }
        if self.max_path_len == 0 {
            return Err(ConfigError::Invalid("max path length must be > 0".into()));
        }
        for (name, root) in [("A", &self.backend_a), ("B", &self.backend_b)] {
            let meta = std::fs::metadata(root).map_err(|source| ConfigError::Io {
                path: root.clone(),
                source,
            })?;
            if !meta.is_dir() {
                return Err(ConfigError::Invalid(format!(
                    "backend {name} root {} is not a directory",
                    root.display()
                )));
            }
        }
        let a = self.backend_a.canonicalize().unwrap_or_else(|_| self.backend_a.clone());
        let b = self.backend_b.canonicalize().unwrap_or_else(|_| self.backend_b.clone());
        if a == b {
            return Err(ConfigError::Invalid(format!(
                "backend A and B are the same directory: {}",
                a.display()
            )));
        }
        Ok(())
    }

    /// Path resolver over this configuration's backend roots.
    pub fn resolver(&self) -> PathResolver {
        PathResolver::new(&self.backend_a, &self.backend_b, self.max_path_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = MountConfig::new("/mnt", "/a", "/b");
        assert_eq!(config.stripe_unit, DEFAULT_STRIPE_UNIT);
        assert_eq!(config.selection, SelectionPolicy::Random);
        assert_eq!(config.size_cache, SizeCachePolicy::SingleSlot);
        assert_eq!(config.max_path_len, DEFAULT_MAX_PATH_LEN);
    }

    #[test]
    fn test_options_from_ron() {
        let options = MountOptions::from_ron(
            "(stripe_unit: Some(5), selection: Some(b), size_cache: Some(per_inode))",
        )
        .unwrap();
        let config = MountConfig::new("/mnt", "/a", "/b").apply(&options);
        assert_eq!(config.stripe_unit, 5);
        assert_eq!(config.selection, SelectionPolicy::B);
        assert_eq!(config.size_cache, SizeCachePolicy::PerInode);
        assert!(!config.allow_other);
    }

    #[test]
    fn test_empty_options() {
        let options = MountOptions::from_ron("()").unwrap();
        assert_eq!(options, MountOptions::default());
    }

    #[test]
    fn test_validate() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();

        let config = MountConfig::new("/mnt", a.path(), b.path());
        assert!(config.validate().is_ok());

        let same = MountConfig::new("/mnt", a.path(), a.path());
        assert!(matches!(same.validate(), Err(ConfigError::Invalid(_))));

        let zero = MountConfig::new("/mnt", a.path(), b.path()).with_stripe_unit(0);
        assert!(matches!(zero.validate(), Err(ConfigError::Invalid(_))));

        let missing = MountConfig::new("/mnt", a.path(), b.path().join("nope"));
        assert!(matches!(missing.validate(), Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_load_missing_file() {
        let err = MountOptions::load(Path::new("/definitely/not/here.ron")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
