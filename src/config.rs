//! Project configuration loaded from `proxy-snapshots.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{ProxyError, ProxyResult};
use crate::formatter::FormatOptions;

/// Name of the configuration file looked up in the project root.
pub const CONFIG_FILE: &str = "proxy-snapshots.toml";

/// Settings shared by the snapshot store and the fixture generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Directory created beside each test file to hold its snapshots.
    pub snapshots_dir: String,
    /// Extension of generated files, without the dot.
    pub extension: String,
    /// Local alias of the modules bundle in generated files.
    pub modules_ref: String,
    /// Root that relative import paths are resolved against. Defaults to the
    /// current directory.
    pub project_root: Option<PathBuf>,
    pub format: FormatOptions,
}

impl ProxyConfig {
    pub fn standard() -> Self {
        Self {
            snapshots_dir: "__proxy-snapshots".to_string(),
            extension: "ts".to_string(),
            modules_ref: "_modules".to_string(),
            project_root: None,
            format: FormatOptions::default(),
        }
    }

    /// Load from a TOML file; a missing file yields the defaults.
    pub fn load(path: &Path) -> ProxyResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ProxyError::io(path, e))?;

        toml::from_str(&content).map_err(|e| ProxyError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load `proxy-snapshots.toml` from `root`, and use `root` as the project
    /// root unless the file names another one.
    pub fn from_project_root(root: impl Into<PathBuf>) -> ProxyResult<Self> {
        let root = root.into();
        let mut config = Self::load(&root.join(CONFIG_FILE))?;
        config.project_root = Some(match config.project_root.take() {
            Some(configured) if configured.is_relative() => root.join(configured),
            Some(configured) => configured,
            None => root,
        });
        Ok(config)
    }

    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = Some(root.into());
        self
    }

    /// The configured project root, or the current directory.
    pub fn project_root(&self) -> ProxyResult<PathBuf> {
        match &self.project_root {
            Some(root) => Ok(root.clone()),
            None => std::env::current_dir().map_err(|e| ProxyError::io(".", e)),
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_missing_file_is_default() {
        let config = ProxyConfig::load(Path::new("/nonexistent/proxy-snapshots.toml")).unwrap();
        assert_eq!(config, ProxyConfig::standard());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "snapshots_dir = \"snapshots\"\n\n[format]\nprint_width = 80").unwrap();

        let config = ProxyConfig::load(file.path()).unwrap();
        assert_eq!(config.snapshots_dir, "snapshots");
        assert_eq!(config.extension, "ts");
        assert_eq!(config.format.print_width, 80);
        assert_eq!(config.format.indent_width, 4);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "snapshots_dir = [").unwrap();
        assert!(matches!(
            ProxyConfig::load(file.path()),
            Err(ProxyError::Config { .. })
        ));
    }

    #[test]
    fn test_from_project_root_resolves_relative_root() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "project_root = \"app\"\n").unwrap();

        let config = ProxyConfig::from_project_root(dir.path()).unwrap();
        assert_eq!(config.project_root().unwrap(), dir.path().join("app"));

        let other = TempDir::new().unwrap();
        let config = ProxyConfig::from_project_root(other.path()).unwrap();
        assert_eq!(config.project_root().unwrap(), other.path().to_path_buf());
    }
}
