//! Repository layout configuration
//!
//! A repository is described by a small TOML file:
//!
//! ```toml
//! [repository]
//! root = "/home/user/papers"
//! docdir = "/mnt/library/documents"   # optional, defaults to <root>/doc
//! ```
//!
//! Only the layout lives here. Everything behavioral (which editor to open,
//! how to render listings) belongs to the callers this crate serves.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BrokerError, CodecError, Result};

const BIB_DIR: &str = "bib";
const META_DIR: &str = "meta";
const DOC_DIR: &str = "doc";
const NOTE_DIR: &str = "notes";
const CACHE_DIR: &str = ".cache";

/// Where a repository keeps its stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoConfig {
    /// Root directory holding the bib, meta, note, and cache stores.
    pub root: PathBuf,
    /// Document store override. When unset, documents live under
    /// `<root>/doc`; when set, they live in this directory instead, which
    /// may sit anywhere the user likes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docdir: Option<PathBuf>,
}

/// On-disk shape of the config file.
#[derive(Debug, Serialize, Deserialize)]
struct ConfigFile {
    repository: RepoConfig,
}

impl RepoConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            docdir: None,
        }
    }

    pub fn with_docdir(mut self, docdir: impl Into<PathBuf>) -> Self {
        self.docdir = Some(docdir.into());
        self
    }

    pub fn bib_dir(&self) -> PathBuf {
        self.root.join(BIB_DIR)
    }

    pub fn meta_dir(&self) -> PathBuf {
        self.root.join(META_DIR)
    }

    pub fn doc_dir(&self) -> PathBuf {
        self.docdir
            .clone()
            .unwrap_or_else(|| self.root.join(DOC_DIR))
    }

    pub fn note_dir(&self) -> PathBuf {
        self.root.join(NOTE_DIR)
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root.join(CACHE_DIR)
    }

    /// Load a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| BrokerError::io(path.to_path_buf(), e))?;
        let file: ConfigFile = toml::from_str(&content).map_err(|e| CodecError::Decode {
            what: "config",
            detail: e.to_string(),
        })?;
        Ok(file.repository)
    }

    /// Write the config file, creating parent directories when missing.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = ConfigFile {
            repository: self.clone(),
        };
        let content = toml::to_string_pretty(&file).map_err(|e| CodecError::Encode {
            what: "config",
            detail: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| BrokerError::io(parent.to_path_buf(), e))?;
        }
        std::fs::write(path, content).map_err(|e| BrokerError::io(path.to_path_buf(), e))?;
        Ok(())
    }

    /// Conventional config location: `<user config dir>/imcite/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("imcite").join("config.toml"))
    }
}
