//! Raw artifact storage
//!
//! Two broker types translate (citekey, artifact kind) into concrete file
//! paths and perform the physical operation. [`FileBroker`] owns the bib,
//! meta, and cache files rooted at the repository directory; [`DocBroker`]
//! owns a directory of `<citekey>.<ext>` files and serves both the document
//! store and the note store as separate instances. Every `push` overwrites
//! unconditionally; nothing here merges.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::citekey::Citekey;
use crate::error::{ArtifactKind, BrokerError, DocumentError, Error, Result};
use crate::fs::{FileStat, FileSystem};

const BIB_EXT: &str = "bib";
const META_EXT: &str = "yaml";

/// One file found in a store, keyed by the citekey its name encodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListedFile {
    pub citekey: Citekey,
    pub stat: Option<FileStat>,
}

/// Citekeys present per artifact family, derived from file names.
///
/// [`FileBroker::listing`] fills the `bib` and `meta` families it owns;
/// the data broker adds `doc` and `note` from the document brokers.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Listing {
    pub bib: Vec<ListedFile>,
    pub meta: Vec<ListedFile>,
    pub doc: Vec<ListedFile>,
    pub note: Vec<ListedFile>,
}

/// Broker for the bib, meta, and cache stores.
pub struct FileBroker {
    fs: Arc<dyn FileSystem>,
    bibdir: PathBuf,
    metadir: PathBuf,
    cachedir: PathBuf,
}

impl FileBroker {
    /// Open the broker, creating the three store directories when missing.
    pub fn new(
        fs: Arc<dyn FileSystem>,
        bibdir: PathBuf,
        metadir: PathBuf,
        cachedir: PathBuf,
    ) -> Result<Self> {
        for dir in [&bibdir, &metadir, &cachedir] {
            fs.create_dir_all(dir)
                .map_err(|e| BrokerError::io(dir.clone(), e))?;
        }
        Ok(Self {
            fs,
            bibdir,
            metadir,
            cachedir,
        })
    }

    fn bib_path(&self, key: &Citekey) -> PathBuf {
        self.bibdir.join(format!("{key}.{BIB_EXT}"))
    }

    fn meta_path(&self, key: &Citekey) -> PathBuf {
        self.metadir.join(format!("{key}.{META_EXT}"))
    }

    fn cache_path(&self, name: &str) -> PathBuf {
        self.cachedir.join(name)
    }

    pub fn pull_bibfile(&self, key: &Citekey) -> Result<String> {
        read_text(self.fs.as_ref(), &self.bib_path(key))
    }

    pub fn push_bibfile(&self, key: &Citekey, raw: &str) -> Result<()> {
        let path = self.bib_path(key);
        self.fs
            .write(&path, raw.as_bytes())
            .map_err(|e| BrokerError::io(path, e))?;
        Ok(())
    }

    pub fn pull_metafile(&self, key: &Citekey) -> Result<String> {
        read_text(self.fs.as_ref(), &self.meta_path(key))
    }

    pub fn push_metafile(&self, key: &Citekey, raw: &str) -> Result<()> {
        let path = self.meta_path(key);
        self.fs
            .write(&path, raw.as_bytes())
            .map_err(|e| BrokerError::io(path, e))?;
        Ok(())
    }

    pub fn pull_cachefile(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.cache_path(name);
        self.fs.read(&path).map_err(|e| BrokerError::io(path, e).into())
    }

    pub fn push_cachefile(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.cache_path(name);
        self.fs
            .write(&path, bytes)
            .map_err(|e| BrokerError::io(path, e))?;
        Ok(())
    }

    /// Write both files for a citekey, meta first.
    ///
    /// Bib-file presence is what makes a paper exist, so the accessory file
    /// lands before membership flips. When the bib write fails the meta
    /// write stays in place; there is no rollback.
    pub fn push(&self, key: &Citekey, meta_raw: &str, bib_raw: &str) -> Result<()> {
        self.push_metafile(key, meta_raw)?;
        self.push_bibfile(key, bib_raw)?;
        tracing::debug!("pushed bib+meta for {}", key);
        Ok(())
    }

    /// Whether the paper exists: the bib file is present, and with
    /// `require_meta` set, the meta file too.
    pub fn exists(&self, key: &Citekey, require_meta: bool) -> bool {
        self.fs.exists(&self.bib_path(key))
            && (!require_meta || self.fs.exists(&self.meta_path(key)))
    }

    /// Delete the bib file. A missing bib file means the paper does not
    /// exist, which is an error here.
    pub fn remove_bibfile(&self, key: &Citekey) -> Result<()> {
        let path = self.bib_path(key);
        if !self.fs.exists(&path) {
            return Err(BrokerError::Missing {
                kind: ArtifactKind::Bib,
                citekey: key.to_string(),
            }
            .into());
        }
        self.fs.remove(&path).map_err(|e| BrokerError::io(path, e))?;
        Ok(())
    }

    /// Delete the meta file. Meta is an accessory, so a missing file is
    /// fine; I/O failures still propagate.
    pub fn remove_metafile(&self, key: &Citekey) -> Result<()> {
        let path = self.meta_path(key);
        if !self.fs.exists(&path) {
            return Ok(());
        }
        self.fs.remove(&path).map_err(|e| BrokerError::io(path, e))?;
        Ok(())
    }

    /// Delete the bib and meta files; documents and notes are untouched.
    pub fn remove(&self, key: &Citekey) -> Result<()> {
        self.remove_bibfile(key)?;
        self.remove_metafile(key)
    }

    pub fn rename_bibfile(&self, old: &Citekey, new: &Citekey) -> Result<()> {
        self.rename_between(ArtifactKind::Bib, &self.bib_path(old), &self.bib_path(new), old)
    }

    pub fn rename_metafile(&self, old: &Citekey, new: &Citekey) -> Result<()> {
        self.rename_between(ArtifactKind::Meta, &self.meta_path(old), &self.meta_path(new), old)
    }

    fn rename_between(
        &self,
        kind: ArtifactKind,
        from: &Path,
        to: &Path,
        old: &Citekey,
    ) -> Result<()> {
        if !self.fs.exists(from) {
            return Err(BrokerError::Missing {
                kind,
                citekey: old.to_string(),
            }
            .into());
        }
        self.fs
            .rename(from, to)
            .map_err(|e| BrokerError::io(from.to_path_buf(), e))?;
        Ok(())
    }

    /// Enumerate the bib and meta families.
    pub fn listing(&self, with_stats: bool) -> Result<Listing> {
        Ok(Listing {
            bib: scan_store(self.fs.as_ref(), &self.bibdir, Some(BIB_EXT), with_stats)?,
            meta: scan_store(self.fs.as_ref(), &self.metadir, Some(META_EXT), with_stats)?,
            ..Listing::default()
        })
    }
}

/// Broker for a directory of `<citekey>.<ext>` files.
///
/// One instance serves the document store, another the note store; the
/// artifact kind only affects error reporting.
pub struct DocBroker {
    fs: Arc<dyn FileSystem>,
    dir: PathBuf,
    kind: ArtifactKind,
}

impl DocBroker {
    pub fn new(fs: Arc<dyn FileSystem>, dir: PathBuf, kind: ArtifactKind) -> Result<Self> {
        fs.create_dir_all(&dir)
            .map_err(|e| BrokerError::io(dir.clone(), e))?;
        Ok(Self { fs, dir, kind })
    }

    fn named_path(&self, key: &Citekey, ext: &str) -> PathBuf {
        if ext.is_empty() {
            self.dir.join(key.as_str())
        } else {
            self.dir.join(format!("{key}.{ext}"))
        }
    }

    /// Copy a source file into the store as `<citekey>.<ext>`, keeping the
    /// source's extension.
    ///
    /// Fails with `Collision` when a document already exists for the
    /// citekey and `overwrite` is unset. With `overwrite`, the old file is
    /// removed first even when its extension differs, so at most one file
    /// per citekey survives.
    pub fn add_doc(&self, key: &Citekey, source: &Path, overwrite: bool) -> Result<PathBuf> {
        if !self.fs.exists(source) {
            return Err(DocumentError::FileNotFound(source.to_path_buf()).into());
        }
        if let Some(existing) = self.find_doc(key) {
            if !overwrite {
                return Err(DocumentError::Collision(key.to_string()).into());
            }
            self.fs
                .remove(&existing)
                .map_err(|e| BrokerError::io(existing, e))?;
        }
        let ext = source
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        let target = self.named_path(key, ext);
        self.fs
            .copy(source, &target)
            .map_err(|e| BrokerError::io(target.clone(), e))?;
        tracing::debug!("stored {} for {} at {:?}", self.kind, key, target);
        Ok(target)
    }

    /// The stored file for a citekey, whatever its extension.
    pub fn find_doc(&self, key: &Citekey) -> Option<PathBuf> {
        let files = match self.fs.list(&self.dir) {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!("cannot list {:?}: {}", self.dir, e);
                return None;
            }
        };
        files
            .into_iter()
            .find(|p| p.file_stem().and_then(|s| s.to_str()) == Some(key.as_str()))
    }

    /// Delete the stored file for a citekey. With `silent`, a missing file
    /// is ignored; otherwise it is a `Missing` error.
    pub fn remove_doc(&self, key: &Citekey, silent: bool) -> Result<()> {
        match self.find_doc(key) {
            Some(path) => {
                self.fs.remove(&path).map_err(|e| BrokerError::io(path, e))?;
                Ok(())
            }
            None if silent => Ok(()),
            None => Err(BrokerError::Missing {
                kind: self.kind,
                citekey: key.to_string(),
            }
            .into()),
        }
    }

    /// Rename the stored file to the new citekey, keeping its extension.
    pub fn rename_doc(&self, old: &Citekey, new: &Citekey) -> Result<()> {
        let from = self.find_doc(old).ok_or(BrokerError::Missing {
            kind: self.kind,
            citekey: old.to_string(),
        })?;
        let ext = from.extension().and_then(|e| e.to_str()).unwrap_or_default();
        let to = self.named_path(new, ext);
        self.fs
            .rename(&from, &to)
            .map_err(|e| BrokerError::io(from, e))?;
        Ok(())
    }

    /// Path of the file for a citekey under a fixed extension. The file
    /// need not exist.
    pub fn path_with_ext(&self, key: &Citekey, ext: &str) -> PathBuf {
        self.named_path(key, ext)
    }

    /// Delete the file for a citekey under a fixed extension.
    pub fn remove_with_ext(&self, key: &Citekey, ext: &str, silent: bool) -> Result<()> {
        let path = self.named_path(key, ext);
        if !self.fs.exists(&path) {
            if silent {
                return Ok(());
            }
            return Err(BrokerError::Missing {
                kind: self.kind,
                citekey: key.to_string(),
            }
            .into());
        }
        self.fs.remove(&path).map_err(|e| BrokerError::io(path, e))?;
        Ok(())
    }

    /// Rename the file for a citekey under a fixed extension.
    pub fn rename_with_ext(&self, old: &Citekey, new: &Citekey, ext: &str) -> Result<()> {
        let from = self.named_path(old, ext);
        if !self.fs.exists(&from) {
            return Err(BrokerError::Missing {
                kind: self.kind,
                citekey: old.to_string(),
            }
            .into());
        }
        let to = self.named_path(new, ext);
        self.fs
            .rename(&from, &to)
            .map_err(|e| BrokerError::io(from, e))?;
        Ok(())
    }

    /// Extensions of every stored file whose stem is the citekey.
    pub fn extensions(&self, key: &Citekey) -> Result<Vec<String>> {
        let files = self
            .fs
            .list(&self.dir)
            .map_err(|e| BrokerError::io(self.dir.clone(), e))?;
        Ok(files
            .iter()
            .filter(|p| p.file_stem().and_then(|s| s.to_str()) == Some(key.as_str()))
            .map(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or_default()
                    .to_string()
            })
            .collect())
    }

    /// Enumerate this store's family.
    pub fn listing(&self, with_stats: bool) -> Result<Vec<ListedFile>> {
        scan_store(self.fs.as_ref(), &self.dir, None, with_stats)
    }
}

fn read_text(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let bytes = fs
        .read(path)
        .map_err(|e| BrokerError::io(path.to_path_buf(), e))?;
    String::from_utf8(bytes).map_err(|e| {
        Error::from(BrokerError::io(
            path.to_path_buf(),
            std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        ))
    })
}

/// Collect the citekeys a store directory holds, one per well-formed file
/// name. Files whose stem is not a canonical citekey, or whose extension
/// does not match the family's when one is fixed, are skipped.
fn scan_store(
    fs: &dyn FileSystem,
    dir: &Path,
    required_ext: Option<&str>,
    with_stats: bool,
) -> Result<Vec<ListedFile>> {
    let mut found = Vec::new();
    let files = fs.list(dir).map_err(|e| BrokerError::io(dir.to_path_buf(), e))?;
    for path in files {
        if let Some(required) = required_ext {
            if path.extension().and_then(|e| e.to_str()) != Some(required) {
                continue;
            }
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let citekey = match Citekey::new(stem) {
            Ok(key) => key,
            Err(_) => {
                tracing::debug!("skipping foreign file {:?}", path);
                continue;
            }
        };
        let stat = if with_stats {
            Some(fs.stat(&path).map_err(|e| BrokerError::io(path.clone(), e))?)
        } else {
            None
        };
        found.push(ListedFile { citekey, stat });
    }
    Ok(found)
}
