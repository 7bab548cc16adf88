//! Paper-level repository operations
//!
//! [`Repository`] sits on top of the data broker and works in whole
//! papers: importing a bibliographic record with citekey derivation and
//! collision handling, loading and saving `Paper` values, renaming with
//! clobber protection. Callers needing raw artifact access drop down to
//! [`Repository::broker`].

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use imcite_bibtex::BibEntry;

use crate::citekey::{self, Citekey};
use crate::config::RepoConfig;
use crate::databroker::DataBroker;
use crate::error::{ArtifactKind, BrokerError, Error, Result};
use crate::fs::{FileSystem, OsFileSystem};
use crate::metadata::PaperMeta;
use crate::paper::{extract_embedded_document, Paper};

pub struct Repository {
    broker: DataBroker,
    fs: Arc<dyn FileSystem>,
}

impl Repository {
    /// Create a repository, initializing every store directory.
    pub fn create(config: &RepoConfig) -> Result<Self> {
        Self::create_with_filesystem(Arc::new(OsFileSystem), config)
    }

    pub fn create_with_filesystem(fs: Arc<dyn FileSystem>, config: &RepoConfig) -> Result<Self> {
        fs.create_dir_all(&config.root)
            .map_err(|e| BrokerError::io(config.root.clone(), e))?;
        let broker = DataBroker::with_filesystem(fs.clone(), config)?;
        Ok(Self { broker, fs })
    }

    /// Open an existing repository; fails when the root directory is
    /// absent.
    pub fn open(config: &RepoConfig) -> Result<Self> {
        Self::open_with_filesystem(Arc::new(OsFileSystem), config)
    }

    pub fn open_with_filesystem(fs: Arc<dyn FileSystem>, config: &RepoConfig) -> Result<Self> {
        if !fs.exists(&config.root) {
            return Err(BrokerError::io(
                config.root.clone(),
                io::Error::new(io::ErrorKind::NotFound, "repository not initialized"),
            )
            .into());
        }
        let broker = DataBroker::with_filesystem(fs.clone(), config)?;
        Ok(Self { broker, fs })
    }

    /// The underlying data broker, for artifact-level operations.
    pub fn broker(&self) -> &DataBroker {
        &self.broker
    }

    /// Load a paper. A missing meta file yields default metadata; a
    /// corrupt one is an error.
    pub fn load_paper(&self, key: &Citekey) -> Result<Paper> {
        let entry = self.broker.pull_bibentry(key)?;
        let meta = match self.broker.pull_metadata(key) {
            Ok(meta) => meta,
            Err(Error::Broker(BrokerError::Io { ref source, .. }))
                if source.kind() == io::ErrorKind::NotFound =>
            {
                PaperMeta::new()
            }
            Err(e) => return Err(e),
        };
        Ok(Paper::new(key.clone(), entry, meta))
    }

    pub fn save_paper(&self, paper: &Paper) -> Result<()> {
        self.broker.push(&paper.citekey, &paper.meta, &paper.entry)
    }

    /// Import a bibliographic record as a new paper and return its citekey.
    ///
    /// Key precedence: an explicit `key_override` wins, then the record's
    /// own key, then a key derived from author and year. Derived keys are
    /// suffixed out of collisions; an explicit override that collides
    /// fails with `CitekeyTaken`. With `attach_embedded` set, a document
    /// referenced by the record's `file` field is copied into the store
    /// when its source still exists, and the field is dropped from the
    /// stored record.
    pub fn import(
        &self,
        mut entry: BibEntry,
        key_override: Option<&str>,
        attach_embedded: bool,
    ) -> Result<Citekey> {
        let taken = self.broker.citekeys()?;
        let citekey = match key_override {
            Some(explicit) => {
                let key = Citekey::new(explicit)?;
                if taken.contains(&key) {
                    return Err(BrokerError::CitekeyTaken(key.into_string()).into());
                }
                key
            }
            None => {
                let candidate = if entry.key.trim().is_empty() {
                    citekey::generate(&entry)?
                } else {
                    Citekey::sanitized(&entry.key).or_else(|_| citekey::generate(&entry))?
                };
                citekey::uniquify(candidate, &taken)
            }
        };

        let embedded = if attach_embedded {
            extract_embedded_document(&mut entry, true).ok()
        } else {
            None
        };

        entry.key = citekey.to_string();
        self.broker.push(&citekey, &PaperMeta::new(), &entry)?;

        if let Some(source) = embedded {
            if let Err(e) = self.broker.add_doc(&citekey, &source, false) {
                tracing::warn!("imported {} without its document: {}", citekey, e);
            }
        }

        tracing::debug!("imported {}", citekey);
        Ok(citekey)
    }

    /// Copy a document into the store for an existing paper.
    pub fn attach_doc(&self, key: &Citekey, source: &Path, overwrite: bool) -> Result<PathBuf> {
        if !self.broker.exists(key, false) {
            return Err(BrokerError::Missing {
                kind: ArtifactKind::Bib,
                citekey: key.to_string(),
            }
            .into());
        }
        self.broker.add_doc(key, source, overwrite)
    }

    /// Record an external document for an existing paper without copying
    /// it. Returns the absolute path as recorded in metadata.
    pub fn attach_external(&self, key: &Citekey, path: impl AsRef<Path>) -> Result<PathBuf> {
        let mut paper = self.load_paper(key)?;
        let recorded = paper.attach_external_document(path, self.fs.as_ref())?;
        self.broker.push_metadata(key, &paper.meta)?;
        Ok(recorded)
    }

    /// Rename a paper across all four artifact families.
    ///
    /// The new key must be canonical and free; the key inside the bib file
    /// is rewritten to match after the files move.
    pub fn rename(&self, old: &Citekey, new_key: &str) -> Result<Citekey> {
        let new = Citekey::new(new_key)?;
        if new == *old {
            return Ok(new);
        }
        if self.broker.exists(&new, false) {
            return Err(BrokerError::CitekeyTaken(new.into_string()).into());
        }
        self.broker.rename_paper(old, &new)?;

        let mut entry = self.broker.pull_bibentry(&new)?;
        entry.key = new.to_string();
        self.broker.push_bibentry(&new, &entry)?;
        Ok(new)
    }

    /// Remove a paper and all of its artifacts.
    pub fn remove(&self, key: &Citekey) -> Result<()> {
        self.broker.remove_paper(key)
    }

    pub fn citekeys(&self) -> Result<BTreeSet<Citekey>> {
        self.broker.citekeys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemFileSystem;
    use imcite_bibtex::EntryKind;

    fn key(s: &str) -> Citekey {
        Citekey::new(s).unwrap()
    }

    fn pagerank_entry(k: &str) -> BibEntry {
        let mut entry = BibEntry::new(k, EntryKind::TechReport);
        entry.add_field("author", "Page, Lawrence and Brin, Sergey");
        entry.add_field("title", "The PageRank Citation Ranking");
        entry.add_field("year", "1999");
        entry
    }

    fn repo() -> (Arc<MemFileSystem>, Repository) {
        let fs = Arc::new(MemFileSystem::new());
        let config = RepoConfig::new("/repo");
        let repo = Repository::create_with_filesystem(fs.clone(), &config).unwrap();
        (fs, repo)
    }

    #[test]
    fn test_open_requires_existing_root() {
        let fs = Arc::new(MemFileSystem::new());
        let config = RepoConfig::new("/repo");
        assert!(Repository::open_with_filesystem(fs.clone(), &config).is_err());

        Repository::create_with_filesystem(fs.clone(), &config).unwrap();
        assert!(Repository::open_with_filesystem(fs, &config).is_ok());
    }

    #[test]
    fn test_import_keeps_records_own_key() {
        let (_fs, repo) = repo();
        let imported = repo.import(pagerank_entry("Page99"), None, false).unwrap();
        assert_eq!(imported.as_str(), "Page99");
        assert!(repo.citekeys().unwrap().contains(&imported));
        assert_eq!(repo.load_paper(&imported).unwrap().entry.key, "Page99");
    }

    #[test]
    fn test_import_generates_key_when_record_has_none() {
        let (_fs, repo) = repo();
        let imported = repo.import(pagerank_entry(""), None, false).unwrap();
        assert_eq!(imported.as_str(), "Page1999");
    }

    #[test]
    fn test_import_suffixes_derived_collisions() {
        let (_fs, repo) = repo();
        repo.import(pagerank_entry(""), None, false).unwrap();
        let second = repo.import(pagerank_entry(""), None, false).unwrap();
        assert_eq!(second.as_str(), "Page1999a");
    }

    #[test]
    fn test_import_explicit_override_collision_fails() {
        let (_fs, repo) = repo();
        repo.import(pagerank_entry("Page99"), None, false).unwrap();
        let err = repo
            .import(pagerank_entry(""), Some("Page99"), false)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Broker(BrokerError::CitekeyTaken(_))
        ));
    }

    #[test]
    fn test_import_sanitizes_foreign_key() {
        let (_fs, repo) = repo();
        let imported = repo.import(pagerank_entry("Pàge/99"), None, false).unwrap();
        assert_eq!(imported.as_str(), "Page99");
    }

    #[test]
    fn test_import_attaches_embedded_document() {
        let (fs, repo) = repo();
        fs.create_dir_all(Path::new("/exports")).unwrap();
        fs.write(Path::new("/exports/pagerank.pdf"), b"%PDF").unwrap();

        let mut entry = pagerank_entry("Page99");
        entry.add_field("file", ":exports/pagerank.pdf:pdf");

        let imported = repo.import(entry, None, true).unwrap();
        assert!(fs.exists(Path::new("/repo/doc/Page99.pdf")));
        // The smuggled field does not survive into the stored record.
        let stored = repo.load_paper(&imported).unwrap();
        assert!(stored.entry.get_field("file").is_none());
    }

    #[test]
    fn test_import_tolerates_dangling_embedded_reference() {
        let (fs, repo) = repo();
        let mut entry = pagerank_entry("Page99");
        entry.add_field("file", ":exports/gone.pdf:pdf");

        let imported = repo.import(entry, None, true).unwrap();
        assert!(repo.citekeys().unwrap().contains(&imported));
        assert!(!fs.exists(Path::new("/repo/doc/Page99.pdf")));
    }

    #[test]
    fn test_load_paper_defaults_missing_meta() {
        let (_fs, repo) = repo();
        let k = key("Page99");
        repo.broker().push_bibentry(&k, &pagerank_entry("Page99")).unwrap();

        let paper = repo.load_paper(&k).unwrap();
        assert_eq!(paper.meta, PaperMeta::new());
    }

    #[test]
    fn test_save_load_round_trip() {
        let (_fs, repo) = repo();
        let k = repo.import(pagerank_entry("Page99"), None, false).unwrap();
        let mut paper = repo.load_paper(&k).unwrap();
        paper.meta.add_tag("search");
        paper.meta.notes.push("summary".to_string());
        repo.save_paper(&paper).unwrap();

        assert_eq!(repo.load_paper(&k).unwrap(), paper);
    }

    #[test]
    fn test_rename_rewrites_bib_key() {
        let (_fs, repo) = repo();
        let old = repo.import(pagerank_entry("Page99"), None, false).unwrap();
        let new = repo.rename(&old, "PageBrin99").unwrap();

        assert!(!repo.citekeys().unwrap().contains(&old));
        let paper = repo.load_paper(&new).unwrap();
        assert_eq!(paper.entry.key, "PageBrin99");
    }

    #[test]
    fn test_rename_refuses_clobber_and_bad_keys() {
        let (_fs, repo) = repo();
        let a = repo.import(pagerank_entry("Page99"), None, false).unwrap();
        repo.import(pagerank_entry("Brin98"), None, false).unwrap();

        assert!(matches!(
            repo.rename(&a, "Brin98").unwrap_err(),
            Error::Broker(BrokerError::CitekeyTaken(_))
        ));
        assert!(repo.rename(&a, "Päge99").is_err());
        // The failed renames left the paper untouched.
        assert!(repo.citekeys().unwrap().contains(&a));
    }

    #[test]
    fn test_attach_doc_requires_existing_paper() {
        let (fs, repo) = repo();
        fs.create_dir_all(Path::new("/src")).unwrap();
        fs.write(Path::new("/src/pagerank.pdf"), b"%PDF").unwrap();

        let err = repo
            .attach_doc(&key("Ghost"), Path::new("/src/pagerank.pdf"), false)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Broker(BrokerError::Missing {
                kind: ArtifactKind::Bib,
                ..
            })
        ));
    }

    #[test]
    fn test_attach_external_records_metadata() {
        let (fs, repo) = repo();
        fs.create_dir_all(Path::new("/library")).unwrap();
        fs.write(Path::new("/library/pagerank.pdf"), b"%PDF").unwrap();

        let k = repo.import(pagerank_entry("Page99"), None, false).unwrap();
        let recorded = repo.attach_external(&k, "/library/pagerank.pdf").unwrap();
        assert_eq!(recorded, PathBuf::from("/library/pagerank.pdf"));

        let paper = repo.load_paper(&k).unwrap();
        assert_eq!(
            paper.meta.external_document.as_deref(),
            Some(Path::new("/library/pagerank.pdf"))
        );
    }
}
