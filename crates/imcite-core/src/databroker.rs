//! The storage façade
//!
//! [`DataBroker`] is the one interface the rest of the system talks to. It
//! composes the bib+meta+cache broker, a document broker, a note broker,
//! and the codec seam, and owns the operations that have to touch several
//! artifact families in one go (`rename_paper`, `remove_paper`). Nothing
//! above this layer resolves paths or opens files.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use imcite_bibtex::BibEntry;

use crate::citekey::Citekey;
use crate::config::RepoConfig;
use crate::endecoder::EnDecoder;
use crate::error::{ArtifactKind, BrokerError, CodecError, Error, Result};
use crate::filebroker::{DocBroker, FileBroker, Listing};
use crate::fs::{FileSystem, OsFileSystem};
use crate::metadata::PaperMeta;
use crate::paper::Paper;

pub struct DataBroker {
    filebroker: FileBroker,
    docbroker: DocBroker,
    notebroker: DocBroker,
    endecoder: EnDecoder,
}

impl DataBroker {
    /// Open a broker over the real filesystem, creating the store
    /// directories when missing.
    pub fn new(config: &RepoConfig) -> Result<Self> {
        Self::with_filesystem(Arc::new(OsFileSystem), config)
    }

    /// Open a broker over an injected filesystem.
    pub fn with_filesystem(fs: Arc<dyn FileSystem>, config: &RepoConfig) -> Result<Self> {
        let filebroker = FileBroker::new(
            fs.clone(),
            config.bib_dir(),
            config.meta_dir(),
            config.cache_dir(),
        )?;
        let docbroker = DocBroker::new(fs.clone(), config.doc_dir(), ArtifactKind::Document)?;
        let notebroker = DocBroker::new(fs, config.note_dir(), ArtifactKind::Note)?;
        Ok(Self {
            filebroker,
            docbroker,
            notebroker,
            endecoder: EnDecoder,
        })
    }

    pub fn pull_metadata(&self, key: &Citekey) -> Result<PaperMeta> {
        let raw = self.filebroker.pull_metafile(key)?;
        Ok(self.endecoder.decode_metadata(&raw)?)
    }

    pub fn pull_bibentry(&self, key: &Citekey) -> Result<BibEntry> {
        let raw = self.filebroker.pull_bibfile(key)?;
        Ok(self.endecoder.decode_bibentry(&raw)?)
    }

    pub fn push_metadata(&self, key: &Citekey, meta: &PaperMeta) -> Result<()> {
        let raw = self.endecoder.encode_metadata(meta)?;
        self.filebroker.push_metafile(key, &raw)
    }

    pub fn push_bibentry(&self, key: &Citekey, entry: &BibEntry) -> Result<()> {
        let raw = self.endecoder.encode_bibentry(entry);
        self.filebroker.push_bibfile(key, &raw)
    }

    /// Write a paper's meta and bib files, overwriting unconditionally.
    ///
    /// Both values are encoded before anything is written, so an encoding
    /// failure leaves the repository untouched. The two writes are atomic
    /// with respect to each other only: when the bib write fails, the meta
    /// write stays.
    pub fn push(&self, key: &Citekey, meta: &PaperMeta, entry: &BibEntry) -> Result<()> {
        let meta_raw = self.endecoder.encode_metadata(meta)?;
        let bib_raw = self.endecoder.encode_bibentry(entry);
        self.filebroker.push(key, &meta_raw, &bib_raw)
    }

    pub fn exists(&self, key: &Citekey, require_meta: bool) -> bool {
        self.filebroker.exists(key, require_meta)
    }

    /// Every citekey in the repository, from the bib listing alone; meta,
    /// document, and note files never affect membership.
    pub fn citekeys(&self) -> Result<BTreeSet<Citekey>> {
        Ok(self
            .filebroker
            .listing(false)?
            .bib
            .into_iter()
            .map(|f| f.citekey)
            .collect())
    }

    /// Enumerate all four artifact families.
    pub fn listing(&self, with_stats: bool) -> Result<Listing> {
        let mut listing = self.filebroker.listing(with_stats)?;
        listing.doc = self.docbroker.listing(with_stats)?;
        listing.note = self.notebroker.listing(with_stats)?;
        Ok(listing)
    }

    /// Best-effort parse of bibliographic text, for validating user-edited
    /// content before committing it. Never errors; strips a leading
    /// byte-order mark, which the underlying parser rejects.
    pub fn verify(&self, raw: &str) -> Option<BibEntry> {
        let cleaned = raw.strip_prefix('\u{feff}').unwrap_or(raw);
        self.endecoder.decode_bibentry(cleaned).ok()
    }

    /// Read a cache blob. A missing or corrupt entry is an error the
    /// caller treats as "rebuild", never as fatal.
    pub fn pull_cache<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let bytes = self.filebroker.pull_cachefile(name)?;
        serde_json::from_slice(&bytes).map_err(|e| {
            tracing::debug!("cache entry {} unusable: {}", name, e);
            CodecError::Decode {
                what: "cache entry",
                detail: e.to_string(),
            }
            .into()
        })
    }

    /// Write a cache blob, overwriting any previous value.
    pub fn push_cache<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value).map_err(|e| CodecError::Encode {
            what: "cache entry",
            detail: e.to_string(),
        })?;
        self.filebroker.push_cachefile(name, &bytes)
    }

    pub fn add_doc(&self, key: &Citekey, source: &Path, overwrite: bool) -> Result<PathBuf> {
        self.docbroker.add_doc(key, source, overwrite)
    }

    pub fn remove_doc(&self, key: &Citekey, silent: bool) -> Result<()> {
        self.docbroker.remove_doc(key, silent)
    }

    pub fn rename_doc(&self, old: &Citekey, new: &Citekey) -> Result<()> {
        self.docbroker.rename_doc(old, new)
    }

    /// The document representing a paper: a stored document when one
    /// exists, else the external document recorded in metadata.
    pub fn document_path(&self, paper: &Paper) -> Result<PathBuf> {
        if let Some(stored) = self.docbroker.find_doc(&paper.citekey) {
            return Ok(stored);
        }
        Ok(paper.external_document()?.to_path_buf())
    }

    pub fn note_path(&self, key: &Citekey, ext: &str) -> PathBuf {
        self.notebroker.path_with_ext(key, ext)
    }

    pub fn remove_note(&self, key: &Citekey, ext: &str, silent: bool) -> Result<()> {
        self.notebroker.remove_with_ext(key, ext, silent)
    }

    pub fn rename_note(&self, old: &Citekey, new: &Citekey, ext: &str) -> Result<()> {
        self.notebroker.rename_with_ext(old, new, ext)
    }

    pub fn note_extensions(&self, key: &Citekey) -> Result<Vec<String>> {
        self.notebroker.extensions(key)
    }

    /// Rename every artifact of a paper: bib file, meta file, stored
    /// document when one exists, then every note file.
    ///
    /// There is no rollback. A sub-step failure surfaces as a `Partial`
    /// error naming the artifact kind that failed and the kinds already
    /// renamed, so the caller can decide whether to continue by hand.
    pub fn rename_paper(&self, old: &Citekey, new: &Citekey) -> Result<()> {
        let mut completed = Vec::new();

        self.filebroker
            .rename_bibfile(old, new)
            .map_err(|e| partial("rename_paper", ArtifactKind::Bib, &completed, e))?;
        completed.push(ArtifactKind::Bib);

        match self.filebroker.rename_metafile(old, new) {
            Ok(()) => completed.push(ArtifactKind::Meta),
            // A paper without a meta file renames cleanly.
            Err(Error::Broker(BrokerError::Missing { .. })) => {}
            Err(e) => return Err(partial("rename_paper", ArtifactKind::Meta, &completed, e)),
        }

        if self.docbroker.find_doc(old).is_some() {
            self.docbroker
                .rename_doc(old, new)
                .map_err(|e| partial("rename_paper", ArtifactKind::Document, &completed, e))?;
            completed.push(ArtifactKind::Document);
        }

        let exts = self
            .notebroker
            .extensions(old)
            .map_err(|e| partial("rename_paper", ArtifactKind::Note, &completed, e))?;
        for ext in exts {
            self.notebroker
                .rename_with_ext(old, new, &ext)
                .map_err(|e| partial("rename_paper", ArtifactKind::Note, &completed, e))?;
        }

        tracing::debug!("renamed {} to {}", old, new);
        Ok(())
    }

    /// Remove every artifact of a paper: bib and meta first, then the
    /// stored document and notes best-effort (their absence is normal).
    ///
    /// Failures report the same `Partial` detail as `rename_paper`.
    pub fn remove_paper(&self, key: &Citekey) -> Result<()> {
        let mut completed = Vec::new();

        self.filebroker
            .remove_bibfile(key)
            .map_err(|e| partial("remove_paper", ArtifactKind::Bib, &completed, e))?;
        completed.push(ArtifactKind::Bib);

        self.filebroker
            .remove_metafile(key)
            .map_err(|e| partial("remove_paper", ArtifactKind::Meta, &completed, e))?;
        completed.push(ArtifactKind::Meta);

        self.docbroker
            .remove_doc(key, true)
            .map_err(|e| partial("remove_paper", ArtifactKind::Document, &completed, e))?;
        completed.push(ArtifactKind::Document);

        let exts = self
            .notebroker
            .extensions(key)
            .map_err(|e| partial("remove_paper", ArtifactKind::Note, &completed, e))?;
        for ext in exts {
            self.notebroker
                .remove_with_ext(key, &ext, true)
                .map_err(|e| partial("remove_paper", ArtifactKind::Note, &completed, e))?;
        }

        tracing::debug!("removed {}", key);
        Ok(())
    }
}

fn partial(op: &'static str, failed: ArtifactKind, completed: &[ArtifactKind], source: Error) -> Error {
    BrokerError::Partial {
        op,
        failed,
        completed: completed.to_vec(),
        source: Box::new(source),
    }
    .into()
}
