//! The in-memory paper entity
//!
//! A `Paper` bundles a citekey with its bibliographic record and metadata.
//! Document resolution for a paper bound to a repository lives on the data
//! broker, which owns the stores; the methods here cover everything a paper
//! can answer on its own.

use std::path::{Path, PathBuf};

use imcite_bibtex::BibEntry;

use crate::citekey::Citekey;
use crate::error::{BrokerError, DocumentError, Result};
use crate::fs::FileSystem;
use crate::metadata::PaperMeta;

/// Name of the field some exporters use to smuggle a document path into a
/// bibliographic record, with `:`-separated segments.
const EMBEDDED_FILE_FIELD: &str = "file";

/// One tracked paper: citekey, bibliographic record, metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Paper {
    pub citekey: Citekey,
    pub entry: BibEntry,
    pub meta: PaperMeta,
}

impl Paper {
    pub fn new(citekey: Citekey, entry: BibEntry, meta: PaperMeta) -> Self {
        Self {
            citekey,
            entry,
            meta,
        }
    }

    /// Build a paper from a raw citekey string.
    ///
    /// Fails with `InvalidCitekey` when the string is not canonical; no
    /// implicit re-normalization happens here.
    pub fn from_parts(citekey: &str, entry: BibEntry, meta: PaperMeta) -> Result<Self> {
        let citekey = Citekey::new(citekey)?;
        Ok(Self::new(citekey, entry, meta))
    }

    /// The external document recorded in metadata.
    ///
    /// This is the whole of document resolution for a paper not bound to a
    /// repository; bound papers first check the document store via the data
    /// broker, which shadows this value.
    pub fn external_document(&self) -> std::result::Result<&Path, DocumentError> {
        self.meta
            .external_document
            .as_deref()
            .ok_or_else(|| DocumentError::NoDocumentFile(self.citekey.to_string()))
    }

    /// Record an external document in metadata.
    ///
    /// The path is made absolute and must point at an existing file; the
    /// file itself is never copied or moved. Returns the absolute path as
    /// recorded.
    pub fn attach_external_document(
        &mut self,
        path: impl AsRef<Path>,
        fs: &dyn FileSystem,
    ) -> Result<PathBuf> {
        let path = path.as_ref();
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            let cwd = std::env::current_dir()
                .map_err(|e| BrokerError::io(path.to_path_buf(), e))?;
            cwd.join(path)
        };
        if !fs.exists(&absolute) {
            return Err(DocumentError::FileNotFound(absolute).into());
        }
        self.meta.external_document = Some(absolute.clone());
        Ok(absolute)
    }
}

/// Pull a document path out of a record's embedded `file` field.
///
/// The field packs one or more paths between `:` delimiters, sometimes with
/// a type tag after the last one (`:/home/u/doc.pdf:pdf`). Takes the first
/// non-empty segment, prefixing a path separator when the exporter dropped
/// it; with `remove` set, the field is deleted from the record afterwards.
/// Fails with `NoDocumentFile` when the field is absent or holds no path.
pub fn extract_embedded_document(
    entry: &mut BibEntry,
    remove: bool,
) -> std::result::Result<PathBuf, DocumentError> {
    let raw = entry
        .get_field(EMBEDDED_FILE_FIELD)
        .ok_or_else(|| DocumentError::NoDocumentFile(entry.key.clone()))?
        .to_string();
    let segment = raw
        .split(':')
        .map(str::trim)
        .find(|s| !s.is_empty())
        .ok_or_else(|| DocumentError::NoDocumentFile(entry.key.clone()))?;
    let path = if segment.starts_with(std::path::MAIN_SEPARATOR) {
        PathBuf::from(segment)
    } else {
        PathBuf::from(format!("{}{}", std::path::MAIN_SEPARATOR, segment))
    };
    if remove {
        entry.remove_field(EMBEDDED_FILE_FIELD);
    }
    Ok(path)
}
