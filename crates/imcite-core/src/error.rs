//! Error types for imcite-core

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for storage-broker operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for storage-broker operations
#[derive(Error, Debug)]
pub enum Error {
    /// Citekey validation or generation errors
    #[error("citekey error: {0}")]
    Citekey(#[from] CitekeyError),

    /// Document and note file errors
    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    /// Bib/meta encode and decode errors
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Raw storage errors
    #[error("broker error: {0}")]
    Broker(#[from] BrokerError),
}

/// Citekey-specific errors
#[derive(Error, Debug)]
pub enum CitekeyError {
    /// The string is not in canonical form (or is empty once normalized)
    #[error("invalid citekey: {0:?}")]
    InvalidCitekey(String),

    /// Citekey generation needs an author or editor
    #[error("no author or editor defined, cannot generate a citekey")]
    MissingAuthor,
}

/// Document-specific errors
#[derive(Error, Debug)]
pub enum DocumentError {
    /// Neither a stored document nor an external one resolves
    #[error("no document file for {0}")]
    NoDocumentFile(String),

    /// A referenced external path does not exist
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// A document is already stored for this citekey and overwrite was not requested
    #[error("a document already exists for {0}")]
    Collision(String),
}

/// Encode/decode errors from the bib and meta codecs
#[derive(Error, Debug)]
pub enum CodecError {
    /// Content could not be decoded
    #[error("failed to decode {what}: {detail}")]
    Decode { what: &'static str, detail: String },

    /// A value could not be encoded
    #[error("failed to encode {what}: {detail}")]
    Encode { what: &'static str, detail: String },
}

/// The four artifact families a citekey addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Bib,
    Meta,
    Document,
    Note,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bib => "bib",
            Self::Meta => "meta",
            Self::Document => "document",
            Self::Note => "note",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw storage errors
#[derive(Error, Debug)]
pub enum BrokerError {
    /// Filesystem failure, with the path it happened on
    #[error("io error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A required artifact file is absent
    #[error("no {kind} file for {citekey}")]
    Missing { kind: ArtifactKind, citekey: String },

    /// Another paper already holds the citekey
    #[error("citekey already in use: {0}")]
    CitekeyTaken(String),

    /// A composed operation failed partway through.
    ///
    /// `completed` lists the artifact kinds already processed before `failed`
    /// went wrong, so the caller knows exactly what state the repository was
    /// left in.
    #[error("{op} failed at the {failed} step (already done: {completed:?}): {source}")]
    Partial {
        op: &'static str,
        failed: ArtifactKind,
        completed: Vec<ArtifactKind>,
        #[source]
        source: Box<Error>,
    },
}

impl BrokerError {
    /// Attach path context to a raw io error
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
