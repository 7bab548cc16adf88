//! imcite-core: citekey-addressed storage for the imcite reference manager
//!
//! This library provides the storage broker a reference manager builds on:
//! - Citekey normalization, validation, generation, and uniquification
//! - The `Paper` entity (bibliographic record + metadata + citekey)
//! - File brokers mapping citekeys to bib, meta, document, and note files
//! - The `DataBroker` façade with composed rename/remove and a blob cache
//! - A `Repository` layer working in whole papers
//!
//! I/O is synchronous and blocking, designed for one short-lived process
//! with exclusive access to the repository directory. There is no locking
//! and no crash journal; composed operations report partial failures
//! instead of pretending to be atomic.

pub mod citekey;
pub mod config;
pub mod databroker;
pub mod endecoder;
pub mod error;
pub mod filebroker;
pub mod fs;
pub mod metadata;
pub mod paper;
pub mod repository;

// Re-export main types for convenience
pub use citekey::Citekey;
pub use config::RepoConfig;
pub use databroker::DataBroker;
pub use endecoder::EnDecoder;
pub use error::{
    ArtifactKind, BrokerError, CitekeyError, CodecError, DocumentError, Error, Result,
};
pub use filebroker::{DocBroker, FileBroker, ListedFile, Listing};
pub use fs::{FileStat, FileSystem, MemFileSystem, OsFileSystem};
pub use metadata::PaperMeta;
pub use paper::Paper;
pub use repository::Repository;
