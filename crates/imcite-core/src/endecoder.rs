//! Codec seam between the broker and its serialization formats
//!
//! The broker stores text, not structures; everything crossing that line
//! goes through [`EnDecoder`]. Bib files use the `imcite-bibtex` codec,
//! meta files use YAML. Failures surface as [`CodecError`] regardless of
//! which format misbehaved.

use imcite_bibtex::BibEntry;

use crate::error::CodecError;
use crate::metadata::PaperMeta;

/// Encoder/decoder pair for the two stored text formats.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnDecoder;

impl EnDecoder {
    /// Decode a bib file holding exactly one entry.
    pub fn decode_bibentry(&self, raw: &str) -> Result<BibEntry, CodecError> {
        imcite_bibtex::parse_one(raw).map_err(|e| CodecError::Decode {
            what: "bibliographic record",
            detail: e.to_string(),
        })
    }

    pub fn encode_bibentry(&self, entry: &BibEntry) -> String {
        imcite_bibtex::format_entry(entry)
    }

    pub fn decode_metadata(&self, raw: &str) -> Result<PaperMeta, CodecError> {
        serde_yaml::from_str(raw).map_err(|e| CodecError::Decode {
            what: "metadata",
            detail: e.to_string(),
        })
    }

    pub fn encode_metadata(&self, meta: &PaperMeta) -> Result<String, CodecError> {
        serde_yaml::to_string(meta).map_err(|e| CodecError::Encode {
            what: "metadata",
            detail: e.to_string(),
        })
    }
}
