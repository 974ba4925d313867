//! # Content Pipeline
//!
//! Everything that happens to content before it touches a transaction:
//! type detection, validation, normalization and chunking.

pub mod mime;
pub mod pipeline;

pub use mime::detect_content_type;
pub use pipeline::{
    chunk_content, content_info, prepare_content, validate_content, ContentInfo, ContentInput,
    Dimensions, InscriptionContent,
};
