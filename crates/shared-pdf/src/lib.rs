//! Shared PDF handling utilities
//!
//! Parsing, incremental updates, signature placeholders, detached signing,
//! visual signature marks and verification. Every change to a document is
//! appended as a new revision; earlier bytes are never rewritten.

pub mod annotator;
pub mod byterange;
pub mod context;
pub mod coords;
pub mod error;
pub mod parser;
pub mod placeholder;
pub mod signer;
pub mod verifier;
pub mod writer;

#[cfg(test)]
mod testing;

pub use annotator::{annotate, Caption, PagePlacement};
pub use context::SigningContext;
pub use coords::{normalized_to_pdf, PdfRect};
pub use error::{PdfError, Result};
pub use parser::PdfDocument;
pub use placeholder::{inject_placeholder, PlaceholderOptions, PlaceholderPdf, WidgetPlacement};
pub use signer::{sign, sign_at, SignedPdf};
pub use verifier::{verify, SignatureReport};
