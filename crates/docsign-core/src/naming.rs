//! Output file names for signed documents

use chrono::{DateTime, Utc};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S";
const PDF_EXTENSION: &str = ".pdf";

/// `contract.pdf` becomes `contract_signedAt_2026-03-01T09-05-07.pdf`.
///
/// The extension keeps its original case; names without a `.pdf`
/// extension get one.
pub fn output_name(original: &str, signed_at: DateTime<Utc>) -> String {
    let (stem, extension) = split_pdf_extension(original);
    format!(
        "{}_signedAt_{}{}",
        stem,
        signed_at.format(TIMESTAMP_FORMAT),
        extension
    )
}

fn split_pdf_extension(name: &str) -> (&str, &str) {
    let split = name.len().saturating_sub(PDF_EXTENSION.len());
    match (name.get(..split), name.get(split..)) {
        (Some(stem), Some(ext)) if ext.eq_ignore_ascii_case(PDF_EXTENSION) => (stem, ext),
        _ => (name, PDF_EXTENSION),
    }
}
