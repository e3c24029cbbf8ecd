//! Signature verification for signed PDFs

use crate::byterange::{digest, parse_byte_range};
use crate::error::Result;
use crate::parser::PdfDocument;
use chrono::{DateTime, Utc};
use lopdf::{Dictionary, Object};
use serde::Serialize;
use shared_crypto::cms::verify_detached;
use shared_crypto::CertificateInfo;

/// Outcome of checking one signature field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignatureReport {
    pub field_name: Option<String>,
    pub signer_subject: Option<String>,
    pub signer_common_name: Option<String>,
    pub signing_time: Option<DateTime<Utc>>,
    pub byte_range: [usize; 4],
    /// The recomputed SHA-256 equals the CMS message-digest attribute
    pub digest_matches: bool,
    /// The RSA signature over the signed attributes verifies
    pub signature_valid: bool,
    /// No later revision was appended after the signed range
    pub covers_whole_file: bool,
    /// Why the signature could not be checked, if it could not
    pub error: Option<String>,
}

impl SignatureReport {
    pub fn is_valid(&self) -> bool {
        self.digest_matches && self.signature_valid
    }
}

/// Check every signature field in the document, in signing order
pub fn verify(pdf: &[u8]) -> Result<Vec<SignatureReport>> {
    let doc = PdfDocument::from_bytes(pdf)?;
    let mut reports = Vec::new();

    for object in doc.document().objects.values() {
        let Ok(field) = object.as_dict() else {
            continue;
        };
        if !is_signature_field(field) {
            continue;
        }
        let Some(sig) = field
            .get(b"V")
            .ok()
            .and_then(|v| doc.resolve(v).ok())
            .and_then(|v| v.as_dict().ok())
        else {
            // Unsigned field
            continue;
        };

        reports.push(check_signature(pdf, field, sig));
    }

    reports.sort_by_key(|report| report.byte_range[1]);
    tracing::debug!(signatures = reports.len(), "verified document signatures");
    Ok(reports)
}

fn is_signature_field(dict: &Dictionary) -> bool {
    dict.get(b"FT")
        .and_then(Object::as_name)
        .map(|name| name == b"Sig")
        .unwrap_or(false)
}

fn check_signature(pdf: &[u8], field: &Dictionary, sig: &Dictionary) -> SignatureReport {
    let mut report = SignatureReport {
        field_name: field
            .get(b"T")
            .and_then(Object::as_str)
            .ok()
            .map(decode_text_string),
        signer_subject: None,
        signer_common_name: None,
        signing_time: None,
        byte_range: [0; 4],
        digest_matches: false,
        signature_valid: false,
        covers_whole_file: false,
        error: None,
    };

    let byte_range = match sig.get(b"ByteRange").map_err(Into::into).and_then(parse_byte_range) {
        Ok(range) => range,
        Err(e) => {
            report.error = Some(e.to_string());
            return report;
        }
    };
    report.byte_range = byte_range;

    let content_digest = match digest(pdf, &byte_range) {
        Ok(d) => d,
        Err(e) => {
            report.error = Some(e.to_string());
            return report;
        }
    };
    // In bounds once the digest succeeded
    report.covers_whole_file = byte_range[2] + byte_range[3] == pdf.len();

    let contents = match sig.get(b"Contents") {
        Ok(Object::String(bytes, _)) => bytes.as_slice(),
        _ => {
            report.error = Some("signature has no /Contents".to_string());
            return report;
        }
    };

    match verify_detached(contents, &content_digest) {
        Ok(checked) => {
            if let Some(certificate) = &checked.signer {
                let info = CertificateInfo::from_certificate(certificate);
                report.signer_subject = Some(info.subject);
                report.signer_common_name = info.common_name;
            }
            report.signing_time = checked.signing_time;
            report.digest_matches = checked.digest_matches;
            report.signature_valid = checked.signature_valid;
        }
        Err(e) => {
            tracing::warn!(error = %e, "signature could not be decoded");
            report.error = Some(e.to_string());
        }
    }

    report
}

/// PDF text string: UTF-16BE with BOM, otherwise treated as Latin-1
fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}
