//! Detached signature computation over a prepared placeholder

use crate::byterange::{digest, validate_byte_range};
use crate::error::{PdfError, Result};
use crate::placeholder::PlaceholderPdf;
use chrono::{DateTime, Utc};
use shared_crypto::cms::build_detached_signature;
use shared_crypto::{Certificate, SigningIdentity};

/// A document whose signature slot has been filled
#[derive(Debug, Clone)]
pub struct SignedPdf {
    pub bytes: Vec<u8>,
    pub byte_range: [usize; 4],
    pub field_name: String,
    /// DER length of the embedded signature, padding excluded
    pub signature_len: usize,
    pub signed_at: DateTime<Utc>,
}

/// Sign a placeholder document with `identity`; `chain` starts with the
/// signer's certificate.
pub fn sign<I: SigningIdentity>(
    placeholder: PlaceholderPdf,
    identity: &I,
    chain: &[Certificate],
) -> Result<SignedPdf> {
    sign_at(placeholder, identity, chain, Utc::now())
}

/// Like [`sign`] with an explicit signing-time attribute
pub fn sign_at<I: SigningIdentity>(
    placeholder: PlaceholderPdf,
    identity: &I,
    chain: &[Certificate],
    signing_time: DateTime<Utc>,
) -> Result<SignedPdf> {
    let PlaceholderPdf {
        mut bytes,
        byte_range,
        contents_offset,
        slot_len,
        field_name,
    } = placeholder;

    validate_byte_range(&bytes, &byte_range)?;
    if byte_range[1] != contents_offset || byte_range[2] - byte_range[1] != slot_len {
        return Err(PdfError::InvalidByteRange(format!(
            "gap [{}, {}) does not match the reserved slot at {} ({} bytes)",
            byte_range[1], byte_range[2], contents_offset, slot_len
        )));
    }

    let content_digest = digest(&bytes, &byte_range)?;
    let signature = build_detached_signature(&content_digest, identity, chain, signing_time)?;
    write_signature(&mut bytes, contents_offset, slot_len, &signature)?;

    tracing::debug!(
        signature_len = signature.len(),
        capacity = slot_len / 2 - 1,
        "embedded detached signature"
    );

    Ok(SignedPdf {
        bytes,
        byte_range,
        field_name,
        signature_len: signature.len(),
        signed_at: signing_time,
    })
}

/// Hex-encode `signature` into the slot, right-padded with `0`.
///
/// Only the bytes between `<` and `>` change.
pub fn write_signature(
    pdf: &mut [u8],
    contents_offset: usize,
    slot_len: usize,
    signature: &[u8],
) -> Result<()> {
    let available = slot_len.saturating_sub(2) / 2;
    if signature.len() > available {
        return Err(PdfError::SignatureTooLarge {
            required: signature.len(),
            available,
        });
    }

    let end = contents_offset + slot_len;
    if end > pdf.len() || pdf[contents_offset] != b'<' || pdf[end - 1] != b'>' {
        return Err(PdfError::InvalidByteRange(
            "signature slot is not delimited by < and >".to_string(),
        ));
    }

    let sig_hex = hex::encode(signature);
    let slot = &mut pdf[contents_offset + 1..end - 1];
    slot.fill(b'0');
    slot[..sig_hex.len()].copy_from_slice(sig_hex.as_bytes());
    Ok(())
}
